mod common;

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use common::{push_day, USER};
use fitlog_lib::{
    db::{
        models::{
            BodyWeightEntry, CustomFood, FoodLog, FoodSource, Macros, Meal, SessionRecord,
            UserProfile, UserRole, WaterLog,
        },
        Database,
    },
    models::WorkoutSession,
};

fn open(dir: &tempfile::TempDir) -> Database {
    Database::new(dir.path().join("fitlog.sqlite3")).unwrap()
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

fn record_started(id: &str, d: u32) -> SessionRecord {
    let started = Utc.with_ymd_and_hms(2024, 5, d, 7, 30, 0).unwrap();
    let mut session = WorkoutSession::start(&push_day(), started.timestamp_millis());
    session.id = id.to_string();
    session.clock.duration_seconds = 1800;
    SessionRecord::from_session(&session, USER, started + Duration::minutes(30))
}

#[tokio::test]
async fn routines_round_trip_with_their_exercises() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);

    let routine = push_day();
    db.upsert_routine(&routine).await.unwrap();

    let loaded = db.get_routine("push").await.unwrap().unwrap();
    assert_eq!(loaded.exercises, routine.exercises);
    assert_eq!(db.list_routines(USER).await.unwrap().len(), 1);
    assert!(db.list_routines("someone-else").await.unwrap().is_empty());

    db.delete_routine("push").await.unwrap();
    assert!(db.get_routine("push").await.unwrap().is_none());
}

#[tokio::test]
async fn sessions_list_newest_first_and_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let db = open(&dir);
        for (id, d) in [("a", 1), ("c", 3), ("b", 2)] {
            db.save_session_record(&record_started(id, d)).await.unwrap();
        }
    }

    let db = open(&dir);
    let ids: Vec<String> = db
        .list_session_records(USER, 10, 0)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ids, ["c", "b", "a"]);

    let page = db.list_session_records(USER, 1, 1).await.unwrap();
    assert_eq!(page[0].id, "b");

    let stored = db.get_session_record("a").await.unwrap().unwrap();
    assert_eq!(stored.exercises.len(), 3);
    assert_eq!(stored.duration_seconds, 1800);

    db.delete_session_record("a").await.unwrap();
    assert!(db.get_session_record("a").await.unwrap().is_none());
}

#[tokio::test]
async fn saving_a_session_twice_updates_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);
    let mut record = record_started("s", 4);
    db.save_session_record(&record).await.unwrap();

    record.notes = Some("felt strong".into());
    db.save_session_record(&record).await.unwrap();

    let all = db.list_session_records(USER, 10, 0).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].notes.as_deref(), Some("felt strong"));
}

#[tokio::test]
async fn body_weights_filter_by_start_date() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);
    for d in [1, 5, 9] {
        db.insert_body_weight(&BodyWeightEntry {
            id: format!("w{d}"),
            user_id: USER.into(),
            weight_kg: 80.0 + d as f64 / 10.0,
            measured_on: day(d),
            note: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    }

    assert_eq!(db.list_body_weights(USER, None).await.unwrap().len(), 3);
    let recent = db.list_body_weights(USER, Some(day(5))).await.unwrap();
    assert_eq!(
        recent.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
        ["w5", "w9"]
    );

    db.delete_body_weight("w1").await.unwrap();
    assert!(db.delete_body_weight("w1").await.is_err());
}

#[tokio::test]
async fn food_and_water_are_scoped_to_a_day() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);

    for (id, d) in [("f1", 1), ("f2", 1), ("f3", 2)] {
        db.insert_food_log(&FoodLog {
            id: id.into(),
            user_id: USER.into(),
            logged_on: day(d),
            meal: Meal::Lunch,
            name: "Rice".into(),
            macros: Macros {
                calories: 200.0,
                protein: 4.0,
                carbs: 45.0,
                fats: 0.5,
            },
            quantity: 150.0,
            unit: "g".into(),
            source: FoodSource::Manual,
            created_at: Utc::now(),
        })
        .await
        .unwrap();
    }
    db.insert_water_log(&WaterLog {
        id: "w".into(),
        user_id: USER.into(),
        logged_on: day(1),
        amount_ml: 500,
        created_at: Utc::now(),
    })
    .await
    .unwrap();

    let first_day = db.list_food_logs(USER, day(1)).await.unwrap();
    assert_eq!(first_day.len(), 2);
    assert_eq!(first_day[0].meal, Meal::Lunch);
    assert_eq!(db.list_water_logs(USER, day(1)).await.unwrap()[0].amount_ml, 500);
    assert!(db.list_water_logs(USER, day(2)).await.unwrap().is_empty());

    db.delete_food_log("f1").await.unwrap();
    assert_eq!(db.list_food_logs(USER, day(1)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn custom_foods_scale_by_serving() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);
    db.upsert_custom_food(&CustomFood {
        id: "oats".into(),
        user_id: USER.into(),
        name: "Oats".into(),
        macros: Macros {
            calories: 380.0,
            protein: 13.0,
            carbs: 60.0,
            fats: 7.0,
        },
        serving_quantity: 100.0,
        serving_unit: "g".into(),
    })
    .await
    .unwrap();

    let foods = db.list_custom_foods(USER).await.unwrap();
    assert_eq!(foods.len(), 1);
    let half = foods[0].macros_for(50.0);
    assert_eq!(half.calories, 190.0);
    assert_eq!(half.protein, 6.5);
}

#[tokio::test]
async fn trainer_links_require_the_trainer_role() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);

    let mut coach = UserProfile::new("coach", "Coach");
    db.upsert_profile(&coach).await.unwrap();
    db.upsert_profile(&UserProfile::new("ana", "Ana")).await.unwrap();

    let err = db.link_trainer("ana", "coach").await.unwrap_err();
    assert!(err.to_string().contains("not a trainer"));
    assert!(db.link_trainer("coach", "coach").await.is_err());
    assert!(db.link_trainer("ana", "ghost").await.is_err());

    coach.role = UserRole::Trainer;
    db.upsert_profile(&coach).await.unwrap();
    db.link_trainer("ana", "coach").await.unwrap();

    let trainees = db.list_trainees("coach").await.unwrap();
    assert_eq!(trainees.len(), 1);
    assert_eq!(trainees[0].trainer_id.as_deref(), Some("coach"));

    db.unlink_trainer("ana").await.unwrap();
    assert!(db.list_trainees("coach").await.unwrap().is_empty());
}

#[tokio::test]
async fn assigned_routines_are_copied_and_stamped() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir);

    let mut coach = UserProfile::new("coach", "Coach");
    coach.role = UserRole::Trainer;
    db.upsert_profile(&coach).await.unwrap();
    db.upsert_profile(&UserProfile::new("ana", "Ana")).await.unwrap();
    db.upsert_profile(&UserProfile::new("ben", "Ben")).await.unwrap();
    db.link_trainer("ana", "coach").await.unwrap();

    let template = push_day();
    let assigned = db.assign_routine("coach", "ana", &template).await.unwrap();
    assert_ne!(assigned.id, template.id);
    assert_eq!(assigned.user_id, "ana");
    assert_eq!(assigned.assigned_by.as_deref(), Some("coach"));
    assert_eq!(db.list_routines("ana").await.unwrap().len(), 1);

    assert!(db.assign_routine("coach", "ben", &template).await.is_err());
}
