mod common;

use std::sync::{atomic::Ordering, Arc};

use common::{FakeAi, Harness};
use fitlog_lib::{
    ai::AiService,
    backend::Backend,
    commands,
    db::models::{Meal, UserProfile, UserRole},
    routes::Route,
    shell::handle_line,
    timer::commands as session,
    AppState,
};
use serde_json::Value;

const ROUTINES_REPLY: &str = "Sure! Here is your plan:\n```json\n{\"routines\":[{\"name\":\"Full Body A\",\"description\":\"Beginner\",\"exercises\":[{\"name\":\"Squat\",\"sets\":3,\"reps\":5,\"weight\":60},{\"name\":\"Push-up\",\"sets\":3,\"reps\":12}]}]}\n```";

const FOOD_REPLY: &str = r#"{"items":[{"name":"Egg","calories":140,"protein":12,"carbs":1,"fats":10,"quantity":2,"unit":"piece"},{"name":"Toast","calories":160,"protein":6,"carbs":30,"fats":2,"quantity":2,"unit":"slice"}],"notes":"Looks like breakfast"}"#;

fn fake_ai() -> Arc<FakeAi> {
    Arc::new(FakeAi::new(ROUTINES_REPLY, FOOD_REPLY))
}

async fn run(state: &AppState, line: &str) -> Value {
    let output = handle_line(state, line).await.expect("shell kept running");
    assert!(!output.starts_with("error:"), "{line} failed: {output}");
    serde_json::from_str(&output).unwrap_or(Value::String(output))
}

#[tokio::test]
async fn shell_runs_a_workout_end_to_end() {
    let h = Harness::new();
    let state = h.app_state(None);

    let routine = run(&state, r#"new-routine "Leg Day" Squat:2:5:100"#).await;
    let routine_id = routine["id"].as_str().unwrap().to_string();

    let decision = run(&state, &format!("start {routine_id}")).await;
    assert_eq!(decision["decision"], "startFresh");
    assert_eq!(commands::current_route(&state).await, Route::Workout(routine_id.clone()));

    run(&state, "set 0 1 105 3").await;
    run(&state, "done 0 0").await;
    run(&state, "done 0 1").await;
    h.advance_secs(900);

    let record = run(&state, "finish").await;
    assert_eq!(record["durationSeconds"], 900);
    assert_eq!(record["totalVolume"], 815.0);

    let history = run(&state, "history").await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    let stats = run(&state, "stats").await;
    assert_eq!(stats["streakDays"], 1);
    assert_eq!(stats["week"]["workouts"], 1);
    assert_eq!(stats["personalRecords"][0]["maxWeight"], 105.0);

    assert_eq!(handle_line(&state, "quit").await, None);
}

#[tokio::test]
async fn shell_reports_errors_and_keeps_going() {
    let h = Harness::new();
    let state = h.app_state(None);

    let output = handle_line(&state, "pause").await.unwrap();
    assert!(output.starts_with("error:"), "{output}");
    let output = handle_line(&state, "start nope").await.unwrap();
    assert_eq!(output, "error: routine nope not found");
    assert_eq!(handle_line(&state, "").await.as_deref(), Some(""));

    let usage = handle_line(&state, "water").await.unwrap();
    assert!(usage.starts_with("error:"), "{usage}");
    assert!(usage.contains("Usage"), "{usage}");
    let help = handle_line(&state, "help").await.unwrap();
    assert!(help.contains("resume-draft"), "{help}");
}

#[tokio::test]
async fn failed_session_delete_rolls_the_list_back() {
    let h = Harness::new();
    let state = h.app_state(None);

    session::start_empty_session(&state, "Quick").await.unwrap();
    h.advance_secs(60);
    let record = session::finish_session(&state).await.unwrap();
    assert_eq!(commands::list_history(&state).await.unwrap().len(), 1);

    h.backend.set_failing(true);
    let err = commands::delete_session(&state, &record.id).await.unwrap_err();
    assert!(err.contains("backend unavailable"));
    assert_eq!(state.history.lock().await.len(), 1);

    h.backend.set_failing(false);
    assert!(commands::delete_session(&state, &record.id).await.unwrap().is_empty());
    assert!(h.backend.get_session(&record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_routine_delete_rolls_the_list_back() {
    let h = Harness::new();
    let state = h.app_state(None);
    let routine = commands::create_routine(&state, "Arms", vec![common::exercise("Curl", 3, 12, 15.0)])
        .await
        .unwrap();
    commands::list_routines(&state).await.unwrap();

    h.backend.set_failing(true);
    assert!(commands::delete_routine(&state, &routine.id).await.is_err());
    let cached: Vec<String> = state.routines.lock().await.iter().map(|r| r.id.clone()).collect();
    assert_eq!(cached, [routine.id.clone()]);

    h.backend.set_failing(false);
    assert!(commands::delete_routine(&state, &routine.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn chat_failures_become_a_substituted_reply() {
    let h = Harness::new();
    let ai = fake_ai();
    let state = h.app_state(Some(ai.clone() as Arc<dyn AiService>));

    let first = commands::chat(&state, "How many sets?").await.unwrap();
    assert!(!first.failed);
    assert_eq!(first.text, "How many sets? (0 earlier turns)");
    let second = commands::chat(&state, "And reps?").await.unwrap();
    assert_eq!(second.text, "And reps? (2 earlier turns)");

    ai.rate_limited.store(true, Ordering::SeqCst);
    let limited = commands::chat(&state, "Hello?").await.unwrap();
    assert!(limited.failed);
    assert_eq!(limited.text, "Slow down, try again in 5 seconds.");
    assert_eq!(state.chat_history.lock().await.len(), 4);
    assert_eq!(ai.chat_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn ai_commands_without_a_key_explain_themselves() {
    let h = Harness::new();
    let state = h.app_state(None);

    let reply = commands::chat(&state, "hi").await.unwrap();
    assert!(reply.failed);
    assert!(reply.text.contains("GEMINI_API_KEY"));
    let err = commands::generate_routines(&state, "3 day split").await.unwrap_err();
    assert!(err.contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn generated_routines_are_saved() {
    let h = Harness::new();
    let state = h.app_state(Some(fake_ai() as Arc<dyn AiService>));

    let saved = commands::generate_routines(&state, "beginner full body").await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].exercises[0].target_weight, Some(60.0));
    assert_eq!(saved[0].exercises[1].target_weight, None);
    assert_eq!(commands::list_routines(&state).await.unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_generation_saves_nothing() {
    let h = Harness::new();
    let ai = Arc::new(FakeAi::new("I can't do that right now.", FOOD_REPLY));
    let state = h.app_state(Some(ai as Arc<dyn AiService>));

    let err = commands::generate_routines(&state, "anything").await.unwrap_err();
    assert!(err.contains("couldn't be understood"));
    assert!(commands::list_routines(&state).await.unwrap().is_empty());
}

#[tokio::test]
async fn food_photo_items_are_logged_and_totalled() {
    let h = Harness::new();
    let state = h.app_state(Some(fake_ai() as Arc<dyn AiService>));
    let photo = h.dir.path().join("plate.jpg");
    std::fs::write(&photo, b"jpeg bytes").unwrap();

    let result = commands::log_food_photo(&state, &photo, Meal::Breakfast).await.unwrap();
    assert_eq!(result.logged.len(), 2);
    assert_eq!(result.analysis.notes, "Looks like breakfast");

    let day = commands::nutrition_day(&state, state.today()).await.unwrap();
    assert_eq!(day.totals.consumed.calories, 300.0);
    assert_eq!(day.totals.calories_remaining, 1900.0);
    assert_eq!(day.logs.len(), 2);
}

#[tokio::test]
async fn water_progress_uses_the_profile_goal() {
    let h = Harness::new();
    let state = h.app_state(None);
    commands::update_goals(&state, None, None, Some(2000)).await.unwrap();

    commands::log_water(&state, 500).await.unwrap();
    let progress = commands::log_water(&state, 500).await.unwrap();
    assert_eq!(progress.total_ml, 1000);
    assert_eq!(progress.goal_ml, 2000);
    assert_eq!(progress.percent, 50.0);
    assert!(commands::log_water(&state, 0).await.is_err());
}

#[tokio::test]
async fn weights_are_entered_in_the_display_unit() {
    let h = Harness::new();
    let state = h.app_state(None);

    run(&state, "settings --unit lbs").await;
    let entry = run(&state, "weight 220.462 after holidays").await;
    let kg = entry["weightKg"].as_f64().unwrap();
    assert!((kg - 100.0).abs() < 0.01);
    assert_eq!(entry["note"], "after holidays");

    let trend = commands::weight_trend(&state, 30).await.unwrap().unwrap();
    assert!((trend.latest_kg - 100.0).abs() < 0.01);
}

#[tokio::test]
async fn routes_follow_navigation_and_workouts() {
    let h = Harness::new();
    let state = h.app_state(None);

    assert_eq!(run(&state, "route #/history/abc").await, "#/history/abc");
    assert_eq!(run(&state, "route #/bogus").await, "#/");
    assert_eq!(run(&state, "route").await, "#/");
}

#[tokio::test]
async fn trainer_commands_link_and_assign() {
    let h = Harness::new();
    let coach_profile = {
        let mut profile = UserProfile::new("coach", "Coach");
        profile.role = UserRole::Trainer;
        profile
    };
    h.backend.save_profile(&coach_profile).await.unwrap();

    let state = h.app_state(None);
    let me = commands::link_trainer(&state, "coach").await.unwrap();
    assert_eq!(me.trainer_id.as_deref(), Some("coach"));

    let trainees = h.backend.list_trainees("coach").await.unwrap();
    assert_eq!(trainees.len(), 1);
    assert_eq!(trainees[0].id, common::USER);
}

#[tokio::test]
async fn nutrition_and_weight_deletes_roll_back_on_failure() {
    let h = Harness::new();
    let state = h.app_state(None);

    let food = run(&state, "food lunch Wrap 450 30 40 15").await;
    let food_id = food["id"].as_str().unwrap().to_string();
    commands::log_water(&state, 300).await.unwrap();
    let entry = commands::log_weight(&state, 81.0, None).await.unwrap();

    let day = commands::nutrition_day(&state, state.today()).await.unwrap();
    let water_id = day.water_logs[0].id.clone();
    assert_eq!(commands::list_weights(&state, 7).await.unwrap().len(), 1);

    h.backend.set_failing(true);
    assert!(commands::delete_food_log(&state, &food_id).await.is_err());
    assert!(commands::delete_water_log(&state, &water_id).await.is_err());
    assert!(commands::delete_weight(&state, &entry.id).await.is_err());
    assert_eq!(state.food_logs.lock().await.len(), 1);
    assert_eq!(state.water_logs.lock().await.len(), 1);
    assert_eq!(state.body_weights.lock().await.len(), 1);

    h.backend.set_failing(false);
    assert!(commands::delete_food_log(&state, &food_id).await.unwrap().is_empty());
    assert!(commands::delete_water_log(&state, &water_id).await.unwrap().is_empty());
    assert!(commands::delete_weight(&state, &entry.id).await.unwrap().is_empty());

    let day = commands::nutrition_day(&state, state.today()).await.unwrap();
    assert_eq!(day.totals.consumed.calories, 0.0);
    assert_eq!(day.water.total_ml, 0);
}

#[tokio::test]
async fn shell_edits_the_live_session() {
    let h = Harness::new();
    let state = h.app_state(None);
    h.backend.save_routine(&common::push_day()).await.unwrap();

    run(&state, "start push").await;
    run(&state, "move 2 0").await;
    run(&state, "add-set 0").await;
    run(&state, "remove-set 0 0").await;
    run(&state, r#"notes "short on time""#).await;

    let status = run(&state, "status").await;
    let exercises = status["session"]["exercises"].as_array().unwrap();
    assert_eq!(exercises[0]["name"], "Dips");
    assert_eq!(exercises[0]["sets"].as_array().unwrap().len(), 3);
    assert_eq!(status["session"]["notes"], "short on time");
}
