//! Line-oriented command shell. One command per line; results print as JSON, failures as
//! `error: ...`. The grammar is a clap multicall parser, so `help` and usage come from clap.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::{
    commands::{self, NewFood},
    db::models::{FoodSource, Macros, Meal, RoutineExercise},
    models::TrackingType,
    settings::WeightUnit,
    timer::commands as session,
    AppState,
};

/// One shell line. The first token names the command.
#[derive(Debug, Parser)]
#[command(
    name = "fitlog",
    multicall = true,
    subcommand_value_name = "COMMAND",
    subcommand_help_heading = "Commands",
    after_help = "Indices are zero-based. Weights are in the unit from `settings`."
)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum ShellCommand {
    /// Start or open a routine's workout
    Start {
        #[arg(required_unless_present = "empty", conflicts_with = "empty")]
        routine_id: Option<String>,
        /// Start a session with no routine behind it
        #[arg(long, value_name = "NAME")]
        empty: Option<String>,
    },
    /// Resume today's abandoned draft
    ResumeDraft,
    /// Start fresh instead of resuming the draft
    DeclineDraft { routine_id: String },
    /// Pause the session clock
    Pause,
    /// Resume the session clock
    Resume,
    /// Show the live session
    Status,
    /// Add an exercise to the live session
    AddExercise {
        name: String,
        /// weightReps, repsOnly, duration or distanceDuration
        tracking_type: Option<String>,
    },
    /// Remove an exercise from the live session
    RemoveExercise { index: usize },
    /// Jump to an exercise
    Select { index: usize },
    /// Reorder an exercise
    #[command(name = "move")]
    MoveExercise { from: usize, to: usize },
    /// Add a set, copying the previous one
    AddSet { exercise: usize },
    /// Change a set's weight and reps
    #[command(name = "set")]
    UpdateSet {
        exercise: usize,
        set: usize,
        weight: Option<f64>,
        reps: Option<u32>,
    },
    /// Toggle a set's completion
    #[command(name = "done")]
    ToggleSet { exercise: usize, set: usize },
    /// Remove a set
    RemoveSet { exercise: usize, set: usize },
    /// Replace the session notes; no text clears them
    Notes {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Finish the active exercise and move on
    Next,
    /// Finish and save the session
    Finish,
    /// Drop the session into the abandoned slot
    Discard,
    /// Re-open a finished session for corrections
    Edit { session_id: String },
    /// Extend the rest countdown (+<secs>) or skip it
    Rest {
        #[arg(value_parser = rest_action, allow_hyphen_values = true)]
        action: RestAction,
    },
    /// List routines
    Routines,
    /// Create a routine from name:sets:reps[:weight] specs
    NewRoutine {
        name: String,
        #[arg(value_parser = routine_exercise)]
        exercises: Vec<RoutineExercise>,
    },
    /// Delete a routine
    DeleteRoutine { routine_id: String },
    /// List finished sessions
    History,
    /// Delete a finished session
    DeleteSession { session_id: String },
    /// Per-session history of one exercise
    #[command(name = "exercise")]
    ExerciseHistory {
        #[arg(required = true, trailing_var_arg = true)]
        name: Vec<String>,
    },
    /// Weekly summary, streak and personal records
    Stats,
    /// Log body weight, or show the trend without a value
    Weight {
        value: Option<f64>,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        note: Vec<String>,
    },
    /// List body-weight entries
    Weights {
        #[arg(default_value_t = 30)]
        days: i64,
    },
    /// Delete a body-weight entry
    DeleteWeight { entry_id: String },
    /// Log water in millilitres
    Water { amount_ml: u32 },
    /// Food, water and goals for a day (YYYY-MM-DD, default today)
    Nutrition { day: Option<NaiveDate> },
    /// Log a food entry
    Food {
        #[arg(value_parser = meal)]
        meal: Meal,
        name: String,
        calories: f64,
        protein: f64,
        carbs: f64,
        fats: f64,
        #[arg(default_value_t = 1.0)]
        quantity: f64,
        #[arg(default_value = "serving")]
        unit: String,
    },
    /// Delete a food entry
    DeleteFood { log_id: String },
    /// Delete a water entry
    DeleteWater { log_id: String },
    /// Save or log a custom food
    CustomFood {
        #[command(subcommand)]
        action: CustomFoodAction,
    },
    /// Recognise and log the food in a photo
    FoodPhoto {
        #[arg(value_parser = meal)]
        meal: Meal,
        path: PathBuf,
    },
    /// Talk to the coach
    Chat {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },
    /// Generate and save routines from a description
    Generate {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Show the current route, or navigate to one
    Route { hash: Option<String> },
    /// Show or change settings
    Settings {
        #[arg(long, value_parser = weight_unit)]
        unit: Option<WeightUnit>,
        /// Default rest seconds
        #[arg(long)]
        rest: Option<u32>,
        /// Delete the abandoned draft when declining to resume it
        #[arg(long, value_name = "BOOL", action = ArgAction::Set)]
        discard: Option<bool>,
    },
    /// Show the profile
    Profile,
    /// Set daily goals
    Goals {
        calories: u32,
        protein: u32,
        water_ml: u32,
    },
    /// Trainer and trainee links
    Trainer {
        #[command(subcommand)]
        action: TrainerAction,
    },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestAction {
    Add(u32),
    Skip,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum CustomFoodAction {
    /// Save a food with its serving size
    Add {
        name: String,
        calories: f64,
        protein: f64,
        carbs: f64,
        fats: f64,
        serving_quantity: f64,
        serving_unit: String,
    },
    /// Log a saved food, scaled to the quantity
    Log {
        #[arg(value_parser = meal)]
        meal: Meal,
        name: String,
        quantity: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum TrainerAction {
    /// Switch this profile to the trainer role
    Become,
    /// Link this profile to a trainer
    Link { trainer_id: String },
    /// List linked trainees
    Trainees,
    /// Copy a routine to a trainee
    Assign { trainee_id: String, routine_id: String },
}

/// Splits on whitespace, keeping double-quoted runs together.
pub fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

fn meal(raw: &str) -> Result<Meal, String> {
    Meal::parse(&raw.to_lowercase())
        .ok_or_else(|| "expected breakfast, lunch, dinner or snack".to_string())
}

fn weight_unit(raw: &str) -> Result<WeightUnit, String> {
    match raw {
        "kg" => Ok(WeightUnit::Kg),
        "lbs" => Ok(WeightUnit::Lbs),
        _ => Err("expected kg or lbs".to_string()),
    }
}

fn rest_action(raw: &str) -> Result<RestAction, String> {
    if raw == "skip" {
        return Ok(RestAction::Skip);
    }
    raw.trim_start_matches('+')
        .parse()
        .map(RestAction::Add)
        .map_err(|_| "expected +<secs> or skip".to_string())
}

/// `name:sets:reps[:weight]`
fn routine_exercise(spec: &str) -> Result<RoutineExercise, String> {
    let parts: Vec<&str> = spec.split(':').collect();
    let (name, sets, reps, weight) = match parts.as_slice() {
        [name, sets, reps] => (*name, *sets, *reps, None),
        [name, sets, reps, weight] => (*name, *sets, *reps, Some(*weight)),
        _ => return Err("expected name:sets:reps[:weight]".to_string()),
    };
    let bad = |what: &str| format!("{what} must be a number");
    Ok(RoutineExercise {
        name: name.to_string(),
        tracking_type: TrackingType::default(),
        target_sets: sets.parse().map_err(|_| bad("sets"))?,
        target_reps: reps.parse().map_err(|_| bad("reps"))?,
        target_weight: weight
            .map(|w| w.parse().map_err(|_| bad("weight")))
            .transpose()?,
        rest_seconds: None,
    })
}

/// `Ok(None)` for a blank line. Help requests come back as an error of kind
/// [`ErrorKind::DisplayHelp`] carrying the rendered help.
pub fn parse_line(line: &str) -> Result<Option<ShellCommand>, clap::Error> {
    let tokens = tokenize(line).map_err(|reason| {
        ShellLine::command().error(ErrorKind::InvalidValue, reason)
    })?;
    if tokens.is_empty() {
        return Ok(None);
    }
    ShellLine::try_parse_from(tokens).map(|line| Some(line.command))
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Output(Value),
    Quit,
}

fn json<T: Serialize>(value: T) -> Result<Outcome, String> {
    serde_json::to_value(value)
        .map(Outcome::Output)
        .map_err(|e| e.to_string())
}

pub async fn execute(state: &AppState, command: ShellCommand) -> Result<Outcome, String> {
    use ShellCommand as C;

    match command {
        C::Start {
            empty: Some(name), ..
        } => json(session::start_empty_session(state, &name).await?),
        C::Start {
            routine_id: Some(routine_id),
            ..
        } => json(session::start_routine(state, &routine_id).await?),
        C::Start { .. } => Err("start needs a routine id or --empty <NAME>".to_string()),
        C::ResumeDraft => json(session::resume_draft(state).await?),
        C::DeclineDraft { routine_id } => json(session::decline_draft(state, &routine_id).await?),
        C::Pause => json(session::pause_session(state).await?),
        C::Resume => json(session::resume_session(state).await?),
        C::Status => json(session::get_session_state(state).await?),
        C::AddExercise {
            name,
            tracking_type,
        } => json(session::add_exercise(state, &name, tracking_type.as_deref()).await?),
        C::RemoveExercise { index } => json(session::remove_exercise(state, index).await?),
        C::Select { index } => json(session::select_exercise(state, index).await?),
        C::MoveExercise { from, to } => json(session::move_exercise(state, from, to).await?),
        C::AddSet { exercise } => json(session::add_set(state, exercise).await?),
        C::UpdateSet {
            exercise,
            set,
            weight,
            reps,
        } => json(session::update_set(state, exercise, set, weight, reps).await?),
        C::ToggleSet { exercise, set } => json(session::toggle_set(state, exercise, set).await?),
        C::RemoveSet { exercise, set } => json(session::remove_set(state, exercise, set).await?),
        C::Notes { text } => json(session::set_notes(state, &text.join(" ")).await?),
        C::Next => json(session::finish_exercise(state).await?),
        C::Finish => json(session::finish_session(state).await?),
        C::Discard => json(session::discard_session(state).await?),
        C::Edit { session_id } => json(session::edit_session(state, &session_id).await?),
        C::Rest {
            action: RestAction::Add(secs),
        } => json(session::add_rest(state, secs).await?),
        C::Rest {
            action: RestAction::Skip,
        } => json(session::skip_rest(state).await?),
        C::Routines => json(commands::list_routines(state).await?),
        C::NewRoutine { name, exercises } => {
            json(commands::create_routine(state, &name, exercises).await?)
        }
        C::DeleteRoutine { routine_id } => {
            json(commands::delete_routine(state, &routine_id).await?)
        }
        C::History => json(commands::list_history(state).await?),
        C::DeleteSession { session_id } => {
            json(commands::delete_session(state, &session_id).await?)
        }
        C::ExerciseHistory { name } => {
            json(commands::exercise_history(state, &name.join(" ")).await?)
        }
        C::Stats => json(commands::dashboard_stats(state).await?),
        C::Weight {
            value: Some(value),
            note,
        } => {
            let note = Some(note.join(" ")).filter(|n| !n.trim().is_empty());
            json(commands::log_weight(state, value, note).await?)
        }
        C::Weight { value: None, .. } => json(commands::weight_trend(state, 30).await?),
        C::Weights { days } => json(commands::list_weights(state, days).await?),
        C::DeleteWeight { entry_id } => json(commands::delete_weight(state, &entry_id).await?),
        C::DeleteFood { log_id } => json(commands::delete_food_log(state, &log_id).await?),
        C::DeleteWater { log_id } => json(commands::delete_water_log(state, &log_id).await?),
        C::Water { amount_ml } => json(commands::log_water(state, amount_ml).await?),
        C::Nutrition { day } => {
            let day = day.unwrap_or_else(|| state.today());
            json(commands::nutrition_day(state, day).await?)
        }
        C::Food {
            meal,
            name,
            calories,
            protein,
            carbs,
            fats,
            quantity,
            unit,
        } => json(
            commands::log_food(
                state,
                NewFood {
                    meal,
                    name: &name,
                    macros: Macros {
                        calories,
                        protein,
                        carbs,
                        fats,
                    },
                    quantity,
                    unit: &unit,
                    source: FoodSource::Manual,
                },
            )
            .await?,
        ),
        C::CustomFood {
            action:
                CustomFoodAction::Add {
                    name,
                    calories,
                    protein,
                    carbs,
                    fats,
                    serving_quantity,
                    serving_unit,
                },
        } => {
            let macros = Macros {
                calories,
                protein,
                carbs,
                fats,
            };
            json(
                commands::save_custom_food(state, &name, macros, serving_quantity, &serving_unit)
                    .await?,
            )
        }
        C::CustomFood {
            action:
                CustomFoodAction::Log {
                    meal,
                    name,
                    quantity,
                },
        } => json(commands::log_custom_food(state, meal, &name, quantity).await?),
        C::FoodPhoto { meal, path } => json(commands::log_food_photo(state, &path, meal).await?),
        C::Chat { message } => json(commands::chat(state, &message.join(" ")).await?),
        C::Generate { prompt } => {
            json(commands::generate_routines(state, &prompt.join(" ")).await?)
        }
        C::Route { hash: Some(hash) } => {
            let route = commands::navigate(state, &hash).await?;
            json(route.to_string())
        }
        C::Route { hash: None } => json(commands::current_route(state).await.to_string()),
        C::Settings {
            unit: None,
            rest: None,
            discard: None,
        } => json(commands::get_settings(state)),
        C::Settings {
            unit,
            rest,
            discard,
        } => json(commands::update_settings(state, unit, rest, discard)?),
        C::Profile => json(commands::get_profile(state).await?),
        C::Goals {
            calories,
            protein,
            water_ml,
        } => json(
            commands::update_goals(state, Some(calories), Some(protein), Some(water_ml)).await?,
        ),
        C::Trainer { action } => match action {
            TrainerAction::Become => json(commands::become_trainer(state).await?),
            TrainerAction::Link { trainer_id } => {
                json(commands::link_trainer(state, &trainer_id).await?)
            }
            TrainerAction::Trainees => json(commands::list_trainees(state).await?),
            TrainerAction::Assign {
                trainee_id,
                routine_id,
            } => json(commands::assign_routine(state, &trainee_id, &routine_id).await?),
        },
        C::Quit => Ok(Outcome::Quit),
    }
}

/// Parses and runs one line. `None` means the shell should stop.
pub async fn handle_line(state: &AppState, line: &str) -> Option<String> {
    let command = match parse_line(line) {
        Ok(Some(command)) => command,
        Ok(None) => return Some(String::new()),
        // clap renders help and usage errors itself; its errors already start with `error:`.
        Err(err) => return Some(err.to_string().trim_end().to_string()),
    };

    match execute(state, command).await {
        Ok(Outcome::Quit) => None,
        Ok(Outcome::Output(Value::String(text))) => Some(text),
        Ok(Outcome::Output(value)) => Some(
            serde_json::to_string_pretty(&value).unwrap_or_else(|e| format!("error: {e}")),
        ),
        Err(err) => Some(format!("error: {err}")),
    }
}

pub async fn run_stdio(state: &AppState) -> anyhow::Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    stdout.write_all(b"fitlog ready; type help\n").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let Some(output) = handle_line(state, &line).await else {
            break;
        };
        if !output.is_empty() {
            stdout.write_all(output.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ShellCommand {
        parse_line(line).unwrap().unwrap()
    }

    #[test]
    fn quotes_group_words() {
        assert_eq!(
            tokenize(r#"food lunch "chicken salad" 400 35 10 20"#).unwrap(),
            ["food", "lunch", "chicken salad", "400", "35", "10", "20"]
        );
        assert!(tokenize(r#"chat "oops"#).is_err());
        assert_eq!(tokenize(r#"x """#).unwrap(), ["x", ""]);
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn parses_session_commands() {
        assert_eq!(
            parse("start r1"),
            ShellCommand::Start {
                routine_id: Some("r1".into()),
                empty: None
            }
        );
        assert_eq!(
            parse(r#"start --empty "Quick pump""#),
            ShellCommand::Start {
                routine_id: None,
                empty: Some("Quick pump".into())
            }
        );
        assert_eq!(
            parse("set 0 1 82.5"),
            ShellCommand::UpdateSet {
                exercise: 0,
                set: 1,
                weight: Some(82.5),
                reps: None
            }
        );
        assert_eq!(
            parse("rest +30"),
            ShellCommand::Rest {
                action: RestAction::Add(30)
            }
        );
        assert_eq!(
            parse("rest skip"),
            ShellCommand::Rest {
                action: RestAction::Skip
            }
        );
        assert_eq!(parse("move 2 0"), ShellCommand::MoveExercise { from: 2, to: 0 });
        assert_eq!(
            parse("notes felt strong today"),
            ShellCommand::Notes {
                text: vec!["felt".into(), "strong".into(), "today".into()]
            }
        );
        assert_eq!(parse("exit"), ShellCommand::Quit);
    }

    #[test]
    fn parses_routine_specs() {
        match parse(r#"new-routine "Push Day" "Bench Press:3:8:60" Dips:3:12"#) {
            ShellCommand::NewRoutine { name, exercises } => {
                assert_eq!(name, "Push Day");
                assert_eq!(exercises.len(), 2);
                assert_eq!(exercises[0].target_weight, Some(60.0));
                assert_eq!(exercises[1].target_weight, None);
            }
            other => panic!("unexpected {other:?}"),
        }
        let err = parse_line("new-routine Push Bench:x:8").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_food_with_defaults() {
        match parse("food Breakfast Oats 300 10 50 6") {
            ShellCommand::Food {
                meal,
                quantity,
                unit,
                carbs,
                ..
            } => {
                assert_eq!(meal, Meal::Breakfast);
                assert_eq!(quantity, 1.0);
                assert_eq!(unit, "serving");
                assert_eq!(carbs, 50.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn parses_nested_actions() {
        assert_eq!(
            parse("trainer assign t1 r1"),
            ShellCommand::Trainer {
                action: TrainerAction::Assign {
                    trainee_id: "t1".into(),
                    routine_id: "r1".into()
                }
            }
        );
        assert!(matches!(
            parse("custom-food log snack Bar 2"),
            ShellCommand::CustomFood {
                action: CustomFoodAction::Log { meal: Meal::Snack, .. }
            }
        ));
    }

    #[test]
    fn parses_settings_flags() {
        assert_eq!(
            parse("settings --unit lbs --discard false"),
            ShellCommand::Settings {
                unit: Some(WeightUnit::Lbs),
                rest: None,
                discard: Some(false)
            }
        );
        assert!(parse_line("settings --colour red").is_err());
        assert!(parse_line("settings --unit stone").is_err());
    }

    #[test]
    fn reports_bad_input() {
        let err = parse_line("water lots").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert!(err.to_string().starts_with("error:"));

        let err = parse_line("frobnicate").unwrap_err();
        assert!(err.to_string().contains("frobnicate"));

        let err = parse_line("start").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = parse_line(r#"chat "oops"#).unwrap_err();
        assert!(err.to_string().contains("unterminated quote"));
    }

    #[test]
    fn help_lists_commands() {
        let err = parse_line("help").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        let text = err.to_string();
        assert!(text.contains("new-routine"));
        assert!(text.contains("food-photo"));
    }
}
