pub mod connection;
pub mod helpers;
mod migrations;
pub mod models;
pub mod repositories;

pub use connection::Database;
pub use models::{
    BodyWeightEntry, CustomFood, FoodLog, FoodSource, Macros, Meal, Routine, RoutineExercise,
    SessionRecord, UserProfile, UserRole, WaterLog,
};
