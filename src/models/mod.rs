pub mod session;

pub use session::{LoggedExercise, SetEntry, SetPatch, TrackingType, WorkoutSession};
