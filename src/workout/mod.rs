pub mod arbitration;
pub mod progression;

pub use arbitration::{arbitrate_start, RestoreGuard, StartDecision};
pub use progression::{
    ExerciseStats, ExerciseSummary, FinishExerciseOutcome, NextStep, StatsDiff,
};
