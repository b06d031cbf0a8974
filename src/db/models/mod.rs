pub mod measurement;
pub mod nutrition;
pub mod profile;
pub mod routine;
pub mod session;

pub use measurement::BodyWeightEntry;
pub use nutrition::{CustomFood, FoodLog, FoodSource, Macros, Meal, WaterLog};
pub use profile::{UserProfile, UserRole};
pub use routine::{Routine, RoutineExercise};
pub use session::SessionRecord;
