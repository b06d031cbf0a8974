pub mod clock;
pub mod commands;
pub mod controller;
pub mod rest;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{ExerciseAdvance, SessionController, SessionEvent, SessionSnapshot};
pub use rest::RestTimer;
pub use state::{ClockStatus, SessionClock, SessionError};
