//! `log` macros that can be silenced per module.
//!
//! A module opts in by declaring `const ENABLE_LOGS: bool` and importing the macros from the
//! crate root (`use crate::{log_info, log_warn};`). Flipping the const to `false` mutes that
//! module without touching `RUST_LOG`.

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
