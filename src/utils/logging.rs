//! Logging macros gated by a module-level `ENABLE_LOGS` flag.
//!
//! A module opts in by declaring the flag and importing the macros:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn, log_error};
//!
//! log_info!("saved submission {}", id);
//! ```
//!
//! Output goes through the `log` facade, so `RUST_LOG` still filters it once
//! `env_logger` is installed by [`crate::run`].

/// Info-level log, emitted only when the calling module sets `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warn-level log, emitted only when the calling module sets `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level log, emitted only when the calling module sets `ENABLE_LOGS`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
