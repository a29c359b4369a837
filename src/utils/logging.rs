//! Conditional logging macros gated on a module-level `ENABLE_LOGS` const.
//!
//! Modules that log on a hot path (the sampling loop) define
//! `const ENABLE_LOGS: bool = ...;` and use these instead of `log::*`
//! directly, so per-tick chatter can be switched off without touching call
//! sites.

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
