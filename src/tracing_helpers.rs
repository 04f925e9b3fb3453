//! Logging macros for the tree's structural events.
//!
//! With the `tracing` feature each macro forwards to the matching `tracing`
//! event macro; without it the macro expands to nothing. Levels in use:
//!
//! - `trace_log!`: node splits, copy-on-write copies, sibling merges
//! - `debug_log!`: root growth and collapse, grafts, freezing
//! - `warn_log!`: an indexer falling out of sync
//! - `error_log!`: a structural inconsistency met during a mutation
//!
//! ```bash
//! RUST_LOG=atree=trace cargo test --features tracing
//! ```

#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        tracing::warn!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! warn_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! error_log {
    ($($arg:tt)*) => {
        tracing::error!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! error_log {
    ($($arg:tt)*) => {};
}

pub(crate) use debug_log;
pub(crate) use error_log;
pub(crate) use trace_log;
pub(crate) use warn_log;
