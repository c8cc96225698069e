#![deny(missing_docs)]
//! Shared logging utilities for the paper insight workspace.
//!
//! This crate provides the `paper_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger.
//!
//! Every macro accepts an optional `job: <id>;` prefix which tags the line
//! with the job identifier it concerns:
//!
//! ```ignore
//! paper_info!(job: job_id; "polling stopped after {} fetches", count);
//! paper_warn!("config file ignored: {}", reason);
//! ```

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! paper_trace {
    (job: $job:expr; $($arg:tt)*) => {{
        log::trace!("[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! paper_debug {
    (job: $job:expr; $($arg:tt)*) => {{
        log::debug!("[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! paper_info {
    (job: $job:expr; $($arg:tt)*) => {{
        log::info!("[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! paper_warn {
    (job: $job:expr; $($arg:tt)*) => {{
        log::warn!("[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! paper_error {
    (job: $job:expr; $($arg:tt)*) => {{
        log::error!("[job {}] {}", $job, format_args!($($arg)*));
    }};
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    #[test]
    fn job_prefixed_macros_expand() {
        super::initialize_for_tests();
        let job = "42";
        crate::paper_debug!(job: job; "fetch seq={}", 3);
        crate::paper_info!(job: job; "terminal status reached");
        crate::paper_warn!("plain line {}", 1);
    }
}
