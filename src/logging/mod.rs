//! Logging and observability
//!
//! Structured logging with `tracing`: console output plus an optional
//! rotating JSON file. Log records carry lengths, counts, types and
//! offsets, never document or entity text.
//!
//! # Example
//!
//! ```no_run
//! use vigil::logging::init_logging;
//! use vigil::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a detection run
///
/// # Example
///
/// ```no_run
/// use vigil::log_detection_start;
///
/// log_detection_start!("run-1", 1024);
/// ```
#[macro_export]
macro_rules! log_detection_start {
    ($run_id:expr, $text_len:expr) => {
        tracing::info!(
            run_id = %$run_id,
            text_len = $text_len,
            "Starting detection"
        );
    };
}

/// Log the completion of a detection run
///
/// # Example
///
/// ```no_run
/// use vigil::log_detection_complete;
///
/// log_detection_complete!("run-1", 12, 2, false, 35u64);
/// ```
#[macro_export]
macro_rules! log_detection_complete {
    ($run_id:expr, $entities:expr, $addresses:expr, $partial:expr, $duration_ms:expr) => {
        tracing::info!(
            run_id = %$run_id,
            entities = $entities,
            addresses = $addresses,
            partial = $partial,
            duration_ms = $duration_ms,
            "Detection completed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use vigil::log_error_with_context;
/// use vigil::domain::VigilError;
///
/// let error = VigilError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a pass that did not run
///
/// # Example
///
/// ```no_run
/// use vigil::log_pass_skipped;
///
/// log_pass_skipped!("address linking", "cancelled");
/// ```
#[macro_export]
macro_rules! log_pass_skipped {
    ($pass:expr, $reason:expr) => {
        tracing::warn!(
            pass = $pass,
            reason = $reason,
            "Detection pass skipped"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use vigil::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Inference timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
