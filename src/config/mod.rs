//! Configuration management for Vigil.
//!
//! This module provides TOML-based configuration loading, parsing, and
//! validation.
//!
//! # Overview
//!
//! Vigil uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `VIGIL_*` environment overrides
//! - Default values for every setting
//! - Validation on load
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vigil::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("vigil.toml")?;
//!
//! println!("Max tokens per chunk: {}", config.detection.chunking.max_tokens);
//! println!("Auto-anonymize at: {}", config.detection.review.auto_anonymize_at);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`DetectionConfig`] - Detection pipeline settings, per run
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [detection]
//! model_confidence_threshold = 0.3
//! language_hints = ["de", "fr"]
//! pattern_library = "${VIGIL_PATTERNS}"
//!
//! [detection.review]
//! review_below = 0.6
//! auto_anonymize_at = 0.8
//!
//! [logging]
//! local_enabled = true
//! local_path = "/var/log/vigil"
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use crate::detection::config::DetectionConfig;
pub use loader::load_config;
pub use schema::{ApplicationConfig, LoggingConfig, VigilConfig};
