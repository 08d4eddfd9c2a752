//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Vigil configuration file.

use crate::config::load_config;
use crate::domain::DocumentType;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as part of loading
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let detection = &config.detection;
        let rule_sets: Vec<&str> = DocumentType::CLASSIFIABLE
            .iter()
            .filter(|t| detection.rules.is_enabled(**t))
            .map(|t| t.as_str())
            .collect();
        let hints: Vec<&str> = detection.language_hints.iter().map(|l| l.code()).collect();

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!(
            "  Statistical Model: {}",
            if detection.inference.enabled { "enabled" } else { "disabled" }
        );
        println!(
            "  Model Confidence Threshold: {}",
            detection.model_confidence_threshold
        );
        println!(
            "  Chunking: {} tokens, {} overlap",
            detection.chunking.max_tokens, detection.chunking.overlap_tokens
        );
        println!(
            "  Retries: {} (initial {} ms, cap {} ms)",
            detection.retry.max_retries, detection.retry.initial_delay_ms, detection.retry.max_delay_ms
        );
        println!(
            "  Review Below / Auto-Anonymize At: {} / {}",
            detection.review.review_below, detection.review.auto_anonymize_at
        );
        println!("  Rule Sets: {}", rule_sets.join(", "));
        println!(
            "  Language Hints: {}",
            if hints.is_empty() { "none".to_string() } else { hints.join(", ") }
        );
        println!(
            "  Pattern Library: {}",
            detection
                .pattern_library
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in".to_string())
        );
        println!(
            "  File Logging: {}",
            if config.logging.local_enabled {
                config.logging.local_path.as_str()
            } else {
                "disabled"
            }
        );
        println!();
        Ok(0)
    }
}
