//! Detect command implementation
//!
//! This module implements the `detect` command: run the detection pipeline
//! over one plain-text file and print the outcome.

use crate::config::{load_config, VigilConfig};
use crate::detection::{DetectionPipeline, DetectionReport};
use crate::domain::{Document, Language};
use clap::{Args, ValueEnum};
use std::path::{Path, PathBuf};
use tokio::sync::watch;

/// Output format of the detect command
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable counts, no entity text
    #[default]
    Summary,
    /// Full outcome as JSON, including spans and entity text
    Json,
}

/// Arguments for the detect command
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// Plain-text file to scan
    pub file: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Summary)]
    pub format: OutputFormat,

    /// Language hint for the document (de, fr, it, en)
    #[arg(long, value_name = "CODE")]
    pub language: Option<String>,

    /// Skip the statistical model and run pattern detection only
    #[arg(long)]
    pub no_model: bool,
}

impl DetectArgs {
    /// Execute the detect command
    ///
    /// Exit codes: 0 complete, 3 partial, 2 configuration error, 5 fatal.
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file.display(), "Starting detect command");

        let mut config = match load_or_default(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        if self.no_model {
            tracing::info!("Disabling statistical model from CLI");
            config.detection.inference.enabled = false;
        }

        let language = match self.language.as_deref() {
            Some(code) => match Language::from_code(code) {
                Some(language) => Some(language),
                None => {
                    eprintln!("Invalid language: {code}. Use de, fr, it or en");
                    return Ok(2);
                }
            },
            None => None,
        };

        let text = match tokio::fs::read_to_string(&self.file).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(error = %e, file = %self.file.display(), "Failed to read input");
                eprintln!("Failed to read {}: {e}", self.file.display());
                return Ok(5);
            }
        };

        let mut document = Document::new(text);
        if let Some(name) = self.file.file_name() {
            document = document.with_filename(name.to_string_lossy());
        }
        if let Some(language) = language {
            document = document.with_language_hint(language);
        }

        let review = config.detection.review;
        let pipeline = match DetectionPipeline::new(config.detection) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create detection pipeline");
                eprintln!("Failed to initialize detection: {e:#}");
                return Ok(2);
            }
        };

        let outcome = match pipeline.process(&document, Some(&shutdown_signal)).await {
            Ok(o) => o,
            Err(e) => {
                crate::log_error_with_context!(e, "Detection failed");
                eprintln!("Detection failed: {e}");
                return Ok(5);
            }
        };

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
            OutputFormat::Summary => {
                let report = DetectionReport::from_outcome(&outcome, &review);
                print!("{}", report.format_console());
            }
        }

        Ok(if outcome.is_partial() { 3 } else { 0 })
    }
}

/// Load the configuration file, or defaults when it does not exist
///
/// Environment overrides still apply to the defaults.
pub fn load_or_default(config_path: &str) -> anyhow::Result<VigilConfig> {
    if Path::new(config_path).exists() {
        return Ok(load_config(config_path)?);
    }

    tracing::info!(config_path = %config_path, "No configuration file, using defaults");
    let mut config = VigilConfig::default();
    config.detection.apply_env_overrides()?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {e}"))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_config_falls_back_to_defaults() {
        let config = load_or_default("does-not-exist-vigil.toml").unwrap();
        assert_eq!(config.detection.chunking.max_tokens, 512);
    }

    #[tokio::test]
    async fn test_detect_complete_run() {
        let mut input = NamedTempFile::new().unwrap();
        writeln!(input, "Bitte senden Sie die Unterlagen an anna@example.ch.").unwrap();

        let args = DetectArgs {
            file: input.path().to_path_buf(),
            format: OutputFormat::Summary,
            language: Some("de".to_string()),
            no_model: true,
        };
        let (_tx, rx) = watch::channel(false);
        let code = args.execute("does-not-exist-vigil.toml", rx).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_detect_rejects_unknown_language() {
        let input = NamedTempFile::new().unwrap();
        let args = DetectArgs {
            file: input.path().to_path_buf(),
            format: OutputFormat::Json,
            language: Some("xx".to_string()),
            no_model: true,
        };
        let (_tx, rx) = watch::channel(false);
        let code = args.execute("does-not-exist-vigil.toml", rx).await.unwrap();
        assert_eq!(code, 2);
    }

    #[tokio::test]
    async fn test_detect_cancelled_is_partial() {
        let mut input = NamedTempFile::new().unwrap();
        writeln!(input, "Tel. 044 123 45 67").unwrap();

        let args = DetectArgs {
            file: input.path().to_path_buf(),
            format: OutputFormat::Summary,
            language: None,
            no_model: true,
        };
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let code = args.execute("does-not-exist-vigil.toml", rx).await.unwrap();
        assert_eq!(code, 3);
    }
}
