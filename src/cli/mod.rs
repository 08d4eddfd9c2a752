//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Vigil using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Vigil - multilingual PII detection
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(version, about, long_about = None)]
#[command(author = "Vigil Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "vigil.toml", env = "VIGIL_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "VIGIL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect PII in a plain-text document
    Detect(commands::detect::DetectArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use commands::detect::OutputFormat;

    #[test]
    fn test_cli_parse_detect() {
        let cli = Cli::parse_from(["vigil", "detect", "letter.txt"]);
        assert_eq!(cli.config, "vigil.toml");
        match cli.command {
            Commands::Detect(args) => {
                assert_eq!(args.file.to_string_lossy(), "letter.txt");
                assert_eq!(args.format, OutputFormat::Summary);
                assert!(!args.no_model);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_detect_options() {
        let cli = Cli::parse_from([
            "vigil",
            "detect",
            "letter.txt",
            "--format",
            "json",
            "--language",
            "fr",
            "--no-model",
        ]);
        match cli.command {
            Commands::Detect(args) => {
                assert_eq!(args.format, OutputFormat::Json);
                assert_eq!(args.language.as_deref(), Some("fr"));
                assert!(args.no_model);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["vigil", "--config", "custom.toml", "validate-config"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["vigil", "--log-level", "debug", "init"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
