//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "vigil.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Vigil configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Validate configuration: vigil validate-config");
                println!("  3. Scan a document: vigil detect letter.txt");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Vigil Configuration File
# Multilingual PII detection for document text

[application]
log_level = "info"

[detection]
model_confidence_threshold = 0.3
language_hints = ["de", "fr"]

[detection.review]
review_below = 0.6
auto_anonymize_at = 0.8

[logging]
local_enabled = false
local_path = "logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with every option and comments
    fn generate_config_with_examples() -> String {
        r#"# Vigil Configuration File
# Multilingual PII detection for document text
#
# Values may reference environment variables with ${VAR_NAME}.
# VIGIL_* environment variables override values from this file.

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Detection
# ============================================================================
[detection]
# Minimum score for statistical model predictions
model_confidence_threshold = 0.3

# Languages to prefer when detection is ambiguous (de, fr, it, en)
language_hints = ["de", "fr"]

# Optional: replace the built-in pattern library
# pattern_library = "${VIGIL_PATTERNS}"

# Number of inference metrics kept in memory
metrics_capacity = 1000

[detection.chunking]
# Estimated tokens per model window, and tokens carried into the next window
max_tokens = 512
overlap_tokens = 50

[detection.retry]
# Attempts per chunk, including the first
max_retries = 3
initial_delay_ms = 100
backoff_multiplier = 2.0
max_delay_ms = 5000

[detection.inference]
# Run the statistical model (pattern detection always runs)
enabled = true
# Timeout of a single model call
timeout_ms = 30000
# Chunks of one document inferred at the same time
max_concurrent_chunks = 4
# Largest chunk the model accepts
max_input_bytes = 100000

[detection.review]
# Below this confidence a detection needs human review
review_below = 0.6
# At or above this confidence a detection is anonymized automatically
auto_anonymize_at = 0.8

[detection.rules]
# Document types whose specific rules run; others get baseline rules only
enabled_rule_sets = ["invoice", "letter", "contract", "report", "medical", "legal", "correspondence", "form"]
# Boost for extractions in the header (first 20%) or footer (last 30%)
position_boost = 0.15
header_fraction = 0.2
footer_fraction = 0.3

[detection.context]
# Characters before an entity searched for label keywords
keyword_window = 50
keyword_boost = 0.15
negative_keyword_penalty = 0.2
cluster_radius = 100
cluster_boost = 0.05
cluster_boost_cap = 0.1
position_boost = 0.05

[detection.address]
# Largest gap between components of one address, and the gap across a line break
proximity_threshold = 50
multiline_threshold = 100
# normalized | clamped_sum
combination = "normalized"

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON log file in addition to console output
local_enabled = false
local_path = "logs"
# daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}
