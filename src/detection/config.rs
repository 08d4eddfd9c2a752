//! Detection configuration
//!
//! Everything a single document-processing run consumes: model threshold,
//! chunking, retry policy, review thresholds, rule sets and language hints.

use crate::domain::{DocumentType, Language};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-run detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Minimum score for statistical model predictions
    #[serde(default = "default_model_confidence_threshold")]
    pub model_confidence_threshold: f64,

    /// Chunking of long documents
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retry policy for inference calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Inference dispatch settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Review / auto-anonymize thresholds
    #[serde(default)]
    pub review: ReviewThresholds,

    /// Document-type rule sets
    #[serde(default)]
    pub rules: RulesConfig,

    /// Context scoring
    #[serde(default)]
    pub context: ContextConfig,

    /// Address linking and scoring
    #[serde(default)]
    pub address: AddressConfig,

    /// Languages expected in the documents, most likely first
    #[serde(default)]
    pub language_hints: Vec<Language>,

    /// Path to a pattern library TOML file replacing the built-in one
    #[serde(default)]
    pub pattern_library: Option<PathBuf>,

    /// Number of inference metrics retained
    #[serde(default = "default_metrics_capacity")]
    pub metrics_capacity: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_confidence_threshold: default_model_confidence_threshold(),
            chunking: ChunkingConfig::default(),
            retry: RetryConfig::default(),
            inference: InferenceConfig::default(),
            review: ReviewThresholds::default(),
            rules: RulesConfig::default(),
            context: ContextConfig::default(),
            address: AddressConfig::default(),
            language_hints: Vec::new(),
            pattern_library: None,
            metrics_capacity: default_metrics_capacity(),
        }
    }
}

impl DetectionConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.model_confidence_threshold) {
            anyhow::bail!(
                "detection.model_confidence_threshold must be within [0, 1], got {}",
                self.model_confidence_threshold
            );
        }

        if let Some(ref path) = self.pattern_library {
            if !path.exists() {
                anyhow::bail!("Pattern library file not found: {}", path.display());
            }
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                anyhow::bail!("Pattern library must be a TOML file: {}", path.display());
            }
        }

        if self.metrics_capacity == 0 {
            anyhow::bail!("detection.metrics_capacity must be > 0");
        }

        self.chunking.validate().context("Invalid chunking configuration")?;
        self.retry.validate().context("Invalid retry configuration")?;
        self.inference.validate().context("Invalid inference configuration")?;
        self.review.validate().context("Invalid review thresholds")?;
        self.rules.validate().context("Invalid rules configuration")?;
        self.address.validate().context("Invalid address configuration")?;

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("VIGIL_DETECTION_MODEL_CONFIDENCE_THRESHOLD") {
            self.model_confidence_threshold = val
                .parse()
                .context("Invalid VIGIL_DETECTION_MODEL_CONFIDENCE_THRESHOLD value")?;
        }

        if let Ok(val) = std::env::var("VIGIL_DETECTION_MAX_TOKENS") {
            self.chunking.max_tokens = val
                .parse()
                .context("Invalid VIGIL_DETECTION_MAX_TOKENS value")?;
        }

        if let Ok(val) = std::env::var("VIGIL_DETECTION_OVERLAP_TOKENS") {
            self.chunking.overlap_tokens = val
                .parse()
                .context("Invalid VIGIL_DETECTION_OVERLAP_TOKENS value")?;
        }

        if let Ok(val) = std::env::var("VIGIL_DETECTION_MAX_RETRIES") {
            self.retry.max_retries = val
                .parse()
                .context("Invalid VIGIL_DETECTION_MAX_RETRIES value")?;
        }

        if let Ok(val) = std::env::var("VIGIL_DETECTION_INFERENCE_ENABLED") {
            self.inference.enabled = val
                .parse()
                .context("Invalid VIGIL_DETECTION_INFERENCE_ENABLED value")?;
        }

        if let Ok(val) = std::env::var("VIGIL_DETECTION_INFERENCE_TIMEOUT_MS") {
            self.inference.timeout_ms = val
                .parse()
                .context("Invalid VIGIL_DETECTION_INFERENCE_TIMEOUT_MS value")?;
        }

        if let Ok(val) = std::env::var("VIGIL_DETECTION_LANGUAGE_HINTS") {
            self.language_hints = val
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|code| {
                    Language::from_code(code)
                        .with_context(|| format!("Invalid language hint: {code}"))
                })
                .collect::<Result<Vec<_>>>()?;
        }

        if let Ok(val) = std::env::var("VIGIL_DETECTION_PATTERN_LIBRARY") {
            self.pattern_library = Some(PathBuf::from(val));
        }

        Ok(())
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum estimated tokens per chunk
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Tokens carried from the end of one chunk into the next
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

impl ChunkingConfig {
    fn validate(&self) -> Result<()> {
        if self.max_tokens == 0 {
            anyhow::bail!("chunking.max_tokens must be > 0");
        }
        if self.overlap_tokens >= self.max_tokens {
            anyhow::bail!(
                "chunking.overlap_tokens ({}) must be smaller than max_tokens ({})",
                self.overlap_tokens,
                self.max_tokens
            );
        }
        Ok(())
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
        }
    }
}

impl RetryConfig {
    fn validate(&self) -> Result<()> {
        if self.max_retries == 0 || self.max_retries > 10 {
            anyhow::bail!(
                "retry.max_retries must be between 1 and 10, got {}",
                self.max_retries
            );
        }
        if self.backoff_multiplier < 1.0 {
            anyhow::bail!(
                "retry.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            );
        }
        if self.initial_delay_ms > self.max_delay_ms {
            anyhow::bail!(
                "retry.initial_delay_ms ({}) must not exceed max_delay_ms ({})",
                self.initial_delay_ms,
                self.max_delay_ms
            );
        }
        Ok(())
    }
}

/// Inference dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Run the statistical model pass
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Timeout of a single inference attempt in milliseconds
    #[serde(default = "default_inference_timeout_ms")]
    pub timeout_ms: u64,

    /// Chunks of one document inferred concurrently
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,

    /// Hard ceiling on model input size in bytes
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_inference_timeout_ms(),
            max_concurrent_chunks: default_max_concurrent_chunks(),
            max_input_bytes: default_max_input_bytes(),
        }
    }
}

impl InferenceConfig {
    fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            anyhow::bail!("inference.timeout_ms must be > 0");
        }
        if self.max_concurrent_chunks == 0 || self.max_concurrent_chunks > 64 {
            anyhow::bail!(
                "inference.max_concurrent_chunks must be between 1 and 64, got {}",
                self.max_concurrent_chunks
            );
        }
        if self.max_input_bytes == 0 {
            anyhow::bail!("inference.max_input_bytes must be > 0");
        }
        Ok(())
    }
}

/// Review and auto-anonymize thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReviewThresholds {
    /// Below this confidence a detection is flagged for review
    #[serde(default = "default_review_below")]
    pub review_below: f64,

    /// At or above this confidence a detection is auto-anonymized
    #[serde(default = "default_auto_anonymize_at")]
    pub auto_anonymize_at: f64,
}

impl Default for ReviewThresholds {
    fn default() -> Self {
        Self {
            review_below: default_review_below(),
            auto_anonymize_at: default_auto_anonymize_at(),
        }
    }
}

impl ReviewThresholds {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.review_below)
            || !(0.0..=1.0).contains(&self.auto_anonymize_at)
        {
            anyhow::bail!("review thresholds must be within [0, 1]");
        }
        if self.review_below > self.auto_anonymize_at {
            anyhow::bail!(
                "review.review_below ({}) must not exceed review.auto_anonymize_at ({})",
                self.review_below,
                self.auto_anonymize_at
            );
        }
        Ok(())
    }
}

/// Document-type rule configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Document types whose specific rules run; others get baseline rules only
    #[serde(default = "default_enabled_rule_sets")]
    pub enabled_rule_sets: Vec<DocumentType>,

    /// Confidence boost for extractions in the header or footer region
    #[serde(default = "default_position_boost")]
    pub position_boost: f64,

    /// Leading fraction of the text treated as header
    #[serde(default = "default_header_fraction")]
    pub header_fraction: f64,

    /// Trailing fraction of the text treated as footer / signature region
    #[serde(default = "default_footer_fraction")]
    pub footer_fraction: f64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enabled_rule_sets: default_enabled_rule_sets(),
            position_boost: default_position_boost(),
            header_fraction: default_header_fraction(),
            footer_fraction: default_footer_fraction(),
        }
    }
}

impl RulesConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.position_boost) {
            anyhow::bail!("rules.position_boost must be within [0, 1]");
        }
        if self.header_fraction <= 0.0 || self.footer_fraction <= 0.0 {
            anyhow::bail!("rules.header_fraction and rules.footer_fraction must be > 0");
        }
        if self.header_fraction + self.footer_fraction > 1.0 {
            anyhow::bail!("rules.header_fraction + rules.footer_fraction must not exceed 1.0");
        }
        Ok(())
    }

    /// Whether type-specific rules for `document_type` are enabled
    pub fn is_enabled(&self, document_type: DocumentType) -> bool {
        self.enabled_rule_sets.contains(&document_type)
    }
}

/// Context scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Characters before an entity searched for label keywords
    #[serde(default = "default_keyword_window")]
    pub keyword_window: usize,

    /// Boost when a matching label keyword precedes the entity
    #[serde(default = "default_keyword_boost")]
    pub keyword_boost: f64,

    /// Penalty when a misleading label precedes the entity
    #[serde(default = "default_negative_keyword_penalty")]
    pub negative_keyword_penalty: f64,

    /// Distance within which other entities count as a cluster
    #[serde(default = "default_cluster_radius")]
    pub cluster_radius: usize,

    /// Boost per high-confidence neighbour
    #[serde(default = "default_cluster_boost")]
    pub cluster_boost: f64,

    /// Cap on the total cluster boost
    #[serde(default = "default_cluster_boost_cap")]
    pub cluster_boost_cap: f64,

    /// Boost for entities in the header or footer region
    #[serde(default = "default_context_position_boost")]
    pub position_boost: f64,

    /// Leading fraction of the text treated as header
    #[serde(default = "default_header_fraction")]
    pub header_fraction: f64,

    /// Trailing fraction of the text treated as footer
    #[serde(default = "default_footer_fraction")]
    pub footer_fraction: f64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            keyword_window: default_keyword_window(),
            keyword_boost: default_keyword_boost(),
            negative_keyword_penalty: default_negative_keyword_penalty(),
            cluster_radius: default_cluster_radius(),
            cluster_boost: default_cluster_boost(),
            cluster_boost_cap: default_cluster_boost_cap(),
            position_boost: default_context_position_boost(),
            header_fraction: default_header_fraction(),
            footer_fraction: default_footer_fraction(),
        }
    }
}

/// How address score terms are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScoreCombination {
    /// Sum of capped terms divided by the sum of the caps
    #[default]
    Normalized,
    /// Sum of capped terms clamped to [0, 1]
    ClampedSum,
}

/// Address linking and scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressConfig {
    /// Maximum gap between components on one line
    #[serde(default = "default_proximity_threshold")]
    pub proximity_threshold: usize,

    /// Maximum gap between components across a line break
    #[serde(default = "default_multiline_threshold")]
    pub multiline_threshold: usize,

    /// Score combination function
    #[serde(default)]
    pub combination: ScoreCombination,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: default_proximity_threshold(),
            multiline_threshold: default_multiline_threshold(),
            combination: ScoreCombination::default(),
        }
    }
}

impl AddressConfig {
    fn validate(&self) -> Result<()> {
        if self.multiline_threshold < self.proximity_threshold {
            anyhow::bail!(
                "address.multiline_threshold ({}) must be >= proximity_threshold ({})",
                self.multiline_threshold,
                self.proximity_threshold
            );
        }
        Ok(())
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_model_confidence_threshold() -> f64 {
    0.3
}

fn default_metrics_capacity() -> usize {
    1000
}

fn default_max_tokens() -> usize {
    512
}

fn default_overlap_tokens() -> usize {
    50
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_inference_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrent_chunks() -> usize {
    4
}

fn default_max_input_bytes() -> usize {
    100_000
}

fn default_review_below() -> f64 {
    0.6
}

fn default_auto_anonymize_at() -> f64 {
    0.8
}

fn default_enabled_rule_sets() -> Vec<DocumentType> {
    DocumentType::CLASSIFIABLE.to_vec()
}

fn default_position_boost() -> f64 {
    0.15
}

fn default_header_fraction() -> f64 {
    0.2
}

fn default_footer_fraction() -> f64 {
    0.3
}

fn default_keyword_window() -> usize {
    50
}

fn default_keyword_boost() -> f64 {
    0.15
}

fn default_negative_keyword_penalty() -> f64 {
    0.2
}

fn default_cluster_radius() -> usize {
    100
}

fn default_cluster_boost() -> f64 {
    0.05
}

fn default_cluster_boost_cap() -> f64 {
    0.1
}

fn default_context_position_boost() -> f64 {
    0.05
}

fn default_proximity_threshold() -> usize {
    50
}

fn default_multiline_threshold() -> usize {
    100
}
