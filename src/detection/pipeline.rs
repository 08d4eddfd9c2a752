//! Detection pipeline
//!
//! This module provides the [`DetectionPipeline`] that runs every detection
//! pass over one document, in order:
//!
//! 1. **Candidates**: pattern detector plus the statistical model per chunk
//! 2. **Validation**: format validators from the registry
//! 3. **Context**: keyword, cluster and position adjustments
//! 4. **Classification and rules**: document type, then type-specific extraction
//! 5. **Linking**: address components grouped into addresses
//! 6. **Scoring**: one confidence per grouped address
//!
//! Each pass consumes the output of the one before it. Cancellation is
//! checked between passes; a cancelled run returns what it has with a
//! [`ProcessingStatus::Partial`] status.
//!
//! # Examples
//!
//! ```no_run
//! use vigil::detection::{config::DetectionConfig, DetectionPipeline};
//! use vigil::domain::Document;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pipeline = DetectionPipeline::new(DetectionConfig::default())?;
//! let document = Document::new("Tel. 044 123 45 67");
//!
//! let outcome = pipeline.process(&document, None).await?;
//! println!("Detected {} entities", outcome.entities.len());
//! # Ok(())
//! # }
//! ```

use crate::detection::address::{AddressLinker, AddressScorer};
use crate::detection::candidates::{CandidateGenerator, ModelPassReport};
use crate::detection::classifier::DocumentClassifier;
use crate::detection::config::DetectionConfig;
use crate::detection::context::ContextScorer;
use crate::detection::detector::{EntityDetector, PatternDetector, PatternRegistry};
use crate::detection::metrics::{InferenceMetric, MetricsCollector, Platform};
use crate::detection::model::{InferenceDispatcher, LexiconModel, NerModel};
use crate::detection::rules::RuleEngine;
use crate::detection::validators::ValidatorRegistry;
use crate::domain::{
    Document, DocumentClassification, Entity, GroupedAddress, Language, Result, ValidationStatus,
};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Whether a run covered every pass and every chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Every pass ran and the model saw every chunk
    Complete,
    /// Something was skipped; a reviewer should double-check
    Partial { reasons: Vec<String> },
}

impl ProcessingStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Final result of one document run
///
/// Read-only once returned. Linked address components live only inside
/// their [`GroupedAddress`], never in `entities`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionOutcome {
    /// Run identifier used in logs
    pub run_id: String,
    /// Standalone entities in document order
    pub entities: Vec<Entity>,
    /// Scored addresses in document order
    pub addresses: Vec<GroupedAddress>,
    /// Document type and language
    pub classification: DocumentClassification,
    /// Complete or partial
    pub status: ProcessingStatus,
    /// Non-fatal problems met during the run
    pub warnings: Vec<String>,
    /// Wall time of the run
    pub processing_time_ms: u64,
}

impl DetectionOutcome {
    /// Whether the run was partial
    pub fn is_partial(&self) -> bool {
        !self.status.is_complete()
    }
}

/// Mutable state of a run in progress
struct RunState {
    run_id: String,
    started: Instant,
    entities: Vec<Entity>,
    addresses: Vec<GroupedAddress>,
    classification: DocumentClassification,
    reasons: Vec<String>,
    warnings: Vec<String>,
}

impl RunState {
    fn into_outcome(self) -> DetectionOutcome {
        let status = if self.reasons.is_empty() {
            ProcessingStatus::Complete
        } else {
            ProcessingStatus::Partial {
                reasons: self.reasons,
            }
        };
        DetectionOutcome {
            run_id: self.run_id,
            entities: self.entities,
            addresses: self.addresses,
            classification: self.classification,
            status,
            warnings: self.warnings,
            processing_time_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

/// Multi-pass PII detection pipeline
///
/// The pipeline holds only read-only components and can be shared across
/// tasks with `Arc`; every call to [`process`](Self::process) owns its own
/// entity collection.
pub struct DetectionPipeline {
    config: DetectionConfig,
    candidates: CandidateGenerator,
    validators: &'static ValidatorRegistry,
    context: ContextScorer,
    classifier: DocumentClassifier,
    rules: RuleEngine,
    linker: AddressLinker,
    scorer: AddressScorer,
    metrics: Arc<MetricsCollector>,
    model_name: Option<String>,
    platform: Platform,
}

impl DetectionPipeline {
    /// Create a pipeline with the built-in lexicon model
    ///
    /// The model is only started when `inference.enabled` is set. Starting
    /// it spawns a worker task, so this must run inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the pattern
    /// library cannot be loaded.
    pub fn new(config: DetectionConfig) -> anyhow::Result<Self> {
        let model: Option<Arc<dyn NerModel>> = if config.inference.enabled {
            Some(Arc::new(LexiconModel::new()))
        } else {
            None
        };
        Self::with_model(config, model)
    }

    /// Create a pipeline around a caller-supplied model, or none
    pub fn with_model(
        config: DetectionConfig,
        model: Option<Arc<dyn NerModel>>,
    ) -> anyhow::Result<Self> {
        let dispatcher = model.map(|model| {
            let depth = config.inference.max_concurrent_chunks.max(1) * 2;
            Arc::new(InferenceDispatcher::spawn(model, depth))
        });
        Self::with_dispatcher(config, dispatcher)
    }

    /// Create a pipeline around an already running dispatcher
    pub fn with_dispatcher(
        config: DetectionConfig,
        dispatcher: Option<Arc<InferenceDispatcher>>,
    ) -> anyhow::Result<Self> {
        config
            .validate()
            .context("Invalid detection configuration")?;

        let detector: Arc<dyn EntityDetector> = match config.pattern_library {
            Some(ref path) => {
                let registry = PatternRegistry::from_file(path).with_context(|| {
                    format!("Failed to load pattern library {}", path.display())
                })?;
                Arc::new(PatternDetector::with_registry(registry))
            }
            None => Arc::new(PatternDetector::new()?),
        };

        let metrics = Arc::new(MetricsCollector::new(config.metrics_capacity));
        let model_name = dispatcher.as_ref().map(|d| d.model_name().to_string());
        let candidates = CandidateGenerator::new(detector, dispatcher, Arc::clone(&metrics));

        tracing::info!(
            model = model_name.as_deref().unwrap_or("none"),
            inference_enabled = config.inference.enabled,
            custom_patterns = config.pattern_library.is_some(),
            "Detection pipeline ready"
        );

        Ok(Self {
            candidates,
            validators: ValidatorRegistry::global(),
            context: ContextScorer::new(&config.context),
            classifier: DocumentClassifier::new(config.language_hints.clone()),
            rules: RuleEngine::new(&config.rules),
            linker: AddressLinker::new(&config.address),
            scorer: AddressScorer::new(&config.address, config.review),
            metrics,
            model_name,
            platform: Platform::Cpu,
            config,
        })
    }

    /// Record a different inference platform in metrics
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Shared metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        Arc::clone(&self.metrics)
    }

    /// Run every pass over `document`
    ///
    /// # Errors
    ///
    /// Only pattern detection errors propagate. Model failures, skipped
    /// chunks and cancellation produce a [`ProcessingStatus::Partial`]
    /// outcome instead.
    pub async fn process(
        &self,
        document: &Document,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> Result<DetectionOutcome> {
        let text = document.text.as_str();
        let fallback_language = document
            .metadata
            .language_hint
            .or_else(|| self.config.language_hints.first().copied())
            .unwrap_or(Language::Unknown);

        let mut run = RunState {
            run_id: uuid::Uuid::new_v4().to_string(),
            started: Instant::now(),
            entities: Vec::new(),
            addresses: Vec::new(),
            classification: DocumentClassification::unknown(fallback_language),
            reasons: Vec::new(),
            warnings: Vec::new(),
        };
        crate::log_detection_start!(run.run_id, text.len());

        // Pass 1: candidates
        let candidates = self.candidates.generate(text, &self.config, cancel).await?;
        run.entities = candidates.entities;
        self.note_model_pass(&candidates.model, &mut run);
        if candidates.model.cancelled {
            return Ok(self.cancelled(run, "model inference"));
        }

        // Pass 2: format validation
        if is_cancelled(cancel) {
            return Ok(self.cancelled(run, "validation"));
        }
        self.validate(&mut run.entities, text);

        // Pass 3: context
        if is_cancelled(cancel) {
            return Ok(self.cancelled(run, "context scoring"));
        }
        self.context.apply(&mut run.entities, text);

        // Pass 4: classification and type rules
        if is_cancelled(cancel) {
            return Ok(self.cancelled(run, "classification"));
        }
        run.classification = self
            .classifier
            .classify(text, document.metadata.language_hint);
        let entities = std::mem::take(&mut run.entities);
        run.entities =
            self.rules
                .apply_type_rules(text, run.classification.document_type, entities);

        // Pass 5: address linking
        if is_cancelled(cancel) {
            return Ok(self.cancelled(run, "address linking"));
        }
        let linked = self.linker.link(std::mem::take(&mut run.entities), text);
        run.entities = linked.standalone;

        // Pass 6: address scoring
        run.addresses = linked
            .addresses
            .into_iter()
            .map(|address| self.scorer.score(address))
            .collect();

        if candidates.model.ran {
            self.record_metric(&candidates.model, text.len(), &run.classification);
        }

        let outcome = run.into_outcome();
        crate::log_detection_complete!(
            outcome.run_id,
            outcome.entities.len(),
            outcome.addresses.len(),
            outcome.is_partial(),
            outcome.processing_time_ms
        );
        Ok(outcome)
    }

    fn validate(&self, entities: &mut [Entity], text: &str) {
        let mut invalid = 0usize;
        for entity in entities.iter_mut() {
            let Some(result) = self.validators.validate_entity(entity, text) else {
                continue;
            };
            entity.validation = if result.is_valid {
                ValidationStatus::Valid
            } else {
                invalid += 1;
                ValidationStatus::Invalid
            };
            entity.adjust_confidence(result.confidence_adjustment);
        }
        tracing::debug!(entities = entities.len(), invalid, "Format validation finished");
    }

    fn note_model_pass(&self, report: &ModelPassReport, run: &mut RunState) {
        if !report.skipped_chunks.is_empty() {
            run.reasons.push(format!(
                "model skipped {} of {} chunk(s)",
                report.skipped_chunks.len(),
                report.chunk_count
            ));
        }
        if let Some(ref error) = report.fatal_error {
            crate::log_error_with_context!(error, "Model pass stopped; keeping pattern candidates");
            run.reasons.push(format!("model pass failed: {error}"));
            run.warnings
                .push(format!("Statistical model unavailable for this document: {error}"));
        }
        if report.retries > 0 {
            run.warnings
                .push(format!("{} model call(s) retried", report.retries));
        }
    }

    fn cancelled(&self, mut run: RunState, pass: &str) -> DetectionOutcome {
        self.metrics.increment_cancelled_runs();
        crate::log_pass_skipped!(pass, "cancelled");
        run.reasons.push(format!("cancelled before {pass}"));
        run.entities.sort_by_key(|e| (e.start(), e.end()));
        run.into_outcome()
    }

    fn record_metric(
        &self,
        report: &ModelPassReport,
        text_length: usize,
        classification: &DocumentClassification,
    ) {
        self.metrics.record(InferenceMetric {
            duration: report.duration,
            text_length,
            estimated_tokens: report.estimated_tokens,
            entity_count: report.entity_count,
            document_type: classification.document_type,
            language: classification.language,
            platform: self.platform,
            chunk_count: report.chunk_count,
            chunked: report.chunked(),
            recorded_at: chrono::Utc::now(),
        });
        tracing::debug!(
            model = self.model_name.as_deref().unwrap_or("none"),
            chunks = report.chunk_count,
            "Inference metric recorded"
        );
    }
}

fn is_cancelled(cancel: Option<&watch::Receiver<bool>>) -> bool {
    cancel.is_some_and(|rx| *rx.borrow())
}
