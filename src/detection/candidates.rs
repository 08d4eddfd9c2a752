//! High-recall candidate generation
//!
//! Runs the pattern detector over the whole document and the statistical
//! model over each chunk, then folds the two candidate sets together.
//! Model failures never fail the document: a chunk whose call is given up
//! contributes pattern candidates only.

use crate::detection::chunker::{chunk_text, estimate_tokens, merge_chunk_predictions, TextChunk};
use crate::detection::config::DetectionConfig;
use crate::detection::detector::{resolve_overlaps, EntityDetector};
use crate::detection::metrics::MetricsCollector;
use crate::detection::model::{merge_subword_predictions, validate_model_input, InferenceDispatcher};
use crate::detection::retry::{with_retry, RetryState};
use crate::domain::{DetectionSource, Entity, EntityType, InferenceError, Result};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Confidence bonus when both detectors agree on a span
const AGREEMENT_BOOST: f64 = 0.1;

/// How one chunk's model call ended
#[derive(Debug)]
enum ChunkOutcome {
    Predicted { index: usize, entities: Vec<Entity> },
    Skipped { index: usize, reason: String },
    InvalidInput { index: usize, reason: String },
    Fatal { index: usize, error: InferenceError },
    Cancelled,
}

/// Summary of the model pass
#[derive(Debug, Clone, Default)]
pub struct ModelPassReport {
    /// Whether the model ran at all
    pub ran: bool,
    /// Number of chunks the document was split into
    pub chunk_count: usize,
    /// Estimated token count of the document
    pub estimated_tokens: usize,
    /// Entities the model contributed after merging
    pub entity_count: usize,
    /// Chunks given up after retries, or refused by input validation
    pub skipped_chunks: Vec<usize>,
    /// Retries spent across all chunks
    pub retries: u64,
    /// First non-retryable error, if any
    pub fatal_error: Option<InferenceError>,
    /// Cancellation stopped the pass early
    pub cancelled: bool,
    /// Wall time of the pass
    pub duration: Duration,
}

impl ModelPassReport {
    /// Whether the document was split
    pub fn chunked(&self) -> bool {
        self.chunk_count > 1
    }

    /// Whether the pass covered every chunk
    pub fn is_complete(&self) -> bool {
        self.skipped_chunks.is_empty() && self.fatal_error.is_none() && !self.cancelled
    }
}

/// Candidate set plus the model pass summary
#[derive(Debug)]
pub struct CandidateSet {
    /// Candidates in document order
    pub entities: Vec<Entity>,
    /// Model pass summary
    pub model: ModelPassReport,
}

/// Combines pattern and model detections
pub struct CandidateGenerator {
    detector: Arc<dyn EntityDetector>,
    model: Option<Arc<InferenceDispatcher>>,
    metrics: Arc<MetricsCollector>,
}

impl CandidateGenerator {
    /// Create a generator; `model` is optional
    pub fn new(
        detector: Arc<dyn EntityDetector>,
        model: Option<Arc<InferenceDispatcher>>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            detector,
            model,
            metrics,
        }
    }

    /// Produce the candidate set for `text`
    ///
    /// # Errors
    ///
    /// Only pattern detection errors propagate. Model failures are reported
    /// in [`ModelPassReport`].
    pub async fn generate(
        &self,
        text: &str,
        config: &DetectionConfig,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> Result<CandidateSet> {
        let pattern_entities = self.detector.detect(text)?;
        tracing::debug!(
            detector = self.detector.name(),
            count = pattern_entities.len(),
            "Pattern candidates collected"
        );

        let (model_entities, report) = match &self.model {
            Some(_) if text.trim().is_empty() => {
                tracing::debug!("Blank document; model pass not needed");
                (Vec::new(), ModelPassReport::default())
            }
            Some(dispatcher) if config.inference.enabled => {
                self.model_pass(dispatcher, text, config, cancel).await
            }
            _ => (Vec::new(), ModelPassReport::default()),
        };

        let entities = combine(pattern_entities, model_entities);
        Ok(CandidateSet {
            entities,
            model: report,
        })
    }

    async fn model_pass(
        &self,
        dispatcher: &InferenceDispatcher,
        text: &str,
        config: &DetectionConfig,
        cancel: Option<&watch::Receiver<bool>>,
    ) -> (Vec<Entity>, ModelPassReport) {
        let started = Instant::now();
        let chunks = chunk_text(
            text,
            config.chunking.max_tokens,
            config.chunking.overlap_tokens,
        );
        let mut report = ModelPassReport {
            ran: true,
            chunk_count: chunks.len(),
            estimated_tokens: estimate_tokens(text),
            ..ModelPassReport::default()
        };
        let halted = AtomicBool::new(false);
        let retries = AtomicU64::new(0);

        let chunk_futures: Vec<_> = chunks
            .iter()
            .map(|chunk| self.infer_chunk(dispatcher, chunk, config, cancel, &halted, &retries))
            .collect();
        let outcomes: Vec<ChunkOutcome> = stream::iter(chunk_futures)
        .buffer_unordered(config.inference.max_concurrent_chunks.max(1))
        .collect()
        .await;

        let mut per_chunk: Vec<Vec<Entity>> = vec![Vec::new(); chunks.len()];
        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Predicted { index, entities } => {
                    if let Some(slot) = per_chunk.get_mut(index) {
                        *slot = entities;
                    }
                }
                ChunkOutcome::Skipped { index, reason } => {
                    tracing::warn!(chunk_index = index, reason = %reason, "Model call skipped for chunk");
                    report.skipped_chunks.push(index);
                }
                ChunkOutcome::InvalidInput { index, reason } => {
                    tracing::warn!(chunk_index = index, reason = %reason, "Chunk refused by model input validation");
                    report.skipped_chunks.push(index);
                }
                ChunkOutcome::Fatal { index, error } => {
                    tracing::error!(chunk_index = index, error = %error, "Fatal inference error");
                    report.skipped_chunks.push(index);
                    if report.fatal_error.is_none() {
                        report.fatal_error = Some(error);
                    }
                }
                ChunkOutcome::Cancelled => report.cancelled = true,
            }
        }
        report.skipped_chunks.sort_unstable();
        report.retries = retries.load(Ordering::Relaxed);

        let merged = merge_chunk_predictions(per_chunk, &chunks);
        let entities = resolve_overlaps(merged);
        report.entity_count = entities.len();
        report.duration = started.elapsed();

        tracing::debug!(
            chunks = report.chunk_count,
            skipped = report.skipped_chunks.len(),
            entities = report.entity_count,
            duration_ms = report.duration.as_millis() as u64,
            "Model pass finished"
        );
        (entities, report)
    }

    async fn infer_chunk(
        &self,
        dispatcher: &InferenceDispatcher,
        chunk: &TextChunk,
        config: &DetectionConfig,
        cancel: Option<&watch::Receiver<bool>>,
        halted: &AtomicBool,
        retries: &AtomicU64,
    ) -> ChunkOutcome {
        if cancel.is_some_and(|rx| *rx.borrow()) {
            return ChunkOutcome::Cancelled;
        }
        if halted.load(Ordering::Acquire) {
            return ChunkOutcome::Skipped {
                index: chunk.index,
                reason: "an earlier chunk failed fatally".to_string(),
            };
        }
        if let Err(e) = validate_model_input(&chunk.text, config.inference.max_input_bytes) {
            self.metrics.increment_invalid_inputs();
            return ChunkOutcome::InvalidInput {
                index: chunk.index,
                reason: e.to_string(),
            };
        }

        let timeout_ms = config.inference.timeout_ms;
        let outcome = with_retry(&config.retry, move |_attempt| async move {
            match tokio::time::timeout(
                Duration::from_millis(timeout_ms),
                dispatcher.infer(chunk.start, &chunk.text),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(InferenceError::Timeout(format!(
                    "no response within {timeout_ms} ms"
                ))),
            }
        })
        .await;
        let spent = u64::from(outcome.attempts.saturating_sub(1));
        retries.fetch_add(spent, Ordering::Relaxed);
        self.metrics.add_retries(spent);

        match outcome.result {
            Ok(predictions) => {
                let entities = merge_subword_predictions(&predictions, &chunk.text)
                    .into_iter()
                    .filter(|span| span.score >= config.model_confidence_threshold)
                    .filter_map(|span| {
                        Entity::from_span(
                            &chunk.text,
                            span.entity_type,
                            span.start,
                            span.end,
                            span.score,
                            DetectionSource::Model,
                        )
                        .ok()
                        .map(|entity| entity.with_metadata("model_label", span.label))
                    })
                    .collect();
                ChunkOutcome::Predicted {
                    index: chunk.index,
                    entities,
                }
            }
            Err(error) => match outcome.final_state {
                RetryState::FailedFatal { .. } => {
                    halted.store(true, Ordering::Release);
                    self.metrics.increment_fatal_errors();
                    ChunkOutcome::Fatal {
                        index: chunk.index,
                        error,
                    }
                }
                _ => {
                    self.metrics.increment_skipped_chunks();
                    ChunkOutcome::Skipped {
                        index: chunk.index,
                        reason: format!("{error} after {} attempts", outcome.attempts),
                    }
                }
            },
        }
    }
}

/// Entity types two detectors may disagree on while meaning the same span
fn compatible(pattern: EntityType, model: EntityType) -> bool {
    use EntityType::*;
    if pattern == model {
        return true;
    }
    let places = [Location, City, Country];
    let people = [Person, SalutationName, SignatureName];
    (places.contains(&pattern) && places.contains(&model))
        || (people.contains(&pattern) && people.contains(&model))
}

/// Fold model candidates into pattern candidates
///
/// A model span overlapping a compatible pattern span confirms it: the
/// result keeps the pattern type, takes the longer span, and becomes
/// [`DetectionSource::Both`]. Unconfirmed model spans stay as model
/// candidates.
pub fn combine(pattern: Vec<Entity>, model: Vec<Entity>) -> Vec<Entity> {
    let mut combined = pattern;
    let pattern_count = combined.len();

    for model_entity in model {
        let confirmed = combined[..pattern_count].iter_mut().find(|existing| {
            existing.overlaps(&model_entity)
                && compatible(existing.entity_type, model_entity.entity_type)
        });

        match confirmed {
            Some(existing) => {
                let confidence = existing.confidence().max(model_entity.confidence());
                if model_entity.len() > existing.len() {
                    existing.set_span(
                        model_entity.start(),
                        model_entity.end(),
                        model_entity.text.clone(),
                    );
                }
                existing.source = DetectionSource::Both;
                existing.set_confidence(confidence + AGREEMENT_BOOST);
                if let Some(label) = model_entity.metadata.get("model_label") {
                    existing
                        .metadata
                        .insert("model_label".to_string(), label.clone());
                }
            }
            None => combined.push(model_entity),
        }
    }

    combined.sort_by(|a, b| {
        a.start()
            .cmp(&b.start())
            .then(a.end().cmp(&b.end()))
            .then(a.entity_type.cmp(&b.entity_type))
    });
    combined
}
