//! Inference telemetry
//!
//! Records carry numbers and enums only, so no document or entity text can
//! end up in a metric. Export covers the aggregate, never single records.

use crate::domain::{DocumentType, Language};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Default number of retained records
pub const DEFAULT_CAPACITY: usize = 1000;

/// Where inference ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// In-process on the CPU
    #[default]
    Cpu,
    /// In-process on an accelerator
    Gpu,
    /// Remote inference service
    Remote,
}

/// One document's model pass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceMetric {
    /// Wall time of the model pass
    pub duration: Duration,
    /// Document length in bytes
    pub text_length: usize,
    /// Estimated token count
    pub estimated_tokens: usize,
    /// Model entities produced
    pub entity_count: usize,
    /// Classified document type
    pub document_type: DocumentType,
    /// Detected language
    pub language: Language,
    /// Where inference ran
    pub platform: Platform,
    /// Number of chunks inferred
    pub chunk_count: usize,
    /// Whether the document was split
    pub chunked: bool,
    /// When the pass finished
    pub recorded_at: DateTime<Utc>,
}

/// Count and mean duration of one group
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GroupStats {
    pub count: usize,
    pub mean_ms: f64,
}

/// Error counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ErrorCounts {
    /// Chunks whose model call was given up
    pub skipped_chunks: u64,
    /// Retry attempts after transient failures
    pub retries: u64,
    /// Non-retryable inference failures
    pub fatal_errors: u64,
    /// Chunks refused by input validation
    pub invalid_inputs: u64,
    /// Runs stopped by cancellation
    pub cancelled_runs: u64,
}

/// Aggregate over the retained records
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricsAggregate {
    pub count: usize,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub by_document_type: BTreeMap<DocumentType, GroupStats>,
    pub by_language: BTreeMap<Language, GroupStats>,
    pub errors: ErrorCounts,
}

/// Serializable export for a monitoring collaborator
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub generated_at: DateTime<Utc>,
    pub capacity: usize,
    pub aggregate: MetricsAggregate,
}

#[derive(Debug, Default)]
struct Counters {
    skipped_chunks: AtomicU64,
    retries: AtomicU64,
    fatal_errors: AtomicU64,
    invalid_inputs: AtomicU64,
    cancelled_runs: AtomicU64,
}

/// Bounded in-memory metrics buffer
#[derive(Debug)]
pub struct MetricsCollector {
    capacity: usize,
    records: Mutex<VecDeque<InferenceMetric>>,
    counters: Counters,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MetricsCollector {
    /// Create a collector keeping the last `capacity` records
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            counters: Counters::default(),
        }
    }

    fn records(&self) -> MutexGuard<'_, VecDeque<InferenceMetric>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a record, evicting the oldest when full
    pub fn record(&self, metric: InferenceMetric) {
        let mut records = self.records();
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(metric);
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    pub fn increment_skipped_chunks(&self) {
        self.counters.skipped_chunks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_retries(&self, retries: u64) {
        self.counters.retries.fetch_add(retries, Ordering::Relaxed);
    }

    pub fn increment_fatal_errors(&self) {
        self.counters.fatal_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_invalid_inputs(&self) {
        self.counters.invalid_inputs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cancelled_runs(&self) {
        self.counters.cancelled_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Current error counters
    pub fn error_counts(&self) -> ErrorCounts {
        ErrorCounts {
            skipped_chunks: self.counters.skipped_chunks.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            fatal_errors: self.counters.fatal_errors.load(Ordering::Relaxed),
            invalid_inputs: self.counters.invalid_inputs.load(Ordering::Relaxed),
            cancelled_runs: self.counters.cancelled_runs.load(Ordering::Relaxed),
        }
    }

    /// Aggregate the retained records
    pub fn aggregate(&self) -> MetricsAggregate {
        let records: Vec<InferenceMetric> = self.records().iter().copied().collect();
        let errors = self.error_counts();
        if records.is_empty() {
            return MetricsAggregate {
                errors,
                ..MetricsAggregate::default()
            };
        }

        let mut durations: Vec<f64> = records.iter().map(|r| millis(r.duration)).collect();
        durations.sort_by(f64::total_cmp);

        let mut by_document_type: BTreeMap<DocumentType, Vec<f64>> = BTreeMap::new();
        let mut by_language: BTreeMap<Language, Vec<f64>> = BTreeMap::new();
        for record in &records {
            by_document_type
                .entry(record.document_type)
                .or_default()
                .push(millis(record.duration));
            by_language
                .entry(record.language)
                .or_default()
                .push(millis(record.duration));
        }

        MetricsAggregate {
            count: records.len(),
            mean_ms: mean(&durations),
            p50_ms: percentile(&durations, 50.0),
            p95_ms: percentile(&durations, 95.0),
            p99_ms: percentile(&durations, 99.0),
            by_document_type: group_stats(by_document_type),
            by_language: group_stats(by_language),
            errors,
        }
    }

    /// Serializable aggregate snapshot
    pub fn export(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            generated_at: Utc::now(),
            capacity: self.capacity,
            aggregate: self.aggregate(),
        }
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Nearest-rank percentile over sorted values
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p * sorted.len() as f64 / 100.0).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn group_stats<K: Ord>(groups: BTreeMap<K, Vec<f64>>) -> BTreeMap<K, GroupStats> {
    groups
        .into_iter()
        .map(|(key, values)| {
            (
                key,
                GroupStats {
                    count: values.len(),
                    mean_ms: mean(&values),
                },
            )
        })
        .collect()
}
