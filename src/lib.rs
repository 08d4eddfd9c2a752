// Vigil - Multilingual PII detection for European document text
// Copyright (c) 2025 Vigil Contributors
// Licensed under the MIT License

//! # Vigil - Multilingual PII Detection
//!
//! Vigil detects personally identifiable information in unstructured
//! document text (letters, invoices, contracts) in German, French, Italian
//! and English, and decides which detections can be anonymized
//! automatically and which need human review.
//!
//! ## Overview
//!
//! This library provides:
//! - **Candidate generation** from a pattern library and a statistical
//!   NER model run over bounded, overlapping chunks
//! - **Format validation** per PII type, guarded against pathological input
//! - **Context scoring** from label keywords, clusters and position
//! - **Document classification** with type-specific extraction rules
//! - **Address linking** of street, number, postal code, city and country
//!   into scored composite addresses
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`detection`] - The detection passes and the pipeline that runs them
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vigil::config::load_config;
//! use vigil::detection::DetectionPipeline;
//! use vigil::domain::Document;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("vigil.toml")?;
//!     let pipeline = DetectionPipeline::new(config.detection)?;
//!
//!     let document = Document::new("Rue de Lausanne 12, 1000 Lausanne");
//!     let outcome = pipeline.process(&document, None).await?;
//!
//!     for address in &outcome.addresses {
//!         println!("{:?} address, confidence {:.2}", address.pattern, address.confidence);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Review triage
//!
//! Every standalone entity maps to a [`domain::ReviewDecision`] through the
//! configured thresholds, and every grouped address carries
//! `flagged_for_review` / `auto_anonymize` flags. A run that skipped model
//! chunks or was cancelled returns a partial status so reviewers know to
//! double-check.
//!
//! ## Error Handling
//!
//! Library errors use [`domain::VigilError`]. Validators never fail; they
//! return a [`detection::validators::ValidationResult`]. Model failures
//! degrade a run to pattern-only detection instead of failing it.
//!
//! ## Logging
//!
//! Vigil logs with the `tracing` crate and never logs document or entity
//! text:
//!
//! ```rust,no_run
//! use tracing::{info, warn};
//!
//! info!(entities = 12, "Detection completed");
//! warn!(chunk_index = 3, "Model call skipped for chunk");
//! ```

pub mod cli;
pub mod config;
pub mod detection;
pub mod domain;
pub mod logging;
