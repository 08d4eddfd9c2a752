//! PII detection core
//!
//! This module provides the multi-pass detection pipeline for document
//! text:
//!
//! - **Candidates**: pattern detector plus a statistical model over
//!   bounded, overlapping chunks, with retry around each model call
//! - **Validators**: one format validator per PII type, length-guarded
//! - **Context**: keyword, cluster and position confidence adjustments
//! - **Classification and rules**: document type, language and
//!   type-specific extraction
//! - **Addresses**: proximity linking of components and address scoring
//! - **Metrics**: content-free inference telemetry
//!
//! # Example
//!
//! ```no_run
//! use vigil::detection::{config::DetectionConfig, DetectionPipeline, DetectionReport};
//! use vigil::domain::Document;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = DetectionConfig::default();
//! let pipeline = DetectionPipeline::new(config.clone())?;
//!
//! let document = Document::new("Sehr geehrter Herr Müller,");
//! let outcome = pipeline.process(&document, None).await?;
//!
//! let report = DetectionReport::from_outcome(&outcome, &config.review);
//! println!("{}", report.format_console());
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod candidates;
pub mod chunker;
pub mod classifier;
pub mod config;
pub mod context;
pub mod detector;
pub mod locale;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod rules;
pub mod text;
pub mod validators;

pub use config::DetectionConfig;
pub use pipeline::{DetectionOutcome, DetectionPipeline, ProcessingStatus};
pub use report::DetectionReport;
