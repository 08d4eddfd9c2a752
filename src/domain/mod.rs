//! Domain models and types for Vigil.
//!
//! This module contains the core domain models shared by every detection
//! pass.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Entities** ([`Entity`], [`EntityType`], [`DetectionSource`], [`ValidationStatus`])
//! - **Addresses** ([`AddressComponent`], [`GroupedAddress`], [`AddressPattern`])
//! - **Classification** ([`DocumentClassification`], [`DocumentType`], [`Language`])
//! - **Input documents** ([`Document`])
//! - **Error types** ([`VigilError`], [`InferenceError`])
//! - **Result type alias** ([`Result`])
//!
//! # Invariants
//!
//! Entity spans are half-open byte ranges with `start < end`; the constructor
//! refuses anything else:
//!
//! ```rust
//! use vigil::domain::{DetectionSource, Entity, EntityType};
//!
//! let ok = Entity::new(EntityType::Email, 0, 9, "a@b.ch.io", 0.9, DetectionSource::Pattern);
//! assert!(ok.is_ok());
//!
//! let empty = Entity::new(EntityType::Email, 4, 4, "", 0.9, DetectionSource::Pattern);
//! assert!(empty.is_err());
//! ```

pub mod address;
pub mod classification;
pub mod document;
pub mod entity;
pub mod errors;

// Re-export commonly used types for convenience
pub use address::{AddressBreakdown, AddressComponent, AddressPattern, ComponentKind, GroupedAddress};
pub use classification::{DocumentClassification, DocumentType, Language};
pub use document::{Document, DocumentMetadata};
pub use entity::{DetectionSource, Entity, EntityType, ReviewDecision, ValidationStatus};
pub use errors::{InferenceError, Result, VigilError};
