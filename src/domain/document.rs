//! Input document model
//!
//! Text extraction from binary formats happens upstream; the core only ever
//! receives plain text plus optional metadata.

use crate::domain::classification::Language;
use serde::{Deserialize, Serialize};

/// Optional metadata supplied by document ingestion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Original file name
    #[serde(default)]
    pub filename: Option<String>,
    /// Source format before text extraction ("pdf", "docx", ...)
    #[serde(default)]
    pub source_format: Option<String>,
    /// Caller-supplied language hint
    #[serde(default)]
    pub language_hint: Option<Language>,
}

/// Plain text document handed to the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Plain text content
    pub text: String,
    /// Ingestion metadata
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a document without metadata
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: DocumentMetadata::default(),
        }
    }

    /// Set the language hint
    pub fn with_language_hint(mut self, language: Language) -> Self {
        self.metadata.language_hint = Some(language);
        self
    }

    /// Set the file name
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.metadata.filename = Some(filename.into());
        self
    }
}
