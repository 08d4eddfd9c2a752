//! Document classification types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed enumeration of document types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Letter,
    Contract,
    Report,
    Medical,
    Legal,
    Correspondence,
    Form,
    Unknown,
}

impl DocumentType {
    /// All classifiable types (everything except `Unknown`)
    pub const CLASSIFIABLE: [DocumentType; 8] = [
        Self::Invoice,
        Self::Letter,
        Self::Contract,
        Self::Report,
        Self::Medical,
        Self::Legal,
        Self::Correspondence,
        Self::Form,
    ];

    /// Lower-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Letter => "letter",
            Self::Contract => "contract",
            Self::Report => "report",
            Self::Medical => "medical",
            Self::Legal => "legal",
            Self::Correspondence => "correspondence",
            Self::Form => "form",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported document languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    Fr,
    It,
    En,
    Unknown,
}

impl Language {
    /// The four detectable languages
    pub const KNOWN: [Language; 4] = [Self::De, Self::Fr, Self::It, Self::En];

    /// ISO 639-1 code
    pub fn code(&self) -> &'static str {
        match self {
            Self::De => "de",
            Self::Fr => "fr",
            Self::It => "it",
            Self::En => "en",
            Self::Unknown => "unknown",
        }
    }

    /// Parse an ISO 639-1 code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "de" | "gsw" => Some(Self::De),
            "fr" => Some(Self::Fr),
            "it" => Some(Self::It),
            "en" => Some(Self::En),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of classifying a whole document
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentClassification {
    /// Detected type
    pub document_type: DocumentType,
    /// Confidence in the type (0.0 - 1.0)
    pub confidence: f64,
    /// Detected language
    pub language: Language,
}

impl DocumentClassification {
    /// Fallback classification for unclassifiable documents
    pub fn unknown(language: Language) -> Self {
        Self {
            document_type: DocumentType::Unknown,
            confidence: 0.0,
            language,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_codes() {
        assert_eq!(Language::from_code("DE"), Some(Language::De));
        assert_eq!(Language::from_code(" fr "), Some(Language::Fr));
        assert_eq!(Language::from_code("xx"), None);
        assert_eq!(Language::It.code(), "it");
    }

    #[test]
    fn test_document_type_serde_names() {
        let json = serde_json::to_string(&DocumentType::Correspondence).unwrap();
        assert_eq!(json, "\"correspondence\"");
        let parsed: DocumentType = serde_json::from_str("\"letter\"").unwrap();
        assert_eq!(parsed, DocumentType::Letter);
    }

    #[test]
    fn test_unknown_classification() {
        let c = DocumentClassification::unknown(Language::En);
        assert_eq!(c.document_type, DocumentType::Unknown);
        assert_eq!(c.confidence, 0.0);
    }
}
