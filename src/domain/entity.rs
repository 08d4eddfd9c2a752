//! Detected entity data models

use crate::domain::errors::{Result, VigilError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// PII category enumeration for European/Swiss document text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    /// Person names (first, last, full)
    Person,
    /// Companies, authorities, legal entities
    Organization,
    /// Free-standing place names not part of an address
    Location,
    /// Full postal address (single span)
    Address,
    /// Street name component
    StreetName,
    /// House number component
    StreetNumber,
    /// Postal code component
    PostalCode,
    /// City component
    City,
    /// Country component
    Country,
    /// Email addresses
    Email,
    /// Telephone and fax numbers
    Phone,
    /// Calendar dates
    Date,
    /// Bank account identifiers (IBAN)
    BankAccount,
    /// National identification numbers (e.g. Swiss AHV/AVS)
    NationalId,
    /// Tax identifiers (UID, VAT numbers)
    TaxId,
    /// Recipient address block of a letter
    RecipientBlock,
    /// Name in a letter salutation
    SalutationName,
    /// Name below a letter closing
    SignatureName,
    /// Reference, file, invoice or case numbers
    Reference,
}

impl EntityType {
    /// Get the upper-case label used in reports and pattern libraries
    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Organization => "ORGANIZATION",
            Self::Location => "LOCATION",
            Self::Address => "ADDRESS",
            Self::StreetName => "STREET_NAME",
            Self::StreetNumber => "STREET_NUMBER",
            Self::PostalCode => "POSTAL_CODE",
            Self::City => "CITY",
            Self::Country => "COUNTRY",
            Self::Email => "EMAIL",
            Self::Phone => "PHONE",
            Self::Date => "DATE",
            Self::BankAccount => "BANK_ACCOUNT",
            Self::NationalId => "NATIONAL_ID",
            Self::TaxId => "TAX_ID",
            Self::RecipientBlock => "RECIPIENT_BLOCK",
            Self::SalutationName => "SALUTATION_NAME",
            Self::SignatureName => "SIGNATURE_NAME",
            Self::Reference => "REFERENCE",
        }
    }

    /// Parse a category label (case-insensitive, with a few aliases)
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "PERSON" | "NAME" | "PER" => Ok(Self::Person),
            "ORGANIZATION" | "ORGANISATION" | "ORG" => Ok(Self::Organization),
            "LOCATION" | "LOC" => Ok(Self::Location),
            "ADDRESS" => Ok(Self::Address),
            "STREET_NAME" | "STREET" => Ok(Self::StreetName),
            "STREET_NUMBER" | "HOUSE_NUMBER" => Ok(Self::StreetNumber),
            "POSTAL_CODE" | "ZIP" | "PLZ" => Ok(Self::PostalCode),
            "CITY" => Ok(Self::City),
            "COUNTRY" => Ok(Self::Country),
            "EMAIL" => Ok(Self::Email),
            "PHONE" | "FAX" => Ok(Self::Phone),
            "DATE" => Ok(Self::Date),
            "BANK_ACCOUNT" | "IBAN" => Ok(Self::BankAccount),
            "NATIONAL_ID" | "AHV" | "AVS" => Ok(Self::NationalId),
            "TAX_ID" | "VAT" | "UID" => Ok(Self::TaxId),
            "RECIPIENT_BLOCK" => Ok(Self::RecipientBlock),
            "SALUTATION_NAME" => Ok(Self::SalutationName),
            "SIGNATURE_NAME" => Ok(Self::SignatureName),
            "REFERENCE" | "REF" => Ok(Self::Reference),
            _ => Err(VigilError::Pattern(format!("Unknown PII category: {s}"))),
        }
    }

    /// Check if this type is one of the five address component types
    pub fn is_address_component(&self) -> bool {
        matches!(
            self,
            Self::StreetName | Self::StreetNumber | Self::PostalCode | Self::City | Self::Country
        )
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which detector produced an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetectionSource {
    /// Deterministic pattern or rule
    Pattern,
    /// Statistical model
    Model,
    /// Both detectors agreed on the span
    Both,
    /// Added by a human reviewer
    Manual,
}

/// Outcome of format validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationStatus {
    /// Format validator accepted the value
    Valid,
    /// Format validator rejected the value
    Invalid,
    /// No validator ran
    #[default]
    Unverified,
}

/// What the review step should do with a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Confident enough to anonymize without review
    AutoAnonymize,
    /// Pre-selected suggestion, not applied automatically
    Suggest,
    /// Low confidence, must be looked at by a human
    Review,
}

impl ReviewDecision {
    /// Derive a decision from a confidence and the run's thresholds
    pub fn from_confidence(confidence: f64, review_below: f64, auto_anonymize_at: f64) -> Self {
        if confidence >= auto_anonymize_at {
            Self::AutoAnonymize
        } else if confidence < review_below {
            Self::Review
        } else {
            Self::Suggest
        }
    }
}

/// Detected PII entity
///
/// Spans are half-open byte ranges `[start, end)` over the UTF-8 text as
/// supplied. `start < end` always holds, and manual entities keep a
/// confidence of exactly 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier within a run
    pub id: String,
    /// Category of PII
    pub entity_type: EntityType,
    start: usize,
    end: usize,
    /// Raw text of the span
    pub text: String,
    confidence: f64,
    /// Detector that produced this entity
    pub source: DetectionSource,
    /// Format validation status
    pub validation: ValidationStatus,
    /// Optional metadata (subtype, rule name, model label, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    /// Absorbed into a grouped address
    #[serde(default)]
    linked: bool,
}

impl Entity {
    /// Create a new entity
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Validation`] if `start >= end`.
    pub fn new(
        entity_type: EntityType,
        start: usize,
        end: usize,
        text: impl Into<String>,
        confidence: f64,
        source: DetectionSource,
    ) -> Result<Self> {
        if start >= end {
            return Err(VigilError::Validation(format!(
                "Entity span must satisfy start < end, got [{start}, {end})"
            )));
        }

        let confidence = if source == DetectionSource::Manual {
            1.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            entity_type,
            start,
            end,
            text: text.into(),
            confidence,
            source,
            validation: ValidationStatus::Unverified,
            metadata: BTreeMap::new(),
            linked: false,
        })
    }

    /// Create an entity by slicing `document` at `[start, end)`
    ///
    /// # Errors
    ///
    /// Returns an error if the span is empty, out of bounds, or not on
    /// character boundaries.
    pub fn from_span(
        document: &str,
        entity_type: EntityType,
        start: usize,
        end: usize,
        confidence: f64,
        source: DetectionSource,
    ) -> Result<Self> {
        let text = document.get(start..end).ok_or_else(|| {
            VigilError::Validation(format!(
                "Span [{start}, {end}) is not a valid slice of a {}-byte document",
                document.len()
            ))
        })?;
        Self::new(entity_type, start, end, text, confidence, source)
    }

    /// Create a manually added entity (confidence fixed at 1.0)
    pub fn manual(
        entity_type: EntityType,
        start: usize,
        end: usize,
        text: impl Into<String>,
    ) -> Result<Self> {
        Self::new(entity_type, start, end, text, 1.0, DetectionSource::Manual)
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Start offset (inclusive)
    pub fn start(&self) -> usize {
        self.start
    }

    /// End offset (exclusive)
    pub fn end(&self) -> usize {
        self.end
    }

    /// Span length in bytes
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Always false; spans are never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Confidence score (0.0 - 1.0)
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Set the confidence score; ignored for manual entities
    pub fn set_confidence(&mut self, confidence: f64) {
        if self.source != DetectionSource::Manual {
            self.confidence = confidence.clamp(0.0, 1.0);
        }
    }

    /// Add `delta` to the confidence, clamped to [0, 1]
    pub fn adjust_confidence(&mut self, delta: f64) {
        self.set_confidence(self.confidence + delta);
    }

    /// Move the span to document coordinates by adding `offset`
    pub(crate) fn shift(&mut self, offset: usize) {
        self.start += offset;
        self.end += offset;
    }

    /// Replace the span (used when a longer agreeing span wins a merge)
    pub(crate) fn set_span(&mut self, start: usize, end: usize, text: impl Into<String>) {
        if start < end {
            self.start = start;
            self.end = end;
            self.text = text.into();
        }
    }

    /// Check whether two spans overlap
    pub fn overlaps(&self, other: &Entity) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Byte distance between two spans (0 if they overlap or touch)
    pub fn distance_to(&self, other: &Entity) -> usize {
        if self.end <= other.start {
            other.start - self.end
        } else if other.end <= self.start {
            self.start - other.end
        } else {
            0
        }
    }

    /// Mark the entity as absorbed into a grouped address
    pub fn mark_linked(&mut self) {
        self.linked = true;
    }

    /// Whether the entity has been absorbed into a grouped address
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Review decision for the given thresholds
    pub fn review_decision(&self, review_below: f64, auto_anonymize_at: f64) -> ReviewDecision {
        ReviewDecision::from_confidence(self.confidence, review_below, auto_anonymize_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_rejects_empty_span() {
        let result = Entity::new(EntityType::Email, 5, 5, "", 0.9, DetectionSource::Pattern);
        assert!(result.is_err());

        let result = Entity::new(EntityType::Email, 7, 5, "x", 0.9, DetectionSource::Pattern);
        assert!(result.is_err());
    }

    #[test]
    fn test_manual_entity_confidence_is_fixed() {
        let mut entity = Entity::manual(EntityType::Person, 0, 4, "Anna").unwrap();
        assert_eq!(entity.confidence(), 1.0);

        entity.set_confidence(0.2);
        entity.adjust_confidence(-0.5);
        assert_eq!(entity.confidence(), 1.0);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let mut entity =
            Entity::new(EntityType::Phone, 0, 3, "123", 1.4, DetectionSource::Model).unwrap();
        assert_eq!(entity.confidence(), 1.0);

        entity.adjust_confidence(-2.0);
        assert_eq!(entity.confidence(), 0.0);
    }

    #[test]
    fn test_from_span_slices_document() {
        let doc = "Tel. 044 123 45 67";
        let entity =
            Entity::from_span(doc, EntityType::Phone, 5, 18, 0.8, DetectionSource::Pattern).unwrap();
        assert_eq!(entity.text, "044 123 45 67");

        assert!(Entity::from_span(doc, EntityType::Phone, 5, 99, 0.8, DetectionSource::Pattern)
            .is_err());
    }

    #[test]
    fn test_from_span_rejects_non_char_boundary() {
        let doc = "Müller";
        // 'ü' occupies bytes 1..3
        assert!(
            Entity::from_span(doc, EntityType::Person, 0, 2, 0.5, DetectionSource::Model).is_err()
        );
    }

    #[test]
    fn test_overlap_and_distance() {
        let a = Entity::new(EntityType::City, 0, 5, "Basel", 0.5, DetectionSource::Pattern).unwrap();
        let b =
            Entity::new(EntityType::City, 3, 8, "el Xy", 0.5, DetectionSource::Pattern).unwrap();
        let c =
            Entity::new(EntityType::City, 10, 14, "Bern", 0.5, DetectionSource::Pattern).unwrap();

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_eq!(a.distance_to(&c), 5);
        assert_eq!(c.distance_to(&a), 5);
        assert_eq!(a.distance_to(&b), 0);
    }

    #[test]
    fn test_parse_category_aliases() {
        assert_eq!(EntityType::parse("iban").unwrap(), EntityType::BankAccount);
        assert_eq!(EntityType::parse("PLZ").unwrap(), EntityType::PostalCode);
        assert_eq!(EntityType::parse("ahv").unwrap(), EntityType::NationalId);
        assert!(EntityType::parse("SHOE_SIZE").is_err());
    }

    #[test]
    fn test_review_decision_thresholds() {
        assert_eq!(
            ReviewDecision::from_confidence(0.85, 0.6, 0.8),
            ReviewDecision::AutoAnonymize
        );
        assert_eq!(
            ReviewDecision::from_confidence(0.8, 0.6, 0.8),
            ReviewDecision::AutoAnonymize
        );
        assert_eq!(
            ReviewDecision::from_confidence(0.7, 0.6, 0.8),
            ReviewDecision::Suggest
        );
        assert_eq!(
            ReviewDecision::from_confidence(0.59, 0.6, 0.8),
            ReviewDecision::Review
        );
    }

    #[test]
    fn test_address_component_types() {
        assert!(EntityType::PostalCode.is_address_component());
        assert!(EntityType::Country.is_address_component());
        assert!(!EntityType::Address.is_address_component());
        assert!(!EntityType::Email.is_address_component());
    }
}
