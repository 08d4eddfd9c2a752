//! Format validators
//!
//! One validator per externally visible PII type. Every validator rejects
//! input longer than its maximum before any pattern runs, so pathological
//! input is refused in time independent of its content.

pub mod address;
pub mod bank_account;
pub mod date;
pub mod email;
pub mod national_id;
pub mod phone;
pub mod postal_code;
pub mod registry;
pub mod tax_id;

pub use address::AddressValidator;
pub use bank_account::BankAccountValidator;
pub use date::DateValidator;
pub use email::EmailValidator;
pub use national_id::NationalIdValidator;
pub use phone::PhoneValidator;
pub use postal_code::{PostalCodeValidator, PostalFormat};
pub use registry::ValidatorRegistry;
pub use tax_id::TaxIdValidator;

use crate::detection::text;
use crate::domain::{Entity, EntityType};
use serde::Serialize;

/// Result of validating one value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// Whether the value has a valid format
    pub is_valid: bool,
    /// Confidence delta to apply to the entity
    pub confidence_adjustment: f64,
    /// Human-readable reason
    pub reason: String,
}

impl ValidationResult {
    /// Accept with a confidence adjustment
    pub fn valid(confidence_adjustment: f64, reason: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            confidence_adjustment,
            reason: reason.into(),
        }
    }

    /// Reject; invalid values always cost confidence
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            confidence_adjustment: -0.3,
            reason: reason.into(),
        }
    }

    fn too_long(max_length: usize) -> Self {
        Self::invalid(format!("Input exceeds maximum length of {max_length} bytes"))
    }
}

/// Where a value sits in its document
///
/// Validators that look at surrounding text either search for the value or
/// trust a caller-supplied offset. A wrong offset falls back to the search,
/// so both paths agree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationContext<'a> {
    text: Option<&'a str>,
    offset: Option<usize>,
}

impl<'a> ValidationContext<'a> {
    /// No surrounding text
    pub fn none() -> Self {
        Self::default()
    }

    /// Full document text; the value is located by substring search
    pub fn with_text(text: &'a str) -> Self {
        Self {
            text: Some(text),
            offset: None,
        }
    }

    /// Full document text plus the known byte offset of the value
    pub fn with_offset(text: &'a str, offset: usize) -> Self {
        Self {
            text: Some(text),
            offset: Some(offset),
        }
    }

    /// Byte offset of `value` in the document
    pub fn locate(&self, value: &str) -> Option<usize> {
        let text = self.text?;
        if let Some(offset) = self.offset {
            let end = offset.checked_add(value.len())?;
            if text.get(offset..end) == Some(value) {
                return Some(offset);
            }
        }
        text.find(value)
    }

    /// Up to `window` bytes before the value
    pub fn preceding(&self, value: &str, window: usize) -> Option<&'a str> {
        let text = self.text?;
        let start = self.locate(value)?;
        Some(text::preceding(text, start, window))
    }

    /// Up to `window` bytes after the value
    pub fn following(&self, value: &str, window: usize) -> Option<&'a str> {
        let text = self.text?;
        let start = self.locate(value)?;
        Some(text::following(text, start + value.len(), window))
    }
}

/// Format validator for one entity type
pub trait Validator: Send + Sync {
    /// Entity type this validator owns
    fn entity_type(&self) -> EntityType;

    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Longest accepted input in bytes
    fn max_length(&self) -> usize;

    /// Format check; only called on input within `max_length`
    fn check_format(&self, value: &str, ctx: &ValidationContext<'_>) -> ValidationResult;

    /// Length guard, then format check
    fn validate(&self, value: &str, ctx: &ValidationContext<'_>) -> ValidationResult {
        if value.len() > self.max_length() {
            return ValidationResult::too_long(self.max_length());
        }
        self.check_format(value, ctx)
    }

    /// Validate an entity whose type is a sub-component of this validator's type
    fn validate_component(
        &self,
        _entity: &Entity,
        _ctx: &ValidationContext<'_>,
    ) -> Option<ValidationResult> {
        None
    }
}

/// Strip spaces, dots, dashes and slashes used as digit group separators
pub(crate) fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '/' | '\u{a0}'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_offset_and_search_agree() {
        let text = "Ref 12, Tel. 12";
        let searched = ValidationContext::with_text(text);
        let offset = ValidationContext::with_offset(text, 13);
        assert_eq!(searched.locate("12"), Some(4));
        assert_eq!(offset.locate("12"), Some(13));

        // stale offset falls back to search
        let stale = ValidationContext::with_offset(text, 2);
        assert_eq!(stale.locate("12"), Some(4));
        assert_eq!(ValidationContext::none().locate("12"), None);
    }

    #[test]
    fn test_context_windows() {
        let text = "Tel. 044 123 45 67 (Büro)";
        let ctx = ValidationContext::with_offset(text, 5);
        assert_eq!(ctx.preceding("044 123 45 67", 10), Some("Tel. "));
        assert_eq!(ctx.following("044 123 45 67", 3), Some(" (B"));
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact("756.1234.5678.97"), "7561234567897");
        assert_eq!(compact("CH93 0076 2011"), "CH9300762011");
    }
}
