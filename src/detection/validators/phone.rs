//! Telephone / fax number validator

use super::{ValidationContext, ValidationResult, Validator};
use crate::domain::EntityType;

/// E.164 allows 15 digits; the rest is room for a prefix and separators
const MAX_LENGTH: usize = 30;

/// Labels that mark the following number as a phone or fax number
const PHONE_LABELS: &[&str] = &[
    "tel", "telefon", "phone", "mobile", "natel", "handy", "fax", "téléphone", "portable",
    "telefono", "cellulare",
];

/// Validates international and national phone numbers
#[derive(Debug, Default, Clone, Copy)]
pub struct PhoneValidator;

impl PhoneValidator {
    fn has_label(ctx: &ValidationContext<'_>, value: &str) -> bool {
        ctx.preceding(value, 20)
            .map(|before| {
                let before = before.to_lowercase();
                PHONE_LABELS.iter().any(|label| before.contains(label))
            })
            .unwrap_or(false)
    }
}

impl Validator for PhoneValidator {
    fn entity_type(&self) -> EntityType {
        EntityType::Phone
    }

    fn name(&self) -> &'static str {
        "phone"
    }

    fn max_length(&self) -> usize {
        MAX_LENGTH
    }

    fn check_format(&self, value: &str, ctx: &ValidationContext<'_>) -> ValidationResult {
        let trimmed = value.trim();
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '(' | ')' | '-' | '.' | '/'))
        {
            return ValidationResult::invalid("Unexpected character in phone number");
        }
        if trimmed.rfind('+').is_some_and(|i| i != 0) {
            return ValidationResult::invalid("Misplaced + in phone number");
        }

        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
        if !(9..=15).contains(&digits.len()) {
            return ValidationResult::invalid(format!(
                "Phone number must have 9 to 15 digits, got {}",
                digits.len()
            ));
        }

        let swiss = trimmed.starts_with("+41")
            || digits.starts_with("0041")
            || (digits.starts_with('0') && digits.len() == 10);
        let international = trimmed.starts_with('+') || digits.starts_with("00");

        let mut adjustment = if swiss {
            0.1
        } else if international {
            0.05
        } else {
            0.0
        };
        if Self::has_label(ctx, value) {
            adjustment += 0.1;
        }

        ValidationResult::valid(
            adjustment,
            if swiss {
                "Swiss phone number format"
            } else {
                "Plausible phone number"
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("+41 44 123 45 67", true ; "swiss international")]
    #[test_case("044 123 45 67", true ; "swiss national")]
    #[test_case("0049 30 1234567", true ; "german with 00")]
    #[test_case("+33 (0)1 23 45 67 89", true ; "french with trunk")]
    #[test_case("12 34", false ; "too short")]
    #[test_case("044 123 45 67 ext", false ; "letters")]
    #[test_case("044+123 45 67", false ; "inner plus")]
    fn test_phone(value: &str, valid: bool) {
        let result = PhoneValidator.validate(value, &ValidationContext::none());
        assert_eq!(result.is_valid, valid, "{value}: {}", result.reason);
    }

    #[test]
    fn test_label_raises_adjustment() {
        let text = "Tel. 044 123 45 67 und 044 765 43 21";
        let labelled = PhoneValidator.validate("044 123 45 67", &ValidationContext::with_text(text));
        let bare = PhoneValidator.validate("044 123 45 67", &ValidationContext::none());
        assert!(labelled.confidence_adjustment > bare.confidence_adjustment);
    }

    #[test]
    fn test_offset_and_search_agree() {
        let text = "Fax: 044 123 45 67";
        let searched = PhoneValidator.validate("044 123 45 67", &ValidationContext::with_text(text));
        let located =
            PhoneValidator.validate("044 123 45 67", &ValidationContext::with_offset(text, 5));
        assert_eq!(searched, located);
    }
}
