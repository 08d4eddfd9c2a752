//! Swiss social security number (AHV/AVS) validator

use super::{compact, ValidationContext, ValidationResult, Validator};
use crate::domain::EntityType;

/// 16 characters in the dotted form plus a few spaces of slack
const MAX_LENGTH: usize = 20;

/// Validates 13-digit AHV numbers: `756` prefix and EAN-13 check digit
#[derive(Debug, Default, Clone, Copy)]
pub struct NationalIdValidator;

impl NationalIdValidator {
    fn ean13_check_digit(digits: &[u32]) -> u32 {
        let sum: u32 = digits
            .iter()
            .enumerate()
            .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
            .sum();
        (10 - sum % 10) % 10
    }
}

impl Validator for NationalIdValidator {
    fn entity_type(&self) -> EntityType {
        EntityType::NationalId
    }

    fn name(&self) -> &'static str {
        "ahv"
    }

    fn max_length(&self) -> usize {
        MAX_LENGTH
    }

    fn check_format(&self, value: &str, _ctx: &ValidationContext<'_>) -> ValidationResult {
        let number = compact(value);
        let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();

        if digits.len() != 13 || digits.len() != number.chars().count() {
            return ValidationResult::invalid("AHV number must have 13 digits");
        }
        if !number.starts_with("756") {
            return ValidationResult::invalid("AHV number must start with 756");
        }

        let expected = Self::ean13_check_digit(&digits[..12]);
        if digits[12] == expected {
            ValidationResult::valid(0.2, "Valid AHV check digit")
        } else {
            ValidationResult::invalid("AHV check digit mismatch")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("756.1234.5678.97", true ; "dotted")]
    #[test_case("7569876543217", true ; "compact")]
    #[test_case("756 1234 5678 97", true ; "spaced")]
    #[test_case("756.1234.5678.98", false ; "bad check digit")]
    #[test_case("757.1234.5678.97", false ; "wrong prefix")]
    #[test_case("756.1234.5678", false ; "too few digits")]
    #[test_case("756.1234.5678.9X", false ; "letter")]
    fn test_ahv(value: &str, valid: bool) {
        let result = NationalIdValidator.validate(value, &ValidationContext::none());
        assert_eq!(result.is_valid, valid, "{value}: {}", result.reason);
    }

    #[test]
    fn test_too_long_rejected_first() {
        let result =
            NationalIdValidator.validate("756.1234.5678.97.0000000", &ValidationContext::none());
        assert!(result.reason.contains("maximum length"));
    }
}
