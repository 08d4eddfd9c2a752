//! Tax identifier validator (Swiss UID, EU VAT numbers)

use super::{compact, ValidationContext, ValidationResult, Validator};
use crate::domain::EntityType;

/// "CHE-123.456.789 MWST" is 20 characters; EU VAT numbers are shorter
const MAX_LENGTH: usize = 30;

/// VAT suffixes that may follow a Swiss UID
const UID_SUFFIXES: &[&str] = &["MWST", "TVA", "IVA", "VAT", "HR"];

/// EU VAT prefixes with the length of the national part
const VAT_FORMATS: &[(&str, usize)] = &[
    ("ATU", 8),
    ("DE", 9),
    ("FR", 11),
    ("IT", 11),
    ("LU", 8),
    ("BE", 10),
    ("NL", 12),
    ("ES", 9),
];

/// Validates Swiss UIDs (mod-11 check digit) and EU VAT number shapes
#[derive(Debug, Default, Clone, Copy)]
pub struct TaxIdValidator;

impl TaxIdValidator {
    fn uid_check_digit(digits: &[u32]) -> Option<u32> {
        const WEIGHTS: [u32; 8] = [5, 4, 3, 2, 7, 6, 5, 4];
        let sum: u32 = digits.iter().zip(WEIGHTS).map(|(d, w)| d * w).sum();
        match 11 - sum % 11 {
            11 => Some(0),
            10 => None,
            check => Some(check),
        }
    }

    fn check_uid(number: &str) -> ValidationResult {
        let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();
        if digits.len() != 9 || number.chars().count() != 9 {
            return ValidationResult::invalid("UID must have 9 digits after CHE");
        }
        match Self::uid_check_digit(&digits[..8]) {
            Some(check) if check == digits[8] => ValidationResult::valid(0.2, "Valid UID check digit"),
            _ => ValidationResult::invalid("UID check digit mismatch"),
        }
    }

    fn check_vat(number: &str) -> ValidationResult {
        for (prefix, len) in VAT_FORMATS {
            if let Some(rest) = number.strip_prefix(prefix) {
                return if rest.len() == *len && rest.chars().all(|c| c.is_ascii_alphanumeric()) {
                    ValidationResult::valid(0.1, format!("{prefix} VAT number format"))
                } else {
                    ValidationResult::invalid(format!("{prefix} VAT number must have {len} characters"))
                };
            }
        }
        ValidationResult::invalid("Unknown tax identifier format")
    }
}

impl Validator for TaxIdValidator {
    fn entity_type(&self) -> EntityType {
        EntityType::TaxId
    }

    fn name(&self) -> &'static str {
        "tax_id"
    }

    fn max_length(&self) -> usize {
        MAX_LENGTH
    }

    fn check_format(&self, value: &str, _ctx: &ValidationContext<'_>) -> ValidationResult {
        let mut upper = value.trim().to_uppercase();
        for suffix in UID_SUFFIXES {
            if let Some(stripped) = upper.strip_suffix(suffix) {
                upper = stripped.to_string();
                break;
            }
        }
        let number = compact(&upper);

        match number.strip_prefix("CHE") {
            Some(rest) => Self::check_uid(rest),
            None => Self::check_vat(&number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("CHE-123.456.788", true ; "uid")]
    #[test_case("CHE-116.281.710 MWST", true ; "uid with vat suffix")]
    #[test_case("CHE123456788", true ; "compact uid")]
    #[test_case("CHE-123.456.789", false ; "uid bad check digit")]
    #[test_case("CHE-467.895.21X", false ; "uid letter")]
    #[test_case("DE123456789", true ; "german vat")]
    #[test_case("ATU12345678", true ; "austrian vat")]
    #[test_case("DE12345", false ; "german vat too short")]
    #[test_case("XX123456789", false ; "unknown prefix")]
    fn test_tax_id(value: &str, valid: bool) {
        let result = TaxIdValidator.validate(value, &ValidationContext::none());
        assert_eq!(result.is_valid, valid, "{value}: {}", result.reason);
    }

    #[test]
    fn test_uid_check_digit_ten_is_never_valid() {
        assert_eq!(TaxIdValidator::uid_check_digit(&[4, 6, 7, 8, 9, 5, 2, 1]), None);
    }
}
