//! Postal code validator
//!
//! A postal code is only ever a part of an address. This validator is owned
//! by [`AddressValidator`](super::AddressValidator) and is not registered
//! under its own key.

use super::{ValidationContext, ValidationResult, Validator};
use crate::detection::address::gazetteer;
use crate::domain::EntityType;
use serde::{Deserialize, Serialize};

/// "FL-9490" is the longest form; allow a little slack
const MAX_LENGTH: usize = 10;

/// Country prefixes used in front of postal codes
const NEIGHBOUR_PREFIXES: &[&str] = &["D-", "A-", "F-", "I-", "FL-", "L-"];

/// How plausible a postal code looks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostalFormat {
    /// Neither Swiss nor a neighbouring format
    Unrecognized,
    /// Four or five digits with a neighbouring country prefix, or five digits
    Neighbouring,
    /// Well-formed Swiss four-digit code
    Swiss,
    /// Found in the Swiss reference table
    SwissKnown,
}

/// Validates Swiss and neighbouring postal codes
#[derive(Debug, Default, Clone, Copy)]
pub struct PostalCodeValidator;

impl PostalCodeValidator {
    /// Classify a postal code
    pub fn classify(code: &str) -> PostalFormat {
        let code = code.trim();
        if gazetteer::is_known_postal_code(code) {
            return PostalFormat::SwissKnown;
        }

        let swiss = code.strip_prefix("CH-").unwrap_or(code);
        if swiss.len() == 4 && swiss.bytes().all(|b| b.is_ascii_digit()) && !swiss.starts_with('0')
        {
            return PostalFormat::Swiss;
        }

        let bare = NEIGHBOUR_PREFIXES
            .iter()
            .find_map(|prefix| code.strip_prefix(prefix));
        match bare {
            Some(rest) if (4..=5).contains(&rest.len()) && rest.bytes().all(|b| b.is_ascii_digit()) => {
                PostalFormat::Neighbouring
            }
            None if code.len() == 5 && code.bytes().all(|b| b.is_ascii_digit()) => {
                PostalFormat::Neighbouring
            }
            _ => PostalFormat::Unrecognized,
        }
    }

    /// Whether the code carries a country prefix (`CH-`, `D-`, ...)
    pub fn has_country_prefix(code: &str) -> bool {
        let code = code.trim();
        code.starts_with("CH-") || NEIGHBOUR_PREFIXES.iter().any(|p| code.starts_with(p))
    }
}

impl Validator for PostalCodeValidator {
    fn entity_type(&self) -> EntityType {
        EntityType::Address
    }

    fn name(&self) -> &'static str {
        "postal_code"
    }

    fn max_length(&self) -> usize {
        MAX_LENGTH
    }

    fn check_format(&self, value: &str, ctx: &ValidationContext<'_>) -> ValidationResult {
        match Self::classify(value) {
            PostalFormat::SwissKnown => {
                let city_follows = ctx
                    .following(value, 30)
                    .and_then(|after| after.split([',', '\n']).next())
                    .is_some_and(|city| gazetteer::postal_code_matches_city(value, city));
                if city_follows {
                    ValidationResult::valid(0.2, "Postal code matches the following city")
                } else {
                    ValidationResult::valid(0.15, "Known Swiss postal code")
                }
            }
            PostalFormat::Swiss => ValidationResult::valid(0.1, "Swiss postal code format"),
            PostalFormat::Neighbouring => {
                ValidationResult::valid(0.05, "Neighbouring country postal code format")
            }
            PostalFormat::Unrecognized => ValidationResult::invalid("Unrecognized postal code"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1000", PostalFormat::SwissKnown ; "lausanne")]
    #[test_case("CH-8001", PostalFormat::SwissKnown ; "prefixed zurich")]
    #[test_case("3920", PostalFormat::Swiss ; "zermatt not in table")]
    #[test_case("D-78462", PostalFormat::Neighbouring ; "german prefixed")]
    #[test_case("75001", PostalFormat::Neighbouring ; "five digits")]
    #[test_case("A-1010", PostalFormat::Neighbouring ; "austrian prefixed")]
    #[test_case("0123", PostalFormat::Unrecognized ; "leading zero")]
    #[test_case("12a4", PostalFormat::Unrecognized ; "letter")]
    fn test_classify(code: &str, expected: PostalFormat) {
        assert_eq!(PostalCodeValidator::classify(code), expected);
    }

    #[test]
    fn test_city_context_raises_adjustment() {
        let text = "Rue de Lausanne 12, 1000 Lausanne";
        let with_city = PostalCodeValidator.validate("1000", &ValidationContext::with_offset(text, 20));
        let alone = PostalCodeValidator.validate("1000", &ValidationContext::none());
        assert!(with_city.is_valid && alone.is_valid);
        assert!(with_city.confidence_adjustment > alone.confidence_adjustment);
    }

    #[test]
    fn test_format_ordering_is_monotonic() {
        assert!(PostalFormat::SwissKnown > PostalFormat::Swiss);
        assert!(PostalFormat::Swiss > PostalFormat::Neighbouring);
        assert!(PostalFormat::Neighbouring > PostalFormat::Unrecognized);
    }
}
