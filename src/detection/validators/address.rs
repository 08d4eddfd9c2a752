//! Postal address validator
//!
//! Owns the `Address` type key. Postal codes and house numbers found as
//! separate components are checked through [`Validator::validate_component`].

use super::{PostalCodeValidator, ValidationContext, ValidationResult, Validator};
use crate::domain::{Entity, EntityType};
use regex::Regex;
use std::sync::LazyLock;

/// A four-line address block with generous street and city names
const MAX_LENGTH: usize = 200;

static HOUSE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,4}(?:\s?[a-zA-Z])?(?:[/-]\d{1,3})?$").expect("house number regex is valid")
});

static POSTAL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:(?:CH|D|A|F|I|FL|L)-)?\d{4,5}\b").expect("postal token regex is valid")
});

/// Validates full address strings and delegates component checks
#[derive(Debug, Default, Clone, Copy)]
pub struct AddressValidator {
    postal_code: PostalCodeValidator,
}

impl AddressValidator {
    fn check_house_number(value: &str) -> ValidationResult {
        if value.len() > 12 {
            return ValidationResult::invalid("House number exceeds maximum length of 12 bytes");
        }
        if HOUSE_NUMBER.is_match(value.trim()) {
            ValidationResult::valid(0.05, "Plausible house number")
        } else {
            ValidationResult::invalid("Not a house number")
        }
    }
}

impl Validator for AddressValidator {
    fn entity_type(&self) -> EntityType {
        EntityType::Address
    }

    fn name(&self) -> &'static str {
        "address"
    }

    fn max_length(&self) -> usize {
        MAX_LENGTH
    }

    fn check_format(&self, value: &str, _ctx: &ValidationContext<'_>) -> ValidationResult {
        if !value.chars().any(char::is_alphabetic) {
            return ValidationResult::invalid("Address has no street or city name");
        }

        match POSTAL_TOKEN.find(value) {
            Some(token) => {
                let postal = self.postal_code.validate(token.as_str(), &ValidationContext::none());
                if postal.is_valid {
                    ValidationResult::valid(0.1, "Address with plausible postal code")
                } else {
                    ValidationResult::valid(0.0, "Address with unrecognized postal code")
                }
            }
            None if value.chars().any(|c| c.is_ascii_digit()) => {
                ValidationResult::valid(0.0, "Address without postal code")
            }
            None => ValidationResult::invalid("Address has neither postal code nor number"),
        }
    }

    fn validate_component(
        &self,
        entity: &Entity,
        ctx: &ValidationContext<'_>,
    ) -> Option<ValidationResult> {
        match entity.entity_type {
            EntityType::PostalCode => Some(self.postal_code.validate(&entity.text, ctx)),
            EntityType::StreetNumber => Some(Self::check_house_number(&entity.text)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DetectionSource;

    #[test]
    fn test_full_address() {
        let ctx = ValidationContext::none();
        let result = AddressValidator::default().validate("Rue de Lausanne 12, 1000 Lausanne", &ctx);
        assert!(result.is_valid);
        assert!(result.confidence_adjustment > 0.0);

        assert!(!AddressValidator::default().validate("12, 1000", &ctx).is_valid);
        let long = "Bahnhofstrasse ".repeat(20);
        assert!(AddressValidator::default()
            .validate(&long, &ctx)
            .reason
            .contains("maximum length"));
    }

    #[test]
    fn test_postal_code_component_is_delegated() {
        let text = "8001 Zürich";
        let entity =
            Entity::from_span(text, EntityType::PostalCode, 0, 4, 0.6, DetectionSource::Pattern)
                .unwrap();
        let result = AddressValidator::default()
            .validate_component(&entity, &ValidationContext::with_offset(text, 0))
            .unwrap();
        assert!(result.is_valid);
    }

    #[test]
    fn test_house_number_component() {
        let ok = Entity::new(EntityType::StreetNumber, 0, 3, "12a", 0.6, DetectionSource::Pattern)
            .unwrap();
        let bad = Entity::new(EntityType::StreetNumber, 0, 3, "abc", 0.6, DetectionSource::Pattern)
            .unwrap();
        let city = Entity::new(EntityType::City, 0, 4, "Bern", 0.6, DetectionSource::Pattern)
            .unwrap();
        let validator = AddressValidator::default();
        let ctx = ValidationContext::none();
        assert!(validator.validate_component(&ok, &ctx).unwrap().is_valid);
        assert!(!validator.validate_component(&bad, &ctx).unwrap().is_valid);
        assert!(validator.validate_component(&city, &ctx).is_none());
    }
}
