//! Email address validator

use super::{ValidationContext, ValidationResult, Validator};
use crate::domain::EntityType;
use regex::Regex;
use std::sync::LazyLock;

/// Longest forward path allowed by RFC 5321
const MAX_LENGTH: usize = 254;

/// Longest local part allowed by RFC 5321
const MAX_LOCAL_LENGTH: usize = 64;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,24}$",
    )
    .expect("email regex is valid")
});

/// Validates email address syntax
#[derive(Debug, Default, Clone, Copy)]
pub struct EmailValidator;

impl Validator for EmailValidator {
    fn entity_type(&self) -> EntityType {
        EntityType::Email
    }

    fn name(&self) -> &'static str {
        "email"
    }

    fn max_length(&self) -> usize {
        MAX_LENGTH
    }

    fn check_format(&self, value: &str, _ctx: &ValidationContext<'_>) -> ValidationResult {
        let Some((local, _domain)) = value.rsplit_once('@') else {
            return ValidationResult::invalid("Missing @");
        };

        if local.is_empty() || local.len() > MAX_LOCAL_LENGTH {
            return ValidationResult::invalid("Local part length out of range");
        }
        if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
            return ValidationResult::invalid("Misplaced dot in local part");
        }
        if !EMAIL.is_match(value) {
            return ValidationResult::invalid("Malformed email address");
        }

        ValidationResult::valid(0.1, "Well-formed email address")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};
    use test_case::test_case;

    #[test_case("anna.muster@example.ch", true ; "plain")]
    #[test_case("info+rechnung@mail.firma-ag.ch", true ; "plus and subdomain")]
    #[test_case("anna..muster@example.ch", false ; "double dot")]
    #[test_case(".anna@example.ch", false ; "leading dot")]
    #[test_case("anna@example", false ; "no tld")]
    #[test_case("anna@-example.ch", false ; "hyphen label")]
    #[test_case("anna.example.ch", false ; "no at")]
    fn test_email(value: &str, valid: bool) {
        let result = EmailValidator.validate(value, &ValidationContext::none());
        assert_eq!(result.is_valid, valid, "{value}: {}", result.reason);
    }

    #[test]
    fn test_pathological_input_rejected_by_length() {
        let value = format!("a@{}!", "a.".repeat(1000));
        let started = Instant::now();
        let result = EmailValidator.validate(&value, &ValidationContext::none());
        assert!(started.elapsed() < Duration::from_millis(100));
        assert!(!result.is_valid);
        assert!(result.reason.contains("maximum length"));
    }
}
