//! IBAN validator

use super::{compact, ValidationContext, ValidationResult, Validator};
use crate::domain::EntityType;

/// 34 characters (ISO 13616 maximum) plus 8 group separators
const MAX_LENGTH: usize = 42;

/// IBAN lengths for countries seen in Swiss and neighbouring documents
const IBAN_LENGTHS: &[(&str, usize)] = &[
    ("AT", 20),
    ("BE", 16),
    ("CH", 21),
    ("CZ", 24),
    ("DE", 22),
    ("DK", 18),
    ("ES", 24),
    ("FR", 27),
    ("GB", 22),
    ("IE", 22),
    ("IT", 27),
    ("LI", 21),
    ("LU", 20),
    ("MC", 27),
    ("NL", 18),
    ("PL", 28),
    ("PT", 25),
    ("SE", 24),
    ("SM", 27),
];

/// Validates IBANs: country length table and ISO 7064 mod-97 checksum
#[derive(Debug, Default, Clone, Copy)]
pub struct BankAccountValidator;

impl BankAccountValidator {
    fn expected_length(country: &str) -> Option<usize> {
        IBAN_LENGTHS
            .iter()
            .find(|(code, _)| *code == country)
            .map(|(_, len)| *len)
    }

    /// Remainder of the rearranged IBAN modulo 97
    fn mod97(iban: &str) -> Option<u32> {
        let (head, tail) = iban.split_at(4);
        let mut remainder: u32 = 0;
        for c in tail.chars().chain(head.chars()) {
            let value = c.to_digit(36)?;
            remainder = if value >= 10 {
                (remainder * 100 + value) % 97
            } else {
                (remainder * 10 + value) % 97
            };
        }
        Some(remainder)
    }
}

impl Validator for BankAccountValidator {
    fn entity_type(&self) -> EntityType {
        EntityType::BankAccount
    }

    fn name(&self) -> &'static str {
        "iban"
    }

    fn max_length(&self) -> usize {
        MAX_LENGTH
    }

    fn check_format(&self, value: &str, _ctx: &ValidationContext<'_>) -> ValidationResult {
        let iban = compact(value).to_ascii_uppercase();

        if iban.len() < 15 || !iban.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ValidationResult::invalid("Not an IBAN");
        }

        let country = &iban[..2];
        if !country.chars().all(|c| c.is_ascii_alphabetic())
            || !iban[2..4].chars().all(|c| c.is_ascii_digit())
        {
            return ValidationResult::invalid("IBAN must start with a country code and check digits");
        }

        let known_length = Self::expected_length(country);
        if let Some(expected) = known_length {
            if iban.len() != expected {
                return ValidationResult::invalid(format!(
                    "IBAN for {country} must have {expected} characters, got {}",
                    iban.len()
                ));
            }
        }

        match Self::mod97(&iban) {
            Some(1) if known_length.is_some() => {
                ValidationResult::valid(0.2, format!("Valid {country} IBAN checksum"))
            }
            Some(1) => ValidationResult::valid(0.1, "Valid IBAN checksum, unlisted country"),
            _ => ValidationResult::invalid("IBAN checksum mismatch"),
        }
    }
}
