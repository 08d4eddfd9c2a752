//! Validator registry
//!
//! Exactly one validator per entity type, built once and read-only after.

use super::{
    AddressValidator, BankAccountValidator, DateValidator, EmailValidator, NationalIdValidator,
    PhoneValidator, TaxIdValidator, ValidationContext, ValidationResult, Validator,
};
use crate::domain::{Entity, EntityType};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<ValidatorRegistry> = OnceLock::new();

/// Immutable type -> validator table
pub struct ValidatorRegistry {
    validators: Vec<Arc<dyn Validator>>,
    by_type: HashMap<EntityType, usize>,
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field(
                "validators",
                &self.validators.iter().map(|v| v.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorRegistry {
    /// Build a registry with the built-in validators
    ///
    /// The postal code validator is deliberately absent: it checks part of an
    /// address and is reached through [`AddressValidator`].
    pub fn new() -> Self {
        Self::from_validators(vec![
            Arc::new(BankAccountValidator),
            Arc::new(NationalIdValidator),
            Arc::new(EmailValidator),
            Arc::new(PhoneValidator),
            Arc::new(DateValidator),
            Arc::new(TaxIdValidator),
            Arc::new(AddressValidator::default()),
        ])
    }

    /// Build a registry from an explicit list
    ///
    /// A second validator for an already registered type is refused; the
    /// first registration stays in place.
    pub(crate) fn from_validators(validators: Vec<Arc<dyn Validator>>) -> Self {
        let mut kept: Vec<Arc<dyn Validator>> = Vec::with_capacity(validators.len());
        let mut by_type = HashMap::with_capacity(validators.len());

        for validator in validators {
            let entity_type = validator.entity_type();
            if let Some(&existing) = by_type.get(&entity_type) {
                let existing: &Arc<dyn Validator> = &kept[existing];
                tracing::error!(
                    entity_type = %entity_type,
                    registered = existing.name(),
                    refused = validator.name(),
                    "Duplicate validator registration refused"
                );
                continue;
            }
            by_type.insert(entity_type, kept.len());
            kept.push(validator);
        }

        Self {
            validators: kept,
            by_type,
        }
    }

    /// Process-wide registry, built on first use
    pub fn global() -> &'static ValidatorRegistry {
        GLOBAL.get_or_init(|| {
            let registry = Self::new();
            tracing::debug!(validators = registry.len(), "Validator registry initialized");
            registry
        })
    }

    /// Validator for `entity_type`
    pub fn get(&self, entity_type: EntityType) -> Option<&dyn Validator> {
        self.by_type
            .get(&entity_type)
            .map(|&i| self.validators[i].as_ref())
    }

    /// Registered validators in registration order
    pub fn validators(&self) -> impl Iterator<Item = &dyn Validator> {
        self.validators.iter().map(|v| v.as_ref())
    }

    /// Number of registered validators
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether no validator is registered
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validate an entity found at its own offset in `text`
    ///
    /// Address components go to the address validator. Returns `None` when
    /// no validator covers the type.
    pub fn validate_entity(&self, entity: &Entity, text: &str) -> Option<ValidationResult> {
        let ctx = ValidationContext::with_offset(text, entity.start());
        if let Some(validator) = self.get(entity.entity_type) {
            return Some(validator.validate(&entity.text, &ctx));
        }
        if entity.entity_type.is_address_component() {
            return self
                .get(EntityType::Address)?
                .validate_component(entity, &ctx);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::validators::PostalCodeValidator;
    use crate::domain::DetectionSource;

    #[test]
    fn test_one_validator_per_type() {
        let registry = ValidatorRegistry::new();
        assert_eq!(registry.len(), 7);
        assert_eq!(
            registry.get(EntityType::Address).map(|v| v.name()),
            Some("address")
        );
        assert_eq!(registry.get(EntityType::Email).map(|v| v.name()), Some("email"));
        assert!(registry.get(EntityType::Person).is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = ValidatorRegistry::from_validators(vec![
            Arc::new(AddressValidator::default()),
            Arc::new(PostalCodeValidator),
        ]);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get(EntityType::Address).map(|v| v.name()),
            Some("address")
        );
    }

    #[test]
    fn test_global_is_shared() {
        let a = ValidatorRegistry::global() as *const _;
        let b = ValidatorRegistry::global() as *const _;
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_entity_routes_components() {
        let text = "Kontakt: anna@example.ch, 8001 Zürich";
        let registry = ValidatorRegistry::new();

        let email =
            Entity::from_span(text, EntityType::Email, 9, 24, 0.9, DetectionSource::Pattern)
                .unwrap();
        assert!(registry.validate_entity(&email, text).unwrap().is_valid);

        let postal =
            Entity::from_span(text, EntityType::PostalCode, 26, 30, 0.6, DetectionSource::Pattern)
                .unwrap();
        assert!(registry.validate_entity(&postal, text).unwrap().is_valid);

        let city =
            Entity::from_span(text, EntityType::City, 31, 38, 0.6, DetectionSource::Pattern)
                .unwrap();
        assert!(registry.validate_entity(&city, text).is_none());
    }
}
