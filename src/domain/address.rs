//! Address component and grouped address models

use crate::domain::entity::{Entity, EntityType};
use crate::domain::errors::VigilError;
use serde::{Deserialize, Serialize};

/// The five address component kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Street name ("Rue de Lausanne", "Bahnhofstrasse")
    StreetName,
    /// House number ("12", "7a")
    StreetNumber,
    /// Postal code ("1000", "CH-8001")
    PostalCode,
    /// City ("Lausanne")
    City,
    /// Country ("Schweiz")
    Country,
}

impl ComponentKind {
    /// Entity type carrying this component
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::StreetName => EntityType::StreetName,
            Self::StreetNumber => EntityType::StreetNumber,
            Self::PostalCode => EntityType::PostalCode,
            Self::City => EntityType::City,
            Self::Country => EntityType::Country,
        }
    }

    /// Component kind for an entity type, if it is one
    pub fn from_entity_type(entity_type: EntityType) -> Option<Self> {
        match entity_type {
            EntityType::StreetName => Some(Self::StreetName),
            EntityType::StreetNumber => Some(Self::StreetNumber),
            EntityType::PostalCode => Some(Self::PostalCode),
            EntityType::City => Some(Self::City),
            EntityType::Country => Some(Self::Country),
            _ => None,
        }
    }
}

/// An entity restricted to one of the address component types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    /// Component kind
    pub kind: ComponentKind,
    /// Underlying entity
    pub entity: Entity,
}

impl AddressComponent {
    /// Start offset of the component
    pub fn start(&self) -> usize {
        self.entity.start()
    }

    /// End offset of the component
    pub fn end(&self) -> usize {
        self.entity.end()
    }
}

impl TryFrom<Entity> for AddressComponent {
    type Error = VigilError;

    fn try_from(entity: Entity) -> Result<Self, Self::Error> {
        match ComponentKind::from_entity_type(entity.entity_type) {
            Some(kind) => Ok(Self { kind, entity }),
            None => Err(VigilError::Validation(format!(
                "{} is not an address component type",
                entity.entity_type
            ))),
        }
    }
}

/// Template matched by a group of components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressPattern {
    /// street + number, postal + city
    Primary,
    /// primary followed by a country
    International,
    /// postal + city, street + number (letterhead layout)
    Alternate,
    /// a template-compatible subset
    Partial,
    /// no template matched
    None,
}

/// Per-term score breakdown of a grouped address
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AddressBreakdown {
    /// Distinct component kinds present
    pub component_kinds: usize,
    /// Completeness term
    pub completeness: f64,
    /// Pattern term
    pub pattern: f64,
    /// Postal code plausibility term
    pub postal_code: f64,
    /// City plausibility term
    pub city: f64,
    /// Country presence term
    pub country: f64,
}

impl AddressBreakdown {
    /// Raw sum of all terms
    pub fn total(&self) -> f64 {
        self.completeness + self.pattern + self.postal_code + self.city + self.country
    }
}

/// A composite address built from linked components
///
/// The group owns its components exclusively; they never reappear as
/// standalone entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupedAddress {
    /// Unique identifier within a run
    pub id: String,
    /// Owned components in document order
    pub components: Vec<AddressComponent>,
    /// Matched template
    pub pattern: AddressPattern,
    /// Score breakdown, filled by the scorer
    pub breakdown: AddressBreakdown,
    /// Start of the first component
    pub start: usize,
    /// End of the last component
    pub end: usize,
    /// Text covered by the group
    pub text: String,
    /// Final confidence, filled by the scorer
    pub confidence: f64,
    /// Needs a human look
    pub flagged_for_review: bool,
    /// Safe to anonymize without review
    pub auto_anonymize: bool,
}

impl GroupedAddress {
    /// First component of the given kind
    pub fn component(&self, kind: ComponentKind) -> Option<&AddressComponent> {
        self.components.iter().find(|c| c.kind == kind)
    }

    /// Whether a component of the given kind is present
    pub fn has(&self, kind: ComponentKind) -> bool {
        self.component(kind).is_some()
    }

    /// Number of distinct component kinds
    pub fn distinct_kinds(&self) -> usize {
        let mut kinds: Vec<ComponentKind> = self.components.iter().map(|c| c.kind).collect();
        kinds.sort();
        kinds.dedup();
        kinds.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::DetectionSource;

    #[test]
    fn test_component_from_entity() {
        let entity =
            Entity::new(EntityType::PostalCode, 0, 4, "1000", 0.7, DetectionSource::Pattern)
                .unwrap();
        let component = AddressComponent::try_from(entity).unwrap();
        assert_eq!(component.kind, ComponentKind::PostalCode);
        assert_eq!(component.start(), 0);
        assert_eq!(component.end(), 4);
    }

    #[test]
    fn test_non_component_entity_rejected() {
        let entity =
            Entity::new(EntityType::Email, 0, 5, "a@b.c", 0.9, DetectionSource::Pattern).unwrap();
        assert!(AddressComponent::try_from(entity).is_err());
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ComponentKind::StreetName,
            ComponentKind::StreetNumber,
            ComponentKind::PostalCode,
            ComponentKind::City,
            ComponentKind::Country,
        ] {
            assert_eq!(ComponentKind::from_entity_type(kind.entity_type()), Some(kind));
        }
    }
}
