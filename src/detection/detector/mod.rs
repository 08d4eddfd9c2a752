//! Deterministic PII detection
//!
//! Provides the trait-based detection interface and the pattern detector
//! driven by the TOML pattern library.

pub mod pattern;
pub mod patterns;

pub use pattern::PatternDetector;
pub use patterns::PatternRegistry;

use crate::domain::{Entity, Result};

/// Trait for synchronous PII detectors
pub trait EntityDetector: Send + Sync {
    /// Detector name for logs and entity metadata
    fn name(&self) -> &'static str;

    /// Detect entities in `text`; spans are byte offsets into `text`
    fn detect(&self, text: &str) -> Result<Vec<Entity>>;
}

/// Resolve overlapping spans produced by one detector
///
/// Longer spans win; ties go to the higher confidence, then the earlier
/// start. The survivors are returned in document order.
pub fn resolve_overlaps(mut entities: Vec<Entity>) -> Vec<Entity> {
    entities.sort_by(|a, b| {
        b.len()
            .cmp(&a.len())
            .then_with(|| b.confidence().total_cmp(&a.confidence()))
            .then_with(|| a.start().cmp(&b.start()))
            .then_with(|| a.entity_type.cmp(&b.entity_type))
    });

    let mut kept: Vec<Entity> = Vec::with_capacity(entities.len());
    for entity in entities {
        if !kept.iter().any(|k| k.overlaps(&entity)) {
            kept.push(entity);
        }
    }

    kept.sort_by_key(|e| (e.start(), e.end()));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DetectionSource, EntityType};

    fn entity(t: EntityType, start: usize, end: usize, conf: f64) -> Entity {
        Entity::new(t, start, end, "x".repeat(end - start), conf, DetectionSource::Pattern).unwrap()
    }

    #[test]
    fn test_longer_span_wins() {
        let resolved = resolve_overlaps(vec![
            entity(EntityType::Phone, 5, 10, 0.9),
            entity(EntityType::Phone, 3, 15, 0.6),
            entity(EntityType::Email, 20, 25, 0.9),
        ]);
        assert_eq!(resolved.len(), 2);
        assert_eq!((resolved[0].start(), resolved[0].end()), (3, 15));
        assert_eq!(resolved[1].entity_type, EntityType::Email);
    }

    #[test]
    fn test_equal_length_prefers_confidence() {
        let resolved = resolve_overlaps(vec![
            entity(EntityType::Date, 0, 10, 0.6),
            entity(EntityType::Phone, 2, 12, 0.7),
        ]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entity_type, EntityType::Phone);
    }

    #[test]
    fn test_adjacent_spans_both_kept() {
        let resolved = resolve_overlaps(vec![
            entity(EntityType::StreetName, 0, 15, 0.6),
            entity(EntityType::StreetNumber, 16, 18, 0.6),
        ]);
        assert_eq!(resolved.len(), 2);
    }
}
