//! Pattern-based PII detector

use super::{patterns::PatternRegistry, resolve_overlaps, EntityDetector};
use crate::domain::{DetectionSource, Entity, EntityType, Result};
use regex::Captures;
use std::sync::Arc;

/// Pattern-based PII detector
pub struct PatternDetector {
    pattern_registry: Arc<PatternRegistry>,
    confidence_threshold: f64,
}

impl PatternDetector {
    /// Create a new pattern detector with default patterns
    pub fn new() -> anyhow::Result<Self> {
        let registry = PatternRegistry::default_patterns()?;
        Ok(Self::with_registry(registry))
    }

    /// Create a new pattern detector with a custom pattern registry
    pub fn with_registry(registry: PatternRegistry) -> Self {
        Self {
            pattern_registry: Arc::new(registry),
            confidence_threshold: 0.0,
        }
    }

    /// Skip patterns whose confidence is below `threshold`
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    fn push_span(
        entities: &mut Vec<Entity>,
        entity_type: EntityType,
        start: usize,
        end: usize,
        text: &str,
        confidence: f64,
        pattern_name: &str,
    ) {
        if let Ok(entity) = Entity::new(
            entity_type,
            start,
            end,
            text,
            confidence,
            DetectionSource::Pattern,
        ) {
            entities.push(entity.with_metadata("pattern", pattern_name));
        }
    }

    fn emit_groups(
        entities: &mut Vec<Entity>,
        capture: &Captures<'_>,
        groups: &[(String, EntityType)],
        confidence: f64,
        pattern_name: &str,
    ) {
        for (group, entity_type) in groups {
            if let Some(m) = capture.name(group) {
                Self::push_span(
                    entities,
                    *entity_type,
                    m.start(),
                    m.end(),
                    m.as_str(),
                    confidence,
                    pattern_name,
                );
            }
        }
    }
}

impl EntityDetector for PatternDetector {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn detect(&self, text: &str) -> Result<Vec<Entity>> {
        let mut entities = Vec::new();

        for pattern in self.pattern_registry.all_patterns() {
            if pattern.confidence < self.confidence_threshold {
                continue;
            }

            for capture in pattern.regex.captures_iter(text) {
                if !pattern.groups.is_empty() {
                    Self::emit_groups(
                        &mut entities,
                        &capture,
                        &pattern.groups,
                        pattern.confidence,
                        &pattern.name,
                    );
                } else if let Some(matched) = capture.get(0) {
                    Self::push_span(
                        &mut entities,
                        pattern.category,
                        matched.start(),
                        matched.end(),
                        matched.as_str(),
                        pattern.confidence,
                        &pattern.name,
                    );
                }
            }
        }

        let detected = entities.len();
        let resolved = resolve_overlaps(entities);
        tracing::debug!(
            detected,
            kept = resolved.len(),
            text_length = text.len(),
            "Pattern detection finished"
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> PatternDetector {
        PatternDetector::new().unwrap()
    }

    #[test]
    fn test_detect_email() {
        let entities = detector().detect("Kontakt: anna.muster@example.ch").unwrap();
        let email = entities
            .iter()
            .find(|e| e.entity_type == EntityType::Email)
            .unwrap();
        assert_eq!(email.text, "anna.muster@example.ch");
        assert_eq!(email.start(), 9);
        assert_eq!(email.source, DetectionSource::Pattern);
    }

    #[test]
    fn test_detect_address_components() {
        let text = "Rue de Lausanne 12, 1000 Lausanne";
        let entities = detector().detect(text).unwrap();
        let types: Vec<EntityType> = entities.iter().map(|e| e.entity_type).collect();
        assert_eq!(
            types,
            vec![
                EntityType::StreetName,
                EntityType::StreetNumber,
                EntityType::PostalCode,
                EntityType::City
            ]
        );
        assert_eq!(entities[0].text, "Rue de Lausanne");
        assert_eq!(entities[3].end(), text.len());
    }

    #[test]
    fn test_spans_slice_the_input() {
        let text = "Herr Müller, Tel. +41 44 123 45 67, IBAN CH93 0076 2011 6238 5295 7, 8001 Zürich";
        for entity in detector().detect(text).unwrap() {
            assert_eq!(&text[entity.start()..entity.end()], entity.text);
        }
    }

    #[test]
    fn test_detected_spans_do_not_overlap() {
        let text = "Muster Treuhand AG, Bahnhofstrasse 10, 8001 Zürich, Schweiz, 01.02.2024";
        let entities = detector().detect(text).unwrap();
        for pair in entities.windows(2) {
            assert!(pair[0].end() <= pair[1].start());
        }
    }
}
