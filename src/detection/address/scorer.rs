//! Address confidence scoring
//!
//! Five additive terms, each capped:
//!
//! | Term | Contribution |
//! |---|---|
//! | completeness | 0.2 per distinct component kind (at most 5) |
//! | pattern | 0.3 primary / international, 0.24 alternate, 0.15 partial |
//! | postal code | 0.2 reference table, 0.16 Swiss format, 0.14 neighbouring format, 0.06 otherwise |
//! | city | 0.1 gazetteer, 0.05 right after a validated postal code, 0.03 otherwise |
//! | country | 0.1 explicit, 0.05 implied by the postal code |
//!
//! With [`ScoreCombination::Normalized`] the sum is divided by the sum of
//! the caps (1.7); with [`ScoreCombination::ClampedSum`] it is clamped to
//! [0, 1]. Both are monotonic in every term.

use super::gazetteer;
use crate::detection::config::{AddressConfig, ReviewThresholds, ScoreCombination};
use crate::detection::validators::{PostalCodeValidator, PostalFormat};
use crate::domain::{AddressBreakdown, AddressPattern, ComponentKind, GroupedAddress};

const COMPONENT_WEIGHT: f64 = 0.2;
const MAX_COMPONENT_KINDS: usize = 5;

const PATTERN_FULL: f64 = 0.3;
const PATTERN_ALTERNATE: f64 = 0.24;
const PATTERN_PARTIAL: f64 = 0.15;

const POSTAL_REFERENCE: f64 = 0.2;
const POSTAL_NATIONAL: f64 = 0.16;
const POSTAL_NEIGHBOURING: f64 = 0.14;
const POSTAL_BASELINE: f64 = 0.06;

const CITY_GAZETTEER: f64 = 0.1;
const CITY_AFTER_POSTAL: f64 = 0.05;
const CITY_BASELINE: f64 = 0.03;

const COUNTRY_EXPLICIT: f64 = 0.1;
const COUNTRY_IMPLIED: f64 = 0.05;

/// Sum of every term's cap
pub const MAX_RAW_SCORE: f64 = COMPONENT_WEIGHT * MAX_COMPONENT_KINDS as f64
    + PATTERN_FULL
    + POSTAL_REFERENCE
    + CITY_GAZETTEER
    + COUNTRY_EXPLICIT;

/// Scores grouped addresses and sets their review flags
#[derive(Debug, Clone, Copy)]
pub struct AddressScorer {
    combination: ScoreCombination,
    thresholds: ReviewThresholds,
}

impl AddressScorer {
    /// Create a scorer
    pub fn new(config: &AddressConfig, thresholds: ReviewThresholds) -> Self {
        Self {
            combination: config.combination,
            thresholds,
        }
    }

    /// Compute the per-term breakdown of an address
    pub fn breakdown(address: &GroupedAddress) -> AddressBreakdown {
        let component_kinds = address.distinct_kinds();
        let completeness = COMPONENT_WEIGHT * component_kinds.min(MAX_COMPONENT_KINDS) as f64;

        let pattern = match address.pattern {
            AddressPattern::Primary | AddressPattern::International => PATTERN_FULL,
            AddressPattern::Alternate => PATTERN_ALTERNATE,
            AddressPattern::Partial => PATTERN_PARTIAL,
            AddressPattern::None => 0.0,
        };

        let postal = address.component(ComponentKind::PostalCode);
        let city = address.component(ComponentKind::City);
        let postal_format = postal.map(|p| PostalCodeValidator::classify(&p.entity.text));

        let postal_code = match (postal, postal_format) {
            (Some(p), Some(format)) => {
                let city_agrees = city.map_or(true, |c| {
                    gazetteer::postal_code_matches_city(&p.entity.text, &c.entity.text)
                });
                match format {
                    PostalFormat::SwissKnown if city_agrees => POSTAL_REFERENCE,
                    PostalFormat::SwissKnown | PostalFormat::Swiss => POSTAL_NATIONAL,
                    PostalFormat::Neighbouring => POSTAL_NEIGHBOURING,
                    PostalFormat::Unrecognized => POSTAL_BASELINE,
                }
            }
            _ => 0.0,
        };

        let city_term = match city {
            Some(c) if gazetteer::is_known_city(&c.entity.text) => CITY_GAZETTEER,
            Some(c) => {
                let follows_valid_postal = postal_format.is_some_and(|f| f >= PostalFormat::Swiss)
                    && address.components.windows(2).any(|pair| {
                        pair[0].kind == ComponentKind::PostalCode
                            && pair[1].kind == ComponentKind::City
                            && pair[1].entity.id == c.entity.id
                    });
                if follows_valid_postal {
                    CITY_AFTER_POSTAL
                } else {
                    CITY_BASELINE
                }
            }
            None => 0.0,
        };

        let country = if address.has(ComponentKind::Country) {
            COUNTRY_EXPLICIT
        } else if postal.is_some_and(|p| {
            PostalCodeValidator::has_country_prefix(&p.entity.text)
                || postal_format == Some(PostalFormat::SwissKnown)
        }) {
            COUNTRY_IMPLIED
        } else {
            0.0
        };

        AddressBreakdown {
            component_kinds,
            completeness,
            pattern,
            postal_code,
            city: city_term,
            country,
        }
    }

    /// Combine a breakdown into a confidence in [0, 1]
    pub fn combine(&self, breakdown: &AddressBreakdown) -> f64 {
        let total = breakdown.total();
        match self.combination {
            ScoreCombination::Normalized => (total / MAX_RAW_SCORE).clamp(0.0, 1.0),
            ScoreCombination::ClampedSum => total.clamp(0.0, 1.0),
        }
    }

    /// Score an address, writing confidence and flags back onto it
    pub fn score(&self, mut address: GroupedAddress) -> GroupedAddress {
        let breakdown = Self::breakdown(&address);
        let confidence = self.combine(&breakdown);

        address.breakdown = breakdown;
        address.confidence = confidence;
        address.flagged_for_review = confidence < self.thresholds.review_below;
        address.auto_anonymize = confidence >= self.thresholds.auto_anonymize_at;

        tracing::debug!(
            address_id = %address.id,
            pattern = ?address.pattern,
            components = breakdown.component_kinds,
            confidence,
            flagged = address.flagged_for_review,
            auto = address.auto_anonymize,
            "Address scored"
        );
        address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AddressComponent, DetectionSource, Entity};

    fn address(text: &str, parts: &[(ComponentKind, &str)], pattern: AddressPattern) -> GroupedAddress {
        let mut cursor = 0;
        let components: Vec<AddressComponent> = parts
            .iter()
            .map(|(kind, value)| {
                let start = cursor + text[cursor..].find(value).unwrap();
                cursor = start + value.len();
                AddressComponent {
                    kind: *kind,
                    entity: Entity::from_span(
                        text,
                        kind.entity_type(),
                        start,
                        cursor,
                        0.8,
                        DetectionSource::Pattern,
                    )
                    .unwrap(),
                }
            })
            .collect();
        let start = components[0].start();
        let end = components.last().unwrap().end();
        GroupedAddress {
            id: "test".to_string(),
            components,
            pattern,
            breakdown: AddressBreakdown::default(),
            start,
            end,
            text: text[start..end].to_string(),
            confidence: 0.0,
            flagged_for_review: false,
            auto_anonymize: false,
        }
    }

    fn scorer(combination: ScoreCombination) -> AddressScorer {
        let config = AddressConfig {
            combination,
            ..AddressConfig::default()
        };
        AddressScorer::new(&config, ReviewThresholds::default())
    }

    fn scenario_a() -> GroupedAddress {
        address(
            "Rue de Lausanne 12, 1000 Lausanne",
            &[
                (ComponentKind::StreetName, "Rue de Lausanne"),
                (ComponentKind::StreetNumber, "12"),
                (ComponentKind::PostalCode, "1000"),
                (ComponentKind::City, "Lausanne"),
            ],
            AddressPattern::Primary,
        )
    }

    fn scenario_b() -> GroupedAddress {
        address(
            "1000 Lausanne, Rue de Lausanne 12",
            &[
                (ComponentKind::PostalCode, "1000"),
                (ComponentKind::City, "Lausanne"),
                (ComponentKind::StreetName, "Rue de Lausanne"),
                (ComponentKind::StreetNumber, "12"),
            ],
            AddressPattern::Alternate,
        )
    }

    #[test]
    fn test_primary_address_is_auto_anonymized() {
        let scored = scorer(ScoreCombination::Normalized).score(scenario_a());
        assert_eq!(scored.breakdown.component_kinds, 4);
        assert!((scored.breakdown.postal_code - POSTAL_REFERENCE).abs() < 1e-9);
        assert!((scored.breakdown.city - CITY_GAZETTEER).abs() < 1e-9);
        assert!(scored.confidence >= 0.8);
        assert!(scored.auto_anonymize);
        assert!(!scored.flagged_for_review);
    }

    #[test]
    fn test_alternate_scores_below_primary() {
        let scorer = scorer(ScoreCombination::Normalized);
        let primary = scorer.score(scenario_a());
        let alternate = scorer.score(scenario_b());
        let expected = (PATTERN_FULL - PATTERN_ALTERNATE) / MAX_RAW_SCORE;
        assert!((primary.confidence - alternate.confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn test_clamped_sum_saturates() {
        let scored = scorer(ScoreCombination::ClampedSum).score(scenario_a());
        assert_eq!(scored.confidence, 1.0);
    }

    #[test]
    fn test_weak_partial_is_flagged() {
        let partial = address(
            "Musterweg 5",
            &[
                (ComponentKind::StreetName, "Musterweg"),
                (ComponentKind::StreetNumber, "5"),
            ],
            AddressPattern::Partial,
        );
        let scored = scorer(ScoreCombination::Normalized).score(partial);
        assert!(scored.flagged_for_review);
        assert!(!scored.auto_anonymize);
    }

    #[test]
    fn test_unknown_city_after_valid_postal_code() {
        let partial = address(
            "8999 Hintertupfingen",
            &[
                (ComponentKind::PostalCode, "8999"),
                (ComponentKind::City, "Hintertupfingen"),
            ],
            AddressPattern::Partial,
        );
        let breakdown = AddressScorer::breakdown(&partial);
        assert!((breakdown.postal_code - POSTAL_NATIONAL).abs() < 1e-9);
        assert!((breakdown.city - CITY_AFTER_POSTAL).abs() < 1e-9);
        assert_eq!(breakdown.country, 0.0);
    }

    #[test]
    fn test_explicit_country() {
        let full = address(
            "Bahnhofstrasse 10, 8001 Zürich, Schweiz",
            &[
                (ComponentKind::StreetName, "Bahnhofstrasse"),
                (ComponentKind::StreetNumber, "10"),
                (ComponentKind::PostalCode, "8001"),
                (ComponentKind::City, "Zürich"),
                (ComponentKind::Country, "Schweiz"),
            ],
            AddressPattern::International,
        );
        let scored = scorer(ScoreCombination::Normalized).score(full);
        assert!((scored.breakdown.country - COUNTRY_EXPLICIT).abs() < 1e-9);
        assert!((scored.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_monotonic_in_each_term() {
        let scorer = scorer(ScoreCombination::Normalized);
        let base = AddressBreakdown {
            component_kinds: 2,
            completeness: 0.4,
            pattern: PATTERN_PARTIAL,
            postal_code: POSTAL_BASELINE,
            city: CITY_BASELINE,
            country: 0.0,
        };
        let stronger = [
            AddressBreakdown { completeness: 0.6, component_kinds: 3, ..base },
            AddressBreakdown { pattern: PATTERN_ALTERNATE, ..base },
            AddressBreakdown { pattern: PATTERN_FULL, ..base },
            AddressBreakdown { postal_code: POSTAL_REFERENCE, ..base },
            AddressBreakdown { city: CITY_GAZETTEER, ..base },
            AddressBreakdown { country: COUNTRY_IMPLIED, ..base },
        ];
        let base_score = scorer.combine(&base);
        for candidate in stronger {
            assert!(scorer.combine(&candidate) >= base_score);
        }
    }
}
