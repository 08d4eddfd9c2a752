//! Context-based confidence adjustment
//!
//! Three signals move an entity's confidence: a label keyword shortly
//! before it ("Tel.", "IBAN", "né le"), nearby high-confidence entities,
//! and its position in the header or footer. A misleading label (an
//! invoice number that looks like a phone number) lowers it, but never
//! below the type's floor.

use crate::detection::config::ContextConfig;
use crate::detection::text::{contains_word, in_header_or_footer, preceding};
use crate::domain::{DetectionSource, Entity, EntityType};

/// Neighbours at or above this confidence count towards a cluster
const CLUSTER_CONFIDENCE: f64 = 0.8;

/// Label keywords per entity type, lowercase, de/fr/it/en
fn keywords(entity_type: EntityType) -> &'static [&'static str] {
    match entity_type {
        EntityType::Phone => &[
            "tel", "telefon", "tél", "téléphone", "telefono", "phone", "mobile", "mobil", "natel",
            "handy", "portable", "cellulare", "fax",
        ],
        EntityType::Email => &["e-mail", "email", "mail", "courriel", "posta elettronica"],
        EntityType::BankAccount => &["iban", "konto", "compte", "conto", "account", "bank", "banque", "banca"],
        EntityType::NationalId => &[
            "ahv", "avs", "ahv-nr", "no avs", "sozialversicherungsnummer", "social security", "ssn",
        ],
        EntityType::TaxId => &["uid", "mwst", "tva", "iva", "vat", "ust-idnr", "steuernummer"],
        EntityType::Date => &[
            "datum", "date", "data", "geboren", "geb", "né", "née", "nato", "nata", "born", "dob",
        ],
        EntityType::Person | EntityType::SalutationName | EntityType::SignatureName => &[
            "herr", "herrn", "frau", "name", "nom", "nome", "monsieur", "madame", "signor",
            "signora", "mr", "mrs", "ms", "patient", "patientin", "paziente",
        ],
        EntityType::Organization => &[
            "firma", "société", "società", "company", "arbeitgeber", "employeur", "datore di lavoro",
            "employer",
        ],
        EntityType::Address
        | EntityType::StreetName
        | EntityType::StreetNumber
        | EntityType::PostalCode
        | EntityType::City
        | EntityType::RecipientBlock => &[
            "adresse", "address", "indirizzo", "wohnhaft", "domicile", "domicilio", "wohnort",
        ],
        EntityType::Reference => &["ref", "referenz", "référence", "riferimento", "aktenzeichen", "dossier"],
        EntityType::Location | EntityType::Country => &[],
    }
}

/// Labels that make a number-like entity less likely to be what it looks like
fn anti_keywords(entity_type: EntityType) -> &'static [&'static str] {
    match entity_type {
        EntityType::Phone | EntityType::NationalId | EntityType::BankAccount => &[
            "rechnung", "rechnungsnummer", "facture", "fattura", "invoice", "bestellung", "commande",
            "ordine", "order", "artikel", "article", "articolo", "kundennummer", "customer",
        ],
        EntityType::Date => &["version", "seite", "page", "pagina"],
        _ => &[],
    }
}

/// Lowest confidence a penalty may push an entity to
pub fn confidence_floor(entity_type: EntityType) -> f64 {
    match entity_type {
        EntityType::Email | EntityType::BankAccount | EntityType::NationalId => 0.5,
        EntityType::TaxId => 0.4,
        EntityType::Phone => 0.3,
        EntityType::Date
        | EntityType::Person
        | EntityType::Organization
        | EntityType::Location
        | EntityType::SalutationName
        | EntityType::SignatureName => 0.2,
        _ => 0.1,
    }
}

/// Deterministic context scorer
#[derive(Debug, Clone)]
pub struct ContextScorer {
    config: ContextConfig,
}

impl ContextScorer {
    pub fn new(config: &ContextConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Adjusted confidence of `entity` given the text and the other entities
    ///
    /// `others` may contain `entity` itself; it is skipped by id. Manual
    /// entities keep their confidence.
    pub fn score(&self, entity: &Entity, text: &str, others: &[Entity]) -> f64 {
        let base = entity.confidence();
        if entity.source == DetectionSource::Manual {
            return base;
        }

        let window = preceding(text, entity.start(), self.config.keyword_window).to_lowercase();
        let mut delta = 0.0;

        if keywords(entity.entity_type)
            .iter()
            .any(|k| contains_word(&window, k))
        {
            delta += self.config.keyword_boost;
        }
        if anti_keywords(entity.entity_type)
            .iter()
            .any(|k| contains_word(&window, k))
        {
            delta -= self.config.negative_keyword_penalty;
        }

        let neighbours = others
            .iter()
            .filter(|o| o.id != entity.id)
            .filter(|o| o.confidence() >= CLUSTER_CONFIDENCE)
            .filter(|o| entity.distance_to(o) <= self.config.cluster_radius)
            .count();
        delta += (neighbours as f64 * self.config.cluster_boost).min(self.config.cluster_boost_cap);

        if in_header_or_footer(
            entity.start(),
            text.len(),
            self.config.header_fraction,
            self.config.footer_fraction,
        ) {
            delta += self.config.position_boost;
        }

        let floor = confidence_floor(entity.entity_type).min(base);
        (base + delta).clamp(floor, 1.0)
    }

    /// Rescore every entity against a snapshot of the set
    ///
    /// All scores are computed from the confidences before the pass, so the
    /// result does not depend on entity order.
    pub fn apply(&self, entities: &mut [Entity], text: &str) {
        let snapshot: Vec<Entity> = entities.to_vec();
        let mut changed = 0usize;
        for (entity, original) in entities.iter_mut().zip(&snapshot) {
            let confidence = self.score(original, text, &snapshot);
            if (confidence - original.confidence()).abs() > f64::EPSILON {
                changed += 1;
            }
            entity.set_confidence(confidence);
        }
        tracing::debug!(entities = snapshot.len(), changed, "Context scoring finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> ContextScorer {
        ContextScorer::new(&ContextConfig::default())
    }

    fn at(text: &str, value: &str, entity_type: EntityType, confidence: f64) -> Entity {
        let start = text.find(value).unwrap();
        Entity::from_span(
            text,
            entity_type,
            start,
            start + value.len(),
            confidence,
            DetectionSource::Pattern,
        )
        .unwrap()
    }

    fn padded(body: &str) -> String {
        // keep the entity out of the header and footer regions
        format!("{}{body}{}", "x ".repeat(100), " y".repeat(200))
    }

    #[test]
    fn test_keyword_boost() {
        let text = padded("Telefon: 044 123 45 67");
        let entity = at(&text, "044 123 45 67", EntityType::Phone, 0.5);
        let scored = scorer().score(&entity, &text, &[]);
        assert!((scored - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_no_signal_no_change() {
        let text = padded("Nummer 044 123 45 67");
        let entity = at(&text, "044 123 45 67", EntityType::Phone, 0.5);
        assert!((scorer().score(&entity, &text, &[]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_anti_keyword_respects_floor() {
        let text = padded("Rechnung 044 123 45 67");
        let entity = at(&text, "044 123 45 67", EntityType::Phone, 0.4);
        let scored = scorer().score(&entity, &text, &[]);
        assert!((scored - 0.3).abs() < 1e-9);

        let low = at(&text, "044 123 45 67", EntityType::Phone, 0.25);
        assert!((scorer().score(&low, &text, &[]) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_boost_is_capped() {
        let text = padded("a@b.ch 044 123 45 67 CH93 0076 2011 6238 5295 7 756.1234.5678.97");
        let phone = at(&text, "044 123 45 67", EntityType::Phone, 0.5);
        let others = vec![
            at(&text, "a@b.ch", EntityType::Email, 0.9),
            at(&text, "CH93 0076 2011 6238 5295 7", EntityType::BankAccount, 0.9),
            at(&text, "756.1234.5678.97", EntityType::NationalId, 0.9),
        ];
        let scored = scorer().score(&phone, &text, &others);
        assert!((scored - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_header_position_boost() {
        let text = format!("Zürich {}", "z ".repeat(100));
        let entity = at(&text, "Zürich", EntityType::Location, 0.5);
        assert!((scorer().score(&entity, &text, &[]) - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_manual_is_untouched() {
        let text = padded("Telefon: 044 123 45 67");
        let start = text.find("044").unwrap();
        let manual = Entity::manual(EntityType::Phone, start, start + 13, "044 123 45 67").unwrap();
        assert_eq!(scorer().score(&manual, &text, &[]), 1.0);
    }

    #[test]
    fn test_apply_is_order_independent() {
        let text = padded("Tel. 044 123 45 67, Mail a@b.ch");
        let phone = at(&text, "044 123 45 67", EntityType::Phone, 0.75);
        let email = at(&text, "a@b.ch", EntityType::Email, 0.75);

        let mut forward = vec![phone.clone(), email.clone()];
        let mut backward = vec![email, phone];
        scorer().apply(&mut forward, &text);
        scorer().apply(&mut backward, &text);

        assert_eq!(forward[0].confidence(), backward[1].confidence());
        assert_eq!(forward[1].confidence(), backward[0].confidence());
    }
}
