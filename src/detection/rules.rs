//! Document-type specific extraction rules
//!
//! Baseline rules (reference lines, labelled birth dates) run on every
//! document. Each classified type adds its own rules when its rule set is
//! enabled. Letters get the full set: recipient block, salutation name,
//! signature name, document date and reference line. The vocabularies for
//! the other types are keyword triggers in de/fr/it/en:
//!
//! | Type | Extracts |
//! |---|---|
//! | invoice | invoice and customer numbers |
//! | contract | named parties, contract numbers |
//! | medical | patient names, case numbers |
//! | legal | case numbers, named parties |
//! | report | authors |
//! | correspondence | sender and recipient header names, greeting names |
//! | form | filled-in name fields |
//!
//! Extractions in the header or footer region get a position boost. An
//! extraction overlapping an existing entity of the same type (or a person
//! the rule makes more specific) merges into it with the confidences
//! combined as `1 - (1 - a)(1 - b)`.

use crate::detection::config::RulesConfig;
use crate::detection::validators::DateValidator;
use crate::domain::{DetectionSource, DocumentType, Entity, EntityType};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

const NAME: &str = r"\p{Lu}[\p{L}'-]+(?:[ \t]+\p{Lu}[\p{L}'-]+){0,2}";
const REFERENCE: &str = r"[\p{L}\d][\p{L}\d/._-]*\d[\p{L}\d/._-]*";
const NUMERIC_DATE: &str = r"\d{1,2}[./]\d{1,2}[./]\d{2,4}";

struct Rule {
    name: &'static str,
    entity_type: EntityType,
    regex: Regex,
    confidence: f64,
    header_only: bool,
    date: bool,
}

impl Rule {
    fn new(name: &'static str, entity_type: EntityType, pattern: &str, confidence: f64) -> Self {
        Self {
            name,
            entity_type,
            regex: Regex::new(pattern).expect("rule regex is valid"),
            confidence,
            header_only: false,
            date: false,
        }
    }

    fn header_only(mut self) -> Self {
        self.header_only = true;
        self
    }

    fn date(mut self) -> Self {
        self.date = true;
        self
    }
}

static BASELINE: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(
            "reference_line",
            EntityType::Reference,
            &format!(
                r"(?m)^[ \t]*(?i:unser zeichen|ihr zeichen|unsere referenz|referenz|aktenzeichen|notre référence|votre référence|n/réf\.?|v/réf\.?|nostro riferimento|vostro riferimento|our ref(?:erence)?|your ref(?:erence)?|ref\.?|rif\.?)[ \t]*:?[ \t]*(?P<value>{REFERENCE})"
            ),
            0.6,
        ),
        Rule::new(
            "birth_date",
            EntityType::Date,
            &format!(
                r"(?i:geburtsdatum|geboren am|geb\.|date de naissance|née? le|data di nascita|nat[oa] il|date of birth|born on|dob)[ \t]*:?[ \t]*(?P<value>{NUMERIC_DATE})"
            ),
            0.7,
        )
        .date(),
    ]
});

static TYPE_RULES: LazyLock<HashMap<DocumentType, Vec<Rule>>> = LazyLock::new(|| {
    HashMap::from([
        (
            DocumentType::Letter,
            vec![
                Rule::new(
                    "salutation_de",
                    EntityType::SalutationName,
                    &format!(
                        r"(?m)^[ \t]*(?i:sehr geehrter?|liebe[rs]?|guten tag)[ \t]+(?i:herrn?|frau)[ \t]+(?:(?i:dr|prof)\.?[ \t]+)*(?P<value>{NAME})"
                    ),
                    0.7,
                ),
                Rule::new(
                    "salutation_fr",
                    EntityType::SalutationName,
                    &format!(
                        r"(?m)^[ \t]*(?:(?i:ch[eè]re?|cher)[ \t]+)?(?i:madame|monsieur)[ \t]+(?:(?i:le|la)[ \t]+)?(?:(?i:docteur|dr|me)\.?[ \t]+)?(?P<value>{NAME})"
                    ),
                    0.7,
                ),
                Rule::new(
                    "salutation_it",
                    EntityType::SalutationName,
                    &format!(
                        r"(?m)^[ \t]*(?i:gentile|egregi[oa]|caro|cara)[ \t]+(?i:signor[ae]?|sig\.(?:ra)?|dott\.(?:ssa)?|avv\.)[ \t]+(?P<value>{NAME})"
                    ),
                    0.7,
                ),
                Rule::new(
                    "salutation_en",
                    EntityType::SalutationName,
                    &format!(
                        r"(?m)^[ \t]*(?i:dear)[ \t]+(?i:mr|mrs|ms|miss|dr|prof)\.?[ \t]+(?P<value>{NAME})"
                    ),
                    0.7,
                ),
                Rule::new(
                    "signature",
                    EntityType::SignatureName,
                    r"(?m)^[ \t]*(?i:mit freundlichen gr(?:ü|ue|u)(?:ss|ß)en|freundliche gr(?:ü|ue|u)(?:ss|ß)e|beste gr(?:ü|ue|u)(?:ss|ß)e|meilleures salutations|salutations distinguées|avec mes meilleures salutations|cordiali saluti|distinti saluti|yours sincerely|yours faithfully|kind regards|best regards|sincerely)[ \t,.]*\r?\n(?:[ \t]*\r?\n)*[ \t]*(?P<value>\p{Lu}[\p{L}'.-]*(?:[ \t]+\p{Lu}[\p{L}'.-]*){1,3})[ \t]*\r?$",
                    0.65,
                ),
                Rule::new(
                    "document_date",
                    EntityType::Date,
                    r"(?m)^[ \t]*(?:\p{Lu}[\p{L}. -]*,[ \t]*)?(?:(?i:den|le|il|lì|am)[ \t]+)?(?P<value>\d{1,2}\.?[ \t]+\p{L}+\.?[ \t]+\d{4}|\p{L}+[ \t]+\d{1,2},[ \t]+\d{4}|\d{1,2}[./]\d{1,2}[./]\d{2,4}|\d{4}-\d{2}-\d{2})[ \t]*\r?$",
                    0.7,
                )
                .header_only()
                .date(),
            ],
        ),
        (
            DocumentType::Invoice,
            vec![
                Rule::new(
                    "invoice_number",
                    EntityType::Reference,
                    &format!(
                        r"(?i:rechnungsnummer|rechnung|facture|fattura|invoice)[ \t]*(?i:n[°o]\.?|nr\.?|no\.?|#|nummer|numéro|numero|number)?[ \t]*:?[ \t]*(?P<value>{REFERENCE})"
                    ),
                    0.65,
                ),
                Rule::new(
                    "customer_number",
                    EntityType::Reference,
                    &format!(
                        r"(?i:kundennummer|kunden-nr\.?|kunden-nummer|n° client|numéro client|numero cliente|n\. cliente|customer (?:no\.?|number))[ \t]*:?[ \t]*(?P<value>{REFERENCE})"
                    ),
                    0.65,
                ),
            ],
        ),
        (
            DocumentType::Contract,
            vec![
                Rule::new(
                    "contract_party_organization",
                    EntityType::Organization,
                    r"\b(?i:zwischen|und|entre|et|tra|e|between|and)[ \t]+(?:(?i:der|die|la|le|il|the)[ \t]+)?(?P<value>\p{Lu}[\p{L}&.'-]*(?:[ \t]+\p{Lu}[\p{L}&.'-]*){0,3}[ \t]+(?:AG|GmbH|SA|Sàrl|SARL|Srl|SpA|Ltd|Inc|KG))\b",
                    0.6,
                ),
                Rule::new(
                    "contract_party_person",
                    EntityType::Person,
                    &format!(
                        r"\b(?i:zwischen|und|entre|et|tra|e|between|and)[ \t]+(?i:herrn?|frau|monsieur|madame|signor[ae]?|mr\.?|mrs\.?|ms\.?)[ \t]+(?P<value>{NAME})"
                    ),
                    0.6,
                ),
                Rule::new(
                    "contract_number",
                    EntityType::Reference,
                    &format!(
                        r"(?i:vertragsnummer|vertrags-nr\.?|n° de contrat|contrat n[°o]|contratto n\.?|contract (?:no\.?|number))[ \t]*:?[ \t]*(?P<value>{REFERENCE})"
                    ),
                    0.65,
                ),
            ],
        ),
        (
            DocumentType::Medical,
            vec![
                Rule::new(
                    "patient_name",
                    EntityType::Person,
                    &format!(
                        r"(?i:patient(?:in)?|paziente|patiente|name des patienten|nom du patient|patient name)[ \t]*:[ \t]*(?:(?i:herrn?|frau|m\.|mme)[ \t]+)?(?P<value>{NAME})"
                    ),
                    0.65,
                ),
                Rule::new(
                    "case_number",
                    EntityType::Reference,
                    &format!(
                        r"(?i:fallnummer|fall-nr\.?|patienten-nr\.?|pid|n° de cas|numero caso|case (?:no\.?|number))[ \t]*:?[ \t]*(?P<value>{REFERENCE})"
                    ),
                    0.65,
                ),
            ],
        ),
        (
            DocumentType::Legal,
            vec![
                Rule::new(
                    "case_number",
                    EntityType::Reference,
                    &format!(
                        r"(?i:geschäftsnummer|geschäfts-nr\.?|verfahrensnummer|verfahrens-nr\.?|dossier n[°o]|n° de dossier|incarto n\.?|case (?:no\.?|number)|docket (?:no\.?|number))[ \t]*:?[ \t]*(?P<value>{REFERENCE})"
                    ),
                    0.65,
                ),
                Rule::new(
                    "party",
                    EntityType::Person,
                    &format!(
                        r"(?i:klägerin|kläger|beklagter|beklagte|demanderesse|demandeur|défenderesse|défendeur|attrice|attore|convenuta|convenuto|plaintiff|defendant)[ \t]*:?[ \t]*(?:(?i:herrn?|frau|monsieur|madame|mr\.?|mrs\.?|ms\.?)[ \t]+)?(?P<value>{NAME})"
                    ),
                    0.6,
                ),
            ],
        ),
        (
            DocumentType::Report,
            vec![Rule::new(
                "author",
                EntityType::Person,
                &format!(
                    r"(?i:verfasst von|erstellt von|autorin|autor|rédigé par|auteur|redatto da|autore|prepared by|author)[ \t]*:?[ \t]*(?:(?i:dr|prof)\.?[ \t]+)?(?P<value>{NAME})"
                ),
                0.6,
            )],
        ),
        (
            DocumentType::Correspondence,
            vec![
                Rule::new(
                    "header_name",
                    EntityType::Person,
                    &format!(
                        r"(?m)^[ \t]*(?i:von|an|de|à|da|a|from|to|cc)[ \t]*:[ \t]*(?P<value>{NAME})"
                    ),
                    0.6,
                ),
                Rule::new(
                    "greeting",
                    EntityType::SalutationName,
                    r"(?m)^[ \t]*(?i:hallo|hoi|salut|bonjour|ciao|buongiorno|hi|hello)[ \t]+(?P<value>\p{Lu}[\p{L}'-]+)",
                    0.6,
                ),
            ],
        ),
        (
            DocumentType::Form,
            vec![
                Rule::new(
                    "name_field",
                    EntityType::Person,
                    &format!(
                        r"(?m)^[ \t]*(?i:name|nachname|vorname|nom|prénom|nome|cognome|surname|first name|last name)[ \t]*:[ \t]*(?P<value>{NAME})"
                    ),
                    0.65,
                ),
            ],
        ),
    ])
});

static POSTAL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?:(?:CH|D|A|F|I|FL|L)-)?\d{4,5}[ \t]+\p{Lu}")
        .expect("postal line regex is valid")
});

static SALUTATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ \t]*(sehr geehrte|liebe|madame|monsieur|ch[eè]re?|gentile|egregi|dear|betreff|objet|oggetto|subject)")
        .expect("salutation line regex is valid")
});

/// Region of the text an extraction falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Header,
    Body,
    Footer,
}

impl Region {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Header => "header",
            Self::Body => "body",
            Self::Footer => "footer",
        }
    }
}

/// Applies baseline and type-specific rules
#[derive(Debug, Clone)]
pub struct RuleEngine {
    config: RulesConfig,
}

impl RuleEngine {
    pub fn new(config: &RulesConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Region of `start` within a text of `len` bytes
    pub fn region(&self, start: usize, len: usize) -> Region {
        if len == 0 {
            return Region::Body;
        }
        let position = start as f64 / len as f64;
        if position < self.config.header_fraction {
            Region::Header
        } else if position >= 1.0 - self.config.footer_fraction {
            Region::Footer
        } else {
            Region::Body
        }
    }

    /// Raw extractions for a document type, position boost applied
    pub fn extract(&self, text: &str, document_type: DocumentType) -> Vec<Entity> {
        let mut extracted = Vec::new();
        let type_rules: &[Rule] = if self.config.is_enabled(document_type) {
            TYPE_RULES.get(&document_type).map(Vec::as_slice).unwrap_or_default()
        } else {
            &[]
        };

        for rule in BASELINE.iter().chain(type_rules) {
            for capture in rule.regex.captures_iter(text) {
                let Some(value) = capture.name("value") else {
                    continue;
                };
                if rule.header_only && self.region(value.start(), text.len()) != Region::Header {
                    continue;
                }
                if rule.date && DateValidator::parse(value.as_str()).is_none() {
                    continue;
                }
                if let Some(entity) = self.build(text, rule.entity_type, value.start(), value.end(), rule.confidence, rule.name) {
                    extracted.push(entity);
                }
            }
        }

        if document_type == DocumentType::Letter && self.config.is_enabled(DocumentType::Letter) {
            if let Some((start, end)) = recipient_block(text, self.config.header_fraction) {
                if let Some(entity) =
                    self.build(text, EntityType::RecipientBlock, start, end, 0.6, "recipient_block")
                {
                    extracted.push(entity);
                }
            }
        }
        extracted
    }

    fn build(
        &self,
        text: &str,
        entity_type: EntityType,
        start: usize,
        end: usize,
        confidence: f64,
        rule: &str,
    ) -> Option<Entity> {
        let region = self.region(start, text.len());
        let boost = if region == Region::Body {
            0.0
        } else {
            self.config.position_boost
        };
        Entity::from_span(
            text,
            entity_type,
            start,
            end,
            confidence + boost,
            DetectionSource::Pattern,
        )
        .ok()
        .map(|entity| {
            entity
                .with_metadata("rule", rule)
                .with_metadata("region", region.as_str())
        })
    }

    /// Apply the rules for `document_type` and merge into `existing`
    ///
    /// An unknown document type runs the baseline rules only.
    pub fn apply_type_rules(
        &self,
        text: &str,
        document_type: DocumentType,
        existing: Vec<Entity>,
    ) -> Vec<Entity> {
        let extracted = self.extract(text, document_type);
        let extracted_count = extracted.len();
        let mut entities = existing;
        let mut merged = 0usize;

        for extraction in extracted {
            let target = entities.iter_mut().find(|e| {
                e.overlaps(&extraction) && mergeable(e.entity_type, extraction.entity_type)
            });
            match target {
                Some(entity) => {
                    let a = entity.confidence();
                    let b = extraction.confidence();
                    entity.set_confidence(1.0 - (1.0 - a) * (1.0 - b));
                    if entity.source != DetectionSource::Manual {
                        entity.entity_type = extraction.entity_type;
                        if entity.source == DetectionSource::Model {
                            entity.source = DetectionSource::Both;
                        }
                    }
                    for (key, value) in extraction.metadata {
                        entity.metadata.entry(key).or_insert(value);
                    }
                    merged += 1;
                }
                None => entities.push(extraction),
            }
        }

        entities.sort_by(|a, b| {
            a.start()
                .cmp(&b.start())
                .then(a.end().cmp(&b.end()))
                .then(a.entity_type.cmp(&b.entity_type))
        });
        tracing::debug!(
            document_type = %document_type,
            extracted = extracted_count,
            merged,
            "Type rules applied"
        );
        entities
    }
}

/// Whether an extraction of type `new` may merge into an entity of type `existing`
fn mergeable(existing: EntityType, new: EntityType) -> bool {
    existing == new
        || (existing == EntityType::Person
            && matches!(new, EntityType::SalutationName | EntityType::SignatureName))
}

/// Span of the recipient address block in a letter
///
/// The last block of 2 to 6 non-empty lines that starts in the header
/// region, contains a postal code line and no salutation or subject line.
fn recipient_block(text: &str, header_fraction: f64) -> Option<(usize, usize)> {
    let header_end = (text.len() as f64 * header_fraction) as usize;
    let mut blocks: Vec<(usize, usize, Vec<&str>)> = Vec::new();
    let mut current: Option<(usize, usize, Vec<&str>)> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        let line_start = offset;
        offset += line.len();

        if content.trim().is_empty() {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        let content_start = line_start + (content.len() - content.trim_start().len());
        let content_end = line_start + content.trim_end().len();
        match current.as_mut() {
            Some((_, end, lines)) => {
                *end = content_end;
                lines.push(content);
            }
            None => current = Some((content_start, content_end, vec![content])),
        }
    }
    if let Some(block) = current.take() {
        blocks.push(block);
    }

    blocks
        .into_iter()
        .filter(|(start, _, lines)| {
            *start < header_end
                && (2..=6).contains(&lines.len())
                && lines.iter().any(|l| POSTAL_LINE.is_match(l))
                && !lines.iter().any(|l| SALUTATION_LINE.is_match(l))
        })
        .map(|(start, end, _)| (start, end))
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> RuleEngine {
        RuleEngine::new(&RulesConfig::default())
    }

    fn letter() -> String {
        let body = "wir beziehen uns auf Ihr Schreiben und bestätigen den Eingang. ".repeat(12);
        format!(
            "Muster AG\nBahnhofstrasse 1\n8001 Zürich\n\nHerrn\nHans Müller\nRue de Lausanne 12\n1000 Lausanne\n\nZürich, 12. März 2024\n\nUnser Zeichen: HM-2024/117\n\nSehr geehrter Herr Müller,\n\n{body}\n\nMit freundlichen Grüssen\n\nAnna Beispiel\n"
        )
    }

    fn find<'a>(entities: &'a [Entity], entity_type: EntityType) -> Option<&'a Entity> {
        entities.iter().find(|e| e.entity_type == entity_type)
    }

    #[test]
    fn test_german_salutation_in_header() {
        let text = "Sehr geehrter Herr Müller,\n\nbesten Dank für Ihre Anfrage vom letzten Monat, die wir gerne beantworten.";
        let entities = engine().apply_type_rules(text, DocumentType::Letter, Vec::new());
        let salutation = find(&entities, EntityType::SalutationName).unwrap();
        assert_eq!(salutation.text, "Müller");
        assert_eq!(salutation.metadata["region"], "header");
        assert!((salutation.confidence() - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_letter_rules() {
        let text = letter();
        let entities = engine().apply_type_rules(&text, DocumentType::Letter, Vec::new());

        assert_eq!(find(&entities, EntityType::SalutationName).unwrap().text, "Müller");
        assert_eq!(find(&entities, EntityType::SignatureName).unwrap().text, "Anna Beispiel");
        assert_eq!(find(&entities, EntityType::Reference).unwrap().text, "HM-2024/117");

        let date = find(&entities, EntityType::Date).unwrap();
        assert_eq!(date.text, "12. März 2024");
        assert_eq!(date.metadata["rule"], "document_date");

        let block = find(&entities, EntityType::RecipientBlock).unwrap();
        assert_eq!(block.text, "Herrn\nHans Müller\nRue de Lausanne 12\n1000 Lausanne");
    }

    #[test]
    fn test_signature_gets_footer_boost() {
        let text = letter();
        let entities = engine().apply_type_rules(&text, DocumentType::Letter, Vec::new());
        let signature = find(&entities, EntityType::SignatureName).unwrap();
        assert_eq!(signature.metadata["region"], "footer");
        assert!((signature.confidence() - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_merge_into_existing_person() {
        let text = "Sehr geehrter Herr Müller,\n\nbesten Dank für Ihre Anfrage vom letzten Monat, die wir gerne beantworten.";
        let start = text.find("Müller").unwrap();
        let person = Entity::new(
            EntityType::Person,
            start,
            start + "Müller".len(),
            "Müller",
            0.75,
            DetectionSource::Model,
        )
        .unwrap();
        let entities = engine().apply_type_rules(text, DocumentType::Letter, vec![person]);
        let names: Vec<&Entity> = entities
            .iter()
            .filter(|e| e.start() == start)
            .collect();
        assert_eq!(names.len(), 1);
        assert_eq!(names[0].entity_type, EntityType::SalutationName);
        assert_eq!(names[0].source, DetectionSource::Both);
        let expected = 1.0 - (1.0 - 0.75) * (1.0 - 0.85);
        assert!((names[0].confidence() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_runs_baseline_only() {
        let text = "Sehr geehrter Herr Müller,\nReferenz: AB-1234\nGeburtsdatum: 01.02.1980";
        let entities = engine().apply_type_rules(text, DocumentType::Unknown, Vec::new());
        assert!(find(&entities, EntityType::SalutationName).is_none());
        assert_eq!(find(&entities, EntityType::Reference).unwrap().text, "AB-1234");
        assert_eq!(find(&entities, EntityType::Date).unwrap().text, "01.02.1980");
    }

    #[test]
    fn test_disabled_rule_set_falls_back_to_baseline() {
        let config = RulesConfig {
            enabled_rule_sets: vec![DocumentType::Invoice],
            ..RulesConfig::default()
        };
        let text = "Sehr geehrter Herr Müller,\n\nbesten Dank.";
        let entities = RuleEngine::new(&config).apply_type_rules(text, DocumentType::Letter, Vec::new());
        assert!(find(&entities, EntityType::SalutationName).is_none());
    }

    #[test]
    fn test_invoice_and_form_rules() {
        let invoice = "Rechnung Nr. 2024-0117\nKundennummer: K-99812\nBetrag CHF 120.00";
        let entities = engine().apply_type_rules(invoice, DocumentType::Invoice, Vec::new());
        let refs: Vec<&str> = entities
            .iter()
            .filter(|e| e.entity_type == EntityType::Reference)
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(refs, vec!["2024-0117", "K-99812"]);

        let form = "Anmeldeformular\nName: Beispiel\nVorname: Anna\nGeburtsdatum: 03.04.1990";
        let entities = engine().apply_type_rules(form, DocumentType::Form, Vec::new());
        let people: Vec<&str> = entities
            .iter()
            .filter(|e| e.entity_type == EntityType::Person)
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(people, vec!["Beispiel", "Anna"]);
    }

    #[test]
    fn test_invalid_document_date_is_ignored() {
        let text = format!("Zürich, 31.02.2024\n\n{}", "Text ohne Datum. ".repeat(20));
        let entities = engine().apply_type_rules(&text, DocumentType::Letter, Vec::new());
        assert!(find(&entities, EntityType::Date).is_none());
    }
}
