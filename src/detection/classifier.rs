//! Document classification
//!
//! Language by stop-word voting, document type by weighted structural and
//! lexical signals in German, French, Italian and English. Each signal
//! counts once. A document whose best type scores below
//! [`MIN_TYPE_SCORE`] is classified as [`DocumentType::Unknown`].

use crate::domain::{DocumentClassification, DocumentType, Language};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Minimum signal weight for a type to be assigned
pub const MIN_TYPE_SCORE: u32 = 2;

const STOP_WORDS: &[(Language, &[&str])] = &[
    (
        Language::De,
        &[
            "der", "die", "das", "und", "ist", "nicht", "mit", "sie", "ich", "für", "wir", "ihr",
            "den", "dem", "ein", "eine", "zu", "auf", "von", "bei", "sehr", "wird", "uns",
        ],
    ),
    (
        Language::Fr,
        &[
            "le", "la", "les", "et", "est", "pas", "avec", "vous", "nous", "pour", "une", "des",
            "du", "au", "dans", "que", "qui", "sur", "votre", "nos", "ce",
        ],
    ),
    (
        Language::It,
        &[
            "il", "lo", "gli", "è", "non", "con", "per", "una", "che", "del", "della", "sono",
            "questo", "nel", "alla", "al", "di", "le", "vostro", "suo",
        ],
    ),
    (
        Language::En,
        &[
            "the", "and", "is", "not", "with", "you", "we", "for", "of", "to", "in", "that",
            "this", "are", "be", "our", "your", "please",
        ],
    ),
];

struct Signal {
    regex: Regex,
    weight: u32,
}

fn signal(pattern: &str, weight: u32) -> Signal {
    Signal {
        regex: Regex::new(pattern).expect("classifier signal regex is valid"),
        weight,
    }
}

static SIGNALS: LazyLock<Vec<(DocumentType, Vec<Signal>)>> = LazyLock::new(|| {
    vec![
        (
            DocumentType::Invoice,
            vec![
                signal(r"(?i)\b(rechnung|facture|fattura|invoice)\b", 2),
                signal(
                    r"(?i)\b(menge|anzahl|quantité|quantità|quantity|qty|einzelpreis|prix unitaire|prezzo unitario|unit price)\b",
                    2,
                ),
                signal(r"(?i)\b(gesamtbetrag|total|totale|montant|betrag|importo|mwst|tva|iva|vat)\b", 1),
                signal(r"(?i)\b(zahlbar|fällig|payable|échéance|scadenza|due date|zahlungsfrist)\b", 1),
                signal(r"\b(CHF|EUR|Fr\.)\s?\d", 1),
            ],
        ),
        (
            DocumentType::Letter,
            vec![
                signal(
                    r"(?im)^\s*(sehr geehrte[rs]?|liebe[rs]?|madame|monsieur|ch[eè]re?|gentile|egregi[oa]|caro|cara|dear)\b",
                    3,
                ),
                signal(
                    r"(?im)^\s*(mit freundlichen gr(ü|ue|u)(ss|ß)en|freundliche gr(ü|ue|u)(ss|ß)e|beste gr(ü|ue|u)(ss|ß)e|veuillez agréer|meilleures salutations|salutations distinguées|cordiali saluti|distinti saluti|yours sincerely|yours faithfully|kind regards|best regards|sincerely)",
                    3,
                ),
                signal(r"(?im)^\s*(betreff|betr\.|objet|oggetto|subject|concerne)\s*:", 1),
            ],
        ),
        (
            DocumentType::Contract,
            vec![
                signal(r"(?i)\b(vertrag|arbeitsvertrag|mietvertrag|contrat|contratto|contract|agreement|vereinbarung)\b", 2),
                signal(r"(?i)\b(vertragsparteien|les parties|le parti|the parties|parteien)\b", 2),
                signal(r"(?i)(§\s?\d|\b(artikel|article|articolo|art\.)\s?\d)", 1),
                signal(r"(?i)\b(kündigung|résiliation|disdetta|termination)\b", 1),
                signal(r"(?i)\b(unterschrift|unterzeichnet|signature|firmato|signed)\b", 1),
            ],
        ),
        (
            DocumentType::Report,
            vec![
                signal(r"(?i)\b(bericht|rapport|rapporto|report)\b", 2),
                signal(
                    r"(?i)\b(zusammenfassung|résumé|riassunto|summary|ergebnisse|résultats|risultati|results|schlussfolgerung|conclusion|conclusione)\b",
                    2,
                ),
                signal(r"(?m)^\s*\d+(\.\d+)*\.?\s+\p{Lu}", 1),
            ],
        ),
        (
            DocumentType::Medical,
            vec![
                signal(r"(?i)\b(diagnose|diagnostic|diagnosi|diagnosis|befund|anamnese|anamnesi|anamnesis)\b", 2),
                signal(r"(?i)\b(patient|patientin|paziente|patiente)\b", 1),
                signal(
                    r"(?i)\b(medikation|medikament|médicament|farmaco|medication|dosierung|posologie|dosage|therapie|thérapie|terapia|therapy)\b",
                    2,
                ),
                signal(r"(?i)\b(spital|klinik|hôpital|clinique|ospedale|clinica|hospital|clinic|arzt|ärztin|médecin|medico|physician)\b", 1),
            ],
        ),
        (
            DocumentType::Legal,
            vec![
                signal(r"(?i)\b(gericht|bundesgericht|tribunal|tribunale|court)\b", 2),
                signal(
                    r"(?i)\b(kläger(in)?|beklagte[rn]?|demandeur|défendeur|défenderesse|attore|convenuto|plaintiff|defendant)\b",
                    2,
                ),
                signal(r"(?i)\b(urteil|jugement|sentenza|judgment|verfügung|beschwerde|recours|ricorso|appeal)\b", 1),
                signal(r"(?i)\b(rechtsanwalt|rechtsanwältin|avocat|avocate|avvocato|attorney|lawyer)\b", 1),
            ],
        ),
        (
            DocumentType::Correspondence,
            vec![
                signal(r"(?im)^\s*(von|an|de|à|da|a|from|to|cc|gesendet|envoyé|inviato|sent)\s*:", 2),
                signal(r"(?im)^\s*(hallo|hoi|grüezi|salut|bonjour|ciao|buongiorno|hi|hello)\b", 1),
                signal(r"(?i)\b(weitergeleitet|forwarded|transféré|inoltrato|antwort|réponse|risposta|reply)\b", 1),
                signal(r"(?i)\b(aw|re|wg|fwd?|tr):\s", 1),
            ],
        ),
        (
            DocumentType::Form,
            vec![
                signal(r"(?i)\b(formular|formulaire|modulo|form|antrag|anmeldung|demande|richiesta|application)\b", 2),
                signal(r"(_{4,}|\[\s?\]|☐|☑|☒)", 2),
                signal(r"(?i)\b(ankreuzen|cocher|barrare|tick|ausfüllen|à remplir|compilare|fill in)\b", 1),
            ],
        ),
    ]
});

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}

/// Detect the dominant language by stop-word voting
///
/// Ties go to the earliest hint among the tied languages. With no votes
/// at all the first hint wins, or [`Language::Unknown`] without hints.
pub fn detect_language(text: &str, hints: &[Language]) -> Language {
    let mut votes: HashMap<Language, usize> = HashMap::new();
    for word in words(text) {
        for (language, stop_words) in STOP_WORDS {
            if stop_words.contains(&word.as_str()) {
                *votes.entry(*language).or_default() += 1;
            }
        }
    }

    let best = votes.values().copied().max().unwrap_or(0);
    if best == 0 {
        return hints.first().copied().unwrap_or(Language::Unknown);
    }
    let tied: Vec<Language> = Language::KNOWN
        .iter()
        .copied()
        .filter(|l| votes.get(l).copied().unwrap_or(0) == best)
        .collect();

    hints
        .iter()
        .copied()
        .find(|hint| tied.contains(hint))
        .or_else(|| tied.first().copied())
        .unwrap_or(Language::Unknown)
}

/// Stateless document classifier
#[derive(Debug, Clone, Default)]
pub struct DocumentClassifier {
    language_hints: Vec<Language>,
}

impl DocumentClassifier {
    /// Create a classifier with language hints, most likely first
    pub fn new(language_hints: Vec<Language>) -> Self {
        Self { language_hints }
    }

    /// Signal weight per classifiable type
    pub fn type_scores(text: &str) -> Vec<(DocumentType, u32)> {
        SIGNALS
            .iter()
            .map(|(document_type, signals)| {
                let score = signals
                    .iter()
                    .filter(|s| s.regex.is_match(text))
                    .map(|s| s.weight)
                    .sum();
                (*document_type, score)
            })
            .collect()
    }

    /// Classify `text`
    ///
    /// `language_hint` (from document metadata) takes precedence over the
    /// configured hints when breaking ties.
    pub fn classify(&self, text: &str, language_hint: Option<Language>) -> DocumentClassification {
        let hints: Vec<Language> = language_hint
            .into_iter()
            .chain(self.language_hints.iter().copied())
            .collect();
        let language = detect_language(text, &hints);

        let scores = Self::type_scores(text);
        let mut best: Option<(DocumentType, u32)> = None;
        for &(document_type, score) in &scores {
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((document_type, score));
            }
        }

        let classification = match best {
            Some((document_type, top)) if top >= MIN_TYPE_SCORE => {
                let runner_up = scores
                    .iter()
                    .filter(|(t, _)| *t != document_type)
                    .map(|(_, s)| *s)
                    .max()
                    .unwrap_or(0);
                DocumentClassification {
                    document_type,
                    confidence: f64::from(top) / f64::from(top + runner_up + 1),
                    language,
                }
            }
            _ => DocumentClassification::unknown(language),
        };

        tracing::debug!(
            document_type = %classification.document_type,
            confidence = classification.confidence,
            language = %classification.language,
            "Document classified"
        );
        classification
    }
}
