//! Built-in lexicon NER model
//!
//! Deterministic and weight-free: person names after honorifics, place
//! names from the gazetteer, organisation names before a legal form.

use super::{NerModel, TokenPrediction};
use crate::detection::address::gazetteer;
use crate::domain::InferenceError;
use async_trait::async_trait;

const HONORIFICS: &[&str] = &[
    "herr", "herrn", "frau", "monsieur", "madame", "mme", "mademoiselle", "signor", "signore",
    "signora", "sig", "mr", "mrs", "ms", "mister",
];

const TITLES: &[&str] = &["dr", "prof", "med", "lic", "iur", "dipl", "ing"];

const LEGAL_FORMS: &[&str] = &[
    "ag", "gmbh", "sa", "sàrl", "sarl", "srl", "spa", "kg", "ltd", "inc", "genossenschaft",
    "stiftung",
];

/// Longest name or organisation, in tokens
const MAX_NAME_TOKENS: usize = 3;

/// Separators inside a name
const NAME_GAP: &[char] = &[' ', '.'];

/// Separators right after an honorific, which may end its line
const HONORIFIC_GAP: &[char] = &[' ', '.', '\n', '\r'];

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

impl Token<'_> {
    fn lower(&self) -> String {
        self.text.to_lowercase()
    }

    fn is_capitalized(&self) -> bool {
        self.text.chars().next().is_some_and(char::is_uppercase)
    }
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        let word_char = c.is_alphanumeric() || c == '-' || c == '\'';
        match (word_char, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                tokens.push(Token {
                    text: &text[s..i],
                    start: s,
                    end: i,
                });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(Token {
            text: &text[s..],
            start: s,
            end: text.len(),
        });
    }
    tokens
}

/// Gap between two tokens made only of `allowed` characters
fn gap_is(text: &str, left: &Token<'_>, right: &Token<'_>, allowed: &[char]) -> bool {
    text.get(left.end..right.start)
        .is_some_and(|gap| !gap.is_empty() && gap.chars().all(|c| allowed.contains(&c)))
}

/// Whether `right` continues the name started at or after `left`
///
/// Right after the honorific a single line break is allowed as well.
fn name_continues(text: &str, left: &Token<'_>, right: &Token<'_>, after_honorific: bool) -> bool {
    if !after_honorific {
        return gap_is(text, left, right, NAME_GAP);
    }
    gap_is(text, left, right, HONORIFIC_GAP)
        && text
            .get(left.end..right.start)
            .is_some_and(|gap| gap.matches('\n').count() <= 1)
}

/// Weight-free NER model over fixed word lists
#[derive(Debug, Default, Clone)]
pub struct LexiconModel;

impl LexiconModel {
    /// Create the model
    pub fn new() -> Self {
        Self
    }

    fn tag(text: &str) -> Vec<TokenPrediction> {
        let tokens = tokenize(text);
        let mut predictions = Vec::new();
        let mut claimed = vec![false; tokens.len()];

        // person names after honorifics
        for i in 0..tokens.len() {
            if !HONORIFICS.contains(&tokens[i].lower().as_str()) {
                continue;
            }
            let mut j = i + 1;
            while j < tokens.len()
                && TITLES.contains(&tokens[j].lower().as_str())
                && name_continues(text, &tokens[j - 1], &tokens[j], j == i + 1)
            {
                j += 1;
            }
            let mut taken = 0;
            while j < tokens.len()
                && taken < MAX_NAME_TOKENS
                && tokens[j].is_capitalized()
                && !claimed[j]
                && name_continues(text, &tokens[j - 1], &tokens[j], j == i + 1)
            {
                let label = if taken == 0 { "B-PER" } else { "I-PER" };
                predictions.push(TokenPrediction::new(label, tokens[j].start, tokens[j].end, 0.75));
                claimed[j] = true;
                taken += 1;
                j += 1;
            }
        }

        // organisations ending in a legal form
        for i in 1..tokens.len() {
            if !LEGAL_FORMS.contains(&tokens[i].lower().as_str()) || claimed[i] {
                continue;
            }
            let mut first = i;
            while first > 0
                && i - first < MAX_NAME_TOKENS
                && tokens[first - 1].is_capitalized()
                && !claimed[first - 1]
                && gap_is(text, &tokens[first - 1], &tokens[first], &[' '])
            {
                first -= 1;
            }
            if first == i {
                continue;
            }
            for (k, token) in tokens.iter().enumerate().take(i + 1).skip(first) {
                let label = if k == first { "B-ORG" } else { "I-ORG" };
                predictions.push(TokenPrediction::new(label, token.start, token.end, 0.65));
                claimed[k] = true;
            }
        }

        // known places
        for (k, token) in tokens.iter().enumerate() {
            if claimed[k] || !token.is_capitalized() {
                continue;
            }
            if gazetteer::is_known_city(token.text) || gazetteer::is_country(token.text) {
                predictions.push(TokenPrediction::new("B-LOC", token.start, token.end, 0.55));
            }
        }

        predictions.sort_by_key(|p| p.start);
        predictions
    }
}

#[async_trait]
impl NerModel for LexiconModel {
    fn name(&self) -> &str {
        "lexicon"
    }

    async fn predict(&self, text: &str) -> Result<Vec<TokenPrediction>, InferenceError> {
        Ok(Self::tag(text))
    }
}
