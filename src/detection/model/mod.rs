//! Statistical NER model boundary
//!
//! Models emit token-level BIO predictions over the text they are given.
//! Everything crossing this boundary is plain data.

pub mod dispatcher;
pub mod lexicon;

pub use dispatcher::InferenceDispatcher;
pub use lexicon::LexiconModel;

use crate::domain::{EntityType, InferenceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One token-level prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenPrediction {
    /// BIO label (`B-PER`, `I-LOC`, `O`) or a bare type label
    pub label: String,
    /// Start byte offset in the model input
    pub start: usize,
    /// End byte offset in the model input
    pub end: usize,
    /// Model score (0.0 - 1.0)
    pub score: f64,
}

impl TokenPrediction {
    /// Create a prediction
    pub fn new(label: impl Into<String>, start: usize, end: usize, score: f64) -> Self {
        Self {
            label: label.into(),
            start,
            end,
            score,
        }
    }
}

/// Entity span assembled from one or more token predictions
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpan {
    /// Mapped entity type
    pub entity_type: EntityType,
    /// Model label the type came from
    pub label: String,
    /// Start byte offset in the model input
    pub start: usize,
    /// End byte offset in the model input
    pub end: usize,
    /// Mean token score
    pub score: f64,
}

/// Statistical NER model
#[async_trait]
pub trait NerModel: Send + Sync {
    /// Model name for logs and metrics
    fn name(&self) -> &str;

    /// Token-level predictions for `text`
    async fn predict(&self, text: &str) -> Result<Vec<TokenPrediction>, InferenceError>;
}

/// Reject input the model must never see
///
/// Empty (after trim), larger than `max_bytes`, or carrying NUL or
/// replacement characters left behind by a lossy decode.
pub fn validate_model_input(text: &str, max_bytes: usize) -> Result<(), InferenceError> {
    if text.trim().is_empty() {
        return Err(InferenceError::InvalidInput("empty text".to_string()));
    }
    if text.len() > max_bytes {
        return Err(InferenceError::InvalidInput(format!(
            "text of {} bytes exceeds the {max_bytes}-byte ceiling",
            text.len()
        )));
    }
    if text.contains('\0') || text.contains('\u{FFFD}') {
        return Err(InferenceError::InvalidInput(
            "text contains NUL or replacement characters".to_string(),
        ));
    }
    Ok(())
}

/// Split a label into its BIO prefix and type
fn parse_label(label: &str) -> (Option<char>, &str) {
    if label == "O" {
        return (Some('O'), "");
    }
    match label.split_once('-') {
        Some((prefix, kind)) if prefix.len() == 1 => (prefix.chars().next(), kind),
        _ => (None, label),
    }
}

fn map_label(kind: &str) -> Option<EntityType> {
    match kind.to_uppercase().as_str() {
        "PER" | "PERSON" => Some(EntityType::Person),
        "ORG" | "ORGANIZATION" | "ORGANISATION" => Some(EntityType::Organization),
        "LOC" | "LOCATION" | "GPE" => Some(EntityType::Location),
        "MISC" => None,
        other => EntityType::parse(other).ok(),
    }
}

/// Merge contiguous token predictions into entity spans
///
/// `B-` always opens a span, `I-` extends an open span of the same type,
/// and a bare label extends an open span of that type when only whitespace
/// (or nothing, for subword pieces) separates them. `text` is the model
/// input the offsets refer to.
pub fn merge_subword_predictions(predictions: &[TokenPrediction], text: &str) -> Vec<ModelSpan> {
    let mut sorted: Vec<&TokenPrediction> = predictions
        .iter()
        .filter(|p| p.start < p.end && text.get(p.start..p.end).is_some())
        .collect();
    sorted.sort_by_key(|p| (p.start, p.end));

    let mut spans: Vec<ModelSpan> = Vec::new();
    let mut current: Option<(ModelSpan, usize)> = None;

    let close = |current: &mut Option<(ModelSpan, usize)>, spans: &mut Vec<ModelSpan>| {
        if let Some((mut span, tokens)) = current.take() {
            span.score /= tokens as f64;
            spans.push(span);
        }
    };

    for prediction in sorted {
        let (prefix, kind) = parse_label(&prediction.label);
        if prefix == Some('O') {
            close(&mut current, &mut spans);
            continue;
        }
        let Some(entity_type) = map_label(kind) else {
            close(&mut current, &mut spans);
            continue;
        };

        let continues = match &current {
            Some((span, _)) if prefix != Some('B') && span.entity_type == entity_type => text
                .get(span.end..prediction.start)
                .is_some_and(|gap| gap.chars().all(char::is_whitespace)),
            _ => false,
        };

        if continues {
            if let Some((span, tokens)) = current.as_mut() {
                span.end = span.end.max(prediction.end);
                span.score += prediction.score;
                *tokens += 1;
            }
        } else {
            close(&mut current, &mut spans);
            current = Some((
                ModelSpan {
                    entity_type,
                    label: kind.to_string(),
                    start: prediction.start,
                    end: prediction.end,
                    score: prediction.score,
                },
                1,
            ));
        }
    }
    close(&mut current, &mut spans);
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_validation() {
        assert!(validate_model_input("Hallo Welt", 100).is_ok());
        assert!(validate_model_input("   \n", 100).is_err());
        assert!(validate_model_input(&"a".repeat(101), 100).is_err());
        assert!(validate_model_input("a\0b", 100).is_err());
        assert!(validate_model_input("M\u{FFFD}ller", 100).is_err());
    }

    #[test]
    fn test_bio_merge() {
        let text = "Herr Hans Müller wohnt in Bern";
        let predictions = vec![
            TokenPrediction::new("O", 0, 4, 0.9),
            TokenPrediction::new("B-PER", 5, 9, 0.9),
            TokenPrediction::new("I-PER", 10, 17, 0.7),
            TokenPrediction::new("O", 18, 23, 0.9),
            TokenPrediction::new("B-LOC", 27, 31, 0.8),
        ];
        let spans = merge_subword_predictions(&predictions, text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].entity_type, EntityType::Person);
        assert_eq!(&text[spans[0].start..spans[0].end], "Hans Müller");
        assert!((spans[0].score - 0.8).abs() < 1e-9);
        assert_eq!(spans[1].entity_type, EntityType::Location);
    }

    #[test]
    fn test_subword_pieces_merge() {
        let text = "Zollikerberg";
        let predictions = vec![
            TokenPrediction::new("LOC", 0, 5, 0.6),
            TokenPrediction::new("LOC", 5, 9, 0.6),
            TokenPrediction::new("LOC", 9, 12, 0.6),
        ];
        let spans = merge_subword_predictions(&predictions, text);
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start, spans[0].end), (0, 12));
    }

    #[test]
    fn test_new_begin_splits_and_misc_is_dropped() {
        let text = "Anna Bern Euro";
        let predictions = vec![
            TokenPrediction::new("B-PER", 0, 4, 0.9),
            TokenPrediction::new("B-PER", 5, 9, 0.9),
            TokenPrediction::new("B-MISC", 10, 14, 0.9),
        ];
        let spans = merge_subword_predictions(&predictions, text);
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn test_invalid_offsets_are_ignored() {
        let text = "Müller";
        let predictions = vec![TokenPrediction::new("B-PER", 0, 2, 0.9)];
        assert!(merge_subword_predictions(&predictions, text).is_empty());
    }
}
