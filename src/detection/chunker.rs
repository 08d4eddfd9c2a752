//! Sentence-aligned token chunking for fixed-context models
//!
//! Long documents are split into overlapping windows that never cut a
//! sentence in half. Chunk offsets are in document coordinates so model
//! predictions can be translated back with a single addition.

use crate::domain::{Entity, EntityType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

/// Default maximum tokens per chunk
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// Default overlap between consecutive chunks, in tokens
pub const DEFAULT_OVERLAP_TOKENS: usize = 50;

/// Approximate characters per model token for European languages
const CHARS_PER_TOKEN: usize = 4;

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?…]+\s+|\n\s*").expect("valid sentence break regex"));

/// Tokens ending in a period that do not end a sentence
const ABBREVIATIONS: &[&str] = &[
    "dr", "prof", "nr", "no", "hr", "fr", "st", "str", "ca", "bzw", "z.b", "u.a", "usw", "etc",
    "vgl", "mme", "mlle", "m", "sig", "sig.ra", "dott", "avv", "ing", "mr", "mrs", "ms", "jr",
    "sr", "art", "abs", "tel", "ref", "rif", "vs",
];

/// A window of the original document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Chunk text (a slice of the document)
    pub text: String,
    /// Start offset in the document
    pub start: usize,
    /// End offset in the document (exclusive)
    pub end: usize,
    /// Position in the chunk sequence
    pub index: usize,
}

/// Estimate the model token count of a text
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Split `text` into ordered, sentence-aligned, overlapping chunks
///
/// Texts whose estimated token count fits in `max_tokens` come back as a
/// single chunk equal to the input. Oversized single sentences become their
/// own chunk. Never fails: if sentence segmentation does not produce a
/// consistent tiling, falls back to character windows.
pub fn chunk_text(text: &str, max_tokens: usize, overlap_tokens: usize) -> Vec<TextChunk> {
    let max_tokens = max_tokens.max(1);
    let overlap_tokens = overlap_tokens.min(max_tokens.saturating_sub(1));

    if estimate_tokens(text) <= max_tokens {
        return vec![TextChunk {
            text: text.to_string(),
            start: 0,
            end: text.len(),
            index: 0,
        }];
    }

    match segment_sentences(text) {
        Some(sentences) => pack_sentences(text, &sentences, max_tokens, overlap_tokens),
        None => {
            tracing::warn!(
                text_len = text.len(),
                "Sentence segmentation failed, using character windows"
            );
            chunk_by_characters(text, max_tokens, overlap_tokens)
        }
    }
}

/// Split text into contiguous sentence spans that tile the whole input
///
/// Returns `None` if the spans do not cover the text exactly.
fn segment_sentences(text: &str) -> Option<Vec<Range<usize>>> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_BREAK.find_iter(text) {
        if m.as_str().starts_with('.') && is_abbreviation(&text[start..m.start()]) {
            continue;
        }
        if m.end() > start {
            sentences.push(start..m.end());
            start = m.end();
        }
    }
    if start < text.len() {
        sentences.push(start..text.len());
    }

    let mut cursor = 0;
    for span in &sentences {
        if span.start != cursor || span.end <= span.start {
            return None;
        }
        cursor = span.end;
    }
    (cursor == text.len() && !sentences.is_empty()).then_some(sentences)
}

/// Whether the text before a period ends with an abbreviation or ordinal
fn is_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("");
    if word.is_empty() {
        return false;
    }
    if word.chars().all(|c| c.is_ascii_digit()) && word.len() <= 2 {
        // German ordinal dates: "12. März"
        return true;
    }
    let lower = word.to_lowercase();
    ABBREVIATIONS.contains(&lower.as_str())
        || (word.chars().count() == 1 && word.chars().all(|c| c.is_uppercase()))
}

fn pack_sentences(
    text: &str,
    sentences: &[Range<usize>],
    max_tokens: usize,
    overlap_tokens: usize,
) -> Vec<TextChunk> {
    let tokens: Vec<usize> = sentences
        .iter()
        .map(|s| estimate_tokens(&text[s.clone()]))
        .collect();

    let mut chunks = Vec::new();
    let mut current: Vec<usize> = Vec::new();
    let mut current_tokens = 0;
    // Whether `current` holds a sentence not yet emitted in any chunk
    let mut fresh = false;

    for (i, &sentence_tokens) in tokens.iter().enumerate() {
        if sentence_tokens > max_tokens {
            if fresh {
                emit(text, sentences, &current, &mut chunks);
            }
            emit(text, sentences, &[i], &mut chunks);
            current.clear();
            current_tokens = 0;
            fresh = false;
            continue;
        }

        if current_tokens + sentence_tokens > max_tokens {
            if fresh {
                emit(text, sentences, &current, &mut chunks);

                let mut carried = Vec::new();
                let mut carried_tokens = 0;
                for &j in current.iter().rev() {
                    if carried_tokens + tokens[j] > overlap_tokens {
                        break;
                    }
                    carried_tokens += tokens[j];
                    carried.push(j);
                }
                carried.reverse();
                current = carried;
                current_tokens = carried_tokens;
            }
            while !current.is_empty() && current_tokens + sentence_tokens > max_tokens {
                current_tokens -= tokens[current.remove(0)];
            }
        }

        current.push(i);
        current_tokens += sentence_tokens;
        fresh = true;
    }

    if fresh {
        emit(text, sentences, &current, &mut chunks);
    }

    chunks
}

fn emit(text: &str, sentences: &[Range<usize>], members: &[usize], chunks: &mut Vec<TextChunk>) {
    let (Some(&first), Some(&last)) = (members.first(), members.last()) else {
        return;
    };
    let start = sentences[first].start;
    let end = sentences[last].end;
    chunks.push(TextChunk {
        text: text[start..end].to_string(),
        start,
        end,
        index: chunks.len(),
    });
}

/// Coarse fallback: fixed character windows with character overlap
fn chunk_by_characters(text: &str, max_tokens: usize, overlap_tokens: usize) -> Vec<TextChunk> {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = boundaries.len() - 1;
    let window = max_tokens * CHARS_PER_TOKEN;
    let step = window.saturating_sub(overlap_tokens * CHARS_PER_TOKEN).max(1);

    let mut chunks = Vec::new();
    let mut first_char = 0;
    loop {
        let last_char = (first_char + window).min(char_count);
        let (start, end) = (boundaries[first_char], boundaries[last_char]);
        chunks.push(TextChunk {
            text: text[start..end].to_string(),
            start,
            end,
            index: chunks.len(),
        });
        if last_char >= char_count {
            break;
        }
        first_char += step;
    }
    chunks
}

/// Translate chunk-local predictions to document coordinates and dedupe
///
/// `per_chunk[i]` holds predictions for the chunk whose `index == i`.
/// Predictions found twice in an overlap zone collapse to the instance with
/// the higher confidence. The result is ordered by document position.
pub fn merge_chunk_predictions(per_chunk: Vec<Vec<Entity>>, chunks: &[TextChunk]) -> Vec<Entity> {
    let mut merged: HashMap<(EntityType, usize, usize), Entity> = HashMap::new();

    for (chunk_index, predictions) in per_chunk.into_iter().enumerate() {
        let Some(chunk) = chunks.iter().find(|c| c.index == chunk_index) else {
            tracing::warn!(chunk_index, "Predictions for unknown chunk dropped");
            continue;
        };

        for mut entity in predictions {
            entity.shift(chunk.start);
            let key = (entity.entity_type, entity.start(), entity.end());
            match merged.get(&key) {
                Some(existing) if existing.confidence() >= entity.confidence() => {}
                _ => {
                    merged.insert(key, entity);
                }
            }
        }
    }

    let mut entities: Vec<Entity> = merged.into_values().collect();
    entities.sort_by(|a, b| {
        a.start()
            .cmp(&b.start())
            .then(a.end().cmp(&b.end()))
            .then(a.entity_type.cmp(&b.entity_type))
    });
    entities
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DetectionSource;

    fn sentence_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Dies ist der Satz Nummer {i} in einem langen Dokument. "))
            .collect()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let text = "Sehr geehrter Herr Müller. Vielen Dank.";
        let chunks = chunk_text(text, DEFAULT_MAX_TOKENS, DEFAULT_OVERLAP_TOKENS);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, text.len());
    }

    #[test]
    fn test_empty_text_single_chunk() {
        let chunks = chunk_text("", 10, 2);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.is_empty());
    }

    #[test]
    fn test_chunks_are_sentence_aligned_and_overlap() {
        let text = sentence_text(60);
        let chunks = chunk_text(&text, 64, 16);
        assert!(chunks.len() > 1);

        for chunk in &chunks {
            assert_eq!(&text[chunk.start..chunk.end], chunk.text);
            // every chunk ends at a sentence boundary
            assert!(chunk.text.trim_end().ends_with('.'));
            assert!(estimate_tokens(&chunk.text) <= 64 + 1);
        }
        for pair in chunks.windows(2) {
            assert!(pair[1].start < pair[0].end, "consecutive chunks overlap");
            assert!(pair[1].end > pair[0].end, "chunks make progress");
        }
        assert_eq!(chunks.last().unwrap().end, text.len());
    }

    #[test]
    fn test_oversized_sentence_is_its_own_chunk() {
        let long_sentence = "wort ".repeat(200);
        let text = format!("Kurz. {long_sentence}. Ende hier.");
        let chunks = chunk_text(&text, 40, 5);
        assert!(chunks.iter().any(|c| c.text.contains(&long_sentence)));
        let total: String = text.clone();
        assert_eq!(chunks.last().unwrap().end, total.len());
    }

    #[test]
    fn test_abbreviation_does_not_split() {
        let spans = segment_sentences("Dr. Müller kommt am 12. März. Danke.").unwrap();
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn test_character_fallback_respects_char_boundaries() {
        let text = "äöü".repeat(100);
        let chunks = chunk_by_characters(&text, 10, 2);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(&text[chunk.start..chunk.end], chunk.text);
        }
        assert_eq!(chunks.last().unwrap().end, text.len());
    }

    #[test]
    fn test_merge_single_chunk_is_identity() {
        let text = "Kontakt: anna@example.ch";
        let chunks = chunk_text(text, DEFAULT_MAX_TOKENS, DEFAULT_OVERLAP_TOKENS);
        let entity =
            Entity::from_span(text, EntityType::Email, 9, 24, 0.9, DetectionSource::Model).unwrap();
        let merged = merge_chunk_predictions(vec![vec![entity.clone()]], &chunks);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start(), entity.start());
        assert_eq!(merged[0].end(), entity.end());
    }

    #[test]
    fn test_merge_dedupes_overlap_keeping_higher_confidence() {
        let chunks = vec![
            TextChunk {
                text: "x".repeat(100),
                start: 0,
                end: 100,
                index: 0,
            },
            TextChunk {
                text: "x".repeat(100),
                start: 80,
                end: 180,
                index: 1,
            },
        ];
        // same mention at document offset 90..95
        let a = Entity::new(EntityType::Person, 90, 95, "Meier", 0.6, DetectionSource::Model)
            .unwrap();
        let b = Entity::new(EntityType::Person, 10, 15, "Meier", 0.9, DetectionSource::Model)
            .unwrap();

        let merged = merge_chunk_predictions(vec![vec![a], vec![b]], &chunks);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].start(), 90);
        assert_eq!(merged[0].confidence(), 0.9);
    }
}
