//! Integration tests for long-document chunking
//!
//! A document far beyond one model window is split into overlapping,
//! sentence-aligned chunks; a mention inside an overlap zone is seen by two
//! chunks but must come out of the merge exactly once.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use vigil::detection::chunker::{
    chunk_text, estimate_tokens, merge_chunk_predictions, DEFAULT_MAX_TOKENS,
    DEFAULT_OVERLAP_TOKENS,
};
use vigil::detection::config::DetectionConfig;
use vigil::detection::model::{NerModel, TokenPrediction};
use vigil::detection::DetectionPipeline;
use vigil::domain::{DetectionSource, Document, Entity, EntityType, InferenceError};

const NAME: &str = "Xaver Quenzer";

/// A document of at least 15,000 estimated tokens, one name per sentence
fn long_document() -> String {
    let mut text = String::new();
    let mut i = 0;
    while estimate_tokens(&text) < 15_000 {
        text.push_str(&format!(
            "{NAME} prüft den Bericht Nummer {i} und legt ihn danach ab. "
        ));
        i += 1;
    }
    text
}

fn occurrences(text: &str) -> Vec<usize> {
    text.match_indices(NAME).map(|(i, _)| i).collect()
}

/// Tags every occurrence of the name in its input
struct NameModel {
    calls: AtomicU32,
}

#[async_trait]
impl NerModel for NameModel {
    fn name(&self) -> &str {
        "names"
    }

    async fn predict(&self, text: &str) -> Result<Vec<TokenPrediction>, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let surname_offset = NAME.find(' ').unwrap_or(0) + 1;
        let mut predictions = Vec::new();
        for start in occurrences(text) {
            predictions.push(TokenPrediction::new(
                "B-PER",
                start,
                start + surname_offset - 1,
                0.9,
            ));
            predictions.push(TokenPrediction::new(
                "I-PER",
                start + surname_offset,
                start + NAME.len(),
                0.9,
            ));
        }
        Ok(predictions)
    }
}

#[test]
fn test_long_document_is_chunked_with_overlap() {
    let text = long_document();
    let chunks = chunk_text(&text, DEFAULT_MAX_TOKENS, DEFAULT_OVERLAP_TOKENS);

    assert!(chunks.len() > 1);
    assert_eq!(chunks[0].start, 0);
    assert_eq!(chunks.last().unwrap().end, text.len());

    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.index, i);
        assert_eq!(chunk.text, text[chunk.start..chunk.end]);
        assert!(estimate_tokens(&chunk.text) <= DEFAULT_MAX_TOKENS);
        // Every chunk starts at a sentence start
        assert!(chunk.text.starts_with(NAME));
    }
    for pair in chunks.windows(2) {
        assert!(pair[1].start < pair[0].end, "consecutive chunks must overlap");
        assert!(pair[1].start > pair[0].start);
    }
}

#[test]
fn test_overlap_mentions_merge_once() {
    let text = long_document();
    let chunks = chunk_text(&text, DEFAULT_MAX_TOKENS, DEFAULT_OVERLAP_TOKENS);

    let per_chunk: Vec<Vec<Entity>> = chunks
        .iter()
        .map(|chunk| {
            occurrences(&chunk.text)
                .into_iter()
                .map(|start| {
                    Entity::new(
                        EntityType::Person,
                        start,
                        start + NAME.len(),
                        NAME,
                        0.8,
                        DetectionSource::Model,
                    )
                    .unwrap()
                })
                .collect()
        })
        .collect();

    let seen: usize = per_chunk.iter().map(Vec::len).sum();
    let expected = occurrences(&text);
    assert!(seen > expected.len(), "some mention must sit in an overlap zone");

    let merged = merge_chunk_predictions(per_chunk, &chunks);
    let starts: Vec<usize> = merged.iter().map(|e| e.start()).collect();
    assert_eq!(starts, expected);
    assert!(merged.iter().all(|e| &text[e.start()..e.end()] == NAME));
}

#[tokio::test]
async fn test_pipeline_runs_model_per_chunk() {
    let text = long_document();
    let expected_chunks = chunk_text(&text, DEFAULT_MAX_TOKENS, DEFAULT_OVERLAP_TOKENS).len();

    let model = Arc::new(NameModel {
        calls: AtomicU32::new(0),
    });
    let pipeline = DetectionPipeline::with_model(
        DetectionConfig::default(),
        Some(model.clone() as Arc<dyn NerModel>),
    )
    .unwrap();

    let outcome = pipeline.process(&Document::new(text.clone()), None).await.unwrap();

    assert!(outcome.status.is_complete());
    assert_eq!(model.calls.load(Ordering::SeqCst) as usize, expected_chunks);
    assert_eq!(pipeline.metrics().len(), 1);

    for start in occurrences(&text) {
        let at_start = outcome
            .entities
            .iter()
            .filter(|e| e.entity_type == EntityType::Person && e.start() == start)
            .count();
        assert_eq!(at_start, 1, "mention at {start} must appear exactly once");
    }
}
