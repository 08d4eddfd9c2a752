//! Integration tests for logging functionality
//!
//! Installing a subscriber is process-wide, so this binary holds a single
//! test that initializes logging.

use std::fs;
use tempfile::TempDir;
use vigil::config::LoggingConfig;
use vigil::detection::config::DetectionConfig;
use vigil::detection::DetectionPipeline;
use vigil::domain::Document;
use vigil::logging::init_logging;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(!config.local_enabled);
    assert_eq!(config.local_path, "logs");
    assert_eq!(config.local_rotation, "daily");
}

#[tokio::test]
async fn test_json_log_file_never_contains_document_text() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "never".to_string(),
    };
    let guard = init_logging("debug", &config).unwrap();
    assert!(log_path.exists());

    let mut detection = DetectionConfig::default();
    detection.inference.enabled = false;
    let pipeline = DetectionPipeline::new(detection).unwrap();
    let document = Document::new(
        "Sehr geehrte Frau Vertraulich,\nbitte melden Sie sich unter geheim.person@example.ch.",
    );
    let outcome = pipeline.process(&document, None).await.unwrap();
    assert!(!outcome.entities.is_empty());

    // Flush the non-blocking writer
    drop(guard);

    let mut contents = String::new();
    for entry in fs::read_dir(&log_path).unwrap() {
        contents.push_str(&fs::read_to_string(entry.unwrap().path()).unwrap());
    }

    assert!(contents.contains("Detection completed"));
    assert!(contents.contains(&outcome.run_id));
    assert!(!contents.contains("geheim.person@example.ch"));
    assert!(!contents.contains("Vertraulich"));

    for line in contents.lines() {
        serde_json::from_str::<serde_json::Value>(line).expect("log line is JSON");
    }
}
