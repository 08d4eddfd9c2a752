//! Detection summary report
//!
//! Counts only. The report never carries entity or document text, so it
//! can be printed or shared without exposing the PII it describes.

use crate::detection::config::ReviewThresholds;
use crate::detection::pipeline::{DetectionOutcome, ProcessingStatus};
use crate::domain::{DetectionSource, ReviewDecision};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Entities per review decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub auto_anonymize: usize,
    pub suggest: usize,
    pub review: usize,
}

impl DecisionCounts {
    fn add(&mut self, decision: ReviewDecision) {
        match decision {
            ReviewDecision::AutoAnonymize => self.auto_anonymize += 1,
            ReviewDecision::Suggest => self.suggest += 1,
            ReviewDecision::Review => self.review += 1,
        }
    }
}

/// Grouped address statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressSummary {
    pub total: usize,
    pub by_pattern: BTreeMap<String, usize>,
    pub auto_anonymize: usize,
    pub flagged_for_review: usize,
}

/// Summary of one detection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
    pub run_id: String,
    pub document_type: String,
    pub language: String,
    pub classification_confidence: f64,
    pub complete: bool,
    pub partial_reasons: Vec<String>,
    pub total_entities: usize,
    pub entities_by_type: BTreeMap<String, usize>,
    pub entities_by_source: BTreeMap<String, usize>,
    pub decisions: DecisionCounts,
    pub addresses: AddressSummary,
    pub warnings: Vec<String>,
    pub processing_time_ms: u64,
}

fn source_label(source: DetectionSource) -> &'static str {
    match source {
        DetectionSource::Pattern => "pattern",
        DetectionSource::Model => "model",
        DetectionSource::Both => "both",
        DetectionSource::Manual => "manual",
    }
}

impl DetectionReport {
    /// Build a report from a finished run
    pub fn from_outcome(outcome: &DetectionOutcome, thresholds: &ReviewThresholds) -> Self {
        let mut entities_by_type = BTreeMap::new();
        let mut entities_by_source = BTreeMap::new();
        let mut decisions = DecisionCounts::default();

        for entity in &outcome.entities {
            *entities_by_type
                .entry(entity.entity_type.label().to_string())
                .or_insert(0) += 1;
            *entities_by_source
                .entry(source_label(entity.source).to_string())
                .or_insert(0) += 1;
            decisions.add(entity.review_decision(thresholds.review_below, thresholds.auto_anonymize_at));
        }

        let mut addresses = AddressSummary {
            total: outcome.addresses.len(),
            ..AddressSummary::default()
        };
        for address in &outcome.addresses {
            *addresses
                .by_pattern
                .entry(format!("{:?}", address.pattern).to_lowercase())
                .or_insert(0) += 1;
            if address.auto_anonymize {
                addresses.auto_anonymize += 1;
            }
            if address.flagged_for_review {
                addresses.flagged_for_review += 1;
            }
        }

        let (complete, partial_reasons) = match &outcome.status {
            ProcessingStatus::Complete => (true, Vec::new()),
            ProcessingStatus::Partial { reasons } => (false, reasons.clone()),
        };

        Self {
            run_id: outcome.run_id.clone(),
            document_type: outcome.classification.document_type.to_string(),
            language: outcome.classification.language.code().to_string(),
            classification_confidence: outcome.classification.confidence,
            complete,
            partial_reasons,
            total_entities: outcome.entities.len(),
            entities_by_type,
            entities_by_source,
            decisions,
            addresses,
            warnings: outcome.warnings.clone(),
            processing_time_ms: outcome.processing_time_ms,
        }
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let rule = "───────────────────────────────────────────────────────────────\n";
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                    PII DETECTION REPORT                       \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n\n");

        output.push_str("📊 SUMMARY\n");
        output.push_str(rule);
        let status = if self.complete { "complete" } else { "PARTIAL" };
        output.push_str(&format!("  Status:                {status}\n"));
        output.push_str(&format!(
            "  Document Type:         {} ({:.0}%)\n",
            self.document_type,
            self.classification_confidence * 100.0
        ));
        output.push_str(&format!("  Language:              {}\n", self.language));
        output.push_str(&format!("  Entities:              {}\n", self.total_entities));
        output.push_str(&format!("  Addresses:             {}\n", self.addresses.total));
        output.push_str(&format!("  Processing Time:       {} ms\n\n", self.processing_time_ms));

        if !self.entities_by_type.is_empty() {
            output.push_str("🔍 ENTITIES BY TYPE\n");
            output.push_str(rule);
            let mut types: Vec<_> = self.entities_by_type.iter().collect();
            types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            for (entity_type, count) in types {
                output.push_str(&format!("  {entity_type:30} {count:>5}\n"));
            }
            output.push('\n');

            output.push_str("🧭 SOURCES\n");
            output.push_str(rule);
            for (source, count) in &self.entities_by_source {
                output.push_str(&format!("  {source:30} {count:>5}\n"));
            }
            output.push('\n');
        }

        output.push_str("✅ REVIEW TRIAGE\n");
        output.push_str(rule);
        output.push_str(&format!(
            "  Auto-anonymize:        {}\n",
            self.decisions.auto_anonymize + self.addresses.auto_anonymize
        ));
        output.push_str(&format!("  Suggested:             {}\n", self.decisions.suggest));
        output.push_str(&format!(
            "  Needs review:          {}\n\n",
            self.decisions.review + self.addresses.flagged_for_review
        ));

        if !self.addresses.by_pattern.is_empty() {
            output.push_str("🏠 ADDRESSES BY PATTERN\n");
            output.push_str(rule);
            for (pattern, count) in &self.addresses.by_pattern {
                output.push_str(&format!("  {pattern:30} {count:>5}\n"));
            }
            output.push('\n');
        }

        if !self.partial_reasons.is_empty() || !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str(rule);
            for reason in &self.partial_reasons {
                output.push_str(&format!("  • {reason}\n"));
            }
            for warning in &self.warnings {
                output.push_str(&format!("  • {warning}\n"));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
