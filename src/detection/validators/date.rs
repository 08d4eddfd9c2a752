//! Calendar date validator

use super::{ValidationContext, ValidationResult, Validator};
use crate::detection::locale;
use crate::domain::EntityType;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::LazyLock;

/// Longest written date ("Mittwoch, 24. September 2025") plus slack
const MAX_LENGTH: usize = 50;

static NUMERIC_DMY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[./-](\d{1,2})[./-](\d{2}|\d{4})$").expect("numeric date regex is valid")
});

static NUMERIC_ISO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("iso date regex is valid")
});

// "12. März 2024", "1er janvier 2024", "3 maggio 2024"
static WRITTEN_DMY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\p{L}+,?\s+)?(\d{1,2})(?:\.|er|st|nd|rd|th)?\s+(\p{L}+)\.?\s+(\d{4})$")
        .expect("written date regex is valid")
});

// "March 12, 2024"
static WRITTEN_MDY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\p{L}+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})$")
        .expect("written date regex is valid")
});

/// Validates numeric and written dates in de/fr/it/en
#[derive(Debug, Default, Clone, Copy)]
pub struct DateValidator;

impl DateValidator {
    /// Parse a date in any supported format
    pub fn parse(value: &str) -> Option<NaiveDate> {
        let value = value.trim();

        if let Some(caps) = NUMERIC_ISO.captures(value) {
            return Self::ymd(&caps[1], &caps[2], &caps[3]);
        }
        if let Some(caps) = NUMERIC_DMY.captures(value) {
            return Self::ymd(&caps[3], &caps[2], &caps[1]);
        }
        if let Some(caps) = WRITTEN_DMY.captures(value) {
            let (month, _) = locale::month_number_any(&caps[2])?;
            return Self::ymd(&caps[3], &month.to_string(), &caps[1]);
        }
        if let Some(caps) = WRITTEN_MDY.captures(value) {
            let (month, _) = locale::month_number_any(&caps[1])?;
            return Self::ymd(&caps[3], &month.to_string(), &caps[2]);
        }
        None
    }

    fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
        let mut year: i32 = year.parse().ok()?;
        if year < 100 {
            // two-digit years: 00-49 -> 2000s, 50-99 -> 1900s
            year += if year < 50 { 2000 } else { 1900 };
        }
        NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
    }
}

impl Validator for DateValidator {
    fn entity_type(&self) -> EntityType {
        EntityType::Date
    }

    fn name(&self) -> &'static str {
        "date"
    }

    fn max_length(&self) -> usize {
        MAX_LENGTH
    }

    fn check_format(&self, value: &str, _ctx: &ValidationContext<'_>) -> ValidationResult {
        match Self::parse(value) {
            Some(date) if (1900..=2100).contains(&date.year()) => {
                ValidationResult::valid(0.1, "Valid calendar date")
            }
            Some(_) => ValidationResult::valid(0.0, "Valid date outside the expected range"),
            None => ValidationResult::invalid("Not a valid calendar date"),
        }
    }
}
