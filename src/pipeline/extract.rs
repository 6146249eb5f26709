//! Structured extraction stage: free text → candidate task record.
//!
//! Prefers the model's JSON output; degrades to keyword/regex heuristics
//! when the response is unparsable, and never fails past this boundary
//! except for an unreachable completion endpoint.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{Days, Local, NaiveDate};
use regex::Regex;
use serde::Deserialize;

use super::parser::{parse_stage_json, ParseOutcome};
use super::prompt::{build_extraction_prompt, EXTRACTION_SYSTEM_PROMPT};
use super::sanitize::sanitize_input;
use super::types::{ExtractedTask, LlmClient, TaskEntities};
use super::InterpretError;

/// Maximum derived title length (characters) before ellipsis truncation.
pub const MAX_TITLE_CHARS: usize = 50;

/// Confidence assigned when the model responded but its output was unparsable.
const PARSE_FALLBACK_CONFIDENCE: f32 = 0.5;

/// Confidence assigned when the completion call itself failed.
const FAILURE_FALLBACK_CONFIDENCE: f32 = 0.2;

const DEFAULT_DURATION_MINUTES: u32 = 30;
const DEFAULT_COMPLEXITY: u8 = 2;

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\w+)").expect("tag regex"));

static LITERAL_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{4}[-./]\d{1,2}[-./]\d{1,2}\b").expect("date regex"));

/// Relative-date keywords (Korean and English) with day offsets.
// "day after tomorrow" must precede "tomorrow" for substring matching.
static RELATIVE_DATE_KEYWORDS: &[(&str, u64)] = &[
    ("오늘", 0),
    ("today", 0),
    ("모레", 2),
    ("day after tomorrow", 2),
    ("내일", 1),
    ("tomorrow", 1),
    ("다음주", 7),
    ("다음 주", 7),
    ("next week", 7),
];

/// Raw model response shape. Every field is optional — the model's output
/// shape is not trusted; defaults are applied when building the record.
#[derive(Deserialize)]
struct RawExtraction {
    title: Option<String>,
    description: Option<String>,
    #[serde(alias = "dueDate")]
    due_date: Option<String>,
    tags: Option<Vec<String>>,
    entities: Option<RawEntities>,
    #[serde(alias = "estimatedDuration", alias = "estimated_duration_minutes")]
    estimated_duration: Option<u32>,
    complexity: Option<u8>,
    confidence: Option<f32>,
}

#[derive(Deserialize, Default)]
struct RawEntities {
    people: Option<Vec<String>>,
    places: Option<Vec<String>>,
    organizations: Option<Vec<String>>,
    dates: Option<Vec<String>>,
}

/// Extract a structured task record from free text.
///
/// Always returns a record: model-output problems fall back to heuristics
/// with a penalized confidence. Only an unreachable completion endpoint
/// propagates as an error (the orchestrator handles that case).
pub fn extract(
    llm: &dyn LlmClient,
    model: &str,
    input_text: &str,
) -> Result<ExtractedTask, InterpretError> {
    let sanitized = sanitize_input(input_text);
    let today = Local::now().date_naive();
    let prompt = build_extraction_prompt(&sanitized, today);

    let response = match llm.generate(model, &prompt, EXTRACTION_SYSTEM_PROMPT) {
        Ok(resp) => resp,
        Err(e @ InterpretError::OllamaConnection(_)) => return Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "extraction call failed, using heuristics");
            return Ok(heuristic_extraction(input_text, FAILURE_FALLBACK_CONFIDENCE));
        }
    };

    match parse_stage_json::<RawExtraction>(&response) {
        ParseOutcome::Parsed(raw) => Ok(from_raw(raw, input_text, today)),
        ParseOutcome::Fallback(reason) => {
            tracing::warn!(reason = %reason, "unparsable extraction response, using heuristics");
            Ok(heuristic_extraction(input_text, PARSE_FALLBACK_CONFIDENCE))
        }
    }
}

/// Build the task record from the model's raw JSON, applying defaults for
/// every missing field.
fn from_raw(raw: RawExtraction, input_text: &str, today: NaiveDate) -> ExtractedTask {
    let title = match raw.title {
        Some(t) if !t.trim().is_empty() => t.trim().to_string(),
        _ => derive_title(input_text),
    };

    let description = raw
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    let due_date = raw
        .due_date
        .as_deref()
        .and_then(|s| parse_due_date(s, today));

    let tags: BTreeSet<String> = raw
        .tags
        .unwrap_or_default()
        .into_iter()
        .map(|t| t.trim_start_matches('#').trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    let raw_entities = raw.entities.unwrap_or_default();
    let entities = TaskEntities {
        people: raw_entities.people.unwrap_or_default(),
        places: raw_entities.places.unwrap_or_default(),
        organizations: raw_entities.organizations.unwrap_or_default(),
        dates: raw_entities.dates.unwrap_or_default(),
    };

    let extraction_confidence = match raw.confidence {
        Some(c) => c.clamp(0.0, 1.0),
        None => derived_confidence(&title, description.as_deref(), due_date.is_some(), !tags.is_empty()),
    };

    ExtractedTask {
        title,
        description,
        due_date,
        tags,
        entities,
        estimated_duration_minutes: raw.estimated_duration.unwrap_or(DEFAULT_DURATION_MINUTES),
        complexity: raw.complexity.unwrap_or(DEFAULT_COMPLEXITY).clamp(1, 5),
        extraction_confidence,
    }
}

/// Confidence heuristic when the model did not report one: start at 0.5,
/// add small bonuses for each field the extraction actually found.
fn derived_confidence(
    title: &str,
    description: Option<&str>,
    has_due_date: bool,
    has_tags: bool,
) -> f32 {
    let mut confidence = 0.5f32;
    if title.chars().count() > 5 {
        confidence += 0.2;
    }
    if description.is_some_and(|d| d.chars().count() > 10) {
        confidence += 0.1;
    }
    if has_due_date {
        confidence += 0.1;
    }
    if has_tags {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

/// Keyword/regex extraction used when the model output is unusable.
pub fn heuristic_extraction(input_text: &str, confidence: f32) -> ExtractedTask {
    let tags: BTreeSet<String> = TAG_RE
        .captures_iter(input_text)
        .map(|c| c[1].to_string())
        .collect();

    let today = Local::now().date_naive();
    let mut date_literals: Vec<String> = Vec::new();
    let mut due_date: Option<NaiveDate> = None;

    if let Some(m) = LITERAL_DATE_RE.find(input_text) {
        date_literals.push(m.as_str().to_string());
        due_date = parse_due_date(m.as_str(), today);
    }

    if due_date.is_none() {
        let lower = input_text.to_lowercase();
        for (keyword, offset) in RELATIVE_DATE_KEYWORDS {
            if lower.contains(keyword) {
                date_literals.push((*keyword).to_string());
                due_date = today.checked_add_days(Days::new(*offset));
                break;
            }
        }
    }

    ExtractedTask {
        title: derive_title(input_text),
        description: None,
        due_date,
        tags,
        entities: TaskEntities {
            dates: date_literals,
            ..TaskEntities::default()
        },
        estimated_duration_minutes: DEFAULT_DURATION_MINUTES,
        complexity: DEFAULT_COMPLEXITY,
        extraction_confidence: confidence,
    }
}

/// Derive a title from the raw input: trimmed, truncated to
/// `MAX_TITLE_CHARS` with an ellipsis. Never empty.
pub fn derive_title(input_text: &str) -> String {
    let trimmed = input_text.trim();
    if trimmed.is_empty() {
        return "Untitled task".to_string();
    }
    if trimmed.chars().count() <= MAX_TITLE_CHARS {
        return trimmed.to_string();
    }
    let mut title: String = trimmed.chars().take(MAX_TITLE_CHARS).collect();
    title.push('…');
    title
}

/// Parse a due-date string from model output or raw input. Handles ISO and
/// common dotted/slashed formats plus relative keywords.
pub fn parse_due_date(date_str: &str, today: NaiveDate) -> Option<NaiveDate> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return None;
    }

    for format in ["%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(d);
        }
    }

    let lower = trimmed.to_lowercase();
    RELATIVE_DATE_KEYWORDS
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .and_then(|(_, offset)| today.checked_add_days(Days::new(*offset)))
}
