//! Priority analysis stage: extracted task → priority assessment.

use serde::Deserialize;

use super::parser::{parse_stage_json, ParseOutcome};
use super::prompt::{build_priority_prompt, PRIORITY_SYSTEM_PROMPT};
use super::types::{ExtractedTask, LlmClient, PriorityAssessment, PriorityLevel, RiskLevel};
use super::InterpretError;

/// Confidence assigned to keyword-fallback assessments.
const FALLBACK_CONFIDENCE: f32 = 0.5;

/// Urgency markers, checked first. Korean and English.
static URGENT_MARKERS: &[&str] = &[
    "urgent", "asap", "emergency", "critical",
    "긴급", "급함", "급해", "당장", "즉시",
];

/// High-priority markers.
static HIGH_MARKERS: &[&str] = &[
    "important", "must", "need to", "required",
    "중요", "해야", "필수", "반드시",
];

/// Low-priority markers.
static LOW_MARKERS: &[&str] = &[
    "when possible", "eventually", "later", "someday",
    "나중에", "언젠가", "천천히", "여유",
];

#[derive(Deserialize)]
struct RawAssessment {
    #[serde(alias = "level")]
    priority: Option<String>,
    reasoning: Option<String>,
    #[serde(alias = "riskLevel")]
    risk_level: Option<String>,
    confidence: Option<f32>,
}

/// Assess the priority of an extracted task.
///
/// Mirrors the extraction stage's failure policy: unparsable model output
/// and recoverable call failures degrade to a keyword scan; only an
/// unreachable endpoint propagates.
pub fn analyze(
    llm: &dyn LlmClient,
    model: &str,
    task: &ExtractedTask,
) -> Result<PriorityAssessment, InterpretError> {
    let prompt = build_priority_prompt(task);

    let response = match llm.generate(model, &prompt, PRIORITY_SYSTEM_PROMPT) {
        Ok(resp) => resp,
        Err(e @ InterpretError::OllamaConnection(_)) => return Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "priority call failed, using keyword fallback");
            return Ok(keyword_fallback(task));
        }
    };

    match parse_stage_json::<RawAssessment>(&response) {
        ParseOutcome::Parsed(raw) => Ok(from_raw(raw)),
        ParseOutcome::Fallback(reason) => {
            tracing::warn!(reason = %reason, "unparsable priority response, using keyword fallback");
            Ok(keyword_fallback(task))
        }
    }
}

fn from_raw(raw: RawAssessment) -> PriorityAssessment {
    let level = raw
        .priority
        .as_deref()
        .map(parse_priority_level)
        .unwrap_or_default();

    let risk_level = raw
        .risk_level
        .as_deref()
        .map(parse_risk_level)
        .unwrap_or_default();

    PriorityAssessment {
        level,
        reasoning: raw
            .reasoning
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "no reasoning provided".to_string()),
        risk_level,
        assessment_confidence: raw
            .confidence
            .map(|c| c.clamp(0.0, 1.0))
            .unwrap_or(FALLBACK_CONFIDENCE),
    }
}

/// Map the model's priority string to a level. Handles Korean labels.
pub fn parse_priority_level(level_str: &str) -> PriorityLevel {
    match level_str.to_lowercase().trim() {
        "urgent" | "긴급" => PriorityLevel::Urgent,
        "high" | "높음" => PriorityLevel::High,
        "low" | "낮음" => PriorityLevel::Low,
        _ => PriorityLevel::Medium,
    }
}

fn parse_risk_level(risk_str: &str) -> RiskLevel {
    match risk_str.to_lowercase().trim() {
        "high" | "높음" => RiskLevel::High,
        "medium" | "보통" => RiskLevel::Medium,
        _ => RiskLevel::Low,
    }
}

/// Keyword-bucket fallback: first matching bucket wins, in the order
/// urgent > high > low; default medium.
pub fn keyword_fallback(task: &ExtractedTask) -> PriorityAssessment {
    let haystack = match &task.description {
        Some(desc) => format!("{} {}", task.title, desc).to_lowercase(),
        None => task.title.to_lowercase(),
    };

    let (level, matched) = if let Some(m) = first_match(&haystack, URGENT_MARKERS) {
        (PriorityLevel::Urgent, m)
    } else if let Some(m) = first_match(&haystack, HIGH_MARKERS) {
        (PriorityLevel::High, m)
    } else if let Some(m) = first_match(&haystack, LOW_MARKERS) {
        (PriorityLevel::Low, m)
    } else {
        (PriorityLevel::Medium, "no keyword match")
    };

    let risk_level = match level {
        PriorityLevel::Urgent | PriorityLevel::High => RiskLevel::Medium,
        _ => RiskLevel::Low,
    };

    PriorityAssessment {
        level,
        reasoning: format!("keyword heuristic: {matched}"),
        risk_level,
        assessment_confidence: FALLBACK_CONFIDENCE,
    }
}

fn first_match<'a>(haystack: &str, markers: &[&'a str]) -> Option<&'a str> {
    markers.iter().find(|m| haystack.contains(*m)).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::heuristic_extraction;
    use crate::pipeline::ollama::{FailingLlmClient, MockLlmClient};

    fn task_with_title(title: &str) -> ExtractedTask {
        let mut task = heuristic_extraction(title, 0.5);
        task.title = title.to_string();
        task
    }

    #[test]
    fn parses_model_assessment() {
        let response = r#"{"priority": "high", "reasoning": "deadline tomorrow", "risk_level": "medium", "confidence": 0.8}"#;
        let llm = MockLlmClient::new(response);
        let assessment = analyze(&llm, "test-model", &task_with_title("보고서 작성")).unwrap();

        assert_eq!(assessment.level, PriorityLevel::High);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.reasoning, "deadline tomorrow");
        assert!((assessment.assessment_confidence - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_priority_string_defaults_to_medium() {
        assert_eq!(parse_priority_level("whenever"), PriorityLevel::Medium);
        assert_eq!(parse_priority_level("URGENT"), PriorityLevel::Urgent);
        assert_eq!(parse_priority_level("긴급"), PriorityLevel::Urgent);
        assert_eq!(parse_priority_level("낮음"), PriorityLevel::Low);
    }

    #[test]
    fn prose_response_uses_keyword_fallback() {
        let llm = MockLlmClient::new("this task seems kind of important I guess");
        let assessment =
            analyze(&llm, "test-model", &task_with_title("긴급히 프레젠테이션 준비")).unwrap();
        assert_eq!(assessment.level, PriorityLevel::Urgent);
        assert!((assessment.assessment_confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn fallback_urgent_beats_low() {
        // Both buckets match — urgent wins.
        let assessment = keyword_fallback(&task_with_title("urgent, but do it later"));
        assert_eq!(assessment.level, PriorityLevel::Urgent);
    }

    #[test]
    fn fallback_high_markers() {
        let assessment = keyword_fallback(&task_with_title("중요한 계약서 검토"));
        assert_eq!(assessment.level, PriorityLevel::High);
    }

    #[test]
    fn fallback_low_markers() {
        let assessment = keyword_fallback(&task_with_title("나중에 책장 정리"));
        assert_eq!(assessment.level, PriorityLevel::Low);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }

    #[test]
    fn fallback_default_medium() {
        let assessment = keyword_fallback(&task_with_title("장보기"));
        assert_eq!(assessment.level, PriorityLevel::Medium);
        assert!((assessment.assessment_confidence - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn fallback_scans_description_too() {
        let mut task = task_with_title("보고서");
        task.description = Some("긴급 처리 요망".into());
        let assessment = keyword_fallback(&task);
        assert_eq!(assessment.level, PriorityLevel::Urgent);
    }

    #[test]
    fn http_failure_uses_keyword_fallback() {
        let llm = FailingLlmClient::timeout();
        let assessment = analyze(&llm, "test-model", &task_with_title("asap fix")).unwrap();
        assert_eq!(assessment.level, PriorityLevel::Urgent);
    }

    #[test]
    fn connection_refused_propagates() {
        let llm = FailingLlmClient::connection_refused();
        let result = analyze(&llm, "test-model", &task_with_title("보고서"));
        assert!(matches!(result, Err(InterpretError::OllamaConnection(_))));
    }

    #[test]
    fn missing_confidence_defaults() {
        let response = r#"{"priority": "medium", "reasoning": "routine"}"#;
        let llm = MockLlmClient::new(response);
        let assessment = analyze(&llm, "test-model", &task_with_title("빨래")).unwrap();
        assert!((assessment.assessment_confidence - 0.5).abs() < f32::EPSILON);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }
}
