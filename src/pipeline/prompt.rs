use chrono::NaiveDate;

use super::types::ExtractedTask;

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"
You are a task extraction assistant. Your ONLY role is to convert free-text
task input (Korean or English) into a structured JSON record.

RULES — ABSOLUTE, NO EXCEPTIONS:
1. Extract ONLY information present in the input text.
2. NEVER invent deadlines, people, or details that are not written.
3. If a field is unclear or missing, output null for that field.
4. Dates MUST be ISO format (YYYY-MM-DD). Resolve relative dates like
   "내일" or "tomorrow" against today's date given in the prompt.
5. Output MUST be a single JSON object. No prose before or after it.
"#;

/// Build the extraction prompt for one piece of task input.
pub fn build_extraction_prompt(input_text: &str, today: NaiveDate) -> String {
    format!(
        r#"Today's date is {today}.

<input>
{input_text}
</input>

Extract the task described above into the following JSON structure.
For any field not present in the input, use null.

{{
  "title": "short task title",
  "description": "longer description or null",
  "due_date": "YYYY-MM-DD or null",
  "tags": ["tag1", "tag2"],
  "entities": {{
    "people": [],
    "places": [],
    "organizations": [],
    "dates": []
  }},
  "estimated_duration": 30,
  "complexity": 2,
  "confidence": 0.0
}}

"estimated_duration" is in minutes. "complexity" is an integer from 1
(trivial) to 5 (very complex). "confidence" is how sure you are about the
extraction, from 0.0 to 1.0.
"#
    )
}

pub const PRIORITY_SYSTEM_PROMPT: &str = r#"
You are a task priority assessor. Given a structured task record, you assign
one priority level and explain why.

RULES:
1. Priority MUST be exactly one of: urgent, high, medium, low.
2. Risk level MUST be exactly one of: low, medium, high.
3. Base the assessment only on the task fields provided.
4. Output MUST be a single JSON object. No prose before or after it.
"#;

/// Build the priority assessment prompt from an extracted task.
pub fn build_priority_prompt(task: &ExtractedTask) -> String {
    let due = task
        .due_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "none".to_string());
    let tags: Vec<&str> = task.tags.iter().map(String::as_str).collect();

    format!(
        r#"Assess the priority of this task:

Title: {title}
Description: {description}
Due date: {due}
Complexity (1-5): {complexity}
Tags: {tags}

Respond with this JSON structure:

{{
  "priority": "urgent | high | medium | low",
  "reasoning": "one or two sentences",
  "risk_level": "low | medium | high",
  "confidence": 0.0
}}
"#,
        title = task.title,
        description = task.description.as_deref().unwrap_or("none"),
        complexity = task.complexity,
        tags = tags.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::TaskEntities;
    use std::collections::BTreeSet;

    fn sample_task() -> ExtractedTask {
        ExtractedTask {
            title: "프로젝트 보고서 작성".into(),
            description: Some("분기 보고서 초안".into()),
            due_date: NaiveDate::from_ymd_opt(2026, 9, 1),
            tags: BTreeSet::from(["보고서".to_string()]),
            entities: TaskEntities::default(),
            estimated_duration_minutes: 60,
            complexity: 2,
            extraction_confidence: 0.9,
        }
    }

    #[test]
    fn extraction_prompt_contains_input_and_date() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 29).unwrap();
        let prompt = build_extraction_prompt("내일까지 보고서 작성", today);
        assert!(prompt.contains("내일까지 보고서 작성"));
        assert!(prompt.contains("2026-08-29"));
        assert!(prompt.contains("<input>"));
        assert!(prompt.contains("</input>"));
    }

    #[test]
    fn extraction_system_prompt_demands_json_only() {
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("single JSON object"));
        assert!(EXTRACTION_SYSTEM_PROMPT.contains("NEVER invent"));
    }

    #[test]
    fn priority_prompt_embeds_task_fields() {
        let prompt = build_priority_prompt(&sample_task());
        assert!(prompt.contains("프로젝트 보고서 작성"));
        assert!(prompt.contains("2026-09-01"));
        assert!(prompt.contains("보고서"));
        assert!(prompt.contains("Complexity (1-5): 2"));
    }

    #[test]
    fn priority_prompt_handles_missing_fields() {
        let mut task = sample_task();
        task.description = None;
        task.due_date = None;
        let prompt = build_priority_prompt(&task);
        assert!(prompt.contains("Description: none"));
        assert!(prompt.contains("Due date: none"));
    }

    #[test]
    fn priority_system_prompt_lists_levels() {
        assert!(PRIORITY_SYSTEM_PROMPT.contains("urgent, high, medium, low"));
    }
}
