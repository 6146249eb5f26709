//! Finalizer / decision gate: merge stage outputs, combine confidences,
//! and decide whether the candidate can auto-commit.

use super::types::{
    ExtractedTask, PipelineResult, PriorityAssessment, PriorityLevel, RiskKind, RiskSeverity,
    RiskSignal, TaskCandidate, TaskMetadata,
};

/// Decision thresholds for the confirmation gate.
pub mod thresholds {
    /// Below this aggregate confidence, confirmation is always required.
    pub const CONFIRMATION_FLOOR: f32 = 0.6;

    /// Urgent tasks are held to this stricter bar — misclassifying
    /// urgency is asymmetric, so an extra confirmation round is cheap.
    pub const URGENT_BAR: f32 = 0.8;
}

/// Complexity at or above this earns a split-into-subtasks suggestion.
const SPLIT_SUGGESTION_COMPLEXITY: u8 = 4;

/// Merge the stage outputs into the terminal pipeline result.
///
/// Aggregate confidence is the additive combination `min(a + b, 1.0)`:
/// two confident stages compound, one weak stage drags the sum down.
/// This stage never fails; missing optional fields were already defaulted
/// upstream.
pub fn finalize(
    task: &ExtractedTask,
    assessment: &PriorityAssessment,
    risks: Vec<RiskSignal>,
    mut suggestions: Vec<String>,
) -> PipelineResult {
    let confidence =
        (task.extraction_confidence + assessment.assessment_confidence).min(1.0);

    let mut needs_confirmation = confidence < thresholds::CONFIRMATION_FLOOR;

    if assessment.level == PriorityLevel::Urgent && confidence < thresholds::URGENT_BAR {
        needs_confirmation = true;
        suggestions.push(
            "This task was classified as urgent — please re-verify its content before saving."
                .to_string(),
        );
    }

    if assessment.level == PriorityLevel::High && task.due_date.is_none() {
        suggestions.push(
            "High-priority task without a due date — consider setting one.".to_string(),
        );
    }

    if risks.iter().any(|r| r.severity == RiskSeverity::High) {
        needs_confirmation = true;
        suggestions.push("High-risk task — review before committing.".to_string());
    }

    if task.complexity >= SPLIT_SUGGESTION_COMPLEXITY {
        suggestions.push(
            "This task looks complex — consider splitting it into subtasks.".to_string(),
        );
    }

    let candidate = TaskCandidate {
        title: task.title.clone(),
        description: task.description.clone(),
        priority: assessment.level,
        due_date: task.due_date,
        tags: task.tags.clone(),
        estimated_duration_minutes: task.estimated_duration_minutes,
        metadata: TaskMetadata {
            entities: task.entities.clone(),
            complexity: task.complexity,
            risk_level: assessment.risk_level,
            reasoning: assessment.reasoning.clone(),
            confidence,
            urgent: assessment.level == PriorityLevel::Urgent,
            risk_kinds: risks.iter().map(|r| r.kind).collect::<Vec<RiskKind>>(),
        },
    };

    PipelineResult {
        task: candidate,
        needs_confirmation,
        suggestions,
        risks,
        confidence,
    }
}
