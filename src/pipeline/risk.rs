//! Rule-based conflict/risk detection. No model call: deterministic and
//! side-effect-free, so every rule is directly unit-testable.

use super::types::{
    ExtractedTask, PriorityAssessment, PriorityLevel, RiskKind, RiskSeverity, RiskSignal,
};

/// Complexity at or above this flags the task as very complex.
const COMPLEXITY_RISK_THRESHOLD: u8 = 4;

/// Estimated durations above this (minutes) flag a long-running task.
const LONG_DURATION_MINUTES: u32 = 240;

/// Inspect the merged record for structural risk signals. Order of the
/// returned signals is the check order below.
pub fn detect(task: &ExtractedTask, assessment: &PriorityAssessment) -> Vec<RiskSignal> {
    let mut signals = Vec::new();

    if task.complexity >= COMPLEXITY_RISK_THRESHOLD {
        signals.push(RiskSignal {
            kind: RiskKind::Complexity,
            message: format!(
                "Task complexity is {} of 5 — very complex tasks are error-prone",
                task.complexity
            ),
            severity: RiskSeverity::High,
        });
    }

    if task.estimated_duration_minutes > LONG_DURATION_MINUTES {
        signals.push(RiskSignal {
            kind: RiskKind::Duration,
            message: format!(
                "Estimated duration is {} minutes — consider reserving a dedicated block",
                task.estimated_duration_minutes
            ),
            severity: RiskSeverity::Medium,
        });
    }

    if assessment.level == PriorityLevel::Urgent && task.complexity >= COMPLEXITY_RISK_THRESHOLD {
        signals.push(RiskSignal {
            kind: RiskKind::PriorityComplexityMismatch,
            message: "Urgent deadline on a very complex task — deadline may be unrealistic"
                .to_string(),
            severity: RiskSeverity::High,
        });
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extract::heuristic_extraction;
    use crate::pipeline::types::RiskLevel;

    fn assessment(level: PriorityLevel) -> PriorityAssessment {
        PriorityAssessment {
            level,
            reasoning: "test".into(),
            risk_level: RiskLevel::Low,
            assessment_confidence: 0.5,
        }
    }

    fn task(complexity: u8, duration: u32) -> ExtractedTask {
        let mut t = heuristic_extraction("테스트 작업", 0.5);
        t.complexity = complexity;
        t.estimated_duration_minutes = duration;
        t
    }

    #[test]
    fn simple_task_no_signals() {
        let signals = detect(&task(2, 30), &assessment(PriorityLevel::Medium));
        assert!(signals.is_empty());
    }

    #[test]
    fn high_complexity_flagged_high_severity() {
        let signals = detect(&task(4, 30), &assessment(PriorityLevel::Medium));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, RiskKind::Complexity);
        assert_eq!(signals[0].severity, RiskSeverity::High);
    }

    #[test]
    fn long_duration_flagged_medium_severity() {
        let signals = detect(&task(2, 300), &assessment(PriorityLevel::Medium));
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, RiskKind::Duration);
        assert_eq!(signals[0].severity, RiskSeverity::Medium);
    }

    #[test]
    fn duration_boundary_not_flagged() {
        let signals = detect(&task(2, 240), &assessment(PriorityLevel::Medium));
        assert!(signals.is_empty());
    }

    #[test]
    fn urgent_complex_task_emits_mismatch() {
        let signals = detect(&task(5, 30), &assessment(PriorityLevel::Urgent));
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].kind, RiskKind::Complexity);
        assert_eq!(signals[1].kind, RiskKind::PriorityComplexityMismatch);
        assert_eq!(signals[1].severity, RiskSeverity::High);
    }

    #[test]
    fn urgent_simple_task_no_mismatch() {
        let signals = detect(&task(2, 30), &assessment(PriorityLevel::Urgent));
        assert!(signals.is_empty());
    }

    #[test]
    fn all_three_signals_in_check_order() {
        let signals = detect(&task(5, 480), &assessment(PriorityLevel::Urgent));
        let kinds: Vec<RiskKind> = signals.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RiskKind::Complexity,
                RiskKind::Duration,
                RiskKind::PriorityComplexityMismatch
            ]
        );
    }

    #[test]
    fn detection_is_deterministic() {
        let t = task(5, 480);
        let a = assessment(PriorityLevel::Urgent);
        assert_eq!(detect(&t, &a), detect(&t, &a));
    }
}
