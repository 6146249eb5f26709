use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::InterpretError;

/// Priority assigned to a task candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

/// Coarse risk level reported by the priority assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// What a rule-based risk signal is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    Complexity,
    Duration,
    PriorityComplexityMismatch,
}

/// Severity of a risk signal. High severity forces a confirmation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    Low,
    Medium,
    High,
}

/// A rule-derived flag about the candidate task, independent of model
/// confidence (e.g. too complex, too long).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSignal {
    pub kind: RiskKind,
    pub message: String,
    pub severity: RiskSeverity,
}

/// Named entities pulled out of the input text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskEntities {
    pub people: Vec<String>,
    pub places: Vec<String>,
    pub organizations: Vec<String>,
    pub dates: Vec<String>,
}

/// Candidate structured record produced by the extraction stage.
///
/// `title` is never empty — when the model omits it, it is derived by
/// truncating the input text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub tags: BTreeSet<String>,
    pub entities: TaskEntities,
    pub estimated_duration_minutes: u32,
    /// 1 (trivial) to 5 (very complex).
    pub complexity: u8,
    pub extraction_confidence: f32,
}

/// Output of the priority analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityAssessment {
    pub level: PriorityLevel,
    pub reasoning: String,
    pub risk_level: RiskLevel,
    pub assessment_confidence: f32,
}

/// Audit metadata carried alongside the caller-facing task shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub entities: TaskEntities,
    pub complexity: u8,
    pub risk_level: RiskLevel,
    pub reasoning: String,
    pub confidence: f32,
    pub urgent: bool,
    pub risk_kinds: Vec<RiskKind>,
}

/// Finalized task candidate, ready for the calling application to persist
/// (or to present for confirmation first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCandidate {
    pub title: String,
    pub description: Option<String>,
    pub priority: PriorityLevel,
    pub due_date: Option<NaiveDate>,
    pub tags: BTreeSet<String>,
    pub estimated_duration_minutes: u32,
    pub metadata: TaskMetadata,
}

/// Terminal, immutable result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub task: TaskCandidate,
    pub needs_confirmation: bool,
    pub suggestions: Vec<String>,
    pub risks: Vec<RiskSignal>,
    pub confidence: f32,
}

/// Last stage a request completed, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Started,
    Extracted,
    Prioritized,
    RiskChecked,
    Finalized,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Started => "started",
            PipelineStage::Extracted => "extracted",
            PipelineStage::Prioritized => "prioritized",
            PipelineStage::RiskChecked => "risk_checked",
            PipelineStage::Finalized => "finalized",
            PipelineStage::Failed => "failed",
        }
    }
}

/// Per-request state threaded through the stages. Owned exclusively by one
/// in-flight request; discarded once a `PipelineResult` is produced.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub input_text: String,
    pub user_id: String,
    pub extraction: Option<ExtractedTask>,
    pub priority: Option<PriorityAssessment>,
    pub risks: Vec<RiskSignal>,
    /// Append-only across stages.
    pub suggestions: Vec<String>,
    pub confidence: f32,
    pub stage: PipelineStage,
}

impl PipelineState {
    pub fn new(input_text: &str, user_id: &str) -> Self {
        Self {
            input_text: input_text.to_string(),
            user_id: user_id.to_string(),
            extraction: None,
            priority: None,
            risks: Vec::new(),
            suggestions: Vec::new(),
            confidence: 0.0,
            stage: PipelineStage::Started,
        }
    }
}

/// Text completion client abstraction (allows mocking).
pub trait LlmClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<String, InterpretError>;

    fn is_model_available(&self, model: &str) -> Result<bool, InterpretError>;

    fn list_models(&self) -> Result<Vec<String>, InterpretError>;
}
