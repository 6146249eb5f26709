//! tasksage — natural-language task interpretation backed by a local LLM.
//!
//! Free-text input ("긴급히 프레젠테이션 준비해야 함") goes through a staged
//! pipeline — structured extraction, priority analysis, rule-based risk
//! detection, and a confirmation gate — and comes out as a structured task
//! candidate with an aggregate confidence. The pipeline degrades instead of
//! failing: unparsable model output triggers keyword heuristics, and a dead
//! endpoint yields a low-confidence result flagged for confirmation.
//!
//! ```no_run
//! use tasksage::{InterpreterConfig, TaskInterpreter};
//!
//! let config = InterpreterConfig::from_env();
//! let interpreter = TaskInterpreter::from_config(&config)?;
//! let result = interpreter.run("내일까지 프로젝트 보고서 작성", "user-42");
//! if result.needs_confirmation {
//!     // present result.task and result.suggestions to the user
//! }
//! # Ok::<(), tasksage::InterpretError>(())
//! ```

pub mod config;
pub mod pipeline;

pub use config::InterpreterConfig;
pub use pipeline::types::{PipelineResult, TaskCandidate};
pub use pipeline::{InterpretError, TaskInterpreter};

use tracing_subscriber::EnvFilter;

/// Initialize tracing with env-filter; falls back to the crate-scoped
/// default filter when RUST_LOG is unset. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
