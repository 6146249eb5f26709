use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "tasksage";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Read-once, process-wide interpreter configuration. Passed explicitly
/// into the orchestrator at startup; never reloaded mid-request.
#[derive(Debug, Clone, Serialize)]
pub struct InterpreterConfig {
    /// Completion endpoint base URL.
    pub base_url: String,
    /// Model name. `None` lets the client pick from its preference list.
    pub model: Option<String>,
    /// Per-call HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl InterpreterConfig {
    /// Read configuration from the environment once at startup:
    /// `TASKSAGE_OLLAMA_URL`, `TASKSAGE_MODEL`, `TASKSAGE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let base_url = std::env::var("TASKSAGE_OLLAMA_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());

        let model = std::env::var("TASKSAGE_MODEL")
            .ok()
            .filter(|v| !v.trim().is_empty());

        let timeout_secs = std::env::var("TASKSAGE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| parse_timeout(&v));

        Self {
            base_url,
            model,
            timeout_secs: timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Parse a timeout value, rejecting zero.
fn parse_timeout(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|t| *t > 0)
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    format!("{APP_NAME}=info")
}
