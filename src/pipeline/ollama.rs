use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::types::LlmClient;
use super::InterpretError;

/// Preferred interpretation models in order of preference. Used when no
/// model is configured explicitly; the first one present on the Ollama
/// instance wins.
const PREFERRED_MODELS: &[&str] = &[
    "exaone3.5",
    "qwen2.5",
    "llama3.1",
    "llama3",
    "mistral",
];

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a new OllamaClient pointing at a local Ollama instance.
    pub fn new(base_url: &str, timeout_secs: u64) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        }
    }

    /// Default Ollama instance at localhost:11434 with 2-minute timeout.
    pub fn default_local() -> Self {
        Self::new("http://localhost:11434", 120)
    }

    /// Find the best available interpretation model.
    pub fn find_best_model(&self) -> Result<String, InterpretError> {
        let available = self.list_models()?;
        for preferred in PREFERRED_MODELS {
            if available.iter().any(|m| m.starts_with(preferred)) {
                return Ok(preferred.to_string());
            }
        }
        Err(InterpretError::NoModelAvailable)
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    options: OllamaOptions,
}

/// Generation options. Extraction wants reproducible JSON, so sampling
/// temperature is pinned to zero.
#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl LlmClient for OllamaClient {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        system: &str,
    ) -> Result<String, InterpretError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt,
            system,
            stream: false,
            options: OllamaOptions { temperature: 0.0 },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    InterpretError::OllamaConnection(self.base_url.clone())
                } else if e.is_timeout() {
                    InterpretError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    InterpretError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InterpretError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| InterpretError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }

    fn is_model_available(&self, model: &str) -> Result<bool, InterpretError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, InterpretError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().map_err(|e| {
            if e.is_connect() {
                InterpretError::OllamaConnection(self.base_url.clone())
            } else {
                InterpretError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(InterpretError::OllamaError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| InterpretError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

/// Mock LLM client for testing — returns one fixed response for every call.
pub struct MockLlmClient {
    response: String,
    available_models: Vec<String>,
}

impl MockLlmClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            available_models: vec!["exaone3.5:latest".to_string()],
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.available_models = models;
        self
    }
}

impl LlmClient for MockLlmClient {
    fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _system: &str,
    ) -> Result<String, InterpretError> {
        Ok(self.response.clone())
    }

    fn is_model_available(&self, model: &str) -> Result<bool, InterpretError> {
        Ok(self.available_models.iter().any(|m| m.starts_with(model)))
    }

    fn list_models(&self) -> Result<Vec<String>, InterpretError> {
        Ok(self.available_models.clone())
    }
}

/// Mock LLM client that plays back a scripted sequence of responses, one
/// per `generate` call (extraction first, then priority). Returns an empty
/// response once the script is exhausted.
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedLlmClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
        }
    }
}

impl LlmClient for ScriptedLlmClient {
    fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _system: &str,
    ) -> Result<String, InterpretError> {
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| InterpretError::HttpClient("mock lock poisoned".into()))?;
        Ok(responses.pop_front().unwrap_or_default())
    }

    fn is_model_available(&self, _model: &str) -> Result<bool, InterpretError> {
        Ok(true)
    }

    fn list_models(&self) -> Result<Vec<String>, InterpretError> {
        Ok(vec!["exaone3.5:latest".into()])
    }
}

/// Mock LLM client whose every call fails, either as an unreachable
/// endpoint (connection refused) or a recoverable transport error.
pub struct FailingLlmClient {
    refuse_connection: bool,
}

impl FailingLlmClient {
    /// Simulates a completion service that is not running at all.
    pub fn connection_refused() -> Self {
        Self {
            refuse_connection: true,
        }
    }

    /// Simulates per-call timeouts with the service otherwise reachable.
    pub fn timeout() -> Self {
        Self {
            refuse_connection: false,
        }
    }

    fn error(&self) -> InterpretError {
        if self.refuse_connection {
            InterpretError::OllamaConnection("http://localhost:11434".into())
        } else {
            InterpretError::HttpClient("Request timed out after 120s".into())
        }
    }
}

impl LlmClient for FailingLlmClient {
    fn generate(
        &self,
        _model: &str,
        _prompt: &str,
        _system: &str,
    ) -> Result<String, InterpretError> {
        Err(self.error())
    }

    fn is_model_available(&self, _model: &str) -> Result<bool, InterpretError> {
        Err(self.error())
    }

    fn list_models(&self) -> Result<Vec<String>, InterpretError> {
        Err(self.error())
    }
}
