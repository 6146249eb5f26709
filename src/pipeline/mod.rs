pub mod types;
pub mod sanitize;
pub mod prompt;
pub mod parser;
pub mod extract;
pub mod priority;
pub mod risk;
pub mod finalize;
pub mod ollama;
pub mod orchestrator;

pub use types::*;
pub use parser::ParseOutcome;
pub use ollama::OllamaClient;
pub use orchestrator::TaskInterpreter;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InterpretError {
    #[error("Ollama is not running at {0}")]
    OllamaConnection(String),

    #[error("Ollama returned error (status {status}): {body}")]
    OllamaError { status: u16, body: String },

    #[error("No compatible interpretation model available")]
    NoModelAvailable,

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}
