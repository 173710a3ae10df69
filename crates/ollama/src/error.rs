// Error types for the Ollama client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Ollama returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}
