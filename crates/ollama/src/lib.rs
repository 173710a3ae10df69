//! Minimal async client for a local Ollama runtime

mod client;
mod error;

pub use client::{ChatRequest, ChatResponse, DEFAULT_BASE_URL, Message, ModelOptions, OllamaClient};
pub use error::OllamaError;
