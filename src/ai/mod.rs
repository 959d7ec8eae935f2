//! Generative-model access.
//!
//! The agent only sees [`GenerativeModel`]; [`GeminiClient`] speaks the
//! Gemini `generateContent` REST API.

mod gemini;

use async_trait::async_trait;

use crate::error::ProviderError;

pub use gemini::GeminiClient;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

/// Sends a prompt to a text model and returns its text reply.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ProviderError>;
}
