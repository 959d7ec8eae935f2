use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};
use url::Url;

use crate::ai::{GenerationOptions, GenerativeModel};
use crate::config::GeminiConfig;
use crate::error::ProviderError;

pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

impl GeminiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Result<Self, ProviderError> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let endpoint = Url::parse(&base)
            .and_then(|b| b.join(&format!("models/{}:generateContent", model)))
            .map_err(|e| ProviderError::NotConfigured(format!("invalid Gemini base url: {}", e)))?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &GeminiConfig) -> Result<Option<Self>, ProviderError> {
        if config.api_key.trim().is_empty() {
            return Ok(None);
        }
        let client = Self::new(&config.base_url, &config.api_key, &config.model)?;
        info!("Initialized generative model {}", client.model);
        Ok(Some(client))
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String, ProviderError> {
        let generation_config = if options.max_output_tokens.is_some() || options.temperature.is_some() {
            Some(GenerationConfig {
                max_output_tokens: options.max_output_tokens,
                temperature: options.temperature,
            })
        } else {
            None
        };
        let body = GenerateRequest {
            contents: vec![Content { role: "user", parts: vec![Part { text: prompt }] }],
            generation_config,
        };

        debug!("Sending {} prompt characters to {}", prompt.len(), self.model);
        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| format!("{} {}", e.error.status, e.error.message).trim().to_string())
                .unwrap_or(text);
            let message = if message.is_empty() {
                status.canonical_reason().unwrap_or("unknown error").to_string()
            } else {
                message
            };
            error!("Gemini returned {}: {}", status, message);
            return Err(ProviderError::Status { status: status.as_u16(), message });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        Ok(text)
    }
}
