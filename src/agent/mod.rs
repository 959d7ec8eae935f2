//! The travel agent pipeline.
//!
//! `process_query` normalizes client metadata, asks the model to extract
//! trip fields from the free-text query, merges the two, runs the hotel and
//! flight finders concurrently, and asks the model for an HTML itinerary.
//! It always returns HTML: provider failures become canned fragments.

mod details;
mod html;
mod prompts;

use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::ai::{GenerationOptions, GenerativeModel};
use crate::config::GeminiConfig;
use crate::error::ProviderError;
use crate::finders::{FlightsFinder, HotelsFinder};

pub use details::{Preferences, TravelDetails};
pub use html::{classify, escape_html, failure_html, itinerary_fallback, FailureKind};

/// Best-effort extraction of a JSON object embedded in model output: the
/// span from the first `{` to the last `}`. Anything unparseable yields an
/// empty object.
pub fn extract_json_object(text: &str) -> Map<String, Value> {
    let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) else {
        return Map::new();
    };
    if end < start {
        return Map::new();
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

pub struct TravelAgent {
    model: Option<Arc<dyn GenerativeModel>>,
    hotels: HotelsFinder,
    flights: FlightsFinder,
    analysis_timeout: Duration,
    response_timeout: Duration,
    options: GenerationOptions,
}

impl TravelAgent {
    pub fn new(
        model: Option<Arc<dyn GenerativeModel>>,
        hotels: HotelsFinder,
        flights: FlightsFinder,
        config: &GeminiConfig,
    ) -> Self {
        if model.is_none() {
            warn!("No generative model configured - searches will return fallback itineraries");
        }
        Self {
            model,
            hotels,
            flights,
            analysis_timeout: Duration::from_secs(config.analysis_timeout_secs),
            response_timeout: Duration::from_secs(config.response_timeout_secs),
            options: GenerationOptions {
                max_output_tokens: Some(config.max_output_tokens),
                temperature: Some(config.temperature),
            },
        }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    pub async fn process_query(&self, query: &str, metadata: &Value) -> String {
        let metadata_details = TravelDetails::from_metadata(metadata);

        let Some(model) = self.model.as_ref() else {
            let details = TravelDetails::merge(&TravelDetails::default(), &metadata_details, query);
            return itinerary_fallback(query, &details);
        };

        let analysis = self.analyze(model.as_ref(), query).await;
        let details = TravelDetails::merge(&analysis, &metadata_details, query);
        debug!("Merged travel details: {:?}", details);

        let (flights, hotels) = tokio::join!(
            self.flights.search(&details),
            self.hotels.search(&details),
        );
        info!(
            "Finder results: {} flights ({:?}), {} hotels ({:?})",
            flights.items.len(),
            flights.source,
            hotels.items.len(),
            hotels.source
        );

        let prompt = prompts::final_prompt(query, &details, &flights, &hotels);
        match self
            .generate(model.as_ref(), &prompt, self.response_timeout, &self.options)
            .await
            .map(|html| strip_code_fence(&html))
        {
            Ok(html) if !html.trim().is_empty() => {
                info!("Itinerary generated ({} characters)", html.len());
                html
            }
            Ok(_) => {
                warn!("Model returned an empty itinerary, using fallback");
                itinerary_fallback(query, &details)
            }
            Err(e) => {
                error!("Itinerary generation failed: {}", e);
                failure_html(&classify(&e))
            }
        }
    }

    /// Never fails: any problem yields empty details.
    async fn analyze(&self, model: &dyn GenerativeModel, query: &str) -> TravelDetails {
        let prompt = prompts::analysis_prompt(query);
        let options = GenerationOptions::default();
        match self.generate(model, &prompt, self.analysis_timeout, &options).await {
            Ok(text) => {
                let object = extract_json_object(&text);
                if object.is_empty() {
                    warn!("Query analysis contained no JSON object");
                }
                TravelDetails::from_analysis(&Value::Object(object))
            }
            Err(e) => {
                warn!("Query analysis failed, continuing with client metadata only: {}", e);
                TravelDetails::default()
            }
        }
    }

    async fn generate(
        &self,
        model: &dyn GenerativeModel,
        prompt: &str,
        limit: Duration,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        debug!("Calling model with {}s limit", limit.as_secs());
        match timeout(limit, model.generate(prompt, options)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(limit.as_secs())),
        }
    }
}

/// Models sometimes wrap HTML in a markdown fence despite instructions.
fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text.to_string();
    };
    let body = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    body.strip_suffix("```").unwrap_or(body).trim().to_string()
}
