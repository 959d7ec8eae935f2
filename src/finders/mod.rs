//! Hotel and flight finders.
//!
//! Each finder queries SerpAPI when a key is configured and falls back to
//! a static table keyed by destination otherwise, so a search always
//! produces something to show.

mod flights;
mod hotels;

use serde::Serialize;
use std::time::Duration;

use crate::config::SerpApiConfig;

pub use flights::{mock_flights, Flight, FlightsFinder};
pub use hotels::{mock_hotels, Hotel, HotelsFinder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FinderSource {
    Live,
    Mock,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinderOutcome<T> {
    pub source: FinderSource,
    pub items: Vec<T>,
}

impl<T> FinderOutcome<T> {
    pub fn live(items: Vec<T>) -> Self {
        Self { source: FinderSource::Live, items }
    }

    pub fn mock(items: Vec<T>) -> Self {
        Self { source: FinderSource::Mock, items }
    }
}

/// Connection details shared by both SerpAPI-backed finders.
#[derive(Debug, Clone)]
pub struct SerpApi {
    pub client: reqwest::Client,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl SerpApi {
    pub fn from_config(config: &SerpApiConfig) -> Self {
        let key = config.api_key.trim();
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: (!key.is_empty()).then(|| key.to_string()),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Lower-cased key into a mock table: `tokyo`, `saigon` or `default`.
pub(crate) fn city_key(destination: &str) -> &'static str {
    let d = destination.to_lowercase();
    if d.contains("tokyo") {
        "tokyo"
    } else if d.contains("saigon") || d.contains("ho chi minh") || d.contains("hồ chí minh") {
        "saigon"
    } else {
        "default"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_key_matches_substrings() {
        assert_eq!(city_key("Tokyo, Japan"), "tokyo");
        assert_eq!(city_key("TOKYO"), "tokyo");
        assert_eq!(city_key("Saigon"), "saigon");
        assert_eq!(city_key("Ho Chi Minh City"), "saigon");
        assert_eq!(city_key("Paris"), "default");
        assert_eq!(city_key(""), "default");
    }
}
