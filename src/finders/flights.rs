use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::agent::TravelDetails;
use crate::error::ProviderError;
use crate::finders::{FinderOutcome, SerpApi};

const MAX_RESULTS: usize = 3;
const DEFAULT_ORIGIN: &str = "HAN";
const DEFAULT_DESTINATION: &str = "SGN";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flight {
    pub airline: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: Option<String>,
    pub return_date: Option<String>,
    pub price: Option<f64>,
    pub currency: String,
    pub duration_minutes: Option<u32>,
    pub booking_link: String,
}

#[derive(Debug, Deserialize)]
struct FlightsResponse {
    #[serde(default)]
    best_flights: Vec<Itinerary>,
    #[serde(default)]
    other_flights: Vec<Itinerary>,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    #[serde(default)]
    flights: Vec<Leg>,
    total_duration: Option<u32>,
    price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Leg {
    airline: Option<String>,
}

pub struct FlightsFinder {
    api: SerpApi,
}

impl FlightsFinder {
    pub fn new(api: SerpApi) -> Self {
        Self { api }
    }

    pub async fn search(&self, details: &TravelDetails) -> FinderOutcome<Flight> {
        match self.search_live(details).await {
            Ok(flights) if !flights.is_empty() => {
                info!("Found {} flights", flights.len());
                FinderOutcome::live(flights)
            }
            Ok(_) => {
                warn!("No flights found, using mock data");
                FinderOutcome::mock(mock_flights(details))
            }
            Err(e) => {
                warn!("Flight search failed ({}), using mock data", e);
                FinderOutcome::mock(mock_flights(details))
            }
        }
    }

    async fn search_live(&self, details: &TravelDetails) -> Result<Vec<Flight>, ProviderError> {
        let api_key = self
            .api
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("SerpAPI key".into()))?;

        let (Some(origin), Some(destination), Some(outbound)) = (
            details.origin.as_deref(),
            details.destination.as_deref(),
            details.departure_date.as_deref(),
        ) else {
            return Err(ProviderError::NotConfigured(
                "flight search needs origin, destination and departure date".into(),
            ));
        };

        let adults = details.passengers.unwrap_or(1).to_string();
        let mut params = vec![
            ("engine", "google_flights"),
            ("api_key", api_key),
            ("departure_id", origin),
            ("arrival_id", destination),
            ("outbound_date", outbound),
            ("currency", "USD"),
            ("hl", "en"),
            ("adults", adults.as_str()),
        ];
        match details.return_date.as_deref() {
            Some(return_date) => {
                params.push(("type", "1"));
                params.push(("return_date", return_date));
            }
            None => params.push(("type", "2")),
        }

        let response = self
            .api
            .client
            .get(&self.api.base_url)
            .query(&params)
            .timeout(self.api.timeout)
            .send()
            .await?
            .error_for_status()?;

        let body: FlightsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let link = booking_link(origin, destination);
        Ok(body
            .best_flights
            .into_iter()
            .chain(body.other_flights)
            .take(MAX_RESULTS)
            .map(|it| Flight {
                airline: it
                    .flights
                    .iter()
                    .filter_map(|leg| leg.airline.clone())
                    .next()
                    .unwrap_or_else(|| "Unknown".to_string()),
                origin: origin.to_string(),
                destination: destination.to_string(),
                departure_date: Some(outbound.to_string()),
                return_date: details.return_date.clone(),
                price: it.price,
                currency: "USD".to_string(),
                duration_minutes: it.total_duration,
                booking_link: link.clone(),
            })
            .collect())
    }
}

fn booking_link(origin: &str, destination: &str) -> String {
    let q = format!("Flights to {} from {}", destination, origin);
    Url::parse_with_params("https://www.google.com/travel/flights", &[("q", q.as_str())])
        .map(|u| u.to_string())
        .unwrap_or_else(|_| "https://www.google.com/travel/flights".to_string())
}

/// Domestic carriers priced in VND; route defaults to Hà Nội -> Sài Gòn.
pub fn mock_flights(details: &TravelDetails) -> Vec<Flight> {
    let origin = details.origin.as_deref().unwrap_or(DEFAULT_ORIGIN);
    let destination = details.destination.as_deref().unwrap_or(DEFAULT_DESTINATION);
    let link = booking_link(origin, destination);

    [
        ("Vietnam Airlines", 2_500_000.0, 130),
        ("VietJet Air", 1_800_000.0, 135),
        ("Bamboo Airways", 2_200_000.0, 130),
    ]
    .into_iter()
    .map(|(airline, price, minutes)| Flight {
        airline: airline.to_string(),
        origin: origin.to_string(),
        destination: destination.to_string(),
        departure_date: details.departure_date.clone(),
        return_date: details.return_date.clone(),
        price: Some(price),
        currency: "VND".to_string(),
        duration_minutes: Some(minutes),
        booking_link: link.clone(),
    })
    .collect()
}
