use chrono::{Datelike, Utc};
use serde::Serialize;

use crate::agent::TravelDetails;
use crate::finders::{Flight, FinderOutcome, Hotel};

pub fn system_prompt() -> String {
    format!(
        "You are a smart travel agency AI assistant helping users plan trips: flights, hotels, \
local restaurants and sights.

INSTRUCTIONS:
- The current year is {year}.
- Base flight and hotel recommendations on the search results provided; say so when results are sample data.
- Include links to hotel, airline and restaurant websites when available.
- Include hotel photos and airline logos when image links are available.
- Show prices in the local currency and in USD when possible \
(hotels: \"Rate: $581 per night, Total: $3,488\"; flights: \"Price: $850 USD\"; restaurants: \"Price range: $10 - $50\").
- Respond in Vietnamese.
- Format the whole answer as clean HTML with headings, lists and inline styles. Do not wrap it in markdown code fences.",
        year = Utc::now().year()
    )
}

pub fn analysis_prompt(query: &str) -> String {
    format!(
        r#"Analyze the following travel query and extract key information. Return ONLY a JSON object with the following structure:
{{
  "origin": "origin city/airport code",
  "destination": "destination city/airport code",
  "departureDate": "YYYY-MM-DD",
  "returnDate": "YYYY-MM-DD",
  "passengers": number,
  "hotelPreferences": "star rating or preferences",
  "rawQuery": "original query"
}}
Omit any field the query does not mention.

Travel query: {query}"#
    )
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

pub fn final_prompt(
    query: &str,
    details: &TravelDetails,
    flights: &FinderOutcome<Flight>,
    hotels: &FinderOutcome<Hotel>,
) -> String {
    format!(
        "{system}

Original user query: {query}

Structured travel details (client metadata takes precedence over AI analysis):
{details}

Flight search results:
{flights}

Hotel search results:
{hotels}

Create a comprehensive travel itinerary in HTML. Include:
1. A short summary of the request
2. Flight options with prices, airlines and booking links
3. Hotel options with prices, ratings and booking links
4. Local food, restaurants and sights worth visiting
5. Practical travel tips for the destination
All user-facing text must be in Vietnamese.",
        system = system_prompt(),
        details = pretty(details),
        flights = pretty(flights),
        hotels = pretty(hotels),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finders::{mock_hotels, FinderOutcome};

    #[test]
    fn test_analysis_prompt_embeds_query() {
        let prompt = analysis_prompt("3 ngày ở Đà Lạt");
        assert!(prompt.contains("Travel query: 3 ngày ở Đà Lạt"));
        assert!(prompt.contains("\"departureDate\": \"YYYY-MM-DD\""));
    }

    #[test]
    fn test_final_prompt_embeds_details_and_results() {
        let details = TravelDetails {
            destination: Some("Tokyo".into()),
            raw_query: Some("Tokyo trip".into()),
            ..Default::default()
        };
        let flights = FinderOutcome::mock(Vec::new());
        let hotels = FinderOutcome::mock(mock_hotels("Tokyo"));

        let prompt = final_prompt("Tokyo trip", &details, &flights, &hotels);
        assert!(prompt.contains("\"destination\": \"Tokyo\""));
        assert!(prompt.contains("Park Hyatt Tokyo"));
        assert!(prompt.contains("\"source\": \"mock\""));
        assert!(!prompt.contains("\"origin\""));
    }
}
