//! Nearby places and place details from OpenStreetMap.
//!
//! Overpass answers the nearby search and Nominatim the detail lookup.
//! Neither carries ratings or price levels, so those are synthesized.
//! Every failure degrades to a small static table of Hanoi places.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::LocationConfig;
use crate::error::ProviderError;

const MAX_PLACES: usize = 20;
const OSM_SOURCE: &str = "OpenStreetMap";
pub const PLACEHOLDER_PHOTO_URL: &str = "https://via.placeholder.com/400x300?text=Kh%C3%B4ng+c%C3%B3+%E1%BA%A3nh";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Place {
    pub place_id: String,
    pub name: String,
    pub vicinity: String,
    pub rating: f64,
    pub price_level: u8,
    pub types: Vec<String>,
    pub geometry: Geometry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceDetails {
    pub place_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vicinity: Option<String>,
    pub rating: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_level: Option<u8>,
    /// Free text from OSM, or a structured weekly schedule for mock data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// OSM amenity for a client category. Unknown or missing categories search
/// restaurants.
pub fn amenity_for(category: Option<&str>) -> &'static str {
    match category {
        Some("cafe") => "cafe",
        Some("lodging") => "hotel",
        Some("tourist_attraction") => "attraction",
        _ => "restaurant",
    }
}

pub fn overpass_query(amenity: &str, radius: u32, at: LatLng) -> String {
    let filter = format!(
        "[\"amenity\"=\"{}\"](around:{},{},{})",
        amenity, radius, at.lat, at.lng
    );
    format!(
        "[out:json][timeout:25];\n(\n  node{f};\n  way{f};\n  relation{f};\n);\nout center meta;",
        f = filter
    )
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

impl OverpassElement {
    fn into_place(mut self, category: &str) -> Option<Place> {
        let name = self.tags.remove("name")?;
        let (lat, lng) = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some(c)) => (c.lat, c.lon),
            _ => return None,
        };
        let vicinity = self
            .tags
            .remove("addr:street")
            .or_else(|| self.tags.remove("addr:city"))
            .unwrap_or_else(|| "Địa chỉ không xác định".to_string());

        let mut rng = rand::thread_rng();
        Some(Place {
            place_id: self.id.to_string(),
            name,
            vicinity,
            rating: rng.gen_range(3.0..5.0),
            price_level: rng.gen_range(1..=4),
            types: vec![category.to_string()],
            geometry: Geometry { location: LatLng { lat, lng } },
            opening_hours: self.tags.remove("opening_hours"),
            phone: self.tags.remove("phone"),
            website: self.tags.remove("website"),
            source: Some(OSM_SOURCE.to_string()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    display_name: String,
    #[serde(default)]
    extratags: Option<HashMap<String, String>>,
}

pub struct LocationService {
    client: reqwest::Client,
    overpass_url: String,
    nominatim_url: String,
    user_agent: String,
    timeout: Duration,
}

impl LocationService {
    pub fn from_config(config: &LocationConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            overpass_url: config.overpass_url.clone(),
            nominatim_url: config.nominatim_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Never fails: Overpass errors or an empty answer yield mock places.
    pub async fn nearby(&self, at: LatLng, category: Option<&str>, radius: u32) -> Vec<Place> {
        let label = category.unwrap_or("restaurant");
        match self.query_overpass(at, category, radius).await {
            Ok(places) if !places.is_empty() => {
                info!("Overpass returned {} {} places", places.len(), label);
                places
            }
            Ok(_) => {
                debug!("Overpass returned no named {} places, using mock data", label);
                mock_places(category)
            }
            Err(e) => {
                warn!("Overpass lookup failed, using mock data: {}", e);
                mock_places(category)
            }
        }
    }

    async fn query_overpass(
        &self,
        at: LatLng,
        category: Option<&str>,
        radius: u32,
    ) -> Result<Vec<Place>, ProviderError> {
        let query = overpass_query(amenity_for(category), radius, at);
        let response = self
            .client
            .post(&self.overpass_url)
            .header("Content-Type", "text/plain")
            .timeout(self.timeout)
            .body(query)
            .send()
            .await?
            .error_for_status()?;

        let parsed: OverpassResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let type_label = category.unwrap_or("restaurant");
        Ok(parsed
            .elements
            .into_iter()
            .filter_map(|e| e.into_place(type_label))
            .take(MAX_PLACES)
            .collect())
    }

    /// Never fails: lookup errors or an unknown id yield mock details.
    pub async fn details(&self, place_id: &str) -> PlaceDetails {
        match self.query_nominatim(place_id).await {
            Ok(Some(details)) => details,
            Ok(None) => {
                debug!("Nominatim has no node {}, using mock details", place_id);
                mock_place_details(place_id)
            }
            Err(e) => {
                warn!("Nominatim lookup for {} failed: {}", place_id, e);
                mock_place_details(place_id)
            }
        }
    }

    async fn query_nominatim(&self, place_id: &str) -> Result<Option<PlaceDetails>, ProviderError> {
        let osm_ids = format!("N{}", place_id);
        let response = self
            .client
            .get(&self.nominatim_url)
            .query(&[
                ("osm_ids", osm_ids.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
                ("extratags", "1"),
                ("namedetails", "1"),
            ])
            .header("User-Agent", &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(places.into_iter().next().map(|p| {
            let mut extra = p.extratags.unwrap_or_default();
            let name = p.display_name.split(',').next().unwrap_or_default().trim().to_string();
            PlaceDetails {
                place_id: place_id.to_string(),
                name,
                formatted_address: Some(p.display_name),
                vicinity: None,
                rating: rand::thread_rng().gen_range(3.0..5.0),
                price_level: None,
                opening_hours: extra.remove("opening_hours").map(Value::String),
                website: extra.remove("website"),
                phone: extra.remove("phone"),
                source: Some(OSM_SOURCE.to_string()),
            }
        }))
    }
}

#[allow(clippy::too_many_arguments)]
fn mock_place(id: &str, name: &str, vicinity: &str, rating: f64, price_level: u8, types: &[&str], lat: f64, lng: f64) -> Place {
    Place {
        place_id: id.to_string(),
        name: name.to_string(),
        vicinity: vicinity.to_string(),
        rating,
        price_level,
        types: types.iter().map(|t| t.to_string()).collect(),
        geometry: Geometry { location: LatLng { lat, lng } },
        opening_hours: None,
        phone: None,
        website: None,
        source: None,
    }
}

/// Static places per client category; unknown categories get none.
pub fn mock_places(category: Option<&str>) -> Vec<Place> {
    match category.unwrap_or("restaurant") {
        "restaurant" => vec![
            mock_place("mock_restaurant_1", "Nhà hàng Phố Cổ", "Hoàn Kiếm, Hà Nội", 4.5, 2, &["restaurant", "food"], 21.0285, 105.8542),
            mock_place("mock_restaurant_2", "Bún Chả Hương Liên", "Hai Bà Trưng, Hà Nội", 4.3, 1, &["restaurant", "food"], 21.0245, 105.8412),
        ],
        "cafe" => vec![
            mock_place("mock_cafe_1", "Cà phê Cộng", "Ba Đình, Hà Nội", 4.4, 2, &["cafe", "food"], 21.0313, 105.8516),
            mock_place("mock_cafe_2", "The Coffee House", "Đống Đa, Hà Nội", 4.2, 2, &["cafe", "food"], 21.0278, 105.8342),
        ],
        "lodging" => vec![
            mock_place("mock_hotel_1", "Khách sạn Metropole", "Hoàn Kiếm, Hà Nội", 4.8, 4, &["lodging"], 21.0285, 105.8542),
            mock_place("mock_hotel_2", "Lotte Hotel Hanoi", "Ba Đình, Hà Nội", 4.6, 4, &["lodging"], 21.0313, 105.8516),
        ],
        "tourist_attraction" => vec![
            mock_place("mock_attraction_1", "Hồ Hoàn Kiếm", "Hoàn Kiếm, Hà Nội", 4.7, 0, &["tourist_attraction"], 21.0285, 105.8542),
            mock_place("mock_attraction_2", "Văn Miếu", "Đống Đa, Hà Nội", 4.5, 1, &["tourist_attraction"], 21.0278, 105.8342),
        ],
        _ => Vec::new(),
    }
}

pub fn mock_place_details(place_id: &str) -> PlaceDetails {
    let weekdays = ["Thứ 2", "Thứ 3", "Thứ 4", "Thứ 5", "Thứ 6", "Thứ 7", "Chủ nhật"];
    let weekday_text: Vec<String> = weekdays.iter().map(|d| format!("{}: 08:00–22:00", d)).collect();

    PlaceDetails {
        place_id: place_id.to_string(),
        name: "Mock Place".to_string(),
        formatted_address: None,
        vicinity: Some("Mock Address".to_string()),
        rating: 4.0,
        price_level: Some(2),
        opening_hours: Some(json!({ "open_now": true, "weekday_text": weekday_text })),
        website: None,
        phone: None,
        source: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HANOI: LatLng = LatLng { lat: 21.0285, lng: 105.8542 };

    fn service(server: &MockServer) -> LocationService {
        let mut config = Settings::new_for_test().unwrap().location;
        config.overpass_url = format!("{}/api/interpreter", server.uri());
        config.nominatim_url = format!("{}/lookup", server.uri());
        LocationService::from_config(&config)
    }

    #[test]
    fn test_amenity_mapping() {
        assert_eq!(amenity_for(Some("restaurant")), "restaurant");
        assert_eq!(amenity_for(Some("cafe")), "cafe");
        assert_eq!(amenity_for(Some("lodging")), "hotel");
        assert_eq!(amenity_for(Some("tourist_attraction")), "attraction");
        assert_eq!(amenity_for(Some("spa")), "restaurant");
        assert_eq!(amenity_for(None), "restaurant");
    }

    #[test]
    fn test_overpass_query_shape() {
        let query = overpass_query("cafe", 1500, HANOI);
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains("node[\"amenity\"=\"cafe\"](around:1500,21.0285,105.8542);"));
        assert!(query.contains("relation[\"amenity\"=\"cafe\"]"));
        assert!(query.ends_with("out center meta;"));
    }

    #[test]
    fn test_mock_tables() {
        assert_eq!(mock_places(Some("cafe"))[0].name, "Cà phê Cộng");
        assert_eq!(mock_places(None).len(), 2);
        assert!(mock_places(Some("spa")).is_empty());
    }

    #[tokio::test]
    async fn test_nearby_maps_named_elements() {
        let server = MockServer::start().await;
        let mut elements = vec![
            json!({"type": "node", "id": 1, "lat": 21.03, "lon": 105.85,
                   "tags": {"name": "Phở Thìn", "addr:street": "Lò Đúc", "phone": "024 1234"}}),
            json!({"type": "node", "id": 2, "lat": 21.0, "lon": 105.0, "tags": {"amenity": "restaurant"}}),
            json!({"type": "way", "id": 3, "center": {"lat": 21.04, "lon": 105.86}, "tags": {"name": "Chả Cá Lã Vọng"}}),
        ];
        for i in 0..30 {
            elements.push(json!({"type": "node", "id": 100 + i, "lat": 21.0, "lon": 105.8, "tags": {"name": format!("Quán {}", i)}}));
        }
        Mock::given(method("POST"))
            .and(path("/api/interpreter"))
            .and(header("Content-Type", "text/plain"))
            .and(body_string_contains("\"amenity\"=\"restaurant\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "elements": elements })))
            .mount(&server)
            .await;

        let places = service(&server).nearby(HANOI, Some("restaurant"), 2000).await;
        assert_eq!(places.len(), 20);

        let pho = &places[0];
        assert_eq!(pho.place_id, "1");
        assert_eq!(pho.vicinity, "Lò Đúc");
        assert_eq!(pho.phone.as_deref(), Some("024 1234"));
        assert_eq!(pho.source.as_deref(), Some("OpenStreetMap"));
        assert!((3.0..5.0).contains(&pho.rating));
        assert!((1..=4).contains(&pho.price_level));

        let cha_ca = &places[1];
        assert_eq!(cha_ca.name, "Chả Cá Lã Vọng");
        assert_eq!(cha_ca.geometry.location, LatLng { lat: 21.04, lng: 105.86 });
        assert_eq!(cha_ca.vicinity, "Địa chỉ không xác định");
    }

    #[tokio::test]
    async fn test_nearby_falls_back_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(504))
            .mount(&server)
            .await;

        let places = service(&server).nearby(HANOI, Some("lodging"), 2000).await;
        assert_eq!(places, mock_places(Some("lodging")));
    }

    #[tokio::test]
    async fn test_nearby_falls_back_when_nothing_named() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "elements": [] })))
            .mount(&server)
            .await;

        let places = service(&server).nearby(HANOI, Some("tourist_attraction"), 500).await;
        assert_eq!(places[0].name, "Hồ Hoàn Kiếm");
    }

    #[tokio::test]
    async fn test_details_from_nominatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lookup"))
            .and(query_param("osm_ids", "N42"))
            .and(query_param("format", "json"))
            .and(header("User-Agent", "AI-Travel-Agent/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "display_name": "Nhà Hát Lớn, Tràng Tiền, Hoàn Kiếm, Hà Nội",
                "extratags": {"website": "https://hanoioperahouse.org.vn", "opening_hours": "Mo-Su 08:00-17:00"}
            }])))
            .mount(&server)
            .await;

        let details = service(&server).details("42").await;
        assert_eq!(details.place_id, "42");
        assert_eq!(details.name, "Nhà Hát Lớn");
        assert_eq!(details.formatted_address.as_deref(), Some("Nhà Hát Lớn, Tràng Tiền, Hoàn Kiếm, Hà Nội"));
        assert_eq!(details.website.as_deref(), Some("https://hanoioperahouse.org.vn"));
        assert_eq!(details.opening_hours, Some(json!("Mo-Su 08:00-17:00")));
    }

    #[tokio::test]
    async fn test_unknown_place_uses_mock_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let details = service(&server).details("7").await;
        assert_eq!(details, mock_place_details("7"));
        assert_eq!(details.opening_hours.unwrap()["weekday_text"][6], "Chủ nhật: 08:00–22:00");
    }
}
