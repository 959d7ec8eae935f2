use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::TravelDetails;
use crate::error::ProviderError;
use crate::finders::{city_key, FinderOutcome, SerpApi};

const MAX_RESULTS: usize = 3;
const DEFAULT_DESTINATION: &str = "Tokyo";
const DEFAULT_ADULTS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hotel {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub rate_per_night: Option<f64>,
    pub total_rate: Option<f64>,
    pub currency: String,
    pub rating: Option<f64>,
    pub reviews: Option<u64>,
    pub amenities: Vec<String>,
    pub images: Vec<String>,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HotelsResponse {
    #[serde(default)]
    properties: Vec<Property>,
}

#[derive(Debug, Deserialize)]
struct Property {
    name: String,
    description: Option<String>,
    rate_per_night: Option<Rate>,
    total_rate: Option<Rate>,
    overall_rating: Option<f64>,
    reviews: Option<u64>,
    #[serde(default)]
    amenities: Vec<String>,
    #[serde(default)]
    images: Vec<Image>,
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Rate {
    extracted_lowest: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Image {
    thumbnail: Option<String>,
    original_image: Option<String>,
}

impl Property {
    fn into_hotel(self, destination: &str) -> Hotel {
        let p = self;
        Hotel {
            name: p.name,
            description: p.description,
            location: Some(destination.to_string()),
            rate_per_night: p.rate_per_night.and_then(|r| r.extracted_lowest),
            total_rate: p.total_rate.and_then(|r| r.extracted_lowest),
            currency: "USD".to_string(),
            rating: p.overall_rating,
            reviews: p.reviews,
            amenities: p.amenities,
            images: p
                .images
                .into_iter()
                .filter_map(|i| i.thumbnail.or(i.original_image))
                .collect(),
            link: p.link,
        }
    }
}

pub struct HotelsFinder {
    api: SerpApi,
}

impl HotelsFinder {
    pub fn new(api: SerpApi) -> Self {
        Self { api }
    }

    pub async fn search(&self, details: &TravelDetails) -> FinderOutcome<Hotel> {
        let destination = details.destination.as_deref().unwrap_or(DEFAULT_DESTINATION);

        match self.search_live(details).await {
            Ok(hotels) if !hotels.is_empty() => {
                info!("Found {} hotels in {}", hotels.len(), destination);
                FinderOutcome::live(hotels)
            }
            Ok(_) => {
                warn!("No hotels found in {}, using mock data", destination);
                FinderOutcome::mock(mock_hotels(destination))
            }
            Err(e) => {
                warn!("Hotel search failed ({}), using mock data for {}", e, destination);
                FinderOutcome::mock(mock_hotels(destination))
            }
        }
    }

    async fn search_live(&self, details: &TravelDetails) -> Result<Vec<Hotel>, ProviderError> {
        let api_key = self
            .api
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("SerpAPI key".into()))?;

        let today = Utc::now().date_naive();
        let check_in = details
            .departure_date
            .clone()
            .unwrap_or_else(|| today.format("%Y-%m-%d").to_string());
        let check_out = details
            .return_date
            .clone()
            .unwrap_or_else(|| (today + Duration::days(7)).format("%Y-%m-%d").to_string());
        let destination = details.destination.as_deref().unwrap_or(DEFAULT_DESTINATION);
        let query = format!("hotels in {}", destination);
        let adults = details.passengers.unwrap_or(DEFAULT_ADULTS).to_string();

        let response = self
            .api
            .client
            .get(&self.api.base_url)
            .query(&[
                ("engine", "google_hotels"),
                ("api_key", api_key),
                ("q", query.as_str()),
                ("check_in_date", check_in.as_str()),
                ("check_out_date", check_out.as_str()),
                ("currency", "USD"),
                ("hl", "en"),
                ("adults", adults.as_str()),
            ])
            .timeout(self.api.timeout)
            .send()
            .await?
            .error_for_status()?;

        let body: HotelsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(body
            .properties
            .into_iter()
            .take(MAX_RESULTS)
            .map(|p| p.into_hotel(destination))
            .collect())
    }
}

#[allow(clippy::too_many_arguments)]
fn hotel(
    name: &str,
    description: &str,
    location: &str,
    rate: f64,
    total: f64,
    rating: f64,
    reviews: u64,
    amenities: &[&str],
    image: &str,
    link: &str,
) -> Hotel {
    Hotel {
        name: name.to_string(),
        description: Some(description.to_string()),
        location: Some(location.to_string()),
        rate_per_night: Some(rate),
        total_rate: Some(total),
        currency: "USD".to_string(),
        rating: Some(rating),
        reviews: Some(reviews),
        amenities: amenities.iter().map(|a| a.to_string()).collect(),
        images: vec![image.to_string()],
        link: Some(link.to_string()),
    }
}

const IMG_CLASSIC: &str = "https://images.unsplash.com/photo-1566073771259-6a8506099945?w=400";
const IMG_LUXURY: &str = "https://images.unsplash.com/photo-1551882547-ff40c63fe5fa?w=400";
const IMG_BUDGET: &str = "https://images.unsplash.com/photo-1520250497591-112f2f40a3f4?w=400";

pub fn mock_hotels(destination: &str) -> Vec<Hotel> {
    match city_key(destination) {
        "tokyo" => vec![
            hotel(
                "The Tokyo Station Hotel",
                "Khách sạn sang trọng trong tòa nhà lịch sử tại ga Tokyo với dịch vụ 5 sao và vị trí tuyệt vời.",
                "Marunouchi, Tokyo",
                450.0, 2700.0, 4.8, 2100,
                &["Wi-Fi miễn phí", "Nhà hàng cao cấp", "Spa", "Concierge", "Gym"],
                IMG_CLASSIC,
                "https://www.thetokyostationhotel.jp",
            ),
            hotel(
                "Park Hyatt Tokyo",
                "Khách sạn siêu sang nổi tiếng từ bộ phim \"Lost in Translation\" với tầm nhìn tuyệt đẹp ra thành phố.",
                "Shinjuku, Tokyo",
                680.0, 4080.0, 4.9, 1850,
                &["Wi-Fi miễn phí", "New York Grill", "Peak Bar", "Spa", "Pool"],
                IMG_LUXURY,
                "https://www.hyatt.com/park-hyatt/tokyo",
            ),
            hotel(
                "Sakura Hostel Asakusa",
                "Hostel hiện đại giá rẻ gần chùa Sensoji với không gian trẻ trung và thân thiện.",
                "Asakusa, Tokyo",
                45.0, 270.0, 4.3, 890,
                &["Wi-Fi miễn phí", "Kitchen chung", "Lounge", "Laundry"],
                IMG_BUDGET,
                "https://www.booking.com",
            ),
        ],
        "saigon" => vec![
            hotel(
                "Hotel Majestic Saigon",
                "Khách sạn lịch sử sang trọng bên sông Sài Gòn với kiến trúc thuộc địa Pháp đặc trưng.",
                "Quận 1, TP.HCM",
                180.0, 1080.0, 4.6, 1500,
                &["Wi-Fi miễn phí", "Nhà hàng", "Rooftop Bar", "Spa", "Pool"],
                IMG_CLASSIC,
                "https://www.majesticsaigon.com",
            ),
            hotel(
                "The Reverie Saigon",
                "Khách sạn siêu sang với thiết kế nội thất Ý đẳng cấp và dịch vụ 5 sao.",
                "Quận 1, TP.HCM",
                380.0, 2280.0, 4.8, 980,
                &["Wi-Fi miễn phí", "Fine Dining", "Spa sang trọng", "Pool tầng cao", "Butler"],
                IMG_LUXURY,
                "https://www.thereverie.com",
            ),
            hotel(
                "Mai House Saigon",
                "Khách sạn boutique hiện đại với thiết kế Việt Nam đương đại và vị trí trung tâm.",
                "Quận 1, TP.HCM",
                120.0, 720.0, 4.4, 760,
                &["Wi-Fi miễn phí", "Nhà hàng", "Coffee Bar", "Gym", "Meeting Room"],
                IMG_BUDGET,
                "https://www.maihousesaigon.com",
            ),
        ],
        _ => vec![hotel(
            "Grand Plaza Hotel",
            "Khách sạn 4 sao với đầy đủ tiện nghi hiện đại và dịch vụ chuyên nghiệp.",
            "Trung tâm thành phố",
            150.0, 900.0, 4.4, 1200,
            &["Wi-Fi miễn phí", "Nhà hàng", "Fitness Center", "Business Center"],
            IMG_CLASSIC,
            "https://www.booking.com",
        )],
    }
}
