#![allow(dead_code)]

use actix_web::test::TestRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use vivu_server::ai::{GenerationOptions, GenerativeModel};
use vivu_server::db::{MemoryStore, PromoCode, Store, User};
use vivu_server::email::{Mailer, TravelEmail};
use vivu_server::error::{DatabaseError, ProviderError};
use vivu_server::{AppState, Settings};

pub const ITINERARY: &str = "<h1>Lịch trình Đà Lạt</h1>";

/// Answers analysis prompts with a destination and everything else with a
/// fixed itinerary.
pub struct CannedModel;

#[async_trait]
impl GenerativeModel for CannedModel {
    async fn generate(&self, prompt: &str, _options: &GenerationOptions) -> Result<String, ProviderError> {
        if prompt.starts_with("Analyze the following travel query") {
            Ok(r#"{"destination": "Đà Lạt", "passengers": 2}"#.to_string())
        } else {
            Ok(ITINERARY.to_string())
        }
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<TravelEmail>>,
    pub fail: bool,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &TravelEmail) -> Result<(), ProviderError> {
        if self.fail {
            return Err(ProviderError::Status { status: 503, message: "mail API down".into() });
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Yields after loading a user by id, the way a database round trip would,
/// so concurrent requests interleave between authentication and their
/// usage write.
pub struct YieldingStore(pub Arc<MemoryStore>);

#[async_trait]
impl Store for YieldingStore {
    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        self.0.create_user(user).await
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let user = self.0.get_user_by_id(id).await;
        tokio::task::yield_now().await;
        user
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        self.0.get_user_by_email(email).await
    }

    async fn record_search(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<Option<User>, DatabaseError> {
        self.0.record_search(user_id, at).await
    }

    async fn create_promo(&self, promo: &PromoCode) -> Result<PromoCode, DatabaseError> {
        self.0.create_promo(promo).await
    }

    async fn get_promo(&self, code: &str) -> Result<Option<PromoCode>, DatabaseError> {
        self.0.get_promo(code).await
    }

    async fn redeem_promo(&self, code: &str, user: &User) -> Result<Option<(User, PromoCode)>, DatabaseError> {
        self.0.redeem_promo(code, user).await
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn test_app_with(settings: Settings, mailer: RecordingMailer) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(mailer);
    let state = AppState::from_parts(
        settings,
        store.clone(),
        Some(Arc::new(CannedModel)),
        mailer.clone(),
    );
    TestApp { state, store, mailer }
}

/// Like `test_app`, but user lookups yield mid-request.
pub fn yielding_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(RecordingMailer::default());
    let state = AppState::from_parts(
        Settings::new_for_test().unwrap(),
        Arc::new(YieldingStore(store.clone())),
        Some(Arc::new(CannedModel)),
        mailer.clone(),
    );
    TestApp { state, store, mailer }
}

pub fn test_app() -> TestApp {
    test_app_with(Settings::new_for_test().unwrap(), RecordingMailer::default())
}

pub fn register_request(email: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "email": email, "password": "password123", "name": "Traveler" }))
}

pub fn search_request(token: &str, query: &str) -> TestRequest {
    TestRequest::post()
        .uri("/api/travel/search")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "query": query, "metadata": { "startDate": "2025-12-20", "travelers": 2 } }))
}

pub fn authorized(req: TestRequest, token: &str) -> TestRequest {
    req.insert_header(("Authorization", format!("Bearer {}", token)))
}
