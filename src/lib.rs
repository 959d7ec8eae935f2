pub mod agent;
pub mod ai;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod finders;
pub mod location;
pub mod promo;
pub mod routes;
pub mod session;
pub mod subscription;

use std::sync::Arc;
use std::time::Duration;
use actix_web::HttpResponse;
use tracing::{info, warn};

pub use error::AppError;
pub type Result<T> = std::result::Result<T, AppError>;
pub use config::Settings;

use agent::TravelAgent;
use ai::{GeminiClient, GenerativeModel};
use auth::{AuthService, RateLimitConfig, RateLimiter};
use db::{MemoryStore, PgStore, Store};
use email::Mailer;
use finders::{FlightsFinder, HotelsFinder, SerpApi};
use location::LocationService;
use session::SessionStore;

/// Health check endpoint handler
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared by every worker.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub store: Arc<dyn Store>,
    pub auth_service: Arc<AuthService>,
    pub agent: Arc<TravelAgent>,
    pub sessions: SessionStore,
    pub mailer: Arc<dyn Mailer>,
    pub locations: Arc<LocationService>,
    pub api_limiter: Arc<RateLimiter>,
    pub search_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Connects to the configured backends. Without a database URL the
    /// server keeps users in memory; without a Gemini key it answers with
    /// fallback itineraries.
    pub async fn new(config: Settings) -> Result<Self> {
        let store: Arc<dyn Store> = if config.uses_database() {
            let store = PgStore::new_with_options(
                &config.database.url,
                config.database.max_connections,
                Duration::from_secs(5),
            )
            .await?;
            store.migrate().await?;
            info!("Connected to database");
            Arc::new(store)
        } else {
            warn!("No database configured - continuing with in-memory storage");
            Arc::new(MemoryStore::new())
        };

        let model = GeminiClient::from_config(&config.gemini)?
            .map(|client| Arc::new(client) as Arc<dyn GenerativeModel>);
        let mailer = email::from_config(&config.email);

        Ok(Self::from_parts(config, store, model, mailer))
    }

    pub fn from_parts(
        config: Settings,
        store: Arc<dyn Store>,
        model: Option<Arc<dyn GenerativeModel>>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let serpapi = SerpApi::from_config(&config.serpapi);
        let agent = TravelAgent::new(
            model,
            HotelsFinder::new(serpapi.clone()),
            FlightsFinder::new(serpapi),
            &config.gemini,
        );
        let auth_service = AuthService::new(
            store.clone(),
            config.auth.jwt_secret.clone(),
            config.auth.token_expiry_hours,
        );

        Self {
            auth_service: Arc::new(auth_service),
            agent: Arc::new(agent),
            sessions: SessionStore::new(),
            mailer,
            locations: Arc::new(LocationService::from_config(&config.location)),
            api_limiter: Arc::new(RateLimiter::new(RateLimitConfig::api(&config.rate_limit))),
            search_limiter: Arc::new(RateLimiter::new(RateLimitConfig::search(&config.rate_limit))),
            store,
            config: Arc::new(config),
        }
    }

    /// Drops expired sessions and idle rate-limit windows.
    pub async fn sweep(&self) -> usize {
        let retention = chrono::Duration::seconds(self.config.sessions.retention_secs);
        let purged = self.sessions.purge_older_than(retention, chrono::Utc::now()).await;
        self.api_limiter.cleanup().await;
        self.search_limiter.cleanup().await;
        purged
    }
}
