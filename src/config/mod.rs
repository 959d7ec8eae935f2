use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Empty selects the in-memory store.
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub analysis_timeout_secs: u64,
    pub response_timeout_secs: u64,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SerpApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocationConfig {
    pub overpass_url: String,
    pub nominatim_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from_address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitSettings {
    pub api_max_requests: u32,
    pub api_window_secs: i64,
    pub search_max_requests: u32,
    pub search_window_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub retention_secs: i64,
    pub sweep_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_any_origin: bool,
    pub allowed_origins: Vec<String>,
    pub max_age: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub environment: String,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub gemini: GeminiConfig,
    pub serpapi: SerpApiConfig,
    pub location: LocationConfig,
    pub email: EmailConfig,
    pub rate_limit: RateLimitSettings,
    pub sessions: SessionConfig,
    pub cors: CorsConfig,
}

/// Defaults shared by every run mode. Callers override what differs.
fn with_defaults(builder: ConfigBuilder<DefaultState>) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("environment", "development")?
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 5000)?
        .set_default("server.workers", num_cpus::get() as i64)?
        .set_default("database.url", "")?
        .set_default("database.max_connections", 5)?
        .set_default("auth.jwt_secret", "development_secret")?
        .set_default("auth.token_expiry_hours", 24 * 7)?
        .set_default("gemini.api_key", "")?
        .set_default("gemini.model", "gemini-2.5-pro")?
        .set_default("gemini.base_url", "https://generativelanguage.googleapis.com/v1beta/")?
        .set_default("gemini.analysis_timeout_secs", 15)?
        .set_default("gemini.response_timeout_secs", 30)?
        .set_default("gemini.max_output_tokens", 2000)?
        .set_default("gemini.temperature", 0.7)?
        .set_default("serpapi.api_key", "")?
        .set_default("serpapi.base_url", "https://serpapi.com/search")?
        .set_default("serpapi.timeout_secs", 10)?
        .set_default("location.overpass_url", "https://overpass-api.de/api/interpreter")?
        .set_default("location.nominatim_url", "https://nominatim.openstreetmap.org/lookup")?
        .set_default("location.timeout_secs", 10)?
        .set_default("location.user_agent", "AI-Travel-Agent/1.0")?
        .set_default("email.api_url", "")?
        .set_default("email.api_key", "")?
        .set_default("email.from_address", "Vivu Travel <no-reply@vivu.travel>")?
        .set_default("rate_limit.api_max_requests", 100)?
        .set_default("rate_limit.api_window_secs", 15 * 60)?
        .set_default("rate_limit.search_max_requests", 5)?
        .set_default("rate_limit.search_window_secs", 60)?
        .set_default("sessions.retention_secs", 60 * 60)?
        .set_default("sessions.sweep_interval_secs", 60 * 60)?
        .set_default("cors.enabled", true)?
        .set_default("cors.allow_any_origin", true)?
        .set_default("cors.allowed_origins", vec!["http://localhost:3000".to_string()])?
        .set_default("cors.max_age", 3600)
}

fn env_source() -> Environment {
    // E.g., `APP_GEMINI__API_KEY=...` sets `Settings.gemini.api_key`
    Environment::with_prefix("app")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("cors.allowed_origins")
        .try_parsing(true)
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        with_defaults(Config::builder())?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Deterministic configuration for tests: no env, no files, no keys.
    pub fn new_for_test() -> Result<Self, ConfigError> {
        with_defaults(Config::builder())?
            .set_override("environment", "test")?
            .set_override("server.workers", 1)?
            .set_override("auth.jwt_secret", "test_secret")?
            .set_override("auth.token_expiry_hours", 1)?
            .set_override("gemini.analysis_timeout_secs", 2)?
            .set_override("gemini.response_timeout_secs", 2)?
            .set_override("serpapi.timeout_secs", 2)?
            .set_override("location.timeout_secs", 2)?
            .build()?
            .try_deserialize()
    }

    pub fn uses_database(&self) -> bool {
        !self.database.url.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleanup_env() {
        env::remove_var("APP_SERVER__PORT");
        env::remove_var("APP_GEMINI__MODEL");
        env::remove_var("APP_SESSIONS__RETENTION_SECS");
    }

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::new_for_test().expect("Failed to load settings");
        assert_eq!(settings.environment, "test");
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.server.workers, 1);
        assert!(!settings.uses_database());
        assert_eq!(settings.gemini.model, "gemini-2.5-pro");
        assert_eq!(settings.rate_limit.search_max_requests, 5);
        assert_eq!(settings.rate_limit.search_window_secs, 60);
        assert_eq!(settings.sessions.retention_secs, 3600);
        assert!(settings.gemini.api_key.is_empty());
    }

    #[test]
    fn test_environment_override() {
        cleanup_env();
        env::set_var("APP_SERVER__PORT", "9000");
        env::set_var("APP_GEMINI__MODEL", "gemini-1.5-flash");
        env::set_var("APP_SESSIONS__RETENTION_SECS", "120");

        let config = with_defaults(Config::builder())
            .unwrap()
            .add_source(env_source())
            .build()
            .expect("Failed to build config")
            .try_deserialize::<Settings>()
            .expect("Failed to deserialize settings");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.sessions.retention_secs, 120);

        cleanup_env();
    }

    #[test]
    fn test_invalid_port() {
        let result = with_defaults(Config::builder())
            .unwrap()
            .set_override("server.port", "invalid")
            .unwrap()
            .build()
            .and_then(|config| config.try_deserialize::<Settings>());

        assert!(result.is_err(), "Expected error for invalid port");
    }
}
