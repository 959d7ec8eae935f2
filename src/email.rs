//! Outbound mail for emailing a generated itinerary.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::config::EmailConfig;
use crate::error::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TravelEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &TravelEmail) -> Result<(), ProviderError>;
}

/// Posts messages as JSON to a transactional mail API.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl HttpMailer {
    pub fn new(api_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &TravelEmail) -> Result<(), ProviderError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .timeout(Duration::from_secs(15))
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Mail API returned {}: {}", status, message);
            return Err(ProviderError::Status { status: status.as_u16(), message });
        }

        info!("Sent itinerary email to {}", email.to);
        Ok(())
    }
}

/// Used when no mail API is configured.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &TravelEmail) -> Result<(), ProviderError> {
        info!(
            "Mail API not configured; would send \"{}\" from {} to {} ({} bytes)",
            email.subject,
            email.from,
            email.to,
            email.html.len()
        );
        Ok(())
    }
}

pub fn from_config(config: &EmailConfig) -> Arc<dyn Mailer> {
    if config.api_url.trim().is_empty() {
        Arc::new(LogMailer)
    } else {
        Arc::new(HttpMailer::new(&config.api_url, &config.api_key))
    }
}

/// Wraps the itinerary in a minimal mail body. The sender's address goes in
/// `reply_to` since the configured address is the one that actually sends.
pub fn compose(config: &EmailConfig, sender: &str, receiver: &str, subject: &str, travel_info: &str) -> TravelEmail {
    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 800px; margin: 0 auto;">
  <p style="color: #555;">{} đã chia sẻ kế hoạch du lịch với bạn.</p>
  {}
</div>"#,
        crate::agent::escape_html(sender),
        travel_info
    );

    TravelEmail {
        from: config.from_address.clone(),
        to: receiver.to_string(),
        subject: subject.to_string(),
        html,
        reply_to: sender.to_string(),
    }
}
