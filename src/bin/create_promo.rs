//! Seeds the default lifetime promo code and the admin account that owns it.
//!
//! Reads the same configuration as the server; `APP_DATABASE__URL` must be
//! set. Safe to run repeatedly.

use anyhow::{bail, Context};
use dotenv::dotenv;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vivu_server::db::PgStore;
use vivu_server::{promo, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let settings = Settings::new().context("loading configuration")?;
    if !settings.uses_database() {
        bail!("no database configured; set APP_DATABASE__URL");
    }

    let store = PgStore::new_with_options(&settings.database.url, 1, Duration::from_secs(10))
        .await
        .context("connecting to database")?;
    store.migrate().await.context("running migrations")?;

    let code = promo::seed_default(&store).await?;
    info!(
        "Promo code {}: {} for {} months, max uses {}, used {}, active {}",
        code.code,
        code.kind,
        code.duration_months,
        code.max_uses.map(|m| m.to_string()).unwrap_or_else(|| "unlimited".into()),
        code.used_count,
        code.is_active
    );

    store.close().await;
    Ok(())
}
