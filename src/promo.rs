//! Promo-code redemption and seeding.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::{PromoCode, Store, SubscriptionType, User};
use crate::error::AppError;
use crate::Result;

pub const DEFAULT_CODE: &str = "VIVUVUVI";
pub const DEFAULT_DURATION_MONTHS: i32 = 999;
pub const ADMIN_EMAIL: &str = "admin@vivu.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoValidation {
    pub valid: bool,
    pub kind: String,
    pub duration_months: i32,
}

/// Why a known code cannot be used right now.
fn unusable_reason(promo: &PromoCode) -> Option<&'static str> {
    if !promo.is_active || promo.is_expired_at(Utc::now()) {
        Some("Promo code is inactive or expired")
    } else if !promo.has_remaining_uses() {
        Some("Promo code has reached its usage limit")
    } else {
        None
    }
}

async fn find(store: &dyn Store, code: &str) -> Result<PromoCode> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Err(AppError::ValidationError("Promo code is required".into()));
    }
    store
        .get_promo(&code)
        .await?
        .ok_or_else(|| AppError::NotFound("Invalid promo code".into()))
}

pub async fn validate(store: &dyn Store, code: &str) -> Result<PromoValidation> {
    let promo = find(store, code).await?;
    Ok(PromoValidation {
        valid: unusable_reason(&promo).is_none(),
        kind: promo.kind.clone(),
        duration_months: promo.duration_months,
    })
}

/// Applies `code` to `user`'s subscription and returns the updated user with
/// the updated code.
pub async fn redeem(store: &dyn Store, user: &User, code: &str) -> Result<(User, PromoCode)> {
    let promo = find(store, code).await?;
    if let Some(reason) = unusable_reason(&promo) {
        return Err(AppError::ValidationError(reason.into()));
    }
    if promo.redeemed_by(user.id) {
        return Err(AppError::Conflict("You have already used this promo code".into()));
    }

    let mut upgraded = user.clone();
    let months = u32::try_from(promo.duration_months).unwrap_or(0);
    upgraded.apply_subscription(promo.subscription(), months, Utc::now());

    // The store re-checks both conditions in the same write as the upgrade;
    // losing a race to the last remaining use surfaces here.
    let Some((updated, promo)) = store.redeem_promo(&promo.code, &upgraded).await? else {
        warn!("Promo {} exhausted while user {} was redeeming it", promo.code, user.id);
        return Err(AppError::ValidationError("Promo code has reached its usage limit".into()));
    };

    info!(
        "User {} redeemed {} for a {} subscription ({}/{} uses)",
        user.id,
        promo.code,
        promo.kind,
        promo.used_count,
        promo.max_uses.map(|m| m.to_string()).unwrap_or_else(|| "unlimited".into())
    );
    Ok((updated, promo))
}

/// Creates the admin account and the default lifetime code unless they
/// already exist. Returns the code as stored. The admin account has no
/// password and cannot log in.
pub async fn seed_default(store: &dyn Store) -> Result<PromoCode> {
    let admin = match store.get_user_by_email(ADMIN_EMAIL).await? {
        Some(admin) => {
            info!("Found existing admin user {}", admin.id);
            admin
        }
        None => {
            let mut admin = User::new(ADMIN_EMAIL.to_string(), "System Admin".to_string(), None);
            admin.role = "admin".to_string();
            let admin = store.create_user(&admin).await?;
            info!("Created system admin user {}", admin.id);
            admin
        }
    };

    if let Some(existing) = store.get_promo(DEFAULT_CODE).await? {
        info!("Promo code {} already exists ({} uses)", existing.code, existing.used_count);
        return Ok(existing);
    }

    let mut promo = PromoCode::new(DEFAULT_CODE, SubscriptionType::Lifetime, DEFAULT_DURATION_MONTHS, None);
    promo.created_by = Some(admin.id);
    let promo = store.create_promo(&promo).await?;
    info!("Created promo code {}", promo.code);
    Ok(promo)
}
