//! Trial and subscription gating for paid features.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::db::{Store, User};
use crate::error::SubscriptionError;
use crate::Result;

/// Usage counters returned alongside every search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub search_count: i32,
    pub trial_used: bool,
    pub subscription_active: bool,
}

impl From<&User> for UsageSummary {
    fn from(user: &User) -> Self {
        Self {
            search_count: user.search_count,
            trial_used: user.trial_used,
            subscription_active: user.is_subscription_active(),
        }
    }
}

/// A user may search while their one free trial is unused, or while a paid
/// subscription is active.
pub fn check_access(user: &User) -> std::result::Result<(), SubscriptionError> {
    if user.can_use_trial() {
        debug!("User {} searching on trial", user.id);
        return Ok(());
    }
    if user.is_subscription_active() {
        return Ok(());
    }
    info!("User {} denied: no trial left and subscription {} inactive", user.id, user.subscription_type);
    Err(SubscriptionError::Required {
        status: user.subscription_type.clone(),
    })
}

/// Counts one search. The store re-checks access in the same write, so a
/// stale `user` that passed `check_access` cannot spend the trial twice.
pub async fn record_usage(store: &dyn Store, user: &User) -> Result<UsageSummary> {
    match store.record_search(user.id, Utc::now()).await? {
        Some(updated) => Ok(UsageSummary::from(&updated)),
        None => {
            info!("User {} denied at usage write: trial already spent", user.id);
            Err(SubscriptionError::Required {
                status: user.subscription_type.clone(),
            }
            .into())
        }
    }
}
