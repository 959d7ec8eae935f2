use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionType {
    Free,
    Monthly,
    Yearly,
    Lifetime,
}

impl SubscriptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionType::Free => "free",
            SubscriptionType::Monthly => "monthly",
            SubscriptionType::Yearly => "yearly",
            SubscriptionType::Lifetime => "lifetime",
        }
    }
}

impl fmt::Display for SubscriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(SubscriptionType::Free),
            "monthly" => Ok(SubscriptionType::Monthly),
            "yearly" => Ok(SubscriptionType::Yearly),
            "lifetime" => Ok(SubscriptionType::Lifetime),
            other => Err(format!("unknown subscription type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: String,
    pub subscription_type: String,
    pub subscription_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub trial_used: bool,
    pub search_count: i32,
    pub last_search_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, name: String, password_hash: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            name,
            password_hash,
            role: "user".to_string(),
            subscription_type: SubscriptionType::Free.to_string(),
            subscription_start: None,
            subscription_end: None,
            trial_used: false,
            search_count: 0,
            last_search_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn subscription(&self) -> SubscriptionType {
        self.subscription_type.parse().unwrap_or(SubscriptionType::Free)
    }

    pub fn can_use_trial(&self) -> bool {
        !self.trial_used
    }

    pub fn is_subscription_active(&self) -> bool {
        self.is_subscription_active_at(Utc::now())
    }

    pub fn is_subscription_active_at(&self, now: DateTime<Utc>) -> bool {
        if self.subscription() == SubscriptionType::Free {
            return false;
        }
        match self.subscription_end {
            Some(end) => end > now,
            None => true,
        }
    }

    /// Usage bookkeeping for one successful search.
    pub fn record_search(&mut self, now: DateTime<Utc>) {
        if self.can_use_trial() {
            self.trial_used = true;
        }
        self.search_count += 1;
        self.last_search_date = Some(now);
        self.updated_at = now;
    }

    pub fn apply_subscription(&mut self, kind: SubscriptionType, duration_months: u32, now: DateTime<Utc>) {
        self.subscription_type = kind.to_string();
        self.subscription_start = Some(now);
        self.subscription_end = match kind {
            SubscriptionType::Lifetime | SubscriptionType::Free => None,
            _ => now.checked_add_months(Months::new(duration_months)),
        };
        self.updated_at = now;
    }
}

/// Public view of a user, safe to hand back to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub subscription: SubscriptionView,
    pub usage: UsageView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    #[serde(rename = "type")]
    pub kind: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageView {
    pub search_count: i32,
    pub trial_used: bool,
    pub last_search_date: Option<DateTime<Utc>>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
            subscription: SubscriptionView {
                kind: user.subscription_type.clone(),
                start_date: user.subscription_start,
                end_date: user.subscription_end,
                active: user.is_subscription_active(),
            },
            usage: UsageView {
                search_count: user.search_count,
                trial_used: user.trial_used,
                last_search_date: user.last_search_date,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PromoCode {
    pub id: Uuid,
    pub code: String,
    pub kind: String,
    pub duration_months: i32,
    /// `None` means unlimited.
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub used_by: Vec<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PromoCode {
    pub fn new(code: &str, kind: SubscriptionType, duration_months: i32, max_uses: Option<i32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.trim().to_uppercase(),
            kind: kind.to_string(),
            duration_months,
            max_uses,
            used_count: 0,
            used_by: Vec::new(),
            expires_at: None,
            is_active: true,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    pub fn subscription(&self) -> SubscriptionType {
        self.kind.parse().unwrap_or(SubscriptionType::Monthly)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires) if expires <= now)
    }

    pub fn has_remaining_uses(&self) -> bool {
        match self.max_uses {
            Some(max) => self.used_count < max,
            None => true,
        }
    }

    pub fn redeemed_by(&self, user_id: Uuid) -> bool {
        self.used_by.contains(&user_id)
    }
}
