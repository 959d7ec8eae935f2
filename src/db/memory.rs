use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{PromoCode, User};
use crate::db::Store;
use crate::error::DatabaseError;

#[derive(Default, Clone)]
pub struct MemoryStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    promos: Arc<RwLock<HashMap<String, PromoCode>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        let mut users = self.users.write().await;
        let email = user.email.to_lowercase();
        if users.values().any(|u| u.email.to_lowercase() == email) {
            return Err(DatabaseError::Duplicate);
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn record_search(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<Option<User>, DatabaseError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&user_id).ok_or(DatabaseError::NotFound)?;
        if !user.can_use_trial() && !user.is_subscription_active_at(at) {
            return Ok(None);
        }
        user.record_search(at);
        Ok(Some(user.clone()))
    }

    async fn create_promo(&self, promo: &PromoCode) -> Result<PromoCode, DatabaseError> {
        let mut promos = self.promos.write().await;
        if promos.contains_key(&promo.code) {
            return Err(DatabaseError::Duplicate);
        }
        promos.insert(promo.code.clone(), promo.clone());
        Ok(promo.clone())
    }

    async fn get_promo(&self, code: &str) -> Result<Option<PromoCode>, DatabaseError> {
        Ok(self.promos.read().await.get(&code.to_uppercase()).cloned())
    }

    async fn redeem_promo(&self, code: &str, user: &User) -> Result<Option<(User, PromoCode)>, DatabaseError> {
        let mut promos = self.promos.write().await;
        let mut users = self.users.write().await;

        let promo = promos.get_mut(&code.to_uppercase()).ok_or(DatabaseError::NotFound)?;
        if !promo.has_remaining_uses() || promo.redeemed_by(user.id) {
            return Ok(None);
        }
        let stored = users.get_mut(&user.id).ok_or(DatabaseError::NotFound)?;

        stored.subscription_type = user.subscription_type.clone();
        stored.subscription_start = user.subscription_start;
        stored.subscription_end = user.subscription_end;
        stored.updated_at = user.updated_at;
        promo.used_count += 1;
        promo.used_by.push(user.id);
        Ok(Some((stored.clone(), promo.clone())))
    }
}
