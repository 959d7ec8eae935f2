use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::models::{PromoCode, User};
use crate::db::Store;
use crate::error::DatabaseError;

const USER_COLUMNS: &str = "id, email, name, password_hash, role, subscription_type, \
    subscription_start, subscription_end, trial_used, search_count, last_search_date, \
    created_at, updated_at";

const PROMO_COLUMNS: &str = "id, code, kind, duration_months, max_uses, used_count, used_by, \
    expires_at, is_active, created_by, created_at";

pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub async fn new_with_options(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, DatabaseError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(self.pool.as_ref())
            .await
            .map_err(|e| DatabaseError::QueryError(e.to_string()))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: &User) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(&user.role)
            .bind(&user.subscription_type)
            .bind(user.subscription_start)
            .bind(user.subscription_end)
            .bind(user.trial_used)
            .bind(user.search_count)
            .bind(user.last_search_date)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn record_search(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<Option<User>, DatabaseError> {
        // The access check lives in the WHERE clause so a trial is spent at
        // most once under concurrent searches.
        let sql = format!(
            "UPDATE users SET trial_used = TRUE, search_count = search_count + 1, \
             last_search_date = $2, updated_at = $2 \
             WHERE id = $1 \
               AND (trial_used = FALSE \
                    OR (subscription_type <> 'free' \
                        AND (subscription_end IS NULL OR subscription_end > $2))) \
             RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user_id)
            .bind(at)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(user)
    }

    async fn create_promo(&self, promo: &PromoCode) -> Result<PromoCode, DatabaseError> {
        let sql = format!(
            "INSERT INTO promo_codes ({PROMO_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {PROMO_COLUMNS}"
        );
        let promo = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(promo.id)
            .bind(&promo.code)
            .bind(&promo.kind)
            .bind(promo.duration_months)
            .bind(promo.max_uses)
            .bind(promo.used_count)
            .bind(&promo.used_by)
            .bind(promo.expires_at)
            .bind(promo.is_active)
            .bind(promo.created_by)
            .bind(promo.created_at)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(promo)
    }

    async fn get_promo(&self, code: &str) -> Result<Option<PromoCode>, DatabaseError> {
        let sql = format!("SELECT {PROMO_COLUMNS} FROM promo_codes WHERE code = upper($1)");
        let promo = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(code)
            .fetch_optional(self.pool.as_ref())
            .await?;

        Ok(promo)
    }

    async fn redeem_promo(&self, code: &str, user: &User) -> Result<Option<(User, PromoCode)>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        // The WHERE clause keeps used_count <= max_uses under concurrent redemptions.
        let sql = format!(
            "UPDATE promo_codes SET used_count = used_count + 1, \
             used_by = array_append(used_by, $2) \
             WHERE code = upper($1) \
               AND (max_uses IS NULL OR used_count < max_uses) \
               AND NOT ($2 = ANY(used_by)) \
             RETURNING {PROMO_COLUMNS}"
        );
        let Some(promo) = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(code)
            .bind(user.id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let sql = format!(
            "UPDATE users SET subscription_type = $2, subscription_start = $3, \
             subscription_end = $4, updated_at = $5 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        // Dropping `tx` on error rolls the promo update back.
        let updated = sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.subscription_type)
            .bind(user.subscription_start)
            .bind(user.subscription_end)
            .bind(user.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some((updated, promo)))
    }
}
