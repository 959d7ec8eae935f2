//! Persistence for users and promo codes.
//!
//! `Store` is the seam the handlers talk to. `PgStore` is the Postgres
//! implementation; `MemoryStore` backs tests and runs when no database URL
//! is configured.

pub mod memory;
pub mod models;
pub mod operations;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;

pub use memory::MemoryStore;
pub use models::{PromoCode, SubscriptionType, User, UserProfile};
pub use operations::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<User, DatabaseError>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Applies one search's worth of usage bookkeeping and returns the
    /// updated user. Returns `None`, leaving the user untouched, when the
    /// trial is already used and no subscription is active at `at`.
    async fn record_search(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<Option<User>, DatabaseError>;

    async fn create_promo(&self, promo: &PromoCode) -> Result<PromoCode, DatabaseError>;

    async fn get_promo(&self, code: &str) -> Result<Option<PromoCode>, DatabaseError>;

    /// Marks `code` as used by `user` and stores `user`'s subscription fields
    /// in one atomic step. Returns `None`, changing nothing, when the code has
    /// no remaining uses or the user already redeemed it.
    async fn redeem_promo(&self, code: &str, user: &User) -> Result<Option<(User, PromoCode)>, DatabaseError>;
}
