use crate::auth::password::{hash_password, verify_password};
use crate::db::{Store, User};
use crate::error::{AppError, AuthError};
use crate::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, decode, Header, EncodingKey, DecodingKey, Validation, Algorithm};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // User ID
    pub exp: i64,     // Expiration time
    pub iat: i64,     // Issued at
}

pub struct AuthService {
    store: Arc<dyn Store>,
    jwt_secret: String,
    token_expiry_hours: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, jwt_secret: String, token_expiry_hours: i64) -> Self {
        Self {
            store,
            jwt_secret,
            token_expiry_hours,
        }
    }

    pub async fn register(&self, email: &str, password: &str, name: Option<&str>) -> Result<User> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::ValidationError("A valid email is required".into()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::ValidationError(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self.store.get_user_by_email(email).await?.is_some() {
            return Err(AppError::Conflict("Email is already registered".into()));
        }

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());

        let user = User::new(email.to_string(), name, Some(hash_password(password)?));
        let user = self.store.create_user(&user).await?;
        info!("Registered user {}", user.id);
        Ok(user)
    }

    /// Checks credentials and returns the user together with a fresh token.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<(User, String)> {
        let user = self
            .store
            .get_user_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let valid = user
            .password_hash
            .as_deref()
            .map(|hash| verify_password(password, hash))
            .unwrap_or(false);
        if !valid {
            warn!("Invalid password for user {}", user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self.generate_token(&user.id.to_string())?;
        Ok((user, token))
    }

    pub async fn validate_token(&self, token: &str) -> Result<User> {
        let claims = self.decode_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(user)
    }

    pub fn generate_token(&self, user_id: &str) -> Result<String> {
        let now = Utc::now();
        let exp = (now + Duration::hours(self.token_expiry_hours)).timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            exp,
            iat: now.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    fn decode_token(&self, token: &str) -> Result<Claims> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?;

        Ok(claims.claims)
    }
}
