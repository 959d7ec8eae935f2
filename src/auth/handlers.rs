use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use crate::auth::AuthenticatedUser;
use crate::db::UserProfile;
use crate::{AppState, Result};
use tracing::{info, error};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    info!("Received login request for email: {}", req.email);
    match state.auth_service.authenticate(&req.email, &req.password).await {
        Ok((user, token)) => {
            info!("Login successful for email: {}", req.email);
            Ok(HttpResponse::Ok().json(AuthResponse { token, user: UserProfile::from(&user) }))
        }
        Err(e) => {
            error!("Login failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

pub async fn register(
    req: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    info!("Received registration request for email: {}", req.email);

    let user = match state.auth_service.register(
        &req.email,
        &req.password,
        req.name.as_deref(),
    ).await {
        Ok(user) => user,
        Err(e) => {
            error!("Registration failed for email: {}: {}", req.email, e);
            return Err(e);
        }
    };

    let token = state.auth_service.generate_token(&user.id.to_string())?;
    Ok(HttpResponse::Created().json(AuthResponse { token, user: UserProfile::from(&user) }))
}

pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "user": UserProfile::from(&user.0) }))
}
