//! HTTP surface under `/api`.

use actix_web::dev::Service;
use actix_web::{http::header, web, FromRequest, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::handlers::{login, me, register};
use crate::auth::AuthenticatedUser;
use crate::db::UserProfile;
use crate::email;
use crate::error::AppError;
use crate::location::{LatLng, PLACEHOLDER_PHOTO_URL};
use crate::promo;
use crate::session::TravelSession;
use crate::subscription::{check_access, record_usage};
use crate::{health_check, AppState, Result};

/// Rate-limit key for a request: the client address, honoring proxy
/// headers.
pub fn client_key(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub metadata: Value,
}

pub async fn travel_search(
    req: HttpRequest,
    body: web::Json<SearchRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let client = client_key(&req);
    if !state.search_limiter.check_rate_limit(&client).await {
        warn!("Search rate limit exceeded for {}", client);
        return Err(AppError::RateLimited);
    }

    let AuthenticatedUser(user) = AuthenticatedUser::extract(&req).await?;
    check_access(&user)?;

    let SearchRequest { query, metadata } = body.into_inner();
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::ValidationError("Query is required".into()));
    }

    let usage = record_usage(state.store.as_ref(), &user).await?;
    info!("Search #{} by user {}: {}", usage.search_count, user.id, query);

    let travel_info = state.agent.process_query(query, &metadata).await;

    let thread_id = Uuid::new_v4();
    state
        .sessions
        .insert(
            thread_id,
            TravelSession::new(user.id, query.to_string(), metadata, travel_info.clone()),
        )
        .await;

    Ok(HttpResponse::Ok().json(json!({
        "travelInfo": travel_info,
        "threadId": thread_id,
        "usage": usage,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub sender_email: Option<String>,
    pub receiver_email: Option<String>,
    pub subject: Option<String>,
    pub thread_id: Option<String>,
}

fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub async fn send_email(
    user: AuthenticatedUser,
    body: web::Json<SendEmailRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (Some(sender), Some(receiver), Some(subject), Some(thread_id)) = (
        required(&body.sender_email),
        required(&body.receiver_email),
        required(&body.subject),
        required(&body.thread_id),
    ) else {
        return Err(AppError::ValidationError("All fields are required".into()));
    };

    let thread_id = Uuid::parse_str(thread_id).map_err(|_| AppError::NotFound("Session not found".into()))?;
    let session = state
        .sessions
        .get(&thread_id)
        .await
        .ok_or_else(|| AppError::NotFound("Session not found".into()))?;
    if session.user_id != user.0.id {
        warn!("User {} tried to email session {} owned by {}", user.0.id, thread_id, session.user_id);
        return Err(AppError::Forbidden("Access denied".into()));
    }

    let message = email::compose(&state.config.email, sender, receiver, subject, &session.travel_info);
    if let Err(e) = state.mailer.send(&message).await {
        error!("Error sending email for session {}: {}", thread_id, e);
        return Err(AppError::InternalError("Failed to send email".into()));
    }

    state.sessions.remove(&thread_id).await;
    Ok(HttpResponse::Ok().json(json!({ "message": "Email sent successfully" })))
}

#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    #[serde(default)]
    pub code: String,
}

pub async fn redeem_promo(
    user: AuthenticatedUser,
    body: web::Json<RedeemRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (updated, promo) = promo::redeem(state.store.as_ref(), &user.0, &body.code).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Promo code applied successfully",
        "code": promo.code,
        "user": UserProfile::from(&updated),
    })))
}

pub async fn validate_promo(path: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let validation = promo::validate(state.store.as_ref(), &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(validation))
}

#[derive(Debug, Deserialize)]
pub struct Coordinates {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

fn default_radius() -> u32 {
    2000
}

#[derive(Debug, Deserialize)]
pub struct NearbyRequest {
    pub location: Option<Coordinates>,
    pub category: Option<String>,
    #[serde(default = "default_radius")]
    pub radius: u32,
}

pub async fn nearby_places(
    _user: AuthenticatedUser,
    body: web::Json<NearbyRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let at = match &body.location {
        Some(Coordinates { lat: Some(lat), lng: Some(lng) }) => LatLng { lat: *lat, lng: *lng },
        _ => return Err(AppError::ValidationError("Location coordinates required".into())),
    };

    let places = state.locations.nearby(at, body.category.as_deref(), body.radius).await;
    Ok(HttpResponse::Ok().json(json!({ "places": places })))
}

pub async fn place_details(
    _user: AuthenticatedUser,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let place = state.locations.details(&path.into_inner()).await;
    HttpResponse::Ok().json(json!({ "place": place }))
}

/// OpenStreetMap has no photos.
pub async fn place_photo(_reference: web::Path<String>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, PLACEHOLDER_PHOTO_URL))
        .finish()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| AppError::ValidationError(err.to_string()).into()),
    );

    cfg.service(
        web::scope("/api")
            .wrap_fn(|req, srv| {
                let limiter = req
                    .app_data::<web::Data<AppState>>()
                    .map(|state| state.api_limiter.clone());
                let client = client_key(req.request());
                // Not polled until the limiter lets the request through.
                let response = srv.call(req);
                async move {
                    if let Some(limiter) = limiter {
                        if !limiter.check_rate_limit(&client).await {
                            warn!("API rate limit exceeded for {}", client);
                            return Err(AppError::RateLimited.into());
                        }
                    }
                    response.await
                }
            })
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register))
                    .route("/login", web::post().to(login))
                    .route("/me", web::get().to(me)),
            )
            .service(
                web::scope("/travel")
                    .route("/search", web::post().to(travel_search))
                    .route("/send-email", web::post().to(send_email)),
            )
            .service(
                web::scope("/promo")
                    .route("/redeem", web::post().to(redeem_promo))
                    .route("/validate/{code}", web::get().to(validate_promo)),
            )
            .service(
                web::scope("/location")
                    .route("/nearby", web::post().to(nearby_places))
                    .route("/place/{place_id}", web::get().to(place_details))
                    .route("/photo/{reference}", web::get().to(place_photo)),
            ),
    );
}
