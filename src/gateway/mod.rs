//! Axum-based HTTP gateway fronting the auth and record stores.
//!
//! - Explicit sub-routes per operation (one handler, one job)
//! - Request body size limit (64KB max)
//! - Request timeout to prevent slow-loris abuse
//! - Permissive CORS for the web/PWA client, preflight handled by the layer
//!
//! All error bodies are `{"error": ...}`; internal failures log their detail
//! and answer with a generic 500.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::auth::AuthStore;
use crate::config::Config;
use crate::db::Database;
use crate::error::ApiError;
use crate::migrate::{self, MigrationPayload};
use crate::records::{
    NewClient, NewComment, NewLead, NewProperty, NewReminder, RecordStore, UpdateClient,
    UpdateComment, UpdateLead, UpdateProperty, UpdateReminder,
};

/// Maximum request body size (64KB).
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthStore,
    pub records: RecordStore,
    pub allow_registration: bool,
    pub reveal_reset_tokens: bool,
}

type ApiResult = Result<(StatusCode, Json<Value>), ApiError>;

/// Bind and serve until ctrl-c.
pub async fn serve(config: Arc<Config>, db: Database) -> Result<()> {
    let state = AppState {
        auth: AuthStore::new(
            db.clone(),
            config.auth.session_ttl_secs,
            config.auth.reset_ttl_secs,
        ),
        records: RecordStore::new(db),
        allow_registration: config.auth.allow_registration,
        reveal_reset_tokens: config.auth.reveal_reset_tokens,
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

pub fn build_router(state: AppState) -> Router {
    // CORS — the PWA client may be served from any origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/auth/register", post(handle_register))
        .route("/api/auth/login", post(handle_login))
        .route("/api/auth/verify", post(handle_verify))
        .route("/api/auth/me", get(handle_me))
        .route("/api/auth/forgot-password", post(handle_forgot_password))
        .route("/api/auth/reset-password", post(handle_reset_password))
        .route("/api/clients", get(list_clients))
        .route("/api/clients", post(create_client))
        .route("/api/clients", put(update_client))
        .route("/api/clients", delete(delete_client))
        .route("/api/leads", get(list_leads))
        .route("/api/leads", post(create_lead))
        .route("/api/leads", put(update_lead))
        .route("/api/leads", delete(delete_lead))
        .route("/api/properties", get(list_properties))
        .route("/api/properties", post(create_property))
        .route("/api/properties", put(update_property))
        .route("/api/properties", delete(delete_property))
        .route("/api/reminders", get(list_reminders))
        .route("/api/reminders", post(create_reminder))
        .route("/api/reminders", put(update_reminder))
        .route("/api/reminders", delete(delete_reminder))
        .route("/api/comments", get(list_comments))
        .route("/api/comments", post(create_comment))
        .route("/api/comments", put(update_comment))
        .route("/api/comments", delete(delete_comment))
        .route("/api/migrate", post(handle_migrate))
        .with_state(state)
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ))
}

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(v)) => Ok(v),
        Err(_) => Err(ApiError::validation("Invalid request format")),
    }
}

/// Extract bearer token from Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

// ── Request bodies ──────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    full_name: String,
    company: Option<String>,
}

#[derive(Deserialize)]
struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct VerifyBody {
    #[serde(default)]
    token: String,
}

#[derive(Deserialize)]
struct ForgotPasswordBody {
    #[serde(default)]
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResetPasswordBody {
    #[serde(default)]
    token: String,
    #[serde(default)]
    new_password: String,
}

#[derive(Deserialize)]
struct DeleteBody {
    #[serde(default)]
    id: i64,
}

// ── Health ──────────────────────────────────────────────────────────

async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

// ── Auth handlers ───────────────────────────────────────────────────

async fn handle_register(
    State(state): State<AppState>,
    body: Result<Json<RegisterBody>, JsonRejection>,
) -> ApiResult {
    if !state.allow_registration {
        return Ok((
            StatusCode::FORBIDDEN,
            Json(json!({"error": "Registration is disabled"})),
        ));
    }

    let body = parse_body(body)?;
    if body.email.is_empty() || body.password.is_empty() || body.full_name.is_empty() {
        return Err(ApiError::validation(
            "Email, password, and full name are required",
        ));
    }

    let (user, token) = state.auth.register(
        &body.email,
        &body.password,
        &body.full_name,
        body.company.as_deref(),
    )?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user": user,
            "token": token,
        })),
    ))
}

async fn handle_login(
    State(state): State<AppState>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> ApiResult {
    let body = parse_body(body)?;
    if body.email.is_empty() || body.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let (user, token) = state.auth.login(&body.email, &body.password)?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "message": "Login successful",
            "user": user,
            "token": token,
        })),
    ))
}

async fn handle_verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyBody>, JsonRejection>,
) -> ApiResult {
    let body = parse_body(body)?;
    if body.token.is_empty() {
        return Err(ApiError::validation("Token is required"));
    }

    let user = state.auth.verify_token(&body.token)?;
    Ok((StatusCode::OK, Json(json!({"valid": true, "user": user}))))
}

async fn handle_me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| ApiError::unauthenticated("Authorization token required"))?;

    let user = state.auth.verify_token(token)?;
    Ok((StatusCode::OK, Json(json!({"valid": true, "user": user}))))
}

async fn handle_forgot_password(
    State(state): State<AppState>,
    body: Result<Json<ForgotPasswordBody>, JsonRejection>,
) -> ApiResult {
    let body = parse_body(body)?;
    if body.email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }

    // Present and absent accounts answer with the same body unless the dev
    // reveal flag is on, so the endpoint never confirms account existence.
    let token = state.auth.request_reset(&body.email)?;
    match token {
        Some(token) if state.reveal_reset_tokens => Ok((
            StatusCode::OK,
            Json(json!({
                "message": "If the email exists, a reset link has been sent",
                "resetToken": token,
            })),
        )),
        _ => Ok((
            StatusCode::OK,
            Json(json!({"message": "If the email exists, a reset link has been sent"})),
        )),
    }
}

async fn handle_reset_password(
    State(state): State<AppState>,
    body: Result<Json<ResetPasswordBody>, JsonRejection>,
) -> ApiResult {
    let body = parse_body(body)?;
    if body.token.is_empty() || body.new_password.is_empty() {
        return Err(ApiError::validation("Token and new password are required"));
    }

    state.auth.reset_password(&body.token, &body.new_password)?;
    Ok((
        StatusCode::OK,
        Json(json!({"message": "Password reset successful"})),
    ))
}

// ── Record handlers ─────────────────────────────────────────────────

// One handler quartet per record type; the shapes only differ in the store
// method and the JSON envelope key.
macro_rules! record_handlers {
    ($list:ident, $create:ident, $update:ident, $delete:ident,
     $new_ty:ty, $update_ty:ty,
     $plural:literal, $singular:literal, $deleted_msg:literal) => {
        async fn $list(State(state): State<AppState>) -> ApiResult {
            let rows = state.records.$list()?;
            Ok((StatusCode::OK, Json(json!({$plural: rows}))))
        }

        async fn $create(
            State(state): State<AppState>,
            body: Result<Json<$new_ty>, JsonRejection>,
        ) -> ApiResult {
            let input = parse_body(body)?;
            let row = state.records.$create(&input)?;
            Ok((StatusCode::CREATED, Json(json!({$singular: row}))))
        }

        async fn $update(
            State(state): State<AppState>,
            body: Result<Json<$update_ty>, JsonRejection>,
        ) -> ApiResult {
            let input = parse_body(body)?;
            let row = state.records.$update(&input)?;
            Ok((StatusCode::OK, Json(json!({$singular: row}))))
        }

        async fn $delete(
            State(state): State<AppState>,
            body: Result<Json<DeleteBody>, JsonRejection>,
        ) -> ApiResult {
            let input = parse_body(body)?;
            let id = state.records.$delete(input.id)?;
            Ok((
                StatusCode::OK,
                Json(json!({"message": $deleted_msg, "id": id})),
            ))
        }
    };
}

record_handlers!(
    list_clients, create_client, update_client, delete_client,
    NewClient, UpdateClient,
    "clients", "client", "Client deleted successfully"
);

record_handlers!(
    list_leads, create_lead, update_lead, delete_lead,
    NewLead, UpdateLead,
    "leads", "lead", "Lead deleted successfully"
);

record_handlers!(
    list_properties, create_property, update_property, delete_property,
    NewProperty, UpdateProperty,
    "properties", "property", "Property deleted successfully"
);

record_handlers!(
    list_reminders, create_reminder, update_reminder, delete_reminder,
    NewReminder, UpdateReminder,
    "reminders", "reminder", "Reminder deleted successfully"
);

record_handlers!(
    list_comments, create_comment, update_comment, delete_comment,
    NewComment, UpdateComment,
    "comments", "comment", "Comment deleted successfully"
);

// ── Migration ───────────────────────────────────────────────────────

async fn handle_migrate(
    State(state): State<AppState>,
    body: Result<Json<MigrationPayload>, JsonRejection>,
) -> ApiResult {
    let payload = parse_body(body)?;
    let results = migrate::run(&state.records, &payload);
    Ok((
        StatusCode::OK,
        Json(json!({"message": "Migration completed", "results": results})),
    ))
}

// ── Tests ───────────────────────────────────────────────────────────
