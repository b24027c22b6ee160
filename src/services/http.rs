use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::trace::TraceLayer;

use super::{ServiceChannels, ServiceError};
use crate::models::auth::SessionUser;
use crate::repositories::{identity::IdentityVerifier, sessions::SessionRepository};
use crate::settings::Settings;

mod analysis;
mod auth;
mod debug;
mod submissions;
mod users;

const MAX_BODY_BYTES: usize = 12 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    channels: ServiceChannels,
    sessions: Arc<SessionRepository>,
    identity: Arc<dyn IdentityVerifier>,
    settings: Arc<Settings>,
}

impl AppState {
    pub fn new(
        channels: ServiceChannels,
        sessions: Arc<SessionRepository>,
        identity: Arc<dyn IdentityVerifier>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            channels,
            sessions,
            identity,
            settings,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::UpstreamAuthentication(_) => StatusCode::UNAUTHORIZED,
            ServiceError::UpstreamQuota(_) => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Persistence(_) | ServiceError::Communication(..) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            log::error!("{} -> {}", status, self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Sends a request built around a fresh oneshot sender and waits for the
/// service to answer on it.
async fn call<T, R>(
    channel: &mpsc::Sender<T>,
    service: &str,
    request: impl FnOnce(oneshot::Sender<R>) -> T,
) -> Result<R, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    channel
        .send(request(response_tx))
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))?;

    response_rx
        .await
        .map_err(|e| ServiceError::Communication(service.to_string(), e.to_string()))
}

/// Unwraps a JSON body, turning decode failures into validation errors.
fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ServiceError::Validation(rejection.body_text()))
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The signed-in caller. Rejects the request with 401 when the bearer token
/// is missing, unknown or expired.
pub struct AuthSession {
    pub token: String,
    pub user: SessionUser,
    pub is_admin: bool,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ServiceError::Unauthenticated("Unauthorized".to_string()))?;
        let user = state
            .sessions
            .resolve(token)
            .ok_or_else(|| ServiceError::Unauthenticated("Unauthorized".to_string()))?;

        Ok(AuthSession {
            token: token.to_string(),
            is_admin: state.settings.is_admin(&user.user_id),
            user,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/auth/providers", get(auth::list_providers))
        .route("/api/auth/signin", post(auth::sign_in))
        .route("/api/auth/signout", post(auth::sign_out))
        .route("/api/users", get(users::get_user_details))
        .route("/api/leaderboard", get(users::get_leaderboard))
        .route("/api/analyze", post(analysis::analyze_waste))
        .route(
            "/api/submissions",
            get(submissions::list_submissions).post(submissions::create_submission),
        )
        .route("/api/verify", post(submissions::verify_submission))
        .route("/api/debug/env", get(debug::env_report))
        .route("/api/debug/db", get(debug::db_report))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}

pub async fn start_http_server(state: AppState) -> Result<(), anyhow::Error> {
    let address = format!(
        "{}:{}",
        state.settings.server.host, state.settings.server.port
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&address).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
