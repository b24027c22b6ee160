use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use super::{call, json_body, AppState, AuthSession};
use crate::models::auth::{
    IdentityProvider, ProviderInfo, SessionUser, SignInForm, SignInResponse,
};
use crate::models::users::NewUser;
use crate::repositories::identity::IdentityError;
use crate::services::{users::UserRequest, ServiceError};

pub async fn list_providers() -> Json<Vec<ProviderInfo>> {
    Json(IdentityProvider::ALL.into_iter().map(ProviderInfo::from).collect())
}

pub async fn sign_in(
    State(state): State<AppState>,
    body: Result<Json<SignInForm>, JsonRejection>,
) -> Result<Json<SignInResponse>, ServiceError> {
    let form = json_body(body)?;
    let (Some(provider), Some(credential)) = (
        form.provider,
        form.credential.filter(|credential| !credential.trim().is_empty()),
    ) else {
        return Err(ServiceError::Validation("Missing required fields".to_string()));
    };
    let provider: IdentityProvider = provider.parse().map_err(ServiceError::Validation)?;

    let identity = state
        .identity
        .verify(provider, &credential)
        .await
        .map_err(|e| match e {
            IdentityError::InvalidCredential(detail) => {
                log::info!("Rejected {} sign-in: {}", provider, detail);
                ServiceError::Unauthenticated("Invalid credential".to_string())
            }
            IdentityError::Unavailable(detail) => ServiceError::Unavailable(detail),
        })?;

    let user = call(&state.channels.users, "Users", |response| UserRequest::SignIn {
        user: NewUser {
            id: identity.subject,
            name: identity.name,
            email: identity.email,
        },
        response,
    })
    .await??;

    let (token, expires_at) = state.sessions.create(SessionUser {
        user_id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
    });

    Ok(Json(SignInResponse {
        token,
        expires_at,
        user,
    }))
}

pub async fn sign_out(State(state): State<AppState>, session: AuthSession) -> StatusCode {
    state.sessions.revoke(&session.token);
    log::info!("User {} signed out.", session.user.user_id);

    StatusCode::NO_CONTENT
}
