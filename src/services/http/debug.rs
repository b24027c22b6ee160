use axum::{extract::State, Json};
use serde_json::{json, Value};

use super::{call, AppState};
use crate::models::users::StoreStats;
use crate::services::{users::UserRequest, ServiceError};
use crate::settings::Environment;

fn ensure_development(state: &AppState) -> Result<(), ServiceError> {
    if state.settings.environment != Environment::Development {
        return Err(ServiceError::Forbidden(
            "Not available in production".to_string(),
        ));
    }

    Ok(())
}

fn presence(set: bool) -> &'static str {
    if set {
        "SET"
    } else {
        "NOT SET"
    }
}

/// Which settings are present. Values are never echoed.
pub async fn env_report(State(state): State<AppState>) -> Result<Json<Value>, ServiceError> {
    ensure_development(&state)?;
    let settings = &state.settings;

    Ok(Json(json!({
        "environment": "development",
        "storageBackend": format!("{:?}", settings.storage.backend).to_lowercase(),
        "POSTGRES_URL": presence(settings.postgres.is_some()),
        "GEMINI_API_KEY": presence(settings.gemini.api_key.is_some()),
        "GEMINI_MODEL": settings.gemini.model,
        "GOOGLE_CLIENT_ID": presence(settings.auth.google_client_id.is_some()),
        "ADMIN_IDS": settings.auth.admin_ids.len(),
    })))
}

/// Store round trip that surfaces failures instead of hiding them.
pub async fn db_report(State(state): State<AppState>) -> Result<Json<StoreStats>, ServiceError> {
    ensure_development(&state)?;

    let stats = call(&state.channels.users, "Users", |response| {
        UserRequest::GetStoreStats { response }
    })
    .await??;

    Ok(Json(stats))
}
