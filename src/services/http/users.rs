use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{call, AppState, AuthSession};
use crate::models::users::{LeaderboardEntry, PublicUser, UserDetails};
use crate::services::{users::UserRequest, ServiceError};

const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
const MAX_LEADERBOARD_LIMIT: usize = 100;

#[derive(Deserialize)]
pub struct UserQuery {
    id: Option<String>,
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    limit: Option<String>,
}

/// The caller's record, or the public view of the user named by `?id=`.
pub async fn get_user_details(
    State(state): State<AppState>,
    session: AuthSession,
    Query(query): Query<UserQuery>,
) -> Result<Json<UserDetails>, ServiceError> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| session.user.user_id.clone());
    let own = id == session.user.user_id;

    let user = call(&state.channels.users, "Users", |response| UserRequest::GetUser {
        id: id.clone(),
        response,
    })
    .await??
    .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))?;

    Ok(Json(if own {
        UserDetails::Own(user)
    } else {
        UserDetails::Public(PublicUser::from(user))
    }))
}

fn parse_limit(limit: Option<&str>) -> Result<usize, ServiceError> {
    let Some(limit) = limit else {
        return Ok(DEFAULT_LEADERBOARD_LIMIT);
    };

    limit
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|limit| *limit > 0)
        .map(|limit| limit.min(MAX_LEADERBOARD_LIMIT))
        .ok_or_else(|| ServiceError::Validation("limit must be a positive integer".to_string()))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ServiceError> {
    let limit = parse_limit(query.limit.as_deref())?;

    let leaderboard = call(&state.channels.users, "Users", |response| {
        UserRequest::GetLeaderboard { limit, response }
    })
    .await?;

    Ok(Json(leaderboard))
}
