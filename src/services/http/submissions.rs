use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::{call, json_body, AppState, AuthSession};
use crate::models::submissions::{
    Decision, SubmissionForm, VerificationOutcome, VerifyForm, WasteSubmission,
};
use crate::services::{
    submissions::SubmissionRequest, verification::VerificationRequest, ServiceError,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionQuery {
    user_id: Option<String>,
}

pub async fn create_submission(
    State(state): State<AppState>,
    session: AuthSession,
    body: Result<Json<SubmissionForm>, JsonRejection>,
) -> Result<(StatusCode, Json<WasteSubmission>), ServiceError> {
    let submission = json_body(body)?
        .validate(&session.user.user_id)
        .map_err(ServiceError::Validation)?;

    let created = call(&state.channels.submissions, "Submissions", |response| {
        SubmissionRequest::CreateSubmission {
            submission,
            response,
        }
    })
    .await??;

    Ok((StatusCode::CREATED, Json(created)))
}

/// Callers see their own submissions. Listing anyone else's, or everyone's,
/// takes the reviewer capability.
pub async fn list_submissions(
    State(state): State<AppState>,
    session: AuthSession,
    Query(query): Query<SubmissionQuery>,
) -> Result<Json<Vec<WasteSubmission>>, ServiceError> {
    let requested = query.user_id.filter(|id| !id.is_empty());

    let owner = match requested {
        Some(user_id) if user_id == session.user.user_id => Some(user_id),
        requested if session.is_admin => requested,
        _ => {
            return Err(ServiceError::Forbidden(
                "Only reviewers can list other users' submissions".to_string(),
            ))
        }
    };

    let submissions = call(&state.channels.submissions, "Submissions", |response| {
        SubmissionRequest::ListSubmissions { owner, response }
    })
    .await?;

    Ok(Json(submissions))
}

pub async fn verify_submission(
    State(state): State<AppState>,
    session: AuthSession,
    body: Result<Json<VerifyForm>, JsonRejection>,
) -> Result<Json<VerificationOutcome>, ServiceError> {
    if !session.is_admin {
        return Err(ServiceError::Forbidden(
            "Only reviewers can verify submissions".to_string(),
        ));
    }

    let form = json_body(body)?;
    let (Some(submission_id), Some(status)) = (
        form.submission_id.filter(|id| !id.is_empty()),
        form.status.filter(|status| !status.is_empty()),
    ) else {
        return Err(ServiceError::Validation("Missing required fields".to_string()));
    };
    let decision: Decision = status.parse().map_err(ServiceError::Validation)?;
    let verifier_image = form.verifier_image.filter(|image| !image.is_empty());

    log::info!(
        "Reviewer {} marks submission {} as {}.",
        session.user.user_id,
        submission_id,
        status
    );
    let outcome = call(&state.channels.verification, "Verification", |response| {
        VerificationRequest::Verify {
            submission_id,
            decision,
            verifier_image,
            response,
        }
    })
    .await??;

    Ok(Json(outcome))
}
