use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::submissions::{Decision, VerificationOutcome};
use crate::repositories::WasteStore;

pub enum VerificationRequest {
    Verify {
        submission_id: String,
        decision: Decision,
        verifier_image: Option<String>,
        response: oneshot::Sender<Result<VerificationOutcome, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct VerificationRequestHandler {
    store: Arc<dyn WasteStore>,
}

impl VerificationRequestHandler {
    pub fn new(store: Arc<dyn WasteStore>) -> Self {
        VerificationRequestHandler { store }
    }

    /// Applies `decision` to a pending submission. The store credits the
    /// owner together with the transition, so points go out only on
    /// `Verified` and only for the caller that wins the transition.
    pub async fn verify(
        &self,
        submission_id: &str,
        decision: Decision,
        verifier_image: Option<String>,
    ) -> Result<VerificationOutcome, ServiceError> {
        let submission = self
            .store
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Submission {} not found", submission_id))
            })?;

        if submission.status.is_terminal() {
            return Err(ServiceError::Conflict(format!(
                "Submission {} is already {}",
                submission_id, submission.status
            )));
        }

        let updated = self
            .store
            .finalize_submission(submission_id, decision.status(), verifier_image)
            .await?
            .ok_or_else(|| {
                ServiceError::Conflict(format!(
                    "Submission {} was finalized concurrently",
                    submission_id
                ))
            })?;

        let points_awarded = match decision {
            Decision::Verified => updated.estimated_points,
            Decision::Rejected => 0,
        };

        log::info!(
            "Submission {} {}; {} points awarded to {}.",
            updated.id,
            updated.status,
            points_awarded,
            updated.user_id
        );

        Ok(VerificationOutcome {
            success: true,
            submission: updated,
            points_awarded,
        })
    }
}

#[async_trait]
impl RequestHandler<VerificationRequest> for VerificationRequestHandler {
    async fn handle_request(&self, request: VerificationRequest) {
        match request {
            VerificationRequest::Verify {
                submission_id,
                decision,
                verifier_image,
                response,
            } => {
                let outcome = self.verify(&submission_id, decision, verifier_image).await;
                if let Err(e) = &outcome {
                    log::warn!("Verification of {} failed: {}", submission_id, e);
                }
                let _ = response.send(outcome);
            }
        }
    }
}

pub struct VerificationService;

impl VerificationService {
    pub fn new() -> Self {
        VerificationService {}
    }
}

#[async_trait]
impl Service<VerificationRequest, VerificationRequestHandler> for VerificationService {}
