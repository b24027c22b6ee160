use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::submissions::{NewSubmission, WasteSubmission};
use crate::repositories::WasteStore;

pub enum SubmissionRequest {
    CreateSubmission {
        submission: NewSubmission,
        response: oneshot::Sender<Result<WasteSubmission, ServiceError>>,
    },
    /// Submissions of `owner`, or every submission when `owner` is `None`.
    ListSubmissions {
        owner: Option<String>,
        response: oneshot::Sender<Vec<WasteSubmission>>,
    },
}

#[derive(Clone)]
pub struct SubmissionRequestHandler {
    store: Arc<dyn WasteStore>,
}

impl SubmissionRequestHandler {
    pub fn new(store: Arc<dyn WasteStore>) -> Self {
        SubmissionRequestHandler { store }
    }

    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<WasteSubmission, ServiceError> {
        let created = self
            .store
            .create_submission(submission)
            .await
            .map_err(|e| {
                log::error!("Error creating submission: {}", e);
                ServiceError::Persistence(e.to_string())
            })?;

        log::info!(
            "Submission {} created for user {} ({} {}, {} points).",
            created.id,
            created.user_id,
            created.quantity,
            created.waste_type,
            created.estimated_points
        );
        Ok(created)
    }

    /// Read failures degrade to an empty list.
    async fn list_submissions(&self, owner: Option<&str>) -> Vec<WasteSubmission> {
        let result = match owner {
            Some(user_id) => self.store.get_user_submissions(user_id).await,
            None => self.store.get_submissions().await,
        };

        result.unwrap_or_else(|e| {
            log::error!("Error fetching submissions: {}", e);
            Vec::new()
        })
    }
}

#[async_trait]
impl RequestHandler<SubmissionRequest> for SubmissionRequestHandler {
    async fn handle_request(&self, request: SubmissionRequest) {
        match request {
            SubmissionRequest::CreateSubmission {
                submission,
                response,
            } => {
                let created = self.create_submission(submission).await;
                let _ = response.send(created);
            }
            SubmissionRequest::ListSubmissions { owner, response } => {
                let submissions = self.list_submissions(owner.as_deref()).await;
                let _ = response.send(submissions);
            }
        }
    }
}

pub struct SubmissionService;

impl SubmissionService {
    pub fn new() -> Self {
        SubmissionService {}
    }
}

#[async_trait]
impl Service<SubmissionRequest, SubmissionRequestHandler> for SubmissionService {}
