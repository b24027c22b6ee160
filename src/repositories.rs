use async_trait::async_trait;

use crate::models::{
    submissions::{NewSubmission, SubmissionStatus, WasteSubmission},
    users::{NewUser, StoreStats, User},
};

pub mod analysis;
pub mod identity;
pub mod memory;
pub mod postgres;
pub mod sessions;
pub mod submissions;
pub mod users;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Corrupt record {0}: {1}")]
    Corrupt(String, String),
}

/// Persistence for users and waste submissions.
///
/// Counter updates and status transitions must be atomic per record: the
/// workflow never reads a counter back to write it again.
#[async_trait]
pub trait WasteStore: Send + Sync + 'static {
    fn backend(&self) -> &'static str;

    /// Creates the user with zeroed counters, or refreshes name and email of
    /// an existing one.
    async fn upsert_user(&self, user: &NewUser) -> Result<User, StoreError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Top `limit` users by points, ties in insertion order.
    async fn leaderboard(&self, limit: usize) -> Result<Vec<User>, StoreError>;

    /// Persists a pending submission and bumps the owner's submission count.
    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<WasteSubmission, StoreError>;

    async fn get_submission(&self, id: &str) -> Result<Option<WasteSubmission>, StoreError>;

    /// All submissions, newest first.
    async fn get_submissions(&self) -> Result<Vec<WasteSubmission>, StoreError>;

    /// Submissions owned by `user_id`, newest first.
    async fn get_user_submissions(
        &self,
        user_id: &str,
    ) -> Result<Vec<WasteSubmission>, StoreError>;

    /// Moves a pending submission to `status`, stamping the verification
    /// time. A `Verified` status also adds the submission's points and one
    /// verified submission to its owner in the same atomic write; if the
    /// credit fails nothing changes. Returns `None` when no pending
    /// submission with that id exists.
    async fn finalize_submission(
        &self,
        id: &str,
        status: SubmissionStatus,
        verifier_image: Option<String>,
    ) -> Result<Option<WasteSubmission>, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}
