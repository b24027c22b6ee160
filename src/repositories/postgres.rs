use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{
    submissions::SubmissionRepository, users::UserRepository, StoreError, WasteStore,
};
use crate::models::{
    submissions::{NewSubmission, SubmissionStatus, WasteSubmission},
    users::{NewUser, StoreStats, User},
};
use crate::settings;

#[derive(Clone)]
pub struct PostgresStore {
    users: UserRepository,
    submissions: SubmissionRepository,
}

impl PostgresStore {
    pub fn new(conn: PgPool) -> Self {
        Self {
            users: UserRepository::new(conn.clone()),
            submissions: SubmissionRepository::new(conn),
        }
    }

    /// Connects and runs the embedded migrations, so startup fails when the
    /// database is unreachable.
    pub async fn connect(config: &settings::Postgres) -> Result<Self, StoreError> {
        let conn = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        sqlx::migrate!("./migrations").run(&conn).await?;

        Ok(Self::new(conn))
    }
}

#[async_trait]
impl WasteStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn upsert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        self.users.upsert_user(user).await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.users.get_user_by_id(id).await
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<User>, StoreError> {
        self.users.get_leaderboard(limit).await
    }

    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<WasteSubmission, StoreError> {
        self.submissions.new_submission(submission).await
    }

    async fn get_submission(&self, id: &str) -> Result<Option<WasteSubmission>, StoreError> {
        self.submissions.get_submission(id).await
    }

    async fn get_submissions(&self) -> Result<Vec<WasteSubmission>, StoreError> {
        self.submissions.get_submissions().await
    }

    async fn get_user_submissions(
        &self,
        user_id: &str,
    ) -> Result<Vec<WasteSubmission>, StoreError> {
        self.submissions.get_user_submissions(user_id).await
    }

    async fn finalize_submission(
        &self,
        id: &str,
        status: SubmissionStatus,
        verifier_image: Option<String>,
    ) -> Result<Option<WasteSubmission>, StoreError> {
        self.submissions
            .finalize_submission(id, status, verifier_image)
            .await
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            backend: self.backend(),
            users: self.users.count_users().await?,
            submissions: self.submissions.count_submissions().await?,
        })
    }
}
