use crate::models::submissions::{self, NewSubmission, SubmissionStatus, WasteSubmission};

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::StoreError;

/// Insertion order breaks timestamp ties, matching the in-memory store.
const NEWEST_FIRST: &str = "ORDER BY submitted_at DESC, seq DESC";

#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: String,
    user_id: String,
    image_url: String,
    waste_type: String,
    quantity: String,
    estimated_points: i32,
    status: String,
    submitted_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
    verifier_image: Option<String>,
}

impl TryFrom<SubmissionRow> for WasteSubmission {
    type Error = StoreError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| StoreError::Corrupt(row.id.clone(), e);

        Ok(WasteSubmission {
            waste_type: row.waste_type.parse().map_err(corrupt)?,
            quantity: row.quantity.parse().map_err(corrupt)?,
            status: row.status.parse().map_err(corrupt)?,
            id: row.id,
            user_id: row.user_id,
            image_url: row.image_url,
            estimated_points: row.estimated_points,
            submitted_at: row.submitted_at,
            verified_at: row.verified_at,
            verifier_image: row.verifier_image,
        })
    }
}

fn into_submissions(rows: Vec<SubmissionRow>) -> Result<Vec<WasteSubmission>, StoreError> {
    rows.into_iter().map(WasteSubmission::try_from).collect()
}

#[derive(Clone)]
pub struct SubmissionRepository {
    conn: PgPool,
}

impl SubmissionRepository {
    pub fn new(conn: PgPool) -> Self {
        SubmissionRepository { conn }
    }

    pub async fn new_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<submissions::WasteSubmission, StoreError> {
        let submission_id = Uuid::new_v4().hyphenated().to_string();
        let mut tx = self.conn.begin().await?;

        let bumped = sqlx::query(
            r#"UPDATE users
            SET total_submissions = total_submissions + 1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1"#,
        )
        .bind(&submission.user_id)
        .execute(&mut *tx)
        .await?;

        if bumped.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", submission.user_id)));
        }

        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"INSERT INTO submissions
            (id, user_id, image_url, waste_type, quantity, estimated_points, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending')
            RETURNING *
            "#,
        )
        .bind(&submission_id)
        .bind(&submission.user_id)
        .bind(&submission.image_url)
        .bind(submission.waste_type.as_str())
        .bind(submission.quantity.as_str())
        .bind(submission.estimated_points)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.try_into()
    }

    pub async fn get_submission(
        &self,
        id: &str,
    ) -> Result<Option<submissions::WasteSubmission>, StoreError> {
        let row = sqlx::query_as::<_, SubmissionRow>("SELECT * FROM submissions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?;

        row.map(WasteSubmission::try_from).transpose()
    }

    pub async fn get_submissions(&self) -> Result<Vec<submissions::WasteSubmission>, StoreError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            &format!("SELECT * FROM submissions {}", NEWEST_FIRST),
        )
        .fetch_all(&self.conn)
        .await?;

        into_submissions(rows)
    }

    pub async fn get_user_submissions(
        &self,
        user_id: &str,
    ) -> Result<Vec<submissions::WasteSubmission>, StoreError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            &format!("SELECT * FROM submissions WHERE user_id = $1 {}", NEWEST_FIRST),
        )
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        into_submissions(rows)
    }

    pub async fn finalize_submission(
        &self,
        id: &str,
        status: SubmissionStatus,
        verifier_image: Option<String>,
    ) -> Result<Option<submissions::WasteSubmission>, StoreError> {
        let mut tx = self.conn.begin().await?;

        let row = sqlx::query_as::<_, SubmissionRow>(
            r#"UPDATE submissions
            SET status = $1, verified_at = CURRENT_TIMESTAMP, verifier_image = COALESCE($2, verifier_image)
            WHERE id = $3 AND status = 'pending'
            RETURNING *"#,
        )
        .bind(status.as_str())
        .bind(verifier_image)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        if status == SubmissionStatus::Verified {
            let credited = sqlx::query(
                r#"UPDATE users
                SET points = points + $1,
                    verified_submissions = verified_submissions + 1,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $2"#,
            )
            .bind(i64::from(row.estimated_points))
            .bind(&row.user_id)
            .execute(&mut *tx)
            .await?;

            if credited.rows_affected() == 0 {
                return Err(StoreError::NotFound(format!("user {}", row.user_id)));
            }
        }

        tx.commit().await?;

        WasteSubmission::try_from(row).map(Some)
    }

    pub async fn count_submissions(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM submissions")
            .fetch_one(&self.conn)
            .await?;

        Ok(count)
    }
}
