use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{StoreError, WasteStore};
use crate::models::{
    submissions::{NewSubmission, SubmissionStatus, WasteSubmission},
    users::{NewUser, StoreStats, User},
};

struct Entry<T> {
    seq: u64,
    value: T,
}

/// Process-local store. Each record sits behind its own map entry lock, so
/// counter bumps and status transitions are atomic per record.
#[derive(Default)]
pub struct MemoryStore {
    seq: AtomicU64,
    users: DashMap<String, Entry<User>>,
    submissions: DashMap<String, Entry<WasteSubmission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    fn collect_submissions<F>(&self, filter: F) -> Vec<WasteSubmission>
    where
        F: Fn(&WasteSubmission) -> bool,
    {
        let mut entries: Vec<(u64, WasteSubmission)> = self
            .submissions
            .iter()
            .filter(|entry| filter(&entry.value))
            .map(|entry| (entry.seq, entry.value.clone()))
            .collect();

        entries.sort_by(|(a_seq, a), (b_seq, b)| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then_with(|| b_seq.cmp(a_seq))
        });

        entries.into_iter().map(|(_, submission)| submission).collect()
    }
}

#[async_trait]
impl WasteStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn upsert_user(&self, user: &NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let seq = self.next_seq();

        let entry = self
            .users
            .entry(user.id.clone())
            .and_modify(|entry| {
                entry.value.name = user.name.clone();
                entry.value.email = user.email.clone();
                entry.value.updated_at = now;
            })
            .or_insert_with(|| Entry {
                seq,
                value: User {
                    id: user.id.clone(),
                    name: user.name.clone(),
                    email: user.email.clone(),
                    points: 0,
                    total_submissions: 0,
                    verified_submissions: 0,
                    created_at: now,
                    updated_at: now,
                },
            });

        Ok(entry.value.clone())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(id).map(|entry| entry.value.clone()))
    }

    async fn leaderboard(&self, limit: usize) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<(u64, User)> = self
            .users
            .iter()
            .map(|entry| (entry.seq, entry.value.clone()))
            .collect();

        users.sort_by(|(a_seq, a), (b_seq, b)| b.points.cmp(&a.points).then(a_seq.cmp(b_seq)));

        Ok(users
            .into_iter()
            .take(limit)
            .map(|(_, user)| user)
            .collect())
    }

    async fn create_submission(
        &self,
        submission: NewSubmission,
    ) -> Result<WasteSubmission, StoreError> {
        let created = WasteSubmission {
            id: Uuid::new_v4().hyphenated().to_string(),
            user_id: submission.user_id,
            image_url: submission.image_url,
            waste_type: submission.waste_type,
            quantity: submission.quantity,
            estimated_points: submission.estimated_points,
            status: SubmissionStatus::Pending,
            submitted_at: Utc::now(),
            verified_at: None,
            verifier_image: None,
        };

        {
            let mut owner = self
                .users
                .get_mut(&created.user_id)
                .ok_or_else(|| StoreError::NotFound(format!("user {}", created.user_id)))?;
            owner.value.total_submissions += 1;
            owner.value.updated_at = created.submitted_at;
        }

        let seq = self.next_seq();
        self.submissions.insert(
            created.id.clone(),
            Entry {
                seq,
                value: created.clone(),
            },
        );

        Ok(created)
    }

    async fn get_submission(&self, id: &str) -> Result<Option<WasteSubmission>, StoreError> {
        Ok(self.submissions.get(id).map(|entry| entry.value.clone()))
    }

    async fn get_submissions(&self) -> Result<Vec<WasteSubmission>, StoreError> {
        Ok(self.collect_submissions(|_| true))
    }

    async fn get_user_submissions(
        &self,
        user_id: &str,
    ) -> Result<Vec<WasteSubmission>, StoreError> {
        Ok(self.collect_submissions(|submission| submission.user_id == user_id))
    }

    async fn finalize_submission(
        &self,
        id: &str,
        status: SubmissionStatus,
        verifier_image: Option<String>,
    ) -> Result<Option<WasteSubmission>, StoreError> {
        let Some(mut entry) = self.submissions.get_mut(id) else {
            return Ok(None);
        };

        if entry.value.status.is_terminal() {
            return Ok(None);
        }

        let now = Utc::now();
        if status == SubmissionStatus::Verified {
            // Owner is credited while the submission entry is still locked.
            let mut owner = self
                .users
                .get_mut(&entry.value.user_id)
                .ok_or_else(|| StoreError::NotFound(format!("user {}", entry.value.user_id)))?;
            owner.value.points += i64::from(entry.value.estimated_points);
            owner.value.verified_submissions += 1;
            owner.value.updated_at = now;
        }

        entry.value.status = status;
        entry.value.verified_at = Some(now);
        if verifier_image.is_some() {
            entry.value.verifier_image = verifier_image;
        }

        Ok(Some(entry.value.clone()))
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            backend: self.backend(),
            users: self.users.len() as i64,
            submissions: self.submissions.len() as i64,
        })
    }
}
