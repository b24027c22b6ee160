use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::{RequestHandler, Service, ServiceError};
use crate::models::users::{self, LeaderboardEntry, StoreStats};
use crate::repositories::WasteStore;

pub enum UserRequest {
    /// Upserts the user behind a freshly verified identity.
    SignIn {
        user: users::NewUser,
        response: oneshot::Sender<Result<users::User, ServiceError>>,
    },
    GetUser {
        id: String,
        response: oneshot::Sender<Result<Option<users::User>, ServiceError>>,
    },
    GetLeaderboard {
        limit: usize,
        response: oneshot::Sender<Vec<LeaderboardEntry>>,
    },
    GetStoreStats {
        response: oneshot::Sender<Result<StoreStats, ServiceError>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    store: Arc<dyn WasteStore>,
}

impl UserRequestHandler {
    pub fn new(store: Arc<dyn WasteStore>) -> Self {
        UserRequestHandler { store }
    }

    async fn sign_in(&self, user: users::NewUser) -> Result<users::User, ServiceError> {
        let user = self.store.upsert_user(&user).await.map_err(|e| {
            log::error!("Error creating/updating user: {}", e);
            ServiceError::Persistence(e.to_string())
        })?;

        log::info!("User {} signed in.", user.id);
        Ok(user)
    }

    async fn get_user(&self, id: &str) -> Result<Option<users::User>, ServiceError> {
        self.store
            .get_user(id)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }

    async fn get_leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        match self.store.leaderboard(limit).await {
            Ok(users) => LeaderboardEntry::ranked(users),
            Err(e) => {
                log::error!("Error fetching leaderboard: {}", e);
                Vec::new()
            }
        }
    }

    async fn get_store_stats(&self) -> Result<StoreStats, ServiceError> {
        self.store
            .stats()
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::SignIn { user, response } => {
                let user = self.sign_in(user).await;
                let _ = response.send(user);
            }
            UserRequest::GetUser { id, response } => {
                let user = self.get_user(&id).await;
                let _ = response.send(user);
            }
            UserRequest::GetLeaderboard { limit, response } => {
                let leaderboard = self.get_leaderboard(limit).await;
                let _ = response.send(leaderboard);
            }
            UserRequest::GetStoreStats { response } => {
                let stats = self.get_store_stats().await;
                let _ = response.send(stats);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submissions::{NewSubmission, Quantity, SubmissionStatus, WasteType};
    use crate::repositories::memory::MemoryStore;
    use crate::repositories::tests::UnavailableStore;

    #[tokio::test]
    async fn leaderboard_returns_exactly_the_top_entries_ranked() {
        let store = Arc::new(MemoryStore::new());
        for n in 0..10 {
            let id = format!("user-{}", n);
            store
                .upsert_user(&users::NewUser {
                    id: id.clone(),
                    name: format!("User {}", n),
                    email: format!("{}@example.com", id),
                })
                .await
                .unwrap();
            let submission = store
                .create_submission(NewSubmission {
                    user_id: id.clone(),
                    image_url: "https://img.example/item.jpg".to_string(),
                    waste_type: WasteType::Paper,
                    quantity: Quantity::Small,
                    estimated_points: n + 1,
                })
                .await
                .unwrap();
            store
                .finalize_submission(&submission.id, SubmissionStatus::Verified, None)
                .await
                .unwrap();
        }
        let handler = UserRequestHandler::new(store);

        let top = handler.get_leaderboard(3).await;

        assert_eq!(top.len(), 3);
        assert_eq!(
            top.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["user-9", "user-8", "user-7"]
        );
        assert_eq!(
            top.iter().map(|e| e.rank).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(top.windows(2).all(|pair| pair[0].points >= pair[1].points));
    }

    #[tokio::test]
    async fn sign_in_creates_user_with_zeroed_counters() {
        let handler = UserRequestHandler::new(Arc::new(MemoryStore::new()));

        let user = handler
            .sign_in(users::NewUser {
                id: "google-42".to_string(),
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(user.points, 0);
        assert_eq!(user.total_submissions, 0);
        assert_eq!(user.verified_submissions, 0);
        assert_eq!(handler.get_user("google-42").await.unwrap(), Some(user));
        assert_eq!(handler.get_store_stats().await.unwrap().users, 1);
    }

    #[tokio::test]
    async fn leaderboard_degrades_to_empty_when_store_is_down() {
        let handler = UserRequestHandler::new(Arc::new(UnavailableStore));

        assert!(handler.get_leaderboard(10).await.is_empty());
        assert!(matches!(
            handler.get_store_stats().await,
            Err(ServiceError::Persistence(_))
        ));
        assert!(matches!(
            handler.get_user("anyone").await,
            Err(ServiceError::Persistence(_))
        ));
    }
}
