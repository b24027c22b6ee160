use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::repositories::{
    analysis::VisionModel, identity::IdentityVerifier, sessions::SessionRepository, StoreError,
    WasteStore,
};
use crate::settings::Settings;

pub mod analysis;
pub mod http;
pub mod submissions;
pub mod users;
pub mod verification;

const CHANNEL_CAPACITY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("AI service authentication failed")]
    UpstreamAuthentication(String),
    #[error("AI service quota exceeded")]
    UpstreamQuota(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Database error: {0}")]
    Persistence(String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Persistence(e.to_string())
    }
}

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

/// Senders for every request-handling service.
#[derive(Clone)]
pub struct ServiceChannels {
    pub analysis: mpsc::Sender<analysis::AnalysisRequest>,
    pub submissions: mpsc::Sender<submissions::SubmissionRequest>,
    pub verification: mpsc::Sender<verification::VerificationRequest>,
    pub users: mpsc::Sender<users::UserRequest>,
}

/// Spawns the service loops over `store` and `model` and returns their
/// request channels.
pub fn spawn_services(store: Arc<dyn WasteStore>, model: Arc<dyn VisionModel>) -> ServiceChannels {
    let (analysis_tx, mut analysis_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (submission_tx, mut submission_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (verification_tx, mut verification_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (user_tx, mut user_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let mut analysis_service = analysis::AnalysisService::new();
    let mut submission_service = submissions::SubmissionService::new();
    let mut verification_service = verification::VerificationService::new();
    let mut user_service = users::UserService::new();

    log::info!("Starting analysis service.");
    tokio::spawn(async move {
        let handler = analysis::AnalysisRequestHandler::new(model);

        analysis_service.run(handler, &mut analysis_rx).await;
    });

    log::info!("Starting submission service.");
    let submission_store = store.clone();
    tokio::spawn(async move {
        submission_service
            .run(
                submissions::SubmissionRequestHandler::new(submission_store),
                &mut submission_rx,
            )
            .await;
    });

    log::info!("Starting verification service.");
    let verification_store = store.clone();
    tokio::spawn(async move {
        verification_service
            .run(
                verification::VerificationRequestHandler::new(verification_store),
                &mut verification_rx,
            )
            .await;
    });

    log::info!("Starting user service.");
    tokio::spawn(async move {
        user_service
            .run(users::UserRequestHandler::new(store), &mut user_rx)
            .await;
    });

    ServiceChannels {
        analysis: analysis_tx,
        submissions: submission_tx,
        verification: verification_tx,
        users: user_tx,
    }
}

pub fn start_session_purge_task(sessions: Arc<SessionRepository>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(15 * 60));

        loop {
            interval.tick().await;

            let purged = sessions.purge_expired();
            if purged > 0 {
                log::info!("Purged {} expired sessions.", purged);
            }
        }
    });
}

pub async fn start_services(
    store: Arc<dyn WasteStore>,
    model: Arc<dyn VisionModel>,
    identity: Arc<dyn IdentityVerifier>,
    settings: Settings,
) -> Result<(), anyhow::Error> {
    let channels = spawn_services(store, model);

    let sessions = Arc::new(SessionRepository::new(chrono::Duration::hours(
        settings.auth.session_ttl_hours,
    )));
    start_session_purge_task(sessions.clone());

    log::info!("Starting HTTP server.");
    let state = http::AppState::new(channels, sessions, identity, Arc::new(settings));
    http::start_http_server(state).await
}
