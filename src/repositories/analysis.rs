use async_trait::async_trait;

use crate::models::analysis::ImagePayload;

mod gemini;

pub use gemini::GeminiApi;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Quota exceeded: {0}")]
    Quota(String),
    #[error("{0}")]
    Other(String),
}

/// A multimodal model that answers a text prompt about one image with free
/// form text.
#[async_trait]
pub trait VisionModel: Send + Sync + 'static {
    /// False when the credential needed to call the model is missing.
    fn is_configured(&self) -> bool;

    async fn generate(&self, prompt: &str, image: &ImagePayload) -> Result<String, UpstreamError>;
}
