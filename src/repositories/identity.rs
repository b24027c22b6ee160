use async_trait::async_trait;

use crate::models::auth::{Identity, IdentityProvider};

mod google;

pub use google::GoogleIdentity;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Turns a provider-issued credential into the identity it asserts.
#[async_trait]
pub trait IdentityVerifier: Send + Sync + 'static {
    async fn verify(
        &self,
        provider: IdentityProvider,
        credential: &str,
    ) -> Result<Identity, IdentityError>;
}

/// Dispatches to the verifier of each supported provider.
pub struct ProviderVerifier {
    google: GoogleIdentity,
}

impl ProviderVerifier {
    pub fn new(google: GoogleIdentity) -> Self {
        Self { google }
    }
}

#[async_trait]
impl IdentityVerifier for ProviderVerifier {
    async fn verify(
        &self,
        provider: IdentityProvider,
        credential: &str,
    ) -> Result<Identity, IdentityError> {
        match provider {
            IdentityProvider::Google => self.google.verify_id_token(credential).await,
        }
    }
}
