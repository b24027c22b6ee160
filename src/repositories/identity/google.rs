use reqwest::StatusCode;
use serde::Deserialize;

use super::IdentityError;
use crate::models::auth::Identity;

#[derive(Deserialize)]
struct TokenInfo {
    aud: Option<String>,
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
}

pub struct GoogleIdentity {
    tokeninfo_url: String,
    client_id: Option<String>,
    client: reqwest::Client,
}

impl GoogleIdentity {
    pub fn new(tokeninfo_url: String, client_id: Option<String>) -> Self {
        Self {
            tokeninfo_url,
            client_id,
            client: reqwest::Client::new(),
        }
    }

    pub async fn verify_id_token(&self, id_token: &str) -> Result<Identity, IdentityError> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        if status.is_server_error() {
            return Err(IdentityError::Unavailable(format!("Google: {}", status)));
        }
        if status != StatusCode::OK {
            return Err(IdentityError::InvalidCredential(format!(
                "Google rejected the token ({})",
                status
            )));
        }

        self.identity_from_tokeninfo(&body)
    }

    fn identity_from_tokeninfo(&self, body: &str) -> Result<Identity, IdentityError> {
        let info: TokenInfo = serde_json::from_str(body)
            .map_err(|e| IdentityError::Unavailable(format!("Google: bad response format: {}", e)))?;

        if let Some(expected) = &self.client_id {
            if info.aud.as_deref() != Some(expected.as_str()) {
                return Err(IdentityError::InvalidCredential(
                    "Token was issued for another client".to_string(),
                ));
            }
        }

        let subject = info
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or_else(|| IdentityError::InvalidCredential("Token has no subject".to_string()))?;

        Ok(Identity {
            subject,
            name: info.name.unwrap_or_default(),
            email: info.email.unwrap_or_default(),
        })
    }
}
