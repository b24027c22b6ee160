use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::users::User;

/// Identity providers a user can sign in with.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProvider {
    Google,
}

impl IdentityProvider {
    pub const ALL: [IdentityProvider; 1] = [IdentityProvider::Google];

    pub fn id(&self) -> &'static str {
        match self {
            IdentityProvider::Google => "google",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            IdentityProvider::Google => "Google",
        }
    }
}

impl FromStr for IdentityProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdentityProvider::ALL
            .into_iter()
            .find(|provider| provider.id() == s)
            .ok_or_else(|| format!("Unsupported identity provider: {}", s))
    }
}

impl fmt::Display for IdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ProviderInfo {
    pub id: &'static str,
    pub name: &'static str,
}

impl From<IdentityProvider> for ProviderInfo {
    fn from(provider: IdentityProvider) -> Self {
        ProviderInfo {
            id: provider.id(),
            name: provider.display_name(),
        }
    }
}

/// Identity asserted by a provider for a verified credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub name: String,
    pub email: String,
}

/// The authenticated caller attached to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SignInForm {
    pub provider: Option<String>,
    pub credential: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}
