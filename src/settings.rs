use config::{Config, ConfigError, Environment as EnvSource, File};
use serde::Deserialize;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Server {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Storage {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Gemini {
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_url")]
    pub url: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
}

impl Default for Gemini {
    fn default() -> Self {
        Self {
            api_key: None,
            url: default_gemini_url(),
            model: default_gemini_model(),
            timeout_secs: default_gemini_timeout(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Auth {
    pub google_client_id: Option<String>,
    #[serde(default = "default_tokeninfo_url")]
    pub google_tokeninfo_url: String,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_hours: i64,
    #[serde(default)]
    pub admin_ids: Vec<String>,
}

impl Default for Auth {
    fn default() -> Self {
        Self {
            google_client_id: None,
            google_tokeninfo_url: default_tokeninfo_url(),
            session_ttl_hours: default_session_ttl(),
            admin_ids: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub storage: Storage,
    pub postgres: Option<Postgres>,
    #[serde(default)]
    pub gemini: Gemini,
    #[serde(default)]
    pub auth: Auth,
}

impl Settings {
    /// Loads `path` (extension optional, missing file allowed) and overlays
    /// `ECOWASTE_<SECTION>__<KEY>` environment variables.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                EnvSource::with_prefix("ECOWASTE")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.admin_ids")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Settings = config.try_deserialize()?;
        if settings.gemini.api_key.is_none() {
            settings.gemini.api_key = std::env::var("GEMINI_API_KEY").ok();
        }
        settings.gemini.api_key = settings.gemini.api_key.filter(|key| !key.trim().is_empty());

        Ok(settings)
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.auth.admin_ids.iter().any(|id| id == user_id)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_connections() -> u32 {
    5
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_timeout() -> u64 {
    30
}

fn default_tokeninfo_url() -> String {
    "https://oauth2.googleapis.com/tokeninfo".to_string()
}

fn default_session_ttl() -> i64 {
    24 * 30
}
