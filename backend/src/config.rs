use thiserror::Error;
use tracing::info;

pub const PROJECT_ID_KEY: &str = "FIREBASE_PROJECT_ID";
pub const PRIVATE_KEY_KEY: &str = "FIREBASE_PRIVATE_KEY";
pub const CLIENT_EMAIL_KEY: &str = "FIREBASE_CLIENT_EMAIL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Service account credentials used to authenticate to the vote store.
#[derive(Clone)]
pub struct Credentials {
    pub project_id: String,
    pub private_key: String,
    pub client_email: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("project_id", &self.project_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .finish()
    }
}

impl Credentials {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let credentials = Self {
            project_id: required(PROJECT_ID_KEY)?,
            private_key: normalize_private_key(&required(PRIVATE_KEY_KEY)?),
            client_email: required(CLIENT_EMAIL_KEY)?,
        };

        info!("Loaded store credentials for project {}", credentials.project_id);
        Ok(credentials)
    }
}

/// Hosting dashboards store the PEM on one line with literal `\n` escapes.
pub fn normalize_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}
