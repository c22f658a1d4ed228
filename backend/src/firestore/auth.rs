use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{ConfigError, Credentials};
use crate::store::StoreError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::hours(1);
const REFRESH_MARGIN: Duration = Duration::seconds(60);

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME.whole_seconds()
}

/// Signs RS256 assertions for the OAuth2 JWT bearer grant.
pub struct ServiceAccountSigner {
    client_email: String,
    key: EncodingKey,
}

impl ServiceAccountSigner {
    /// Parses the PEM key and signs a throwaway assertion with it, so a key
    /// that cannot sign fails here instead of on the first vote.
    pub fn new(credentials: &Credentials) -> Result<Self, ConfigError> {
        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
            .map_err(|e| ConfigError::InvalidKey(e.to_string()))?;

        let signer = Self {
            client_email: credentials.client_email.clone(),
            key,
        };
        signer
            .sign(DEFAULT_TOKEN_URI, OffsetDateTime::now_utc())
            .map_err(|e| ConfigError::InvalidKey(e.to_string()))?;

        Ok(signer)
    }

    pub fn assertion(&self, audience: &str, issued_at: OffsetDateTime) -> Result<String, StoreError> {
        self.sign(audience, issued_at)
            .map_err(|e| StoreError::Unavailable(format!("failed to sign token request: {e}")))
    }

    fn sign(&self, audience: &str, issued_at: OffsetDateTime) -> jsonwebtoken::errors::Result<String> {
        let iat = issued_at.unix_timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: DATASTORE_SCOPE,
            aud: audience,
            iat,
            exp: iat + ASSERTION_LIFETIME.whole_seconds(),
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.key)
    }
}

struct CachedToken {
    value: String,
    expires_at: OffsetDateTime,
}

/// Exchanges signed assertions for bearer tokens and caches them until
/// shortly before they expire.
pub struct AccessTokens {
    signer: ServiceAccountSigner,
    token_uri: String,
    cached: Mutex<Option<CachedToken>>,
}

impl AccessTokens {
    pub fn new(signer: ServiceAccountSigner, token_uri: impl Into<String>) -> Self {
        Self {
            signer,
            token_uri: token_uri.into(),
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        let now = OffsetDateTime::now_utc();

        if let Some(token) = cached.as_ref().filter(|t| t.expires_at - REFRESH_MARGIN > now) {
            return Ok(token.value.clone());
        }

        let fresh = self.fetch(http, now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn fetch(&self, http: &reqwest::Client, now: OffsetDateTime) -> Result<CachedToken, StoreError> {
        let assertion = self.signer.assertion(&self.token_uri, now)?;

        let response = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(format!("token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Unavailable(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(format!("malformed token response: {e}")))?;

        debug!("Obtained store access token valid for {}s", token.expires_in);

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}
