use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::store::{StoreError, StoreResult};

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Subset of a Google service account key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> StoreResult<Self> {
        serde_json::from_str(raw).map_err(|_| {
            StoreError::ConfigMissing("GOOGLE_SERVICE_ACCOUNT_JSON is not valid JSON".to_string())
        })
    }
}

/// JWT assertion claims for the OAuth 2.0 JWT bearer grant.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

impl AssertionClaims {
    pub fn new(key: &ServiceAccountKey) -> Self {
        let now = Utc::now();
        Self {
            iss: key.client_email.clone(),
            scope: SHEETS_SCOPE.to_string(),
            aud: key.token_uri.clone(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Debug, Clone)]
pub struct CachedToken {
    value: String,
    expires_at: i64,
}

/// Where bearer tokens for the Sheets API come from.
pub enum TokenSource {
    /// Pre-issued token, used as is.
    Static(String),
    /// Service account exchanging signed assertions for short-lived tokens.
    ServiceAccount {
        key: ServiceAccountKey,
        cache: Mutex<Option<CachedToken>>,
    },
}

impl TokenSource {
    pub fn service_account(key: ServiceAccountKey) -> Self {
        TokenSource::ServiceAccount {
            key,
            cache: Mutex::new(None),
        }
    }

    pub async fn bearer(&self, http: &reqwest::Client) -> StoreResult<String> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount { key, cache } => {
                let mut cached = cache.lock().await;
                let now = Utc::now().timestamp();
                if let Some(token) = cached.as_ref() {
                    if token.expires_at - EXPIRY_MARGIN_SECS > now {
                        return Ok(token.value.clone());
                    }
                }

                let fresh = fetch_token(http, key).await?;
                let value = fresh.access_token.clone();
                *cached = Some(CachedToken {
                    value: fresh.access_token,
                    expires_at: now + fresh.expires_in,
                });
                Ok(value)
            }
        }
    }
}

pub fn sign_assertion(key: &ServiceAccountKey) -> StoreResult<String> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| StoreError::ConfigMissing(format!("service account private key: {}", e)))?;
    encode(&Header::new(Algorithm::RS256), &AssertionClaims::new(key), &encoding_key)
        .map_err(|e| StoreError::Sheets(format!("JWT generation error: {}", e)))
}

async fn fetch_token(http: &reqwest::Client, key: &ServiceAccountKey) -> StoreResult<TokenResponse> {
    let assertion = sign_assertion(key)?;
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", JWT_BEARER_GRANT)
        .append_pair("assertion", &assertion)
        .finish();

    debug!("Requesting Sheets access token for {}", key.client_email);
    let response = http
        .post(&key.token_uri)
        .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(StoreError::Sheets(format!("token exchange failed ({}): {}", status, text)));
    }
    Ok(response.json::<TokenResponse>().await?)
}
