use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::config::MailConfig;
use crate::error::{AppError, AppResult};

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_SKEW: time::Duration = time::Duration::seconds(60);

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> AppResult<String>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: OffsetDateTime,
}

impl CachedToken {
    fn is_fresh(&self, now: OffsetDateTime) -> bool {
        self.expires_at - now > EXPIRY_SKEW
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// OAuth `refresh_token` grant with an in-memory access token cache.
pub struct OAuthRefreshProvider {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    cache: Mutex<Option<CachedToken>>,
}

impl OAuthRefreshProvider {
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            refresh_token: config.refresh_token.clone(),
            cache: Mutex::new(None),
        })
    }

    async fn refresh(&self) -> AppResult<CachedToken> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
        ];
        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("token refresh failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "token endpoint returned status {}",
                response.status()
            )));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("bad token response: {}", e)))?;

        Ok(CachedToken {
            token: body.access_token,
            expires_at: OffsetDateTime::now_utc() + time::Duration::seconds(body.expires_in),
        })
    }
}

#[async_trait]
impl CredentialProvider for OAuthRefreshProvider {
    #[instrument(skip(self))]
    async fn access_token(&self) -> AppResult<String> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh(OffsetDateTime::now_utc()) {
                return Ok(cached.token.clone());
            }
        }
        debug!("refreshing mail access token");
        let fresh = self.refresh().await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }
}
