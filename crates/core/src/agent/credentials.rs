//! OAuth access tokens for Google Cloud APIs

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::RelayConfig;
use crate::error::Error;
use crate::Result;

pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Refresh this long before the reported expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Source of bearer tokens for Google APIs
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<String>;
}

/// A token handed in through configuration
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Default service account token from the GCE / Cloud Run metadata server
pub struct MetadataServerToken {
    client: Client,
    url: String,
    cached: RwLock<Option<CachedToken>>,
}

impl MetadataServerToken {
    pub fn new() -> Self {
        Self::with_url(METADATA_TOKEN_URL)
    }

    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .no_proxy()
                .build()
                .unwrap_or_else(|_| Client::new()),
            url: url.into(),
            cached: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken> {
        let resp = self
            .client
            .get(&self.url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| Error::Credentials(format!("Metadata server unreachable: {}", e)))?;

        if !resp.status().is_success() {
            return Err(Error::Credentials(format!(
                "Metadata server returned HTTP {}",
                resp.status()
            )));
        }

        let body: MetadataTokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::Credentials(format!("Invalid token response: {}", e)))?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EXPIRY_MARGIN);
        debug!("Fetched access token valid for {}s", body.expires_in);

        Ok(CachedToken {
            value: body.access_token,
            refresh_at: Instant::now() + lifetime,
        })
    }
}

impl Default for MetadataServerToken {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenSource for MetadataServerToken {
    async fn token(&self) -> Result<String> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.value.clone());
            }
        }

        let mut cached = self.cached.write().await;
        if let Some(current) = cached.as_ref() {
            if Instant::now() < current.refresh_at {
                return Ok(current.value.clone());
            }
        }

        let fresh = self.fetch().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }
}

/// Pick the token source implied by configuration
pub fn token_source(config: &RelayConfig) -> Arc<dyn TokenSource> {
    match &config.google_access_token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => Arc::new(MetadataServerToken::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_token_is_returned_as_is() {
        let source = StaticToken::new("abc");
        assert_eq!(source.token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn metadata_token_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/token")
            .match_header("Metadata-Flavor", "Google")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"ya29.token","expires_in":3599,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let source = MetadataServerToken::with_url(format!("{}/token", server.url()));
        assert_eq!(source.token().await.unwrap(), "ya29.token");
        assert_eq!(source.token().await.unwrap(), "ya29.token");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn metadata_failure_is_a_credentials_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/token")
            .with_status(404)
            .create_async()
            .await;

        let source = MetadataServerToken::with_url(format!("{}/token", server.url()));
        let err = source.token().await.unwrap_err();
        assert!(matches!(err, Error::Credentials(_)));
    }

    #[test]
    fn configured_token_selects_static_source() {
        let config = RelayConfig::from_lookup(|name| {
            (name == "GOOGLE_ACCESS_TOKEN").then(|| "configured".to_string())
        });
        let source = token_source(&config);
        let token = tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(source.token())
            .unwrap();
        assert_eq!(token, "configured");
    }
}
