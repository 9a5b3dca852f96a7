//! Default content loader: HTTP(S) sources via reqwest, everything else as a
//! local file path.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::traits::ContentLoader;
use crate::config::defaults::{DEFAULT_SOURCE_FETCH_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use crate::errors::{AppResult, SourceError, SourceResult};
use crate::utils::url::UrlUtils;

pub struct SourceLoader {
    client: Client,
}

impl SourceLoader {
    /// Create a loader with the default fetch timeout
    pub fn new() -> AppResult<Self> {
        Self::with_timeout(Duration::from_secs(DEFAULT_SOURCE_FETCH_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_remote(&self, url: &str) -> SourceResult<String> {
        let safe_url = UrlUtils::obfuscate_credentials(url);
        debug!("Fetching playlist from {}", safe_url);

        let response = self.client.get(url).send().await.map_err(|e| {
            SourceError::unreachable(&safe_url, UrlUtils::obfuscate_credentials(&e.to_string()))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::http(status.as_u16(), safe_url));
        }

        let content = response.text().await.map_err(|e| {
            SourceError::unreachable(&safe_url, UrlUtils::obfuscate_credentials(&e.to_string()))
        })?;
        debug!("Fetched {} bytes from {}", content.len(), safe_url);
        Ok(content)
    }

    async fn read_local(&self, path: &str) -> SourceResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::read_failed(path, e.to_string()))
    }
}

#[async_trait]
impl ContentLoader for SourceLoader {
    async fn load(&self, source: &str) -> SourceResult<String> {
        let source = source.trim();
        if UrlUtils::is_http_url(source) {
            self.fetch_remote(source).await
        } else {
            self.read_local(source).await
        }
    }
}
