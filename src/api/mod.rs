use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, SiftError};

pub mod quote_client;
pub use quote_client::{form_quote_urls_in_batches, QuoteClient};

/// Fixed pause between outbound requests to stay under third-party rate limits
#[derive(Debug, Clone, Copy)]
pub struct ApiRateLimiter {
    delay: Duration,
}

impl ApiRateLimiter {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Retrieves the body behind a URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UrlFetcher {
    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>>;
}

/// `UrlFetcher` backed by reqwest
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("stock-sifter/0.1")
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl UrlFetcher for HttpFetcher {
    async fn fetch_url(&self, url: &str) -> Result<Vec<u8>> {
        let url = url::Url::parse(url)?;
        debug!("GET {}", url);

        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(SiftError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
