// Native HTTP client implementation using reqwest

use crate::error::CoreError;
use crate::metadata::{HttpClient, MetadataResult};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response};

/// Native HTTP client using reqwest
pub struct NativeHttpClient {
    client: Client,
}

impl NativeHttpClient {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    async fn get(&self, url: &str) -> MetadataResult<Response> {
        debug!("Fetching URL: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CoreError::Http(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::Http(format!("{} returned {}", url, status)));
        }
        Ok(response)
    }
}

impl Default for NativeHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl HttpClient for NativeHttpClient {
    async fn fetch_text(&self, url: &str) -> MetadataResult<String> {
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| CoreError::Http(format!("Failed to read response body: {}", e)))
    }

    async fn fetch_bytes(&self, url: &str) -> MetadataResult<Vec<u8>> {
        let bytes = self
            .get(url)
            .await?
            .bytes()
            .await
            .map_err(|e| CoreError::Http(format!("Failed to read response body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}
