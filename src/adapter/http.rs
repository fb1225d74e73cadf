//! Reqwest implementation of the HTTP port

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    domain::error::BridgeError,
    port::{config::ConfigStore, http::HttpClient}
};

/// Reqwest implementation of HttpClient.
///
/// Cookie, user agent and timeout come from the config store's in-memory
/// copy at request time, so a reload takes effect on the next call.
pub struct ReqwestClient {
    client: reqwest::Client,
    config: Arc<dyn ConfigStore>
}

impl ReqwestClient {
    pub fn new(config: Arc<dyn ConfigStore>) -> Self {
        Self { client: reqwest::Client::new(), config }
    }

    /// Build the request for `url` from the current configuration
    pub async fn build_get(
        &self,
        url: &str,
        params: &HashMap<String, String>
    ) -> Result<reqwest::Request, BridgeError> {
        let request = self.config.current().await.request;

        let mut builder = self
            .client
            .get(url)
            .query(params)
            .header(reqwest::header::USER_AGENT, request.user_agent)
            .timeout(Duration::from_millis(request.timeout_ms));

        if !request.cookie.is_empty() {
            builder = builder.header(reqwest::header::COOKIE, request.cookie);
        }

        builder.build().map_err(|e| BridgeError::Network(format!("Invalid GET request for {}: {}", url, e)))
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str, params: &HashMap<String, String>) -> Result<Value, BridgeError> {
        let request = self.build_get(url, params).await?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|e| BridgeError::Network(format!("GET request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(BridgeError::Network(format!("GET {} failed with status: {}", url, response.status())));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| BridgeError::Network(format!("Failed to decode response body: {}", e)))
    }
}
