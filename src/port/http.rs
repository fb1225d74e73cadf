use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::error::BridgeError;

/// Port for authenticated outbound HTTP calls
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Send a GET request and decode the JSON body
    async fn get(&self, url: &str, params: &HashMap<String, String>) -> Result<Value, BridgeError>;
}
