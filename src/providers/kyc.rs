//! KYC lookup client.

use crate::providers::{KycGateway, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(60);

pub struct KycClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl KycClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl KycGateway for KycClient {
    async fn lookup(&self, endpoint: &str, body: Value) -> Result<Value, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("KYC"))?;
        info!(endpoint, "🔍 kyc lookup");
        let response = self
            .client
            .post(format!("{}{}", self.base_url, endpoint))
            .header("x-api-key", api_key)
            .json(&body)
            .timeout(LOOKUP_TIMEOUT)
            .send()
            .await?;
        let value: Value = response.json().await?;
        debug!(endpoint, "kyc response received");

        match value.get("status").and_then(Value::as_str) {
            Some("success") => {
                // Data may sit under `data` or at the root alongside status
                // fields; strip the envelope either way.
                if let Some(data) = value.get("data") {
                    Ok(data.clone())
                } else {
                    let mut data = value.clone();
                    if let Some(map) = data.as_object_mut() {
                        map.remove("status");
                        map.remove("message");
                        map.remove("reportID");
                    }
                    Ok(data)
                }
            }
            Some("error") => Err(ProviderError::Declined(
                value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Verification failed")
                    .to_string(),
            )),
            _ => Err(ProviderError::Declined(
                "Unexpected API response".to_string(),
            )),
        }
    }
}
