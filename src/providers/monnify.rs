//! Payment processor client (Monnify).
//!
//! Issues per-user reserved bank accounts so that any transfer into one is
//! routed back to a platform account through a reference token. The bearer
//! token is cached inside the client; the cache lock is held across the
//! refresh so concurrent callers wait for one in-flight refresh instead of
//! each triggering their own.

use crate::providers::ProviderError;
use crate::wallet::Account;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

const AUTH_TIMEOUT: Duration = Duration::from_secs(30);
const ACCOUNT_TIMEOUT: Duration = Duration::from_secs(30);
// Tokens live one hour; refresh at 55 minutes.
const TOKEN_LIFETIME: Duration = Duration::from_secs(55 * 60);

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// A reserved virtual account issued for one user.
#[derive(Debug, Clone)]
pub struct VirtualAccount {
    pub account_ref: String,
    pub account_number: String,
    pub bank_name: String,
    pub account_name: String,
}

pub struct MonnifyClient {
    client: Client,
    base_url: String,
    api_key: String,
    secret_key: String,
    contract_code: String,
    token_cache: Mutex<Option<CachedToken>>,
}

impl MonnifyClient {
    /// Returns `None` when credentials are absent (funding disabled).
    pub fn from_parts(
        base_url: String,
        api_key: Option<String>,
        secret_key: Option<String>,
        contract_code: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            client: Client::new(),
            base_url,
            api_key: api_key?,
            secret_key: secret_key?,
            contract_code: contract_code?,
            token_cache: Mutex::new(None),
        })
    }

    /// Current access token, refreshing when expired.
    async fn token(&self) -> Result<String, ProviderError> {
        let mut cache = self.token_cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.expires_at {
                return Ok(cached.token.clone());
            }
        }

        let credentials = BASE64.encode(format!("{}:{}", self.api_key, self.secret_key));
        let response = self
            .client
            .post(format!("{}/api/v1/auth/login", self.base_url))
            .header("Authorization", format!("Basic {}", credentials))
            .json(&json!({}))
            .timeout(AUTH_TIMEOUT)
            .send()
            .await?;
        let value: Value = response.json().await?;

        if value.get("requestSuccessful") != Some(&Value::Bool(true)) {
            warn!("monnify auth rejected");
            return Err(ProviderError::Declined(
                "Failed to obtain payment processor token".to_string(),
            ));
        }
        let token = value
            .pointer("/responseBody/accessToken")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ProviderError::Declined("Token missing from auth response".to_string())
            })?
            .to_string();

        info!("✅ monnify access token refreshed");
        *cache = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + TOKEN_LIFETIME,
        });
        Ok(token)
    }

    /// Drop the cached token so the next call re-authenticates.
    pub async fn invalidate_token(&self) {
        *self.token_cache.lock().await = None;
    }

    pub async fn create_virtual_account(
        &self,
        account: &Account,
    ) -> Result<VirtualAccount, ProviderError> {
        let token = self.token().await?;
        let account_ref = format!("TW-{}-{}", account.id, Utc::now().timestamp_millis());
        let account_name = account.name.to_uppercase();

        let response = self
            .client
            .post(format!(
                "{}/api/v2/bank-transfer/reserved-accounts",
                self.base_url
            ))
            .bearer_auth(&token)
            .json(&json!({
                "accountReference": account_ref,
                "accountName": account_name,
                "currencyCode": "NGN",
                "contractCode": self.contract_code,
                "customerEmail": account.email,
                "customerName": account_name,
                "getAllAvailableBanks": false,
                "preferredBanks": ["035"],
            }))
            .timeout(ACCOUNT_TIMEOUT)
            .send()
            .await?;
        let value: Value = response.json().await?;

        if value.get("requestSuccessful") != Some(&Value::Bool(true)) {
            // The cached token may have been revoked early; force a fresh
            // login on the next attempt.
            self.invalidate_token().await;
            let message = value
                .get("responseMessage")
                .and_then(Value::as_str)
                .unwrap_or("Failed to create virtual account")
                .to_string();
            return Err(ProviderError::Declined(message));
        }

        let issued = value
            .pointer("/responseBody/accounts/0")
            .ok_or_else(|| ProviderError::Declined("No account in response".to_string()))?;
        let field = |key: &str| {
            issued
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        info!(account_id = account.id, account_ref, "virtual account created");
        Ok(VirtualAccount {
            account_ref,
            account_number: field("accountNumber"),
            bank_name: field("bankName"),
            account_name: field("accountName"),
        })
    }
}
