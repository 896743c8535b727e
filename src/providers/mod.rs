//! Third-party provider clients.
//!
//! Each client normalizes its provider's loosely-typed responses into one
//! internal success/failure shape, so the purchase flow never sees raw
//! provider JSON. The gateway traits are the seam the HTTP layer talks
//! through; tests substitute stub gateways.

pub mod kyc;
pub mod monnify;
pub mod vtu;

use crate::wallet::Amount;
use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0} API not configured")]
    NotConfigured(&'static str),
    /// Network error or timeout; delivery is unconfirmed, treated as failure.
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The provider answered and reported failure.
    #[error("{0}")]
    Declined(String),
}

/// Normalized successful provider response.
#[derive(Debug, Clone, Default)]
pub struct ProviderReceipt {
    /// Provider-side transaction identifier, when one was returned.
    pub provider_ref: Option<String>,
    /// Prepaid token / purchased code (electricity).
    pub token: Option<String>,
    pub message: Option<String>,
}

#[async_trait]
pub trait VtuGateway: Send + Sync {
    async fn buy_airtime(
        &self,
        network_id: u8,
        phone: &str,
        amount: Amount,
    ) -> Result<ProviderReceipt, ProviderError>;

    async fn buy_data(
        &self,
        network_id: u8,
        phone: &str,
        plan_id: u32,
    ) -> Result<ProviderReceipt, ProviderError>;

    async fn pay_electricity(
        &self,
        disco_id: u8,
        meter_number: &str,
        amount: Amount,
        postpaid: bool,
    ) -> Result<ProviderReceipt, ProviderError>;

    async fn pay_cable(
        &self,
        provider_id: u8,
        plan_id: u32,
        smartcard_number: &str,
    ) -> Result<ProviderReceipt, ProviderError>;
}

#[async_trait]
pub trait KycGateway: Send + Sync {
    /// Run an identity lookup; returns the provider's data payload.
    async fn lookup(&self, endpoint: &str, body: Value) -> Result<Value, ProviderError>;
}

/// Tolerant view over a provider response. The reseller's API reports
/// success as `Status: "successful"` or `status: "success"`, and spreads
/// references and tokens across several field names.
pub(crate) struct RawReply(pub Value);

impl RawReply {
    pub fn is_success(&self) -> bool {
        self.str_field(&["Status"]).is_some_and(|s| s == "successful")
            || self.str_field(&["status"]).is_some_and(|s| s == "success")
    }

    pub fn message(&self) -> Option<String> {
        self.str_field(&["message", "error"]).map(str::to_string)
    }

    pub fn provider_ref(&self) -> Option<String> {
        for key in ["ident", "id", "requestId"] {
            match self.0.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
        None
    }

    pub fn token(&self) -> Option<String> {
        self.str_field(&["token", "Token", "purchased_code"])
            .map(str::to_string)
    }

    /// Interpret the reply; `token_is_success` accepts a token field as a
    /// success indicator even without a status field (electricity).
    pub fn into_receipt(
        self,
        token_is_success: bool,
        fallback_error: &str,
    ) -> Result<ProviderReceipt, ProviderError> {
        if self.is_success() || (token_is_success && self.token().is_some()) {
            Ok(ProviderReceipt {
                provider_ref: self.provider_ref(),
                token: self.token(),
                message: self.message(),
            })
        } else {
            Err(ProviderError::Declined(
                self.message().unwrap_or_else(|| fallback_error.to_string()),
            ))
        }
    }

    fn str_field(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|k| self.0.get(k).and_then(Value::as_str))
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognizes_success_variants() {
        assert!(RawReply(json!({"Status": "successful"})).is_success());
        assert!(RawReply(json!({"status": "success"})).is_success());
        assert!(!RawReply(json!({"status": "failed"})).is_success());
        assert!(!RawReply(json!({})).is_success());
    }

    #[test]
    fn extracts_reference_and_token_variants() {
        let reply = RawReply(json!({"Status": "successful", "ident": "ABC123", "Token": "1234-5678"}));
        assert_eq!(reply.provider_ref().as_deref(), Some("ABC123"));
        assert_eq!(reply.token().as_deref(), Some("1234-5678"));

        let numeric = RawReply(json!({"id": 4412}));
        assert_eq!(numeric.provider_ref().as_deref(), Some("4412"));

        let request_id = RawReply(json!({"requestId": "r-9"}));
        assert_eq!(request_id.provider_ref().as_deref(), Some("r-9"));
    }

    #[test]
    fn token_counts_as_success_for_bills() {
        let reply = RawReply(json!({"token": "5555-0000"}));
        let receipt = reply.into_receipt(true, "Payment failed").unwrap();
        assert_eq!(receipt.token.as_deref(), Some("5555-0000"));

        let declined = RawReply(json!({"message": "Invalid meter"}))
            .into_receipt(true, "Payment failed")
            .unwrap_err();
        assert!(matches!(declined, ProviderError::Declined(m) if m == "Invalid meter"));
    }

    #[test]
    fn decline_falls_back_to_generic_message() {
        let err = RawReply(json!({"status": "failed"}))
            .into_receipt(false, "Airtime purchase failed")
            .unwrap_err();
        assert!(matches!(err, ProviderError::Declined(m) if m == "Airtime purchase failed"));
    }
}
