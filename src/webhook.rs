//! Inbound payment webhook.
//!
//! The processor notifies us when money lands in a reserved account. The
//! raw body is read before parsing so the HMAC-SHA512 signature is computed
//! over exactly the bytes that were sent. Replays and unmatched references
//! are acknowledged with 200 so the processor stops retrying; only a bad
//! signature is rejected.

use crate::api::AppState;
use crate::wallet::{Amount, WalletError};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha512;
use tracing::{info, warn};

type HmacSha512 = Hmac<Sha512>;

const SUCCESSFUL_TRANSACTION: &str = "SUCCESSFUL_TRANSACTION";

pub async fn monnify(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = &state.webhook_secret {
        if !signature_valid(secret, &headers, &body) {
            warn!("webhook rejected: bad signature");
            return (StatusCode::UNAUTHORIZED, "Invalid signature").into_response();
        }
    } else {
        warn!("webhook signature verification disabled: no secret configured");
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid payload").into_response(),
    };

    if payload.get("eventType").and_then(Value::as_str) != Some(SUCCESSFUL_TRANSACTION) {
        return (StatusCode::OK, "Ignored").into_response();
    }

    match process_deposit(&state, &payload).await {
        Ok(message) => (StatusCode::OK, message).into_response(),
        Err(e) => {
            // Acknowledged anyway; a retry of the same notification cannot
            // do better and would just duplicate the work.
            warn!("webhook processing failed: {}", e);
            (StatusCode::OK, "Acknowledged").into_response()
        }
    }
}

fn signature_valid(secret: &str, headers: &HeaderMap, body: &[u8]) -> bool {
    let header = match headers.get("monnify-signature").and_then(|v| v.to_str().ok()) {
        Some(h) => h,
        None => return false,
    };
    let signature = match hex::decode(header) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let mut mac = match HmacSha512::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

async fn process_deposit(state: &AppState, payload: &Value) -> Result<&'static str, WalletError> {
    let event = payload.get("eventData").cloned().unwrap_or(Value::Null);
    let provider_ref = event
        .get("transactionReference")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if provider_ref.is_empty() {
        warn!("deposit notification without a transaction reference");
        return Ok("Acknowledged");
    }

    if state.wallet.deposit_processed(provider_ref).await? {
        info!(provider_ref, "deposit already processed");
        return Ok("Already processed");
    }

    let amount = event
        .get("amountPaid")
        .or_else(|| event.get("amount"))
        .and_then(Amount::from_json);
    let amount = match amount {
        Some(a) if a.is_positive() => a,
        _ => {
            warn!(provider_ref, "deposit notification with unusable amount");
            return Ok("Acknowledged");
        }
    };

    let account_ref = event
        .pointer("/product/reference")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let account = match state.wallet.account_by_virtual_ref(account_ref).await? {
        Some(account) => account,
        None => {
            // Money arrived for a reference we never issued. Needs a human.
            warn!(provider_ref, account_ref, "🚨 deposit for unknown virtual account");
            return Ok("Acknowledged");
        }
    };

    let metadata = json!({
        "payment_reference": event.get("paymentReference"),
        "bank": event.pointer("/destinationAccountInformation/bankName"),
        "paid_on": event.get("paidOn"),
    });
    match state
        .wallet
        .credit_deposit(
            account.id,
            amount,
            "Wallet funding via bank transfer",
            provider_ref,
            metadata,
        )
        .await
    {
        Ok(mutation) => {
            info!(
                account_id = account.id,
                provider_ref,
                amount = %amount,
                new_balance = %mutation.new_balance,
                "💰 wallet funded"
            );
            Ok("Credited")
        }
        // Lost the race against a concurrent delivery of the same event.
        Err(WalletError::DuplicateReference(_)) => Ok("Already processed"),
        Err(e) => Err(e),
    }
}
