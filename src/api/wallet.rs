//! Wallet routes: balance, history, virtual account provisioning.

use crate::api::{ensure_funding_open, ApiError, AppState, AuthedAccount};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

pub async fn balance(
    State(state): State<AppState>,
    AuthedAccount(account): AuthedAccount,
) -> Result<Json<Value>, ApiError> {
    let balance = state.wallet.balance_of(account.id).await?;
    Ok(Json(json!({
        "account_id": account.id,
        "email": account.email,
        "balance": balance,
        "virtual_account": account.virtual_account_number.map(|number| json!({
            "account_number": number,
            "bank_name": account.virtual_account_bank,
        })),
    })))
}

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

pub async fn transactions(
    State(state): State<AppState>,
    AuthedAccount(account): AuthedAccount,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.min(200);
    let entries = state.wallet.entries_for_account(account.id, limit).await?;
    Ok(Json(json!({ "transactions": entries })))
}

/// Provision a reserved bank account for funding, or return the existing
/// one. Provisioning is idempotent per account.
pub async fn virtual_account(
    State(state): State<AppState>,
    AuthedAccount(account): AuthedAccount,
) -> Result<Json<Value>, ApiError> {
    ensure_funding_open(&state).await?;
    if let (Some(number), Some(bank)) = (
        &account.virtual_account_number,
        &account.virtual_account_bank,
    ) {
        return Ok(Json(json!({
            "account_number": number,
            "bank_name": bank,
            "account_name": account.name.to_uppercase(),
        })));
    }

    let monnify = state
        .monnify
        .as_ref()
        .ok_or(ApiError::ServiceUnavailable("Wallet funding not configured"))?;
    let issued = monnify.create_virtual_account(&account).await?;
    state
        .wallet
        .set_virtual_account(
            account.id,
            &issued.account_ref,
            &issued.account_number,
            &issued.bank_name,
        )
        .await?;

    info!(account_id = account.id, "💳 virtual account provisioned");
    Ok(Json(json!({
        "account_number": issued.account_number,
        "bank_name": issued.bank_name,
        "account_name": issued.account_name,
    })))
}
