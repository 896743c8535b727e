//! Admin routes, guarded by the `x-admin-key` header.
//!
//! Balance adjustments go through the same mutator as every other mutation,
//! so manual corrections still land on the ledger.

use crate::api::{require_admin, ApiError, AppState};
use crate::config::{Pricing, SystemStatus};
use crate::wallet::{AccountStatus, Amount, Category, Direction};
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Deserialize)]
pub struct CreateAccountRequest {
    pub email: String,
    pub name: String,
}

pub async fn create_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateAccountRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email".to_string()));
    }
    if name.is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }
    let account = state.wallet.create_account(&email, &name).await?;
    Ok(Json(json!({ "account": account })))
}

pub async fn delete_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    state.wallet.delete_account(id).await?;
    Ok(Json(json!({ "deleted": id })))
}

#[derive(Deserialize)]
pub struct AdjustRequest {
    pub direction: Direction,
    pub amount: Amount,
    pub reason: Option<String>,
}

pub async fn adjust_balance(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<AdjustRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let reason = req
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "Admin adjustment".to_string());
    let metadata = json!({ "adjusted_by": "admin" });

    let mutation = match req.direction {
        Direction::Credit => {
            state
                .wallet
                .credit(id, req.amount, Category::AdminAdjustment, &reason, metadata)
                .await?
        }
        Direction::Debit => {
            state
                .wallet
                .debit(
                    id,
                    req.amount,
                    Category::AdminAdjustment,
                    &reason,
                    metadata,
                    Amount::ZERO,
                )
                .await?
        }
    };
    info!(account_id = id, reference = %mutation.reference, "🛠️ admin adjustment applied");
    Ok(Json(json!({
        "reference": mutation.reference,
        "new_balance": mutation.new_balance,
    })))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: AccountStatus,
}

pub async fn set_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    state.wallet.set_account_status(id, req.status).await?;
    Ok(Json(json!({ "account_id": id, "status": req.status })))
}

pub async fn get_pricing(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Pricing>, ApiError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.settings.pricing().await))
}

pub async fn set_pricing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(pricing): Json<Pricing>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    state
        .settings
        .set_pricing(&pricing)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!("pricing updated");
    Ok(Json(json!({ "updated": true })))
}

pub async fn get_system(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SystemStatus>, ApiError> {
    require_admin(&state, &headers)?;
    Ok(Json(state.settings.system_status().await))
}

pub async fn set_system(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(status): Json<SystemStatus>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    state
        .settings
        .set_system_status(&status)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    info!(maintenance = status.maintenance_mode, "system status updated");
    Ok(Json(json!({ "updated": true })))
}

#[derive(Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    100
}

pub async fn transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let entries = state.wallet.recent_entries(query.limit.min(500)).await?;
    Ok(Json(json!({ "transactions": entries })))
}

pub async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    require_admin(&state, &headers)?;
    let stats = state.wallet.stats().await?;
    Ok(Json(json!({ "stats": stats })))
}
