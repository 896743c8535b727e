//! HTTP surface.
//!
//! Route handlers stay thin: they validate input, check the operational
//! gates, and hand off to the wallet, the orchestrator or a provider
//! client. All domain errors funnel through [`ApiError`] so every failure
//! leaves as the same JSON shape.

pub mod admin;
pub mod purchases;
pub mod wallet;

use crate::config::{ServiceKind, SettingsStore};
use crate::providers::monnify::MonnifyClient;
use crate::providers::{KycGateway, ProviderError, VtuGateway};
use crate::purchase::{Orchestrator, PurchaseError};
use crate::wallet::{Account, AccountStatus, WalletError, WalletStore};
use crate::webhook;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{async_trait, Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub wallet: Arc<WalletStore>,
    pub settings: Arc<SettingsStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub vtu: Arc<dyn VtuGateway>,
    pub kyc: Arc<dyn KycGateway>,
    pub monnify: Option<Arc<MonnifyClient>>,
    pub admin_key: Option<String>,
    pub webhook_secret: Option<String>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/catalog/networks", get(purchases::networks))
        .route("/api/catalog/data-plans/:network", get(purchases::data_plans))
        .route("/api/catalog/discos", get(purchases::discos))
        .route("/api/catalog/cable-plans/:provider", get(purchases::cable_plans))
        .route("/api/catalog/kyc-services", get(purchases::kyc_services))
        .route("/api/wallet/balance", get(wallet::balance))
        .route("/api/wallet/transactions", get(wallet::transactions))
        .route("/api/wallet/virtual-account", post(wallet::virtual_account))
        .route("/api/purchase/airtime", post(purchases::airtime))
        .route("/api/purchase/data", post(purchases::data))
        .route("/api/purchase/electricity", post(purchases::electricity))
        .route("/api/purchase/cable", post(purchases::cable))
        .route("/api/purchase/kyc", post(purchases::kyc))
        .route("/api/webhook/monnify", post(webhook::monnify))
        .route("/api/admin/accounts", post(admin::create_account))
        .route("/api/admin/accounts/:id", delete(admin::delete_account))
        .route("/api/admin/accounts/:id/adjust", post(admin::adjust_balance))
        .route("/api/admin/accounts/:id/status", post(admin::set_status))
        .route("/api/admin/pricing", get(admin::get_pricing).put(admin::set_pricing))
        .route("/api/admin/system", get(admin::get_system).put(admin::set_system))
        .route("/api/admin/transactions", get(admin::transactions))
        .route("/api/admin/stats", get(admin::stats))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Response {
    match state.wallet.ping().await {
        Ok(()) => Json(json!({ "status": "ok", "database": "up" })).into_response(),
        Err(e) => {
            error!("health probe failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded", "database": "down" })),
            )
                .into_response()
        }
    }
}

// ===== Errors =====

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(&'static str),
    Forbidden(&'static str),
    NotFound(String),
    ServiceUnavailable(&'static str),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.to_string()),
            ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.to_string()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::ServiceUnavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m.to_string()),
            ApiError::BadGateway(m) => (StatusCode::BAD_GATEWAY, m),
            ApiError::Internal(m) => {
                error!("internal error: {}", m);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<WalletError> for ApiError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::AccountNotFound(id) => {
                ApiError::NotFound(format!("account {} not found", id))
            }
            WalletError::InsufficientBalance { .. }
            | WalletError::InvalidAmount
            | WalletError::DuplicateReference(_) => ApiError::BadRequest(e.to_string()),
            WalletError::Storage(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::NotConfigured(_) => {
                ApiError::ServiceUnavailable("Service temporarily unavailable")
            }
            ProviderError::Transport(_) => {
                ApiError::BadGateway("Provider unreachable, please try again".to_string())
            }
            ProviderError::Declined(m) => ApiError::BadRequest(m),
        }
    }
}

impl From<PurchaseError> for ApiError {
    fn from(e: PurchaseError) -> Self {
        match e {
            PurchaseError::InsufficientBalance { required, available } => ApiError::BadRequest(
                format!("Insufficient balance: need {}, have {}", required, available),
            ),
            PurchaseError::Provider(p) => p.into(),
            // Money may have left the platform; never report this as a plain
            // failure the client could blindly retry.
            PurchaseError::Inconsistent { .. } => ApiError::Internal(e.to_string()),
            PurchaseError::Wallet(w) => w.into(),
        }
    }
}

// ===== Authentication =====

/// The calling user's account, resolved from the `x-account-id` header.
pub struct AuthedAccount(pub Account);

#[async_trait]
impl FromRequestParts<AppState> for AuthedAccount {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-account-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or(ApiError::Unauthorized("Missing or invalid x-account-id"))?;
        let account = state
            .wallet
            .account(id)
            .await?
            .ok_or(ApiError::Unauthorized("Unknown account"))?;
        if account.status == AccountStatus::Blocked {
            return Err(ApiError::Forbidden("Account is blocked"));
        }
        Ok(AuthedAccount(account))
    }
}

/// Admin guard: compares the `x-admin-key` header against the configured key.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let expected = state
        .admin_key
        .as_deref()
        .ok_or(ApiError::ServiceUnavailable("Admin API not configured"))?;
    let presented = headers
        .get("x-admin-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented != expected {
        return Err(ApiError::Unauthorized("Invalid admin key"));
    }
    Ok(())
}

/// Operational gate checked before any purchase starts.
pub async fn ensure_service_open(state: &AppState, service: ServiceKind) -> Result<(), ApiError> {
    let status = state.settings.system_status().await;
    if status.maintenance_mode {
        return Err(ApiError::ServiceUnavailable("System under maintenance"));
    }
    if !status.payment_enabled {
        return Err(ApiError::ServiceUnavailable(
            "Payments are temporarily disabled",
        ));
    }
    if !status.service_enabled(service) {
        return Err(ApiError::ServiceUnavailable(
            "This service is temporarily disabled",
        ));
    }
    Ok(())
}

/// Gate for the funding entry point; there is no per-service flag for it.
pub async fn ensure_funding_open(state: &AppState) -> Result<(), ApiError> {
    let status = state.settings.system_status().await;
    if status.maintenance_mode {
        return Err(ApiError::ServiceUnavailable("System under maintenance"));
    }
    if !status.payment_enabled {
        return Err(ApiError::ServiceUnavailable(
            "Payments are temporarily disabled",
        ));
    }
    Ok(())
}
