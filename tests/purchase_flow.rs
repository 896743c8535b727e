//! End-to-end purchase flow through the router with a stub VTU gateway.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use tapwallet_backend::api::{create_router, AppState};
use tapwallet_backend::config::SettingsStore;
use tapwallet_backend::providers::kyc::KycClient;
use tapwallet_backend::providers::{ProviderError, ProviderReceipt, VtuGateway};
use tapwallet_backend::purchase::Orchestrator;
use tapwallet_backend::wallet::{Amount, Category, Direction, WalletStore};

/// Stub gateway: counts calls, succeeds or declines on demand.
struct StubVtu {
    calls: AtomicU32,
    decline: Option<String>,
}

impl StubVtu {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            decline: None,
        })
    }

    fn declining(message: &str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            decline: Some(message.to_string()),
        })
    }

    fn reply(&self) -> Result<ProviderReceipt, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.decline {
            Some(message) => Err(ProviderError::Declined(message.clone())),
            None => Ok(ProviderReceipt {
                provider_ref: Some("STUB-1".to_string()),
                token: None,
                message: None,
            }),
        }
    }
}

#[async_trait]
impl VtuGateway for StubVtu {
    async fn buy_airtime(
        &self,
        _network_id: u8,
        _phone: &str,
        _amount: Amount,
    ) -> Result<ProviderReceipt, ProviderError> {
        self.reply()
    }

    async fn buy_data(
        &self,
        _network_id: u8,
        _phone: &str,
        _plan_id: u32,
    ) -> Result<ProviderReceipt, ProviderError> {
        self.reply()
    }

    async fn pay_electricity(
        &self,
        _disco_id: u8,
        _meter_number: &str,
        _amount: Amount,
        _postpaid: bool,
    ) -> Result<ProviderReceipt, ProviderError> {
        self.reply()
    }

    async fn pay_cable(
        &self,
        _provider_id: u8,
        _plan_id: u32,
        _smartcard_number: &str,
    ) -> Result<ProviderReceipt, ProviderError> {
        self.reply()
    }
}

async fn app_with(vtu: Arc<StubVtu>, funded_naira: i64) -> (Router, Arc<WalletStore>, i64) {
    let wallet = Arc::new(WalletStore::open_in_memory().unwrap());
    let settings = Arc::new(SettingsStore::new(wallet.shared_connection()));
    let account = wallet
        .create_account("ada@example.com", "Ada Obi")
        .await
        .unwrap();
    if funded_naira > 0 {
        wallet
            .credit(
                account.id,
                Amount::from_naira(funded_naira),
                Category::Funding,
                "Seed",
                json!({}),
            )
            .await
            .unwrap();
    }
    let state = AppState {
        wallet: wallet.clone(),
        settings,
        orchestrator: Arc::new(Orchestrator::new(wallet.clone())),
        vtu,
        kyc: Arc::new(KycClient::new("http://127.0.0.1:0".to_string(), None)),
        monnify: None,
        admin_key: Some("admin-secret".to_string()),
        webhook_secret: None,
    };
    (create_router(state), wallet, account.id)
}

fn post_json(uri: &str, account_id: i64, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-account-id", account_id.to_string())
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn airtime_purchase_debits_price_plus_markup() {
    let vtu = StubVtu::succeeding();
    let (app, wallet, account_id) = app_with(vtu.clone(), 1000).await;

    let response = app
        .oneshot(post_json(
            "/api/purchase/airtime",
            account_id,
            json!({ "network": 1, "phone": "08012345678", "amount": 500 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    // ₦500 at 2 percent markup is ₦510 off a ₦1000 balance.
    assert_eq!(body["new_balance"], json!(490));
    assert_eq!(vtu.calls.load(Ordering::SeqCst), 1);

    let entries = wallet.entries_for_account(account_id, 10).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].direction, Direction::Debit);
    assert_eq!(entries[0].category, Category::Airtime);
    assert_eq!(entries[0].amount, Amount::from_naira(510));
    assert_eq!(entries[0].profit, Amount::from_naira(10));
    assert_eq!(entries[0].provider_ref, None);
    assert_eq!(entries[0].metadata["provider_ref"], json!("STUB-1"));
}

#[tokio::test]
async fn insufficient_balance_never_calls_the_provider() {
    let vtu = StubVtu::succeeding();
    let (app, wallet, account_id) = app_with(vtu.clone(), 100).await;

    let response = app
        .oneshot(post_json(
            "/api/purchase/airtime",
            account_id,
            json!({ "network": 1, "phone": "08012345678", "amount": 500 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(vtu.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        wallet.balance_of(account_id).await.unwrap(),
        Amount::from_naira(100)
    );
}

#[tokio::test]
async fn provider_decline_leaves_balance_untouched() {
    let vtu = StubVtu::declining("Network busy");
    let (app, wallet, account_id) = app_with(vtu.clone(), 1000).await;

    let response = app
        .oneshot(post_json(
            "/api/purchase/data",
            account_id,
            json!({ "network": 1, "phone": "08012345678", "plan": "mtn-1gb" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], json!("Network busy"));
    assert_eq!(vtu.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        wallet.balance_of(account_id).await.unwrap(),
        Amount::from_naira(1000)
    );
    // Only the seed credit is on the ledger.
    assert_eq!(
        wallet.entries_for_account(account_id, 10).await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn rejects_invalid_inputs_before_any_work() {
    let vtu = StubVtu::succeeding();
    let (app, _wallet, account_id) = app_with(vtu.clone(), 1000).await;

    for (uri, body) in [
        (
            "/api/purchase/airtime",
            json!({ "network": 7, "phone": "08012345678", "amount": 500 }),
        ),
        (
            "/api/purchase/airtime",
            json!({ "network": 1, "phone": "0801234567", "amount": 500 }),
        ),
        (
            "/api/purchase/airtime",
            json!({ "network": 1, "phone": "08012345678", "amount": 10 }),
        ),
        (
            "/api/purchase/data",
            json!({ "network": 1, "phone": "08012345678", "plan": "glo-1gb" }),
        ),
    ] {
        let response = app
            .clone()
            .oneshot(post_json(uri, account_id, body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(vtu.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn oversized_amount_is_rejected_not_a_panic() {
    let vtu = StubVtu::succeeding();
    let (app, wallet, account_id) = app_with(vtu.clone(), 1000).await;

    // Larger than i64::MAX / 100 naira; must fail deserialization cleanly.
    let response = app
        .oneshot(post_json(
            "/api/purchase/airtime",
            account_id,
            json!({ "network": 1, "phone": "08012345678", "amount": 92233720368547759i64 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(vtu.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        wallet.balance_of(account_id).await.unwrap(),
        Amount::from_naira(1000)
    );
}

#[tokio::test]
async fn fractional_naira_airtime_is_rejected() {
    let vtu = StubVtu::succeeding();
    let (app, wallet, account_id) = app_with(vtu.clone(), 1000).await;

    let response = app
        .oneshot(post_json(
            "/api/purchase/airtime",
            account_id,
            json!({ "network": 1, "phone": "08012345678", "amount": 500.5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(vtu.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        wallet.balance_of(account_id).await.unwrap(),
        Amount::from_naira(1000)
    );
}

#[tokio::test]
async fn disabled_payments_block_virtual_account_provisioning() {
    let vtu = StubVtu::succeeding();
    let (app, _wallet, account_id) = app_with(vtu, 0).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/system")
                .header("content-type", "application/json")
                .header("x-admin-key", "admin-secret")
                .body(Body::from(
                    json!({ "payment_enabled": false }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/wallet/virtual-account")
                .header("x-account-id", account_id.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn unknown_account_is_unauthorized() {
    let vtu = StubVtu::succeeding();
    let (app, _wallet, _account_id) = app_with(vtu, 0).await;

    let response = app
        .oneshot(post_json(
            "/api/purchase/airtime",
            9999,
            json!({ "network": 1, "phone": "08012345678", "amount": 500 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn maintenance_mode_turns_purchases_away() {
    let vtu = StubVtu::succeeding();
    let (app, _wallet, account_id) = app_with(vtu.clone(), 1000).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/admin/system")
                .header("content-type", "application/json")
                .header("x-admin-key", "admin-secret")
                .body(Body::from(
                    json!({ "maintenance_mode": true }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/api/purchase/airtime",
            account_id,
            json!({ "network": 1, "phone": "08012345678", "amount": 500 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(vtu.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn admin_adjustment_lands_on_the_ledger() {
    let vtu = StubVtu::succeeding();
    let (app, wallet, account_id) = app_with(vtu, 0).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/admin/accounts/{}/adjust", account_id))
                .header("content-type", "application/json")
                .header("x-admin-key", "admin-secret")
                .body(Body::from(
                    json!({ "direction": "credit", "amount": 250, "reason": "Manual top-up" })
                        .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let entries = wallet.entries_for_account(account_id, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].category, Category::AdminAdjustment);
    assert_eq!(entries[0].amount, Amount::from_naira(250));
    assert_eq!(
        wallet.balance_of(account_id).await.unwrap(),
        Amount::from_naira(250)
    );
}

#[tokio::test]
async fn admin_requires_the_right_key() {
    let vtu = StubVtu::succeeding();
    let (app, _wallet, _account_id) = app_with(vtu, 0).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/stats")
                .header("x-admin-key", "wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
