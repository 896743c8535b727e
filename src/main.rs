//! TapWallet - Wallet & VTU Backend
//! Mission: Every naira accounted for, every purchase settled exactly once

use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tapwallet_backend::api::{create_router, AppState};
use tapwallet_backend::config::{Config, SettingsStore};
use tapwallet_backend::providers::kyc::KycClient;
use tapwallet_backend::providers::monnify::MonnifyClient;
use tapwallet_backend::providers::vtu::VtuClient;
use tapwallet_backend::purchase::Orchestrator;
use tapwallet_backend::wallet::WalletStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tapwallet=info,tapwallet_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!("🚀 TapWallet backend starting");

    let wallet = Arc::new(
        WalletStore::open(&config.db_path)
            .with_context(|| format!("opening database at {}", config.db_path))?,
    );
    let settings = Arc::new(SettingsStore::new(wallet.shared_connection()));
    let orchestrator = Arc::new(Orchestrator::new(wallet.clone()));

    let vtu = Arc::new(VtuClient::new(
        config.vtu_api_url.clone(),
        config.vtu_api_key.clone(),
    ));
    let kyc = Arc::new(KycClient::new(
        config.kyc_api_url.clone(),
        config.kyc_api_key.clone(),
    ));
    let monnify = MonnifyClient::from_parts(
        config.monnify_base_url.clone(),
        config.monnify_api_key.clone(),
        config.monnify_secret_key.clone(),
        config.monnify_contract_code.clone(),
    )
    .map(Arc::new);

    if monnify.is_none() {
        warn!("⚠️ payment processor not configured; wallet funding disabled");
    }
    if config.vtu_api_key.is_none() {
        warn!("⚠️ VTU API key not configured; purchases will be rejected");
    }
    if config.admin_key.is_none() {
        warn!("⚠️ ADMIN_KEY not set; admin API disabled");
    }

    let state = AppState {
        wallet,
        settings,
        orchestrator,
        vtu,
        kyc,
        monnify,
        admin_key: config.admin_key.clone(),
        webhook_secret: config.monnify_secret_key.clone(),
    };
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("✅ listening on {}", addr);
    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}
