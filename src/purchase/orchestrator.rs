//! Purchase orchestration.
//!
//! Order of operations is deliver-then-debit: the provider call happens
//! first, and the wallet is only debited after delivery is confirmed. A
//! provider failure therefore leaves the wallet untouched. The advisory
//! funds check up front short-circuits obviously unfundable purchases so
//! the provider is never called for them; the debit itself re-checks the
//! balance atomically and remains the only authority on sufficiency.

use crate::config::ServiceKind;
use crate::providers::{ProviderError, ProviderReceipt};
use crate::wallet::{Amount, WalletError, WalletStore};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};

use super::Quote;

#[derive(Debug, thiserror::Error)]
pub enum PurchaseError {
    #[error("Insufficient balance: need {required}, have {available}")]
    InsufficientBalance { required: Amount, available: Amount },
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Delivery succeeded but the settling debit failed. The ledger and the
    /// provider now disagree; this is surfaced for manual reconciliation,
    /// never silently retried.
    #[error("purchase delivered but settlement failed: {source}")]
    Inconsistent {
        provider_ref: Option<String>,
        source: WalletError,
    },
    #[error(transparent)]
    Wallet(WalletError),
}

/// Outcome of a settled purchase.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub reference: String,
    pub new_balance: Amount,
    pub provider_ref: Option<String>,
    pub token: Option<String>,
}

pub struct Orchestrator {
    wallet: Arc<WalletStore>,
}

impl Orchestrator {
    pub fn new(wallet: Arc<WalletStore>) -> Self {
        Self { wallet }
    }

    /// Run one purchase end to end. `provider_call` is only invoked after
    /// the advisory funds check passes.
    pub async fn execute<F, Fut>(
        &self,
        account_id: i64,
        service: ServiceKind,
        quote: Quote,
        description: String,
        metadata: Value,
        provider_call: F,
    ) -> Result<Receipt, PurchaseError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ProviderReceipt, ProviderError>>,
    {
        let total = quote.total();
        let available = self.wallet.balance_of(account_id).await.map_err(PurchaseError::Wallet)?;
        if available < total {
            return Err(PurchaseError::InsufficientBalance {
                required: total,
                available,
            });
        }

        let delivered = provider_call().await?;

        let mut metadata = metadata;
        if let Some(map) = metadata.as_object_mut() {
            if let Some(provider_ref) = &delivered.provider_ref {
                map.insert("provider_ref".into(), Value::String(provider_ref.clone()));
            }
            if let Some(token) = &delivered.token {
                map.insert("token".into(), Value::String(token.clone()));
            }
        }

        let mutation = self
            .wallet
            .debit(
                account_id,
                total,
                service.category(),
                &description,
                metadata,
                quote.markup,
            )
            .await
            .map_err(|source| {
                error!(
                    account_id,
                    service = service.name(),
                    %total,
                    provider_ref = delivered.provider_ref.as_deref().unwrap_or("-"),
                    %source,
                    "🚨 delivered purchase could not be settled"
                );
                PurchaseError::Inconsistent {
                    provider_ref: delivered.provider_ref.clone(),
                    source,
                }
            })?;

        info!(
            account_id,
            service = service.name(),
            reference = %mutation.reference,
            %total,
            "✅ purchase settled"
        );
        Ok(Receipt {
            reference: mutation.reference,
            new_balance: mutation.new_balance,
            provider_ref: delivered.provider_ref,
            token: delivered.token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Category;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    async fn funded_wallet(naira: i64) -> (Arc<WalletStore>, i64) {
        let store = Arc::new(WalletStore::open_in_memory().unwrap());
        let account = store
            .create_account("ada@example.com", "Ada Obi")
            .await
            .unwrap();
        if naira > 0 {
            store
                .credit(
                    account.id,
                    Amount::from_naira(naira),
                    Category::Funding,
                    "Seed",
                    json!({}),
                )
                .await
                .unwrap();
        }
        (store, account.id)
    }

    #[tokio::test]
    async fn successful_purchase_debits_total_and_records_profit() {
        let (store, account_id) = funded_wallet(1000).await;
        let orchestrator = Orchestrator::new(store.clone());
        let quote = Quote::percentage(Amount::from_naira(500), 2);

        let receipt = orchestrator
            .execute(
                account_id,
                ServiceKind::Airtime,
                quote,
                "MTN airtime".into(),
                json!({"network": "MTN"}),
                || async {
                    Ok(ProviderReceipt {
                        provider_ref: Some("VTU-1".into()),
                        token: None,
                        message: None,
                    })
                },
            )
            .await
            .unwrap();

        assert_eq!(receipt.new_balance, Amount::from_naira(490));
        assert_eq!(receipt.provider_ref.as_deref(), Some("VTU-1"));

        let entry = store
            .entry_by_reference(&receipt.reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.profit, Amount::from_naira(10));
        assert_eq!(entry.category, Category::Airtime);
        assert_eq!(entry.metadata["provider_ref"], json!("VTU-1"));
    }

    #[tokio::test]
    async fn insufficient_funds_never_reaches_the_provider() {
        let (store, account_id) = funded_wallet(100).await;
        let orchestrator = Orchestrator::new(store.clone());
        let calls = AtomicU32::new(0);

        let err = orchestrator
            .execute(
                account_id,
                ServiceKind::Airtime,
                Quote::percentage(Amount::from_naira(500), 2),
                "MTN airtime".into(),
                json!({}),
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Ok(ProviderReceipt::default()) }
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PurchaseError::InsufficientBalance { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.balance_of(account_id).await.unwrap(),
            Amount::from_naira(100)
        );
    }

    #[tokio::test]
    async fn provider_decline_leaves_wallet_untouched() {
        let (store, account_id) = funded_wallet(1000).await;
        let orchestrator = Orchestrator::new(store.clone());

        let err = orchestrator
            .execute(
                account_id,
                ServiceKind::Data,
                Quote::percentage(Amount::from_naira(300), 2),
                "GLO data".into(),
                json!({}),
                || async { Err(ProviderError::Declined("Out of stock".into())) },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PurchaseError::Provider(_)));
        assert_eq!(
            store.balance_of(account_id).await.unwrap(),
            Amount::from_naira(1000)
        );
        assert!(store.entries_for_account(account_id, 10).await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn settlement_failure_after_delivery_is_inconsistent() {
        let (store, account_id) = funded_wallet(1000).await;
        let orchestrator = Orchestrator::new(store.clone());

        // Drain the wallet between the funds check and the debit by doing it
        // inside the provider call.
        let drain = store.clone();
        let err = orchestrator
            .execute(
                account_id,
                ServiceKind::Electricity,
                Quote::percentage(Amount::from_naira(800), 0),
                "EKEDC prepaid".into(),
                json!({}),
                || async move {
                    drain
                        .debit(
                            account_id,
                            Amount::from_naira(900),
                            Category::AdminAdjustment,
                            "Drain",
                            json!({}),
                            Amount::ZERO,
                        )
                        .await
                        .unwrap();
                    Ok(ProviderReceipt {
                        provider_ref: Some("BILL-7".into()),
                        token: Some("1234-5678".into()),
                        message: None,
                    })
                },
            )
            .await
            .unwrap_err();

        match err {
            PurchaseError::Inconsistent { provider_ref, .. } => {
                assert_eq!(provider_ref.as_deref(), Some("BILL-7"));
            }
            other => panic!("expected Inconsistent, got {other:?}"),
        }
    }
}
