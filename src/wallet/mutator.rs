//! Balance mutation primitives.
//!
//! The single choke-point for changing an account balance. Each mutation
//! runs in one SQL transaction spanning the balance read, the sufficiency
//! check, the balance write, and the ledger append; the connection mutex
//! serializes concurrent mutations so a read-then-write can never lose an
//! update. On any failure the transaction rolls back and no ledger entry is
//! created.

use crate::wallet::store::{insert_entry, NewEntry};
use crate::wallet::{
    gen_reference, Amount, Category, Direction, EntryStatus, Mutation, WalletError, WalletStore,
};
use rusqlite::params;
use tracing::info;

impl WalletStore {
    /// Credit an account. Fails only if the account does not exist, the
    /// amount is not positive, or storage itself fails.
    pub async fn credit(
        &self,
        account_id: i64,
        amount: Amount,
        category: Category,
        description: &str,
        metadata: serde_json::Value,
    ) -> Result<Mutation, WalletError> {
        self.apply(
            account_id,
            Direction::Credit,
            amount,
            category,
            description,
            metadata,
            Amount::ZERO,
            gen_reference("CR"),
            None,
        )
        .await
    }

    /// Credit a webhook-originated deposit. The reference is derived
    /// deterministically from the provider's transaction reference, so a
    /// concurrent duplicate delivery is rejected by the UNIQUE constraint
    /// (`DuplicateReference`) even if both pass the idempotency check.
    pub async fn credit_deposit(
        &self,
        account_id: i64,
        amount: Amount,
        description: &str,
        provider_ref: &str,
        metadata: serde_json::Value,
    ) -> Result<Mutation, WalletError> {
        self.apply(
            account_id,
            Direction::Credit,
            amount,
            Category::Funding,
            description,
            metadata,
            Amount::ZERO,
            format!("FND-{}", provider_ref),
            Some(provider_ref),
        )
        .await
    }

    /// Debit an account. The authoritative sufficiency check happens here,
    /// inside the transaction, at the moment of writing; `profit` records
    /// the markup portion of the amount on the ledger entry.
    pub async fn debit(
        &self,
        account_id: i64,
        amount: Amount,
        category: Category,
        description: &str,
        metadata: serde_json::Value,
        profit: Amount,
    ) -> Result<Mutation, WalletError> {
        self.apply(
            account_id,
            Direction::Debit,
            amount,
            category,
            description,
            metadata,
            profit,
            gen_reference("TX"),
            None,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply(
        &self,
        account_id: i64,
        direction: Direction,
        amount: Amount,
        category: Category,
        description: &str,
        metadata: serde_json::Value,
        profit: Amount,
        reference: String,
        provider_ref: Option<&str>,
    ) -> Result<Mutation, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::InvalidAmount);
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let balance = tx.query_row(
            "SELECT balance_kobo FROM accounts WHERE id = ?1",
            params![account_id],
            |row| row.get::<_, i64>(0),
        );
        let before = match balance {
            Ok(kobo) => Amount::from_kobo(kobo),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(WalletError::AccountNotFound(account_id));
            }
            Err(e) => return Err(e.into()),
        };

        let after = match direction {
            Direction::Credit => before
                .checked_add(amount)
                .ok_or(WalletError::InvalidAmount)?,
            Direction::Debit => {
                if before < amount {
                    // Dropping the transaction rolls it back; no partial
                    // state, no ledger entry.
                    return Err(WalletError::InsufficientBalance {
                        required: amount,
                        available: before,
                    });
                }
                before - amount
            }
        };

        tx.execute(
            "UPDATE accounts SET balance_kobo = ?1 WHERE id = ?2",
            params![after.kobo(), account_id],
        )?;
        insert_entry(
            &tx,
            &NewEntry {
                account_id,
                direction,
                category,
                amount,
                profit,
                balance_before: before,
                balance_after: after,
                status: EntryStatus::Completed,
                reference: &reference,
                description,
                metadata: &metadata,
                provider_ref,
            },
        )?;
        tx.commit()?;

        info!(
            account_id,
            direction = direction.as_str(),
            category = %category,
            amount = %amount,
            new_balance = %after,
            reference,
            "wallet {}", if direction == Direction::Credit { "credited" } else { "debited" }
        );
        Ok(Mutation {
            reference,
            new_balance: after,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::wallet::{Amount, Category, Direction, WalletError, WalletStore};
    use serde_json::json;
    use std::sync::Arc;

    async fn seeded_store(balance_naira: i64) -> (Arc<WalletStore>, i64) {
        let store = Arc::new(WalletStore::open_in_memory().unwrap());
        let account = store.create_account("t@example.com", "T").await.unwrap();
        if balance_naira > 0 {
            store
                .credit(
                    account.id,
                    Amount::from_naira(balance_naira),
                    Category::Funding,
                    "seed",
                    json!({}),
                )
                .await
                .unwrap();
        }
        (store, account.id)
    }

    #[tokio::test]
    async fn credit_then_debit_updates_balance_and_ledger() {
        let (store, id) = seeded_store(1000).await;
        let debit = store
            .debit(
                id,
                Amount::from_naira(510),
                Category::Airtime,
                "MTN ₦500 to 08011111111",
                json!({"phone": "08011111111"}),
                Amount::from_naira(10),
            )
            .await
            .unwrap();
        assert_eq!(debit.new_balance, Amount::from_naira(490));
        assert!(debit.reference.starts_with("TX"));

        let entries = store.entries_for_account(id, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        // Newest first.
        assert_eq!(entries[0].direction, Direction::Debit);
        assert_eq!(entries[0].category, Category::Airtime);
        assert_eq!(entries[0].profit, Amount::from_naira(10));
        assert_eq!(entries[0].balance_before, Amount::from_naira(1000));
        assert_eq!(entries[0].balance_after, Amount::from_naira(490));
    }

    #[tokio::test]
    async fn debit_shortfall_leaves_no_trace() {
        let (store, id) = seeded_store(100).await;
        let result = store
            .debit(
                id,
                Amount::from_naira(200),
                Category::Data,
                "too much",
                json!({}),
                Amount::ZERO,
            )
            .await;
        match result {
            Err(WalletError::InsufficientBalance { required, available }) => {
                assert_eq!(required, Amount::from_naira(200));
                assert_eq!(available, Amount::from_naira(100));
            }
            other => panic!("expected InsufficientBalance, got {:?}", other),
        }
        assert_eq!(store.balance_of(id).await.unwrap(), Amount::from_naira(100));
        assert_eq!(store.entries_for_account(id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejects_non_positive_amounts() {
        let (store, id) = seeded_store(100).await;
        for amount in [Amount::ZERO, Amount::from_naira(-5)] {
            match store
                .credit(id, amount, Category::Funding, "bad", json!({}))
                .await
            {
                Err(WalletError::InvalidAmount) => {}
                other => panic!("expected InvalidAmount, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn credit_unknown_account_fails() {
        let store = WalletStore::open_in_memory().unwrap();
        match store
            .credit(77, Amount::from_naira(10), Category::Funding, "x", json!({}))
            .await
        {
            Err(WalletError::AccountNotFound(77)) => {}
            other => panic!("expected AccountNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn deposit_reference_is_deterministic_and_unique() {
        let (store, id) = seeded_store(0).await;
        let first = store
            .credit_deposit(id, Amount::from_naira(1000), "Bank Transfer", "MNFY|001", json!({}))
            .await
            .unwrap();
        assert_eq!(first.reference, "FND-MNFY|001");

        match store
            .credit_deposit(id, Amount::from_naira(1000), "Bank Transfer", "MNFY|001", json!({}))
            .await
        {
            Err(WalletError::DuplicateReference(r)) => assert_eq!(r, "FND-MNFY|001"),
            other => panic!("expected DuplicateReference, got {:?}", other),
        }
        // Exactly one credit happened.
        assert_eq!(store.balance_of(id).await.unwrap(), Amount::from_naira(1000));
        assert!(store.deposit_processed("MNFY|001").await.unwrap());
        assert!(!store.deposit_processed("MNFY|002").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_debits_never_both_succeed() {
        let (store, id) = seeded_store(100).await;

        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .debit(
                        id,
                        Amount::from_naira(100),
                        Category::Airtime,
                        "race",
                        json!({}),
                        Amount::ZERO,
                    )
                    .await
            }));
        }

        let mut successes = 0;
        let mut shortfalls = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(WalletError::InsufficientBalance { .. }) => shortfalls += 1,
                Err(e) => panic!("unexpected error: {:?}", e),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(shortfalls, 1);
        assert_eq!(store.balance_of(id).await.unwrap(), Amount::ZERO);
    }

    #[tokio::test]
    async fn ledger_replays_to_current_balance() {
        let (store, id) = seeded_store(0).await;
        store
            .credit(id, Amount::from_naira(2500), Category::Funding, "fund", json!({}))
            .await
            .unwrap();
        store
            .debit(id, Amount::from_naira(560), Category::Data, "data", json!({}), Amount::from_naira(11))
            .await
            .unwrap();
        store
            .credit(id, Amount::from_naira(60), Category::Refund, "refund", json!({}))
            .await
            .unwrap();

        let mut entries = store.entries_for_account(id, 50).await.unwrap();
        entries.reverse(); // oldest first

        let mut replayed = Amount::ZERO;
        for entry in &entries {
            assert_eq!(entry.balance_before, replayed);
            replayed = match entry.direction {
                Direction::Credit => replayed + entry.amount,
                Direction::Debit => replayed - entry.amount,
            };
            assert_eq!(entry.balance_after, replayed);
        }
        assert_eq!(replayed, store.balance_of(id).await.unwrap());
    }
}
