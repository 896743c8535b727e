//! Wallet storage with SQLite.
//!
//! One shared connection behind an async mutex; the mutex plus SQL
//! transactions serialize every read-check-write sequence on a balance.

use crate::wallet::{
    Account, AccountStatus, Amount, Category, Direction, EntryStatus, LedgerEntry, LedgerStats,
    WalletError,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Durable store for accounts and the append-only ledger.
pub struct WalletStore {
    pub(crate) conn: Arc<Mutex<Connection>>,
}

impl WalletStore {
    /// Open (or create) the database at `db_path` and initialize the schema.
    pub fn open(db_path: &str) -> Result<Self, WalletError> {
        let conn = Connection::open(db_path)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, WalletError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// The settings store shares this connection so all state lives in one
    /// database file.
    pub fn shared_connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// Liveness probe used by the health endpoint.
    pub async fn ping(&self) -> Result<(), WalletError> {
        let conn = self.conn.lock().await;
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    // ===== Accounts =====

    pub async fn create_account(&self, email: &str, name: &str) -> Result<Account, WalletError> {
        let conn = self.conn.lock().await;
        let created_at = Utc::now();
        conn.execute(
            "INSERT INTO accounts (email, name, status, balance_kobo, created_at)
             VALUES (?1, ?2, 'active', 0, ?3)",
            params![email, name, created_at.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        info!(account_id = id, email, "account created");
        Ok(Account {
            id,
            email: email.to_string(),
            name: name.to_string(),
            status: AccountStatus::Active,
            balance: Amount::ZERO,
            virtual_account_ref: None,
            virtual_account_number: None,
            virtual_account_bank: None,
            created_at,
        })
    }

    pub async fn account(&self, id: i64) -> Result<Option<Account>, WalletError> {
        let conn = self.conn.lock().await;
        query_account(&conn, "SELECT * FROM accounts WHERE id = ?1", params![id])
    }

    pub async fn account_by_virtual_ref(
        &self,
        account_ref: &str,
    ) -> Result<Option<Account>, WalletError> {
        let conn = self.conn.lock().await;
        query_account(
            &conn,
            "SELECT * FROM accounts WHERE virtual_account_ref = ?1",
            params![account_ref],
        )
    }

    pub async fn balance_of(&self, id: i64) -> Result<Amount, WalletError> {
        let conn = self.conn.lock().await;
        let result = conn.query_row(
            "SELECT balance_kobo FROM accounts WHERE id = ?1",
            params![id],
            |row| row.get::<_, i64>(0),
        );
        match result {
            Ok(kobo) => Ok(Amount::from_kobo(kobo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(WalletError::AccountNotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn set_account_status(
        &self,
        id: i64,
        status: AccountStatus,
    ) -> Result<(), WalletError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE accounts SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if changed == 0 {
            return Err(WalletError::AccountNotFound(id));
        }
        Ok(())
    }

    pub async fn set_virtual_account(
        &self,
        id: i64,
        account_ref: &str,
        account_number: &str,
        bank_name: &str,
    ) -> Result<(), WalletError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE accounts
             SET virtual_account_ref = ?1, virtual_account_number = ?2, virtual_account_bank = ?3
             WHERE id = ?4",
            params![account_ref, account_number, bank_name, id],
        )?;
        if changed == 0 {
            return Err(WalletError::AccountNotFound(id));
        }
        Ok(())
    }

    /// Full account deletion, cascading to its ledger entries.
    pub async fn delete_account(&self, id: i64) -> Result<(), WalletError> {
        let conn = self.conn.lock().await;
        let changed = conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(WalletError::AccountNotFound(id));
        }
        info!(account_id = id, "account deleted");
        Ok(())
    }

    // ===== Ledger read surface =====

    pub async fn entry_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<LedgerEntry>, WalletError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare("SELECT * FROM ledger_entries WHERE reference = ?1")?;
        let mut rows = stmt.query_map(params![reference], entry_from_row)?;
        match rows.next() {
            Some(entry) => Ok(Some(entry?)),
            None => Ok(None),
        }
    }

    /// Idempotency guard: has a deposit with this external provider
    /// reference already been recorded?
    pub async fn deposit_processed(&self, provider_ref: &str) -> Result<bool, WalletError> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ledger_entries WHERE reference = ?1 OR provider_ref = ?1",
            params![provider_ref],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Per-account history, newest first.
    pub async fn entries_for_account(
        &self,
        account_id: i64,
        limit: u32,
    ) -> Result<Vec<LedgerEntry>, WalletError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT * FROM ledger_entries WHERE account_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let entries = stmt
            .query_map(params![account_id, limit], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Recent entries across all accounts (admin reporting).
    pub async fn recent_entries(&self, limit: u32) -> Result<Vec<LedgerEntry>, WalletError> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT * FROM ledger_entries ORDER BY id DESC LIMIT ?1")?;
        let entries = stmt
            .query_map(params![limit], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub async fn stats(&self) -> Result<LedgerStats, WalletError> {
        let conn = self.conn.lock().await;
        let (credited, debited, profit, entry_count) = conn.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN direction = 'credit' THEN amount_kobo END), 0),
                COALESCE(SUM(CASE WHEN direction = 'debit' THEN amount_kobo END), 0),
                COALESCE(SUM(profit_kobo), 0),
                COUNT(*)
             FROM ledger_entries",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )?;
        let account_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM accounts", [], |row| row.get(0))?;
        Ok(LedgerStats {
            total_credited: Amount::from_kobo(credited),
            total_debited: Amount::from_kobo(debited),
            total_profit: Amount::from_kobo(profit),
            entry_count,
            account_count,
        })
    }
}

fn init_schema(conn: &Connection) -> Result<(), WalletError> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            balance_kobo INTEGER NOT NULL DEFAULT 0 CHECK (balance_kobo >= 0),
            virtual_account_ref TEXT UNIQUE,
            virtual_account_number TEXT,
            virtual_account_bank TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ledger_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            direction TEXT NOT NULL,
            category TEXT NOT NULL,
            amount_kobo INTEGER NOT NULL,
            profit_kobo INTEGER NOT NULL DEFAULT 0,
            balance_before_kobo INTEGER NOT NULL,
            balance_after_kobo INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'completed',
            reference TEXT UNIQUE NOT NULL,
            description TEXT NOT NULL,
            metadata TEXT NOT NULL DEFAULT '{}',
            provider_ref TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_ledger_account
            ON ledger_entries(account_id, id DESC);
        CREATE INDEX IF NOT EXISTS idx_ledger_provider_ref
            ON ledger_entries(provider_ref);

        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}

// ===== Internal write path (used by the mutator inside its transaction) =====

pub(crate) struct NewEntry<'a> {
    pub account_id: i64,
    pub direction: Direction,
    pub category: Category,
    pub amount: Amount,
    pub profit: Amount,
    pub balance_before: Amount,
    pub balance_after: Amount,
    pub status: EntryStatus,
    pub reference: &'a str,
    pub description: &'a str,
    pub metadata: &'a serde_json::Value,
    pub provider_ref: Option<&'a str>,
}

pub(crate) fn insert_entry(
    tx: &rusqlite::Transaction<'_>,
    entry: &NewEntry<'_>,
) -> Result<(), WalletError> {
    let result = tx.execute(
        "INSERT INTO ledger_entries
            (account_id, direction, category, amount_kobo, profit_kobo,
             balance_before_kobo, balance_after_kobo, status, reference,
             description, metadata, provider_ref, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            entry.account_id,
            entry.direction.as_str(),
            entry.category.as_str(),
            entry.amount.kobo(),
            entry.profit.kobo(),
            entry.balance_before.kobo(),
            entry.balance_after.kobo(),
            entry.status.as_str(),
            entry.reference,
            entry.description,
            entry.metadata.to_string(),
            entry.provider_ref,
            Utc::now().to_rfc3339(),
        ],
    );
    match result {
        Ok(_) => Ok(()),
        Err(e) => Err(map_insert_error(e, entry.reference)),
    }
}

fn map_insert_error(e: rusqlite::Error, reference: &str) -> WalletError {
    if let rusqlite::Error::SqliteFailure(code, Some(msg)) = &e {
        if code.code == rusqlite::ErrorCode::ConstraintViolation
            && msg.contains("ledger_entries.reference")
        {
            return WalletError::DuplicateReference(reference.to_string());
        }
    }
    WalletError::Storage(e)
}

fn query_account(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Option<Account>, WalletError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, account_from_row)?;
    match rows.next() {
        Some(account) => Ok(Some(account?)),
        None => Ok(None),
    }
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let status: String = row.get("status")?;
    let created_at: String = row.get("created_at")?;
    Ok(Account {
        id: row.get("id")?,
        email: row.get("email")?,
        name: row.get("name")?,
        status: AccountStatus::from_str(&status),
        balance: Amount::from_kobo(row.get("balance_kobo")?),
        virtual_account_ref: row.get("virtual_account_ref")?,
        virtual_account_number: row.get("virtual_account_number")?,
        virtual_account_bank: row.get("virtual_account_bank")?,
        created_at: parse_timestamp(&created_at),
    })
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let direction: String = row.get("direction")?;
    let category: String = row.get("category")?;
    let status: String = row.get("status")?;
    let metadata: String = row.get("metadata")?;
    let created_at: String = row.get("created_at")?;
    Ok(LedgerEntry {
        id: row.get("id")?,
        account_id: row.get("account_id")?,
        direction: Direction::from_str(&direction),
        category: Category::from_str(&category),
        amount: Amount::from_kobo(row.get("amount_kobo")?),
        profit: Amount::from_kobo(row.get("profit_kobo")?),
        balance_before: Amount::from_kobo(row.get("balance_before_kobo")?),
        balance_after: Amount::from_kobo(row.get("balance_after_kobo")?),
        status: EntryStatus::from_str(&status),
        reference: row.get("reference")?,
        description: row.get("description")?,
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
        provider_ref: row.get("provider_ref")?,
        created_at: parse_timestamp(&created_at),
    })
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_fetch_account() {
        let store = WalletStore::open_in_memory().unwrap();
        let account = store.create_account("ada@example.com", "Ada O").await.unwrap();
        assert_eq!(account.balance, Amount::ZERO);
        assert_eq!(account.status, AccountStatus::Active);

        let fetched = store.account(account.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "ada@example.com");
        assert!(store.account(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn resolves_account_by_virtual_reference() {
        let store = WalletStore::open_in_memory().unwrap();
        let account = store.create_account("b@example.com", "B").await.unwrap();
        store
            .set_virtual_account(account.id, "TW-1-123", "0012345678", "Wema Bank")
            .await
            .unwrap();

        let found = store.account_by_virtual_ref("TW-1-123").await.unwrap().unwrap();
        assert_eq!(found.id, account.id);
        assert!(store.account_by_virtual_ref("TW-9-999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn balance_of_missing_account_is_not_found() {
        let store = WalletStore::open_in_memory().unwrap();
        match store.balance_of(42).await {
            Err(WalletError::AccountNotFound(42)) => {}
            other => panic!("expected AccountNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn delete_cascades_to_ledger() {
        let store = WalletStore::open_in_memory().unwrap();
        let account = store.create_account("c@example.com", "C").await.unwrap();
        store
            .credit(
                account.id,
                Amount::from_naira(100),
                Category::Funding,
                "seed",
                serde_json::json!({}),
            )
            .await
            .unwrap();
        assert_eq!(store.entries_for_account(account.id, 10).await.unwrap().len(), 1);

        store.delete_account(account.id).await.unwrap();
        assert!(store.account(account.id).await.unwrap().is_none());
        assert_eq!(store.entries_for_account(account.id, 10).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.db");
        let path = path.to_str().unwrap();

        let account_id = {
            let store = WalletStore::open(path).unwrap();
            let account = store.create_account("d@example.com", "D").await.unwrap();
            store
                .credit(
                    account.id,
                    Amount::from_naira(300),
                    Category::Funding,
                    "seed",
                    serde_json::json!({}),
                )
                .await
                .unwrap();
            account.id
        };

        let reopened = WalletStore::open(path).unwrap();
        reopened.ping().await.unwrap();
        assert_eq!(
            reopened.balance_of(account_id).await.unwrap(),
            Amount::from_naira(300)
        );
        assert_eq!(
            reopened.entries_for_account(account_id, 10).await.unwrap().len(),
            1
        );
    }
}
