//! Process configuration and runtime settings.
//!
//! Environment variables configure the process once at startup. Pricing and
//! system-status settings live in the `settings` table as JSON merged over
//! the typed defaults below, so the system degrades gracefully when a value
//! is missing or the read fails: the last-good pricing is cached and the
//! compiled defaults are the final fallback. The `Default` impls are the one
//! authoritative source of default values.

use crate::wallet::{Amount, Category};
use parking_lot::RwLock;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

/// Process configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: String,
    pub admin_key: Option<String>,
    pub vtu_api_url: String,
    pub vtu_api_key: Option<String>,
    pub kyc_api_url: String,
    pub kyc_api_key: Option<String>,
    pub monnify_base_url: String,
    pub monnify_api_key: Option<String>,
    pub monnify_secret_key: Option<String>,
    pub monnify_contract_code: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            db_path: env::var("DB_PATH").unwrap_or_else(|_| "tapwallet.db".to_string()),
            admin_key: env::var("ADMIN_KEY").ok().filter(|v| !v.is_empty()),
            vtu_api_url: env::var("VTU_API_URL")
                .unwrap_or_else(|_| "https://dancityng.com/api".to_string()),
            vtu_api_key: env::var("VTU_API_KEY").ok().filter(|v| !v.is_empty()),
            kyc_api_url: env::var("KYC_API_URL")
                .unwrap_or_else(|_| "https://checkmyninbvn.com.ng/api".to_string()),
            kyc_api_key: env::var("KYC_API_KEY").ok().filter(|v| !v.is_empty()),
            monnify_base_url: env::var("MONNIFY_BASE_URL")
                .unwrap_or_else(|_| "https://sandbox.monnify.com".to_string()),
            monnify_api_key: env::var("MONNIFY_API_KEY").ok().filter(|v| !v.is_empty()),
            monnify_secret_key: env::var("MONNIFY_SECRET_KEY").ok().filter(|v| !v.is_empty()),
            monnify_contract_code: env::var("MONNIFY_CONTRACT_CODE")
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }
}

/// The service categories a purchase can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Airtime,
    Data,
    Electricity,
    Cable,
    Kyc,
}

impl ServiceKind {
    pub fn name(self) -> &'static str {
        match self {
            ServiceKind::Airtime => "airtime",
            ServiceKind::Data => "data",
            ServiceKind::Electricity => "electricity",
            ServiceKind::Cable => "cable",
            ServiceKind::Kyc => "kyc",
        }
    }

    pub fn category(self) -> Category {
        match self {
            ServiceKind::Airtime => Category::Airtime,
            ServiceKind::Data => Category::Data,
            ServiceKind::Electricity => Category::Electricity,
            ServiceKind::Cable => Category::Cable,
            ServiceKind::Kyc => Category::Kyc,
        }
    }
}

/// Markup configuration. Percentages apply to airtime/data/electricity/cable
/// base prices; `kyc_profit` is a flat addend per lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub airtime_markup: u32,
    pub data_markup: u32,
    pub electricity_markup: u32,
    pub cable_markup: u32,
    pub kyc_profit: Amount,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            airtime_markup: 2,
            data_markup: 2,
            electricity_markup: 0,
            cable_markup: 0,
            kyc_profit: Amount::from_naira(50),
        }
    }
}

impl Pricing {
    pub fn markup_percent(&self, service: ServiceKind) -> u32 {
        match service {
            ServiceKind::Airtime => self.airtime_markup,
            ServiceKind::Data => self.data_markup,
            ServiceKind::Electricity => self.electricity_markup,
            ServiceKind::Cable => self.cable_markup,
            ServiceKind::Kyc => 0,
        }
    }
}

/// Operational flags gating new work. In-flight requests are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemStatus {
    pub maintenance_mode: bool,
    pub payment_enabled: bool,
    pub airtime_enabled: bool,
    pub data_enabled: bool,
    pub electricity_enabled: bool,
    pub cable_enabled: bool,
    pub kyc_enabled: bool,
}

impl Default for SystemStatus {
    fn default() -> Self {
        Self {
            maintenance_mode: false,
            payment_enabled: true,
            airtime_enabled: true,
            data_enabled: true,
            electricity_enabled: true,
            cable_enabled: true,
            kyc_enabled: true,
        }
    }
}

impl SystemStatus {
    pub fn service_enabled(&self, service: ServiceKind) -> bool {
        match service {
            ServiceKind::Airtime => self.airtime_enabled,
            ServiceKind::Data => self.data_enabled,
            ServiceKind::Electricity => self.electricity_enabled,
            ServiceKind::Cable => self.cable_enabled,
            ServiceKind::Kyc => self.kyc_enabled,
        }
    }
}

/// Read/write access to the `settings` table, sharing the wallet database
/// connection.
pub struct SettingsStore {
    conn: Arc<Mutex<Connection>>,
    last_pricing: RwLock<Pricing>,
}

impl SettingsStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            last_pricing: RwLock::new(Pricing::default()),
        }
    }

    /// Current pricing. Falls back to the last successfully read value (and
    /// initially the compiled defaults) if storage is unreachable.
    pub async fn pricing(&self) -> Pricing {
        match self.read_json::<Pricing>("pricing").await {
            Ok(Some(pricing)) => {
                *self.last_pricing.write() = pricing.clone();
                pricing
            }
            Ok(None) => Pricing::default(),
            Err(e) => {
                warn!("pricing read failed, using last-good values: {}", e);
                self.last_pricing.read().clone()
            }
        }
    }

    pub async fn set_pricing(&self, pricing: &Pricing) -> Result<(), rusqlite::Error> {
        self.write_json("pricing", pricing).await?;
        *self.last_pricing.write() = pricing.clone();
        Ok(())
    }

    pub async fn system_status(&self) -> SystemStatus {
        match self.read_json::<SystemStatus>("system").await {
            Ok(Some(status)) => status,
            Ok(None) => SystemStatus::default(),
            Err(e) => {
                warn!("system status read failed, using defaults: {}", e);
                SystemStatus::default()
            }
        }
    }

    pub async fn set_system_status(&self, status: &SystemStatus) -> Result<(), rusqlite::Error> {
        self.write_json("system", status).await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<T>, rusqlite::Error> {
        let conn = self.conn.lock().await;
        let value = conn.query_row(
            "SELECT value FROM settings WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );
        match value {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(parsed) => Ok(Some(parsed)),
                Err(e) => {
                    warn!(key, "malformed settings JSON ignored: {}", e);
                    Ok(None)
                }
            },
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().await;
        let raw = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, raw],
        )?;
        Ok(())
    }
}
