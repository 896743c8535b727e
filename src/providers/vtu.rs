//! VTU reseller client.
//!
//! Airtime, data, electricity and cable delivery through the reseller's
//! token-authenticated API. Base amounts go to the provider; the platform
//! markup never leaves the wallet. Bill payments ride slower downstream
//! rails, so they get a longer timeout than airtime and data.

use crate::providers::{ProviderError, ProviderReceipt, RawReply, VtuGateway};
use crate::wallet::Amount;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const TOPUP_TIMEOUT: Duration = Duration::from_secs(60);
const BILL_TIMEOUT: Duration = Duration::from_secs(120);

pub struct VtuClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl VtuClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    async fn post(
        &self,
        path: &str,
        body: Value,
        timeout: Duration,
    ) -> Result<RawReply, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::NotConfigured("VTU"))?;
        debug!(path, "vtu request");
        let response = self
            .client
            .post(format!("{}/{}/", self.base_url, path))
            .header("Authorization", format!("Token {}", api_key))
            .json(&body)
            .timeout(timeout)
            .send()
            .await?;
        let value: Value = response.json().await?;
        debug!(path, %value, "vtu response");
        Ok(RawReply(value))
    }
}

#[async_trait]
impl VtuGateway for VtuClient {
    async fn buy_airtime(
        &self,
        network_id: u8,
        phone: &str,
        amount: Amount,
    ) -> Result<ProviderReceipt, ProviderError> {
        info!(network_id, phone, %amount, "📱 airtime purchase");
        let reply = self
            .post(
                "topup",
                json!({
                    "network": network_id,
                    "amount": amount.kobo() / 100,
                    "mobile_number": phone,
                    "Ported_number": true,
                    "airtime_type": "VTU",
                }),
                TOPUP_TIMEOUT,
            )
            .await?;
        reply.into_receipt(false, "Airtime purchase failed")
    }

    async fn buy_data(
        &self,
        network_id: u8,
        phone: &str,
        plan_id: u32,
    ) -> Result<ProviderReceipt, ProviderError> {
        info!(network_id, phone, plan_id, "📶 data purchase");
        let reply = self
            .post(
                "data",
                json!({
                    "network": network_id,
                    "mobile_number": phone,
                    "plan": plan_id,
                    "Ported_number": true,
                }),
                TOPUP_TIMEOUT,
            )
            .await?;
        reply.into_receipt(false, "Data purchase failed")
    }

    async fn pay_electricity(
        &self,
        disco_id: u8,
        meter_number: &str,
        amount: Amount,
        postpaid: bool,
    ) -> Result<ProviderReceipt, ProviderError> {
        info!(disco_id, meter_number, %amount, postpaid, "⚡ electricity payment");
        let reply = self
            .post(
                "billpayment",
                json!({
                    "disco_name": disco_id,
                    "amount": amount.kobo() / 100,
                    "meter_number": meter_number,
                    "MeterType": if postpaid { 2 } else { 1 },
                }),
                BILL_TIMEOUT,
            )
            .await?;
        // Some bill responses carry only a prepaid token and no status.
        reply.into_receipt(true, "Payment failed. Please check meter number.")
    }

    async fn pay_cable(
        &self,
        provider_id: u8,
        plan_id: u32,
        smartcard_number: &str,
    ) -> Result<ProviderReceipt, ProviderError> {
        info!(provider_id, plan_id, smartcard_number, "📺 cable subscription");
        let reply = self
            .post(
                "cablesub",
                json!({
                    "cablename": provider_id,
                    "cableplan": plan_id,
                    "smart_card_number": smartcard_number,
                }),
                BILL_TIMEOUT,
            )
            .await?;
        reply.into_receipt(false, "Subscription failed. Please check smartcard number.")
    }
}
