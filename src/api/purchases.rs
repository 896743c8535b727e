//! Purchase routes.
//!
//! Each handler validates its catalog identifiers and user input, builds a
//! quote from current pricing, then hands the delivery call and the debit
//! to the orchestrator.

use crate::api::{ensure_service_open, ApiError, AppState, AuthedAccount};
use crate::catalog;
use crate::config::ServiceKind;
use crate::providers::ProviderReceipt;
use crate::purchase::{Quote, Receipt};
use crate::wallet::Amount;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

const MIN_AIRTIME: Amount = Amount::from_naira(50);
const MAX_AIRTIME: Amount = Amount::from_naira(50_000);
const MIN_ELECTRICITY: Amount = Amount::from_naira(500);
const MAX_ELECTRICITY: Amount = Amount::from_naira(100_000);

fn receipt_json(receipt: Receipt, message: &str) -> Json<Value> {
    Json(json!({
        "success": true,
        "message": message,
        "reference": receipt.reference,
        "new_balance": receipt.new_balance,
        "provider_ref": receipt.provider_ref,
        "token": receipt.token,
    }))
}

// ===== Catalog listings =====

pub async fn networks() -> Json<Value> {
    Json(json!({ "networks": catalog::NETWORKS }))
}

/// Data plans for a network, priced with the current data markup applied.
pub async fn data_plans(
    State(state): State<AppState>,
    Path(network): Path<u8>,
) -> Result<Json<Value>, ApiError> {
    catalog::network(network).ok_or_else(|| ApiError::BadRequest("Unknown network".to_string()))?;
    let percent = state.settings.pricing().await.markup_percent(ServiceKind::Data);
    let plans: Vec<Value> = catalog::data_plans(network)
        .iter()
        .map(|plan| {
            let quote = Quote::percentage(Amount::from_naira(plan.price_naira), percent);
            json!({
                "id": plan.id,
                "name": plan.name,
                "size": plan.size,
                "validity": plan.validity,
                "price": quote.total(),
            })
        })
        .collect();
    Ok(Json(json!({ "plans": plans })))
}

pub async fn discos() -> Json<Value> {
    Json(json!({ "discos": catalog::DISCOS }))
}

pub async fn cable_plans(
    State(state): State<AppState>,
    Path(provider): Path<u8>,
) -> Result<Json<Value>, ApiError> {
    catalog::cable_provider(provider)
        .ok_or_else(|| ApiError::BadRequest("Unknown cable provider".to_string()))?;
    let percent = state.settings.pricing().await.markup_percent(ServiceKind::Cable);
    let plans: Vec<Value> = catalog::cable_plans(provider)
        .iter()
        .map(|plan| {
            let quote = Quote::percentage(Amount::from_naira(plan.price_naira), percent);
            json!({
                "id": plan.id,
                "name": plan.name,
                "price": quote.total(),
            })
        })
        .collect();
    Ok(Json(json!({ "plans": plans })))
}

/// KYC menu with the user-facing price (base cost plus flat profit).
pub async fn kyc_services(State(state): State<AppState>) -> Json<Value> {
    let profit = state.settings.pricing().await.kyc_profit;
    let services: Vec<Value> = catalog::KYC_SERVICES
        .iter()
        .map(|service| {
            json!({
                "id": service.id,
                "name": service.name,
                "description": service.description,
                "price": service.base_cost() + profit,
            })
        })
        .collect();
    Json(json!({ "services": services }))
}

// ===== Purchases =====

#[derive(Deserialize)]
pub struct AirtimeRequest {
    pub network: u8,
    pub phone: String,
    pub amount: Amount,
}

pub async fn airtime(
    State(state): State<AppState>,
    AuthedAccount(account): AuthedAccount,
    Json(req): Json<AirtimeRequest>,
) -> Result<Json<Value>, ApiError> {
    ensure_service_open(&state, ServiceKind::Airtime).await?;
    let network = catalog::network(req.network)
        .ok_or_else(|| ApiError::BadRequest("Unknown network".to_string()))?;
    let phone = catalog::normalize_phone(&req.phone);
    if !catalog::valid_phone(&phone) {
        return Err(ApiError::BadRequest("Invalid phone number".to_string()));
    }
    if req.amount < MIN_AIRTIME || req.amount > MAX_AIRTIME {
        return Err(ApiError::BadRequest(format!(
            "Amount must be between {} and {}",
            MIN_AIRTIME, MAX_AIRTIME
        )));
    }
    // The reseller deals in whole naira; a kobo fraction would be debited
    // here but never delivered.
    if !req.amount.is_whole_naira() {
        return Err(ApiError::BadRequest(
            "Amount must be a whole number of naira".to_string(),
        ));
    }

    let pricing = state.settings.pricing().await;
    let quote = Quote::percentage(req.amount, pricing.markup_percent(ServiceKind::Airtime));

    let vtu = state.vtu.clone();
    let network_id = network.id;
    let call_phone = phone.clone();
    let base = quote.base;
    let receipt = state
        .orchestrator
        .execute(
            account.id,
            ServiceKind::Airtime,
            quote,
            format!("{} {} airtime to {}", network.name, req.amount, phone),
            json!({ "network": network.name, "phone": phone }),
            move || async move { vtu.buy_airtime(network_id, &call_phone, base).await },
        )
        .await?;
    Ok(receipt_json(receipt, "Airtime purchase successful"))
}

#[derive(Deserialize)]
pub struct DataRequest {
    pub network: u8,
    pub phone: String,
    pub plan: String,
}

pub async fn data(
    State(state): State<AppState>,
    AuthedAccount(account): AuthedAccount,
    Json(req): Json<DataRequest>,
) -> Result<Json<Value>, ApiError> {
    ensure_service_open(&state, ServiceKind::Data).await?;
    let network = catalog::network(req.network)
        .ok_or_else(|| ApiError::BadRequest("Unknown network".to_string()))?;
    let plan = catalog::data_plan(req.network, &req.plan)
        .ok_or_else(|| ApiError::BadRequest("Unknown data plan".to_string()))?;
    let phone = catalog::normalize_phone(&req.phone);
    if !catalog::valid_phone(&phone) {
        return Err(ApiError::BadRequest("Invalid phone number".to_string()));
    }

    let pricing = state.settings.pricing().await;
    let quote = Quote::percentage(
        Amount::from_naira(plan.price_naira),
        pricing.markup_percent(ServiceKind::Data),
    );

    let vtu = state.vtu.clone();
    let network_id = network.id;
    let provider_plan = plan.plan_id;
    let call_phone = phone.clone();
    let receipt = state
        .orchestrator
        .execute(
            account.id,
            ServiceKind::Data,
            quote,
            format!("{} {} data to {}", network.name, plan.name, phone),
            json!({ "network": network.name, "plan": plan.id, "phone": phone }),
            move || async move { vtu.buy_data(network_id, &call_phone, provider_plan).await },
        )
        .await?;
    Ok(receipt_json(receipt, "Data purchase successful"))
}

#[derive(Deserialize)]
pub struct ElectricityRequest {
    pub disco: u8,
    pub meter_number: String,
    pub amount: Amount,
    #[serde(default)]
    pub meter_type: MeterType,
}

#[derive(Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MeterType {
    #[default]
    Prepaid,
    Postpaid,
}

pub async fn electricity(
    State(state): State<AppState>,
    AuthedAccount(account): AuthedAccount,
    Json(req): Json<ElectricityRequest>,
) -> Result<Json<Value>, ApiError> {
    ensure_service_open(&state, ServiceKind::Electricity).await?;
    let disco = catalog::disco(req.disco)
        .ok_or_else(|| ApiError::BadRequest("Unknown electricity provider".to_string()))?;
    let meter = req.meter_number.trim().to_string();
    if meter.len() < 10 || !meter.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::BadRequest("Invalid meter number".to_string()));
    }
    if req.amount < MIN_ELECTRICITY || req.amount > MAX_ELECTRICITY {
        return Err(ApiError::BadRequest(format!(
            "Amount must be between {} and {}",
            MIN_ELECTRICITY, MAX_ELECTRICITY
        )));
    }
    if !req.amount.is_whole_naira() {
        return Err(ApiError::BadRequest(
            "Amount must be a whole number of naira".to_string(),
        ));
    }

    let pricing = state.settings.pricing().await;
    let quote = Quote::percentage(req.amount, pricing.markup_percent(ServiceKind::Electricity));

    let vtu = state.vtu.clone();
    let disco_id = disco.id;
    let call_meter = meter.clone();
    let base = quote.base;
    let postpaid = req.meter_type == MeterType::Postpaid;
    let receipt = state
        .orchestrator
        .execute(
            account.id,
            ServiceKind::Electricity,
            quote,
            format!("{} {} for meter {}", disco.name, req.amount, meter),
            json!({ "disco": disco.name, "meter_number": meter, "postpaid": postpaid }),
            move || async move { vtu.pay_electricity(disco_id, &call_meter, base, postpaid).await },
        )
        .await?;
    Ok(receipt_json(receipt, "Electricity payment successful"))
}

#[derive(Deserialize)]
pub struct CableRequest {
    pub provider: u8,
    pub plan: String,
    pub smartcard: String,
}

pub async fn cable(
    State(state): State<AppState>,
    AuthedAccount(account): AuthedAccount,
    Json(req): Json<CableRequest>,
) -> Result<Json<Value>, ApiError> {
    ensure_service_open(&state, ServiceKind::Cable).await?;
    let provider = catalog::cable_provider(req.provider)
        .ok_or_else(|| ApiError::BadRequest("Unknown cable provider".to_string()))?;
    let plan = catalog::cable_plan(req.provider, &req.plan)
        .ok_or_else(|| ApiError::BadRequest("Unknown cable plan".to_string()))?;
    let smartcard = req.smartcard.trim().to_string();
    if smartcard.len() < 10 || !smartcard.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::BadRequest("Invalid smartcard number".to_string()));
    }

    let pricing = state.settings.pricing().await;
    let quote = Quote::percentage(
        Amount::from_naira(plan.price_naira),
        pricing.markup_percent(ServiceKind::Cable),
    );

    let vtu = state.vtu.clone();
    let provider_id = provider.id;
    let provider_plan = plan.plan_id;
    let call_card = smartcard.clone();
    let receipt = state
        .orchestrator
        .execute(
            account.id,
            ServiceKind::Cable,
            quote,
            format!("{} {} for card {}", provider.name, plan.name, smartcard),
            json!({ "provider": provider.name, "plan": plan.id, "smartcard": smartcard }),
            move || async move { vtu.pay_cable(provider_id, provider_plan, &call_card).await },
        )
        .await?;
    Ok(receipt_json(receipt, "Cable subscription successful"))
}

#[derive(Deserialize)]
pub struct KycRequest {
    pub service: String,
    pub nin: Option<String>,
    pub bvn: Option<String>,
    pub phone: Option<String>,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub gender: Option<String>,
    pub dob: Option<String>,
}

/// Build the provider payload for a KYC lookup, validating the inputs the
/// chosen service requires.
fn kyc_payload(req: &KycRequest) -> Result<Value, ApiError> {
    let identity = |value: &Option<String>, label: &str| -> Result<String, ApiError> {
        let value = value
            .as_deref()
            .map(str::trim)
            .ok_or_else(|| ApiError::BadRequest(format!("{} is required", label)))?;
        if !catalog::valid_identity_number(value) {
            return Err(ApiError::BadRequest(format!("{} must be 11 digits", label)));
        }
        Ok(value.to_string())
    };
    let lookup_phone = |value: &Option<String>| -> Result<String, ApiError> {
        let phone = catalog::normalize_phone(value.as_deref().unwrap_or_default());
        if !catalog::valid_phone(&phone) {
            return Err(ApiError::BadRequest("Invalid phone number".to_string()));
        }
        Ok(phone)
    };

    match req.service.as_str() {
        "nin" => Ok(json!({ "nin": identity(&req.nin, "NIN")? })),
        "nin-phone" => Ok(json!({ "phone": lookup_phone(&req.phone)? })),
        "nin-demography" => {
            let field = |value: &Option<String>, label: &str| -> Result<String, ApiError> {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| ApiError::BadRequest(format!("{} is required", label)))
            };
            Ok(json!({
                "firstname": field(&req.firstname, "firstname")?,
                "lastname": field(&req.lastname, "lastname")?,
                "gender": field(&req.gender, "gender")?,
                "dob": field(&req.dob, "dob")?,
            }))
        }
        "bvn" => Ok(json!({ "bvn": identity(&req.bvn, "BVN")? })),
        "bvn-phone" => Ok(json!({ "phone": lookup_phone(&req.phone)? })),
        _ => Err(ApiError::BadRequest("Unknown KYC service".to_string())),
    }
}

pub async fn kyc(
    State(state): State<AppState>,
    AuthedAccount(account): AuthedAccount,
    Json(req): Json<KycRequest>,
) -> Result<Json<Value>, ApiError> {
    ensure_service_open(&state, ServiceKind::Kyc).await?;
    let service = catalog::kyc_service(&req.service)
        .ok_or_else(|| ApiError::BadRequest("Unknown KYC service".to_string()))?;
    let payload = kyc_payload(&req)?;

    let pricing = state.settings.pricing().await;
    let quote = Quote::flat(service.base_cost(), pricing.kyc_profit);

    let kyc = state.kyc.clone();
    let endpoint = service.endpoint;
    let mut report = None;
    let report_slot = &mut report;
    let receipt = state
        .orchestrator
        .execute(
            account.id,
            ServiceKind::Kyc,
            quote,
            format!("{} lookup", service.name),
            json!({ "service": service.id }),
            move || async move {
                let data = kyc.lookup(endpoint, payload).await?;
                *report_slot = Some(data);
                Ok(ProviderReceipt::default())
            },
        )
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} successful", service.name),
        "reference": receipt.reference,
        "new_balance": receipt.new_balance,
        "data": report,
    })))
}
