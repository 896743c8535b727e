//! Static service catalogs.
//!
//! Network, plan, disco and cable tables mirror the reseller's identifiers;
//! KYC services carry the lookup endpoint and platform base cost. Input
//! validation helpers for phone numbers and identity numbers live here too.

use crate::wallet::Amount;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Network {
    pub id: u8,
    pub name: &'static str,
    pub code: &'static str,
}

pub const NETWORKS: &[Network] = &[
    Network { id: 1, name: "MTN", code: "mtn" },
    Network { id: 2, name: "GLO", code: "glo" },
    Network { id: 3, name: "9mobile", code: "9mobile" },
    Network { id: 4, name: "Airtel", code: "airtel" },
];

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DataPlan {
    pub id: &'static str,
    /// Reseller-side plan identifier sent with the provider call.
    pub plan_id: u32,
    pub name: &'static str,
    pub size: &'static str,
    pub price_naira: i64,
    pub validity: &'static str,
}

const MTN_PLANS: &[DataPlan] = &[
    DataPlan { id: "mtn-750mb", plan_id: 261, name: "750MB", size: "750MB", price_naira: 250, validity: "7 Days" },
    DataPlan { id: "mtn-1gb", plan_id: 208, name: "1GB", size: "1GB", price_naira: 300, validity: "30 Days" },
    DataPlan { id: "mtn-1.5gb", plan_id: 272, name: "1.5GB", size: "1.5GB", price_naira: 450, validity: "30 Days" },
    DataPlan { id: "mtn-2gb", plan_id: 209, name: "2GB", size: "2GB", price_naira: 600, validity: "30 Days" },
    DataPlan { id: "mtn-3gb", plan_id: 271, name: "3GB", size: "3GB", price_naira: 750, validity: "30 Days" },
    DataPlan { id: "mtn-4.5gb", plan_id: 273, name: "4.5GB", size: "4.5GB", price_naira: 1200, validity: "30 Days" },
    DataPlan { id: "mtn-11gb", plan_id: 284, name: "11GB (7 Days)", size: "11GB", price_naira: 3700, validity: "7 Days" },
];

const GLO_PLANS: &[DataPlan] = &[
    DataPlan { id: "glo-200mb", plan_id: 243, name: "200MB", size: "200MB", price_naira: 100, validity: "30 Days" },
    DataPlan { id: "glo-500mb", plan_id: 244, name: "500MB", size: "500MB", price_naira: 250, validity: "30 Days" },
    DataPlan { id: "glo-1gb", plan_id: 245, name: "1GB", size: "1GB", price_naira: 480, validity: "30 Days" },
    DataPlan { id: "glo-2gb", plan_id: 246, name: "2GB", size: "2GB", price_naira: 950, validity: "30 Days" },
    DataPlan { id: "glo-5gb", plan_id: 248, name: "5GB", size: "5GB", price_naira: 2350, validity: "30 Days" },
    DataPlan { id: "glo-10gb", plan_id: 249, name: "10GB", size: "10GB", price_naira: 4700, validity: "30 Days" },
];

const ETISALAT_PLANS: &[DataPlan] = &[
    DataPlan { id: "9mobile-500mb", plan_id: 231, name: "500MB", size: "500MB", price_naira: 280, validity: "30 Days" },
    DataPlan { id: "9mobile-1gb", plan_id: 234, name: "1GB", size: "1GB", price_naira: 550, validity: "30 Days" },
    DataPlan { id: "9mobile-2gb", plan_id: 232, name: "2GB", size: "2GB", price_naira: 1100, validity: "30 Days" },
    DataPlan { id: "9mobile-5gb", plan_id: 230, name: "5GB", size: "5GB", price_naira: 2650, validity: "30 Days" },
];

const AIRTEL_PLANS: &[DataPlan] = &[
    DataPlan { id: "airtel-300mb", plan_id: 219, name: "300MB", size: "300MB", price_naira: 150, validity: "2 Days" },
    DataPlan { id: "airtel-1gb", plan_id: 214, name: "1GB", size: "1GB", price_naira: 400, validity: "2 Days" },
    DataPlan { id: "airtel-3.5gb", plan_id: 217, name: "3.5GB", size: "3.5GB", price_naira: 1600, validity: "7 Days" },
    DataPlan { id: "airtel-10gb", plan_id: 237, name: "10GB", size: "10GB", price_naira: 3500, validity: "30 Days" },
];

pub fn network(id: u8) -> Option<&'static Network> {
    NETWORKS.iter().find(|n| n.id == id)
}

pub fn data_plans(network_id: u8) -> &'static [DataPlan] {
    match network_id {
        1 => MTN_PLANS,
        2 => GLO_PLANS,
        3 => ETISALAT_PLANS,
        4 => AIRTEL_PLANS,
        _ => &[],
    }
}

pub fn data_plan(network_id: u8, plan_id: &str) -> Option<&'static DataPlan> {
    data_plans(network_id).iter().find(|p| p.id == plan_id)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Disco {
    pub id: u8,
    pub name: &'static str,
    pub code: &'static str,
}

pub const DISCOS: &[Disco] = &[
    Disco { id: 1, name: "Ikeja Electric", code: "ikeja" },
    Disco { id: 2, name: "Eko Electric", code: "eko" },
    Disco { id: 3, name: "Abuja Electric", code: "abuja" },
    Disco { id: 4, name: "Kano Electric", code: "kano" },
    Disco { id: 5, name: "Enugu Electric", code: "enugu" },
    Disco { id: 6, name: "Port Harcourt Electric", code: "portharcourt" },
    Disco { id: 8, name: "Kaduna Electric", code: "kaduna" },
    Disco { id: 9, name: "Jos Electric", code: "jos" },
    Disco { id: 10, name: "Benin Electric", code: "benin" },
    Disco { id: 11, name: "Yola Electric", code: "yola" },
    Disco { id: 12, name: "Ibadan Electric", code: "ibadan" },
];

pub fn disco(id: u8) -> Option<&'static Disco> {
    DISCOS.iter().find(|d| d.id == id)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CableProvider {
    pub id: u8,
    pub name: &'static str,
    pub code: &'static str,
}

pub const CABLE_PROVIDERS: &[CableProvider] = &[
    CableProvider { id: 1, name: "GOtv", code: "gotv" },
    CableProvider { id: 2, name: "DStv", code: "dstv" },
    CableProvider { id: 3, name: "Startimes", code: "startimes" },
];

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CablePlan {
    pub id: &'static str,
    pub plan_id: u32,
    pub name: &'static str,
    pub price_naira: i64,
}

const GOTV_PLANS: &[CablePlan] = &[
    CablePlan { id: "gotv-smallie", plan_id: 34, name: "GOtv Smallie", price_naira: 1900 },
    CablePlan { id: "gotv-jinja", plan_id: 16, name: "GOtv Jinja", price_naira: 3900 },
    CablePlan { id: "gotv-jolli", plan_id: 17, name: "GOtv Jolli", price_naira: 5800 },
    CablePlan { id: "gotv-max", plan_id: 2, name: "GOtv Max", price_naira: 8500 },
];

const DSTV_PLANS: &[CablePlan] = &[
    CablePlan { id: "dstv-padi", plan_id: 20, name: "DStv Padi", price_naira: 4400 },
    CablePlan { id: "dstv-yanga", plan_id: 6, name: "DStv Yanga", price_naira: 6000 },
    CablePlan { id: "dstv-confam", plan_id: 19, name: "DStv Confam", price_naira: 11000 },
    CablePlan { id: "dstv-compact", plan_id: 7, name: "DStv Compact", price_naira: 19000 },
    CablePlan { id: "dstv-premium", plan_id: 9, name: "DStv Premium", price_naira: 44500 },
];

const STARTIMES_PLANS: &[CablePlan] = &[
    CablePlan { id: "star-nova", plan_id: 14, name: "Nova", price_naira: 1900 },
    CablePlan { id: "star-basic", plan_id: 12, name: "Basic", price_naira: 3700 },
    CablePlan { id: "star-classic", plan_id: 11, name: "Classic", price_naira: 5500 },
];

pub fn cable_provider(id: u8) -> Option<&'static CableProvider> {
    CABLE_PROVIDERS.iter().find(|p| p.id == id)
}

pub fn cable_plans(provider_id: u8) -> &'static [CablePlan] {
    match provider_id {
        1 => GOTV_PLANS,
        2 => DSTV_PLANS,
        3 => STARTIMES_PLANS,
        _ => &[],
    }
}

pub fn cable_plan(provider_id: u8, plan_id: &str) -> Option<&'static CablePlan> {
    cable_plans(provider_id).iter().find(|p| p.id == plan_id)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct KycService {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(skip)]
    pub endpoint: &'static str,
    /// Platform cost before the flat KYC profit is added.
    pub base_cost_naira: i64,
}

pub const KYC_SERVICES: &[KycService] = &[
    KycService {
        id: "nin",
        name: "NIN Verification",
        description: "Verify NIN by number",
        endpoint: "/nin-verification",
        base_cost_naira: 150,
    },
    KycService {
        id: "nin-phone",
        name: "NIN by Phone",
        description: "Find NIN by phone number",
        endpoint: "/nin-phone",
        base_cost_naira: 200,
    },
    KycService {
        id: "nin-demography",
        name: "NIN by Demographics",
        description: "Search NIN using name, gender & DOB",
        endpoint: "/nin-demography",
        base_cost_naira: 250,
    },
    KycService {
        id: "bvn",
        name: "BVN Verification",
        description: "Verify BVN by number",
        endpoint: "/bvn-verification",
        base_cost_naira: 100,
    },
    KycService {
        id: "bvn-phone",
        name: "BVN by Phone",
        description: "Find BVN by phone number",
        endpoint: "/bvn-phone",
        base_cost_naira: 150,
    },
];

pub fn kyc_service(id: &str) -> Option<&'static KycService> {
    KYC_SERVICES.iter().find(|s| s.id == id)
}

impl KycService {
    pub fn base_cost(&self) -> Amount {
        Amount::from_naira(self.base_cost_naira)
    }
}

/// Nigerian mobile number: `0`, then `7`/`8`/`9`, then nine more digits.
pub fn valid_phone(phone: &str) -> bool {
    let bytes = phone.as_bytes();
    bytes.len() == 11
        && bytes[0] == b'0'
        && matches!(bytes[1], b'7' | b'8' | b'9')
        && bytes.iter().all(|b| b.is_ascii_digit())
}

/// NIN and BVN are both exactly eleven digits.
pub fn valid_identity_number(value: &str) -> bool {
    value.len() == 11 && value.bytes().all(|b| b.is_ascii_digit())
}

/// Normalize `234…` international prefixes to the local `0…` form.
pub fn normalize_phone(phone: &str) -> String {
    let phone = phone.trim();
    match phone.strip_prefix("234") {
        Some(rest) if rest.len() == 10 => format!("0{}", rest),
        _ => phone.to_string(),
    }
}
