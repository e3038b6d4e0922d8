//! EasyCars wire DTOs
//!
//! Transient request/response shapes for the external API. Nothing in this
//! module is persisted as-is; stock items and lead details are mapped into
//! local entities by the sync orchestrators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which EasyCars environment a dealership's credential targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }

    /// Parse the persisted environment string, defaulting unknown values
    /// to the test environment rather than accidentally hitting production.
    pub fn from_db(value: &str) -> Self {
        match value {
            "production" => Environment::Production,
            _ => Environment::Test,
        }
    }
}

/// Request body for the token endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub account_number: String,
    pub account_secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub environment: String,
}

/// Response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub response_code: i64,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// One vehicle record as the external API returns it.
///
/// Numeric-looking fields arrive loosely typed (formatted price strings,
/// missing years) and are normalized during mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StockItem {
    pub vin: Option<String>,
    pub stock_number: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub price: Option<String>,
    pub odometer: Option<i64>,
    pub description: Option<String>,
    /// Free-text feature list, comma or semicolon separated
    pub features: Option<String>,
    pub images: Vec<String>,
}

/// Response from the advertisement stock endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StocksResponse {
    pub response_code: i64,
    #[serde(default)]
    pub stocks: Vec<StockItem>,
}

/// Outbound lead create/update payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpsertRequest {
    /// Present only on updates, absent on creates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_number: Option<String>,
    pub customer_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_stock_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_description: Option<String>,
    pub finance_interested: bool,
    pub status: i32,
}

/// Response from the lead create/update endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadUpsertResponse {
    pub response_code: i64,
    #[serde(default)]
    pub lead_number: Option<String>,
    #[serde(default)]
    pub customer_no: Option<String>,
}

/// Status-only outbound update payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadStatusRequest {
    pub lead_number: String,
    pub status: i32,
}

/// Full remote lead detail as returned by the detail endpoint.
///
/// Also serializable because the inbound sync mirrors it verbatim into the
/// lead's raw_payload column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDetailResponse {
    pub response_code: i64,
    #[serde(default)]
    pub lead_number: Option<String>,
    #[serde(default)]
    pub customer_no: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub vehicle_description: Option<String>,
    #[serde(default)]
    pub finance_interested: Option<bool>,
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub status: Option<i32>,
}

/// External endpoint paths, relative to the environment base URL.
pub mod paths {
    pub const TOKEN: &str = "/token";
    pub const GET_STOCKS: &str = "/Stock/GetAdvertisementStocks";
    pub const CREATE_LEAD: &str = "/Lead/CreateLead";
    pub const UPDATE_LEAD: &str = "/Lead/UpdateLead";
    pub const UPDATE_LEAD_STATUS: &str = "/Lead/UpdateLeadStatus";
    pub const GET_LEAD_DETAIL: &str = "/Lead/GetLeadDetail";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_item_tolerates_sparse_payloads() {
        let item: StockItem = serde_json::from_str(r#"{"vin":"WAUZZZ4G7DN000001"}"#).unwrap();
        assert_eq!(item.vin.as_deref(), Some("WAUZZZ4G7DN000001"));
        assert!(item.year.is_none());
        assert!(item.images.is_empty());
    }

    #[test]
    fn test_environment_from_db_defaults_to_test() {
        assert_eq!(Environment::from_db("production"), Environment::Production);
        assert_eq!(Environment::from_db("test"), Environment::Test);
        assert_eq!(Environment::from_db("garbage"), Environment::Test);
    }

    #[test]
    fn test_lead_upsert_create_omits_lead_number() {
        let req = LeadUpsertRequest {
            lead_number: None,
            customer_name: "Ada".to_string(),
            email: None,
            phone: None,
            vehicle_stock_number: None,
            vehicle_description: None,
            finance_interested: false,
            status: 10,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("leadNumber"));
        assert!(json.contains("customerName"));
    }
}
