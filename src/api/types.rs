//! API request and response types

use crate::db::Customer;
use serde::{Deserialize, Serialize};

/// Gateway callback for one keypress
#[derive(Debug, Deserialize)]
pub struct UssdRequest {
    #[serde(rename = "USSD_STRING", default)]
    pub ussd_string: String,
    #[serde(rename = "SESSION_ID")]
    pub session_id: String,
    #[serde(rename = "MSISDN")]
    pub msisdn: String,
    #[serde(rename = "SERVICE_CODE")]
    pub service_code: String,
}

/// Response for customer creation
#[derive(Debug, Serialize)]
pub struct CreateCustomerResponse {
    pub message: String,
    pub msisdn: String,
    pub loan_limit: f64,
    pub access_token: String,
}

/// Response for bulk import
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ImportResponse {
    pub created: usize,
    /// Invalid records and MSISDNs that already exist
    pub skipped: usize,
    /// Records the store could not write
    pub failed: usize,
}

/// Customer details behind an access token
#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub customer: Customer,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
