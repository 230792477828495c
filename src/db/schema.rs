//! Database schema and types

use crate::state_machine::{Effect, Step};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS customers (
    msisdn TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    loan_limit REAL NOT NULL CHECK (loan_limit >= 0),
    subscribed BOOLEAN NOT NULL DEFAULT 0,
    loan_amount REAL,
    access_token TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_customers_token ON customers(access_token);

CREATE TABLE IF NOT EXISTS ussd_sessions (
    session_id TEXT PRIMARY KEY,
    msisdn TEXT NOT NULL,
    service_code TEXT NOT NULL,
    current_step TEXT NOT NULL DEFAULT 'welcome'
        CHECK (current_step IN ('welcome', 'register_customer', 'loan_limit_choice',
                                'loan_request_choice', 'loan_amount_input')),
    created_at TEXT NOT NULL,
    last_activity TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_sessions_msisdn ON ussd_sessions(msisdn);
CREATE INDEX IF NOT EXISTS idx_sessions_activity ON ussd_sessions(last_activity DESC);
";

/// USSD session record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub msisdn: String,
    pub service_code: String,
    pub step: Step,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Bumped by every committed event
    pub version: i64,
}

impl Session {
    /// A session that has not been stored yet, at `Welcome`
    pub fn new(
        session_id: impl Into<String>,
        msisdn: impl Into<String>,
        service_code: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            msisdn: msisdn.into(),
            service_code: service_code.into(),
            step: Step::Welcome,
            created_at: now,
            last_activity: now,
            version: 0,
        }
    }
}

/// Customer eligible for loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub msisdn: String,
    pub name: String,
    pub loan_limit: f64,
    pub subscribed: bool,
    pub loan_amount: Option<f64>,
    /// Opaque token for the detail link sent by SMS
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when onboarding a customer
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCustomer {
    pub msisdn: String,
    pub name: String,
    pub loan_limit: f64,
    #[serde(default)]
    pub subscribed: bool,
    #[serde(default)]
    pub loan_amount: Option<f64>,
}

impl NewCustomer {
    /// Materialize with a fresh access token
    pub fn into_customer(self, now: DateTime<Utc>) -> Customer {
        Customer {
            msisdn: self.msisdn,
            name: self.name,
            loan_limit: self.loan_limit,
            subscribed: self.subscribed,
            loan_amount: self.loan_amount,
            access_token: uuid::Uuid::new_v4().simple().to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Everything one USSD event writes, committed atomically
///
/// `session` is the record as read at the start of the event; its `step` and
/// `version` are the compare-and-swap guard. When `is_new` is set the session
/// is inserted instead of updated.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub session: Session,
    pub is_new: bool,
    pub next_step: Step,
    pub effects: Vec<Effect>,
}

impl Commit {
    pub fn advance(session: Session, next_step: Step) -> Self {
        Self {
            session,
            is_new: false,
            next_step,
            effects: vec![],
        }
    }
}
