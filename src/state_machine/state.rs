//! Session step and per-event context

use crate::db::Customer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a session within the menu
///
/// There is no terminal step: ending a session is a property of the reply,
/// and the record simply stays at the last step it reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Welcome,
    RegisterCustomer,
    LoanLimitChoice,
    LoanRequestChoice,
    LoanAmountInput,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::Welcome,
        Step::RegisterCustomer,
        Step::LoanLimitChoice,
        Step::LoanRequestChoice,
        Step::LoanAmountInput,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Welcome => "welcome",
            Step::RegisterCustomer => "register_customer",
            Step::LoanLimitChoice => "loan_limit_choice",
            Step::LoanRequestChoice => "loan_request_choice",
            Step::LoanAmountInput => "loan_amount_input",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored step string that names no known step
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown step: {0}")]
pub struct UnknownStep(pub String);

impl FromStr for Step {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| UnknownStep(s.to_string()))
    }
}

/// Everything a transition may look at besides the step and input
///
/// Built fresh for every event from durable storage.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub msisdn: String,
    /// Customer owning the MSISDN, if onboarded
    pub customer: Option<Customer>,
}

impl SessionContext {
    pub fn new(msisdn: impl Into<String>, customer: Option<Customer>) -> Self {
        Self {
            msisdn: msisdn.into(),
            customer,
        }
    }
}
