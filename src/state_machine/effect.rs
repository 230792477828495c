//! Effects produced by state transitions
//!
//! Every effect targets the customer owning the session's MSISDN. The
//! runtime commits them together with the step change in one storage
//! transaction.

/// Customer writes to be committed after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Self-registration of an unknown subscriber
    RegisterCustomer {
        name: String,
        loan_limit: f64,
        subscribed: bool,
    },

    /// Opt the customer into the loan service
    MarkSubscribed,

    /// Store the amount the customer asked for
    RecordLoanRequest { amount: f64 },
}

impl Effect {
    /// Registration defaults for subscribers who sign up from the menu
    pub fn register(name: impl Into<String>) -> Self {
        Effect::RegisterCustomer {
            name: name.into(),
            loan_limit: 0.0,
            subscribed: true,
        }
    }
}
