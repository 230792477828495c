//! Pure state transition function
//!
//! Given the same step, context and input this always produces the same
//! result, with no I/O. Customer lookups happen before the call and writes
//! happen after it, in the runtime.

use super::reply::{CUSTOMER_NOT_FOUND, INVALID_AMOUNT};
use super::{Effect, Reply, SessionContext, Step};
use regex::Regex;
use std::sync::LazyLock;

/// Plain decimal literal: `500`, `500.50`, `500.`, `.5`
static DECIMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+(?:\.\d*)?|\.\d+)$").expect("decimal pattern is valid")
});

/// Result of a state transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionResult {
    pub next_step: Step,
    pub effects: Vec<Effect>,
    pub reply: Reply,
}

impl TransitionResult {
    pub fn new(next_step: Step, reply: Reply) -> Self {
        Self {
            next_step,
            effects: vec![],
            reply,
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Evaluate one keypress against the session's current step
pub fn transition(step: Step, context: &SessionContext, input: &str) -> TransitionResult {
    let stay = |reply| TransitionResult::new(step, reply);

    match (step, input) {
        (Step::Welcome, _) => match &context.customer {
            Some(customer) => TransitionResult::new(
                Step::LoanLimitChoice,
                Reply::con(format!(
                    "Welcome {}, would you like to know your loan limit?\n1. Yes\n2. No",
                    customer.name
                )),
            ),
            None => TransitionResult::new(
                Step::RegisterCustomer,
                Reply::con("Welcome, please enter your name"),
            ),
        },

        (Step::RegisterCustomer, "") => stay(Reply::con("Please enter your name")),

        // Back to Welcome so a re-dial on the same session id starts over
        (Step::RegisterCustomer, name) => TransitionResult::new(
            Step::Welcome,
            Reply::end(format!(
                "Thank you {name}, you have been registered. Please dial again to check your loan limit."
            )),
        )
        .with_effect(Effect::register(name)),

        (Step::LoanLimitChoice, "1") => match &context.customer {
            Some(customer) => TransitionResult::new(
                Step::LoanRequestChoice,
                Reply::con(format!(
                    "Your loan limit is {}. Would you like to request for a loan?\n1. Yes\n2. No",
                    customer.loan_limit
                )),
            )
            .with_effect(Effect::MarkSubscribed),
            None => stay(Reply::end(CUSTOMER_NOT_FOUND)),
        },

        (Step::LoanRequestChoice, "1") => {
            TransitionResult::new(Step::LoanAmountInput, Reply::con("Enter Loan Amount"))
        }

        (Step::LoanLimitChoice | Step::LoanRequestChoice, "2") => stay(Reply::thanks()),

        (Step::LoanAmountInput, raw) => match parse_amount(raw) {
            Some(amount) if context.customer.is_some() => {
                stay(Reply::thanks()).with_effect(Effect::RecordLoanRequest { amount })
            }
            Some(_) => stay(Reply::thanks()),
            None => stay(Reply::con(INVALID_AMOUNT)),
        },

        (Step::LoanLimitChoice | Step::LoanRequestChoice, _) => stay(Reply::invalid_input()),
    }
}

/// Parse a requested loan amount
///
/// Signs, exponents and the special float spellings are rejected even though
/// `f64::from_str` would take them.
pub fn parse_amount(input: &str) -> Option<f64> {
    if !DECIMAL.is_match(input) {
        return None;
    }
    input.parse::<f64>().ok().filter(|amount| amount.is_finite())
}
