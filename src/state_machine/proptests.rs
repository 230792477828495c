//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::reply::ReplyKind;
use super::*;
use crate::db::Customer;
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Welcome),
        Just(Step::RegisterCustomer),
        Just(Step::LoanLimitChoice),
        Just(Step::LoanRequestChoice),
        Just(Step::LoanAmountInput),
    ]
}

fn arb_customer() -> impl Strategy<Value = Customer> {
    ("[A-Z][a-z]{1,10}", 0u32..100_000, any::<bool>()).prop_map(|(name, limit, subscribed)| {
        let now = Utc::now();
        Customer {
            msisdn: "07000".to_string(),
            name,
            loan_limit: f64::from(limit),
            subscribed,
            loan_amount: None,
            access_token: "token".to_string(),
            created_at: now,
            updated_at: now,
        }
    })
}

fn arb_context() -> impl Strategy<Value = SessionContext> {
    proptest::option::of(arb_customer()).prop_map(|customer| SessionContext::new("07000", customer))
}

/// Inputs that are not decimal literals
fn arb_non_numeric() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z]{1,8}",
        "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        "-[0-9]{1,5}",
        "[0-9]{1,3}[a-z]{1,3}",
        Just(String::new()),
    ]
}

fn arb_decimal() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{1,7}",
        "[0-9]{1,7}\\.[0-9]{1,4}",
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn welcome_always_continues(context in arb_context(), input in ".{0,20}") {
        let result = transition(Step::Welcome, &context, &input);
        prop_assert_eq!(result.reply.kind, ReplyKind::Continue);
        prop_assert!(result.effects.is_empty());
        let expected = if context.customer.is_some() {
            Step::LoanLimitChoice
        } else {
            Step::RegisterCustomer
        };
        prop_assert_eq!(result.next_step, expected);
    }

    #[test]
    fn non_numeric_amount_never_advances(context in arb_context(), input in arb_non_numeric()) {
        let result = transition(Step::LoanAmountInput, &context, &input);
        prop_assert_eq!(result.next_step, Step::LoanAmountInput);
        prop_assert_eq!(result.reply.kind, ReplyKind::Continue);
        prop_assert!(result.effects.is_empty());
    }

    #[test]
    fn decimal_amount_ends_session(context in arb_context(), input in arb_decimal()) {
        let result = transition(Step::LoanAmountInput, &context, &input);
        prop_assert!(result.reply.is_end());
        prop_assert_eq!(result.next_step, Step::LoanAmountInput);
        prop_assert_eq!(result.effects.len(), usize::from(context.customer.is_some()));
    }

    #[test]
    fn unrecognised_choices_end_without_mutation(
        step in prop_oneof![Just(Step::LoanLimitChoice), Just(Step::LoanRequestChoice)],
        context in arb_context(),
        input in "[3-9a-z]{1,4}",
    ) {
        let result = transition(step, &context, &input);
        prop_assert_eq!(result.next_step, step);
        prop_assert!(result.effects.is_empty());
        prop_assert_eq!(result.reply, Reply::invalid_input());
    }

    #[test]
    fn step_changing_writes_come_from_registration_or_subscription(
        step in arb_step(),
        context in arb_context(),
        input in ".{0,10}",
    ) {
        let result = transition(step, &context, &input);
        prop_assert!(Step::ALL.contains(&result.next_step));
        // Only registration and loan-limit subscription move away from the
        // current step while also writing customer data.
        if !result.effects.is_empty() && result.next_step != step {
            prop_assert!(matches!(step, Step::RegisterCustomer | Step::LoanLimitChoice));
        }
    }

    #[test]
    fn loan_limit_is_shown_to_known_customers(customer in arb_customer()) {
        let limit = customer.loan_limit;
        let context = SessionContext::new("07000", Some(customer));
        let result = transition(Step::LoanLimitChoice, &context, "1");
        prop_assert_eq!(result.next_step, Step::LoanRequestChoice);
        let expected = format!("Your loan limit is {limit}.");
        prop_assert!(result.reply.text.contains(&expected));
    }
}
