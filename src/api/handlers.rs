//! HTTP request handlers

use super::types::{
    CreateCustomerResponse, CustomerResponse, ErrorResponse, ImportResponse, UssdRequest,
};
use super::AppState;
use crate::db::{Customer, NewCustomer};
use crate::runtime::{CustomerDirectory, StoreError};
use crate::state_machine::Event;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Gateway callback
        .route("/ussd", post(ussd))
        // Onboarding
        .route("/customers", post(create_customer))
        .route("/customers/import", post(import_customers))
        // Detail link sent by SMS
        .route("/customers/:token", get(get_customer))
        .route("/health", get(health))
        .with_state(state)
}

// ============================================================
// USSD Gateway
// ============================================================

/// Plain-text `CON …` / `END …` screen; failures are screens too
async fn ussd(State(state): State<AppState>, Json(req): Json<UssdRequest>) -> String {
    let event = Event::new(req.session_id, req.msisdn, req.service_code, req.ussd_string);
    state.runtime.handle(&event).await.to_string()
}

// ============================================================
// Customers
// ============================================================

fn validate(new: &NewCustomer) -> Result<(), String> {
    if new.msisdn.trim().is_empty() {
        return Err("msisdn is required".to_string());
    }
    if new.name.trim().is_empty() {
        return Err("name is required".to_string());
    }
    if !new.loan_limit.is_finite() || new.loan_limit < 0.0 {
        return Err("loan_limit must be a non-negative amount".to_string());
    }
    if new.loan_amount.is_some_and(|amount| !amount.is_finite() || amount < 0.0) {
        return Err("loan_amount must be a non-negative amount".to_string());
    }
    Ok(())
}

async fn create_customer(
    State(state): State<AppState>,
    Json(req): Json<NewCustomer>,
) -> Result<(StatusCode, Json<CreateCustomerResponse>), AppError> {
    validate(&req).map_err(AppError::BadRequest)?;

    let customer = state
        .runtime
        .storage()
        .create_customer(&req)
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                AppError::BadRequest("Customer with this MSISDN already exists".to_string())
            }
            other => AppError::Internal(other.to_string()),
        })?;

    tracing::info!(msisdn = %customer.msisdn, "Customer created");

    Ok((
        StatusCode::CREATED,
        Json(CreateCustomerResponse {
            message: "Customer created successfully".to_string(),
            msisdn: customer.msisdn,
            loan_limit: customer.loan_limit,
            access_token: customer.access_token,
        }),
    ))
}

/// Bulk onboarding; each new customer is told their limit by SMS
///
/// Records are written one by one, so a storage failure is counted and the
/// rest of the batch still goes through.
async fn import_customers(
    State(state): State<AppState>,
    Json(records): Json<Vec<NewCustomer>>,
) -> Json<ImportResponse> {
    let mut summary = ImportResponse {
        created: 0,
        skipped: 0,
        failed: 0,
    };

    for record in records {
        if let Err(reason) = validate(&record) {
            tracing::warn!(msisdn = %record.msisdn, reason = %reason, "Skipping invalid import record");
            summary.skipped += 1;
            continue;
        }

        match state.runtime.storage().create_customer(&record).await {
            Ok(customer) => {
                summary.created += 1;
                notify_eligibility(&state, &customer);
            }
            Err(StoreError::Conflict(_)) => summary.skipped += 1,
            Err(e) => {
                tracing::error!(msisdn = %record.msisdn, error = %e, "Failed to import customer");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        created = summary.created,
        skipped = summary.skipped,
        failed = summary.failed,
        "Customer import finished"
    );
    Json(summary)
}

/// Fire-and-forget SMS with the customer's limit and detail link
fn notify_eligibility(state: &AppState, customer: &Customer) {
    let notifier = Arc::clone(&state.notifier);
    let msisdn = customer.msisdn.clone();
    let text = format!(
        "Hello {}, you qualify for a loan of up to {}. View details: {}/customers/{}",
        customer.name, customer.loan_limit, state.public_url, customer.access_token
    );

    tokio::spawn(async move {
        if let Err(e) = notifier.send(&msisdn, &text).await {
            tracing::warn!(msisdn = %msisdn, error = %e, "Eligibility SMS failed");
        }
    });
}

async fn get_customer(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<CustomerResponse>, AppError> {
    let customer = state
        .runtime
        .storage()
        .find_by_token(&token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Customer not found".to_string()))?;

    Ok(Json(CustomerResponse { customer }))
}

async fn health() -> &'static str {
    "ok"
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
