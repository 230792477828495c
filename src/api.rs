//! HTTP API for the USSD service
//!
//! Gateway callback plus customer onboarding and detail lookup.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::db::Database;
use crate::runtime::{DatabaseStorage, ProductionRuntime};
use crate::sms::Notifier;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ProductionRuntime>,
    pub notifier: Arc<dyn Notifier>,
    /// Base URL for customer detail links
    pub public_url: String,
}

impl AppState {
    pub fn new(db: Database, notifier: Arc<dyn Notifier>, public_url: impl Into<String>) -> Self {
        Self {
            runtime: Arc::new(ProductionRuntime::new(DatabaseStorage::new(db))),
            notifier,
            public_url: public_url.into(),
        }
    }
}
