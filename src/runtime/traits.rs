//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the runtime with mock implementations.

use crate::db::{Commit, Customer, Database, DbError, NewCustomer, Session};
use crate::state_machine::Step;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Storage failures as seen by the runtime
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend failed or timed out
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    /// Record with the same key already exists
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Session moved on since it was read
    #[error("Step conflict: {0}")]
    StepConflict(String),
    /// Record to update does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Lost a race with another writer; re-reading resolves it
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::StepConflict(_))
    }
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::SessionExists(_) | DbError::CustomerExists(_) => {
                StoreError::Conflict(e.to_string())
            }
            DbError::StepConflict { .. } => StoreError::StepConflict(e.to_string()),
            DbError::CustomerNotFound(_) => StoreError::NotFound(e.to_string()),
            DbError::Sqlite(_) | DbError::Poisoned => StoreError::Unavailable(e.to_string()),
        }
    }
}

/// Storage for USSD sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Look up a session by id
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError>;

    /// Create a session at `Welcome`; `Conflict` if the id exists
    #[allow(dead_code)] // The runtime inserts through `commit`
    async fn create_session(
        &self,
        session_id: &str,
        msisdn: &str,
        service_code: &str,
    ) -> Result<Session, StoreError>;

    /// Move a session to `step`
    #[allow(dead_code)] // API completeness
    async fn advance_session(&self, session: &Session, step: Step) -> Result<(), StoreError>;
}

/// Lookup and maintenance of eligible customers
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    async fn find_by_msisdn(&self, msisdn: &str) -> Result<Option<Customer>, StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Customer>, StoreError>;

    /// Onboard a customer; `Conflict` if the MSISDN exists
    async fn create_customer(&self, new: &NewCustomer) -> Result<Customer, StoreError>;

    /// Persist `subscribed` and `loan_amount`
    #[allow(dead_code)] // API completeness
    async fn update_customer(&self, customer: &Customer) -> Result<(), StoreError>;
}

/// Combined storage with an atomic unit of work per event
#[async_trait]
pub trait Storage: SessionStore + CustomerDirectory {
    /// Apply session and customer writes together, or none of them
    async fn commit(&self, commit: &Commit) -> Result<(), StoreError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        (**self).get_session(session_id).await
    }

    async fn create_session(
        &self,
        session_id: &str,
        msisdn: &str,
        service_code: &str,
    ) -> Result<Session, StoreError> {
        (**self)
            .create_session(session_id, msisdn, service_code)
            .await
    }

    async fn advance_session(&self, session: &Session, step: Step) -> Result<(), StoreError> {
        (**self).advance_session(session, step).await
    }
}

#[async_trait]
impl<T: CustomerDirectory + ?Sized> CustomerDirectory for Arc<T> {
    async fn find_by_msisdn(&self, msisdn: &str) -> Result<Option<Customer>, StoreError> {
        (**self).find_by_msisdn(msisdn).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Customer>, StoreError> {
        (**self).find_by_token(token).await
    }

    async fn create_customer(&self, new: &NewCustomer) -> Result<Customer, StoreError> {
        (**self).create_customer(new).await
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        (**self).update_customer(customer).await
    }
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Arc<T> {
    async fn commit(&self, commit: &Commit) -> Result<(), StoreError> {
        (**self).commit(commit).await
    }
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter to use Database as Storage
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for DatabaseStorage {
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        Ok(self.db.get_session(session_id)?)
    }

    async fn create_session(
        &self,
        session_id: &str,
        msisdn: &str,
        service_code: &str,
    ) -> Result<Session, StoreError> {
        Ok(self.db.create_session(session_id, msisdn, service_code)?)
    }

    async fn advance_session(&self, session: &Session, step: Step) -> Result<(), StoreError> {
        Ok(self.db.advance_session(session, step)?)
    }
}

#[async_trait]
impl CustomerDirectory for DatabaseStorage {
    async fn find_by_msisdn(&self, msisdn: &str) -> Result<Option<Customer>, StoreError> {
        Ok(self.db.find_customer_by_msisdn(msisdn)?)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Customer>, StoreError> {
        Ok(self.db.find_customer_by_token(token)?)
    }

    async fn create_customer(&self, new: &NewCustomer) -> Result<Customer, StoreError> {
        Ok(self.db.create_customer(new)?)
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        Ok(self.db.update_customer(customer)?)
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn commit(&self, commit: &Commit) -> Result<(), StoreError> {
        Ok(self.db.commit(commit)?)
    }
}
