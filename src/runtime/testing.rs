//! Mock implementations for testing
//!
//! These mocks enable runtime testing without a database.

use super::traits::*;
use crate::db::{Commit, Customer, NewCustomer, Session};
use crate::state_machine::{Effect, Step};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// In-memory Storage
// ============================================================================

#[derive(Clone, Default)]
struct Tables {
    sessions: HashMap<String, Session>,
    customers: HashMap<String, Customer>,
}

/// Storage backed by hash maps, with failure injection
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
    fail_customer_lookups: AtomicBool,
    fail_commits: AtomicBool,
    conflict_commits: AtomicBool,
    commit_calls: AtomicUsize,
    /// Inserted just before the next commit runs, as if by another process
    pending_race: Mutex<Option<Session>>,
    /// Step another process moves the session to just before the next commit
    pending_advance: Mutex<Option<Step>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make customer lookups fail with `Unavailable`
    pub fn fail_customer_lookups(&self, fail: bool) {
        self.fail_customer_lookups.store(fail, Ordering::SeqCst);
    }

    /// Make commits fail with `Unavailable` before writing anything
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Make every commit lose its compare-and-swap
    pub fn conflict_commits(&self, conflict: bool) {
        self.conflict_commits.store(conflict, Ordering::SeqCst);
    }

    /// Simulate a concurrent writer creating `session` first
    pub fn race_session_on_next_commit(&self, session: Session) {
        *self.pending_race.lock().unwrap() = Some(session);
    }

    /// Simulate a concurrent writer advancing the stored session to `step`
    pub fn advance_on_next_commit(&self, step: Step) {
        *self.pending_advance.lock().unwrap() = Some(step);
    }

    /// Commits attempted so far, successful or not
    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    /// Number of stored sessions
    pub fn session_count(&self) -> usize {
        self.tables.lock().unwrap().sessions.len()
    }
}

fn apply(tables: &mut Tables, commit: &Commit) -> Result<(), StoreError> {
    let now = Utc::now();
    let msisdn = &commit.session.msisdn;

    for effect in &commit.effects {
        match effect {
            Effect::RegisterCustomer {
                name,
                loan_limit,
                subscribed,
            } => {
                let new = NewCustomer {
                    msisdn: msisdn.clone(),
                    name: name.clone(),
                    loan_limit: *loan_limit,
                    subscribed: *subscribed,
                    loan_amount: None,
                };
                tables
                    .customers
                    .entry(msisdn.clone())
                    .or_insert_with(|| new.into_customer(now));
            }
            Effect::MarkSubscribed => {
                if let Some(customer) = tables.customers.get_mut(msisdn) {
                    customer.subscribed = true;
                    customer.updated_at = now;
                }
            }
            Effect::RecordLoanRequest { amount } => {
                if let Some(customer) = tables.customers.get_mut(msisdn) {
                    customer.loan_amount = Some(*amount);
                    customer.updated_at = now;
                }
            }
        }
    }

    let id = &commit.session.session_id;
    if commit.is_new {
        if tables.sessions.contains_key(id) {
            return Err(StoreError::Conflict(format!("session {id} exists")));
        }
        let session = Session {
            step: commit.next_step,
            last_activity: now,
            ..commit.session.clone()
        };
        tables.sessions.insert(id.clone(), session);
    } else {
        match tables.sessions.get_mut(id) {
            Some(stored)
                if stored.step == commit.session.step
                    && stored.version == commit.session.version =>
            {
                stored.step = commit.next_step;
                stored.last_activity = now;
                stored.version += 1;
            }
            _ => {
                return Err(StoreError::StepConflict(format!(
                    "session {id} changed since it was read at {}",
                    commit.session.step
                )))
            }
        }
    }
    Ok(())
}

#[async_trait]
impl SessionStore for MemoryStorage {
    async fn get_session(&self, session_id: &str) -> Result<Option<Session>, StoreError> {
        let session = self.tables.lock().unwrap().sessions.get(session_id).cloned();
        // Let other events run between this read and the commit
        tokio::task::yield_now().await;
        Ok(session)
    }

    async fn create_session(
        &self,
        session_id: &str,
        msisdn: &str,
        service_code: &str,
    ) -> Result<Session, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.sessions.contains_key(session_id) {
            return Err(StoreError::Conflict(format!("session {session_id} exists")));
        }
        let session = Session::new(session_id, msisdn, service_code);
        tables
            .sessions
            .insert(session_id.to_string(), session.clone());
        Ok(session)
    }

    async fn advance_session(&self, session: &Session, step: Step) -> Result<(), StoreError> {
        self.commit(&Commit::advance(session.clone(), step)).await
    }
}

#[async_trait]
impl CustomerDirectory for MemoryStorage {
    async fn find_by_msisdn(&self, msisdn: &str) -> Result<Option<Customer>, StoreError> {
        if self.fail_customer_lookups.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected lookup failure".to_string()));
        }
        Ok(self.tables.lock().unwrap().customers.get(msisdn).cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Customer>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .customers
            .values()
            .find(|c| c.access_token == token)
            .cloned())
    }

    async fn create_customer(&self, new: &NewCustomer) -> Result<Customer, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if tables.customers.contains_key(&new.msisdn) {
            return Err(StoreError::Conflict(format!("customer {} exists", new.msisdn)));
        }
        let customer = new.clone().into_customer(Utc::now());
        tables
            .customers
            .insert(customer.msisdn.clone(), customer.clone());
        Ok(customer)
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let stored = tables
            .customers
            .get_mut(&customer.msisdn)
            .ok_or_else(|| StoreError::NotFound(format!("customer {}", customer.msisdn)))?;
        stored.subscribed = customer.subscribed;
        stored.loan_amount = customer.loan_amount;
        stored.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn commit(&self, commit: &Commit) -> Result<(), StoreError> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }
        if self.conflict_commits.load(Ordering::SeqCst) {
            return Err(StoreError::StepConflict("injected step conflict".to_string()));
        }

        let mut tables = self.tables.lock().unwrap();
        if let Some(raced) = self.pending_race.lock().unwrap().take() {
            tables.sessions.insert(raced.session_id.clone(), raced);
        }
        if let Some(step) = self.pending_advance.lock().unwrap().take() {
            if let Some(stored) = tables.sessions.get_mut(&commit.session.session_id) {
                stored.step = step;
                stored.last_activity = Utc::now();
                stored.version += 1;
            }
        }

        // Work on a copy so a failed commit leaves nothing behind
        let mut staged = tables.clone();
        apply(&mut staged, commit)?;
        *tables = staged;
        Ok(())
    }
}
