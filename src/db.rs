//! Database module for the USSD service
//!
//! Provides persistence for sessions and customers.

mod schema;

pub use schema::*;

use crate::state_machine::state::UnknownStep;
use crate::state_machine::{Effect, Step};
use chrono::{DateTime, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row, Transaction};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Session already exists: {0}")]
    SessionExists(String),
    #[error("Session {session_id} changed since it was read at step {expected}")]
    StepConflict { session_id: String, expected: Step },
    #[error("Customer already exists: {0}")]
    CustomerExists(String),
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),
    #[error("Database connection lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Connection parameters, passed explicitly to [`Database::open`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub path: PathBuf,
    /// How long a write waits on a locked database before failing
    pub busy_timeout: Duration,
}

impl DbConfig {
    pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Self::DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

const SESSION_COLUMNS: &str =
    "session_id, msisdn, service_code, current_step, created_at, last_activity, version";
const CUSTOMER_COLUMNS: &str =
    "msisdn, name, loan_limit, subscribed, loan_amount, access_token, created_at, updated_at";

impl Database {
    /// Open or create database at the configured path
    pub fn open(config: &DbConfig) -> DbResult<Self> {
        let conn = Connection::open(&config.path)?;
        conn.busy_timeout(config.busy_timeout)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> DbResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    /// Run raw SQL against the connection
    #[cfg(test)]
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Get session by ID
    pub fn get_session(&self, session_id: &str) -> DbResult<Option<Session>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {SESSION_COLUMNS} FROM ussd_sessions WHERE session_id = ?1");
        let session = conn
            .query_row(&sql, params![session_id], parse_session_row)
            .optional()?;
        Ok(session)
    }

    /// Create a session at `Welcome`
    pub fn create_session(
        &self,
        session_id: &str,
        msisdn: &str,
        service_code: &str,
    ) -> DbResult<Session> {
        let session = Session::new(session_id, msisdn, service_code);
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        insert_session(&tx, &session, session.step)?;
        tx.commit()?;
        Ok(session)
    }

    /// Move a session to `step`, refreshing its last activity
    pub fn advance_session(&self, session: &Session, step: Step) -> DbResult<()> {
        self.commit(&Commit::advance(session.clone(), step))
    }

    /// Apply the writes of one USSD event in a single transaction
    ///
    /// Customer effects are applied first, then the session is inserted or
    /// advanced. Any failure rolls back everything.
    pub fn commit(&self, commit: &Commit) -> DbResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();

        for effect in &commit.effects {
            apply_effect(&tx, &commit.session.msisdn, effect, now)?;
        }

        if commit.is_new {
            let session = Session {
                last_activity: now,
                ..commit.session.clone()
            };
            insert_session(&tx, &session, commit.next_step)?;
        } else {
            let updated = tx.execute(
                "UPDATE ussd_sessions SET current_step = ?1, last_activity = ?2, version = version + 1
                 WHERE session_id = ?3 AND current_step = ?4 AND version = ?5",
                params![
                    commit.next_step.as_str(),
                    now.to_rfc3339(),
                    commit.session.session_id,
                    commit.session.step.as_str(),
                    commit.session.version
                ],
            )?;
            if updated == 0 {
                return Err(DbError::StepConflict {
                    session_id: commit.session.session_id.clone(),
                    expected: commit.session.step,
                });
            }
        }

        tx.commit()?;
        Ok(())
    }

    // ==================== Customer Operations ====================

    /// Get customer by MSISDN
    pub fn find_customer_by_msisdn(&self, msisdn: &str) -> DbResult<Option<Customer>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE msisdn = ?1");
        let customer = conn
            .query_row(&sql, params![msisdn], parse_customer_row)
            .optional()?;
        Ok(customer)
    }

    /// Get customer by access token
    pub fn find_customer_by_token(&self, token: &str) -> DbResult<Option<Customer>> {
        let conn = self.lock()?;
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE access_token = ?1");
        let customer = conn
            .query_row(&sql, params![token], parse_customer_row)
            .optional()?;
        Ok(customer)
    }

    /// Onboard a customer, generating their access token
    pub fn create_customer(&self, new: &NewCustomer) -> DbResult<Customer> {
        let customer = new.clone().into_customer(Utc::now());
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO customers (msisdn, name, loan_limit, subscribed, loan_amount, access_token, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                customer.msisdn,
                customer.name,
                customer.loan_limit,
                customer.subscribed,
                customer.loan_amount,
                customer.access_token,
                customer.created_at.to_rfc3339()
            ],
        )
        .map_err(|e| match e {
            e if is_unique_violation(&e) => DbError::CustomerExists(customer.msisdn.clone()),
            other => DbError::Sqlite(other),
        })?;
        Ok(customer)
    }

    /// Persist the mutable customer fields (`subscribed`, `loan_amount`)
    pub fn update_customer(&self, customer: &Customer) -> DbResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE customers SET subscribed = ?1, loan_amount = ?2, updated_at = ?3 WHERE msisdn = ?4",
            params![
                customer.subscribed,
                customer.loan_amount,
                Utc::now().to_rfc3339(),
                customer.msisdn
            ],
        )?;

        if updated == 0 {
            return Err(DbError::CustomerNotFound(customer.msisdn.clone()));
        }
        Ok(())
    }
}

fn insert_session(tx: &Transaction<'_>, session: &Session, step: Step) -> DbResult<()> {
    tx.execute(
        "INSERT INTO ussd_sessions (session_id, msisdn, service_code, current_step, created_at, last_activity, version)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            session.session_id,
            session.msisdn,
            session.service_code,
            step.as_str(),
            session.created_at.to_rfc3339(),
            session.last_activity.to_rfc3339(),
            session.version
        ],
    )
    .map_err(|e| match e {
        e if is_unique_violation(&e) => DbError::SessionExists(session.session_id.clone()),
        other => DbError::Sqlite(other),
    })?;
    Ok(())
}

fn apply_effect(
    tx: &Transaction<'_>,
    msisdn: &str,
    effect: &Effect,
    now: DateTime<Utc>,
) -> DbResult<()> {
    match effect {
        Effect::RegisterCustomer {
            name,
            loan_limit,
            subscribed,
        } => {
            let customer = NewCustomer {
                msisdn: msisdn.to_string(),
                name: name.clone(),
                loan_limit: *loan_limit,
                subscribed: *subscribed,
                loan_amount: None,
            }
            .into_customer(now);
            // A customer registered meanwhile by another session wins
            tx.execute(
                "INSERT INTO customers (msisdn, name, loan_limit, subscribed, loan_amount, access_token, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6, ?6)
                 ON CONFLICT(msisdn) DO NOTHING",
                params![
                    customer.msisdn,
                    customer.name,
                    customer.loan_limit,
                    customer.subscribed,
                    customer.access_token,
                    now.to_rfc3339()
                ],
            )?;
        }
        Effect::MarkSubscribed => {
            tx.execute(
                "UPDATE customers SET subscribed = 1, updated_at = ?1 WHERE msisdn = ?2",
                params![now.to_rfc3339(), msisdn],
            )?;
        }
        Effect::RecordLoanRequest { amount } => {
            tx.execute(
                "UPDATE customers SET loan_amount = ?1, updated_at = ?2 WHERE msisdn = ?3",
                params![amount, now.to_rfc3339(), msisdn],
            )?;
        }
    }
    Ok(())
}

/// Primary key or unique index collision (not CHECK failures)
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == ErrorCode::ConstraintViolation
                && matches!(
                    err.extended_code,
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE
                )
    )
}

fn parse_session_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    let step: String = row.get(3)?;
    let step = step.parse::<Step>().map_err(|e: UnknownStep| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Session {
        session_id: row.get(0)?,
        msisdn: row.get(1)?,
        service_code: row.get(2)?,
        step,
        created_at: parse_datetime(row, 4)?,
        last_activity: parse_datetime(row, 5)?,
        version: row.get(6)?,
    })
}

fn parse_customer_row(row: &Row<'_>) -> rusqlite::Result<Customer> {
    Ok(Customer {
        msisdn: row.get(0)?,
        name: row.get(1)?,
        loan_limit: row.get(2)?,
        subscribed: row.get(3)?,
        loan_amount: row.get(4)?,
        access_token: row.get(5)?,
        created_at: parse_datetime(row, 6)?,
        updated_at: parse_datetime(row, 7)?,
    })
}

fn parse_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
