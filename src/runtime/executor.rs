//! USSD event executor

use super::locks::SessionLocks;
use super::traits::{StoreError, Storage};
use crate::db::{Commit, Session};
use crate::state_machine::{transition, Event, Reply, SessionContext};

/// Attempts before a contended event gives up
const MAX_ATTEMPTS: u32 = 3;

/// Runs gateway events through the state machine against any storage
pub struct UssdRuntime<S: Storage> {
    storage: S,
    locks: SessionLocks,
}

impl<S: Storage> UssdRuntime<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            locks: SessionLocks::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Handle one keypress and return the screen for the gateway
    ///
    /// Never fails: storage errors become a terminating "unavailable" screen
    /// after the event's writes have been rolled back.
    pub async fn handle(&self, event: &Event) -> Reply {
        let _guard = self.locks.acquire(&event.session_id).await;

        let mut attempt = 1;
        loop {
            match self.process(event).await {
                Ok(reply) => return reply,
                Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        session_id = %event.session_id,
                        attempt,
                        error = %e,
                        "Session changed underneath event, re-reading"
                    );
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        session_id = %event.session_id,
                        msisdn = %event.msisdn,
                        attempt,
                        error = %e,
                        "USSD event failed"
                    );
                    return Reply::service_unavailable();
                }
            }
        }
    }

    async fn process(&self, event: &Event) -> Result<Reply, StoreError> {
        let (session, is_new) = match self.storage.get_session(&event.session_id).await? {
            Some(session) => (session, false),
            None => (
                Session::new(&event.session_id, &event.msisdn, &event.service_code),
                true,
            ),
        };

        let customer = self.storage.find_by_msisdn(&event.msisdn).await?;
        let context = SessionContext::new(&event.msisdn, customer);
        let result = transition(session.step, &context, event.input());

        tracing::debug!(
            session_id = %session.session_id,
            msisdn = %context.msisdn,
            from = %session.step,
            to = %result.next_step,
            new_session = is_new,
            effects = result.effects.len(),
            ended = result.reply.is_end(),
            "USSD transition"
        );

        self.storage
            .commit(&Commit {
                session,
                is_new,
                next_step: result.next_step,
                effects: result.effects,
            })
            .await?;

        Ok(result.reply)
    }
}
