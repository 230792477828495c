//! Inbound gateway events

/// One keypress forwarded by the USSD gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub session_id: String,
    pub msisdn: String,
    pub service_code: String,
    /// Raw text as typed by the subscriber
    pub text: String,
}

impl Event {
    pub fn new(
        session_id: impl Into<String>,
        msisdn: impl Into<String>,
        service_code: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            msisdn: msisdn.into(),
            service_code: service_code.into(),
            text: text.into(),
        }
    }

    /// Input as seen by the state machine
    pub fn input(&self) -> &str {
        self.text.trim()
    }
}
