//! Screens returned to the gateway

use std::fmt;

/// Whether the gateway keeps the session open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Continue,
    End,
}

impl ReplyKind {
    /// Wire prefix understood by the gateway
    pub fn prefix(self) -> &'static str {
        match self {
            ReplyKind::Continue => "CON",
            ReplyKind::End => "END",
        }
    }
}

/// Outbound screen text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
}

pub const THANKS: &str = "Thanks for using our service.";
pub const INVALID_INPUT: &str = "Invalid input.";
pub const INVALID_AMOUNT: &str = "Invalid input. Please enter a valid loan amount.";
pub const CUSTOMER_NOT_FOUND: &str = "Customer not found.";
pub const SERVICE_UNAVAILABLE: &str = "Service temporarily unavailable. Please try again later.";

impl Reply {
    pub fn con(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::Continue,
            text: text.into(),
        }
    }

    pub fn end(text: impl Into<String>) -> Self {
        Self {
            kind: ReplyKind::End,
            text: text.into(),
        }
    }

    pub fn thanks() -> Self {
        Self::end(THANKS)
    }

    pub fn invalid_input() -> Self {
        Self::end(INVALID_INPUT)
    }

    pub fn service_unavailable() -> Self {
        Self::end(SERVICE_UNAVAILABLE)
    }

    pub fn is_end(&self) -> bool {
        self.kind == ReplyKind::End
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.prefix(), self.text)
    }
}
