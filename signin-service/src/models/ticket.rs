//! Ticket model - single-use, flow-typed verification tokens.
//!
//! The wire form is `<flowType>:<opaqueId>`. It is stored on the identity and
//! embedded in emailed links, so it only uses URL-safe characters around the
//! `:` separator.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Verification flows a ticket can authorize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowType {
    #[serde(rename = "passwordlessEmail")]
    PasswordlessEmail,
    #[serde(rename = "verifyEmail")]
    VerifyEmail,
    #[serde(rename = "passwordReset")]
    PasswordReset,
    #[serde(rename = "emailConfirmChange")]
    EmailConfirmChange,
}

impl FlowType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowType::PasswordlessEmail => "passwordlessEmail",
            FlowType::VerifyEmail => "verifyEmail",
            FlowType::PasswordReset => "passwordReset",
            FlowType::EmailConfirmChange => "emailConfirmChange",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "passwordlessEmail" => Some(FlowType::PasswordlessEmail),
            "verifyEmail" => Some(FlowType::VerifyEmail),
            "passwordReset" => Some(FlowType::PasswordReset),
            "emailConfirmChange" => Some(FlowType::EmailConfirmChange),
            _ => None,
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned when parsing a rendered ticket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketParseError {
    #[error("ticket is missing the ':' separator")]
    MissingSeparator,
    #[error("ticket identifier is empty or malformed")]
    EmptyId,
    #[error("unknown ticket flow type: {0}")]
    UnknownFlowType(String),
}

/// The flow-tagged part of a ticket, as carried on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TicketValue {
    pub flow: FlowType,
    pub id: String,
}

impl TicketValue {
    /// Canonical `<flowType>:<opaqueId>` form.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TicketValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.flow, self.id)
    }
}

impl FromStr for TicketValue {
    type Err = TicketParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, id) = s.split_once(':').ok_or(TicketParseError::MissingSeparator)?;

        if id.is_empty() || id.chars().any(char::is_whitespace) {
            return Err(TicketParseError::EmptyId);
        }

        let flow =
            FlowType::parse(tag).ok_or_else(|| TicketParseError::UnknownFlowType(tag.to_string()))?;

        Ok(Self {
            flow,
            id: id.to_string(),
        })
    }
}

/// A pending ticket: the wire value plus its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub value: TicketValue,
    pub expires_at: DateTime<Utc>,
}

impl Ticket {
    /// Issue a fresh ticket for `flow`, valid for `lifetime` from now.
    pub fn issue(flow: FlowType, lifetime: Duration) -> Self {
        Self::issue_at(flow, lifetime, Utc::now())
    }

    fn issue_at(flow: FlowType, lifetime: Duration, now: DateTime<Utc>) -> Self {
        Self {
            value: TicketValue {
                flow,
                id: Uuid::new_v4().to_string(),
            },
            expires_at: now + lifetime,
        }
    }

    pub fn render(&self) -> String {
        self.value.render()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
