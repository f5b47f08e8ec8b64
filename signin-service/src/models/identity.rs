//! Identity model - one account as stored by the identity store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Ticket;

/// MFA and passwordless bookkeeping carried on the identity.
///
/// The sign-in core never interprets these; adapters must round-trip them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxiliaryFields {
    pub phone_number: Option<String>,
    pub phone_number_verified: bool,
    pub new_email: Option<String>,
    pub otp_method_last_used: Option<String>,
    pub otp_hash: Option<String>,
    pub otp_hash_expires_at: Option<DateTime<Utc>>,
    pub totp_secret: Option<String>,
    pub active_mfa_type: Option<String>,
    pub webauthn_current_challenge: Option<String>,
    pub is_anonymous: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

/// Identity entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
    pub display_name: String,
    pub avatar_url: String,
    pub locale: String,
    pub default_role: String,
    pub roles: Vec<String>,
    pub disabled: bool,
    pub email_verified: bool,
    pub password_hash: Option<String>,
    pub ticket: Option<Ticket>,
    pub metadata: serde_json::Value,
    pub auxiliary: AuxiliaryFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identity {
    /// Materialize a freshly provisioned identity.
    pub fn from_new(id: Uuid, new: NewIdentity, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: Some(new.email),
            display_name: new.display_name,
            avatar_url: new.avatar_url,
            locale: new.locale,
            default_role: new.default_role,
            roles: new.roles,
            disabled: new.disabled,
            email_verified: new.email_verified,
            password_hash: new.password_hash,
            ticket: None,
            metadata: new.metadata,
            auxiliary: AuxiliaryFields::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|stored| stored.eq_ignore_ascii_case(email))
    }
}

/// Provisioning data handed to the identity store's create operation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIdentity {
    pub email: String,
    pub display_name: String,
    pub avatar_url: String,
    pub locale: String,
    pub default_role: String,
    pub roles: Vec<String>,
    pub disabled: bool,
    pub email_verified: bool,
    pub password_hash: Option<String>,
    pub metadata: serde_json::Value,
}
