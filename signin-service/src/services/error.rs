use thiserror::Error;

/// Failures reported by an identity store adapter.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Identity not found")]
    NotFound,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Failures reported by a notification adapter.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Template error: {0}")]
    Template(String),

    #[error("Invalid address: {0}")]
    Address(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Identity is disabled")]
    IdentityDisabled,

    #[error("Signing error: {0}")]
    Signing(String),
}
