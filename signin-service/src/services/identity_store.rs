//! Identity store port and its in-memory adapter.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::StoreError;
use crate::models::{Identity, NewIdentity, Ticket};

/// Persistence capability used by the sign-in flows.
///
/// Calls for distinct identities may run concurrently. For the same identity
/// `set_pending_ticket` is last-write-wins.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up an identity by email, ignoring ASCII case.
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError>;

    /// Persist a new identity. Fails with `DuplicateEmail` when the email is taken.
    async fn create(&self, new: NewIdentity) -> Result<Identity, StoreError>;

    /// Overwrite the pending ticket of `id` and return the id.
    async fn set_pending_ticket(&self, id: Uuid, ticket: &Ticket) -> Result<Uuid, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemoryIdentityStore {
    identities: RwLock<HashMap<Uuid, Identity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an identity as-is.
    pub fn insert(&self, identity: Identity) -> Result<(), StoreError> {
        self.identities
            .write()
            .map_err(|e| anyhow::anyhow!("Identity store lock poisoned: {}", e))?
            .insert(identity.id, identity);
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Result<Option<Identity>, StoreError> {
        let identity = self
            .identities
            .read()
            .map_err(|e| anyhow::anyhow!("Identity store lock poisoned: {}", e))?
            .get(&id)
            .cloned();
        Ok(identity)
    }

    pub fn len(&self) -> usize {
        self.identities.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        let identity = self
            .identities
            .read()
            .map_err(|e| anyhow::anyhow!("Identity store lock poisoned: {}", e))?
            .values()
            .find(|identity| identity.has_email(email))
            .cloned();
        Ok(identity)
    }

    async fn create(&self, new: NewIdentity) -> Result<Identity, StoreError> {
        let mut identities = self
            .identities
            .write()
            .map_err(|e| anyhow::anyhow!("Identity store lock poisoned: {}", e))?;

        if identities.values().any(|identity| identity.has_email(&new.email)) {
            return Err(StoreError::DuplicateEmail);
        }

        let identity = Identity::from_new(Uuid::new_v4(), new, Utc::now());
        identities.insert(identity.id, identity.clone());
        Ok(identity)
    }

    async fn set_pending_ticket(&self, id: Uuid, ticket: &Ticket) -> Result<Uuid, StoreError> {
        let mut identities = self
            .identities
            .write()
            .map_err(|e| anyhow::anyhow!("Identity store lock poisoned: {}", e))?;

        let identity = identities.get_mut(&id).ok_or(StoreError::NotFound)?;
        identity.ticket = Some(ticket.clone());
        identity.updated_at = Utc::now();
        Ok(id)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
