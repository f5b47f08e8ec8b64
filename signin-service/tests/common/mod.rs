//! Test helpers for sign-in service integration tests.
//!
//! Provides a recording identity store with failure and latency injection,
//! plus constructors for flows and routers wired over in-memory adapters.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use signin_service::{
    build_router,
    config::AuthConfig,
    flows::PasswordlessEmailFlow,
    models::{Identity, NewIdentity, Ticket},
    policy::PolicySet,
    services::{
        IdentityStore, JwtService, MemoryIdentityStore, MockNotifier, StoreError,
    },
    AppState,
};
use service_core::axum::Router;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// A call observed by [`RecordingStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    FindByEmail(String),
    Create(NewIdentity),
    SetPendingTicket(Uuid, Ticket),
}

/// Store operation names accepted by [`RecordingStore::fail_on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    FindByEmail,
    Create,
    SetPendingTicket,
    HealthCheck,
}

/// In-memory store that records every call and can be told to fail or stall.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryIdentityStore,
    calls: Mutex<Vec<StoreCall>>,
    fail_on: Mutex<Option<StoreOp>>,
    latency: Mutex<Option<Duration>>,
    racing_identity: Mutex<Option<Identity>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: Identity) -> Self {
        let store = Self::new();
        store.inner.insert(identity).unwrap();
        store
    }

    pub fn fail_on(&self, op: StoreOp) {
        *self.fail_on.lock().unwrap() = Some(op);
    }

    /// Store `identity` just before the next create, so that create loses the race.
    pub fn lose_next_create_to(&self, identity: Identity) {
        *self.racing_identity.lock().unwrap() = Some(identity);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> Vec<NewIdentity> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::Create(new) => Some(new),
                _ => None,
            })
            .collect()
    }

    pub fn ticket_updates(&self) -> Vec<(Uuid, Ticket)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StoreCall::SetPendingTicket(id, ticket) => Some((id, ticket)),
                _ => None,
            })
            .collect()
    }

    pub fn get(&self, id: Uuid) -> Option<Identity> {
        self.inner.get(id).unwrap()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    async fn enter(&self, op: StoreOp, call: Option<StoreCall>) -> Result<(), StoreError> {
        if let Some(call) = call {
            self.calls.lock().unwrap().push(call);
        }

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if *self.fail_on.lock().unwrap() == Some(op) {
            return Err(StoreError::Internal(anyhow::anyhow!(
                "injected {:?} failure",
                op
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for RecordingStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, StoreError> {
        self.enter(StoreOp::FindByEmail, Some(StoreCall::FindByEmail(email.to_string())))
            .await?;
        self.inner.find_by_email(email).await
    }

    async fn create(&self, new: NewIdentity) -> Result<Identity, StoreError> {
        self.enter(StoreOp::Create, Some(StoreCall::Create(new.clone())))
            .await?;
        let racing = self.racing_identity.lock().unwrap().take();
        if let Some(identity) = racing {
            self.inner.insert(identity).unwrap();
        }
        self.inner.create(new).await
    }

    async fn set_pending_ticket(&self, id: Uuid, ticket: &Ticket) -> Result<Uuid, StoreError> {
        self.enter(
            StoreOp::SetPendingTicket,
            Some(StoreCall::SetPendingTicket(id, ticket.clone())),
        )
        .await?;
        self.inner.set_pending_ticket(id, ticket).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.enter(StoreOp::HealthCheck, None).await
    }
}

/// A stored, enabled identity with the given profile.
pub fn existing_identity(email: &str, display_name: &str, locale: &str) -> Identity {
    Identity::from_new(
        Uuid::new_v4(),
        NewIdentity {
            email: email.to_string(),
            display_name: display_name.to_string(),
            avatar_url: String::new(),
            locale: locale.to_string(),
            default_role: "user".to_string(),
            roles: vec!["user".to_string(), "me".to_string()],
            disabled: false,
            email_verified: true,
            password_hash: None,
            metadata: serde_json::Value::Null,
        },
        Utc::now(),
    )
}

pub struct TestFlow {
    pub flow: PasswordlessEmailFlow,
    pub store: Arc<RecordingStore>,
    pub notifier: Arc<MockNotifier>,
}

pub fn flow_with(policy: PolicySet, store: RecordingStore, notifier: MockNotifier) -> TestFlow {
    let store = Arc::new(store);
    let notifier = Arc::new(notifier);
    let flow = PasswordlessEmailFlow::new(Arc::new(policy), store.clone(), notifier.clone());
    TestFlow {
        flow,
        store,
        notifier,
    }
}

pub fn flow(policy: PolicySet) -> TestFlow {
    flow_with(policy, RecordingStore::new(), MockNotifier::new())
}

pub fn test_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.service_name = "signin-service-test".to_string();
    config.jwt.secret = "test-secret-that-is-at-least-32-bytes-long".to_string();
    config
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<RecordingStore>,
    pub notifier: Arc<MockNotifier>,
}

impl TestApp {
    pub fn new(config: AuthConfig) -> Self {
        Self::with_store(config, RecordingStore::new())
    }

    pub fn with_store(config: AuthConfig, store: RecordingStore) -> Self {
        let store = Arc::new(store);
        let notifier = Arc::new(MockNotifier::new());
        let sessions = Arc::new(JwtService::new(&config.jwt).unwrap());

        let state = AppState::new(config, store.clone(), notifier.clone(), sessions);
        let router = build_router(state.clone());

        Self {
            router,
            state,
            store,
            notifier,
        }
    }
}
