//! Passwordless email sign-in: validate, find or provision the identity,
//! persist a fresh ticket, then email the link carrying it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::steps::{
    DefaultRoleInRoles, EmailAllowed, FlowEnabled, LocaleResolved, RedirectAllowed, RolesAllowed,
    SignupContext,
};
use super::{Acknowledged, FlowError, Outcome, Pipeline};
use crate::dtos::signin::SigninPasswordlessEmailRequest;
use crate::models::{FlowType, Identity, NewIdentity, Ticket};
use crate::policy::PolicySet;
use crate::services::metrics;
use crate::services::{build_link, IdentityStore, Notifier, TemplateData, TemplateName};

const FLOW: FlowType = FlowType::PasswordlessEmail;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PasswordlessEmailFlow {
    policy: Arc<PolicySet>,
    store: Arc<dyn IdentityStore>,
    notifier: Arc<dyn Notifier>,
    pipeline: Pipeline<SignupContext>,
    request_timeout: Duration,
}

impl PasswordlessEmailFlow {
    pub fn new(
        policy: Arc<PolicySet>,
        store: Arc<dyn IdentityStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            policy,
            store,
            notifier,
            pipeline: Self::pipeline(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Validation order for this flow.
    pub fn pipeline() -> Pipeline<SignupContext> {
        Pipeline::new()
            .step(FlowEnabled(FLOW))
            .step(EmailAllowed)
            .step(RolesAllowed)
            .step(DefaultRoleInRoles)
            .step(LocaleResolved)
            .step(RedirectAllowed)
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub async fn execute(&self, request: SigninPasswordlessEmailRequest) -> Outcome {
        self.execute_until(request, Instant::now() + self.request_timeout)
            .await
    }

    /// Run the flow; every port call must finish before `deadline`.
    #[tracing::instrument(skip_all, fields(flow = FLOW.as_str(), email = %request.email))]
    pub async fn execute_until(
        &self,
        request: SigninPasswordlessEmailRequest,
        deadline: Instant,
    ) -> Outcome {
        let outcome = self.run(request, deadline).await;

        let label = match &outcome {
            Ok(_) => "ok",
            Err(e) => e.error_code(),
        };
        metrics::record_flow_outcome(FLOW.as_str(), label);

        outcome
    }

    async fn run(&self, request: SigninPasswordlessEmailRequest, deadline: Instant) -> Outcome {
        let mut ctx = SignupContext::new(request.email, request.options);
        self.pipeline.run(&self.policy, &mut ctx)?;

        let existing = port_call(deadline, "find_by_email", self.store.find_by_email(&ctx.email)).await?;

        let identity = match existing {
            Some(identity) if identity.disabled => {
                tracing::warn!(user_id = %identity.id, "Sign-in attempt for disabled identity");
                return Err(FlowError::UserDisabled);
            }
            Some(identity) => identity,
            None => self.provision(&ctx, deadline).await?,
        };

        let ticket = Ticket::issue(FLOW, self.policy.ticket_lifetime);
        port_call(
            deadline,
            "set_pending_ticket",
            self.store.set_pending_ticket(identity.id, &ticket),
        )
        .await?;

        tracing::info!(
            user_id = %identity.id,
            expires_at = %ticket.expires_at,
            "Ticket issued"
        );

        self.notify(&identity, &ctx, &ticket, deadline).await?;

        Ok(Acknowledged)
    }

    async fn provision(&self, ctx: &SignupContext, deadline: Instant) -> Result<Identity, FlowError> {
        if self.policy.disable_signup {
            tracing::warn!("Sign up is disabled");
            return Err(FlowError::SignupDisabled);
        }

        let display_name = ctx
            .options
            .display_name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| ctx.email.clone());

        let metadata = ctx
            .options
            .metadata
            .clone()
            .map(serde_json::Value::Object)
            .unwrap_or(serde_json::Value::Null);

        let new = NewIdentity {
            email: ctx.email.clone(),
            display_name,
            avatar_url: self.policy.avatar_for(&ctx.email),
            locale: ctx.locale.clone(),
            default_role: ctx.default_role.clone(),
            roles: ctx.roles.clone(),
            disabled: self.policy.disable_new_users,
            email_verified: false,
            password_hash: None,
            metadata,
        };

        let identity = port_call(deadline, "create", self.store.create(new)).await?;
        tracing::info!(user_id = %identity.id, "Identity created");

        if identity.disabled {
            tracing::warn!(user_id = %identity.id, "New identities are created disabled");
            return Err(FlowError::UserDisabled);
        }

        Ok(identity)
    }

    async fn notify(
        &self,
        identity: &Identity,
        ctx: &SignupContext,
        ticket: &Ticket,
        deadline: Instant,
    ) -> Result<(), FlowError> {
        let to = identity.email.clone().unwrap_or_else(|| ctx.email.clone());
        let locale = if identity.locale.is_empty() {
            self.policy.default_locale.clone()
        } else {
            identity.locale.clone()
        };

        let data = TemplateData {
            link: build_link(&self.policy.server_url, FLOW, ticket, &ctx.redirect_to),
            display_name: identity.display_name.clone(),
            email: to.clone(),
            new_email: String::new(),
            ticket: ticket.render(),
            redirect_to: ctx.redirect_to.clone(),
            locale: locale.clone(),
            server_url: self.policy.server_url.clone(),
            client_url: self.policy.client_url.clone(),
        };

        port_call(
            deadline,
            "send",
            self.notifier
                .send(&to, &locale, TemplateName::SigninPasswordless, &data),
        )
        .await?;

        tracing::info!(user_id = %identity.id, locale = %locale, "Sign-in link sent");
        Ok(())
    }
}

/// Await a port call within the request deadline. Failures and expiry both
/// become `Internal`.
async fn port_call<T, E, F>(deadline: Instant, operation: &'static str, call: F) -> Result<T, FlowError>
where
    F: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    match tokio::time::timeout_at(deadline, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            tracing::error!(operation, error = %e, "Port call failed");
            Err(FlowError::Internal(anyhow::Error::new(e).context(operation)))
        }
        Err(_) => {
            tracing::error!(operation, "Port call exceeded the request deadline");
            Err(FlowError::Internal(anyhow::anyhow!(
                "{} exceeded the request deadline",
                operation
            )))
        }
    }
}
