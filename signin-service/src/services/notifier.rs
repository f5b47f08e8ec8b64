//! Notification port: templated messages to an address in a locale.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Mutex;

use super::DeliveryError;
use crate::models::{FlowType, Ticket};

/// Message templates known to the notifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateName {
    SigninPasswordless,
}

impl TemplateName {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateName::SigninPasswordless => "signin-passwordless",
        }
    }
}

/// Fields available to every template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateData {
    pub link: String,
    pub display_name: String,
    pub email: String,
    pub new_email: String,
    pub ticket: String,
    pub redirect_to: String,
    pub locale: String,
    pub server_url: String,
    pub client_url: String,
}

impl TemplateData {
    /// `(placeholder, value)` pairs for `${name}` substitution.
    pub fn placeholders(&self) -> [(&'static str, &str); 9] {
        [
            ("link", &self.link),
            ("displayName", &self.display_name),
            ("email", &self.email),
            ("newEmail", &self.new_email),
            ("ticket", &self.ticket),
            ("redirectTo", &self.redirect_to),
            ("locale", &self.locale),
            ("serverUrl", &self.server_url),
            ("clientUrl", &self.client_url),
        ]
    }
}

/// `<server>/verify?redirectTo=..&ticket=..&type=..` with each value percent-encoded.
pub fn build_link(server_url: &str, flow: FlowType, ticket: &Ticket, redirect_to: &str) -> String {
    format!(
        "{}/verify?redirectTo={}&ticket={}&type={}",
        server_url.trim_end_matches('/'),
        urlencoding::encode(redirect_to),
        urlencoding::encode(&ticket.render()),
        urlencoding::encode(flow.as_str()),
    )
}

/// Delivery port. Dropping a pending `send` does not recall a message the
/// adapter already handed to its transport, so a request that times out may
/// still deliver its email.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        to: &str,
        locale: &str,
        template: TemplateName,
        data: &TemplateData,
    ) -> Result<(), DeliveryError>;
}

/// A delivery captured by `MockNotifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: String,
    pub locale: String,
    pub template: TemplateName,
    pub data: TemplateData,
}

/// Records messages instead of delivering them. Used when no SMTP relay is
/// configured and by tests.
#[derive(Default)]
pub struct MockNotifier {
    sent: Mutex<Vec<SentMessage>>,
    fail: bool,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails with a transport error.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(
        &self,
        to: &str,
        locale: &str,
        template: TemplateName,
        data: &TemplateData,
    ) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Transport("mock transport unavailable".to_string()));
        }

        tracing::info!(
            to = %to,
            locale = %locale,
            template = template.as_str(),
            "Notification recorded (no SMTP relay configured)"
        );

        self.sent
            .lock()
            .map_err(|e| DeliveryError::Transport(format!("Notifier lock poisoned: {}", e)))?
            .push(SentMessage {
                to: to.to_string(),
                locale: locale.to_string(),
                template,
                data: data.clone(),
            });
        Ok(())
    }
}
