use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use std::time::Duration;

use super::notifier::{Notifier, TemplateData, TemplateName};
use super::templates::EmailTemplates;
use super::DeliveryError;
use crate::config::SmtpConfig;

/// Notifier delivering rendered templates over SMTP.
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    sender: Mailbox,
    templates: EmailTemplates,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig, templates: EmailTemplates) -> Result<Self, anyhow::Error> {
        let sender: Mailbox = config
            .sender
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid SMTP sender {}: {}", config.sender, e))?;

        let builder = if config.secure {
            SmtpTransport::starttls_relay(&config.host)
                .map_err(|e| anyhow::anyhow!("Invalid SMTP relay {}: {}", config.host, e))?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        };

        let mut builder = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_seconds)));

        if !config.user.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ));
        }

        tracing::info!(
            host = %config.host,
            port = config.port,
            secure = config.secure,
            "SMTP notifier initialized"
        );

        Ok(Self {
            mailer: builder.build(),
            sender,
            templates,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[tracing::instrument(skip_all, fields(to = %to, locale = %locale, template = template.as_str()))]
    async fn send(
        &self,
        to: &str,
        locale: &str,
        template: TemplateName,
        data: &TemplateData,
    ) -> Result<(), DeliveryError> {
        let rendered = self.templates.render(locale, template, data).await?;

        let recipient: Mailbox = to
            .parse()
            .map_err(|e: lettre::address::AddressError| DeliveryError::Address(e.to_string()))?;

        let email = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(rendered.subject)
            .header(ContentType::TEXT_HTML)
            .body(rendered.body)
            .map_err(|e| DeliveryError::Template(e.to_string()))?;

        // SmtpTransport is blocking
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        match result {
            Ok(_) => {
                tracing::info!("Email sent successfully");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to send email");
                Err(DeliveryError::Transport(e.to_string()))
            }
        }
    }
}
