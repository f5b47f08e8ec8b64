//! Email template lookup and rendering.
//!
//! Templates live at `<dir>/<locale>/<template>/{subject.txt,body.html}` and
//! use `${name}` placeholders. Lookup falls back from the requested locale to
//! the default locale, then to the built-in English text.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::notifier::{TemplateData, TemplateName};
use super::DeliveryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct EmailTemplates {
    dir: Option<PathBuf>,
    default_locale: String,
}

impl EmailTemplates {
    pub fn new(dir: Option<PathBuf>, default_locale: impl Into<String>) -> Self {
        Self {
            dir,
            default_locale: default_locale.into(),
        }
    }

    /// Built-in templates only.
    pub fn builtin() -> Self {
        Self::new(None, "en")
    }

    pub async fn render(
        &self,
        locale: &str,
        template: TemplateName,
        data: &TemplateData,
    ) -> Result<RenderedEmail, DeliveryError> {
        let (subject, body) = match self.load(locale, template).await? {
            Some(found) => found,
            None => builtin(template),
        };

        Ok(RenderedEmail {
            subject: substitute(subject.trim(), data),
            body: substitute(&body, data),
        })
    }

    async fn load(
        &self,
        locale: &str,
        template: TemplateName,
    ) -> Result<Option<(String, String)>, DeliveryError> {
        let dir = match &self.dir {
            Some(dir) => dir,
            None => return Ok(None),
        };

        for candidate in [locale, self.default_locale.as_str()] {
            let base = dir.join(candidate).join(template.as_str());
            if let Some(found) = read_pair(&base).await? {
                return Ok(Some(found));
            }
            tracing::debug!(
                locale = %candidate,
                template = template.as_str(),
                "Template not found, falling back"
            );
        }
        Ok(None)
    }
}

async fn read_pair(base: &Path) -> Result<Option<(String, String)>, DeliveryError> {
    let subject = match read_optional(&base.join("subject.txt")).await? {
        Some(subject) => subject,
        None => return Ok(None),
    };
    let body = match read_optional(&base.join("body.html")).await? {
        Some(body) => body,
        None => return Ok(None),
    };
    Ok(Some((subject, body)))
}

async fn read_optional(path: &Path) -> Result<Option<String>, DeliveryError> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(DeliveryError::Template(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn substitute(text: &str, data: &TemplateData) -> String {
    data.placeholders()
        .iter()
        .fold(text.to_string(), |acc, (name, value)| {
            acc.replace(&format!("${{{}}}", name), value)
        })
}

fn builtin(template: TemplateName) -> (String, String) {
    let (subject, heading, action) = match template {
        TemplateName::SigninPasswordless => ("Secure sign-in link", "Sign in", "Sign in"),
    };

    let body = format!(
        r###"<html>
  <body style="font-family: Arial, sans-serif;">
    <h2>{heading}</h2>
    <p>Hi ${{displayName}}, use the link below to continue.</p>
    <p>
      <a href="${{link}}" style="background-color: #2196F3; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">{action}</a>
    </p>
    <p style="color: #666; font-size: 12px;">If you didn't request this, please ignore this email.</p>
  </body>
</html>
"###
    );

    (subject.to_string(), body)
}
