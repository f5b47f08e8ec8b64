use chrono::Duration;
use serde::Deserialize;
use service_core::config::{self as core_config, LoadOptions};
use service_core::error::AppError;
use std::path::PathBuf;

use crate::policy::{GravatarPolicy, PolicySet};

/// Secret used when none is configured. Rejected in production.
pub const DEV_JWT_SECRET: &str = "signin-service-development-secret-change-me";

const LIST_KEYS: &[&str] = &[
    "signin.allowed_emails",
    "signin.allowed_email_domains",
    "signin.allowed_redirect_urls",
    "users.allowed_roles",
    "users.allowed_locales",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub port: u16,
    pub server_url: String,
    pub client_url: String,
    pub request_timeout_seconds: u64,
    pub templates_dir: Option<String>,
    pub signin: SigninConfig,
    pub users: UsersConfig,
    pub jwt: JwtConfig,
    pub database: Option<DatabaseConfig>,
    pub smtp: Option<SmtpConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SigninConfig {
    pub passwordless_email_enabled: bool,
    pub disable_signup: bool,
    pub disable_new_users: bool,
    pub allowed_emails: Vec<String>,
    pub allowed_email_domains: Vec<String>,
    pub allowed_redirect_urls: Vec<String>,
    pub ticket_lifetime_seconds: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UsersConfig {
    pub allowed_roles: Vec<String>,
    pub default_role: String,
    pub allowed_locales: Vec<String>,
    pub default_locale: String,
    pub gravatar_enabled: bool,
    pub gravatar_default: String,
    pub gravatar_rating: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub access_token_expiry_minutes: i64,
    pub refresh_token_expiry_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub sender: String,
    /// STARTTLS when true, plaintext otherwise.
    pub secure: bool,
    pub timeout_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Dev,
            service_name: "signin-service".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            port: 8080,
            server_url: "https://local.auth.nhost.run".to_string(),
            client_url: "http://localhost:3000".to_string(),
            request_timeout_seconds: 10,
            templates_dir: None,
            signin: SigninConfig::default(),
            users: UsersConfig::default(),
            jwt: JwtConfig::default(),
            database: None,
            smtp: None,
        }
    }
}

impl Default for SigninConfig {
    fn default() -> Self {
        Self {
            passwordless_email_enabled: true,
            disable_signup: false,
            disable_new_users: false,
            allowed_emails: Vec::new(),
            allowed_email_domains: Vec::new(),
            allowed_redirect_urls: Vec::new(),
            ticket_lifetime_seconds: 3600,
        }
    }
}

impl Default for UsersConfig {
    fn default() -> Self {
        let gravatar = GravatarPolicy::default();
        Self {
            allowed_roles: vec!["user".to_string(), "me".to_string()],
            default_role: "user".to_string(),
            allowed_locales: vec!["en".to_string()],
            default_locale: "en".to_string(),
            gravatar_enabled: gravatar.enabled,
            gravatar_default: gravatar.default,
            gravatar_rating: gravatar.rating,
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEV_JWT_SECRET.to_string(),
            issuer: "signin-service".to_string(),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 30,
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 587,
            user: String::new(),
            password: String::new(),
            sender: String::new(),
            secure: true,
            timeout_seconds: 5,
        }
    }
}

impl AuthConfig {
    /// Load from defaults, `configuration.*` and `AUTH__*` variables, then validate.
    pub fn load() -> Result<Self, AppError> {
        Self::load_with_prefix("AUTH")
    }

    pub fn load_with_prefix(prefix: &str) -> Result<Self, AppError> {
        let options = LoadOptions::new(prefix).with_list_keys(LIST_KEYS);
        let config: AuthConfig = core_config::load(&options)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.port == 0 {
            return Err(config_error("PORT must be greater than 0"));
        }

        for (name, value) in [("SERVER_URL", &self.server_url), ("CLIENT_URL", &self.client_url)] {
            url::Url::parse(value)
                .map_err(|e| config_error(&format!("{} is not a valid URL: {}", name, e)))?;
        }

        for pattern in &self.signin.allowed_redirect_urls {
            url::Url::parse(&pattern.replace('*', "wildcard")).map_err(|e| {
                config_error(&format!("Invalid allowed redirect URL {}: {}", pattern, e))
            })?;
        }

        if self.request_timeout_seconds == 0 {
            return Err(config_error("REQUEST_TIMEOUT_SECONDS must be positive"));
        }

        // A send outliving the request deadline is not cancelled.
        if let Some(smtp) = &self.smtp {
            if smtp.timeout_seconds >= self.request_timeout_seconds {
                return Err(config_error(
                    "SMTP__TIMEOUT_SECONDS must be less than REQUEST_TIMEOUT_SECONDS",
                ));
            }
        }

        if self.signin.ticket_lifetime_seconds <= 0 {
            return Err(config_error("SIGNIN__TICKET_LIFETIME_SECONDS must be positive"));
        }

        if self.jwt.access_token_expiry_minutes <= 0 {
            return Err(config_error("JWT__ACCESS_TOKEN_EXPIRY_MINUTES must be positive"));
        }

        if self.jwt.refresh_token_expiry_days <= 0 {
            return Err(config_error("JWT__REFRESH_TOKEN_EXPIRY_DAYS must be positive"));
        }

        if !self.users.allowed_roles.contains(&self.users.default_role) {
            return Err(config_error("USERS__DEFAULT_ROLE must be one of USERS__ALLOWED_ROLES"));
        }

        if !self.users.allowed_locales.contains(&self.users.default_locale) {
            return Err(config_error(
                "USERS__DEFAULT_LOCALE must be one of USERS__ALLOWED_LOCALES",
            ));
        }

        // In production, ensure stricter validation
        if self.environment == Environment::Prod {
            if self.jwt.secret.len() < 32 || self.jwt.secret == DEV_JWT_SECRET {
                return Err(config_error(
                    "JWT__SECRET must be set to at least 32 bytes in production",
                ));
            }

            if self.database.is_none() {
                return Err(config_error("DATABASE__URL is required in production"));
            }

            if self.smtp.is_none() {
                return Err(config_error("SMTP__HOST is required in production"));
            }
        }

        Ok(())
    }

    /// Immutable policy snapshot shared by every request.
    pub fn policy(&self) -> PolicySet {
        PolicySet {
            passwordless_email_enabled: self.signin.passwordless_email_enabled,
            disable_signup: self.signin.disable_signup,
            disable_new_users: self.signin.disable_new_users,
            allowed_emails: self.signin.allowed_emails.clone(),
            allowed_email_domains: self.signin.allowed_email_domains.clone(),
            allowed_roles: self.users.allowed_roles.clone(),
            default_role: self.users.default_role.clone(),
            allowed_locales: self.users.allowed_locales.clone(),
            default_locale: self.users.default_locale.clone(),
            server_url: self.server_url.trim_end_matches('/').to_string(),
            client_url: self.client_url.clone(),
            allowed_redirect_urls: self.signin.allowed_redirect_urls.clone(),
            ticket_lifetime: Duration::seconds(self.signin.ticket_lifetime_seconds),
            gravatar: GravatarPolicy {
                enabled: self.users.gravatar_enabled,
                default: self.users.gravatar_default.clone(),
                rating: self.users.gravatar_rating.clone(),
            },
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn templates_path(&self) -> Option<PathBuf> {
        self.templates_dir.as_ref().map(PathBuf::from)
    }
}

fn config_error(message: &str) -> AppError {
    AppError::ConfigError(anyhow::anyhow!(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AuthConfig::default();
        assert!(config.validate().is_ok());

        let policy = config.policy();
        assert!(policy.passwordless_email_enabled);
        assert_eq!(policy.allowed_roles, vec!["user", "me"]);
        assert_eq!(policy.default_role, "user");
        assert_eq!(policy.default_locale, "en");
        assert_eq!(policy.client_url, "http://localhost:3000");
        assert_eq!(policy.server_url, "https://local.auth.nhost.run");
        assert_eq!(policy.ticket_lifetime, Duration::hours(1));
    }

    #[test]
    fn test_default_role_must_be_allowed() {
        let mut config = AuthConfig::default();
        config.users.default_role = "admin".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_locale_must_be_allowed() {
        let mut config = AuthConfig::default();
        config.users.default_locale = "fr".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_urls_are_rejected() {
        let mut config = AuthConfig::default();
        config.client_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = AuthConfig::default();
        config.signin.allowed_redirect_urls = vec!["https://*.example.com".to_string()];
        assert!(config.validate().is_ok());
        config.signin.allowed_redirect_urls.push("::".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_lifetimes_are_rejected() {
        let mut config = AuthConfig::default();
        config.signin.ticket_lifetime_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = AuthConfig::default();
        config.request_timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_smtp_timeout_must_fit_request_deadline() {
        let mut config = AuthConfig {
            smtp: Some(SmtpConfig::default()),
            ..AuthConfig::default()
        };
        assert!(config.validate().is_ok());

        if let Some(smtp) = config.smtp.as_mut() {
            smtp.timeout_seconds = config.request_timeout_seconds;
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prod_requires_secret_database_and_smtp() {
        let mut config = AuthConfig {
            environment: Environment::Prod,
            ..AuthConfig::default()
        };
        assert!(config.validate().is_err());

        config.jwt.secret = "a-production-secret-of-sufficient-length".to_string();
        assert!(config.validate().is_err());

        config.database = Some(DatabaseConfig {
            url: "postgres://localhost/auth".to_string(),
            ..DatabaseConfig::default()
        });
        assert!(config.validate().is_err());

        config.smtp = Some(SmtpConfig {
            host: "smtp.example.com".to_string(),
            sender: "no-reply@example.com".to_string(),
            ..SmtpConfig::default()
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_reads_prefixed_environment() {
        std::env::set_var("SIGNIN_CFG_TEST__PORT", "9090");
        std::env::set_var("SIGNIN_CFG_TEST__SIGNIN__DISABLE_SIGNUP", "true");
        std::env::set_var(
            "SIGNIN_CFG_TEST__SIGNIN__ALLOWED_EMAILS",
            "jane@acme.com,john@acme.com",
        );

        let config = AuthConfig::load_with_prefix("SIGNIN_CFG_TEST").unwrap();
        assert_eq!(config.port, 9090);
        assert!(config.signin.disable_signup);
        assert_eq!(config.signin.allowed_emails, vec!["jane@acme.com", "john@acme.com"]);
        assert_eq!(config.users.default_role, "user");
        assert!(config.database.is_none());
    }
}
