//! Policy set - the operator's sign-in rules, frozen at startup.
//!
//! A `PolicySet` is built once from configuration and shared read-only (behind
//! an `Arc`) by every request. All lookups are pure.

pub mod redirect;

use chrono::Duration;

use crate::models::FlowType;
use crate::utils::gravatar;

/// Avatar defaults applied to newly provisioned identities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GravatarPolicy {
    pub enabled: bool,
    pub default: String,
    pub rating: String,
}

impl Default for GravatarPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            default: "blank".to_string(),
            rating: "g".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PolicySet {
    pub passwordless_email_enabled: bool,
    pub disable_signup: bool,
    pub disable_new_users: bool,
    pub allowed_emails: Vec<String>,
    pub allowed_email_domains: Vec<String>,
    /// Roles a request may ask for; also the grant for new identities that ask for none.
    pub allowed_roles: Vec<String>,
    pub default_role: String,
    pub allowed_locales: Vec<String>,
    pub default_locale: String,
    pub server_url: String,
    pub client_url: String,
    pub allowed_redirect_urls: Vec<String>,
    pub ticket_lifetime: Duration,
    pub gravatar: GravatarPolicy,
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            passwordless_email_enabled: true,
            disable_signup: false,
            disable_new_users: false,
            allowed_emails: Vec::new(),
            allowed_email_domains: Vec::new(),
            allowed_roles: vec!["user".to_string(), "me".to_string()],
            default_role: "user".to_string(),
            allowed_locales: vec!["en".to_string()],
            default_locale: "en".to_string(),
            server_url: "https://local.auth.nhost.run".to_string(),
            client_url: "http://localhost:3000".to_string(),
            allowed_redirect_urls: Vec::new(),
            ticket_lifetime: Duration::hours(1),
            gravatar: GravatarPolicy::default(),
        }
    }
}

impl PolicySet {
    pub fn is_flow_enabled(&self, flow: FlowType) -> bool {
        match flow {
            FlowType::PasswordlessEmail => self.passwordless_email_enabled,
            // Consumed elsewhere; issuance for these flows is not exposed here.
            FlowType::VerifyEmail | FlowType::PasswordReset | FlowType::EmailConfirmChange => {
                false
            }
        }
    }

    /// An email passes when no allowlist is configured, when it is listed, or
    /// when its domain is listed. Comparison ignores ASCII case.
    pub fn is_email_allowed(&self, email: &str) -> bool {
        if self.allowed_emails.is_empty() && self.allowed_email_domains.is_empty() {
            return true;
        }

        if self
            .allowed_emails
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(email))
        {
            return true;
        }

        match email.rsplit_once('@') {
            Some((_, domain)) => self
                .allowed_email_domains
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(domain)),
            None => false,
        }
    }

    pub fn is_role_allowed(&self, role: &str) -> bool {
        self.allowed_roles.iter().any(|r| r == role)
    }

    pub fn is_locale_allowed(&self, locale: &str) -> bool {
        self.allowed_locales.iter().any(|l| l == locale)
    }

    /// The client origin is always an allowed redirect target.
    pub fn is_redirect_allowed(&self, target: &str) -> bool {
        std::iter::once(&self.client_url)
            .chain(self.allowed_redirect_urls.iter())
            .any(|pattern| redirect::matches(pattern, target))
    }

    pub fn avatar_for(&self, email: &str) -> String {
        if !self.gravatar.enabled {
            return String::new();
        }
        gravatar::url(email, &self.gravatar.default, &self.gravatar.rating)
    }
}
