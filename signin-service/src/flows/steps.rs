//! Policy steps shared by flows that may provision an identity.

use super::{FlowError, Step};
use crate::dtos::signin::SignUpOptions;
use crate::models::FlowType;
use crate::policy::PolicySet;

/// Request state validated, and resolved, by the sign-up steps.
///
/// The resolved fields start unset and are filled in by the steps, so after a
/// successful run they always hold values the policy accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct SignupContext {
    pub email: String,
    pub options: SignUpOptions,
    pub roles: Vec<String>,
    pub default_role: String,
    pub locale: String,
    pub redirect_to: String,
}

impl SignupContext {
    pub fn new(email: impl Into<String>, options: Option<SignUpOptions>) -> Self {
        Self {
            email: email.into(),
            options: options.unwrap_or_default(),
            roles: Vec::new(),
            default_role: String::new(),
            locale: String::new(),
            redirect_to: String::new(),
        }
    }
}

pub struct FlowEnabled(pub FlowType);

impl Step<SignupContext> for FlowEnabled {
    fn name(&self) -> &'static str {
        "flow_enabled"
    }

    fn check(&self, policy: &PolicySet, _ctx: &mut SignupContext) -> Result<(), FlowError> {
        if policy.is_flow_enabled(self.0) {
            Ok(())
        } else {
            Err(FlowError::FlowDisabled)
        }
    }
}

/// Rejects with the generic credentials error so callers cannot tell an
/// unlisted email from a wrong password.
pub struct EmailAllowed;

impl Step<SignupContext> for EmailAllowed {
    fn name(&self) -> &'static str {
        "email_allowed"
    }

    fn check(&self, policy: &PolicySet, ctx: &mut SignupContext) -> Result<(), FlowError> {
        if policy.is_email_allowed(&ctx.email) {
            Ok(())
        } else {
            Err(FlowError::CredentialsInvalid)
        }
    }
}

/// Requested roles must all be allowed. No request (or an empty one) grants
/// the configured set.
pub struct RolesAllowed;

impl Step<SignupContext> for RolesAllowed {
    fn name(&self) -> &'static str {
        "roles_allowed"
    }

    fn check(&self, policy: &PolicySet, ctx: &mut SignupContext) -> Result<(), FlowError> {
        let requested = match ctx.options.allowed_roles.as_deref() {
            Some(roles) if !roles.is_empty() => roles,
            _ => {
                ctx.roles = policy.allowed_roles.clone();
                return Ok(());
            }
        };

        if let Some(role) = requested.iter().find(|r| !policy.is_role_allowed(r)) {
            tracing::warn!(role = %role, "Requested role not allowed");
            return Err(FlowError::RoleNotAllowed);
        }

        let mut roles: Vec<String> = Vec::with_capacity(requested.len());
        for role in requested {
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }
        ctx.roles = roles;
        Ok(())
    }
}

/// Runs after [`RolesAllowed`]: the default role must be one of the resolved roles.
pub struct DefaultRoleInRoles;

impl Step<SignupContext> for DefaultRoleInRoles {
    fn name(&self) -> &'static str {
        "default_role_in_roles"
    }

    fn check(&self, policy: &PolicySet, ctx: &mut SignupContext) -> Result<(), FlowError> {
        let default_role = ctx
            .options
            .default_role
            .clone()
            .unwrap_or_else(|| policy.default_role.clone());

        if !ctx.roles.contains(&default_role) {
            return Err(FlowError::DefaultRoleNotAllowed);
        }

        ctx.default_role = default_role;
        Ok(())
    }
}

/// Never rejects: an unknown locale is replaced with the default one.
pub struct LocaleResolved;

impl Step<SignupContext> for LocaleResolved {
    fn name(&self) -> &'static str {
        "locale_resolved"
    }

    fn check(&self, policy: &PolicySet, ctx: &mut SignupContext) -> Result<(), FlowError> {
        ctx.locale = match ctx.options.locale.as_deref() {
            Some(locale) if policy.is_locale_allowed(locale) => locale.to_string(),
            Some(locale) => {
                tracing::warn!(
                    locale = %locale,
                    default_locale = %policy.default_locale,
                    "Locale not allowed, using default"
                );
                policy.default_locale.clone()
            }
            None => policy.default_locale.clone(),
        };
        Ok(())
    }
}

/// An absent redirect target resolves to the client origin.
pub struct RedirectAllowed;

impl Step<SignupContext> for RedirectAllowed {
    fn name(&self) -> &'static str {
        "redirect_allowed"
    }

    fn check(&self, policy: &PolicySet, ctx: &mut SignupContext) -> Result<(), FlowError> {
        ctx.redirect_to = match ctx.options.redirect_to.as_deref() {
            Some(target) if policy.is_redirect_allowed(target) => target.to_string(),
            Some(_) => return Err(FlowError::RedirectNotAllowed),
            None => policy.client_url.clone(),
        };
        Ok(())
    }
}
