use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::dtos::ErrorResponse;

/// Outcome of a rejected or failed flow invocation.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("flow is administratively disabled")]
    FlowDisabled,

    #[error("email is not allowed")]
    CredentialsInvalid,

    #[error("requested role is not allowed")]
    RoleNotAllowed,

    #[error("default role is not among the allowed roles")]
    DefaultRoleNotAllowed,

    #[error("redirect target is not allowed")]
    RedirectNotAllowed,

    #[error("sign up is disabled")]
    SignupDisabled,

    #[error("identity is disabled")]
    UserDisabled,

    /// Infrastructure failure. The cause is logged, never returned.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl FlowError {
    pub fn error_code(&self) -> &'static str {
        match self {
            FlowError::FlowDisabled => "disabled-endpoint",
            FlowError::CredentialsInvalid => "invalid-email-password",
            FlowError::RoleNotAllowed => "role-not-allowed",
            FlowError::DefaultRoleNotAllowed => "default-role-must-be-in-allowed-roles",
            FlowError::RedirectNotAllowed => "redirecTo-not-allowed",
            FlowError::SignupDisabled => "signup-disabled",
            FlowError::UserDisabled => "disabled-user",
            FlowError::Internal(_) => "internal-server-error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            FlowError::FlowDisabled => StatusCode::CONFLICT,
            FlowError::CredentialsInvalid | FlowError::UserDisabled => StatusCode::UNAUTHORIZED,
            FlowError::RoleNotAllowed
            | FlowError::DefaultRoleNotAllowed
            | FlowError::RedirectNotAllowed => StatusCode::BAD_REQUEST,
            FlowError::SignupDisabled => StatusCode::FORBIDDEN,
            FlowError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FlowError::FlowDisabled => "This endpoint is disabled",
            FlowError::CredentialsInvalid => "Incorrect email or password",
            FlowError::RoleNotAllowed => "Role not allowed",
            FlowError::DefaultRoleNotAllowed => "Default role must be in allowed roles",
            FlowError::RedirectNotAllowed => r#"The value of "options.redirectTo" is not allowed."#,
            FlowError::SignupDisabled => "Sign up is disabled.",
            FlowError::UserDisabled => "User is disabled",
            FlowError::Internal(_) => "Internal server error",
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            status: self.status().as_u16(),
            error: self.error_code().to_string(),
            message: self.message().to_string(),
        }
    }
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_table() {
        let cases = [
            (FlowError::FlowDisabled, "disabled-endpoint", 409),
            (FlowError::CredentialsInvalid, "invalid-email-password", 401),
            (FlowError::RoleNotAllowed, "role-not-allowed", 400),
            (FlowError::DefaultRoleNotAllowed, "default-role-must-be-in-allowed-roles", 400),
            (FlowError::RedirectNotAllowed, "redirecTo-not-allowed", 400),
            (FlowError::SignupDisabled, "signup-disabled", 403),
            (FlowError::UserDisabled, "disabled-user", 401),
        ];

        for (error, code, status) in cases {
            let response = error.to_response();
            assert_eq!(response.error, code);
            assert_eq!(response.status, status);
            assert_eq!(response.message, error.message());
        }
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let error = FlowError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3"));
        let response = error.to_response();

        assert_eq!(response.status, 500);
        assert_eq!(response.error, "internal-server-error");
        assert_eq!(response.message, "Internal server error");
    }

    #[test]
    fn test_into_response_uses_status() {
        let response = FlowError::SignupDisabled.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
