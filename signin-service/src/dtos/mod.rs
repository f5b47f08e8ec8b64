pub mod signin;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body shared by every sign-in endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    #[schema(example = 401)]
    pub status: u16,
    #[schema(example = "invalid-email-password")]
    pub error: String,
    #[schema(example = "Incorrect email or password")]
    pub message: String,
}

impl ErrorResponse {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            error: "invalid-request".to_string(),
            message: message.into(),
        }
    }
}
