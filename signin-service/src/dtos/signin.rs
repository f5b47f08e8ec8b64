use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Provisioning options. They only shape a newly created identity, except
/// `redirectTo`, which also applies to the emailed link for existing ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignUpOptions {
    #[schema(example = json!(["user", "me"]))]
    pub allowed_roles: Option<Vec<String>>,
    #[schema(example = "user")]
    pub default_role: Option<String>,
    #[schema(example = "Jane Doe")]
    pub display_name: Option<String>,
    #[schema(example = "en")]
    pub locale: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
    #[schema(example = "http://localhost:3000")]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SigninPasswordlessEmailRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "jane@acme.com")]
    pub email: String,

    pub options: Option<SignUpOptions>,
}

impl SigninPasswordlessEmailRequest {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            options: None,
        }
    }

    pub fn with_options(mut self, options: SignUpOptions) -> Self {
        self.options = Some(options);
        self
    }
}

/// Success acknowledgement, serialized as the JSON string `"OK"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OkResponse {
    #[serde(rename = "OK")]
    Ok,
}
