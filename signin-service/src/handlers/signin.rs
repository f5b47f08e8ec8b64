use service_core::axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    dtos::signin::{OkResponse, SigninPasswordlessEmailRequest},
    flows::FlowError,
    utils::ValidatedJson,
    AppState,
};

/// Email a single-use sign-in link, creating the account on first contact
#[utoipa::path(
    post,
    path = "/signin/passwordless/email",
    request_body = SigninPasswordlessEmailRequest,
    responses(
        (status = 200, description = "Sign-in link sent", body = OkResponse),
        (status = 400, description = "Invalid request, role or redirect target", body = ErrorResponse),
        (status = 401, description = "Email not allowed or user disabled", body = ErrorResponse),
        (status = 403, description = "Sign up is disabled", body = ErrorResponse),
        (status = 409, description = "Endpoint disabled", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Sign In"
)]
pub async fn signin_passwordless_email(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SigninPasswordlessEmailRequest>,
) -> Result<impl IntoResponse, FlowError> {
    state.passwordless_email.execute(req).await?;
    Ok((StatusCode::OK, Json(OkResponse::Ok)))
}
