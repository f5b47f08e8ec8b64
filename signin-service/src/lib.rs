pub mod config;
pub mod db;
pub mod dtos;
pub mod flows;
pub mod handlers;
pub mod models;
pub mod policy;
pub mod services;
pub mod utils;

use service_core::axum::{
    extract::State,
    middleware::from_fn,
    routing::{get, post},
    Json, Router,
};
use service_core::error::AppError;
use service_core::middleware::tracing::request_id_middleware;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::AuthConfig;
use crate::flows::PasswordlessEmailFlow;
use crate::policy::PolicySet;
use crate::services::{IdentityStore, Notifier, SessionIssuer};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::signin::signin_passwordless_email,
        handlers::metrics::metrics,
    ),
    components(
        schemas(
            dtos::signin::SigninPasswordlessEmailRequest,
            dtos::signin::SignUpOptions,
            dtos::signin::OkResponse,
            dtos::ErrorResponse,
        )
    ),
    tags(
        (name = "Sign In", description = "Passwordless sign-in and sign-up"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthConfig>,
    pub policy: Arc<PolicySet>,
    pub store: Arc<dyn IdentityStore>,
    pub notifier: Arc<dyn Notifier>,
    pub sessions: Arc<dyn SessionIssuer>,
    pub passwordless_email: Arc<PasswordlessEmailFlow>,
}

impl AppState {
    /// Wire the flows over the given adapters. The policy is frozen here.
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn IdentityStore>,
        notifier: Arc<dyn Notifier>,
        sessions: Arc<dyn SessionIssuer>,
    ) -> Self {
        let policy = Arc::new(config.policy());

        let passwordless_email = Arc::new(
            PasswordlessEmailFlow::new(policy.clone(), store.clone(), notifier.clone())
                .with_request_timeout(config.request_timeout()),
        );

        Self {
            config: Arc::new(config),
            policy,
            store,
            notifier,
            sessions,
            passwordless_email,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route(
            "/.well-known/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .route(
            "/signin/passwordless/email",
            post(handlers::signin_passwordless_email),
        )
        .with_state(state)
        // Add tracing layer
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        // Add tracing middleware for request_id
        .layer(from_fn(request_id_middleware))
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Identity store health check failed");
        AppError::ServiceUnavailable("identity store unavailable".to_string())
    })?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "identity_store": "up"
        }
    })))
}
