use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use miette::IntoDiagnostic;
use serde_json::Value;

use crate::authz::engine;
use crate::authz::errors::AuthzError;
use crate::authz::types::{AuthzRequest, CheckRequest, CheckResponse};
use crate::authz::AuthzState;
use crate::settings::Settings;

pub fn router(state: Arc<AuthzState>) -> Router {
    Router::new()
        .route("/v1/check", post(handle_check))
        .route("/healthz", get(health))
        .with_state(state)
}

pub async fn serve(settings: &Settings, state: Arc<AuthzState>) -> miette::Result<()> {
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .map_err(|e| miette::miette!("bad listen address: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .into_diagnostic()?;
    tracing::info!(%addr, "Authorization decision API listening");
    axum::serve(listener, router(state))
        .await
        .into_diagnostic()?;
    Ok(())
}

async fn handle_check(
    State(state): State<Arc<AuthzState>>,
    Json(req): Json<CheckRequest>,
) -> impl IntoResponse {
    let method = match parse_method(&req.method) {
        Ok(m) => m,
        Err(e) => return e.into_response(),
    };
    let privileges = privilege_list(&req.privileges);

    let request = AuthzRequest {
        path: &req.path,
        method: &method,
        username: &req.username,
        privileges: &privileges,
        body: req.body.as_deref().map(str::as_bytes),
    };
    let status = req
        .authentication
        .then_authorize(|| engine::evaluate(&state, &request));

    Json(CheckResponse {
        allowed: status.is_success(),
        status,
    })
    .into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

fn parse_method(raw: &str) -> Result<Method, AuthzError> {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return Err(AuthzError::InvalidRequest("method is required".into()));
    }
    Method::from_bytes(upper.as_bytes())
        .map_err(|_| AuthzError::InvalidRequest(format!("invalid method `{raw}`")))
}

/// Privilege names from a JSON array of strings. Anything else, including an
/// array with non-string members, yields an empty list.
fn privilege_list(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}
