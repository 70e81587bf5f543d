use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("Failed to load privilege registry `{path}`")]
    #[diagnostic(
        code(redfish_authz::registry_load),
        help("Check that the file exists and is readable")
    )]
    RegistryLoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Privilege registry parse error: {0}")]
    #[diagnostic(
        code(redfish_authz::registry_parse),
        help("The registry must be a DMTF Privilege Registry JSON document with a `Mappings` array")
    )]
    RegistryParse(String),

    #[error("Invalid privilege registry: {0}")]
    #[diagnostic(
        code(redfish_authz::invalid_registry),
        help("Each mapping needs a unique, non-empty `Entity` naming a Redfish resource type")
    )]
    InvalidRegistry(String),

    #[error("Invalid route: {0}")]
    #[diagnostic(
        code(redfish_authz::invalid_route),
        help("Route patterns are absolute paths; use {{name}} for a variable segment (e.g. /redfish/v1/Managers/{{manager_id}})")
    )]
    InvalidRoute(String),

    #[error("No route matches `{path}`")]
    #[diagnostic(code(redfish_authz::route_not_found))]
    RouteNotFound { path: String },

    #[error("Method {method} is not allowed on `{path}`")]
    #[diagnostic(code(redfish_authz::method_not_allowed))]
    MethodNotAllowed { path: String, method: String },

    #[error("Resource handler failed: {0}")]
    #[diagnostic(code(redfish_authz::handler))]
    Handler(String),

    #[error("Invalid request: {0}")]
    #[diagnostic(code(redfish_authz::invalid_request))]
    InvalidRequest(String),
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthzError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AuthzError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            AuthzError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
