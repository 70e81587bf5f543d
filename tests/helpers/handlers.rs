use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use redfish_authz::authz::errors::AuthzError;
use redfish_authz::authz::routes::{ResourceHandler, RouteParams};
use serde_json::{json, Value};

/// Renders a fixed `@odata.type` and counts how often it was asked to.
pub struct ODataHandler {
    odata_type: String,
    calls: AtomicUsize,
}

impl ODataHandler {
    pub fn new(odata_type: &str) -> Arc<Self> {
        Arc::new(Self {
            odata_type: odata_type.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResourceHandler for ODataHandler {
    fn get(&self, path: &str, params: &RouteParams) -> Result<Value, AuthzError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "@odata.id": path,
            "@odata.type": self.odata_type,
            "Id": params.values().next().cloned().unwrap_or_default(),
        }))
    }
}

/// Always fails, like a handler whose backing data is unreachable.
pub struct FailingHandler;

impl ResourceHandler for FailingHandler {
    fn get(&self, path: &str, _params: &RouteParams) -> Result<Value, AuthzError> {
        Err(AuthzError::Handler(format!("no backend for {path}")))
    }
}
