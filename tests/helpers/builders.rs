use std::path::Path;
use std::sync::Arc;

use axum::http::Method;
use redfish_authz::authz::engine;
use redfish_authz::authz::registry::{load_registry, parse_registry, PrivilegeRegistry};
use redfish_authz::authz::resolver::{ResourceTypeCache, ResourceTypeResolver};
use redfish_authz::authz::routes::{ResourceHandler, RouteTable};
use redfish_authz::authz::types::{AuthzRequest, UnknownResourcePolicy};
use redfish_authz::authz::AuthzState;

pub const ALL_METHODS: [Method; 6] = [
    Method::GET,
    Method::HEAD,
    Method::PATCH,
    Method::POST,
    Method::PUT,
    Method::DELETE,
];

/// The registry document shipped in `etc/`.
pub fn shipped_registry() -> PrivilegeRegistry {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("etc/Redfish_1.6.0_PrivilegeRegistry.json");
    load_registry(&path).expect("Failed to load shipped registry")
}

/// Builder for an [`AuthzState`] backed by a test route table
pub struct StateBuilder {
    routes: RouteTable,
    cache: ResourceTypeCache,
    registry: Option<PrivilegeRegistry>,
    unknown_resource: UnknownResourcePolicy,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            routes: RouteTable::new(),
            cache: ResourceTypeCache::new(),
            registry: None,
            unknown_resource: UnknownResourcePolicy::Allow,
        }
    }

    /// Well-known seeds plus declared routes for them
    pub fn with_well_known(mut self) -> Self {
        self.cache = ResourceTypeCache::with_well_known();
        for (pattern, resource_type) in redfish_authz::authz::resolver::WELL_KNOWN_RESOURCE_TYPES {
            self.routes
                .declare(pattern, &ALL_METHODS, resource_type)
                .expect("Failed to declare well-known route");
        }
        self
    }

    pub fn declare(mut self, pattern: &str, resource_type: &str) -> Self {
        self.routes
            .declare(pattern, &ALL_METHODS, resource_type)
            .expect("Failed to declare route");
        self
    }

    pub fn handle(mut self, pattern: &str, handler: Arc<dyn ResourceHandler>) -> Self {
        self.routes
            .handle(pattern, &ALL_METHODS, handler)
            .expect("Failed to register handler");
        self
    }

    pub fn registry_json(mut self, source: &str) -> Self {
        self.registry = Some(parse_registry(source).expect("Failed to parse registry"));
        self
    }

    pub fn unknown_resource(mut self, policy: UnknownResourcePolicy) -> Self {
        self.unknown_resource = policy;
        self
    }

    pub fn build(self) -> AuthzState {
        let registry = self.registry.unwrap_or_else(shipped_registry);
        let resolver = ResourceTypeResolver::new(Arc::new(self.routes), Arc::new(self.cache));
        AuthzState::new(registry, resolver).with_unknown_resource(self.unknown_resource)
    }
}

/// One decision against `state`.
pub fn check(
    state: &AuthzState,
    method: Method,
    path: &str,
    username: &str,
    privileges: &[&str],
    body: Option<&str>,
) -> bool {
    let privileges: Vec<String> = privileges.iter().map(|p| p.to_string()).collect();
    engine::evaluate(
        state,
        &AuthzRequest {
            path,
            method: &method,
            username,
            privileges: &privileges,
            body: body.map(str::as_bytes),
        },
    )
}
