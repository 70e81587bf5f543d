pub mod ancestry;
pub mod engine;
pub mod errors;
pub mod registry;
pub mod resolver;
pub mod routes;
pub mod status;
pub mod types;
pub mod web;

use registry::PrivilegeRegistry;
use resolver::ResourceTypeResolver;
use types::UnknownResourcePolicy;

pub const DEFAULT_SERVICE_ROOT: &str = "/redfish/v1";

/// Everything an authorization decision consults.
/// Immutable after construction, except for the resolver's resource-type cache.
#[derive(Debug)]
pub struct AuthzState {
    pub registry: PrivilegeRegistry,
    pub resolver: ResourceTypeResolver,
    /// Prefix the ancestor walk stops at
    pub service_root: String,
    /// Decision for paths whose resource type is unknown or unregistered
    pub unknown_resource: UnknownResourcePolicy,
}

impl AuthzState {
    pub fn new(registry: PrivilegeRegistry, resolver: ResourceTypeResolver) -> Self {
        Self {
            registry,
            resolver,
            service_root: DEFAULT_SERVICE_ROOT.to_string(),
            unknown_resource: UnknownResourcePolicy::default(),
        }
    }

    pub fn with_service_root(mut self, service_root: impl Into<String>) -> Self {
        self.service_root = service_root.into();
        self
    }

    pub fn with_unknown_resource(mut self, policy: UnknownResourcePolicy) -> Self {
        self.unknown_resource = policy;
        self
    }
}
