use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use axum::http::Method;
use serde_json::Value;

use crate::authz::routes::{normalize_path, RouteTable, RouteTarget};

/// Resources that must classify without rendering anything, because they are
/// consulted while a request is still being authenticated.
pub const WELL_KNOWN_RESOURCE_TYPES: &[(&str, &str)] = &[
    ("/redfish/v1/AccountService", "AccountService"),
    ("/redfish/v1/AccountService/Accounts", "ManagerAccountCollection"),
    ("/redfish/v1/AccountService/Accounts/{account_id}", "ManagerAccount"),
    ("/redfish/v1/SessionService", "SessionService"),
    ("/redfish/v1/SessionService/Sessions", "SessionCollection"),
    ("/redfish/v1/SessionService/Sessions/{session_id}", "Session"),
    ("/redfish/v1/Managers", "ManagerCollection"),
    ("/redfish/v1/Managers/{manager_id}", "Manager"),
    (
        "/redfish/v1/Managers/{manager_id}/EthernetInterfaces/{ethernet_interface_id}",
        "EthernetInterface",
    ),
];

/// Route pattern (or seeded concrete path) -> resource type.
///
/// Entries are never removed. Resolution of a pattern always yields the same
/// type, so concurrent misses at worst compute the same value twice.
#[derive(Debug, Default)]
pub struct ResourceTypeCache {
    entries: RwLock<HashMap<String, String>>,
}

impl ResourceTypeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_well_known() -> Self {
        Self::seeded(WELL_KNOWN_RESOURCE_TYPES.iter().copied())
    }

    pub fn seeded<I, K, V>(seeds: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries = seeds
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn insert(&self, key: impl Into<String>, resource_type: impl Into<String>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), resource_type.into());
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Classifies request paths into Redfish resource type names.
#[derive(Debug, Clone)]
pub struct ResourceTypeResolver {
    routes: Arc<RouteTable>,
    cache: Arc<ResourceTypeCache>,
}

impl ResourceTypeResolver {
    pub fn new(routes: Arc<RouteTable>, cache: Arc<ResourceTypeCache>) -> Self {
        Self { routes, cache }
    }

    pub fn cache(&self) -> &ResourceTypeCache {
        &self.cache
    }

    /// Resource type of `path`, or `None` when it cannot be determined
    /// (no route, method not allowed, handler failure, no `@odata.type`).
    pub fn resolve(&self, path: &str, method: &Method) -> Option<String> {
        let path = normalize_path(path);

        if let Some(resource_type) = self.cache.get(path) {
            return Some(resource_type);
        }

        let matched = match self.routes.match_path(path, method) {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(path, %method, error = %e, "Cannot classify path");
                return None;
            }
        };
        let pattern = matched.route.pattern();

        if let Some(resource_type) = self.cache.get(pattern) {
            return Some(resource_type);
        }

        let resource_type = match matched.route.target() {
            RouteTarget::Declared(resource_type) => resource_type.clone(),
            RouteTarget::Handler(handler) => {
                // Always rendered as a GET, whatever the request method is.
                let representation = match handler.get(path, &matched.params) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(path, %method, error = %e, "Resource handler failed while classifying path");
                        return None;
                    }
                };
                match odata_resource_type(&representation) {
                    Some(t) => t,
                    None => {
                        tracing::debug!(path, "Representation has no usable @odata.type");
                        return None;
                    }
                }
            }
        };

        self.cache.insert(pattern, resource_type.clone());
        tracing::info!(pattern, resource_type = %resource_type, "Cached resource type");
        Some(resource_type)
    }
}

/// `"#Manager.v1_14_0.Manager"` -> `"Manager"`.
pub fn odata_resource_type(representation: &Value) -> Option<String> {
    let odata_type = representation.get("@odata.type")?.as_str()?;
    if !odata_type.contains('#') {
        return None;
    }
    odata_type
        .rsplit('.')
        .next()
        .map(|t| t.trim_start_matches('#'))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::errors::AuthzError;
    use crate::authz::routes::{ResourceHandler, RouteParams};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Rendered {
        odata_type: &'static str,
        calls: AtomicUsize,
    }

    impl ResourceHandler for Rendered {
        fn get(&self, _path: &str, _params: &RouteParams) -> Result<Value, AuthzError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "@odata.type": self.odata_type }))
        }
    }

    fn resolver_with(handler: Arc<Rendered>) -> ResourceTypeResolver {
        let mut routes = RouteTable::new();
        routes
            .handle(
                "/redfish/v1/Chassis/{chassis_id}/Sensors/{sensor_id}",
                &[Method::GET, Method::PATCH],
                handler,
            )
            .unwrap();
        routes
            .declare("/redfish/v1/Chassis", &[Method::GET], "ChassisCollection")
            .unwrap();
        routes
            .handle(
                "/redfish/v1/Broken",
                &[Method::GET],
                Arc::new(|_: &str, _: &RouteParams| -> Result<Value, AuthzError> {
                    Err(AuthzError::Handler("sensor bus unavailable".into()))
                }),
            )
            .unwrap();
        ResourceTypeResolver::new(Arc::new(routes), Arc::new(ResourceTypeCache::new()))
    }

    fn sensor() -> Arc<Rendered> {
        Arc::new(Rendered {
            odata_type: "#Sensor.v1_7_0.Sensor",
            calls: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_odata_resource_type() {
        assert_eq!(
            odata_resource_type(&json!({ "@odata.type": "#Manager.v1_14_0.Manager" })),
            Some("Manager".to_string())
        );
        assert_eq!(
            odata_resource_type(&json!({ "@odata.type": "#ServiceRoot" })),
            Some("ServiceRoot".to_string())
        );
        assert_eq!(
            odata_resource_type(&json!({ "@odata.type": "Manager.v1_14_0.Manager" })),
            None
        );
        assert_eq!(odata_resource_type(&json!({ "Id": "1" })), None);
        assert_eq!(odata_resource_type(&json!({ "@odata.type": 7 })), None);
    }

    #[test]
    fn test_resolve_probes_once_per_pattern() {
        let handler = sensor();
        let resolver = resolver_with(handler.clone());

        let a = resolver.resolve("/redfish/v1/Chassis/1/Sensors/Temp1", &Method::GET);
        let b = resolver.resolve("/redfish/v1/Chassis/2/Sensors/Fan3", &Method::PATCH);
        assert_eq!(a.as_deref(), Some("Sensor"));
        assert_eq!(a, b);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            resolver
                .cache()
                .get("/redfish/v1/Chassis/{chassis_id}/Sensors/{sensor_id}")
                .as_deref(),
            Some("Sensor")
        );
    }

    #[test]
    fn test_resolve_declared_route() {
        let resolver = resolver_with(sensor());
        assert_eq!(
            resolver.resolve("/redfish/v1/Chassis/", &Method::GET).as_deref(),
            Some("ChassisCollection")
        );
    }

    #[test]
    fn test_resolve_failures_yield_none() {
        let resolver = resolver_with(sensor());
        assert!(resolver.resolve("/redfish/v1/Nowhere", &Method::GET).is_none());
        assert!(resolver.resolve("/redfish/v1/Chassis", &Method::DELETE).is_none());
        assert!(resolver.resolve("/redfish/v1/Broken", &Method::GET).is_none());
        assert!(resolver.cache().get("/redfish/v1/Broken").is_none());
    }

    #[test]
    fn test_seeded_path_bypasses_route_table() {
        let resolver = ResourceTypeResolver::new(
            Arc::new(RouteTable::new()),
            Arc::new(ResourceTypeCache::with_well_known()),
        );
        assert_eq!(
            resolver
                .resolve("/redfish/v1/SessionService/Sessions", &Method::POST)
                .as_deref(),
            Some("SessionCollection")
        );
    }

    #[test]
    fn test_seeded_pattern_skips_handler() {
        let handler = Arc::new(Rendered {
            odata_type: "#Bogus.v1_0_0.Bogus",
            calls: AtomicUsize::new(0),
        });
        let mut routes = RouteTable::new();
        routes
            .handle(
                "/redfish/v1/Managers/{manager_id}",
                &[Method::GET],
                handler.clone(),
            )
            .unwrap();
        let resolver = ResourceTypeResolver::new(
            Arc::new(routes),
            Arc::new(ResourceTypeCache::with_well_known()),
        );
        assert_eq!(
            resolver
                .resolve("/redfish/v1/Managers/BMC", &Method::GET)
                .as_deref(),
            Some("Manager")
        );
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cache_seeding() {
        let cache = ResourceTypeCache::seeded([("/redfish/v1/Chassis/Rack", "Chassis")]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("/redfish/v1/Chassis/Rack").as_deref(), Some("Chassis"));
        assert!(ResourceTypeCache::new().is_empty());
        assert_eq!(
            ResourceTypeCache::with_well_known().len(),
            WELL_KNOWN_RESOURCE_TYPES.len()
        );
    }
}
