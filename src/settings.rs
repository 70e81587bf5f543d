use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use axum::http::Method;

use crate::authz::errors::AuthzError;
use crate::authz::resolver::{ResourceTypeCache, WELL_KNOWN_RESOURCE_TYPES};
use crate::authz::routes::RouteTable;
use crate::authz::types::UnknownResourcePolicy;
use crate::authz::DEFAULT_SERVICE_ROOT;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub registry: Registry,
    #[serde(default)]
    pub authz: Authz,
    /// Static resource-type declarations for the service's routes
    #[serde(default)]
    pub routes: Vec<RouteSetting>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    /// DMTF Privilege Registry JSON document
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authz {
    /// Prefix the ancestor walk stops at
    #[serde(default = "default_service_root")]
    pub service_root: String,
    /// Decision when a path's resource type is unknown or unregistered
    #[serde(default)]
    pub unknown_resource: UnknownResourcePolicy,
    /// Pre-seed the resource-type cache with the account/session/manager resources
    #[serde(default = "default_seed_well_known")]
    pub seed_well_known: bool,
    /// Extra (path or pattern, resource type) seeds
    #[serde(default)]
    pub seeds: Vec<SeedSetting>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedSetting {
    pub path: String,
    pub resource_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSetting {
    /// e.g. /redfish/v1/Chassis/{chassis_id}
    pub pattern: String,
    pub resource_type: String,
    #[serde(default = "default_route_methods")]
    pub methods: Vec<String>,
}

fn default_service_root() -> String {
    DEFAULT_SERVICE_ROOT.to_string()
}

fn default_seed_well_known() -> bool {
    true
}

fn default_route_methods() -> Vec<String> {
    ["GET", "HEAD", "PATCH", "POST", "PUT", "DELETE"]
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn parse_methods(methods: &[String], pattern: &str) -> Result<Vec<Method>, AuthzError> {
    methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes()).map_err(|_| {
                AuthzError::InvalidRoute(format!("invalid method `{m}` for route `{pattern}`"))
            })
        })
        .collect()
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            path: PathBuf::from("etc/Redfish_1.6.0_PrivilegeRegistry.json"),
        }
    }
}

impl Default for Authz {
    fn default() -> Self {
        Self {
            service_root: default_service_root(),
            unknown_resource: UnknownResourcePolicy::default(),
            seed_well_known: default_seed_well_known(),
            seeds: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("server.host", Server::default().host)
            .into_diagnostic()?
            .set_default("server.port", Server::default().port)
            .into_diagnostic()?
            .set_default(
                "registry.path",
                Registry::default().path.to_string_lossy().to_string(),
            )
            .into_diagnostic()?
            .set_default("authz.service_root", default_service_root())
            .into_diagnostic()?
            .set_default("authz.unknown_resource", "allow")
            .into_diagnostic()?
            .set_default("authz.seed_well_known", default_seed_well_known())
            .into_diagnostic()?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: REDFISH_AUTHZ__SERVER__PORT=9090, etc.
        builder =
            builder.add_source(config::Environment::with_prefix("REDFISH_AUTHZ").separator("__"));

        let cfg = builder.build().into_diagnostic()?;
        let mut s: Settings = cfg.try_deserialize().into_diagnostic()?;

        // Normalize registry path to be relative to current dir
        if s.registry.path.is_relative() {
            s.registry.path = std::env::current_dir()
                .into_diagnostic()?
                .join(&s.registry.path);
        }

        Ok(s)
    }

    /// Route table built from the `routes` declarations. With
    /// `seed_well_known`, the well-known resources not declared explicitly
    /// are added so their seeded patterns can match.
    pub fn route_table(&self) -> Result<RouteTable, AuthzError> {
        let mut table = RouteTable::new();
        for route in &self.routes {
            let methods = parse_methods(&route.methods, &route.pattern)?;
            table.declare(&route.pattern, &methods, &route.resource_type)?;
        }

        if self.authz.seed_well_known {
            let methods = parse_methods(&default_route_methods(), "well-known")?;
            for (pattern, resource_type) in WELL_KNOWN_RESOURCE_TYPES {
                if !table.contains(pattern) {
                    table.declare(pattern, &methods, resource_type)?;
                }
            }
        }
        Ok(table)
    }

    /// Resource-type cache seeded per the `authz` section.
    pub fn resource_type_cache(&self) -> ResourceTypeCache {
        let cache = if self.authz.seed_well_known {
            ResourceTypeCache::with_well_known()
        } else {
            ResourceTypeCache::new()
        };
        for seed in &self.authz.seeds {
            cache.insert(seed.path.as_str(), seed.resource_type.as_str());
        }
        cache
    }
}
