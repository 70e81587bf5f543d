use std::collections::HashMap;

use axum::http::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::authz::status::AuthStatus;

pub const CONFIGURE_SELF: &str = "ConfigureSelf";

// ---------- Privilege registry model ----------

/// A set of privilege names, all of which must be held.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrivilegeRule {
    #[serde(rename = "Privilege", default)]
    pub privilege: Vec<String>,
}

impl PrivilegeRule {
    pub fn new<I, S>(privileges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            privilege: privileges.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_satisfied_by(&self, held: &[String]) -> bool {
        self.privilege.iter().all(|p| held.contains(p))
    }

    /// True when the rule is exactly `{"ConfigureSelf"}`.
    pub fn is_configure_self(&self) -> bool {
        !self.privilege.is_empty() && self.privilege.iter().all(|p| p == CONFIGURE_SELF)
    }
}

/// HTTP method -> rule list. A method is satisfied when any rule is.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationMap(HashMap<String, Vec<PrivilegeRule>>);

impl OperationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, method: Method, rules: Vec<PrivilegeRule>) -> Self {
        self.0.insert(method.as_str().to_string(), rules);
        self
    }

    /// Rules for `method`, or `None` when the method is absent or has no rules
    /// (both mean unrestricted).
    pub fn rules_for(&self, method: &Method) -> Option<&[PrivilegeRule]> {
        self.0
            .get(method.as_str())
            .map(Vec::as_slice)
            .filter(|rules| !rules.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Upper-cases method keys so lookups by `Method::as_str` line up.
    pub fn normalized(self) -> Self {
        let mut map: HashMap<String, Vec<PrivilegeRule>> = HashMap::new();
        for (method, rules) in self.0 {
            map.entry(method.to_ascii_uppercase())
                .or_default()
                .extend(rules);
        }
        Self(map)
    }

    pub fn privileges(&self) -> impl Iterator<Item = &String> {
        self.0
            .values()
            .flatten()
            .flat_map(|rule| rule.privilege.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PropertyOverride {
    /// Body property names this override governs.
    #[serde(rename = "Targets", default)]
    pub targets: Vec<String>,
    #[serde(rename = "OperationMap", default)]
    pub operation_map: OperationMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubordinateOverride {
    /// Ancestor resource types, root first, matched as a subsequence.
    #[serde(rename = "Targets", default)]
    pub targets: Vec<String>,
    #[serde(rename = "OperationMap", default)]
    pub operation_map: OperationMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(rename = "OperationMap", default)]
    pub operation_map: OperationMap,
    #[serde(rename = "PropertyOverrides", default)]
    pub property_overrides: Vec<PropertyOverride>,
    #[serde(rename = "SubordinateOverrides", default)]
    pub subordinate_overrides: Vec<SubordinateOverride>,
}

impl RegistryEntry {
    pub fn has_overrides(&self) -> bool {
        !self.property_overrides.is_empty() || !self.subordinate_overrides.is_empty()
    }
}

/// One element of the registry document's `Mappings` array.
#[derive(Debug, Clone, Deserialize)]
pub struct PrivilegeMapping {
    #[serde(rename = "Entity", default)]
    pub entity: String,
    #[serde(flatten)]
    pub entry: RegistryEntry,
}

/// DMTF Privilege Registry document, as shipped by the service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistryDocument {
    #[serde(rename = "PrivilegesUsed", default)]
    pub privileges_used: Vec<String>,
    #[serde(rename = "OEMPrivilegesUsed", default)]
    pub oem_privileges_used: Vec<String>,
    #[serde(rename = "Mappings", default)]
    pub mappings: Vec<PrivilegeMapping>,
}

/// What to decide when a request's resource type is unknown, either because
/// the path could not be classified or because the registry has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownResourcePolicy {
    #[default]
    Allow,
    Deny,
}

impl UnknownResourcePolicy {
    pub fn allows(self) -> bool {
        matches!(self, UnknownResourcePolicy::Allow)
    }
}

/// Per-call input to the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct AuthzRequest<'a> {
    pub path: &'a str,
    pub method: &'a Method,
    pub username: &'a str,
    pub privileges: &'a [String],
    /// Raw request body, if any.
    pub body: Option<&'a [u8]>,
}

// ---------- API request/response types ----------

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    /// e.g. "/redfish/v1/AccountService/Accounts/alice"
    pub path: String,
    /// e.g. "PATCH"
    pub method: String,
    pub username: String,
    /// Expected to be a list of privilege names; anything else is denied.
    #[serde(default)]
    pub privileges: Value,
    /// Raw request body text
    #[serde(default)]
    pub body: Option<String>,
    /// Outcome of the upstream authentication step
    #[serde(default = "default_authentication")]
    pub authentication: AuthStatus,
}

fn default_authentication() -> AuthStatus {
    AuthStatus::Success
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub status: AuthStatus,
}
