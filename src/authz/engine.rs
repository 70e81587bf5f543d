use std::collections::HashSet;

use axum::http::Method;
use serde_json::Value;

use crate::authz::ancestry::{ancestors, is_subsequence};
use crate::authz::routes::normalize_path;
use crate::authz::status::AuthStatus;
use crate::authz::types::*;
use crate::authz::AuthzState;

/// Decide whether `request.username`, holding `request.privileges`, may perform
/// `request.method` on `request.path`.
pub fn evaluate(state: &AuthzState, request: &AuthzRequest<'_>) -> bool {
    // 1. Holding nothing is never enough, whatever the resource
    if request.privileges.is_empty() {
        tracing::debug!(user = request.username, path = request.path, "No privileges held");
        return false;
    }

    // 2. Classify the path
    let Some(resource_type) = state.resolver.resolve(request.path, request.method) else {
        return unknown_resource(state, request, None);
    };

    // 3. Registry rules for that type
    let Some(entry) = state.registry.lookup(&resource_type) else {
        return unknown_resource(state, request, Some(resource_type.as_str()));
    };

    // 4. Body properties, only for methods that carry one
    let fields = if is_mutating(request.method) {
        body_fields(request.body)
    } else {
        Vec::new()
    };

    // 5. Plain OperationMap check when no override can apply. Subordinate
    //    overrides also cover methods that never carry a body.
    let ancestor_scoped =
        !is_mutating(request.method) && !entry.subordinate_overrides.is_empty();
    if !entry.has_overrides() || (fields.is_empty() && !ancestor_scoped) {
        let allowed = operation_map_allows(&entry.operation_map, None, request);
        tracing::debug!(
            user = request.username,
            resource_type = %resource_type,
            method = %request.method,
            allowed,
            "Checked base operation map"
        );
        return allowed;
    }

    // 6. Property and subordinate overrides
    resolve_overrides(state, request, &resource_type, entry, &fields)
}

/// [`evaluate`], reported as an [`AuthStatus`].
pub fn authorize(state: &AuthzState, request: &AuthzRequest<'_>) -> AuthStatus {
    AuthStatus::from_decision(evaluate(state, request))
}

pub fn is_mutating(method: &Method) -> bool {
    [Method::POST, Method::PUT, Method::PATCH].contains(method)
}

/// Top-level property names of a JSON object body. A missing, malformed or
/// non-object body has none.
pub fn body_fields(body: Option<&[u8]>) -> Vec<String> {
    let Some(body) = body else {
        return Vec::new();
    };
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map.keys().cloned().collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            tracing::debug!(error = %e, "Request body is not valid JSON, treating as empty");
            Vec::new()
        }
    }
}

/// Rules for `method`: from `primary`, or from `fallback` when `primary`
/// leaves the method unspecified. `None` means unrestricted.
pub fn lookup_rules<'m>(
    primary: &'m OperationMap,
    fallback: Option<&'m OperationMap>,
    method: &Method,
) -> Option<&'m [PrivilegeRule]> {
    primary
        .rules_for(method)
        .or_else(|| fallback.and_then(|map| map.rules_for(method)))
}

pub fn operation_map_allows(
    primary: &OperationMap,
    fallback: Option<&OperationMap>,
    request: &AuthzRequest<'_>,
) -> bool {
    match lookup_rules(primary, fallback, request.method) {
        Some(rules) => rules_allow(rules, request),
        None => true,
    }
}

/// True when any rule is fully held. A bare `ConfigureSelf` rule only counts
/// for PATCH when the path's last segment is the acting user.
pub fn rules_allow(rules: &[PrivilegeRule], request: &AuthzRequest<'_>) -> bool {
    rules.iter().any(|rule| {
        if !rule.is_satisfied_by(request.privileges) {
            return false;
        }
        if rule.is_configure_self() && *request.method == Method::PATCH && !targets_self(request)
        {
            tracing::debug!(
                user = request.username,
                path = request.path,
                "ConfigureSelf does not cover another account"
            );
            return false;
        }
        true
    })
}

fn targets_self(request: &AuthzRequest<'_>) -> bool {
    normalize_path(request.path)
        .rsplit('/')
        .next()
        .is_some_and(|segment| segment == request.username)
}

fn unknown_resource(
    state: &AuthzState,
    request: &AuthzRequest<'_>,
    resource_type: Option<&str>,
) -> bool {
    let allowed = state.unknown_resource.allows();
    if allowed {
        tracing::warn!(
            path = request.path,
            method = %request.method,
            resource_type,
            "No privilege requirements found, allowing"
        );
    } else {
        tracing::debug!(
            path = request.path,
            method = %request.method,
            resource_type,
            "No privilege requirements found, denying"
        );
    }
    allowed
}

fn resolve_overrides(
    state: &AuthzState,
    request: &AuthzRequest<'_>,
    resource_type: &str,
    entry: &RegistryEntry,
    fields: &[String],
) -> bool {
    // Property overrides first; any failure denies outright
    let mut covered: HashSet<&str> = HashSet::new();
    for property_override in &entry.property_overrides {
        let matched: Vec<&str> = fields
            .iter()
            .map(String::as_str)
            .filter(|field| property_override.targets.iter().any(|t| t == *field))
            .collect();
        if matched.is_empty() {
            continue;
        }
        covered.extend(matched.iter().copied());

        if !operation_map_allows(&property_override.operation_map, None, request) {
            tracing::debug!(
                user = request.username,
                resource_type,
                fields = ?matched,
                "Property override denied request"
            );
            return false;
        }
    }

    let remaining: Vec<&str> = fields
        .iter()
        .map(String::as_str)
        .filter(|field| !covered.contains(field))
        .collect();

    if is_mutating(request.method) && remaining.is_empty() {
        tracing::debug!(resource_type, "All body properties covered by overrides");
        return true;
    }

    if entry.subordinate_overrides.is_empty() {
        let allowed = operation_map_allows(&entry.operation_map, None, request);
        tracing::debug!(
            user = request.username,
            resource_type,
            fields = ?remaining,
            allowed,
            "Checked base operation map for remaining properties"
        );
        return allowed;
    }

    // Subordinate overrides keyed on the ancestor chain
    let chain = ancestors(&state.resolver, &state.service_root, request.path);
    let mut applied = false;
    for subordinate in &entry.subordinate_overrides {
        if !is_subsequence(&subordinate.targets, &chain) {
            continue;
        }
        applied = true;
        if !operation_map_allows(
            &subordinate.operation_map,
            Some(&entry.operation_map),
            request,
        ) {
            tracing::debug!(
                user = request.username,
                resource_type,
                targets = ?subordinate.targets,
                fields = ?remaining,
                "Subordinate override denied request"
            );
            return false;
        }
    }

    if !applied {
        tracing::debug!(resource_type, chain = ?chain, "No subordinate override matches");
        return operation_map_allows(&entry.operation_map, None, request);
    }
    true
}
