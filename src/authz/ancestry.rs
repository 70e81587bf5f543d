use axum::http::Method;

use crate::authz::resolver::ResourceTypeResolver;
use crate::authz::routes::normalize_path;

/// Resource types of every prefix of `path` strictly between `service_root`
/// and `path` itself, root first. Prefixes that cannot be classified are
/// skipped.
pub fn ancestors(resolver: &ResourceTypeResolver, service_root: &str, path: &str) -> Vec<String> {
    let root = normalize_path(service_root).trim_end_matches('/');
    let mut chain = Vec::new();
    let mut current = normalize_path(path);

    while let Some((parent, _)) = current.rsplit_once('/') {
        current = parent;
        let below_root = current.len() > root.len()
            && current.starts_with(root)
            && current[root.len()..].starts_with('/');
        if !below_root {
            break;
        }
        if let Some(resource_type) = resolver.resolve(current, &Method::GET) {
            chain.push(resource_type);
        }
    }

    chain.reverse();
    tracing::debug!(path, chain = ?chain, "Resolved ancestor resource types");
    chain
}

/// True when every element of `targets` appears in `chain` in the same order,
/// not necessarily adjacent.
pub fn is_subsequence(targets: &[String], chain: &[String]) -> bool {
    let mut remaining = chain.iter();
    targets
        .iter()
        .all(|target| remaining.any(|item| item == target))
}
