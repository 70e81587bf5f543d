//! Route table the resolver classifies request paths against.
//!
//! Patterns are absolute paths whose `{name}` segments match any single
//! path segment, e.g. `/redfish/v1/Managers/{manager_id}`. A route either
//! declares its Redfish resource type up front or carries a
//! [`ResourceHandler`] that can render the resource so the type can be read
//! from its `@odata.type`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use serde_json::Value;

use crate::authz::errors::AuthzError;

/// Values captured by `{name}` segments.
pub type RouteParams = HashMap<String, String>;

/// Something that can render a resource representation as a GET would.
pub trait ResourceHandler: Send + Sync {
    /// Must not have side effects beyond what a GET of the resource has.
    fn get(&self, path: &str, params: &RouteParams) -> Result<Value, AuthzError>;
}

impl<F> ResourceHandler for F
where
    F: Fn(&str, &RouteParams) -> Result<Value, AuthzError> + Send + Sync,
{
    fn get(&self, path: &str, params: &RouteParams) -> Result<Value, AuthzError> {
        self(path, params)
    }
}

#[derive(Clone)]
pub enum RouteTarget {
    /// Resource type known statically.
    Declared(String),
    /// Resource type learned by rendering the resource.
    Handler(Arc<dyn ResourceHandler>),
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteTarget::Declared(t) => f.debug_tuple("Declared").field(t).finish(),
            RouteTarget::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
pub struct Route {
    pattern: String,
    segments: Vec<Segment>,
    methods: Vec<Method>,
    target: RouteTarget,
}

impl Route {
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn target(&self) -> &RouteTarget {
        &self.target
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
            || (*method == Method::HEAD && self.methods.contains(&Method::GET))
    }

    fn literal_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Literal(_)))
            .count()
    }

    fn capture(&self, parts: &[&str]) -> Option<RouteParams> {
        if parts.len() != self.segments.len() {
            return None;
        }
        let mut params = RouteParams::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            match segment {
                Segment::Literal(lit) if lit.as_str() == *part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), (*part).to_string());
                }
            }
        }
        Some(params)
    }
}

#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: RouteParams,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route whose resource type is known up front.
    pub fn declare(
        &mut self,
        pattern: &str,
        methods: &[Method],
        resource_type: &str,
    ) -> Result<(), AuthzError> {
        if resource_type.trim().is_empty() {
            return Err(AuthzError::InvalidRoute(format!(
                "route `{pattern}` declares an empty resource type"
            )));
        }
        self.insert(pattern, methods, RouteTarget::Declared(resource_type.to_string()))
    }

    /// Register a route whose resource type is read from its rendered representation.
    pub fn handle(
        &mut self,
        pattern: &str,
        methods: &[Method],
        handler: Arc<dyn ResourceHandler>,
    ) -> Result<(), AuthzError> {
        self.insert(pattern, methods, RouteTarget::Handler(handler))
    }

    fn insert(
        &mut self,
        pattern: &str,
        methods: &[Method],
        target: RouteTarget,
    ) -> Result<(), AuthzError> {
        let segments = parse_pattern(pattern)?;
        if self.contains(pattern) {
            return Err(AuthzError::InvalidRoute(format!(
                "duplicate route `{pattern}`"
            )));
        }
        let pattern = normalize_path(pattern).to_string();
        if methods.is_empty() {
            return Err(AuthzError::InvalidRoute(format!(
                "route `{pattern}` allows no methods"
            )));
        }
        self.routes.push(Route {
            pattern,
            segments,
            methods: methods.to_vec(),
            target,
        });
        Ok(())
    }

    pub fn contains(&self, pattern: &str) -> bool {
        let pattern = normalize_path(pattern);
        self.routes.iter().any(|r| r.pattern == pattern)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the most specific route for `path` that accepts `method`.
    pub fn match_path(&self, path: &str, method: &Method) -> Result<RouteMatch<'_>, AuthzError> {
        let path = normalize_path(path);
        let parts: Vec<&str> = split_segments(path).collect();

        let mut path_matched = false;
        let mut best: Option<RouteMatch<'_>> = None;

        for route in &self.routes {
            let Some(params) = route.capture(&parts) else {
                continue;
            };
            path_matched = true;
            if !route.allows(method) {
                continue;
            }
            let better = best
                .as_ref()
                .map_or(true, |b| route.literal_count() > b.route.literal_count());
            if better {
                best = Some(RouteMatch { route, params });
            }
        }

        match best {
            Some(m) => Ok(m),
            None if path_matched => Err(AuthzError::MethodNotAllowed {
                path: path.to_string(),
                method: method.to_string(),
            }),
            None => Err(AuthzError::RouteNotFound {
                path: path.to_string(),
            }),
        }
    }
}

/// Strip trailing slashes, keeping a bare "/" intact.
pub fn normalize_path(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn parse_pattern(pattern: &str) -> Result<Vec<Segment>, AuthzError> {
    if !pattern.starts_with('/') {
        return Err(AuthzError::InvalidRoute(format!(
            "pattern `{pattern}` must start with `/`"
        )));
    }

    let mut names = Vec::new();
    split_segments(pattern)
        .map(|part| match part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
            Some(name) if name.is_empty() || name.contains(['{', '}']) => Err(
                AuthzError::InvalidRoute(format!("bad parameter `{part}` in `{pattern}`")),
            ),
            Some(name) if names.contains(&name) => Err(AuthzError::InvalidRoute(format!(
                "parameter `{name}` repeated in `{pattern}`"
            ))),
            Some(name) => {
                names.push(name);
                Ok(Segment::Param(name.to_string()))
            }
            None if part.contains(['{', '}']) => Err(AuthzError::InvalidRoute(format!(
                "bad segment `{part}` in `{pattern}`"
            ))),
            None => Ok(Segment::Literal(part.to_string())),
        })
        .collect()
}
