use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use crate::authz::errors::AuthzError;
use crate::authz::types::*;

/// Resource type -> privilege requirements. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct PrivilegeRegistry {
    entries: HashMap<String, RegistryEntry>,
    privileges_used: Vec<String>,
}

impl PrivilegeRegistry {
    /// `None` means the resource type is unrestricted.
    pub fn lookup(&self, resource_type: &str) -> Option<&RegistryEntry> {
        self.entries.get(resource_type)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Standard and OEM privileges declared by the document.
    pub fn privileges_used(&self) -> &[String] {
        &self.privileges_used
    }
}

/// Load a DMTF Privilege Registry JSON document from disk.
pub fn load_registry(path: &Path) -> Result<PrivilegeRegistry, AuthzError> {
    let contents =
        std::fs::read_to_string(path).map_err(|source| AuthzError::RegistryLoadError {
            path: path.display().to_string(),
            source,
        })?;
    let registry = parse_registry(&contents)?;

    let overrides = registry
        .entries
        .values()
        .filter(|e| e.has_overrides())
        .count();
    tracing::info!(
        path = %path.display(),
        entities = registry.len(),
        with_overrides = overrides,
        privileges = registry.privileges_used.len(),
        "Loaded privilege registry"
    );

    Ok(registry)
}

pub fn parse_registry(source: &str) -> Result<PrivilegeRegistry, AuthzError> {
    let document: RegistryDocument =
        serde_json::from_str(source).map_err(|e| AuthzError::RegistryParse(e.to_string()))?;
    compile_registry(document)
}

/// Validate the document and index its mappings by entity name.
pub fn compile_registry(document: RegistryDocument) -> Result<PrivilegeRegistry, AuthzError> {
    let mut entries: HashMap<String, RegistryEntry> = HashMap::new();

    for mapping in document.mappings {
        let entity = mapping.entity.trim().to_string();
        if entity.is_empty() {
            return Err(AuthzError::InvalidRegistry(
                "mapping without an `Entity` name".into(),
            ));
        }
        if entries.contains_key(&entity) {
            return Err(AuthzError::InvalidRegistry(format!(
                "duplicate mapping for entity `{entity}`"
            )));
        }
        entries.insert(entity, normalize_entry(mapping.entry));
    }

    let mut privileges_used = document.privileges_used;
    privileges_used.extend(document.oem_privileges_used);

    if !privileges_used.is_empty() {
        warn_undeclared_privileges(&entries, &privileges_used);
    }

    Ok(PrivilegeRegistry {
        entries,
        privileges_used,
    })
}

fn normalize_entry(entry: RegistryEntry) -> RegistryEntry {
    RegistryEntry {
        operation_map: entry.operation_map.normalized(),
        property_overrides: entry
            .property_overrides
            .into_iter()
            .map(|o| PropertyOverride {
                targets: o.targets,
                operation_map: o.operation_map.normalized(),
            })
            .collect(),
        subordinate_overrides: entry
            .subordinate_overrides
            .into_iter()
            .map(|o| SubordinateOverride {
                targets: o.targets,
                operation_map: o.operation_map.normalized(),
            })
            .collect(),
    }
}

/// Report rules that reference privileges the document never declares;
/// such rules can only be satisfied by users holding non-standard privileges.
fn warn_undeclared_privileges(entries: &HashMap<String, RegistryEntry>, declared: &[String]) {
    let declared: HashSet<&str> = declared.iter().map(String::as_str).collect();

    for (entity, entry) in entries {
        let maps = std::iter::once(&entry.operation_map)
            .chain(entry.property_overrides.iter().map(|o| &o.operation_map))
            .chain(entry.subordinate_overrides.iter().map(|o| &o.operation_map));

        let unknown: BTreeSet<&str> = maps
            .flat_map(|map| map.privileges())
            .map(String::as_str)
            .filter(|p| !declared.contains(p))
            .collect();

        if !unknown.is_empty() {
            tracing::warn!(
                entity = %entity,
                privileges = ?unknown,
                "Registry references undeclared privileges"
            );
        }
    }
}
