//! Manifest validation: acyclicity and file-ownership disjointness.

use crate::core::error::EngineError;
use crate::core::ids::ComponentId;
use crate::manifest::entities::Manifest;
use std::collections::{HashMap, HashSet};

/// Validate a manifest before the engine schedules any work from it.
///
/// Checks, in order:
/// 1. Every `depends_on` entry names a component that exists.
/// 2. The dependency graph is acyclic (topological sort succeeds).
/// 3. No two components claim the same file in `owns_files`.
pub fn validate_manifest(manifest: &Manifest) -> Result<(), EngineError> {
    let known: HashSet<&ComponentId> = manifest.component_ids().collect();

    for component in &manifest.components {
        for dep in &component.depends_on {
            if !known.contains(dep) {
                return Err(EngineError::ManifestInvalid(format!(
                    "component {} depends on unknown component {}",
                    component.name, dep
                )));
            }
        }
    }

    topological_order(manifest)?;

    let mut owners: HashMap<&str, &ComponentId> = HashMap::new();
    for component in &manifest.components {
        for path in &component.owns_files {
            if let Some(existing) = owners.insert(path.as_str(), &component.name)
                && existing != &component.name
            {
                return Err(EngineError::FileOwnershipConflict {
                    a: existing.to_string(),
                    b: component.name.to_string(),
                    path: path.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Kahn's algorithm: returns components in an order where every
/// dependency precedes its dependents, or an error naming the cycle.
pub fn topological_order(manifest: &Manifest) -> Result<Vec<ComponentId>, EngineError> {
    let mut in_degree: HashMap<&ComponentId, usize> = manifest
        .component_ids()
        .map(|id| (id, 0usize))
        .collect();
    let mut dependents: HashMap<&ComponentId, Vec<&ComponentId>> = HashMap::new();

    for component in &manifest.components {
        for dep in &component.depends_on {
            *in_degree.entry(&component.name).or_insert(0) += 1;
            dependents.entry(dep).or_default().push(&component.name);
        }
    }

    let mut ready: Vec<&ComponentId> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(id, _)| *id)
        .collect();
    ready.sort();

    let mut order = Vec::with_capacity(manifest.components.len());
    let mut queue: std::collections::VecDeque<&ComponentId> = ready.into_iter().collect();

    while let Some(id) = queue.pop_front() {
        order.push(id.clone());
        if let Some(deps) = dependents.get(id) {
            let mut newly_ready = Vec::new();
            for dependent in deps {
                let degree = in_degree.get_mut(*dependent).expect("tracked component");
                *degree -= 1;
                if *degree == 0 {
                    newly_ready.push(*dependent);
                }
            }
            newly_ready.sort();
            queue.extend(newly_ready);
        }
    }

    if order.len() != manifest.components.len() {
        let remaining: Vec<String> = manifest
            .component_ids()
            .filter(|id| !order.contains(id))
            .map(|id| id.to_string())
            .collect();
        return Err(EngineError::CycleDetected(remaining));
    }

    Ok(order)
}
