//! Resolved entity model: catalog validated and ordered for runtime use.

use crate::config::{dependencies, validate, EntityDef};
use crate::error::ConfigError;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    /// Entities in foreign-key dependency order (referenced tables first).
    pub entities: Vec<EntityDef>,
    entity_by_path: HashMap<String, usize>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&EntityDef> {
        self.entity_by_path.get(path).map(|&i| &self.entities[i])
    }
}

/// Validate the catalog and order it so every table follows the tables it references.
pub fn resolve(entities: Vec<EntityDef>) -> Result<ResolvedModel, ConfigError> {
    validate(&entities)?;

    let mut placed: HashSet<&'static str> = HashSet::new();
    let mut ordered: Vec<EntityDef> = Vec::with_capacity(entities.len());
    let mut pending = entities;
    while !pending.is_empty() {
        let (ready, blocked): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|e| dependencies(e).all(|t| placed.contains(t)));
        if ready.is_empty() {
            let names: Vec<_> = blocked.iter().map(|e| e.table).collect();
            return Err(ConfigError::DependencyCycle(names.join(", ")));
        }
        for e in ready {
            placed.insert(e.table);
            ordered.push(e);
        }
        pending = blocked;
    }

    let entity_by_path = ordered
        .iter()
        .enumerate()
        .map(|(i, e)| (e.path_segment.to_string(), i))
        .collect();
    Ok(ResolvedModel {
        entities: ordered,
        entity_by_path,
    })
}
