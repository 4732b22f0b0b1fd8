//! Catalog validation: referential integrity and API consistency.

use crate::config::{pk_column_for, EntityDef, REGISTERED_AT_COLUMN};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(entities: &[EntityDef]) -> Result<(), ConfigError> {
    let mut tables = HashSet::new();
    let mut path_segments = HashSet::new();
    for e in entities {
        if !tables.insert(e.table) {
            return Err(ConfigError::DuplicateTable(e.table.to_string()));
        }
        if !path_segments.insert(e.path_segment) {
            return Err(ConfigError::DuplicatePathSegment(e.path_segment.to_string()));
        }
    }

    for e in entities {
        let pk = e.pk_column();
        let mut names = HashSet::new();
        for f in &e.fields {
            if f.name == pk || f.name == REGISTERED_AT_COLUMN || !names.insert(f.name) {
                return Err(ConfigError::DuplicateField {
                    table: e.table.to_string(),
                    field: f.name.to_string(),
                });
            }
            if let Some(target) = f.references {
                if !tables.contains(target) {
                    return Err(ConfigError::MissingReference {
                        kind: "table",
                        id: format!("{}.{} -> {}", e.table, f.name, target),
                    });
                }
            }
        }
    }

    Ok(())
}

/// Tables an entity depends on through foreign keys, excluding itself.
pub fn dependencies(entity: &EntityDef) -> impl Iterator<Item = &'static str> + '_ {
    entity
        .fields
        .iter()
        .filter_map(|f| f.references)
        .filter(move |t| *t != entity.table)
}

/// Column a foreign key to `table` points at.
pub fn referenced_column(table: &str) -> String {
    pk_column_for(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{catalog, FieldDef};

    #[test]
    fn catalog_is_consistent() {
        validate(&catalog()).unwrap();
    }

    #[test]
    fn unknown_reference_is_rejected() {
        let mut entities = catalog();
        entities.push(EntityDef::new(
            "Room",
            "aula",
            "rooms",
            vec![FieldDef::foreign_key("edificio_id", "edificio")],
        ));
        let err = validate(&entities).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReference { .. }));
    }

    #[test]
    fn duplicate_path_segment_is_rejected() {
        let mut entities = catalog();
        entities.push(EntityDef::new("Other", "otro", "students", vec![]));
        let err = validate(&entities).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePathSegment(ref p) if p == "students"));
    }

    #[test]
    fn field_shadowing_implicit_column_is_rejected() {
        let entities = vec![EntityDef::new(
            "Thing",
            "cosa",
            "things",
            vec![FieldDef::date("fecha_registro")],
        )];
        assert!(matches!(validate(&entities), Err(ConfigError::DuplicateField { .. })));
    }
}
