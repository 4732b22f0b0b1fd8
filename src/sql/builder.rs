//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from an entity descriptor.

use crate::config::{EntityDef, FieldKind, REGISTERED_AT_COLUMN};
use serde_json::Value;
use std::collections::HashMap;

/// Quote identifier for PostgreSQL (safe: only from descriptors).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a value and return its `$n::type` placeholder.
    fn push_param(&mut self, v: Value, pg_type: &str) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), pg_type)
    }
}

/// Read projection: pk, fields, registration timestamp. Numeric columns are
/// selected as text so decimals keep their scale on the wire.
pub fn select_column_list(entity: &EntityDef) -> String {
    let mut cols = vec![quoted(&entity.pk_column())];
    for f in &entity.fields {
        let q = quoted(f.name);
        if matches!(f.kind, FieldKind::Decimal { .. }) {
            cols.push(format!("{}::text AS {}", q, q));
        } else {
            cols.push(q);
        }
    }
    cols.push(quoted(REGISTERED_AT_COLUMN));
    cols.join(", ")
}

/// SELECT by primary key; `for_update` locks the row for the rest of the transaction.
pub fn select_by_id(entity: &EntityDef, id: i32, for_update: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(Value::from(id), "int4");
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}{}",
        select_column_list(entity),
        quoted(entity.table),
        quoted(&entity.pk_column()),
        ph,
        if for_update { " FOR UPDATE" } else { "" }
    );
    q
}

/// SELECT page ordered by primary key (insertion order).
pub fn select_list(entity: &EntityDef, limit: u32, offset: u64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(entity),
        quoted(entity.table),
        quoted(&entity.pk_column()),
        limit,
        offset
    );
    q
}

/// INSERT the fields present in `body`. Absent fields fall back to the column default
/// (or NULL), so store defaults apply.
pub fn insert(entity: &EntityDef, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for f in &entity.fields {
        let Some(v) = body.get(f.name) else { continue };
        placeholders.push(q.push_param(v.clone(), f.kind.pg_type()));
        cols.push(quoted(f.name));
    }
    let table = quoted(entity.table);
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only updatable columns present in body, in field order.
/// With nothing to set this degrades to a SELECT of the row.
pub fn update(entity: &EntityDef, id: i32, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for f in entity.updatable_fields() {
        let Some(v) = body.get(f.name) else { continue };
        let ph = q.push_param(v.clone(), f.kind.pg_type());
        sets.push(format!("{} = {}", quoted(f.name), ph));
    }
    if sets.is_empty() {
        return select_by_id(entity, id, false);
    }
    let id_ph = q.push_param(Value::from(id), "int4");
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quoted(entity.table),
        sets.join(", "),
        quoted(&entity.pk_column()),
        id_ph,
        select_column_list(entity)
    );
    q
}

/// DELETE by id, returning the deleted key.
pub fn delete(entity: &EntityDef, id: i32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = quoted(&entity.pk_column());
    let ph = q.push_param(Value::from(id), "int4");
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        quoted(entity.table),
        pk,
        ph,
        pk
    );
    q
}
