//! Generic CRUD execution against PostgreSQL.
//!
//! Reads run on a pooled connection held for the single statement. Writes run in a
//! transaction scoped to the call: committed on success, rolled back when dropped on
//! any error path.

use crate::config::{EntityDef, FieldKind, REGISTERED_AT_COLUMN};
use crate::error::AppError;
use crate::sql::{bind_text, delete, insert, select_by_id, select_list, update, QueryBuf};
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::{PgPool, Postgres, Row};
use std::collections::HashMap;

pub struct CrudService;

impl CrudService {
    /// One page of rows ordered by primary key.
    pub async fn list(
        pool: &PgPool,
        entity: &EntityDef,
        limit: u32,
        skip: u64,
    ) -> Result<Vec<Value>, AppError> {
        let q = select_list(entity, limit, skip);
        let rows = prepare(&q).fetch_all(pool).await?;
        rows.iter().map(|r| row_to_json(r, entity)).collect()
    }

    /// Fetch one row by primary key.
    pub async fn read(pool: &PgPool, entity: &EntityDef, id: i32) -> Result<Option<Value>, AppError> {
        let q = select_by_id(entity, id, false);
        let row = prepare(&q).fetch_optional(pool).await?;
        row.map(|r| row_to_json(&r, entity)).transpose()
    }

    /// Insert one validated row. Returns the created row with its generated id and timestamp.
    pub async fn create(
        pool: &PgPool,
        entity: &EntityDef,
        body: &HashMap<String, Value>,
    ) -> Result<Value, AppError> {
        let q = insert(entity, body);
        let mut tx = pool.begin().await?;
        let row = prepare(&q).fetch_one(&mut *tx).await?;
        let created = row_to_json(&row, entity)?;
        tx.commit().await?;
        tracing::debug!(table = entity.table, "created row");
        Ok(created)
    }

    /// Apply a validated partial update. The row is locked and checked for existence
    /// before any field is merged. Returns None when the id does not exist.
    pub async fn update(
        pool: &PgPool,
        entity: &EntityDef,
        id: i32,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let mut tx = pool.begin().await?;
        let existing = prepare(&select_by_id(entity, id, true))
            .fetch_optional(&mut *tx)
            .await?;
        let Some(existing) = existing else {
            return Ok(None);
        };
        let row = if body.is_empty() {
            existing
        } else {
            prepare(&update(entity, id, body)).fetch_one(&mut *tx).await?
        };
        let updated = row_to_json(&row, entity)?;
        tx.commit().await?;
        Ok(Some(updated))
    }

    /// Delete one row by id. Returns false when nothing was deleted.
    pub async fn delete(pool: &PgPool, entity: &EntityDef, id: i32) -> Result<bool, AppError> {
        let q = delete(entity, id);
        let mut tx = pool.begin().await?;
        let deleted = prepare(&q).fetch_optional(&mut *tx).await?.is_some();
        tx.commit().await?;
        Ok(deleted)
    }
}

fn prepare(q: &QueryBuf) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    let mut query = sqlx::query(&q.sql);
    for p in &q.params {
        query = query.bind(bind_text(p));
    }
    query
}

/// Read projection of a row, decoded by the descriptor's column kinds.
fn row_to_json(row: &PgRow, entity: &EntityDef) -> Result<Value, AppError> {
    let mut map = Map::new();
    let pk = entity.pk_column();
    let id: i32 = row.try_get(pk.as_str())?;
    map.insert(pk, Value::from(id));
    for f in &entity.fields {
        let v = match f.kind {
            FieldKind::Integer => row.try_get::<Option<i32>, _>(f.name)?.map(Value::from),
            FieldKind::Text | FieldKind::Decimal { .. } => {
                row.try_get::<Option<String>, _>(f.name)?.map(Value::String)
            }
            FieldKind::Boolean => row.try_get::<Option<bool>, _>(f.name)?.map(Value::Bool),
            FieldKind::Date => row
                .try_get::<Option<chrono::NaiveDate>, _>(f.name)?
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        };
        map.insert(f.name.to_string(), v.unwrap_or(Value::Null));
    }
    let registered: chrono::NaiveDateTime = row.try_get(REGISTERED_AT_COLUMN)?;
    map.insert(
        REGISTERED_AT_COLUMN.to_string(),
        Value::String(registered.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
    );
    Ok(Value::Object(map))
}
