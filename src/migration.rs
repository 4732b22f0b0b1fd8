//! Create the entity tables at startup (create-if-missing, no versioning).
//! Tables are created in foreign-key dependency order inside one transaction.

use crate::config::{referenced_column, EntityDef, FieldKind, ResolvedModel, REGISTERED_AT_COLUMN};
use crate::error::AppError;
use crate::sql::quoted;
use sqlx::PgPool;

/// Column type for DDL.
fn column_type(kind: FieldKind, max_length: Option<u32>) -> String {
    match kind {
        FieldKind::Integer => "INTEGER".into(),
        FieldKind::Text => match max_length {
            Some(n) => format!("VARCHAR({})", n),
            None => "TEXT".into(),
        },
        FieldKind::Boolean => "BOOLEAN".into(),
        FieldKind::Date => "DATE".into(),
        FieldKind::Decimal { precision, scale } => format!("NUMERIC({}, {})", precision, scale),
    }
}

/// `CREATE TABLE IF NOT EXISTS` for one entity.
pub fn create_table_sql(entity: &EntityDef) -> String {
    let mut col_defs = vec![format!("{} SERIAL PRIMARY KEY", quoted(&entity.pk_column()))];
    for f in &entity.fields {
        let mut def = format!("{} {}", quoted(f.name), column_type(f.kind, f.rule.max_length));
        if !f.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(ref d) = f.default {
            def.push_str(" DEFAULT ");
            def.push_str(&d.sql());
        }
        if f.unique {
            def.push_str(" UNIQUE");
        }
        if let Some(target) = f.references {
            def.push_str(&format!(
                " REFERENCES {} ({})",
                quoted(target),
                quoted(&referenced_column(target))
            ));
        }
        col_defs.push(def);
    }
    col_defs.push(format!("{} TIMESTAMP NOT NULL DEFAULT NOW()", quoted(REGISTERED_AT_COLUMN)));
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(entity.table),
        col_defs.join(",\n  ")
    )
}

/// Create every table of the model that does not exist yet.
pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    for entity in &model.entities {
        let sql = create_table_sql(entity);
        tracing::debug!(sql = %sql, "ddl");
        sqlx::query(&sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(tables = model.entities.len(), "schema ready");
    Ok(())
}
