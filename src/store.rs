//! Connection bootstrap: create the target database if missing, then open the pool.

use crate::error::{AppError, ConfigError};
use crate::settings::Settings;
use crate::sql::quoted;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use std::str::FromStr;

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// `postgres` maintenance database on the same server to run CREATE DATABASE.
/// Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin, db_name) = admin_options(database_url)?;
    let Some(db_name) = db_name.filter(|n| !n.is_empty() && n != "postgres") else {
        return Ok(());
    };
    let mut conn: sqlx::PgConnection = admin.connect().await.map_err(AppError::Db)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(AppError::Db)?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quoted(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(AppError::Db)?;
    }
    Ok(())
}

/// Open the shared pool. Connections are checked out per statement or per transaction.
pub async fn connect(settings: &Settings) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.database_max_connections)
        .connect(&settings.database_url)
        .await
        .map_err(AppError::Db)?;
    Ok(pool)
}

fn invalid_url(reason: &str) -> AppError {
    AppError::Config(ConfigError::InvalidSetting {
        name: "DATABASE_URL",
        reason: reason.to_string(),
    })
}

/// Options for the `postgres` database on the same server (host, credentials and
/// query parameters kept), plus the database named in the URL, if any.
fn admin_options(url: &str) -> Result<(PgConnectOptions, Option<String>), AppError> {
    let opts = PgConnectOptions::from_str(url).map_err(|e| invalid_url(&e.to_string()))?;
    let db_name = opts.get_database().map(str::to_string);
    Ok((opts.database("postgres"), db_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_database_name() {
        let (admin, name) = admin_options("postgres://u:p@localhost:5432/sistema_academico").unwrap();
        assert_eq!(name.as_deref(), Some("sistema_academico"));
        assert_eq!(admin.get_database(), Some("postgres"));
        assert_eq!(admin.get_host(), "localhost");
        assert_eq!(admin.get_port(), 5432);
        assert_eq!(admin.get_username(), "u");
    }

    #[test]
    fn path_in_query_string_is_not_the_database() {
        let (admin, name) =
            admin_options("postgres://u:p@db.internal:5433/academico?sslmode=require&sslrootcert=/etc/ca.pem").unwrap();
        assert_eq!(name.as_deref(), Some("academico"));
        assert_eq!(admin.get_database(), Some("postgres"));
        assert_eq!(admin.get_host(), "db.internal");
        assert_eq!(admin.get_port(), 5433);
    }

    #[test]
    fn url_without_database_names_none() {
        let (admin, name) = admin_options("postgres://u:p@localhost:5432").unwrap();
        assert_ne!(name.as_deref(), Some("u:p@localhost:5432"));
        assert_eq!(admin.get_host(), "localhost");
    }

    #[test]
    fn malformed_url_is_a_config_error() {
        assert!(matches!(
            admin_options("not a url"),
            Err(AppError::Config(ConfigError::InvalidSetting { name: "DATABASE_URL", .. }))
        ));
    }
}
