//! Typed errors and HTTP mapping.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} id '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("duplicate or reserved field {field} on table {table}")]
    DuplicateField { table: String, field: String },
    #[error("foreign key cycle between tables: {0}")]
    DependencyCycle(String),
    #[error("invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// One violated field constraint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub code: &'static str,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, code: &'static str, message: impl Into<String>) -> Self {
        FieldViolation {
            field: field.into(),
            code,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("validation: {}", summarize(.0))]
    Validation(Vec<FieldViolation>),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("reference: {0}")]
    Reference(String),
    #[error("invalid value: {0}")]
    InvalidData(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid body: {1}")]
    InvalidBody(StatusCode, String),
    #[error("database: {0}")]
    Db(sqlx::Error),
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Keeps axum's status (415 missing content type, 400 malformed JSON, 413 too large).
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection.status(), rejection.body_text())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        let classified = match &e {
            sqlx::Error::Database(db) => {
                let code = db.code();
                classify_db_error(code.as_deref(), db.constraint(), db.message())
            }
            _ => None,
        };
        classified.unwrap_or(AppError::Db(e))
    }
}

/// Map a PostgreSQL SQLSTATE to a client-facing error. `None` keeps it a database error.
pub fn classify_db_error(code: Option<&str>, constraint: Option<&str>, message: &str) -> Option<AppError> {
    let detail = match constraint {
        Some(c) => format!("{} ({})", message, c),
        None => message.to_string(),
    };
    match code? {
        "23505" => Some(AppError::Conflict(detail)),
        "23503" => Some(AppError::Reference(detail)),
        "23502" | "23514" => Some(AppError::InvalidData(detail)),
        c if c.starts_with("22") => Some(AppError::InvalidData(detail)),
        _ => None,
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Validation(_) | AppError::InvalidData(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
            }
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::Reference(_) => (StatusCode::CONFLICT, "reference_error"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::InvalidBody(status, _) if *status == StatusCode::PAYLOAD_TOO_LARGE => {
                (*status, "payload_too_large")
            }
            AppError::InvalidBody(status, _) => (*status, "bad_request"),
            AppError::Db(sqlx::Error::RowNotFound) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Db(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let details = match &self {
            AppError::Validation(violations) => serde_json::to_value(violations).ok(),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_violation_is_conflict() {
        let e = classify_db_error(Some("23505"), Some("calificacion_matricula_id_key"), "duplicate key").unwrap();
        assert!(matches!(e, AppError::Conflict(ref m) if m.contains("calificacion_matricula_id_key")));
        assert_eq!(e.status_and_code(), (StatusCode::CONFLICT, "conflict"));
    }

    #[test]
    fn foreign_key_violation_is_reference_error() {
        let e = classify_db_error(Some("23503"), None, "violates foreign key constraint").unwrap();
        assert_eq!(e.status_and_code(), (StatusCode::CONFLICT, "reference_error"));
    }

    #[test]
    fn data_exceptions_are_validation_errors() {
        let e = classify_db_error(Some("22003"), None, "numeric field overflow").unwrap();
        assert_eq!(e.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(classify_db_error(Some("40001"), None, "serialization failure").is_none());
        assert!(classify_db_error(None, None, "io").is_none());
    }

    #[test]
    fn validation_message_lists_every_field() {
        let e = AppError::Validation(vec![
            FieldViolation::new("nota", "maximum", "must be at most 20"),
            FieldViolation::new("matricula_id", "required", "is required"),
        ]);
        let msg = e.to_string();
        assert!(msg.contains("nota: must be at most 20"));
        assert!(msg.contains("matricula_id: is required"));
    }

    #[test]
    fn not_found_maps_to_404() {
        let e = AppError::NotFound { entity: "Grade", id: "7".into() };
        assert_eq!(e.to_string(), "Grade not found: 7");
        assert_eq!(e.status_and_code(), (StatusCode::NOT_FOUND, "not_found"));
    }
}
