//! Entity CRUD handlers: create, list, read, update, delete.

use crate::config::{EntityDef, Operation};
use crate::error::AppError;
use crate::service::{CrudService, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

fn parse_id(id_str: &str) -> Result<i32, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

fn body_to_map(body: Result<Json<Value>, JsonRejection>) -> Result<HashMap<String, Value>, AppError> {
    let Json(value) = body?;
    match value {
        Value::Object(m) => Ok(m.into_iter().collect()),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

/// Resolve the entity for a path segment and check it exposes `op`.
fn entity_for<'a>(state: &'a AppState, path_segment: &str, op: Operation) -> Result<&'a EntityDef, AppError> {
    let entity = state.model.entity_by_path(path_segment).ok_or_else(|| AppError::NotFound {
        entity: "resource",
        id: path_segment.to_string(),
    })?;
    if !entity.allows(op) {
        return Err(AppError::BadRequest(format!("{} not allowed on {}", op.as_str(), path_segment)));
    }
    Ok(entity)
}

fn not_found(entity: &EntityDef, id: i32) -> AppError {
    AppError::NotFound {
        entity: entity.name,
        id: id.to_string(),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::List)?;
    let (limit, skip) = RequestValidator::paging(&params)?;
    let rows = CrudService::list(&state.pool, entity, limit, skip).await?;
    Ok(Json(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Create)?;
    let body = RequestValidator::validate_create(entity, &body_to_map(body)?)?;
    let row = CrudService::create(&state.pool, entity, &body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Read)?;
    let id = parse_id(&id_str)?;
    let row = CrudService::read(&state.pool, entity, id)
        .await?
        .ok_or_else(|| not_found(entity, id))?;
    Ok(Json(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Update)?;
    let id = parse_id(&id_str)?;
    let body = RequestValidator::validate_update(entity, &body_to_map(body)?)?;
    let row = CrudService::update(&state.pool, entity, id, &body)
        .await?
        .ok_or_else(|| not_found(entity, id))?;
    Ok(Json(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity_for(&state, &path_segment, Operation::Delete)?;
    let id = parse_id(&id_str)?;
    if !CrudService::delete(&state.pool, entity, id).await? {
        return Err(not_found(entity, id));
    }
    Ok(StatusCode::NO_CONTENT)
}
