//! Academic administration REST backend: entity descriptors drive schema, validation, and routes.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod openapi;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use app::{build_app, cors_layer};
pub use config::{catalog, resolve, EntityDef, ResolvedModel};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use openapi::build_openapi;
pub use routes::{common_routes, entity_routes};
pub use service::CrudService;
pub use settings::Settings;
pub use state::AppState;
pub use store::{connect, ensure_database_exists};
