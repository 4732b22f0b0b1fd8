//! Router assembly: common routes at the root, entity routes under the API prefix, shared layers.

use crate::error::ConfigError;
use crate::routes::{common_routes, entity_routes};
use crate::settings::Settings;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Credentialed CORS for the configured origins. Methods and headers mirror the preflight.
pub fn cors_layer(settings: &Settings) -> Result<CorsLayer, ConfigError> {
    let origins = settings
        .cors_origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).map_err(|_| ConfigError::InvalidSetting {
                name: "BACKEND_CORS_ORIGINS",
                reason: format!("invalid origin: {}", o),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true))
}

pub fn build_app(state: AppState) -> Result<Router, ConfigError> {
    let cors = cors_layer(&state.settings)?;
    let prefix = state.settings.api_prefix.clone();
    let app = Router::new()
        .merge(common_routes(state.clone()))
        .nest(&prefix, entity_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES)),
        );
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{catalog, resolve};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    // The pool never connects: every request below is answered before a query runs.
    fn app() -> Router {
        let settings = Settings::default();
        let pool = PgPoolOptions::new()
            .connect_lazy(&settings.database_url)
            .unwrap();
        let model = resolve(catalog()).unwrap();
        build_app(AppState::new(pool, model, settings)).unwrap()
    }

    async fn send(method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn root_and_health() {
        let (status, body) = send(Method::GET, "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({"message": "Sistema Académico API", "version": "1.0.0", "status": "active"})
        );
        let (status, body) = send(Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn grade_above_twenty_is_rejected() {
        let (status, body) = send(
            Method::POST,
            "/api/v1/grades",
            Some(json!({"matricula_id": 1, "nota": 21})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "validation_error");
        assert_eq!(body["error"]["details"][0]["field"], "nota");
    }

    #[tokio::test]
    async fn zero_credit_course_is_rejected() {
        let (status, body) = send(
            Method::POST,
            "/api/v1/courses",
            Some(json!({
                "carrera_id": 1,
                "codigo": "MAT101",
                "nombre": "Calculo",
                "creditos": 0,
                "nivel_semestre": 1
            })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"][0]["field"], "creditos");
        assert_eq!(body["error"]["details"][0]["code"], "exclusive_minimum");
    }

    #[tokio::test]
    async fn unknown_resource_is_not_found() {
        let (status, body) = send(Method::GET, "/api/v1/libraries", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn non_numeric_id_is_bad_request() {
        let (status, body) = send(Method::GET, "/api/v1/students/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn zero_limit_is_rejected() {
        let (status, body) = send(Method::GET, "/api/v1/students?limit=0", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "validation_error");
    }

    #[tokio::test]
    async fn prerequisites_cannot_be_patched() {
        let (status, body) = send(Method::PATCH, "/api/v1/prerequisites/1", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn body_rejections_use_the_error_envelope() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/students")
            .body(Body::empty())
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body: Value = serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["error"]["code"], "bad_request");

        let req = Request::builder()
            .method(Method::PATCH)
            .uri("/api/v1/students/1")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"nombre\": "))
            .unwrap();
        let resp = app().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn paging_beyond_bigint_is_reported_on_skip() {
        let (status, body) = send(Method::GET, "/api/v1/students?skip=18446744073709551615", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"][0]["field"], "skip");
    }

    #[tokio::test]
    async fn oversized_amount_is_rejected_before_the_store() {
        let (status, body) = send(
            Method::POST,
            "/api/v1/enrollments",
            Some(json!({"estudiante_id": 1, "seccion_id": 1, "costo": "123456789012.00"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["details"][0]["field"], "costo");
        assert_eq!(body["error"]["details"][0]["code"], "precision");
    }

    #[tokio::test]
    async fn openapi_document_is_served_under_prefix() {
        let (status, body) = send(Method::GET, "/api/v1/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/v1/students"].is_object());
    }

    #[test]
    fn malformed_origin_is_a_config_error() {
        let settings = Settings {
            cors_origins: vec!["http://ok.example".into(), "bad\norigin".into()],
            ..Settings::default()
        };
        assert!(matches!(
            cors_layer(&settings),
            Err(ConfigError::InvalidSetting { name: "BACKEND_CORS_ORIGINS", .. })
        ));
    }
}
