//! OpenAPI document generated from the entity descriptors.

use crate::config::{EntityDef, FieldDef, FieldKind, Operation, ResolvedModel, REGISTERED_AT_COLUMN};
use crate::service::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::settings::Settings;
use crate::state::AppState;
use axum::{extract::State, Json};
use utoipa::openapi::path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder};
use utoipa::openapi::request_body::RequestBodyBuilder;
use utoipa::openapi::response::{Response, ResponseBuilder};
use utoipa::openapi::schema::{
    Array, KnownFormat, Object, ObjectBuilder, Schema, SchemaFormat, SchemaType, Type,
};
use utoipa::openapi::{
    ComponentsBuilder, Content, ContentBuilder, InfoBuilder, OpenApi, OpenApiBuilder, PathsBuilder, Ref, RefOr,
    Required,
};

const JSON: &str = "application/json";

pub async fn openapi_json(State(state): State<AppState>) -> Json<OpenApi> {
    Json(build_openapi(&state.model, &state.settings))
}

pub fn build_openapi(model: &ResolvedModel, settings: &Settings) -> OpenApi {
    let mut components = ComponentsBuilder::new().schema("Error", RefOr::T(Schema::Object(error_schema())));
    let mut paths = PathsBuilder::new();
    for entity in &model.entities {
        components = components
            .schema(format!("{}Create", entity.name), object_ref(create_schema(entity)))
            .schema(format!("{}Read", entity.name), object_ref(read_schema(entity)));
        if entity.allows(Operation::Update) {
            components = components.schema(format!("{}Update", entity.name), object_ref(update_schema(entity)));
        }

        let base = format!("{}/{}", settings.api_prefix, entity.path_segment);
        let mut collection = PathItemBuilder::new();
        if entity.allows(Operation::List) {
            collection = collection.operation(HttpMethod::Get, list_operation(entity));
        }
        if entity.allows(Operation::Create) {
            collection = collection.operation(HttpMethod::Post, create_operation(entity));
        }
        let mut item = PathItemBuilder::new();
        if entity.allows(Operation::Read) {
            item = item.operation(HttpMethod::Get, read_operation(entity));
        }
        if entity.allows(Operation::Update) {
            item = item.operation(HttpMethod::Patch, update_operation(entity));
        }
        if entity.allows(Operation::Delete) {
            item = item.operation(HttpMethod::Delete, delete_operation(entity));
        }
        paths = paths
            .path(base.clone(), collection.build())
            .path(format!("{}/{{id}}", base), item.build());
    }

    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title(settings.project_name.clone())
                .version(settings.version.clone())
                .build(),
        )
        .paths(paths.build())
        .components(Some(components.build()))
        .build()
}

fn object_ref(o: Object) -> RefOr<Schema> {
    RefOr::T(Schema::Object(o))
}

fn schema_ref(name: String) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(name))
}

fn json_content(schema: RefOr<Schema>) -> Content {
    ContentBuilder::new().schema(Some(schema)).build()
}

fn field_schema(f: &FieldDef, nullable: bool) -> Object {
    let base = match f.kind {
        FieldKind::Integer => ObjectBuilder::new()
            .schema_type(scalar_type(Type::Integer, nullable))
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::Int32))),
        FieldKind::Text => ObjectBuilder::new()
            .schema_type(scalar_type(Type::String, nullable))
            .max_length(f.rule.max_length.map(|n| n as usize)),
        FieldKind::Boolean => ObjectBuilder::new().schema_type(scalar_type(Type::Boolean, nullable)),
        FieldKind::Date => ObjectBuilder::new()
            .schema_type(scalar_type(Type::String, nullable))
            .format(Some(SchemaFormat::KnownFormat(KnownFormat::Date))),
        FieldKind::Decimal { scale, .. } => ObjectBuilder::new()
            .schema_type(scalar_type(Type::String, nullable))
            .pattern(Some(format!(r"^-?\d+(\.\d{{1,{}}})?$", scale)))
            .description(Some(format!("decimal with up to {} fractional digits", scale))),
    };
    base.minimum(f.rule.minimum)
        .exclusive_minimum(f.rule.exclusive_minimum)
        .maximum(f.rule.maximum)
        .build()
}

fn scalar_type(t: Type, nullable: bool) -> SchemaType {
    if nullable {
        SchemaType::Array(vec![t, Type::Null])
    } else {
        SchemaType::Type(t)
    }
}

fn create_schema(entity: &EntityDef) -> Object {
    let mut o = ObjectBuilder::new().schema_type(SchemaType::Type(Type::Object));
    for f in &entity.fields {
        o = o.property(f.name, object_ref(field_schema(f, f.nullable)));
        if f.required() {
            o = o.required(f.name);
        }
    }
    o.build()
}

fn update_schema(entity: &EntityDef) -> Object {
    let mut o = ObjectBuilder::new().schema_type(SchemaType::Type(Type::Object));
    for f in entity.updatable_fields() {
        o = o.property(f.name, object_ref(field_schema(f, f.nullable)));
    }
    o.build()
}

fn read_schema(entity: &EntityDef) -> Object {
    let pk = entity.pk_column();
    let mut o = ObjectBuilder::new()
        .schema_type(SchemaType::Type(Type::Object))
        .property(
            pk.clone(),
            object_ref(
                ObjectBuilder::new()
                    .schema_type(SchemaType::Type(Type::Integer))
                    .format(Some(SchemaFormat::KnownFormat(KnownFormat::Int32)))
                    .build(),
            ),
        )
        .required(pk);
    for f in &entity.fields {
        o = o.property(f.name, object_ref(field_schema(f, f.nullable))).required(f.name);
    }
    o.property(
        REGISTERED_AT_COLUMN,
        object_ref(
            ObjectBuilder::new()
                .schema_type(SchemaType::Type(Type::String))
                .format(Some(SchemaFormat::KnownFormat(KnownFormat::DateTime)))
                .build(),
        ),
    )
    .required(REGISTERED_AT_COLUMN)
    .build()
}

fn error_schema() -> Object {
    let string = || object_ref(ObjectBuilder::new().schema_type(SchemaType::Type(Type::String)).build());
    let detail = ObjectBuilder::new()
        .schema_type(SchemaType::Type(Type::Object))
        .property("code", string())
        .property("message", string())
        .property("details", object_ref(ObjectBuilder::new().build()))
        .required("code")
        .required("message")
        .build();
    ObjectBuilder::new()
        .schema_type(SchemaType::Type(Type::Object))
        .property("error", object_ref(detail))
        .required("error")
        .build()
}

fn id_parameter() -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name("id")
        .parameter_in(ParameterIn::Path)
        .required(Required::True)
        .schema(Some(object_ref(
            ObjectBuilder::new()
                .schema_type(SchemaType::Type(Type::Integer))
                .format(Some(SchemaFormat::KnownFormat(KnownFormat::Int32)))
                .build(),
        )))
        .build()
}

fn paging_parameter(name: &str, minimum: f64, maximum: Option<f64>, default: u32) -> utoipa::openapi::path::Parameter {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .schema(Some(object_ref(
            ObjectBuilder::new()
                .schema_type(SchemaType::Type(Type::Integer))
                .minimum(Some(minimum))
                .maximum(maximum)
                .default(Some(serde_json::Value::from(default)))
                .build(),
        )))
        .build()
}

fn error_response(description: &str) -> RefOr<Response> {
    RefOr::T(
        ResponseBuilder::new()
            .description(description)
            .content(JSON, json_content(schema_ref("Error".into())))
            .build(),
    )
}

fn read_response(entity: &EntityDef, description: &str) -> RefOr<Response> {
    RefOr::T(
        ResponseBuilder::new()
            .description(description)
            .content(JSON, json_content(schema_ref(format!("{}Read", entity.name))))
            .build(),
    )
}

fn list_operation(entity: &EntityDef) -> utoipa::openapi::path::Operation {
    let rows = RefOr::T(Schema::Array(Array::new(schema_ref(format!("{}Read", entity.name)))));
    OperationBuilder::new()
        .tag(entity.path_segment)
        .operation_id(Some(format!("list_{}", entity.path_segment)))
        .summary(Some(format!("List {}", entity.path_segment)))
        .parameter(paging_parameter("skip", 0.0, None, 0))
        .parameter(paging_parameter("limit", 1.0, Some(MAX_LIMIT as f64), DEFAULT_LIMIT))
        .response(
            "200",
            RefOr::T(
                ResponseBuilder::new()
                    .description("Page ordered by id")
                    .content(JSON, json_content(rows))
                    .build(),
            ),
        )
        .response("422", error_response("Invalid paging parameters"))
        .build()
}

fn create_operation(entity: &EntityDef) -> utoipa::openapi::path::Operation {
    OperationBuilder::new()
        .tag(entity.path_segment)
        .operation_id(Some(format!("create_{}", entity.path_segment)))
        .summary(Some(format!("Create {}", entity.name)))
        .request_body(Some(
            RequestBodyBuilder::new()
                .content(JSON, json_content(schema_ref(format!("{}Create", entity.name))))
                .required(Some(Required::True))
                .build(),
        ))
        .response("201", read_response(entity, "Created"))
        .response("409", error_response("Uniqueness or reference violation"))
        .response("422", error_response("Validation error"))
        .build()
}

fn read_operation(entity: &EntityDef) -> utoipa::openapi::path::Operation {
    OperationBuilder::new()
        .tag(entity.path_segment)
        .operation_id(Some(format!("get_{}", entity.path_segment)))
        .summary(Some(format!("Get {} by id", entity.name)))
        .parameter(id_parameter())
        .response("200", read_response(entity, "Found"))
        .response("404", error_response("Not found"))
        .build()
}

fn update_operation(entity: &EntityDef) -> utoipa::openapi::path::Operation {
    OperationBuilder::new()
        .tag(entity.path_segment)
        .operation_id(Some(format!("update_{}", entity.path_segment)))
        .summary(Some(format!("Partially update {}", entity.name)))
        .parameter(id_parameter())
        .request_body(Some(
            RequestBodyBuilder::new()
                .content(JSON, json_content(schema_ref(format!("{}Update", entity.name))))
                .required(Some(Required::True))
                .build(),
        ))
        .response("200", read_response(entity, "Updated"))
        .response("404", error_response("Not found"))
        .response("409", error_response("Uniqueness or reference violation"))
        .response("422", error_response("Validation error"))
        .build()
}

fn delete_operation(entity: &EntityDef) -> utoipa::openapi::path::Operation {
    OperationBuilder::new()
        .tag(entity.path_segment)
        .operation_id(Some(format!("delete_{}", entity.path_segment)))
        .summary(Some(format!("Delete {}", entity.name)))
        .parameter(id_parameter())
        .response("204", RefOr::T(ResponseBuilder::new().description("Deleted").build()))
        .response("404", error_response("Not found"))
        .response("409", error_response("Row still referenced"))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{catalog, resolve};

    fn doc() -> serde_json::Value {
        let model = resolve(catalog()).unwrap();
        serde_json::to_value(build_openapi(&model, &Settings::default())).unwrap()
    }

    #[test]
    fn every_entity_has_collection_and_item_paths() {
        let doc = doc();
        let paths = doc["paths"].as_object().unwrap();
        assert_eq!(paths.len(), 20);
        assert!(paths["/api/v1/grades"]["post"].is_object());
        assert!(paths["/api/v1/grades/{id}"]["patch"].is_object());
        assert!(paths["/api/v1/prerequisites/{id}"].get("patch").is_none());
        assert_eq!(doc["info"]["title"], "Sistema Académico API");
    }

    #[test]
    fn create_schema_lists_required_fields_and_bounds() {
        let doc = doc();
        let grade = &doc["components"]["schemas"]["GradeCreate"];
        assert_eq!(grade["required"], serde_json::json!(["matricula_id"]));
        assert_eq!(grade["properties"]["nota"]["maximum"].as_f64(), Some(20.0));
        let course = &doc["components"]["schemas"]["CourseCreate"];
        assert_eq!(course["properties"]["creditos"]["exclusiveMinimum"].as_f64(), Some(0.0));
        assert!(doc["components"]["schemas"].get("PrerequisiteUpdate").is_none());
    }
}
