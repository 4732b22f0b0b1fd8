//! Request validation from entity descriptors.
//!
//! Every violated constraint is collected and reported together. Accepted values are
//! normalized (decimals to canonical strings) and fields outside the operation's shape
//! are dropped.

use crate::config::{EntityDef, FieldDef, FieldKind};
use crate::error::{AppError, FieldViolation};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

fn decimal_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(\d+)(?:\.(\d+))?$").expect("static pattern"))
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body. All required fields must be present.
    pub fn validate_create(
        entity: &EntityDef,
        body: &HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>, AppError> {
        let mut out = HashMap::new();
        let mut violations = Vec::new();
        for f in &entity.fields {
            match body.get(f.name) {
                None if f.required() => {
                    violations.push(FieldViolation::new(f.name, "required", "field required"));
                }
                None => {}
                Some(v) => match validate_field(f, v) {
                    Ok(v) => {
                        out.insert(f.name.to_string(), v);
                    }
                    Err(mut errs) => violations.append(&mut errs),
                },
            }
        }
        finish(out, violations)
    }

    /// Validate only the updatable fields present in body (for PATCH). Absent fields are untouched.
    pub fn validate_update(
        entity: &EntityDef,
        body: &HashMap<String, Value>,
    ) -> Result<HashMap<String, Value>, AppError> {
        let mut out = HashMap::new();
        let mut violations = Vec::new();
        for f in entity.updatable_fields() {
            let Some(v) = body.get(f.name) else { continue };
            match validate_field(f, v) {
                Ok(v) => {
                    out.insert(f.name.to_string(), v);
                }
                Err(mut errs) => violations.append(&mut errs),
            }
        }
        finish(out, violations)
    }

    /// `skip` (default 0, non-negative) and `limit` (default 100, 1..=1000) from query params.
    pub fn paging(params: &HashMap<String, String>) -> Result<(u32, u64), AppError> {
        let mut violations = Vec::new();
        let limit = match params.get("limit") {
            None => DEFAULT_LIMIT,
            Some(s) => match s.trim().parse::<u32>() {
                Ok(n) if (1..=MAX_LIMIT).contains(&n) => n,
                _ => {
                    violations.push(FieldViolation::new(
                        "limit",
                        "range",
                        format!("must be an integer between 1 and {}", MAX_LIMIT),
                    ));
                    DEFAULT_LIMIT
                }
            },
        };
        let skip = match params.get("skip") {
            None => 0,
            Some(s) => match s.trim().parse::<i64>() {
                Ok(n) if n >= 0 => n as u64,
                _ => {
                    violations.push(FieldViolation::new(
                        "skip",
                        "range",
                        format!("must be an integer between 0 and {}", i64::MAX),
                    ));
                    0
                }
            },
        };
        if violations.is_empty() {
            Ok((limit, skip))
        } else {
            Err(AppError::Validation(violations))
        }
    }
}

fn finish(
    out: HashMap<String, Value>,
    violations: Vec<FieldViolation>,
) -> Result<HashMap<String, Value>, AppError> {
    if violations.is_empty() {
        Ok(out)
    } else {
        Err(AppError::Validation(violations))
    }
}

fn validate_field(f: &FieldDef, v: &Value) -> Result<Value, Vec<FieldViolation>> {
    if v.is_null() {
        return if f.nullable {
            Ok(Value::Null)
        } else {
            Err(vec![FieldViolation::new(f.name, "not_null", "may not be null")])
        };
    }
    match f.kind {
        FieldKind::Text => validate_text(f, v),
        FieldKind::Integer => validate_integer(f, v),
        FieldKind::Boolean => match v {
            Value::Bool(_) => Ok(v.clone()),
            _ => Err(vec![type_error(f, "a boolean")]),
        },
        FieldKind::Date => match v.as_str() {
            Some(s) if chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok() => Ok(v.clone()),
            _ => Err(vec![type_error(f, "a date (YYYY-MM-DD)")]),
        },
        FieldKind::Decimal { precision, scale } => validate_decimal(f, v, precision, scale),
    }
}

fn type_error(f: &FieldDef, expected: &str) -> FieldViolation {
    FieldViolation::new(f.name, "type", format!("must be {}", expected))
}

fn validate_text(f: &FieldDef, v: &Value) -> Result<Value, Vec<FieldViolation>> {
    let Some(s) = v.as_str() else {
        return Err(vec![type_error(f, "a string")]);
    };
    if let Some(max) = f.rule.max_length {
        if s.chars().count() > max as usize {
            return Err(vec![FieldViolation::new(
                f.name,
                "max_length",
                format!("must be at most {} characters", max),
            )]);
        }
    }
    Ok(v.clone())
}

fn validate_integer(f: &FieldDef, v: &Value) -> Result<Value, Vec<FieldViolation>> {
    let n = match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|x| x.fract() == 0.0).map(|x| x as i64)),
        _ => None,
    };
    let Some(n) = n.and_then(|n| i32::try_from(n).ok()) else {
        return Err(vec![type_error(f, "a 32-bit integer")]);
    };
    let errs = check_bounds(f, n as f64);
    if errs.is_empty() {
        Ok(Value::from(n))
    } else {
        Err(errs)
    }
}

/// Accepts a JSON number or numeric string; returns the canonical string form.
fn validate_decimal(f: &FieldDef, v: &Value, precision: u32, scale: u32) -> Result<Value, Vec<FieldViolation>> {
    let text = match v {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(vec![type_error(f, "a decimal number")]),
    };
    let Some(caps) = decimal_pattern().captures(&text) else {
        return Err(vec![type_error(f, "a decimal number")]);
    };
    let mut errs = Vec::new();
    let integer_digits = caps.get(1).map_or("", |m| m.as_str().trim_start_matches('0')).len();
    let max_integer_digits = precision.saturating_sub(scale) as usize;
    if integer_digits > max_integer_digits {
        errs.push(FieldViolation::new(
            f.name,
            "precision",
            format!("must have at most {} digits before the decimal point", max_integer_digits),
        ));
    }
    let fraction = caps.get(2).map(|m| m.as_str().trim_end_matches('0')).unwrap_or("");
    if fraction.len() > scale as usize {
        errs.push(FieldViolation::new(
            f.name,
            "decimal_places",
            format!("must have at most {} decimal places", scale),
        ));
    }
    match text.parse::<f64>() {
        Ok(x) => errs.extend(check_bounds(f, x)),
        Err(_) => errs.push(type_error(f, "a decimal number")),
    }
    if errs.is_empty() {
        Ok(Value::String(text))
    } else {
        Err(errs)
    }
}

fn check_bounds(f: &FieldDef, x: f64) -> Vec<FieldViolation> {
    let mut errs = Vec::new();
    if let Some(min) = f.rule.minimum {
        if x < min {
            errs.push(FieldViolation::new(f.name, "minimum", format!("must be at least {}", min)));
        }
    }
    if let Some(min) = f.rule.exclusive_minimum {
        if x <= min {
            errs.push(FieldViolation::new(
                f.name,
                "exclusive_minimum",
                format!("must be greater than {}", min),
            ));
        }
    }
    if let Some(max) = f.rule.maximum {
        if x > max {
            errs.push(FieldViolation::new(f.name, "maximum", format!("must be at most {}", max)));
        }
    }
    errs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::{course, enrollment, grade, student};
    use serde_json::json;

    fn body(v: Value) -> HashMap<String, Value> {
        v.as_object().unwrap().clone().into_iter().collect()
    }

    fn violations(r: Result<HashMap<String, Value>, AppError>) -> Vec<FieldViolation> {
        match r {
            Err(AppError::Validation(v)) => v,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn grade_score_is_bounded_inclusively() {
        let g = grade();
        let v = violations(RequestValidator::validate_create(&g, &body(json!({"matricula_id": 1, "nota": 21}))));
        assert_eq!(v.len(), 1);
        assert_eq!((v[0].field.as_str(), v[0].code), ("nota", "maximum"));

        let ok = RequestValidator::validate_create(&g, &body(json!({"matricula_id": 1, "nota": 20}))).unwrap();
        assert_eq!(ok["nota"], json!("20"));
        assert!(RequestValidator::validate_create(&g, &body(json!({"matricula_id": 1, "nota": 0}))).is_ok());
        assert!(RequestValidator::validate_create(&g, &body(json!({"matricula_id": 1, "nota": -0.5}))).is_err());
    }

    #[test]
    fn grade_score_has_two_decimal_places() {
        let g = grade();
        let ok = RequestValidator::validate_create(&g, &body(json!({"matricula_id": 1, "nota": "15.50"}))).unwrap();
        assert_eq!(ok["nota"], json!("15.50"));
        let v = violations(RequestValidator::validate_create(&g, &body(json!({"matricula_id": 1, "nota": 15.555}))));
        assert_eq!(v[0].code, "decimal_places");
        let v = violations(RequestValidator::validate_create(&g, &body(json!({"matricula_id": 1, "nota": "quince"}))));
        assert_eq!(v[0].code, "type");
    }

    #[test]
    fn decimal_integer_digits_fit_the_column() {
        let e = enrollment();
        let base = |costo: Value| body(json!({"estudiante_id": 1, "seccion_id": 2, "costo": costo}));
        assert!(RequestValidator::validate_create(&e, &base(json!("9999999999.99"))).is_ok());
        assert!(RequestValidator::validate_create(&e, &base(json!("0001234.50"))).is_ok());
        let v = violations(RequestValidator::validate_create(&e, &base(json!("123456789012.00"))));
        assert_eq!((v[0].field.as_str(), v[0].code), ("costo", "precision"));
        let v = violations(RequestValidator::validate_create(&e, &base(json!(12345678901u64))));
        assert_eq!(v[0].code, "precision");
    }

    #[test]
    fn course_credits_must_be_positive() {
        let c = course();
        let base = json!({"carrera_id": 1, "codigo": "MAT101", "nombre": "Calculo I", "nivel_semestre": 1});
        let mut zero = base.clone();
        zero["creditos"] = json!(0);
        let v = violations(RequestValidator::validate_create(&c, &body(zero)));
        assert_eq!((v[0].field.as_str(), v[0].code), ("creditos", "exclusive_minimum"));

        let mut one = base;
        one["creditos"] = json!(1);
        assert!(RequestValidator::validate_create(&c, &body(one)).is_ok());
    }

    #[test]
    fn every_violation_is_reported() {
        let s = student();
        let v = violations(RequestValidator::validate_create(
            &s,
            &body(json!({"nombre": "x".repeat(51), "dni": 12345678, "fecha_nacimiento": "31/12/2000"})),
        ));
        let mut fields: Vec<_> = v.iter().map(|x| (x.field.as_str(), x.code)).collect();
        fields.sort();
        assert_eq!(
            fields,
            vec![
                ("apellido", "required"),
                ("dni", "type"),
                ("email", "required"),
                ("fecha_nacimiento", "type"),
                ("nombre", "max_length"),
            ]
        );
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        let s = student();
        let name = "ñ".repeat(50);
        let ok = RequestValidator::validate_update(&s, &body(json!({ "nombre": name })));
        assert!(ok.is_ok());
    }

    #[test]
    fn defaulted_and_nullable_fields_are_optional_on_create() {
        let e = enrollment();
        let ok = RequestValidator::validate_create(&e, &body(json!({"estudiante_id": 1, "seccion_id": 2, "costo": 0})))
            .unwrap();
        assert_eq!(ok.len(), 3);
        assert!(!ok.contains_key("estado"));
    }

    #[test]
    fn update_ignores_absent_required_and_non_updatable_fields() {
        let g = grade();
        let ok = RequestValidator::validate_update(&g, &body(json!({"observacion": "ok", "matricula_id": 99, "extra": 1})))
            .unwrap();
        assert_eq!(ok.len(), 1);
        assert_eq!(ok["observacion"], json!("ok"));

        assert!(RequestValidator::validate_update(&g, &HashMap::new()).unwrap().is_empty());
    }

    #[test]
    fn explicit_null_clears_nullable_but_not_required_fields() {
        let s = student();
        let ok = RequestValidator::validate_update(&s, &body(json!({"telefono": null}))).unwrap();
        assert_eq!(ok["telefono"], Value::Null);
        let v = violations(RequestValidator::validate_update(&s, &body(json!({"nombre": null}))));
        assert_eq!(v[0].code, "not_null");
    }

    #[test]
    fn integers_must_fit_in_32_bits() {
        let c = course();
        let v = violations(RequestValidator::validate_update(&c, &body(json!({"creditos": 3_000_000_000u64}))));
        assert_eq!(v[0].code, "type");
        let ok = RequestValidator::validate_update(&c, &body(json!({"creditos": 4.0}))).unwrap();
        assert_eq!(ok["creditos"], json!(4));
    }

    #[test]
    fn paging_defaults_and_bounds() {
        let p = |pairs: &[(&str, &str)]| -> HashMap<String, String> {
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
        };
        assert_eq!(RequestValidator::paging(&p(&[])).unwrap(), (100, 0));
        assert_eq!(RequestValidator::paging(&p(&[("skip", "5"), ("limit", "2")])).unwrap(), (2, 5));
        assert!(RequestValidator::paging(&p(&[("limit", "0")])).is_err());
        assert!(RequestValidator::paging(&p(&[("limit", "1001")])).is_err());
        let v = match RequestValidator::paging(&p(&[("skip", "-1"), ("limit", "abc")])) {
            Err(AppError::Validation(v)) => v,
            _ => panic!("expected validation error"),
        };
        assert_eq!(v.len(), 2);
        assert_eq!(
            RequestValidator::paging(&p(&[("skip", "9223372036854775807")])).unwrap(),
            (100, i64::MAX as u64)
        );
        let v = match RequestValidator::paging(&p(&[("skip", "9223372036854775808")])) {
            Err(AppError::Validation(v)) => v,
            _ => panic!("expected validation error"),
        };
        assert_eq!(v[0].field, "skip");
    }
}
