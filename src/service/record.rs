//! Decode request bodies and query strings into typed field values.

use crate::config::{ColumnInfo, ColumnType, ResolvedResource};
use crate::error::AppError;
use crate::store::{parse_temporal, FieldValues};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct RecordDecoder;

impl RecordDecoder {
    /// Body must be a JSON object; anything else is `Invalid request body`.
    pub fn parse_body(bytes: &[u8]) -> Result<Map<String, Value>, AppError> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => Ok(map),
            _ => Err(AppError::invalid_body()),
        }
    }

    /// Values for a new row: every writable column, missing ones as null.
    /// Missing default-now columns are left out so the store fills them.
    pub fn for_create(resource: &ResolvedResource, body: &Map<String, Value>) -> Result<FieldValues, AppError> {
        let mut out = Vec::new();
        for c in resource.writable_columns() {
            match body.get(&c.field) {
                Some(v) => out.push((c.field.clone(), coerce(c, v)?)),
                None if c.default_now => {}
                None => out.push((c.field.clone(), Value::Null)),
            }
        }
        Ok(out)
    }

    /// Values for a full replace: missing fields become null, except write-only and
    /// default-now columns which keep their stored value unless supplied.
    pub fn for_update(resource: &ResolvedResource, body: &Map<String, Value>) -> Result<FieldValues, AppError> {
        let mut out = Vec::new();
        for c in resource.writable_columns() {
            match body.get(&c.field) {
                Some(v) => out.push((c.field.clone(), coerce(c, v)?)),
                None if c.write_only || c.default_now => {}
                None => out.push((c.field.clone(), Value::Null)),
            }
        }
        Ok(out)
    }

    /// Exact-match filters from query parameters on the primary key or any readable column.
    /// Other parameters are ignored.
    pub fn filters(resource: &ResolvedResource, params: &HashMap<String, String>) -> Result<FieldValues, AppError> {
        let mut out = Vec::new();
        for (key, raw) in params {
            let ty = if *key == resource.pk_field {
                ColumnType::Integer
            } else {
                match resource.column(key) {
                    Some(c) if c.readable() => c.type_,
                    _ => continue,
                }
            };
            let v = parse_scalar(ty, raw)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid value for {}", key)))?;
            out.push((key.clone(), v));
        }
        // Stable order keeps generated SQL deterministic.
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

/// `?id=` must be present and an integer.
pub fn parse_id(params: &HashMap<String, String>) -> Result<i64, AppError> {
    params
        .get("id")
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| AppError::BadRequest("Invalid id".into()))
}

/// Optional non-negative integer query parameter such as `limit`.
pub fn parse_count(params: &HashMap<String, String>, key: &str) -> Result<Option<u32>, AppError> {
    params
        .get(key)
        .map(|s| {
            s.trim()
                .parse()
                .map_err(|_| AppError::BadRequest(format!("Invalid {}", key)))
        })
        .transpose()
}

fn coerce(c: &ColumnInfo, v: &Value) -> Result<Value, AppError> {
    match (c.type_, v) {
        (_, Value::Null) => Ok(Value::Null),
        (ColumnType::Integer, Value::Number(n)) if n.is_i64() => Ok(v.clone()),
        // 3.0 from a form is still an integer.
        (ColumnType::Integer, Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Value::from(f as i64)),
            _ => Err(AppError::invalid_body()),
        },
        (ColumnType::Float, Value::Number(_))
        | (ColumnType::Boolean, Value::Bool(_))
        | (ColumnType::Text | ColumnType::Date | ColumnType::Timestamp, Value::String(_)) => Ok(v.clone()),
        _ => {
            tracing::debug!(field = %c.field, "type mismatch in request body");
            Err(AppError::invalid_body())
        }
    }
}

fn parse_scalar(ty: ColumnType, raw: &str) -> Option<Value> {
    match ty {
        ColumnType::Integer => raw.trim().parse::<i64>().ok().map(Value::from),
        ColumnType::Float => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        ColumnType::Boolean => match raw.to_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        ColumnType::Date | ColumnType::Timestamp => parse_temporal(raw).map(|_| Value::String(raw.trim().to_string())),
        ColumnType::Text => Some(Value::String(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{embedded_catalog, resolve, ResolvedModel};
    use serde_json::json;

    fn model() -> ResolvedModel {
        resolve(&embedded_catalog().unwrap()).unwrap()
    }

    fn object(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn body_must_be_an_object() {
        assert!(RecordDecoder::parse_body(br#"{"a":1}"#).is_ok());
        let bad_bodies: [&[u8]; 4] = [b"[1,2]", b"\"x\"", b"{", b""];
        for bad in bad_bodies {
            let err = RecordDecoder::parse_body(bad).unwrap_err();
            assert_eq!(err.to_string(), "Invalid request body");
        }
    }

    #[test]
    fn create_fills_missing_with_null_and_skips_read_only() {
        let m = model();
        let users = m.resource("user").unwrap();
        let values = RecordDecoder::for_create(
            users,
            &object(json!({"email": "a@b.c", "created_at": "2020-01-01", "user_id": 9})),
        )
        .unwrap();
        let fields: Vec<_> = values.iter().map(|(f, _)| f.as_str()).collect();
        assert!(fields.contains(&"password"));
        assert!(!fields.contains(&"created_at"));
        assert!(!fields.contains(&"user_id"));
        assert_eq!(values[0], ("email".to_string(), json!("a@b.c")));
    }

    #[test]
    fn update_keeps_password_unless_supplied() {
        let m = model();
        let users = m.resource("user").unwrap();
        let without = RecordDecoder::for_update(users, &object(json!({"email": "x@y.z"}))).unwrap();
        assert!(without.iter().all(|(f, _)| f != "password"));
        assert!(without.contains(&("first_name".to_string(), Value::Null)));

        let with = RecordDecoder::for_update(users, &object(json!({"password": "n3w"}))).unwrap();
        assert!(with.contains(&("password".to_string(), json!("n3w"))));
    }

    #[test]
    fn type_mismatch_is_invalid_body() {
        let m = model();
        let forest = m.resource("forest").unwrap();
        assert!(RecordDecoder::for_create(forest, &object(json!({"area_size": "big"}))).is_err());
        assert!(RecordDecoder::for_create(forest, &object(json!({"forest_name": 12}))).is_err());
        assert!(RecordDecoder::for_create(forest, &object(json!({"area_size": null}))).is_ok());
    }

    #[test]
    fn whole_floats_are_accepted_for_integers() {
        let m = model();
        let batch = m.resource("harvest_batch").unwrap();
        let values = RecordDecoder::for_create(batch, &object(json!({"forest_id": 3.0}))).unwrap();
        assert!(values.contains(&("forest_id".to_string(), json!(3))));
        assert!(RecordDecoder::for_create(batch, &object(json!({"forest_id": 3.5}))).is_err());
    }

    #[test]
    fn id_parsing() {
        let mut q = HashMap::new();
        assert_eq!(parse_id(&q).unwrap_err().to_string(), "Invalid id");
        q.insert("id".to_string(), "abc".to_string());
        assert!(parse_id(&q).is_err());
        q.insert("id".to_string(), "42".to_string());
        assert_eq!(parse_id(&q).unwrap(), 42);
    }

    #[test]
    fn filters_are_typed_and_ignore_unknown_keys() {
        let m = model();
        let batch = m.resource("harvest_batch").unwrap();
        let mut q = HashMap::new();
        q.insert("forest_id".to_string(), "4".to_string());
        q.insert("limit".to_string(), "10".to_string());
        let filters = RecordDecoder::filters(batch, &q).unwrap();
        assert_eq!(filters, vec![("forest_id".to_string(), json!(4))]);

        q.insert("forest_id".to_string(), "four".to_string());
        assert!(RecordDecoder::filters(batch, &q).is_err());
    }

    #[test]
    fn date_filters_must_parse() {
        let m = model();
        let batch = m.resource("harvest_batch").unwrap();
        let mut q = HashMap::new();
        q.insert("harvest_date".to_string(), "2024-03-05".to_string());
        assert_eq!(
            RecordDecoder::filters(batch, &q).unwrap(),
            vec![("harvest_date".to_string(), json!("2024-03-05"))]
        );
        q.insert("harvest_date".to_string(), "last tuesday".to_string());
        assert_eq!(
            RecordDecoder::filters(batch, &q).unwrap_err().to_string(),
            "Invalid value for harvest_date"
        );
    }

    #[test]
    fn password_is_not_filterable() {
        let m = model();
        let users = m.resource("user").unwrap();
        let mut q = HashMap::new();
        q.insert("password".to_string(), "secret".to_string());
        assert!(RecordDecoder::filters(users, &q).unwrap().is_empty());
    }
}
