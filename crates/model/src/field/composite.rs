use super::Field;
use crate::{
    core::value::Value,
    error::{FieldError, Result},
};
use serde::Serialize;
use serde_json::{Map, Value as Json};
use tracing::warn;

/// Records exposing more attributes than this are rejected before validation.
pub const MAX_RECORD_ATTRIBUTES: usize = 1000;

pub(super) fn validate_object(field: &Field, children: &[(String, Field)], value: &Value) -> Result<Value> {
    let source = match value {
        Value::Json(Json::Object(map)) => map.clone(),
        Value::Json(Json::String(text)) | Value::String(text) => parse_json_object(field, value, text)?,
        _ => return Err(field.invalid(value, "expected a mapping or a JSON object string")),
    };

    let mut normalized = Map::new();
    for (key, child) in children {
        match source.get(key) {
            Some(raw) if !raw.is_null() => {
                let checked = child.validate(&Value::Json(raw.clone()))?;
                normalized.insert(key.clone(), checked.to_json());
            }
            _ => {
                if let Some(default) = child.default_value() {
                    normalized.insert(key.clone(), default.to_json());
                }
            }
        }
    }

    let undeclared: Vec<&String> = source
        .keys()
        .filter(|key| !children.iter().any(|(name, _)| name == *key))
        .collect();
    if !undeclared.is_empty() {
        warn!(field = field.display_name(), ?undeclared, "dropping undeclared attributes");
    }

    Ok(Value::Json(Json::Object(normalized)))
}

fn parse_json_object(field: &Field, value: &Value, text: &str) -> Result<Map<String, Json>> {
    match serde_json::from_str::<Json>(text) {
        Ok(Json::Object(map)) => Ok(map),
        Ok(_) => Err(field.invalid(value, "JSON text is not an object")),
        Err(e) => Err(field.invalid(value, e.to_string())),
    }
}

impl Field {
    /// Validates any serializable record against a composite field. The record's
    /// serialized attributes are counted first and rejected above
    /// [`MAX_RECORD_ATTRIBUTES`].
    pub fn validate_record<T: Serialize>(&self, record: &T) -> Result<Value> {
        let json = serde_json::to_value(record)
            .map_err(|e| self.invalid(&Value::Null, format!("record is not serializable: {e}")))?;
        if let Json::Object(map) = &json
            && map.len() > MAX_RECORD_ATTRIBUTES
        {
            return Err(FieldError::StructuralLimitExceeded {
                field: self.display_name().to_string(),
                count: map.len(),
                limit: MAX_RECORD_ATTRIBUTES,
            });
        }
        self.validate(&Value::Json(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn big_brother() -> Field {
        Field::object([
            ("head", Field::integer()),
            ("body", Field::text().with_default("slim").unwrap()),
            ("hand", Field::object([("finger", Field::float())])),
        ])
        .named("bigbrother")
    }

    #[test]
    fn test_children_are_qualified() {
        let field = big_brother();
        assert_eq!(field.child("head").and_then(Field::name), Some("bigbrother.head"));
        let finger = field.child("hand").and_then(|hand| hand.child("finger"));
        assert_eq!(finger.and_then(Field::name), Some("bigbrother.hand.finger"));
    }

    #[test]
    fn test_mapping_is_validated_and_defaults_filled() {
        let field = big_brother();
        let value = Value::Json(json!({"head": "3", "hand": {"finger": 2}, "tail": 1}));
        assert_eq!(
            field.validate(&value).unwrap(),
            Value::Json(json!({"head": 3, "body": "slim", "hand": {"finger": 2.0}}))
        );
    }

    #[test]
    fn test_json_string_input() {
        let field = big_brother();
        let value = Value::from(r#"{"head": 1}"#);
        assert_eq!(
            field.validate(&value).unwrap(),
            Value::Json(json!({"head": 1, "body": "slim"}))
        );
        assert!(field.validate(&Value::from("[1, 2]")).is_err());
        assert!(field.validate(&Value::Int(1)).is_err());
    }

    #[test]
    fn test_child_failure_propagates() {
        let field = big_brother();
        let err = field
            .validate(&Value::Json(json!({"head": "big"})))
            .unwrap_err();
        assert!(matches!(err, FieldError::Validation { ref field, .. } if field == "bigbrother.head"));
    }

    #[derive(Serialize)]
    struct Person {
        head: i64,
        body: String,
    }

    #[test]
    fn test_record_validation() {
        let field = big_brother();
        let person = Person {
            head: 2,
            body: "round".into(),
        };
        assert_eq!(
            field.validate_record(&person).unwrap(),
            Value::Json(json!({"head": 2, "body": "round"}))
        );
    }

    #[test]
    fn test_record_attribute_limit() {
        let field = big_brother();
        let wide: BTreeMap<String, i64> = (0..=MAX_RECORD_ATTRIBUTES)
            .map(|i| (format!("attr_{i}"), i as i64))
            .collect();
        let err = field.validate_record(&wide).unwrap_err();
        assert!(matches!(
            err,
            FieldError::StructuralLimitExceeded { count, limit, .. }
                if count == MAX_RECORD_ATTRIBUTES + 1 && limit == MAX_RECORD_ATTRIBUTES
        ));
    }
}
