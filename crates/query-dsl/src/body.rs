//! Nested-map document with a working scope, shared by every clause variant.

use crate::{
    error::Result,
    version::{FieldGate, Version},
};
use serde_json::{Map, Value};
use tracing::trace;

/// The document of one clause.
///
/// `root` never changes its top-level shape after construction. Setters write into
/// the map found by following `scope` from the root; missing maps on that path are
/// created on first write. Fields gated out for the declared version are silently
/// dropped by setters and hidden from getters.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseBody {
    root: Map<String, Value>,
    scope: Vec<String>,
    version: Version,
    gated: Vec<&'static str>,
}

impl ClauseBody {
    pub(crate) fn new(scope: &[&str], version: Version, gates: &[FieldGate]) -> Result<Self> {
        let version = version.ensure_supported()?;
        let gated = gates
            .iter()
            .filter(|gate| !gate.admits(version))
            .map(|gate| gate.field)
            .collect();

        let mut body = Self {
            root: Map::new(),
            scope: scope.iter().map(|key| key.to_string()).collect(),
            version,
            gated,
        };
        body.scope_mut();
        Ok(body)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn is_gated(&self, field: &str) -> bool {
        self.gated.contains(&field)
    }

    pub fn document(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn into_document(self) -> Value {
        Value::Object(self.root)
    }

    /// The working scope, if it has been materialized.
    pub fn scope(&self) -> Option<&Map<String, Value>> {
        let mut current = &self.root;
        for key in &self.scope {
            current = current.get(key)?.as_object()?;
        }
        Some(current)
    }

    pub(crate) fn scope_mut(&mut self) -> &mut Map<String, Value> {
        let mut current = &mut self.root;
        for key in &self.scope {
            let entry = current
                .entry(key.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            current = ensure_object(entry);
        }
        current
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        if self.is_gated(field) {
            return None;
        }
        self.scope()?.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Writes `field`, replacing any previous value. Returns whether the write happened.
    pub(crate) fn put(&mut self, field: &str, value: Value) -> bool {
        if self.is_gated(field) {
            trace!(field, version = %self.version, "ignoring gated field");
            return false;
        }
        self.scope_mut().insert(field.to_string(), value);
        true
    }

    /// Writes `field` unless it already holds a value and `overwrite` is false.
    pub(crate) fn put_once(&mut self, field: &str, value: Value, overwrite: bool) -> bool {
        if !overwrite && self.contains(field) {
            return false;
        }
        self.put(field, value)
    }

    /// Appends to the list under `field`, creating it when absent. A scalar already
    /// stored there becomes the first element of the list.
    pub(crate) fn append(&mut self, field: &str, values: impl IntoIterator<Item = Value>) {
        if self.is_gated(field) {
            trace!(field, version = %self.version, "ignoring gated field");
            return;
        }
        let slot = self
            .scope_mut()
            .entry(field.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            let first = slot.take();
            *slot = Value::Array(if first.is_null() { Vec::new() } else { vec![first] });
        }
        if let Value::Array(items) = slot {
            items.extend(values);
        }
    }

    /// Nested map under `field` in the working scope, created when absent.
    pub(crate) fn child_mut(&mut self, field: &str) -> Option<&mut Map<String, Value>> {
        if self.is_gated(field) {
            return None;
        }
        let entry = self
            .scope_mut()
            .entry(field.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        Some(ensure_object(entry))
    }

    pub(crate) fn remove(&mut self, field: &str) -> Option<Value> {
        self.scope_mut().remove(field)
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was replaced by an object above"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DslError;
    use serde_json::json;

    const GATES: &[FieldGate] = &[FieldGate::new("collapse", 6), FieldGate::new("track_total_hits", 7)];

    #[test]
    fn test_scope_is_materialized_on_construction() {
        let body = ClauseBody::new(&["range", "age"], Version::default(), &[]).unwrap();
        assert_eq!(body.document(), json!({"range": {"age": {}}}).as_object().unwrap());
        assert!(body.scope().unwrap().is_empty());
    }

    #[test]
    fn test_gated_fields_are_no_ops() {
        let mut body = ClauseBody::new(&[], Version::new(6, 3), GATES).unwrap();
        assert!(body.put("collapse", json!({"field": "user"})));
        assert!(!body.put("track_total_hits", json!(true)));
        body.append("track_total_hits", [json!(1)]);
        assert!(body.get("track_total_hits").is_none());
        assert_eq!(body.clone().into_document(), json!({"collapse": {"field": "user"}}));
    }

    #[test]
    fn test_invalid_version_is_rejected() {
        assert_eq!(
            ClauseBody::new(&[], Version::new(8, 0), GATES),
            Err(DslError::InvalidVersion(Version::new(8, 0)))
        );
    }

    #[test]
    fn test_append_and_put_once() {
        let mut body = ClauseBody::new(&["bool"], Version::default(), &[]).unwrap();
        body.append("must", [json!(1)]);
        body.append("must", [json!(2), json!(3)]);
        assert!(body.put_once("minimum_should_match", json!("1"), false));
        assert!(!body.put_once("minimum_should_match", json!("2"), false));
        assert!(body.put_once("minimum_should_match", json!("3"), true));
        assert_eq!(
            body.into_document(),
            json!({"bool": {"must": [1, 2, 3], "minimum_should_match": "3"}})
        );
    }

    #[test]
    fn test_append_wraps_existing_scalar() {
        let mut body = ClauseBody::new(&[], Version::default(), &[]).unwrap();
        body.put("sort", json!({"a": {"order": "asc"}}));
        body.append("sort", [json!({"b": {"order": "desc"}})]);
        assert_eq!(
            body.get("sort"),
            Some(&json!([{"a": {"order": "asc"}}, {"b": {"order": "desc"}}]))
        );
    }
}
