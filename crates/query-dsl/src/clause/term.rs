use crate::{
    body::ClauseBody,
    clause::{Clause, field_params},
    error::{DslError, Result},
    registry::ClauseArgs,
    version::Version,
};
use serde_json::Value;

/// Exact match: `{"term": {field: {"value": v}}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub(crate) body: ClauseBody,
    field: String,
}

impl Term {
    pub fn new(field: impl Into<String>, version: Version) -> Result<Self> {
        let field = non_empty_field("term", field.into())?;
        let body = ClauseBody::new(&["term", &field], version, &[])?;
        Ok(Self { body, field })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.body.put("value", value.into());
        self
    }

    pub fn with_boost(mut self, boost: f64) -> Self {
        self.body.put("boost", Value::from(boost));
        self
    }

    pub fn value(&self) -> Option<&Value> {
        self.body.get("value")
    }

    pub fn boost(&self) -> Option<f64> {
        self.body.get("boost").and_then(Value::as_f64)
    }

    /// Rebuilds a term from `{field: {"value": v, ...}}` or the `{field: v}` shorthand.
    pub fn from_body(body: &Value, version: Version) -> Result<Self> {
        let (field, params) = field_params("term", body)?;
        let mut term = Term::new(field.as_str(), version)?;
        match params {
            Value::Object(params) => {
                for (key, value) in params {
                    term.body.put(key, value.clone());
                }
            }
            scalar => term = term.with_value(scalar.clone()),
        }
        Ok(term)
    }
}

/// Multi-value match: `{"terms": {field: [v, ...]}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Terms {
    pub(crate) body: ClauseBody,
    field: String,
}

impl Terms {
    pub fn new(field: impl Into<String>, version: Version) -> Result<Self> {
        let field = non_empty_field("terms", field.into())?;
        let body = ClauseBody::new(&["terms"], version, &[])?;
        Ok(Self { body, field })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn with_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.body.put(&self.field.clone(), Value::Array(values));
        self
    }

    pub fn with_boost(mut self, boost: f64) -> Self {
        self.body.put("boost", Value::from(boost));
        self
    }

    pub fn values(&self) -> &[Value] {
        self.body
            .get(&self.field)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn boost(&self) -> Option<f64> {
        self.body.get("boost").and_then(Value::as_f64)
    }

    /// Rebuilds terms from `{field: [..], "boost": b}`. The field is the key holding a list.
    pub fn from_body(body: &Value, version: Version) -> Result<Self> {
        let params = body
            .as_object()
            .ok_or_else(|| DslError::MalformedClauseSpec(format!("terms: expected a mapping, got {body}")))?;
        let field = params
            .iter()
            .find(|(key, value)| key.as_str() != "boost" && value.is_array())
            .map(|(key, _)| key.clone())
            .ok_or(DslError::MissingField {
                clause: "terms",
                what: "field with a value list",
            })?;

        let mut terms = Terms::new(field, version)?;
        for (key, value) in params {
            terms.body.put(key, value.clone());
        }
        Ok(terms)
    }
}

pub(crate) fn non_empty_field(clause: &'static str, field: String) -> Result<String> {
    if field.trim().is_empty() {
        return Err(DslError::MissingField { clause, what: "field name" });
    }
    Ok(field)
}

pub(crate) fn construct_term(args: ClauseArgs<'_>) -> Result<Clause> {
    match (args.body, args.field) {
        (Some(body), _) => Term::from_body(body, args.version).map(Clause::Term),
        (None, Some(field)) => Term::new(field, args.version).map(Clause::Term),
        (None, None) => Err(DslError::MissingField { clause: "term", what: "field name" }),
    }
}

pub(crate) fn construct_terms(args: ClauseArgs<'_>) -> Result<Clause> {
    match (args.body, args.field) {
        (Some(body), _) => Terms::from_body(body, args.version).map(Clause::Terms),
        (None, Some(field)) => Terms::new(field, args.version).map(Clause::Terms),
        (None, None) => Err(DslError::MissingField { clause: "terms", what: "field name" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_term_document() {
        let term = Term::new("host", Version::default())
            .unwrap()
            .with_value("web-1")
            .with_boost(2.0);
        assert_eq!(term.value(), Some(&json!("web-1")));
        assert_eq!(term.boost(), Some(2.0));
        assert_eq!(
            Value::from(term),
            json!({"term": {"host": {"value": "web-1", "boost": 2.0}}})
        );
    }

    #[test]
    fn test_term_requires_field() {
        assert_eq!(
            Term::new(" ", Version::default()),
            Err(DslError::MissingField { clause: "term", what: "field name" })
        );
    }

    #[test]
    fn test_term_shorthand_body() {
        let term = Term::from_body(&json!({"status": 200}), Version::default()).unwrap();
        assert_eq!(term.field(), "status");
        assert_eq!(term.value(), Some(&json!(200)));
    }

    #[test]
    fn test_terms_document() {
        let terms = Terms::new("lineno", Version::new(6, 0))
            .unwrap()
            .with_values(["12", "45"]);
        assert_eq!(terms.values(), &[json!("12"), json!("45")]);
        assert_eq!(Value::from(terms), json!({"terms": {"lineno": ["12", "45"]}}));
    }

    #[test]
    fn test_terms_from_body() {
        let terms = Terms::from_body(&json!({"boost": 1.5, "tag": ["a", "b"]}), Version::default()).unwrap();
        assert_eq!(terms.field(), "tag");
        assert_eq!(terms.boost(), Some(1.5));
        assert!(matches!(
            Terms::from_body(&json!({"boost": 1.0}), Version::default()),
            Err(DslError::MissingField { .. })
        ));
    }
}
