use crate::{
    body::ClauseBody,
    clause::{Clause, field_params, term::non_empty_field},
    error::{DslError, Result},
    registry::ClauseArgs,
    version::Version,
};
use serde_json::Value;
use std::fmt;

/// One side of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeBound {
    pub fn key(&self) -> &'static str {
        match self {
            RangeBound::Gt => "gt",
            RangeBound::Gte => "gte",
            RangeBound::Lt => "lt",
            RangeBound::Lte => "lte",
        }
    }

    pub fn is_lower(&self) -> bool {
        matches!(self, RangeBound::Gt | RangeBound::Gte)
    }
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Interval query: `{"range": {field: {"gte": a, "lte": b, ...}}}`.
///
/// Bound values keep their JSON type, so `0`, `false` and `""` are all stored.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub(crate) body: ClauseBody,
    field: String,
}

impl RangeQuery {
    pub fn new(field: impl Into<String>, version: Version) -> Result<Self> {
        let field = non_empty_field("range", field.into())?;
        let body = ClauseBody::new(&["range", &field], version, &[])?;
        Ok(Self { body, field })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn with_bound(mut self, bound: RangeBound, value: impl Into<Value>) -> Self {
        self.body.put(bound.key(), value.into());
        self
    }

    pub fn with_gt(self, value: impl Into<Value>) -> Self {
        self.with_bound(RangeBound::Gt, value)
    }

    pub fn with_gte(self, value: impl Into<Value>) -> Self {
        self.with_bound(RangeBound::Gte, value)
    }

    pub fn with_lt(self, value: impl Into<Value>) -> Self {
        self.with_bound(RangeBound::Lt, value)
    }

    pub fn with_lte(self, value: impl Into<Value>) -> Self {
        self.with_bound(RangeBound::Lte, value)
    }

    pub fn with_boost(mut self, boost: f64) -> Self {
        self.body.put("boost", Value::from(boost));
        self
    }

    /// Date format used to parse string bounds, e.g. `yyyy-MM-dd`.
    pub fn with_format(mut self, format: &str) -> Self {
        self.body.put("format", Value::from(format));
        self
    }

    pub fn with_time_zone(mut self, time_zone: &str) -> Self {
        self.body.put("time_zone", Value::from(time_zone));
        self
    }

    pub fn bound(&self, bound: RangeBound) -> Option<&Value> {
        self.body.get(bound.key())
    }

    pub fn format(&self) -> Option<&str> {
        self.body.get("format").and_then(Value::as_str)
    }

    pub fn time_zone(&self) -> Option<&str> {
        self.body.get("time_zone").and_then(Value::as_str)
    }

    pub fn boost(&self) -> Option<f64> {
        self.body.get("boost").and_then(Value::as_f64)
    }

    pub fn from_body(body: &Value, version: Version) -> Result<Self> {
        let (field, params) = field_params("range", body)?;
        let params = params.as_object().ok_or_else(|| {
            DslError::MalformedClauseSpec(format!("range: parameters of '{field}' must be a mapping"))
        })?;

        let mut range = RangeQuery::new(field.as_str(), version)?;
        for (key, value) in params {
            range.body.put(key, value.clone());
        }
        Ok(range)
    }
}

pub(crate) fn construct(args: ClauseArgs<'_>) -> Result<Clause> {
    match (args.body, args.field) {
        (Some(body), _) => RangeQuery::from_body(body, args.version).map(Clause::Range),
        (None, Some(field)) => RangeQuery::new(field, args.version).map(Clause::Range),
        (None, None) => Err(DslError::MissingField { clause: "range", what: "field name" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_range_keeps_zero_and_types() {
        let range = RangeQuery::new("lineno", Version::default())
            .unwrap()
            .with_gt(0)
            .with_lte("100");
        assert_eq!(range.bound(RangeBound::Gt), Some(&json!(0)));
        assert!(range.bound(RangeBound::Gte).is_none());
        assert_eq!(Value::from(range), json!({"range": {"lineno": {"gt": 0, "lte": "100"}}}));
    }

    #[test]
    fn test_date_options() {
        let range = RangeQuery::new("@timestamp", Version::new(6, 0))
            .unwrap()
            .with_gte("2017-10-01")
            .with_format("yyyy-MM-dd")
            .with_time_zone("+08:00");
        assert_eq!(range.format(), Some("yyyy-MM-dd"));
        assert_eq!(range.time_zone(), Some("+08:00"));
    }

    #[test]
    fn test_from_body_rejects_scalar_params() {
        assert!(matches!(
            RangeQuery::from_body(&json!({"age": 3}), Version::default()),
            Err(DslError::MalformedClauseSpec(_))
        ));
        let range = RangeQuery::from_body(&json!({"age": {"gte": 18, "boost": 2.0}}), Version::default()).unwrap();
        assert_eq!(range.boost(), Some(2.0));
        assert!(RangeBound::Gte.is_lower());
    }
}
