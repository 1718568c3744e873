use crate::{
    body::ClauseBody,
    clause::{Clause, field_params, term::non_empty_field},
    error::{DslError, Result},
    registry::ClauseArgs,
    version::Version,
};
use serde_json::Value;

/// Full-text match: `{"match": {field: {"query": text, ...}}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchQuery {
    pub(crate) body: ClauseBody,
    field: String,
}

impl MatchQuery {
    pub fn new(field: impl Into<String>, version: Version) -> Result<Self> {
        let field = non_empty_field("match", field.into())?;
        let body = ClauseBody::new(&["match", &field], version, &[])?;
        Ok(Self { body, field })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn with_query(mut self, query: impl Into<Value>) -> Self {
        self.body.put("query", query.into());
        self
    }

    pub fn with_analyzer(mut self, analyzer: &str) -> Self {
        self.body.put("analyzer", Value::from(analyzer));
        self
    }

    pub fn with_fuzziness(mut self, fuzziness: impl Into<Value>) -> Self {
        self.body.put("fuzziness", fuzziness.into());
        self
    }

    /// `"and"` requires every analyzed term to match; `"or"` is the backend default.
    pub fn with_operator(mut self, operator: &str) -> Self {
        self.body.put("operator", Value::from(operator));
        self
    }

    pub fn with_zero_terms_query(mut self, mode: &str) -> Self {
        self.body.put("zero_terms_query", Value::from(mode));
        self
    }

    pub fn with_cutoff_frequency(mut self, frequency: f64) -> Self {
        self.body.put("cutoff_frequency", Value::from(frequency));
        self
    }

    pub fn with_boost(mut self, boost: f64) -> Self {
        self.body.put("boost", Value::from(boost));
        self
    }

    pub fn query(&self) -> Option<&Value> {
        self.body.get("query")
    }

    pub fn operator(&self) -> Option<&str> {
        self.body.get("operator").and_then(Value::as_str)
    }

    pub fn analyzer(&self) -> Option<&str> {
        self.body.get("analyzer").and_then(Value::as_str)
    }

    pub fn fuzziness(&self) -> Option<&Value> {
        self.body.get("fuzziness")
    }

    pub fn from_body(body: &Value, version: Version) -> Result<Self> {
        let (field, params) = field_params("match", body)?;
        let mut clause = MatchQuery::new(field.as_str(), version)?;
        match params {
            Value::Object(params) => {
                for (key, value) in params {
                    clause.body.put(key, value.clone());
                }
            }
            query => clause = clause.with_query(query.clone()),
        }
        Ok(clause)
    }
}

pub(crate) fn construct(args: ClauseArgs<'_>) -> Result<Clause> {
    match (args.body, args.field) {
        (Some(body), _) => MatchQuery::from_body(body, args.version).map(Clause::Match),
        (None, Some(field)) => MatchQuery::new(field, args.version).map(Clause::Match),
        (None, None) => Err(DslError::MissingField { clause: "match", what: "field name" }),
    }
}
