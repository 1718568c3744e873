use crate::{
    body::ClauseBody,
    clause::{Clause, Occur, range::RangeQuery, term::Term, text::MatchQuery},
    error::{DslError, Result},
    registry::{ClauseArgs, ClauseRegistry},
    scope::TimeScope,
    version::Version,
};
use chrono::{Local, NaiveDate};
use serde_json::{Map, Value};
use std::fmt;

pub const DEFAULT_TIMESTAMP_FIELD: &str = "@timestamp";
pub const DEFAULT_START_TIME: &str = "now-10d";
pub const DEFAULT_END_TIME: &str = "now";

/// `minimum_should_match` argument before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum MinimumShouldMatch {
    Count(f64),
    Text(String),
}

impl MinimumShouldMatch {
    /// Fractions in (-1, 1) become percentages, `0` becomes `"1"`, text passes through.
    pub fn render(&self) -> String {
        match self {
            MinimumShouldMatch::Text(text) => text.clone(),
            MinimumShouldMatch::Count(n) if *n == 0.0 => "1".to_string(),
            MinimumShouldMatch::Count(n) if -1.0 < *n && *n < 1.0 => {
                let percent = (n * 100.0 * 1e6).round() / 1e6;
                format!("{percent}%")
            }
            MinimumShouldMatch::Count(n) if n.fract() == 0.0 => format!("{}", *n as i64),
            MinimumShouldMatch::Count(n) => n.to_string(),
        }
    }
}

impl fmt::Display for MinimumShouldMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<f64> for MinimumShouldMatch {
    fn from(value: f64) -> Self {
        MinimumShouldMatch::Count(value)
    }
}

impl From<i64> for MinimumShouldMatch {
    fn from(value: i64) -> Self {
        MinimumShouldMatch::Count(value as f64)
    }
}

impl From<i32> for MinimumShouldMatch {
    fn from(value: i32) -> Self {
        MinimumShouldMatch::Count(value.into())
    }
}

impl From<&str> for MinimumShouldMatch {
    fn from(value: &str) -> Self {
        MinimumShouldMatch::Text(value.to_string())
    }
}

impl From<String> for MinimumShouldMatch {
    fn from(value: String) -> Self {
        MinimumShouldMatch::Text(value)
    }
}

/// Boolean group: `{"bool": {"must": [...], "must_not": [...], "should": [...], "filter": [...]}}`.
///
/// A filtered group nests its working scope under `{"bool": {"filter": {"bool": {...}}}}`
/// so that none of its clauses contribute to relevance scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct BoolQuery {
    pub(crate) body: ClauseBody,
    filtered: bool,
}

impl BoolQuery {
    pub fn new(version: Version) -> Result<Self> {
        Ok(Self {
            body: ClauseBody::new(&["bool"], version, &[])?,
            filtered: false,
        })
    }

    pub fn filtered(version: Version) -> Result<Self> {
        Ok(Self {
            body: ClauseBody::new(&["bool", "filter", "bool"], version, &[])?,
            filtered: true,
        })
    }

    pub fn version(&self) -> Version {
        self.body.version()
    }

    pub fn is_filtered(&self) -> bool {
        self.filtered
    }

    pub fn push(&mut self, occur: Occur, clause: impl Into<Value>) -> &mut Self {
        self.body.append(occur.key(), [clause.into()]);
        self
    }

    pub fn extend<I, C>(&mut self, occur: Occur, clauses: I) -> &mut Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Value>,
    {
        self.body.append(occur.key(), clauses.into_iter().map(Into::into));
        self
    }

    pub fn with_must(&mut self, clause: impl Into<Value>) -> &mut Self {
        self.push(Occur::Must, clause)
    }

    pub fn with_must_not(&mut self, clause: impl Into<Value>) -> &mut Self {
        self.push(Occur::MustNot, clause)
    }

    pub fn with_should(&mut self, clause: impl Into<Value>) -> &mut Self {
        self.push(Occur::Should, clause)
    }

    pub fn with_filter(&mut self, clause: impl Into<Value>) -> &mut Self {
        self.push(Occur::Filter, clause)
    }

    /// Stores the normalized value; an existing one is kept unless `overwrite` is set.
    pub fn with_minimum_should_match(
        &mut self,
        value: impl Into<MinimumShouldMatch>,
        overwrite: bool,
    ) -> &mut Self {
        let rendered = value.into().render();
        self.body
            .put_once("minimum_should_match", Value::String(rendered), overwrite);
        self
    }

    pub fn with_boost(&mut self, boost: f64) -> &mut Self {
        self.body.put("boost", Value::from(boost));
        self
    }

    pub fn with_term(&mut self, field: &str, value: impl Into<Value>, occur: Occur) -> Result<&mut Self> {
        let value = non_empty_value("term", value.into())?;
        let term = Term::new(field, self.version())?.with_value(value);
        Ok(self.push(occur, term))
    }

    pub fn with_match(&mut self, field: &str, query: impl Into<Value>, occur: Occur) -> Result<&mut Self> {
        let query = non_empty_value("match", query.into())?;
        let clause = MatchQuery::new(field, self.version())?.with_query(query);
        Ok(self.push(occur, clause))
    }

    pub fn with_range(&mut self, range: RangeQuery, occur: Occur) -> &mut Self {
        self.push(occur, range)
    }

    /// Filters `field >= start`, defaulting to `@timestamp` and `now-10d`.
    pub fn with_start_time(&mut self, field: Option<&str>, start: Option<&str>) -> Result<&mut Self> {
        let range = RangeQuery::new(field.unwrap_or(DEFAULT_TIMESTAMP_FIELD), self.version())?
            .with_gte(start.unwrap_or(DEFAULT_START_TIME));
        Ok(self.with_range(range, Occur::Filter))
    }

    /// Filters `field <= end`, defaulting to `@timestamp` and `now`.
    pub fn with_end_time(&mut self, field: Option<&str>, end: Option<&str>) -> Result<&mut Self> {
        let range = RangeQuery::new(field.unwrap_or(DEFAULT_TIMESTAMP_FIELD), self.version())?
            .with_lte(end.unwrap_or(DEFAULT_END_TIME));
        Ok(self.with_range(range, Occur::Filter))
    }

    pub fn clauses(&self, occur: Occur) -> &[Value] {
        self.body
            .get(occur.key())
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn minimum_should_match(&self) -> Option<&Value> {
        self.body.get("minimum_should_match")
    }

    pub fn boost(&self) -> Option<f64> {
        self.body.get("boost").and_then(Value::as_f64)
    }

    pub fn is_empty(&self) -> bool {
        self.body.scope().is_none_or(Map::is_empty)
    }

    /// Range parameter maps on `field` found in the `filter` and `must` lists.
    pub fn time_ranges(&self, field: &str) -> Vec<&Map<String, Value>> {
        [Occur::Filter, Occur::Must]
            .into_iter()
            .flat_map(|occur| self.clauses(occur))
            .filter_map(|clause| clause.get("range")?.get(field)?.as_object())
            .collect()
    }

    pub fn time_scope(&self, field: &str) -> TimeScope {
        self.time_scope_at(field, Local::now().date_naive())
    }

    /// As [`BoolQuery::time_scope`], resolving `now` against `today`.
    pub fn time_scope_at(&self, field: &str, today: NaiveDate) -> TimeScope {
        let mut scope = TimeScope::default();
        for params in self.time_ranges(field) {
            scope.narrow(params, today);
        }
        scope
    }

    /// Rebuilds a group from the contents of its `bool` key. Every nested clause goes
    /// through `registry` so that malformed sub-clauses are rejected.
    pub fn from_body(body: &Value, version: Version, registry: &ClauseRegistry) -> Result<Self> {
        let params = body
            .as_object()
            .ok_or_else(|| DslError::MalformedClauseSpec(format!("bool: expected a mapping, got {body}")))?;

        let mut group = BoolQuery::new(version)?;
        for (key, value) in params {
            let occur = Occur::ALL.into_iter().find(|occur| occur.key() == key);
            match (occur, value) {
                (Some(occur), Value::Array(items)) => {
                    let clauses = items
                        .iter()
                        .map(|item| registry.from_document(item, version).map(Value::from))
                        .collect::<Result<Vec<_>>>()?;
                    group.extend(occur, clauses);
                }
                // A single clause object, as in the filtered shape.
                (Some(_), item) => {
                    let clause = registry.from_document(item, version)?;
                    group.body.put(key, clause.into());
                }
                (None, value) => {
                    group.body.put(key, value.clone());
                }
            }
        }
        Ok(group)
    }
}

fn non_empty_value(clause: &'static str, value: Value) -> Result<Value> {
    match &value {
        Value::Null => Err(DslError::MissingField { clause, what: "value" }),
        Value::String(text) if text.is_empty() => Err(DslError::MissingField { clause, what: "value" }),
        _ => Ok(value),
    }
}

pub(crate) fn construct(args: ClauseArgs<'_>) -> Result<Clause> {
    match args.body {
        Some(body) => BoolQuery::from_body(body, args.version, args.registry).map(Clause::Bool),
        None => BoolQuery::new(args.version).map(Clause::Bool),
    }
}
