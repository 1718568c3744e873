use crate::{
    body::ClauseBody,
    clause::Clause,
    error::{DslError, Result},
    registry::ClauseArgs,
    version::Version,
};
use model::SortOrder;
use serde_json::{Map, Value, json};
use std::{fmt, str::FromStr};

/// Metric computed inside a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Bucket doc counts are implicit, so a count contributes no node.
    Count,
    Sum,
    Max,
    Min,
    Avg,
}

impl MetricKind {
    pub fn key(&self) -> &'static str {
        match self {
            MetricKind::Count => "count",
            MetricKind::Sum => "sum",
            MetricKind::Max => "max",
            MetricKind::Min => "min",
            MetricKind::Avg => "avg",
        }
    }

    /// Default aggregation name for a metric over `field`, e.g. `max_lineno`.
    pub fn metric_name(&self, field: &str) -> String {
        format!("{}_{field}", self.key())
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for MetricKind {
    type Err = DslError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "count" => Ok(MetricKind::Count),
            "sum" => Ok(MetricKind::Sum),
            "max" => Ok(MetricKind::Max),
            "min" => Ok(MetricKind::Min),
            "avg" => Ok(MetricKind::Avg),
            _ => Err(DslError::UnknownClause(s.to_string())),
        }
    }
}

/// Ordering of the buckets of a terms aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketOrder {
    key: String,
    order: SortOrder,
}

impl BucketOrder {
    pub fn by_count(order: SortOrder) -> Self {
        Self {
            key: "_count".to_string(),
            order,
        }
    }

    pub fn by_key(order: SortOrder) -> Self {
        Self {
            key: "_key".to_string(),
            order,
        }
    }

    pub fn by_metric(name: impl Into<String>, order: SortOrder) -> Self {
        Self { key: name.into(), order }
    }

    fn to_json(&self) -> Value {
        json!({ self.key.as_str(): self.order.as_str() })
    }
}

impl Default for BucketOrder {
    fn default() -> Self {
        BucketOrder::by_count(SortOrder::Asc)
    }
}

/// Name of the terms bucket opened for a group-by field.
pub fn bucket_name(field: &str) -> String {
    format!("group_by_{field}")
}

/// Aggregation container: `{name: {kind: {...}, "aggs": {...}}, ...}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggs {
    pub(crate) body: ClauseBody,
}

impl Aggs {
    pub fn new(version: Version) -> Result<Self> {
        Ok(Self {
            body: ClauseBody::new(&[], version, &[])?,
        })
    }

    /// Adds a terms bucket named `name`, or `group_by_<field>` when no name is given.
    pub fn terms(mut self, field: &str, name: Option<&str>, order: BucketOrder) -> Self {
        let name = name.map_or_else(|| bucket_name(field), str::to_string);
        self.body.put(
            &name,
            json!({"terms": {"field": field, "order": order.to_json()}}),
        );
        self
    }

    /// Adds a metric named `name`, or `<op>_<field>` when no name is given.
    pub fn metric(mut self, field: &str, kind: MetricKind, name: Option<&str>) -> Self {
        if kind == MetricKind::Count {
            return self;
        }
        let name = name.map_or_else(|| kind.metric_name(field), str::to_string);
        self.body.put(&name, json!({ kind.key(): {"field": field} }));
        self
    }

    /// Places `child` as the sub-aggregations of the existing bucket `bucket`.
    pub fn nest(mut self, bucket: &str, child: Aggs) -> Result<Self> {
        let node = self
            .body
            .scope_mut()
            .get_mut(bucket)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| DslError::UnknownBucket(bucket.to_string()))?;
        node.insert("aggs".to_string(), child.body.into_document());
        Ok(self)
    }

    pub fn names(&self) -> Vec<&str> {
        self.body.document().keys().map(String::as_str).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.body.document().is_empty()
    }

    pub fn from_body(body: &Value, version: Version) -> Result<Self> {
        let entries: &Map<String, Value> = body
            .as_object()
            .ok_or_else(|| DslError::MalformedClauseSpec(format!("aggs: expected a mapping, got {body}")))?;
        let mut aggs = Aggs::new(version)?;
        for (name, node) in entries {
            if !node.is_object() {
                return Err(DslError::MalformedClauseSpec(format!(
                    "aggs: aggregation '{name}' must be a mapping"
                )));
            }
            aggs.body.put(name, node.clone());
        }
        Ok(aggs)
    }
}

pub(crate) fn construct(args: ClauseArgs<'_>) -> Result<Clause> {
    match args.body {
        Some(body) => Aggs::from_body(body, args.version).map(Clause::Aggs),
        None => Aggs::new(args.version).map(Clause::Aggs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_bucket_defaults() {
        let aggs = Aggs::new(Version::default())
            .unwrap()
            .terms("host", None, BucketOrder::default());
        assert_eq!(aggs.names(), vec!["group_by_host"]);
        assert_eq!(
            Value::from(aggs),
            json!({"group_by_host": {"terms": {"field": "host", "order": {"_count": "asc"}}}})
        );
    }

    #[test]
    fn test_metrics_skip_count() {
        let aggs = Aggs::new(Version::default())
            .unwrap()
            .metric("lineno", MetricKind::Max, None)
            .metric("lineno", MetricKind::Count, None)
            .metric("size", MetricKind::Avg, Some("mean_size"));
        assert_eq!(
            Value::from(aggs),
            json!({"max_lineno": {"max": {"field": "lineno"}}, "mean_size": {"avg": {"field": "size"}}})
        );
    }

    #[test]
    fn test_nest_under_bucket() {
        let child = Aggs::new(Version::default())
            .unwrap()
            .terms("level", None, BucketOrder::by_key(SortOrder::Desc));
        let aggs = Aggs::new(Version::default())
            .unwrap()
            .terms("host", None, BucketOrder::default())
            .nest("group_by_host", child)
            .unwrap();
        assert_eq!(
            aggs.get("group_by_host").unwrap()["aggs"],
            json!({"group_by_level": {"terms": {"field": "level", "order": {"_key": "desc"}}}})
        );
    }

    #[test]
    fn test_nest_requires_bucket() {
        let aggs = Aggs::new(Version::default()).unwrap();
        let child = Aggs::new(Version::default()).unwrap();
        assert_eq!(
            aggs.nest("group_by_missing", child).unwrap_err(),
            DslError::UnknownBucket("group_by_missing".into())
        );
    }

    #[test]
    fn test_metric_kind_parse() {
        assert_eq!("AVG".parse::<MetricKind>().unwrap(), MetricKind::Avg);
        assert!("median".parse::<MetricKind>().is_err());
    }
}
