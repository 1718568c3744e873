use crate::{
    compile::{Compiled, QueryCompiler},
    error::{CompileError, Result},
    statement::{OrderBy, SelectStatement},
};
use model::Value;
use query_dsl::{Aggs, BucketOrder, MetricKind, SearchRequest, SortField, bucket_name};
use sql_syntax::{OpClass, Operand};
use tracing::debug;

/// Order key under which a bucket's document count is sorted.
const COUNT_KEY: &str = "_count";

/// Requested source fields and metrics, in declaration order.
pub type Projection = (Vec<String>, Vec<(String, MetricKind)>);

impl QueryCompiler {
    /// Splits the output list into plain source fields and `(field, metric)` pairs.
    pub fn parse_fields(&self, fields: &[Operand]) -> Result<Projection> {
        let mut sources = Vec::new();
        let mut metrics = Vec::new();
        for operand in fields {
            match operand {
                Operand::Expr(expr) if expr.op().class() == OpClass::Aggregation => {
                    if let Compiled::Metric { field, kind } = self.parse_expr(expr)? {
                        metrics.push((field, kind));
                    }
                }
                other => sources.push(field_name(other, "output field")?),
            }
        }
        Ok((sources, metrics))
    }

    pub fn parse_group_by(&self, group_by: &[Operand]) -> Result<Vec<String>> {
        group_by
            .iter()
            .map(|operand| field_name(operand, "group-by key"))
            .collect()
    }

    pub fn parse_order_by<'a>(&self, statement: &'a SelectStatement) -> &'a OrderBy {
        &statement.order_by
    }

    /// Assembles the whole request: query, bucket aggregations, source selection, sort
    /// and pagination.
    pub fn parse_select(&self, statement: &SelectStatement) -> Result<SearchRequest> {
        let version = self.config.version;
        let mut request = SearchRequest::new(version)?;
        request.with_query(self.parse_where(statement.where_clause.as_ref())?, false);

        let (sources, metrics) = self.parse_fields(&statement.fields)?;
        let groups = self.parse_group_by(&statement.group_by)?;
        let order_by = self.parse_order_by(statement);
        let metric_keys: Vec<String> = metrics.iter().map(|(field, kind)| metric_key(field, *kind)).collect();

        if let Some(aggs) = self.build_aggs(&groups, &metrics, &metric_keys, order_by)? {
            request.with_aggs(aggs);
        }

        if !sources.is_empty() {
            request.with_source(sources);
        }

        let sorts = order_by
            .iter()
            .filter(|(key, _)| *key != COUNT_KEY && !metric_keys.iter().any(|name| name == key))
            .map(|(key, order)| SortField::new(key, version).map(|sort| sort.with_order(order)))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        if !sorts.is_empty() {
            request.with_sorts(sorts);
        }

        if let Some(limit) = statement.limit {
            request.with_size(limit, true);
        }
        if let Some(offset) = statement.offset {
            request.with_offset(offset, true);
        }
        Ok(request)
    }

    /// Nests one terms bucket per group-by field, innermost last, with the metrics
    /// inside the innermost bucket. Without group-by fields the metrics sit at the top.
    fn build_aggs(
        &self,
        groups: &[String],
        metrics: &[(String, MetricKind)],
        metric_keys: &[String],
        order_by: &OrderBy,
    ) -> Result<Option<Aggs>> {
        let version = self.config.version;
        let mut inner = if metrics.is_empty() {
            None
        } else {
            let aggs = Aggs::new(version)?;
            Some(
                metrics
                    .iter()
                    .fold(aggs, |aggs, (field, kind)| aggs.metric(field, *kind, None)),
            )
        };

        if groups.is_empty() {
            return Ok(inner.filter(|aggs| !aggs.is_empty()));
        }

        let innermost = groups.len() - 1;
        for (depth, field) in groups.iter().enumerate().rev() {
            let order = match order_by.get(field) {
                Some(order) => BucketOrder::by_key(order),
                None if depth == innermost => metric_order(order_by, metric_keys).unwrap_or_default(),
                None => BucketOrder::default(),
            };
            let mut level = Aggs::new(version)?.terms(field, None, order);
            if let Some(child) = inner.take() {
                level = level.nest(&bucket_name(field), child)?;
            }
            debug!(field = %field, depth, "Opened bucket aggregation");
            inner = Some(level);
        }
        Ok(inner)
    }
}

/// Order-by key that refers to a metric: its aggregation name, or `_count` for a count.
pub(crate) fn metric_key(field: &str, kind: MetricKind) -> String {
    match kind {
        MetricKind::Count => COUNT_KEY.to_string(),
        other => other.metric_name(field),
    }
}

fn metric_order(order_by: &OrderBy, metric_keys: &[String]) -> Option<BucketOrder> {
    order_by
        .iter()
        .find(|(key, _)| *key == COUNT_KEY || metric_keys.iter().any(|name| name == key))
        .map(|(key, order)| BucketOrder::by_metric(key, order))
}

fn field_name(operand: &Operand, role: &str) -> Result<String> {
    match operand {
        Operand::Field(field) => field
            .name()
            .map(str::to_string)
            .ok_or_else(|| CompileError::InvalidProjection(format!("{role} has no name"))),
        Operand::Name(name) => Ok(name.clone()),
        Operand::Value(Value::String(name)) => Ok(name.clone()),
        other => Err(CompileError::InvalidProjection(format!(
            "{role} must be a field or a name, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use model::{Field, SortOrder};
    use serde_json::{Value as Json, json};
    use sql_syntax::{Op, aggregate, arith, compare};

    fn compile(statement: &SelectStatement) -> Json {
        let compiler = QueryCompiler::new(CompilerConfig::default().with_filter_context(false));
        compiler.compile(statement).unwrap()
    }

    #[test]
    fn test_parse_fields_splits_sources_and_metrics() {
        let compiler = QueryCompiler::default();
        let fields = vec![
            Operand::from(Field::text().named("host")),
            Operand::from("msg"),
            Operand::from(aggregate(Op::Avg, "lineno")),
        ];
        let (sources, metrics) = compiler.parse_fields(&fields).unwrap();
        assert_eq!(sources, vec!["host", "msg"]);
        assert_eq!(metrics, vec![("lineno".to_string(), MetricKind::Avg)]);

        let err = compiler
            .parse_fields(&[Operand::from(arith("lineno", Op::Add, 1))])
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidProjection(_)));
        assert!(matches!(
            compiler.parse_group_by(&[Operand::from(3)]),
            Err(CompileError::InvalidProjection(_))
        ));
    }

    #[test]
    fn test_pure_count_group_has_empty_sub_aggregations() {
        let statement = SelectStatement {
            fields: vec![aggregate(Op::Count, "x").into()],
            group_by: vec!["y".into()],
            ..SelectStatement::new()
        };
        let document = compile(&statement);
        assert_eq!(
            document["aggs"],
            json!({"group_by_y": {"terms": {"field": "y", "order": {"_count": "asc"}}, "aggs": {}}})
        );
    }

    #[test]
    fn test_nested_buckets_and_metrics() {
        let statement = SelectStatement {
            fields: vec![aggregate(Op::Max, "lineno").into(), aggregate(Op::Sum, "bytes").into()],
            group_by: vec!["host".into(), "level".into()],
            order_by: [("host", SortOrder::Desc), ("max_lineno", SortOrder::Desc)]
                .into_iter()
                .collect(),
            ..SelectStatement::new()
        };
        let document = compile(&statement);
        assert_eq!(
            document["aggs"],
            json!({
                "group_by_host": {
                    "terms": {"field": "host", "order": {"_key": "desc"}},
                    "aggs": {
                        "group_by_level": {
                            "terms": {"field": "level", "order": {"max_lineno": "desc"}},
                            "aggs": {
                                "max_lineno": {"max": {"field": "lineno"}},
                                "sum_bytes": {"sum": {"field": "bytes"}}
                            }
                        }
                    }
                }
            })
        );
        assert_eq!(document["sort"], json!([{"host": {"order": "desc"}}]));
    }

    #[test]
    fn test_metrics_without_group_by() {
        let statement = SelectStatement {
            fields: vec![aggregate(Op::Min, "lineno").into()],
            ..SelectStatement::new()
        };
        assert_eq!(compile(&statement)["aggs"], json!({"min_lineno": {"min": {"field": "lineno"}}}));

        let count_only = SelectStatement {
            fields: vec![aggregate(Op::Count, "lineno").into()],
            ..SelectStatement::new()
        };
        assert!(compile(&count_only).get("aggs").is_none());
    }

    #[test]
    fn test_source_sort_and_pagination() {
        let statement = SelectStatement {
            where_clause: Some(compare("lineno", Op::Gt, 10)),
            fields: vec!["host".into(), "msg".into()],
            order_by: [("timestamp", SortOrder::Desc), ("lineno", SortOrder::Asc)]
                .into_iter()
                .collect(),
            limit: Some(20),
            offset: Some(0),
            ..SelectStatement::new()
        };
        assert_eq!(
            compile(&statement),
            json!({
                "query": {"bool": {"must": [{"range": {"lineno": {"gt": 10}}}]}},
                "_source": {"includes": ["host", "msg"]},
                "sort": [{"timestamp": {"order": "desc"}}, {"lineno": {"order": "asc"}}],
                "size": 20,
                "from": 0
            })
        );
    }
}
