//! Caller-facing builder over [`SelectStatement`].

use crate::{
    compile::{QueryCompiler, metric_key, metric_kind},
    config::CompilerConfig,
    error::{CompileError, Result},
    statement::SelectStatement,
};
use model::{Schema, SortOrder, Value};
use query_dsl::{SearchRequest, SortField};
use serde::Serialize;
use serde_json::Value as Json;
use sql_syntax::{
    Expr, Operand, OrderTarget, Selection, TupleCondition, and_of, parse_ordering, parse_selection,
    parse_where,
};
use tracing::debug;

/// Tie-breaker appended to cursor-paginated sorts.
const TIE_BREAKER: &str = "_id";

/// A `where_` argument.
#[derive(Debug, Clone)]
pub enum Predicate {
    Expr(Expr),
    /// `<field> <op> <value>` text.
    Text(String),
    Tuple(TupleCondition),
}

impl From<Expr> for Predicate {
    fn from(expr: Expr) -> Self {
        Predicate::Expr(expr)
    }
}

impl From<&str> for Predicate {
    fn from(text: &str) -> Self {
        Predicate::Text(text.to_string())
    }
}

impl From<String> for Predicate {
    fn from(text: String) -> Self {
        Predicate::Text(text)
    }
}

impl From<TupleCondition> for Predicate {
    fn from(tuple: TupleCondition) -> Self {
        Predicate::Tuple(tuple)
    }
}

/// An `order_by` argument: an explicit pair, or `field [asc|desc]` text.
#[derive(Debug, Clone)]
pub enum OrderKey {
    Pair(String, SortOrder),
    Text(String),
}

impl From<&str> for OrderKey {
    fn from(text: &str) -> Self {
        OrderKey::Text(text.to_string())
    }
}

impl From<String> for OrderKey {
    fn from(text: String) -> Self {
        OrderKey::Text(text)
    }
}

impl From<(&str, SortOrder)> for OrderKey {
    fn from((key, order): (&str, SortOrder)) -> Self {
        OrderKey::Pair(key.to_string(), order)
    }
}

impl From<(String, SortOrder)> for OrderKey {
    fn from((key, order): (String, SortOrder)) -> Self {
        OrderKey::Pair(key, order)
    }
}

/// A compiled request together with where it should be sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledSearch {
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    pub body: Json,
}

/// Builds a [`SelectStatement`] step by step and compiles it.
///
/// ```ignore
/// let search = SelectQuery::from_schema(&logs)
///     .fields(["host", "max(lineno)"])?
///     .where_("lineno > 10")?
///     .group_by(["host"])
///     .order_by(("host", SortOrder::Desc))?
///     .limit(20)
///     .build(&CompilerConfig::default())?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct SelectQuery<'s> {
    schema: Option<&'s Schema>,
    index: Option<String>,
    doc_type: Option<String>,
    statement: SelectStatement,
}

impl<'s> SelectQuery<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Targets the schema's index and doc type, and binds names to its fields.
    pub fn from_schema(schema: &'s Schema) -> Self {
        Self {
            schema: Some(schema),
            index: Some(schema.index_name().to_string()),
            doc_type: Some(schema.doc_type_name().to_string()),
            statement: SelectStatement::new(),
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.doc_type = Some(doc_type.into());
        self
    }

    pub fn statement(&self) -> &SelectStatement {
        &self.statement
    }

    /// Adds output fields. Text such as `max(lineno)` becomes an aggregation.
    pub fn fields<I, F>(mut self, fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = F>,
        F: Into<Operand>,
    {
        for field in fields {
            let operand = match field.into() {
                Operand::Name(text) => match parse_selection(&text)? {
                    Selection::Name(name) => Operand::Name(name),
                    Selection::Aggregate(expr) => Operand::from(expr),
                },
                other => other,
            };
            self.statement.fields.push(operand);
        }
        Ok(self)
    }

    /// AND-combines `predicate` with whatever was set before.
    pub fn where_(mut self, predicate: impl Into<Predicate>) -> Result<Self> {
        let expr = match predicate.into() {
            Predicate::Expr(expr) => expr,
            Predicate::Text(text) => parse_where(&text)?,
            Predicate::Tuple(tuple) => tuple.into_expr()?,
        };
        let expr = match self.schema {
            Some(schema) => bind_expr(&expr, schema),
            None => expr,
        };
        self.statement.where_clause = Some(match self.statement.where_clause.take() {
            Some(existing) => and_of(existing, expr),
            None => expr,
        });
        Ok(self)
    }

    pub fn group_by<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Operand>,
    {
        self.statement.group_by.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Adds an order-by entry. Aggregation targets such as `count(x) desc` order buckets
    /// by the matching metric.
    pub fn order_by(mut self, key: impl Into<OrderKey>) -> Result<Self> {
        let (key, order) = match key.into() {
            OrderKey::Pair(key, order) => (key, order),
            OrderKey::Text(text) => {
                let ordering = parse_ordering(&text)?;
                let key = match ordering.target {
                    OrderTarget::Field(field) => field,
                    OrderTarget::Aggregate(expr) => aggregate_key(&expr)?,
                };
                (key, ordering.order)
            }
        };
        self.statement.order_by.insert(key, order);
        Ok(self)
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.statement.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.statement.offset = Some(offset);
        self
    }

    pub fn compile(&self, config: &CompilerConfig) -> Result<Json> {
        QueryCompiler::new(*config).compile(&self.statement)
    }

    pub fn build(&self, config: &CompilerConfig) -> Result<CompiledSearch> {
        let body = self.compile(config)?;
        debug!(index = ?self.index, version = %config.version, "Built search request");
        Ok(self.search(body))
    }

    /// Compiles one page of a cursor walk. `search_after` holds the sort values of the
    /// last hit of the previous page; `None` asks for the first page.
    pub fn compile_page(&self, config: &CompilerConfig, search_after: Option<Vec<Json>>) -> Result<CompiledSearch> {
        if self.statement.limit.is_none() || self.statement.order_by.is_empty() {
            return Err(CompileError::PaginationRequiresOrdering);
        }

        let compiler = QueryCompiler::new(*config);
        let mut request: SearchRequest = compiler.parse_select(&self.statement)?;
        if !self.statement.order_by.contains(TIE_BREAKER) {
            request.with_sort(SortField::new(TIE_BREAKER, config.version)?.with_order(SortOrder::Asc));
        }
        if let Some(cursor) = search_after {
            request.clear_offset();
            request.with_search_after(cursor);
        }
        debug!(index = ?self.index, cursor = request.search_after().len(), "Compiled page");
        Ok(self.search(Json::from(request)))
    }

    fn search(&self, body: Json) -> CompiledSearch {
        CompiledSearch {
            index: self.index.clone(),
            doc_type: self.doc_type.clone(),
            body,
        }
    }
}

/// Replaces names that match declared fields, so the fields' validators run. The
/// left side is bound, and the right side when the left side is a literal.
fn bind_expr(expr: &Expr, schema: &Schema) -> Expr {
    let lhs = bind_operand(expr.lhs(), schema);
    let rhs = match (expr.lhs(), expr.rhs()) {
        (_, Operand::Expr(inner)) => Operand::from(bind_expr(inner, schema)),
        (Operand::Value(_), rhs) => bind_operand(rhs, schema),
        (_, rhs) => rhs.clone(),
    };
    Expr::new(expr.op(), lhs, rhs)
}

fn bind_operand(operand: &Operand, schema: &Schema) -> Operand {
    match operand {
        Operand::Expr(inner) => Operand::from(bind_expr(inner, schema)),
        Operand::Name(name) => schema
            .lookup(name)
            .map_or_else(|| operand.clone(), |field| Operand::Field(field.clone())),
        other => other.clone(),
    }
}

fn aggregate_key(expr: &Expr) -> Result<String> {
    let kind = metric_kind(expr.op())
        .ok_or_else(|| CompileError::UnsupportedOperator(expr.op().to_string()))?;
    let field = match expr.lhs() {
        Operand::Name(name) => name.as_str(),
        Operand::Value(Value::String(name)) => name.as_str(),
        other => {
            return Err(CompileError::AmbiguousOperand {
                op: expr.op(),
                reason: format!("cannot order by an aggregation over '{other}'"),
            });
        }
    };
    Ok(metric_key(field, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::Field;
    use serde_json::json;
    use sql_syntax::Op;

    fn logs() -> Schema {
        Schema::new("Logs")
            .field("lineno", Field::integer())
            .field("active", Field::boolean())
            .field("host", Field::text())
    }

    #[test]
    fn test_string_predicates_bind_to_schema() {
        let schema = logs();
        let query = SelectQuery::from_schema(&schema)
            .where_("lineno > '10'")
            .unwrap()
            .where_("active = TRUE")
            .unwrap();
        let config = CompilerConfig::default().with_filter_context(false);
        let search = query.build(&config).unwrap();
        assert_eq!(search.index.as_deref(), Some("logs"));
        assert_eq!(search.doc_type.as_deref(), Some("_doc"));
        assert_eq!(
            search.body["query"],
            json!({"bool": {"must": [
                {"range": {"lineno": {"gt": 10}}},
                {"term": {"active": {"value": "true"}}}
            ]}})
        );
    }

    #[test]
    fn test_literal_on_the_left_binds_right_name() {
        let bound = bind_expr(&sql_syntax::compare(5, Op::Lt, "lineno"), &logs());
        assert_eq!(bound.rhs().as_field().and_then(Field::name), Some("lineno"));

        let unbound = bind_expr(&sql_syntax::compare("host", Op::Eq, "lineno"), &logs());
        assert!(unbound.lhs().as_field().is_some());
        assert!(unbound.rhs().as_field().is_none());
    }

    #[test]
    fn test_order_by_aggregation_text() {
        let query = SelectQuery::new()
            .fields(["host", "count(host)"])
            .unwrap()
            .order_by("count(host) desc")
            .unwrap()
            .order_by("max(lineno), asc")
            .unwrap();
        let entries: Vec<_> = query.statement().order_by.iter().collect();
        assert_eq!(entries, vec![("_count", SortOrder::Desc), ("max_lineno", SortOrder::Asc)]);
        assert_eq!(query.statement().fields.len(), 2);
        assert!(query.statement().fields[1].as_expr().is_some());
    }

    #[test]
    fn test_compile_page_requires_ordering() {
        let config = CompilerConfig::default();
        let unordered = SelectQuery::new().limit(10);
        assert_eq!(
            unordered.compile_page(&config, None),
            Err(CompileError::PaginationRequiresOrdering)
        );

        let unlimited = SelectQuery::new().order_by(("lineno", SortOrder::Asc)).unwrap();
        assert_eq!(
            unlimited.compile_page(&config, None),
            Err(CompileError::PaginationRequiresOrdering)
        );
    }

    #[test]
    fn test_compile_page_with_cursor() {
        let query = SelectQuery::new()
            .index("logs")
            .order_by(("timestamp", SortOrder::Desc))
            .unwrap()
            .limit(50)
            .offset(100);
        let config = CompilerConfig::default();

        let first = query.compile_page(&config, None).unwrap();
        assert_eq!(first.body["from"], json!(100));
        assert_eq!(
            first.body["sort"],
            json!([{"timestamp": {"order": "desc"}}, {"_id": {"order": "asc"}}])
        );

        let next = query
            .compile_page(&config, Some(vec![json!("2024-05-01T00:00:00Z"), json!("abc")]))
            .unwrap();
        assert!(next.body.get("from").is_none());
        assert_eq!(next.body["search_after"], json!(["2024-05-01T00:00:00Z", "abc"]));
        assert_eq!(next.body["size"], json!(50));
    }
}
