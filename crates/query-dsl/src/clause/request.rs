use crate::{
    body::ClauseBody,
    clause::{Clause, aggs::Aggs, highlight::Highlight, sort::SortField},
    error::{DslError, Result},
    registry::{ClauseArgs, ClauseRegistry},
    version::{FieldGate, Version},
};
use serde_json::{Map, Value, json};

/// Request fields that only exist from a given backend major version on.
pub const REQUEST_GATES: &[FieldGate] = &[
    FieldGate::new("collapse", 6),
    FieldGate::new("track_total_hits", 7),
    FieldGate::new("seq_no_primary_term", 7),
];

/// The top-level search request document.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub(crate) body: ClauseBody,
}

impl SearchRequest {
    pub fn new(version: Version) -> Result<Self> {
        Ok(Self {
            body: ClauseBody::new(&[], version, REQUEST_GATES)?,
        })
    }

    pub fn version(&self) -> Version {
        self.body.version()
    }

    pub fn is_gated(&self, field: &str) -> bool {
        self.body.is_gated(field)
    }

    pub fn with_query(&mut self, query: impl Into<Value>, overwrite: bool) -> &mut Self {
        self.body.put_once("query", query.into(), overwrite);
        self
    }

    pub fn with_sort(&mut self, sort: SortField) -> &mut Self {
        self.body.append("sort", [sort.into()]);
        self
    }

    pub fn with_sorts(&mut self, sorts: impl IntoIterator<Item = SortField>) -> &mut Self {
        self.body.append("sort", sorts.into_iter().map(Value::from));
        self
    }

    /// Appends to `_source.includes`.
    pub fn with_source<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(source) = self.body.child_mut("_source") {
            let includes = source
                .entry("includes")
                .or_insert_with(|| Value::Array(Vec::new()));
            if !includes.is_array() {
                *includes = Value::Array(Vec::new());
            }
            if let Value::Array(items) = includes {
                items.extend(fields.into_iter().map(|field| Value::String(field.into())));
            }
        }
        self
    }

    pub fn with_aggs(&mut self, aggs: Aggs) -> &mut Self {
        self.body.put("aggs", aggs.into());
        self
    }

    pub fn with_size(&mut self, size: u64, overwrite: bool) -> &mut Self {
        self.body.put_once("size", Value::from(size), overwrite);
        self
    }

    /// Number of hits to skip, rendered as `from`.
    pub fn with_offset(&mut self, offset: u64, overwrite: bool) -> &mut Self {
        self.body.put_once("from", Value::from(offset), overwrite);
        self
    }

    pub fn clear_offset(&mut self) -> Option<Value> {
        self.body.remove("from")
    }

    pub fn with_highlight(&mut self, highlight: Highlight, overwrite: bool) -> &mut Self {
        self.body.put_once("highlight", highlight.into(), overwrite);
        self
    }

    pub fn with_explain(&mut self, explain: bool, overwrite: bool) -> &mut Self {
        self.body.put_once("explain", Value::Bool(explain), overwrite);
        self
    }

    /// Sets the `version` flag asking for document versions in hits.
    pub fn with_version_flag(&mut self, enabled: bool, overwrite: bool) -> &mut Self {
        self.body.put_once("version", Value::Bool(enabled), overwrite);
        self
    }

    pub fn with_search_after(&mut self, values: impl IntoIterator<Item = Value>) -> &mut Self {
        self.body.append("search_after", values);
        self
    }

    pub fn with_stored_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body
            .append("stored_fields", fields.into_iter().map(|f| Value::String(f.into())));
        self
    }

    pub fn with_docvalue_fields<I, S>(&mut self, fields: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.body
            .append("docvalue_fields", fields.into_iter().map(|f| Value::String(f.into())));
        self
    }

    pub fn with_collapse(&mut self, field: &str) -> &mut Self {
        self.body.put("collapse", json!({ "field": field }));
        self
    }

    pub fn with_track_total_hits(&mut self, track: bool) -> &mut Self {
        self.body.put("track_total_hits", Value::Bool(track));
        self
    }

    pub fn with_seq_no_primary_term(&mut self, enabled: bool) -> &mut Self {
        self.body.put("seq_no_primary_term", Value::Bool(enabled));
        self
    }

    pub fn query(&self) -> Option<&Value> {
        self.body.get("query")
    }

    pub fn sort(&self) -> &[Value] {
        self.list("sort")
    }

    pub fn source_includes(&self) -> Vec<&str> {
        self.body
            .get("_source")
            .and_then(|source| source.get("includes"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn aggs(&self) -> Option<&Value> {
        self.body.get("aggs")
    }

    pub fn size(&self) -> Option<u64> {
        self.body.get("size").and_then(Value::as_u64)
    }

    pub fn offset(&self) -> Option<u64> {
        self.body.get("from").and_then(Value::as_u64)
    }

    pub fn highlight(&self) -> Option<&Value> {
        self.body.get("highlight")
    }

    pub fn explain(&self) -> Option<bool> {
        self.body.get("explain").and_then(Value::as_bool)
    }

    pub fn version_flag(&self) -> Option<bool> {
        self.body.get("version").and_then(Value::as_bool)
    }

    pub fn search_after(&self) -> &[Value] {
        self.list("search_after")
    }

    pub fn stored_fields(&self) -> &[Value] {
        self.list("stored_fields")
    }

    pub fn docvalue_fields(&self) -> &[Value] {
        self.list("docvalue_fields")
    }

    pub fn collapse(&self) -> Option<&Value> {
        self.body.get("collapse")
    }

    pub fn track_total_hits(&self) -> Option<&Value> {
        self.body.get("track_total_hits")
    }

    pub fn seq_no_primary_term(&self) -> Option<bool> {
        self.body.get("seq_no_primary_term").and_then(Value::as_bool)
    }

    pub fn document(&self) -> &Map<String, Value> {
        self.body.document()
    }

    fn list(&self, field: &str) -> &[Value] {
        self.body
            .get(field)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rebuilds a request from an existing document. The query, sort keys, aggregations
    /// and highlight go through their own variants; unknown keys are kept as they are.
    pub fn from_document(doc: &Value, version: Version, registry: &ClauseRegistry) -> Result<Self> {
        let fields = doc
            .as_object()
            .ok_or_else(|| DslError::MalformedClauseSpec(format!("request: expected a mapping, got {doc}")))?;

        let mut request = SearchRequest::new(version)?;
        for (key, value) in fields {
            match (key.as_str(), value) {
                ("query", query) => {
                    let query = registry.from_document(query, version)?;
                    request.with_query(query, true);
                }
                ("sort", Value::Array(items)) => {
                    let sorts = items
                        .iter()
                        .map(|item| SortField::from_document(item, version))
                        .collect::<Result<Vec<_>>>()?;
                    request.with_sorts(sorts);
                }
                ("sort", item) => {
                    request.with_sort(SortField::from_document(item, version)?);
                }
                ("_source", Value::Array(items)) => {
                    request.with_source(items.iter().filter_map(Value::as_str));
                }
                ("_source", Value::String(field)) => {
                    request.with_source([field.as_str()]);
                }
                ("aggs" | "aggregations", aggs) => {
                    request.with_aggs(Aggs::from_body(aggs, version)?);
                }
                ("highlight", highlight) => {
                    request.with_highlight(Highlight::from_body(highlight, version)?, true);
                }
                ("size", Value::Number(n)) if n.is_u64() => {
                    request.with_size(n.as_u64().unwrap_or_default(), true);
                }
                ("from", Value::Number(n)) if n.is_u64() => {
                    request.with_offset(n.as_u64().unwrap_or_default(), true);
                }
                (_, value) => {
                    request.body.put(key, value.clone());
                }
            }
        }
        Ok(request)
    }
}

pub(crate) fn construct(args: ClauseArgs<'_>) -> Result<Clause> {
    match args.body {
        Some(body) => SearchRequest::from_document(body, args.version, args.registry).map(Clause::Request),
        None => SearchRequest::new(args.version).map(Clause::Request),
    }
}
