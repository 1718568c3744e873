//! The closed set of clause variants and the enum that dispatches over them.

pub mod aggs;
pub mod boolean;
pub mod highlight;
pub mod range;
pub mod request;
pub mod sort;
pub mod term;
pub mod text;

use crate::{
    body::ClauseBody,
    error::{DslError, Result},
    version::Version,
};
use aggs::Aggs;
use boolean::BoolQuery;
use highlight::Highlight;
use range::RangeQuery;
use request::SearchRequest;
use serde_json::{Map, Value};
use sort::SortField;
use std::{fmt, str::FromStr};
use term::{Term, Terms};
use text::MatchQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    Bool,
    Term,
    Terms,
    Match,
    Range,
    Sort,
    Aggs,
    Highlight,
    Request,
}

impl ClauseKind {
    pub const ALL: [ClauseKind; 9] = [
        ClauseKind::Bool,
        ClauseKind::Term,
        ClauseKind::Terms,
        ClauseKind::Match,
        ClauseKind::Range,
        ClauseKind::Sort,
        ClauseKind::Aggs,
        ClauseKind::Highlight,
        ClauseKind::Request,
    ];

    /// Registry name; for query clauses this is also the root key of the document.
    pub fn name(&self) -> &'static str {
        match self {
            ClauseKind::Bool => "bool",
            ClauseKind::Term => "term",
            ClauseKind::Terms => "terms",
            ClauseKind::Match => "match",
            ClauseKind::Range => "range",
            ClauseKind::Sort => "sort",
            ClauseKind::Aggs => "aggs",
            ClauseKind::Highlight => "highlight",
            ClauseKind::Request => "dsl",
        }
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ClauseKind {
    type Err = DslError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        if name == "request" {
            return Ok(ClauseKind::Request);
        }
        ClauseKind::ALL
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| DslError::UnknownClause(s.to_string()))
    }
}

/// Occurrence list of a boolean group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Occur {
    Must,
    MustNot,
    Should,
    #[default]
    Filter,
}

impl Occur {
    pub const ALL: [Occur; 4] = [Occur::Must, Occur::MustNot, Occur::Should, Occur::Filter];

    pub fn key(&self) -> &'static str {
        match self {
            Occur::Must => "must",
            Occur::MustNot => "must_not",
            Occur::Should => "should",
            Occur::Filter => "filter",
        }
    }
}

/// Any built clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Bool(BoolQuery),
    Term(Term),
    Terms(Terms),
    Match(MatchQuery),
    Range(RangeQuery),
    Sort(SortField),
    Aggs(Aggs),
    Highlight(Highlight),
    Request(SearchRequest),
}

impl Clause {
    pub fn kind(&self) -> ClauseKind {
        match self {
            Clause::Bool(_) => ClauseKind::Bool,
            Clause::Term(_) => ClauseKind::Term,
            Clause::Terms(_) => ClauseKind::Terms,
            Clause::Match(_) => ClauseKind::Match,
            Clause::Range(_) => ClauseKind::Range,
            Clause::Sort(_) => ClauseKind::Sort,
            Clause::Aggs(_) => ClauseKind::Aggs,
            Clause::Highlight(_) => ClauseKind::Highlight,
            Clause::Request(_) => ClauseKind::Request,
        }
    }

    fn body(&self) -> &ClauseBody {
        match self {
            Clause::Bool(c) => &c.body,
            Clause::Term(c) => &c.body,
            Clause::Terms(c) => &c.body,
            Clause::Match(c) => &c.body,
            Clause::Range(c) => &c.body,
            Clause::Sort(c) => &c.body,
            Clause::Aggs(c) => &c.body,
            Clause::Highlight(c) => &c.body,
            Clause::Request(c) => &c.body,
        }
    }

    pub fn version(&self) -> Version {
        self.body().version()
    }

    pub fn document(&self) -> &Map<String, Value> {
        self.body().document()
    }

    pub fn into_document(self) -> Value {
        match self {
            Clause::Bool(c) => c.body.into_document(),
            Clause::Term(c) => c.body.into_document(),
            Clause::Terms(c) => c.body.into_document(),
            Clause::Match(c) => c.body.into_document(),
            Clause::Range(c) => c.body.into_document(),
            Clause::Sort(c) => c.body.into_document(),
            Clause::Aggs(c) => c.body.into_document(),
            Clause::Highlight(c) => c.body.into_document(),
            Clause::Request(c) => c.body.into_document(),
        }
    }
}

macro_rules! clause_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Clause {
                fn from(clause: $ty) -> Self {
                    Clause::$variant(clause)
                }
            }

            impl From<$ty> for Value {
                fn from(clause: $ty) -> Self {
                    clause.body.into_document()
                }
            }
        )*
    };
}

clause_from! {
    Bool => BoolQuery,
    Term => Term,
    Terms => Terms,
    Match => MatchQuery,
    Range => RangeQuery,
    Sort => SortField,
    Aggs => Aggs,
    Highlight => Highlight,
    Request => SearchRequest,
}

impl From<Clause> for Value {
    fn from(clause: Clause) -> Self {
        clause.into_document()
    }
}

/// Splits a `{key: body}` document into its single entry.
pub(crate) fn single_entry(doc: &Value) -> Result<(&String, &Value)> {
    let map = doc
        .as_object()
        .ok_or_else(|| DslError::MalformedClauseSpec(format!("expected a mapping, got {doc}")))?;
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some(entry), None) => Ok(entry),
        (None, _) => Err(DslError::MalformedClauseSpec("empty mapping".to_string())),
        (Some(_), Some(_)) => Err(DslError::MalformedClauseSpec(format!(
            "expected exactly one top-level key, got {}",
            map.keys().cloned().collect::<Vec<_>>().join(", ")
        ))),
    }
}

/// `{field: params}` with exactly one field, as used by term, match, range and sort.
pub(crate) fn field_params<'a>(clause: &'static str, body: &'a Value) -> Result<(&'a String, &'a Value)> {
    single_entry(body).map_err(|e| match e {
        DslError::MalformedClauseSpec(reason) => DslError::MalformedClauseSpec(format!("{clause}: {reason}")),
        other => other,
    })
}
