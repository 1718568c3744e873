//! Expression-tree to request-document compilation.

pub mod arith;
mod predicate;
mod projection;

pub use arith::Inverse;
pub use projection::Projection;
pub(crate) use projection::metric_key;

use crate::{config::CompilerConfig, error::Result, statement::SelectStatement};
use model::{Field, Value};
use query_dsl::{Clause, MetricKind};
use serde_json::Value as Json;
use sql_syntax::Op;
use tracing::debug;

/// Maximum number of boolean groups enclosing the one being opened.
pub const MAX_NEST_DEPTH: usize = 10;

/// The field side of a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRef {
    pub name: String,
    /// Declared field whose validator runs over comparison values. `None` for bare names.
    pub field: Option<Field>,
}

impl FieldRef {
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
        }
    }

    pub fn validate(&self, value: &Value) -> Result<Value> {
        match &self.field {
            Some(field) => Ok(field.validate(value)?),
            None => Ok(value.clone()),
        }
    }
}

/// What a single non-logical node compiles to.
#[derive(Debug, Clone, PartialEq)]
pub enum Compiled {
    /// Relational node: the clause, and whether it must be negated by its group.
    Clause { clause: Clause, inverted: bool },
    /// Arithmetic node: the field it operates on and the inverse to apply to values.
    Operand { field: FieldRef, inverse: Option<Inverse> },
    /// Aggregation node.
    Metric { field: String, kind: MetricKind },
}

pub(crate) fn metric_kind(op: Op) -> Option<MetricKind> {
    match op {
        Op::Count => Some(MetricKind::Count),
        Op::Sum => Some(MetricKind::Sum),
        Op::Max => Some(MetricKind::Max),
        Op::Min => Some(MetricKind::Min),
        Op::Avg => Some(MetricKind::Avg),
        _ => None,
    }
}

/// Compiles [`SelectStatement`]s for one target backend version.
///
/// Each call builds a fresh document; the compiler itself holds no per-call state.
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    config: CompilerConfig,
}

impl QueryCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn compile(&self, statement: &SelectStatement) -> Result<Json> {
        debug!(
            version = %self.config.version,
            filter_context = self.config.filter_context,
            "Compiling select statement"
        );
        let request = self.parse_select(statement)?;
        let document = Json::from(request);
        debug!(version = %self.config.version, "Compiled select statement");
        Ok(document)
    }
}
