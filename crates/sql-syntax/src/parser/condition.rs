use crate::{
    ast::{
        builder::compare,
        expr::{Expr, Operand},
        operator::Op,
    },
    error::SyntaxError,
};
use model::Value;

/// `(field, op, [values], relation)`: one comparison per value, chained with the
/// relation (`and` unless stated otherwise).
#[derive(Debug, Clone, PartialEq)]
pub struct TupleCondition {
    field: Operand,
    op: String,
    values: Vec<Value>,
    relation: String,
}

impl TupleCondition {
    pub fn new<V: Into<Value>>(
        field: impl Into<Operand>,
        op: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            field: field.into(),
            op: op.to_string(),
            values: values.into_iter().map(Into::into).collect(),
            relation: "and".to_string(),
        }
    }

    pub fn relation(mut self, relation: &str) -> Self {
        self.relation = relation.to_string();
        self
    }

    pub fn into_expr(self) -> Result<Expr, SyntaxError> {
        let op: Op = self.op.parse()?;
        let relation: Op = self.relation.parse()?;
        if !relation.is_logical() {
            return Err(SyntaxError::UnsupportedOperator(self.relation));
        }

        let mut values = self.values.into_iter();
        let first = values
            .next()
            .ok_or_else(|| SyntaxError::EmptyCondition(self.field.to_string()))?;

        let mut expr = compare(self.field.clone(), op, first);
        for value in values {
            expr = Expr::new(relation, expr, compare(self.field.clone(), op, value));
        }
        Ok(expr)
    }
}
