use crate::ast::operator::{Op, OpClass};
use model::{Field, Value};
use std::fmt;

/// One side of an [`Expr`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Expr(Box<Expr>),
    /// A declared field; its validator runs over comparison values.
    Field(Field),
    /// A bare field name, used without validation.
    Name(String),
    Value(Value),
}

impl Operand {
    pub fn as_expr(&self) -> Option<&Expr> {
        match self {
            Operand::Expr(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Operand::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Text of a bare name or of a string literal. Both count as plain strings when
    /// neither side of a comparison is a declared field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Operand::Name(name) => Some(name),
            Operand::Value(Value::String(text)) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Expr(expr) => write!(f, "{expr}"),
            Operand::Field(field) => write!(f, "{}", field.name().unwrap_or("<unnamed>")),
            Operand::Name(name) => write!(f, "{name}"),
            Operand::Value(Value::String(text)) => write!(f, "'{text}'"),
            Operand::Value(value) => write!(f, "{value}"),
        }
    }
}

impl From<Expr> for Operand {
    fn from(expr: Expr) -> Self {
        Operand::Expr(Box::new(expr))
    }
}

impl From<Field> for Operand {
    fn from(field: Field) -> Self {
        Operand::Field(field)
    }
}

impl From<&Field> for Operand {
    fn from(field: &Field) -> Self {
        Operand::Field(field.clone())
    }
}

impl From<&str> for Operand {
    fn from(name: &str) -> Self {
        Operand::Name(name.to_string())
    }
}

impl From<String> for Operand {
    fn from(name: String) -> Self {
        Operand::Name(name)
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<i64> for Operand {
    fn from(v: i64) -> Self {
        Operand::Value(Value::Int(v))
    }
}

impl From<i32> for Operand {
    fn from(v: i32) -> Self {
        Operand::Value(Value::from(v))
    }
}

impl From<f64> for Operand {
    fn from(v: f64) -> Self {
        Operand::Value(Value::Float(v))
    }
}

impl From<bool> for Operand {
    fn from(v: bool) -> Self {
        Operand::Value(Value::Boolean(v))
    }
}

/// Immutable binary expression node.
///
/// Aggregations are unary; their right operand is [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    op: Op,
    lhs: Operand,
    rhs: Operand,
}

impl Expr {
    pub fn new(op: Op, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Self {
            op,
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn lhs(&self) -> &Operand {
        &self.lhs
    }

    pub fn rhs(&self) -> &Operand {
        &self.rhs
    }

    /// Number of leaves under this node, counting every non-logical node as one.
    pub fn leaf_count(&self) -> usize {
        if !self.op.is_logical() {
            return 1;
        }
        [&self.lhs, &self.rhs]
            .into_iter()
            .map(|side| side.as_expr().map_or(1, Expr::leaf_count))
            .sum()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op.class() {
            OpClass::Aggregation => write!(f, "{}({})", self.op, self.lhs),
            _ => write!(f, "({} {} {})", self.lhs, self.op, self.rhs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_display() {
        let inner = Expr::new(Op::Add, Field::integer().named("age"), 5);
        let expr = Expr::new(Op::Gt, inner, 10);
        assert_eq!(expr.to_string(), "((age + 5) > 10)");

        let agg = Expr::new(Op::Count, "host", Value::Null);
        assert_eq!(agg.to_string(), "COUNT(host)");

        let text = Expr::new(Op::Eq, "status", Value::from("ok"));
        assert_eq!(text.to_string(), "(status = 'ok')");
    }

    #[test]
    fn test_operand_text() {
        assert_eq!(Operand::from("a").as_text(), Some("a"));
        assert_eq!(Operand::Value(Value::from("b")).as_text(), Some("b"));
        assert_eq!(Operand::from(3).as_text(), None);
        assert!(Operand::from(Field::text()).as_field().is_some());
    }
}
