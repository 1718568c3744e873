//! Composition functions for expression trees.
//!
//! Every function returns a new [`Expr`] and leaves its inputs untouched, so
//! partial predicates can be cloned and reused in several trees.

use crate::ast::{
    expr::{Expr, Operand},
    operator::Op,
};
use model::Value;

pub fn and_of(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Expr {
    Expr::new(Op::And, lhs, rhs)
}

pub fn or_of(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Expr {
    Expr::new(Op::Or, lhs, rhs)
}

/// Relational node. The operator is not checked here; a non-relational tag is
/// rejected when the tree is compiled.
pub fn compare(lhs: impl Into<Operand>, op: Op, rhs: impl Into<Operand>) -> Expr {
    Expr::new(op, lhs, rhs)
}

pub fn arith(lhs: impl Into<Operand>, op: Op, rhs: impl Into<Operand>) -> Expr {
    Expr::new(op, lhs, rhs)
}

pub fn aggregate(op: Op, operand: impl Into<Operand>) -> Expr {
    Expr::new(op, operand, Value::Null)
}

/// Method-call sugar over the composition functions.
pub trait ExprBuilder: Into<Operand> + Sized {
    fn and(self, rhs: impl Into<Operand>) -> Expr {
        and_of(self, rhs)
    }

    fn or(self, rhs: impl Into<Operand>) -> Expr {
        or_of(self, rhs)
    }

    fn equals(self, rhs: impl Into<Operand>) -> Expr {
        compare(self, Op::Eq, rhs)
    }

    fn not_equals(self, rhs: impl Into<Operand>) -> Expr {
        compare(self, Op::Ne, rhs)
    }

    fn less_than(self, rhs: impl Into<Operand>) -> Expr {
        compare(self, Op::Lt, rhs)
    }

    fn less_or_equal(self, rhs: impl Into<Operand>) -> Expr {
        compare(self, Op::Lte, rhs)
    }

    fn greater_than(self, rhs: impl Into<Operand>) -> Expr {
        compare(self, Op::Gt, rhs)
    }

    fn greater_or_equal(self, rhs: impl Into<Operand>) -> Expr {
        compare(self, Op::Gte, rhs)
    }

    fn is_in(self, rhs: impl Into<Operand>) -> Expr {
        compare(self, Op::In, rhs)
    }

    fn like(self, rhs: impl Into<Operand>) -> Expr {
        compare(self, Op::Like, rhs)
    }

    fn text_match(self, rhs: impl Into<Operand>) -> Expr {
        compare(self, Op::Match, rhs)
    }

    fn plus(self, rhs: impl Into<Operand>) -> Expr {
        arith(self, Op::Add, rhs)
    }

    fn minus(self, rhs: impl Into<Operand>) -> Expr {
        arith(self, Op::Sub, rhs)
    }

    fn times(self, rhs: impl Into<Operand>) -> Expr {
        arith(self, Op::Mul, rhs)
    }

    fn divided_by(self, rhs: impl Into<Operand>) -> Expr {
        arith(self, Op::Div, rhs)
    }
}

impl<T: Into<Operand>> ExprBuilder for T {}
