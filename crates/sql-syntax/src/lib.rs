pub mod ast;
pub mod error;
pub mod parser;

pub use ast::{
    builder::{ExprBuilder, aggregate, and_of, arith, compare, or_of},
    expr::{Expr, Operand},
    operator::{Op, OpClass},
};
pub use error::SyntaxError;
pub use parser::{
    Condition, Ordering, OrderTarget, Selection, TupleCondition, parse_condition, parse_ordering,
    parse_selection, parse_where,
};
