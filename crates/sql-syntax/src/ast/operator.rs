use crate::error::SyntaxError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Operator tag of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Op {
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
    Like,
    NotLike,
    Match,
    MatchAll,
    NotMatch,
    Add,
    Sub,
    Mul,
    Div,
    Xor,
    Count,
    Sum,
    Max,
    Min,
    Avg,
}

/// Operator families, used by the compiler to classify leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpClass {
    Logical,
    Relational,
    Arithmetic,
    Aggregation,
}

impl Op {
    pub fn class(&self) -> OpClass {
        use Op::*;
        match self {
            And | Or => OpClass::Logical,
            Eq | Ne | Lt | Lte | Gt | Gte | In | Like | NotLike | Match | MatchAll | NotMatch => {
                OpClass::Relational
            }
            Add | Sub | Mul | Div | Xor => OpClass::Arithmetic,
            Count | Sum | Max | Min | Avg => OpClass::Aggregation,
        }
    }

    pub fn is_logical(&self) -> bool {
        self.class() == OpClass::Logical
    }

    /// `<`, `<=`, `>` and `>=`.
    pub fn is_ordering(&self) -> bool {
        matches!(self, Op::Lt | Op::Lte | Op::Gt | Op::Gte)
    }

    /// The ordering operator obtained by swapping both sides: `a < b` is `b > a`.
    /// Non-ordering operators are returned unchanged.
    pub fn mirrored(&self) -> Op {
        match self {
            Op::Lt => Op::Gt,
            Op::Lte => Op::Gte,
            Op::Gt => Op::Lt,
            Op::Gte => Op::Lte,
            other => *other,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Op::And => "AND",
            Op::Or => "OR",
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Lte => "<=",
            Op::Gt => ">",
            Op::Gte => ">=",
            Op::In => "IN",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
            Op::Match => "MATCH",
            Op::MatchAll => "MATCHALL",
            Op::NotMatch => "NOT MATCH",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
            Op::Xor => "^",
            Op::Count => "COUNT",
            Op::Sum => "SUM",
            Op::Max => "MAX",
            Op::Min => "MIN",
            Op::Avg => "AVG",
        };
        write!(f, "{symbol}")
    }
}

impl FromStr for Op {
    type Err = SyntaxError;

    /// Resolves an operator keyword or symbol. Keywords are case-insensitive and
    /// inner whitespace is collapsed, so `NOT   like` resolves to [`Op::NotLike`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let keyword = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();

        let op = match keyword.as_str() {
            "and" | "&&" => Op::And,
            "or" | "||" => Op::Or,
            "=" | "==" => Op::Eq,
            "!=" | "<>" => Op::Ne,
            "<" => Op::Lt,
            "<=" => Op::Lte,
            ">" => Op::Gt,
            ">=" => Op::Gte,
            "in" => Op::In,
            "like" => Op::Like,
            "not like" => Op::NotLike,
            "match" => Op::Match,
            "matchall" => Op::MatchAll,
            "not match" => Op::NotMatch,
            "+" => Op::Add,
            "-" => Op::Sub,
            "*" => Op::Mul,
            "/" => Op::Div,
            "^" | "xor" => Op::Xor,
            "count" => Op::Count,
            "sum" => Op::Sum,
            "max" => Op::Max,
            "min" => Op::Min,
            "avg" => Op::Avg,
            _ => return Err(SyntaxError::UnsupportedOperator(s.trim().to_string())),
        };
        Ok(op)
    }
}
