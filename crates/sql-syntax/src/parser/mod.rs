//! String forms of predicates, aggregation selections and orderings.

mod condition;

pub use condition::TupleCondition;

use crate::{
    ast::{
        builder::{aggregate, compare},
        expr::{Expr, Operand},
        operator::{Op, OpClass},
    },
    error::SyntaxError,
};
use model::{SortOrder, Value};
use pest::{Parser, iterators::Pair};
use pest_derive::Parser;
use tracing::trace;

#[derive(Parser)]
#[grammar = "grammar/predicate.pest"]
pub struct PredicateParser;

/// A parsed `<field> <op> <value>` predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Op,
    pub value: String,
}

impl Condition {
    /// Bare-name comparison against the raw value text.
    pub fn into_expr(self) -> Expr {
        compare(self.field, self.op, Value::String(self.value))
    }
}

/// A selected output column: either a plain field name or an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Name(String),
    Aggregate(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderTarget {
    Field(String),
    Aggregate(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub target: OrderTarget,
    pub order: SortOrder,
}

pub fn parse_condition(input: &str) -> Result<Condition, SyntaxError> {
    let predicate = parse_rule(Rule::predicate, input)?;

    let mut field = String::new();
    let mut op = None;
    let mut value = String::new();
    for pair in predicate.into_inner() {
        match pair.as_rule() {
            Rule::ident => field = pair.as_str().to_string(),
            Rule::comparator => op = Some(pair.as_str().parse::<Op>()?),
            Rule::operand_text => value = unquote(pair.as_str().trim()).to_string(),
            _ => {}
        }
    }

    let op = op.ok_or_else(|| SyntaxError::UnsupportedOperator(input.to_string()))?;
    trace!(field = %field, op = %op, "Parsed predicate");
    Ok(Condition { field, op, value })
}

/// Parses a single string predicate into a comparison over a bare field name.
pub fn parse_where(input: &str) -> Result<Expr, SyntaxError> {
    parse_condition(input).map(Condition::into_expr)
}

/// `count(x)`-style text becomes an aggregation; anything else is kept as a name.
pub fn parse_selection(input: &str) -> Result<Selection, SyntaxError> {
    match PredicateParser::parse(Rule::selection, input.trim()) {
        Ok(mut pairs) => {
            let call = pairs
                .next()
                .and_then(|selection| selection.into_inner().next())
                .ok_or_else(|| SyntaxError::UnsupportedOperator(input.to_string()))?;
            Ok(Selection::Aggregate(aggregate_from(call)?))
        }
        Err(_) => Ok(Selection::Name(input.trim().to_string())),
    }
}

/// Parses `field [asc|desc]`, with an optional comma before the direction.
/// The direction defaults to ascending.
pub fn parse_ordering(input: &str) -> Result<Ordering, SyntaxError> {
    let ordering = parse_rule(Rule::ordering, input)?;

    let mut target = None;
    let mut order = SortOrder::Asc;
    for pair in ordering.into_inner() {
        match pair.as_rule() {
            Rule::ident => target = Some(OrderTarget::Field(pair.as_str().to_string())),
            Rule::aggregate_call => target = Some(OrderTarget::Aggregate(aggregate_from(pair)?)),
            Rule::direction => {
                order = pair
                    .as_str()
                    .parse()
                    .map_err(|_| SyntaxError::UnsupportedOperator(pair.as_str().to_string()))?
            }
            _ => {}
        }
    }

    let target = target.ok_or_else(|| SyntaxError::Parse {
        input: input.to_string(),
        column: 1,
        message: "missing order-by target".to_string(),
    })?;
    Ok(Ordering { target, order })
}

fn parse_rule(rule: Rule, input: &str) -> Result<Pair<'_, Rule>, SyntaxError> {
    let mut pairs = PredicateParser::parse(rule, input.trim())
        .map_err(|e| SyntaxError::from_pest_error(input, e))?;
    pairs.next().ok_or_else(|| SyntaxError::Parse {
        input: input.to_string(),
        column: 1,
        message: "empty input".to_string(),
    })
}

fn aggregate_from(call: Pair<'_, Rule>) -> Result<Expr, SyntaxError> {
    let mut inner = call.into_inner();
    let function = inner.next().map(|p| p.as_str()).unwrap_or_default();
    let target = inner.next().map(|p| p.as_str()).unwrap_or_default();

    let op: Op = function.parse()?;
    if op.class() != OpClass::Aggregation {
        return Err(SyntaxError::UnsupportedOperator(function.to_string()));
    }
    Ok(aggregate(op, Operand::Name(target.to_string())))
}

fn unquote(text: &str) -> &str {
    for quote in ['\'', '"'] {
        if text.len() >= 2 && text.starts_with(quote) && text.ends_with(quote) {
            return &text[1..text.len() - 1];
        }
    }
    text
}
