use crate::{
    compile::{Compiled, FieldRef, Inverse, MAX_NEST_DEPTH, QueryCompiler, metric_kind},
    error::{CompileError, Result},
};
use model::Value;
use query_dsl::{BoolQuery, Clause, MatchQuery, Occur, RangeBound, RangeQuery, Term, Terms};
use sql_syntax::{Expr, Op, OpClass, Operand};
use std::mem;
use tracing::{debug, trace};

/// A boolean group being filled, and the connective its children are joined with.
struct Context {
    group: BoolQuery,
    op: Op,
}

impl Context {
    fn combinator(&self) -> Occur {
        match self.op {
            Op::Or => Occur::Should,
            _ => Occur::Must,
        }
    }
}

/// One resolved side of a relational node.
enum Side {
    Field(FieldRef, Option<Inverse>),
    Name(String),
    Text(String),
    Literal(Value),
}

impl Side {
    fn into_value(self, op: Op) -> Result<Value> {
        match self {
            Side::Name(text) | Side::Text(text) => Ok(Value::String(text)),
            Side::Literal(value) => Ok(value),
            Side::Field(field, _) => Err(CompileError::AmbiguousOperand {
                op,
                reason: format!("both sides are fields ('{}' on the right)", field.name),
            }),
        }
    }
}

impl QueryCompiler {
    /// Compiles the AND/OR tree into one boolean group.
    ///
    /// The walk is iterative: logical nodes push their right child on a pending stack
    /// and descend left. A node whose connective differs from the current group's opens
    /// a nested group; same-connective chains stay flat. Each pending node remembers
    /// how many groups enclosed it, so groups are closed back to that level before it
    /// is visited.
    pub fn parse_where(&self, root: Option<&Expr>) -> Result<BoolQuery> {
        let version = self.config.version;
        let top = if self.config.filter_context {
            BoolQuery::filtered(version)?
        } else {
            BoolQuery::new(version)?
        };
        let Some(root) = root else {
            return Ok(top);
        };

        let root_op = if root.op().is_logical() { root.op() } else { Op::And };
        let mut current = Context { group: top, op: root_op };
        let mut enclosing: Vec<Context> = Vec::new();
        let mut pending: Vec<(&Expr, usize)> = Vec::new();
        let mut node = root;

        loop {
            let op = node.op();
            if op.is_logical() {
                if op != current.op {
                    if enclosing.len() >= MAX_NEST_DEPTH {
                        return Err(CompileError::NestingDepthExceeded { max: MAX_NEST_DEPTH });
                    }
                    let nested = Context {
                        group: BoolQuery::new(version)?,
                        op,
                    };
                    enclosing.push(mem::replace(&mut current, nested));
                    debug!(depth = enclosing.len(), op = %op, "Opened nested group");
                }
                pending.push((child(node.rhs(), op)?, enclosing.len()));
                node = child(node.lhs(), op)?;
                continue;
            }

            self.attach_leaf(&mut current, node)?;

            let Some((next, depth)) = pending.pop() else {
                break;
            };
            while enclosing.len() > depth {
                close_group(&mut current, &mut enclosing);
            }
            node = next;
        }

        while !enclosing.is_empty() {
            close_group(&mut current, &mut enclosing);
        }
        Ok(current.group)
    }

    fn attach_leaf(&self, context: &mut Context, leaf: &Expr) -> Result<()> {
        let (clause, inverted) = match self.parse_expr(leaf)? {
            Compiled::Clause { clause, inverted } => (clause, inverted),
            _ => {
                return Err(CompileError::UnsupportedOperator(format!(
                    "'{}' cannot be used as a predicate",
                    leaf.op()
                )));
            }
        };

        match (context.op, inverted) {
            // A group has no per-item "should not": offer a group matching NOT leaf.
            (Op::Or, true) => {
                let mut negated = BoolQuery::new(self.config.version)?;
                negated.push(Occur::MustNot, clause);
                context.group.push(Occur::Should, negated);
            }
            (Op::Or, false) => {
                context.group.push(Occur::Should, clause);
            }
            (_, true) => {
                context.group.push(Occur::MustNot, clause);
            }
            (_, false) => {
                context.group.push(Occur::Must, clause);
            }
        }
        trace!(leaf = %leaf, group_op = %context.op, inverted, "Attached leaf");
        Ok(())
    }

    /// Classifies and compiles one non-logical node.
    pub fn parse_expr(&self, expr: &Expr) -> Result<Compiled> {
        match expr.op().class() {
            OpClass::Relational => {
                let (clause, inverted) = self.compile_relational(expr)?;
                Ok(Compiled::Clause { clause, inverted })
            }
            OpClass::Arithmetic => {
                let (field, inverse) = compile_arithmetic(expr)?;
                Ok(Compiled::Operand {
                    field,
                    inverse: Some(inverse),
                })
            }
            OpClass::Aggregation => compile_aggregation(expr),
            OpClass::Logical => Err(CompileError::UnsupportedOperator(format!(
                "'{}' is not a leaf operator",
                expr.op()
            ))),
        }
    }

    fn compile_relational(&self, expr: &Expr) -> Result<(Clause, bool)> {
        let op = expr.op();
        let lhs = self.resolve_side(expr.lhs(), op)?;
        let rhs = self.resolve_side(expr.rhs(), op)?;

        let (field, inverse, value, field_on_left) = match (lhs, rhs) {
            (Side::Field(field, inverse), other) => (field, inverse, other.into_value(op)?, true),
            (other, Side::Field(field, inverse)) => (field, inverse, other.into_value(op)?, false),
            (Side::Name(name), other) => (FieldRef::bare(name), None, other.into_value(op)?, true),
            (other @ (Side::Literal(_) | Side::Text(_)), Side::Name(name)) => (FieldRef::bare(name), None, other.into_value(op)?, false),
            (Side::Text(name), Side::Text(text)) => (FieldRef::bare(name), None, Value::String(text), true),
            _ => {
                return Err(CompileError::AmbiguousOperand {
                    op,
                    reason: "neither side resolves to a field".to_string(),
                });
            }
        };

        let mut effective = if field_on_left { op } else { op.mirrored() };
        if inverse.is_some_and(|inverse| inverse.flips_order()) {
            effective = effective.mirrored();
        }

        let prepare = |value: &Value| -> Result<Value> {
            let validated = field.validate(value)?;
            match &inverse {
                Some(inverse) => inverse.apply(&validated),
                None => Ok(validated),
            }
        };

        let version = self.config.version;
        let name = field.name.as_str();
        let compiled: (Clause, bool) = match effective {
            Op::Lt | Op::Lte | Op::Gt | Op::Gte => {
                let bound = range_bound(effective);
                let value = prepare_all(&value, prepare)?;
                (RangeQuery::new(name, version)?.with_bound(bound, value).into(), false)
            }
            Op::Eq | Op::Ne => {
                let value = prepare_all(&value, prepare)?;
                (Term::new(name, version)?.with_value(value).into(), effective == Op::Ne)
            }
            Op::In => {
                let values = in_list(&value)
                    .iter()
                    .map(|item| prepare(item).map(|v| v.to_json()))
                    .collect::<Result<Vec<_>>>()?;
                (Terms::new(name, version)?.with_values(values).into(), false)
            }
            Op::Match | Op::MatchAll | Op::NotMatch => {
                let query = prepare_all(&value, prepare)?;
                let mut clause = MatchQuery::new(name, version)?.with_query(query);
                if effective == Op::MatchAll {
                    clause = clause.with_operator("and");
                }
                (clause.into(), effective == Op::NotMatch)
            }
            Op::Like | Op::NotLike => return Err(CompileError::NotImplemented(effective.to_string())),
            other => return Err(CompileError::UnsupportedOperator(other.to_string())),
        };
        Ok(compiled)
    }

    fn resolve_side(&self, operand: &Operand, op: Op) -> Result<Side> {
        match operand {
            Operand::Field(field) => Ok(Side::Field(declared(field, op)?, None)),
            Operand::Name(name) => Ok(Side::Name(name.clone())),
            Operand::Value(Value::String(text)) => Ok(Side::Text(text.clone())),
            Operand::Value(value) => Ok(Side::Literal(value.clone())),
            Operand::Expr(inner) => match self.parse_expr(inner)? {
                Compiled::Operand { field, inverse } => Ok(Side::Field(field, inverse)),
                _ => Err(CompileError::UnsupportedOperator(format!(
                    "'{}' cannot be an operand of '{op}'",
                    inner.op()
                ))),
            },
        }
    }
}

fn child(operand: &Operand, op: Op) -> Result<&Expr> {
    operand.as_expr().ok_or_else(|| CompileError::AmbiguousOperand {
        op,
        reason: format!("'{operand}' is not an expression"),
    })
}

/// Attaches the current group to its parent and makes the parent current.
fn close_group(current: &mut Context, enclosing: &mut Vec<Context>) {
    if let Some(parent) = enclosing.pop() {
        let nested = mem::replace(current, parent);
        let occur = current.combinator();
        current.group.push(occur, nested.group);
        debug!(depth = enclosing.len(), "Closed nested group");
    }
}

fn declared(field: &model::Field, op: Op) -> Result<FieldRef> {
    let name = field.name().ok_or_else(|| CompileError::AmbiguousOperand {
        op,
        reason: "field has no name".to_string(),
    })?;
    Ok(FieldRef {
        name: name.to_string(),
        field: Some(field.clone()),
    })
}

fn compile_arithmetic(expr: &Expr) -> Result<(FieldRef, Inverse)> {
    let op = expr.op();
    if op == Op::Xor {
        return Err(CompileError::NotImplemented("XOR".to_string()));
    }

    let (field, constant, field_on_left) = match (expr.lhs(), expr.rhs()) {
        (Operand::Expr(_), _) | (_, Operand::Expr(_)) => {
            return Err(CompileError::AmbiguousOperand {
                op,
                reason: "nested arithmetic is not supported".to_string(),
            });
        }
        (Operand::Field(field), Operand::Value(constant)) => (declared(field, op)?, constant, true),
        (Operand::Name(name), Operand::Value(constant)) => (FieldRef::bare(name.as_str()), constant, true),
        (Operand::Value(constant), Operand::Field(field)) => (declared(field, op)?, constant, false),
        (Operand::Value(constant), Operand::Name(name)) => (FieldRef::bare(name.as_str()), constant, false),
        _ => {
            return Err(CompileError::AmbiguousOperand {
                op,
                reason: "expected one field and one constant".to_string(),
            });
        }
    };

    let inverse = Inverse::new(op, constant, field_on_left)?;
    Ok((field, inverse))
}

fn compile_aggregation(expr: &Expr) -> Result<Compiled> {
    let op = expr.op();
    let kind = metric_kind(op).ok_or_else(|| CompileError::UnsupportedOperator(op.to_string()))?;
    let field = match expr.lhs() {
        Operand::Field(field) => declared(field, op)?.name,
        Operand::Name(name) => name.clone(),
        Operand::Value(Value::String(name)) => name.clone(),
        other => {
            return Err(CompileError::AmbiguousOperand {
                op,
                reason: format!("cannot aggregate over '{other}'"),
            });
        }
    };
    Ok(Compiled::Metric { field, kind })
}

fn range_bound(op: Op) -> RangeBound {
    match op {
        Op::Lt => RangeBound::Lt,
        Op::Lte => RangeBound::Lte,
        Op::Gt => RangeBound::Gt,
        _ => RangeBound::Gte,
    }
}

/// Runs `prepare` over a scalar, or over each element of a list.
fn prepare_all(value: &Value, prepare: impl Fn(&Value) -> Result<Value>) -> Result<serde_json::Value> {
    match value {
        Value::List(items) => {
            let items = items
                .iter()
                .map(|item| prepare(item).map(|v| v.to_json()))
                .collect::<Result<Vec<_>>>()?;
            Ok(serde_json::Value::Array(items))
        }
        scalar => prepare(scalar).map(|v| v.to_json()),
    }
}

/// Values of an `IN` comparison. Text such as `" ( 12; 45 ) "` loses its brackets and
/// is split on `,` and `;`.
fn in_list(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        Value::Json(serde_json::Value::Array(items)) => items.iter().cloned().map(Value::from).collect(),
        other => {
            let text = other.to_string();
            let stripped: String = text
                .chars()
                .filter(|c| !matches!(c, '(' | ')' | '[' | ']'))
                .collect();
            stripped
                .split([',', ';'])
                .map(|item| Value::String(item.trim().to_string()))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompilerConfig;
    use model::Field;
    use serde_json::json;
    use sql_syntax::{and_of, arith, compare, or_of};
    use tracing_test::traced_test;

    fn compiler() -> QueryCompiler {
        QueryCompiler::new(CompilerConfig::default().with_filter_context(false))
    }

    fn leaf(expr: &Expr) -> (serde_json::Value, bool) {
        match compiler().parse_expr(expr).unwrap() {
            Compiled::Clause { clause, inverted } => (clause.into(), inverted),
            other => panic!("expected a clause, got {other:?}"),
        }
    }

    #[test]
    fn test_in_list_normalization() {
        assert_eq!(
            in_list(&Value::from(" ( 12; 45 ) ")),
            vec![Value::from("12"), Value::from("45")]
        );
        assert_eq!(
            in_list(&Value::from("[a, b;c]")),
            vec![Value::from("a"), Value::from("b"), Value::from("c")]
        );
        assert_eq!(in_list(&Value::List(vec![Value::Int(1)])), vec![Value::Int(1)]);
    }

    #[test]
    fn test_relational_leaves() {
        let (clause, inverted) = leaf(&compare("host", Op::Eq, Value::from("web-1")));
        assert_eq!(clause, json!({"term": {"host": {"value": "web-1"}}}));
        assert!(!inverted);

        let (clause, inverted) = leaf(&compare("host", Op::Ne, Value::from("web-1")));
        assert_eq!(clause, json!({"term": {"host": {"value": "web-1"}}}));
        assert!(inverted);

        let (clause, _) = leaf(&compare("lineno", Op::Lte, 0));
        assert_eq!(clause, json!({"range": {"lineno": {"lte": 0}}}));
    }

    #[test]
    fn test_field_on_the_right_mirrors_ordering() {
        let (clause, _) = leaf(&compare(10, Op::Lt, "lineno"));
        assert_eq!(clause, json!({"range": {"lineno": {"gt": 10}}}));

        let age = Field::integer().named("age");
        let (clause, _) = leaf(&compare(Value::from("30"), Op::Gte, &age));
        assert_eq!(clause, json!({"range": {"age": {"lte": 30}}}));
    }

    #[test]
    fn test_validators_run_over_values() {
        let active = Field::boolean().named("active");
        let (clause, _) = leaf(&compare(&active, Op::Eq, Value::from("TRUE")));
        assert_eq!(clause, json!({"term": {"active": {"value": "true"}}}));

        let lineno = Field::integer().named("lineno");
        let (clause, _) = leaf(&compare(&lineno, Op::In, Value::from("(12; 45)")));
        assert_eq!(clause, json!({"terms": {"lineno": [12, 45]}}));

        let err = compiler()
            .parse_expr(&compare(&lineno, Op::Eq, Value::from("twelve")))
            .unwrap_err();
        assert!(matches!(err, CompileError::Field(_)));
    }

    #[test]
    fn test_match_family() {
        let (clause, inverted) = leaf(&compare("msg", Op::MatchAll, Value::from("disk full")));
        assert_eq!(clause, json!({"match": {"msg": {"query": "disk full", "operator": "and"}}}));
        assert!(!inverted);

        let (_, inverted) = leaf(&compare("msg", Op::NotMatch, Value::from("disk")));
        assert!(inverted);

        for op in [Op::Like, Op::NotLike] {
            assert!(matches!(
                compiler().parse_expr(&compare("msg", op, Value::from("%a%"))),
                Err(CompileError::NotImplemented(_))
            ));
        }
    }

    #[test]
    fn test_arithmetic_inverse_is_applied() {
        let (clause, _) = leaf(&compare(arith("lineno", Op::Add, 5), Op::Gt, 10));
        assert_eq!(clause, json!({"range": {"lineno": {"gt": 5}}}));

        let (clause, _) = leaf(&compare(arith(-2, Op::Mul, "lineno"), Op::Lt, 8));
        assert_eq!(clause, json!({"range": {"lineno": {"gt": -4}}}));

        let (clause, _) = leaf(&compare(arith(100, Op::Sub, "score"), Op::Gte, 60));
        assert_eq!(clause, json!({"range": {"score": {"lte": 40}}}));

        let (clause, _) = leaf(&compare(arith("lineno", Op::Add, 1), Op::In, Value::from("1,2")));
        assert_eq!(clause, json!({"terms": {"lineno": [0, 1]}}));
    }

    #[test]
    fn test_arithmetic_errors() {
        let nested = compare(arith(arith("a", Op::Add, 1), Op::Mul, 2), Op::Gt, 3);
        assert!(matches!(
            compiler().parse_expr(&nested),
            Err(CompileError::AmbiguousOperand { op: Op::Mul, .. })
        ));

        let xor = compare(arith("a", Op::Xor, 1), Op::Eq, 3);
        assert_eq!(compiler().parse_expr(&xor), Err(CompileError::NotImplemented("XOR".into())));

        let two_constants = compare(arith(1, Op::Add, 2), Op::Eq, 3);
        assert!(matches!(
            compiler().parse_expr(&two_constants),
            Err(CompileError::AmbiguousOperand { .. })
        ));
    }

    #[test]
    fn test_ambiguous_relational_operands() {
        let err = compiler().parse_expr(&compare(1, Op::Eq, 2)).unwrap_err();
        assert!(matches!(err, CompileError::AmbiguousOperand { op: Op::Eq, .. }));

        let a = Field::text().named("a");
        let b = Field::text().named("b");
        assert!(matches!(
            compiler().parse_expr(&compare(&a, Op::Eq, &b)),
            Err(CompileError::AmbiguousOperand { .. })
        ));
    }

    #[test]
    fn test_aggregation_and_logical_leaves() {
        let metric = compiler()
            .parse_expr(&sql_syntax::aggregate(Op::Max, Field::integer().named("lineno")))
            .unwrap();
        assert_eq!(
            metric,
            Compiled::Metric {
                field: "lineno".into(),
                kind: query_dsl::MetricKind::Max
            }
        );

        assert!(matches!(
            compiler().parse_expr(&and_of(compare("a", Op::Eq, 1), compare("b", Op::Eq, 2))),
            Err(CompileError::UnsupportedOperator(_))
        ));
    }

    #[test]
    fn test_non_predicate_leaf_in_where() {
        let tree = and_of(compare("a", Op::Eq, 1), arith("b", Op::Add, 2));
        assert!(matches!(
            compiler().parse_where(Some(&tree)),
            Err(CompileError::UnsupportedOperator(_))
        ));

        let tree = or_of("a", compare("b", Op::Eq, 2));
        assert!(matches!(
            compiler().parse_where(Some(&tree)),
            Err(CompileError::AmbiguousOperand { op: Op::Or, .. })
        ));
    }

    #[test]
    #[traced_test]
    fn test_nested_groups_are_logged() {
        let tree = or_of(and_of(compare("a", Op::Eq, 1), compare("b", Op::Eq, 2)), compare("c", Op::Eq, 3));
        compiler().parse_where(Some(&tree)).unwrap();
        assert!(logs_contain("Opened nested group"));
        assert!(logs_contain("Closed nested group"));
    }
}
