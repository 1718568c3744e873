//! Arithmetic leaves: `field <op> k` compared to `v` is rewritten as `field` compared
//! to the value obtained by moving `k` across.

use crate::error::{CompileError, Result};
use model::Value;
use sql_syntax::Op;

/// Deferred inverse of an arithmetic node, applied to comparison values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inverse {
    op: Op,
    constant: f64,
    exact: Option<i64>,
    field_on_left: bool,
}

impl Inverse {
    /// Builds the inverse of `field <op> constant` (or `constant <op> field` when
    /// `field_on_left` is false).
    pub fn new(op: Op, constant: &Value, field_on_left: bool) -> Result<Self> {
        let number = constant.as_f64().ok_or_else(|| {
            CompileError::InvalidArithmetic(format!("'{constant}' is not a number"))
        })?;
        if !number.is_finite() {
            return Err(CompileError::InvalidArithmetic(format!("'{constant}' is not finite")));
        }

        match (op, field_on_left) {
            (Op::Add | Op::Sub, _) => {}
            (Op::Mul, _) | (Op::Div, true) if number == 0.0 => {
                return Err(CompileError::InvalidArithmetic(format!(
                    "cannot move a zero factor across '{op}'"
                )));
            }
            (Op::Mul, _) | (Op::Div, true) => {}
            (Op::Div, false) => {
                return Err(CompileError::NotImplemented(
                    "constant divided by a field".to_string(),
                ));
            }
            (Op::Xor, _) => return Err(CompileError::NotImplemented("XOR".to_string())),
            (other, _) => return Err(CompileError::UnsupportedOperator(other.to_string())),
        }

        Ok(Self {
            op,
            constant: number,
            exact: constant.as_i64(),
            field_on_left,
        })
    }

    pub fn op(&self) -> Op {
        self.op
    }

    /// Whether moving the constant reverses an ordering comparison.
    pub fn flips_order(&self) -> bool {
        match (self.op, self.field_on_left) {
            (Op::Sub, false) => true,
            (Op::Mul | Op::Div, _) => self.constant < 0.0,
            _ => false,
        }
    }

    /// Solves the node for the field, given that the whole node equals `value`.
    /// Integral operands are solved exactly; anything else goes through `f64`.
    pub fn apply(&self, value: &Value) -> Result<Value> {
        if let (Some(k), Some(v)) = (self.exact, value.as_i64()) {
            if let Some(solved) = self.solve_exact(v, k)? {
                return Ok(Value::Int(solved));
            }
        }

        let v = value.as_f64().ok_or_else(|| {
            CompileError::InvalidArithmetic(format!("comparison value '{value}' is not a number"))
        })?;
        let k = self.constant;

        let solved = match (self.op, self.field_on_left) {
            (Op::Add, _) => v - k,
            (Op::Sub, true) => v + k,
            (Op::Sub, false) => k - v,
            (Op::Mul, _) => v / k,
            _ => v * k,
        };
        Ok(Value::Float(solved))
    }

    /// `None` when dividing out the factor leaves a remainder.
    fn solve_exact(&self, v: i64, k: i64) -> Result<Option<i64>> {
        let solved = match (self.op, self.field_on_left) {
            (Op::Add, _) => v.checked_sub(k),
            (Op::Sub, true) => v.checked_add(k),
            (Op::Sub, false) => k.checked_sub(v),
            (Op::Mul, _) => match v.checked_rem(k) {
                Some(0) => v.checked_div(k),
                Some(_) => return Ok(None),
                None => None,
            },
            _ => v.checked_mul(k),
        };
        solved.map(Some).ok_or_else(|| {
            CompileError::InvalidArithmetic(format!(
                "moving {k} across '{}' overflows for {v}",
                self.op
            ))
        })
    }
}
