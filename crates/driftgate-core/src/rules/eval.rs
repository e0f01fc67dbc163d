//! Pure tree-walking interpreter for the whitelisted expression tree.
//!
//! `validate` rejects unknown variables before evaluation begins, so a rule
//! never partially evaluates. `evaluate` knows only the whitelisted node
//! types and touches nothing outside the supplied environment.

use std::collections::BTreeMap;

use super::RuleError;
use super::parser::{BinOp, CmpOp, Expr, LogicOp};

/// Runtime value of the rule language.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
}

/// Fixed evaluation environment: variable name → value.
pub type Env = BTreeMap<String, Value>;

impl Value {
    /// Truthiness: nonzero numbers, non-empty strings, `true`.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bool(b) => *b,
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
        }
    }
}

/// Reject any variable reference not present in the environment. Walks the
/// whole tree; runs before any evaluation step.
pub fn validate(expr: &Expr, env: &Env) -> Result<(), RuleError> {
    match expr {
        Expr::Num(_) | Expr::Str(_) => Ok(()),
        Expr::Var(name) => {
            if env.contains_key(name) {
                Ok(())
            } else {
                Err(RuleError::UnknownVariable(name.clone()))
            }
        }
        Expr::Neg(inner) | Expr::Not(inner) => validate(inner, env),
        Expr::Bin { lhs, rhs, .. }
        | Expr::Cmp { lhs, rhs, .. }
        | Expr::Logic { lhs, rhs, .. } => {
            validate(lhs, env)?;
            validate(rhs, env)
        }
    }
}

fn num(value: &Value, op: &str) -> Result<f64, RuleError> {
    match value {
        Value::Num(n) => Ok(*n),
        other => Err(RuleError::TypeMismatch(format!(
            "{op} expects numbers, got {}",
            other.type_name()
        ))),
    }
}

fn apply_bin(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, RuleError> {
    let name = match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
    };
    let a = num(lhs, name)?;
    let b = num(rhs, name)?;
    let out = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => {
            if b == 0.0 {
                return Err(RuleError::DivisionByZero);
            }
            a / b
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(RuleError::DivisionByZero);
            }
            a % b
        }
    };
    Ok(Value::Num(out))
}

fn apply_cmp(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<Value, RuleError> {
    let result = match (lhs, rhs) {
        (Value::Num(a), Value::Num(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        },
        (Value::Str(a), Value::Str(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        },
        (Value::Bool(a), Value::Bool(b)) => match op {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            _ => {
                return Err(RuleError::TypeMismatch(
                    "ordering is not defined for bools".into(),
                ));
            }
        },
        (a, b) => match op {
            CmpOp::Eq => false,
            CmpOp::Ne => true,
            _ => {
                return Err(RuleError::TypeMismatch(format!(
                    "cannot order {} against {}",
                    a.type_name(),
                    b.type_name()
                )));
            }
        },
    };
    Ok(Value::Bool(result))
}

/// Evaluate a validated tree against the environment.
pub fn evaluate(expr: &Expr, env: &Env) -> Result<Value, RuleError> {
    match expr {
        Expr::Num(v) => Ok(Value::Num(*v)),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Var(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| RuleError::UnknownVariable(name.clone())),
        Expr::Neg(inner) => {
            let v = evaluate(inner, env)?;
            Ok(Value::Num(-num(&v, "unary -")?))
        }
        Expr::Not(inner) => {
            let v = evaluate(inner, env)?;
            Ok(Value::Bool(!v.truthy()))
        }
        Expr::Bin { op, lhs, rhs } => {
            let a = evaluate(lhs, env)?;
            let b = evaluate(rhs, env)?;
            apply_bin(*op, &a, &b)
        }
        Expr::Cmp { op, lhs, rhs } => {
            let a = evaluate(lhs, env)?;
            let b = evaluate(rhs, env)?;
            apply_cmp(*op, &a, &b)
        }
        Expr::Logic { op, lhs, rhs } => {
            // Short-circuit with operand-value semantics; the caller
            // coerces the final value to bool.
            let a = evaluate(lhs, env)?;
            match op {
                LogicOp::And => {
                    if !a.truthy() {
                        Ok(a)
                    } else {
                        evaluate(rhs, env)
                    }
                }
                LogicOp::Or => {
                    if a.truthy() {
                        Ok(a)
                    } else {
                        evaluate(rhs, env)
                    }
                }
            }
        }
    }
}
