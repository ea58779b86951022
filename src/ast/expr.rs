// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Expressions and their evaluation
//!
//! Operator semantics follow OpenSCAD: mismatched operand types produce
//! `undef` with a warning rather than an error. Errors are reserved for
//! constructs that cannot be given any value (unknown functions, bad
//! arity, non-numeric range bounds).

use super::value::{Value, VariableContext};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("`{function}` expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: &'static str,
        actual: usize,
    },

    #[error("range bound `{0}` is not a number")]
    InvalidRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Power,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Undef,
    Number(f64),
    Bool(bool),
    Str(String),
    Variable(String),
    Vector(Vec<Expr>),
    Range {
        start: Box<Expr>,
        step: Option<Box<Expr>>,
        end: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Expr::Str(s.into())
    }

    pub fn vector(items: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Vector(items.into_iter().collect())
    }

    pub fn vec3(x: f64, y: f64, z: f64) -> Self {
        Expr::vector([Expr::Number(x), Expr::Number(y), Expr::Number(z)])
    }

    /// `[start : end]`
    pub fn range(start: impl Into<Expr>, end: impl Into<Expr>) -> Self {
        Expr::Range {
            start: Box::new(start.into()),
            step: None,
            end: Box::new(end.into()),
        }
    }

    /// `[start : step : end]`
    pub fn stepped_range(
        start: impl Into<Expr>,
        step: impl Into<Expr>,
        end: impl Into<Expr>,
    ) -> Self {
        Expr::Range {
            start: Box::new(start.into()),
            step: Some(Box::new(step.into())),
            end: Box::new(end.into()),
        }
    }

    pub fn unary(op: UnaryOp, operand: impl Into<Expr>) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand.into()),
        }
    }

    pub fn binary(op: BinaryOp, left: impl Into<Expr>, right: impl Into<Expr>) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left.into()),
            right: Box::new(right.into()),
        }
    }

    pub fn ternary(
        condition: impl Into<Expr>,
        then_expr: impl Into<Expr>,
        else_expr: impl Into<Expr>,
    ) -> Self {
        Expr::Ternary {
            condition: Box::new(condition.into()),
            then_expr: Box::new(then_expr.into()),
            else_expr: Box::new(else_expr.into()),
        }
    }

    pub fn index(target: impl Into<Expr>, index: impl Into<Expr>) -> Self {
        Expr::Index {
            target: Box::new(target.into()),
            index: Box::new(index.into()),
        }
    }

    pub fn call(name: impl Into<String>, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Call {
            name: name.into(),
            args: args.into_iter().collect(),
        }
    }

    pub fn evaluate(&self, ctx: &VariableContext) -> Result<Value, ValueError> {
        match self {
            Expr::Undef => Ok(Value::Undef),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Bool(b) => Ok(Value::Boolean(*b)),
            Expr::Str(s) => Ok(Value::String(s.clone())),
            Expr::Variable(name) => Ok(match ctx.get(name) {
                Some(value) => value.clone(),
                None => {
                    // `$` variables are legitimately unset until someone assigns them
                    if !name.starts_with('$') {
                        warn!(variable = %name, "unknown variable");
                    }
                    Value::Undef
                }
            }),
            Expr::Vector(items) => items
                .iter()
                .map(|item| item.evaluate(ctx))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Vector),
            Expr::Range { start, step, end } => {
                let bound = |expr: &Expr| -> Result<f64, ValueError> {
                    let value = expr.evaluate(ctx)?;
                    value
                        .as_f64()
                        .ok_or_else(|| ValueError::InvalidRange(value.to_string()))
                };
                Ok(Value::Range {
                    start: bound(start.as_ref())?,
                    step: step.as_deref().map(bound).transpose()?.unwrap_or(1.0),
                    end: bound(end.as_ref())?,
                })
            }
            Expr::Unary { op, operand } => {
                let value = operand.evaluate(ctx)?;
                Ok(match op {
                    UnaryOp::Not => Value::Boolean(!value.is_truthy()),
                    UnaryOp::Negate => negate(&value),
                })
            }
            Expr::Binary { op, left, right } => {
                let lhs = left.evaluate(ctx)?;
                // Logical operators short-circuit
                match op {
                    BinaryOp::And if !lhs.is_truthy() => return Ok(Value::Boolean(false)),
                    BinaryOp::Or if lhs.is_truthy() => return Ok(Value::Boolean(true)),
                    BinaryOp::And | BinaryOp::Or => {
                        return Ok(Value::Boolean(right.evaluate(ctx)?.is_truthy()))
                    }
                    _ => {}
                }
                let rhs = right.evaluate(ctx)?;
                Ok(binary(*op, &lhs, &rhs))
            }
            Expr::Ternary {
                condition,
                then_expr,
                else_expr,
            } => {
                if condition.evaluate(ctx)?.is_truthy() {
                    then_expr.evaluate(ctx)
                } else {
                    else_expr.evaluate(ctx)
                }
            }
            Expr::Index { target, index } => {
                let target = target.evaluate(ctx)?;
                let index = index.evaluate(ctx)?;
                Ok(index_value(&target, &index))
            }
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| arg.evaluate(ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                call_builtin(name, &args)
            }
        }
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::Number(n)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Bool(b)
    }
}

fn negate(value: &Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(-n),
        Value::Vector(items) => Value::Vector(items.iter().map(negate).collect()),
        other => {
            warn!(operand = other.type_name(), "cannot negate");
            Value::Undef
        }
    }
}

fn elementwise(a: &[Value], b: &[Value], op: BinaryOp) -> Value {
    if a.len() != b.len() {
        return Value::Undef;
    }
    Value::Vector(a.iter().zip(b).map(|(x, y)| binary(op, x, y)).collect())
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    use BinaryOp::*;
    use Value::{Boolean, Number, Vector};

    let result = match (op, lhs, rhs) {
        (Equal, a, b) => Some(Boolean(a == b)),
        (NotEqual, a, b) => Some(Boolean(a != b)),

        (Add, Number(a), Number(b)) => Some(Number(a + b)),
        (Subtract, Number(a), Number(b)) => Some(Number(a - b)),
        (Multiply, Number(a), Number(b)) => Some(Number(a * b)),
        (Divide, Number(a), Number(b)) => Some(Number(a / b)),
        (Modulo, Number(a), Number(b)) => Some(Number(a % b)),
        (Power, Number(a), Number(b)) => Some(Number(a.powf(*b))),

        (Less, Number(a), Number(b)) => Some(Boolean(a < b)),
        (LessEqual, Number(a), Number(b)) => Some(Boolean(a <= b)),
        (Greater, Number(a), Number(b)) => Some(Boolean(a > b)),
        (GreaterEqual, Number(a), Number(b)) => Some(Boolean(a >= b)),
        (Less, Value::String(a), Value::String(b)) => Some(Boolean(a < b)),
        (Greater, Value::String(a), Value::String(b)) => Some(Boolean(a > b)),

        (Add | Subtract, Vector(a), Vector(b)) => Some(elementwise(a, b, op)),
        (Multiply, Vector(a), Vector(b)) => dot(a, b),
        (Multiply, Number(_), Vector(items)) => Some(Vector(
            items.iter().map(|item| binary(Multiply, lhs, item)).collect(),
        )),
        (Multiply | Divide, Vector(items), Number(_)) => Some(Vector(
            items.iter().map(|item| binary(op, item, rhs)).collect(),
        )),
        _ => None,
    };

    result.unwrap_or_else(|| {
        warn!(
            ?op,
            left = lhs.type_name(),
            right = rhs.type_name(),
            "operator not defined for operands"
        );
        Value::Undef
    })
}

fn dot(a: &[Value], b: &[Value]) -> Option<Value> {
    if a.len() != b.len() {
        return None;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| Some(x.as_f64()? * y.as_f64()?))
        .sum::<Option<f64>>()
        .map(Value::Number)
}

fn index_value(target: &Value, index: &Value) -> Value {
    let Some(i) = index.as_f64().filter(|i| *i >= 0.0) else {
        return Value::Undef;
    };
    let i = i.floor() as usize;
    match target {
        Value::Vector(items) => items.get(i).cloned().unwrap_or_default(),
        Value::String(s) => s
            .chars()
            .nth(i)
            .map(|c| Value::String(c.to_string()))
            .unwrap_or_default(),
        _ => Value::Undef,
    }
}

fn call_builtin(name: &str, args: &[Value]) -> Result<Value, ValueError> {
    let arity = |expected: &'static str| ValueError::Arity {
        function: name.to_string(),
        expected,
        actual: args.len(),
    };
    let math1 = |f: fn(f64) -> f64| -> Result<Value, ValueError> {
        match args {
            [value] => Ok(value.as_f64().map(f).map(Value::Number).unwrap_or_default()),
            _ => Err(arity("1")),
        }
    };
    let math2 = |f: fn(f64, f64) -> f64| -> Result<Value, ValueError> {
        match args {
            [a, b] => Ok(match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => Value::Number(f(a, b)),
                _ => Value::Undef,
            }),
            _ => Err(arity("2")),
        }
    };

    match name {
        "sin" => math1(|x| x.to_radians().sin()),
        "cos" => math1(|x| x.to_radians().cos()),
        "tan" => math1(|x| x.to_radians().tan()),
        "asin" => math1(|x| x.asin().to_degrees()),
        "acos" => math1(|x| x.acos().to_degrees()),
        "atan" => math1(|x| x.atan().to_degrees()),
        "atan2" => math2(|y, x| y.atan2(x).to_degrees()),
        "abs" => math1(f64::abs),
        "ceil" => math1(f64::ceil),
        "floor" => math1(f64::floor),
        "round" => math1(f64::round),
        "sqrt" => math1(f64::sqrt),
        "exp" => math1(f64::exp),
        "ln" => math1(f64::ln),
        "log" => math1(f64::log10),
        "sign" => math1(|x| if x == 0.0 { 0.0 } else { x.signum() }),
        "pow" => math2(f64::powf),
        "min" | "max" => {
            let numbers: Option<Vec<f64>> = match args {
                [Value::Vector(items)] => items.iter().map(Value::as_f64).collect(),
                _ => args.iter().map(Value::as_f64).collect(),
            };
            let fold = if name == "min" { f64::min } else { f64::max };
            match numbers {
                Some(numbers) if !numbers.is_empty() => {
                    Ok(numbers.into_iter().reduce(fold).map(Value::Number).unwrap_or_default())
                }
                Some(_) => Err(arity("at least 1")),
                None => Ok(Value::Undef),
            }
        }
        "len" => match args {
            [Value::Vector(items)] => Ok(Value::Number(items.len() as f64)),
            [Value::String(s)] => Ok(Value::Number(s.chars().count() as f64)),
            [_] => Ok(Value::Undef),
            _ => Err(arity("1")),
        },
        "norm" => match args {
            [value] => Ok(value
                .as_numbers()
                .map(|n| Value::Number(n.iter().map(|x| x * x).sum::<f64>().sqrt()))
                .unwrap_or_default()),
            _ => Err(arity("1")),
        },
        _ => Err(ValueError::UnknownFunction(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn eval(expr: Expr) -> Value {
        expr.evaluate(&VariableContext::new()).unwrap()
    }

    #[test]
    fn test_arithmetic_and_vectors() {
        assert_eq!(eval(Expr::binary(BinaryOp::Add, 2.0, 3.0)), Value::from(5.0));
        assert_eq!(
            eval(Expr::binary(BinaryOp::Multiply, 2.0, Expr::vec3(1.0, 2.0, 3.0))),
            Value::from(vec![2.0, 4.0, 6.0])
        );
        assert_eq!(
            eval(Expr::binary(BinaryOp::Multiply, Expr::vec3(1.0, 2.0, 3.0), Expr::vec3(1.0, 1.0, 1.0))),
            Value::from(6.0)
        );
        assert!(eval(Expr::binary(BinaryOp::Add, 1.0, Expr::string("a"))).is_undef());
    }

    #[test]
    fn test_variables_and_ternary() {
        let ctx = VariableContext::with_variables([("i".to_string(), Value::from(2.0))]);
        let expr = Expr::ternary(
            Expr::binary(BinaryOp::Greater, Expr::var("i"), 1.0),
            Expr::string("big"),
            Expr::string("small"),
        );
        assert_eq!(expr.evaluate(&ctx).unwrap(), Value::from("big"));
        assert!(Expr::var("missing").evaluate(&ctx).unwrap().is_undef());
    }

    #[test]
    fn test_logical_short_circuit() {
        // The right side would be an error if evaluated
        let expr = Expr::binary(BinaryOp::And, false, Expr::call("nope", []));
        assert_eq!(eval(expr), Value::from(false));
    }

    #[test]
    fn test_range() {
        assert_eq!(
            eval(Expr::stepped_range(0.0, 2.0, 10.0)),
            Value::Range { start: 0.0, step: 2.0, end: 10.0 }
        );
        let err = Expr::range(Expr::string("a"), 3.0)
            .evaluate(&VariableContext::new())
            .unwrap_err();
        assert!(matches!(err, ValueError::InvalidRange(_)));
    }

    #[test]
    fn test_builtins() {
        assert_relative_eq!(eval(Expr::call("sin", [Expr::Number(90.0)])).as_f64().unwrap(), 1.0);
        assert_eq!(eval(Expr::call("max", [Expr::vec3(1.0, 7.0, 3.0)])), Value::from(7.0));
        assert_eq!(eval(Expr::call("len", [Expr::vec3(1.0, 7.0, 3.0)])), Value::from(3.0));
        assert_eq!(eval(Expr::index(Expr::vec3(4.0, 5.0, 6.0), 1.0)), Value::from(5.0));
        assert!(matches!(
            Expr::call("frobnicate", []).evaluate(&VariableContext::new()),
            Err(ValueError::UnknownFunction(_))
        ));
    }
}
