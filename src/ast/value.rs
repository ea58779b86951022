// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Runtime values and variable scopes

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A dynamically typed OpenSCAD value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    #[default]
    Undef,
    Boolean(bool),
    Number(f64),
    String(String),
    Vector(Vec<Value>),
    Range { start: f64, step: f64, end: f64 },
}

impl Value {
    /// OpenSCAD truthiness: `undef`, `false`, `0`, `""` and `[]` are false
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undef => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Vector(v) => !v.is_empty(),
            Value::Range { .. } => true,
        }
    }

    pub fn is_undef(&self) -> bool {
        matches!(self, Value::Undef)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[Value]> {
        match self {
            Value::Vector(items) => Some(items),
            _ => None,
        }
    }

    /// Every element as a number, or `None` if any is not
    pub fn as_numbers(&self) -> Option<Vec<f64>> {
        self.as_vector()?.iter().map(Value::as_f64).collect()
    }

    /// A vector with at least 2 numeric components, `z` defaulting to 0
    pub fn as_vec3(&self) -> Option<Vector3<f64>> {
        let numbers = self.as_numbers()?;
        match numbers.as_slice() {
            [x, y] => Some(Vector3::new(*x, *y, 0.0)),
            [x, y, z, ..] => Some(Vector3::new(*x, *y, *z)),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undef => "undef",
            Value::Boolean(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Vector(_) => "vector",
            Value::Range { .. } => "range",
        }
    }

    /// Plain JSON form used in mesh metadata and error details
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Undef => serde_json::Value::Null,
            Value::Boolean(b) => (*b).into(),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => s.clone().into(),
            Value::Vector(items) => items.iter().map(Value::to_json).collect(),
            Value::Range { start, step, end } => {
                serde_json::json!({ "start": start, "step": step, "end": end })
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Vector(items)
    }
}

impl From<Vec<f64>> for Value {
    fn from(items: Vec<f64>) -> Self {
        Value::Vector(items.into_iter().map(Value::Number).collect())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => f.write_str("undef"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::Vector(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Range { start, step, end } => write!(f, "[{start} : {step} : {end}]"),
        }
    }
}

/// Variable bindings visible to one construct.
///
/// Scopes are flattened: a child copies its parent's bindings and layers
/// its own on top, so lookups never walk the chain. The parent link is
/// kept only for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct VariableContext {
    variables: BTreeMap<String, Value>,
    parent: Option<Arc<VariableContext>>,
    depth: usize,
}

impl VariableContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root scope seeded with `bindings`
    pub fn with_variables(bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            variables: bindings.into_iter().collect(),
            ..Self::default()
        }
    }

    /// New scope whose bindings shadow this one's
    pub fn child(&self, bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut variables = self.variables.clone();
        variables.extend(bindings);
        Self {
            variables,
            parent: Some(Arc::new(self.clone())),
            depth: self.depth + 1,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Value of `name`, `undef` when unbound
    pub fn lookup(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or_default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.variables.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    pub fn parent(&self) -> Option<&VariableContext> {
        self.parent.as_deref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let variables: serde_json::Map<String, serde_json::Value> = self
            .variables
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect();
        serde_json::json!({ "depth": self.depth, "variables": variables })
    }
}
