// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Control-flow operations: `for`, `if`, `let` and `intersection_for`
//!
//! The service never walks the AST itself. Each method receives a body
//! executor that turns a [`VariableContext`] into geometry, which keeps
//! these operations independent of the dispatcher.

use super::csg::CsgOperations;
use crate::ast::{Value, VariableContext};
use crate::config::PipelineConfig;
use crate::error::{ErrorCode, OperationError};
use crate::mesh::{CollectionType, GenericMeshCollection, GenericMeshData, MeshOutput};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlFlowType {
    For,
    If,
    Let,
    IntersectionFor,
}

impl fmt::Display for ControlFlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ControlFlowType::For => "for",
            ControlFlowType::If => "if",
            ControlFlowType::Let => "let",
            ControlFlowType::IntersectionFor => "intersection_for",
        })
    }
}

pub type ControlFlowError = OperationError<ControlFlowType>;

/// What a body executor returns; `None` means "no geometry"
pub type BodyResult = anyhow::Result<Option<MeshOutput>>;

/// Body executor invoked once per evaluation of a block
pub type Body<'a> = dyn FnMut(&VariableContext) -> BodyResult + 'a;

/// Values a `for` loop walks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Iterable {
    /// Inclusive numeric range
    Range { start: f64, end: f64, step: f64 },
    List(Vec<Value>),
}

impl Iterable {
    pub fn range(start: f64, end: f64) -> Self {
        Iterable::Range {
            start,
            end,
            step: 1.0,
        }
    }

    /// Iterable view of an evaluated expression.
    ///
    /// Scalars iterate once, as in OpenSCAD. `undef` and booleans are not
    /// iterable.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Range { start, step, end } => Some(Iterable::Range {
                start: *start,
                end: *end,
                step: *step,
            }),
            Value::Vector(items) => Some(Iterable::List(items.clone())),
            Value::Number(_) | Value::String(_) => Some(Iterable::List(vec![value.clone()])),
            Value::Undef | Value::Boolean(_) => None,
        }
    }

    /// Number of iterations; zero for a zero step or a step pointing away
    /// from `end`
    pub fn len(&self) -> usize {
        match self {
            Iterable::List(items) => items.len(),
            Iterable::Range { start, end, step } => {
                if *step == 0.0 || !(start.is_finite() && end.is_finite() && step.is_finite()) {
                    return 0;
                }
                let span = (end - start) / step;
                if span < 0.0 {
                    return 0;
                }
                // Tolerate accumulated error so 0:0.1:1 reaches 1
                (span + 1e-9).floor() as usize + 1
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`-th iteration value
    pub fn value_at(&self, i: usize) -> Option<Value> {
        if i >= self.len() {
            return None;
        }
        match self {
            Iterable::List(items) => items.get(i).cloned(),
            // start + i*step rather than repeated addition
            Iterable::Range { start, step, .. } => Some(Value::Number(start + i as f64 * step)),
        }
    }
}

/// Condition of an `if`
pub enum Condition<'a> {
    Literal(bool),
    Predicate(Box<dyn Fn(&VariableContext) -> anyhow::Result<bool> + 'a>),
}

impl<'a> Condition<'a> {
    pub fn predicate(f: impl Fn(&VariableContext) -> anyhow::Result<bool> + 'a) -> Self {
        Condition::Predicate(Box::new(f))
    }

    /// A failing predicate counts as `false`
    pub fn evaluate(&self, ctx: &VariableContext) -> bool {
        match self {
            Condition::Literal(value) => *value,
            Condition::Predicate(predicate) => predicate(ctx).unwrap_or_else(|err| {
                warn!(error = %format!("{err:#}"), "if condition failed, taking else branch");
                false
            }),
        }
    }
}

impl fmt::Debug for Condition<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Condition::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<bool> for Condition<'_> {
    fn from(value: bool) -> Self {
        Condition::Literal(value)
    }
}

#[derive(Debug, Clone)]
pub struct ControlFlowOperations {
    csg: CsgOperations,
    max_iterations: usize,
}

impl Default for ControlFlowOperations {
    fn default() -> Self {
        Self::new(&PipelineConfig::default(), CsgOperations::default())
    }
}

impl ControlFlowOperations {
    pub fn new(config: &PipelineConfig, csg: CsgOperations) -> Self {
        Self {
            csg,
            max_iterations: config.max_loop_iterations,
        }
    }

    /// Run `body` once per value of `iterable` with `variable` bound.
    ///
    /// Failing iterations are logged and skipped. Successful results are
    /// flattened, in iteration order, into one collection.
    #[instrument(level = "debug", skip(self, iterable, ctx, body), fields(iterations))]
    pub fn for_loop(
        &self,
        variable: &str,
        iterable: &Iterable,
        ctx: &VariableContext,
        body: &mut Body<'_>,
    ) -> Result<GenericMeshCollection, ControlFlowError> {
        let outputs = self.iterate(ControlFlowType::For, variable, iterable, ctx, body)?;
        Ok(GenericMeshCollection::from_outputs(
            CollectionType::ControlFlowResult,
            outputs,
        ))
    }

    /// Evaluate `then_body` or `else_body` depending on `condition`
    pub fn if_else<'b>(
        &self,
        condition: &Condition<'_>,
        ctx: &VariableContext,
        then_body: &mut Body<'b>,
        else_body: Option<&mut Body<'b>>,
    ) -> Result<Option<MeshOutput>, ControlFlowError> {
        let taken = condition.evaluate(ctx);
        debug!(taken, "if");

        let body = match (taken, else_body) {
            (true, _) => then_body,
            (false, Some(else_body)) => else_body,
            (false, None) => return Ok(None),
        };
        body(ctx).map_err(|err| body_failed(ControlFlowType::If, err, ctx))
    }

    /// `if` without an `else` branch
    pub fn if_then(
        &self,
        condition: &Condition<'_>,
        ctx: &VariableContext,
        then_body: &mut Body<'_>,
    ) -> Result<Option<MeshOutput>, ControlFlowError> {
        self.if_else(condition, ctx, then_body, None)
    }

    /// Evaluate `body` once in a scope where `bindings` shadow `ctx`
    pub fn let_block(
        &self,
        bindings: &[(String, Value)],
        ctx: &VariableContext,
        body: &mut Body<'_>,
    ) -> Result<Option<MeshOutput>, ControlFlowError> {
        let scope = ctx.child(bindings.iter().cloned());
        body(&scope).map_err(|err| body_failed(ControlFlowType::Let, err, &scope))
    }

    /// Intersection of every iteration's geometry.
    ///
    /// Each iteration's own meshes are unioned first. Returns `None` when no
    /// iteration produced geometry or the iterations share no volume.
    #[instrument(level = "debug", skip(self, iterable, ctx, body))]
    pub fn intersection_for(
        &self,
        variable: &str,
        iterable: &Iterable,
        ctx: &VariableContext,
        body: &mut Body<'_>,
    ) -> Result<Option<GenericMeshData>, ControlFlowError> {
        let kind = ControlFlowType::IntersectionFor;
        let outputs = self.iterate(kind, variable, iterable, ctx, body)?;

        let mut solids = Vec::with_capacity(outputs.len());
        for output in outputs {
            let mut meshes = output.into_meshes();
            match meshes.len() {
                0 => {}
                1 => solids.extend(meshes.pop()),
                _ => match self.csg.union(&meshes) {
                    Ok(mesh) => solids.push(mesh),
                    Err(err) => warn!(error = %err, "skipping iteration whose union failed"),
                },
            }
        }

        let mut solids = solids.into_iter();
        let Some(mut accumulated) = solids.next() else {
            return Ok(None);
        };
        for solid in solids {
            accumulated = match self.csg.intersection(&accumulated, &solid) {
                Ok(mesh) => mesh,
                Err(err) if err.code == ErrorCode::NoIntersection => {
                    warn!(error = %err, "intersection_for iterations share no volume");
                    return Ok(None);
                }
                Err(err) => {
                    return Err(ControlFlowError::new(
                        ErrorCode::EvaluationFailed,
                        kind,
                        err.message.clone(),
                    )
                    .with_details(serde_json::json!({ "csg": err })))
                }
            };
        }
        Ok(Some(accumulated))
    }

    fn iterate(
        &self,
        kind: ControlFlowType,
        variable: &str,
        iterable: &Iterable,
        ctx: &VariableContext,
        body: &mut Body<'_>,
    ) -> Result<Vec<MeshOutput>, ControlFlowError> {
        if variable.is_empty() {
            return Err(ControlFlowError::new(
                ErrorCode::InvalidParameters,
                kind,
                "loop variable name is empty",
            ));
        }
        let count = iterable.len();
        if count > self.max_iterations {
            return Err(ControlFlowError::new(
                ErrorCode::InvalidParameters,
                kind,
                format!(
                    "{count} iterations exceed the limit of {}",
                    self.max_iterations
                ),
            )
            .with_details(serde_json::json!({ "iterable": iterable })));
        }
        tracing::Span::current().record("iterations", count);

        let mut outputs = Vec::with_capacity(count);
        for i in 0..count {
            let Some(value) = iterable.value_at(i) else {
                break;
            };
            let scope = ctx.child([(variable.to_string(), value)]);
            match body(&scope) {
                Ok(Some(output)) => outputs.push(output),
                Ok(None) => {}
                Err(err) => warn!(
                    %kind,
                    iteration = i,
                    error = %format!("{err:#}"),
                    "skipping failed iteration"
                ),
            }
        }
        debug!(%kind, iterations = count, produced = outputs.len(), "loop finished");
        Ok(outputs)
    }
}

fn body_failed(kind: ControlFlowType, err: anyhow::Error, ctx: &VariableContext) -> ControlFlowError {
    ControlFlowError::new(ErrorCode::EvaluationFailed, kind, format!("{err:#}"))
        .with_details(serde_json::json!({ "context": ctx.to_json() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use crate::mesh::{GenericGeometry, MeshDataBuilder};
    use nalgebra::Vector3;

    fn cube_at(x: f64) -> GenericMeshData {
        let mut mesh = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), false).to_mesh();
        mesh.translate(Vector3::new(x, 0.0, 0.0));
        MeshDataBuilder::new("cube", GenericGeometry::from_mesh(mesh).unwrap()).build()
    }

    fn ops() -> ControlFlowOperations {
        ControlFlowOperations::default()
    }

    #[test]
    fn test_range_lengths() {
        assert_eq!(Iterable::range(0.0, 2.0).len(), 3);
        assert_eq!(Iterable::range(5.0, 3.0).len(), 0);
        assert_eq!(Iterable::Range { start: 5.0, end: 3.0, step: -1.0 }.len(), 3);
        assert_eq!(Iterable::Range { start: 0.0, end: 3.0, step: 0.0 }.len(), 0);
        assert_eq!(Iterable::Range { start: 0.0, end: 1.0, step: 0.1 }.len(), 11);
    }

    #[test]
    fn test_for_loop_ids_in_order() {
        let mut body = |ctx: &VariableContext| -> BodyResult {
            let i = ctx.lookup("i").as_f64().unwrap_or(-1.0);
            let mut mesh = cube_at(i * 3.0);
            mesh.id = format!("mesh_{i}");
            Ok(Some(mesh.into()))
        };
        let collection = ops()
            .for_loop("i", &Iterable::range(0.0, 2.0), &VariableContext::new(), &mut body)
            .unwrap();

        let ids: Vec<&str> = collection.meshes().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["mesh_0", "mesh_1", "mesh_2"]);
        assert_eq!(collection.collection_type(), CollectionType::ControlFlowResult);
    }

    #[test]
    fn test_contradictory_range_is_empty() {
        let mut calls = 0;
        let mut body = |_: &VariableContext| -> BodyResult {
            calls += 1;
            Ok(None)
        };
        let collection = ops()
            .for_loop("i", &Iterable::range(5.0, 3.0), &VariableContext::new(), &mut body)
            .unwrap();
        assert!(collection.is_empty());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_failed_iteration_is_skipped() {
        let mut body = |ctx: &VariableContext| -> BodyResult {
            match ctx.lookup("i").as_f64() {
                Some(i) if i == 1.0 => anyhow::bail!("boom"),
                Some(i) => Ok(Some(cube_at(i * 3.0).into())),
                None => Ok(None),
            }
        };
        let collection = ops()
            .for_loop("i", &Iterable::range(0.0, 2.0), &VariableContext::new(), &mut body)
            .unwrap();
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_iteration_limit() {
        let config = PipelineConfig {
            max_loop_iterations: 10,
            ..PipelineConfig::default()
        };
        let ops = ControlFlowOperations::new(&config, CsgOperations::default());
        let mut body = |_: &VariableContext| -> BodyResult { Ok(None) };
        let err = ops
            .for_loop("i", &Iterable::range(0.0, 100.0), &VariableContext::new(), &mut body)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameters);
        assert_eq!(err.operation, ControlFlowType::For);
    }

    #[test]
    fn test_failing_predicate_takes_else() {
        let condition = Condition::predicate(|_| anyhow::bail!("bad condition"));
        let mut then_body = |_: &VariableContext| -> BodyResult { Ok(Some(cube_at(0.0).into())) };
        let mut else_body = |_: &VariableContext| -> BodyResult { Ok(Some(cube_at(9.0).into())) };

        let result = ops()
            .if_else(&condition, &VariableContext::new(), &mut then_body, Some(&mut else_body))
            .unwrap()
            .unwrap();
        assert_eq!(result.as_single().unwrap().bounding_box().min.x, 9.0);

        let none = ops()
            .if_then(&condition, &VariableContext::new(), &mut then_body)
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_let_shadows_parent() {
        let parent = VariableContext::with_variables([("x".to_string(), Value::from(1.0))]);
        let mut seen = Value::Undef;
        let mut body = |ctx: &VariableContext| -> BodyResult {
            seen = ctx.lookup("x");
            Ok(None)
        };
        ops()
            .let_block(&[("x".to_string(), Value::from(5.0))], &parent, &mut body)
            .unwrap();
        assert_eq!(seen, Value::from(5.0));
        assert_eq!(parent.lookup("x"), Value::from(1.0));
    }

    #[test]
    fn test_body_error_is_evaluation_failed() {
        let mut body = |_: &VariableContext| -> BodyResult { anyhow::bail!("nope") };
        let err = ops()
            .let_block(&[], &VariableContext::new(), &mut body)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EvaluationFailed);
        assert_eq!(err.operation, ControlFlowType::Let);
        assert!(err.details.is_some());
    }

    #[test]
    fn test_intersection_for_folds_all_iterations() {
        let mut body = |ctx: &VariableContext| -> BodyResult {
            let i = ctx.lookup("i").as_f64().unwrap_or(0.0);
            Ok(Some(cube_at(i).into()))
        };
        let result = ops()
            .intersection_for("i", &Iterable::range(0.0, 1.0), &VariableContext::new(), &mut body)
            .unwrap()
            .unwrap();

        // [0,2] and [1,3] overlap on [1,2] along x
        let bbox = result.bounding_box();
        assert!((bbox.min.x - 1.0).abs() < 1e-4);
        assert!((bbox.max.x - 2.0).abs() < 1e-4);
        assert_eq!(result.metadata.csg_operations(), ["intersection"]);
    }

    #[test]
    fn test_intersection_for_disjoint_is_none() {
        let mut body = |ctx: &VariableContext| -> BodyResult {
            let i = ctx.lookup("i").as_f64().unwrap_or(0.0);
            Ok(Some(cube_at(i * 10.0).into()))
        };
        let result = ops()
            .intersection_for("i", &Iterable::range(0.0, 1.0), &VariableContext::new(), &mut body)
            .unwrap();
        assert!(result.is_none());
    }
}
