// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! AST evaluator - walks a node tree and dispatches to the services

use super::args::{self, Arguments, TransformStep};
use super::expr::Expr;
use super::node::{
    CsgKind, ExtrudeKind, Node, NodeKind, PrimitiveKind, ProfileKind, TransformKind,
};
use super::value::{Value, VariableContext};
use crate::config::PipelineConfig;
use crate::error::ErrorCode;
use crate::geometry::Profile;
use crate::material::MaterialService;
use crate::mesh::{
    CollectionType, GenericMaterialConfig, GenericMeshCollection, GenericMeshData, MeshOutput,
    Modifier,
};
use crate::ops::{
    ChildrenScope, Condition, ControlFlowError, ControlFlowOperations, ControlFlowType,
    CsgOperations, ExtrusionOperations, Iterable, ModuleCall, ModuleError, ModuleOperation,
    ModuleScope, ModuleSystem, PrimitiveGenerator, ResolvedModuleDefinition, TransformationError,
    TransformationOperations,
};
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::slice;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Where evaluation currently is relative to module calls
#[derive(Clone, Copy)]
struct Frame<'a> {
    /// Children of the innermost module call, for `children()`
    scope: Option<&'a ChildrenScope<'a>>,
    /// Modules defined in enclosing module bodies
    modules: Option<&'a ModuleScope<'a>>,
    depth: usize,
}

const ROOT_FRAME: Frame<'static> = Frame {
    scope: None,
    modules: None,
    depth: 0,
};

/// AST evaluator owning one session's services and caches
pub struct Evaluator {
    config: PipelineConfig,
    materials: Arc<MaterialService>,
    primitives: PrimitiveGenerator,
    transforms: TransformationOperations,
    extrusions: ExtrusionOperations,
    csg: CsgOperations,
    control_flow: ControlFlowOperations,
    modules: ModuleSystem,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let materials = Arc::new(MaterialService::new());
        let csg = CsgOperations::new(&config);
        Self {
            primitives: PrimitiveGenerator::new(config.fragments),
            transforms: TransformationOperations::new(Arc::clone(&materials)),
            extrusions: ExtrusionOperations::new(&config),
            control_flow: ControlFlowOperations::new(&config, csg.clone()),
            modules: ModuleSystem::new(&config),
            csg,
            materials,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn modules(&self) -> &ModuleSystem {
        &self.modules
    }

    pub fn materials(&self) -> &MaterialService {
        &self.materials
    }

    /// Scope every top-level evaluation starts from
    pub fn root_context(&self) -> VariableContext {
        let fragments = &self.config.fragments;
        VariableContext::with_variables([
            ("$fn".to_string(), Value::Number(0.0)),
            ("$fa".to_string(), Value::Number(fragments.default_fa)),
            ("$fs".to_string(), Value::Number(fragments.default_fs)),
            ("$children".to_string(), Value::Number(0.0)),
        ])
    }

    /// Evaluate an AST node and return its geometry
    #[instrument(level = "debug", skip_all, fields(node = %node.kind.name()))]
    pub fn evaluate(&self, node: &Node) -> Result<MeshOutput> {
        let output = self
            .evaluate_in(slice::from_ref(node), &self.root_context())
            .with_context(|| format!("failed to evaluate {}", node.describe()))?;
        Ok(output.unwrap_or_else(|| {
            MeshOutput::Collection(GenericMeshCollection::empty(CollectionType::ControlFlowResult))
        }))
    }

    /// Evaluate a block of statements in `ctx`
    pub fn evaluate_in(&self, nodes: &[Node], ctx: &VariableContext) -> Result<Option<MeshOutput>> {
        self.eval_block(nodes, ctx, ROOT_FRAME, CollectionType::ControlFlowResult)
    }

    /// Module definitions of a block. Outside module bodies they go to the
    /// registry; inside one they stay local to that body.
    fn hoist_modules<'f>(&self, nodes: &[Node], frame: Frame<'f>) -> Result<Option<ModuleScope<'f>>> {
        let mut local = ModuleScope::new(frame.modules);
        for node in nodes {
            if let NodeKind::ModuleDefinition {
                name,
                parameters,
                body,
            } = &node.kind
            {
                let definition = ResolvedModuleDefinition {
                    name: name.clone(),
                    parameters: parameters.clone(),
                    body: body.clone(),
                    source_location: node.location.clone(),
                };
                if frame.depth == 0 {
                    self.modules.register(definition)?;
                } else {
                    local.define(definition)?;
                }
            }
        }
        Ok((!local.is_empty()).then_some(local))
    }

    /// Scope of a block: assignments bound in order before any statement runs
    fn block_scope<'c>(&self, nodes: &[Node], ctx: &'c VariableContext) -> Result<Cow<'c, VariableContext>> {
        let mut assignments = nodes.iter().filter_map(|node| match &node.kind {
            NodeKind::Assignment { name, value } => Some((name, value)),
            _ => None,
        });
        let Some(first) = assignments.next() else {
            return Ok(Cow::Borrowed(ctx));
        };

        let mut scope = ctx.child([]);
        for (name, value) in std::iter::once(first).chain(assignments) {
            let value = value
                .evaluate(&scope)
                .with_context(|| format!("assignment to `{name}`"))?;
            scope.set(name.clone(), value);
        }
        Ok(Cow::Owned(scope))
    }

    fn eval_block(
        &self,
        nodes: &[Node],
        ctx: &VariableContext,
        frame: Frame<'_>,
        collection_type: CollectionType,
    ) -> Result<Option<MeshOutput>> {
        let local = self.hoist_modules(nodes, frame)?;
        let frame = with_local_modules(frame, local.as_ref());
        let scope = self.block_scope(nodes, ctx)?;

        let mut outputs = Vec::new();
        for node in nodes {
            if let Some(output) = self.eval_node(node, &scope, frame)? {
                if !output.is_empty() {
                    outputs.push(output);
                }
            }
        }

        Ok(match outputs.len() {
            0 => None,
            1 => outputs.pop(),
            _ => Some(MeshOutput::Collection(GenericMeshCollection::from_outputs(
                collection_type,
                outputs,
            ))),
        })
    }

    fn eval_node(&self, node: &Node, ctx: &VariableContext, frame: Frame<'_>) -> Result<Option<MeshOutput>> {
        if node.modifier == Some(Modifier::Disable) {
            debug!(node = %node.describe(), "disabled subtree skipped");
            return Ok(None);
        }

        let output = self
            .dispatch(node, ctx, frame)
            .with_context(|| format!("in {}", node.describe()))?;

        Ok(match node.modifier {
            Some(modifier) => output.map(|output| apply_modifier(output, modifier)),
            None => output,
        })
    }

    fn dispatch(&self, node: &Node, ctx: &VariableContext, frame: Frame<'_>) -> Result<Option<MeshOutput>> {
        match &node.kind {
            NodeKind::Primitive { kind, args } => {
                let args = Arguments::evaluate(args, ctx)?;
                let mesh = match kind {
                    PrimitiveKind::Cube => self.primitives.generate_cube(&args::cube_params(&args))?,
                    PrimitiveKind::Sphere => self
                        .primitives
                        .generate_sphere(&args::sphere_params(&args, ctx))?,
                    PrimitiveKind::Cylinder => self
                        .primitives
                        .generate_cylinder(&args::cylinder_params(&args, ctx))?,
                };
                Ok(Some(mesh.into()))
            }

            NodeKind::Profile { .. } => {
                warn!(node = %node.describe(), "2D shape outside an extrusion is ignored");
                Ok(None)
            }

            NodeKind::Transform {
                kind,
                args,
                children,
            } => {
                let args = Arguments::evaluate(args, ctx)?;
                let step = match kind {
                    TransformKind::Translate => TransformStep::translate(&args),
                    TransformKind::Rotate => TransformStep::rotate(&args),
                    TransformKind::Scale => TransformStep::scale(&args),
                    TransformKind::Mirror => TransformStep::mirror(&args),
                    TransformKind::Multmatrix => TransformStep::multmatrix(&args),
                    TransformKind::Color => TransformStep::color(&args),
                };
                let Some(body) =
                    self.eval_block(children, ctx, frame, CollectionType::TransformationGroup)?
                else {
                    return Ok(None);
                };

                let meshes = body
                    .into_meshes()
                    .iter()
                    .map(|mesh| self.apply_transform(&step, mesh))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(pack(meshes, CollectionType::TransformationGroup))
            }

            NodeKind::Csg { kind, children } => {
                let solids = self.eval_solids(children, ctx, frame)?;
                Ok(self.fold_csg(*kind, solids)?.map(MeshOutput::Single))
            }

            NodeKind::Extrude {
                kind,
                args,
                children,
            } => {
                let args = Arguments::evaluate(args, ctx)?;
                let mut profiles = Vec::new();
                self.collect_profiles(children, ctx, &mut profiles)?;
                if profiles.is_empty() {
                    warn!(node = %node.describe(), "extrusion has no 2D children");
                    return Ok(None);
                }

                let meshes = match kind {
                    ExtrudeKind::Linear => {
                        let params = args::linear_extrude_params(&args);
                        profiles
                            .iter()
                            .map(|profile| self.extrusions.linear_extrude(profile, &params))
                            .collect::<Result<Vec<_>, _>>()?
                    }
                    ExtrudeKind::Rotate => {
                        let params = args::rotate_extrude_params(&args, ctx);
                        profiles
                            .iter()
                            .map(|profile| self.extrusions.rotate_extrude(profile, &params))
                            .collect::<Result<Vec<_>, _>>()?
                    }
                };
                Ok(pack(meshes, CollectionType::ExtrusionResult))
            }

            NodeKind::For {
                variable,
                iterable,
                body,
            } => {
                let iterable = iterable_of(ControlFlowType::For, iterable, ctx)?;
                let mut run = |scope: &VariableContext| {
                    self.eval_block(body, scope, frame, CollectionType::ControlFlowResult)
                };
                let collection = self.control_flow.for_loop(variable, &iterable, ctx, &mut run)?;
                Ok(Some(MeshOutput::Collection(collection)))
            }

            NodeKind::IntersectionFor {
                variable,
                iterable,
                body,
            } => {
                let iterable = iterable_of(ControlFlowType::IntersectionFor, iterable, ctx)?;
                let mut run = |scope: &VariableContext| {
                    self.eval_block(body, scope, frame, CollectionType::ControlFlowResult)
                };
                let mesh = self
                    .control_flow
                    .intersection_for(variable, &iterable, ctx, &mut run)?;
                Ok(mesh.map(MeshOutput::Single))
            }

            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let test = Condition::predicate(|scope| Ok(condition.evaluate(scope)?.is_truthy()));
                let mut then_body = |scope: &VariableContext| {
                    self.eval_block(then_branch, scope, frame, CollectionType::ControlFlowResult)
                };
                let output = match else_branch {
                    Some(else_branch) => {
                        let mut else_body = |scope: &VariableContext| {
                            self.eval_block(else_branch, scope, frame, CollectionType::ControlFlowResult)
                        };
                        self.control_flow
                            .if_else(&test, ctx, &mut then_body, Some(&mut else_body))?
                    }
                    None => self.control_flow.if_then(&test, ctx, &mut then_body)?,
                };
                Ok(output)
            }

            NodeKind::Let { bindings, body } => {
                // Each binding sees the ones before it
                let mut partial = ctx.child([]);
                let mut values = Vec::with_capacity(bindings.len());
                for (name, expr) in bindings {
                    let value = expr.evaluate(&partial)?;
                    partial.set(name.clone(), value.clone());
                    values.push((name.clone(), value));
                }
                let mut run = |scope: &VariableContext| {
                    self.eval_block(body, scope, frame, CollectionType::ControlFlowResult)
                };
                Ok(self.control_flow.let_block(&values, ctx, &mut run)?)
            }

            // Hoisted by block_scope
            NodeKind::Assignment { .. } | NodeKind::ModuleDefinition { .. } => Ok(None),

            NodeKind::ModuleInstantiation {
                name,
                args,
                children,
            } => {
                let call = ModuleCall {
                    name,
                    args,
                    children,
                    context: ctx,
                    scope: frame.scope,
                    modules: frame.modules,
                    depth: frame.depth,
                };
                self.modules.instantiate_module(&call, |definition, module_ctx, children_scope| {
                    let inner = Frame {
                        scope: Some(children_scope),
                        modules: children_scope.modules,
                        depth: children_scope.depth + 1,
                    };
                    self.eval_block(&definition.body, module_ctx, inner, CollectionType::ControlFlowResult)
                })
            }

            NodeKind::Children { index } => {
                let Some(scope) = frame.scope else {
                    warn!("children() used outside a module");
                    return Ok(None);
                };
                let index = index
                    .as_ref()
                    .map(|expr| child_index(expr, ctx))
                    .transpose()?;

                let caller = Frame {
                    scope: scope.parent,
                    modules: scope.modules,
                    depth: scope.depth,
                };
                let output = self.modules.resolve_children(scope, index, |child| {
                    self.eval_block(
                        slice::from_ref(child),
                        scope.context,
                        caller,
                        CollectionType::ControlFlowResult,
                    )
                })?;
                Ok(Some(output))
            }

            NodeKind::Group(children) => {
                self.eval_block(children, ctx, frame, CollectionType::ControlFlowResult)
            }
        }
    }

    /// One solid per child statement; a child yielding several meshes is
    /// unioned first
    fn eval_solids(&self, nodes: &[Node], ctx: &VariableContext, frame: Frame<'_>) -> Result<Vec<GenericMeshData>> {
        let local = self.hoist_modules(nodes, frame)?;
        let frame = with_local_modules(frame, local.as_ref());
        let scope = self.block_scope(nodes, ctx)?;
        let mut solids = Vec::with_capacity(nodes.len());
        for node in nodes {
            let Some(output) = self.eval_node(node, &scope, frame)? else {
                continue;
            };
            let mut meshes = output.into_meshes();
            match meshes.len() {
                0 => {}
                1 => solids.extend(meshes.pop()),
                _ => solids.push(self.csg.union(&meshes)?),
            }
        }
        Ok(solids)
    }

    fn fold_csg(&self, kind: CsgKind, solids: Vec<GenericMeshData>) -> Result<Option<GenericMeshData>> {
        let mut solids = solids.into_iter();
        let Some(first) = solids.next() else {
            return Ok(None);
        };

        match kind {
            CsgKind::Union => {
                let rest: Vec<GenericMeshData> = solids.collect();
                if rest.is_empty() {
                    return Ok(Some(first));
                }
                let all: Vec<GenericMeshData> = std::iter::once(first).chain(rest).collect();
                Ok(Some(self.csg.union(&all)?))
            }
            CsgKind::Difference => {
                let mut accumulated = first;
                for solid in solids {
                    accumulated = self.csg.difference(&accumulated, &solid)?;
                }
                Ok(Some(accumulated))
            }
            CsgKind::Intersection => {
                let mut accumulated = first;
                for solid in solids {
                    accumulated = match self.csg.intersection(&accumulated, &solid) {
                        Ok(mesh) => mesh,
                        Err(err) if err.code == ErrorCode::NoIntersection => {
                            warn!(error = %err, "intersection is empty");
                            return Ok(None);
                        }
                        Err(err) => return Err(err.into()),
                    };
                }
                Ok(Some(accumulated))
            }
        }
    }

    fn collect_profiles(&self, nodes: &[Node], ctx: &VariableContext, profiles: &mut Vec<Profile>) -> Result<()> {
        let scope = self.block_scope(nodes, ctx)?;
        for node in nodes {
            if node.modifier == Some(Modifier::Disable) {
                continue;
            }
            match &node.kind {
                NodeKind::Profile { kind, args } => {
                    let args = Arguments::evaluate(args, &scope)?;
                    let profile = self
                        .build_profile(*kind, &args, &scope)
                        .with_context(|| format!("in {}", node.describe()))?;
                    profiles.push(profile);
                }
                NodeKind::Group(children) => self.collect_profiles(children, &scope, profiles)?,
                NodeKind::Assignment { .. } | NodeKind::ModuleDefinition { .. } => {}
                _ => warn!(node = %node.describe(), "only 2D shapes can be extruded; ignoring"),
            }
        }
        Ok(())
    }

    fn build_profile(&self, kind: ProfileKind, args: &Arguments, ctx: &VariableContext) -> Result<Profile> {
        match kind {
            ProfileKind::Circle => {
                let radius = args::circle_radius(args)?;
                let segments = self.primitives.segments(radius, &args.fragments(ctx));
                Ok(Profile::circle(radius, segments))
            }
            ProfileKind::Square => args::square_profile(args),
            ProfileKind::Polygon => args::polygon_profile(args),
        }
    }

    fn apply_transform(
        &self,
        step: &TransformStep,
        mesh: &GenericMeshData,
    ) -> Result<GenericMeshData, TransformationError> {
        match step {
            TransformStep::Translate(params) => self.transforms.translate(mesh, params),
            TransformStep::Rotate(params) => self.transforms.rotate(mesh, params),
            TransformStep::Scale(params) => self.transforms.scale(mesh, params),
            TransformStep::Mirror(params) => self.transforms.mirror(mesh, params),
            TransformStep::Multmatrix(params) => self.transforms.multmatrix(mesh, params),
            TransformStep::Color(params) => self.transforms.color(mesh, params),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn iterable_of(kind: ControlFlowType, expr: &Expr, ctx: &VariableContext) -> Result<Iterable> {
    let value = expr.evaluate(ctx)?;
    Iterable::from_value(&value).ok_or_else(|| {
        ControlFlowError::new(
            ErrorCode::InvalidParameters,
            kind,
            format!("cannot iterate over {}", value.type_name()),
        )
        .into()
    })
}

fn child_index(expr: &Expr, ctx: &VariableContext) -> Result<f64> {
    let value = expr.evaluate(ctx)?;
    value.as_f64().ok_or_else(|| {
        ModuleError::new(
            ErrorCode::InvalidChildren,
            ModuleOperation::Children,
            format!("child index must be a number, got {}", value.type_name()),
        )
        .into()
    })
}

fn with_local_modules<'a>(frame: Frame<'a>, local: Option<&'a ModuleScope<'a>>) -> Frame<'a> {
    match local {
        Some(modules) => Frame {
            modules: Some(modules),
            ..frame
        },
        None => frame,
    }
}

fn pack(mut meshes: Vec<GenericMeshData>, collection_type: CollectionType) -> Option<MeshOutput> {
    match meshes.len() {
        0 => None,
        1 => meshes.pop().map(MeshOutput::Single),
        _ => Some(MeshOutput::Collection(GenericMeshCollection::new(
            collection_type,
            meshes,
        ))),
    }
}

fn apply_modifier(output: MeshOutput, modifier: Modifier) -> MeshOutput {
    let mark = |mut mesh: GenericMeshData| {
        mesh.material = GenericMaterialConfig::for_modifier(modifier);
        mesh.metadata.record_modifier(modifier);
        mesh
    };
    match output {
        MeshOutput::Single(mesh) => MeshOutput::Single(mark(mesh)),
        MeshOutput::Collection(collection) => {
            let collection_type = collection.collection_type();
            let meshes = collection.into_meshes().into_iter().map(mark).collect();
            MeshOutput::Collection(GenericMeshCollection::new(collection_type, meshes))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Argument, BinaryOp, Parameter};
    use approx::assert_relative_eq;

    fn cube(size: f64) -> Node {
        Node::primitive(PrimitiveKind::Cube, vec![Argument::positional(size)])
    }

    fn translate(x: f64, y: f64, z: f64, children: Vec<Node>) -> Node {
        Node::transform(
            TransformKind::Translate,
            vec![Argument::positional(Expr::vec3(x, y, z))],
            children,
        )
    }

    #[test]
    fn test_difference_with_transforms() {
        // difference() { cube(20); translate([10,0,0]) sphere(5); }
        let evaluator = Evaluator::new();
        let sphere = Node::primitive(
            PrimitiveKind::Sphere,
            vec![Argument::positional(5.0), Argument::named("$fn", 16.0)],
        );
        let difference = Node::csg(
            CsgKind::Difference,
            vec![cube(20.0), translate(10.0, 0.0, 0.0, vec![sphere])],
        );

        let output = evaluator.evaluate(&difference).unwrap();
        let mesh = output.as_single().unwrap();
        assert!(mesh.triangle_count() > 0);
        assert_eq!(mesh.metadata.csg_operations(), ["difference"]);
        assert!(mesh.geometry.metrics().volume < 8000.0);
    }

    #[test]
    fn test_assignments_are_hoisted() {
        let evaluator = Evaluator::new();
        let block = Node::new(NodeKind::Group(vec![
            Node::primitive(PrimitiveKind::Cube, vec![Argument::positional(Expr::var("s"))]),
            Node::assign("s", Expr::binary(BinaryOp::Multiply, 2.0, 3.0)),
        ]));

        let output = evaluator.evaluate(&block).unwrap();
        assert_relative_eq!(output.as_single().unwrap().bounding_box().max.x, 6.0);
    }

    #[test]
    fn test_transform_applies_to_each_child() {
        let evaluator = Evaluator::new();
        let node = translate(0.0, 0.0, 5.0, vec![cube(1.0), translate(3.0, 0.0, 0.0, vec![cube(1.0)])]);

        let output = evaluator.evaluate(&node).unwrap();
        let collection = output.as_collection().unwrap();
        assert_eq!(collection.collection_type(), CollectionType::TransformationGroup);
        for mesh in collection.meshes() {
            assert_relative_eq!(mesh.bounding_box().min.z, 5.0);
        }
    }

    #[test]
    fn test_debug_modifier_sets_preset() {
        let evaluator = Evaluator::new();
        let output = evaluator
            .evaluate(&cube(1.0).with_modifier(Modifier::Debug))
            .unwrap();
        let mesh = output.as_single().unwrap();
        assert!(mesh.material.is_debug_material);
        assert_eq!(mesh.metadata.modifiers(), [Modifier::Debug]);
    }

    #[test]
    fn test_disabled_subtree_is_dropped() {
        let evaluator = Evaluator::new();
        let union = Node::csg(
            CsgKind::Union,
            vec![cube(1.0), cube(50.0).with_modifier(Modifier::Disable)],
        );
        let output = evaluator.evaluate(&union).unwrap();
        assert_relative_eq!(output.as_single().unwrap().bounding_box().max.x, 1.0);
    }

    #[test]
    fn test_module_with_children() {
        // module lift(h = 2) { translate([0, 0, h]) children(); }  lift() cube(1);
        let evaluator = Evaluator::new();
        let program = Node::new(NodeKind::Group(vec![
            Node::new(NodeKind::ModuleDefinition {
                name: "lift".to_string(),
                parameters: vec![Parameter::with_default("h", 2.0)],
                body: vec![Node::transform(
                    TransformKind::Translate,
                    vec![Argument::positional(Expr::vector([
                        Expr::Number(0.0),
                        Expr::Number(0.0),
                        Expr::var("h"),
                    ]))],
                    vec![Node::new(NodeKind::Children { index: None })],
                )],
            }),
            Node::module_call("lift", vec![], vec![cube(1.0)]),
        ]));

        let output = evaluator.evaluate(&program).unwrap();
        assert_relative_eq!(output.as_single().unwrap().bounding_box().min.z, 2.0);
        assert!(evaluator.modules().has("lift"));
    }

    #[test]
    fn test_unknown_module_error_is_downcastable() {
        let evaluator = Evaluator::new();
        let err = evaluator
            .evaluate(&Node::module_call("nowhere", vec![], vec![]))
            .unwrap_err();
        let module_error = err.downcast_ref::<ModuleError>().unwrap();
        assert_eq!(module_error.code, ErrorCode::ModuleNotFound);
    }

    #[test]
    fn test_linear_extrude_circle() {
        let evaluator = Evaluator::new();
        let node = Node::extrude(
            ExtrudeKind::Linear,
            vec![Argument::named("height", 4.0)],
            vec![Node::profile(
                ProfileKind::Circle,
                vec![Argument::positional(2.0), Argument::named("$fn", 32.0)],
            )],
        );
        let output = evaluator.evaluate(&node).unwrap();
        let mesh = output.as_single().unwrap();
        assert_relative_eq!(mesh.bounding_box().max.z, 4.0);
        assert!(mesh.geometry.is_watertight());
    }
}
