// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipeline API for rendering an AST session

use crate::ast::{Evaluator, Node, NodeKind};
use crate::config::PipelineConfig;
use crate::mesh::{CollectionType, GenericMeshCollection, MeshOutput};
use anyhow::{bail, Result};
use tracing::info;

/// One rendering session: an AST plus the evaluator owning its module
/// registry and material cache
pub struct Pipeline {
    evaluator: Evaluator,
    root: Option<Node>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            evaluator: Evaluator::with_config(config),
            root: None,
        }
    }

    /// Initialize a pipeline with an AST
    pub fn with_ast(ast: Node) -> Self {
        Self::with_config_and_ast(PipelineConfig::default(), ast)
    }

    pub fn with_config_and_ast(config: PipelineConfig, ast: Node) -> Self {
        let mut pipeline = Self::with_config(config);
        pipeline.set_ast(ast);
        pipeline
    }

    /// Full render of the current AST.
    ///
    /// Module definitions are re-registered from the tree on every render,
    /// so definitions removed from the AST do not linger.
    pub fn render(&self) -> Result<MeshOutput> {
        let Some(root) = &self.root else {
            return Ok(MeshOutput::Collection(GenericMeshCollection::empty(
                CollectionType::ControlFlowResult,
            )));
        };
        self.evaluator.modules().clear();
        self.evaluator.evaluate(root)
    }

    /// Replace the node with id `node_id` and render again
    pub fn update_subtree(&mut self, node_id: &str, updated: Node) -> Result<MeshOutput> {
        match &mut self.root {
            Some(root) => {
                if !replace_node(root, node_id, &updated) {
                    bail!("no node with id `{node_id}` in the current AST");
                }
            }
            None => self.root = Some(updated),
        }
        info!(node_id, "subtree updated");
        self.render()
    }

    /// Set the root AST
    pub fn set_ast(&mut self, ast: Node) {
        self.root = Some(ast);
    }

    /// Get a reference to the root AST
    pub fn get_ast(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Drop registered modules and cached materials
    pub fn reset(&self) {
        self.evaluator.modules().clear();
        self.evaluator.materials().clear_cache();
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn replace_node(node: &mut Node, target_id: &str, updated: &Node) -> bool {
    if node.id.as_deref() == Some(target_id) {
        *node = updated.clone();
        return true;
    }

    let children: &mut [Node] = match &mut node.kind {
        NodeKind::Transform { children, .. }
        | NodeKind::Csg { children, .. }
        | NodeKind::Extrude { children, .. }
        | NodeKind::ModuleInstantiation { children, .. }
        | NodeKind::Group(children) => children,
        NodeKind::For { body, .. }
        | NodeKind::IntersectionFor { body, .. }
        | NodeKind::Let { body, .. }
        | NodeKind::ModuleDefinition { body, .. } => body,
        NodeKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            return then_branch
                .iter_mut()
                .chain(else_branch.iter_mut().flatten())
                .any(|child| replace_node(child, target_id, updated));
        }
        NodeKind::Primitive { .. }
        | NodeKind::Profile { .. }
        | NodeKind::Assignment { .. }
        | NodeKind::Children { .. } => return false,
    };

    children
        .iter_mut()
        .any(|child| replace_node(child, target_id, updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Argument, CsgKind, PrimitiveKind};

    fn cube(id: &str, size: f64) -> Node {
        Node::primitive(PrimitiveKind::Cube, vec![Argument::positional(size)]).with_id(id)
    }

    #[test]
    fn test_pipeline_basic_render() {
        let pipeline = Pipeline::with_ast(cube("cube1", 10.0));
        let output = pipeline.render().unwrap();
        assert_eq!(output.mesh_count(), 1);
        assert_eq!(output.total_triangles(), 12);
    }

    #[test]
    fn test_empty_pipeline_renders_empty_collection() {
        let output = Pipeline::new().render().unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_pipeline_update_subtree() {
        let root = Node::csg(CsgKind::Union, vec![cube("child1", 10.0)]).with_id("root");
        let mut pipeline = Pipeline::with_ast(root);
        let first = pipeline.render().unwrap();

        let sphere = Node::primitive(
            PrimitiveKind::Sphere,
            vec![Argument::positional(15.0), Argument::named("$fn", 32.0)],
        )
        .with_id("child1");
        let second = pipeline.update_subtree("child1", sphere).unwrap();

        assert_ne!(first.total_triangles(), second.total_triangles());
        assert_eq!(
            pipeline.get_ast().unwrap().kind.children()[0].kind.name(),
            "sphere"
        );
    }

    #[test]
    fn test_config_and_ast_together() {
        let sphere = |fn_: f64| {
            Node::primitive(
                PrimitiveKind::Sphere,
                vec![Argument::positional(5.0), Argument::named("$fn", fn_)],
            )
        };
        let mut config = PipelineConfig::default();
        config.fragments.max_segments = 6;

        let clamped = Pipeline::with_config_and_ast(config, sphere(32.0));
        assert_eq!(clamped.evaluator().config().fragments.max_segments, 6);

        let expected = Pipeline::with_ast(sphere(6.0)).render().unwrap();
        assert_eq!(
            clamped.render().unwrap().total_triangles(),
            expected.total_triangles()
        );
    }

    #[test]
    fn test_update_unknown_id_fails() {
        let mut pipeline = Pipeline::with_ast(cube("a", 1.0));
        assert!(pipeline.update_subtree("missing", cube("b", 2.0)).is_err());
    }
}
