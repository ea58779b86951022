// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! scadmesh
//!
//! Converts an OpenSCAD-style AST into renderer-agnostic mesh data.
//! Provides primitive generation, transformations, extrusions, boolean
//! operations, control flow and user-defined modules.

pub mod ast;
pub mod config;
pub mod error;
pub mod geometry;
pub mod material;
pub mod mesh;
pub mod ops;
pub mod pipeline;
pub mod utils;

pub use ast::{Evaluator, Node, NodeKind};
pub use config::PipelineConfig;
pub use error::{ErrorCode, OperationError};
pub use mesh::{GenericMeshCollection, GenericMeshData, MeshOutput};
pub use pipeline::Pipeline;

use anyhow::Result;

/// Main entry point for rendering an AST with default settings
pub fn render(node: &Node) -> Result<MeshOutput> {
    Evaluator::new().evaluate(node)
}
