// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG operations over mesh data
//!
//! Inputs are guarded before the backend runs: empty or structurally
//! broken geometry is `INVALID_MESHES`, open meshes only warn unless the
//! configuration demands watertight inputs. Backend failures surface as
//! `OPERATION_FAILED` with the backend message preserved.

use super::elapsed_ms;
use crate::config::PipelineConfig;
use crate::error::{ErrorCode, OperationError};
use crate::geometry::{BooleanOp, BspCsgBackend, CsgBackend, Mesh};
use crate::mesh::{GenericGeometry, GenericMeshData, MeshDataBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CsgOperationType {
    Union,
    Difference,
    Intersection,
}

impl CsgOperationType {
    fn boolean_op(self) -> BooleanOp {
        match self {
            CsgOperationType::Union => BooleanOp::Union,
            CsgOperationType::Difference => BooleanOp::Difference,
            CsgOperationType::Intersection => BooleanOp::Intersection,
        }
    }
}

impl fmt::Display for CsgOperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.boolean_op().fmt(f)
    }
}

pub type CsgOperationError = OperationError<CsgOperationType>;

#[derive(Clone)]
pub struct CsgOperations {
    backend: Arc<dyn CsgBackend>,
    require_watertight: bool,
}

impl fmt::Debug for CsgOperations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsgOperations")
            .field("backend", &self.backend.name())
            .field("require_watertight", &self.require_watertight)
            .finish()
    }
}

impl Default for CsgOperations {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl CsgOperations {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_backend(
            Arc::new(BspCsgBackend::new(config.csg_epsilon)),
            config.require_watertight_csg_inputs,
        )
    }

    pub fn with_backend(backend: Arc<dyn CsgBackend>, require_watertight: bool) -> Self {
        Self {
            backend,
            require_watertight,
        }
    }

    /// Left-to-right union of two or more meshes
    #[instrument(level = "debug", skip_all, fields(inputs = meshes.len()))]
    pub fn union(&self, meshes: &[GenericMeshData]) -> Result<GenericMeshData, CsgOperationError> {
        let kind = CsgOperationType::Union;
        if meshes.len() < 2 {
            return Err(CsgOperationError::new(
                ErrorCode::InvalidMeshes,
                kind,
                format!("union needs at least 2 meshes, got {}", meshes.len()),
            ));
        }
        for mesh in meshes {
            self.guard(kind, mesh)?;
        }

        let start = Instant::now();
        let mut accumulated = meshes[0].geometry.to_mesh();
        for mesh in &meshes[1..] {
            accumulated = self.run(kind, &accumulated, &mesh.geometry.to_mesh())?;
        }

        self.finish(kind, accumulated, meshes, start)
    }

    /// `a` with the volume of `b` removed; keeps `a`'s material
    #[instrument(level = "debug", skip_all, fields(a = %a.id, b = %b.id))]
    pub fn difference(
        &self,
        a: &GenericMeshData,
        b: &GenericMeshData,
    ) -> Result<GenericMeshData, CsgOperationError> {
        let kind = CsgOperationType::Difference;
        self.guard(kind, a)?;
        self.guard(kind, b)?;

        let start = Instant::now();
        let mesh = self.run(kind, &a.geometry.to_mesh(), &b.geometry.to_mesh())?;
        self.finish(kind, mesh, &[a.clone(), b.clone()], start)
    }

    /// Volume shared by `a` and `b`; an empty result is `NO_INTERSECTION`
    #[instrument(level = "debug", skip_all, fields(a = %a.id, b = %b.id))]
    pub fn intersection(
        &self,
        a: &GenericMeshData,
        b: &GenericMeshData,
    ) -> Result<GenericMeshData, CsgOperationError> {
        let kind = CsgOperationType::Intersection;
        self.guard(kind, a)?;
        self.guard(kind, b)?;

        let no_intersection = || {
            CsgOperationError::new(
                ErrorCode::NoIntersection,
                kind,
                format!("{} and {} do not overlap", a.id, b.id),
            )
        };

        if !a.bounding_box().intersects(b.bounding_box(), 1e-6) {
            return Err(no_intersection());
        }

        let start = Instant::now();
        let mesh = self.run(kind, &a.geometry.to_mesh(), &b.geometry.to_mesh())?;
        if mesh.is_empty() {
            return Err(no_intersection());
        }
        self.finish(kind, mesh, &[a.clone(), b.clone()], start)
    }

    fn guard(&self, kind: CsgOperationType, mesh: &GenericMeshData) -> Result<(), CsgOperationError> {
        if mesh.geometry.is_empty() {
            return Err(CsgOperationError::new(
                ErrorCode::InvalidMeshes,
                kind,
                format!("mesh {} has no triangles", mesh.id),
            ));
        }

        let report = mesh.geometry.edge_report();
        if !report.is_watertight() {
            let details = serde_json::json!({
                "meshId": mesh.id,
                "boundaryEdges": report.boundary_edges,
                "nonManifoldEdges": report.non_manifold_edges,
            });
            if self.require_watertight {
                return Err(CsgOperationError::new(
                    ErrorCode::InvalidMeshes,
                    kind,
                    format!("mesh {} is not watertight", mesh.id),
                )
                .with_details(details));
            }
            warn!(%kind, mesh = %mesh.id, boundary = report.boundary_edges, "CSG input is not watertight");
        }
        Ok(())
    }

    fn run(&self, kind: CsgOperationType, a: &Mesh, b: &Mesh) -> Result<Mesh, CsgOperationError> {
        let output = self
            .backend
            .apply(a, b, kind.boolean_op())
            .map_err(|err| {
                CsgOperationError::new(ErrorCode::OperationFailed, kind, format!("{err:#}"))
                    .with_details(serde_json::json!({ "backend": self.backend.name() }))
            })?;
        debug!(
            %kind,
            backend = self.backend.name(),
            triangles = output.triangle_count(),
            elapsed_us = output.elapsed.as_micros() as u64,
            "backend call finished"
        );
        Ok(output.mesh)
    }

    fn finish(
        &self,
        kind: CsgOperationType,
        mesh: Mesh,
        inputs: &[GenericMeshData],
        start: Instant,
    ) -> Result<GenericMeshData, CsgOperationError> {
        let geometry = GenericGeometry::from_mesh(mesh).map_err(|err| {
            CsgOperationError::new(ErrorCode::OperationFailed, kind, err.to_string())
        })?;

        let name = kind.to_string();
        let parameters = serde_json::json!({
            "inputMeshCount": inputs.len(),
            "inputVertexCount": inputs.iter().map(GenericMeshData::vertex_count).sum::<usize>(),
            "inputTriangleCount": inputs.iter().map(GenericMeshData::triangle_count).sum::<usize>(),
        });
        let depth = inputs.iter().map(|m| m.metadata.depth).max().unwrap_or(0);

        Ok(MeshDataBuilder::derived_from(&name, Arc::new(geometry), &inputs[0])
            .node_type(name.as_str())
            .csg_operation(&name)
            .child_ids(inputs.iter().map(|m| m.id.clone()).collect())
            .parameters(&name, parameters)
            .depth(depth)
            .generation_time(elapsed_ms(start))
            .build())
    }
}
