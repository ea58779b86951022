// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh values produced by the pipeline

use super::{next_mesh_id, GenericGeometry, GenericMaterialConfig, GenericMeshMetadata};
use crate::geometry::BoundingBox;
use chrono::{DateTime, Utc};
use nalgebra::Matrix4;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Atomic unit of output.
///
/// Geometry is shared through an `Arc` so collections and lineage copies
/// do not duplicate buffers. Transforms are baked into the geometry, so
/// `transform` stays the identity unless a consumer sets its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericMeshData {
    pub id: String,
    pub geometry: Arc<GenericGeometry>,
    pub material: GenericMaterialConfig,
    pub transform: Matrix4<f32>,
    pub metadata: GenericMeshMetadata,
}

impl GenericMeshData {
    pub fn vertex_count(&self) -> usize {
        self.geometry.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.geometry.triangle_count()
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        self.geometry.bounding_box()
    }

    /// Fill in surface area and volume if they have not been computed
    pub fn with_metrics(mut self) -> Self {
        if self.metadata.surface_area.is_none() || self.metadata.volume.is_none() {
            let metrics = self.geometry.metrics();
            self.metadata.surface_area = Some(metrics.surface_area);
            self.metadata.volume = Some(metrics.volume);
        }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionType {
    CsgResult,
    TransformationGroup,
    ExtrusionResult,
    ControlFlowResult,
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CollectionType::CsgResult => "csg_result",
            CollectionType::TransformationGroup => "transformation_group",
            CollectionType::ExtrusionResult => "extrusion_result",
            CollectionType::ControlFlowResult => "control_flow_result",
        })
    }
}

/// Aggregates over a collection's members
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata {
    pub collection_type: CollectionType,
    pub mesh_count: usize,
    pub total_vertices: usize,
    pub total_triangles: usize,
    pub bounding_box: BoundingBox,
    pub generation_time_ms: f64,
    pub created_at: DateTime<Utc>,
}

/// Ordered group of meshes produced by one construct
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericMeshCollection {
    pub id: String,
    meshes: Vec<GenericMeshData>,
    pub metadata: CollectionMetadata,
}

impl GenericMeshCollection {
    /// Group `meshes`, which become children of the new collection
    pub fn new(collection_type: CollectionType, meshes: Vec<GenericMeshData>) -> Self {
        let id = next_mesh_id("collection");
        let mut bounding_box = BoundingBox::empty();
        let mut total_vertices = 0;
        let mut total_triangles = 0;
        let mut generation_time_ms = 0.0;

        let meshes: Vec<GenericMeshData> = meshes
            .into_iter()
            .map(|mut mesh| {
                bounding_box = bounding_box.union(mesh.bounding_box());
                total_vertices += mesh.vertex_count();
                total_triangles += mesh.triangle_count();
                generation_time_ms += mesh.metadata.generation_time_ms;
                mesh.metadata.parent_id = Some(id.clone());
                mesh
            })
            .collect();

        Self {
            metadata: CollectionMetadata {
                collection_type,
                mesh_count: meshes.len(),
                total_vertices,
                total_triangles,
                bounding_box,
                generation_time_ms,
                created_at: Utc::now(),
            },
            id,
            meshes,
        }
    }

    pub fn empty(collection_type: CollectionType) -> Self {
        Self::new(collection_type, Vec::new())
    }

    /// Flatten nested outputs into one collection, keeping their order
    pub fn from_outputs(
        collection_type: CollectionType,
        outputs: impl IntoIterator<Item = MeshOutput>,
    ) -> Self {
        let meshes = outputs.into_iter().flat_map(MeshOutput::into_meshes).collect();
        Self::new(collection_type, meshes)
    }

    pub fn meshes(&self) -> &[GenericMeshData] {
        &self.meshes
    }

    pub fn into_meshes(self) -> Vec<GenericMeshData> {
        self.meshes
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn collection_type(&self) -> CollectionType {
        self.metadata.collection_type
    }
}

/// What evaluating one construct yields
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum MeshOutput {
    Single(GenericMeshData),
    Collection(GenericMeshCollection),
}

impl MeshOutput {
    pub fn into_meshes(self) -> Vec<GenericMeshData> {
        match self {
            MeshOutput::Single(mesh) => vec![mesh],
            MeshOutput::Collection(collection) => collection.into_meshes(),
        }
    }

    pub fn mesh_count(&self) -> usize {
        match self {
            MeshOutput::Single(_) => 1,
            MeshOutput::Collection(collection) => collection.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mesh_count() == 0
    }

    pub fn total_triangles(&self) -> usize {
        match self {
            MeshOutput::Single(mesh) => mesh.triangle_count(),
            MeshOutput::Collection(collection) => collection.metadata.total_triangles,
        }
    }

    pub fn as_single(&self) -> Option<&GenericMeshData> {
        match self {
            MeshOutput::Single(mesh) => Some(mesh),
            MeshOutput::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&GenericMeshCollection> {
        match self {
            MeshOutput::Single(_) => None,
            MeshOutput::Collection(collection) => Some(collection),
        }
    }
}

impl From<GenericMeshData> for MeshOutput {
    fn from(mesh: GenericMeshData) -> Self {
        MeshOutput::Single(mesh)
    }
}

impl From<GenericMeshCollection> for MeshOutput {
    fn from(collection: GenericMeshCollection) -> Self {
        MeshOutput::Collection(collection)
    }
}
