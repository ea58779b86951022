// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Construction of [`GenericMeshData`] values

use super::{GenericGeometry, GenericMaterialConfig, GenericMeshData, GenericMeshMetadata, Modifier};
use nalgebra::Matrix4;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

/// Fresh process-unique id of the form `<kind>_<n>`
pub fn next_mesh_id(kind: &str) -> String {
    let n = NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed);
    format!("{kind}_{n}")
}

/// Fluent builder for one mesh value
#[derive(Debug, Clone)]
pub struct MeshDataBuilder {
    geometry: Arc<GenericGeometry>,
    material: GenericMaterialConfig,
    metadata: GenericMeshMetadata,
}

impl MeshDataBuilder {
    /// Brand new mesh with default material
    pub fn new(kind: &str, geometry: GenericGeometry) -> Self {
        Self {
            geometry: Arc::new(geometry),
            material: GenericMaterialConfig::default(),
            metadata: GenericMeshMetadata::new(next_mesh_id(kind), kind),
        }
    }

    /// Mesh derived from `source`: material, lineage and parameters carry
    /// over and `source` is recorded as its input
    pub fn derived_from(kind: &str, geometry: Arc<GenericGeometry>, source: &GenericMeshData) -> Self {
        let mut metadata = source.metadata.clone();
        metadata.mesh_id = next_mesh_id(kind);
        metadata.created_at = chrono::Utc::now();
        metadata.surface_area = None;
        metadata.volume = None;
        metadata.parent_id = None;
        metadata.child_ids = vec![source.id.clone()];

        Self {
            geometry,
            material: source.material.clone(),
            metadata,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.metadata.name = name.into();
        self
    }

    pub fn node_type(mut self, node_type: impl Into<String>) -> Self {
        self.metadata.node_type = node_type.into();
        self
    }

    pub fn material(mut self, material: GenericMaterialConfig) -> Self {
        self.material = material;
        self
    }

    pub fn parameters(mut self, operation: &str, value: serde_json::Value) -> Self {
        self.metadata.set_parameters(operation, value);
        self
    }

    /// Accumulate into the generation time
    pub fn generation_time(mut self, ms: f64) -> Self {
        self.metadata.generation_time_ms += ms;
        self
    }

    pub fn child_ids(mut self, ids: Vec<String>) -> Self {
        self.metadata.child_ids = ids;
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.metadata.depth = depth;
        self
    }

    pub fn transformation(mut self, name: &str) -> Self {
        self.metadata.record_transformation(name);
        self
    }

    pub fn csg_operation(mut self, name: &str) -> Self {
        self.metadata.record_csg_operation(name);
        self
    }

    pub fn modifier(mut self, modifier: Modifier) -> Self {
        self.metadata.record_modifier(modifier);
        self
    }

    pub fn build(self) -> GenericMeshData {
        let mut metadata = self.metadata;
        metadata.vertex_count = self.geometry.vertex_count();
        metadata.triangle_count = self.geometry.triangle_count();
        metadata.bounding_box = *self.geometry.bounding_box();

        GenericMeshData {
            id: metadata.mesh_id.clone(),
            geometry: self.geometry,
            material: self.material,
            transform: Matrix4::identity(),
            metadata,
        }
    }
}
