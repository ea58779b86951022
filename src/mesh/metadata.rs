// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Provenance and diagnostics carried by every mesh

use super::Modifier;
use crate::geometry::BoundingBox;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Metadata for one [`GenericMeshData`](super::GenericMeshData).
///
/// The lineage lists (`modifiers`, `transformations`, `csg_operations`)
/// can only grow: they are private and exposed through `record_*`
/// methods and read-only accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericMeshMetadata {
    pub mesh_id: String,
    pub name: String,
    pub node_type: String,

    pub vertex_count: usize,
    pub triangle_count: usize,
    pub bounding_box: BoundingBox,
    /// Filled by [`GenericMeshData::with_metrics`](super::GenericMeshData::with_metrics)
    pub surface_area: Option<f64>,
    pub volume: Option<f64>,

    pub generation_time_ms: f64,
    pub optimization_time_ms: f64,
    pub created_at: DateTime<Utc>,

    modifiers: Vec<Modifier>,
    transformations: Vec<String>,
    csg_operations: Vec<String>,

    pub parent_id: Option<String>,
    pub child_ids: Vec<String>,
    pub depth: usize,

    /// Original call parameters keyed by operation, for editor round trips
    pub openscad_parameters: BTreeMap<String, serde_json::Value>,
}

impl GenericMeshMetadata {
    pub fn new(mesh_id: impl Into<String>, node_type: impl Into<String>) -> Self {
        let mesh_id = mesh_id.into();
        let node_type = node_type.into();
        Self {
            name: node_type.clone(),
            mesh_id,
            node_type,
            vertex_count: 0,
            triangle_count: 0,
            bounding_box: BoundingBox::empty(),
            surface_area: None,
            volume: None,
            generation_time_ms: 0.0,
            optimization_time_ms: 0.0,
            created_at: Utc::now(),
            modifiers: Vec::new(),
            transformations: Vec::new(),
            csg_operations: Vec::new(),
            parent_id: None,
            child_ids: Vec::new(),
            depth: 0,
            openscad_parameters: BTreeMap::new(),
        }
    }

    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn transformations(&self) -> &[String] {
        &self.transformations
    }

    pub fn csg_operations(&self) -> &[String] {
        &self.csg_operations
    }

    pub fn record_modifier(&mut self, modifier: Modifier) {
        self.modifiers.push(modifier);
    }

    pub fn record_transformation(&mut self, name: impl Into<String>) {
        self.transformations.push(name.into());
    }

    pub fn record_csg_operation(&mut self, name: impl Into<String>) {
        self.csg_operations.push(name.into());
    }

    /// Store `value` under `operation`, replacing an earlier entry for it
    pub fn set_parameters(&mut self, operation: impl Into<String>, value: serde_json::Value) {
        self.openscad_parameters.insert(operation.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lineage_appends_in_order() {
        let mut metadata = GenericMeshMetadata::new("cube_1", "cube");
        metadata.record_transformation("translate");
        metadata.record_transformation("rotate");
        metadata.record_csg_operation("union");
        metadata.record_modifier(Modifier::Debug);

        assert_eq!(metadata.transformations(), ["translate", "rotate"]);
        assert_eq!(metadata.csg_operations(), ["union"]);
        assert_eq!(metadata.modifiers(), [Modifier::Debug]);
        assert_eq!(metadata.name, "cube");
    }

    #[test]
    fn test_serializes_camel_case() {
        let mut metadata = GenericMeshMetadata::new("sphere_2", "sphere");
        metadata.set_parameters("sphere", serde_json::json!({ "r": 2.0 }));

        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["meshId"], "sphere_2");
        assert_eq!(json["openscadParameters"]["sphere"]["r"], 2.0);
        assert!(json["csgOperations"].as_array().unwrap().is_empty());
    }
}
