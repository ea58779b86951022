// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh validation utilities
//!
//! Connectivity is checked on quantized positions rather than indices, so
//! flat-shaded meshes that duplicate vertices per face still count as closed.

use super::Mesh;
use ahash::AHashMap;

/// Grid used to weld coincident positions
const WELD_SCALE: f64 = 1e6;

type PointKey = (i64, i64, i64);

fn point_key(x: f64, y: f64, z: f64) -> PointKey {
    (
        (x * WELD_SCALE).round() as i64,
        (y * WELD_SCALE).round() as i64,
        (z * WELD_SCALE).round() as i64,
    )
}

/// Edge representation for connectivity checking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Edge {
    v0: PointKey,
    v1: PointKey,
}

impl Edge {
    fn new(v0: PointKey, v1: PointKey) -> Self {
        // Always store edges with smaller key first for consistent hashing
        if v0 < v1 {
            Self { v0, v1 }
        } else {
            Self { v0: v1, v1: v0 }
        }
    }
}

/// Summary of edge sharing in a triangle soup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeReport {
    pub edge_count: usize,
    /// Edges used by a single triangle
    pub boundary_edges: usize,
    /// Edges used by more than two triangles
    pub non_manifold_edges: usize,
}

impl EdgeReport {
    pub fn is_watertight(&self) -> bool {
        self.edge_count > 0 && self.boundary_edges == 0 && self.non_manifold_edges == 0
    }
}

/// Count edge usage over flat position/index buffers
pub fn edge_report(positions: &[f32], indices: &[u32]) -> EdgeReport {
    let key = |i: u32| {
        let base = i as usize * 3;
        point_key(
            positions[base] as f64,
            positions[base + 1] as f64,
            positions[base + 2] as f64,
        )
    };

    let mut edge_counts: AHashMap<Edge, u32> = AHashMap::new();
    for tri in indices.chunks_exact(3) {
        let keys = [key(tri[0]), key(tri[1]), key(tri[2])];
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[0] == keys[2] {
            continue;
        }
        for i in 0..3 {
            *edge_counts.entry(Edge::new(keys[i], keys[(i + 1) % 3])).or_insert(0) += 1;
        }
    }

    summarize(&edge_counts)
}

fn summarize(edge_counts: &AHashMap<Edge, u32>) -> EdgeReport {
    EdgeReport {
        edge_count: edge_counts.len(),
        boundary_edges: edge_counts.values().filter(|&&c| c == 1).count(),
        non_manifold_edges: edge_counts.values().filter(|&&c| c > 2).count(),
    }
}

/// Check if a working mesh is closed (every edge shared by exactly 2 triangles)
pub fn is_watertight(mesh: &Mesh) -> bool {
    let mut edge_counts: AHashMap<Edge, u32> = AHashMap::new();

    for triangle in &mesh.triangles {
        let keys = triangle.indices.map(|i| {
            let p = mesh.vertices[i].position;
            point_key(p.x, p.y, p.z)
        });
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[0] == keys[2] {
            continue;
        }
        for i in 0..3 {
            *edge_counts.entry(Edge::new(keys[i], keys[(i + 1) % 3])).or_insert(0) += 1;
        }
    }

    summarize(&edge_counts).is_watertight()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;

    #[test]
    fn test_flat_shaded_cube_is_watertight() {
        let mesh = Primitive::cube(Vector3::new(10.0, 10.0, 10.0), false).to_mesh();
        // 36 vertices, one triple per face, still closed by position
        assert_eq!(mesh.vertex_count(), 36);
        assert!(is_watertight(&mesh));
    }

    #[test]
    fn test_open_surface_reports_boundary() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let report = edge_report(&positions, &[0, 1, 2]);
        assert_eq!(report.edge_count, 3);
        assert_eq!(report.boundary_edges, 3);
        assert!(!report.is_watertight());
    }

    #[test]
    fn test_empty_is_not_watertight() {
        assert!(!edge_report(&[], &[]).is_watertight());
    }
}
