// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics over flat vertex buffers

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Surface metrics of a closed triangle mesh
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceMetrics {
    /// Total volume in cubic units
    pub volume: f64,
    /// Total surface area in square units
    pub surface_area: f64,
}

fn corners(positions: &[f32], tri: &[u32]) -> [Vector3<f64>; 3] {
    let corner = |i: u32| {
        let base = i as usize * 3;
        Vector3::new(
            positions[base] as f64,
            positions[base + 1] as f64,
            positions[base + 2] as f64,
        )
    };
    [corner(tri[0]), corner(tri[1]), corner(tri[2])]
}

/// Mesh volume from the signed volumes of origin tetrahedra
pub fn calculate_volume(positions: &[f32], indices: &[u32]) -> f64 {
    let volume: f64 = indices
        .chunks_exact(3)
        .map(|tri| {
            let [v0, v1, v2] = corners(positions, tri);
            v0.dot(&v1.cross(&v2)) / 6.0
        })
        .sum();
    volume.abs()
}

/// Total triangle area
pub fn calculate_surface_area(positions: &[f32], indices: &[u32]) -> f64 {
    indices
        .chunks_exact(3)
        .map(|tri| {
            let [v0, v1, v2] = corners(positions, tri);
            (v1 - v0).cross(&(v2 - v0)).norm() / 2.0
        })
        .sum()
}

pub fn analyze(positions: &[f32], indices: &[u32]) -> SurfaceMetrics {
    SurfaceMetrics {
        volume: calculate_volume(positions, indices),
        surface_area: calculate_surface_area(positions, indices),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Unit tetrahedron with outward winding
    const POSITIONS: [f32; 12] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
    const INDICES: [u32; 12] = [0, 2, 1, 0, 1, 3, 0, 3, 2, 1, 2, 3];

    #[test]
    fn test_tetrahedron_volume() {
        let volume = calculate_volume(&POSITIONS, &INDICES);
        assert!((volume - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_tetrahedron_area() {
        let area = calculate_surface_area(&POSITIONS, &INDICES);
        let expected = 1.5 + 3.0_f64.sqrt() / 2.0;
        assert!((area - expected).abs() < 1e-6);
    }
}
