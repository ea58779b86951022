// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator
//!
//! All primitives use OpenSCAD's Z-up frame. Every shape is tessellated
//! around the origin first; OpenSCAD placement (`center=false`) is a
//! translation applied afterwards.

use super::{Mesh, Triangle, Vertex};
use crate::config::FragmentDefaults;
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Number of segments for a circle of radius `radius`.
///
/// `$fn > 0` wins (at least 3); otherwise the larger of `ceil(360/$fa)`
/// and `ceil(2πr/$fs)` is used. The result is always clamped to the
/// configured `[min_segments, max_segments]` range.
pub fn calculate_fragments(
    radius: f64,
    fn_: Option<f64>,
    fa: Option<f64>,
    fs: Option<f64>,
    defaults: &FragmentDefaults,
) -> u32 {
    let min = defaults.min_segments.max(3);
    let max = defaults.max_segments.max(min);

    if let Some(fn_) = fn_.filter(|f| f.is_finite() && *f > 0.0) {
        return (fn_.floor() as u32).clamp(min, max);
    }

    let fa = fa
        .filter(|a| a.is_finite() && *a > 0.0)
        .unwrap_or(defaults.default_fa);
    let fs = fs
        .filter(|s| s.is_finite() && *s > 0.0)
        .unwrap_or(defaults.default_fs);

    let from_fa = (360.0 / fa).ceil();
    let from_fs = (2.0 * PI * radius.abs() / fs).ceil();
    let segments = from_fa.max(from_fs);

    if !segments.is_finite() {
        return max;
    }
    (segments as u32).clamp(min, max)
}

/// Geometric primitives
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Cube {
        size: Vector3<f64>,
        center: bool,
    },
    Sphere {
        r: f64,
        segments: u32,
    },
    Cylinder {
        h: f64,
        r1: f64,
        r2: f64,
        segments: u32,
        center: bool,
    },
}

impl Primitive {
    pub fn cube(size: Vector3<f64>, center: bool) -> Self {
        Self::Cube { size, center }
    }

    pub fn sphere(r: f64, segments: u32) -> Self {
        Self::Sphere {
            r,
            segments: segments.max(3),
        }
    }

    pub fn cylinder(h: f64, r1: f64, r2: f64, segments: u32, center: bool) -> Self {
        Self::Cylinder {
            h,
            r1,
            r2,
            segments: segments.max(3),
            center,
        }
    }

    pub fn to_mesh(&self) -> Mesh {
        match self {
            Self::Cube { size, center } => {
                let mut mesh = generate_cube_mesh(*size);
                if !*center {
                    mesh.translate(size / 2.0);
                }
                mesh
            }
            Self::Sphere { r, segments } => generate_sphere_mesh(*r, *segments),
            Self::Cylinder {
                h,
                r1,
                r2,
                segments,
                center,
            } => {
                let mut mesh = generate_cylinder_mesh(*h, *r1, *r2, *segments);
                if !*center {
                    mesh.translate(Vector3::new(0.0, 0.0, h / 2.0));
                }
                mesh
            }
        }
    }
}

/// Box centered on the origin with flat per-face normals
fn generate_cube_mesh(size: Vector3<f64>) -> Mesh {
    let mut mesh = Mesh::with_capacity(36, 12);
    let h = size / 2.0;

    let positions = [
        Point3::new(-h.x, -h.y, -h.z),
        Point3::new(h.x, -h.y, -h.z),
        Point3::new(h.x, h.y, -h.z),
        Point3::new(-h.x, h.y, -h.z),
        Point3::new(-h.x, -h.y, h.z),
        Point3::new(h.x, -h.y, h.z),
        Point3::new(h.x, h.y, h.z),
        Point3::new(-h.x, h.y, h.z),
    ];

    let faces = [
        // Top (z+)
        ([4, 5, 6], Vector3::new(0.0, 0.0, 1.0)),
        ([4, 6, 7], Vector3::new(0.0, 0.0, 1.0)),
        // Bottom (z-)
        ([1, 0, 3], Vector3::new(0.0, 0.0, -1.0)),
        ([1, 3, 2], Vector3::new(0.0, 0.0, -1.0)),
        // Right (x+)
        ([5, 1, 2], Vector3::new(1.0, 0.0, 0.0)),
        ([5, 2, 6], Vector3::new(1.0, 0.0, 0.0)),
        // Left (x-)
        ([0, 4, 7], Vector3::new(-1.0, 0.0, 0.0)),
        ([0, 7, 3], Vector3::new(-1.0, 0.0, 0.0)),
        // Back (y+)
        ([7, 6, 2], Vector3::new(0.0, 1.0, 0.0)),
        ([7, 2, 3], Vector3::new(0.0, 1.0, 0.0)),
        // Front (y-)
        ([0, 1, 5], Vector3::new(0.0, -1.0, 0.0)),
        ([0, 5, 4], Vector3::new(0.0, -1.0, 0.0)),
    ];

    for (indices, normal) in faces {
        let v0 = mesh.add_vertex(Vertex::new(positions[indices[0]], normal));
        let v1 = mesh.add_vertex(Vertex::new(positions[indices[1]], normal));
        let v2 = mesh.add_vertex(Vertex::new(positions[indices[2]], normal));
        mesh.add_triangle(Triangle::new([v0, v1, v2]));
    }

    mesh
}

/// OpenSCAD-style sphere: `(segments + 1) / 2` rings offset half a step
/// from the poles, closed by a polygon cap at each end.
fn generate_sphere_mesh(radius: f64, segments: u32) -> Mesh {
    let segments = segments as usize;
    let rings = (segments + 1) / 2;
    let mut mesh = Mesh::with_capacity(rings * segments, rings * segments * 2);

    for ring in 0..rings {
        let phi = PI * (ring as f64 + 0.5) / rings as f64;
        let ring_radius = radius * phi.sin();
        let z = radius * phi.cos();

        for j in 0..segments {
            let theta = 2.0 * PI * j as f64 / segments as f64;
            let position = Point3::new(ring_radius * theta.cos(), ring_radius * theta.sin(), z);
            mesh.add_vertex(Vertex::new(position, position.coords.normalize()));
        }
    }

    let index = |ring: usize, j: usize| ring * segments + (j % segments);

    // Top cap faces +z: counter-clockwise fan seen from above
    for j in 1..segments - 1 {
        mesh.add_face(index(0, 0), index(0, j), index(0, j + 1));
    }

    for ring in 0..rings - 1 {
        for j in 0..segments {
            let a = index(ring, j);
            let b = index(ring, j + 1);
            let c = index(ring + 1, j);
            let d = index(ring + 1, j + 1);
            mesh.add_face(a, c, b);
            mesh.add_face(b, c, d);
        }
    }

    // Bottom cap faces -z
    let last = rings - 1;
    for j in 1..segments - 1 {
        mesh.add_face(index(last, 0), index(last, j + 1), index(last, j));
    }

    mesh
}

/// Frustum centered on the origin along z. A zero radius collapses that
/// ring into a single apex vertex.
fn generate_cylinder_mesh(height: f64, r1: f64, r2: f64, segments: u32) -> Mesh {
    let segments = segments as usize;
    let z0 = -height / 2.0;
    let z1 = height / 2.0;
    let mut mesh = Mesh::with_capacity(2 * segments + 2, 4 * segments);

    let ring = |mesh: &mut Mesh, radius: f64, z: f64| -> Vec<usize> {
        if radius <= 0.0 {
            let apex = mesh.add_vertex(Vertex::at(0.0, 0.0, z));
            return vec![apex; segments];
        }
        (0..segments)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 / segments as f64;
                mesh.add_vertex(Vertex::at(radius * angle.cos(), radius * angle.sin(), z))
            })
            .collect()
    };

    let bottom = ring(&mut mesh, r1, z0);
    let top = ring(&mut mesh, r2, z1);

    if r1 > 0.0 {
        for i in 1..segments - 1 {
            mesh.add_face(bottom[0], bottom[i + 1], bottom[i]);
        }
    }
    if r2 > 0.0 {
        for i in 1..segments - 1 {
            mesh.add_face(top[0], top[i], top[i + 1]);
        }
    }

    for i in 0..segments {
        let next = (i + 1) % segments;
        mesh.add_face(bottom[i], bottom[next], top[i]);
        mesh.add_face(top[i], bottom[next], top[next]);
    }

    mesh.recompute_normals();
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh_utils::is_watertight;

    #[test]
    fn test_fragments_fn_wins() {
        let defaults = FragmentDefaults::default();
        assert_eq!(calculate_fragments(10.0, Some(16.0), None, None, &defaults), 16);
        assert_eq!(calculate_fragments(10.0, Some(1.5), None, None, &defaults), 3);
        assert_eq!(calculate_fragments(10.0, Some(500.0), None, None, &defaults), 100);
    }

    #[test]
    fn test_fragments_from_fa_fs() {
        let defaults = FragmentDefaults::default();
        // 360/12 = 30 beats 2π·1/2 ≈ 3.14
        assert_eq!(calculate_fragments(1.0, None, None, None, &defaults), 30);
        // 2π·20/2 ≈ 62.8 beats 30
        assert_eq!(calculate_fragments(20.0, None, None, None, &defaults), 63);
        // Huge radius clamps to the upper bound
        assert_eq!(calculate_fragments(1000.0, None, None, None, &defaults), 100);
        // Coarse $fa and $fs fall to the lower bound
        assert_eq!(calculate_fragments(0.1, None, Some(180.0), Some(10.0), &defaults), 3);
    }

    #[test]
    fn test_cube_corner_at_origin() {
        let mesh = Primitive::cube(Vector3::new(2.0, 3.0, 4.0), false).to_mesh();
        let bbox = mesh.bounding_box();
        assert_eq!(bbox.min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bbox.max, Point3::new(2.0, 3.0, 4.0));
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn test_sphere_is_watertight() {
        let mesh = Primitive::sphere(5.0, 16).to_mesh();
        assert!(is_watertight(&mesh));
        assert_eq!(mesh.vertex_count(), 8 * 16);
    }

    #[test]
    fn test_cylinder_is_watertight() {
        let mesh = Primitive::cylinder(10.0, 5.0, 5.0, 32, true).to_mesh();
        assert!(is_watertight(&mesh));
        assert_eq!(mesh.vertex_count(), 64);
    }

    #[test]
    fn test_cone_apex() {
        let mesh = Primitive::cylinder(10.0, 5.0, 0.0, 16, false).to_mesh();
        assert!(is_watertight(&mesh));
        // 16 rim vertices plus one apex
        assert_eq!(mesh.vertex_count(), 17);
        let bbox = mesh.bounding_box();
        assert!((bbox.min.z - 0.0).abs() < 1e-6);
        assert!((bbox.max.z - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_cylinder_side_normals_point_outward() {
        let mesh = Primitive::cylinder(2.0, 1.0, 1.0, 8, true).to_mesh();
        for vertex in &mesh.vertices {
            let radial = Vector3::new(vertex.position.x, vertex.position.y, 0.0);
            assert!(vertex.normal.dot(&radial) > 0.0);
        }
    }
}
