// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Sweep and lathe builders that lift a 2D profile into a solid

use super::{Mesh, Profile, Vertex};
use crate::utils::math::{deg_to_rad, lerp};
use anyhow::{anyhow, Result};
use nalgebra::{Point2, Rotation2};

/// Linear sweep settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSettings {
    pub height: f64,
    pub center: bool,
    /// Total rotation in degrees from bottom to top, clockwise like OpenSCAD
    pub twist: f64,
    /// Top cross-section scale relative to the bottom
    pub scale: [f64; 2],
    pub slices: u32,
}

/// Sweep `profile` along +z through `slices` cross-sections.
///
/// Each cross-section at parameter `t` is rotated by `-twist·t` and scaled
/// by `lerp(1, scale, t)`. A top scale of zero collapses to an apex.
pub fn linear_sweep(profile: &Profile, settings: &SweepSettings) -> Result<Mesh> {
    let profile = profile.to_ccw();
    let caps = profile
        .triangulate()
        .ok_or_else(|| anyhow!("profile could not be triangulated"))?;

    let n = profile.len();
    let slices = settings.slices.max(1) as usize;
    let z_offset = if settings.center {
        -settings.height / 2.0
    } else {
        0.0
    };

    let mut mesh = Mesh::with_capacity(n * (slices + 1), 2 * n * slices + 2 * caps.len());

    for slice in 0..=slices {
        let t = slice as f64 / slices as f64;
        let rotation = Rotation2::new(deg_to_rad(-settings.twist * t));
        let sx = lerp(1.0, settings.scale[0], t);
        let sy = lerp(1.0, settings.scale[1], t);
        let z = z_offset + settings.height * t;

        for point in &profile.points {
            let scaled = Point2::new(point.x * sx, point.y * sy);
            let p = rotation * scaled;
            mesh.add_vertex(Vertex::at(p.x, p.y, z));
        }
    }

    let index = |slice: usize, i: usize| slice * n + (i % n);

    for tri in &caps {
        mesh.add_face(index(0, tri[0]), index(0, tri[2]), index(0, tri[1]));
    }

    let top_collapsed = settings.scale[0] == 0.0 && settings.scale[1] == 0.0;
    if !top_collapsed {
        for tri in &caps {
            mesh.add_face(index(slices, tri[0]), index(slices, tri[1]), index(slices, tri[2]));
        }
    }

    for slice in 0..slices {
        for i in 0..n {
            let a = index(slice, i);
            let b = index(slice, i + 1);
            let c = index(slice + 1, i);
            let d = index(slice + 1, i + 1);
            mesh.add_face(a, b, d);
            mesh.add_face(a, d, c);
        }
    }

    mesh.recompute_normals();
    Ok(mesh)
}

/// Revolve `profile` (x = radius, y = height) around the z axis.
///
/// A full revolution is closed by wrapping the last ring onto the first;
/// a partial one gets a profile cap at each end.
pub fn lathe(profile: &Profile, angle: f64, segments: u32) -> Result<Mesh> {
    let profile = profile.to_ccw();
    let n = profile.len();
    let full = angle >= 360.0;
    let segments = segments.max(1) as usize;
    let rings = if full { segments } else { segments + 1 };

    let mut mesh = Mesh::with_capacity(n * rings, 2 * n * segments);

    for ring in 0..rings {
        let theta = deg_to_rad(angle * ring as f64 / segments as f64);
        let (sin, cos) = theta.sin_cos();
        for point in &profile.points {
            mesh.add_vertex(Vertex::at(point.x * cos, point.x * sin, point.y));
        }
    }

    let index = |ring: usize, i: usize| (ring % rings) * n + (i % n);

    for ring in 0..segments {
        for i in 0..n {
            let a = index(ring, i);
            let b = index(ring, i + 1);
            let c = index(ring + 1, i);
            let d = index(ring + 1, i + 1);
            mesh.add_face(a, c, b);
            mesh.add_face(b, c, d);
        }
    }

    if !full {
        let caps = profile
            .triangulate()
            .ok_or_else(|| anyhow!("profile could not be triangulated"))?;
        for tri in &caps {
            mesh.add_face(index(0, tri[0]), index(0, tri[1]), index(0, tri[2]));
            mesh.add_face(
                index(segments, tri[0]),
                index(segments, tri[2]),
                index(segments, tri[1]),
            );
        }
    }

    mesh.recompute_normals();
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh_utils::is_watertight;

    fn settings(height: f64) -> SweepSettings {
        SweepSettings {
            height,
            center: false,
            twist: 0.0,
            scale: [1.0, 1.0],
            slices: 1,
        }
    }

    #[test]
    fn test_straight_sweep_is_closed_prism() {
        let mesh = linear_sweep(&Profile::square(2.0, 3.0, false), &settings(4.0)).unwrap();
        assert!(is_watertight(&mesh));
        let bbox = mesh.bounding_box();
        assert!((bbox.max.z - 4.0).abs() < 1e-6);
        assert!((bbox.max.x - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_twisted_sweep_rotates_top() {
        let mut s = settings(1.0);
        s.twist = 90.0;
        s.slices = 9;
        let mesh = linear_sweep(&Profile::square(2.0, 2.0, true), &s).unwrap();
        assert!(is_watertight(&mesh));

        // First profile point (-1,-1) rotated by -90° ends up at (-1, 1)
        let top = mesh.vertices[9 * 4].position;
        assert!((top.x + 1.0).abs() < 1e-9);
        assert!((top.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_lathe_is_closed() {
        let ring = Profile::square(1.0, 1.0, false);
        let moved = Profile::new(ring.points.iter().map(|p| Point2::new(p.x + 2.0, p.y)).collect());
        let mesh = lathe(&moved, 360.0, 16).unwrap();
        assert!(is_watertight(&mesh));
        assert_eq!(mesh.vertex_count(), 16 * 4);
    }

    #[test]
    fn test_partial_lathe_is_capped() {
        let profile = Profile::from_pairs(&[[1.0, 0.0], [2.0, 0.0], [2.0, 1.0], [1.0, 1.0]]);
        let mesh = lathe(&profile, 90.0, 4).unwrap();
        assert!(is_watertight(&mesh));
        assert_eq!(mesh.vertex_count(), 5 * 4);
    }
}
