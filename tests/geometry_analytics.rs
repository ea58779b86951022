// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics verification tests

use anyhow::Result;
use nalgebra::Vector3;
use scadmesh::geometry::{analytics::analyze, Primitive};
use scadmesh::mesh::GenericGeometry;
use std::f64::consts::PI;

fn geometry(primitive: Primitive) -> Result<GenericGeometry> {
    Ok(GenericGeometry::from_mesh(primitive.to_mesh())?)
}

#[test]
fn test_cube_volume_and_surface_area() -> Result<()> {
    let cube = geometry(Primitive::cube(Vector3::new(10.0, 10.0, 10.0), true))?;
    let stats = cube.metrics();

    assert!((stats.volume - 1000.0).abs() < 1e-3, "volume {}", stats.volume);
    assert!((stats.surface_area - 600.0).abs() < 1e-3, "area {}", stats.surface_area);
    assert_eq!(cube.triangle_count(), 12);
    assert!(cube.is_watertight());
    Ok(())
}

#[test]
fn test_sphere_volume_and_surface_area() -> Result<()> {
    let radius = 5.0;
    let sphere = geometry(Primitive::sphere(radius, 64))?;
    let stats = analyze(sphere.positions(), sphere.indices());

    let expected_volume = 4.0 / 3.0 * PI * radius.powi(3);
    let expected_area = 4.0 * PI * radius.powi(2);

    assert!((stats.volume - expected_volume).abs() / expected_volume < 0.02);
    assert!((stats.surface_area - expected_area).abs() / expected_area < 0.02);
    Ok(())
}

#[test]
fn test_cylinder_volume_matches_prism() -> Result<()> {
    let (height, radius, segments) = (10.0, 3.0, 32);
    let cylinder = geometry(Primitive::cylinder(height, radius, radius, segments, false))?;

    // Inscribed polygon area times height
    let n = segments as f64;
    let expected = n / 2.0 * radius * radius * (2.0 * PI / n).sin() * height;
    let stats = cylinder.metrics();
    assert!((stats.volume - expected).abs() < 1e-2, "volume {}", stats.volume);
    Ok(())
}

#[test]
fn test_bounding_box_accuracy() -> Result<()> {
    let cube = geometry(Primitive::cube(Vector3::new(4.0, 6.0, 8.0), true))?;
    let bbox = cube.bounding_box();

    assert_eq!(bbox.size(), Vector3::new(4.0f32, 6.0, 8.0));
    assert_eq!(bbox.center(), nalgebra::Point3::origin());
    Ok(())
}

#[test]
fn test_cone_collapses_to_apex() -> Result<()> {
    let cone = geometry(Primitive::cylinder(6.0, 2.0, 0.0, 16, false))?;
    let stats = cone.metrics();

    let n = 16.0;
    let base = n / 2.0 * 4.0 * (2.0 * PI / n).sin();
    assert!((stats.volume - base * 6.0 / 3.0).abs() < 1e-2);
    assert!(cone.is_watertight());
    Ok(())
}
