// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Transformation operation properties

use approx::assert_relative_eq;
use scadmesh::error::ErrorCode;
use scadmesh::material::MaterialService;
use scadmesh::mesh::GenericMeshData;
use scadmesh::ops::{
    ColorParams, CubeParams, CubeSize, MirrorParams, MultmatrixParams, PrimitiveGenerator,
    RotateParams, ScaleFactor, ScaleParams, TransformType, TransformationOperations,
    TranslateParams,
};
use std::sync::Arc;

fn ops() -> TransformationOperations {
    TransformationOperations::new(Arc::new(MaterialService::new()))
}

fn cube() -> GenericMeshData {
    PrimitiveGenerator::default()
        .generate_cube(&CubeParams {
            size: Some(CubeSize::Axes([1.0, 2.0, 3.0])),
            center: false,
        })
        .unwrap()
}

fn assert_positions_eq(a: &GenericMeshData, b: &GenericMeshData) {
    let (a, b) = (a.geometry.positions(), b.geometry.positions());
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert_relative_eq!(*x, *y, epsilon = 1e-5);
    }
}

#[test]
fn test_translate_round_trip() {
    let ops = ops();
    let original = cube();
    let moved = ops
        .translate(&original, &TranslateParams { vector: vec![3.5, -2.0, 7.25] })
        .unwrap();
    let back = ops
        .translate(&moved, &TranslateParams { vector: vec![-3.5, 2.0, -7.25] })
        .unwrap();

    assert_positions_eq(&original, &back);
    assert_eq!(back.metadata.transformations(), ["translate", "translate"]);
}

#[test]
fn test_mirror_is_involutive() {
    let ops = ops();
    let original = cube();
    let params = MirrorParams { normal: vec![1.0, 1.0, 0.0] };

    let once = ops.mirror(&original, &params).unwrap();
    assert_ne!(once.geometry.indices(), original.geometry.indices());

    let twice = ops.mirror(&once, &params).unwrap();
    assert_positions_eq(&original, &twice);
    assert_eq!(twice.geometry.indices(), original.geometry.indices());
}

/// Divergence-theorem volume without taking the absolute value, so an
/// inside-out mesh comes out negative
fn signed_volume(mesh: &GenericMeshData) -> f64 {
    let positions = mesh.geometry.positions();
    let corner = |i: u32| {
        let base = i as usize * 3;
        [
            positions[base] as f64,
            positions[base + 1] as f64,
            positions[base + 2] as f64,
        ]
    };
    mesh.geometry
        .indices()
        .chunks_exact(3)
        .map(|tri| {
            let (a, b, c) = (corner(tri[0]), corner(tri[1]), corner(tri[2]));
            let cross = [
                b[1] * c[2] - b[2] * c[1],
                b[2] * c[0] - b[0] * c[2],
                b[0] * c[1] - b[1] * c[0],
            ];
            (a[0] * cross[0] + a[1] * cross[1] + a[2] * cross[2]) / 6.0
        })
        .sum()
}

#[test]
fn test_reflections_keep_outward_winding() {
    let ops = ops();
    assert_relative_eq!(signed_volume(&cube()), 6.0, epsilon = 1e-4);

    let mirrored = ops
        .mirror(&cube(), &MirrorParams { normal: vec![0.0, 0.0, 1.0] })
        .unwrap();
    assert_relative_eq!(signed_volume(&mirrored), 6.0, epsilon = 1e-4);
    assert_relative_eq!(mirrored.bounding_box().min.z, -3.0);

    let flipped = ops
        .scale(
            &cube(),
            &ScaleParams {
                factor: ScaleFactor::Axes(vec![-1.0, 1.0, 1.0]),
            },
        )
        .unwrap();
    assert_relative_eq!(signed_volume(&flipped), 6.0, epsilon = 1e-4);
}

#[test]
fn test_rotate_about_z() {
    let rotated = ops()
        .rotate(
            &cube(),
            &RotateParams {
                angle: Some(90.0),
                ..Default::default()
            },
        )
        .unwrap();
    let bbox = rotated.bounding_box();
    assert_relative_eq!(bbox.min.x, -2.0, epsilon = 1e-5);
    assert_relative_eq!(bbox.max.y, 1.0, epsilon = 1e-5);
}

#[test]
fn test_scale_and_multmatrix_agree() {
    let ops = ops();
    let scaled = ops
        .scale(&cube(), &ScaleParams { factor: ScaleFactor::Axes(vec![2.0, 1.0, 0.5]) })
        .unwrap();
    let matrix = ops
        .multmatrix(
            &cube(),
            &MultmatrixParams {
                matrix: vec![
                    vec![2.0, 0.0, 0.0, 0.0],
                    vec![0.0, 1.0, 0.0, 0.0],
                    vec![0.0, 0.0, 0.5, 0.0],
                    vec![0.0, 0.0, 0.0, 1.0],
                ],
            },
        )
        .unwrap();
    assert_positions_eq(&scaled, &matrix);
}

#[test]
fn test_multmatrix_translation_column() {
    let moved = ops()
        .multmatrix(
            &cube(),
            &MultmatrixParams {
                matrix: vec![
                    vec![1.0, 0.0, 0.0, 10.0],
                    vec![0.0, 1.0, 0.0, 0.0],
                    vec![0.0, 0.0, 1.0, 0.0],
                    vec![0.0, 0.0, 0.0, 1.0],
                ],
            },
        )
        .unwrap();
    assert_relative_eq!(moved.bounding_box().min.x, 10.0);
}

#[test]
fn test_bad_arity_fails_before_work() {
    let ops = ops();
    let err = ops
        .translate(&cube(), &TranslateParams { vector: vec![1.0, 2.0] })
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TransformationFailed);
    assert_eq!(err.operation, TransformType::Translate);

    let err = ops
        .multmatrix(&cube(), &MultmatrixParams { matrix: vec![vec![1.0; 3]; 3] })
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TransformationFailed);
}

#[test]
fn test_color_replaces_material_only() {
    let original = cube();
    let colored = ops()
        .color(
            &original,
            &ColorParams {
                color: vec![0.0, 0.0, 1.0, 0.9].into(),
                alpha: Some(0.5),
            },
        )
        .unwrap();

    assert!(Arc::ptr_eq(&original.geometry, &colored.geometry));
    assert_eq!(colored.material.diffuse_color, [0.0, 0.0, 1.0]);
    assert_relative_eq!(colored.material.alpha, 0.5);
    assert!(colored.material.transparent);
}
