// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Extrusion slice and segment bounds through the evaluator

use scadmesh::ast::{Argument, Expr, ExtrudeKind, Node, ProfileKind};
use scadmesh::error::ErrorCode;
use scadmesh::ops::{ExtrusionError, ExtrusionType};
use scadmesh::{render, Evaluator, PipelineConfig};

fn square(size: f64) -> Node {
    Node::profile(ProfileKind::Square, vec![Argument::positional(size)])
}

fn ring() -> Node {
    Node::profile(
        ProfileKind::Polygon,
        vec![Argument::positional(Expr::vector([
            Expr::vector([Expr::Number(2.0), Expr::Number(0.0)]),
            Expr::vector([Expr::Number(3.0), Expr::Number(0.0)]),
            Expr::vector([Expr::Number(3.0), Expr::Number(1.0)]),
        ]))],
    )
}

fn linear(args: Vec<Argument>) -> Node {
    Node::extrude(ExtrudeKind::Linear, args, vec![square(2.0)])
}

#[test]
fn test_huge_slice_count_is_rejected() {
    for slices in [1e12, f64::INFINITY] {
        let program = linear(vec![
            Argument::named("height", 1.0),
            Argument::named("slices", Expr::Number(slices)),
        ]);
        let err = render(&program).unwrap_err();
        let extrusion = err.downcast_ref::<ExtrusionError>().unwrap();
        assert_eq!(extrusion.code, ErrorCode::InvalidParameters);
        assert_eq!(extrusion.operation, ExtrusionType::LinearExtrude);
    }
}

#[test]
fn test_nan_slices_use_default() {
    let program = linear(vec![
        Argument::named("height", 1.0),
        Argument::named("slices", Expr::Number(f64::NAN)),
    ]);
    let output = render(&program).unwrap();
    let mesh = output.as_single().unwrap();
    assert_eq!(mesh.metadata.openscad_parameters["linear_extrude"]["slices"], 1);
}

#[test]
fn test_twist_slices_follow_configured_limit() {
    let config = PipelineConfig {
        max_extrude_slices: 12,
        ..PipelineConfig::default()
    };
    let program = linear(vec![
        Argument::named("height", 5.0),
        Argument::named("twist", 3600.0),
    ]);
    let output = Evaluator::with_config(config).evaluate(&program).unwrap();
    let mesh = output.as_single().unwrap();
    assert_eq!(mesh.metadata.openscad_parameters["linear_extrude"]["slices"], 12);
    assert!(mesh.geometry.is_watertight());
}

#[test]
fn test_rotate_extrude_fn_is_clamped() {
    let program = Node::extrude(
        ExtrudeKind::Rotate,
        vec![Argument::named("$fn", 1e15)],
        vec![ring()],
    );
    let output = render(&program).unwrap();
    let mesh = output.as_single().unwrap();
    assert_eq!(mesh.metadata.openscad_parameters["rotate_extrude"]["segments"], 100);
    assert!(mesh.geometry.is_watertight());
}
