// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! End-to-end evaluation of AST programs

use anyhow::Result;
use approx::assert_relative_eq;
use scadmesh::ast::{
    Argument, BinaryOp, CsgKind, Expr, ExtrudeKind, Node, NodeKind, PrimitiveKind, ProfileKind,
    TransformKind,
};
use scadmesh::error::ErrorCode;
use scadmesh::mesh::{CollectionType, MeshOutput, Modifier};
use scadmesh::ops::{ControlFlowError, ModuleError};
use scadmesh::{render, Evaluator, Pipeline, PipelineConfig};
use tempfile::NamedTempFile;

fn cube(size: f64) -> Node {
    Node::primitive(PrimitiveKind::Cube, vec![Argument::positional(size)])
}

fn translated(offset: [f64; 3], child: Node) -> Node {
    Node::transform(
        TransformKind::Translate,
        vec![Argument::positional(Expr::vec3(offset[0], offset[1], offset[2]))],
        vec![child],
    )
}

#[test]
fn test_render_json_program() -> Result<()> {
    // difference() { cube(10); translate([5, 5, -1]) cylinder(h = 12, r = 2, $fn = 24); }
    let program: Node = serde_json::from_value(serde_json::json!({
        "kind": { "csg": { "kind": "difference", "children": [
            { "kind": { "primitive": { "kind": "cube", "args": [
                { "value": { "number": 10.0 } }
            ] } } },
            { "kind": { "transform": {
                "kind": "translate",
                "args": [ { "value": { "vector": [
                    { "number": 5.0 }, { "number": 5.0 }, { "number": -1.0 }
                ] } } ],
                "children": [
                    { "kind": { "primitive": { "kind": "cylinder", "args": [
                        { "name": "h", "value": { "number": 12.0 } },
                        { "name": "r", "value": { "number": 2.0 } },
                        { "name": "$fn", "value": { "number": 24.0 } }
                    ] } } }
                ]
            } } }
        ] } }
    }))?;

    let output = render(&program)?;
    let mesh = output.as_single().unwrap().clone().with_metrics();
    let hole = 24.0 / 2.0 * 4.0 * (2.0 * std::f64::consts::PI / 24.0).sin() * 10.0;
    assert_relative_eq!(mesh.metadata.volume.unwrap(), 1000.0 - hole, epsilon = 0.05);
    assert_eq!(mesh.metadata.csg_operations(), ["difference"]);
    Ok(())
}

#[test]
fn test_for_loop_builds_collection() -> Result<()> {
    // for (i = [0 : 3]) translate([i * 2, 0, 0]) cube(1);
    let program = Node::new(NodeKind::For {
        variable: "i".to_string(),
        iterable: Expr::range(0.0, 3.0),
        body: vec![Node::transform(
            TransformKind::Translate,
            vec![Argument::positional(Expr::vector([
                Expr::binary(BinaryOp::Multiply, Expr::var("i"), 2.0),
                Expr::Number(0.0),
                Expr::Number(0.0),
            ]))],
            vec![cube(1.0)],
        )],
    });

    let output = render(&program)?;
    let MeshOutput::Collection(collection) = output else {
        panic!("expected a collection");
    };
    assert_eq!(collection.len(), 4);
    assert_eq!(collection.collection_type(), CollectionType::ControlFlowResult);
    assert_relative_eq!(collection.metadata.bounding_box.max.x, 7.0);
    Ok(())
}

#[test]
fn test_if_else_and_let() -> Result<()> {
    // let (big = 3 > 2) if (big) cube(5); else cube(1);
    let program = Node::new(NodeKind::Let {
        bindings: vec![(
            "big".to_string(),
            Expr::binary(BinaryOp::Greater, 3.0, 2.0),
        )],
        body: vec![Node::new(NodeKind::If {
            condition: Expr::var("big"),
            then_branch: vec![cube(5.0)],
            else_branch: Some(vec![cube(1.0)]),
        })],
    });

    let output = render(&program)?;
    assert_relative_eq!(output.as_single().unwrap().bounding_box().max.x, 5.0);
    Ok(())
}

#[test]
fn test_iterating_a_boolean_is_invalid() {
    let program = Node::new(NodeKind::For {
        variable: "i".to_string(),
        iterable: Expr::Bool(true),
        body: vec![cube(1.0)],
    });
    let err = render(&program).unwrap_err();
    let control = err.downcast_ref::<ControlFlowError>().unwrap();
    assert_eq!(control.code, ErrorCode::InvalidParameters);
}

#[test]
fn test_intersection_for_program() -> Result<()> {
    // intersection_for (i = [0 : 1]) translate([i, 0, 0]) cube(2);
    let program = Node::new(NodeKind::IntersectionFor {
        variable: "i".to_string(),
        iterable: Expr::range(0.0, 1.0),
        body: vec![Node::transform(
            TransformKind::Translate,
            vec![Argument::positional(Expr::vector([
                Expr::var("i"),
                Expr::Number(0.0),
                Expr::Number(0.0),
            ]))],
            vec![cube(2.0)],
        )],
    });

    let mesh = render(&program)?.as_single().unwrap().clone().with_metrics();
    assert_relative_eq!(mesh.metadata.volume.unwrap(), 4.0, epsilon = 1e-3);
    Ok(())
}

#[test]
fn test_disjoint_intersection_yields_nothing() -> Result<()> {
    let program = Node::csg(
        CsgKind::Intersection,
        vec![cube(1.0), translated([5.0, 0.0, 0.0], cube(1.0))],
    );
    let output = render(&program)?;
    assert!(output.is_empty());
    Ok(())
}

#[test]
fn test_extrusions_from_profiles() -> Result<()> {
    // linear_extrude(height = 10, twist = 90, slices = 8) square(4, center = true);
    let twisted = Node::extrude(
        ExtrudeKind::Linear,
        vec![
            Argument::named("height", 10.0),
            Argument::named("twist", 90.0),
            Argument::named("slices", 8.0),
        ],
        vec![Node::profile(
            ProfileKind::Square,
            vec![Argument::positional(4.0), Argument::named("center", true)],
        )],
    );
    let mesh = render(&twisted)?.as_single().unwrap().clone().with_metrics();
    assert_relative_eq!(mesh.bounding_box().max.z, 10.0);
    assert!(mesh.geometry.is_watertight());
    assert_eq!(mesh.metadata.openscad_parameters["linear_extrude"]["twist"], 90.0);

    // rotate_extrude($fn = 32) polygon([[2, 0], [3, 0], [3, 1], [2, 1]]);
    let ring = Node::extrude(
        ExtrudeKind::Rotate,
        vec![Argument::named("$fn", 32.0)],
        vec![Node::profile(
            ProfileKind::Polygon,
            vec![Argument::positional(Expr::vector([
                Expr::vector([Expr::Number(2.0), Expr::Number(0.0)]),
                Expr::vector([Expr::Number(3.0), Expr::Number(0.0)]),
                Expr::vector([Expr::Number(3.0), Expr::Number(1.0)]),
                Expr::vector([Expr::Number(2.0), Expr::Number(1.0)]),
            ]))],
        )],
    );
    let mesh = render(&ring)?.as_single().unwrap().clone();
    assert_relative_eq!(mesh.bounding_box().max.x, 3.0, epsilon = 1e-5);
    assert_relative_eq!(mesh.bounding_box().max.z, 1.0, epsilon = 1e-5);
    Ok(())
}

#[test]
fn test_background_modifier_on_collection() -> Result<()> {
    let program = Node::new(NodeKind::Group(vec![cube(1.0), translated([3.0, 0.0, 0.0], cube(1.0))]))
        .with_modifier(Modifier::Background);
    let output = render(&program)?;
    let collection = output.as_collection().unwrap();
    assert_eq!(collection.len(), 2);
    for mesh in collection.meshes() {
        assert!(mesh.material.is_background_material);
        assert_eq!(mesh.metadata.modifiers(), [Modifier::Background]);
    }
    Ok(())
}

#[test]
fn test_config_file_limits_recursion() -> Result<()> {
    let file = NamedTempFile::new()?;
    std::fs::write(file.path(), "max_recursion_depth = 4\n")?;
    let config = PipelineConfig::from_file(file.path())?;
    assert_eq!(config.max_recursion_depth, 4);
    assert_eq!(config.fragments.default_fa, 12.0);

    // module forever() { forever(); }  forever();
    let program = Node::new(NodeKind::Group(vec![
        Node::new(NodeKind::ModuleDefinition {
            name: "forever".to_string(),
            parameters: vec![],
            body: vec![Node::module_call("forever", vec![], vec![])],
        }),
        Node::module_call("forever", vec![], vec![]),
    ]));

    let err = Evaluator::with_config(config).evaluate(&program).unwrap_err();
    let module_error = err.downcast_ref::<ModuleError>().unwrap();
    assert_eq!(module_error.code, ErrorCode::EvaluationFailed);
    Ok(())
}

#[test]
fn test_strict_config_round_trip_still_renders_solids() -> Result<()> {
    let config = PipelineConfig {
        require_watertight_csg_inputs: true,
        ..PipelineConfig::default()
    };
    let file = NamedTempFile::new()?;
    config.save(file.path())?;
    let loaded = PipelineConfig::from_file(file.path())?;
    assert!(loaded.require_watertight_csg_inputs);

    let pipeline = Pipeline::with_config(loaded);
    let output = pipeline.evaluator().evaluate(&Node::csg(
        CsgKind::Union,
        vec![cube(2.0), translated([1.0, 1.0, 1.0], cube(2.0))],
    ))?;
    let mesh = output.as_single().unwrap().clone().with_metrics();
    assert_relative_eq!(mesh.metadata.volume.unwrap(), 15.0, epsilon = 1e-3);
    Ok(())
}
