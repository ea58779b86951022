// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Performance benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scadmesh::ast::{Argument, CsgKind, Expr, Node, NodeKind, PrimitiveKind, TransformKind};
use scadmesh::ops::{
    CsgOperations, CubeParams, CubeSize, FragmentParams, PrimitiveGenerator, SphereParams,
};
use scadmesh::render;

fn cube(size: f64) -> Node {
    Node::primitive(PrimitiveKind::Cube, vec![Argument::positional(size)])
}

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");
    let generator = PrimitiveGenerator::default();

    group.bench_function("cube", |b| {
        let params = CubeParams {
            size: Some(CubeSize::Uniform(10.0)),
            center: false,
        };
        b.iter(|| generator.generate_cube(black_box(&params)).unwrap());
    });

    for fn_ in [16.0, 32.0, 64.0] {
        let params = SphereParams {
            radius: Some(10.0),
            fragments: FragmentParams {
                fn_: Some(fn_),
                ..Default::default()
            },
            ..Default::default()
        };
        group.bench_with_input(BenchmarkId::new("sphere", fn_), &params, |b, params| {
            b.iter(|| generator.generate_sphere(black_box(params)).unwrap());
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    let transform = Node::transform(
        TransformKind::Translate,
        vec![Argument::positional(Expr::vec3(5.0, 0.0, 0.0))],
        vec![Node::transform(
            TransformKind::Rotate,
            vec![Argument::positional(Expr::vec3(0.0, 45.0, 0.0))],
            vec![cube(10.0)],
        )],
    );
    group.bench_function("transform", |b| {
        b.iter(|| render(black_box(&transform)).unwrap());
    });

    let grid = Node::new(NodeKind::For {
        variable: "i".to_string(),
        iterable: Expr::range(0.0, 99.0),
        body: vec![Node::transform(
            TransformKind::Translate,
            vec![Argument::positional(Expr::vector([
                Expr::var("i"),
                Expr::Number(0.0),
                Expr::Number(0.0),
            ]))],
            vec![cube(0.5)],
        )],
    });
    group.bench_function("for_100", |b| {
        b.iter(|| render(black_box(&grid)).unwrap());
    });

    let difference = Node::csg(
        CsgKind::Difference,
        vec![
            cube(20.0),
            Node::transform(
                TransformKind::Translate,
                vec![Argument::positional(Expr::vec3(10.0, 10.0, 10.0))],
                vec![Node::primitive(
                    PrimitiveKind::Sphere,
                    vec![Argument::named("r", 15.0)],
                )],
            ),
        ],
    );
    group.bench_function("difference", |b| {
        b.iter(|| render(black_box(&difference)).unwrap());
    });

    group.finish();
}

fn bench_boolean_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("boolean_ops");
    let generator = PrimitiveGenerator::default();
    let csg = CsgOperations::default();

    let a = generator
        .generate_cube(&CubeParams {
            size: Some(CubeSize::Uniform(10.0)),
            center: false,
        })
        .unwrap();
    let b_mesh = generator
        .generate_cube(&CubeParams {
            size: Some(CubeSize::Uniform(8.0)),
            center: true,
        })
        .unwrap();

    group.bench_function("union", |b| {
        b.iter(|| csg.union(black_box(&[a.clone(), b_mesh.clone()])).unwrap());
    });
    group.bench_function("difference", |b| {
        b.iter(|| csg.difference(black_box(&a), black_box(&b_mesh)).unwrap());
    });
    group.bench_function("intersection", |b| {
        b.iter(|| csg.intersection(black_box(&a), black_box(&b_mesh)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_primitives, bench_render, bench_boolean_ops);
criterion_main!(benches);
