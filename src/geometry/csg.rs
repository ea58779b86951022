// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CSG (Constructive Solid Geometry) operations using BSP trees
//!
//! Nodes live in a flat arena and every traversal uses an explicit stack.
//! Convex inputs produce trees as deep as their face count, so recursion
//! is avoided entirely.

use super::{Mesh, Vertex};
use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone, Copy)]
struct Plane {
    normal: Vector3<f64>,
    w: f64,
}

impl Plane {
    fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Self> {
        let normal = (b - a).cross(&(c - a));
        let length = normal.norm();
        if !length.is_finite() || length < 1e-12 {
            return None;
        }
        let normal = normal / length;
        Some(Self {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    fn flip(&mut self) {
        self.normal = -self.normal;
        self.w = -self.w;
    }
}

/// Convex planar polygon; split fragments keep the plane of their source
#[derive(Debug, Clone)]
struct Polygon {
    vertices: Vec<Point3<f64>>,
    plane: Plane,
}

impl Polygon {
    fn flip(&mut self) {
        self.vertices.reverse();
        self.plane.flip();
    }
}

const COPLANAR: u8 = 0;
const FRONT: u8 = 1;
const BACK: u8 = 2;
const SPANNING: u8 = 3;

/// Where the pieces of a split polygon go
#[derive(Default)]
struct Split {
    coplanar_front: Vec<Polygon>,
    coplanar_back: Vec<Polygon>,
    front: Vec<Polygon>,
    back: Vec<Polygon>,
}

fn split_polygon(plane: &Plane, polygon: Polygon, epsilon: f64, out: &mut Split) {
    let types: Vec<u8> = polygon
        .vertices
        .iter()
        .map(|v| {
            let t = plane.normal.dot(&v.coords) - plane.w;
            if t < -epsilon {
                BACK
            } else if t > epsilon {
                FRONT
            } else {
                COPLANAR
            }
        })
        .collect();
    let polygon_type = types.iter().fold(COPLANAR, |acc, t| acc | t);

    match polygon_type {
        COPLANAR => {
            if plane.normal.dot(&polygon.plane.normal) > 0.0 {
                out.coplanar_front.push(polygon);
            } else {
                out.coplanar_back.push(polygon);
            }
        }
        FRONT => out.front.push(polygon),
        BACK => out.back.push(polygon),
        _ => {
            let n = polygon.vertices.len();
            let mut front = Vec::with_capacity(n + 1);
            let mut back = Vec::with_capacity(n + 1);

            for i in 0..n {
                let j = (i + 1) % n;
                let (ti, tj) = (types[i], types[j]);
                let vi = polygon.vertices[i];
                let vj = polygon.vertices[j];

                if ti != BACK {
                    front.push(vi);
                }
                if ti != FRONT {
                    back.push(vi);
                }
                if (ti | tj) == SPANNING {
                    let denom = plane.normal.dot(&(vj - vi));
                    let t = (plane.w - plane.normal.dot(&vi.coords)) / denom;
                    let v = vi + (vj - vi) * t;
                    front.push(v);
                    back.push(v);
                }
            }

            if front.len() >= 3 {
                out.front.push(Polygon {
                    vertices: front,
                    plane: polygon.plane,
                });
            }
            if back.len() >= 3 {
                out.back.push(Polygon {
                    vertices: back,
                    plane: polygon.plane,
                });
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
struct BspNode {
    plane: Option<Plane>,
    front: Option<usize>,
    back: Option<usize>,
    polygons: Vec<Polygon>,
}

/// Solid represented as a BSP tree over its boundary polygons
#[derive(Debug, Clone)]
pub struct BspTree {
    nodes: Vec<BspNode>,
    epsilon: f64,
}

impl BspTree {
    pub fn from_mesh(mesh: &Mesh, epsilon: f64) -> Self {
        let polygons = mesh
            .triangles
            .iter()
            .filter_map(|tri| {
                let [a, b, c] = tri.indices.map(|i| mesh.vertices[i].position);
                Plane::from_points(&a, &b, &c).map(|plane| Polygon {
                    vertices: vec![a, b, c],
                    plane,
                })
            })
            .collect();

        let mut tree = Self {
            nodes: vec![BspNode::default()],
            epsilon,
        };
        tree.build(0, polygons);
        tree
    }

    fn build(&mut self, root: usize, polygons: Vec<Polygon>) {
        let mut stack = vec![(root, polygons)];

        while let Some((index, polygons)) = stack.pop() {
            let Some(first) = polygons.first() else {
                continue;
            };
            let plane = *self.nodes[index].plane.get_or_insert(first.plane);

            let mut split = Split::default();
            for polygon in polygons {
                split_polygon(&plane, polygon, self.epsilon, &mut split);
            }

            let node = &mut self.nodes[index];
            node.polygons.append(&mut split.coplanar_front);
            node.polygons.append(&mut split.coplanar_back);

            if !split.front.is_empty() {
                let child = self.child(index, true);
                stack.push((child, split.front));
            }
            if !split.back.is_empty() {
                let child = self.child(index, false);
                stack.push((child, split.back));
            }
        }
    }

    /// Existing child of `index`, or a freshly allocated one
    fn child(&mut self, index: usize, front: bool) -> usize {
        let existing = if front {
            self.nodes[index].front
        } else {
            self.nodes[index].back
        };
        if let Some(child) = existing {
            return child;
        }

        let child = self.nodes.len();
        self.nodes.push(BspNode::default());
        if front {
            self.nodes[index].front = Some(child);
        } else {
            self.nodes[index].back = Some(child);
        }
        child
    }

    /// Swap solid space and empty space
    fn invert(&mut self) {
        for node in &mut self.nodes {
            for polygon in &mut node.polygons {
                polygon.flip();
            }
            if let Some(plane) = node.plane.as_mut() {
                plane.flip();
            }
            std::mem::swap(&mut node.front, &mut node.back);
        }
    }

    /// Remove the parts of `polygons` that lie inside this solid
    fn clip_polygons(&self, polygons: Vec<Polygon>) -> Vec<Polygon> {
        let mut result = Vec::new();
        let mut stack = vec![(0usize, polygons)];

        while let Some((index, polygons)) = stack.pop() {
            let node = &self.nodes[index];
            let Some(plane) = node.plane else {
                result.extend(polygons);
                continue;
            };

            let mut split = Split::default();
            for polygon in polygons {
                split_polygon(&plane, polygon, self.epsilon, &mut split);
            }
            split.front.append(&mut split.coplanar_front);
            split.back.append(&mut split.coplanar_back);

            match node.front {
                Some(front) => stack.push((front, split.front)),
                None => result.extend(split.front),
            }
            if let Some(back) = node.back {
                stack.push((back, split.back));
            }
        }

        result
    }

    /// Remove every polygon of this tree that lies inside `other`
    fn clip_to(&mut self, other: &BspTree) {
        for node in &mut self.nodes {
            let polygons = std::mem::take(&mut node.polygons);
            node.polygons = other.clip_polygons(polygons);
        }
    }

    fn all_polygons(&self) -> Vec<Polygon> {
        self.nodes
            .iter()
            .flat_map(|node| node.polygons.iter().cloned())
            .collect()
    }

    fn absorb(&mut self, other: &BspTree) {
        let polygons = other.all_polygons();
        self.build(0, polygons);
    }

    pub fn into_mesh(self) -> Mesh {
        polygons_to_mesh(&self.all_polygons())
    }
}

/// Fan-triangulate convex polygons into a flat-shaded mesh
fn polygons_to_mesh(polygons: &[Polygon]) -> Mesh {
    let mut mesh = Mesh::new();

    for polygon in polygons {
        let normal = polygon.plane.normal;
        let first = mesh.vertices.len();
        for &position in &polygon.vertices {
            mesh.add_vertex(Vertex::new(position, normal));
        }
        for i in 1..polygon.vertices.len() - 1 {
            mesh.add_face(first, first + i, first + i + 1);
        }
    }

    mesh
}

/// Union of two solids
pub fn csg_union(a: &Mesh, b: &Mesh, epsilon: f64) -> Mesh {
    let mut a = BspTree::from_mesh(a, epsilon);
    let mut b = BspTree::from_mesh(b, epsilon);

    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.absorb(&b);
    a.into_mesh()
}

/// `a` with the volume of `b` removed
pub fn csg_difference(a: &Mesh, b: &Mesh, epsilon: f64) -> Mesh {
    let mut a = BspTree::from_mesh(a, epsilon);
    let mut b = BspTree::from_mesh(b, epsilon);

    a.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    b.invert();
    b.clip_to(&a);
    b.invert();
    a.absorb(&b);
    a.invert();
    a.into_mesh()
}

/// Volume shared by both solids
pub fn csg_intersection(a: &Mesh, b: &Mesh, epsilon: f64) -> Mesh {
    let mut a = BspTree::from_mesh(a, epsilon);
    let mut b = BspTree::from_mesh(b, epsilon);

    a.invert();
    b.clip_to(&a);
    b.invert();
    a.clip_to(&b);
    b.clip_to(&a);
    a.absorb(&b);
    a.invert();
    a.into_mesh()
}
