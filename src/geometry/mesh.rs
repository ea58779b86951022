// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Working triangle mesh used while building geometry
//!
//! Generators and the CSG backend operate on [`Mesh`] in double precision.
//! A `Mesh` is a transient value: its buffers are extracted into a
//! [`GenericGeometry`](crate::mesh::GenericGeometry) and the mesh is dropped.

use super::BoundingBox;
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// Vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { position, normal }
    }

    /// Vertex whose normal is filled in later by [`Mesh::recompute_normals`]
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z), Vector3::z())
    }
}

/// Triangle defined by three vertex indices, counter-clockwise seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triangle {
    pub indices: [usize; 3],
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self { indices }
    }

    pub fn flipped(&self) -> Self {
        Self::new([self.indices[0], self.indices[2], self.indices[1]])
    }
}

/// Triangular mesh
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
        }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Add a triangle unless two of its corners share an index
    pub fn add_face(&mut self, a: usize, b: usize, c: usize) {
        if a != b && b != c && a != c {
            self.triangles.push(Triangle::new([a, b, c]));
        }
    }

    /// Apply an affine transform to positions and normals.
    ///
    /// Reflections (negative determinant) also reverse the winding of
    /// every triangle so faces keep pointing outward.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        let linear: Matrix3<f64> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(linear);

        for vertex in &mut self.vertices {
            vertex.position = matrix.transform_point(&vertex.position);
            let normal = normal_matrix * vertex.normal;
            if normal.norm() > 1e-12 {
                vertex.normal = normal.normalize();
            }
        }

        if linear.determinant() < 0.0 {
            self.flip_winding();
        }
    }

    pub fn translate(&mut self, offset: Vector3<f64>) {
        for vertex in &mut self.vertices {
            vertex.position += offset;
        }
    }

    /// Reverse the winding of every triangle
    pub fn flip_winding(&mut self) {
        for triangle in &mut self.triangles {
            *triangle = triangle.flipped();
        }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for vertex in &self.vertices {
            bbox.expand_to_include(&vertex.position.cast::<f32>());
        }
        bbox
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Area-weighted smooth normals at shared vertices
    pub fn recompute_normals(&mut self) {
        if self.vertices.is_empty() || self.triangles.is_empty() {
            return;
        }

        let mut normal_sums: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.vertices.len()];

        for triangle in &self.triangles {
            let [i0, i1, i2] = triangle.indices;
            let edge1 = self.vertices[i1].position - self.vertices[i0].position;
            let edge2 = self.vertices[i2].position - self.vertices[i0].position;
            // Cross product length is twice the area, so this is already area weighted
            let face_normal = edge1.cross(&edge2);

            if face_normal.norm() > 1e-12 {
                for &idx in &triangle.indices {
                    normal_sums[idx] += face_normal;
                }
            }
        }

        for (vertex, sum) in self.vertices.iter_mut().zip(normal_sums) {
            vertex.normal = if sum.norm() > 1e-12 {
                sum.normalize()
            } else {
                Vector3::z()
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> Mesh {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(Vertex::at(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(Vertex::at(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(Vertex::at(0.0, 1.0, 0.0));
        mesh.add_face(a, b, c);
        mesh.recompute_normals();
        mesh
    }

    #[test]
    fn test_recompute_normals_follow_winding() {
        let mesh = single_triangle();
        for vertex in &mesh.vertices {
            assert!((vertex.normal - Vector3::z()).norm() < 1e-12);
        }
    }

    #[test]
    fn test_reflection_flips_winding() {
        let mut mesh = single_triangle();
        let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0, -1.0));
        mesh.transform(&mirror);
        assert_eq!(mesh.triangles[0].indices, [0, 2, 1]);
    }

    #[test]
    fn test_add_face_skips_degenerate() {
        let mut mesh = Mesh::new();
        mesh.add_vertex(Vertex::at(0.0, 0.0, 0.0));
        mesh.add_vertex(Vertex::at(1.0, 0.0, 0.0));
        mesh.add_face(0, 1, 1);
        assert!(mesh.is_empty());
    }
}
