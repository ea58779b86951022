// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Renderer-agnostic vertex buffers

use crate::error::GeometryError;
use crate::geometry::analytics::{self, SurfaceMetrics};
use crate::geometry::mesh_utils::{edge_report, EdgeReport};
use crate::geometry::{BoundingBox, Mesh, Triangle, Vertex};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use serde::Serialize;

/// Immutable triangle buffers.
///
/// Construction validates that positions and indices come in triples,
/// every index addresses an existing vertex and every optional attribute
/// has one entry per vertex.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericGeometry {
    positions: Vec<f32>,
    indices: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    normals: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uvs: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    colors: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tangents: Option<Vec<f32>>,
    vertex_count: usize,
    triangle_count: usize,
    bounding_box: BoundingBox,
}

impl GenericGeometry {
    pub fn new(positions: Vec<f32>, indices: Vec<u32>) -> Result<Self, GeometryError> {
        if positions.len() % 3 != 0 {
            return Err(GeometryError::PositionLength(positions.len()));
        }
        if indices.len() % 3 != 0 {
            return Err(GeometryError::IndexLength(indices.len()));
        }

        let vertex_count = positions.len() / 3;
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(GeometryError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        if let Some(bad) = positions.iter().position(|p| !p.is_finite()) {
            return Err(GeometryError::NonFinite(bad / 3));
        }

        let bounding_box = BoundingBox::from_positions(&positions);
        Ok(Self {
            triangle_count: indices.len() / 3,
            vertex_count,
            positions,
            indices,
            normals: None,
            uvs: None,
            colors: None,
            tangents: None,
            bounding_box,
        })
    }

    pub fn empty() -> Self {
        Self {
            positions: Vec::new(),
            indices: Vec::new(),
            normals: None,
            uvs: None,
            colors: None,
            tangents: None,
            vertex_count: 0,
            triangle_count: 0,
            bounding_box: BoundingBox::empty(),
        }
    }

    fn check_attribute(
        &self,
        attribute: &'static str,
        values: &[f32],
        width: usize,
    ) -> Result<(), GeometryError> {
        let expected = self.vertex_count * width;
        if values.len() != expected {
            return Err(GeometryError::AttributeLength {
                attribute,
                actual: values.len(),
                expected,
            });
        }
        Ok(())
    }

    pub fn with_normals(mut self, normals: Vec<f32>) -> Result<Self, GeometryError> {
        self.check_attribute("normals", &normals, 3)?;
        self.normals = Some(normals);
        Ok(self)
    }

    pub fn with_uvs(mut self, uvs: Vec<f32>) -> Result<Self, GeometryError> {
        self.check_attribute("uvs", &uvs, 2)?;
        self.uvs = Some(uvs);
        Ok(self)
    }

    pub fn with_colors(mut self, colors: Vec<f32>) -> Result<Self, GeometryError> {
        self.check_attribute("colors", &colors, 4)?;
        self.colors = Some(colors);
        Ok(self)
    }

    pub fn with_tangents(mut self, tangents: Vec<f32>) -> Result<Self, GeometryError> {
        self.check_attribute("tangents", &tangents, 4)?;
        self.tangents = Some(tangents);
        Ok(self)
    }

    /// Extract the buffers of a working mesh, consuming it
    pub fn from_mesh(mesh: Mesh) -> Result<Self, GeometryError> {
        let mut positions = Vec::with_capacity(mesh.vertices.len() * 3);
        let mut normals = Vec::with_capacity(mesh.vertices.len() * 3);
        for vertex in &mesh.vertices {
            positions.extend([
                vertex.position.x as f32,
                vertex.position.y as f32,
                vertex.position.z as f32,
            ]);
            normals.extend([
                vertex.normal.x as f32,
                vertex.normal.y as f32,
                vertex.normal.z as f32,
            ]);
        }

        let mut indices = Vec::with_capacity(mesh.triangles.len() * 3);
        for triangle in &mesh.triangles {
            for index in triangle.indices {
                let index = u32::try_from(index).map_err(|_| GeometryError::IndexOutOfRange {
                    index: u32::MAX,
                    vertex_count: mesh.vertices.len(),
                })?;
                indices.push(index);
            }
        }

        Self::new(positions, indices)?.with_normals(normals)
    }

    /// Rebuild a working mesh for further geometry processing
    pub fn to_mesh(&self) -> Mesh {
        let mut mesh = Mesh::with_capacity(self.vertex_count, self.triangle_count);
        for i in 0..self.vertex_count {
            let p = &self.positions[i * 3..i * 3 + 3];
            let normal = self
                .normals
                .as_ref()
                .map(|n| Vector3::new(n[i * 3] as f64, n[i * 3 + 1] as f64, n[i * 3 + 2] as f64))
                .unwrap_or_else(Vector3::z);
            mesh.add_vertex(Vertex::new(
                Point3::new(p[0] as f64, p[1] as f64, p[2] as f64),
                normal,
            ));
        }
        for tri in self.indices.chunks_exact(3) {
            mesh.add_triangle(Triangle::new([tri[0] as usize, tri[1] as usize, tri[2] as usize]));
        }
        mesh
    }

    /// Copy with `matrix` baked into positions, normals and tangents.
    ///
    /// UVs and vertex colors are carried over untouched. A reflecting
    /// matrix reverses the winding of every triangle.
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Result<Self, GeometryError> {
        let linear: Matrix3<f64> = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = linear
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(linear);
        let reflects = linear.determinant() < 0.0;

        let positions = self
            .positions
            .chunks_exact(3)
            .flat_map(|p| {
                let point = Point3::new(p[0] as f64, p[1] as f64, p[2] as f64);
                let moved = matrix.transform_point(&point);
                [moved.x as f32, moved.y as f32, moved.z as f32]
            })
            .collect();

        let mut indices = self.indices.clone();
        if reflects {
            for tri in indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }

        let mut geometry = Self::new(positions, indices)?;

        if let Some(normals) = &self.normals {
            let normals = normals
                .chunks_exact(3)
                .flat_map(|n| {
                    let normal = normal_matrix * Vector3::new(n[0] as f64, n[1] as f64, n[2] as f64);
                    let normal = normal.try_normalize(1e-12).unwrap_or(normal);
                    [normal.x as f32, normal.y as f32, normal.z as f32]
                })
                .collect();
            geometry = geometry.with_normals(normals)?;
        }
        if let Some(tangents) = &self.tangents {
            let tangents = tangents
                .chunks_exact(4)
                .flat_map(|t| {
                    let tangent = linear * Vector3::new(t[0] as f64, t[1] as f64, t[2] as f64);
                    let tangent = tangent.try_normalize(1e-12).unwrap_or(tangent);
                    [tangent.x as f32, tangent.y as f32, tangent.z as f32, t[3]]
                })
                .collect();
            geometry = geometry.with_tangents(tangents)?;
        }
        if let Some(uvs) = &self.uvs {
            geometry = geometry.with_uvs(uvs.clone())?;
        }
        if let Some(colors) = &self.colors {
            geometry = geometry.with_colors(colors.clone())?;
        }

        Ok(geometry)
    }

    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn normals(&self) -> Option<&[f32]> {
        self.normals.as_deref()
    }

    pub fn uvs(&self) -> Option<&[f32]> {
        self.uvs.as_deref()
    }

    pub fn colors(&self) -> Option<&[f32]> {
        self.colors.as_deref()
    }

    pub fn tangents(&self) -> Option<&[f32]> {
        self.tangents.as_deref()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bounding_box
    }

    pub fn is_empty(&self) -> bool {
        self.triangle_count == 0
    }

    pub fn edge_report(&self) -> EdgeReport {
        edge_report(&self.positions, &self.indices)
    }

    pub fn is_watertight(&self) -> bool {
        self.edge_report().is_watertight()
    }

    pub fn metrics(&self) -> SurfaceMetrics {
        analytics::analyze(&self.positions, &self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_bad_buffers() {
        assert_eq!(
            GenericGeometry::new(vec![0.0; 4], vec![]),
            Err(GeometryError::PositionLength(4))
        );
        assert_eq!(
            GenericGeometry::new(vec![0.0; 9], vec![0, 1]),
            Err(GeometryError::IndexLength(2))
        );
        assert_eq!(
            GenericGeometry::new(vec![0.0; 9], vec![0, 1, 3]),
            Err(GeometryError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            })
        );

        let geometry = GenericGeometry::new(vec![0.0; 9], vec![0, 1, 2]).unwrap();
        assert!(matches!(
            geometry.with_uvs(vec![0.0; 5]),
            Err(GeometryError::AttributeLength { attribute: "uvs", .. })
        ));
    }

    #[test]
    fn test_from_mesh_keeps_counts() {
        let mesh = Primitive::cube(Vector3::new(2.0, 2.0, 2.0), true).to_mesh();
        let geometry = GenericGeometry::from_mesh(mesh).unwrap();

        assert_eq!(geometry.vertex_count(), 36);
        assert_eq!(geometry.triangle_count(), 12);
        assert_eq!(geometry.positions().len(), 3 * geometry.vertex_count());
        assert!(geometry.normals().is_some());
        assert!(geometry.is_watertight());
        assert_relative_eq!(geometry.metrics().volume, 8.0, epsilon = 1e-5);
    }

    #[test]
    fn test_reflection_flips_winding() {
        let mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh();
        let geometry = GenericGeometry::from_mesh(mesh).unwrap();
        let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(-1.0, 1.0, 1.0));

        let mirrored = geometry.transformed(&mirror).unwrap();
        assert_eq!(mirrored.indices()[1], geometry.indices()[2]);
        assert_eq!(mirrored.indices()[2], geometry.indices()[1]);
        assert_relative_eq!(mirrored.bounding_box().min.x, -1.0);
        // Volume stays positive with outward faces
        assert_relative_eq!(mirrored.metrics().volume, 1.0, epsilon = 1e-5);
    }
}
