// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Transformation operations
//!
//! Every operation validates its parameters before touching geometry,
//! bakes the matrix into a new geometry buffer and appends itself to the
//! mesh lineage. `color` only swaps the material.

use super::{elapsed_ms, params_json};
use crate::error::{ErrorCode, OperationError};
use crate::material::{ColorInput, MaterialService};
use crate::mesh::{GenericMeshData, MeshDataBuilder};
use crate::utils::math::{all_finite, deg_to_rad};
use nalgebra::{Matrix4, Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformType {
    Translate,
    Rotate,
    Scale,
    Mirror,
    Multmatrix,
    Color,
}

impl fmt::Display for TransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransformType::Translate => "translate",
            TransformType::Rotate => "rotate",
            TransformType::Scale => "scale",
            TransformType::Mirror => "mirror",
            TransformType::Multmatrix => "multmatrix",
            TransformType::Color => "color",
        })
    }
}

pub type TransformationError = OperationError<TransformType>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateParams {
    pub vector: Vec<f64>,
}

/// `rotate(a, v)` in its three forms.
///
/// `angle` + `axis` is an axis-angle rotation, `vector` holds Euler
/// angles applied X then Y then Z, and `angle` alone turns about Z.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RotateParams {
    pub angle: Option<f64>,
    pub axis: Option<Vec<f64>>,
    pub vector: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleFactor {
    Uniform(f64),
    Axes(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub factor: ScaleFactor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorParams {
    /// Normal of the mirror plane through the origin
    pub normal: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultmatrixParams {
    /// Row-major 4×4
    pub matrix: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorParams {
    pub color: ColorInput,
    #[serde(default)]
    pub alpha: Option<f64>,
}

fn fail(kind: TransformType, message: impl Into<String>) -> TransformationError {
    TransformationError::new(ErrorCode::TransformationFailed, kind, message)
}

fn vector3(kind: TransformType, what: &str, values: &[f64]) -> Result<Vector3<f64>, TransformationError> {
    if values.len() != 3 {
        return Err(fail(
            kind,
            format!("{what} must have 3 components, got {}", values.len()),
        ));
    }
    if !all_finite(values) {
        return Err(fail(kind, format!("{what} must be finite")));
    }
    Ok(Vector3::new(values[0], values[1], values[2]))
}

/// Applies OpenSCAD transformations to mesh data
#[derive(Debug, Clone)]
pub struct TransformationOperations {
    materials: Arc<MaterialService>,
}

impl TransformationOperations {
    pub fn new(materials: Arc<MaterialService>) -> Self {
        Self { materials }
    }

    #[instrument(level = "debug", skip(self, mesh), fields(mesh = %mesh.id))]
    pub fn translate(
        &self,
        mesh: &GenericMeshData,
        params: &TranslateParams,
    ) -> Result<GenericMeshData, TransformationError> {
        let offset = vector3(TransformType::Translate, "translation", &params.vector)?;
        self.apply(
            TransformType::Translate,
            mesh,
            &Matrix4::new_translation(&offset),
            params_json(params),
        )
    }

    #[instrument(level = "debug", skip(self, mesh), fields(mesh = %mesh.id))]
    pub fn rotate(
        &self,
        mesh: &GenericMeshData,
        params: &RotateParams,
    ) -> Result<GenericMeshData, TransformationError> {
        let matrix = rotation_matrix(params)?;
        self.apply(TransformType::Rotate, mesh, &matrix, params_json(params))
    }

    #[instrument(level = "debug", skip(self, mesh), fields(mesh = %mesh.id))]
    pub fn scale(
        &self,
        mesh: &GenericMeshData,
        params: &ScaleParams,
    ) -> Result<GenericMeshData, TransformationError> {
        let factors = match &params.factor {
            ScaleFactor::Uniform(s) => {
                if !s.is_finite() {
                    return Err(fail(TransformType::Scale, "scale factor must be finite"));
                }
                Vector3::new(*s, *s, *s)
            }
            ScaleFactor::Axes(axes) => vector3(TransformType::Scale, "scale vector", axes)?,
        };
        self.apply(
            TransformType::Scale,
            mesh,
            &Matrix4::new_nonuniform_scaling(&factors),
            params_json(params),
        )
    }

    /// Householder reflection `I - 2nnᵀ` across the plane with normal `n`
    #[instrument(level = "debug", skip(self, mesh), fields(mesh = %mesh.id))]
    pub fn mirror(
        &self,
        mesh: &GenericMeshData,
        params: &MirrorParams,
    ) -> Result<GenericMeshData, TransformationError> {
        let normal = vector3(TransformType::Mirror, "mirror normal", &params.normal)?;
        let n = normal
            .try_normalize(1e-12)
            .ok_or_else(|| fail(TransformType::Mirror, "mirror normal must be non-zero"))?;

        let mut matrix = Matrix4::identity();
        matrix
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(nalgebra::Matrix3::identity() - 2.0 * n * n.transpose()));

        self.apply(TransformType::Mirror, mesh, &matrix, params_json(params))
    }

    #[instrument(level = "debug", skip(self, mesh), fields(mesh = %mesh.id))]
    pub fn multmatrix(
        &self,
        mesh: &GenericMeshData,
        params: &MultmatrixParams,
    ) -> Result<GenericMeshData, TransformationError> {
        let rows = &params.matrix;
        if rows.len() != 4 || rows.iter().any(|row| row.len() != 4) {
            return Err(fail(
                TransformType::Multmatrix,
                format!(
                    "matrix must be 4x4, got {} rows of lengths {:?}",
                    rows.len(),
                    rows.iter().map(Vec::len).collect::<Vec<_>>()
                ),
            ));
        }

        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        if !all_finite(&flat) {
            return Err(fail(TransformType::Multmatrix, "matrix entries must be finite"));
        }

        // nalgebra stores column-major; the input rows are read as rows
        let matrix = Matrix4::from_row_slice(&flat);
        self.apply(TransformType::Multmatrix, mesh, &matrix, params_json(params))
    }

    /// Replace the material; geometry is shared with the input
    #[instrument(level = "debug", skip(self, mesh), fields(mesh = %mesh.id))]
    pub fn color(
        &self,
        mesh: &GenericMeshData,
        params: &ColorParams,
    ) -> Result<GenericMeshData, TransformationError> {
        let start = Instant::now();
        let material = self
            .materials
            .create_material_from_color_node(params.color.clone(), params.alpha)
            .map_err(|err| {
                fail(TransformType::Color, err.message.clone())
                    .with_details(serde_json::json!({ "materialError": err.code }))
            })?;

        Ok(
            MeshDataBuilder::derived_from("color", Arc::clone(&mesh.geometry), mesh)
                .material(material.config.clone())
                .transformation("color")
                .parameters("color", params_json(params))
                .generation_time(elapsed_ms(start))
                .build(),
        )
    }

    fn apply(
        &self,
        kind: TransformType,
        mesh: &GenericMeshData,
        matrix: &Matrix4<f64>,
        params: serde_json::Value,
    ) -> Result<GenericMeshData, TransformationError> {
        let start = Instant::now();
        let geometry = mesh
            .geometry
            .transformed(matrix)
            .map_err(|err| fail(kind, err.to_string()))?;

        let elapsed = elapsed_ms(start);
        debug!(%kind, source = %mesh.id, elapsed_ms = elapsed, "transform applied");

        let name = kind.to_string();
        Ok(MeshDataBuilder::derived_from(&name, Arc::new(geometry), mesh)
            .transformation(&name)
            .parameters(&name, params)
            .generation_time(elapsed)
            .build())
    }
}

/// Matrix for `rotate()` following the documented precedence
pub fn rotation_matrix(params: &RotateParams) -> Result<Matrix4<f64>, TransformationError> {
    let kind = TransformType::Rotate;

    if let (Some(angle), Some(axis)) = (params.angle, params.axis.as_ref()) {
        if !angle.is_finite() {
            return Err(fail(kind, "rotation angle must be finite"));
        }
        let axis = vector3(kind, "rotation axis", axis)?;
        let axis = Unit::try_new(axis, 1e-12)
            .ok_or_else(|| fail(kind, "rotation axis must be non-zero"))?;
        return Ok(Rotation3::from_axis_angle(&axis, deg_to_rad(angle)).to_homogeneous());
    }

    if let Some(vector) = params.vector.as_ref() {
        let angles = vector3(kind, "rotation vector", vector)?;
        let rx = Rotation3::from_axis_angle(&Vector3::x_axis(), deg_to_rad(angles.x));
        let ry = Rotation3::from_axis_angle(&Vector3::y_axis(), deg_to_rad(angles.y));
        let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), deg_to_rad(angles.z));
        return Ok((rz * ry * rx).to_homogeneous());
    }

    if let Some(angle) = params.angle {
        if !angle.is_finite() {
            return Err(fail(kind, "rotation angle must be finite"));
        }
        return Ok(Rotation3::from_axis_angle(&Vector3::z_axis(), deg_to_rad(angle)).to_homogeneous());
    }

    Err(fail(kind, "rotate needs an angle, an angle and axis, or a vector"))
}
