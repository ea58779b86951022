// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Primitive shape generator
//!
//! Cube, sphere and cylinder with OpenSCAD parameter resolution and
//! placement. Tessellation goes through a transient [`Mesh`] whose
//! buffers are moved into the returned [`GenericMeshData`].

use super::{elapsed_ms, params_json};
use crate::config::FragmentDefaults;
use crate::error::{ErrorCode, OperationError};
use crate::geometry::{calculate_fragments, Mesh, Primitive};
use crate::mesh::{GenericGeometry, GenericMeshData, MeshDataBuilder};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    Cube,
    Sphere,
    Cylinder,
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrimitiveType::Cube => "cube",
            PrimitiveType::Sphere => "sphere",
            PrimitiveType::Cylinder => "cylinder",
        })
    }
}

pub type PrimitiveGenerationError = OperationError<PrimitiveType>;

/// `$fn`, `$fa`, `$fs` as seen by one call
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FragmentParams {
    #[serde(rename = "fn", default)]
    pub fn_: Option<f64>,
    #[serde(default)]
    pub fa: Option<f64>,
    #[serde(default)]
    pub fs: Option<f64>,
}

/// Scalar or per-axis cube size
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CubeSize {
    Uniform(f64),
    Axes([f64; 3]),
}

impl CubeSize {
    fn to_vector(self) -> Vector3<f64> {
        match self {
            CubeSize::Uniform(s) => Vector3::new(s, s, s),
            CubeSize::Axes([x, y, z]) => Vector3::new(x, y, z),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CubeParams {
    pub size: Option<CubeSize>,
    #[serde(default)]
    pub center: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SphereParams {
    pub radius: Option<f64>,
    pub diameter: Option<f64>,
    #[serde(default)]
    pub fragments: FragmentParams,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CylinderParams {
    pub height: Option<f64>,
    pub radius: Option<f64>,
    pub radius1: Option<f64>,
    pub radius2: Option<f64>,
    pub diameter: Option<f64>,
    pub diameter1: Option<f64>,
    pub diameter2: Option<f64>,
    #[serde(default)]
    pub center: bool,
    #[serde(default)]
    pub fragments: FragmentParams,
}

impl CylinderParams {
    /// Bottom and top radius: `r1`/`r2`, then `d1`/`d2`, then `r`/`d`, then 1
    pub fn resolve_radii(&self) -> (f64, f64) {
        let uniform = self.radius.or(self.diameter.map(|d| d / 2.0));
        let r1 = self
            .radius1
            .or(self.diameter1.map(|d| d / 2.0))
            .or(uniform)
            .unwrap_or(1.0);
        let r2 = self
            .radius2
            .or(self.diameter2.map(|d| d / 2.0))
            .or(uniform)
            .unwrap_or(1.0);
        (r1, r2)
    }
}

/// Generates primitive meshes with OpenSCAD semantics
#[derive(Debug, Clone, Default)]
pub struct PrimitiveGenerator {
    fragments: FragmentDefaults,
}

impl PrimitiveGenerator {
    pub fn new(fragments: FragmentDefaults) -> Self {
        Self { fragments }
    }

    /// Segment count for a circle of `radius` under `params`
    pub fn segments(&self, radius: f64, params: &FragmentParams) -> u32 {
        calculate_fragments(radius, params.fn_, params.fa, params.fs, &self.fragments)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn generate_cube(
        &self,
        params: &CubeParams,
    ) -> Result<GenericMeshData, PrimitiveGenerationError> {
        let start = Instant::now();
        let size = params
            .size
            .ok_or_else(|| fail(PrimitiveType::Cube, "size is required"))?
            .to_vector();

        if !size.iter().all(|s| s.is_finite() && *s > 0.0) {
            return Err(fail(
                PrimitiveType::Cube,
                format!("size must be positive, got [{}, {}, {}]", size.x, size.y, size.z),
            ));
        }

        let mesh = Primitive::cube(size, params.center).to_mesh();
        finish(PrimitiveType::Cube, mesh, params_json(params), start)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn generate_sphere(
        &self,
        params: &SphereParams,
    ) -> Result<GenericMeshData, PrimitiveGenerationError> {
        let start = Instant::now();
        let radius = params
            .radius
            .or(params.diameter.map(|d| d / 2.0))
            .unwrap_or(1.0);

        if !(radius.is_finite() && radius > 0.0) {
            return Err(fail(
                PrimitiveType::Sphere,
                format!("radius must be positive, got {radius}"),
            ));
        }

        let segments = self.segments(radius, &params.fragments);
        let mesh = Primitive::sphere(radius, segments).to_mesh();

        let mut json = params_json(params);
        json["segments"] = segments.into();
        finish(PrimitiveType::Sphere, mesh, json, start)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn generate_cylinder(
        &self,
        params: &CylinderParams,
    ) -> Result<GenericMeshData, PrimitiveGenerationError> {
        let start = Instant::now();
        let height = params
            .height
            .ok_or_else(|| fail(PrimitiveType::Cylinder, "height is required"))?;
        if !(height.is_finite() && height > 0.0) {
            return Err(fail(
                PrimitiveType::Cylinder,
                format!("height must be positive, got {height}"),
            ));
        }

        let (r1, r2) = params.resolve_radii();
        if !(r1.is_finite() && r2.is_finite()) || r1 < 0.0 || r2 < 0.0 {
            return Err(fail(
                PrimitiveType::Cylinder,
                format!("radii must be non-negative, got r1={r1} r2={r2}"),
            ));
        }
        if r1 == 0.0 && r2 == 0.0 {
            return Err(fail(PrimitiveType::Cylinder, "at least one radius must be positive"));
        }

        let segments = self.segments(r1.max(r2), &params.fragments);
        let mesh = Primitive::cylinder(height, r1, r2, segments, params.center).to_mesh();

        let mut json = params_json(params);
        json["segments"] = segments.into();
        finish(PrimitiveType::Cylinder, mesh, json, start)
    }
}

fn fail(kind: PrimitiveType, message: impl Into<String>) -> PrimitiveGenerationError {
    PrimitiveGenerationError::new(ErrorCode::MeshGenerationFailed, kind, message)
}

fn finish(
    kind: PrimitiveType,
    mesh: Mesh,
    params: serde_json::Value,
    start: Instant,
) -> Result<GenericMeshData, PrimitiveGenerationError> {
    let geometry = GenericGeometry::from_mesh(mesh).map_err(|err| fail(kind, err.to_string()))?;
    let elapsed = elapsed_ms(start);
    debug!(%kind, vertices = geometry.vertex_count(), elapsed_ms = elapsed, "primitive generated");

    let name = kind.to_string();
    Ok(MeshDataBuilder::new(&name, geometry)
        .parameters(&name, params)
        .generation_time(elapsed)
        .build())
}
