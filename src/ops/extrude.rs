// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Extrusion operations
//!
//! Profile and parameter validation run first and report
//! `INVALID_PROFILE` / `INVALID_PARAMETERS`; only failures of the sweep
//! itself surface as `GEOMETRY_GENERATION_FAILED`.

use super::{elapsed_ms, params_json};
use crate::config::{FragmentDefaults, PipelineConfig};
use crate::error::{ErrorCode, OperationError};
use crate::geometry::{lathe, linear_sweep, Profile, SweepSettings};
use crate::mesh::{GenericGeometry, GenericMeshData, MeshDataBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrusionType {
    LinearExtrude,
    RotateExtrude,
}

impl fmt::Display for ExtrusionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtrusionType::LinearExtrude => "linear_extrude",
            ExtrusionType::RotateExtrude => "rotate_extrude",
        })
    }
}

pub type ExtrusionError = OperationError<ExtrusionType>;

/// Top scale of a linear extrusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtrudeScale {
    Uniform(f64),
    Axes([f64; 2]),
}

impl Default for ExtrudeScale {
    fn default() -> Self {
        ExtrudeScale::Uniform(1.0)
    }
}

impl ExtrudeScale {
    fn to_array(self) -> [f64; 2] {
        match self {
            ExtrudeScale::Uniform(s) => [s, s],
            ExtrudeScale::Axes(axes) => axes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinearExtrudeParams {
    pub height: f64,
    #[serde(default)]
    pub center: bool,
    /// Degrees of clockwise rotation over the full height
    #[serde(default)]
    pub twist: f64,
    #[serde(default)]
    pub scale: ExtrudeScale,
    /// Defaults to one slice, or one per few degrees of twist, bounded by
    /// the configured slice limit
    #[serde(default)]
    pub slices: Option<u32>,
}

impl Default for LinearExtrudeParams {
    fn default() -> Self {
        Self {
            height: 1.0,
            center: false,
            twist: 0.0,
            scale: ExtrudeScale::default(),
            slices: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateExtrudeParams {
    /// Sweep angle in degrees, `(0, 360]`, default 360
    #[serde(default)]
    pub angle: Option<f64>,
    /// Segments of a full turn, clamped to the fragment bounds
    #[serde(rename = "fn", default)]
    pub fn_: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct ExtrusionOperations {
    default_fn: u32,
    degrees_per_slice: f64,
    max_slices: u32,
    fragments: FragmentDefaults,
}

impl Default for ExtrusionOperations {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl ExtrusionOperations {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            default_fn: config.rotate_extrude_default_fn,
            degrees_per_slice: config.linear_extrude_degrees_per_slice,
            max_slices: config.max_extrude_slices.max(1),
            fragments: config.fragments,
        }
    }

    #[instrument(level = "debug", skip(self, profile), fields(points = profile.len()))]
    pub fn linear_extrude(
        &self,
        profile: &Profile,
        params: &LinearExtrudeParams,
    ) -> Result<GenericMeshData, ExtrusionError> {
        let kind = ExtrusionType::LinearExtrude;
        validate_profile(kind, profile)?;

        if !(params.height.is_finite() && params.height > 0.0) {
            return Err(invalid(kind, format!("height must be positive, got {}", params.height)));
        }
        if !params.twist.is_finite() {
            return Err(invalid(kind, "twist must be finite"));
        }
        let scale = params.scale.to_array();
        if !scale.iter().all(|s| s.is_finite() && *s >= 0.0) {
            return Err(invalid(kind, format!("scale must be non-negative, got {scale:?}")));
        }
        match params.slices {
            Some(0) => return Err(invalid(kind, "slices must be at least 1")),
            Some(slices) if slices > self.max_slices => {
                return Err(invalid(
                    kind,
                    format!("slices must be at most {}, got {slices}", self.max_slices),
                ))
            }
            _ => {}
        }

        let slices = params.slices.unwrap_or_else(|| self.default_slices(params.twist));
        let settings = SweepSettings {
            height: params.height,
            center: params.center,
            twist: params.twist,
            scale,
            slices,
        };

        let start = Instant::now();
        let mesh = linear_sweep(profile, &settings).map_err(|err| generation_failed(kind, err))?;

        let mut json = params_json(params);
        json["slices"] = slices.into();
        json["profilePoints"] = profile.len().into();
        finish(kind, GenericGeometry::from_mesh(mesh), json, start)
    }

    #[instrument(level = "debug", skip(self, profile), fields(points = profile.len()))]
    pub fn rotate_extrude(
        &self,
        profile: &Profile,
        params: &RotateExtrudeParams,
    ) -> Result<GenericMeshData, ExtrusionError> {
        let kind = ExtrusionType::RotateExtrude;
        validate_profile(kind, profile)?;

        if let Some(point) = profile.points.iter().find(|p| p.x < 0.0) {
            return Err(ExtrusionError::new(
                ErrorCode::InvalidProfile,
                kind,
                format!("profile crosses the rotation axis at x = {}", point.x),
            ));
        }

        let angle = params.angle.unwrap_or(360.0);
        if !(angle.is_finite() && angle > 0.0 && angle <= 360.0) {
            return Err(invalid(kind, format!("angle must be in (0, 360], got {angle}")));
        }

        let fn_ = params.fn_.unwrap_or(self.default_fn as f64);
        if !(fn_.is_finite() && fn_ >= 3.0) {
            return Err(invalid(kind, format!("$fn must be at least 3, got {fn_}")));
        }

        let min = self.fragments.min_segments.max(3);
        let max = self.fragments.max_segments.max(min);
        let full_segments = (fn_.floor().min(max as f64) as u32).clamp(min, max);
        let segments = if angle < 360.0 {
            ((full_segments as f64 * angle / 360.0).ceil() as u32).max(1)
        } else {
            full_segments
        };

        let start = Instant::now();
        let mesh = lathe(profile, angle, segments).map_err(|err| generation_failed(kind, err))?;

        let mut json = params_json(params);
        json["segments"] = segments.into();
        json["profilePoints"] = profile.len().into();
        finish(kind, GenericGeometry::from_mesh(mesh), json, start)
    }

    fn default_slices(&self, twist: f64) -> u32 {
        if twist == 0.0 || self.degrees_per_slice <= 0.0 {
            return 1;
        }
        let slices = (twist.abs() / self.degrees_per_slice).ceil();
        (slices.min(self.max_slices as f64) as u32).max(1)
    }
}

fn invalid(kind: ExtrusionType, message: impl Into<String>) -> ExtrusionError {
    ExtrusionError::new(ErrorCode::InvalidParameters, kind, message)
}

fn generation_failed(kind: ExtrusionType, err: impl fmt::Display) -> ExtrusionError {
    ExtrusionError::new(ErrorCode::GeometryGenerationFailed, kind, err.to_string())
}

fn validate_profile(kind: ExtrusionType, profile: &Profile) -> Result<(), ExtrusionError> {
    if profile.len() < 3 {
        return Err(ExtrusionError::new(
            ErrorCode::InvalidProfile,
            kind,
            format!("profile needs at least 3 points, got {}", profile.len()),
        ));
    }
    if let Some(i) = profile
        .points
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite()))
    {
        return Err(ExtrusionError::new(
            ErrorCode::InvalidProfile,
            kind,
            format!("profile point {i} is not finite"),
        ));
    }
    Ok(())
}

fn finish(
    kind: ExtrusionType,
    geometry: Result<GenericGeometry, crate::error::GeometryError>,
    params: serde_json::Value,
    start: Instant,
) -> Result<GenericMeshData, ExtrusionError> {
    let geometry = geometry.map_err(|err| generation_failed(kind, err))?;
    let elapsed = elapsed_ms(start);
    debug!(%kind, triangles = geometry.triangle_count(), elapsed_ms = elapsed, "extrusion built");

    let name = kind.to_string();
    Ok(MeshDataBuilder::new(&name, geometry)
        .parameters(&name, params)
        .generation_time(elapsed)
        .build())
}
