// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean operation backends

use super::csg::{csg_difference, csg_intersection, csg_union};
use super::Mesh;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BooleanOp::Union => "union",
            BooleanOp::Difference => "difference",
            BooleanOp::Intersection => "intersection",
        })
    }
}

/// Result of one backend call
#[derive(Debug, Clone)]
pub struct BackendOutput {
    pub mesh: Mesh,
    pub elapsed: Duration,
}

impl BackendOutput {
    pub fn vertex_count(&self) -> usize {
        self.mesh.vertex_count()
    }

    pub fn triangle_count(&self) -> usize {
        self.mesh.triangle_count()
    }
}

/// Solid-modelling engine behind the CSG service.
///
/// Implementations receive closed meshes and report failures as plain
/// errors; callers wrap them into their own error records.
pub trait CsgBackend: Send + Sync {
    fn name(&self) -> &str;

    fn apply(&self, a: &Mesh, b: &Mesh, op: BooleanOp) -> Result<BackendOutput>;
}

/// Exact-plane BSP backend
#[derive(Debug, Clone, Copy)]
pub struct BspCsgBackend {
    epsilon: f64,
}

impl BspCsgBackend {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }
}

impl Default for BspCsgBackend {
    fn default() -> Self {
        Self::new(1e-5)
    }
}

impl CsgBackend for BspCsgBackend {
    fn name(&self) -> &str {
        "bsp"
    }

    fn apply(&self, a: &Mesh, b: &Mesh, op: BooleanOp) -> Result<BackendOutput> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            bail!("invalid plane epsilon {}", self.epsilon);
        }

        let start = Instant::now();
        let mesh = match op {
            BooleanOp::Union => csg_union(a, b, self.epsilon),
            BooleanOp::Difference => csg_difference(a, b, self.epsilon),
            BooleanOp::Intersection => csg_intersection(a, b, self.epsilon),
        };

        if mesh
            .vertices
            .iter()
            .any(|v| !v.position.coords.iter().all(|c| c.is_finite()))
        {
            bail!("{op} produced non-finite vertices");
        }

        Ok(BackendOutput {
            mesh,
            elapsed: start.elapsed(),
        })
    }
}
