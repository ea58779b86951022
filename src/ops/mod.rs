// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipeline services
//!
//! Each service turns parameters (and, for derived geometry, existing
//! mesh data) into new [`GenericMeshData`](crate::mesh::GenericMeshData).
//! Inputs are never mutated.

mod control_flow;
mod csg;
mod extrude;
mod modules;
mod primitive;
mod transform;

pub use control_flow::{
    Body, BodyResult, Condition, ControlFlowError, ControlFlowOperations, ControlFlowType,
    Iterable,
};
pub use csg::{CsgOperationError, CsgOperationType, CsgOperations};
pub use extrude::{
    ExtrudeScale, ExtrusionError, ExtrusionOperations, ExtrusionType, LinearExtrudeParams,
    RotateExtrudeParams,
};
pub use modules::{
    ChildrenScope, ModuleCall, ModuleError, ModuleOperation, ModuleScope, ModuleSystem,
    ResolvedModuleDefinition,
};
pub use primitive::{
    CubeParams, CubeSize, CylinderParams, FragmentParams, PrimitiveGenerationError,
    PrimitiveGenerator, PrimitiveType, SphereParams,
};
pub use transform::{
    rotation_matrix, ColorParams, MirrorParams, MultmatrixParams, RotateParams, ScaleFactor,
    ScaleParams, TransformType, TransformationError, TransformationOperations, TranslateParams,
};

use serde::Serialize;
use std::time::Instant;

pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Parameters as recorded in mesh metadata
pub(crate) fn params_json<T: Serialize>(params: &T) -> serde_json::Value {
    serde_json::to_value(params).unwrap_or(serde_json::Value::Null)
}
