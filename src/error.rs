// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error records shared by every pipeline service
//!
//! Services never panic across their boundary. Each failure is an
//! [`OperationError`] carrying a stable [`ErrorCode`], the originating
//! operation, a timestamp and optional structured details.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable error codes surfaced to the UI layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidParameters,
    InvalidProfile,
    InvalidMeshes,
    MeshGenerationFailed,
    TransformationFailed,
    GeometryGenerationFailed,
    OperationFailed,
    NoIntersection,
    EvaluationFailed,
    ModuleNotFound,
    InvalidChildren,
    MaterialCreationFailed,
    InvalidColor,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidParameters => "INVALID_PARAMETERS",
            ErrorCode::InvalidProfile => "INVALID_PROFILE",
            ErrorCode::InvalidMeshes => "INVALID_MESHES",
            ErrorCode::MeshGenerationFailed => "MESH_GENERATION_FAILED",
            ErrorCode::TransformationFailed => "TRANSFORMATION_FAILED",
            ErrorCode::GeometryGenerationFailed => "GEOMETRY_GENERATION_FAILED",
            ErrorCode::OperationFailed => "OPERATION_FAILED",
            ErrorCode::NoIntersection => "NO_INTERSECTION",
            ErrorCode::EvaluationFailed => "EVALUATION_FAILED",
            ErrorCode::ModuleNotFound => "MODULE_NOT_FOUND",
            ErrorCode::InvalidChildren => "INVALID_CHILDREN",
            ErrorCode::MaterialCreationFailed => "MATERIAL_CREATION_FAILED",
            ErrorCode::InvalidColor => "INVALID_COLOR",
        }
    }

    /// Codes raised by up-front validation, before any geometry work
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidParameters | ErrorCode::InvalidProfile | ErrorCode::InvalidMeshes
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged failure record produced by a pipeline service.
///
/// `O` identifies where the error came from, e.g. `PrimitiveType::Cube`
/// or `CsgOperationType::Intersection`.
#[derive(Debug, Clone, Error, Serialize)]
#[error("[{code}] {operation}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct OperationError<O>
where
    O: fmt::Debug + fmt::Display + Serialize,
{
    pub code: ErrorCode,
    pub message: String,
    pub operation: O,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<O> OperationError<O>
where
    O: fmt::Debug + fmt::Display + Serialize,
{
    pub fn new(code: ErrorCode, operation: O, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            operation,
            timestamp: Utc::now(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Violations of the mesh buffer invariants
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("position buffer length {0} is not a multiple of 3")]
    PositionLength(usize),

    #[error("index buffer length {0} is not a multiple of 3")]
    IndexLength(usize),

    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("{attribute} buffer has {actual} values, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        actual: usize,
        expected: usize,
    },

    #[error("non-finite vertex coordinate at vertex {0}")]
    NonFinite(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize)]
    struct Origin;

    impl fmt::Display for Origin {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("cube")
        }
    }

    #[test]
    fn test_error_display_and_serialization() {
        let err = OperationError::new(ErrorCode::MeshGenerationFailed, Origin, "size missing")
            .with_details(serde_json::json!({ "size": null }));

        assert_eq!(err.to_string(), "[MESH_GENERATION_FAILED] cube: size missing");

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "MESH_GENERATION_FAILED");
        assert_eq!(json["message"], "size missing");
        assert!(json.get("timestamp").is_some());
    }

    #[test]
    fn test_validation_codes() {
        assert!(ErrorCode::InvalidProfile.is_validation());
        assert!(!ErrorCode::GeometryGenerationFailed.is_validation());
    }
}
