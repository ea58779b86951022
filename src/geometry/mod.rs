// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - working mesh representation and operations

pub mod analytics;
mod bbox;
mod boolean;
pub mod csg;
pub mod extrude;
mod mesh;
pub mod mesh_utils;
mod primitives;
mod profile;

pub use bbox::BoundingBox;
pub use boolean::{BackendOutput, BooleanOp, BspCsgBackend, CsgBackend};
pub use extrude::{lathe, linear_sweep, SweepSettings};
pub use mesh::{Mesh, Triangle, Vertex};
pub use primitives::{calculate_fragments, Primitive};
pub use profile::Profile;
