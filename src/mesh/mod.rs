// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Generic mesh data model
//!
//! The output contract of the pipeline: immutable geometry buffers, a
//! material description and provenance metadata, with no renderer types.

mod builder;
mod data;
mod geometry;
mod material;
mod metadata;

pub use builder::{next_mesh_id, MeshDataBuilder};
pub use data::{CollectionMetadata, CollectionType, GenericMeshCollection, GenericMeshData, MeshOutput};
pub use geometry::GenericGeometry;
pub use material::{GenericMaterialConfig, Modifier};
pub use metadata::GenericMeshMetadata;
