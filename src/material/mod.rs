// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! OpenSCAD material service
//!
//! Maps `color()` inputs to materials. Materials are cached per service
//! on `{material type, color, alpha}`: an identical request returns the
//! same `Arc` as the first one.

mod colors;

pub use colors::{named_color, resolve_color, ColorError, ColorInput};

use crate::error::{ErrorCode, OperationError};
use crate::mesh::GenericMaterialConfig;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialOperation {
    CreateFromColor,
    ColorNode,
}

impl fmt::Display for MaterialOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MaterialOperation::CreateFromColor => "create_from_color",
            MaterialOperation::ColorNode => "color",
        })
    }
}

pub type OpenScadMaterialError = OperationError<MaterialOperation>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialType {
    #[default]
    Standard,
    Pbr,
    Unlit,
}

impl fmt::Display for MaterialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MaterialType::Standard => "standard",
            MaterialType::Pbr => "pbr",
            MaterialType::Unlit => "unlit",
        })
    }
}

/// Request for a material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialConfig {
    pub color: ColorInput,
    /// Overrides any alpha carried by the color
    #[serde(default)]
    pub alpha: Option<f64>,
    /// Display name; not part of the cache key
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub material_type: MaterialType,
}

impl MaterialConfig {
    pub fn new(color: impl Into<ColorInput>) -> Self {
        Self {
            color: color.into(),
            alpha: None,
            name: None,
            material_type: MaterialType::default(),
        }
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Cached material
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub name: String,
    pub material_type: MaterialType,
    pub config: GenericMaterialConfig,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct MaterialService {
    cache: DashMap<String, Arc<Material>>,
}

impl MaterialService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `config` to a material, reusing a cached one when possible
    #[instrument(level = "debug", skip(self, config), fields(color = ?config.color))]
    pub fn create_material_from_color(
        &self,
        config: &MaterialConfig,
    ) -> Result<Arc<Material>, OpenScadMaterialError> {
        let rgba = self.resolve(config, MaterialOperation::CreateFromColor)?;
        let key = cache_key(config.material_type, &rgba);

        if let Some(material) = self.cache.get(&key) {
            debug!(%key, "material cache hit");
            return Ok(Arc::clone(material.value()));
        }

        let material = Arc::new(Material {
            name: config
                .name
                .clone()
                .unwrap_or_else(|| format!("{}_material", config.material_type)),
            material_type: config.material_type,
            config: GenericMaterialConfig::from_rgba(rgba),
            created_at: Utc::now(),
        });

        // A concurrent insert under the same key wins; return that one
        let entry = self.cache.entry(key.clone()).or_insert_with(|| {
            info!(%key, "material cached");
            material
        });
        Ok(Arc::clone(entry.value()))
    }

    /// Material for a `color(c, alpha)` node
    pub fn create_material_from_color_node(
        &self,
        color: ColorInput,
        alpha: Option<f64>,
    ) -> Result<Arc<Material>, OpenScadMaterialError> {
        let config = MaterialConfig {
            color,
            alpha,
            name: None,
            material_type: MaterialType::Standard,
        };
        self.create_material_from_color(&config).map_err(|mut err| {
            err.operation = MaterialOperation::ColorNode;
            err
        })
    }

    fn resolve(
        &self,
        config: &MaterialConfig,
        operation: MaterialOperation,
    ) -> Result<[f64; 4], OpenScadMaterialError> {
        let mut rgba = resolve_color(&config.color).map_err(|err| {
            OpenScadMaterialError::new(ErrorCode::InvalidColor, operation, err.to_string())
                .with_details(serde_json::json!({ "color": config.color }))
        })?;

        if let Some(alpha) = config.alpha {
            if !alpha.is_finite() {
                return Err(OpenScadMaterialError::new(
                    ErrorCode::MaterialCreationFailed,
                    operation,
                    format!("alpha must be a finite number, got {alpha}"),
                ));
            }
            rgba[3] = alpha.clamp(0.0, 1.0);
        }

        Ok(rgba)
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

fn cache_key(material_type: MaterialType, rgba: &[f64; 4]) -> String {
    format!(
        "{material_type}:{:.6},{:.6},{:.6}:{:.6}",
        rgba[0], rgba[1], rgba[2], rgba[3]
    )
}
