// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipeline configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::warn;

/// Default config file looked up by [`PipelineConfig::load`]
pub const CONFIG_FILE: &str = "scadmesh.toml";

/// OpenSCAD fragment defaults and segment clamp bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FragmentDefaults {
    /// `$fa`: maximum angle per segment, degrees
    pub default_fa: f64,
    /// `$fs`: maximum segment length, model units
    pub default_fs: f64,
    pub min_segments: u32,
    pub max_segments: u32,
}

impl Default for FragmentDefaults {
    fn default() -> Self {
        Self {
            default_fa: 12.0,
            default_fs: 2.0,
            min_segments: 3,
            max_segments: 100,
        }
    }
}

/// Tunables for one pipeline session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fragments: FragmentDefaults,
    /// `$fn` used by rotate_extrude when none is given
    pub rotate_extrude_default_fn: u32,
    /// Twist angle covered by one slice when linear_extrude picks the slice count
    pub linear_extrude_degrees_per_slice: f64,
    /// Upper bound on linear_extrude slices, given or derived from twist
    pub max_extrude_slices: u32,
    /// Plane classification tolerance of the CSG backend
    pub csg_epsilon: f64,
    pub max_loop_iterations: usize,
    pub max_recursion_depth: usize,
    /// Reject non-watertight CSG inputs instead of warning
    pub require_watertight_csg_inputs: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fragments: FragmentDefaults::default(),
            rotate_extrude_default_fn: 16,
            linear_extrude_degrees_per_slice: 5.0,
            max_extrude_slices: 1000,
            csg_epsilon: 1e-5,
            max_loop_iterations: 1_000_000,
            max_recursion_depth: 256,
            require_watertight_csg_inputs: false,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: PipelineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if PathBuf::from(CONFIG_FILE).exists() {
            Self::from_file(CONFIG_FILE)?
        } else {
            Self::default()
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply `SCADMESH_*` overrides from `lookup`. A value that does not
    /// parse is logged and leaves the field unchanged.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        override_field(&lookup, "SCADMESH_MAX_RECURSION_DEPTH", &mut self.max_recursion_depth);
        override_field(&lookup, "SCADMESH_MAX_LOOP_ITERATIONS", &mut self.max_loop_iterations);
        override_field(&lookup, "SCADMESH_MAX_EXTRUDE_SLICES", &mut self.max_extrude_slices);
        override_field(
            &lookup,
            "SCADMESH_REQUIRE_WATERTIGHT",
            &mut self.require_watertight_csg_inputs,
        );
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }
}

fn override_field<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str, field: &mut T) {
    let Some(raw) = lookup(name) else {
        return;
    };
    match raw.trim().parse() {
        Ok(value) => *field = value,
        Err(_) => warn!(variable = name, value = %raw, "ignoring unparsable config override"),
    }
}
