// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Material description attached to every mesh

use serde::{Deserialize, Serialize};
use std::fmt;

/// OpenSCAD statement prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modifier {
    /// `*`
    Disable,
    /// `!`
    ShowOnly,
    /// `#`
    Debug,
    /// `%`
    Background,
}

impl Modifier {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '*' => Some(Self::Disable),
            '!' => Some(Self::ShowOnly),
            '#' => Some(Self::Debug),
            '%' => Some(Self::Background),
            _ => None,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Self::Disable => '*',
            Self::ShowOnly => '!',
            Self::Debug => '#',
            Self::Background => '%',
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disable => "disable",
            Self::ShowOnly => "show_only",
            Self::Debug => "debug",
            Self::Background => "background",
        })
    }
}

/// Renderer-agnostic PBR material description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericMaterialConfig {
    pub diffuse_color: [f64; 3],
    pub specular_color: [f64; 3],
    pub emissive_color: [f64; 3],
    /// Opacity in `[0, 1]`
    pub alpha: f64,
    pub metallic: f64,
    pub roughness: f64,
    pub transparent: bool,
    pub wireframe: bool,
    pub is_debug_material: bool,
    pub is_background_material: bool,
    pub is_show_only_material: bool,
    pub is_disabled: bool,
}

impl Default for GenericMaterialConfig {
    fn default() -> Self {
        Self {
            diffuse_color: [0.8, 0.8, 0.8],
            specular_color: [0.2, 0.2, 0.2],
            emissive_color: [0.0, 0.0, 0.0],
            alpha: 1.0,
            metallic: 0.1,
            roughness: 0.8,
            transparent: false,
            wireframe: false,
            is_debug_material: false,
            is_background_material: false,
            is_show_only_material: false,
            is_disabled: false,
        }
    }
}

impl GenericMaterialConfig {
    /// Default material tinted with `color`; `transparent` follows alpha
    pub fn from_rgba(color: [f64; 4]) -> Self {
        let alpha = color[3].clamp(0.0, 1.0);
        Self {
            diffuse_color: [color[0], color[1], color[2]],
            alpha,
            transparent: alpha < 1.0,
            ..Self::default()
        }
    }

    /// Preset used to render a node prefixed with `modifier`
    pub fn for_modifier(modifier: Modifier) -> Self {
        match modifier {
            Modifier::Disable => Self {
                alpha: 0.0,
                transparent: true,
                is_disabled: true,
                ..Self::default()
            },
            Modifier::ShowOnly => Self {
                is_show_only_material: true,
                ..Self::default()
            },
            Modifier::Debug => Self {
                diffuse_color: [1.0, 0.0, 1.0],
                emissive_color: [0.3, 0.0, 0.3],
                alpha: 0.5,
                transparent: true,
                is_debug_material: true,
                ..Self::default()
            },
            Modifier::Background => Self {
                diffuse_color: [0.0, 0.5, 0.5],
                alpha: 0.3,
                transparent: true,
                is_background_material: true,
                ..Self::default()
            },
        }
    }
}
