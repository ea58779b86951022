// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Call-site argument resolution for the built-in modules

use super::expr::ValueError;
use super::node::Argument;
use super::value::{Value, VariableContext};
use crate::geometry::Profile;
use crate::material::ColorInput;
use crate::ops::{
    ColorParams, CubeParams, CubeSize, CylinderParams, ExtrudeScale, FragmentParams,
    LinearExtrudeParams, MirrorParams, MultmatrixParams, RotateExtrudeParams, RotateParams,
    ScaleFactor, ScaleParams, SphereParams, TranslateParams,
};
use anyhow::{bail, Result};
use nalgebra::Point2;

/// Evaluated arguments of one call
#[derive(Debug, Clone, Default)]
pub(crate) struct Arguments {
    named: Vec<(String, Value)>,
    positional: Vec<Value>,
}

impl Arguments {
    pub(crate) fn evaluate(args: &[Argument], ctx: &VariableContext) -> Result<Self, ValueError> {
        let mut evaluated = Self::default();
        for arg in args {
            let value = arg.value.evaluate(ctx)?;
            match &arg.name {
                Some(name) => evaluated.named.push((name.clone(), value)),
                None => evaluated.positional.push(value),
            }
        }
        Ok(evaluated)
    }

    /// Named argument, else the positional one at `position`. `undef`
    /// counts as absent.
    pub(crate) fn get(&self, name: &str, position: Option<usize>) -> Option<&Value> {
        self.named
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
            .or_else(|| position.and_then(|i| self.positional.get(i)))
            .filter(|value| !value.is_undef())
    }

    pub(crate) fn number(&self, name: &str, position: Option<usize>) -> Option<f64> {
        self.get(name, position).and_then(Value::as_f64)
    }

    pub(crate) fn flag(&self, name: &str, position: Option<usize>) -> bool {
        self.get(name, position).is_some_and(Value::is_truthy)
    }

    /// `$fn`, `$fa`, `$fs` from the call, falling back to the scope
    pub(crate) fn fragments(&self, ctx: &VariableContext) -> FragmentParams {
        let special = |name: &str| {
            self.number(name, None)
                .or_else(|| ctx.get(name).and_then(Value::as_f64))
        };
        FragmentParams {
            fn_: special("$fn"),
            fa: special("$fa"),
            fs: special("$fs"),
        }
    }
}

/// Numbers of a vector value padded to `len` with `fill`
fn padded(value: &Value, len: usize, fill: f64) -> Option<Vec<f64>> {
    let mut numbers = value.as_numbers()?;
    if numbers.len() < len {
        numbers.resize(len, fill);
    }
    Some(numbers)
}

pub(crate) fn cube_params(args: &Arguments) -> CubeParams {
    let size = match args.get("size", Some(0)) {
        None => Some(CubeSize::Uniform(1.0)),
        Some(Value::Number(s)) => Some(CubeSize::Uniform(*s)),
        Some(value) => value
            .as_numbers()
            .and_then(|n| <[f64; 3]>::try_from(n).ok())
            .map(CubeSize::Axes),
    };
    CubeParams {
        size,
        center: args.flag("center", Some(1)),
    }
}

pub(crate) fn sphere_params(args: &Arguments, ctx: &VariableContext) -> SphereParams {
    SphereParams {
        radius: args.number("r", Some(0)),
        diameter: args.number("d", None),
        fragments: args.fragments(ctx),
    }
}

pub(crate) fn cylinder_params(args: &Arguments, ctx: &VariableContext) -> CylinderParams {
    let height = match args.get("h", Some(0)) {
        None => Some(1.0),
        Some(value) => value.as_f64(),
    };
    CylinderParams {
        height,
        radius: args.number("r", None),
        radius1: args.number("r1", Some(1)),
        radius2: args.number("r2", Some(2)),
        diameter: args.number("d", None),
        diameter1: args.number("d1", None),
        diameter2: args.number("d2", None),
        center: args.flag("center", Some(3)),
        fragments: args.fragments(ctx),
    }
}

/// Parameters of one transformation node
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TransformStep {
    Translate(TranslateParams),
    Rotate(RotateParams),
    Scale(ScaleParams),
    Mirror(MirrorParams),
    Multmatrix(MultmatrixParams),
    Color(ColorParams),
}

impl TransformStep {
    pub(crate) fn translate(args: &Arguments) -> Self {
        let vector = args
            .get("v", Some(0))
            .and_then(|v| padded(v, 3, 0.0))
            .unwrap_or_default();
        TransformStep::Translate(TranslateParams { vector })
    }

    pub(crate) fn rotate(args: &Arguments) -> Self {
        let params = match args.get("a", Some(0)) {
            Some(Value::Number(angle)) => RotateParams {
                angle: Some(*angle),
                axis: args.get("v", Some(1)).and_then(|v| padded(v, 3, 0.0)),
                vector: None,
            },
            Some(angles) => RotateParams {
                vector: Some(padded(angles, 3, 0.0).unwrap_or_default()),
                ..RotateParams::default()
            },
            None => RotateParams {
                vector: Some(vec![0.0; 3]),
                ..RotateParams::default()
            },
        };
        TransformStep::Rotate(params)
    }

    pub(crate) fn scale(args: &Arguments) -> Self {
        let factor = match args.get("v", Some(0)) {
            Some(Value::Number(s)) => ScaleFactor::Uniform(*s),
            Some(value) => ScaleFactor::Axes(padded(value, 3, 1.0).unwrap_or_default()),
            None => ScaleFactor::Uniform(1.0),
        };
        TransformStep::Scale(ScaleParams { factor })
    }

    pub(crate) fn mirror(args: &Arguments) -> Self {
        let normal = match args.get("v", Some(0)) {
            Some(value) => padded(value, 3, 0.0).unwrap_or_default(),
            None => vec![1.0, 0.0, 0.0],
        };
        TransformStep::Mirror(MirrorParams { normal })
    }

    /// Accepts 4×4 and the common 3×4 form (bottom row implied)
    pub(crate) fn multmatrix(args: &Arguments) -> Self {
        let mut matrix: Vec<Vec<f64>> = args
            .get("m", Some(0))
            .and_then(Value::as_vector)
            .map(|rows| rows.iter().filter_map(Value::as_numbers).collect())
            .unwrap_or_default();
        if matrix.len() == 3 {
            matrix.push(vec![0.0, 0.0, 0.0, 1.0]);
        }
        TransformStep::Multmatrix(MultmatrixParams { matrix })
    }

    pub(crate) fn color(args: &Arguments) -> Self {
        let color = match args.get("c", Some(0)) {
            Some(Value::String(name)) => ColorInput::from(name.as_str()),
            Some(value) => ColorInput::from(value.as_numbers().unwrap_or_default()),
            None => ColorInput::from(Vec::new()),
        };
        TransformStep::Color(ColorParams {
            color,
            alpha: args.number("alpha", Some(1)),
        })
    }
}

pub(crate) fn linear_extrude_params(args: &Arguments) -> LinearExtrudeParams {
    let defaults = LinearExtrudeParams::default();
    let scale = match args.get("scale", Some(5)) {
        Some(Value::Number(s)) => ExtrudeScale::Uniform(*s),
        Some(value) => match value.as_numbers().as_deref() {
            Some([x, y]) => ExtrudeScale::Axes([*x, *y]),
            _ => ExtrudeScale::Uniform(f64::NAN),
        },
        None => defaults.scale,
    };
    LinearExtrudeParams {
        height: args.number("height", Some(0)).unwrap_or(defaults.height),
        center: args.flag("center", Some(1)),
        twist: args.number("twist", Some(3)).unwrap_or(defaults.twist),
        scale,
        // NaN and < 1 fall back to the default; anything too large saturates
        // and is rejected by the extrusion service
        slices: args
            .number("slices", Some(4))
            .filter(|s| *s >= 1.0)
            .map(|s| s as u32),
    }
}

pub(crate) fn rotate_extrude_params(args: &Arguments, ctx: &VariableContext) -> RotateExtrudeParams {
    RotateExtrudeParams {
        angle: args.number("angle", None),
        fn_: args.fragments(ctx).fn_.filter(|f| *f > 0.0),
    }
}

pub(crate) fn square_profile(args: &Arguments) -> Result<Profile> {
    let (width, depth) = match args.get("size", Some(0)) {
        None => (1.0, 1.0),
        Some(Value::Number(s)) => (*s, *s),
        Some(value) => match value.as_numbers().as_deref() {
            Some([w, d]) => (*w, *d),
            _ => bail!("square size must be a number or [x, y], got {value}"),
        },
    };
    if !(width.is_finite() && depth.is_finite() && width > 0.0 && depth > 0.0) {
        bail!("square size must be positive, got [{width}, {depth}]");
    }
    Ok(Profile::square(width, depth, args.flag("center", Some(1))))
}

/// Circle radius from `r`, then `d`, then 1
pub(crate) fn circle_radius(args: &Arguments) -> Result<f64> {
    let radius = args
        .number("r", Some(0))
        .or_else(|| args.number("d", None).map(|d| d / 2.0))
        .unwrap_or(1.0);
    if !(radius.is_finite() && radius > 0.0) {
        bail!("circle radius must be positive, got {radius}");
    }
    Ok(radius)
}

pub(crate) fn polygon_profile(args: &Arguments) -> Result<Profile> {
    let Some(points) = args.get("points", Some(0)).and_then(Value::as_vector) else {
        bail!("polygon needs a list of points");
    };
    if args.get("paths", Some(1)).is_some() {
        tracing::warn!("polygon paths are not supported; using the outline of all points");
    }
    let points = points
        .iter()
        .map(|point| match point.as_numbers().as_deref() {
            Some([x, y]) => Ok(Point2::new(*x, *y)),
            _ => bail!("polygon point must be [x, y], got {point}"),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Profile::new(points))
}
