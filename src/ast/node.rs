// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! AST node definitions
//!
//! Nodes arrive from an external parser and are only ever read.

use super::expr::Expr;
use crate::mesh::Modifier;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
    #[serde(default)]
    pub file: Option<String>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}:{}:{}", self.line, self.column),
            None => write!(f, "{}:{}", self.line, self.column),
        }
    }
}

/// Call-site argument, positional when `name` is `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    #[serde(default)]
    pub name: Option<String>,
    pub value: Expr,
}

impl Argument {
    pub fn positional(value: impl Into<Expr>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<Expr>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }
}

/// Module parameter with an optional default expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(default)]
    pub default: Option<Expr>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn with_default(name: impl Into<String>, default: impl Into<Expr>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// AST node representing a single statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub modifier: Option<Modifier>,
    #[serde(default)]
    pub location: Option<SourceLocation>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            id: None,
            modifier: None,
            location: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = Some(modifier);
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.location = Some(SourceLocation {
            line,
            column,
            file: None,
        });
        self
    }

    pub fn primitive(kind: PrimitiveKind, args: Vec<Argument>) -> Self {
        Self::new(NodeKind::Primitive { kind, args })
    }

    pub fn profile(kind: ProfileKind, args: Vec<Argument>) -> Self {
        Self::new(NodeKind::Profile { kind, args })
    }

    pub fn transform(kind: TransformKind, args: Vec<Argument>, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Transform {
            kind,
            args,
            children,
        })
    }

    pub fn csg(kind: CsgKind, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Csg { kind, children })
    }

    pub fn extrude(kind: ExtrudeKind, args: Vec<Argument>, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Extrude {
            kind,
            args,
            children,
        })
    }

    pub fn module_call(name: impl Into<String>, args: Vec<Argument>, children: Vec<Node>) -> Self {
        Self::new(NodeKind::ModuleInstantiation {
            name: name.into(),
            args,
            children,
        })
    }

    pub fn assign(name: impl Into<String>, value: impl Into<Expr>) -> Self {
        Self::new(NodeKind::Assignment {
            name: name.into(),
            value: value.into(),
        })
    }

    /// Short label for logs and error context
    pub fn describe(&self) -> String {
        match &self.location {
            Some(location) => format!("{} at {location}", self.kind.name()),
            None => self.kind.name().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Cube,
    Sphere,
    Cylinder,
}

/// 2D shapes, only meaningful as extrusion input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    Circle,
    Square,
    Polygon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Translate,
    Rotate,
    Scale,
    Mirror,
    Multmatrix,
    Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CsgKind {
    Union,
    Difference,
    Intersection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrudeKind {
    Linear,
    Rotate,
}

/// Types of AST nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Primitive {
        kind: PrimitiveKind,
        args: Vec<Argument>,
    },
    Profile {
        kind: ProfileKind,
        args: Vec<Argument>,
    },
    Transform {
        kind: TransformKind,
        args: Vec<Argument>,
        children: Vec<Node>,
    },
    Csg {
        kind: CsgKind,
        children: Vec<Node>,
    },
    Extrude {
        kind: ExtrudeKind,
        args: Vec<Argument>,
        children: Vec<Node>,
    },
    For {
        variable: String,
        iterable: Expr,
        body: Vec<Node>,
    },
    IntersectionFor {
        variable: String,
        iterable: Expr,
        body: Vec<Node>,
    },
    If {
        condition: Expr,
        then_branch: Vec<Node>,
        #[serde(default)]
        else_branch: Option<Vec<Node>>,
    },
    Let {
        bindings: Vec<(String, Expr)>,
        body: Vec<Node>,
    },
    Assignment {
        name: String,
        value: Expr,
    },
    ModuleDefinition {
        name: String,
        parameters: Vec<Parameter>,
        body: Vec<Node>,
    },
    ModuleInstantiation {
        name: String,
        args: Vec<Argument>,
        children: Vec<Node>,
    },
    Children {
        #[serde(default)]
        index: Option<Expr>,
    },
    Group(Vec<Node>),
}

impl NodeKind {
    /// OpenSCAD keyword for this node
    pub fn name(&self) -> &str {
        match self {
            NodeKind::Primitive { kind, .. } => match kind {
                PrimitiveKind::Cube => "cube",
                PrimitiveKind::Sphere => "sphere",
                PrimitiveKind::Cylinder => "cylinder",
            },
            NodeKind::Profile { kind, .. } => match kind {
                ProfileKind::Circle => "circle",
                ProfileKind::Square => "square",
                ProfileKind::Polygon => "polygon",
            },
            NodeKind::Transform { kind, .. } => match kind {
                TransformKind::Translate => "translate",
                TransformKind::Rotate => "rotate",
                TransformKind::Scale => "scale",
                TransformKind::Mirror => "mirror",
                TransformKind::Multmatrix => "multmatrix",
                TransformKind::Color => "color",
            },
            NodeKind::Csg { kind, .. } => match kind {
                CsgKind::Union => "union",
                CsgKind::Difference => "difference",
                CsgKind::Intersection => "intersection",
            },
            NodeKind::Extrude { kind, .. } => match kind {
                ExtrudeKind::Linear => "linear_extrude",
                ExtrudeKind::Rotate => "rotate_extrude",
            },
            NodeKind::For { .. } => "for",
            NodeKind::IntersectionFor { .. } => "intersection_for",
            NodeKind::If { .. } => "if",
            NodeKind::Let { .. } => "let",
            NodeKind::Assignment { .. } => "assignment",
            NodeKind::ModuleDefinition { .. } => "module",
            NodeKind::ModuleInstantiation { name, .. } => name,
            NodeKind::Children { .. } => "children",
            NodeKind::Group(_) => "group",
        }
    }

    /// Direct child statements
    pub fn children(&self) -> &[Node] {
        match self {
            NodeKind::Transform { children, .. }
            | NodeKind::Csg { children, .. }
            | NodeKind::Extrude { children, .. }
            | NodeKind::ModuleInstantiation { children, .. }
            | NodeKind::Group(children) => children,
            NodeKind::For { body, .. }
            | NodeKind::IntersectionFor { body, .. }
            | NodeKind::Let { body, .. }
            | NodeKind::ModuleDefinition { body, .. } => body,
            NodeKind::If { then_branch, .. } => then_branch,
            NodeKind::Primitive { .. }
            | NodeKind::Profile { .. }
            | NodeKind::Assignment { .. }
            | NodeKind::Children { .. } => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_includes_location() {
        let node = Node::primitive(PrimitiveKind::Cube, vec![Argument::positional(10.0)]).at(3, 5);
        assert_eq!(node.describe(), "cube at 3:5");
        assert_eq!(Node::module_call("gear", vec![], vec![]).describe(), "gear");
    }

    #[test]
    fn test_nodes_deserialize_from_json() {
        let json = serde_json::json!({
            "kind": {
                "csg": {
                    "kind": "difference",
                    "children": [
                        { "kind": { "primitive": { "kind": "cube", "args": [
                            { "value": { "number": 10.0 } }
                        ] } } },
                        { "kind": { "children": {} }, "modifier": "debug" }
                    ]
                }
            }
        });
        let node: Node = serde_json::from_value(json).unwrap();
        assert_eq!(node.kind.name(), "difference");
        assert_eq!(node.kind.children().len(), 2);
        assert_eq!(node.kind.children()[1].modifier, Some(Modifier::Debug));
    }
}
