// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Abstract Syntax Tree module
//!
//! Read-only AST input, the expression language and the evaluator that
//! turns a tree into mesh data.

mod args;
mod evaluator;
mod expr;
mod node;
mod value;

pub use evaluator::Evaluator;
pub use expr::{BinaryOp, Expr, UnaryOp, ValueError};
pub use node::{
    Argument, CsgKind, ExtrudeKind, Node, NodeKind, Parameter, PrimitiveKind, ProfileKind,
    SourceLocation, TransformKind,
};
pub use value::{Value, VariableContext};
