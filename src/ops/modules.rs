// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! User module registry, instantiation and `children()`

use super::control_flow::BodyResult;
use crate::ast::{Argument, Node, Parameter, SourceLocation, Value, VariableContext};
use crate::config::PipelineConfig;
use crate::error::{ErrorCode, OperationError};
use crate::mesh::{CollectionType, GenericMeshCollection, MeshOutput};
use ahash::AHashMap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleOperation {
    Define,
    Instantiate,
    Children,
}

impl fmt::Display for ModuleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModuleOperation::Define => "module",
            ModuleOperation::Instantiate => "instantiate",
            ModuleOperation::Children => "children",
        })
    }
}

pub type ModuleError = OperationError<ModuleOperation>;

/// A registered `module name(params) { body }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedModuleDefinition {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: Vec<Node>,
    #[serde(default)]
    pub source_location: Option<SourceLocation>,
}

/// Children passed to a module instantiation, with the scope they are
/// evaluated in. `parent` is the caller's own scope, so `children()`
/// inside a child resolves one level further out.
#[derive(Debug, Clone, Copy)]
pub struct ChildrenScope<'a> {
    pub nodes: &'a [Node],
    pub context: &'a VariableContext,
    pub parent: Option<&'a ChildrenScope<'a>>,
    /// Modules visible at the call site
    pub modules: Option<&'a ModuleScope<'a>>,
    /// Module nesting depth of the caller
    pub depth: usize,
}

/// Modules defined inside a module body. Visible to that body and to
/// everything it calls, never to the global registry.
#[derive(Debug, Default)]
pub struct ModuleScope<'a> {
    definitions: AHashMap<String, Arc<ResolvedModuleDefinition>>,
    parent: Option<&'a ModuleScope<'a>>,
}

impl<'a> ModuleScope<'a> {
    pub fn new(parent: Option<&'a ModuleScope<'a>>) -> Self {
        Self {
            definitions: AHashMap::new(),
            parent,
        }
    }

    pub fn define(&mut self, definition: ResolvedModuleDefinition) -> Result<(), ModuleError> {
        check_name(&definition)?;
        debug!(module = %definition.name, "local module defined");
        self.definitions
            .insert(definition.name.clone(), Arc::new(definition));
        Ok(())
    }

    /// Innermost definition of `name`
    pub fn lookup(&self, name: &str) -> Option<Arc<ResolvedModuleDefinition>> {
        match self.definitions.get(name) {
            Some(definition) => Some(Arc::clone(definition)),
            None => self.parent.and_then(|parent| parent.lookup(name)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn check_name(definition: &ResolvedModuleDefinition) -> Result<(), ModuleError> {
    if definition.name.is_empty() {
        return Err(ModuleError::new(
            ErrorCode::InvalidParameters,
            ModuleOperation::Define,
            "module name is empty",
        ));
    }
    Ok(())
}

/// One module call site
#[derive(Debug, Clone, Copy)]
pub struct ModuleCall<'a> {
    pub name: &'a str,
    pub args: &'a [Argument],
    pub children: &'a [Node],
    pub context: &'a VariableContext,
    pub scope: Option<&'a ChildrenScope<'a>>,
    pub modules: Option<&'a ModuleScope<'a>>,
    pub depth: usize,
}

#[derive(Debug)]
pub struct ModuleSystem {
    registry: DashMap<String, Arc<ResolvedModuleDefinition>>,
    max_depth: usize,
}

impl Default for ModuleSystem {
    fn default() -> Self {
        Self::new(&PipelineConfig::default())
    }
}

impl ModuleSystem {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            registry: DashMap::new(),
            max_depth: config.max_recursion_depth,
        }
    }

    /// Register `definition`, replacing any module with the same name
    pub fn register(&self, definition: ResolvedModuleDefinition) -> Result<(), ModuleError> {
        check_name(&definition)?;
        let name = definition.name.clone();
        let replaced = self
            .registry
            .insert(name.clone(), Arc::new(definition))
            .is_some();
        info!(module = %name, replaced, "module registered");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<ResolvedModuleDefinition>> {
        self.registry.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn has(&self, name: &str) -> bool {
        self.registry.contains_key(name)
    }

    pub fn count(&self) -> usize {
        self.registry.len()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.registry.clear();
    }

    /// Instantiate a module, local definitions first, then the registry.
    ///
    /// `body` receives the definition, the bound module scope and the
    /// children of this call; it evaluates the module body.
    #[instrument(level = "debug", skip_all, fields(module = call.name, depth = call.depth))]
    pub fn instantiate_module<F>(&self, call: &ModuleCall<'_>, body: F) -> BodyResult
    where
        F: FnOnce(&ResolvedModuleDefinition, &VariableContext, &ChildrenScope<'_>) -> BodyResult,
    {
        let local = call.modules.and_then(|modules| modules.lookup(call.name));
        let definition = local.or_else(|| self.get(call.name)).ok_or_else(|| {
            ModuleError::new(
                ErrorCode::ModuleNotFound,
                ModuleOperation::Instantiate,
                format!("module `{}` is not defined", call.name),
            )
            .with_details(serde_json::json!({ "available": self.names() }))
        })?;

        if call.depth >= self.max_depth {
            return Err(ModuleError::new(
                ErrorCode::EvaluationFailed,
                ModuleOperation::Instantiate,
                format!(
                    "module `{}` exceeds the nesting limit of {}",
                    call.name, self.max_depth
                ),
            )
            .into());
        }

        let scope = self.bind_parameters(&definition, call.args, call.children.len(), call.context)?;
        let children = ChildrenScope {
            nodes: call.children,
            context: call.context,
            parent: call.scope,
            modules: call.modules,
            depth: call.depth,
        };
        debug!(module = call.name, children = call.children.len(), "instantiating");
        body(&definition, &scope, &children)
    }

    /// Build the module scope for one call.
    ///
    /// Each parameter takes, in order: the named argument, the positional
    /// argument at its index, its default (evaluated with the parameters
    /// bound so far), or `undef`. `$`-prefixed named arguments are forwarded
    /// into the scope and `$children` is set to `child_count`.
    pub fn bind_parameters(
        &self,
        definition: &ResolvedModuleDefinition,
        args: &[Argument],
        child_count: usize,
        caller: &VariableContext,
    ) -> Result<VariableContext, ModuleError> {
        let evaluation_failed = |err: crate::ast::ValueError| {
            ModuleError::new(
                ErrorCode::EvaluationFailed,
                ModuleOperation::Instantiate,
                format!("argument of `{}`: {err}", definition.name),
            )
        };

        let mut named: HashMap<&str, Value> = HashMap::new();
        let mut positional = Vec::new();
        for arg in args {
            let value = arg.value.evaluate(caller).map_err(evaluation_failed)?;
            match &arg.name {
                Some(name) => {
                    named.insert(name.as_str(), value);
                }
                None => positional.push(value),
            }
        }

        if positional.len() > definition.parameters.len() {
            warn!(
                module = %definition.name,
                extra = positional.len() - definition.parameters.len(),
                "ignoring extra positional arguments"
            );
        }

        let mut scope = caller.child([("$children".to_string(), Value::Number(child_count as f64))]);
        for (i, parameter) in definition.parameters.iter().enumerate() {
            let value = match named.remove(parameter.name.as_str()) {
                Some(value) => value,
                None => match positional.get(i) {
                    Some(value) => value.clone(),
                    None => match &parameter.default {
                        Some(default) => default.evaluate(&scope).map_err(evaluation_failed)?,
                        None => Value::Undef,
                    },
                },
            };
            scope.set(parameter.name.clone(), value);
        }

        for (name, value) in named {
            if name.starts_with('$') {
                scope.set(name, value);
            } else {
                warn!(module = %definition.name, argument = name, "unknown named argument");
            }
        }
        Ok(scope)
    }

    /// Resolve `children()` or `children(index)` inside a module body.
    ///
    /// Without an index every child is evaluated, failures are logged and
    /// skipped. An index outside the available children is
    /// `INVALID_CHILDREN`.
    pub fn resolve_children<F>(
        &self,
        scope: &ChildrenScope<'_>,
        index: Option<f64>,
        mut evaluate: F,
    ) -> Result<MeshOutput, ModuleError>
    where
        F: FnMut(&Node) -> BodyResult,
    {
        let Some(index) = index else {
            let mut outputs = Vec::with_capacity(scope.nodes.len());
            for (i, node) in scope.nodes.iter().enumerate() {
                match evaluate(node) {
                    Ok(Some(output)) => outputs.push(output),
                    Ok(None) => {}
                    Err(err) => warn!(
                        child = i,
                        node = %node.describe(),
                        error = %format!("{err:#}"),
                        "skipping failed child"
                    ),
                }
            }
            return Ok(MeshOutput::Collection(GenericMeshCollection::from_outputs(
                CollectionType::ControlFlowResult,
                outputs,
            )));
        };

        let count = scope.nodes.len();
        let node = (index.is_finite() && index >= 0.0 && index.fract() == 0.0)
            .then(|| scope.nodes.get(index as usize))
            .flatten()
            .ok_or_else(|| {
                ModuleError::new(
                    ErrorCode::InvalidChildren,
                    ModuleOperation::Children,
                    format!("child index {index} is out of range for {count} children"),
                )
            })?;

        match evaluate(node) {
            Ok(Some(output)) => Ok(output),
            Ok(None) => Ok(MeshOutput::Collection(GenericMeshCollection::empty(
                CollectionType::ControlFlowResult,
            ))),
            Err(err) => Err(ModuleError::new(
                ErrorCode::EvaluationFailed,
                ModuleOperation::Children,
                format!("{err:#}"),
            )),
        }
    }
}
