// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource node identities, kinds, and declared inputs.

use crate::error::{GroundworkError, Result};
use crate::output::Output;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Index of a node within its stack, assigned in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

/// The resource kinds the provisioning backend understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Cluster,
    Provider,
    Deployment,
    Service,
    Ingress,
    Image,
}

impl ResourceKind {
    /// Input fields that must be present at declaration time
    pub fn required_inputs(&self) -> &'static [&'static str] {
        match self {
            ResourceKind::Cluster => &["initial_node_count", "node_config"],
            ResourceKind::Provider => &["kubeconfig"],
            ResourceKind::Deployment | ResourceKind::Service | ResourceKind::Ingress => &["spec"],
            ResourceKind::Image => &["image_name"],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            ResourceKind::Cluster => "cluster",
            ResourceKind::Provider => "provider",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Service => "service",
            ResourceKind::Ingress => "ingress",
            ResourceKind::Image => "image",
        };
        f.write_str(kind)
    }
}

/// A declared input: either a literal value or an output read from another
/// node. The explicit tag lets the graph engine enumerate dependency edges
/// without inspecting values.
#[derive(Clone)]
pub enum Input {
    Literal(Value),
    Deferred(Output<Value>),
}

impl Input {
    /// Encode a serializable value as a literal input
    pub fn literal<T: Serialize>(value: &T) -> Result<Input> {
        serde_json::to_value(value)
            .map(Input::Literal)
            .map_err(|e| GroundworkError::Validation(format!("unencodable input value: {e}")))
    }

    /// Nodes this input reads from; empty for literals
    pub fn sources(&self) -> BTreeSet<NodeId> {
        match self {
            Input::Literal(_) => BTreeSet::new(),
            Input::Deferred(output) => output.sources().clone(),
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Literal(value)
    }
}

impl From<Output<Value>> for Input {
    fn from(output: Output<Value>) -> Self {
        Input::Deferred(output)
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Input::Literal(Value::String(value))
    }
}

/// Cheap cloneable handle to a declared node, exposing its deferred outputs.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    pub(crate) id: NodeId,
    pub(crate) kind: ResourceKind,
    pub(crate) name: String,
    pub(crate) outputs: Output<BTreeMap<String, Value>>,
}

impl NodeHandle {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All output fields as one deferred map, populated atomically when the
    /// backend confirms creation.
    pub fn outputs(&self) -> Output<BTreeMap<String, Value>> {
        self.outputs.clone()
    }

    /// Deferred view of a single output field. Fields the backend does not
    /// report resolve to `Value::Null`.
    pub fn output(&self, field: &str) -> Output<Value> {
        let field = field.to_string();
        self.outputs
            .map(move |outputs| outputs.get(&field).cloned().unwrap_or(Value::Null))
    }

    /// Deferred view of a string-typed output field
    pub fn string_output(&self, field: &str) -> Output<String> {
        let field_name = field.to_string();
        self.output(field).try_map(move |value| {
            value
                .as_str()
                .map(str::to_owned)
                .ok_or_else(|| anyhow::anyhow!("output field '{field_name}' is not a string"))
        })
    }
}
