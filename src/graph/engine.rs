// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Stack of declared resource nodes: validation, ordering, deployment.

use crate::backend::{ProvisionRequest, ProvisioningBackend};
use crate::error::{GroundworkError, Result};
use crate::graph::node::{Input, NodeHandle, NodeId, ResourceKind};
use crate::output::Output;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// Options attached to a node declaration.
#[derive(Default, Clone)]
pub struct ResourceOptions {
    /// Provider node used to issue this resource; `None` means the ambient
    /// default provider
    pub provider: Option<NodeHandle>,
    /// Grouping component this node belongs to. Scopes sibling names and
    /// display only, never an ordering edge.
    pub parent: Option<String>,
    /// Ordering edges beyond the ones implied by deferred inputs
    pub depends_on: Vec<NodeHandle>,
}

struct Node {
    id: NodeId,
    kind: ResourceKind,
    name: String,
    parent: Option<String>,
    inputs: BTreeMap<String, Input>,
    provider: Option<NodeId>,
    deps: BTreeSet<NodeId>,
    outputs: Output<BTreeMap<String, Value>>,
}

impl Node {
    fn display_name(&self) -> String {
        match &self.parent {
            Some(parent) => format!("{}/{}", parent, self.name),
            None => self.name.clone(),
        }
    }
}

/// Outcome of one node after a deployment pass.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeStatus {
    Created,
    /// The backend rejected or failed this node
    Failed(GroundworkError),
    /// Never attempted because an upstream node failed; carries the
    /// originating failure unchanged
    Skipped { cause: GroundworkError },
}

#[derive(Debug, Clone)]
pub struct NodeOutcome {
    pub name: String,
    pub kind: ResourceKind,
    pub status: NodeStatus,
}

/// Per-node results of a deployment pass. Partial success is first-class:
/// unrelated branches keep their own outcomes.
#[derive(Debug)]
pub struct DeploymentReport {
    entries: Vec<NodeOutcome>,
}

impl DeploymentReport {
    pub fn entries(&self) -> &[NodeOutcome] {
        &self.entries
    }

    /// Outcome for a node by display name (`parent/name` inside a component)
    pub fn outcome(&self, name: &str) -> Option<&NodeOutcome> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn fully_created(&self) -> bool {
        self.entries
            .iter()
            .all(|entry| entry.status == NodeStatus::Created)
    }

    pub fn created(&self) -> usize {
        self.count(|status| matches!(status, NodeStatus::Created))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, NodeStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, NodeStatus::Skipped { .. }))
    }

    fn count(&self, matcher: impl Fn(&NodeStatus) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| matcher(&entry.status))
            .count()
    }
}

/// The declared resource graph.
///
/// Nodes and their inputs are immutable once declared; outputs are
/// write-once cells populated during [`Stack::deploy`].
#[derive(Default)]
pub struct Stack {
    nodes: Vec<Node>,
}

impl Stack {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Declare a resource node.
    ///
    /// Fails with a validation error if the name collides with a sibling
    /// under the same parent, a required input for the kind is missing, or
    /// an input reads an output of a node not declared on this stack.
    pub fn declare(
        &mut self,
        kind: ResourceKind,
        name: &str,
        inputs: BTreeMap<String, Input>,
        options: ResourceOptions,
    ) -> Result<NodeHandle> {
        if name.is_empty() {
            return Err(GroundworkError::Validation(
                "node name must not be empty".to_string(),
            ));
        }
        if self
            .nodes
            .iter()
            .any(|node| node.parent == options.parent && node.name == name)
        {
            return Err(GroundworkError::Validation(match &options.parent {
                Some(parent) => {
                    format!("duplicate node name '{name}' under component '{parent}'")
                }
                None => format!("duplicate node name '{name}' at stack root"),
            }));
        }
        for required in kind.required_inputs() {
            if !inputs.contains_key(*required) {
                return Err(GroundworkError::Validation(format!(
                    "{kind} '{name}' is missing required input '{required}'"
                )));
            }
        }

        let id = NodeId(self.nodes.len());
        let mut deps: BTreeSet<NodeId> = inputs
            .values()
            .flat_map(|input| input.sources())
            .collect();
        if let Some(provider) = &options.provider {
            deps.insert(provider.id);
        }
        for dependency in &options.depends_on {
            deps.insert(dependency.id);
        }
        if deps.iter().any(|dep| dep.0 >= self.nodes.len()) {
            return Err(GroundworkError::Validation(format!(
                "{kind} '{name}' reads an output of a node not declared on this stack"
            )));
        }

        let outputs = Output::pending(BTreeSet::from([id]));
        let node = Node {
            id,
            kind,
            name: name.to_string(),
            parent: options.parent,
            inputs,
            provider: options.provider.map(|provider| provider.id),
            deps,
            outputs,
        };
        let handle = NodeHandle {
            id,
            kind,
            name: node.name.clone(),
            outputs: node.outputs.clone(),
        };
        debug!("Declared {} '{}'", kind, node.display_name());
        self.nodes.push(node);

        Ok(handle)
    }

    /// Topologically sort declared nodes by dependency edges.
    ///
    /// Deterministic: among nodes whose dependencies are satisfied, the
    /// earliest-declared goes first. Declared handles can only reference
    /// earlier nodes, so a cycle indicates a construction bug; it is still
    /// checked and reported.
    pub fn resolve_order(&self) -> Result<Vec<NodeHandle>> {
        let mut remaining: Vec<BTreeSet<NodeId>> =
            self.nodes.iter().map(|node| node.deps.clone()).collect();
        let mut dependents: Vec<Vec<NodeId>> = vec![Vec::new(); self.nodes.len()];
        for node in &self.nodes {
            for dep in &node.deps {
                dependents[dep.0].push(node.id);
            }
        }

        let mut ready: BTreeSet<NodeId> = self
            .nodes
            .iter()
            .filter(|node| node.deps.is_empty())
            .map(|node| node.id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.iter().next().copied() {
            ready.remove(&id);
            order.push(self.handle(id));
            for &dependent in &dependents[id.0] {
                remaining[dependent.0].remove(&id);
                if remaining[dependent.0].is_empty() {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.nodes.len() {
            let stuck: Vec<&str> = self
                .nodes
                .iter()
                .filter(|node| !remaining[node.id.0].is_empty())
                .map(|node| node.name.as_str())
                .collect();
            return Err(GroundworkError::CyclicDependency(stuck.join(", ")));
        }

        Ok(order)
    }

    /// Hand ordered creation requests to the backend.
    ///
    /// On success a node's outputs populate atomically, making every
    /// dependent deferred value eligible to resolve. On failure the node's
    /// outputs fail and all dependents are skipped with the originating
    /// error; branches with no dependency on the failed node continue.
    #[instrument(skip(self, backend))]
    pub async fn deploy(&self, backend: &dyn ProvisioningBackend) -> Result<DeploymentReport> {
        let order = self.resolve_order()?;
        info!("Deploying {} nodes", order.len());

        let mut entries = Vec::with_capacity(order.len());
        for handle in order {
            let node = &self.nodes[handle.id.0];
            let status = self.provision_node(node, backend).await;
            match &status {
                NodeStatus::Failed(error) | NodeStatus::Skipped { cause: error } => {
                    node.outputs.fail(error.clone());
                }
                NodeStatus::Created => {}
            }
            entries.push(NodeOutcome {
                name: node.display_name(),
                kind: node.kind,
                status,
            });
        }

        Ok(DeploymentReport { entries })
    }

    async fn provision_node(&self, node: &Node, backend: &dyn ProvisioningBackend) -> NodeStatus {
        for dep in &node.deps {
            if let Some(Err(cause)) = self.nodes[dep.0].outputs.settled() {
                warn!(
                    "Skipping {} '{}': upstream '{}' failed",
                    node.kind,
                    node.display_name(),
                    self.nodes[dep.0].name
                );
                return NodeStatus::Skipped { cause };
            }
        }

        let mut inputs = BTreeMap::new();
        for (field, input) in &node.inputs {
            match input {
                Input::Literal(value) => {
                    inputs.insert(field.clone(), value.clone());
                }
                Input::Deferred(output) => match output.settled() {
                    Some(Ok(value)) => {
                        inputs.insert(field.clone(), value);
                    }
                    // The source node provisioned but a transform on the way
                    // to this input failed.
                    Some(Err(cause)) => {
                        warn!(
                            "Skipping {} '{}': input '{}' failed: {}",
                            node.kind,
                            node.display_name(),
                            field,
                            cause
                        );
                        return NodeStatus::Skipped { cause };
                    }
                    None => {
                        return NodeStatus::Failed(GroundworkError::Validation(format!(
                            "input '{}' of '{}' never settled; was its source declared on this stack?",
                            field, node.name
                        )));
                    }
                },
            }
        }

        let request = ProvisionRequest {
            kind: node.kind,
            name: node.name.clone(),
            inputs,
            provider: node.provider.map(|id| self.nodes[id.0].name.clone()),
        };

        info!("Provisioning {} '{}'", node.kind, node.display_name());
        match backend.provision(request).await {
            Ok(outputs) => {
                node.outputs.resolve(outputs);
                NodeStatus::Created
            }
            Err(error) => {
                let error = GroundworkError::Provisioning {
                    node: node.name.clone(),
                    message: format!("{error:#}"),
                };
                warn!("{}", error);
                NodeStatus::Failed(error)
            }
        }
    }

    fn handle(&self, id: NodeId) -> NodeHandle {
        let node = &self.nodes[id.0];
        NodeHandle {
            id,
            kind: node.kind,
            name: node.name.clone(),
            outputs: node.outputs.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockBackend;
    use serde_json::json;

    fn image_inputs() -> BTreeMap<String, Input> {
        BTreeMap::from([(
            "image_name".to_string(),
            Input::from("gcr.io/proj1/gke-app"),
        )])
    }

    fn declare_image(stack: &mut Stack, name: &str) -> NodeHandle {
        stack
            .declare(
                ResourceKind::Image,
                name,
                image_inputs(),
                ResourceOptions::default(),
            )
            .unwrap()
    }

    fn declare_dependent_service(stack: &mut Stack, name: &str, upstream: &NodeHandle) -> NodeHandle {
        let spec = upstream
            .output("name")
            .map(|value| json!({ "backend": value }));
        stack
            .declare(
                ResourceKind::Service,
                name,
                BTreeMap::from([("spec".to_string(), Input::from(spec))]),
                ResourceOptions::default(),
            )
            .unwrap()
    }

    #[test]
    fn test_duplicate_sibling_name_rejected() {
        let mut stack = Stack::new();
        declare_image(&mut stack, "gke-app-image");

        let result = stack.declare(
            ResourceKind::Image,
            "gke-app-image",
            image_inputs(),
            ResourceOptions::default(),
        );

        assert!(matches!(result, Err(GroundworkError::Validation(_))));
    }

    #[test]
    fn test_same_name_under_different_parents_allowed() {
        let mut stack = Stack::new();
        stack
            .declare(
                ResourceKind::Image,
                "image",
                image_inputs(),
                ResourceOptions {
                    parent: Some("first".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let result = stack.declare(
            ResourceKind::Image,
            "image",
            image_inputs(),
            ResourceOptions {
                parent: Some("second".to_string()),
                ..Default::default()
            },
        );

        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_required_input_rejected() {
        let mut stack = Stack::new();
        let result = stack.declare(
            ResourceKind::Cluster,
            "gke-cluster",
            BTreeMap::from([("initial_node_count".to_string(), Input::from(json!(3)))]),
            ResourceOptions::default(),
        );

        match result {
            Err(GroundworkError::Validation(message)) => {
                assert!(message.contains("node_config"))
            }
            other => panic!("expected validation error, got {:?}", other.map(|h| h.name)),
        }
    }

    #[test]
    fn test_foreign_output_rejected() {
        let mut foreign = Stack::new();
        declare_image(&mut foreign, "a");
        let foreign_handle = declare_image(&mut foreign, "b");

        let mut stack = Stack::new();
        let spec = foreign_handle.output("name");
        let result = stack.declare(
            ResourceKind::Service,
            "svc",
            BTreeMap::from([("spec".to_string(), Input::from(spec))]),
            ResourceOptions::default(),
        );

        assert!(matches!(result, Err(GroundworkError::Validation(_))));
    }

    #[test]
    fn test_resolve_order_respects_dependencies() {
        let mut stack = Stack::new();
        let image = declare_image(&mut stack, "image");
        let service = declare_dependent_service(&mut stack, "service", &image);
        declare_dependent_service(&mut stack, "downstream", &service);

        let order = stack.resolve_order().unwrap();
        let names: Vec<&str> = order.iter().map(|handle| handle.name()).collect();

        let position = |name: &str| names.iter().position(|n| *n == name).unwrap();
        assert!(position("image") < position("service"));
        assert!(position("service") < position("downstream"));
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_resolve_order_is_declaration_order_for_independent_nodes() {
        let mut stack = Stack::new();
        declare_image(&mut stack, "first");
        declare_image(&mut stack, "second");
        declare_image(&mut stack, "third");

        let order = stack.resolve_order().unwrap();
        let names: Vec<&str> = order.iter().map(|handle| handle.name()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_resolve_order_detects_cycle() {
        let mut stack = Stack::new();
        let a = declare_image(&mut stack, "a");
        let b = stack
            .declare(
                ResourceKind::Image,
                "b",
                image_inputs(),
                ResourceOptions {
                    depends_on: vec![a.clone()],
                    ..Default::default()
                },
            )
            .unwrap();

        // Declared handles can only reference earlier nodes, so the
        // back-edge has to be forced in directly.
        stack.nodes[a.id().0].deps.insert(b.id());

        match stack.resolve_order() {
            Err(GroundworkError::CyclicDependency(stuck)) => {
                assert!(stuck.contains('a') && stuck.contains('b'))
            }
            other => panic!("expected cycle error, got {:?}", other.map(|o| o.len())),
        }
    }

    #[tokio::test]
    async fn test_deploy_populates_outputs() {
        let mut stack = Stack::new();
        let image = declare_image(&mut stack, "gke-app-image");
        let image_name = image.string_output("image_name");

        let backend = MockBackend::new().on_provision(
            "gke-app-image",
            json!({"image_name": "gcr.io/proj1/gke-app@sha256:abc"}),
        );

        let report = stack.deploy(&backend).await.unwrap();

        assert!(report.fully_created());
        assert_eq!(
            image_name.get(),
            Some("gcr.io/proj1/gke-app@sha256:abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_deploy_forwards_provider_binding() {
        let mut stack = Stack::new();
        let provider = stack
            .declare(
                ResourceKind::Provider,
                "gke-k8s",
                BTreeMap::from([("kubeconfig".to_string(), Input::from("apiVersion: v1"))]),
                ResourceOptions::default(),
            )
            .unwrap();
        stack
            .declare(
                ResourceKind::Service,
                "svc",
                BTreeMap::from([("spec".to_string(), Input::from(json!({})))]),
                ResourceOptions {
                    provider: Some(provider),
                    ..Default::default()
                },
            )
            .unwrap();

        let backend = MockBackend::new();
        stack.deploy(&backend).await.unwrap();

        let request = backend.request_for("svc").unwrap();
        assert_eq!(request.provider.as_deref(), Some("gke-k8s"));
    }

    #[tokio::test]
    async fn test_failure_skips_dependents_and_spares_unrelated_branches() {
        let mut stack = Stack::new();
        let failing = declare_image(&mut stack, "failing-image");
        declare_dependent_service(&mut stack, "dependent-service", &failing);
        declare_image(&mut stack, "healthy-image");

        let backend = MockBackend::new().failing("failing-image", "registry unavailable");
        let report = stack.deploy(&backend).await.unwrap();

        assert_eq!(report.created(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.skipped(), 1);

        match &report.outcome("dependent-service").unwrap().status {
            NodeStatus::Skipped { cause: GroundworkError::Provisioning { node, message } } => {
                assert_eq!(node, "failing-image");
                assert!(message.contains("registry unavailable"));
            }
            other => panic!("expected skip with provisioning cause, got {:?}", other),
        }
        assert!(matches!(
            report.outcome("healthy-image").unwrap().status,
            NodeStatus::Created
        ));

        // The skipped node never produced a provisioning request.
        let requested: Vec<String> = backend
            .requests()
            .into_iter()
            .map(|request| request.name)
            .collect();
        assert!(!requested.contains(&"dependent-service".to_string()));
    }

    #[tokio::test]
    async fn test_failure_propagates_unchanged_to_deferred_values() {
        let mut stack = Stack::new();
        let failing = declare_image(&mut stack, "failing-image");
        let derived = failing.string_output("image_name").map(|name| name.len());

        let backend = MockBackend::new().failing("failing-image", "quota exceeded");
        stack.deploy(&backend).await.unwrap();

        match derived.settled() {
            Some(Err(GroundworkError::Provisioning { node, .. })) => {
                assert_eq!(node, "failing-image")
            }
            other => panic!("expected provisioning failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transform_failure_skips_consumer_but_not_producer() {
        let mut stack = Stack::new();
        let image = declare_image(&mut stack, "image");
        let bad_input = image
            .output("image_name")
            .try_map(|_| -> anyhow::Result<Value> { Err(anyhow::anyhow!("mangled")) });
        stack
            .declare(
                ResourceKind::Service,
                "consumer",
                BTreeMap::from([("spec".to_string(), Input::from(bad_input))]),
                ResourceOptions::default(),
            )
            .unwrap();

        let backend = MockBackend::new();
        let report = stack.deploy(&backend).await.unwrap();

        assert!(matches!(
            report.outcome("image").unwrap().status,
            NodeStatus::Created
        ));
        match &report.outcome("consumer").unwrap().status {
            NodeStatus::Skipped { cause: GroundworkError::Transform(message) } => {
                assert!(message.contains("mangled"))
            }
            other => panic!("expected skip with transform cause, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_component_nodes_report_scoped_names() {
        let mut stack = Stack::new();
        stack
            .declare(
                ResourceKind::Image,
                "image",
                image_inputs(),
                ResourceOptions {
                    parent: Some("gke-app".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let backend = MockBackend::new();
        let report = stack.deploy(&backend).await.unwrap();

        assert!(report.outcome("gke-app/image").is_some());
        // The backend still sees the bare resource name.
        assert_eq!(backend.requests()[0].name, "image");
    }
}
