// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes provider bound to a provisioned cluster.

use crate::error::Result;
use crate::graph::{Input, NodeHandle, ResourceKind, ResourceOptions, Stack};
use crate::output::Output;
use serde_json::Value;
use std::collections::BTreeMap;

/// Declare a Kubernetes provider issuing resources against the cluster the
/// kubeconfig document points at. The document is usually still deferred on
/// the cluster's own outputs, which makes the provider depend on the cluster.
pub fn declare_provider(
    stack: &mut Stack,
    name: &str,
    kubeconfig: &Output<String>,
) -> Result<NodeHandle> {
    let inputs = BTreeMap::from([(
        "kubeconfig".to_string(),
        Input::Deferred(kubeconfig.map(Value::String)),
    )]);
    stack.declare(ResourceKind::Provider, name, inputs, ResourceOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockBackend;
    use serde_json::json;

    #[tokio::test]
    async fn test_provider_receives_rendered_kubeconfig() {
        let mut stack = Stack::new();
        let kubeconfig = Output::resolved("apiVersion: v1\nkind: Config\n".to_string());
        declare_provider(&mut stack, "gke-k8s", &kubeconfig).unwrap();

        let backend = MockBackend::new();
        stack.deploy(&backend).await.unwrap();

        let request = backend.request_for("gke-k8s").unwrap();
        assert_eq!(
            request.inputs["kubeconfig"],
            json!("apiVersion: v1\nkind: Config\n")
        );
    }
}
