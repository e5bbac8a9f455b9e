// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! GKE cluster declaration and kubeconfig composition.

use crate::config::StackConfig;
use crate::constants::gke;
use crate::error::Result;
use crate::graph::{Input, NodeHandle, ResourceKind, ResourceOptions, Stack};
use crate::kubeconfig::ClusterAccess;
use crate::output::{join3, Output};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// A managed Kubernetes cluster node.
#[derive(Debug, Clone)]
pub struct GkeCluster {
    handle: NodeHandle,
}

impl GkeCluster {
    /// Declare the cluster with node pool settings from the configuration
    pub fn declare(stack: &mut Stack, name: &str, config: &StackConfig) -> Result<Self> {
        let mut inputs: BTreeMap<String, Input> = BTreeMap::from([
            (
                "initial_node_count".to_string(),
                Input::from(json!(config.node_count)),
            ),
            (
                "deletion_protection".to_string(),
                Input::from(json!(false)),
            ),
            (
                "node_config".to_string(),
                Input::from(json!({
                    "machine_type": config.node_machine_type,
                    "disk_size_gb": gke::NODE_DISK_SIZE_GB,
                    "oauth_scopes": gke::OAUTH_SCOPES,
                })),
            ),
        ]);
        if let Some(version) = &config.master_version {
            inputs.insert("node_version".to_string(), Input::from(json!(version)));
            inputs.insert(
                "min_master_version".to_string(),
                Input::from(json!(version)),
            );
        }

        let handle = stack.declare(
            ResourceKind::Cluster,
            name,
            inputs,
            ResourceOptions::default(),
        )?;
        Ok(Self { handle })
    }

    pub fn handle(&self) -> &NodeHandle {
        &self.handle
    }

    /// Kubeconfig document for this cluster, composed from its name,
    /// endpoint, and certificate authority once provisioning reports them.
    pub fn kubeconfig(&self, config: &StackConfig) -> Output<String> {
        let name = self.handle.string_output("name");
        let endpoint = self.handle.string_output("endpoint");
        let ca_data = self.handle.output("master_auth").try_map(|auth| {
            auth.pointer("/cluster_ca_certificate")
                .and_then(Value::as_str)
                .map(str::to_owned)
                .ok_or_else(|| anyhow::anyhow!("master_auth output has no cluster_ca_certificate"))
        });

        let project = config.project.clone();
        let zone = config.zone.clone();
        join3(&name, &endpoint, &ca_data).try_map(move |(cluster_name, endpoint, ca_data)| {
            ClusterAccess {
                project,
                zone,
                cluster_name,
                endpoint,
                ca_data,
            }
            .render()
        })
    }
}
