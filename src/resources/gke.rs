// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Full stack assembly: image, cluster, provider, and application.

use crate::config::StackConfig;
use crate::error::Result;
use crate::graph::{Input, NodeHandle, ResourceKind, ResourceOptions, Stack};
use crate::output::Output;
use crate::resources::app::GkeApp;
use crate::resources::cluster::GkeCluster;
use crate::resources::provider::declare_provider;
use std::collections::BTreeMap;

/// Handles and exports of the declared GKE application stack.
pub struct GkeStack {
    pub image: NodeHandle,
    pub cluster: GkeCluster,
    pub provider: NodeHandle,
    pub app: GkeApp,
    /// Rendered kubeconfig for cluster access, exported to the caller
    pub kubeconfig: Output<String>,
}

impl GkeStack {
    /// Externally reachable address of the application, `None` while the
    /// load balancer is still provisioning
    pub fn ingress_address(&self) -> Output<Option<String>> {
        self.app.address.clone()
    }
}

/// Declare the complete stack in dependency order.
pub fn build_gke_stack(stack: &mut Stack, config: &StackConfig) -> Result<GkeStack> {
    let image = stack.declare(
        ResourceKind::Image,
        "gke-app-image",
        BTreeMap::from([
            (
                "image_name".to_string(),
                Input::from(format!("{}/gke-app", config.image_repository())),
            ),
            ("build_context".to_string(), Input::from("app")),
        ]),
        ResourceOptions::default(),
    )?;

    let cluster = GkeCluster::declare(stack, "gke-cluster", config)?;
    let kubeconfig = cluster.kubeconfig(config);
    let provider = declare_provider(stack, "gke-k8s", &kubeconfig)?;

    let app = GkeApp::declare(
        stack,
        "gke-app",
        &provider,
        image.string_output("image_name"),
        &config.app_message,
    )?;

    Ok(GkeStack {
        image,
        cluster,
        provider,
        app,
        kubeconfig,
    })
}
