// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use tracing::info;

use groundwork::config::StackConfig;
use groundwork::graph::Stack;
use groundwork::resources::build_gke_stack;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting groundwork");

    // Load configuration
    let config = StackConfig::from_env()?;
    info!(
        "Configuration loaded: project={} zone={} nodes={}",
        config.project, config.zone, config.node_count
    );

    // Declare the full resource graph
    let mut stack = Stack::new();
    build_gke_stack(&mut stack, &config)?;

    // Validate and log the ordered provisioning plan. Handing the requests
    // to a live backend happens outside this binary.
    let order = stack.resolve_order()?;
    info!("Provisioning plan ({} nodes):", order.len());
    for (position, node) in order.iter().enumerate() {
        info!("  {}. {} '{}'", position + 1, node.kind(), node.name());
    }
    info!("Plan is valid; exports (kubeconfig, ingress address) settle once a backend deploys it");

    Ok(())
}
