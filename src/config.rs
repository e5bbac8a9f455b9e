// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::gke;
use anyhow::{Context, Result};
use std::env;

/// Stack configuration loaded from environment variables.
///
/// Passed explicitly to the resource builders; nothing reads ambient
/// process state after this point.
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Google Cloud project the cluster lives in
    pub project: String,
    /// Compute zone for the cluster, e.g. `us-central1-a`
    pub zone: String,
    /// Number of cluster nodes to provision
    pub node_count: i32,
    /// Machine type for cluster nodes
    pub node_machine_type: String,
    /// GKE master/node version; backend default when unset
    pub master_version: Option<String>,
    /// Message the deployed application displays
    pub app_message: String,
}

impl StackConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let project = env::var("GCP_PROJECT").context("GCP_PROJECT environment variable not set")?;
        let zone = env::var("GCP_ZONE").context("GCP_ZONE environment variable not set")?;
        let node_count = env::var("NODE_COUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(gke::DEFAULT_NODE_COUNT);
        let node_machine_type =
            env::var("NODE_MACHINE_TYPE").unwrap_or_else(|_| gke::DEFAULT_MACHINE_TYPE.to_string());
        let master_version = env::var("MASTER_VERSION").ok();
        let app_message =
            env::var("APP_MESSAGE").unwrap_or_else(|_| "Hello from Groundwork!".to_string());

        Ok(StackConfig {
            project,
            zone,
            node_count,
            node_machine_type,
            master_version,
            app_message,
        })
    }

    /// Container registry repository for the project
    pub fn image_repository(&self) -> String {
        format!("gcr.io/{}", self.project)
    }
}
