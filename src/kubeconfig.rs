// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! GKE-style kubeconfig document rendering.

use crate::constants::gke;
use anyhow::{Context, Result};
use serde::Serialize;
use url::Url;

/// Connection details for a provisioned cluster.
#[derive(Debug, Clone)]
pub struct ClusterAccess {
    pub project: String,
    pub zone: String,
    pub cluster_name: String,
    /// Public address of the cluster API server, without scheme
    pub endpoint: String,
    /// Base64-encoded certificate authority data
    pub ca_data: String,
}

impl ClusterAccess {
    /// Identity used for the cluster, context, and user entries.
    /// Deterministic for a given (project, zone, cluster) triple.
    pub fn context_name(&self) -> String {
        format!("{}_{}_{}", self.project, self.zone, self.cluster_name)
    }

    /// Render the kubeconfig document consumed by kubectl and other clients.
    ///
    /// Field names and document shape follow the client tool's schema; the
    /// exec stanza delegates authentication to the GKE credential plugin.
    pub fn render(&self) -> Result<String> {
        let server = format!("https://{}", self.endpoint);
        Url::parse(&server)
            .with_context(|| format!("invalid cluster endpoint '{}'", self.endpoint))?;

        let name = self.context_name();
        let document = KubeconfigDoc {
            api_version: "v1",
            clusters: vec![NamedCluster {
                cluster: ClusterEntry {
                    certificate_authority_data: self.ca_data.clone(),
                    server,
                },
                name: name.clone(),
            }],
            contexts: vec![NamedContext {
                context: ContextEntry {
                    cluster: name.clone(),
                    user: name.clone(),
                },
                name: name.clone(),
            }],
            current_context: name.clone(),
            kind: "Config",
            preferences: Preferences {},
            users: vec![NamedUser {
                name,
                user: UserEntry {
                    exec: ExecEntry {
                        api_version: gke::AUTH_EXEC_API_VERSION,
                        command: gke::AUTH_PLUGIN_COMMAND,
                        install_hint: gke::AUTH_PLUGIN_INSTALL_HINT,
                        provide_cluster_info: true,
                    },
                },
            }],
        };

        serde_yaml::to_string(&document).context("failed to render kubeconfig")
    }
}

#[derive(Serialize)]
struct KubeconfigDoc {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    clusters: Vec<NamedCluster>,
    contexts: Vec<NamedContext>,
    #[serde(rename = "current-context")]
    current_context: String,
    kind: &'static str,
    preferences: Preferences,
    users: Vec<NamedUser>,
}

#[derive(Serialize)]
struct Preferences {}

#[derive(Serialize)]
struct NamedCluster {
    cluster: ClusterEntry,
    name: String,
}

#[derive(Serialize)]
struct ClusterEntry {
    #[serde(rename = "certificate-authority-data")]
    certificate_authority_data: String,
    server: String,
}

#[derive(Serialize)]
struct NamedContext {
    context: ContextEntry,
    name: String,
}

#[derive(Serialize)]
struct ContextEntry {
    cluster: String,
    user: String,
}

#[derive(Serialize)]
struct NamedUser {
    name: String,
    user: UserEntry,
}

#[derive(Serialize)]
struct UserEntry {
    exec: ExecEntry,
}

#[derive(Serialize)]
struct ExecEntry {
    #[serde(rename = "apiVersion")]
    api_version: &'static str,
    command: &'static str,
    #[serde(rename = "installHint")]
    install_hint: &'static str,
    #[serde(rename = "provideClusterInfo")]
    provide_cluster_info: bool,
}
