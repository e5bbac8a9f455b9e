// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Labels, ports, and routing details of the deployed web application
pub mod app {
    /// Label selecting the application pods
    pub const LABEL_KEY: &str = "app";
    pub const LABEL_VALUE: &str = "gke-app";
    /// Container name inside the pod template
    pub const CONTAINER_NAME: &str = "gke-app";
    /// Environment variable carrying the display message
    pub const MESSAGE_ENV_VAR: &str = "MESSAGE";
    /// Public port the service listens on
    pub const SERVICE_PORT: i32 = 80;
    /// Port the application container listens on
    pub const CONTAINER_PORT: i32 = 8080;
    /// Ingress class annotation requesting the GCE load balancer
    pub const INGRESS_CLASS_ANNOTATION: &str = "kubernetes.io/ingress.class";
    pub const INGRESS_CLASS: &str = "gce";
}

/// GKE cluster defaults and credential plugin details
pub mod gke {
    pub const DEFAULT_NODE_COUNT: i32 = 3;
    pub const DEFAULT_MACHINE_TYPE: &str = "e2-micro";
    pub const NODE_DISK_SIZE_GB: i32 = 12;

    /// OAuth scopes granted to cluster nodes
    pub const OAUTH_SCOPES: [&str; 4] = [
        "https://www.googleapis.com/auth/compute",
        "https://www.googleapis.com/auth/devstorage.read_only",
        "https://www.googleapis.com/auth/logging.write",
        "https://www.googleapis.com/auth/monitoring",
    ];

    /// Credential helper the generated kubeconfig delegates to
    pub const AUTH_PLUGIN_COMMAND: &str = "gke-gcloud-auth-plugin";
    pub const AUTH_PLUGIN_INSTALL_HINT: &str = "Install gke-gcloud-auth-plugin for use with kubectl by following https://cloud.google.com/blog/products/containers-kubernetes/kubectl-auth-changes-in-gke";
    pub const AUTH_EXEC_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";
}
