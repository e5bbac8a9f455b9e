// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Contract between the resource graph and the external provisioning system.

use crate::graph::node::ResourceKind;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One ordered creation request handed to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionRequest {
    pub kind: ResourceKind,
    pub name: String,
    /// Declared inputs with every deferred value resolved to a concrete one
    pub inputs: BTreeMap<String, Value>,
    /// Name of the provider node issuing this resource; `None` means the
    /// ambient default provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Output fields reported by the backend for a provisioned node
pub type ProvisionOutputs = BTreeMap<String, Value>;

/// External system that materializes declared resources.
///
/// Implementations receive requests in dependency order and report either
/// the populated output fields or a failure per node. The graph engine
/// depends only on this request/response shape.
#[async_trait]
pub trait ProvisioningBackend: Send + Sync {
    async fn provision(&self, request: ProvisionRequest) -> anyhow::Result<ProvisionOutputs>;
}
