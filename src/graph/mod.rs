// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource dependency graph: node declaration, ordering, and deployment.

pub mod engine;
pub mod node;

pub use engine::{DeploymentReport, NodeOutcome, NodeStatus, ResourceOptions, Stack};
pub use node::{Input, NodeHandle, NodeId, ResourceKind};
