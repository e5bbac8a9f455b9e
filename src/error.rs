// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Errors raised while declaring or provisioning the resource graph.
///
/// `Clone` because a single failure propagates into every dependent
/// deferred output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GroundworkError {
    #[error("Invalid declaration: {0}")]
    Validation(String),

    #[error("Dependency cycle among nodes: {0}")]
    CyclicDependency(String),

    #[error("Provisioning of '{node}' failed: {message}")]
    Provisioning { node: String, message: String },

    #[error("Output transform failed: {0}")]
    Transform(String),
}

pub type Result<T> = std::result::Result<T, GroundworkError>;
