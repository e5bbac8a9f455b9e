// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking the provisioning backend.

use crate::backend::{ProvisionOutputs, ProvisionRequest, ProvisioningBackend};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// A mock backend that returns scripted outputs per node name and records
/// every request it receives.
#[derive(Clone)]
pub struct MockBackend {
    responses: Arc<Mutex<HashMap<String, Result<ProvisionOutputs, String>>>>,
    requests: Arc<Mutex<Vec<ProvisionRequest>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script successful outputs for the named node
    pub fn on_provision(self, name: &str, outputs: Value) -> Self {
        let outputs = outputs
            .as_object()
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        self.responses
            .lock()
            .unwrap()
            .insert(name.to_string(), Ok(outputs));
        self
    }

    /// Script a provisioning failure for the named node
    pub fn failing(self, name: &str, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(name.to_string(), Err(message.to_string()));
        self
    }

    /// All requests received so far, in order
    pub fn requests(&self) -> Vec<ProvisionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The first request received for the named node
    pub fn request_for(&self, name: &str) -> Option<ProvisionRequest> {
        self.requests()
            .into_iter()
            .find(|request| request.name == name)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProvisioningBackend for MockBackend {
    async fn provision(&self, request: ProvisionRequest) -> anyhow::Result<ProvisionOutputs> {
        self.requests.lock().unwrap().push(request.clone());

        let scripted = self.responses.lock().unwrap().get(&request.name).cloned();
        match scripted {
            Some(Ok(outputs)) => Ok(outputs),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            // Unscripted nodes succeed with a generated object name.
            None => Ok(BTreeMap::from([(
                "name".to_string(),
                json!(format!("{}-gen", request.name)),
            )])),
        }
    }
}
