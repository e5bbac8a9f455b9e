// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployment, service, and ingress bundle for the web application.

use crate::constants::app;
use crate::error::Result;
use crate::graph::{Input, NodeHandle, ResourceKind, ResourceOptions, Stack};
use crate::output::Output;
use anyhow::Context as _;
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::core::v1::{
    Container, EnvVar, PodSpec, PodTemplateSpec, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, IngressBackend, IngressRule, IngressServiceBackend,
    IngressSpec, IngressStatus, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::Value;
use std::collections::BTreeMap;

/// Deployment, service, and ingress for one application instance, declared
/// in that fixed order under a shared parent scope.
///
/// The ingress backend is composed from the service's own generated name, so
/// the routing chain always stays within this component instance.
pub struct GkeApp {
    pub deployment: NodeHandle,
    pub service: NodeHandle,
    pub ingress: NodeHandle,
    /// Externally reachable address. Resolves to `None` while the load
    /// balancer's address list is still empty; that is a valid terminal
    /// value and callers re-query later when they need the concrete address.
    pub address: Output<Option<String>>,
}

impl GkeApp {
    pub fn declare(
        stack: &mut Stack,
        name: &str,
        provider: &NodeHandle,
        image: Output<String>,
        message: &str,
    ) -> Result<Self> {
        let options = ResourceOptions {
            provider: Some(provider.clone()),
            parent: Some(name.to_string()),
            depends_on: Vec::new(),
        };

        // The image reference comes out of an asynchronous build, so the
        // whole deployment spec is deferred on it.
        let deployment_spec_input = {
            let message = message.to_string();
            image.try_map(move |image| {
                serde_json::to_value(deployment_spec(&image, &message))
                    .map_err(anyhow::Error::from)
            })
        };
        let deployment = stack.declare(
            ResourceKind::Deployment,
            &format!("{name}-deployment"),
            BTreeMap::from([("spec".to_string(), Input::Deferred(deployment_spec_input))]),
            options.clone(),
        )?;

        let service = stack.declare(
            ResourceKind::Service,
            &format!("{name}-service"),
            BTreeMap::from([("spec".to_string(), Input::literal(&service_spec())?)]),
            options.clone(),
        )?;

        // The service's object name is generated by the backend, so the
        // ingress spec is composed from its deferred name output rather than
        // a literal.
        let ingress_spec_input = service.string_output("name").try_map(|service_name| {
            serde_json::to_value(ingress_spec(&service_name)).map_err(anyhow::Error::from)
        });
        let ingress = stack.declare(
            ResourceKind::Ingress,
            &format!("{name}-ingress"),
            BTreeMap::from([
                (
                    "metadata".to_string(),
                    Input::literal(&ObjectMeta {
                        annotations: Some(BTreeMap::from([(
                            app::INGRESS_CLASS_ANNOTATION.to_string(),
                            app::INGRESS_CLASS.to_string(),
                        )])),
                        ..Default::default()
                    })?,
                ),
                ("spec".to_string(), Input::Deferred(ingress_spec_input)),
            ]),
            options,
        )?;

        let address = ingress.output("status").try_map(load_balancer_address);

        Ok(Self {
            deployment,
            service,
            ingress,
            address,
        })
    }
}

fn app_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(app::LABEL_KEY.to_string(), app::LABEL_VALUE.to_string())])
}

fn deployment_spec(image: &str, message: &str) -> DeploymentSpec {
    let labels = app_labels();
    DeploymentSpec {
        replicas: Some(1),
        // Selector and pod-template labels come from the same map. A
        // mismatch matches zero pods and nothing in this layer reports it.
        selector: LabelSelector {
            match_labels: Some(labels.clone()),
            ..Default::default()
        },
        template: PodTemplateSpec {
            metadata: Some(ObjectMeta {
                labels: Some(labels),
                ..Default::default()
            }),
            spec: Some(PodSpec {
                containers: vec![Container {
                    name: app::CONTAINER_NAME.to_string(),
                    image: Some(image.to_string()),
                    env: Some(vec![EnvVar {
                        name: app::MESSAGE_ENV_VAR.to_string(),
                        value: Some(message.to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }],
                ..Default::default()
            }),
        },
        ..Default::default()
    }
}

fn service_spec() -> ServiceSpec {
    ServiceSpec {
        selector: Some(app_labels()),
        ports: Some(vec![ServicePort {
            port: app::SERVICE_PORT,
            target_port: Some(IntOrString::Int(app::CONTAINER_PORT)),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

fn ingress_spec(service_name: &str) -> IngressSpec {
    IngressSpec {
        rules: Some(vec![IngressRule {
            http: Some(HTTPIngressRuleValue {
                paths: vec![HTTPIngressPath {
                    path: Some("/".to_string()),
                    path_type: "Prefix".to_string(),
                    backend: IngressBackend {
                        service: Some(IngressServiceBackend {
                            name: service_name.to_string(),
                            port: Some(ServiceBackendPort {
                                number: Some(app::SERVICE_PORT),
                                ..Default::default()
                            }),
                        }),
                        ..Default::default()
                    },
                }],
            }),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

/// First load-balancer IP from an ingress status. An empty or absent
/// address list yields `None`: the load balancer is still provisioning.
fn load_balancer_address(status: Value) -> anyhow::Result<Option<String>> {
    if status.is_null() {
        return Ok(None);
    }
    let status: IngressStatus =
        serde_json::from_value(status).context("malformed ingress status")?;
    Ok(status
        .load_balancer
        .and_then(|lb| lb.ingress)
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|entry| entry.ip))
}
