//! Capability traits the worker is injected with.
//!
//! These are the interface boundaries of `§6`: a cluster controller
//! registry, an image builder, the two persistent stores, and the two
//! best-effort notifiers. Production call sites hand the worker `Arc<dyn
//! Trait>` implementations; tests hand it `mockall`-built fakes. No
//! process-wide singletons are introduced, matching the capability-injection
//! design note.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CapabilityError;
use crate::model::{
    Deployment, Model, Project, ResourceRequest, Service, Version, VersionEndpoint,
};

/// A single cluster's workload controller.
#[async_trait]
pub trait ClusterController: Send + Sync {
    /// `logger_destination_url` is the process-wide opaque string from
    /// [`crate::settings::WorkerSettings`] (`§6`); the worker never
    /// interprets it, only forwards it.
    async fn deploy(
        &self,
        endpoint: &VersionEndpoint,
        model: &Model,
        version: &Version,
        logger_destination_url: &str,
    ) -> Result<Service, CapabilityError>;
}

/// Maps an environment name to the controller that serves it.
///
/// Implemented for `HashMap<String, Arc<dyn ClusterController>>` directly so
/// production call sites can hand the worker a plain map built at startup
/// without a bespoke wrapper type.
pub trait ClusterControllerRegistry: Send + Sync {
    fn controller_for(&self, environment_name: &str) -> Option<Arc<dyn ClusterController>>;
}

impl ClusterControllerRegistry for HashMap<String, Arc<dyn ClusterController>> {
    fn controller_for(&self, environment_name: &str) -> Option<Arc<dyn ClusterController>> {
        self.get(environment_name).cloned()
    }
}

/// Builds a servable container image for models that aren't directly
/// servable from their artifact alone (user-function models, or framework
/// models with a user-supplied transformer).
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build_image(
        &self,
        project: &Project,
        model: &Model,
        version: &Version,
        resource_request: &ResourceRequest,
    ) -> Result<String, CapabilityError>;
}

/// Persists the current shape of a `VersionEndpoint`.
///
/// `get` returns `Ok(None)` for the "not found" case rather than a sentinel
/// error variant — idiomatic for a Rust trait boundary, and equivalent to
/// the distinguishable sentinel the spec's interface calls for.
#[async_trait]
pub trait EndpointStore: Send + Sync {
    async fn get(
        &self,
        identity: &crate::model::EndpointIdentity,
    ) -> Result<Option<VersionEndpoint>, CapabilityError>;

    async fn save(&self, endpoint: &VersionEndpoint) -> Result<(), CapabilityError>;
}

/// Append-only audit trail of deployment attempts.
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    async fn get_latest_deployment(
        &self,
        model_id: i64,
        version_id: i64,
    ) -> Result<Option<Deployment>, CapabilityError>;

    async fn save(&self, deployment: &Deployment) -> Result<Deployment, CapabilityError>;

    /// Idempotent terminal marker; never called for a resumed pending row
    /// more than once per logical attempt.
    async fn on_deployment_success(&self, deployment: &Deployment) -> Result<(), CapabilityError>;
}

/// Webhook event kinds the worker can trigger. Only
/// `OnVersionEndpointDeployed` is dispatched today (`§4.4`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookEventKind {
    OnVersionEndpointDeployed,
}

/// Best-effort notification to downstream systems; failures are logged and
/// never propagated to the worker's caller.
#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    async fn trigger_webhooks(
        &self,
        event: WebhookEventKind,
        endpoint: &VersionEndpoint,
    ) -> Result<(), CapabilityError>;
}

/// Best-effort observability event, emitted on both success and failure
/// paths when the model supports it (`§4.5`).
#[async_trait]
pub trait EventProducer: Send + Sync {
    async fn version_endpoint_change_event(
        &self,
        endpoint: &VersionEndpoint,
        model: &Model,
    ) -> Result<(), CapabilityError>;
}
