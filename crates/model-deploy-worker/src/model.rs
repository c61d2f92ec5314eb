//! Data model shared by every module in this crate.
//!
//! Persistence schema is deliberately not modelled here (out of scope per
//! the spec) — these are the plain value types the capabilities in
//! [`crate::capabilities`] exchange with the worker.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A key/value label. Kept as an ordered pair (rather than a map entry) so
/// project label order is preserved across the merge in
/// [`crate::naming::merge_labels`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Compute resource shape requested for (or defaulted onto) an endpoint.
///
/// Quantities are kept as strings (`"500m"`, `"1Gi"`) rather than a typed
/// quantity, mirroring how `ResourceUsage` in the container deploy job
/// represents `cpu_limit`/`memory_limit` — parsing/validating the quantity
/// format is the cluster controller's concern, not the reconciler's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub min_replica: i32,
    pub max_replica: i32,
    pub cpu: String,
    pub memory: String,
    pub gpu_name: Option<String>,
    pub gpu_count: String,
}

/// A deployment target: a named cluster plus the resource defaults applied
/// when a request omits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub cluster: String,
    pub is_default: bool,
    pub default_resource_request: ResourceRequest,
}

/// Closed set of servable model shapes.
///
/// `needs_image_build` is a method on the variant rather than a string
/// compare against `model.type`, per the variant-modelling design note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Generic,
    UserFunction,
    PyTorch,
    PyFunc,
    Tensorflow,
    Sklearn,
    XGBoost,
    Custom,
}

impl ModelType {
    /// Whether this model shape always requires a user-built image,
    /// independent of whether the endpoint also attaches a transformer.
    pub fn requires_user_image(self) -> bool {
        matches!(self, ModelType::UserFunction)
    }
}

/// A user-supplied pre/post-processing transformer attached to an endpoint.
///
/// Its mere presence forces an image build even for framework models that
/// would otherwise be servable directly (`§4.1 P4`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformerSpec {
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub labels: Vec<Label>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub project: Project,
    pub model_type: ModelType,
    pub observability_supported: bool,
}

impl Model {
    /// Whether `§4.1 P4` requires invoking the image builder for this
    /// model/endpoint pair.
    pub fn needs_image_build(&self, transformer: Option<&TransformerSpec>) -> bool {
        self.model_type.requires_user_image() || transformer.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: i64,
    pub labels: BTreeMap<String, String>,
}

/// Lifecycle status shared by [`VersionEndpoint`] and [`Deployment`] audit
/// rows (`I3`: they always describe the same status on a given attempt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointStatus {
    Pending,
    Running,
    Serving,
    Failed,
    Terminated,
}

/// Identity of a reconciled endpoint: `(model, version, environment)`, `I1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointIdentity {
    pub model_id: i64,
    pub version_id: i64,
    pub environment_name: String,
}

/// The reconciled entity: "model version X is served in environment Y".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEndpoint {
    pub model_id: i64,
    pub version_id: i64,
    pub environment_name: String,
    pub revision_id: u64,
    pub inference_service_name: String,
    pub status: EndpointStatus,
    pub url: String,
    pub service_name: String,
    pub resource_request: Option<ResourceRequest>,
    pub namespace: String,
    pub enable_model_observability: bool,
    pub transformer: Option<TransformerSpec>,
    /// Effective labels the cluster metadata reflects; recomputed every
    /// attempt from `project.labels` overlaid by `version.labels`
    /// (`§4.1`, "Tie-breaks / edge policies").
    pub labels: Vec<Label>,
}

impl VersionEndpoint {
    pub fn identity(&self) -> EndpointIdentity {
        EndpointIdentity {
            model_id: self.model_id,
            version_id: self.version_id,
            environment_name: self.environment_name.clone(),
        }
    }

    /// The not-yet-deployed endpoint synthesized when `Store.Get` finds
    /// nothing for this identity (`§4.1 P1`).
    pub fn first_deploy(requested: &VersionEndpoint) -> Self {
        Self {
            revision_id: 0,
            status: EndpointStatus::Pending,
            inference_service_name: String::new(),
            url: String::new(),
            service_name: String::new(),
            ..requested.clone()
        }
    }
}

/// Append-only audit record of one deployment attempt.
///
/// Never mutated in place after a terminal `status`; `updated_at` advances
/// on the pending->terminal transition that [`crate::worker`] performs, but
/// the row's identity (`id`) and `created_at` never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: Option<i64>,
    pub project_id: i64,
    pub version_model_id: i64,
    pub version_id: i64,
    pub revision_id: u64,
    pub status: EndpointStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata echoed back on the cluster controller's [`Service`] descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Metadata {
    pub labels: Vec<Label>,
}

/// What the cluster controller reports after a successful `Deploy` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    /// Empty when the controller did not echo a workload name.
    pub current_isvc_name: String,
    pub revision_id: u64,
    pub namespace: String,
    pub service_name: String,
    pub url: String,
    pub metadata: Metadata,
}

/// The job payload delivered by the queue for the `"deployment"` job kind.
///
/// The distilled envelope in `§6` is `{endpoint, version, model, project}`;
/// `environment` is hoisted in here explicitly (see `DESIGN.md`) so `§4.1 P3`
/// can resolve the default resource request without requiring the endpoint
/// store to join environment data onto every `Get` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointJob {
    pub endpoint: VersionEndpoint,
    pub version: Version,
    pub model: Model,
    pub project: Project,
    pub environment: Environment,
}
