//! Model service deployment worker: reconciles one (model, version,
//! environment) endpoint per job to the shape requested by its caller.

pub mod capabilities;
pub mod error;
pub mod model;
pub mod naming;
pub mod resource;
pub mod settings;
pub mod worker;

pub use capabilities::*;
pub use error::{Cancelled, CapabilityError, Timeout, WorkerError};
pub use model::*;
pub use naming::{inference_service_name, merge_labels, next_revision_id};
pub use resource::resolve_resource_request;
pub use settings::WorkerSettings;
pub use worker::DeploymentWorker;
