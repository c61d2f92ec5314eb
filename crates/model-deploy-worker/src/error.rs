//! Error taxonomy for the deployment worker.
//!
//! Every non-advisory collaborator failure is wrapped in [`WorkerError`] so
//! that the caller's retry policy can classify it without inspecting string
//! messages. Advisory collaborators (webhook dispatch, event production)
//! never surface through this type — their failures are logged and dropped
//! at the call site.

use std::fmt;

/// The error type returned by a capability implementation.
///
/// Capabilities are free to use whatever error type fits their transport
/// (HTTP status, gRPC status, database driver error, ...); the worker only
/// needs `Error + Send + Sync` so it can attach the failure as a `source()`
/// on the category it belongs to.
pub type CapabilityError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A per-call deadline elapsed before the collaborator returned.
#[derive(Debug, Default)]
pub struct Timeout;

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for Timeout {}

/// The job's context was cancelled (queue shutdown, caller deadline) while a
/// collaborator call was in flight.
#[derive(Debug, Default)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Error categories surfaced by [`crate::worker::DeploymentWorker::handle`].
///
/// Every variant but [`WorkerError::Misconfiguration`] carries the
/// originating collaborator's error as its `source()`, preserving the
/// original cause the way `§7` of the spec requires ("the returned error is
/// the raw error from the first failing collaborator").
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("no cluster controller registered for environment {0:?}")]
    Misconfiguration(String),

    #[error("image build failed")]
    Build(#[source] CapabilityError),

    #[error("cluster deploy failed")]
    Deploy(#[source] CapabilityError),

    #[error("failed to persist endpoint")]
    PersistenceEndpoint(#[source] CapabilityError),

    #[error("failed to persist deployment audit row")]
    PersistenceAudit(#[source] CapabilityError),
}

impl WorkerError {
    /// Whether an upstream queue should redeliver the job after this error.
    ///
    /// Everything is retryable except a missing cluster controller, which
    /// requires an operator to register one before any retry can succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, WorkerError::Misconfiguration(_))
    }
}
