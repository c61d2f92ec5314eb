//! Process-wide worker configuration.
//!
//! This crate owns no CLI or env-parsing (out of scope per `§1`); callers
//! construct `WorkerSettings` the same way `temps-config`'s `ServerConfig`
//! is constructed — a plain, validated struct handed in by whatever binary
//! wires the worker up.

use std::time::Duration;

/// Per-worker settings threaded through every job handled.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Opaque destination URL passed through to the cluster controller's
    /// `Deploy` call (`§6`); the worker never interprets it.
    pub logger_destination_url: String,
    /// Deadline applied to each image-builder and cluster-controller call
    /// (`§5`, "Timeouts"). There is no intra-worker global timer.
    pub deploy_timeout: Duration,
}

impl WorkerSettings {
    pub fn new(logger_destination_url: impl Into<String>, deploy_timeout: Duration) -> Self {
        Self {
            logger_destination_url: logger_destination_url.into(),
            deploy_timeout,
        }
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            logger_destination_url: String::new(),
            deploy_timeout: Duration::from_secs(120),
        }
    }
}
