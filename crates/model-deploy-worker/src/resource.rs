//! Pure resource-request resolution (`§4.2`).

use crate::model::ResourceRequest;

/// If `requested` is absent, returns a copy of `default`; otherwise returns
/// a copy of `requested` unchanged. Never mutates `default`.
pub fn resolve_resource_request(
    requested: Option<&ResourceRequest>,
    default: &ResourceRequest,
) -> ResourceRequest {
    requested.cloned().unwrap_or_else(|| default.clone())
}
