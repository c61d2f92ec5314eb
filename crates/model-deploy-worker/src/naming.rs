//! Revision accounting, service-name derivation, and label merging (`§4.3`).

use std::collections::{BTreeMap, HashMap};

use crate::model::Label;

/// The revision a successful deploy commits as.
///
/// Resolves the open question in `§9`: a controller returning
/// `revision_id = 0` is treated consistently on both the first-deploy and
/// redeploy paths by always taking `max(service.revision_id,
/// current.revision_id + 1)`.
pub fn next_revision_id(service_revision_id: u64, current_revision_id: u64) -> u64 {
    service_revision_id.max(current_revision_id + 1)
}

/// `{model}-{version}-{revision}`, the pattern the cluster controller is
/// expected to echo back as `current_isvc_name`.
pub fn inference_service_name(model_name: &str, version_id: i64, revision_id: u64) -> String {
    format!("{model_name}-{version_id}-{revision_id}")
}

/// Overlay `version_labels` onto `project_labels`, version winning on key
/// collision, preserving insertion order with the project base first.
///
/// Resolves the second open question in `§9`.
pub fn merge_labels(project_labels: &[Label], version_labels: &BTreeMap<String, String>) -> Vec<Label> {
    let mut merged = Vec::with_capacity(project_labels.len() + version_labels.len());
    let mut index: HashMap<&str, usize> = HashMap::new();

    for label in project_labels {
        index.insert(label.key.as_str(), merged.len());
        merged.push(label.clone());
    }

    for (key, value) in version_labels {
        if let Some(&i) = index.get(key.as_str()) {
            merged[i].value = value.clone();
        } else {
            merged.push(Label::new(key.clone(), value.clone()));
        }
    }

    merged
}
