use crate::upstream::UpstreamError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Every payload shape the enabled-models endpoint is known to return.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelListShape {
    Bare(Vec<String>),
    Models { models: Vec<String> },
    Data { data: Vec<String> },
    /// Models grouped by channel or vendor.
    Grouped(BTreeMap<String, Vec<String>>),
}

/// Decode the enabled-models payload into a flat list of model names.
///
/// Grouped payloads are flattened, deduplicated and sorted; blank names are
/// dropped. Any other shape is rejected instead of being guessed at.
pub fn decode_model_list(data: Value) -> Result<Vec<String>, UpstreamError> {
    let shape: ModelListShape = serde_json::from_value(data).map_err(|_| {
        UpstreamError::Shape("unrecognized model list shape".to_string())
    })?;

    Ok(match shape {
        ModelListShape::Bare(models)
        | ModelListShape::Models { models }
        | ModelListShape::Data { data: models } => models,
        ModelListShape::Grouped(groups) => groups
            .into_values()
            .flatten()
            .filter(|m| !m.trim().is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    })
}
