//! Serialization of rendered batches and textual diffs between renders.

use similar::TextDiff;

use manifold_core::ResourceObject;

use crate::error::EngineError;

/// Serialize objects as a multi-document YAML stream, each document
/// introduced by `---`.
pub fn to_yaml_stream(objects: &[ResourceObject]) -> Result<String, EngineError> {
    let mut out = String::new();
    for obj in objects {
        out.push_str("---\n");
        out.push_str(&serde_yaml::to_string(obj)?);
    }
    Ok(out)
}

/// Serialize objects as a pretty-printed JSON array.
pub fn to_json(objects: &[ResourceObject]) -> Result<String, EngineError> {
    Ok(serde_json::to_string_pretty(objects)?)
}

/// Unified diff from `previous` to `current`, or `None` when equal.
///
/// Line endings are normalised to LF on both sides first.
pub fn diff(previous: &str, current: &str, old_header: &str, new_header: &str) -> Option<String> {
    let previous = normalize_line_endings(previous);
    let current = normalize_line_endings(current);
    if previous == current {
        return None;
    }
    let unified = TextDiff::from_lines(&previous, &current)
        .unified_diff()
        .header(old_header, new_header)
        .context_radius(3)
        .to_string();
    Some(unified)
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n")
}
