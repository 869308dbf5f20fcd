//! Built-in transformers.

use std::collections::BTreeMap;

use manifold_core::{ResourceObject, Transformer};

fn to_map<I, K, V>(entries: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Merge `labels` into every object's labels. Keys in `labels` overwrite
/// existing values; other existing labels are kept.
pub fn set_labels<I, K, V>(labels: I) -> Transformer
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let fixed = to_map(labels);
    Transformer::new("labels", move |_ctx, mut objects: Vec<ResourceObject>| {
        for obj in &mut objects {
            let mut labels = obj.labels();
            labels.extend(fixed.iter().map(|(k, v)| (k.clone(), v.clone())));
            obj.set_labels(labels);
        }
        Ok(objects)
    })
}

/// Merge `annotations` into every object's annotations, overwriting on
/// key collision.
pub fn set_annotations<I, K, V>(annotations: I) -> Transformer
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let fixed = to_map(annotations);
    Transformer::new("annotations", move |_ctx, mut objects: Vec<ResourceObject>| {
        for obj in &mut objects {
            let mut annotations = obj.annotations();
            annotations.extend(fixed.iter().map(|(k, v)| (k.clone(), v.clone())));
            obj.set_annotations(annotations);
        }
        Ok(objects)
    })
}
