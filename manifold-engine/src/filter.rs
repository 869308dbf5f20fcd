//! Filtering post-renderers.
//!
//! Each filter keeps the relative order of the objects it retains.

use std::collections::BTreeSet;

use manifold_core::{PostRenderer, ResourceObject};

/// Keep only objects for which `keep` returns true.
pub fn by<F>(name: impl Into<String>, keep: F) -> PostRenderer
where
    F: Fn(&ResourceObject) -> bool + Send + Sync + 'static,
{
    PostRenderer::new(name, move |_ctx, objects: Vec<ResourceObject>| {
        Ok(objects.into_iter().filter(|obj| keep(obj)).collect())
    })
}

fn to_set<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

/// Keep only objects whose kind is listed.
pub fn kinds<I, S>(kinds: I) -> PostRenderer
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let kinds = to_set(kinds);
    by("filter-kinds", move |obj| kinds.contains(obj.kind()))
}

/// Drop objects whose kind is listed.
pub fn exclude_kinds<I, S>(kinds: I) -> PostRenderer
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let kinds = to_set(kinds);
    by("exclude-kinds", move |obj| !kinds.contains(obj.kind()))
}

/// Keep only objects in the listed namespaces. Cluster-scoped objects (empty
/// namespace) are kept only if `""` is listed.
pub fn namespaces<I, S>(namespaces: I) -> PostRenderer
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let namespaces = to_set(namespaces);
    by("filter-namespaces", move |obj| namespaces.contains(obj.namespace()))
}
