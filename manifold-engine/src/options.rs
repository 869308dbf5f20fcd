//! Per-call render options.

use serde_json::Value;

use manifold_core::{PostRenderer, Transformer, Values};

/// Inputs supplied at the `render` call site.
///
/// Values here are merged over each source's stored values (render-time
/// wins). Stages here run after the engine's stages of the same kind.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    values: Values,
    transformers: Vec<Transformer>,
    post_renderers: Vec<PostRenderer>,
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep-merge `values` into the render-time values.
    pub fn with_values(mut self, values: Values) -> Self {
        self.values = self.values.merged(&values);
        self
    }

    /// Set a single top-level render-time value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key, value);
        self
    }

    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformers.push(transformer);
        self
    }

    pub fn with_post_renderer(mut self, post_renderer: PostRenderer) -> Self {
        self.post_renderers.push(post_renderer);
        self
    }

    pub fn values(&self) -> &Values {
        &self.values
    }

    pub fn transformers(&self) -> &[Transformer] {
        &self.transformers
    }

    pub fn post_renderers(&self) -> &[PostRenderer] {
        &self.post_renderers
    }
}
