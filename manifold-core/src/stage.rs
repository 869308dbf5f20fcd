//! Pipeline stages: [`Transformer`] and [`PostRenderer`].
//!
//! Both wrap the same call shape, `(context, objects) -> objects`, and are
//! kept as distinct types so the engine can hold them in separate, ordered
//! lists. Transformers edit objects in place; post-renderers may filter,
//! reorder or duplicate.

use std::fmt;
use std::sync::Arc;

use crate::context::RenderContext;
use crate::error::StageError;
use crate::types::ResourceObject;

/// Result of running one stage over a batch.
pub type StageResult = Result<Vec<ResourceObject>, StageError>;

type StageFn = dyn Fn(&RenderContext, Vec<ResourceObject>) -> StageResult + Send + Sync;

#[derive(Clone)]
struct NamedStage {
    name: String,
    run: Arc<StageFn>,
}

impl NamedStage {
    fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&RenderContext, Vec<ResourceObject>) -> StageResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(run),
        }
    }
}

/// Aggregate-wide object mutation applied after all sources are rendered.
#[derive(Clone)]
pub struct Transformer(NamedStage);

impl Transformer {
    /// Wrap a closure as a named transformer. The name identifies the stage
    /// in errors and logs.
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&RenderContext, Vec<ResourceObject>) -> StageResult + Send + Sync + 'static,
    {
        Self(NamedStage::new(name, run))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn apply(&self, ctx: &RenderContext, objects: Vec<ResourceObject>) -> StageResult {
        (self.0.run)(ctx, objects)
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transformer").field(&self.0.name).finish()
    }
}

/// Batch-level policy stage, scoped to one source or to the whole render.
#[derive(Clone)]
pub struct PostRenderer(NamedStage);

impl PostRenderer {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&RenderContext, Vec<ResourceObject>) -> StageResult + Send + Sync + 'static,
    {
        Self(NamedStage::new(name, run))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn apply(&self, ctx: &RenderContext, objects: Vec<ResourceObject>) -> StageResult {
        (self.0.run)(ctx, objects)
    }
}

impl fmt::Debug for PostRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PostRenderer").field(&self.0.name).finish()
    }
}
