//! The [`Source`] contract and its variant tags.
//!
//! Every backend exposes a stable [`SourceVariant`]. Selectors are keyed by
//! that tag, so dispatch is an explicit tag comparison followed by a typed
//! downcast through [`Source::as_any`].

use std::any::Any;
use std::fmt;

use manifold_core::{PostRenderer, RenderContext, ResourceObject, SourceName, Values};

use crate::error::SourceError;

/// Stable tag naming a source backend, e.g. `chart` or `manifest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceVariant(&'static str);

impl SourceVariant {
    pub const fn new(tag: &'static str) -> Self {
        Self(tag)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for SourceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A configured unit of renderable input.
///
/// `render` must be deterministic for identical values and must not retain
/// state between calls; the engine may invoke it on every render.
pub trait Source: fmt::Debug + Send + Sync {
    /// Identity used in logs and error messages. Unique within an engine.
    fn name(&self) -> &SourceName;

    /// Backend tag used for selector dispatch.
    fn variant(&self) -> SourceVariant;

    /// Values stored on the source; render-time values are merged over these.
    fn values(&self) -> &Values;

    /// Post-renderers run over this source's output only, in order.
    fn post_renderers(&self) -> &[PostRenderer];

    /// Produce objects from already-merged `values`.
    fn render(
        &self,
        ctx: &RenderContext,
        values: &Values,
    ) -> Result<Vec<ResourceObject>, SourceError>;

    fn as_any(&self) -> &dyn Any;
}

/// A concrete source type with a compile-time variant tag, usable as the
/// type parameter of a selector.
pub trait TypedSource: Source + Sized + 'static {
    const VARIANT: SourceVariant;
}
