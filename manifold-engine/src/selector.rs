//! Type-directed source selectors.
//!
//! A [`Selector`] is bound to one source variant. The engine runs it only for
//! sources carrying that variant's tag; sources of any other variant pass
//! through unfiltered.

use std::fmt;
use std::sync::Arc;

use manifold_core::{BoxError, RenderContext};
use manifold_renderer::{Source, SourceVariant, TypedSource};

type Predicate = dyn Fn(&RenderContext, &dyn Source) -> Result<bool, BoxError> + Send + Sync;

/// Inclusion predicate for sources of a single variant.
#[derive(Clone)]
pub struct Selector {
    variant: SourceVariant,
    predicate: Arc<Predicate>,
}

impl Selector {
    /// Build a selector for sources of type `S`. Returning `Ok(false)`
    /// excludes the source; an error aborts the render.
    ///
    /// ```rust
    /// use manifold_engine::Selector;
    /// use manifold_renderer::ChartSource;
    ///
    /// let skip_internal = Selector::new::<ChartSource, _>(|_ctx, chart| {
    ///     Ok(chart.release_name.as_str() != "internal-tools")
    /// });
    /// assert_eq!(skip_internal.variant().as_str(), "chart");
    /// ```
    pub fn new<S, F>(predicate: F) -> Self
    where
        S: TypedSource,
        F: Fn(&RenderContext, &S) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        let predicate = move |ctx: &RenderContext, source: &dyn Source| {
            match source.as_any().downcast_ref::<S>() {
                Some(typed) => predicate(ctx, typed),
                // Same tag, different concrete type: treat as unmatched.
                None => Ok(true),
            }
        };
        Self {
            variant: S::VARIANT,
            predicate: Arc::new(predicate),
        }
    }

    pub fn variant(&self) -> SourceVariant {
        self.variant
    }

    /// `Ok(true)` if `source` should be rendered. Sources of another variant
    /// are always included.
    pub fn selects(&self, ctx: &RenderContext, source: &dyn Source) -> Result<bool, BoxError> {
        if source.variant() != self.variant {
            return Ok(true);
        }
        (self.predicate)(ctx, source)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("variant", &self.variant)
            .finish_non_exhaustive()
    }
}
