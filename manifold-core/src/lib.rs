//! Manifold core library: resource objects, values, render context, stages.
//!
//! Public API surface:
//! - [`types`]: [`ResourceObject`], [`ObjectKey`], [`SourceName`]
//! - [`values`]: [`Values`] and deep-merge semantics
//! - [`context`]: [`RenderContext`] cancellation and deadlines
//! - [`stage`]: [`Transformer`] and [`PostRenderer`] pipeline stages
//! - [`error`]: [`ObjectError`], [`ValuesError`], [`StageError`], [`Interrupted`]

pub mod context;
pub mod error;
pub mod stage;
pub mod types;
pub mod values;

pub use context::RenderContext;
pub use error::{BoxError, Interrupted, ObjectError, StageError, ValuesError};
pub use stage::{PostRenderer, StageResult, Transformer};
pub use types::{is_cluster_scoped, ObjectKey, ResourceObject, SourceName};
pub use values::Values;
