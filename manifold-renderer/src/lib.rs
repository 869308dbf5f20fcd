//! # manifold-renderer
//!
//! Renderable sources for the manifold pipeline.
//!
//! A [`Source`] turns merged [`Values`](manifold_core::Values) into resource
//! objects. Two backends ship with the crate:
//!
//! - [`ChartSource`]: a directory of Tera templates plus default values.
//! - [`ManifestSource`]: a fixed set of objects, usually read from YAML.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use manifold_core::{RenderContext, Values};
//! use manifold_renderer::{Chart, ChartSource, Source};
//!
//! fn render(dir: &std::path::Path) {
//!     if let Ok(chart) = Chart::from_dir(dir) {
//!         let source = ChartSource::new(chart, "web").with_namespace("frontend");
//!         let values = source.values().clone();
//!         if let Ok(objects) = source.render(&RenderContext::new(), &values) {
//!             println!("{} objects", objects.len());
//!         }
//!     }
//! }
//! ```

pub mod chart;
pub mod documents;
pub mod error;
pub mod manifest;
pub mod source;

pub use chart::{Chart, ChartSource};
pub use documents::parse_documents;
pub use error::SourceError;
pub use manifest::ManifestSource;
pub use source::{Source, SourceVariant, TypedSource};
