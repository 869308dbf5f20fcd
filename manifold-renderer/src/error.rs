//! Error types for manifold-renderer.

use std::path::PathBuf;

use thiserror::Error;

use manifold_core::{BoxError, Interrupted, ObjectError, ValuesError};

/// All errors a source backend can raise while rendering.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Chart directory does not exist or is not a directory.
    #[error("chart not found at {path}")]
    ChartNotFound { path: PathBuf },

    /// Tera rejected the chart's templates while loading them. The Tera
    /// message names the offending template.
    #[error("failed to load templates of chart '{chart}': {source}")]
    ChartTemplates {
        chart: String,
        #[source]
        source: tera::Error,
    },

    /// Tera failed to render a template.
    #[error("template error in '{template}': {source}")]
    Template {
        template: String,
        #[source]
        source: tera::Error,
    },

    /// A rendered document was not valid YAML.
    #[error("invalid YAML in '{origin}': {source}")]
    Yaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// A rendered document was YAML but not a resource object.
    #[error("invalid object in '{origin}' (document {index}): {source}")]
    Object {
        origin: String,
        index: usize,
        #[source]
        source: ObjectError,
    },

    /// Chart default values could not be loaded.
    #[error("values error: {0}")]
    Values(#[from] ValuesError),

    /// Filesystem error while loading a chart or manifest file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The render context was cancelled mid-render.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// Failure raised by a custom [`Source`](crate::Source) implementation.
    #[error("backend error: {0}")]
    Backend(#[source] BoxError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SourceError {
    SourceError::Io {
        path: path.into(),
        source,
    }
}
