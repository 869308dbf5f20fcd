//! Error types for manifold-core.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed error used at extension seams (selectors, custom sources).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A render was stopped by its [`RenderContext`](crate::RenderContext).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    /// The context was cancelled explicitly.
    #[error("render cancelled")]
    Cancelled,

    /// The context deadline passed.
    #[error("render deadline exceeded")]
    DeadlineExceeded,
}

/// Errors raised when building or reading a [`ResourceObject`](crate::ResourceObject).
#[derive(Debug, Error)]
pub enum ObjectError {
    /// The document was a scalar or list rather than a mapping.
    #[error("resource object must be a mapping, found {found}")]
    NotAnObject { found: &'static str },

    /// `kind` is missing or not a string.
    #[error("resource object has no string `kind` field")]
    MissingKind,

    /// `metadata` is present but is not a mapping.
    #[error("resource object `metadata` must be a mapping")]
    InvalidMetadata,

    /// A `kind: List` document has no `items` sequence.
    #[error("`kind: List` document must carry an `items` sequence")]
    InvalidListItems,
}

/// Errors raised while loading or parsing [`Values`](crate::Values).
#[derive(Debug, Error)]
pub enum ValuesError {
    /// A `--set` style expression was not of the form `path=value`.
    #[error("invalid value assignment '{0}'; expected <path>=<value>")]
    InvalidAssignment(String),

    /// YAML parse error.
    #[error("failed to parse values: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Values document parsed, but its root was not a mapping.
    #[error("values at {origin} must be a mapping")]
    NotAMapping { origin: String },

    /// Values file could not be read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of a [`Transformer`](crate::Transformer) or
/// [`PostRenderer`](crate::PostRenderer).
#[derive(Debug, Error)]
pub enum StageError {
    /// Free-form failure reported by the stage.
    #[error("{0}")]
    Message(String),

    /// An object could not be read or rewritten.
    #[error(transparent)]
    Object(#[from] ObjectError),

    /// The stage observed cancellation.
    #[error(transparent)]
    Interrupted(#[from] Interrupted),

    /// Any other error raised by a stage implementation.
    #[error(transparent)]
    Other(BoxError),
}

impl StageError {
    /// Convenience constructor for [`StageError::Message`].
    pub fn msg(message: impl Into<String>) -> Self {
        StageError::Message(message.into())
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ValuesError {
    ValuesError::Io {
        path: path.into(),
        source,
    }
}
