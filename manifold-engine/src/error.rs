//! Error types for manifold-engine.

use std::fmt;

use thiserror::Error;

use manifold_core::{BoxError, Interrupted, SourceName, StageError};
use manifold_renderer::{SourceError, SourceVariant};

/// Invalid engine construction, reported by [`EngineBuilder::build`](crate::EngineBuilder::build).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Two selectors were registered for the same source variant.
    #[error("conflicting selectors registered for source variant '{variant}'")]
    ConflictingSelectors { variant: SourceVariant },

    /// Two sources share a name.
    #[error("duplicate source name '{name}'")]
    DuplicateSource { name: SourceName },
}

/// Where a stage was registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageScope {
    /// Attached to a single source.
    Source(SourceName),
    /// Attached to every source of one variant, e.g. all charts.
    Variant(SourceVariant),
    /// Attached to the engine.
    Engine,
    /// Supplied through [`RenderOptions`](crate::RenderOptions) for one call.
    Render,
}

impl fmt::Display for StageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageScope::Source(name) => write!(f, "source '{name}'"),
            StageScope::Variant(variant) => write!(f, "variant '{variant}'"),
            StageScope::Engine => f.write_str("engine"),
            StageScope::Render => f.write_str("render-time"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Transformer,
    PostRenderer,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Transformer => f.write_str("transformer"),
            StageKind::PostRenderer => f.write_str("post-renderer"),
        }
    }
}

/// All errors that can arise from building an engine or rendering.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),

    /// A selector predicate failed.
    #[error("selector failed for source '{source_name}': {source}")]
    Selector {
        source_name: SourceName,
        #[source]
        source: BoxError,
    },

    /// A source backend failed.
    #[error("render failed for source '{source_name}': {source}")]
    Render {
        source_name: SourceName,
        #[source]
        source: SourceError,
    },

    /// A transformer or post-renderer failed.
    #[error("{scope} {kind} '{stage}' failed: {source}")]
    Stage {
        scope: StageScope,
        kind: StageKind,
        stage: String,
        #[source]
        source: StageError,
    },

    #[error("render cancelled")]
    Cancelled,

    #[error("render deadline exceeded")]
    DeadlineExceeded,

    /// Output serialization error (YAML stream).
    #[error("YAML output error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Output serialization error (JSON).
    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// True for [`EngineError::Cancelled`] and [`EngineError::DeadlineExceeded`].
    pub fn is_cancellation(&self) -> bool {
        matches!(self, EngineError::Cancelled | EngineError::DeadlineExceeded)
    }
}

impl From<Interrupted> for EngineError {
    fn from(interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Cancelled => EngineError::Cancelled,
            Interrupted::DeadlineExceeded => EngineError::DeadlineExceeded,
        }
    }
}

/// Wrap a source failure, keeping cancellation distinct from backend errors.
pub(crate) fn render_err(source_name: &SourceName, err: SourceError) -> EngineError {
    match err {
        SourceError::Interrupted(i) => i.into(),
        source => EngineError::Render {
            source_name: source_name.clone(),
            source,
        },
    }
}

/// Wrap a stage failure, keeping cancellation distinct from stage errors.
pub(crate) fn stage_err(scope: StageScope, kind: StageKind, stage: &str, err: StageError) -> EngineError {
    match err {
        StageError::Interrupted(i) => i.into(),
        source => EngineError::Stage {
            scope,
            kind,
            stage: stage.to_string(),
            source,
        },
    }
}
