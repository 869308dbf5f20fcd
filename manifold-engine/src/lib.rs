//! # manifold-engine
//!
//! Render orchestration: selection → per-source render → per-source
//! post-render → per-variant post-render → global transform → global
//! post-render.
//!
//! Build an [`Engine`] with [`Engine::builder`], then call
//! [`Engine::render`] as many times as needed; each call is independent.
//!
//! Reference stages:
//! - [`transformer::set_labels`] / [`transformer::set_annotations`]
//! - [`filter`] post-renderers (by kind, namespace, predicate)
//! - [`apply_order::apply_order`]: deterministic apply-order sort

pub mod apply_order;
pub mod engine;
pub mod error;
pub mod filter;
pub mod options;
pub mod output;
pub mod selector;
pub mod transformer;

pub use engine::{Engine, EngineBuilder};
pub use error::{ConfigError, EngineError, StageKind, StageScope};
pub use options::RenderOptions;
pub use selector::Selector;
