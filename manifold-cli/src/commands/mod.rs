pub mod diff;
pub mod kinds;
pub mod render;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use manifold_core::{RenderContext, ResourceObject, Values};
use manifold_engine::RenderOptions;

use crate::config::PipelineConfig;

/// Pipeline selection and render-time inputs shared by `render` and `diff`.
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Path to the pipeline YAML file.
    pub config: PathBuf,

    /// Deployment environment, matched against each source's `exclude_envs`.
    #[arg(long, env = "DEPLOY_ENV", default_value = "staging")]
    pub env: String,

    /// Values file merged over the pipeline's `values` (repeatable; later wins).
    #[arg(long = "values", short = 'f', value_name = "FILE")]
    pub values_files: Vec<PathBuf>,

    /// Render-time value override, e.g. `image.tag=1.27` (repeatable).
    #[arg(long = "set", value_name = "PATH=VALUE")]
    pub set: Vec<String>,

    /// Abort the render after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl PipelineArgs {
    /// Load the pipeline, build the engine and render once.
    pub fn render(&self) -> Result<Vec<ResourceObject>> {
        let config = PipelineConfig::load(&self.config)?;
        let base_dir = self
            .config
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let engine = config.build_engine(base_dir, &self.env)?;

        let mut values = config.values.clone();
        for file in &self.values_files {
            let file_values = Values::load(file)
                .with_context(|| format!("cannot load values file '{}'", file.display()))?;
            values = values.merged(&file_values);
        }
        for expr in &self.set {
            values.apply_assignment(expr)?;
        }

        let ctx = match self.timeout {
            Some(secs) => RenderContext::new().with_timeout(Duration::from_secs(secs)),
            None => RenderContext::new(),
        };
        tracing::debug!(
            env = %self.env,
            config = %self.config.display(),
            sources = engine.sources().count(),
            "rendering pipeline"
        );
        let objects = engine
            .render(&ctx, RenderOptions::new().with_values(values))
            .with_context(|| format!("render failed for '{}'", self.config.display()))?;
        Ok(objects)
    }
}
