//! `manifold diff <pipeline> <previous>`: compare a previous render with
//! what the pipeline renders now.

use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use manifold_engine::output;

use super::PipelineArgs;

/// Arguments for `manifold diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Previously rendered YAML stream. A missing file diffs as empty.
    pub previous: PathBuf,
}

impl DiffArgs {
    pub fn run(self) -> Result<()> {
        let objects = self.pipeline.render()?;
        let current = output::to_yaml_stream(&objects)?;
        let previous = match std::fs::read_to_string(&self.previous) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("cannot read '{}'", self.previous.display()))
            }
        };

        let old_header = format!("a/{}", self.previous.display());
        let Some(unified) = output::diff(&previous, &current, &old_header, "b/rendered") else {
            println!("No differences.");
            return Ok(());
        };

        for line in unified.lines() {
            if line.starts_with("+++") || line.starts_with("---") {
                println!("{}", line.bold());
            } else if line.starts_with('+') {
                println!("{}", line.green());
            } else if line.starts_with('-') {
                println!("{}", line.red());
            } else if line.starts_with("@@") {
                println!("{}", line.cyan());
            } else {
                println!("{line}");
            }
        }
        Ok(())
    }
}
