//! `manifold render`: render a pipeline and print the result.

use anyhow::Result;
use clap::{Args, ValueEnum};
use tabled::{settings::Style, Table, Tabled};

use manifold_core::ResourceObject;
use manifold_engine::output;

use super::PipelineArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

/// Arguments for `manifold render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// Output format for the manifest stream.
    #[arg(long, short = 'o', value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,

    /// Print a kind / namespace / name table instead of manifests.
    #[arg(long)]
    pub summary: bool,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "kind")]
    kind: String,
    #[tabled(rename = "namespace")]
    namespace: String,
    #[tabled(rename = "name")]
    name: String,
}

impl RenderArgs {
    pub fn run(self) -> Result<()> {
        let objects = self.pipeline.render()?;

        if self.summary {
            print_summary(&objects);
            return Ok(());
        }

        let rendered = match self.output {
            OutputFormat::Yaml => output::to_yaml_stream(&objects)?,
            OutputFormat::Json => output::to_json(&objects)?,
        };
        print!("{rendered}");
        if !rendered.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}

fn print_summary(objects: &[ResourceObject]) {
    if objects.is_empty() {
        println!("No objects rendered.");
        return;
    }
    let rows: Vec<SummaryRow> = objects
        .iter()
        .enumerate()
        .map(|(i, obj)| SummaryRow {
            index: i + 1,
            kind: obj.kind().to_string(),
            namespace: obj.namespace().to_string(),
            name: obj.name().to_string(),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} objects", objects.len());
}
