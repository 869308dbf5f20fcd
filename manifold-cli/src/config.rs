//! Pipeline configuration file: YAML description of sources and stages.
//!
//! ```yaml
//! sources:
//!   - name: web-frontend
//!     chart: charts/nginx        # or `manifests: crds.yaml`
//!     namespace: web
//!     values: { replicaCount: 2 }
//!     labels: { team: web }      # source-scoped post-renderer
//!   - name: internal-tools
//!     chart: charts/nginx
//!     exclude_envs: [production] # chart sources only
//! values: { commonAnnotations: { owner: platform } }
//! labels: { managed-by: manifold }
//! chart_labels: { rendered-from: chart } # every chart source, as one batch
//! annotations: {}
//! filter: { kinds: [], exclude_kinds: [], namespaces: [] }
//! apply_order: true
//! ```
//!
//! Relative `chart` / `manifests` paths resolve against the config file's
//! directory.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use manifold_core::{PostRenderer, Values};
use manifold_engine::{apply_order, filter, transformer, Engine, Selector};
use manifold_renderer::{Chart, ChartSource, ManifestSource, Source};

fn default_true() -> bool {
    true
}

/// Root of a pipeline file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Render-time values, merged over every source's values.
    #[serde(default)]
    pub values: Values,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Labels added by a post-renderer over the output of all chart sources.
    #[serde(default)]
    pub chart_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default = "default_true")]
    pub apply_order: bool,
}

/// One source entry. Exactly one of `chart` / `manifests` must be set.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub chart: Option<PathBuf>,
    #[serde(default)]
    pub manifests: Option<PathBuf>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub values: Values,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub exclude_envs: Vec<String>,
}

/// Global filters, applied before apply-order sorting.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub kinds: Vec<String>,
    #[serde(default)]
    pub exclude_kinds: Vec<String>,
    #[serde(default)]
    pub namespaces: Vec<String>,
}

impl PipelineConfig {
    /// Parse a pipeline file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read pipeline file '{}'", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse pipeline file '{}'", path.display()))
    }

    /// Assemble an [`Engine`] for deployment environment `env`.
    ///
    /// Stage order: chart-labels over all chart sources, then labels and
    /// annotations transformers, then kind / exclude / namespace filters,
    /// then apply-order (when enabled).
    pub fn build_engine(&self, base_dir: &Path, env: &str) -> Result<Engine> {
        let mut builder = Engine::builder();
        let mut excluded: HashMap<String, Vec<String>> = HashMap::new();

        for sc in &self.sources {
            let source = sc
                .build(base_dir)
                .with_context(|| format!("invalid source '{}'", sc.name))?;
            if !sc.exclude_envs.is_empty() {
                excluded.insert(sc.name.clone(), sc.exclude_envs.clone());
            }
            builder = builder.with_boxed_source(source);
        }

        if !excluded.is_empty() {
            let env = env.to_string();
            builder = builder.with_selector(Selector::new::<ChartSource, _>(move |_ctx, chart| {
                let skip = excluded
                    .get(chart.release_name.as_str())
                    .is_some_and(|envs| envs.contains(&env));
                Ok(!skip)
            }));
        }

        if !self.chart_labels.is_empty() {
            builder = builder.with_variant_post_renderer::<ChartSource>(labels_post_renderer(
                "chart-labels",
                &self.chart_labels,
            ));
        }

        if !self.labels.is_empty() {
            builder = builder.with_transformer(transformer::set_labels(self.labels.clone()));
        }
        if !self.annotations.is_empty() {
            builder = builder.with_transformer(transformer::set_annotations(self.annotations.clone()));
        }

        if !self.filter.kinds.is_empty() {
            builder = builder.with_post_renderer(filter::kinds(self.filter.kinds.clone()));
        }
        if !self.filter.exclude_kinds.is_empty() {
            builder =
                builder.with_post_renderer(filter::exclude_kinds(self.filter.exclude_kinds.clone()));
        }
        if !self.filter.namespaces.is_empty() {
            builder = builder.with_post_renderer(filter::namespaces(self.filter.namespaces.clone()));
        }
        if self.apply_order {
            builder = builder.with_post_renderer(apply_order::apply_order());
        }

        Ok(builder.build()?)
    }
}

impl SourceConfig {
    fn build(&self, base_dir: &Path) -> Result<Box<dyn Source>> {
        let source: Box<dyn Source> = match (&self.chart, &self.manifests) {
            (Some(chart), None) => {
                let chart = Chart::from_dir(&base_dir.join(chart))?;
                let mut source =
                    ChartSource::new(chart, self.name.as_str()).with_values(self.values.clone());
                if let Some(ns) = &self.namespace {
                    source = source.with_namespace(ns.clone());
                }
                if !self.labels.is_empty() {
                    source = source.with_post_renderer(labels_post_renderer("source-labels", &self.labels));
                }
                Box::new(source)
            }
            (None, Some(path)) => {
                if !self.exclude_envs.is_empty() {
                    bail!("`exclude_envs` is only supported for chart sources");
                }
                if self.namespace.is_some() || !self.values.is_empty() {
                    bail!("manifest sources take no `namespace` or `values`");
                }
                let mut source = ManifestSource::from_file(self.name.as_str(), &base_dir.join(path))?;
                if !self.labels.is_empty() {
                    source = source.with_post_renderer(labels_post_renderer("source-labels", &self.labels));
                }
                Box::new(source)
            }
            _ => bail!("set exactly one of `chart` or `manifests`"),
        };
        Ok(source)
    }
}

/// Label injection run as a post-renderer, for source or variant scope.
fn labels_post_renderer(name: &str, labels: &BTreeMap<String, String>) -> PostRenderer {
    let set = transformer::set_labels(labels.clone());
    PostRenderer::new(name, move |ctx, objects| set.apply(ctx, objects))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
