//! Template charts: a set of Tera templates plus default values.
//!
//! # Chart layout on disk
//!
//! | Path                  | Meaning                                          |
//! |-----------------------|--------------------------------------------------|
//! | `values.yaml`         | Chart defaults, lowest merge precedence          |
//! | `templates/**/*.tera` | Templates; each renders to zero or more objects  |
//! | `templates/**/_*`     | Partials, available to `include` but not emitted |
//!
//! `.yaml` / `.yml` files under `templates/` are treated as templates too.
//! Templates render in lexical path order with the context
//! `{ values, release: { name, namespace }, chart: { name } }`.

use std::any::Any;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::json;
use tera::Tera;

use manifold_core::{
    is_cluster_scoped, PostRenderer, RenderContext, ResourceObject, SourceName, Values,
};

use crate::documents::parse_documents;
use crate::error::{io_err, SourceError};
use crate::source::{Source, SourceVariant, TypedSource};

const TEMPLATE_EXTENSIONS: &[&str] = &["tera", "yaml", "yml"];

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn is_partial(name: &str) -> bool {
    name.rsplit('/').next().is_some_and(|file| file.starts_with('_'))
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), SourceError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_templates(dir: &Path) -> Result<Vec<(String, String)>, SourceError> {
    if !dir.is_dir() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or_default();
        if !TEMPLATE_EXTENSIONS.contains(&ext) {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

/// A parsed template chart. Template syntax errors surface on construction.
#[derive(Debug, Clone)]
pub struct Chart {
    name: String,
    tera: Tera,
    /// Non-partial templates in render order.
    outputs: Vec<String>,
    defaults: Values,
}

impl Chart {
    /// Load a chart from `dir` (see the module docs for the layout).
    pub fn from_dir(dir: &Path) -> Result<Self, SourceError> {
        if !dir.is_dir() {
            return Err(SourceError::ChartNotFound {
                path: dir.to_path_buf(),
            });
        }
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());
        let templates = load_templates(&dir.join("templates"))?;
        let values_path = dir.join("values.yaml");
        let defaults = if values_path.is_file() {
            Values::load(&values_path)?
        } else {
            Values::new()
        };
        tracing::debug!(chart = %name, templates = templates.len(), "loaded chart");
        Ok(Self::from_templates(name, templates)?.with_defaults(defaults))
    }

    /// Build a chart from in-memory `(name, contents)` templates.
    pub fn from_templates<I, N, C>(name: impl Into<String>, templates: I) -> Result<Self, SourceError>
    where
        I: IntoIterator<Item = (N, C)>,
        N: Into<String>,
        C: Into<String>,
    {
        let name = name.into();
        let templates: BTreeMap<String, String> = templates
            .into_iter()
            .map(|(n, c)| (n.into(), c.into()))
            .collect();

        let mut tera = Tera::default();
        tera.add_raw_templates(templates.iter().map(|(n, c)| (n.as_str(), c.as_str())))
            .map_err(|source| SourceError::ChartTemplates {
                chart: name.clone(),
                source,
            })?;
        let outputs = templates.keys().filter(|n| !is_partial(n)).cloned().collect();

        Ok(Self {
            name,
            tera,
            outputs,
            defaults: Values::new(),
        })
    }

    /// Replace the chart's default values.
    pub fn with_defaults(mut self, defaults: Values) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defaults(&self) -> &Values {
        &self.defaults
    }

    /// Names of the templates that produce output, in render order.
    pub fn output_templates(&self) -> &[String] {
        &self.outputs
    }
}

// ---------------------------------------------------------------------------
// ChartSource
// ---------------------------------------------------------------------------

/// A chart instantiated as a named release.
#[derive(Debug, Clone)]
pub struct ChartSource {
    pub chart: Chart,
    pub release_name: SourceName,
    /// Namespace applied to namespaced objects that set none.
    pub namespace: Option<String>,
    pub values: Values,
    pub post_renderers: Vec<PostRenderer>,
}

impl ChartSource {
    pub fn new(chart: Chart, release_name: impl Into<SourceName>) -> Self {
        Self {
            chart,
            release_name: release_name.into(),
            namespace: None,
            values: Values::new(),
            post_renderers: Vec::new(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_values(mut self, values: Values) -> Self {
        self.values = values;
        self
    }

    pub fn with_post_renderer(mut self, post_renderer: PostRenderer) -> Self {
        self.post_renderers.push(post_renderer);
        self
    }

    fn build_context(&self, values: &Values) -> tera::Context {
        let mut ctx = tera::Context::new();
        ctx.insert("values", &values.to_value());
        ctx.insert(
            "release",
            &json!({
                "name": self.release_name.as_str(),
                "namespace": self.namespace.as_deref().unwrap_or_default(),
            }),
        );
        ctx.insert("chart", &json!({ "name": self.chart.name() }));
        ctx
    }
}

impl Source for ChartSource {
    fn name(&self) -> &SourceName {
        &self.release_name
    }

    fn variant(&self) -> SourceVariant {
        Self::VARIANT
    }

    fn values(&self) -> &Values {
        &self.values
    }

    fn post_renderers(&self) -> &[PostRenderer] {
        &self.post_renderers
    }

    /// Render every output template with chart defaults merged under `values`.
    fn render(
        &self,
        ctx: &RenderContext,
        values: &Values,
    ) -> Result<Vec<ResourceObject>, SourceError> {
        let values = self.chart.defaults().merged(values);
        let tera_ctx = self.build_context(&values);

        let mut objects = Vec::new();
        for template in self.chart.output_templates() {
            ctx.check()?;
            let rendered = self
                .chart
                .tera
                .render(template, &tera_ctx)
                .map_err(|source| SourceError::Template {
                    template: template.clone(),
                    source,
                })?;
            for mut obj in parse_documents(&rendered, template)? {
                if let Some(ns) = &self.namespace {
                    if obj.namespace().is_empty() && !is_cluster_scoped(obj.kind()) {
                        obj.set_namespace(ns);
                    }
                }
                objects.push(obj);
            }
        }
        tracing::debug!(
            release = %self.release_name,
            chart = %self.chart.name(),
            objects = objects.len(),
            "rendered chart"
        );
        Ok(objects)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl TypedSource for ChartSource {
    const VARIANT: SourceVariant = SourceVariant::new("chart");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
