//! The render orchestrator.
//!
//! ## Stage order of `Engine::render`
//!
//! 1. Evaluate selectors for every source, in configuration order.
//! 2. Render each selected source with `source values ⊕ render-time values`.
//! 3. Run that source's post-renderers over its own output.
//! 4. Concatenate per-source output in configuration order. Sources whose
//!    variant has variant post-renderers are grouped at the position of the
//!    first such source, and the group runs through those post-renderers.
//! 5. Run engine transformers, then render-time transformers.
//! 6. Run engine post-renderers, then render-time post-renderers.
//!
//! The first failure aborts the render; no partial output is returned.
//! Cancellation is checked before every step.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use manifold_core::{PostRenderer, RenderContext, ResourceObject, Transformer};
use manifold_renderer::{Source, SourceVariant, TypedSource};

use crate::error::{render_err, stage_err, ConfigError, EngineError, StageKind, StageScope};
use crate::options::RenderOptions;
use crate::selector::Selector;

// ---------------------------------------------------------------------------
// EngineBuilder
// ---------------------------------------------------------------------------

/// Configuration-time assembly of an [`Engine`].
#[derive(Debug, Default)]
pub struct EngineBuilder {
    sources: Vec<Box<dyn Source>>,
    selectors: Vec<Selector>,
    variant_post_renderers: Vec<(SourceVariant, PostRenderer)>,
    transformers: Vec<Transformer>,
    post_renderers: Vec<PostRenderer>,
}

impl EngineBuilder {
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn with_boxed_source(mut self, source: Box<dyn Source>) -> Self {
        self.sources.push(source);
        self
    }

    /// Register a selector. At most one selector per source variant.
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    /// Register a post-renderer over the combined output of every selected
    /// source of variant `S`. It runs after the sources' own post-renderers
    /// and before any engine transformer.
    pub fn with_variant_post_renderer<S: TypedSource>(mut self, post_renderer: PostRenderer) -> Self {
        self.variant_post_renderers.push((S::VARIANT, post_renderer));
        self
    }

    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformers.push(transformer);
        self
    }

    pub fn with_post_renderer(mut self, post_renderer: PostRenderer) -> Self {
        self.post_renderers.push(post_renderer);
        self
    }

    /// Validate the configuration and produce an [`Engine`].
    ///
    /// Fails with [`ConfigError::ConflictingSelectors`] if two selectors
    /// target the same variant, or [`ConfigError::DuplicateSource`] if two
    /// sources share a name.
    pub fn build(self) -> Result<Engine, EngineError> {
        let mut selectors = HashMap::with_capacity(self.selectors.len());
        for selector in self.selectors {
            let variant = selector.variant();
            if selectors.insert(variant, selector).is_some() {
                return Err(ConfigError::ConflictingSelectors { variant }.into());
            }
        }

        let mut seen = HashSet::with_capacity(self.sources.len());
        for source in &self.sources {
            if !seen.insert(source.name().clone()) {
                return Err(ConfigError::DuplicateSource {
                    name: source.name().clone(),
                }
                .into());
            }
        }

        let mut variant_post_renderers: HashMap<SourceVariant, Vec<PostRenderer>> = HashMap::new();
        for (variant, post_renderer) in self.variant_post_renderers {
            variant_post_renderers.entry(variant).or_default().push(post_renderer);
        }

        Ok(Engine {
            sources: self.sources,
            selectors,
            variant_post_renderers,
            transformers: self.transformers,
            post_renderers: self.post_renderers,
        })
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// A validated pipeline configuration. Reusable across renders.
#[derive(Debug)]
pub struct Engine {
    sources: Vec<Box<dyn Source>>,
    selectors: HashMap<SourceVariant, Selector>,
    variant_post_renderers: HashMap<SourceVariant, Vec<PostRenderer>>,
    transformers: Vec<Transformer>,
    post_renderers: Vec<PostRenderer>,
}

/// One entry of the concatenated output before variant post-renderers run.
enum Slot {
    Objects(Vec<ResourceObject>),
    Variant(SourceVariant),
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn Source> {
        self.sources.iter().map(|s| s.as_ref())
    }

    /// Run the full pipeline once. See the module docs for stage order.
    pub fn render(
        &self,
        ctx: &RenderContext,
        opts: RenderOptions,
    ) -> Result<Vec<ResourceObject>, EngineError> {
        ctx.check()?;

        let selected = self.select(ctx)?;

        let mut outputs = Vec::with_capacity(selected.len());
        for source in selected {
            ctx.check()?;
            let objects = self.render_source(ctx, source, &opts)?;
            outputs.push((source.variant(), objects));
        }
        let mut aggregate = self.concatenate(ctx, outputs)?;

        for transformer in self.transformers.iter() {
            aggregate = apply_transformer(ctx, StageScope::Engine, transformer, aggregate)?;
        }
        for transformer in opts.transformers() {
            aggregate = apply_transformer(ctx, StageScope::Render, transformer, aggregate)?;
        }

        for post_renderer in self.post_renderers.iter() {
            aggregate = apply_post_renderer(ctx, StageScope::Engine, post_renderer, aggregate)?;
        }
        for post_renderer in opts.post_renderers() {
            aggregate = apply_post_renderer(ctx, StageScope::Render, post_renderer, aggregate)?;
        }

        ctx.check()?;
        tracing::info!(objects = aggregate.len(), "render complete");
        Ok(aggregate)
    }

    fn select(&self, ctx: &RenderContext) -> Result<Vec<&dyn Source>, EngineError> {
        let mut selected = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            ctx.check()?;
            let source = source.as_ref();
            let include = match self.selectors.get(&source.variant()) {
                Some(selector) => selector.selects(ctx, source).map_err(|e| {
                    EngineError::Selector {
                        source_name: source.name().clone(),
                        source: e,
                    }
                })?,
                None => true,
            };
            if include {
                selected.push(source);
            } else {
                tracing::debug!(source = %source.name(), variant = %source.variant(), "source excluded by selector");
            }
        }
        Ok(selected)
    }

    fn render_source(
        &self,
        ctx: &RenderContext,
        source: &dyn Source,
        opts: &RenderOptions,
    ) -> Result<Vec<ResourceObject>, EngineError> {
        let name = source.name();
        let values = source.values().merged(opts.values());
        let mut objects = source
            .render(ctx, &values)
            .map_err(|e| render_err(name, e))?;
        tracing::debug!(source = %name, objects = objects.len(), "source rendered");

        for post_renderer in source.post_renderers() {
            objects = apply_post_renderer(
                ctx,
                StageScope::Source(name.clone()),
                post_renderer,
                objects,
            )?;
        }
        Ok(objects)
    }

    /// Concatenate per-source output, running variant post-renderers over
    /// each grouped variant.
    fn concatenate(
        &self,
        ctx: &RenderContext,
        outputs: Vec<(SourceVariant, Vec<ResourceObject>)>,
    ) -> Result<Vec<ResourceObject>, EngineError> {
        let mut groups: HashMap<SourceVariant, Vec<ResourceObject>> = HashMap::new();
        let mut slots = Vec::with_capacity(outputs.len());
        for (variant, objects) in outputs {
            if !self.variant_post_renderers.contains_key(&variant) {
                slots.push(Slot::Objects(objects));
                continue;
            }
            match groups.entry(variant) {
                Entry::Occupied(mut group) => group.get_mut().extend(objects),
                Entry::Vacant(group) => {
                    group.insert(objects);
                    slots.push(Slot::Variant(variant));
                }
            }
        }

        let mut aggregate = Vec::new();
        for slot in slots {
            match slot {
                Slot::Objects(objects) => aggregate.extend(objects),
                Slot::Variant(variant) => {
                    let mut objects = groups.remove(&variant).unwrap_or_default();
                    let stages = self.variant_post_renderers.get(&variant).into_iter().flatten();
                    for post_renderer in stages {
                        objects = apply_post_renderer(
                            ctx,
                            StageScope::Variant(variant),
                            post_renderer,
                            objects,
                        )?;
                    }
                    aggregate.extend(objects);
                }
            }
        }
        Ok(aggregate)
    }
}

fn apply_transformer(
    ctx: &RenderContext,
    scope: StageScope,
    transformer: &Transformer,
    objects: Vec<ResourceObject>,
) -> Result<Vec<ResourceObject>, EngineError> {
    ctx.check()?;
    tracing::debug!(%scope, stage = transformer.name(), objects = objects.len(), "running transformer");
    transformer
        .apply(ctx, objects)
        .map_err(|e| stage_err(scope, StageKind::Transformer, transformer.name(), e))
}

fn apply_post_renderer(
    ctx: &RenderContext,
    scope: StageScope,
    post_renderer: &PostRenderer,
    objects: Vec<ResourceObject>,
) -> Result<Vec<ResourceObject>, EngineError> {
    ctx.check()?;
    tracing::debug!(%scope, stage = post_renderer.name(), objects = objects.len(), "running post-renderer");
    post_renderer
        .apply(ctx, objects)
        .map_err(|e| stage_err(scope, StageKind::PostRenderer, post_renderer.name(), e))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use manifold_core::{StageError, StageResult, Values};
    use manifold_renderer::{Chart, ChartSource, ManifestSource};

    fn manifest(name: &str, kinds: &[&str]) -> ManifestSource {
        let objects = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| ResourceObject::new("v1", kind, "ns", &format!("{name}-{i}")))
            .collect();
        ManifestSource::new(name, objects)
    }

    fn chart(release: &str) -> ChartSource {
        let chart = Chart::from_templates(
            "app",
            [("cm.yaml.tera", "kind: ConfigMap\nmetadata:\n  name: {{ release.name }}\n")],
        )
        .expect("chart");
        ChartSource::new(chart, release).with_namespace("apps")
    }

    fn recorder(name: &str, seen: &Arc<Mutex<Vec<String>>>) -> PostRenderer {
        let seen = Arc::clone(seen);
        PostRenderer::new(name, move |_, objects: Vec<ResourceObject>| {
            let mut seen = seen.lock().map_err(|_| StageError::msg("poisoned"))?;
            seen.extend(objects.iter().map(|o| o.name().to_string()));
            Ok(objects)
        })
    }

    #[test]
    fn empty_engine_renders_nothing() {
        let engine = Engine::builder().build().expect("build");
        let out = engine
            .render(&RenderContext::new(), RenderOptions::new())
            .expect("render");
        assert!(out.is_empty());
    }

    #[test]
    fn conflicting_selectors_fail_at_build() {
        let err = Engine::builder()
            .with_selector(Selector::new::<ChartSource, _>(|_, _| Ok(true)))
            .with_selector(Selector::new::<ChartSource, _>(|_, _| Ok(false)))
            .build()
            .unwrap_err();
        assert!(
            matches!(err, EngineError::Config(ConfigError::ConflictingSelectors { .. })),
            "got: {err}"
        );
    }

    #[test]
    fn selectors_for_distinct_variants_coexist() {
        Engine::builder()
            .with_selector(Selector::new::<ChartSource, _>(|_, _| Ok(true)))
            .with_selector(Selector::new::<ManifestSource, _>(|_, _| Ok(true)))
            .build()
            .expect("distinct variants are fine");
    }

    #[test]
    fn duplicate_source_names_fail_at_build() {
        let err = Engine::builder()
            .with_source(manifest("a", &["ConfigMap"]))
            .with_source(manifest("a", &["Secret"]))
            .build()
            .unwrap_err();
        assert!(
            matches!(err, EngineError::Config(ConfigError::DuplicateSource { .. })),
            "got: {err}"
        );
    }

    #[test]
    fn concatenation_preserves_source_then_render_order() {
        let engine = Engine::builder()
            .with_source(manifest("b", &["Secret", "ConfigMap"]))
            .with_source(manifest("a", &["Service"]))
            .build()
            .unwrap();
        let out = engine.render(&RenderContext::new(), RenderOptions::new()).unwrap();
        let names: Vec<_> = out.iter().map(|o| o.name()).collect();
        assert_eq!(names, ["b-0", "b-1", "a-0"]);
    }

    #[test]
    fn source_post_renderers_see_only_their_source() {
        let count_check = PostRenderer::new("expect-two", |_, objects: Vec<ResourceObject>| {
            if objects.len() != 2 {
                return Err(StageError::msg(format!("saw {} objects", objects.len())));
            }
            Ok(objects)
        });
        let engine = Engine::builder()
            .with_source(manifest("a", &["Secret", "ConfigMap"]).with_post_renderer(count_check))
            .with_source(manifest("b", &["Service", "Service", "Service"]))
            .build()
            .unwrap();
        let out = engine.render(&RenderContext::new(), RenderOptions::new()).unwrap();
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn stages_run_engine_then_render_scope_in_order() {
        let tag = |label: &'static str| {
            move |_: &RenderContext, mut objects: Vec<ResourceObject>| -> StageResult {
                for obj in &mut objects {
                    let mut labels = obj.labels();
                    let trail = labels.remove("trail").unwrap_or_default();
                    labels.insert("trail".into(), format!("{trail}{label}"));
                    obj.set_labels(labels);
                }
                Ok(objects)
            }
        };
        let engine = Engine::builder()
            .with_source(manifest("a", &["ConfigMap"]))
            .with_post_renderer(PostRenderer::new("p1", tag("P")))
            .with_transformer(Transformer::new("t1", tag("T")))
            .build()
            .unwrap();
        let opts = RenderOptions::new()
            .with_transformer(Transformer::new("t2", tag("t")))
            .with_post_renderer(PostRenderer::new("p2", tag("p")));
        let out = engine.render(&RenderContext::new(), opts).unwrap();
        assert_eq!(out[0].labels()["trail"], "TtPp");
    }

    #[test]
    fn sources_are_listed_in_configuration_order() {
        let engine = Engine::builder()
            .with_source(chart("front"))
            .with_source(manifest("crds", &["CustomResourceDefinition"]))
            .build()
            .unwrap();
        let listed: Vec<_> = engine
            .sources()
            .map(|s| (s.name().to_string(), s.variant().as_str()))
            .collect();
        assert_eq!(
            listed,
            [("front".to_string(), "chart"), ("crds".to_string(), "manifest")]
        );
    }

    #[test]
    fn variant_post_renderer_sees_every_source_of_its_variant_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = Engine::builder()
            .with_source(chart("front"))
            .with_source(manifest("crds", &["CustomResourceDefinition"]))
            .with_source(chart("back"))
            .with_variant_post_renderer::<ChartSource>(recorder("charts", &seen))
            .build()
            .unwrap();

        let out = engine.render(&RenderContext::new(), RenderOptions::new()).unwrap();
        assert_eq!(*seen.lock().unwrap(), ["front", "back"]);
        let names: Vec<_> = out.iter().map(|o| o.name()).collect();
        assert_eq!(names, ["front", "back", "crds-0"], "chart group sits at the first chart");
    }

    #[test]
    fn variant_post_renderer_runs_after_source_and_before_engine_stages() {
        let tag = |label: &'static str| {
            move |_: &RenderContext, mut objects: Vec<ResourceObject>| -> StageResult {
                for obj in &mut objects {
                    let mut labels = obj.labels();
                    let trail = labels.remove("trail").unwrap_or_default();
                    labels.insert("trail".into(), format!("{trail}{label}"));
                    obj.set_labels(labels);
                }
                Ok(objects)
            }
        };
        let engine = Engine::builder()
            .with_source(chart("front").with_post_renderer(PostRenderer::new("s", tag("S"))))
            .with_variant_post_renderer::<ChartSource>(PostRenderer::new("v", tag("V")))
            .with_transformer(Transformer::new("t", tag("T")))
            .build()
            .unwrap();
        let out = engine.render(&RenderContext::new(), RenderOptions::new()).unwrap();
        assert_eq!(out[0].labels()["trail"], "SVT");
    }

    #[test]
    fn variant_post_renderer_skipped_without_selected_sources() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let engine = Engine::builder()
            .with_source(chart("front"))
            .with_source(manifest("crds", &["CustomResourceDefinition"]))
            .with_selector(Selector::new::<ChartSource, _>(|_, _| Ok(false)))
            .with_variant_post_renderer::<ChartSource>(recorder("charts", &seen))
            .with_variant_post_renderer::<ManifestSource>(recorder("manifests", &seen))
            .build()
            .unwrap();
        let out = engine.render(&RenderContext::new(), RenderOptions::new()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(*seen.lock().unwrap(), ["crds-0"]);
    }

    #[test]
    fn variant_stage_failure_names_the_variant() {
        let engine = Engine::builder()
            .with_source(chart("front"))
            .with_variant_post_renderer::<ChartSource>(PostRenderer::new("reject", |_, _| {
                Err(StageError::msg("nope"))
            }))
            .build()
            .unwrap();
        let err = engine
            .render(&RenderContext::new(), RenderOptions::new())
            .unwrap_err();
        match &err {
            EngineError::Stage { scope, .. } => {
                assert_eq!(scope, &StageScope::Variant(ChartSource::VARIANT));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(err.to_string(), "variant 'chart' post-renderer 'reject' failed: nope");
    }

    #[test]
    fn stage_failure_identifies_scope_and_stage() {
        let engine = Engine::builder()
            .with_source(
                manifest("a", &["ConfigMap"])
                    .with_post_renderer(PostRenderer::new("reject", |_, _| Err(StageError::msg("nope")))),
            )
            .build()
            .unwrap();
        let err = engine
            .render(&RenderContext::new(), RenderOptions::new())
            .unwrap_err();
        match &err {
            EngineError::Stage { scope, kind, stage, .. } => {
                assert_eq!(scope, &StageScope::Source("a".into()));
                assert_eq!(*kind, StageKind::PostRenderer);
                assert_eq!(stage, "reject");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.to_string(),
            "source 'a' post-renderer 'reject' failed: nope"
        );
    }

    #[test]
    fn stage_reporting_interruption_maps_to_cancellation() {
        let engine = Engine::builder()
            .with_transformer(Transformer::new("slow", |_, _| {
                Err(StageError::Interrupted(manifold_core::Interrupted::DeadlineExceeded))
            }))
            .build()
            .unwrap();
        let err = engine
            .render(&RenderContext::new(), RenderOptions::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::DeadlineExceeded), "got: {err}");
        assert!(err.is_cancellation());
    }

    #[test]
    fn repeated_renders_do_not_leak_mutations() {
        let engine = Engine::builder()
            .with_source(manifest("a", &["ConfigMap"]))
            .with_transformer(Transformer::new("mutate", |_, mut objects: Vec<ResourceObject>| {
                for obj in &mut objects {
                    let mut labels = obj.labels();
                    let n = labels.get("n").map(|v| v.len()).unwrap_or(0);
                    labels.insert("n".into(), "x".repeat(n + 1));
                    obj.set_labels(labels);
                }
                Ok(objects)
            }))
            .build()
            .unwrap();
        let ctx = RenderContext::new();
        let first = engine.render(&ctx, RenderOptions::new()).unwrap();
        let second = engine.render(&ctx, RenderOptions::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(second[0].labels()["n"], "x");
    }

    #[test]
    fn render_values_reach_sources() {
        #[derive(Debug)]
        struct Echo {
            name: manifold_core::SourceName,
            values: Values,
        }
        impl Source for Echo {
            fn name(&self) -> &manifold_core::SourceName {
                &self.name
            }
            fn variant(&self) -> SourceVariant {
                SourceVariant::new("echo")
            }
            fn values(&self) -> &Values {
                &self.values
            }
            fn post_renderers(&self) -> &[PostRenderer] {
                &[]
            }
            fn render(
                &self,
                _ctx: &RenderContext,
                values: &Values,
            ) -> Result<Vec<ResourceObject>, manifold_renderer::SourceError> {
                let mut obj = ResourceObject::new("v1", "ConfigMap", "", "echo");
                obj.set_annotations(
                    values
                        .as_map()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_string()))
                        .collect(),
                );
                Ok(vec![obj])
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }

        let mut values = Values::new();
        values.insert("a", 1);
        values.insert("b", 1);
        let engine = Engine::builder()
            .with_source(Echo { name: "echo".into(), values })
            .build()
            .unwrap();
        let out = engine
            .render(&RenderContext::new(), RenderOptions::new().with_value("b", 2))
            .unwrap();
        let annotations = out[0].annotations();
        assert_eq!(annotations["a"], "1");
        assert_eq!(annotations["b"], "2");
    }
}
