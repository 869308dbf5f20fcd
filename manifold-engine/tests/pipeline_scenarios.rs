//! End-to-end engine scenarios: selection, values, stages and cancellation.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use manifold_core::{
    PostRenderer, RenderContext, ResourceObject, SourceName, StageError, Transformer, Values,
};
use manifold_engine::{
    apply_order::{self, apply_order},
    filter, transformer, Engine, EngineError, RenderOptions, Selector,
};
use manifold_renderer::{
    Chart, ChartSource, ManifestSource, Source, SourceError, SourceVariant, TypedSource,
};
use rstest::rstest;
use serde_json::json;

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A source that counts how often it is rendered.
#[derive(Debug)]
struct CountingSource {
    name: SourceName,
    values: Values,
    renders: Arc<AtomicUsize>,
    fail: bool,
}

impl CountingSource {
    fn new(name: &str) -> (Self, Arc<AtomicUsize>) {
        let renders = Arc::new(AtomicUsize::new(0));
        let source = Self {
            name: name.into(),
            values: Values::new(),
            renders: Arc::clone(&renders),
            fail: false,
        };
        (source, renders)
    }
}

impl Source for CountingSource {
    fn name(&self) -> &SourceName {
        &self.name
    }

    fn variant(&self) -> SourceVariant {
        Self::VARIANT
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
    ) -> Result<Vec<ResourceObject>, SourceError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SourceError::Backend("registry unreachable".into()));
        }
        let mut obj = ResourceObject::new("v1", "ConfigMap", "counted", self.name.as_str());
        obj.set_annotations(
            values
                .as_map()
                .iter()
                .map(|(k, v)| (k.clone(), v.to_string()))
                .collect(),
        );
        Ok(vec![obj])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl TypedSource for CountingSource {
    const VARIANT: SourceVariant = SourceVariant::new("counting");
}

fn web_chart() -> Chart {
    Chart::from_templates(
        "web",
        [
            (
                "00-webhook.yaml.tera",
                "apiVersion: admissionregistration.k8s.io/v1\nkind: ValidatingWebhookConfiguration\nmetadata:\n  name: {{ release.name }}-policy\n",
            ),
            (
                "10-deployment.yaml.tera",
                "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: {{ release.name }}\n  annotations:\n    env: \"{{ values.commonAnnotations.deployEnv | default(value='none') }}\"\nspec:\n  replicas: {{ values.replicaCount }}\n",
            ),
            (
                "20-service.yaml.tera",
                "apiVersion: v1\nkind: Service\nmetadata:\n  name: {{ release.name }}\n",
            ),
            (
                "30-namespace.yaml.tera",
                "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: {{ release.namespace }}\n",
            ),
        ],
    )
    .expect("chart")
}

fn release(name: &str, namespace: &str, replicas: i64) -> ChartSource {
    let mut values = Values::new();
    values.insert("replicaCount", replicas);
    ChartSource::new(web_chart(), name)
        .with_namespace(namespace)
        .with_values(values)
}

fn env_selector(env: &'static str) -> Selector {
    Selector::new::<ChartSource, _>(move |_ctx, chart| {
        Ok(!(env == "production" && chart.release_name.as_str() == "internal-tools"))
    })
}

fn build(env: &'static str) -> Engine {
    let source_hook = PostRenderer::new("source-hook", |_ctx, mut objects: Vec<ResourceObject>| {
        for obj in &mut objects {
            let mut labels = obj.labels();
            labels.insert("source-hook".into(), "true".into());
            obj.set_labels(labels);
        }
        Ok(objects)
    });
    Engine::builder()
        .with_source(release("web-frontend", "web", 2).with_post_renderer(source_hook))
        .with_source(release("internal-tools", "tools", 1))
        .with_selector(env_selector(env))
        .with_transformer(transformer::set_labels([("managed-by", "x")]))
        .with_post_renderer(apply_order())
        .build()
        .expect("engine")
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn excluded_source_is_absent_and_output_is_labelled_and_ordered() {
    init_tracing();
    let engine = build("production");
    let out = engine
        .render(&RenderContext::new(), RenderOptions::new())
        .expect("render");

    assert_eq!(out.len(), 4);
    assert!(out.iter().all(|o| o.namespace() != "tools" && o.name() != "tools"));
    assert!(out.iter().all(|o| o.labels()["managed-by"] == "x"));
    assert!(out.iter().all(|o| o.labels()["source-hook"] == "true"));

    let kinds: Vec<_> = out.iter().map(|o| o.kind()).collect();
    assert_eq!(
        kinds,
        ["Namespace", "Service", "Deployment", "ValidatingWebhookConfiguration"]
    );
}

#[test]
fn staging_renders_both_sources_with_source_hooks_scoped() {
    let engine = build("staging");
    let out = engine
        .render(&RenderContext::new(), RenderOptions::new())
        .expect("render");

    assert_eq!(out.len(), 8);
    for obj in &out {
        let from_frontend = obj.name().starts_with("web") || obj.namespace() == "web";
        assert_eq!(
            obj.labels().contains_key("source-hook"),
            from_frontend,
            "source-level post-renderer must only touch its own source: {}",
            obj.key()
        );
    }
    let first_webhook = out
        .iter()
        .position(|o| o.kind() == "ValidatingWebhookConfiguration")
        .expect("webhook");
    assert!(out[first_webhook..]
        .iter()
        .all(|o| o.kind() == "ValidatingWebhookConfiguration"));
    assert_eq!(out[0].kind(), "Namespace");
    assert_eq!(out[1].kind(), "Namespace");
}

#[rstest]
#[case::production("production", 4, false)]
#[case::staging("staging", 8, true)]
#[case::development("development", 8, true)]
fn selector_decides_per_environment(
    #[case] env: &'static str,
    #[case] expected: usize,
    #[case] has_internal_tools: bool,
) {
    let out = build(env)
        .render(&RenderContext::new(), RenderOptions::new())
        .expect("render");
    assert_eq!(out.len(), expected);
    assert_eq!(out.iter().any(|o| o.name() == "internal-tools"), has_internal_tools);
}

#[test]
fn render_time_values_merge_over_source_values() {
    let engine = build("staging");
    let opts = RenderOptions::new()
        .with_values(Values::try_from(json!({"commonAnnotations": {"deployEnv": "staging"}})).unwrap())
        .with_value("replicaCount", 5);
    let out = engine.render(&RenderContext::new(), opts).expect("render");

    let deployments: Vec<_> = out.iter().filter(|o| o.kind() == "Deployment").collect();
    assert_eq!(deployments.len(), 2);
    for deploy in deployments {
        assert_eq!(deploy.pointer("/spec/replicas"), Some(&json!(5)));
        assert_eq!(deploy.annotations()["env"], "staging");
    }
}

#[test]
fn excluded_source_is_never_rendered() {
    let (kept, kept_renders) = CountingSource::new("kept");
    let (skipped, skipped_renders) = CountingSource::new("skipped");
    let engine = Engine::builder()
        .with_source(kept)
        .with_source(skipped)
        .with_selector(Selector::new::<CountingSource, _>(|_, s| {
            Ok(s.name.as_str() != "skipped")
        }))
        .build()
        .unwrap();

    let out = engine.render(&RenderContext::new(), RenderOptions::new()).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].name(), "kept");
    assert_eq!(kept_renders.load(Ordering::SeqCst), 1);
    assert_eq!(skipped_renders.load(Ordering::SeqCst), 0);
}

#[test]
fn sources_without_selector_pass_through() {
    let (counting, _) = CountingSource::new("counting");
    let engine = Engine::builder()
        .with_source(counting)
        .with_source(ManifestSource::new(
            "static",
            vec![ResourceObject::new("v1", "Secret", "ns", "s")],
        ))
        .with_selector(Selector::new::<ChartSource, _>(|_, _| Ok(false)))
        .build()
        .unwrap();
    let out = engine.render(&RenderContext::new(), RenderOptions::new()).unwrap();
    assert_eq!(out.len(), 2);
}

#[test]
fn selector_error_aborts_with_source_identity() {
    let (counting, renders) = CountingSource::new("probe");
    let engine = Engine::builder()
        .with_source(counting)
        .with_selector(Selector::new::<CountingSource, _>(|_, _| {
            Err("feature flag service down".into())
        }))
        .build()
        .unwrap();
    let err = engine
        .render(&RenderContext::new(), RenderOptions::new())
        .unwrap_err();
    match &err {
        EngineError::Selector { source_name, .. } => assert_eq!(source_name.as_str(), "probe"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("feature flag service down"));
    assert_eq!(renders.load(Ordering::SeqCst), 0);
}

#[test]
fn backend_failure_aborts_without_partial_output() {
    let (ok, _) = CountingSource::new("ok");
    let (mut broken, _) = CountingSource::new("broken");
    broken.fail = true;
    let engine = Engine::builder()
        .with_source(ok)
        .with_source(broken)
        .build()
        .unwrap();
    let err = engine
        .render(&RenderContext::new(), RenderOptions::new())
        .unwrap_err();
    assert!(
        matches!(&err, EngineError::Render { source_name, .. } if source_name.as_str() == "broken"),
        "got: {err}"
    );
    assert!(!err.is_cancellation());
}

#[test]
fn cancelled_context_returns_cancellation_before_any_work() {
    let (counting, renders) = CountingSource::new("c");
    let engine = Engine::builder().with_source(counting).build().unwrap();
    let ctx = RenderContext::new();
    ctx.cancel();

    let err = engine.render(&ctx, RenderOptions::new()).unwrap_err();
    assert!(matches!(err, EngineError::Cancelled), "got: {err}");
    assert!(err.is_cancellation());
    assert_eq!(renders.load(Ordering::SeqCst), 0);
}

#[test]
fn expired_deadline_is_distinct_from_cancel() {
    let engine = Engine::builder().build().unwrap();
    let ctx = RenderContext::new().with_deadline(Instant::now() - Duration::from_millis(1));
    let err = engine.render(&ctx, RenderOptions::new()).unwrap_err();
    assert!(matches!(err, EngineError::DeadlineExceeded), "got: {err}");
}

#[test]
fn cancellation_between_stages_discards_work() {
    let ctx = RenderContext::new();
    let trigger = ctx.clone();
    let engine = Engine::builder()
        .with_source(ManifestSource::new(
            "m",
            vec![ResourceObject::new("v1", "ConfigMap", "ns", "c")],
        ))
        .with_transformer(Transformer::new("cancel-after", move |_, objects| {
            trigger.cancel();
            Ok(objects)
        }))
        .with_post_renderer(PostRenderer::new("unreachable", |_, _| {
            Err(StageError::msg("must not run after cancellation"))
        }))
        .build()
        .unwrap();
    let err = engine.render(&ctx, RenderOptions::new()).unwrap_err();
    assert!(matches!(err, EngineError::Cancelled), "got: {err}");
}

#[test]
fn global_post_renderers_can_filter_across_sources() {
    let engine = Engine::builder()
        .with_source(release("a", "ns-a", 1))
        .with_source(release("b", "ns-b", 1))
        .with_post_renderer(filter::exclude_kinds(["ValidatingWebhookConfiguration"]))
        .with_post_renderer(filter::namespaces(["ns-b", ""]))
        .with_post_renderer(apply_order())
        .build()
        .unwrap();
    let out = engine.render(&RenderContext::new(), RenderOptions::new()).unwrap();
    let keys: Vec<_> = out.iter().map(|o| o.key().to_string()).collect();
    assert_eq!(
        keys,
        [
            "Namespace/ns-a",
            "Namespace/ns-b",
            "Service/ns-b/b",
            "Deployment/ns-b/b",
        ]
    );
}

#[test]
fn output_order_is_independent_of_source_order() {
    let forward = Engine::builder()
        .with_source(release("a", "ns-a", 1))
        .with_source(release("b", "ns-b", 1))
        .with_post_renderer(apply_order())
        .build()
        .unwrap();
    let reverse = Engine::builder()
        .with_source(release("b", "ns-b", 1))
        .with_source(release("a", "ns-a", 1))
        .with_post_renderer(apply_order())
        .build()
        .unwrap();
    let ctx = RenderContext::new();
    let one = forward.render(&ctx, RenderOptions::new()).unwrap();
    let two = reverse.render(&ctx, RenderOptions::new()).unwrap();
    assert_eq!(one, two);

    let mut resorted = one.clone();
    apply_order::sort(&mut resorted);
    assert_eq!(resorted, one);
}
