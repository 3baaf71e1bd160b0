//! Tracing contract for reconciliation runs.
//!
//! Asserts the `reconcile.run` / `reconcile.cell` span fields and the
//! targets and levels of the events the worker, factory, and controller
//! emit.
//!
//! Run:
//!   cargo test -p splom-runtime --test tracing_reconcile_events

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use splom_core::{Dataset, DatasetView, Descriptor, Size, SubSampler};
use splom_overlay::{Grid, OverlayFactory, StrategyFactory};
use splom_runtime::worker::{self, Plan};
use splom_runtime::{
    CancellationSource, CancellationToken, Controller, MatrixConfig, ReconcileRequest, diff,
};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Capture layer
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    target: String,
    message: String,
}

#[derive(Clone, Default)]
struct Capture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    ids: Arc<Mutex<HashMap<u64, usize>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl Capture {
    fn spans(&self, name: &str) -> Vec<CapturedSpan> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for Capture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        let mut spans = self.spans.lock().unwrap();
        self.ids.lock().unwrap().insert(id.into_u64(), spans.len());
        spans.push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
        });
    }

    fn on_record(
        &self,
        id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        values.record(&mut visitor);
        let Some(&index) = self.ids.lock().unwrap().get(&id.into_u64()) else {
            return;
        };
        self.spans.lock().unwrap()[index].fields.extend(visitor.0);
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let message = visitor
            .0
            .iter()
            .find(|(k, _)| k == "message")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message,
        });
    }
}

fn with_captured_tracing<F: FnOnce()>(f: F) -> Capture {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    tracing::subscriber::with_default(subscriber, f);
    capture
}

fn grid(columns: usize) -> Grid {
    let names = (0..columns).map(|i| format!("c{i}")).collect();
    let data = (0..columns)
        .map(|c| (0..8).map(|r| ((r + c) * 3 % 8) as f64).collect())
        .collect();
    let view = Arc::new(DatasetView::full(Arc::new(Dataset::new(names, data).unwrap())));
    Grid::new(view, Size::square(40), &StrategyFactory::builtin(), "circle")
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn run_span_records_plan_shape_and_outcome() {
    let capture = with_captured_tracing(|| {
        let mut g = grid(3);
        let plan = Plan::from_diff(diff(&[] as &[String], &["diagonal", "lowess"]));
        worker::run(&mut g, &plan, &OverlayFactory::builtin(), &CancellationToken::never(), 7, &mut |_| {});
    });

    let runs = capture.spans("reconcile.run");
    assert_eq!(runs.len(), 1);
    let f = &runs[0].fields;
    assert_eq!(f["run_id"], "7");
    assert_eq!(f["cells"], "6");
    assert_eq!(f["to_add"], "2");
    assert_eq!(f["to_remove"], "0");
    assert_eq!(f["full_rebuild"], "true");
    assert_eq!(f["outcome"], "completed");

    let cells = capture.spans("reconcile.cell");
    assert_eq!(cells.len(), 6);
    assert_eq!((cells[0].fields["row"].as_str(), cells[0].fields["column"].as_str()), ("0", "1"));
}

#[test]
fn cancelled_run_logs_at_info() {
    let capture = with_captured_tracing(|| {
        let mut g = grid(2);
        let source = CancellationSource::new();
        source.cancel();
        let plan = Plan::from_diff(diff(&[] as &[String], &["diagonal"]));
        worker::run(&mut g, &plan, &OverlayFactory::builtin(), &source.token(), 1, &mut |_| {});
    });
    assert_eq!(capture.spans("reconcile.run")[0].fields["outcome"], "cancelled");
    assert!(capture.events().iter().any(|e| e.level == tracing::Level::INFO
        && e.target == "splom.reconcile"
        && e.message.contains("cancellation observed")));
}

#[test]
fn setup_failure_logs_at_error() {
    let capture = with_captured_tracing(|| {
        let mut g = grid(2);
        let plan = Plan::from_diff(diff(&[] as &[String], &["polygon"]));
        worker::run(&mut g, &plan, &OverlayFactory::builtin(), &CancellationToken::never(), 1, &mut |_| {});
    });
    assert_eq!(capture.spans("reconcile.run")[0].fields["outcome"], "failed");
    assert!(capture.events().iter().any(|e| e.level == tracing::Level::ERROR
        && e.target == "splom.reconcile"));
}

#[test]
fn fallback_logs_a_warning_per_instance() {
    let capture = with_captured_tracing(|| {
        let mut g = grid(2);
        let plan = Plan::from_diff(diff(&[] as &[String], &["not-a-real-overlay-type:x=1"]));
        worker::run(&mut g, &plan, &OverlayFactory::builtin(), &CancellationToken::never(), 1, &mut |_| {});
    });
    let warnings = capture
        .events()
        .into_iter()
        .filter(|e| e.level == tracing::Level::WARN && e.target == "splom.factory")
        .count();
    assert_eq!(warnings, 2);
}

#[test]
fn controller_logs_lifecycle_on_its_own_target() {
    let capture = with_captured_tracing(|| {
        let config = MatrixConfig::default();
        let data = Dataset::new(vec!["a".into(), "b".into()], vec![vec![1.0, 2.0], vec![2.0, 1.0]]).unwrap();
        let mut c = Controller::new(config.clone(), Box::new(SubSampler::new(Arc::new(data), 1)));
        let req = ReconcileRequest::from_config(&config).with_overlays([Descriptor::new("diagonal")]);
        c.start(req).unwrap();
        c.wait();
    });
    let messages: Vec<String> = capture
        .events()
        .into_iter()
        .filter(|e| e.target == "splom.controller" && e.level == tracing::Level::INFO)
        .map(|e| e.message)
        .collect();
    assert_eq!(messages, vec!["reconciliation started", "reconciliation completed"]);
}
