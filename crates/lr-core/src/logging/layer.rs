//! JSONL output layer.
//!
//! Each event becomes one line:
//!
//! ```text
//! {"ts":"...","level":"info","event":"batch.processed","run_id":"run-...","stage":"redact","message":"...","fields":{...}}
//! ```
//!
//! `event` is the tracing target. `run_id` and `stage` come from the
//! nearest enclosing span that recorded them.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

/// Span fields promoted to the top level of every record.
const CORRELATION_KEYS: [&str; 2] = ["run_id", "stage"];

/// Records fields of an event or span into a JSON map.
#[derive(Default)]
struct FieldCollector {
    values: Map<String, Value>,
}

impl FieldCollector {
    fn put(&mut self, field: &Field, value: Value) {
        self.values.insert(field.name().to_string(), value);
    }
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::from(format!("{:?}", value)));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        if let Some(n) = serde_json::Number::from_f64(value) {
            self.put(field, Value::Number(n));
        }
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, Value::Bool(value));
    }
}

/// Correlation values stored in a span's extensions.
struct Correlation(Map<String, Value>);

/// Tracing layer writing one JSON object per event.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> JsonlLayer<W> {
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut collector = FieldCollector::default();
        attrs.record(&mut collector);
        collector
            .values
            .retain(|key, _| CORRELATION_KEYS.contains(&key.as_str()));
        if collector.values.is_empty() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(Correlation(collector.values));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let mut record = Map::new();
        record.insert("ts".into(), Value::from(Utc::now().to_rfc3339()));
        record.insert(
            "level".into(),
            Value::from(meta.level().as_str().to_ascii_lowercase()),
        );
        record.insert("event".into(), Value::from(meta.target()));

        // Innermost span wins.
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(Correlation(values)) = span.extensions().get::<Correlation>() {
                    for (key, value) in values {
                        record.entry(key.clone()).or_insert_with(|| value.clone());
                    }
                }
            }
        }

        let mut collector = FieldCollector::default();
        event.record(&mut collector);
        if let Some(message) = collector.values.remove("message") {
            record.insert("message".into(), message);
        }
        if !collector.values.is_empty() {
            record.insert("fields".into(), Value::Object(collector.values));
        }

        let line = Value::Object(record).to_string();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}
