// Copyright 2024 PRAGMA
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Collect `tracing` spans and events as JSON values, for assertions in tests.
//!
//! Every collected value carries a `name`, a `type` (`span` or `event`) and a `level`, along with
//! the recorded fields. Dotted field names (`a.b`) become nested objects. Field values are
//! escaped through `serde_json`, whatever their `Debug` implementation produces.
//!
//! ```rust
//! use lstate_tracing_json::assert_trace;
//! use serde_json::json;
//!
//! assert_trace(
//!     || tracing::info!(slot = 42, "snapshot.written"),
//!     vec![json!({ "name": "snapshot.written", "type": "event", "level": "INFO", "slot": 42 })],
//! );
//! ```

use serde_json as json;
use std::{
    fmt,
    sync::{Arc, Mutex},
};
use tracing::{field::Field, Dispatch, Level};
use tracing_subscriber::{layer::Context, layer::SubscriberExt, registry::LookupSpan, Layer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Span,
    Event,
}

impl Kind {
    fn as_str(&self) -> &'static str {
        match self {
            Kind::Span => "span",
            Kind::Event => "event",
        }
    }
}

struct Record {
    kind: Kind,
    name: String,
    level: Level,
    fields: json::Map<String, json::Value>,
}

impl From<Record> for json::Value {
    fn from(record: Record) -> Self {
        let mut object = json::Map::new();
        object.insert("name".to_string(), record.name.into());
        object.insert("type".to_string(), record.kind.as_str().into());
        object.insert("level".to_string(), record.level.to_string().into());
        object.extend(record.fields);
        json::Value::Object(object)
    }
}

/// Shared sink of the records produced by a [`JsonLayer`].
#[derive(Clone, Default)]
pub struct JsonTraceCollector(Arc<Mutex<Vec<Record>>>);

impl JsonTraceCollector {
    fn push(&self, record: Record) {
        match self.0.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }

    /// Take every record collected so far, oldest first.
    pub fn drain(&self) -> Vec<json::Value> {
        let records = match self.0.lock() {
            Ok(mut records) => std::mem::take(&mut *records),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        records.into_iter().map(json::Value::from).collect()
    }
}

/// Gathers the fields of a span or an event; `a.b = 1` ends up as `{ "a": { "b": 1 } }`.
#[derive(Default)]
struct Fields(json::Map<String, json::Value>);

impl Fields {
    fn insert(&mut self, path: &str, value: json::Value) {
        let (parents, leaf) = match path.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, path),
        };

        let mut object = &mut self.0;
        for step in parents.into_iter().flat_map(|parents| parents.split('.')) {
            let child = object
                .entry(step.to_string())
                .and_modify(|child| {
                    if !child.is_object() {
                        *child = json::Value::Object(json::Map::new());
                    }
                })
                .or_insert_with(|| json::Value::Object(json::Map::new()));
            object = match child {
                json::Value::Object(child) => child,
                _ => return,
            };
        }

        object.insert(leaf.to_string(), value);
    }

    fn record(&mut self, field: &Field, value: impl Into<json::Value>) {
        self.insert(field.name(), value.into());
    }
}

impl tracing::field::Visit for Fields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.record(field, format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record(field, value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, value);
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record(field, value);
    }

    fn record_bytes(&mut self, field: &Field, value: &[u8]) {
        self.record(field, hex::encode(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record(field, value.to_string());
    }
}

/// A layer turning spans (when created) and events into JSON records.
pub struct JsonLayer(JsonTraceCollector);

impl JsonLayer {
    pub fn new(collector: JsonTraceCollector) -> Self {
        Self(collector)
    }
}

impl<S> Layer<S> for JsonLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        _ctx: Context<'_, S>,
    ) {
        let mut fields = Fields::default();
        attrs.record(&mut fields);
        self.0.push(Record {
            kind: Kind::Span,
            name: attrs.metadata().name().to_string(),
            level: *attrs.metadata().level(),
            fields: fields.0,
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);

        let name = match fields.0.remove("message") {
            Some(json::Value::String(message)) => message,
            _ => String::new(),
        };

        self.0.push(Record {
            kind: Kind::Event,
            name,
            level: *event.metadata().level(),
            fields: fields.0,
        });
    }
}

/// Run `run` while collecting every span and event it emits, from this thread or from threads
/// that inherit its dispatcher.
pub fn collect<F, R>(run: F) -> (R, Vec<json::Value>)
where
    F: FnOnce() -> R,
{
    let collector = JsonTraceCollector::default();
    let dispatch =
        Dispatch::new(tracing_subscriber::registry().with(JsonLayer::new(collector.clone())));
    let result = tracing::dispatcher::with_default(&dispatch, run);
    (result, collector.drain())
}

/// Run `run` and assert that the collected traces are exactly `expected`.
pub fn assert_trace<F, R>(run: F, expected: Vec<json::Value>) -> R
where
    F: FnOnce() -> R,
{
    let (result, traces) = collect(run);
    pretty_assertions::assert_eq!(json::Value::Array(traces), json::Value::Array(expected));
    result
}

/// Names of the collected events, in order of emission.
pub fn event_names(collected: &[json::Value]) -> Vec<&str> {
    collected
        .iter()
        .filter(|value| value["type"] == "event")
        .filter_map(|value| value["name"].as_str())
        .collect()
}

/// The first collected event with the given name.
pub fn find_event<'a>(collected: &'a [json::Value], name: &str) -> Option<&'a json::Value> {
    collected
        .iter()
        .find(|value| value["type"] == "event" && value["name"] == name)
}
