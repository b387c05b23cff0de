// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of tracing-gelf.
//
// tracing-gelf is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// tracing-gelf is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
// even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with tracing-gelf.  If
// not, see <http://www.gnu.org/licenses/>.

//! [tracing-gelf](crate) [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! The [`Layer`] turns each [`Event`] into a [`LogEvent`]: the `message` field becomes the short
//! message, a field recorded as an error (or a string field named `exc_text`) becomes the full
//! message, and all other fields become additional GELF fields. Fields of the enclosing spans are
//! supplied as the event's arguments; where two of them share a name, the inner span wins, and a
//! field on the event itself beats any span field. The rest of the work is done by a
//! [`GelfHandler`].
//!
//! `tracing`'s TRACE level has no syslog severity of its own, so by default it's reported as DEBUG
//! (see [`Layer::with_level_mapping`]).
//!
//! Events whose target lies in this crate are ignored, so that a collector that can't be reached
//! (or a message that overflows the chunk limit) doesn't generate still more messages for it.
//!
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html

use crate::{
    error::Result,
    event::{Args, ErrorChain, LogEvent},
    handler::GelfHandler,
    level::LogLevel,
    normalizer::Normalizer,
    transport::{Transport, UdpTransport},
    value::Value,
};

use chrono::Utc;
use indexmap::IndexMap;
use tracing::{field::Field, span, Event};
use tracing_subscriber::layer::Context;

// When the tracing-log feature is enabled, use NormalizeEvent to extract file/line metadata
// from events that originated from the `log` crate. This follows the same pattern used by
// tracing-subscriber's fmt layer.
// See: https://github.com/tokio-rs/tracing/blob/master/tracing-subscriber/src/fmt/fmt_layer.rs
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

const OUR_TARGET: &str = env!("CARGO_CRATE_NAME");

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         field visitors                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Fields recorded on a span, kept in its extensions
struct SpanFields(IndexMap<String, Value>);

#[derive(Default)]
struct FieldVisitor {
    // Spans have no message; everything is an attribute
    is_event: bool,
    message: Option<String>,
    exc_text: Option<String>,
    error: Option<ErrorChain>,
    attributes: IndexMap<String, Value>,
}

impl FieldVisitor {
    fn for_event() -> FieldVisitor {
        FieldVisitor {
            is_event: true,
            ..Default::default()
        }
    }
    fn for_span() -> FieldVisitor {
        FieldVisitor::default()
    }
    fn record(&mut self, field: &Field, value: Value) {
        // `log` records bridged by tracing-log carry their metadata as fields; that's been
        // normalized already.
        #[cfg(feature = "tracing-log")]
        if field.name().starts_with("log.") {
            return;
        }
        self.attributes.insert(field.name().to_owned(), value);
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if self.is_event && field.name() == "message" {
            // The tracing macros "pre-format" the `message` field so that `value` actually refers
            // to a `std::fmt::Arguments` instance, which will print to a debug format without
            // enclosing double-quotes.
            self.message = Some(format!("{:?}", value));
        } else {
            self.record(field, Value::opaque(value));
        }
    }
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            "message" if self.is_event => self.message = Some(value.to_owned()),
            "exc_text" if self.is_event => self.exc_text = Some(value.to_owned()),
            _ => self.record(field, Value::from(value)),
        }
    }
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, Value::Int(value));
    }
    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, Value::UInt(value));
    }
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record(field, Value::Float(value));
    }
    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record(field, Value::Bool(value));
    }
    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        if self.is_event {
            self.error = Some(ErrorChain::from(value));
        } else {
            self.record(field, Value::from(value.to_string()));
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Layer                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

fn default_level_mapping(level: &tracing::Level) -> LogLevel {
    match *level {
        tracing::Level::TRACE => LogLevel::DEBUG,
        _ => LogLevel::from(level),
    }
}

fn process_name() -> Option<String> {
    std::env::current_exe()
        .ok()?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that will send [`Event`]s to a
/// GELF collector.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
pub struct Layer<S, T: Transport>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    handler: GelfHandler<T>,
    map_level: Box<dyn Fn(&tracing::Level) -> LogLevel + Send + Sync>,
    process_name: Option<String>,
    // 👇 gets the compiler to shut-up about unused type parameters.
    subscriber_type: std::marker::PhantomData<S>,
}

/// A [`Layer`] implementation that sends compressed GELF over UDP to port 12202 on localhost,
/// with the default [`Normalizer`] settings.
///
/// May be used with any [`tracing_subscriber::Subscriber`] implementation that supports
/// [`LookupSpan`].
///
/// [`tracing_subscriber::Subscriber`]: https://docs.rs/tracing/latest/tracing/trait.Subscriber.html
/// [`LookupSpan`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/registry/trait.LookupSpan.html
impl<S> Layer<S, UdpTransport>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    pub fn try_default() -> Result<Self> {
        Layer::with_transport(UdpTransport::local()?)
    }
}

impl<S, T: Transport> Layer<S, T>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    /// Construct a Layer around a fully-configured handler
    pub fn new(handler: GelfHandler<T>) -> Self {
        Layer {
            handler,
            map_level: Box::new(default_level_mapping),
            process_name: process_name(),
            subscriber_type: std::marker::PhantomData,
        }
    }
    /// Construct a Layer that will send via `transport` with the default [`Normalizer`]
    pub fn with_transport(transport: T) -> Result<Self> {
        Ok(Layer::new(GelfHandler::new(
            Normalizer::builder().build()?,
            transport,
        )))
    }
    /// Override the mapping from [`tracing::Level`] to [`LogLevel`]
    pub fn with_level_mapping<F>(mut self, map_level: F) -> Self
    where
        F: Fn(&tracing::Level) -> LogLevel + Send + Sync + 'static,
    {
        self.map_level = Box::new(map_level);
        self
    }
    pub fn handler(&self) -> &GelfHandler<T> {
        &self.handler
    }
    fn to_log_event(&self, event: &Event<'_>, ctx: &Context<'_, S>) -> LogEvent {
        // When the tracing-log feature is enabled, use normalized_metadata() to get
        // file/line info for events that originated from the `log` crate.
        // For native tracing events, normalized_metadata() returns None and we use
        // the event's own metadata.
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        let mut visitor = FieldVisitor::for_event();
        event.record(&mut visitor);

        let mut span_fields = IndexMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(SpanFields(fields)) = span.extensions().get::<SpanFields>() {
                    span_fields.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }
        // The event's own fields are the most specific
        span_fields.retain(|name, _| !visitor.attributes.contains_key(name));

        LogEvent {
            level: (self.map_level)(meta.level()),
            message: visitor.message.unwrap_or_default(),
            timestamp: Utc::now(),
            logger: meta.target().to_owned(),
            file: meta.file().map(str::to_owned),
            line: meta.line(),
            function: meta.module_path().map(str::to_owned),
            pid: Some(std::process::id()),
            process_name: self.process_name.clone(),
            thread_name: std::thread::current().name().map(str::to_owned),
            attributes: visitor.attributes,
            args: if span_fields.is_empty() {
                None
            } else {
                Some(Args::Mapping(span_fields))
            },
            exc_text: visitor.exc_text,
            error: visitor.error,
        }
    }
}

/// This is the Big Tuna-- the [`Layer`] implementation.
///
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
impl<S, T> tracing_subscriber::layer::Layer<S> for Layer<S, T>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    T: Transport + 'static,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let mut visitor = FieldVisitor::for_span();
            attrs.record(&mut visitor);
            span.extensions_mut().insert(SpanFields(visitor.attributes));
        }
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        if let Some(span) = ctx.span(id) {
            let mut visitor = FieldVisitor::for_span();
            values.record(&mut visitor);
            let mut extensions = span.extensions_mut();
            match extensions.get_mut::<SpanFields>() {
                Some(SpanFields(fields)) => fields.extend(visitor.attributes),
                None => extensions.insert(SpanFields(visitor.attributes)),
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        if event.metadata().target().starts_with(OUR_TARGET) {
            return;
        }
        self.handler
            .emit(&self.to_log_event(event, &ctx))
            .map(|_| ())
            .unwrap_or_else(|err| {
                ::tracing::error!("failed to send GELF message: {}", err);
            })
    }
}

#[cfg(test)]
mod smoke {

    use super::*;

    use crate::{document::GelfDocument, handler::test::Recorder, packer::unpack};

    use tracing::{error, info, info_span, warn};
    use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

    use std::sync::Arc;

    /// Run `f` under a subscriber with our layer, returning what was sent
    fn capture<F: FnOnce()>(f: F) -> Vec<GelfDocument> {
        let recorder = Arc::new(Recorder::new(true));
        let handler = GelfHandler::new(
            Normalizer::builder().localname("bree.local").build().unwrap(),
            recorder.clone(),
        );
        let subscriber = Registry::default().with(Layer::new(handler));
        tracing::subscriber::with_default(subscriber, f);
        recorder
            .take()
            .iter()
            .map(|msg| unpack(msg).unwrap())
            .collect()
    }

    #[test]
    fn test_event() {
        let docs = capture(|| {
            info!(target: "app", user = "alice", count = 3, ok = true, "Hello, {}!", "世界");
        });
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.get("version"), Some(&Value::from("1.0")));
        assert_eq!(doc.get("host"), Some(&Value::from("bree.local")));
        assert_eq!(doc.get("short_message"), Some(&Value::from("Hello, 世界!")));
        assert_eq!(doc.get("level"), Some(&Value::UInt(6)));
        assert_eq!(doc.get("facility"), Some(&Value::from("app")));
        assert_eq!(doc.get("file"), Some(&Value::from(file!())));
        assert!(doc.contains("line"));
        assert_eq!(doc.get("_function"), Some(&Value::from(module_path!())));
        assert_eq!(doc.get("_pid"), Some(&Value::UInt(std::process::id() as u64)));
        assert_eq!(doc.get("_user"), Some(&Value::from("alice")));
        assert_eq!(doc.get("_count"), Some(&Value::UInt(3)));
        assert_eq!(doc.get("_ok"), Some(&Value::from("true")));
        assert!(!doc.contains("_message"));
    }

    #[test]
    fn test_levels() {
        let docs = capture(|| {
            tracing::trace!(target: "app", "t");
            tracing::debug!(target: "app", "d");
            warn!(target: "app", "w");
            error!(target: "app", "e");
        });
        let levels: Vec<&Value> = docs.iter().map(|d| d.get("level").unwrap()).collect();
        assert_eq!(
            levels,
            vec![
                &Value::UInt(7),
                &Value::UInt(7),
                &Value::UInt(4),
                &Value::UInt(3)
            ]
        );
    }

    #[test]
    fn test_span_fields() {
        let docs = capture(|| {
            let outer = info_span!(target: "app", "request", request_id = 7, user = "bob");
            let _outer = outer.enter();
            let inner = info_span!(
                target: "app",
                "handler",
                user = "carol",
                status = tracing::field::Empty
            );
            let _inner = inner.enter();
            inner.record("status", "ok");
            info!(target: "app", "inside");
        });
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        assert_eq!(doc.get("_request_id"), Some(&Value::UInt(7)));
        // Inner spans shadow outer ones
        assert_eq!(doc.get("_user"), Some(&Value::from("carol")));
        assert_eq!(doc.get("_status"), Some(&Value::from("ok")));
    }

    #[test]
    fn test_event_fields_beat_span_fields() {
        let docs = capture(|| {
            let span = info_span!(target: "app", "request", user = "bob", request_id = 7);
            let _span = span.enter();
            info!(target: "app", user = "alice", "inside");
        });
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("_user"), Some(&Value::from("alice")));
        assert_eq!(docs[0].get("_request_id"), Some(&Value::UInt(7)));
    }

    #[test]
    fn test_fields_named_like_metadata() {
        let docs = capture(|| {
            info!(
                target: "app",
                file = "config.toml",
                line = 17u64,
                error = %"permission denied",
                "opened"
            );
        });
        assert_eq!(docs.len(), 1);
        let doc = &docs[0];
        // The call site still goes in the standard fields...
        assert_eq!(doc.get("file"), Some(&Value::from(file!())));
        // ...& the caller's own fields alongside them
        assert_eq!(doc.get("_file"), Some(&Value::from("config.toml")));
        assert_eq!(doc.get("_line"), Some(&Value::UInt(17)));
        assert_eq!(doc.get("_error"), Some(&Value::from("permission denied")));
        assert!(!doc.contains("full_message"));
    }

    #[test]
    fn test_error_field() {
        #[derive(Debug)]
        struct Cause;
        impl std::fmt::Display for Cause {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "disk on fire")
            }
        }
        impl std::error::Error for Cause {}
        #[derive(Debug)]
        struct Failure(Cause);
        impl std::fmt::Display for Failure {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "write failed")
            }
        }
        impl std::error::Error for Failure {
            fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
                Some(&self.0)
            }
        }

        let docs = capture(|| {
            let err = Failure(Cause);
            error!(
                target: "app",
                error = &err as &(dyn std::error::Error + 'static),
                "couldn't save"
            );
            error!(target: "app", exc_text = "Traceback: ...", "pre-formatted");
        });
        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs[0].get("full_message"),
            Some(&Value::from("write failed\n\nCaused by:\n    disk on fire"))
        );
        assert!(!docs[0].contains("_error"));
        assert_eq!(
            docs[1].get("full_message"),
            Some(&Value::from("Traceback: ..."))
        );
    }

    #[test]
    fn test_own_events_ignored() {
        let docs = capture(|| {
            // This module's target is inside the crate
            info!("not for Graylog");
            info!(target: "app", "for Graylog");
        });
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("short_message"), Some(&Value::from("for Graylog")));
    }

    #[test]
    fn test_level_mapping() {
        let recorder = Arc::new(Recorder::new(false));
        let layer = Layer::new(GelfHandler::new(
            Normalizer::builder().localname("h1").build().unwrap(),
            recorder.clone(),
        ))
        .with_level_mapping(|_| LogLevel::CRITICAL);
        tracing::subscriber::with_default(Registry::default().with(layer), || {
            info!(target: "app", "promoted");
        });
        let sent = recorder.take();
        assert_eq!(unpack(&sent[0]).unwrap().get("level"), Some(&Value::UInt(2)));

        assert_eq!(default_level_mapping(&tracing::Level::TRACE), LogLevel::DEBUG);
        assert_eq!(default_level_mapping(&tracing::Level::WARN), LogLevel::WARNING);
    }
}
