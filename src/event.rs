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

//! The log event model.
//!
//! A [`LogEvent`] is everything the [`Normalizer`](crate::normalizer::Normalizer) needs to know
//! about a single occurrence. The [`Layer`](crate::layer::Layer) builds these from [`tracing`]
//! events, but callers who don't use [`tracing`] may build them directly with
//! [`LogEvent::builder`] & hand them to a [`GelfHandler`](crate::handler::GelfHandler).
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html

use crate::{level::LogLevel, value::Value};

use chrono::prelude::*;
use indexmap::IndexMap;

/// Attribute names never forwarded as extra fields.
///
/// `message` & `exc_text` are consumed by the layer itself. `id` is in here because Graylog rejects
/// messages with an `_id` field.
pub const RESERVED_ATTRIBUTES: &[&str] = &["exc_text", "id", "message"];

/// Arguments supplied alongside the message
#[derive(Clone, Debug, PartialEq)]
pub enum Args {
    Positional(Vec<Value>),
    Mapping(IndexMap<String, Value>),
}

/// An error, along with the chain of errors that caused it.
///
/// Each entry is the [`Display`](std::fmt::Display) text of one error; the first is the error
/// itself, the rest are its [`source`](std::error::Error::source)s, outermost first.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorChain(Vec<String>);

impl ErrorChain {
    pub fn new(chain: Vec<String>) -> ErrorChain {
        ErrorChain(chain)
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> From<&'a (dyn std::error::Error + 'static)> for ErrorChain {
    fn from(err: &'a (dyn std::error::Error + 'static)) -> Self {
        let mut chain = vec![err.to_string()];
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(cause.to_string());
            source = cause.source();
        }
        ErrorChain(chain)
    }
}

impl std::fmt::Display for ErrorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut iter = self.0.iter();
        if let Some(first) = iter.next() {
            write!(f, "{}", first)?;
        }
        for cause in iter {
            write!(f, "\n\nCaused by:\n    {}", cause)?;
        }
        Ok(())
    }
}

/// A single log occurrence
#[derive(Clone, Debug)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// The logger (or [`tracing`] target) that produced this event
    ///
    /// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
    pub logger: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub function: Option<String>,
    pub pid: Option<u32>,
    pub process_name: Option<String>,
    pub thread_name: Option<String>,
    /// Everything else the event carried
    pub attributes: IndexMap<String, Value>,
    pub args: Option<Args>,
    /// Pre-formatted error text; takes precedence over `error`
    pub exc_text: Option<String>,
    pub error: Option<ErrorChain>,
}

impl LogEvent {
    pub fn builder<S: Into<String>>(level: LogLevel, message: S) -> LogEventBuilder {
        LogEventBuilder {
            imp: LogEvent {
                level,
                message: message.into(),
                timestamp: Utc::now(),
                logger: String::from("root"),
                file: None,
                line: None,
                function: None,
                pid: None,
                process_name: None,
                thread_name: None,
                attributes: IndexMap::new(),
                args: None,
                exc_text: None,
                error: None,
            },
        }
    }
}

pub struct LogEventBuilder {
    imp: LogEvent,
}

impl LogEventBuilder {
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.imp.timestamp = timestamp;
        self
    }
    pub fn logger<S: Into<String>>(mut self, logger: S) -> Self {
        self.imp.logger = logger.into();
        self
    }
    pub fn location<S: Into<String>>(mut self, file: S, line: u32) -> Self {
        self.imp.file = Some(file.into());
        self.imp.line = Some(line);
        self
    }
    pub fn function<S: Into<String>>(mut self, function: S) -> Self {
        self.imp.function = Some(function.into());
        self
    }
    pub fn pid(mut self, pid: u32) -> Self {
        self.imp.pid = Some(pid);
        self
    }
    pub fn process_name<S: Into<String>>(mut self, name: S) -> Self {
        self.imp.process_name = Some(name.into());
        self
    }
    pub fn thread_name<S: Into<String>>(mut self, name: S) -> Self {
        self.imp.thread_name = Some(name.into());
        self
    }
    pub fn attribute<S: Into<String>, V: Into<Value>>(mut self, name: S, value: V) -> Self {
        self.imp.attributes.insert(name.into(), value.into());
        self
    }
    pub fn args(mut self, args: Args) -> Self {
        self.imp.args = Some(args);
        self
    }
    pub fn exc_text<S: Into<String>>(mut self, text: S) -> Self {
        self.imp.exc_text = Some(text.into());
        self
    }
    pub fn error(mut self, err: &(dyn std::error::Error + 'static)) -> Self {
        self.imp.error = Some(ErrorChain::from(err));
        self
    }
    pub fn build(self) -> LogEvent {
        self.imp
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug)]
    struct Inner;
    impl std::fmt::Display for Inner {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "disk full")
        }
    }
    impl std::error::Error for Inner {}

    #[derive(Debug)]
    struct Outer(Inner);
    impl std::fmt::Display for Outer {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "failed to write journal")
        }
    }
    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn error_chain() {
        let err = Outer(Inner);
        let chain = ErrorChain::from(&err as &(dyn std::error::Error + 'static));
        assert_eq!(
            chain.to_string(),
            "failed to write journal\n\nCaused by:\n    disk full"
        );
    }

    #[test]
    fn builder() {
        let event = LogEvent::builder(LogLevel::INFO, "hello")
            .logger("app.db")
            .attribute("user", "alice")
            .attribute("user", "bob")
            .build();
        assert_eq!(event.logger, "app.db");
        // Names are unique; last write wins
        assert_eq!(event.attributes.len(), 1);
        assert_eq!(event.attributes["user"], Value::from("bob"));
        assert!(event.error.is_none());
    }
}
