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

//! Mapping [`LogEvent`]s to [`GelfDocument`]s.
//!
//! [`Normalizer`] implements the first step in shipping a log event to Graylog: flattening the
//! event into a GELF document. Which of the optional fields make it into the document is governed
//! by flags set at construction time through [`NormalizerBuilder`]:
//!
//! ```rust
//! use tracing_gelf::normalizer::Normalizer;
//! let normalizer = Normalizer::builder()
//!     .localname("h1")
//!     .facility("billing")
//!     .level_names(true)
//!     .build()
//!     .unwrap();
//! ```
//!
//! Conflicting options are caught there, too:
//!
//! ```rust
//! use tracing_gelf::normalizer::Normalizer;
//! assert!(Normalizer::builder().fqdn(true).localname("h1").build().is_err());
//! ```

use crate::{
    document::{fields, GelfDocument},
    error::{Error, Result},
    event::{Args, LogEvent, RESERVED_ATTRIBUTES},
    host::HostResolution,
};

use backtrace::Backtrace;
use chrono::prelude::*;

/// Seconds since the epoch, with microsecond resolution
fn gelf_timestamp(t: &DateTime<Utc>) -> f64 {
    t.timestamp_micros() as f64 / 1_000_000.0
}

/// Flattens [`LogEvent`]s into [`GelfDocument`]s
#[derive(Clone, Debug)]
pub struct Normalizer {
    host: String,
    facility: Option<String>,
    debugging_fields: bool,
    extra_fields: bool,
    args_fields: bool,
    level_names: bool,
}

pub struct NormalizerBuilder {
    debugging_fields: bool,
    extra_fields: bool,
    args_fields: bool,
    fqdn: bool,
    localname: Option<String>,
    facility: Option<String>,
    level_names: bool,
}

impl std::default::Default for NormalizerBuilder {
    fn default() -> Self {
        NormalizerBuilder {
            debugging_fields: true,
            extra_fields: true,
            args_fields: true,
            fqdn: false,
            localname: None,
            facility: None,
            level_names: false,
        }
    }
}

impl NormalizerBuilder {
    /// Include source location, function, pid & thread/process names
    pub fn debugging_fields(mut self, debugging_fields: bool) -> Self {
        self.debugging_fields = debugging_fields;
        self
    }
    /// Include the event's attributes as additional fields
    pub fn extra_fields(mut self, extra_fields: bool) -> Self {
        self.extra_fields = extra_fields;
        self
    }
    /// Include the event's mapping-style arguments as additional fields
    pub fn args_fields(mut self, args_fields: bool) -> Self {
        self.args_fields = args_fields;
        self
    }
    /// Use this host's fully-qualified domain name for `host`
    pub fn fqdn(mut self, fqdn: bool) -> Self {
        self.fqdn = fqdn;
        self
    }
    /// Use `localname` for `host`
    pub fn localname<S: Into<String>>(mut self, localname: S) -> Self {
        self.localname = Some(localname.into());
        self
    }
    /// Replace `facility` with `facility`, moving the logger name to `_logger`
    pub fn facility<S: Into<String>>(mut self, facility: S) -> Self {
        self.facility = Some(facility.into());
        self
    }
    /// Add a human-readable `level_name` field
    pub fn level_names(mut self, level_names: bool) -> Self {
        self.level_names = level_names;
        self
    }
    fn host_resolution(&self) -> Result<HostResolution> {
        match (self.fqdn, &self.localname) {
            (true, Some(name)) => Err(Error::ConflictingHostOptions {
                localname: name.clone(),
                back: Backtrace::new(),
            }),
            (true, None) => Ok(HostResolution::Fqdn),
            (false, Some(name)) => Ok(HostResolution::Explicit(name.clone())),
            (false, None) => Ok(HostResolution::Hostname),
        }
    }
    /// Validate the options & resolve the host name.
    pub fn build(self) -> Result<Normalizer> {
        let host = self.host_resolution()?.resolve()?;
        Ok(Normalizer {
            host,
            facility: self.facility,
            debugging_fields: self.debugging_fields,
            extra_fields: self.extra_fields,
            args_fields: self.args_fields,
            level_names: self.level_names,
        })
    }
}

impl Normalizer {
    pub fn builder() -> NormalizerBuilder {
        NormalizerBuilder::default()
    }
    pub fn host(&self) -> &str {
        &self.host
    }
    /// Flatten `event` into a GELF document.
    pub fn normalize(&self, event: &LogEvent) -> GelfDocument {
        let mut doc = GelfDocument::new();
        doc.insert(fields::VERSION, fields::GELF_VERSION);
        doc.insert(fields::HOST, self.host.as_str());
        doc.insert(fields::SHORT_MESSAGE, event.message.as_str());
        doc.insert(fields::TIMESTAMP, gelf_timestamp(&event.timestamp));
        doc.insert(fields::LEVEL, event.level.to_gelf());
        doc.insert(fields::FACILITY, event.logger.as_str());

        self.add_full_message(&mut doc, event);
        if self.level_names {
            doc.insert(fields::LEVEL_NAME, event.level.name());
        }
        if let Some(facility) = &self.facility {
            doc.insert(fields::FACILITY, facility.as_str());
            doc.insert(fields::LOGGER, event.logger.as_str());
        }
        if self.debugging_fields {
            self.add_debugging_fields(&mut doc, event);
        }
        if self.extra_fields {
            self.add_extra_fields(&mut doc, event);
        }
        if self.args_fields {
            self.add_args_fields(&mut doc, event);
        }
        doc
    }
    fn add_full_message(&self, doc: &mut GelfDocument, event: &LogEvent) {
        // Pre-formatted text wins over formatting the error chain ourselves
        let full_message = event
            .exc_text
            .as_ref()
            .filter(|text| !text.is_empty())
            .cloned()
            .or_else(|| {
                event
                    .error
                    .as_ref()
                    .filter(|chain| !chain.is_empty())
                    .map(|chain| chain.to_string())
            });
        if let Some(text) = full_message {
            doc.insert(fields::FULL_MESSAGE, text);
        }
    }
    fn add_debugging_fields(&self, doc: &mut GelfDocument, event: &LogEvent) {
        if let Some(file) = &event.file {
            doc.insert(fields::FILE, file.as_str());
        }
        if let Some(line) = event.line {
            doc.insert(fields::LINE, line);
        }
        if let Some(function) = &event.function {
            doc.insert_additional("function", function.as_str());
        }
        if let Some(pid) = event.pid {
            doc.insert_additional("pid", pid);
        }
        if let Some(thread_name) = &event.thread_name {
            doc.insert_additional("thread_name", thread_name.as_str());
        }
        if let Some(process_name) = &event.process_name {
            doc.insert_additional("process_name", process_name.as_str());
        }
    }
    fn add_extra_fields(&self, doc: &mut GelfDocument, event: &LogEvent) {
        event
            .attributes
            .iter()
            .filter(|(name, _)| {
                !name.starts_with('_') && !RESERVED_ATTRIBUTES.contains(&name.as_str())
            })
            .for_each(|(name, value)| doc.insert_additional(name, value.clone()));
    }
    fn add_args_fields(&self, doc: &mut GelfDocument, event: &LogEvent) {
        if let Some(Args::Mapping(args)) = &event.args {
            args.iter()
                .filter(|(name, _)| name.as_str() != "id")
                .for_each(|(name, value)| doc.insert_additional(name, value.clone()));
        }
    }
}
