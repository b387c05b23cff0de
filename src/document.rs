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

//! The GELF document.
//!
//! A [`GelfDocument`] is an insertion-ordered mapping of field name to [`Value`]. GELF servers
//! don't care about field order, but keeping it makes the packed output deterministic.

use crate::value::Value;

use indexmap::IndexMap;

/// GELF message field names. Definitions from <https://go2docs.graylog.org/current/getting_in_log_data/gelf.html>.
pub mod fields {
    /// (not a field) The GELF version we speak
    pub const GELF_VERSION: &str = "1.0";
    /// (required) GELF spec version
    pub const VERSION: &str = "version";
    /// (required) The name of the host, source or application that sent this message.
    pub const HOST: &str = "host";
    /// (required) A short descriptive message.
    pub const SHORT_MESSAGE: &str = "short_message";
    /// (optional) A long message that can i.e. contain a backtrace
    pub const FULL_MESSAGE: &str = "full_message";
    /// (optional) Seconds since UNIX epoch with optional decimal places
    pub const TIMESTAMP: &str = "timestamp";
    /// (optional) The syslog severity
    pub const LEVEL: &str = "level";
    /// (optional) (deprecated) The logical source of the message
    pub const FACILITY: &str = "facility";
    /// (optional) (deprecated) The line in a file that caused the error
    pub const LINE: &str = "line";
    /// (optional) (deprecated) The file that caused the error
    pub const FILE: &str = "file";
    /// Human-readable level name
    pub const LEVEL_NAME: &str = "level_name";
    /// Marks a message that was cut down to fit in 128 chunks
    pub const CHUNK_OVERFLOW: &str = "_chunk_overflow";
    /// The logger name, when the facility has been overridden
    pub const LOGGER: &str = "_logger";
}

/// An insertion-ordered GELF message
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GelfDocument(IndexMap<String, Value>);

impl GelfDocument {
    pub fn new() -> GelfDocument {
        GelfDocument(IndexMap::new())
    }
    /// Set `name` to `value`; an existing field keeps its position but takes the new value.
    pub fn insert<S: Into<String>, V: Into<Value>>(&mut self, name: S, value: V) {
        self.0.insert(name.into(), value.into());
    }
    /// Add `value` as the additional field `_<name>`
    pub fn insert_additional<V: Into<Value>>(&mut self, name: &str, value: V) {
        self.0.insert(format!("_{}", name), value.into());
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.shift_remove(name)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl From<IndexMap<String, Value>> for GelfDocument {
    fn from(map: IndexMap<String, Value>) -> Self {
        GelfDocument(map)
    }
}

impl<'a> IntoIterator for &'a GelfDocument {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ordering() {
        let mut doc = GelfDocument::new();
        doc.insert(fields::VERSION, fields::GELF_VERSION);
        doc.insert(fields::HOST, "h1");
        doc.insert_additional("user", "alice");
        doc.insert(fields::HOST, "h2");
        let keys: Vec<&str> = doc.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["version", "host", "_user"]);
        assert_eq!(doc.get("host"), Some(&Value::from("h2")));
        assert_eq!(doc.remove("_user"), Some(Value::from("alice")));
        assert_eq!(doc.len(), 2);
    }
}
