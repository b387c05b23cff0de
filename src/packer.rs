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

//! Packing [`GelfDocument`]s into bytes.
//!
//! [`pack`] serializes a document to compact JSON, optionally zlib-compressed. The result is a
//! [`PackedMessage`]: the only thing a [`Transport`](crate::transport::Transport) will accept.
//! This is designed to make illegal states unrepresentable: if transports simply took a slice of
//! `u8` then callers could mistakenly pass _anything_ to them. [`unpack`] reverses the process.
//!
//! A few values don't survive the trip as themselves: booleans, byte strings, timestamps & opaque
//! values all come back as text.

use crate::{
    document::GelfDocument,
    error::{Error, Result},
    value::Value,
};

use backtrace::Backtrace;
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use indexmap::IndexMap;

use std::{
    io::{Read, Write},
    ops::Deref,
};

/// A GELF document, serialized & ready for transport
#[derive(Clone, Debug, PartialEq)]
pub struct PackedMessage {
    bytes: Vec<u8>,
    compressed: bool,
}

impl PackedMessage {
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Deref for PackedMessage {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

fn to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        // Stringify booleans so that every consumer sees the same thing
        Value::Bool(b) => Json::String(b.to_string()),
        Value::Int(i) => Json::from(*i),
        Value::UInt(u) => Json::from(*u),
        Value::Float(x) => serde_json::Number::from_f64(*x)
            .map(Json::Number)
            .unwrap_or_else(|| Json::String(x.to_string())),
        Value::Str(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::String(String::from_utf8_lossy(b).into_owned()),
        Value::Timestamp(t) => Json::String(t.to_rfc3339()),
        Value::List(l) => Json::Array(l.iter().map(to_json).collect()),
        Value::Map(m) => Json::Object(m.iter().map(|(k, v)| (k.clone(), to_json(v))).collect()),
        Value::Opaque(s) => Json::String(s.clone()),
    }
}

fn from_json(json: serde_json::Value) -> Value {
    use serde_json::Value as Json;
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(b),
        Json::Number(n) => {
            if let Some(u) = n.as_u64() {
                Value::UInt(u)
            } else if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Json::String(s) => Value::Str(s),
        Json::Array(a) => Value::List(a.into_iter().map(from_json).collect()),
        Json::Object(o) => Value::Map(o.into_iter().map(|(k, v)| (k, from_json(v))).collect()),
    }
}

/// Serialize `doc` to compact JSON, compressing it with zlib if `compress` is set.
pub fn pack(doc: &GelfDocument, compress: bool) -> Result<PackedMessage> {
    let object: serde_json::Map<String, serde_json::Value> =
        doc.iter().map(|(k, v)| (k.clone(), to_json(v))).collect();
    let json = serde_json::to_vec(&object).map_err(|err| Error::Pack {
        source: Box::new(err),
        back: Backtrace::new(),
    })?;
    let bytes = if compress {
        let mut encoder =
            ZlibEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
        encoder.write_all(&json).map_err(|err| Error::Pack {
            source: Box::new(err),
            back: Backtrace::new(),
        })?;
        encoder.finish().map_err(|err| Error::Pack {
            source: Box::new(err),
            back: Backtrace::new(),
        })?
    } else {
        json
    };
    Ok(PackedMessage {
        bytes,
        compressed: compress,
    })
}

/// Inflate (if need be) & parse a packed GELF message.
pub fn unpack(msg: &PackedMessage) -> Result<GelfDocument> {
    let inflated;
    let json: &[u8] = if msg.compressed {
        let mut buf = Vec::with_capacity(msg.bytes.len() * 4);
        ZlibDecoder::new(&msg.bytes[..])
            .read_to_end(&mut buf)
            .map_err(|err| Error::Unpack {
                source: Box::new(err),
                back: Backtrace::new(),
            })?;
        inflated = buf;
        &inflated
    } else {
        &msg.bytes
    };
    match serde_json::from_slice(json).map_err(|err| Error::Unpack {
        source: Box::new(err),
        back: Backtrace::new(),
    })? {
        serde_json::Value::Object(o) => Ok(GelfDocument::from(
            o.into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect::<IndexMap<String, Value>>(),
        )),
        _ => Err(Error::Unpack {
            source: "a GELF message must be a JSON object".into(),
            back: Backtrace::new(),
        }),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::{event::LogEvent, level::LogLevel, normalizer::Normalizer};

    use chrono::prelude::*;

    fn hello() -> GelfDocument {
        let event = LogEvent::builder(LogLevel::INFO, "hello")
            .logger("app")
            .timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
            .build();
        Normalizer::builder()
            .localname("h1")
            .debugging_fields(false)
            .extra_fields(false)
            .args_fields(false)
            .build()
            .unwrap()
            .normalize(&event)
    }

    #[test]
    fn test_end_to_end_document() {
        let packed = pack(&hello(), false).unwrap();
        assert!(!packed.is_compressed());
        assert_eq!(
            std::str::from_utf8(&packed).unwrap(),
            r#"{"version":"1.0","host":"h1","short_message":"hello","timestamp":1700000000.0,"level":6,"facility":"app"}"#
        );
    }

    #[test]
    fn test_coercions() {
        let mut doc = GelfDocument::new();
        doc.insert("_flag", true);
        doc.insert("_raw", b"caf\xc3\xa9 \xff".to_vec());
        doc.insert("_when", Utc.timestamp_opt(0, 0).unwrap());
        doc.insert("_what", Value::opaque(&std::time::Duration::from_secs(1)));
        doc.insert("_nan", f64::NAN);
        doc.insert("_nothing", Value::Null);
        let mut inner = IndexMap::new();
        inner.insert("ok".to_owned(), Value::Bool(false));
        doc.insert("_nested", Value::List(vec![Value::Map(inner), Value::Int(-1)]));

        let packed = pack(&doc, false).unwrap();
        assert_eq!(
            std::str::from_utf8(&packed).unwrap(),
            concat!(
                r#"{"_flag":"true","_raw":"café �","_when":"1970-01-01T00:00:00+00:00","#,
                r#""_what":"1s","_nan":"NaN","_nothing":null,"_nested":[{"ok":"false"},-1]}"#
            )
        );
    }

    #[test]
    fn test_round_trip() {
        let mut doc = hello();
        doc.insert("_flag", false);
        doc.insert("_count", 3i64);
        doc.insert("_ratio", 0.25);

        for compress in [false, true] {
            let packed = pack(&doc, compress).unwrap();
            assert_eq!(packed.is_compressed(), compress);
            let back = unpack(&packed).unwrap();

            let mut expected = doc.clone();
            // Booleans come back as text; non-negative integers as unsigned
            expected.insert("_flag", "false");
            expected.insert("_count", Value::UInt(3));
            assert_eq!(back, expected);
        }
    }

    #[test]
    fn test_compression() {
        let mut doc = hello();
        doc.insert("short_message", "a".repeat(4096));
        let plain = pack(&doc, false).unwrap();
        let packed = pack(&doc, true).unwrap();
        assert!(packed.len() < plain.len());
        // zlib framing: CMF byte for deflate with a 32K window
        assert_eq!(packed[0], 0x78);
        let mut inflated = Vec::new();
        ZlibDecoder::new(&packed[..])
            .read_to_end(&mut inflated)
            .unwrap();
        assert_eq!(inflated, plain.into_bytes());
    }

    #[test]
    fn test_idempotent() {
        let doc = hello();
        assert_eq!(pack(&doc, false).unwrap(), pack(&doc, false).unwrap());
        assert_eq!(pack(&doc, true).unwrap(), pack(&doc, true).unwrap());
    }

    #[test]
    fn test_unpack_garbage() {
        let msg = PackedMessage {
            bytes: b"[1,2,3]".to_vec(),
            compressed: false,
        };
        assert!(unpack(&msg).is_err());
        let msg = PackedMessage {
            bytes: b"not zlib".to_vec(),
            compressed: true,
        };
        assert!(unpack(&msg).is_err());
    }
}
