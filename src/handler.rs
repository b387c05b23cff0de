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

//! Normalize, pack & send.
//!
//! A [`GelfHandler`] is the whole pipeline for one destination: it turns a [`LogEvent`] into a
//! [`GelfDocument`](crate::document::GelfDocument), packs it & hands it to its [`Transport`]. The
//! tracing [`Layer`](crate::layer::Layer) is a thin shell around one of these, but nothing here
//! depends on [`tracing`]; callers with their own events can drive it directly:
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//!
//! ```rust
//! use tracing_gelf::{
//!     event::LogEvent, handler::GelfHandler, level::LogLevel, normalizer::Normalizer,
//!     transport::UdpTransport,
//! };
//! let handler = GelfHandler::new(
//!     Normalizer::builder().localname("bree").build().unwrap(),
//!     UdpTransport::local().unwrap(),
//! );
//! let event = LogEvent::builder(LogLevel::WARNING, "disk 91% full")
//!     .logger("monitor")
//!     .attribute("mount", "/var")
//!     .build();
//! let _ = handler.emit(&event);
//! ```

use crate::{
    error::Result,
    event::LogEvent,
    normalizer::Normalizer,
    packer::{pack, PackedMessage},
    transport::Transport,
};

/// One destination's worth of GELF pipeline
#[derive(Debug)]
pub struct GelfHandler<T: Transport> {
    normalizer: Normalizer,
    compress: bool,
    transport: T,
}

impl<T: Transport> GelfHandler<T> {
    /// Compression is on, unless `transport` can't carry it.
    pub fn new(normalizer: Normalizer, transport: T) -> GelfHandler<T> {
        let compress = transport.supports_compression();
        GelfHandler {
            normalizer,
            compress,
            transport,
        }
    }
    /// Turn zlib compression on or off; a request to turn it on is ignored if the transport
    /// can't carry compressed messages.
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = compress && self.transport.supports_compression();
        self
    }
    pub fn is_compressing(&self) -> bool {
        self.compress
    }
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
    pub fn transport(&self) -> &T {
        &self.transport
    }
    /// Normalize & pack `event`, without sending it.
    pub fn encode(&self, event: &LogEvent) -> Result<PackedMessage> {
        pack(&self.normalizer.normalize(event), self.compress)
    }
    /// Encode `event` & send it, returning the number of bytes written.
    pub fn emit(&self, event: &LogEvent) -> Result<usize> {
        self.transport.send(&self.encode(event)?)
    }
}
