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

//! # General tracing-gelf Documentation
//!
//! ## From tracing Events to GELF Messages
//!
//! The translation from a tracing [Event] to bytes on the wire happens in four steps:
//!
//! [Event]: tracing::Event
//!
//! 1. flattening the [Event] (along with its enclosing spans' fields) to a [LogEvent]
//! 2. normalizing the [LogEvent] into a [GelfDocument]
//! 3. packing the [GelfDocument] into a [PackedMessage]: compact JSON, optionally zlib-compressed
//! 4. transporting that message to the collector
//!
//! [LogEvent]: crate::event::LogEvent
//! [GelfDocument]: crate::document::GelfDocument
//! [PackedMessage]: crate::packer::PackedMessage
//!
//! Only the first is tracing-specific; steps two through four are bundled together in a
//! [GelfHandler], which can be driven directly by anything that can build a [LogEvent].
//!
//! [GelfHandler]: crate::handler::GelfHandler
//!
//! ### Normalizing
//!
//! A [Normalizer] produces the required GELF fields, then adds (depending on how it was built)
//! source-location & process information, the event's attributes and its arguments, each as an
//! additional `_`-prefixed field. Only `message`, `exc_text` & `id` are skipped: the first two
//! are consumed by the [Layer], and Graylog rejects `_id`. Levels are mapped onto syslog
//! severities; custom levels outside the table are passed through as-is.
//!
//! [Normalizer]: crate::normalizer::Normalizer
//!
//! The `host` field is resolved once, when the [Normalizer] is built: the local hostname, the
//! fully-qualified domain name (feature `fqdn`), or an explicit name. Asking for both of the last
//! two is an error.
//!
//! ### Sending
//!
//! The [Transport] trait defines this step, and a number of implementations are provided:
//!
//! [Transport]: crate::transport::Transport
//!
//! - [UdpTransport](crate::transport::UdpTransport)
//! - [TcpTransport](crate::transport::TcpTransport)
//! - [TlsTransport](crate::tls::TlsTransport)
//! - [HttpTransport](crate::http::HttpTransport)
//!
//! The stream transports delimit messages with a null byte, which compressed data could contain;
//! they report as much through [supports_compression], and the [GelfHandler] won't compress for
//! them.
//!
//! [supports_compression]: crate::transport::Transport::supports_compression
//!
//! ### Chunking
//!
//! A UDP message larger than the chunk size is handed to a [GelfChunker], which splits it into
//! framed chunks sharing a random message id. Graylog gives up on messages of more than 128 chunks;
//! what happens to those is up to the [ChunkPolicy]: drop them, drop them with a warning, or warn
//! & replace them with a truncated version flagged with `_chunk_overflow`.
//!
//! [GelfChunker]: crate::chunker::GelfChunker
//! [ChunkPolicy]: crate::chunker::ChunkPolicy
//!
//! ## How This Process Plugs-In to the Tracing Framework
//!
//! [Layer] implements [tracing_subscriber::layer::Layer], so it can be "stacked" on top of other
//! layers in your tracing [Subscriber]. It records span fields as spans are created (and updated),
//! and when it receives an [Event] it builds a [LogEvent] & hands it to its [GelfHandler]. Errors
//! are reported via [tracing] itself; [Layer] ignores events originating in this crate, so those
//! reports go only to the other layers.
//!
//! [Layer]: crate::layer::Layer
//! [Subscriber]: tracing::Subscriber
