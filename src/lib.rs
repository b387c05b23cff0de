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

//! A [`tracing-subscriber`] [`Layer`] implementation for sending [`tracing`] [`Event`]s to
//! [Graylog] (or anything else that speaks [GELF])
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//! [`tracing`]: https://docs.rs/tracing/0.1.35/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//! [Graylog]: https://graylog.org
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//!
//! # Introduction
//!
//! GELF, the Graylog Extended Log Format, is a JSON document with a handful of well-known fields
//! (`version`, `host`, `short_message`, `timestamp`, `level` & so on) plus any number of
//! "additional" fields whose names begin with an underscore. Unlike syslog, it's structured from
//! the start, which makes it a natural fit for [`tracing`], whose events are themselves bags of
//! typed fields.
//!
//! GELF documents may be shipped over UDP (optionally zlib-compressed, and split into "chunks" if
//! they don't fit in a single datagram), TCP (null-terminated, uncompressed), TCP over TLS, or
//! HTTP. This crate supports all four; TLS & HTTP are behind the `tls` & `http` features,
//! respectively (both on by default).
//!
//! # Usage
//!
//! [`tracing-gelf`](crate)'s [`Layer`] comes with sane defaults:
//!
//! ```rust
//! use tracing::info;
//! use tracing_gelf::layer::Layer;
//! use tracing_subscriber::registry::Registry;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//!
//! // The default configuration is to send compressed GELF via UDP to port 12202 on the
//! // localhost, splitting messages into WAN-sized chunks as needed.
//! let subscriber = Registry::default().with(Layer::try_default().unwrap());
//!
//! info!(user = "alice", "Hello, world!");
//! ```
//!
//! Will produce GELF messages that look something like this:
//!
//! ```text
//! {"version":"1.0","host":"bree","short_message":"Hello, world!","timestamp":1656025855.12,
//!  "level":6,"facility":"my_app","file":"src/main.rs","line":12,...,"_user":"alice"}
//! ```
//!
//! That said, the transport, the chunking & the shape of the GELF document are all configurable:
//!
//! ```no_run
//! use tracing::info;
//! use tracing_gelf::{
//!     chunker::{ChunkPolicy, GelfChunker, LAN_CHUNK},
//!     handler::GelfHandler,
//!     layer::Layer,
//!     normalizer::Normalizer,
//!     transport::UdpTransport,
//! };
//! use tracing_subscriber::registry::Registry;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//!
//! let normalizer = Normalizer::builder()
//!     .fqdn(true)
//!     .facility("billing")
//!     .level_names(true)
//!     .build()
//!     .unwrap();
//! let transport = UdpTransport::new("graylog.corp.io:12202")
//!     .unwrap()
//!     .with_chunker(GelfChunker::new(LAN_CHUNK, ChunkPolicy::Truncate).unwrap());
//! let subscriber = Registry::default().with(Layer::new(GelfHandler::new(normalizer, transport)));
//!
//! info!("Hello, world!");
//! ```
//!
//! Will send LAN-sized chunks to port 12202 on graylog.corp.io, cutting down any message too large
//! to fit in 128 of them.

pub mod _docs;
pub mod chunker;
pub mod document;
pub mod error;
pub mod event;
pub mod handler;
pub mod host;
#[cfg(feature = "http")]
pub mod http;
pub mod layer;
pub mod level;
pub mod normalizer;
pub mod packer;
#[cfg(feature = "tls")]
pub mod tls;
pub mod transport;
pub mod value;
