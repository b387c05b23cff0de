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

//! Test writing GELF over UDP to port 12202 on the local host.

use tracing::{debug, error, info, info_span, trace, warn};
use tracing_gelf::{
    chunker::{ChunkPolicy, GelfChunker, WAN_CHUNK},
    handler::GelfHandler,
    layer::Layer,
    normalizer::Normalizer,
    transport::UdpTransport,
};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    // Setup the real subsriber...
    let transport = UdpTransport::local()
        .unwrap()
        .with_chunker(GelfChunker::new(WAN_CHUNK, ChunkPolicy::Truncate).unwrap());
    let handler = GelfHandler::new(
        Normalizer::builder().level_names(true).build().unwrap(),
        transport,
    );
    let subscriber = Registry::default().with(Layer::new(handler));
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("Hello, 世界!");
    debug!("Hello, 世界!");
    info!("Hello, 世界!");
    warn!("Hello, 世界!");
    error!("Hello, 世界!");

    let span = info_span!("request", request_id = 42);
    let _enter = span.enter();
    info!(user = "alice", "Inside a span.");
    // Chunked...
    info!("{}", "x".repeat(8 * WAN_CHUNK));
    // & truncated.
    info!("{}", "y".repeat(256 * WAN_CHUNK));
}
