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

//! Test POSTing GELF to port 12203 on the local host.

use tracing::{debug, error, info, trace, warn};
use tracing_gelf::{http::HttpTransport, layer::Layer};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    // Setup the real subsriber...
    let subscriber = Registry::default()
        .with(Layer::with_transport(HttpTransport::try_default().unwrap()).unwrap());
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("Hello, HTTP.");
    debug!("Hello, HTTP.");
    info!(transport = "http", "Hello, HTTP.");
    warn!("Hello, HTTP.");
    error!("Hello, HTTP.");
}
