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

//! Figuring out what to put in the GELF `host` field.

use crate::error::{Error, Result};

use backtrace::Backtrace;

/// Where the `host` field comes from
#[derive(Clone, Debug, PartialEq)]
pub enum HostResolution {
    /// The local hostname, as reported by the OS
    Hostname,
    /// The fully-qualified domain name of this host
    Fqdn,
    /// A caller-supplied name
    Explicit(String),
}

impl HostResolution {
    pub fn resolve(&self) -> Result<String> {
        match self {
            HostResolution::Hostname => hostname(),
            HostResolution::Fqdn => fqdn(),
            HostResolution::Explicit(name) => Ok(name.clone()),
        }
    }
}

/// Attempt to figure-out the local hostname.
///
/// This will first simply try [gethostname()]; failing that it will use the local IP address.
///
/// [gethostname()]: https://man7.org/linux/man-pages/man2/gethostname.2.html
pub fn hostname() -> Result<String> {
    hostname::get()
        .map(|hn| hn.to_string_lossy().into_owned())
        .or_else(|err| {
            local_ip_address::local_ip()
                .map(|ip| ip.to_string())
                .map_err(|_| Error::NoHostname {
                    source: Box::new(err),
                    back: Backtrace::new(),
                })
        })
}

/// Attempt to figure-out the fully-qualified domain name of this host.
///
/// If the local hostname already has a domain, that's it. Otherwise, look up the hostname's
/// addresses & take the first name from a reverse lookup that has a domain. If nothing turns up,
/// fall back to the plain hostname.
#[cfg(feature = "fqdn")]
pub fn fqdn() -> Result<String> {
    let name = hostname()?;
    if name.contains('.') {
        return Ok(name);
    }
    // The resolver is async; run it on a private runtime in its own thread so that we don't trip
    // over a runtime the caller may already have running on this one.
    let lookup = name.clone();
    let resolved = std::thread::spawn(move || resolve_fqdn(&lookup))
        .join()
        .ok()
        .flatten();
    Ok(resolved.unwrap_or(name))
}

#[cfg(feature = "fqdn")]
fn resolve_fqdn(name: &str) -> Option<String> {
    use hickory_resolver::Resolver;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .ok()?;
    runtime.block_on(async {
        let resolver = Resolver::builder_tokio().ok()?.build();
        let ips = resolver.lookup_ip(name).await.ok()?;
        for ip in ips.iter() {
            if let Ok(names) = resolver.reverse_lookup(ip).await {
                if let Some(fqdn) = names
                    .iter()
                    .map(|ptr| ptr.to_string().trim_end_matches('.').to_owned())
                    .find(|n| n.contains('.'))
                {
                    return Some(fqdn);
                }
            }
        }
        None
    })
}

/// Without a resolver, the best we can do is the hostname.
#[cfg(not(feature = "fqdn"))]
pub fn fqdn() -> Result<String> {
    hostname()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolution() {
        // At least _exercise_ the OS-backed paths
        let _x = HostResolution::Hostname.resolve();
        assert_eq!(
            HostResolution::Explicit("h1".to_owned()).resolve().unwrap(),
            "h1"
        );
    }
}
