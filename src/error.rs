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
//! [tracing-gelf](crate) errors

use backtrace::Backtrace;

/// [tracing-gelf](crate) error type
///
/// [tracing-gelf](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of
/// a straightforward enumeration with a few match arms chosen on the basis what the caller will
/// need to repond.
///
/// Note that overflowing the GELF chunk limit is _not_ an error; see
/// [`ChunkWarning`](crate::chunker::ChunkWarning).
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    /// Both `fqdn` & `localname` were requested when building a Normalizer
    ConflictingHostOptions { localname: String, back: Backtrace },
    /// TLS certificate validation was requested, but no CA bundle was given
    MissingCaBundle { back: Backtrace },
    /// A TLS client key was given without a client certificate
    KeyfileWithoutCertfile {
        keyfile: std::path::PathBuf,
        back: Backtrace,
    },
    /// A GELF chunk payload must be at least one byte
    BadChunkSize { size: usize, back: Backtrace },
    /// Failed to fetch hostname
    NoHostname {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Failed to serialize or compress a GELF document
    Pack {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Failed to decompress or parse a packed GELF message
    Unpack {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// A compressed message was handed to a null-byte-delimited stream transport
    CompressedStream { back: Backtrace },
    /// TLS setup or handshake failure
    #[cfg(feature = "tls")]
    Tls {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// HTTP request failure
    #[cfg(feature = "http")]
    Http {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// General transport layer error
    Transport {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::ConflictingHostOptions { localname, .. } => write!(
                f,
                "cannot use the fully-qualified domain name and the explicit hostname {:?} together",
                localname
            ),
            Error::MissingCaBundle { .. } => {
                write!(f, "CA bundle file path must be specified to validate certificates")
            }
            Error::KeyfileWithoutCertfile { keyfile, .. } => write!(
                f,
                "the TLS client key {:?} was given without a client certificate",
                keyfile
            ),
            Error::BadChunkSize { size, .. } => {
                write!(f, "{} is not a usable GELF chunk size", size)
            }
            Error::NoHostname { source, .. } => {
                write!(f, "Unable to determine this host's name: {}", source)
            }
            Error::Pack { source, .. } => write!(f, "While packing a GELF document, got {}", source),
            Error::Unpack { source, .. } => {
                write!(f, "While unpacking a GELF message, got {}", source)
            }
            Error::CompressedStream { .. } => write!(
                f,
                "GELF over TCP is null-byte delimited, and so cannot carry compressed messages"
            ),
            #[cfg(feature = "tls")]
            Error::Tls { source, .. } => write!(f, "TLS error: {}", source),
            #[cfg(feature = "http")]
            Error::Http { source, .. } => write!(f, "HTTP error: {}", source),
            Error::Transport { source, .. } => write!(f, "Transport error: {}", source),
            _ => write!(f, "Other tracing-gelf error"),
        }
    }
}

impl std::fmt::Debug for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::ConflictingHostOptions { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::MissingCaBundle { back } => write!(f, "{}\n{:?}", self, back),
            Error::KeyfileWithoutCertfile { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::BadChunkSize { back, .. } => write!(f, "{}\n{:?}", self, back),
            Error::NoHostname { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Pack { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Unpack { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::CompressedStream { back } => write!(f, "{}\n{:?}", self, back),
            #[cfg(feature = "tls")]
            Error::Tls { source: _, back } => write!(f, "{}\n{:?}", self, back),
            #[cfg(feature = "http")]
            Error::Http { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Transport { source: _, back } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "tracing-gelf error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_debug_carries_backtrace() {
        #[allow(unused_mut)]
        let mut errs = vec![
            Error::BadChunkSize {
                size: 0,
                back: Backtrace::new(),
            },
            Error::NoHostname {
                source: "no such host".into(),
                back: Backtrace::new(),
            },
            Error::CompressedStream {
                back: Backtrace::new(),
            },
            Error::Transport {
                source: "connection reset".into(),
                back: Backtrace::new(),
            },
        ];
        #[cfg(feature = "tls")]
        errs.push(Error::Tls {
            source: "handshake failed".into(),
            back: Backtrace::new(),
        });
        #[cfg(feature = "http")]
        errs.push(Error::Http {
            source: "503".into(),
            back: Backtrace::new(),
        });
        for err in errs {
            let display = format!("{}", err);
            let debug = format!("{:?}", err);
            assert!(debug.starts_with(&format!("{}\n", display)), "{}", debug);
        }
    }
}
