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

//! GELF over TLS.
//!
//! Identical to the TCP transport (one null-terminated, uncompressed message at a time) save that
//! the stream is wrapped in TLS courtesy of [openssl].
//!
//! [openssl]: https://docs.rs/openssl
//!
//! # Examples
//!
//! Validate the server against a private CA & present a client certificate whose key is in the
//! same PEM file:
//!
//! ```rust
//! use tracing_gelf::tls::{TlsOptions, TlsTransport};
//! let opts = TlsOptions::new()
//!     .validate(true)
//!     .ca_certs("/etc/ssl/graylog/ca.pem")
//!     .certfile("/etc/ssl/graylog/client.pem");
//! assert!(TlsTransport::new("graylog.i.am.not.there", 12204, &opts).is_err());
//! ```

use crate::{
    error::{Error, Result},
    packer::PackedMessage,
    transport::{write_frame, Transport},
};

use backtrace::Backtrace;
use openssl::ssl::{SslConnector, SslFiletype, SslMethod, SslStream, SslVerifyMode};

use std::{
    net::TcpStream,
    path::{Path, PathBuf},
    sync::Mutex,
};

pub const DEFAULT_TLS_PORT: u16 = 12204;

fn tls_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
    Error::Tls {
        source: Box::new(err),
        back: Backtrace::new(),
    }
}

/// TLS connection settings
///
/// Without `validate`, the server's certificate isn't checked at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlsOptions {
    validate: bool,
    ca_certs: Option<PathBuf>,
    certfile: Option<PathBuf>,
    keyfile: Option<PathBuf>,
}

impl TlsOptions {
    pub fn new() -> TlsOptions {
        TlsOptions::default()
    }
    /// Verify the server's certificate against [`ca_certs`](TlsOptions::ca_certs)
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
    /// PEM bundle of trusted CA certificates
    pub fn ca_certs<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.ca_certs = Some(path.into());
        self
    }
    /// PEM client certificate (chain)
    pub fn certfile<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.certfile = Some(path.into());
        self
    }
    /// PEM client private key; defaults to [`certfile`](TlsOptions::certfile)
    pub fn keyfile<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.keyfile = Some(path.into());
        self
    }
    /// The private key file that will actually be used, if any
    pub fn effective_keyfile(&self) -> Option<&Path> {
        self.keyfile.as_deref().or(self.certfile.as_deref())
    }
    /// Check these options for consistency, without touching the filesystem or the network.
    pub fn check(&self) -> Result<()> {
        if self.validate && self.ca_certs.is_none() {
            return Err(Error::MissingCaBundle {
                back: Backtrace::new(),
            });
        }
        if let (Some(keyfile), None) = (&self.keyfile, &self.certfile) {
            return Err(Error::KeyfileWithoutCertfile {
                keyfile: keyfile.clone(),
                back: Backtrace::new(),
            });
        }
        Ok(())
    }
    fn connector(&self) -> Result<SslConnector> {
        let mut builder = SslConnector::builder(SslMethod::tls_client()).map_err(tls_err)?;
        if self.validate {
            builder.set_verify(SslVerifyMode::PEER);
            if let Some(ca_certs) = &self.ca_certs {
                builder.set_ca_file(ca_certs).map_err(tls_err)?;
            }
        } else {
            builder.set_verify(SslVerifyMode::NONE);
        }
        if let Some(certfile) = &self.certfile {
            builder
                .set_certificate_chain_file(certfile)
                .map_err(tls_err)?;
        }
        if let Some(keyfile) = self.effective_keyfile() {
            builder
                .set_private_key_file(keyfile, SslFiletype::PEM)
                .map_err(tls_err)?;
            builder.check_private_key().map_err(tls_err)?;
        }
        Ok(builder.build())
    }
}

/// Sending GELF messages via TLS streams, one null-terminated message at a time
#[derive(Debug)]
pub struct TlsTransport {
    // `SslStream` only implements `Write` for `&mut`, so access is serialized
    stream: Mutex<SslStream<TcpStream>>,
}

impl TlsTransport {
    /// Construct a [`Transport`] implementation via TLS at `host`:`port`.
    ///
    /// `options` are checked before any connection is attempted.
    pub fn new(host: &str, port: u16, options: &TlsOptions) -> Result<TlsTransport> {
        options.check()?;
        let connector = options.connector()?;
        let tcp = TcpStream::connect((host, port)).map_err(|err| Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        })?;
        let stream = connector
            .configure()
            .map_err(tls_err)?
            .verify_hostname(options.validate)
            .connect(host, tcp)
            .map_err(tls_err)?;
        Ok(TlsTransport {
            stream: Mutex::new(stream),
        })
    }
    /// Construct a [`Transport`] implementation via TLS at localhost:12204, without validation
    pub fn try_default() -> Result<TlsTransport> {
        TlsTransport::new("localhost", DEFAULT_TLS_PORT, &TlsOptions::default())
    }
}

impl Transport for TlsTransport {
    fn send(&self, msg: &PackedMessage) -> Result<usize> {
        if msg.is_compressed() {
            return Err(Error::CompressedStream {
                back: Backtrace::new(),
            });
        }
        let mut stream = self.stream.lock().map_err(|_| Error::Transport {
            source: "TLS stream lock poisoned".into(),
            back: Backtrace::new(),
        })?;
        write_frame(&mut *stream, msg).map_err(|err| Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        })
    }
    fn supports_compression(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_validate_needs_ca_bundle() {
        let opts = TlsOptions::new().validate(true);
        assert!(matches!(opts.check(), Err(Error::MissingCaBundle { .. })));
        // Checked before connecting: nothing is listening on port 1
        assert!(matches!(
            TlsTransport::new("127.0.0.1", 1, &opts),
            Err(Error::MissingCaBundle { .. })
        ));
        assert!(opts.ca_certs("/tmp/ca.pem").check().is_ok());
    }

    #[test]
    fn test_keyfile_needs_certfile() {
        let opts = TlsOptions::new().keyfile("/tmp/client.key");
        match opts.check() {
            Err(Error::KeyfileWithoutCertfile { keyfile, .. }) => {
                assert_eq!(keyfile, PathBuf::from("/tmp/client.key"))
            }
            other => panic!("expected KeyfileWithoutCertfile, got {:?}", other),
        }
        assert!(matches!(
            TlsTransport::new("127.0.0.1", 1, &opts),
            Err(Error::KeyfileWithoutCertfile { .. })
        ));
    }

    #[test]
    fn test_keyfile_defaults_to_certfile() {
        let opts = TlsOptions::new().certfile("/tmp/client.pem");
        assert!(opts.check().is_ok());
        assert_eq!(opts.effective_keyfile(), Some(Path::new("/tmp/client.pem")));
        let opts = opts.keyfile("/tmp/client.key");
        assert_eq!(opts.effective_keyfile(), Some(Path::new("/tmp/client.key")));
        assert_eq!(TlsOptions::new().effective_keyfile(), None);
    }

    #[test]
    fn test_connection_refused() {
        // No TCP listener; a valid configuration gets as far as connecting
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        assert!(matches!(
            TlsTransport::new("127.0.0.1", port, &TlsOptions::default()),
            Err(Error::Transport { .. })
        ));
    }
}
