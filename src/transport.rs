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

//! The GELF transport layer.
//!
//! This module defines the [`Transport`] trait that all implementations must support, as well
//! as the UDP & TCP implementations. TLS & HTTP live in their own modules behind the `tls` &
//! `http` features, respectively.
//!
//! # Examples
//!
//! To send GELF messages over UDP to Graylog listening on port 12202 (the default) on localhost:
//!
//! ```rust
//! use tracing_gelf::transport::UdpTransport;
//! let transpo = UdpTransport::local().unwrap();
//! ```
//!
//! On a non-standard port on another host:
//!
//! ```rust
//! use tracing_gelf::transport::UdpTransport;
//! let transpo = UdpTransport::new("some-host.domain.io:5514");
//! assert!(transpo.is_err()); // no such host, after all
//! ```
//!
//! UDP messages larger than one chunk are split up by a [`GelfChunker`]; to use LAN-sized chunks &
//! truncate rather than drop overflowing messages:
//!
//! ```rust
//! use tracing_gelf::{
//!     chunker::{ChunkPolicy, GelfChunker, LAN_CHUNK},
//!     transport::UdpTransport,
//! };
//! let transpo = UdpTransport::local()
//!     .unwrap()
//!     .with_chunker(GelfChunker::new(LAN_CHUNK, ChunkPolicy::Truncate).unwrap());
//! ```

use crate::{
    chunker::GelfChunker,
    error::{Error, Result},
    packer::PackedMessage,
};

use backtrace::Backtrace;

use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};

pub const DEFAULT_UDP_PORT: u16 = 12202;
pub const DEFAULT_TCP_PORT: u16 = 12201;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                      transport mechanisms                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Operations all transport layers must support.
pub trait Transport {
    /// Send a packed GELF message on this transport mechanism, returning the number of bytes
    /// written to the wire.
    ///
    /// Taking a [`PackedMessage`] rather than a slice of `u8` means callers can't hand us bytes
    /// that were never a GELF document.
    fn send(&self, msg: &PackedMessage) -> Result<usize>;
    /// Whether this transport can carry zlib-compressed messages.
    ///
    /// Null-byte-delimited streams can't: compressed data may itself contain a zero byte.
    fn supports_compression(&self) -> bool {
        true
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, msg: &PackedMessage) -> Result<usize> {
        (**self).send(msg)
    }
    fn supports_compression(&self) -> bool {
        (**self).supports_compression()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&self, msg: &PackedMessage) -> Result<usize> {
        (**self).send(msg)
    }
    fn supports_compression(&self) -> bool {
        (**self).supports_compression()
    }
}

fn resolve<A: ToSocketAddrs>(addr: A) -> Result<SocketAddr> {
    addr.to_socket_addrs()
        .map_err(|err| Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        })?
        .next()
        .ok_or_else(|| Error::Transport {
            source: "address resolved to nothing".into(),
            back: Backtrace::new(),
        })
}

/// Sending GELF messages via UDP datagrams, chunking them as needed.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    chunker: GelfChunker,
}

impl UdpTransport {
    /// Construct a [`Transport`] implementation via UDP at `addr`.
    pub fn new<A: ToSocketAddrs>(addr: A) -> Result<UdpTransport> {
        let addr = resolve(addr)?;
        // Bind to any available port on a local address of the right family...
        let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local).map_err(|err| Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        })?;
        // and connect to the collector at `addr`:
        socket.connect(addr).map_err(|err| Error::Transport {
            source: Box::new(err),
            back: Backtrace::new(),
        })?;
        Ok(UdpTransport {
            socket,
            chunker: GelfChunker::default(),
        })
    }
    /// Construct a [`Transport`] implementation via UDP at localhost:12202
    pub fn local() -> Result<UdpTransport> {
        UdpTransport::new(("localhost", DEFAULT_UDP_PORT))
    }
    /// Replace the default chunker (WAN-sized chunks, warn & drop on overflow)
    pub fn with_chunker(mut self, chunker: GelfChunker) -> Self {
        self.chunker = chunker;
        self
    }
    pub fn chunker(&self) -> &GelfChunker {
        &self.chunker
    }
}

impl Transport for UdpTransport {
    fn send(&self, msg: &PackedMessage) -> Result<usize> {
        if msg.len() <= self.chunker.chunk_size() {
            return self.socket.send(msg).map_err(|err| Error::Transport {
                source: Box::new(err),
                back: Backtrace::new(),
            });
        }
        // An empty result means the chunker dropped the message (& said so, if it's been asked
        // to); that's not a transport failure.
        self.chunker
            .chunk(msg)
            .iter()
            .try_fold(0, |acc, chunk| self.socket.send(chunk).map(|n| acc + n))
            .map_err(|err| Error::Transport {
                source: Box::new(err),
                back: Backtrace::new(),
            })
    }
}

/// Write `msg` to `writer`, followed by a null byte.
///
/// Shared between the TCP & TLS transports.
pub(crate) fn write_frame<W: std::io::Write>(
    mut writer: W,
    msg: &PackedMessage,
) -> std::io::Result<usize> {
    writer.write_all(msg)?;
    writer.write_all(&[0])?;
    writer.flush()?;
    Ok(msg.len() + 1)
}

/// Sending GELF messages via TCP streams, one null-terminated message at a time
#[derive(Debug)]
pub struct TcpTransport {
    socket: TcpStream,
}

impl TcpTransport {
    /// Construct a [`Transport`] implementation via TCP at `addr`.
    pub fn new<A: ToSocketAddrs>(addr: A) -> Result<TcpTransport> {
        Ok(TcpTransport {
            socket: TcpStream::connect(addr).map_err(|err| Error::Transport {
                source: Box::new(err),
                back: Backtrace::new(),
            })?,
        })
    }
    /// Construct a [`Transport`] implementation via TCP at localhost:12201
    pub fn try_default() -> Result<TcpTransport> {
        TcpTransport::new(("localhost", DEFAULT_TCP_PORT))
    }
}

impl Transport for TcpTransport {
    fn send(&self, msg: &PackedMessage) -> Result<usize> {
        if msg.is_compressed() {
            return Err(Error::CompressedStream {
                back: Backtrace::new(),
            });
        }
        // `std::io::Write` takes `&mut self` and we just have a `&self`. `Write` is implemented
        // on `&TcpStream` as well as `TcpStream`, however, so we can write through a mutable
        // variable of type `&TcpStream`. Trick I learned from tracing-subscriber:
        // <https://docs.rs/tracing-subscriber/0.3.11/src/tracing_subscriber/fmt/fmt_layer.rs.html#867-903>
        let writer: &TcpStream = &self.socket;
        write_frame(writer, msg).map_err(|err| Error::Transport {
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

    use crate::{
        chunker::{ChunkPolicy, GELF_CHUNK_HEADERS_LENGTH, GELF_MAGIC_BYTES},
        document::GelfDocument,
        packer::pack,
    };

    use std::{io::Read, net::TcpListener, time::Duration};

    fn message(short_message: &str, compress: bool) -> PackedMessage {
        let mut doc = GelfDocument::new();
        doc.insert("version", "1.0");
        doc.insert("host", "h1");
        doc.insert("short_message", short_message);
        pack(&doc, compress).unwrap()
    }

    /// An uncompressed message exactly `len` bytes long
    fn message_of_len(len: usize) -> PackedMessage {
        let base = message("", false).len();
        let msg = message(&"x".repeat(len - base), false);
        assert_eq!(msg.len(), len);
        msg
    }

    fn receiver() -> UdpSocket {
        let sock = UdpSocket::bind("127.0.0.1:0").unwrap();
        sock.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        sock
    }

    #[test]
    fn test_udp_unframed() {
        let rx = receiver();
        let transpo = UdpTransport::new(rx.local_addr().unwrap()).unwrap();
        let msg = message("hello", true);
        assert_eq!(transpo.send(&msg).unwrap(), msg.len());

        let mut buf = [0u8; 2048];
        let n = rx.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &msg[..]);
    }

    #[test]
    fn test_udp_chunked() {
        let rx = receiver();
        let transpo = UdpTransport::new(rx.local_addr().unwrap())
            .unwrap()
            .with_chunker(GelfChunker::new(64, ChunkPolicy::Warn).unwrap());
        let msg = message(&"x".repeat(500), false);
        let n = transpo.chunker().chunk_count(msg.len());
        assert_eq!(
            transpo.send(&msg).unwrap(),
            msg.len() + n * GELF_CHUNK_HEADERS_LENGTH
        );

        let mut payload = Vec::new();
        let mut buf = [0u8; 2048];
        for i in 0..n {
            let cb = rx.recv(&mut buf).unwrap();
            assert_eq!(buf[0..2], GELF_MAGIC_BYTES);
            assert_eq!(buf[10] as usize, i);
            assert_eq!(buf[11] as usize, n);
            payload.extend_from_slice(&buf[GELF_CHUNK_HEADERS_LENGTH..cb]);
        }
        assert_eq!(payload, msg.to_vec());
    }

    #[test]
    fn test_udp_exact_fit_unframed() {
        let rx = receiver();
        let transpo = UdpTransport::new(rx.local_addr().unwrap())
            .unwrap()
            .with_chunker(GelfChunker::new(200, ChunkPolicy::Warn).unwrap());
        let msg = message_of_len(200);
        assert_eq!(transpo.send(&msg).unwrap(), 200);

        let mut buf = [0u8; 2048];
        let n = rx.recv(&mut buf).unwrap();
        assert_eq!(n, 200);
        assert_ne!(buf[0..2], GELF_MAGIC_BYTES);
        assert_eq!(&buf[..n], &msg[..]);
    }

    #[test]
    fn test_udp_one_byte_over() {
        let rx = receiver();
        let transpo = UdpTransport::new(rx.local_addr().unwrap())
            .unwrap()
            .with_chunker(GelfChunker::new(200, ChunkPolicy::Warn).unwrap());
        let msg = message_of_len(201);
        assert_eq!(
            transpo.send(&msg).unwrap(),
            201 + 2 * GELF_CHUNK_HEADERS_LENGTH
        );

        let mut payload = Vec::new();
        let mut buf = [0u8; 2048];
        for i in 0..2 {
            let cb = rx.recv(&mut buf).unwrap();
            assert_eq!(buf[0..2], GELF_MAGIC_BYTES);
            assert_eq!(buf[10], i);
            assert_eq!(buf[11], 2);
            payload.extend_from_slice(&buf[GELF_CHUNK_HEADERS_LENGTH..cb]);
        }
        assert_eq!(payload, msg.to_vec());
        // Nothing more on the wire
        rx.set_nonblocking(true).unwrap();
        assert!(rx.recv(&mut buf).is_err());
    }

    #[test]
    fn test_udp_dropped() {
        let rx = receiver();
        let transpo = UdpTransport::new(rx.local_addr().unwrap())
            .unwrap()
            .with_chunker(GelfChunker::new(1, ChunkPolicy::Silent).unwrap());
        assert_eq!(transpo.send(&message(&"x".repeat(500), false)).unwrap(), 0);
    }

    #[test]
    fn test_tcp_frames() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let transpo = TcpTransport::new(listener.local_addr().unwrap()).unwrap();
        assert!(!transpo.supports_compression());

        let first = message("first", false);
        let second = message("second", false);
        assert_eq!(transpo.send(&first).unwrap(), first.len() + 1);
        assert_eq!(transpo.send(&second).unwrap(), second.len() + 1);
        assert!(matches!(
            transpo.send(&message("third", true)),
            Err(Error::CompressedStream { .. })
        ));
        drop(transpo);

        let (mut stream, _) = listener.accept().unwrap();
        let mut received = Vec::new();
        stream.read_to_end(&mut received).unwrap();

        let mut expected = first.to_vec();
        expected.push(0);
        expected.extend_from_slice(&second);
        expected.push(0);
        assert_eq!(received, expected);
    }
}
