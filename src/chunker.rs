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

//! GELF UDP chunking.
//!
//! # Introduction
//!
//! A GELF message that doesn't fit in one UDP datagram is split into chunks, each framed as
//! described in the GELF [documentation]:
//!
//! [documentation]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html#chunking
//!
//! ```text
//! offset 0  : 0x1e 0x0f      magic
//! offset 2  : message id     8 bytes, random, shared by every chunk of one message
//! offset 10 : sequence       1 byte, 0-based
//! offset 11 : count          1 byte, 1..=128
//! offset 12 : payload
//! ```
//!
//! Graylog will discard any message made up of more than 128 chunks, so we never send one. What
//! happens instead is governed by the [`ChunkPolicy`]: drop it quietly, drop it with a
//! [`ChunkWarning`], or warn & then try to cut the message down to size.
//!
//! # Truncation
//!
//! [`ChunkPolicy::Truncate`] unpacks the offending message & builds a stripped-down replacement
//! carrying only `version`, `host`, `timestamp` & `facility`, with `level` forced to 3 (error),
//! an additional `_chunk_overflow` field set to `true`, and as much of the original
//! `short_message` as will fit. "As much as will fit" is found by estimating the number of chunks
//! left over after the envelope, then repeatedly re-packing & dropping another chunk's worth of
//! characters until the result fits (or there's nothing left to drop).

use crate::{
    document::{fields, GelfDocument},
    error::{Error, Result},
    level::Severity,
    packer::{pack, unpack, PackedMessage},
    value::Value,
};

use backtrace::Backtrace;
use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

/// Chunk payload size suitable for most WANs
pub const WAN_CHUNK: usize = 1420;
/// Chunk payload size suitable for LANs with a 8K+ MTU
pub const LAN_CHUNK: usize = 8154;
/// Graylog will discard messages made up of more than this many chunks
pub const GELF_MAX_CHUNK_NUMBER: usize = 128;
pub const GELF_CHUNK_HEADERS_LENGTH: usize = 12;
pub const GELF_MAGIC_BYTES: [u8; 2] = [0x1e, 0x0f];

/// What to do with a message that would need more than [`GELF_MAX_CHUNK_NUMBER`] chunks
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChunkPolicy {
    /// Drop it without a word
    Silent,
    /// Raise a [`ChunkWarning::Overflow`], then drop it
    Warn,
    /// Raise a [`ChunkWarning::Overflow`], then try to truncate it
    Truncate,
}

/// Non-fatal problems encountered while chunking
#[derive(Clone, Debug, PartialEq)]
pub enum ChunkWarning {
    /// The message needs more than [`GELF_MAX_CHUNK_NUMBER`] chunks
    Overflow { message: Vec<u8>, chunks: usize },
    /// The message could not be truncated to fit, and has been dropped
    TruncationFailure { message: Vec<u8> },
}

impl ChunkWarning {
    /// The packed message that couldn't be sent as-is
    pub fn message(&self) -> &[u8] {
        match self {
            ChunkWarning::Overflow { message, .. } => message,
            ChunkWarning::TruncationFailure { message } => message,
        }
    }
}

impl std::fmt::Display for ChunkWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkWarning::Overflow { message, chunks } => write!(
                f,
                "chunk overflowing GELF message ({} bytes, {} chunks): {}",
                message.len(),
                chunks,
                String::from_utf8_lossy(message)
            ),
            ChunkWarning::TruncationFailure { message } => write!(
                f,
                "truncation failed preventing chunk overflowing for GELF message ({} bytes): {}",
                message.len(),
                String::from_utf8_lossy(message)
            ),
        }
    }
}

type WarningHandler = Box<dyn Fn(&ChunkWarning) + Send + Sync>;

/// By default, chunk warnings are reported through [`tracing`] itself. The [`Layer`] skips events
/// originating in this crate, so they will never feed back into the collector.
///
/// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
/// [`Layer`]: crate::layer::Layer
fn default_warning_handler(warning: &ChunkWarning) {
    match warning {
        ChunkWarning::Overflow { message, chunks } => ::tracing::warn!(
            bytes = message.len(),
            chunks = chunks,
            "chunk overflowing GELF message"
        ),
        ChunkWarning::TruncationFailure { message } => ::tracing::error!(
            bytes = message.len(),
            "truncation failed preventing chunk overflowing for GELF message"
        ),
    }
}

/// Splits packed GELF messages into chunks
pub struct GelfChunker {
    chunk_size: usize,
    policy: ChunkPolicy,
    on_warning: WarningHandler,
}

impl std::fmt::Debug for GelfChunker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GelfChunker")
            .field("chunk_size", &self.chunk_size)
            .field("policy", &self.policy)
            .finish()
    }
}

impl std::default::Default for GelfChunker {
    /// [`WAN_CHUNK`]-sized chunks, warning on (and dropping) overflowing messages
    fn default() -> Self {
        GelfChunker {
            chunk_size: WAN_CHUNK,
            policy: ChunkPolicy::Warn,
            on_warning: Box::new(default_warning_handler),
        }
    }
}

impl GelfChunker {
    /// `chunk_size` is the payload size of each chunk (the twelve header bytes come on top).
    pub fn new(chunk_size: usize, policy: ChunkPolicy) -> Result<GelfChunker> {
        if chunk_size == 0 {
            return Err(Error::BadChunkSize {
                size: chunk_size,
                back: Backtrace::new(),
            });
        }
        Ok(GelfChunker {
            chunk_size,
            policy,
            on_warning: Box::new(default_warning_handler),
        })
    }
    /// Route [`ChunkWarning`]s to `handler` rather than [`tracing`].
    ///
    /// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
    pub fn with_warning_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&ChunkWarning) + Send + Sync + 'static,
    {
        self.on_warning = Box::new(handler);
        self
    }
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
    pub fn policy(&self) -> ChunkPolicy {
        self.policy
    }
    /// The number of chunks needed for a message of `len` bytes
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size)
    }
    /// Split `msg` into framed chunks.
    ///
    /// An empty result means the message was dropped.
    pub fn chunk(&self, msg: &PackedMessage) -> Vec<Bytes> {
        let chunks = self.chunk_count(msg.len());
        if chunks <= GELF_MAX_CHUNK_NUMBER {
            return self.frame(msg);
        }
        match self.policy {
            ChunkPolicy::Silent => vec![],
            ChunkPolicy::Warn => {
                (self.on_warning)(&ChunkWarning::Overflow {
                    message: msg.to_vec(),
                    chunks,
                });
                vec![]
            }
            ChunkPolicy::Truncate => {
                (self.on_warning)(&ChunkWarning::Overflow {
                    message: msg.to_vec(),
                    chunks,
                });
                match self.truncate(msg) {
                    Some(truncated) => self.frame(&truncated),
                    None => {
                        (self.on_warning)(&ChunkWarning::TruncationFailure {
                            message: msg.to_vec(),
                        });
                        vec![]
                    }
                }
            }
        }
    }
    /// Frame `msg`, which must need no more than [`GELF_MAX_CHUNK_NUMBER`] chunks.
    fn frame(&self, msg: &[u8]) -> Vec<Bytes> {
        let chunk_count = self.chunk_count(msg.len());
        let message_id: u64 = rand::random();

        trace!(
            message_id = message_id,
            chunk_count = chunk_count,
            chunk_size = self.chunk_size,
            "Generating chunks for GELF."
        );

        msg.chunks(self.chunk_size)
            .enumerate()
            .map(|(i, payload)| encode_chunk(message_id, i as u8, chunk_count as u8, payload))
            .collect()
    }
    /// Attempt to cut an overflowing message down to size; `None` if that can't be done.
    fn truncate(&self, msg: &PackedMessage) -> Option<PackedMessage> {
        let compress = msg.is_compressed();
        let original = unpack(msg).ok()?;

        let mut simplified = GelfDocument::new();
        for name in [fields::VERSION, fields::HOST] {
            if let Some(value) = original.get(name) {
                simplified.insert(name, value.clone());
            }
        }
        simplified.insert(fields::SHORT_MESSAGE, "");
        if let Some(value) = original.get(fields::TIMESTAMP) {
            simplified.insert(fields::TIMESTAMP, value.clone());
        }
        simplified.insert(fields::LEVEL, Severity::LOG_ERR as u32);
        if let Some(value) = original.get(fields::FACILITY) {
            simplified.insert(fields::FACILITY, value.clone());
        }
        simplified.insert(fields::CHUNK_OVERFLOW, true);

        // Estimate how many chunks the envelope leaves us for the message text...
        let envelope = pack(&simplified, compress).ok()?;
        let free = GELF_MAX_CHUNK_NUMBER.saturating_sub(self.chunk_count(envelope.len()));
        let short_message = match original.get(fields::SHORT_MESSAGE) {
            Some(Value::Str(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let mut candidate: String = short_message.chars().take(self.chunk_size * free).collect();

        // then shrink until it fits.
        for _clip in (0..=free).rev() {
            simplified.insert(fields::SHORT_MESSAGE, candidate.as_str());
            let packed = pack(&simplified, compress).ok()?;
            if self.chunk_count(packed.len()) <= GELF_MAX_CHUNK_NUMBER {
                return Some(packed);
            }
            let keep = candidate.chars().count().saturating_sub(self.chunk_size);
            candidate = candidate.chars().take(keep).collect();
        }
        None
    }
}

/// Frame one chunk
pub fn encode_chunk(message_id: u64, sequence: u8, total: u8, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(GELF_CHUNK_HEADERS_LENGTH + payload.len());
    buf.put_slice(&GELF_MAGIC_BYTES);
    buf.put_u64(message_id);
    buf.put_u8(sequence);
    buf.put_u8(total);
    buf.put_slice(payload);
    buf.freeze()
}
