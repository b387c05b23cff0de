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

//! GELF over HTTP.
//!
//! Each message is POSTed on its own to a Graylog GELF HTTP input. Compressed messages go out
//! with `Content-Encoding: deflate`.
//!
//! This transport uses the [reqwest] blocking client, which must not be created or dropped from
//! within an async runtime.
//!
//! [reqwest]: https://docs.rs/reqwest

use crate::{
    error::{Error, Result},
    packer::PackedMessage,
    transport::Transport,
};

use backtrace::Backtrace;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};

use std::time::Duration;

pub const DEFAULT_HTTP_PORT: u16 = 12203;
pub const DEFAULT_PATH: &str = "/gelf";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

fn http_err<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
    Error::Http {
        source: Box::new(err),
        back: Backtrace::new(),
    }
}

/// Sending GELF messages via HTTP POST
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    host: String,
    port: u16,
    path: String,
    timeout: Duration,
}

impl HttpTransport {
    /// Construct a [`Transport`] implementation that will POST to `http://host:port/gelf`.
    pub fn new<S: Into<String>>(host: S, port: u16) -> Result<HttpTransport> {
        Ok(HttpTransport {
            client: reqwest::blocking::Client::builder()
                .build()
                .map_err(http_err)?,
            host: host.into(),
            port,
            path: DEFAULT_PATH.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        })
    }
    /// Construct a [`Transport`] implementation that will POST to `http://localhost:12203/gelf`
    pub fn try_default() -> Result<HttpTransport> {
        HttpTransport::new("localhost", DEFAULT_HTTP_PORT)
    }
    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }
    /// Per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn url(&self) -> String {
        format!("http://{}:{}{}", self.host, self.port, self.path)
    }
}

impl Transport for HttpTransport {
    fn send(&self, msg: &PackedMessage) -> Result<usize> {
        let mut req = self
            .client
            .post(self.url())
            .timeout(self.timeout)
            .header(CONTENT_TYPE, "application/json");
        if msg.is_compressed() {
            req = req.header(CONTENT_ENCODING, "deflate");
        }
        req.body(msg.to_vec())
            .send()
            .and_then(|rsp| rsp.error_for_status())
            .map_err(http_err)?;
        Ok(msg.len())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::{document::GelfDocument, packer::pack};

    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::TcpListener,
        thread::JoinHandle,
    };

    /// What our one-shot server saw
    struct Request {
        line: String,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    }

    impl Request {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }
    }

    /// Accept one request on a fresh port, answer it with `status`
    fn serve_one(status: &'static str) -> (u16, JoinHandle<Request>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let mut headers = Vec::new();
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).unwrap();
                let header = header.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((k, v)) = header.split_once(':') {
                    headers.push((k.trim().to_owned(), v.trim().to_owned()));
                }
            }
            let len: usize = headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                .map(|(_, v)| v.parse().unwrap())
                .unwrap_or(0);
            let mut body = vec![0u8; len];
            reader.read_exact(&mut body).unwrap();
            let mut stream = reader.into_inner();
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                status
            )
            .unwrap();
            stream.flush().unwrap();
            Request {
                line: line.trim_end().to_owned(),
                headers,
                body,
            }
        });
        (port, handle)
    }

    fn message(compress: bool) -> PackedMessage {
        let mut doc = GelfDocument::new();
        doc.insert("version", "1.0");
        doc.insert("host", "h1");
        doc.insert("short_message", "hello");
        pack(&doc, compress).unwrap()
    }

    #[test]
    fn test_post() {
        let (port, server) = serve_one("202 Accepted");
        let transpo = HttpTransport::new("127.0.0.1", port).unwrap();
        assert!(transpo.supports_compression());
        let msg = message(false);
        assert_eq!(transpo.send(&msg).unwrap(), msg.len());

        let req = server.join().unwrap();
        assert_eq!(req.line, "POST /gelf HTTP/1.1");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("content-encoding"), None);
        assert_eq!(req.body, msg.to_vec());
    }

    #[test]
    fn test_post_compressed() {
        let (port, server) = serve_one("202 Accepted");
        let transpo = HttpTransport::new("127.0.0.1", port)
            .unwrap()
            .with_path("ingest")
            .with_timeout(Duration::from_secs(10));
        assert_eq!(transpo.url(), format!("http://127.0.0.1:{}/ingest", port));
        let msg = message(true);
        transpo.send(&msg).unwrap();

        let req = server.join().unwrap();
        assert_eq!(req.line, "POST /ingest HTTP/1.1");
        assert_eq!(req.header("content-encoding"), Some("deflate"));
        assert_eq!(req.body, msg.to_vec());
    }

    #[test]
    fn test_error_status() {
        let (port, server) = serve_one("500 Internal Server Error");
        let transpo = HttpTransport::new("127.0.0.1", port).unwrap();
        assert!(matches!(
            transpo.send(&message(false)),
            Err(Error::Http { .. })
        ));
        server.join().unwrap();
    }
}
