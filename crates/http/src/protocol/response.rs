use std::collections::BTreeMap;
use std::io::Write;
use std::time::SystemTime;

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::{HttpVersion, StatusCode};

/// Initial buffer size reserved for the serialized header section.
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// An HTTP response under construction.
///
/// A fluent builder accumulating status, headers and body, with a terminal
/// [`Response::serialize`] producing the wire bytes. Built fresh per request,
/// serialized once, then discarded.
///
/// Headers are kept in a sorted map, so serialization order is deterministic
/// (alphabetical) though no particular order is required on the wire. Header
/// values are written as given; there is no CRLF-injection defense.
#[derive(Debug)]
pub struct Response {
    version: HttpVersion,
    status: StatusCode,
    headers: BTreeMap<String, String>,
    body: Bytes,
}

impl Response {
    pub fn new() -> Self {
        Self { version: HttpVersion::Http11, status: StatusCode::Ok, headers: BTreeMap::new(), body: Bytes::new() }
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    /// Sets a header; the last write per key wins.
    pub fn header(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Sets the body, and `Content-Length` and `Date` as a side effect.
    pub fn body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        let body = body.into();
        self.headers.insert("Content-Length".to_string(), body.len().to_string());
        self.headers.insert("Date".to_string(), httpdate::fmt_http_date(SystemTime::now()));
        self.body = body;
        self
    }

    pub fn current_status(&self) -> StatusCode {
        self.status
    }

    pub fn current_header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn current_body(&self) -> &Bytes {
        &self.body
    }

    /// Serializes the response to wire bytes:
    /// `VERSION SP CODE SP REASON\r\n`, each header as `Key: Value\r\n`,
    /// a blank line, then the body.
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(INIT_HEADER_SIZE + self.body.len());

        // Writing into a pre-reserved BytesMut cannot fail
        let _ = write!(FastWrite(&mut buf), "{} {} {}\r\n", self.version, self.status.code(), self.status.reason());

        for (key, value) in &self.headers {
            buf.put_slice(key.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }
        buf.put_slice(b"\r\n");
        buf.put_slice(&self.body);

        buf.freeze()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

/// Fast writer implementation for writing formatted text to BytesMut.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
