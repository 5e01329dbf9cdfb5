//! HTTP request decoder.
//!
//! This module parses the raw bytes of a request head - request line plus
//! header lines - into a [`Request`]. It works on a fully buffered head: the
//! caller reads from the socket until the blank line terminating the headers
//! (or EOF) and hands the buffer over.
//!
//! Parse failures do not propagate as errors. Each step that fails
//! downgrades the request's status to the matching 4xx/5xx code and parsing
//! stops; the caller branches on [`Request::status`], sends the
//! corresponding response and closes the connection.
//!
//! The body is not parsed here. Whether a body follows and how long it is
//! depends on socket reads beyond the initial buffer, so the caller reads
//! `Content-Length` bytes separately and attaches them via
//! [`Request::set_body`].

use tracing::{trace, warn};

use crate::ensure;
use crate::protocol::{HttpVersion, Method, ParseError, Request};
use crate::uri::ParsedUri;

/// Maximum size in bytes allowed for the entire header section.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decoder for HTTP request heads.
#[derive(Debug, Default)]
pub struct RequestDecoder;

impl RequestDecoder {
    pub fn new() -> Self {
        Default::default()
    }

    /// Decodes a request head from the buffer.
    ///
    /// Always returns a [`Request`]; on a parse failure the returned
    /// request carries the failure's status code instead of `200 OK`.
    /// The correlation id is assigned here, at construction.
    pub fn decode(&self, src: &[u8]) -> Request {
        self.decode_detailed(src).0
    }

    /// Like [`RequestDecoder::decode`], but also hands back the parse
    /// error so the caller can surface its message on an error page.
    pub fn decode_detailed(&self, src: &[u8]) -> (Request, Option<ParseError>) {
        let mut request = Request::new();

        let error = match self.parse_into(src, &mut request) {
            Ok(()) => {
                trace!(request_id = %request.id(), "request head parsed");
                None
            }
            Err(e) => {
                warn!(request_id = %request.id(), cause = %e, "request parse failed");
                request.downgrade(e.status());
                Some(e)
            }
        };

        (request, error)
    }

    fn parse_into(&self, src: &[u8], request: &mut Request) -> Result<(), ParseError> {
        ensure!(!src.is_empty(), ParseError::EmptyRequest);

        let mut pos = 0;

        let request_line = next_line(src, &mut pos).ok_or(ParseError::EmptyRequest)?;
        self.parse_request_line(request_line, request)?;

        while let Some(line) = next_line(src, &mut pos) {
            // blank line ends the header section
            if line.is_empty() {
                break;
            }

            ensure!(pos <= MAX_HEADER_BYTES, ParseError::too_large_header(pos, MAX_HEADER_BYTES));

            self.parse_header_line(line, request)?;
        }

        Ok(())
    }

    /// Parses `METHOD SP URI SP VERSION`.
    fn parse_request_line(&self, line: &[u8], request: &mut Request) -> Result<(), ParseError> {
        let line = std::str::from_utf8(line).map_err(|_| ParseError::invalid_request_line("not valid utf-8"))?;

        let mut tokens = line.split(' ').filter(|t| !t.is_empty());
        let (method, uri, version) = match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
            (Some(method), Some(uri), Some(version), None) => (method, uri, version),
            _ => return Err(ParseError::invalid_request_line(line)),
        };

        request.set_method(Method::try_from(method)?);
        request.set_uri(ParsedUri::parse(uri)?);
        request.set_version(HttpVersion::try_from(version)?);

        Ok(())
    }

    /// Parses `Name: Value`, stripping every whitespace character from both
    /// sides of the colon, not just the surrounding ones.
    fn parse_header_line(&self, line: &[u8], request: &mut Request) -> Result<(), ParseError> {
        let line = std::str::from_utf8(line).map_err(|_| ParseError::invalid_header("not valid utf-8"))?;

        let (name, value) = line.split_once(':').ok_or_else(|| ParseError::invalid_header(format!("no colon in {line:?}")))?;

        request.set_header(strip_whitespace(name), strip_whitespace(value));
        Ok(())
    }
}

/// Takes the next `\r\n`-terminated line starting at `pos`; an unterminated
/// trailing line is returned whole.
fn next_line<'a>(src: &'a [u8], pos: &mut usize) -> Option<&'a [u8]> {
    if *pos >= src.len() {
        return None;
    }

    let rest = &src[*pos..];
    match rest.windows(2).position(|w| w == b"\r\n") {
        Some(idx) => {
            *pos += idx + 2;
            Some(&rest[..idx])
        }
        None => {
            *pos = src.len();
            Some(rest)
        }
    }
}

fn strip_whitespace(str: &str) -> String {
    str.chars().filter(|c| !c.is_whitespace()).collect()
}
