use std::collections::HashMap;

use bytes::Bytes;
use uuid::Uuid;

use crate::protocol::{HttpVersion, Method, ParseError, StatusCode};
use crate::uri::ParsedUri;

/// A parsed HTTP request.
///
/// Created once per accepted connection, populated by the request decoder,
/// enriched with path parameters by the router, read by the handler and
/// destroyed when the connection closes. Immutable after parsing except for
/// the router-owned `params` map and the caller-supplied body.
///
/// `status` starts as `200 OK` and is downgraded to a 4xx/5xx the first
/// time a parse step fails; once non-OK it is never reset to OK.
#[derive(Debug)]
pub struct Request {
    id: Uuid,
    method: Option<Method>,
    uri: ParsedUri,
    version: HttpVersion,
    headers: HashMap<String, String>,
    body: Bytes,
    params: HashMap<String, String>,
    status: StatusCode,
}

impl Request {
    /// Creates an empty request and assigns its correlation id.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            method: None,
            uri: ParsedUri::default(),
            version: HttpVersion::default(),
            headers: HashMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            status: StatusCode::Ok,
        }
    }

    /// The opaque per-request correlation token.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> Option<Method> {
        self.method
    }

    pub fn uri(&self) -> &ParsedUri {
        &self.uri
    }

    /// The request path as written on the request line (no query/fragment).
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// The decoded path segments, root represented by the sentinel segment.
    pub fn path_segments(&self) -> &[String] {
        self.uri.segments()
    }

    pub fn version(&self) -> HttpVersion {
        self.version
    }

    /// Looks up a header by its stored (whitespace-stripped) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Looks up a router-bound path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Interprets the `Content-Length` header for body framing.
    ///
    /// # Errors
    ///
    /// [`ParseError::MissingContentLength`] when the header is absent,
    /// [`ParseError::InvalidContentLength`] when it is not a number.
    pub fn content_length(&self) -> Result<usize, ParseError> {
        let value = self.header("Content-Length").ok_or(ParseError::MissingContentLength)?;
        value.parse::<usize>().map_err(|_| ParseError::invalid_content_length(format!("value {value} is not a number")))
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = Some(method);
    }

    pub fn set_uri(&mut self, uri: ParsedUri) {
        self.uri = uri;
    }

    pub fn set_version(&mut self, version: HttpVersion) {
        self.version = version;
    }

    /// Stores a header; the last occurrence of a duplicate name wins.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    /// Attaches the body bytes read by the caller after header parsing.
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = body.into();
    }

    /// Binds a path parameter; called by the router while walking the trie.
    pub fn add_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Downgrades the parse status. The first non-OK status sticks: later
    /// downgrades and OK values are ignored.
    pub fn downgrade(&mut self, status: StatusCode) {
        if self.status.is_ok() && !status.is_ok() {
            self.status = status;
        }
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}
