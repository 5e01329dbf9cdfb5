//! URI decomposition.
//!
//! This module breaks a URI string into scheme, host, port, path segments,
//! query mapping and fragment. It accepts both absolute URIs
//! (`scheme://host:port/path?query#frag`) and the origin-form paths that
//! request lines actually carry (`/path?query`).
//!
//! Path segmentation splits on `/` and discards the empty segments produced
//! by leading, trailing or duplicate slashes. The root path is represented
//! as the single sentinel segment [`ROOT_SEGMENT`], so `/` and `` stay
//! distinguishable from a one-level path.
//!
//! Query strings are split on `&` and then on the first `=`; a key without
//! `=` maps to the empty value, and the last occurrence of a duplicate key
//! wins. Percent-decoding is not performed.

use std::collections::HashMap;

use crate::protocol::ParseError;

/// The sentinel segment representing the root path.
pub const ROOT_SEGMENT: &str = "/";

/// A derived, read-only view of a URI string.
///
/// Built once by [`ParsedUri::parse`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUri {
    raw: String,
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: String,
    segments: Vec<String>,
    query: HashMap<String, String>,
    fragment: Option<String>,
}

impl ParsedUri {
    /// Parses a URI string into its parts.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidUri`] when the string is not parseable:
    /// embedded whitespace or control characters, an empty or malformed
    /// scheme, or a non-numeric port.
    pub fn parse(uri: &str) -> Result<Self, ParseError> {
        if uri.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ParseError::invalid_uri(uri));
        }

        let (rest, fragment) = match uri.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment.to_string())),
            None => (uri, None),
        };

        let (rest, query_str) = match rest.split_once('?') {
            Some((rest, query)) => (rest, query),
            None => (rest, ""),
        };

        let (scheme, host, port, path) = match rest.split_once("://") {
            Some((scheme, authority_and_path)) => {
                if !is_valid_scheme(scheme) {
                    return Err(ParseError::invalid_uri(uri));
                }

                let (authority, path) = match authority_and_path.find('/') {
                    Some(idx) => (&authority_and_path[..idx], &authority_and_path[idx..]),
                    None => (authority_and_path, ""),
                };

                let (host, port) = match authority.split_once(':') {
                    Some((host, port_str)) => {
                        let port = port_str.parse::<u16>().map_err(|_| ParseError::invalid_uri(uri))?;
                        (host, Some(port))
                    }
                    None => (authority, None),
                };

                (Some(scheme.to_string()), Some(host.to_string()), port, path)
            }
            None => (None, None, None, rest),
        };

        Ok(Self {
            raw: uri.to_string(),
            scheme,
            host,
            port,
            path: path.to_string(),
            segments: split_path(path),
            query: split_query(query_str),
            fragment,
        })
    }

    /// The raw URI string this view was built from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// The path portion of the URI, as written (query and fragment removed).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The decoded path segments; `[ROOT_SEGMENT]` for the root path.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Looks up a query parameter; `None` if the key is absent.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

impl Default for ParsedUri {
    /// The root URI `/`.
    fn default() -> Self {
        Self {
            raw: ROOT_SEGMENT.to_string(),
            scheme: None,
            host: None,
            port: None,
            path: ROOT_SEGMENT.to_string(),
            segments: vec![ROOT_SEGMENT.to_string()],
            query: HashMap::new(),
            fragment: None,
        }
    }
}

/// Splits a path into its segments, standalone for router use.
///
/// Produces identical segmentation to [`ParsedUri::parse`]: empty segments
/// are discarded, and both `/` and `` yield the single-segment root
/// representation, never an empty sequence.
pub fn split_path(path: &str) -> Vec<String> {
    let segments: Vec<String> = path.split('/').filter(|s| !s.is_empty()).map(str::to_string).collect();

    if segments.is_empty() { vec![ROOT_SEGMENT.to_string()] } else { segments }
}

/// Splits a query string into a key/value mapping.
///
/// Keys are unique; the last occurrence of a duplicate key wins. A key
/// without `=` maps to the empty value.
pub fn split_query(query: &str) -> HashMap<String, String> {
    let mut data = HashMap::new();

    for kv in query.split('&').filter(|kv| !kv.is_empty()) {
        let (key, value) = match kv.split_once('=') {
            Some((key, value)) => (key, value),
            None => (kv, ""),
        };

        data.insert(key.to_string(), value.to_string());
    }

    data
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        }
        _ => false,
    }
}
