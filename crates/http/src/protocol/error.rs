use thiserror::Error;

use crate::protocol::StatusCode;

/// Request parsing errors.
///
/// Every variant carries enough context for a log line and maps to the
/// status code the caller should answer with, via [`ParseError::status`].
/// Parse errors are recoverable: the caller sends the corresponding
/// response and closes the connection, the serving process keeps running.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("empty request")]
    EmptyRequest,

    #[error("invalid request line: {reason}")]
    InvalidRequestLine { reason: String },

    #[error("invalid http method: {token}")]
    InvalidMethod { token: String },

    #[error("unsupported http version: {token}")]
    InvalidVersion { token: String },

    #[error("invalid uri: {uri}")]
    InvalidUri { uri: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("missing content-length header")]
    MissingContentLength,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },
}

impl ParseError {
    pub fn invalid_request_line<S: ToString>(str: S) -> Self {
        Self::InvalidRequestLine { reason: str.to_string() }
    }

    pub fn invalid_method<S: ToString>(str: S) -> Self {
        Self::InvalidMethod { token: str.to_string() }
    }

    pub fn invalid_version<S: ToString>(str: S) -> Self {
        Self::InvalidVersion { token: str.to_string() }
    }

    pub fn invalid_uri<S: ToString>(str: S) -> Self {
        Self::InvalidUri { uri: str.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    /// The status code a response to this failure should carry.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyRequest
            | Self::InvalidRequestLine { .. }
            | Self::InvalidUri { .. }
            | Self::InvalidHeader { .. }
            | Self::InvalidContentLength { .. } => StatusCode::BadRequest,
            Self::InvalidMethod { .. } => StatusCode::MethodNotAllowed,
            Self::InvalidVersion { .. } => StatusCode::HttpVersionNotSupported,
            Self::TooLargeHeader { .. } => StatusCode::RequestHeaderFieldsTooLarge,
            Self::MissingContentLength => StatusCode::LengthRequired,
        }
    }
}
