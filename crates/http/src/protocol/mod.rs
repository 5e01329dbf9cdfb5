//! Protocol value types and abstractions.
//!
//! This module contains the value types that flow through the request/response
//! pipeline: [`Method`], [`HttpVersion`], [`StatusCode`], [`Request`] and
//! [`Response`], plus the [`ParseError`] taxonomy that maps parse failures to
//! status codes.

mod error;
mod http_version;
mod method;
mod request;
mod response;
mod status;

pub use error::ParseError;
pub use http_version::HttpVersion;
pub use method::Method;
pub use request::Request;
pub use response::Response;
pub use status::StatusCode;
