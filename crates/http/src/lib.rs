//! A from-scratch HTTP/1.1 protocol core
//!
//! This crate provides the request/response pipeline of a minimal HTTP/1.1
//! server: raw-byte request parsing, URI decomposition and response
//! serialization. It deliberately owns the whole wire format instead of
//! delegating to a parser crate, and keeps the surface small enough that
//! every invariant can be read in one sitting.
//!
//! # Architecture
//!
//! The crate is organized into three modules:
//!
//! - [`protocol`]: Protocol value types - [`protocol::Method`],
//!   [`protocol::HttpVersion`], [`protocol::StatusCode`],
//!   [`protocol::Request`] and [`protocol::Response`]
//! - [`uri`]: URI decomposition into scheme/host/port/segments/query/fragment
//! - [`codec`]: The byte-stream-to-request decoder
//!
//! # Parsing model
//!
//! [`codec::RequestDecoder`] never fails past its caller: every parse step
//! that goes wrong downgrades [`protocol::Request::status`] to the matching
//! 4xx/5xx code and parsing stops there. The caller branches on the status
//! instead of catching errors across layers, sends the corresponding
//! response and closes the connection.
//!
//! # Limitations
//!
//! - HTTP/1.1 only, one request per connection, `Connection: close` always
//! - No chunked transfer encoding, no keep-alive, no TLS
//! - Maximum header section size: 8KB
//! - Query strings are not percent-decoded

pub mod codec;
pub mod protocol;
pub mod uri;

mod utils;
pub(crate) use utils::ensure;
