//! Protocol decoding implementation.
//!
//! Turns the raw bytes of a single request head into a structured
//! [`crate::protocol::Request`].

mod request_decoder;

pub use request_decoder::{MAX_HEADER_BYTES, RequestDecoder};
