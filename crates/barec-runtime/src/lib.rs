//! Runtime support for BARE (Binary Application Record Encoding).
//!
//! [`cursor`] holds the wire-format primitives: varints, zigzag integers,
//! little-endian fixed-width values, length-prefixed strings. [`codec`]
//! builds a schema-driven [`codec::Value`] encoder/decoder on top of them,
//! interpreting a checked schema from `barec-compiler` without any code
//! generation step.

pub mod codec;
pub mod cursor;

pub use crate::codec::{EncodeError, Value, decode, encode};
pub use crate::cursor::{ByteCursor, ByteSink, DecodeError};
