#![forbid(unsafe_code)]

//! Shared leaf types for `chunkforge`: the keyed payload model carried on the
//! dispatch socket, the wire-protocol message vocabulary, and scheduler
//! wall-time formatting.

pub mod payload;
pub mod protocol;
pub mod timefmt;

pub use payload::{ArrayData, NdArray, Payload, PayloadExt, Value};
