//! Payload normalizers
//!
//! One module per protocol family. Every normalizer is a pure function from
//! payload text and routing keys to a [`Normalized`](crate::Normalized).

pub mod common;
pub mod envelope;
pub mod fallback;
pub mod mesh;
pub mod packet;
pub mod ruuvitag;

pub use packet::{detect_shape, PacketShape};
