//! compression/codecs/mod.rs
//! Engine adapters. Each wraps one native compression context.

pub mod deflate;
pub mod xz;
pub mod zstd;

pub use self::deflate::*;
pub use self::xz::*;
pub use self::zstd::*;
