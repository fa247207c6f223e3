//! compression/mod.rs
//! Streaming compression and decompression engines.
//!
//! Notes:
//! - Engines are incremental: chunks go in, whatever output is ready comes out.
//! - The persisted stream is the engine's native format with no extra framing.
//! - Registry resolves a `Codec` to an engine. Every engine must be closed explicitly.

pub mod constants;
pub mod types;
pub mod registry;
pub mod codecs;

pub use constants::*;
pub use types::*;
pub use registry::*;
