//! compression/constants.rs
//! Stable codec IDs and level bounds.

/// Stable codec IDs (u16) used in logs and telemetry.
pub mod codec_ids {
    pub const ZSTD: u16    = 0x0001;
    pub const DEFLATE: u16 = 0x0003;
    pub const XZ: u16      = 0x0004;
}

/// Level bounds shared by every codec (1 = fastest, 9 = densest).
pub const MIN_LEVEL: u32 = 1;
pub const MAX_LEVEL: u32 = 9;
/// Balanced default.
pub const DEFAULT_LEVEL: u32 = 6;

/// Scratch buffer size for one engine step.
pub const ENGINE_OUT_CHUNK: usize = 32 * 1024;
