//! compression/registry.rs
//! Codec registry and factory functions.

use crate::compression::codecs::{deflate, xz, zstd};
use crate::compression::constants::{DEFAULT_LEVEL, MAX_LEVEL, MIN_LEVEL};
use crate::compression::types::{Codec, CompressionError, Compressor, Decompressor};

pub struct CodecInfo {
    pub name: &'static str,
    pub default_level: u32,
    /// Leading bytes of a well-formed stream.
    pub magic: &'static [u8],
}

pub fn resolve(codec: Codec) -> CodecInfo {
    match codec {
        Codec::Xz => CodecInfo { name: "xz", default_level: DEFAULT_LEVEL, magic: &[0xFD, b'7', b'z', b'X', b'Z', 0x00] },
        Codec::Zstd => CodecInfo { name: "zstd", default_level: DEFAULT_LEVEL, magic: &[0x28, 0xB5, 0x2F, 0xFD] },
        Codec::Deflate => CodecInfo { name: "deflate", default_level: DEFAULT_LEVEL, magic: &[0x78] },
    }
}

pub fn level_in_range(level: u32) -> bool {
    (MIN_LEVEL..=MAX_LEVEL).contains(&level)
}

pub fn create_compressor(codec: Codec, level: u32) -> Result<Box<dyn Compressor>, CompressionError> {
    if !level_in_range(level) {
        return Err(CompressionError::CodecInitFailed {
            codec: codec.name(),
            msg: format!("level {level} outside {MIN_LEVEL}..={MAX_LEVEL}"),
        });
    }
    match codec {
        Codec::Xz => Ok(Box::new(xz::XzCompressor::new(level)?)),
        Codec::Zstd => Ok(Box::new(zstd::ZstdCompressor::new(level)?)),
        Codec::Deflate => Ok(Box::new(deflate::DeflateCompressor::new(level)?)),
    }
}

pub fn create_decompressor(codec: Codec) -> Result<Box<dyn Decompressor>, CompressionError> {
    match codec {
        Codec::Xz => Ok(Box::new(xz::XzDecompressor::new()?)),
        Codec::Zstd => Ok(Box::new(zstd::ZstdDecompressor::new()?)),
        Codec::Deflate => Ok(Box::new(deflate::DeflateDecompressor::new()?)),
    }
}
