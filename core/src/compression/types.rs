//! compression/types.rs
//! Codec identifiers, engine traits and the engine error type.
use std::fmt;
use thiserror::Error;

use crate::compression::constants::codec_ids;

/// Compression codec. The file carries the engine's native stream only, so the
/// reader must be configured with the same codec the writer used.
#[repr(u16)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Codec {
    /// `.xz` container, LZMA2 with CRC64.
    #[default]
    Xz      = codec_ids::XZ,
    Zstd    = codec_ids::ZSTD,
    Deflate = codec_ids::DEFLATE,
}

impl Codec {
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Xz => "xz",
            Codec::Zstd => "zstd",
            Codec::Deflate => "deflate",
        }
    }

    pub fn id(&self) -> u16 {
        *self as u16
    }

    pub fn from_id(raw: u16) -> Result<Self, CompressionError> {
        match raw {
            x if x == codec_ids::XZ => Ok(Codec::Xz),
            x if x == codec_ids::ZSTD => Ok(Codec::Zstd),
            x if x == codec_ids::DEFLATE => Ok(Codec::Deflate),
            other => Err(CompressionError::UnsupportedCodec { codec_id: other }),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("unsupported compression codec: 0x{codec_id:x}")]
    UnsupportedCodec { codec_id: u16 },

    #[error("codec {codec} init failed: {msg}")]
    CodecInitFailed { codec: &'static str, msg: String },

    #[error("codec {codec} process failed: {msg}")]
    CodecProcessFailed { codec: &'static str, msg: String },

    #[error("codec {codec}: stream truncated before end of frame")]
    Truncated { codec: &'static str },

    #[error("codec {codec}: {extra} trailing bytes after end of stream")]
    TrailingData { codec: &'static str, extra: usize },

    #[error("codec {codec}: engine already closed")]
    Closed { codec: &'static str },

    #[error("codec {codec}: engine faulted earlier, {msg}")]
    Faulted { codec: &'static str, msg: String },
}

impl CompressionError {
    pub(crate) fn process(codec: Codec, e: impl fmt::Display) -> Self {
        CompressionError::CodecProcessFailed { codec: codec.name(), msg: e.to_string() }
    }
}

/// Streaming compression engine.
///
/// Engines hold native state that is not released by dropping the stage that owns
/// them; the owner calls [`Compressor::close`] explicitly before dropping.
pub trait Compressor: Send {
    fn codec(&self) -> Codec;
    /// Compress one chunk, appending whatever output the engine produces.
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;
    /// Flush pending state and write the end-of-stream marker.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CompressionError>;
    /// Release the engine. Fails if the engine faulted or was already closed.
    fn close(&mut self) -> Result<(), CompressionError>;
    fn is_closed(&self) -> bool;
}

/// Streaming decompression engine. Same close contract as [`Compressor`].
pub trait Decompressor: Send {
    fn codec(&self) -> Codec;
    /// Decompress one chunk, appending decoded bytes.
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;
    /// Called at end of input. Fails if the stream stopped mid-frame.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CompressionError>;
    fn close(&mut self) -> Result<(), CompressionError>;
    fn is_closed(&self) -> bool;
}
