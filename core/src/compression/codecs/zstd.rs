//! src/compression/codecs/zstd.rs
//!
//! Zstd streaming compressor/decompressor over the raw (context-level) API.
//!
//! Design notes:
//! - The engine context is held in an `Option` so `close()` can release it before the
//!   owning stage is dropped.
//! - Any engine error marks the engine as faulted; later calls, `close()` included,
//!   report the fault instead of touching the context again.
//! - Output is produced through a fixed scratch buffer and appended to the caller's Vec.

use std::io;

use zstd::stream::raw::{Decoder, Encoder, InBuffer, Operation, OutBuffer};

use crate::compression::constants::ENGINE_OUT_CHUNK;
use crate::compression::types::{Codec, CompressionError, Compressor, Decompressor};

const CODEC: &str = "zstd";

pub struct ZstdCompressor {
    engine: Option<Encoder<'static>>,
    scratch: Vec<u8>,
    fault: Option<String>,
    finished: bool,
}

impl ZstdCompressor {
    /// # Errors
    /// - `CompressionError::CodecInitFailed` if the context cannot be created.
    pub fn new(level: u32) -> Result<Self, CompressionError> {
        let engine = Encoder::new(level as i32).map_err(|e| CompressionError::CodecInitFailed {
            codec: CODEC,
            msg: e.to_string(),
        })?;
        Ok(Self {
            engine: Some(engine),
            scratch: vec![0u8; ENGINE_OUT_CHUNK],
            fault: None,
            finished: false,
        })
    }

    fn ready(&self) -> Result<(), CompressionError> {
        if let Some(msg) = &self.fault {
            return Err(CompressionError::Faulted { codec: CODEC, msg: msg.clone() });
        }
        if self.finished {
            return Err(CompressionError::CodecProcessFailed {
                codec: CODEC,
                msg: "stream already finished".into(),
            });
        }
        Ok(())
    }
}

fn encode_into(
    encoder: &mut Encoder<'static>,
    scratch: &mut [u8],
    input: &[u8],
    out: &mut Vec<u8>,
) -> io::Result<()> {
    let mut src = InBuffer::around(input);
    while src.pos() < input.len() {
        let mut dst = OutBuffer::around(&mut scratch[..]);
        encoder.run(&mut src, &mut dst)?;
        let written = dst.pos();
        out.extend_from_slice(&scratch[..written]);
    }
    Ok(())
}

fn end_frame(encoder: &mut Encoder<'static>, scratch: &mut [u8], out: &mut Vec<u8>) -> io::Result<()> {
    loop {
        let mut dst = OutBuffer::around(&mut scratch[..]);
        let remaining = encoder.finish(&mut dst, true)?;
        let written = dst.pos();
        out.extend_from_slice(&scratch[..written]);
        if remaining == 0 {
            return Ok(());
        }
    }
}

impl Compressor for ZstdCompressor {
    fn codec(&self) -> Codec {
        Codec::Zstd
    }

    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        self.ready()?;
        let encoder = self.engine.as_mut().ok_or(CompressionError::Closed { codec: CODEC })?;
        encode_into(encoder, &mut self.scratch, input, out).map_err(|e| {
            self.fault = Some(e.to_string());
            CompressionError::process(Codec::Zstd, e)
        })
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CompressionError> {
        self.ready()?;
        let encoder = self.engine.as_mut().ok_or(CompressionError::Closed { codec: CODEC })?;
        end_frame(encoder, &mut self.scratch, out).map_err(|e| {
            self.fault = Some(e.to_string());
            CompressionError::process(Codec::Zstd, e)
        })?;
        self.finished = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), CompressionError> {
        let engine = self.engine.take().ok_or(CompressionError::Closed { codec: CODEC })?;
        drop(engine);
        match self.fault.take() {
            Some(msg) => Err(CompressionError::Faulted { codec: CODEC, msg }),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.engine.is_none()
    }
}

pub struct ZstdDecompressor {
    engine: Option<Decoder<'static>>,
    scratch: Vec<u8>,
    fault: Option<String>,
    frame_done: bool,
    seen_input: bool,
}

impl ZstdDecompressor {
    pub fn new() -> Result<Self, CompressionError> {
        let engine = Decoder::new().map_err(|e| CompressionError::CodecInitFailed {
            codec: CODEC,
            msg: e.to_string(),
        })?;
        Ok(Self {
            engine: Some(engine),
            scratch: vec![0u8; ENGINE_OUT_CHUNK],
            fault: None,
            frame_done: false,
            seen_input: false,
        })
    }
}

/// Returns whether the last engine step ended on a frame boundary.
fn decode_into(
    decoder: &mut Decoder<'static>,
    scratch: &mut [u8],
    input: &[u8],
    out: &mut Vec<u8>,
    mut frame_done: bool,
) -> io::Result<bool> {
    let mut src = InBuffer::around(input);
    loop {
        let consumed_before = src.pos();
        let mut dst = OutBuffer::around(&mut scratch[..]);
        let hint = decoder.run(&mut src, &mut dst)?;
        let written = dst.pos();
        out.extend_from_slice(&scratch[..written]);

        if hint == 0 {
            frame_done = true;
        } else if written > 0 || src.pos() > consumed_before {
            frame_done = false;
        }

        // Input drained and the engine had room to spare: nothing left buffered.
        if src.pos() >= input.len() && written < scratch.len() {
            return Ok(frame_done);
        }
    }
}

impl Decompressor for ZstdDecompressor {
    fn codec(&self) -> Codec {
        Codec::Zstd
    }

    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        if let Some(msg) = &self.fault {
            return Err(CompressionError::Faulted { codec: CODEC, msg: msg.clone() });
        }
        if input.is_empty() {
            return Ok(());
        }
        self.seen_input = true;
        let decoder = self.engine.as_mut().ok_or(CompressionError::Closed { codec: CODEC })?;
        match decode_into(decoder, &mut self.scratch, input, out, self.frame_done) {
            Ok(done) => {
                self.frame_done = done;
                Ok(())
            }
            Err(e) => {
                self.fault = Some(e.to_string());
                Err(CompressionError::process(Codec::Zstd, e))
            }
        }
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<(), CompressionError> {
        if let Some(msg) = &self.fault {
            return Err(CompressionError::Faulted { codec: CODEC, msg: msg.clone() });
        }
        if !self.seen_input || !self.frame_done {
            self.fault = Some("truncated".into());
            return Err(CompressionError::Truncated { codec: CODEC });
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), CompressionError> {
        let engine = self.engine.take().ok_or(CompressionError::Closed { codec: CODEC })?;
        drop(engine);
        match self.fault.take() {
            Some(msg) => Err(CompressionError::Faulted { codec: CODEC, msg }),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.engine.is_none()
    }
}
