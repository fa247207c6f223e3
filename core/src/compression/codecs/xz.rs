//! compression/codecs/xz.rs
//!
//! `.xz` streams (LZMA2, CRC64 check) through liblzma's incremental `Stream`.
//! Presets 1..=9 map directly to the xz preset levels.

use xz2::stream::{Action, Check, Status, Stream};

use crate::compression::constants::ENGINE_OUT_CHUNK;
use crate::compression::types::{Codec, CompressionError, Compressor, Decompressor};

const CODEC: &str = "xz";

/// Single-stream decoder: anything after the first stream footer is trailing data.
const DECODER_FLAGS: u32 = 0;

pub struct XzCompressor {
    engine: Option<Stream>,
    fault: Option<String>,
    finished: bool,
}

impl XzCompressor {
    pub fn new(level: u32) -> Result<Self, CompressionError> {
        let engine = Stream::new_easy_encoder(level, Check::Crc64)
            .map_err(|e| CompressionError::CodecInitFailed { codec: CODEC, msg: e.to_string() })?;
        Ok(Self { engine: Some(engine), fault: None, finished: false })
    }

    fn engine(&mut self) -> Result<&mut Stream, CompressionError> {
        if let Some(msg) = &self.fault {
            return Err(CompressionError::Faulted { codec: CODEC, msg: msg.clone() });
        }
        if self.finished {
            return Err(CompressionError::CodecProcessFailed {
                codec: CODEC,
                msg: "stream already finished".into(),
            });
        }
        self.engine.as_mut().ok_or(CompressionError::Closed { codec: CODEC })
    }
}

impl Compressor for XzCompressor {
    fn codec(&self) -> Codec {
        Codec::Xz
    }

    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let engine = self.engine()?;
        let mut consumed = 0usize;
        let mut failure = None;
        while consumed < input.len() {
            out.reserve(ENGINE_OUT_CHUNK);
            let before = engine.total_in();
            if let Err(e) = engine.process_vec(&input[consumed..], out, Action::Run) {
                failure = Some(e.to_string());
                break;
            }
            consumed += (engine.total_in() - before) as usize;
        }
        match failure {
            Some(msg) => {
                self.fault = Some(msg.clone());
                Err(CompressionError::CodecProcessFailed { codec: CODEC, msg })
            }
            None => Ok(()),
        }
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let engine = self.engine()?;
        loop {
            out.reserve(ENGINE_OUT_CHUNK);
            match engine.process_vec(&[], out, Action::Finish) {
                Ok(Status::StreamEnd) => break,
                Ok(_) => continue,
                Err(e) => {
                    let msg = e.to_string();
                    self.fault = Some(msg.clone());
                    return Err(CompressionError::CodecProcessFailed { codec: CODEC, msg });
                }
            }
        }
        self.finished = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), CompressionError> {
        self.engine.take().ok_or(CompressionError::Closed { codec: CODEC })?;
        match self.fault.take() {
            Some(msg) => Err(CompressionError::Faulted { codec: CODEC, msg }),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.engine.is_none()
    }
}

pub struct XzDecompressor {
    engine: Option<Stream>,
    fault: Option<String>,
    done: bool,
}

impl XzDecompressor {
    pub fn new() -> Result<Self, CompressionError> {
        let engine = Stream::new_stream_decoder(u64::MAX, DECODER_FLAGS)
            .map_err(|e| CompressionError::CodecInitFailed { codec: CODEC, msg: e.to_string() })?;
        Ok(Self { engine: Some(engine), fault: None, done: false })
    }

    fn fail(&mut self, err: CompressionError) -> CompressionError {
        self.fault = Some(err.to_string());
        err
    }
}

impl Decompressor for XzDecompressor {
    fn codec(&self) -> Codec {
        Codec::Xz
    }

    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        if let Some(msg) = &self.fault {
            return Err(CompressionError::Faulted { codec: CODEC, msg: msg.clone() });
        }
        if input.is_empty() {
            return Ok(());
        }
        if self.done {
            return Err(self.fail(CompressionError::TrailingData { codec: CODEC, extra: input.len() }));
        }
        let engine = self.engine.as_mut().ok_or(CompressionError::Closed { codec: CODEC })?;

        let mut consumed = 0usize;
        let mut outcome: Result<(), CompressionError> = Ok(());
        loop {
            out.reserve(ENGINE_OUT_CHUNK);
            let spare = out.capacity() - out.len();
            let (in_before, out_before) = (engine.total_in(), engine.total_out());
            let status = match engine.process_vec(&input[consumed..], out, Action::Run) {
                Ok(status) => status,
                Err(e) => {
                    outcome = Err(CompressionError::CodecProcessFailed { codec: CODEC, msg: e.to_string() });
                    break;
                }
            };
            consumed += (engine.total_in() - in_before) as usize;
            let produced = (engine.total_out() - out_before) as usize;

            match status {
                Status::StreamEnd => {
                    self.done = true;
                    if consumed < input.len() {
                        outcome = Err(CompressionError::TrailingData { codec: CODEC, extra: input.len() - consumed });
                    }
                    break;
                }
                Status::MemNeeded => {
                    outcome = Err(CompressionError::CodecProcessFailed {
                        codec: CODEC,
                        msg: "decoder memory limit reached".into(),
                    });
                    break;
                }
                Status::Ok | Status::GetCheck => {}
            }
            if consumed >= input.len() && produced < spare {
                break;
            }
            if produced == 0 && engine.total_in() == in_before {
                break;
            }
        }
        outcome.map_err(|e| self.fail(e))
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<(), CompressionError> {
        if let Some(msg) = &self.fault {
            return Err(CompressionError::Faulted { codec: CODEC, msg: msg.clone() });
        }
        if !self.done {
            return Err(self.fail(CompressionError::Truncated { codec: CODEC }));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), CompressionError> {
        self.engine.take().ok_or(CompressionError::Closed { codec: CODEC })?;
        match self.fault.take() {
            Some(msg) => Err(CompressionError::Faulted { codec: CODEC, msg }),
            None => Ok(()),
        }
    }

    fn is_closed(&self) -> bool {
        self.engine.is_none()
    }
}
