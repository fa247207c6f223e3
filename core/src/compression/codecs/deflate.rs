//! Deflate (zlib wrapper) via flate2's low-level `Compress`/`Decompress` state.

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::compression::constants::ENGINE_OUT_CHUNK;
use crate::compression::types::{Codec, CompressionError, Compressor, Decompressor};

const CODEC: &str = "deflate";

pub struct DeflateCompressor {
    engine: Option<Compress>,
    fault: Option<String>,
    finished: bool,
}

impl DeflateCompressor {
    pub fn new(level: u32) -> Result<Self, CompressionError> {
        Ok(Self {
            engine: Some(Compress::new(Compression::new(level), true)),
            fault: None,
            finished: false,
        })
    }

    fn engine(&mut self) -> Result<&mut Compress, CompressionError> {
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

impl Compressor for DeflateCompressor {
    fn codec(&self) -> Codec {
        Codec::Deflate
    }

    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let engine = self.engine()?;
        let mut consumed = 0usize;
        let mut failure = None;
        while consumed < input.len() {
            out.reserve(ENGINE_OUT_CHUNK);
            let before = engine.total_in();
            if let Err(e) = engine.compress_vec(&input[consumed..], out, FlushCompress::None) {
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
            match engine.compress_vec(&[], out, FlushCompress::Finish) {
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

pub struct DeflateDecompressor {
    engine: Option<Decompress>,
    fault: Option<String>,
    done: bool,
}

impl DeflateDecompressor {
    pub fn new() -> Result<Self, CompressionError> {
        Ok(Self { engine: Some(Decompress::new(true)), fault: None, done: false })
    }

    fn fail(&mut self, err: CompressionError) -> CompressionError {
        self.fault = Some(err.to_string());
        err
    }
}

impl Decompressor for DeflateDecompressor {
    fn codec(&self) -> Codec {
        Codec::Deflate
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
            let status = match engine.decompress_vec(&input[consumed..], out, FlushDecompress::None) {
                Ok(status) => status,
                Err(e) => {
                    outcome = Err(CompressionError::CodecProcessFailed { codec: CODEC, msg: e.to_string() });
                    break;
                }
            };
            consumed += (engine.total_in() - in_before) as usize;
            let produced = (engine.total_out() - out_before) as usize;

            if status == Status::StreamEnd {
                self.done = true;
                if consumed < input.len() {
                    outcome = Err(CompressionError::TrailingData { codec: CODEC, extra: input.len() - consumed });
                }
                break;
            }
            if consumed >= input.len() && produced < spare {
                break;
            }
            if produced == 0 && engine.total_in() == in_before {
                // No progress with room available: the engine needs more input.
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
