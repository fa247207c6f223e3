//! stream/stages.rs
//! Concrete stages: the compression engine and the file handle.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bytes::Bytes;
use log::{debug, trace};

use crate::compression::{create_compressor, create_decompressor, Codec, Compressor, Decompressor};
use crate::stream::link::StageLink;
use crate::stream::stage::{Stage, StageKind};
use crate::telemetry::{Phase, PhaseTimes, TelemetryCounters};
use crate::types::StoreError;
use crate::utils::{read_exact_or_eof, temp_path_for};

// ============================================================
// Compression stage
// ============================================================

enum Engine {
    /// Write direction: owns the whole payload and slices it into chunks.
    Compress { engine: Box<dyn Compressor>, payload: Bytes },
    /// Read direction: consumes chunks from the storage stage.
    Decompress { engine: Box<dyn Decompressor> },
}

pub struct CompressionStage {
    engine: Engine,
    chunk_size: usize,
    counters: TelemetryCounters,
    times: PhaseTimes,
}

impl CompressionStage {
    pub fn compressor(codec: Codec, level: u32, payload: Bytes, chunk_size: usize) -> Result<Self, StoreError> {
        let engine = create_compressor(codec, level)?;
        debug!("[TRANSFORM] {codec} compressor level {level}, {} byte payload", payload.len());
        Ok(Self::with_engine(Engine::Compress { engine, payload }, chunk_size))
    }

    pub fn decompressor(codec: Codec, chunk_size: usize) -> Result<Self, StoreError> {
        let engine = create_decompressor(codec)?;
        debug!("[TRANSFORM] {codec} decompressor");
        Ok(Self::with_engine(Engine::Decompress { engine }, chunk_size))
    }

    /// Wrap an engine built elsewhere (custom engines, tests).
    pub fn from_compressor(engine: Box<dyn Compressor>, payload: Bytes, chunk_size: usize) -> Self {
        Self::with_engine(Engine::Compress { engine, payload }, chunk_size)
    }

    pub fn from_decompressor(engine: Box<dyn Decompressor>, chunk_size: usize) -> Self {
        Self::with_engine(Engine::Decompress { engine }, chunk_size)
    }

    fn with_engine(engine: Engine, chunk_size: usize) -> Self {
        Self {
            engine,
            chunk_size: chunk_size.max(1),
            counters: TelemetryCounters::default(),
            times: PhaseTimes::default(),
        }
    }
}

impl Stage for CompressionStage {
    fn kind(&self) -> StageKind {
        StageKind::Transform
    }

    fn run(&mut self, link: &mut StageLink) -> Result<(), StoreError> {
        let Self { engine, chunk_size, counters, times } = self;
        match engine {
            Engine::Compress { engine, payload } => {
                for chunk in payload.chunks(*chunk_size) {
                    if link.should_stop() {
                        return Err(StoreError::Cancelled);
                    }
                    let start = Instant::now();
                    let mut out = Vec::new();
                    engine.compress_chunk(chunk, &mut out)?;
                    times.add(Phase::Compress, start.elapsed());
                    counters.add_transformed(chunk.len(), out.len());
                    if !out.is_empty() {
                        link.send(Bytes::from(out))?;
                    }
                }
                let start = Instant::now();
                let mut tail = Vec::new();
                engine.finish(&mut tail)?;
                times.add(Phase::Compress, start.elapsed());
                counters.bytes_compressed += tail.len() as u64;
                if !tail.is_empty() {
                    link.send(Bytes::from(tail))?;
                }
            }
            Engine::Decompress { engine } => {
                while let Some(chunk) = link.recv()? {
                    if link.should_stop() {
                        return Err(StoreError::Cancelled);
                    }
                    let start = Instant::now();
                    let mut out = Vec::new();
                    engine.decompress_chunk(&chunk, &mut out)?;
                    times.add(Phase::Decompress, start.elapsed());
                    counters.add_transformed(out.len(), chunk.len());
                    trace!("[TRANSFORM] {} -> {} bytes", chunk.len(), out.len());
                    if !out.is_empty() {
                        link.send(Bytes::from(out))?;
                    }
                }
                let mut tail = Vec::new();
                engine.finish(&mut tail)?;
                if !tail.is_empty() {
                    counters.bytes_plain += tail.len() as u64;
                    link.send(Bytes::from(tail))?;
                }
            }
        }
        link.end()
    }

    fn close(&mut self) -> Result<(), StoreError> {
        let result = match &mut self.engine {
            Engine::Compress { engine, .. } => engine.close(),
            Engine::Decompress { engine } => engine.close(),
        };
        result.map_err(StoreError::Transform)
    }

    fn is_closed(&self) -> bool {
        match &self.engine {
            Engine::Compress { engine, .. } => engine.is_closed(),
            Engine::Decompress { engine } => engine.is_closed(),
        }
    }

    fn report(&self, counters: &mut TelemetryCounters, times: &mut PhaseTimes) {
        counters.merge(&self.counters);
        times.merge(&self.times);
    }
}

// ============================================================
// Storage stage
// ============================================================

enum Handle {
    Sink(BufWriter<File>),
    Source(File),
}

pub struct StorageStage {
    path: PathBuf,
    handle: Option<Handle>,
    /// Set while an atomic replace is pending; cleared once renamed into place.
    temp: Option<PathBuf>,
    chunk_size: usize,
    counters: TelemetryCounters,
    times: PhaseTimes,
}

impl StorageStage {
    /// Create or truncate the target. With `atomic`, bytes go to `<path>.partial` and
    /// are renamed over `path` only once the pipeline settled with success.
    pub fn open_write(path: impl AsRef<Path>, atomic: bool) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let temp = atomic.then(|| temp_path_for(&path));
        let target = temp.as_deref().unwrap_or(&path);
        let file = File::create(target)?;
        debug!("[STORAGE] opened {} for write", target.display());
        Ok(Self::with_handle(path, Handle::Sink(BufWriter::new(file)), temp, 0))
    }

    pub fn open_read(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        debug!("[STORAGE] opened {} for read", path.display());
        Ok(Self::with_handle(path, Handle::Source(file), None, chunk_size.max(1)))
    }

    fn with_handle(path: PathBuf, handle: Handle, temp: Option<PathBuf>, chunk_size: usize) -> Self {
        Self {
            path,
            handle: Some(handle),
            temp,
            chunk_size,
            counters: TelemetryCounters::default(),
            times: PhaseTimes::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered bytes and sync them to disk. The temp file, if any, stays put
    /// until the pipeline settles with success and calls [`Stage::commit`].
    fn flush_sink(&mut self) -> Result<(), StoreError> {
        let start = Instant::now();
        if let Some(Handle::Sink(writer)) = self.handle.as_mut() {
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        self.times.add(Phase::Write, start.elapsed());
        Ok(())
    }
}

impl Stage for StorageStage {
    fn kind(&self) -> StageKind {
        StageKind::Storage
    }

    fn run(&mut self, link: &mut StageLink) -> Result<(), StoreError> {
        let chunk_size = self.chunk_size;
        match self.handle.as_mut() {
            Some(Handle::Sink(writer)) => {
                while let Some(chunk) = link.recv()? {
                    if link.should_stop() {
                        return Err(StoreError::Cancelled);
                    }
                    let start = Instant::now();
                    writer.write_all(&chunk)?;
                    self.times.add(Phase::Write, start.elapsed());
                    self.counters.add_stored();
                }
                self.flush_sink()?;
            }
            Some(Handle::Source(file)) => loop {
                if link.should_stop() {
                    return Err(StoreError::Cancelled);
                }
                let start = Instant::now();
                let chunk = read_exact_or_eof(file, chunk_size)?;
                self.times.add(Phase::Read, start.elapsed());
                if chunk.is_empty() {
                    break;
                }
                self.counters.add_stored();
                link.send(chunk)?;
            },
            None => return Err(StoreError::Storage(io::Error::new(io::ErrorKind::Other, "storage handle already closed"))),
        }
        link.end()
    }

    /// Move a pending atomic replace into place. Runs only after a successful settlement.
    fn commit(&mut self) -> Result<(), StoreError> {
        let Some(temp) = self.temp.take() else {
            return Ok(());
        };
        // Close before rename so the move works on every platform.
        self.handle = None;
        if let Err(e) = fs::rename(&temp, &self.path) {
            self.temp = Some(temp);
            return Err(e.into());
        }
        debug!("[STORAGE] renamed into place: {}", self.path.display());
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        // Dropping the BufWriter flushes best-effort; a failed write already settled.
        self.handle = None;
        if let Some(temp) = self.temp.take() {
            match fs::remove_file(&temp) {
                Ok(()) => debug!("[STORAGE] removed abandoned {}", temp.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// A pending temp file counts as an open resource until renamed or removed.
    fn is_closed(&self) -> bool {
        self.handle.is_none() && self.temp.is_none()
    }

    fn report(&self, counters: &mut TelemetryCounters, times: &mut PhaseTimes) {
        counters.merge(&self.counters);
        times.merge(&self.times);
    }
}
