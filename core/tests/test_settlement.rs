
#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use bytes::Bytes;
    use packjson_core::stream::{
        Direction, Pipeline, PipelineState, Settlement, Stage, StageKind, StageLink, StageResources,
    };
    use packjson_core::compression::CompressionError;
    use packjson_core::telemetry::{PhaseTimes, TelemetryCounters};
    use packjson_core::types::{ErrorKind, StoreError};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Shared view of a mock stage's handle so the test can inspect it after release.
    #[derive(Clone, Default)]
    struct Probe {
        closed: Arc<AtomicBool>,
    }

    impl Probe {
        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    fn wait_for_settlement(link: &StageLink) {
        while !link.should_stop() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Error of the class a real stage of `kind` would raise.
    fn injected(kind: StageKind, msg: &str) -> StoreError {
        match kind {
            StageKind::Storage => StoreError::Storage(io::Error::new(io::ErrorKind::Other, msg.to_string())),
            StageKind::Transform => StoreError::Transform(CompressionError::CodecProcessFailed {
                codec: "mock",
                msg: msg.to_string(),
            }),
        }
    }

    #[derive(Clone, Copy)]
    enum Exit {
        Clean,
        /// End the stream, then report an error once the pipeline has settled.
        FailAfterSettle,
        /// End the stream, then report an error immediately.
        FailAfterEnd,
        Panic,
    }

    /// Producer emitting scripted chunks: the storage source on read, the engine on write.
    struct MockSource {
        kind: StageKind,
        chunks: Vec<(&'static [u8], Duration)>,
        exit: Exit,
        close_fails: bool,
        probe: Probe,
    }

    impl Stage for MockSource {
        fn kind(&self) -> StageKind {
            self.kind
        }

        fn run(&mut self, link: &mut StageLink) -> Result<(), StoreError> {
            for (chunk, delay) in &self.chunks {
                thread::sleep(*delay);
                link.send(Bytes::from_static(*chunk))?;
            }
            link.end()?;
            match self.exit {
                Exit::Clean => Ok(()),
                Exit::FailAfterEnd => Err(injected(self.kind, "disk error")),
                Exit::FailAfterSettle => {
                    wait_for_settlement(link);
                    Err(injected(self.kind, "late disk error"))
                }
                Exit::Panic => panic!("source blew up"),
            }
        }

        fn close(&mut self) -> Result<(), StoreError> {
            self.probe.closed.store(true, Ordering::SeqCst);
            if self.close_fails {
                return Err(StoreError::Storage(io::Error::new(io::ErrorKind::Other, "close failed")));
            }
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.probe.is_closed()
        }
    }

    /// Consumer that forwards every chunk unchanged: the engine on read, the sink on write.
    struct Passthrough {
        kind: StageKind,
        /// Hold back the finish event until someone else settled the pipeline.
        finish_late: bool,
        panic_on_first: bool,
        close_fails: bool,
        chunks: u64,
        probe: Probe,
    }

    impl Passthrough {
        fn new(probe: Probe) -> Self {
            Self {
                kind: StageKind::Transform,
                finish_late: false,
                panic_on_first: false,
                close_fails: false,
                chunks: 0,
                probe,
            }
        }

        fn sink(probe: Probe) -> Self {
            Self { kind: StageKind::Storage, ..Self::new(probe) }
        }
    }

    impl Stage for Passthrough {
        fn kind(&self) -> StageKind {
            self.kind
        }

        fn run(&mut self, link: &mut StageLink) -> Result<(), StoreError> {
            while let Some(chunk) = link.recv()? {
                if self.panic_on_first {
                    panic!("transform blew up");
                }
                self.chunks += 1;
                link.send(chunk)?;
            }
            if self.finish_late {
                wait_for_settlement(link);
            }
            link.end()
        }

        fn close(&mut self) -> Result<(), StoreError> {
            self.probe.closed.store(true, Ordering::SeqCst);
            if self.close_fails {
                return Err(StoreError::Transform(CompressionError::Faulted {
                    codec: "mock",
                    msg: "engine already faulted".into(),
                }));
            }
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.probe.is_closed()
        }

        fn report(&self, counters: &mut TelemetryCounters, _times: &mut PhaseTimes) {
            counters.chunks_transformed += self.chunks;
        }
    }

    fn source(chunks: &[&'static [u8]], exit: Exit, probe: Probe) -> MockSource {
        MockSource {
            kind: StageKind::Storage,
            chunks: chunks.iter().map(|c| (*c, Duration::ZERO)).collect(),
            exit,
            close_fails: false,
            probe,
        }
    }

    fn engine(chunks: &[&'static [u8]], exit: Exit, probe: Probe) -> MockSource {
        MockSource { kind: StageKind::Transform, ..source(chunks, exit, probe) }
    }

    fn read_pipeline(transform: Passthrough, io: MockSource) -> Pipeline {
        Pipeline::new(Direction::Read, Box::new(transform), Box::new(io), 2).unwrap()
    }

    fn write_pipeline(transform: MockSource, io: Passthrough) -> Pipeline {
        Pipeline::new(Direction::Write, Box::new(transform), Box::new(io), 2).unwrap()
    }

    #[test]
    fn storage_error_before_finish_settles_once_with_error() {
        init_logger();
        let (tp, sp) = (Probe::default(), Probe::default());
        let mut transform = Passthrough::new(tp.clone());
        transform.finish_late = true;
        let io = source(&[b"A", b"B"], Exit::FailAfterEnd, sp.clone());

        let settled = read_pipeline(transform, io).run(None);

        assert_eq!(settled.outcome.unwrap_err().kind(), ErrorKind::Storage);
        assert_eq!(settled.telemetry.events_discarded, 1, "late finish must be discarded");
        assert_eq!(settled.state, PipelineState::Settled(Settlement::Failure));
        assert!(tp.is_closed() && sp.is_closed());
    }

    #[test]
    fn finish_before_storage_error_settles_once_with_success() {
        init_logger();
        let (tp, sp) = (Probe::default(), Probe::default());
        let transform = Passthrough::new(tp.clone());
        let io = source(&[b"A", b"B"], Exit::FailAfterSettle, sp.clone());

        let settled = read_pipeline(transform, io).run(None);

        assert_eq!(&settled.outcome.unwrap()[..], b"AB");
        assert_eq!(settled.telemetry.events_discarded, 1, "late error must be discarded");
        assert_eq!(settled.state, PipelineState::Settled(Settlement::Success));
        assert!(tp.is_closed() && sp.is_closed());
    }

    #[test]
    fn clean_run_discards_nothing_and_closes_both() {
        let (tp, sp) = (Probe::default(), Probe::default());
        let settled = read_pipeline(Passthrough::new(tp.clone()), source(&[b"x"], Exit::Clean, sp.clone())).run(None);

        assert_eq!(&settled.outcome.unwrap()[..], b"x");
        assert_eq!(settled.telemetry.events_discarded, 0);
        assert_eq!(settled.telemetry.chunks_transformed, 1);
        assert!(settled.release.transform_closed && settled.release.io_closed);
        assert_eq!(settled.release.swallowed, 0);
    }

    #[test]
    fn chunks_arrive_in_order_regardless_of_delay() {
        let delays = [Duration::from_millis(15), Duration::ZERO, Duration::from_millis(5)];
        let chunks: [&'static [u8]; 3] = [b"A", b"B", b"C"];
        let io = MockSource {
            kind: StageKind::Storage,
            chunks: chunks.iter().copied().zip(delays).collect(),
            exit: Exit::Clean,
            close_fails: false,
            probe: Probe::default(),
        };

        let settled = read_pipeline(Passthrough::new(Probe::default()), io).run(None);
        assert_eq!(&settled.outcome.unwrap()[..], b"ABC");
    }

    #[test]
    fn failing_close_never_turns_success_into_failure() {
        init_logger();
        let (tp, sp) = (Probe::default(), Probe::default());
        let mut transform = Passthrough::new(tp.clone());
        transform.close_fails = true;

        let settled = read_pipeline(transform, source(&[b"ok"], Exit::Clean, sp.clone())).run(None);

        assert_eq!(&settled.outcome.unwrap()[..], b"ok");
        assert_eq!(settled.release.swallowed, 1);
        assert_eq!(settled.telemetry.release_errors, 1);
        assert!(sp.is_closed(), "storage is still released after the engine close failed");
    }

    #[test]
    fn failing_close_keeps_the_original_error() {
        let sp = Probe::default();
        let mut io = source(&[b"A"], Exit::FailAfterEnd, sp.clone());
        io.close_fails = true;
        let mut transform = Passthrough::new(Probe::default());
        transform.finish_late = true;

        let settled = read_pipeline(transform, io).run(None);
        let err = settled.outcome.unwrap_err();
        assert!(err.to_string().contains("disk error"), "got {err}");
        assert_eq!(settled.release.swallowed, 1);
    }

    #[test]
    fn panicking_transform_is_a_pipeline_error() {
        let (tp, sp) = (Probe::default(), Probe::default());
        let mut transform = Passthrough::new(tp.clone());
        transform.panic_on_first = true;

        let settled = read_pipeline(transform, source(&[b"A", b"B", b"C"], Exit::Clean, sp.clone())).run(None);

        assert_eq!(settled.outcome.unwrap_err().kind(), ErrorKind::Pipeline);
        assert!(tp.is_closed() && sp.is_closed());
    }

    #[test]
    fn panicking_source_after_end_wins_with_a_pipeline_error() {
        let mut transform = Passthrough::new(Probe::default());
        transform.finish_late = true;
        let settled = read_pipeline(transform, source(&[b"A"], Exit::Panic, Probe::default())).run(None);

        assert_eq!(settled.outcome.unwrap_err().kind(), ErrorKind::Pipeline);
        assert_eq!(settled.telemetry.events_discarded, 1);
    }

    #[test]
    fn wrong_stage_kinds_are_rejected_and_released() {
        let (a, b) = (Probe::default(), Probe::default());
        let err = Pipeline::new(
            Direction::Write,
            Box::new(source(&[], Exit::Clean, a.clone())),
            Box::new(Passthrough::new(b.clone())),
            1,
        )
        .err()
        .unwrap();

        assert_eq!(err.kind(), ErrorKind::Pipeline);
        assert!(a.is_closed() && b.is_closed());
    }

    #[test]
    fn release_is_idempotent_and_runs_on_drop() {
        let (tp, sp) = (Probe::default(), Probe::default());
        let mut resources = StageResources::new(
            Box::new(Passthrough::new(tp.clone())),
            Box::new(source(&[], Exit::Clean, sp.clone())),
        );
        let first = resources.release();
        let second = resources.release();
        assert_eq!(first, second);
        assert!(tp.is_closed() && sp.is_closed());

        let dropped = Probe::default();
        drop(StageResources::new(
            Box::new(Passthrough::new(dropped.clone())),
            Box::new(source(&[], Exit::Clean, Probe::default())),
        ));
        assert!(dropped.is_closed());
    }

    #[test]
    fn write_engine_error_before_sink_finish_settles_with_error() {
        init_logger();
        let (tp, sp) = (Probe::default(), Probe::default());
        let transform = engine(&[b"A", b"B"], Exit::FailAfterEnd, tp.clone());
        let mut sink = Passthrough::sink(sp.clone());
        sink.finish_late = true;

        let settled = write_pipeline(transform, sink).run(None);

        assert_eq!(settled.outcome.unwrap_err().kind(), ErrorKind::Transform);
        assert_eq!(settled.telemetry.events_discarded, 1, "late sink finish must be discarded");
        assert_eq!(settled.state, PipelineState::Settled(Settlement::Failure));
        assert!(tp.is_closed() && sp.is_closed());
    }

    #[test]
    fn write_sink_finish_before_engine_error_settles_with_success() {
        init_logger();
        let (tp, sp) = (Probe::default(), Probe::default());
        let transform = engine(&[b"A", b"B"], Exit::FailAfterSettle, tp.clone());
        let sink = Passthrough::sink(sp.clone());

        let settled = write_pipeline(transform, sink).run(None);

        assert!(settled.outcome.is_ok());
        assert_eq!(settled.telemetry.events_discarded, 1, "late engine error must be discarded");
        assert_eq!(settled.state, PipelineState::Settled(Settlement::Success));
        assert!(settled.release.transform_closed && settled.release.io_closed);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn write_to_full_device_is_a_storage_error_and_releases_both() {
        use packjson_core::compression::Codec;
        use packjson_core::stream::{CompressionStage, StorageStage};

        init_logger();
        let payload: Vec<u8> = (0..500_000u32).flat_map(|i| i.to_le_bytes()).collect();
        let transform = CompressionStage::compressor(Codec::Zstd, 1, Bytes::from(payload), 4096).unwrap();
        let storage = StorageStage::open_write("/dev/full", false).unwrap();

        let settled = Pipeline::new(Direction::Write, Box::new(transform), Box::new(storage), 2).unwrap().run(None);

        assert_eq!(settled.outcome.unwrap_err().kind(), ErrorKind::Storage);
        assert!(settled.release.transform_closed && settled.release.io_closed);
        assert_eq!(settled.state, PipelineState::Settled(Settlement::Failure));
    }
}
