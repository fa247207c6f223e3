
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use packjson_core::api::{read_file_with_report, read_with_report, write, write_file};
    use packjson_core::config::ApiConfig;
    use packjson_core::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_LEVEL, DEFAULT_QUEUE_CAP, MAX_CHUNK_SIZE, MAX_QUEUE_CAP};
    use packjson_core::telemetry::{Phase, PhaseTimes, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
    use packjson_core::types::ErrorKind;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn write_snapshot_covers_compress_write_and_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.dat");
        let data = vec![b'z'; 200_000];

        let snap = write_file(&path, &data, DEFAULT_LEVEL).unwrap();
        assert_eq!(snap.bytes_plain, 200_000);
        assert_eq!(snap.bytes_compressed, std::fs::metadata(&path).unwrap().len());
        assert!(snap.compression_ratio > 0.0 && snap.compression_ratio < 1.0);
        assert_eq!(snap.chunks_transformed, (200_000 / DEFAULT_CHUNK_SIZE + 1) as u64);
        assert!(snap.chunks_stored >= 1);
        assert_eq!(snap.events_discarded, 0);
        assert_eq!(snap.release_errors, 0);
        assert!(snap.has_all_phases(&[Phase::Compress, Phase::Write, Phase::Release]));
        assert!(!snap.phase_times.contains(Phase::Encode));
    }

    #[test]
    fn value_write_also_times_encoding() {
        let dir = tempdir().unwrap();
        let snap = write(dir.path().join("v.dat"), &json!({"k": [1, 2, 3]}), 6).unwrap();
        assert!(snap.has_all_phases(&[Phase::Encode, Phase::Compress, Phase::Write, Phase::Release]));
    }

    #[test]
    fn value_read_times_decoding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("d.dat");
        write(&path, &json!({"k": "v"}), 6).unwrap();

        let (value, snap): (serde_json::Value, _) = read_with_report(&path, &ApiConfig::default(), None).unwrap();
        assert_eq!(value, json!({"k": "v"}));
        assert!(snap.has_all_phases(&[Phase::Read, Phase::Decompress, Phase::Decode, Phase::Release]));
        assert!(!snap.phase_times.contains(Phase::Encode));
    }

    #[test]
    fn read_report_matches_written_payload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.dat");
        let data: Vec<u8> = (0..70_000u32).map(|i| (i % 97) as u8).collect();
        let written = write_file(&path, &data, 6).unwrap();

        let (bytes, snap) = read_file_with_report(&path, &ApiConfig::default(), None).unwrap();
        assert_eq!(bytes, data);
        assert_eq!(snap.bytes_plain, written.bytes_plain);
        assert_eq!(snap.bytes_compressed, written.bytes_compressed);
        assert!(snap.has_all_phases(&[Phase::Read, Phase::Decompress, Phase::Release]));
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut counters = TelemetryCounters::default();
        counters.add_transformed(100, 40);
        counters.add_stored();
        let mut timer = TelemetryTimer::new();
        timer.add_phase_time(Phase::Compress, Duration::from_millis(3));
        timer.finish();

        let snap = TelemetrySnapshot::from(&counters, &timer);
        assert!((snap.compression_ratio - 0.4).abs() < f64::EPSILON);

        let text = serde_json::to_string(&snap).unwrap();
        let back: TelemetrySnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back.bytes_plain, 100);
        assert_eq!(back.phase_times.get(Phase::Compress), Duration::from_millis(3));
    }

    #[test]
    fn counters_and_phase_times_merge() {
        let mut a = TelemetryCounters::default();
        a.add_transformed(10, 5);
        let mut b = TelemetryCounters::default();
        b.add_transformed(20, 7);
        b.events_discarded = 1;
        a += b;
        assert_eq!((a.bytes_plain, a.bytes_compressed, a.chunks_transformed, a.events_discarded), (30, 12, 2, 1));

        let mut t = PhaseTimes::default();
        t.add(Phase::Read, Duration::from_millis(2));
        let mut u = PhaseTimes::default();
        u.add(Phase::Read, Duration::from_millis(3));
        u.add(Phase::Decompress, Duration::from_millis(1));
        t.merge(&u);
        assert_eq!(t.get(Phase::Read), Duration::from_millis(5));
        assert_eq!(t.total(), Duration::from_millis(6));
        assert_eq!(t.get(Phase::Write), Duration::ZERO);
    }

    #[test]
    fn empty_payload_has_zero_ratio() {
        let snap = TelemetrySnapshot::from(&TelemetryCounters::default(), &TelemetryTimer::new());
        assert_eq!(snap.compression_ratio, 0.0);
    }

    #[test]
    fn config_defaults_and_validation() {
        let cfg = ApiConfig::default();
        assert_eq!(cfg.level, DEFAULT_LEVEL);
        assert_eq!(cfg.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(cfg.queue_cap, DEFAULT_QUEUE_CAP);
        assert!(!cfg.atomic_replace && !cfg.pretty);
        assert!(cfg.validate().is_ok());

        let bad = [
            ApiConfig::default().with_level(0),
            ApiConfig::default().with_level(10),
            ApiConfig::default().with_chunk_size(0),
            ApiConfig::default().with_chunk_size(MAX_CHUNK_SIZE + 1),
            ApiConfig::default().with_queue_cap(0),
            ApiConfig::default().with_queue_cap(MAX_QUEUE_CAP + 1),
        ];
        for cfg in bad {
            assert_eq!(cfg.validate().unwrap_err().kind(), ErrorKind::Validation, "{cfg:?}");
        }
    }
}
