use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::batch::{Batch, BatchPlanner};
use super::loader::Chunk;
use crate::config::ScanConfig;
use crate::errors::{Result, ScanError};
use crate::metrics::ScanObserver;
use crate::results::ScanResult;

/// Scans number files batch by batch on a fixed-size worker pool
pub struct Scanner {
    config: ScanConfig,
    pool: ThreadPool,
    observers: Vec<Arc<dyn ScanObserver>>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("config", &self.config)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Scanner {
    /// Validates `config` and starts a pool of `config.worker_count` threads
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_count.get())
            .thread_name(|i| format!("numscout-worker-{}", i))
            .build()
            .map_err(|e| ScanError::config_error(format!("failed to start worker pool: {}", e)))?;

        Ok(Self {
            config,
            pool,
            observers: Vec::new(),
        })
    }

    /// Registers an observer notified at batch boundaries
    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Searches `path` for `target`, stopping after the first batch that contains it.
    ///
    /// Batches run one after another: admission of the next batch starts only once the
    /// current one has been loaded, searched and dropped, so at most `ram_budget_bytes`
    /// of nominal chunk data is resident at any time.
    pub fn scan(&self, path: &Path, target: i64) -> Result<ScanResult> {
        let file_size = std::fs::metadata(path)
            .map_err(|e| ScanError::from_io(path, e))?
            .len();

        info!(
            "Scanning {} ({} bytes) for {} with {} workers, {} byte chunks, up to {} per batch",
            path.display(),
            file_size,
            target,
            self.config.worker_count,
            self.config.chunk_bytes,
            self.config.chunks_per_batch()
        );

        let mut result = ScanResult::new(self.config.worker_count.get(), file_size);
        let planner = BatchPlanner::new(
            file_size,
            self.config.chunk_bytes,
            self.config.ram_budget_bytes,
        );

        for batch in planner {
            debug!(
                "Batch {}: {} chunks from offset {} ({} bytes admitted)",
                batch.index,
                batch.offsets.len(),
                batch.start(),
                batch.admitted_bytes
            );
            self.notify(|o| o.batch_admitted(&batch));

            let chunks = match self.load_batch(path, &batch) {
                Ok(chunks) => chunks,
                Err(e) => {
                    warn!("Scan aborted in batch {}: {}", batch.index, e);
                    self.notify(|o| o.batch_retired(&batch, false));
                    return Err(e);
                }
            };

            let values: usize = chunks.iter().map(Chunk::len).sum();
            result.record_batch(batch.admitted_bytes, chunks.len() as u64, values as u64);

            let hit = self.search_batch(chunks, target);
            self.notify(|o| o.batch_retired(&batch, hit.is_some()));

            if let Some(offset) = hit {
                result.record_match(offset);
                info!(
                    "Found {} in chunk at offset {} after {} batches",
                    target, offset, result.batches
                );
                self.notify(|o| o.scan_finished(&result));
                return Ok(result);
            }

            result.record_discard();
        }

        info!(
            "{} not found; scanned {} bytes in {} batches",
            target, result.bytes_scanned, result.batches
        );
        self.notify(|o| o.scan_finished(&result));
        Ok(result)
    }

    /// Loads every chunk of `batch` in parallel. Errors are reported in offset order.
    fn load_batch(&self, path: &Path, batch: &Batch) -> Result<Vec<Chunk>> {
        let chunk_bytes = self.config.chunk_bytes;
        let loaded: Vec<Result<Chunk>> = self.pool.install(|| {
            batch
                .offsets
                .par_iter()
                .map(|&offset| Chunk::load(path, offset, chunk_bytes))
                .collect()
        });
        loaded.into_iter().collect()
    }

    /// Runs the membership predicate over owned chunks; each chunk is dropped by the worker
    /// that tested it. Returns the offset of a matching chunk.
    fn search_batch(&self, chunks: Vec<Chunk>, target: i64) -> Option<u64> {
        self.pool.install(|| {
            chunks
                .into_par_iter()
                .find_map_any(|chunk| chunk.contains(target).then_some(chunk.offset))
        })
    }

    fn notify(&self, f: impl Fn(&dyn ScanObserver)) {
        for observer in &self.observers {
            f(observer.as_ref());
        }
    }
}

/// Searches `path` for `target` with a throwaway pool of `worker_count` threads
pub fn scan(
    path: impl AsRef<Path>,
    target: i64,
    worker_count: usize,
    chunk_bytes: u64,
    ram_budget_bytes: u64,
) -> Result<ScanResult> {
    let config = ScanConfig::new(worker_count, chunk_bytes, ram_budget_bytes)?;
    Scanner::new(config)?.scan(path.as_ref(), target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ScanMetrics;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn write_file(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("numbers.txt");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[derive(Default)]
    struct Recorder {
        admitted: Mutex<Vec<Vec<u64>>>,
        retired: Mutex<Vec<bool>>,
        finished: Mutex<u32>,
    }

    impl ScanObserver for Recorder {
        fn batch_admitted(&self, batch: &Batch) {
            self.admitted.lock().unwrap().push(batch.offsets.clone());
        }

        fn batch_retired(&self, _batch: &Batch, matched: bool) {
            self.retired.lock().unwrap().push(matched);
        }

        fn scan_finished(&self, _result: &ScanResult) {
            *self.finished.lock().unwrap() += 1;
        }
    }

    #[test]
    fn test_found_in_single_batch() {
        let (_dir, path) = write_file("5\n17\n42\n");
        let result = scan(&path, 17, 2, 1024, 4096).unwrap();
        assert!(result.found);
        assert_eq!(result.batches, 1);
        assert_eq!(result.chunks_discarded, 0);
        assert_eq!(result.match_offset, Some(0));
        assert_eq!(result.workers_used, 2);
    }

    #[test]
    fn test_not_found_counts_one_discard() {
        let (_dir, path) = write_file("5\n17\n42\n");
        let result = scan(&path, 99, 2, 1024, 4096).unwrap();
        assert!(!result.found);
        assert_eq!(result.chunks_discarded, 1);
        assert_eq!(result.bytes_scanned, 1024);
        assert!(result.bytes_scanned >= result.file_size);
        assert_eq!(result.values_checked, 3);
    }

    #[test]
    fn test_empty_file() {
        let (_dir, path) = write_file("");
        let result = scan(&path, 0, 4, 16, 64).unwrap();
        assert!(!result.found);
        assert_eq!(result.chunks_discarded, 0);
        assert_eq!(result.bytes_scanned, 0);
        assert_eq!(result.batches, 0);
    }

    #[test]
    fn test_stops_after_matching_batch() {
        let content: String = (0..100).map(|i| format!("{}\n", i)).collect();
        let (_dir, path) = write_file(&content);
        let recorder = Arc::new(Recorder::default());

        // "0\n".."9\n" take 20 bytes, so 3 is owned by the first 8-byte chunk
        let scanner = Scanner::new(ScanConfig::new(2, 8, 16).unwrap())
            .unwrap()
            .with_observer(recorder.clone());
        let result = scanner.scan(&path, 3).unwrap();

        assert!(result.found);
        assert_eq!(result.batches, 1);
        assert_eq!(*recorder.admitted.lock().unwrap(), vec![vec![0, 8]]);
        assert_eq!(*recorder.retired.lock().unwrap(), vec![true]);
        assert_eq!(*recorder.finished.lock().unwrap(), 1);
    }

    #[test]
    fn test_full_scan_rounds_up_to_chunk_multiple() {
        let content: String = (0..50).map(|i| format!("{}\n", i)).collect();
        let (_dir, path) = write_file(&content);
        let file_size = content.len() as u64;

        let result = scan(&path, -1, 3, 7, 21).unwrap();
        assert!(!result.found);
        assert_eq!(result.bytes_scanned, file_size.div_ceil(7) * 7);
        assert_eq!(result.chunks_discarded, result.batches);
        assert_eq!(result.values_checked, 50);
    }

    #[test]
    fn test_worker_count_does_not_change_outcome() {
        let content: String = (0..500).map(|i| format!("{}\n", i * 3)).collect();
        let (_dir, path) = write_file(&content);

        for target in [0, 3, 747, 1497, 1498, 5000] {
            let single = scan(&path, target, 1, 64, 256).unwrap();
            let many = scan(&path, target, 8, 64, 256).unwrap();
            assert_eq!(single.found, many.found, "target {}", target);
            assert_eq!(single.found, target % 3 == 0 && target < 1500);
        }
    }

    #[test]
    fn test_budget_equal_to_chunk() {
        let content: String = (0..40).map(|i| format!("{}\n", i)).collect();
        let (_dir, path) = write_file(&content);
        let recorder = Arc::new(Recorder::default());

        let scanner = Scanner::new(ScanConfig::new(4, 10, 10).unwrap())
            .unwrap()
            .with_observer(recorder.clone());
        let result = scanner.scan(&path, 39).unwrap();

        assert!(result.found);
        for offsets in recorder.admitted.lock().unwrap().iter() {
            assert_eq!(offsets.len(), 1);
        }
        assert_eq!(result.chunks_discarded + 1, result.batches);
    }

    #[test]
    fn test_parse_error_aborts_scan() {
        let mut content: String = (100..130).map(|i| format!("{}\n", i)).collect();
        content.push_str("abc\n");
        content.push_str("7\n");
        let (_dir, path) = write_file(&content);
        let bad_offset = content.find("abc").unwrap() as u64;

        for target in [7, 1000] {
            let err = scan(&path, target, 2, 16, 32).unwrap_err();
            match err {
                ScanError::ParseError {
                    chunk_offset,
                    record_offset,
                    ..
                } => {
                    assert_eq!(record_offset, bad_offset);
                    assert_eq!(chunk_offset, bad_offset / 16 * 16);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_lowest_offset_parse_error_wins() {
        // "xx" starts in the chunk at 4, "yy" in the chunk at 8; both load in one batch
        let (_dir, path) = write_file("1\n2\nxx\n4\n5\nyy\n7\n");

        for workers in [1, 2, 8] {
            for _ in 0..20 {
                let err = scan(&path, 7, workers, 4, 64).unwrap_err();
                match err {
                    ScanError::ParseError {
                        chunk_offset,
                        record_offset,
                        line,
                        ..
                    } => {
                        assert_eq!(chunk_offset, 4);
                        assert_eq!(record_offset, 4);
                        assert_eq!(line, "xx");
                    }
                    other => panic!("unexpected error: {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_peak_resident_within_budget() {
        let content: String = (0..1000).map(|i| format!("{}\n", i)).collect();
        let (_dir, path) = write_file(&content);
        let metrics = Arc::new(ScanMetrics::new());

        let scanner = Scanner::new(ScanConfig::new(4, 100, 350).unwrap())
            .unwrap()
            .with_observer(metrics.clone());
        let result = scanner.scan(&path, -5).unwrap();

        let stats = metrics.get_stats();
        assert!(stats.peak_resident_bytes <= 350);
        assert_eq!(stats.peak_resident_bytes, 300);
        assert_eq!(stats.resident_bytes, 0);
        assert_eq!(stats.admitted_bytes, result.bytes_scanned);
        assert_eq!(stats.batches_retired, result.batches);
    }

    #[test]
    fn test_invalid_parameters() {
        let (_dir, path) = write_file("1\n");
        assert!(matches!(
            scan(&path, 1, 0, 16, 16),
            Err(ScanError::ConfigError(_))
        ));
        assert!(matches!(
            scan(&path, 1, 1, 0, 16),
            Err(ScanError::ConfigError(_))
        ));
        assert!(matches!(
            scan(&path, 1, 1, 32, 16),
            Err(ScanError::ConfigError(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = scan(dir.path().join("absent.txt"), 1, 1, 16, 16).unwrap_err();
        assert!(matches!(err, ScanError::FileNotFound(_)));
    }
}
