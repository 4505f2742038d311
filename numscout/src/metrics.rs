use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use crate::results::ScanResult;
use crate::scan::Batch;

/// Receives batch boundaries from the scanner.
///
/// Observers never influence the scan; every method has an empty default.
pub trait ScanObserver: Send + Sync {
    /// A batch passed admission and is about to be loaded
    fn batch_admitted(&self, _batch: &Batch) {}

    /// A batch finished its decision step and its chunks were dropped
    fn batch_retired(&self, _batch: &Batch, _matched: bool) {}

    /// The scan returned successfully
    fn scan_finished(&self, _result: &ScanResult) {}
}

/// Tracks nominal resident chunk bytes and scan throughput
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    resident_bytes: Arc<AtomicU64>,
    peak_resident_bytes: Arc<AtomicU64>,
    admitted_bytes: Arc<AtomicU64>,

    batches_admitted: Arc<AtomicU64>,
    batches_retired: Arc<AtomicU64>,
    chunks_admitted: Arc<AtomicU64>,
    matches: Arc<AtomicU64>,
}

impl ScanMetrics {
    /// Creates a new ScanMetrics instance
    pub fn new() -> Self {
        Self {
            resident_bytes: Arc::new(AtomicU64::new(0)),
            peak_resident_bytes: Arc::new(AtomicU64::new(0)),
            admitted_bytes: Arc::new(AtomicU64::new(0)),
            batches_admitted: Arc::new(AtomicU64::new(0)),
            batches_retired: Arc::new(AtomicU64::new(0)),
            chunks_admitted: Arc::new(AtomicU64::new(0)),
            matches: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records chunk bytes becoming resident
    pub fn record_allocation(&self, bytes: u64) {
        let total = self.resident_bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.admitted_bytes.fetch_add(bytes, Ordering::Relaxed);
        let mut peak = self.peak_resident_bytes.load(Ordering::Relaxed);
        while total > peak {
            match self.peak_resident_bytes.compare_exchange_weak(
                peak,
                total,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => peak = current,
            }
        }
        debug!("Chunk bytes admitted: {}, resident: {}", bytes, total);
    }

    /// Records chunk bytes being released
    pub fn record_deallocation(&self, bytes: u64) {
        let previous = self
            .resident_bytes
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_sub(bytes))
            })
            .unwrap_or_else(|current| current);
        let total = previous.saturating_sub(bytes);
        debug!("Chunk bytes released: {}, resident: {}", bytes, total);
    }

    /// Gets current scan statistics
    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            resident_bytes: self.resident_bytes.load(Ordering::Relaxed),
            peak_resident_bytes: self.peak_resident_bytes.load(Ordering::Relaxed),
            admitted_bytes: self.admitted_bytes.load(Ordering::Relaxed),
            batches_admitted: self.batches_admitted.load(Ordering::Relaxed),
            batches_retired: self.batches_retired.load(Ordering::Relaxed),
            chunks_admitted: self.chunks_admitted.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
        }
    }

    /// Logs current scan statistics
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Scan stats:\n\
             Admitted: {} bytes\n\
             Peak resident: {} bytes\n\
             Batches admitted/retired: {}/{}\n\
             Chunks admitted: {}\n\
             Matches: {}",
            stats.admitted_bytes,
            stats.peak_resident_bytes,
            stats.batches_admitted,
            stats.batches_retired,
            stats.chunks_admitted,
            stats.matches
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanObserver for ScanMetrics {
    fn batch_admitted(&self, batch: &Batch) {
        self.batches_admitted.fetch_add(1, Ordering::Relaxed);
        self.chunks_admitted
            .fetch_add(batch.offsets.len() as u64, Ordering::Relaxed);
        self.record_allocation(batch.admitted_bytes);
    }

    fn batch_retired(&self, batch: &Batch, matched: bool) {
        self.batches_retired.fetch_add(1, Ordering::Relaxed);
        if matched {
            self.matches.fetch_add(1, Ordering::Relaxed);
        }
        self.record_deallocation(batch.admitted_bytes);
    }

    fn scan_finished(&self, _result: &ScanResult) {
        self.log_stats();
    }
}

/// Snapshot of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub resident_bytes: u64,
    pub peak_resident_bytes: u64,
    pub admitted_bytes: u64,
    pub batches_admitted: u64,
    pub batches_retired: u64,
    pub chunks_admitted: u64,
    pub matches: u64,
}
