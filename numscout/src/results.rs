use serde::{Deserialize, Serialize};

/// Outcome of a bounded parallel scan.
///
/// Counters only grow while the scan runs. Once returned the value is final.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Whether the target occurred in any chunk
    pub found: bool,
    /// Nominal bytes admitted across all evaluated batches
    pub bytes_scanned: u64,
    /// Batches retired without a match
    pub chunks_discarded: u64,
    /// Size of the worker pool
    pub workers_used: usize,
    /// Batches evaluated, including the one that matched
    pub batches: u64,
    /// Chunks loaded and parsed
    pub chunks_loaded: u64,
    /// Parsed values handed to the search phase
    pub values_checked: u64,
    /// Offset of the chunk that satisfied the predicate
    pub match_offset: Option<u64>,
    /// Size of the source file when the scan started
    pub file_size: u64,
}

impl ScanResult {
    /// Creates an empty result for a scan over `file_size` bytes
    pub fn new(workers_used: usize, file_size: u64) -> Self {
        Self {
            workers_used,
            file_size,
            ..Default::default()
        }
    }

    /// Accounts for a batch that was admitted and loaded
    pub fn record_batch(&mut self, admitted_bytes: u64, chunks: u64, values: u64) {
        self.batches += 1;
        self.bytes_scanned += admitted_bytes;
        self.chunks_loaded += chunks;
        self.values_checked += values;
    }

    /// Retires the current batch without a match
    pub fn record_discard(&mut self) {
        self.chunks_discarded += 1;
    }

    /// Marks the scan as successful
    pub fn record_match(&mut self, chunk_offset: u64) {
        self.found = true;
        self.match_offset = Some(chunk_offset);
    }
}
