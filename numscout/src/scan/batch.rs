/// A group of chunks admitted together under the RAM budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of this batch in the scan, starting at 0
    pub index: u64,
    /// Chunk offsets, contiguous and in file order
    pub offsets: Vec<u64>,
    /// Nominal bytes admitted (`offsets.len() * chunk_bytes`)
    pub admitted_bytes: u64,
}

impl Batch {
    /// First byte covered by the batch
    pub fn start(&self) -> u64 {
        self.offsets.first().copied().unwrap_or(0)
    }

    /// Byte range covered by the batch, clamped to the file size
    pub fn range(&self, file_size: u64) -> std::ops::Range<u64> {
        let start = self.start();
        start..start.saturating_add(self.admitted_bytes).min(file_size)
    }
}

/// Splits `[0, file_size)` into batches of chunk offsets.
///
/// Chunks are admitted while the running admitted size stays within the budget, so every batch
/// holds at least one and at most `ram_budget_bytes / chunk_bytes` chunks. The offsets produced
/// are a pure function of the three sizes.
#[derive(Debug, Clone)]
pub struct BatchPlanner {
    file_size: u64,
    chunk_bytes: u64,
    ram_budget_bytes: u64,
    pos: u64,
    next_index: u64,
}

impl BatchPlanner {
    /// Callers validate `chunk_bytes > 0` and `ram_budget_bytes >= chunk_bytes` beforehand.
    pub fn new(file_size: u64, chunk_bytes: u64, ram_budget_bytes: u64) -> Self {
        debug_assert!(chunk_bytes > 0);
        debug_assert!(ram_budget_bytes >= chunk_bytes);
        Self {
            file_size,
            chunk_bytes,
            ram_budget_bytes,
            pos: 0,
            next_index: 0,
        }
    }

    /// Cursor position: the first byte not yet admitted
    pub fn position(&self) -> u64 {
        self.pos
    }
}

impl Iterator for BatchPlanner {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.pos >= self.file_size || self.chunk_bytes == 0 {
            return None;
        }

        let mut offsets = Vec::new();
        let mut admitted_bytes = 0u64;
        while self.pos < self.file_size {
            match admitted_bytes.checked_add(self.chunk_bytes) {
                Some(next) if next <= self.ram_budget_bytes => admitted_bytes = next,
                _ => break,
            }
            offsets.push(self.pos);
            self.pos = self.pos.saturating_add(self.chunk_bytes);
        }

        if offsets.is_empty() {
            // Budget smaller than a chunk; nothing can ever be admitted
            return None;
        }

        let index = self.next_index;
        self.next_index += 1;
        Some(Batch {
            index,
            offsets,
            admitted_bytes,
        })
    }
}
