use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;
use tracing::trace;

use crate::errors::{Result, ScanError};

// Upper bound for the read buffer; small chunks get a buffer their own size
const BUFFER_CAPACITY: usize = 64 * 1024;

/// One parsed byte range of a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Byte offset where the range starts
    pub offset: u64,
    /// Parsed records, in file order
    pub values: Vec<i64>,
}

impl Chunk {
    /// Loads the chunk starting at `offset`
    pub fn load(path: &Path, offset: u64, max_bytes: u64) -> Result<Self> {
        Ok(Self {
            offset,
            values: load(path, offset, max_bytes)?,
        })
    }

    /// Membership predicate for the search phase
    pub fn contains(&self, target: i64) -> bool {
        self.values.contains(&target)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Reads the records of `[offset, offset + max_bytes)` and parses them as integers.
///
/// A record belongs to the chunk holding its first byte. When `offset` lands inside a record
/// the leading fragment is skipped, and the record crossing the upper boundary is read to its
/// end, so back-to-back offsets parse every record exactly once. Blank lines are ignored.
/// Offsets at or past end-of-file give an empty sequence.
pub fn load(path: &Path, offset: u64, max_bytes: u64) -> Result<Vec<i64>> {
    if max_bytes == 0 {
        return Err(ScanError::config_error("chunk size must be greater than zero"));
    }

    trace!(
        "Loading chunk at offset {} ({} bytes) from {}",
        offset,
        max_bytes,
        path.display()
    );

    let mut file = File::open(path).map_err(|e| ScanError::from_io(path, e))?;
    if offset > 0 {
        file.seek(SeekFrom::Start(offset - 1))
            .map_err(ScanError::IoError)?;
    }

    let capacity = usize::try_from(max_bytes).map_or(BUFFER_CAPACITY, |n| n.min(BUFFER_CAPACITY));
    let mut reader = BufReader::with_capacity(capacity, file);
    let mut line = Vec::with_capacity(32);
    let mut pos = offset;

    if offset > 0 {
        // Consume up to the first newline at or after `offset - 1`. If that byte is the
        // newline itself a record starts exactly at `offset`; otherwise the bytes skipped
        // are the tail of a record owned by the previous chunk.
        let skipped = reader
            .read_until(b'\n', &mut line)
            .map_err(ScanError::IoError)?;
        pos = offset - 1 + skipped as u64;
    }

    let end = offset.saturating_add(max_bytes);
    let mut values = Vec::new();

    while pos < end {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(ScanError::IoError)?;
        if read == 0 {
            break;
        }

        let record_offset = pos;
        pos += read as u64;

        let record = trim_record(&line);
        if record.is_empty() {
            continue;
        }

        let value = std::str::from_utf8(record)
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .ok_or_else(|| {
                ScanError::parse_error(
                    path,
                    offset,
                    record_offset,
                    String::from_utf8_lossy(record),
                )
            })?;
        values.push(value);
    }

    trace!("Chunk at offset {} parsed {} values", offset, values.len());
    Ok(values)
}

fn trim_record(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &line[start..end]
}
