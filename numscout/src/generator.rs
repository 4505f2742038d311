//! Produces number files for the scanner to search.
//!
//! Records are drawn uniformly from `[0, max_value]`, one per line, with no deduplication.
//! Generation runs in rounds: every worker fills a block of its share in parallel, then the
//! blocks are appended in worker order, so memory stays at one block per worker and a fixed
//! seed always yields the same file.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use tracing::{debug, info};

use crate::errors::{Result, ScanError};

// Records produced by one worker per round
const BLOCK_RECORDS: u64 = 64 * 1024;

/// Parameters for [`generate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Number of records to write
    pub count: u64,
    /// Largest value that may be drawn
    pub max_value: i64,
    pub worker_count: NonZeroUsize,
    /// Seed for reproducible output; drawn at random when absent
    pub seed: Option<u64>,
}

impl GeneratorConfig {
    pub fn new(count: u64, max_value: i64) -> Self {
        Self {
            count,
            max_value,
            worker_count: NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN),
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_value < 0 {
            return Err(ScanError::config_error(format!(
                "maximum value must not be negative, got {}",
                self.max_value
            )));
        }
        Ok(())
    }
}

/// Summary of a finished generation run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationReport {
    pub records: u64,
    pub bytes_written: u64,
    /// Seed actually used, so the run can be repeated
    pub seed: u64,
}

/// Writes `config.count` random records to `path`, replacing any existing file
pub fn generate(path: &Path, config: &GeneratorConfig) -> Result<GenerationReport> {
    config.validate()?;

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let workers = config.worker_count.get() as u64;
    info!(
        "Generating {} records in [0, {}] into {} with {} workers (seed {})",
        config.count,
        config.max_value,
        path.display(),
        workers,
        seed
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(config.worker_count.get())
        .thread_name(|i| format!("numscout-generator-{}", i))
        .build()
        .map_err(|e| ScanError::config_error(format!("failed to start worker pool: {}", e)))?;

    let file = File::create(path).map_err(|e| ScanError::from_io(path, e))?;
    let mut writer = BufWriter::new(file);

    // Each worker owns its generator for the whole run
    let mut rngs: Vec<StdRng> = (0..workers)
        .map(|i| StdRng::seed_from_u64(seed.wrapping_add(i)))
        .collect();
    let mut remaining: Vec<u64> = (0..workers).map(|i| share(config.count, workers, i)).collect();

    let mut bytes_written = 0u64;
    let mut round = 0u64;
    while remaining.iter().any(|&n| n > 0) {
        let max_value = config.max_value;
        let blocks: Vec<Vec<u8>> = pool
            .install(|| {
                rngs.par_iter_mut()
                    .zip(remaining.par_iter_mut())
                    .map(|(rng, left)| {
                        let take = (*left).min(BLOCK_RECORDS);
                        *left -= take;
                        fill_block(rng, take, max_value)
                    })
                    .collect::<io::Result<Vec<_>>>()
            })
            .map_err(ScanError::IoError)?;

        for block in &blocks {
            writer.write_all(block).map_err(ScanError::IoError)?;
            bytes_written += block.len() as u64;
        }
        debug!("Generation round {} wrote {} bytes", round, bytes_written);
        round += 1;
    }

    writer.flush().map_err(ScanError::IoError)?;
    info!(
        "Generated {} records ({} bytes) into {}",
        config.count,
        bytes_written,
        path.display()
    );

    Ok(GenerationReport {
        records: config.count,
        bytes_written,
        seed,
    })
}

/// Records assigned to `worker`; the remainder goes to the lowest-numbered workers
fn share(count: u64, workers: u64, worker: u64) -> u64 {
    count / workers + u64::from(worker < count % workers)
}

fn fill_block(rng: &mut StdRng, records: u64, max_value: i64) -> io::Result<Vec<u8>> {
    let mut block = Vec::with_capacity(records as usize * 8);
    for _ in 0..records {
        writeln!(block, "{}", rng.random_range(0..=max_value))?;
    }
    Ok(block)
}
