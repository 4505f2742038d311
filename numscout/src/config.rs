use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::{Result, ScanError};

pub const DEFAULT_CHUNK_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_RAM_BUDGET_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Tuning for a bounded parallel scan.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.numscout.yaml` in the current directory
/// 3. Global `$HOME/.config/numscout/config.yaml`
///
/// # Configuration Format
///
/// ```yaml
/// # Worker threads used to load and test chunks (default: CPU cores)
/// worker_count: 8
///
/// # Bytes read per chunk
/// chunk_bytes: 10485760
///
/// # Ceiling on nominal chunk bytes admitted at once
/// ram_budget_bytes: 2147483648
///
/// # Value to look for (the CLI flag wins when both are given)
/// target: 42
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Size of the worker pool
    #[serde(default = "default_worker_count")]
    pub worker_count: NonZeroUsize,

    /// Nominal size of one chunk in bytes
    #[serde(default = "default_chunk_bytes")]
    pub chunk_bytes: u64,

    /// Upper bound on the nominal size of all chunks admitted in one batch
    #[serde(default = "default_ram_budget_bytes")]
    pub ram_budget_bytes: u64,

    #[serde(default)]
    pub target: Option<i64>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_worker_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_chunk_bytes() -> u64 {
    DEFAULT_CHUNK_BYTES
}

fn default_ram_budget_bytes() -> u64 {
    DEFAULT_RAM_BUDGET_BYTES
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            chunk_bytes: default_chunk_bytes(),
            ram_budget_bytes: default_ram_budget_bytes(),
            target: None,
            log_level: default_log_level(),
        }
    }
}

impl ScanConfig {
    /// Builds a configuration from explicit scan parameters
    pub fn new(worker_count: usize, chunk_bytes: u64, ram_budget_bytes: u64) -> Result<Self> {
        let worker_count = NonZeroUsize::new(worker_count)
            .ok_or_else(|| ScanError::config_error("worker count must be at least 1"))?;
        let config = Self {
            worker_count,
            chunk_bytes,
            ram_budget_bytes,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default locations plus an optional explicit file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("numscout/config.yaml")),
            Some(PathBuf::from(".numscout.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly requested file has to exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects parameters under which no chunk could ever be admitted
    pub fn validate(&self) -> Result<()> {
        if self.chunk_bytes == 0 {
            return Err(ScanError::config_error("chunk size must be greater than zero"));
        }
        if self.ram_budget_bytes < self.chunk_bytes {
            return Err(ScanError::config_error(format!(
                "RAM budget ({} bytes) is smaller than one chunk ({} bytes)",
                self.ram_budget_bytes, self.chunk_bytes
            )));
        }
        Ok(())
    }

    /// Maximum number of chunks admitted together in one batch
    pub fn chunks_per_batch(&self) -> u64 {
        self.ram_budget_bytes / self.chunk_bytes.max(1)
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        if let Some(worker_count) = cli.worker_count {
            self.worker_count = worker_count;
        }
        if let Some(chunk_bytes) = cli.chunk_bytes {
            self.chunk_bytes = chunk_bytes;
        }
        if let Some(ram_budget_bytes) = cli.ram_budget_bytes {
            self.ram_budget_bytes = ram_budget_bytes;
        }
        if cli.target.is_some() {
            self.target = cli.target;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }
}

/// Values given on the command line; `None` leaves the file value alone
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub worker_count: Option<NonZeroUsize>,
    pub chunk_bytes: Option<u64>,
    pub ram_budget_bytes: Option<u64>,
    pub target: Option<i64>,
    pub log_level: Option<String>,
}

/// Parses a byte size such as `4096`, `64k`, `10M` or `2g` (binary units).
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();
    let trimmed = s.strip_suffix(['b', 'B']).unwrap_or(s);
    let (num_str, mult): (&str, u64) = match trimmed.as_bytes().last().copied() {
        Some(b'k') | Some(b'K') => (&trimmed[..trimmed.len() - 1], 1024),
        Some(b'm') | Some(b'M') => (&trimmed[..trimmed.len() - 1], 1024 * 1024),
        Some(b'g') | Some(b'G') => (&trimmed[..trimmed.len() - 1], 1024 * 1024 * 1024),
        _ => (trimmed, 1),
    };

    let n: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| ScanError::config_error(format!("invalid size: '{}'", s)))?;

    n.checked_mul(mult)
        .ok_or_else(|| ScanError::config_error(format!("size overflows: '{}'", s)))
}
