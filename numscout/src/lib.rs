pub mod config;
pub mod errors;
pub mod generator;
pub mod metrics;
pub mod results;
pub mod scan;

pub use config::{parse_size, CliOverrides, ScanConfig};
pub use errors::{Result, ScanError};
pub use generator::{generate, GenerationReport, GeneratorConfig};
pub use metrics::{ScanMetrics, ScanObserver, ScanStats};
pub use results::ScanResult;
pub use scan::{scan, Scanner};
