//! Out-of-core, memory-bounded parallel search over newline-delimited integer files.
//!
//! A scan walks the file in fixed-size byte chunks. Chunks are grouped into batches whose
//! nominal size fits the configured RAM budget; each batch is loaded and searched on a rayon
//! pool and then dropped before the next batch is admitted:
//!
//! ```text
//!  file:   |----c0----|----c1----|----c2----|----c3----|----c4--|
//!  batch:  |<------ batch 0 ---->|<------ batch 1 ---->|<- b2 ->|
//!           load c0,c1 in parallel -> any(target in c) -> drop -> next
//! ```
//!
//! The cursor and every counter live on the calling thread. Workers only ever see owned
//! chunk data and return plain values, so no locking is involved.
//!
//! ```rust,no_run
//! use numscout::scan;
//!
//! let result = scan::scan("numbers.txt", 42, 8, 10 * 1024 * 1024, 2 * 1024 * 1024 * 1024)?;
//! if result.found {
//!     println!("found after {} batches", result.batches);
//! }
//! # Ok::<(), numscout::ScanError>(())
//! ```
pub mod batch;
pub mod engine;
pub mod loader;

pub use batch::{Batch, BatchPlanner};
pub use engine::{scan, Scanner};
pub use loader::{load, Chunk};
