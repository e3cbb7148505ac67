use crate::sink::DedupMode;
use anyhow::{bail, Result};
use std::path::PathBuf;

/// Header field carrying the captured resource's URI
pub const TARGET_URI_FIELD: &str = "WARC-Target-URI";

/// Default number of record workers
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Capacity of the raw-record queue between the source and the workers
pub const RECORD_QUEUE_CAPACITY: usize = 64;

/// Capacity of the URI queue between the workers and the sink
pub const URI_QUEUE_CAPACITY: usize = 1024;

/// Progress update interval (tick every N records)
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Buffered reader capacity for the decompressed container
pub const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Upper bound on a single record's header block
pub const MAX_HEADER_BYTES: usize = 1024 * 1024;

pub struct PipelineConfig {
    pub input: PathBuf,
    pub concurrency: usize,
    /// Zero makes the hand-off a rendezvous.
    pub record_queue: usize,
    pub uri_queue: usize,
    pub dedup: DedupMode,
    pub progress: bool,
}

impl PipelineConfig {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            concurrency: DEFAULT_CONCURRENCY,
            record_queue: RECORD_QUEUE_CAPACITY,
            uri_queue: URI_QUEUE_CAPACITY,
            dedup: DedupMode::Exact,
            progress: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            bail!("input path not set");
        }
        if self.concurrency == 0 {
            bail!("invalid concurrency setting: must be at least 1");
        }
        Ok(())
    }
}
