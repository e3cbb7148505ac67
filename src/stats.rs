use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by reference across the pipeline stages.
///
/// Each counter has one writing stage: the source owns `records_framed` and
/// `malformed_records`, the workers own `parse_errors`, `empty_targets` and
/// `uris_extracted`, the sink owns `uris_written` and `duplicates`. Values are
/// only read once every stage has been joined.
#[derive(Default)]
pub struct RunStats {
    pub records_framed: AtomicU64,
    pub malformed_records: AtomicU64,
    pub parse_errors: AtomicU64,
    pub empty_targets: AtomicU64,
    pub uris_extracted: AtomicU64,
    pub uris_written: AtomicU64,
    pub duplicates: AtomicU64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_records(&self) {
        self.records_framed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_malformed(&self) {
        self.malformed_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_parse_errors(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_empty_targets(&self) {
        self.empty_targets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_uris_extracted(&self) {
        self.uris_extracted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_uris_written(&self) {
        self.uris_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_duplicates(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records(&self) -> u64 {
        self.records_framed.load(Ordering::Relaxed)
    }

    pub fn malformed(&self) -> u64 {
        self.malformed_records.load(Ordering::Relaxed)
    }

    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }

    pub fn empty_targets(&self) -> u64 {
        self.empty_targets.load(Ordering::Relaxed)
    }

    pub fn uris_extracted(&self) -> u64 {
        self.uris_extracted.load(Ordering::Relaxed)
    }

    pub fn uris_written(&self) -> u64 {
        self.uris_written.load(Ordering::Relaxed)
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }
}
