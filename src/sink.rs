use crate::pipeline::CancelToken;
use crate::stats::RunStats;
use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::Write;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DedupMode {
    /// Keep every emitted URI (exact, memory grows with distinct URIs)
    #[default]
    Exact,
    /// Keep a 64-bit digest per URI (fixed per-entry size, rare false duplicates)
    Hashed,
}

/// URIs already written during this run. Never pruned.
pub enum SeenSet {
    Exact(FxHashSet<String>),
    Hashed(FxHashSet<u64>),
}

impl SeenSet {
    pub fn new(mode: DedupMode) -> Self {
        match mode {
            DedupMode::Exact => SeenSet::Exact(FxHashSet::default()),
            DedupMode::Hashed => SeenSet::Hashed(FxHashSet::default()),
        }
    }

    /// Returns `true` the first time a value is seen.
    pub fn insert(&mut self, uri: &str) -> bool {
        match self {
            SeenSet::Exact(set) => {
                if set.contains(uri) {
                    false
                } else {
                    set.insert(uri.to_owned())
                }
            }
            // fixed-key SipHash, digests are stable across runs
            SeenSet::Hashed(set) => {
                let mut hasher = DefaultHasher::new();
                uri.hash(&mut hasher);
                set.insert(hasher.finish())
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SeenSet::Exact(set) => set.len(),
            SeenSet::Hashed(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drains the URI intake, writing each first-seen URI verbatim in arrival
/// order. Returns once the intake is closed and `out` is flushed; that
/// return is the pipeline's completion signal.
pub fn run_sink<W: Write>(
    uris: Receiver<String>,
    mut out: W,
    mut seen: SeenSet,
    stats: &RunStats,
    cancel: &CancelToken,
) -> Result<Duration> {
    let started = Instant::now();

    for uri in uris.iter() {
        if cancel.is_cancelled() {
            debug!("Run cancelled, sink stopping");
            break;
        }
        if !seen.insert(&uri) {
            stats.inc_duplicates();
            continue;
        }
        if let Err(e) = out.write_all(uri.as_bytes()) {
            cancel.cancel();
            return Err(e).context("Failed to write URI to output");
        }
        stats.inc_uris_written();
    }

    if let Err(e) = out.flush() {
        cancel.cancel();
        return Err(e).context("Failed to flush output");
    }

    info!(
        unique = seen.len(),
        duplicates = stats.duplicates(),
        "URI sink drained"
    );
    Ok(started.elapsed())
}
