use crate::config::PipelineConfig;
use crate::models::RawRecord;
use crate::sink::{run_sink, SeenSet};
use crate::source::run_source;
use crate::stats::RunStats;
use crate::warc::{ContainerReader, Frame, FrameError};
use crate::workers::run_workers;
use anyhow::{anyhow, Context, Result};
use crossbeam_channel::bounded;
use indicatif::ProgressBar;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ScopedJoinHandle};
use std::time::{Duration, Instant};
use tracing::info;

/// Set by the first stage that hits a fatal error; the others check it
/// between items and wind down.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Totals for one completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Records successfully framed and handed to the workers
    pub records: u64,
    pub malformed: u64,
    pub parse_errors: u64,
    pub empty_targets: u64,
    pub uris_extracted: u64,
    pub unique: u64,
    pub duplicates: u64,
    pub elapsed: Duration,
    pub source_elapsed: Duration,
    pub workers_elapsed: Duration,
    pub sink_elapsed: Duration,
}

impl RunSummary {
    pub fn records_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.records as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "processed {} records in {:?}", self.records, self.elapsed)
    }
}

/// Extracts the deduplicated target URIs of `config.input` into `out`.
///
/// Validation and opening the container happen before any stage starts, so
/// configuration and startup errors never leave threads behind.
pub fn run_pipeline<W: Write + Send>(config: &PipelineConfig, out: W) -> Result<RunSummary> {
    config.validate()?;
    let reader = ContainerReader::open(&config.input)?;
    run_stages(config, reader, out)
}

fn join_stage<T>(handle: ScopedJoinHandle<'_, Result<T>>, stage: &str) -> Result<T> {
    match handle.join() {
        Ok(result) => result.with_context(|| format!("{stage} failed")),
        Err(_) => Err(anyhow!("{stage} thread panicked")),
    }
}

fn run_stages<I, W>(config: &PipelineConfig, frames: I, out: W) -> Result<RunSummary>
where
    I: IntoIterator<Item = Result<Frame, FrameError>> + Send,
    W: Write + Send,
{
    let stats = RunStats::new();
    let cancel = CancelToken::new();
    let progress = if config.progress {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::hidden()
    };
    let seen = SeenSet::new(config.dedup);
    let (record_tx, record_rx) = bounded::<RawRecord>(config.record_queue);
    let (uri_tx, uri_rx) = bounded::<String>(config.uri_queue);

    info!(
        input = %config.input.display(),
        concurrency = config.concurrency,
        dedup = ?config.dedup,
        "Starting pipeline"
    );
    let started = Instant::now();

    let (source, workers, sink) = thread::scope(|s| -> Result<_> {
        let stats = &stats;
        let cancel = &cancel;
        let progress = &progress;

        let source = thread::Builder::new()
            .name("warc-source".to_string())
            .spawn_scoped(s, move || {
                run_source(frames, record_tx, stats, cancel, progress)
            })
            .context("Failed to spawn record source")?;
        let workers = thread::Builder::new()
            .name("warc-workers".to_string())
            .spawn_scoped(s, move || {
                run_workers(config.concurrency, record_rx, uri_tx, stats, cancel)
            })
            .context("Failed to spawn worker pool")?;
        let sink = thread::Builder::new()
            .name("warc-sink".to_string())
            .spawn_scoped(s, move || run_sink(uri_rx, out, seen, stats, cancel))
            .context("Failed to spawn URI sink")?;

        // The sink returns only after the worker pool closed its intake and
        // the output was flushed, so this join is the completion signal.
        let sink = join_stage(sink, "URI sink");
        let workers = join_stage(workers, "Worker pool");
        let source = join_stage(source, "Record source");
        Ok((source, workers, sink))
    })?;

    progress.finish_and_clear();

    // the source's error is the root cause when several stages failed
    let source_elapsed = source?;
    let workers_elapsed = workers?;
    let sink_elapsed = sink?;

    let summary = RunSummary {
        records: stats.records(),
        malformed: stats.malformed(),
        parse_errors: stats.parse_errors(),
        empty_targets: stats.empty_targets(),
        uris_extracted: stats.uris_extracted(),
        unique: stats.uris_written(),
        duplicates: stats.duplicates(),
        elapsed: started.elapsed(),
        source_elapsed,
        workers_elapsed,
        sink_elapsed,
    };

    info!(
        records = summary.records,
        malformed = summary.malformed,
        parse_errors = summary.parse_errors,
        unique = summary.unique,
        duplicates = summary.duplicates,
        duration_secs = summary.elapsed.as_secs_f64(),
        "Pipeline complete"
    );

    Ok(summary)
}
