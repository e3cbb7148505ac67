use crate::config::PROGRESS_INTERVAL;
use crate::models::RawRecord;
use crate::pipeline::CancelToken;
use crate::stats::RunStats;
use crate::warc::{Frame, FrameError};
use anyhow::Result;
use crossbeam_channel::Sender;
use indicatif::ProgressBar;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Frames records in container order and hands them to the worker intake.
///
/// `send` blocks while the intake is full, so framing never runs more than
/// the queue capacity ahead of parsing. Malformed records are logged and
/// skipped; any other framing error cancels the run and is returned.
/// Returning drops `records`, which closes the intake.
pub fn run_source<I>(
    frames: I,
    records: Sender<RawRecord>,
    stats: &RunStats,
    cancel: &CancelToken,
    progress: &ProgressBar,
) -> Result<Duration>
where
    I: IntoIterator<Item = Result<Frame, FrameError>>,
{
    let started = Instant::now();
    let mut seq = 0u64;

    for frame in frames {
        if cancel.is_cancelled() {
            debug!(records = seq, "Run cancelled, source stopping");
            break;
        }

        let frame = match frame {
            Ok(frame) => frame,
            Err(e) if e.is_recoverable() => {
                warn!(offset = e.offset(), error = %e, "Skipping malformed record");
                stats.inc_malformed();
                continue;
            }
            Err(e) => {
                cancel.cancel();
                return Err(anyhow::Error::new(e).context("Unrecoverable framing error"));
            }
        };

        let record = RawRecord {
            seq,
            offset: frame.offset,
            bytes: frame.bytes,
        };
        if records.send(record).is_err() {
            debug!(records = seq, "Record intake closed, source stopping");
            break;
        }
        stats.inc_records();
        seq += 1;

        if seq % PROGRESS_INTERVAL == 0 {
            progress.set_message(format!("{seq} records"));
            progress.tick();
        }
    }

    info!(
        records = seq,
        malformed = stats.malformed(),
        "Record source finished"
    );
    Ok(started.elapsed())
}
