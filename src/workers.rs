use crate::config::TARGET_URI_FIELD;
use crate::fields::{parse_fields, FieldError};
use crate::models::RawRecord;
use crate::pipeline::CancelToken;
use crate::stats::RunStats;
use anyhow::{bail, Context, Result};
use crossbeam_channel::{Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Returns the record's target URI with a trailing newline, or `None` when
/// the field is absent or blank after trimming spaces and tabs.
pub fn extract_target_uri(record: &RawRecord) -> Result<Option<String>, FieldError> {
    let fields = parse_fields(&record.bytes)?;
    let target = fields
        .value(TARGET_URI_FIELD)?
        .unwrap_or_default()
        .trim_matches([' ', '\t']);
    if target.is_empty() {
        return Ok(None);
    }

    let mut uri = String::with_capacity(target.len() + 1);
    uri.push_str(target);
    uri.push('\n');
    Ok(Some(uri))
}

fn work(
    id: usize,
    records: Receiver<RawRecord>,
    uris: Sender<String>,
    stats: &RunStats,
    cancel: &CancelToken,
) {
    for record in records.iter() {
        if cancel.is_cancelled() {
            break;
        }
        match extract_target_uri(&record) {
            Ok(Some(uri)) => {
                stats.inc_uris_extracted();
                if uris.send(uri).is_err() {
                    debug!(worker = id, "URI intake closed, worker stopping");
                    break;
                }
            }
            Ok(None) => stats.inc_empty_targets(),
            Err(e) => {
                warn!(
                    seq = record.seq,
                    offset = record.offset,
                    error = %e,
                    "Skipping record with unparseable fields"
                );
                stats.inc_parse_errors();
            }
        }
    }
}

/// Runs `concurrency` workers over the shared record intake and blocks until
/// every one of them has returned.
///
/// Workers race for records, so each record is parsed at most once and
/// results arrive downstream in no particular order. `uris` is dropped only
/// after the scope has joined all workers, which is what closes the sink's
/// intake.
pub fn run_workers(
    concurrency: usize,
    records: Receiver<RawRecord>,
    uris: Sender<String>,
    stats: &RunStats,
    cancel: &CancelToken,
) -> Result<Duration> {
    let started = Instant::now();

    let result = thread::scope(|s| -> Result<()> {
        let mut handles = Vec::with_capacity(concurrency);
        for id in 0..concurrency {
            let records = records.clone();
            let uris = uris.clone();
            let spawned = thread::Builder::new()
                .name(format!("warc-worker-{id}"))
                .spawn_scoped(s, move || work(id, records, uris, stats, cancel));
            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    cancel.cancel();
                    return Err(e).context("Failed to spawn record worker");
                }
            }
        }

        let panicked = handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(|joined| joined.is_err())
            .count();
        if panicked > 0 {
            cancel.cancel();
            bail!("{panicked} record worker(s) panicked");
        }
        Ok(())
    });

    drop(uris);
    drop(records);
    result?;

    debug!(concurrency, "All record workers finished");
    Ok(started.elapsed())
}
