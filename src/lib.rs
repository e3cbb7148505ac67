//! warc-urls: concurrent WARC-Target-URI extraction
//!
//! Reads a WARC container (plain, gzip or bzip2), pulls the `WARC-Target-URI`
//! header out of every record and writes each distinct URI once, one per line.
//!
//! # Architecture
//!
//! Three stages connected by bounded `crossbeam-channel` queues:
//!
//! 1. **Record Source** -- a single thread frames raw records in container
//!    order. Malformed records are logged and skipped; other framing errors
//!    cancel the run
//! 2. **Record Workers** -- N threads race for raw records, parse the header
//!    fields and forward trimmed, non-empty target URIs
//! 3. **Deduplicating Sink** -- a single thread drops URIs it has already
//!    written and writes the rest in arrival order
//!
//! ```text
//! [Source] --RawRecord--> [Worker x N] --String--> [Sink] --> stdout
//! ```
//!
//! The coordinator ([`pipeline::run_pipeline`]) joins the worker pool before
//! the URI queue closes and treats the sink's return as the completion
//! signal, so no output is lost to a shutdown race. Fatal errors trip a shared
//! [`pipeline::CancelToken`] and every stage winds down instead of the process
//! exiting from inside a thread.
//!
//! With more than one worker the output order depends on scheduling; with a
//! single worker it follows the container.
//!
//! # Key Modules
//!
//! - [`warc`] -- Record framing over a decompressed stream
//! - [`fields`] -- Header field parsing
//! - [`source`] -- Record Source stage
//! - [`workers`] -- Worker pool and target URI extraction
//! - [`sink`] -- Deduplicating writer and seen-set modes
//! - [`pipeline`] -- Coordinator, cancellation and run summary
//! - [`profile`] -- JSON timing report
//! - [`stats`] -- Atomic counters shared by the stages
//! - [`models`] -- Raw record and compression types
//! - [`config`] -- Constants and pipeline configuration
//!
//! # Example Usage
//!
//! ```bash
//! warc-urls -w crawl.warc.gz -n 8 >> urls.txt
//! ```

pub mod config;
pub mod fields;
pub mod models;
pub mod pipeline;
pub mod profile;
pub mod sink;
pub mod source;
pub mod stats;
pub mod warc;
pub mod workers;
