use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use warc_urls::config::{
    PipelineConfig, DEFAULT_CONCURRENCY, RECORD_QUEUE_CAPACITY, URI_QUEUE_CAPACITY,
};
use warc_urls::pipeline::{run_pipeline, RunSummary};
use warc_urls::profile::ProfileWriter;
use warc_urls::sink::DedupMode;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const OUTPUT_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Parser)]
#[command(name = "warc-urls", version)]
#[command(about = "Extract deduplicated WARC-Target-URIs from a WARC file")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to the WARC file (.warc, .warc.gz or .warc.bz2)
    #[arg(short, long)]
    warc: PathBuf,

    /// Number of concurrent record workers
    #[arg(short = 'n', long, visible_alias = "n-concurrent", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Write URIs to this file instead of standard output
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write a JSON timing profile of the run to this file
    #[arg(long, visible_alias = "cpuprofile")]
    profile_output: Option<PathBuf>,

    /// How already-written URIs are remembered
    #[arg(long, value_enum, default_value_t = DedupMode::Exact)]
    dedup: DedupMode,

    /// Raw-record queue capacity (0 = hand off directly)
    #[arg(long, default_value_t = RECORD_QUEUE_CAPACITY)]
    record_queue: usize,

    /// URI queue capacity (0 = hand off directly)
    #[arg(long, default_value_t = URI_QUEUE_CAPACITY)]
    uri_queue: usize,

    /// Disable the progress spinner
    #[arg(long)]
    no_progress: bool,
}

fn run(cli: Cli) -> Result<()> {
    let config = PipelineConfig {
        input: cli.warc,
        concurrency: cli.concurrency,
        record_queue: cli.record_queue,
        uri_queue: cli.uri_queue,
        dedup: cli.dedup,
        progress: !cli.no_progress,
    };
    config.validate()?;

    let profile = cli
        .profile_output
        .as_deref()
        .map(ProfileWriter::create)
        .transpose()?;

    let summary: RunSummary = match &cli.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            run_pipeline(&config, BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, file))?
        }
        None => run_pipeline(
            &config,
            BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, io::stdout()),
        )?,
    };

    if let Some(profile) = profile {
        profile.finish(&config, &summary)?;
    }

    eprintln!("{summary}");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // stdout carries the URIs
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error: failed to set tracing subscriber: {e}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
