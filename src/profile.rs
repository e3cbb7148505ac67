use crate::config::PipelineConfig;
use crate::pipeline::RunSummary;
use crate::sink::DedupMode;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Timing and counter report written at the end of a run.
#[derive(Debug, Serialize)]
pub struct RunProfile {
    pub input: String,
    pub concurrency: usize,
    pub record_queue: usize,
    pub uri_queue: usize,
    pub dedup: DedupMode,
    pub records: u64,
    pub malformed: u64,
    pub parse_errors: u64,
    pub empty_targets: u64,
    pub uris_extracted: u64,
    pub unique: u64,
    pub duplicates: u64,
    pub elapsed_secs: f64,
    pub source_secs: f64,
    pub workers_secs: f64,
    pub sink_secs: f64,
    pub records_per_sec: f64,
}

impl RunProfile {
    pub fn new(config: &PipelineConfig, summary: &RunSummary) -> Self {
        Self {
            input: config.input.display().to_string(),
            concurrency: config.concurrency,
            record_queue: config.record_queue,
            uri_queue: config.uri_queue,
            dedup: config.dedup,
            records: summary.records,
            malformed: summary.malformed,
            parse_errors: summary.parse_errors,
            empty_targets: summary.empty_targets,
            uris_extracted: summary.uris_extracted,
            unique: summary.unique,
            duplicates: summary.duplicates,
            elapsed_secs: summary.elapsed.as_secs_f64(),
            source_secs: summary.source_elapsed.as_secs_f64(),
            workers_secs: summary.workers_elapsed.as_secs_f64(),
            sink_secs: summary.sink_elapsed.as_secs_f64(),
            records_per_sec: summary.records_per_sec(),
        }
    }
}

/// Holds the profile file open for the duration of the run.
///
/// The file is created up front so an unwritable path fails before any
/// record is read.
pub struct ProfileWriter {
    path: PathBuf,
    file: File,
}

impl ProfileWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create profile file: {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn finish(self, config: &PipelineConfig, summary: &RunSummary) -> Result<()> {
        let profile = RunProfile::new(config, summary);
        let mut writer = BufWriter::new(self.file);
        serde_json::to_writer_pretty(&mut writer, &profile)
            .map_err(io::Error::from)
            .and_then(|()| writer.write_all(b"\n"))
            .with_context(|| format!("Failed to write profile: {}", self.path.display()))?;
        writer
            .flush()
            .with_context(|| format!("Failed to flush profile: {}", self.path.display()))?;
        info!(path = %self.path.display(), "Profile written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn summary() -> RunSummary {
        RunSummary {
            records: 10,
            malformed: 1,
            parse_errors: 2,
            empty_targets: 3,
            uris_extracted: 5,
            unique: 4,
            duplicates: 1,
            elapsed: Duration::from_secs(2),
            source_elapsed: Duration::from_millis(1500),
            workers_elapsed: Duration::from_millis(1800),
            sink_elapsed: Duration::from_millis(1900),
        }
    }

    #[test]
    fn writes_json_report() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.json");
        let mut config = PipelineConfig::new("crawl.warc.gz");
        config.dedup = DedupMode::Hashed;

        let writer = ProfileWriter::create(&path).unwrap();
        writer.finish(&config, &summary()).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["input"], "crawl.warc.gz");
        assert_eq!(json["records"], 10);
        assert_eq!(json["unique"], 4);
        assert_eq!(json["dedup"], "hashed");
        assert_eq!(json["records_per_sec"], 5.0);
    }

    #[test]
    fn create_fails_for_unwritable_path() {
        let err = ProfileWriter::create(Path::new("/nonexistent/dir/profile.json"))
            .err()
            .unwrap();
        assert!(err.to_string().contains("Failed to create profile file"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn finish_reports_write_failure_with_path() {
        let writer = ProfileWriter::create(Path::new("/dev/full")).unwrap();
        let err = writer
            .finish(&PipelineConfig::new("crawl.warc"), &summary())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("profile"));
        assert!(message.contains("/dev/full"));
    }
}
