use anyhow::Result;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const HEADER: &str = "timestamp,level,track,artist,remote_addr,duration_seconds,cache_used";

/// How the translation cache participated in a lyrics request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CacheUsed {
    Yes,
    No,
    Force,
}

impl CacheUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheUsed::Yes => "Yes",
            CacheUsed::No => "No",
            CacheUsed::Force => "Force",
        }
    }
}

/// One row of the access log, recorded per lyrics request.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub track: String,
    pub artist: String,
    pub remote_addr: String,
    pub duration_seconds: f64,
    pub cache_used: CacheUsed,
}

/// Append-only structured access log with a CSV header row.
///
/// Deliberately not wired into the tracing machinery: this is a data file
/// with a fixed schema, one row per `/lyrics` or `/force_lyrics` call,
/// never mutated or rotated by the app.
#[derive(Clone)]
pub struct AccessLog {
    path: PathBuf,
}

impl AccessLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Append one entry, creating the file (and header) on first use.
    pub fn record(&self, entry: &LogEntry) -> Result<()> {
        let write_header = !self.path.exists();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if write_header {
            writeln!(file, "{HEADER}")?;
        }

        writeln!(
            file,
            "{},INFO,{},{},{},{:.3},{}",
            chrono::Utc::now().to_rfc3339(),
            csv_field(&entry.track),
            csv_field(&entry.artist),
            csv_field(&entry.remote_addr),
            entry.duration_seconds,
            entry.cache_used.as_str()
        )?;

        Ok(())
    }
}

/// Quote a CSV field when it contains a comma, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
