#![warn(missing_docs)]
//! Test tooling for worldtests: metrics reports and JSONL event logs.

mod metrics;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

pub use metrics::*;

/// One event captured by a worldtest, written as a JSON line.
#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    /// Monotonic sequence number within the log.
    pub sequence: u64,
    /// Human-readable kind label.
    pub kind: &'a str,
    /// Chunk coordinate [x, z] the event concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<[i32; 2]>,
    /// Free-form payload.
    pub payload: &'a str,
}

/// A sink that writes newline-delimited JSON to disk.
pub struct JsonlSink {
    file: File,
    next_sequence: u64,
}

impl JsonlSink {
    /// Create a new sink at `path`, creating parent dirs if needed.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file =
            File::create(path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self {
            file,
            next_sequence: 0,
        })
    }

    /// Append an event to the log.
    pub fn write(&mut self, event: &EventRecord<'_>) -> Result<()> {
        let line = serde_json::to_string(event)?;
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.next_sequence = self.next_sequence.max(event.sequence + 1);
        Ok(())
    }

    /// Append an event numbered after the last one written.
    pub fn record(&mut self, kind: &str, chunk: Option<[i32; 2]>, payload: &str) -> Result<()> {
        let event = EventRecord {
            sequence: self.next_sequence,
            kind,
            chunk,
            payload,
        };
        self.write(&event)
    }
}
