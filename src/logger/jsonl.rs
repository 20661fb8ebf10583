//! JSONL activity log: append-only line-delimited JSON.
//!
//! Each line is a self-contained JSON object assembled in memory and written
//! with a single `write_all`, so a tailing reader never sees a partial line.
//!
//! Fallback chain:
//! 1. Primary file path
//! 2. Fallback path (e.g. `/tmp/fosd.jsonl` when the SD card is read-only)
//! 3. stderr with `[FOSD-JSONL]` prefix
//! 4. Silent discard (the control loop never stops for logging failures)

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{FosdError, Result};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Activity event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    CoreLoadStart,
    CoreLoaded,
    CoreLoadFailed,
    ScanComplete,
    ScanError,
    ConfigLoaded,
    MenuEffect,
    Error,
}

/// A single JSONL log entry; only `ts`, `event` and `severity` are mandatory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Core image or directory involved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Core name after a successful load.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core: Option<String>,
    /// Menu state at the time of the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Bytes streamed to the FPGA.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    /// Entries in a scanned directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    /// FOSD error code or loader failure code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Freeform details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            path: None,
            core: None,
            state: None,
            bytes: None,
            entries: None,
            duration_ms: None,
            ok: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: &Path) -> Self {
        self.path = Some(path.display().to_string());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.ok = Some(false);
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self
    }
}

/// Configuration for the JSONL writer.
#[derive(Debug, Clone)]
pub struct JsonlConfig {
    pub path: PathBuf,
    /// Tried when `path` cannot be opened, e.g. a read-only SD card.
    pub fallback_path: Option<PathBuf>,
    /// Size at which the file is moved to `<path>.1`. Default: 1 MiB.
    pub max_size_bytes: u64,
}

impl Default for JsonlConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/media/fat/logs/fosd.jsonl"),
            fallback_path: Some(PathBuf::from("/tmp/fosd.jsonl")),
            max_size_bytes: 1024 * 1024,
        }
    }
}

impl JsonlConfig {
    /// Config for `path` with the default fallback and size limit.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    fn candidates(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.path.as_path()).chain(self.fallback_path.as_deref())
    }
}

/// Where log lines currently go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Primary,
    Fallback,
    Stderr,
    Discard,
}

enum Sink {
    File {
        kind: SinkKind,
        path: PathBuf,
        out: BufWriter<File>,
        size: u64,
    },
    Stderr,
    Discard,
}

/// Append-only JSONL writer. Never fails: each IO error moves it one step
/// down primary → fallback → stderr → discard.
pub struct JsonlWriter {
    config: JsonlConfig,
    sink: Sink,
}

impl JsonlWriter {
    pub fn open(config: JsonlConfig) -> Self {
        let sink = open_first_file(&config, 0);
        Self { config, sink }
    }

    /// Write a single log entry as one JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        match serde_json::to_string(entry) {
            Ok(json) => self.write_line(&format!("{json}\n")),
            Err(e) => eprintln!("[FOSD-JSONL] serialize error: {e}"),
        }
    }

    pub fn flush(&mut self) {
        if let Sink::File { out, .. } = &mut self.sink {
            let _ = out.flush();
        }
    }

    #[must_use]
    pub fn sink(&self) -> SinkKind {
        match &self.sink {
            Sink::File { kind, .. } => *kind,
            Sink::Stderr => SinkKind::Stderr,
            Sink::Discard => SinkKind::Discard,
        }
    }

    // ──────────────────────── internals ────────────────────────

    fn write_line(&mut self, line: &str) {
        let len = line.len() as u64;
        if let Sink::File { size, .. } = &self.sink
            && *size > 0
            && size + len > self.config.max_size_bytes
        {
            self.roll_over();
        }

        let failed = match &mut self.sink {
            Sink::File { out, size, .. } => {
                let ok = out.write_all(line.as_bytes()).is_ok();
                if ok {
                    *size += len;
                }
                !ok
            }
            Sink::Stderr => {
                eprint!("[FOSD-JSONL] {line}");
                false
            }
            Sink::Discard => false,
        };
        if failed {
            self.demote();
            self.write_line(line);
        }
    }

    /// Keep one previous generation: `<path>` becomes `<path>.1`.
    fn roll_over(&mut self) {
        let Sink::File { kind, path, out, .. } = &mut self.sink else {
            return;
        };
        let _ = out.flush();
        let (kind, path) = (*kind, path.clone());
        let _ = fs::rename(&path, previous_generation(&path));
        self.sink = match open_append(&path) {
            Ok((file, size)) => Sink::File {
                kind,
                path,
                out: BufWriter::new(file),
                size,
            },
            Err(_) => Sink::Stderr,
        };
    }

    fn demote(&mut self) {
        self.sink = match self.sink() {
            SinkKind::Primary => open_first_file(&self.config, 1),
            SinkKind::Fallback => {
                eprintln!("[FOSD-JSONL] fallback write failed, logging to stderr");
                Sink::Stderr
            }
            SinkKind::Stderr | SinkKind::Discard => Sink::Discard,
        };
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

// ──────────────────────── helpers ────────────────────────

/// First openable candidate path, skipping `skip` of them.
fn open_first_file(config: &JsonlConfig, skip: usize) -> Sink {
    for (index, path) in config.candidates().enumerate().skip(skip) {
        if let Ok((file, size)) = open_append(path) {
            let kind = if index == 0 {
                SinkKind::Primary
            } else {
                eprintln!("[FOSD-JSONL] using fallback log {}", path.display());
                SinkKind::Fallback
            };
            return Sink::File {
                kind,
                path: path.to_path_buf(),
                out: BufWriter::new(file),
                size,
            };
        }
    }
    eprintln!("[FOSD-JSONL] no writable log path, logging to stderr");
    Sink::Stderr
}

/// Open or create a file for appending. Returns `(File, current_size)`.
fn open_append(path: &Path) -> Result<(File, u64)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| FosdError::io(parent, source))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| FosdError::io(path, source))?;
    let size = file.metadata().map_or(0, |m| m.len());
    Ok((file, size))
}

fn previous_generation(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".1");
    PathBuf::from(name)
}

fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ──────────────────────── tests ────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn config_at(path: PathBuf, max_size_bytes: u64) -> JsonlConfig {
        JsonlConfig {
            path,
            fallback_path: None,
            max_size_bytes,
        }
    }

    #[test]
    fn write_entry_produces_valid_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.jsonl");
        let mut writer = JsonlWriter::open(config_at(path.clone(), 1024 * 1024));

        let entry = LogEntry::new(EventType::CoreLoaded, Severity::Info);
        writer.write_entry(&entry);
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["event"], "core_loaded");
        assert_eq!(parsed["severity"], "info");
    }

    #[test]
    fn multiple_entries_are_separate_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.jsonl");
        let mut writer = JsonlWriter::open(config_at(path.clone(), 1024 * 1024));

        for _ in 0..5 {
            writer.write_entry(&LogEntry::new(EventType::ScanComplete, Severity::Info));
        }
        writer.flush();

        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 5);
        for line in lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }
    }

    #[test]
    fn full_log_rolls_to_one_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rot.jsonl");
        let mut writer = JsonlWriter::open(config_at(path.clone(), 100));

        for _ in 0..10 {
            writer.write_entry(&LogEntry::new(EventType::ScanComplete, Severity::Info));
        }
        writer.flush();

        assert_eq!(writer.sink(), SinkKind::Primary);
        assert!(path.exists());
        assert!(previous_generation(&path).exists());
        assert!(fs::metadata(&path).unwrap().len() <= 100);
    }

    #[test]
    fn fallback_when_primary_dir_unwritable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file, not a dir").unwrap();
        let fallback = dir.path().join("fallback.jsonl");
        let config = JsonlConfig {
            path: blocker.join("primary.jsonl"),
            fallback_path: Some(fallback.clone()),
            max_size_bytes: 1024 * 1024,
        };
        let mut writer = JsonlWriter::open(config);

        assert_eq!(writer.sink(), SinkKind::Fallback);
        writer.write_entry(&LogEntry::new(EventType::Error, Severity::Warning));
        writer.flush();

        let contents = fs::read_to_string(&fallback).unwrap();
        assert!(!contents.is_empty());
    }

    #[test]
    fn no_writable_path_degrades_to_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();
        let writer = JsonlWriter::open(config_at(blocker.join("x.jsonl"), 1024));
        assert_eq!(writer.sink(), SinkKind::Stderr);
    }

    #[test]
    fn entry_optional_fields_omitted_when_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.jsonl");
        let mut writer = JsonlWriter::open(config_at(path.clone(), 1024 * 1024));

        writer.write_entry(&LogEntry::new(EventType::ConfigLoaded, Severity::Info));
        writer.flush();

        let line = fs::read_to_string(&path).unwrap();
        assert!(!line.contains("\"path\""));
        assert!(!line.contains("\"core\""));
        assert!(!line.contains("\"error_code\""));
    }

    #[test]
    fn builder_helpers_fill_fields() {
        let entry = LogEntry::new(EventType::CoreLoadFailed, Severity::Warning)
            .with_path(Path::new("/media/fat/_Console/NES.rbf"))
            .with_error("L2", "reset failure");
        assert_eq!(entry.ok, Some(false));
        assert_eq!(entry.error_code.as_deref(), Some("L2"));
        assert_eq!(entry.path.as_deref(), Some("/media/fat/_Console/NES.rbf"));
    }
}
