//! Activity log handle: the control thread never blocks on logging.
//!
//! A dedicated logger thread owns the `JsonlWriter`. Producers send
//! `ActivityEvent`s through a bounded crossbeam channel with `try_send()`;
//! events that do not fit are counted and reported as a warning line.

#![allow(missing_docs)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{FosdError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Default bounded channel capacity for log events.
const CHANNEL_CAPACITY: usize = 256;

// ──────────────────── public event type ────────────────────

/// Events recorded by the menu machine, loader and CLI.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    CoreLoadStarted {
        path: PathBuf,
        mode: String,
        bytes: u64,
    },
    CoreLoaded {
        path: PathBuf,
        core: String,
        bytes: u64,
        duration_ms: u64,
    },
    CoreLoadFailed {
        path: PathBuf,
        code: String,
        reason: String,
    },
    ScanCompleted {
        path: PathBuf,
        entries: usize,
    },
    ScanFailed {
        path: PathBuf,
        code: String,
        message: String,
    },
    ConfigLoaded {
        path: PathBuf,
        config_hash: String,
    },
    MenuEffect {
        state: String,
        details: String,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel asking the logger thread to flush and exit.
    Shutdown,
}

// ──────────────────── public handle ────────────────────

/// Cheaply-cloneable handle; a disabled handle drops every event.
#[derive(Clone)]
pub struct ActivityLog {
    tx: Option<Sender<ActivityEvent>>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLog {
    /// Handle that records nothing.
    pub fn disabled() -> Self {
        Self {
            tx: None,
            dropped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn the logger thread writing to `config.path`.
    pub fn spawn(config: JsonlConfig) -> Result<(Self, thread::JoinHandle<()>)> {
        let (tx, rx) = bounded::<ActivityEvent>(CHANNEL_CAPACITY);
        let dropped = Arc::new(AtomicU64::new(0));
        let dropped_clone = Arc::clone(&dropped);

        let join = thread::Builder::new()
            .name("fosd-logger".to_string())
            .spawn(move || logger_thread_main(&rx, config, &dropped_clone))
            .map_err(|e| FosdError::Runtime {
                details: format!("failed to spawn logger thread: {e}"),
            })?;

        Ok((
            Self {
                tx: Some(tx),
                dropped_events: dropped,
            },
            join,
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Record an event. Non-blocking.
    pub fn record(&self, event: ActivityEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(TrySendError::Full(_)) = tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of events dropped due to channel back-pressure.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and exit.
    pub fn shutdown(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ActivityEvent::Shutdown);
        }
    }
}

impl std::fmt::Debug for ActivityLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityLog")
            .field("enabled", &self.is_enabled())
            .field("dropped_events", &self.dropped_events())
            .finish()
    }
}

// ──────────────────── logger thread ────────────────────

fn logger_thread_main(rx: &Receiver<ActivityEvent>, config: JsonlConfig, dropped: &AtomicU64) {
    let mut jsonl = JsonlWriter::open(config);

    while let Ok(event) = rx.recv() {
        let d = dropped.swap(0, Ordering::Relaxed);
        if d > 0 {
            let warn = LogEntry::new(EventType::Error, Severity::Warning)
                .with_details(format!("{d} log events dropped due to back-pressure"));
            jsonl.write_entry(&warn);
        }

        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }
        jsonl.write_entry(&event_to_log_entry(&event));
    }

    jsonl.flush();
}

// ──────────────────── event conversion ────────────────────

fn event_to_log_entry(event: &ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::CoreLoadStarted { path, mode, bytes } => {
            let mut e = LogEntry::new(EventType::CoreLoadStart, Severity::Info).with_path(path);
            e.bytes = Some(*bytes);
            e.details = Some(format!("mode={mode}"));
            e
        }
        ActivityEvent::CoreLoaded {
            path,
            core,
            bytes,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::CoreLoaded, Severity::Info).with_path(path);
            e.core = Some(core.clone());
            e.bytes = Some(*bytes);
            e.duration_ms = Some(*duration_ms);
            e.ok = Some(true);
            e
        }
        ActivityEvent::CoreLoadFailed { path, code, reason } => {
            LogEntry::new(EventType::CoreLoadFailed, Severity::Warning)
                .with_path(path)
                .with_error(code.clone(), reason.clone())
        }
        ActivityEvent::ScanCompleted { path, entries } => {
            let mut e = LogEntry::new(EventType::ScanComplete, Severity::Info).with_path(path);
            e.entries = Some(*entries);
            e.ok = Some(true);
            e
        }
        ActivityEvent::ScanFailed {
            path,
            code,
            message,
        } => LogEntry::new(EventType::ScanError, Severity::Warning)
            .with_path(path)
            .with_error(code.clone(), message.clone()),
        ActivityEvent::ConfigLoaded { path, config_hash } => {
            let mut e = LogEntry::new(EventType::ConfigLoaded, Severity::Info)
                .with_path(path)
                .with_details(format!("config_hash={config_hash}"));
            e.ok = Some(true);
            e
        }
        ActivityEvent::MenuEffect { state, details } => {
            let mut e = LogEntry::new(EventType::MenuEffect, Severity::Info)
                .with_details(details.clone());
            e.state = Some(state.clone());
            e
        }
        ActivityEvent::Error { code, message } => {
            LogEntry::new(EventType::Error, Severity::Critical).with_error(code.clone(), message.clone())
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::Error, Severity::Info),
    }
}
