//! Core configuration transfer: reset handshake, block streaming, readiness.
//!
//! A transfer is split into bounded `step()` calls so the control thread can
//! render progress and react to input between blocks:
//!
//! ```text
//! Idle ─► Resetting ─► Streaming ─► AwaitingReady ─► Done
//!   │         │            │              │
//!   └─────────┴────────────┴──────────────┴─► Failed(reason)
//! ```

#![allow(missing_docs)]

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;

use crate::core::config::{BrowserConfig, LoaderConfig};
use crate::core::errors::{FosdError, Result};
use crate::loader::channel::{ConfigChannel, EndianMode, ReadyPoll, encode_block};
use crate::loader::registry::{CoreInfo, CoreRegistry};
use crate::logger::activity::{ActivityEvent, ActivityLog};

// ──────────────────── phases ────────────────────

/// Why a transfer ended without reaching `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailure {
    /// Reset handshake not acknowledged within the cycle budget.
    Timeout,
    /// The reset line could not be driven.
    ResetFailure,
    /// A block write failed mid-stream.
    StreamError,
    /// Configuration-done never asserted within the poll budget.
    NotReady,
    /// Aborted by the caller.
    Cancelled,
}

impl LoadFailure {
    /// Short code shown on the failure notice.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Timeout => "L1",
            Self::ResetFailure => "L2",
            Self::StreamError => "L3",
            Self::NotReady => "L4",
            Self::Cancelled => "L5",
        }
    }
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Timeout => "reset timeout",
            Self::ResetFailure => "reset line failure",
            Self::StreamError => "stream error",
            Self::NotReady => "core not ready",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{text} ({})", self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "reason")]
pub enum Phase {
    Idle,
    Resetting,
    Streaming,
    AwaitingReady,
    Done,
    Failed(LoadFailure),
}

impl Phase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

// ──────────────────── session ────────────────────

/// State of one load. Owned by the caller, advanced only by the loader
/// that created it.
#[derive(Debug)]
pub struct TransferSession {
    id: u64,
    image: PathBuf,
    data: Vec<u8>,
    mode: EndianMode,
    bytes_sent: usize,
    reset_polls: u64,
    ready_polls: u32,
    phase: Phase,
    started: Instant,
}

impl TransferSession {
    #[must_use]
    pub fn image(&self) -> &Path {
        &self.image
    }

    #[must_use]
    pub const fn mode(&self) -> EndianMode {
        self.mode
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.data.len()
    }

    /// `(sent, total)` for the progress bar.
    #[must_use]
    pub fn progress(&self) -> (u64, u64) {
        (self.bytes_sent as u64, self.data.len() as u64)
    }

    #[must_use]
    pub const fn reset_polls(&self) -> u64 {
        self.reset_polls
    }

    #[must_use]
    pub const fn ready_polls(&self) -> u32 {
        self.ready_polls
    }
}

// ──────────────────── loader ────────────────────

/// Drives a `ConfigChannel` through the load protocol.
///
/// At most one session is active per loader; the channel is owned for the
/// loader's lifetime so no other code can touch it mid-transfer.
pub struct ConfigLoader<C: ConfigChannel> {
    channel: C,
    config: LoaderConfig,
    browser: BrowserConfig,
    registry: CoreRegistry,
    activity: ActivityLog,
    active: Option<u64>,
    next_id: u64,
}

impl<C: ConfigChannel> ConfigLoader<C> {
    pub fn new(
        channel: C,
        config: LoaderConfig,
        browser: BrowserConfig,
        registry: CoreRegistry,
        activity: ActivityLog,
    ) -> Self {
        Self {
            channel,
            config,
            browser,
            registry,
            activity,
            active: None,
            next_id: 1,
        }
    }

    /// Read `image` and open a session in `Idle`.
    pub fn begin_load(&mut self, image: &Path, mode: EndianMode) -> Result<TransferSession> {
        if self.active.is_some() {
            return Err(FosdError::TransferActive);
        }
        let data = fs::read(image).map_err(|e| FosdError::io(image, e))?;
        if data.is_empty() {
            return Err(FosdError::Runtime {
                details: format!("empty core image: {}", image.display()),
            });
        }

        let id = self.next_id;
        self.next_id += 1;
        self.active = Some(id);
        self.activity.record(ActivityEvent::CoreLoadStarted {
            path: image.to_path_buf(),
            mode: mode.to_string(),
            bytes: data.len() as u64,
        });

        Ok(TransferSession {
            id,
            image: image.to_path_buf(),
            data,
            mode,
            bytes_sent: 0,
            reset_polls: 0,
            ready_polls: 0,
            phase: Phase::Idle,
            started: Instant::now(),
        })
    }

    /// Advance `session` by one bounded unit of work.
    ///
    /// Terminal sessions and sessions from another loader are returned
    /// unchanged.
    pub fn step(&mut self, session: &mut TransferSession) -> Phase {
        if session.phase.is_terminal() || self.active != Some(session.id) {
            return session.phase;
        }

        match session.phase {
            Phase::Idle => {
                if self.channel.set_reset(true).is_err() {
                    self.fail(session, LoadFailure::ResetFailure);
                } else {
                    session.phase = Phase::Resetting;
                }
            }
            Phase::Resetting => self.poll_reset(session),
            Phase::Streaming => self.stream_block(session),
            Phase::AwaitingReady => self.poll_ready(session),
            Phase::Done | Phase::Failed(_) => {}
        }
        session.phase
    }

    /// Abort `session`, always releasing the reset line.
    pub fn cancel(&mut self, session: &mut TransferSession) {
        if session.phase.is_terminal() || self.active != Some(session.id) {
            return;
        }
        self.fail(session, LoadFailure::Cancelled);
    }

    /// Single non-blocking configuration-done check for periodic health checks.
    pub fn is_ready_quick(&mut self) -> bool {
        self.channel.is_ready(ReadyPoll::Quick)
    }

    /// True while a session is between `begin_load` and a terminal phase.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    /// Step `session` until it is terminal; returns the loaded core's name.
    pub fn run_to_completion(&mut self, session: &mut TransferSession) -> Result<String> {
        loop {
            match self.step(session) {
                Phase::Done => return Ok(self.registry.core_name()),
                Phase::Failed(reason) => return Err(reason.into()),
                _ if self.active != Some(session.id) => {
                    return Err(FosdError::Runtime {
                        details: "session is not owned by this loader".to_string(),
                    });
                }
                _ => {}
            }
        }
    }

    #[must_use]
    pub const fn channel(&self) -> &C {
        &self.channel
    }

    #[must_use]
    pub const fn registry(&self) -> &CoreRegistry {
        &self.registry
    }

    fn poll_reset(&mut self, session: &mut TransferSession) {
        for _ in 0..self.config.reset_polls_per_step {
            if session.reset_polls >= self.config.reset_timeout_cycles {
                self.fail(session, LoadFailure::Timeout);
                return;
            }
            session.reset_polls += 1;
            if self.channel.reset_done() {
                if self.channel.set_reset(false).is_err() {
                    self.fail(session, LoadFailure::ResetFailure);
                } else {
                    session.phase = Phase::Streaming;
                }
                return;
            }
        }
        if session.reset_polls >= self.config.reset_timeout_cycles {
            self.fail(session, LoadFailure::Timeout);
        }
    }

    fn stream_block(&mut self, session: &mut TransferSession) {
        let end = (session.bytes_sent + self.config.block_bytes).min(session.data.len());
        let words = encode_block(session.mode, &session.data[session.bytes_sent..end]);
        if let Err(e) = self.channel.write_words(session.mode.width(), &words) {
            eprintln!(
                "[FOSD-LOAD] block write failed at byte {}: {e}",
                session.bytes_sent
            );
            self.fail(session, LoadFailure::StreamError);
            return;
        }
        session.bytes_sent = end;
        if session.bytes_sent == session.data.len() {
            session.phase = Phase::AwaitingReady;
        }
    }

    fn poll_ready(&mut self, session: &mut TransferSession) {
        for _ in 0..self.config.ready_polls_per_step {
            if session.ready_polls >= self.config.ready_poll_attempts {
                break;
            }
            session.ready_polls += 1;
            if self.channel.is_ready(ReadyPoll::Blocking) {
                self.finish(session);
                return;
            }
        }
        if session.ready_polls >= self.config.ready_poll_attempts {
            self.fail(session, LoadFailure::NotReady);
        }
    }

    fn finish(&mut self, session: &mut TransferSession) {
        let info = CoreInfo::for_image(&session.image, &self.browser);
        let core = info.name.clone();
        self.registry.publish(info);
        session.phase = Phase::Done;
        self.active = None;
        self.activity.record(ActivityEvent::CoreLoaded {
            path: session.image.clone(),
            core,
            bytes: session.data.len() as u64,
            duration_ms: elapsed_ms(session.started),
        });
    }

    fn fail(&mut self, session: &mut TransferSession, reason: LoadFailure) {
        // Never leave the target held in reset.
        if let Err(e) = self.channel.set_reset(false) {
            eprintln!("[FOSD-LOAD] could not release reset line: {e}");
        }
        session.phase = Phase::Failed(reason);
        self.active = None;
        self.activity.record(ActivityEvent::CoreLoadFailed {
            path: session.image.clone(),
            code: reason.code().to_string(),
            reason: reason.to_string(),
        });
    }
}

impl<C: ConfigChannel> fmt::Debug for ConfigLoader<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigLoader")
            .field("config", &self.config)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::channel::WordWidth;
    use crate::loader::registry::MENU_CORE_NAME;
    use crate::loader::sim::SimulatedChannel;

    fn small_budget() -> LoaderConfig {
        LoaderConfig {
            block_bytes: 4,
            reset_timeout_cycles: 64,
            reset_polls_per_step: 16,
            ready_poll_attempts: 20,
            ready_polls_per_step: 4,
            endian: EndianMode::Native8,
        }
    }

    fn loader(channel: SimulatedChannel) -> ConfigLoader<SimulatedChannel> {
        let browser = BrowserConfig {
            cores_dir: PathBuf::from("/cores"),
            games_dir: PathBuf::from("/games"),
            ..BrowserConfig::default()
        };
        ConfigLoader::new(
            channel,
            small_budget(),
            browser,
            CoreRegistry::new(),
            ActivityLog::disabled(),
        )
    }

    fn image(bytes: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NES_20240131.rbf");
        fs::write(&path, bytes).unwrap();
        (dir, path)
    }

    fn run(loader: &mut ConfigLoader<SimulatedChannel>, session: &mut TransferSession) -> Vec<Phase> {
        let mut seen = vec![session.phase()];
        for _ in 0..1000 {
            let phase = loader.step(session);
            if seen.last() != Some(&phase) {
                seen.push(phase);
            }
            if phase.is_terminal() {
                break;
            }
        }
        seen
    }

    #[test]
    fn happy_path_walks_every_phase_and_publishes_core() {
        let (_dir, path) = image(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let mut l = loader(SimulatedChannel::new().with_reset_after(3).with_ready_after(5));
        let mut s = l.begin_load(&path, EndianMode::LittleEndian16).unwrap();
        let phases = run(&mut l, &mut s);
        assert_eq!(
            phases,
            vec![
                Phase::Idle,
                Phase::Resetting,
                Phase::Streaming,
                Phase::AwaitingReady,
                Phase::Done
            ]
        );
        assert_eq!(l.registry().core_name(), "NES");
        assert_eq!(s.bytes_sent(), 9);
        assert!(!l.is_busy());

        let ch = l.channel();
        assert_eq!(ch.blocks_written(), 3);
        assert_eq!(ch.words().last(), Some(&0x0009));
        assert!(ch.widths().iter().all(|w| *w == WordWidth::Sixteen));
        assert_eq!(ch.reset_history(), &[true, false]);
    }

    #[test]
    fn reset_stall_times_out_and_leaves_core_unchanged() {
        let (_dir, path) = image(&[0xAA; 16]);
        let mut l = loader(SimulatedChannel::new().never_resets());
        let mut s = l.begin_load(&path, EndianMode::BigEndian16).unwrap();
        run(&mut l, &mut s);
        assert_eq!(s.phase(), Phase::Failed(LoadFailure::Timeout));
        assert_eq!(s.reset_polls(), 64);
        assert_eq!(l.registry().core_name(), MENU_CORE_NAME);
        assert!(!l.channel().reset_asserted());
    }

    #[test]
    fn stream_fault_never_reaches_done() {
        let (_dir, path) = image(&[0x55; 32]);
        let mut l = loader(SimulatedChannel::new().failing_at_block(2));
        let mut s = l.begin_load(&path, EndianMode::Native8).unwrap();
        let phases = run(&mut l, &mut s);
        assert!(!phases.contains(&Phase::Done));
        assert_eq!(s.phase(), Phase::Failed(LoadFailure::StreamError));
        assert_eq!(s.bytes_sent(), 8);
    }

    #[test]
    fn ready_budget_exhaustion_is_not_ready() {
        let (_dir, path) = image(&[1, 2]);
        let mut l = loader(SimulatedChannel::new().never_ready());
        let mut s = l.begin_load(&path, EndianMode::Native8).unwrap();
        run(&mut l, &mut s);
        assert_eq!(s.phase(), Phase::Failed(LoadFailure::NotReady));
        assert_eq!(s.ready_polls(), 20);
    }

    #[test]
    fn reset_line_failure() {
        let (_dir, path) = image(&[1]);
        let mut l = loader(SimulatedChannel::new().failing_reset());
        let mut s = l.begin_load(&path, EndianMode::Native8).unwrap();
        assert_eq!(l.step(&mut s), Phase::Failed(LoadFailure::ResetFailure));
    }

    #[test]
    fn cancel_during_resetting_releases_reset() {
        let (_dir, path) = image(&[1, 2, 3]);
        let mut l = loader(SimulatedChannel::new().never_resets());
        let mut s = l.begin_load(&path, EndianMode::Native8).unwrap();
        l.step(&mut s);
        assert_eq!(s.phase(), Phase::Resetting);
        assert!(l.channel().reset_asserted());
        l.cancel(&mut s);
        assert_eq!(s.phase(), Phase::Failed(LoadFailure::Cancelled));
        assert!(!l.channel().reset_asserted());
        assert!(!l.is_busy());
    }

    #[test]
    fn only_one_session_at_a_time() {
        let (_dir, path) = image(&[1, 2, 3]);
        let mut l = loader(SimulatedChannel::new());
        let mut s = l.begin_load(&path, EndianMode::Native8).unwrap();
        assert!(matches!(
            l.begin_load(&path, EndianMode::Native8),
            Err(FosdError::TransferActive)
        ));
        l.cancel(&mut s);
        assert!(l.begin_load(&path, EndianMode::Native8).is_ok());
    }

    #[test]
    fn empty_image_rejected() {
        let (_dir, path) = image(&[]);
        let mut l = loader(SimulatedChannel::new());
        let err = l.begin_load(&path, EndianMode::Native8).unwrap_err();
        assert_eq!(err.code(), "FOSD-3900");
        assert!(!l.is_busy());
    }

    #[test]
    fn missing_image_is_io_error() {
        let mut l = loader(SimulatedChannel::new());
        let err = l
            .begin_load(Path::new("/nonexistent/core.rbf"), EndianMode::Native8)
            .unwrap_err();
        assert_eq!(err.code(), "FOSD-3101");
    }

    #[test]
    fn run_to_completion_reports_reason() {
        let (_dir, path) = image(&[1, 2, 3]);
        let mut l = loader(SimulatedChannel::new().never_ready());
        let mut s = l.begin_load(&path, EndianMode::Native8).unwrap();
        match l.run_to_completion(&mut s) {
            Err(FosdError::Load { reason }) => assert_eq!(reason, LoadFailure::NotReady),
            other => panic!("unexpected: {other:?}"),
        }

        let mut ok = loader(SimulatedChannel::new());
        let mut s = ok.begin_load(&path, EndianMode::Swapped8).unwrap();
        assert_eq!(ok.run_to_completion(&mut s).unwrap(), "NES");
    }

    #[test]
    fn quick_ready_is_single_check() {
        let mut l = loader(SimulatedChannel::new().with_ready_after(2));
        assert!(!l.is_ready_quick());
        assert!(l.is_ready_quick());
        assert_eq!(l.channel().ready_checks(), 2);
    }

    #[test]
    fn failure_codes_are_short_and_distinct() {
        let all = [
            LoadFailure::Timeout,
            LoadFailure::ResetFailure,
            LoadFailure::StreamError,
            LoadFailure::NotReady,
            LoadFailure::Cancelled,
        ];
        let codes: std::collections::HashSet<_> = all.iter().map(|f| f.code()).collect();
        assert_eq!(codes.len(), all.len());
        assert!(LoadFailure::NotReady.to_string().contains("L4"));
    }
}
