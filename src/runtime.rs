//! Cooperative tick driver joining the input engine, the menu and the OSD.
//!
//! Raw samples arrive from the hardware poll thread over a bounded crossbeam
//! channel, each stamped with the input tick it was taken on. The control
//! thread runs on a slower UI tick: it replays every queued sample through the
//! debounce engine at its own timestamp, buffers the resulting commands, and
//! hands at most one of them to the menu per tick.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};

use crate::browser::scan::DirectoryScan;
use crate::core::config::Config;
use crate::input::debounce::{DebounceEngine, PollContext, RawSample};
use crate::input::keys::Command;
use crate::loader::channel::ConfigChannel;
use crate::menu::machine::{MenuEffect, MenuMachine};
use crate::osd::OsdSurface;

/// Samples buffered between the poll thread and the control thread.
pub const INPUT_FEED_CAPACITY: usize = 64;

// ──────────────────── input feed ────────────────────

#[derive(Debug, Clone, Copy)]
struct Stamped {
    sample: RawSample,
    /// Input tick the sample was taken on; `None` means "as of the next UI tick".
    at: Option<u64>,
}

/// Producer half, owned by the hardware poll thread.
#[derive(Clone)]
pub struct InputSender {
    tx: Sender<Stamped>,
    dropped: Arc<AtomicU64>,
}

impl InputSender {
    /// Queue a level change that takes effect on the next UI tick.
    /// Returns false when it was dropped.
    pub fn push(&self, sample: RawSample) -> bool {
        self.send(Stamped { sample, at: None })
    }

    /// Queue a sample taken on input tick `at_ms`. Returns false when it was
    /// dropped because the control thread is behind or gone.
    pub fn push_at(&self, sample: RawSample, at_ms: u64) -> bool {
        self.send(Stamped {
            sample,
            at: Some(at_ms),
        })
    }

    fn send(&self, stamped: Stamped) -> bool {
        match self.tx.try_send(stamped) {
            Ok(()) => true,
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Consumer half, drained by the control thread.
pub struct InputFeed {
    rx: Receiver<Stamped>,
    latest: RawSample,
}

impl InputFeed {
    #[must_use]
    pub fn new(capacity: usize) -> (InputSender, Self) {
        let (tx, rx) = bounded(capacity.max(1));
        (
            InputSender {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            Self {
                rx,
                latest: RawSample::default(),
            },
        )
    }

    /// Every sample queued since the last call, oldest first, with the tick
    /// it was taken on. Unstamped samples are dated `now`.
    pub fn drain(&mut self, now: u64) -> Vec<(RawSample, u64)> {
        let mut out = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(Stamped { sample, at }) => {
                    self.latest = sample;
                    out.push((sample, at.unwrap_or(now)));
                }
                Err(TryRecvError::Empty) => return out,
                Err(TryRecvError::Disconnected) => {
                    self.latest = RawSample::default();
                    return out;
                }
            }
        }
    }

    /// Level as of the last drained sample. Levels persist between pushes; a
    /// disconnected producer reads as everything released.
    #[must_use]
    pub const fn level(&self) -> RawSample {
        self.latest
    }
}

// ──────────────────── orchestrator ────────────────────

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub command: Option<Command>,
    pub effects: Vec<MenuEffect>,
}

/// Owns everything the control thread touches.
pub struct Orchestrator<S: DirectoryScan, C: ConfigChannel, O: OsdSurface> {
    feed: InputFeed,
    input: DebounceEngine,
    /// Last input tick fed to the debounce engine; keeps its clock monotonic.
    polled_at: u64,
    /// Debounced commands not yet handed to the menu.
    commands: VecDeque<Command>,
    menu: MenuMachine<S, C>,
    osd: O,
}

impl<S: DirectoryScan, C: ConfigChannel, O: OsdSurface> Orchestrator<S, C, O> {
    pub fn new(config: &Config, feed: InputFeed, menu: MenuMachine<S, C>, osd: O) -> Self {
        Self {
            feed,
            input: DebounceEngine::new(&config.input),
            polled_at: 0,
            commands: VecDeque::new(),
            menu,
            osd,
        }
    }

    /// One cooperative cycle: replay queued input, handle at most one
    /// command, advance the menu, redraw.
    pub fn tick(&mut self, now: u64) -> TickReport {
        let ctx = self.menu.poll_context();
        for (sample, at) in self.feed.drain(now) {
            self.poll_input(sample, at, now, &ctx);
        }
        // The held level still ages while the producer is quiet.
        self.poll_input(self.feed.level(), now, now, &ctx);

        let command = self.commands.pop_front();
        if let Some(command) = command {
            self.menu.handle(command);
        }
        self.menu.step(now);
        self.menu.render(&mut self.osd);
        TickReport {
            command,
            effects: self.menu.take_effects(),
        }
    }

    fn poll_input(&mut self, sample: RawSample, at: u64, now: u64, ctx: &PollContext) {
        let at = at.clamp(self.polled_at, now.max(self.polled_at));
        self.polled_at = at;
        if let Some(command) = self.input.poll(sample, at, ctx) {
            self.commands.push_back(command);
        }
    }

    /// Commands debounced but not yet handled.
    #[must_use]
    pub fn queued_commands(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub const fn menu(&self) -> &MenuMachine<S, C> {
        &self.menu
    }

    pub const fn menu_mut(&mut self) -> &mut MenuMachine<S, C> {
        &mut self.menu
    }

    #[must_use]
    pub const fn osd(&self) -> &O {
        &self.osd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::scan::FsDirectoryScanner;
    use crate::input::keys::code;
    use crate::loader::registry::CoreRegistry;
    use crate::loader::sim::SimulatedChannel;
    use crate::logger::activity::ActivityLog;
    use crate::menu::state::{BrowserPurpose, MenuState};
    use crate::osd::TextOsd;

    fn orchestrator(
        config: &Config,
    ) -> (
        InputSender,
        Orchestrator<FsDirectoryScanner, SimulatedChannel, TextOsd>,
    ) {
        orchestrator_with_feed(config, INPUT_FEED_CAPACITY)
    }

    fn orchestrator_with_feed(
        config: &Config,
        capacity: usize,
    ) -> (
        InputSender,
        Orchestrator<FsDirectoryScanner, SimulatedChannel, TextOsd>,
    ) {
        let (tx, feed) = InputFeed::new(capacity);
        let menu = MenuMachine::new(
            config,
            FsDirectoryScanner::new(100).unwrap(),
            SimulatedChannel::new(),
            CoreRegistry::new(),
            ActivityLog::disabled(),
        );
        (tx, Orchestrator::new(config, feed, menu, TextOsd::new(8)))
    }

    #[test]
    fn feed_keeps_latest_level_and_releases_on_disconnect() {
        let (tx, mut feed) = InputFeed::new(4);
        assert!(feed.drain(0).is_empty());
        assert_eq!(feed.level(), RawSample::default());
        tx.push_at(RawSample::key(code::UP), 3);
        tx.push(RawSample::key(code::DOWN));
        assert_eq!(
            feed.drain(9),
            vec![
                (RawSample::key(code::UP), 3),
                (RawSample::key(code::DOWN), 9)
            ]
        );
        assert!(feed.drain(10).is_empty());
        assert_eq!(feed.level(), RawSample::key(code::DOWN));
        drop(tx);
        assert!(feed.drain(11).is_empty());
        assert_eq!(feed.level(), RawSample::default());
    }

    #[test]
    fn presses_between_slow_ticks_are_buffered_in_order() {
        let config = Config::default();
        // Both taps land inside one 100 ms UI tick.
        let (tx, mut orch) = orchestrator_with_feed(&config, 128);
        for at in 0..100 {
            let key = match at {
                0..30 => code::DOWN,
                60..90 => code::UP,
                _ => 0,
            };
            assert!(tx.push_at(RawSample::key(key), at));
        }
        let first = orch.tick(100).command;
        assert_eq!(orch.queued_commands(), 1);
        let second = orch.tick(200).command;
        assert_eq!((first, second), (Some(Command::Down), Some(Command::Up)));
        assert_eq!(orch.tick(300).command, None);
    }

    #[test]
    fn full_feed_counts_drops() {
        let (tx, _feed) = InputFeed::new(1);
        assert!(tx.push(RawSample::key(code::UP)));
        assert!(!tx.push(RawSample::key(code::DOWN)));
        assert_eq!(tx.dropped_samples(), 1);
    }

    #[test]
    fn held_menu_key_opens_overlay_once() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.browser.cores_dir = tmp.path().to_path_buf();
        config.browser.visible_rows = 8;
        let (tx, mut orch) = orchestrator(&config);

        tx.push(RawSample::key(code::F12));
        let mut commands = Vec::new();
        for now in 0..200 {
            if let Some(cmd) = orch.tick(now).command {
                commands.push((now, cmd));
            }
        }
        assert_eq!(commands, vec![(20, Command::Menu)]);
        assert_eq!(
            orch.menu().current(),
            &MenuState::FileSelect {
                purpose: BrowserPurpose::CoreLoad
            }
        );
        assert!(orch.osd().is_enabled());
        assert_eq!(orch.osd().title(), "Cores");
    }

    #[test]
    fn long_menu_button_press_reports_pairing_effect() {
        let mut config = Config::default();
        config.input.menu_long_press_ms = 100;
        let (tx, mut orch) = orchestrator(&config);
        tx.push(RawSample {
            key: 0,
            menu_button: true,
            user_button: false,
        });
        let mut effects = Vec::new();
        for now in 0..300 {
            effects.extend(orch.tick(now).effects);
        }
        assert_eq!(effects, vec![MenuEffect::PairBluetooth]);
        assert_eq!(orch.menu().current().kind(), crate::menu::StateKind::BtPair);
    }
}
