//! Debounce, auto-repeat and long-press classification.
//!
//! All timing lives in plain `Copy` state structs advanced by pure functions
//! of `(state, sample, now)`, so tests drive them with synthetic clocks.

#![allow(missing_docs)]

use std::collections::VecDeque;

use crate::core::config::InputConfig;
use crate::input::keys::{self, Command, UPSTROKE};

/// One raw input sample taken on the input tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    /// Current keyboard key value (`UPSTROKE` flag on release, 0 when idle).
    pub key: u32,
    /// OSD menu button level.
    pub menu_button: bool,
    /// User button level.
    pub user_button: bool,
}

impl RawSample {
    #[must_use]
    pub const fn key(key: u32) -> Self {
        Self {
            key,
            menu_button: false,
            user_button: false,
        }
    }
}

/// Context the menu supplies on every poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollContext {
    /// Non-printable keys may auto-repeat on the current row.
    pub repeat_allowed: bool,
    pub osd_visible: bool,
}

/// Timing windows in 1 ms ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTiming {
    pub debounce_ms: u64,
    pub repeat_delay_ms: u64,
    pub repeat_rate_ms: u64,
}

impl From<&InputConfig> for KeyTiming {
    fn from(cfg: &InputConfig) -> Self {
        Self {
            debounce_ms: cfg.debounce_ms,
            repeat_delay_ms: cfg.repeat_delay_ms,
            repeat_rate_ms: cfg.repeat_rate_ms,
        }
    }
}

// ──────────────────── key timing ────────────────────

/// Debounce and repeat state for the keyboard channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyTimingState {
    /// Last raw value observed, stable or not.
    last_raw: u32,
    /// Tick at which `last_raw` counts as stable; `None` before the first sample.
    debounce_deadline: Option<u64>,
    /// Last value accepted after debouncing.
    accepted: u32,
    repeat_deadline: Option<u64>,
    hold_count: u32,
}

impl KeyTimingState {
    #[must_use]
    pub const fn hold_count(&self) -> u32 {
        self.hold_count
    }

    /// Feed one raw sample.
    ///
    /// Returns the raw value to emit this tick: once on the first stable
    /// occurrence of a new value, then on every repeat tick while held. A
    /// repeat is emitted only when `repeat_allowed` is true, but the repeat
    /// clock keeps running either way.
    #[must_use]
    pub fn advance(
        self,
        raw: u32,
        now: u64,
        timing: &KeyTiming,
        repeat_allowed: bool,
    ) -> (Self, Option<u32>) {
        let mut next = self;
        if raw != self.last_raw || self.debounce_deadline.is_none() {
            next.last_raw = raw;
            next.debounce_deadline = Some(now.saturating_add(timing.debounce_ms));
        }
        match next.debounce_deadline {
            Some(deadline) if now >= deadline => {}
            _ => return (next, None),
        }

        let released = raw == 0 || raw & UPSTROKE != 0;
        if raw != next.accepted {
            next.accepted = raw;
            if released {
                next.hold_count = 0;
                next.repeat_deadline = None;
                return (next, (raw != 0).then_some(raw));
            }
            next.hold_count = 1;
            next.repeat_deadline = Some(now.saturating_add(timing.repeat_delay_ms));
            return (next, Some(raw));
        }

        if released {
            return (next, None);
        }
        if let Some(deadline) = next.repeat_deadline
            && now >= deadline
        {
            next.repeat_deadline = Some(now.saturating_add(timing.repeat_rate_ms));
            if repeat_allowed {
                next.hold_count = next.hold_count.saturating_add(1);
                return (next, Some(raw));
            }
        }
        (next, None)
    }
}

// ──────────────────── long press ────────────────────

/// Edge reported by a long-press detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongPressEdge {
    /// Held past the threshold; fires once per press.
    LongPress,
    /// Released before the long press fired.
    ShortRelease,
}

/// One physical button's long-press detector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LongPressState {
    pressed: bool,
    deadline: Option<u64>,
    consumed: bool,
}

impl LongPressState {
    #[must_use]
    pub fn advance(self, pressed: bool, now: u64, threshold_ms: u64) -> (Self, Option<LongPressEdge>) {
        let mut next = self;
        let mut edge = None;

        if pressed && !self.pressed {
            next.deadline = Some(now.saturating_add(threshold_ms));
        }
        if pressed
            && !next.consumed
            && let Some(deadline) = next.deadline
            && now >= deadline
        {
            next.consumed = true;
            edge = Some(LongPressEdge::LongPress);
        }
        if !pressed && self.pressed && !self.consumed {
            edge = Some(LongPressEdge::ShortRelease);
        }
        if !pressed {
            next.consumed = false;
            next.deadline = None;
        }
        next.pressed = pressed;
        (next, edge)
    }

    /// Track the level without arming: a press seen here never fires.
    #[must_use]
    pub fn track_only(self, pressed: bool) -> Self {
        Self {
            pressed,
            deadline: if pressed { self.deadline } else { None },
            consumed: pressed && self.consumed,
        }
    }

    #[must_use]
    pub const fn is_consumed(&self) -> bool {
        self.consumed
    }
}

// ──────────────────── engine ────────────────────

/// Input engine: one keyboard channel plus two long-press buttons.
#[derive(Debug, Clone)]
pub struct DebounceEngine {
    timing: KeyTiming,
    menu_long_press_ms: u64,
    user_long_press_ms: u64,
    key: KeyTimingState,
    menu_button: LongPressState,
    user_button: LongPressState,
    /// Commands produced in a tick that already emitted one.
    pending: VecDeque<Command>,
}

impl DebounceEngine {
    #[must_use]
    pub fn new(cfg: &InputConfig) -> Self {
        Self {
            timing: KeyTiming::from(cfg),
            menu_long_press_ms: cfg.menu_long_press_ms,
            user_long_press_ms: cfg.user_long_press_ms,
            key: KeyTimingState::default(),
            menu_button: LongPressState::default(),
            user_button: LongPressState::default(),
            pending: VecDeque::new(),
        }
    }

    /// Poll once per input tick. Emits at most one command.
    pub fn poll(&mut self, sample: RawSample, now: u64, ctx: &PollContext) -> Option<Command> {
        let repeat_allowed = ctx.repeat_allowed || keys::ascii_of(sample.key).is_some();
        let (key, emitted) = self.key.advance(sample.key, now, &self.timing, repeat_allowed);
        self.key = key;
        if let Some(command) = emitted.and_then(keys::decode) {
            self.pending.push_back(command);
        }

        let (menu, edge) = self
            .menu_button
            .advance(sample.menu_button, now, self.menu_long_press_ms);
        self.menu_button = menu;
        match edge {
            Some(LongPressEdge::LongPress) => self.pending.push_back(Command::LongPressMenu),
            Some(LongPressEdge::ShortRelease) => self.pending.push_back(Command::Menu),
            None => {}
        }

        if ctx.osd_visible {
            let (user, edge) = self
                .user_button
                .advance(sample.user_button, now, self.user_long_press_ms);
            self.user_button = user;
            if edge == Some(LongPressEdge::LongPress) {
                self.pending.push_back(Command::LongPressUser);
            }
        } else {
            self.user_button = self.user_button.track_only(sample.user_button);
        }

        self.pending.pop_front()
    }

    /// Hold counter of the current keyboard press (0 when released).
    #[must_use]
    pub const fn hold_count(&self) -> u32 {
        self.key.hold_count()
    }

    #[must_use]
    pub const fn key_state(&self) -> &KeyTimingState {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keys::code;

    fn engine() -> DebounceEngine {
        DebounceEngine::new(&InputConfig::default())
    }

    fn visible() -> PollContext {
        PollContext {
            repeat_allowed: false,
            osd_visible: true,
        }
    }

    /// Drive `sample` for ticks `from..to` and collect `(tick, command)`.
    fn drive(
        eng: &mut DebounceEngine,
        sample: RawSample,
        from: u64,
        to: u64,
        ctx: &PollContext,
    ) -> Vec<(u64, Command)> {
        (from..to)
            .filter_map(|t| eng.poll(sample, t, ctx).map(|c| (t, c)))
            .collect()
    }

    #[test]
    fn key_accepted_after_debounce_window() {
        let mut eng = engine();
        let out = drive(&mut eng, RawSample::key(code::DOWN), 0, 21, &visible());
        assert_eq!(out, vec![(20, Command::Down)]);
        assert_eq!(eng.hold_count(), 1);
    }

    #[test]
    fn bounce_shorter_than_window_is_ignored() {
        let mut eng = engine();
        let mut out = drive(&mut eng, RawSample::key(code::UP), 0, 15, &visible());
        out.extend(drive(&mut eng, RawSample::key(0), 15, 60, &visible()));
        assert!(out.is_empty());
    }

    #[test]
    fn arrows_do_not_repeat_outside_exception_rows() {
        let mut eng = engine();
        let out = drive(&mut eng, RawSample::key(code::DOWN), 0, 1_000, &visible());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn arrows_repeat_on_exception_rows() {
        let mut eng = engine();
        let ctx = PollContext {
            repeat_allowed: true,
            osd_visible: true,
        };
        let out = drive(&mut eng, RawSample::key(code::RIGHT), 0, 621, &ctx);
        let ticks: Vec<u64> = out.iter().map(|(t, _)| *t).collect();
        assert_eq!(ticks, vec![20, 520, 570, 620]);
        assert_eq!(eng.hold_count(), 4);
    }

    #[test]
    fn printable_keys_repeat_without_context() {
        let mut eng = engine();
        let out = drive(&mut eng, RawSample::key(30), 0, 571, &visible());
        assert_eq!(
            out,
            vec![
                (20, Command::TypedChar('a')),
                (520, Command::TypedChar('a')),
                (570, Command::TypedChar('a')),
            ]
        );
    }

    #[test]
    fn release_resets_hold_count() {
        let mut eng = engine();
        drive(&mut eng, RawSample::key(code::UP), 0, 100, &visible());
        assert_eq!(eng.hold_count(), 1);
        drive(&mut eng, RawSample::key(code::UP | UPSTROKE), 100, 200, &visible());
        assert_eq!(eng.hold_count(), 0);
    }

    #[test]
    fn menu_button_short_release_emits_menu() {
        let mut eng = engine();
        let pressed = RawSample {
            menu_button: true,
            ..RawSample::default()
        };
        assert!(drive(&mut eng, pressed, 0, 500, &visible()).is_empty());
        let out = drive(&mut eng, RawSample::default(), 500, 501, &visible());
        assert_eq!(out, vec![(500, Command::Menu)]);
    }

    #[test]
    fn menu_long_press_fires_once_and_suppresses_release() {
        let mut eng = engine();
        let pressed = RawSample {
            menu_button: true,
            ..RawSample::default()
        };
        let held = drive(&mut eng, pressed, 0, 9_000, &visible());
        assert_eq!(held, vec![(3_000, Command::LongPressMenu)]);
        let released = drive(&mut eng, RawSample::default(), 9_000, 9_100, &visible());
        assert!(released.is_empty());
    }

    #[test]
    fn user_long_press_needs_visible_osd() {
        let mut eng = engine();
        let pressed = RawSample {
            user_button: true,
            ..RawSample::default()
        };
        let hidden = PollContext::default();
        assert!(drive(&mut eng, pressed, 0, 3_000, &hidden).is_empty());
        drive(&mut eng, RawSample::default(), 3_000, 3_010, &hidden);

        let out = drive(&mut eng, pressed, 3_010, 6_000, &visible());
        assert_eq!(out, vec![(4_510, Command::LongPressUser)]);
    }

    #[test]
    fn coincident_edge_is_queued_not_dropped() {
        let mut eng = engine();
        let both = RawSample {
            key: code::DOWN,
            menu_button: true,
            user_button: false,
        };
        // Key accepted at 20; menu button released at 20 too.
        drive(&mut eng, both, 0, 20, &visible());
        let release = RawSample::key(code::DOWN);
        assert_eq!(eng.poll(release, 20, &visible()), Some(Command::Down));
        assert_eq!(eng.poll(release, 21, &visible()), Some(Command::Menu));
        assert_eq!(eng.poll(release, 22, &visible()), None);
    }

    #[test]
    fn long_press_state_is_pure() {
        let start = LongPressState::default();
        let (armed, edge) = start.advance(true, 100, 1_500);
        assert_eq!(edge, None);
        let (fired, edge) = armed.advance(true, 1_600, 1_500);
        assert_eq!(edge, Some(LongPressEdge::LongPress));
        assert!(fired.is_consumed());
        let (_, edge) = fired.advance(true, 5_000, 1_500);
        assert_eq!(edge, None);
        let (released, edge) = fired.advance(false, 5_001, 1_500);
        assert_eq!(edge, None);
        assert!(!released.is_consumed());
    }
}
