//! Transition table keyed by `(screen, trigger, guard)`.
//!
//! Rows are matched top to bottom; the first row whose screen set contains
//! the current screen, whose trigger matches and whose guard holds wins.
//! A command with no matching row leaves the state unchanged.

#![allow(missing_docs)]

use crate::input::keys::Command;
use crate::menu::state::StateKind;

/// Command shape the table matches on; typed characters collapse into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Up,
    Down,
    Left,
    Right,
    Select,
    Cancel,
    Menu,
    Backspace,
    Typed,
}

impl Trigger {
    /// Long presses are intercepted before the table and map to `None`.
    #[must_use]
    pub const fn of(command: Command) -> Option<Self> {
        Some(match command {
            Command::Up => Self::Up,
            Command::Down => Self::Down,
            Command::Left => Self::Left,
            Command::Right => Self::Right,
            Command::Select => Self::Select,
            Command::Cancel => Self::Cancel,
            Command::Menu => Self::Menu,
            Command::Backspace => Self::Backspace,
            Command::TypedChar(_) => Self::Typed,
            Command::LongPressMenu | Command::LongPressUser => return None,
        })
    }
}

/// Context predicates refining a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Always,
    /// The browser was opened to pick a core image.
    CorePicker,
    /// The browser was opened for anything other than a core image.
    ContentPicker,
    /// The highlighted browser entry is a directory (or `..`).
    EntryIsDir,
    /// At least one custom aspect ratio is configured.
    CustomAspect,
    /// The current page has more items than fit on screen.
    PageOverflow,
    /// No core is loaded.
    MenuCore,
    /// A joystick mapping is bound for the active controller.
    JoystickBound,
    HasCheats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open the core browser (menu core only).
    OpenCorePicker,
    /// Open the running core's top-level menu.
    OpenRoot,
    /// Close the overlay.
    Hide,
    /// Return to the recorded parent.
    Back,
    /// Replace the current screen without recording it as parent.
    Switch(StateKind),
    CancelLoad,
    BrowseMove(isize),
    BrowsePage(isize),
    BrowseEnter,
    BrowseBackspace,
    BrowseType,
    StartLoad,
    PickFile,
    Row(isize),
    PageJump(isize),
    Adjust(i8),
    Activate,
    ListPick,
    CaptureStep,
    AbortScript,
}

#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: &'static [StateKind],
    pub trigger: Trigger,
    pub guard: Guard,
    pub action: Action,
}

const fn row(
    from: &'static [StateKind],
    trigger: Trigger,
    guard: Guard,
    action: Action,
) -> Transition {
    Transition {
        from,
        trigger,
        guard,
        action,
    }
}

// ──────────────────── screen groups ────────────────────

/// Screens drawn from a static `MenuPage`.
pub const PAGE_SCREENS: &[StateKind] = &[
    StateKind::System,
    StateKind::Common,
    StateKind::Misc,
    StateKind::VideoProc,
    StateKind::About,
    StateKind::ResetConfirm,
    StateKind::JoyReset,
    StateKind::Uart,
    StateKind::Baud,
    StateKind::GenericMain,
    StateKind::MinimigMain,
    StateKind::MinimigVideo,
    StateKind::MinimigChipset,
    StateKind::MinimigDisk,
    StateKind::MinimigLoadConfig,
    StateKind::MinimigSaveConfig,
    StateKind::StMain,
    StateKind::StSystem,
    StateKind::StLoadConfig,
    StateKind::StSaveConfig,
    StateKind::ArchieMain,
    StateKind::Mt32Pi,
];

/// Screens listing runtime-supplied entries.
pub const LIST_SCREENS: &[StateKind] = &[StateKind::Recent, StateKind::Cheats, StateKind::ArcadeDip];

/// Screens whose rows may be split across pages.
const PAGED_SCREENS: &[StateKind] = &[
    StateKind::GenericMain,
    StateKind::MinimigMain,
    StateKind::StMain,
    StateKind::ArchieMain,
];

const CAPTURE_SCREENS: &[StateKind] = &[
    StateKind::JoySysMap,
    StateKind::JoyDigMap,
    StateKind::JoyKbdMap,
    StateKind::KbdMap,
    StateKind::LightGunCal,
];

const IDLE: &[StateKind] = &[StateKind::Idle];
const INFO: &[StateKind] = &[StateKind::Info, StateKind::BtPair];
const FILE_SELECT: &[StateKind] = &[StateKind::FileSelect];
const LOADING: &[StateKind] = &[StateKind::Loading];
const LOAD_FAILED: &[StateKind] = &[StateKind::LoadFailed];
const SCRIPT_OUTPUT: &[StateKind] = &[StateKind::ScriptOutput];

// ──────────────────── the table ────────────────────

pub const TRANSITIONS: &[Transition] = &[
    // overlay hidden
    row(IDLE, Trigger::Menu, Guard::MenuCore, Action::OpenCorePicker),
    row(IDLE, Trigger::Menu, Guard::Always, Action::OpenRoot),
    // informational overlays
    row(INFO, Trigger::Menu, Guard::Always, Action::Hide),
    row(INFO, Trigger::Cancel, Guard::Always, Action::Hide),
    row(INFO, Trigger::Select, Guard::Always, Action::Hide),
    // core transfer
    row(LOADING, Trigger::Cancel, Guard::Always, Action::CancelLoad),
    row(LOAD_FAILED, Trigger::Select, Guard::Always, Action::Back),
    row(LOAD_FAILED, Trigger::Cancel, Guard::Always, Action::Back),
    row(LOAD_FAILED, Trigger::Menu, Guard::Always, Action::Back),
    // file browser
    row(FILE_SELECT, Trigger::Up, Guard::Always, Action::BrowseMove(-1)),
    row(FILE_SELECT, Trigger::Down, Guard::Always, Action::BrowseMove(1)),
    row(FILE_SELECT, Trigger::Left, Guard::Always, Action::BrowsePage(-1)),
    row(FILE_SELECT, Trigger::Right, Guard::Always, Action::BrowsePage(1)),
    row(FILE_SELECT, Trigger::Select, Guard::EntryIsDir, Action::BrowseEnter),
    row(FILE_SELECT, Trigger::Select, Guard::CorePicker, Action::StartLoad),
    row(FILE_SELECT, Trigger::Select, Guard::ContentPicker, Action::PickFile),
    row(FILE_SELECT, Trigger::Backspace, Guard::Always, Action::BrowseBackspace),
    row(FILE_SELECT, Trigger::Typed, Guard::Always, Action::BrowseType),
    row(
        FILE_SELECT,
        Trigger::Menu,
        Guard::CorePicker,
        Action::Switch(StateKind::System),
    ),
    row(FILE_SELECT, Trigger::Menu, Guard::Always, Action::Hide),
    row(FILE_SELECT, Trigger::Cancel, Guard::Always, Action::Back),
    // paged root screens
    row(PAGED_SCREENS, Trigger::Left, Guard::PageOverflow, Action::PageJump(-1)),
    row(PAGED_SCREENS, Trigger::Right, Guard::PageOverflow, Action::PageJump(1)),
    // static pages
    row(PAGE_SCREENS, Trigger::Up, Guard::Always, Action::Row(-1)),
    row(PAGE_SCREENS, Trigger::Down, Guard::Always, Action::Row(1)),
    row(PAGE_SCREENS, Trigger::Left, Guard::Always, Action::Adjust(-1)),
    row(PAGE_SCREENS, Trigger::Right, Guard::Always, Action::Adjust(1)),
    row(PAGE_SCREENS, Trigger::Select, Guard::Always, Action::Activate),
    row(PAGE_SCREENS, Trigger::Cancel, Guard::Always, Action::Back),
    row(PAGE_SCREENS, Trigger::Menu, Guard::Always, Action::Hide),
    // runtime lists
    row(LIST_SCREENS, Trigger::Up, Guard::Always, Action::Row(-1)),
    row(LIST_SCREENS, Trigger::Down, Guard::Always, Action::Row(1)),
    row(LIST_SCREENS, Trigger::Select, Guard::Always, Action::ListPick),
    row(LIST_SCREENS, Trigger::Cancel, Guard::Always, Action::Back),
    row(LIST_SCREENS, Trigger::Menu, Guard::Always, Action::Hide),
    // capture flows
    row(CAPTURE_SCREENS, Trigger::Select, Guard::Always, Action::CaptureStep),
    row(CAPTURE_SCREENS, Trigger::Cancel, Guard::Always, Action::Back),
    row(CAPTURE_SCREENS, Trigger::Menu, Guard::Always, Action::Back),
    // script output
    row(SCRIPT_OUTPUT, Trigger::Backspace, Guard::Always, Action::AbortScript),
    row(SCRIPT_OUTPUT, Trigger::Cancel, Guard::Always, Action::Back),
    row(SCRIPT_OUTPUT, Trigger::Menu, Guard::Always, Action::Hide),
];

/// First action matching `(screen, trigger)` whose guard holds.
pub fn lookup<F>(screen: StateKind, trigger: Trigger, mut holds: F) -> Option<Action>
where
    F: FnMut(Guard) -> bool,
{
    TRANSITIONS
        .iter()
        .filter(|t| t.trigger == trigger && t.from.contains(&screen))
        .find(|t| holds(t.guard))
        .map(|t| t.action)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn always(guard: Guard) -> bool {
        guard == Guard::Always
    }

    #[test]
    fn long_presses_never_reach_the_table() {
        assert_eq!(Trigger::of(Command::LongPressMenu), None);
        assert_eq!(Trigger::of(Command::LongPressUser), None);
        assert_eq!(Trigger::of(Command::TypedChar('q')), Some(Trigger::Typed));
    }

    #[test]
    fn guard_order_decides_file_select() {
        let pick = |guard| guard == Guard::CorePicker;
        assert_eq!(
            lookup(StateKind::FileSelect, Trigger::Select, pick),
            Some(Action::StartLoad)
        );
        let dir = |guard| matches!(guard, Guard::EntryIsDir | Guard::CorePicker);
        assert_eq!(
            lookup(StateKind::FileSelect, Trigger::Select, dir),
            Some(Action::BrowseEnter)
        );
        let content = |guard| guard == Guard::ContentPicker;
        assert_eq!(
            lookup(StateKind::FileSelect, Trigger::Select, content),
            Some(Action::PickFile)
        );
    }

    #[test]
    fn menu_key_opens_core_picker_only_on_menu_core() {
        let menu_core = |guard| matches!(guard, Guard::Always | Guard::MenuCore);
        assert_eq!(
            lookup(StateKind::Idle, Trigger::Menu, menu_core),
            Some(Action::OpenCorePicker)
        );
        assert_eq!(
            lookup(StateKind::Idle, Trigger::Menu, always),
            Some(Action::OpenRoot)
        );
    }

    #[test]
    fn unmatched_commands_are_ignored() {
        assert_eq!(lookup(StateKind::Idle, Trigger::Up, always), None);
        assert_eq!(lookup(StateKind::Loading, Trigger::Select, always), None);
    }

    #[test]
    fn page_overflow_turns_left_right_into_paging() {
        let overflow = |guard| matches!(guard, Guard::Always | Guard::PageOverflow);
        assert_eq!(
            lookup(StateKind::GenericMain, Trigger::Right, overflow),
            Some(Action::PageJump(1))
        );
        assert_eq!(
            lookup(StateKind::GenericMain, Trigger::Right, always),
            Some(Action::Adjust(1))
        );
        assert_eq!(
            lookup(StateKind::Common, Trigger::Right, overflow),
            Some(Action::Adjust(1))
        );
    }

    #[test]
    fn every_page_screen_can_be_left() {
        for screen in PAGE_SCREENS.iter().chain(LIST_SCREENS).chain(CAPTURE_SCREENS) {
            assert!(
                lookup(*screen, Trigger::Cancel, always).is_some(),
                "{screen:?} has no cancel row"
            );
        }
    }
}
