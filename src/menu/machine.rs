//! The menu state machine.
//!
//! `MenuMachine` owns every piece of UI state: the active screen and its
//! parent, the file browser, the in-flight transfer, and the overlay timers.
//! Requests for collaborators it does not own (media mounting, script
//! execution, persisted settings) leave through the `MenuEffect` outbox.

#![allow(missing_docs)]

use std::path::PathBuf;

use serde::Serialize;

use crate::browser::listing::DirEntry;
use crate::browser::scan::DirectoryScan;
use crate::browser::session::{FileBrowser, Target};
use crate::core::config::{BrowserConfig, Config, MenuConfig, RepeatException, VideoConfig};
use crate::input::debounce::PollContext;
use crate::input::keys::Command;
use crate::loader::channel::{ConfigChannel, EndianMode};
use crate::loader::registry::{CoreRegistry, core_name_from_image};
use crate::loader::session::{ConfigLoader, LoadFailure, Phase, TransferSession};
use crate::logger::activity::{ActivityEvent, ActivityLog};
use crate::menu::pages::{self, ItemAction, MenuItem, MenuPage, Setting, Signal};
use crate::menu::render;
use crate::menu::state::{AssetKind, BrowserPurpose, MenuState, StateKind};
use crate::menu::table::{self, Action, Guard, Trigger};
use crate::osd::{OSD_COLUMNS, OsdRow, OsdSurface, ProgressState, write_lines};

// ──────────────────── context and effects ────────────────────

/// Runtime data supplied by collaborators outside the menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuContext {
    /// A joystick mapping is stored for the active controller.
    pub joystick_bound: bool,
    pub cheats: Vec<String>,
    pub dip_switches: Vec<String>,
    /// Recently loaded core images, newest first.
    pub recent: Vec<PathBuf>,
    /// Extension filter of the running core's content browser.
    pub content_extensions: String,
}

/// Request for a collaborator, drained with `take_effects`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum MenuEffect {
    MountImage { path: PathBuf },
    RunScript { path: PathBuf },
    AbortScript,
    ShowDocument { path: PathBuf },
    ApplyAsset { kind: AssetKind, path: PathBuf },
    ToggleCheat { index: usize },
    ToggleDip { index: usize },
    PairBluetooth,
    ResetSettings,
    ResetJoystickMap,
    /// `system` is true for the menu-wide map, false for the core's own.
    SaveJoystickMap { system: bool },
    SaveJoyKbdMap,
    SaveKeyboardMap,
    SaveGunCalibration,
    SetUartMode { mode: u8 },
    SetBaud { rate: u32 },
    SetAspect { index: u8 },
    SetVolume { level: u8 },
    LoadConfig { slot: u8 },
    SaveConfig { slot: u8 },
    SetCpu { cpu: u8 },
    SetVideoMode { mode: u8 },
    SetMt32Synth { synth: u8 },
    ResetCore,
    Reboot,
    CoreLoaded { name: String },
    LoadFailed { code: String },
}

impl From<Signal> for MenuEffect {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::Reboot => Self::Reboot,
            Signal::ResetCore => Self::ResetCore,
            Signal::ResetSettings => Self::ResetSettings,
            Signal::ResetJoystickMap => Self::ResetJoystickMap,
            Signal::UartMode(mode) => Self::SetUartMode { mode },
            Signal::Baud(rate) => Self::SetBaud { rate },
            Signal::LoadConfig(slot) => Self::LoadConfig { slot },
            Signal::SaveConfig(slot) => Self::SaveConfig { slot },
            Signal::CpuType(cpu) => Self::SetCpu { cpu },
            Signal::VideoMode(mode) => Self::SetVideoMode { mode },
            Signal::Mt32Synth(synth) => Self::SetMt32Synth { synth },
        }
    }
}

const fn capture_effect(kind: StateKind) -> Option<MenuEffect> {
    match kind {
        StateKind::JoySysMap => Some(MenuEffect::SaveJoystickMap { system: true }),
        StateKind::JoyDigMap => Some(MenuEffect::SaveJoystickMap { system: false }),
        StateKind::JoyKbdMap => Some(MenuEffect::SaveJoyKbdMap),
        StateKind::KbdMap => Some(MenuEffect::SaveKeyboardMap),
        StateKind::LightGunCal => Some(MenuEffect::SaveGunCalibration),
        _ => None,
    }
}

const fn capture_title(kind: StateKind) -> &'static str {
    match kind {
        StateKind::JoyKbdMap => "Joystick to keyboard",
        StateKind::KbdMap => "Keyboard remap",
        StateKind::LightGunCal => "Light gun",
        _ => "Joystick buttons",
    }
}

/// Parent a screen returns to when no explicit parent was recorded.
const fn parent_kind(kind: StateKind, home: StateKind) -> StateKind {
    match kind {
        StateKind::VideoProc => StateKind::Common,
        StateKind::Baud
        | StateKind::Mt32Pi
        | StateKind::LightGunCal
        | StateKind::JoyKbdMap
        | StateKind::JoyReset => StateKind::Misc,
        StateKind::MinimigVideo
        | StateKind::MinimigChipset
        | StateKind::MinimigDisk
        | StateKind::MinimigLoadConfig
        | StateKind::MinimigSaveConfig => StateKind::MinimigMain,
        StateKind::StSystem | StateKind::StLoadConfig | StateKind::StSaveConfig => {
            StateKind::StMain
        }
        StateKind::Idle
        | StateKind::Info
        | StateKind::BtPair
        | StateKind::GenericMain
        | StateKind::MinimigMain
        | StateKind::StMain
        | StateKind::ArchieMain => StateKind::Idle,
        _ => home,
    }
}

// ──────────────────── machine ────────────────────

/// Single owned orchestrator context for the overlay.
pub struct MenuMachine<S: DirectoryScan, C: ConfigChannel> {
    state: MenuState,
    /// Single-level return target for `Back`.
    parent: MenuState,
    browser: FileBrowser<S>,
    /// Purpose the browser session was last opened with.
    browser_purpose: Option<BrowserPurpose>,
    loader: ConfigLoader<C>,
    transfer: Option<TransferSession>,
    progress: ProgressState,
    registry: CoreRegistry,
    menu: MenuConfig,
    browser_cfg: BrowserConfig,
    video: VideoConfig,
    repeat_exceptions: Vec<RepeatException>,
    endian: EndianMode,
    context: MenuContext,
    aspect: u8,
    volume: u8,
    effects: Vec<MenuEffect>,
    activity: ActivityLog,
    now: u64,
    last_input: u64,
    /// Time the idle help marquee started, while it is showing.
    help_since: Option<u64>,
}

impl<S: DirectoryScan, C: ConfigChannel> MenuMachine<S, C> {
    pub fn new(
        config: &Config,
        scanner: S,
        channel: C,
        registry: CoreRegistry,
        activity: ActivityLog,
    ) -> Self {
        let browser = FileBrowser::new(
            scanner,
            config.browser.clone(),
            config.input.typing_reset_ms,
            registry.clone(),
            activity.clone(),
        );
        let loader = ConfigLoader::new(
            channel,
            config.loader.clone(),
            config.browser.clone(),
            registry.clone(),
            activity.clone(),
        );
        Self {
            state: MenuState::Idle,
            parent: MenuState::Idle,
            browser,
            browser_purpose: None,
            loader,
            transfer: None,
            progress: ProgressState::default(),
            registry,
            menu: config.menu.clone(),
            browser_cfg: config.browser.clone(),
            video: config.video.clone(),
            repeat_exceptions: config.input.repeat_exceptions.clone(),
            endian: config.loader.endian,
            context: MenuContext::default(),
            aspect: 0,
            volume: 0,
            effects: Vec::new(),
            activity,
            now: 0,
            last_input: 0,
            help_since: None,
        }
    }

    // ──────────────────── public surface ────────────────────

    /// Apply one decoded command.
    ///
    /// Long presses are resolved here; everything else goes through the
    /// transition table. Commands with no matching row are ignored.
    pub fn handle(&mut self, command: Command) {
        self.last_input = self.now;
        self.help_since = None;
        match command {
            Command::LongPressMenu => self.menu_long_press(),
            Command::LongPressUser => self.user_long_press(),
            other => {
                if let Some(trigger) = Trigger::of(other) {
                    self.dispatch(trigger, other);
                }
            }
        }
    }

    /// Advance timers and the in-flight transfer. Call once per UI tick.
    pub fn step(&mut self, now: u64) {
        self.now = now;
        let expired = match &self.state {
            MenuState::Info { until, .. }
            | MenuState::BtPair { until }
            | MenuState::LoadFailed { until, .. } => now >= *until,
            _ => false,
        };
        match self.state.kind() {
            StateKind::Info | StateKind::BtPair if expired => self.hide(),
            StateKind::LoadFailed if expired => self.go_back(),
            StateKind::Loading => self.advance_transfer(),
            kind if kind.is_root_page()
                && self.help_since.is_none()
                && now.saturating_sub(self.last_input) >= self.menu.help_timeout_ms =>
            {
                self.help_since = Some(now);
            }
            _ => {}
        }
    }

    #[must_use]
    pub const fn current(&self) -> &MenuState {
        &self.state
    }

    #[must_use]
    pub const fn parent(&self) -> &MenuState {
        &self.parent
    }

    /// What the input engine needs to know about the current screen.
    #[must_use]
    pub fn poll_context(&self) -> PollContext {
        let kind = self.state.kind();
        let repeat_allowed = self.state.row().is_some_and(|row| {
            self.repeat_exceptions
                .iter()
                .any(|e| e.screen == kind && e.row == row)
        });
        PollContext {
            repeat_allowed,
            osd_visible: self.state.is_visible(),
        }
    }

    pub fn take_effects(&mut self) -> Vec<MenuEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Post an informational notice. Only shown over a hidden overlay or
    /// another notice.
    pub fn show_info(&mut self, message: impl Into<String>) {
        if matches!(self.state, MenuState::Idle | MenuState::Info { .. }) {
            self.notice(message.into());
        }
    }

    #[must_use]
    pub const fn context(&self) -> &MenuContext {
        &self.context
    }

    pub const fn context_mut(&mut self) -> &mut MenuContext {
        &mut self.context
    }

    #[must_use]
    pub const fn browser(&self) -> &FileBrowser<S> {
        &self.browser
    }

    #[must_use]
    pub const fn loader(&self) -> &ConfigLoader<C> {
        &self.loader
    }

    #[must_use]
    pub const fn progress(&self) -> &ProgressState {
        &self.progress
    }

    #[must_use]
    pub const fn aspect(&self) -> u8 {
        self.aspect
    }

    #[must_use]
    pub const fn volume(&self) -> u8 {
        self.volume
    }

    #[must_use]
    pub const fn is_help_visible(&self) -> bool {
        self.help_since.is_some()
    }

    // ──────────────────── dispatch ────────────────────

    fn dispatch(&mut self, trigger: Trigger, command: Command) {
        let screen = self.state.kind();
        if let Some(action) = table::lookup(screen, trigger, |guard| self.guard_holds(guard)) {
            self.apply(action, command);
        }
    }

    fn menu_long_press(&mut self) {
        if self.state.is_file_selection_like() {
            self.dispatch(Trigger::Backspace, Command::Backspace);
        } else if !self.is_load_screen() {
            self.open_bt_pair();
        }
    }

    fn user_long_press(&mut self) {
        if !self.state.is_visible() || self.is_load_screen() {
            return;
        }
        let on_entry_screen = matches!(
            self.state.kind(),
            StateKind::System | StateKind::FileSelect
        );
        // On the menu core only the entry screens react; a running core
        // offers the map reset instead.
        let target = if self.registry.is_menu_core() {
            if !on_entry_screen {
                return;
            }
            StateKind::JoySysMap
        } else if self.context.joystick_bound {
            StateKind::JoyReset
        } else {
            return;
        };
        if let Some(next) = MenuState::enter(target) {
            self.enter_child(next);
        }
    }

    fn guard_holds(&self, guard: Guard) -> bool {
        match guard {
            Guard::Always => true,
            Guard::CorePicker => self.state.purpose() == Some(BrowserPurpose::CoreLoad),
            Guard::ContentPicker => self
                .state
                .purpose()
                .is_some_and(|p| p != BrowserPurpose::CoreLoad),
            Guard::EntryIsDir => self.browser.selected().is_some_and(DirEntry::is_dir),
            Guard::CustomAspect => {
                self.video.custom_aspect(0).is_some() || self.video.custom_aspect(1).is_some()
            }
            Guard::PageOverflow => pages::page_for(self.state.kind())
                .is_some_and(|page| page.items.len() > self.visible_rows()),
            Guard::MenuCore => self.registry.is_menu_core(),
            Guard::JoystickBound => self.context.joystick_bound,
            Guard::HasCheats => !self.context.cheats.is_empty(),
        }
    }

    fn apply(&mut self, action: Action, command: Command) {
        match action {
            Action::OpenCorePicker => self.open_browser(BrowserPurpose::CoreLoad),
            Action::OpenRoot => self.switch_to(self.root_kind()),
            Action::Hide => self.hide(),
            Action::Back => self.go_back(),
            Action::Switch(kind) => self.switch_to(kind),
            Action::CancelLoad => self.cancel_load(),
            Action::BrowseMove(delta) => self.browser.move_by(delta),
            Action::BrowsePage(delta) => {
                if delta < 0 {
                    self.browser.page_up();
                } else {
                    self.browser.page_down();
                }
            }
            Action::BrowseEnter => {
                let index = self.browser.listing().selected_index();
                self.browser.navigate(Target::Entry(index));
            }
            Action::BrowseBackspace => self.browser.backspace(self.now),
            Action::BrowseType => {
                if let Command::TypedChar(c) = command {
                    self.browser.type_char(c, self.now);
                }
            }
            Action::StartLoad => {
                if let Some(path) = self.browser.selected_path() {
                    self.start_load(path);
                }
            }
            Action::PickFile => self.pick_file(),
            Action::Row(delta) => self.move_row(delta),
            Action::PageJump(delta) => self.page_jump(delta),
            Action::Adjust(delta) => self.adjust(delta),
            Action::Activate => self.activate(),
            Action::ListPick => self.list_pick(),
            Action::CaptureStep => self.capture_step(),
            Action::AbortScript => self.emit(MenuEffect::AbortScript),
        }
    }

    // ──────────────────── screen changes ────────────────────

    fn enter_child(&mut self, next: MenuState) {
        self.parent = std::mem::replace(&mut self.state, next);
        self.settle_row();
    }

    /// Replace the screen; its parent becomes the screen's natural parent.
    fn switch_to(&mut self, kind: StateKind) {
        if let Some(next) = MenuState::enter(kind) {
            self.parent = self.natural_parent(&next);
            self.state = next;
            self.settle_row();
        }
    }

    fn hide(&mut self) {
        self.state = MenuState::Idle;
        self.parent = MenuState::Idle;
    }

    fn go_back(&mut self) {
        let target = std::mem::take(&mut self.parent);
        self.parent = self.natural_parent(&target);
        if let Some(purpose) = target.purpose()
            && self.browser_purpose != Some(purpose)
        {
            self.open_browser_session(purpose);
        }
        self.state = target;
    }

    fn notice(&mut self, message: String) {
        self.parent = MenuState::Idle;
        self.state = MenuState::Info {
            message,
            until: self.now.saturating_add(self.menu.info_timeout_ms),
        };
    }

    fn open_bt_pair(&mut self) {
        self.emit(MenuEffect::PairBluetooth);
        self.parent = MenuState::Idle;
        self.state = MenuState::BtPair {
            until: self.now.saturating_add(self.menu.bt_pair_timeout_ms),
        };
    }

    const fn is_load_screen(&self) -> bool {
        matches!(
            self.state,
            MenuState::Loading { .. } | MenuState::LoadFailed { .. }
        )
    }

    /// Top-level page of the running core.
    fn root_kind(&self) -> StateKind {
        match self.registry.core_name().to_ascii_lowercase().as_str() {
            "minimig" => StateKind::MinimigMain,
            "atarist" | "mist" => StateKind::StMain,
            "archie" => StateKind::ArchieMain,
            _ => StateKind::GenericMain,
        }
    }

    /// Page that shared sub-pages return to.
    fn home_root(&self) -> StateKind {
        if self.registry.is_menu_core() {
            StateKind::System
        } else {
            self.root_kind()
        }
    }

    fn natural_parent(&self, state: &MenuState) -> MenuState {
        let kind = match state {
            MenuState::FileSelect { purpose } => self.browser_parent(*purpose),
            MenuState::ScriptOutput { .. } => {
                return MenuState::FileSelect {
                    purpose: BrowserPurpose::Scripts,
                };
            }
            MenuState::Loading { .. } | MenuState::LoadFailed { .. } => {
                return MenuState::FileSelect {
                    purpose: BrowserPurpose::CoreLoad,
                };
            }
            MenuState::System { .. } if self.registry.is_menu_core() => {
                return MenuState::FileSelect {
                    purpose: BrowserPurpose::CoreLoad,
                };
            }
            other => parent_kind(other.kind(), self.home_root()),
        };
        MenuState::enter(kind).unwrap_or_default()
    }

    fn browser_parent(&self, purpose: BrowserPurpose) -> StateKind {
        match purpose {
            BrowserPurpose::CoreLoad => StateKind::Idle,
            BrowserPurpose::Asset(
                AssetKind::ScalerCoeff
                | AssetKind::Gamma
                | AssetKind::ShadowMask
                | AssetKind::VideoPreset,
            ) => StateKind::VideoProc,
            BrowserPurpose::Asset(AssetKind::AudioFilter) => StateKind::Common,
            BrowserPurpose::Asset(
                AssetKind::MinimigFloppy | AssetKind::MinimigHardfile | AssetKind::MinimigKickstart,
            ) => StateKind::MinimigDisk,
            BrowserPurpose::Asset(AssetKind::StFloppy | AssetKind::StHardDisk) => StateKind::StMain,
            BrowserPurpose::Asset(AssetKind::StTos) => StateKind::StSystem,
            BrowserPurpose::Asset(AssetKind::ArchieImage) => StateKind::ArchieMain,
            BrowserPurpose::Content
            | BrowserPurpose::Saves
            | BrowserPurpose::Scripts
            | BrowserPurpose::Docs => self.home_root(),
        }
    }

    // ──────────────────── rows ────────────────────

    fn visible_rows(&self) -> usize {
        self.browser_cfg.visible_rows.max(1)
    }

    fn row_count(&self, kind: StateKind) -> usize {
        match kind {
            StateKind::Recent => self.context.recent.len(),
            StateKind::Cheats => self.context.cheats.len(),
            StateKind::ArcadeDip => self.context.dip_switches.len(),
            other => pages::page_for(other).map_or(0, |page| page.items.len()),
        }
    }

    fn item_enabled(&self, item: &MenuItem) -> bool {
        item.is_selectable() && self.guard_holds(item.guard)
    }

    fn row_enabled(&self, kind: StateKind, row: usize) -> bool {
        match pages::page_for(kind) {
            Some(page) => page
                .items
                .get(row)
                .is_some_and(|item| self.item_enabled(item)),
            None => row < self.row_count(kind),
        }
    }

    fn highlighted_item(&self) -> Option<&'static MenuItem> {
        pages::page_for(self.state.kind())?
            .items
            .get(self.state.row()?)
    }

    /// Move the cursor `delta` enabled rows, wrapping at both ends.
    fn move_row(&mut self, delta: isize) {
        let kind = self.state.kind();
        let count = self.row_count(kind);
        let Some(mut row) = self.state.row() else {
            return;
        };
        if count == 0 {
            return;
        }
        for _ in 0..delta.unsigned_abs() {
            for _ in 0..count {
                row = if delta > 0 {
                    (row + 1) % count
                } else {
                    (row + count - 1) % count
                };
                if self.row_enabled(kind, row) {
                    break;
                }
            }
        }
        self.state.set_row(row);
    }

    fn page_jump(&mut self, delta: isize) {
        let kind = self.state.kind();
        let count = self.row_count(kind);
        let Some(row) = self.state.row() else {
            return;
        };
        let visible = self.visible_rows();
        let start = render::page_start(row, visible);
        let target = if delta < 0 {
            if start == 0 {
                return;
            }
            start - visible
        } else {
            if start + visible >= count {
                return;
            }
            start + visible
        };
        self.state.set_row(target);
        self.settle_row();
    }

    /// Step off a disabled row after entering a screen or jumping.
    fn settle_row(&mut self) {
        let kind = self.state.kind();
        if let Some(row) = self.state.row()
            && !self.row_enabled(kind, row)
        {
            self.move_row(1);
        }
    }

    // ──────────────────── page actions ────────────────────

    fn adjust(&mut self, delta: i8) {
        let Some(item) = self.highlighted_item() else {
            return;
        };
        if let ItemAction::Adjust(setting) = item.action
            && self.item_enabled(item)
        {
            self.adjust_setting(setting, delta);
        }
    }

    fn adjust_setting(&mut self, setting: Setting, delta: i8) {
        match setting {
            Setting::Aspect => {
                self.aspect = pages::next_aspect(self.aspect, delta < 0, &self.video);
                self.emit(MenuEffect::SetAspect { index: self.aspect });
            }
            Setting::Volume => {
                let level = pages::step_volume(self.volume, delta);
                if level != self.volume {
                    self.volume = level;
                    self.emit(MenuEffect::SetVolume { level });
                }
            }
        }
    }

    fn activate(&mut self) {
        let Some(item) = self.highlighted_item() else {
            return;
        };
        if !self.item_enabled(item) {
            return;
        }
        match item.action {
            ItemAction::Open(kind) => {
                if let Some(next) = MenuState::enter(kind) {
                    self.enter_child(next);
                }
            }
            ItemAction::Browse(purpose) => self.open_browser(purpose),
            ItemAction::Adjust(setting) => self.adjust_setting(setting, 1),
            ItemAction::Signal(signal) => {
                self.emit(signal.into());
                if signal.closes_menu() {
                    self.hide();
                } else {
                    self.go_back();
                }
            }
            ItemAction::PairBluetooth => self.open_bt_pair(),
            ItemAction::ShowAspect => {
                let ratios: Vec<&str> = self
                    .video
                    .custom_aspect_ratio
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| self.video.custom_aspect(*i).is_some())
                    .map(|(_, ratio)| ratio.trim())
                    .collect();
                self.notice(format!("Custom aspect ratios: {}", ratios.join(", ")));
            }
            ItemAction::Back => self.go_back(),
            ItemAction::Label => {}
        }
    }

    fn list_pick(&mut self) {
        let Some(row) = self.state.row() else {
            return;
        };
        match self.state.kind() {
            StateKind::Recent => {
                if let Some(path) = self.context.recent.get(row).cloned() {
                    self.start_load(path);
                }
            }
            StateKind::Cheats if row < self.context.cheats.len() => {
                self.emit(MenuEffect::ToggleCheat { index: row });
            }
            StateKind::ArcadeDip if row < self.context.dip_switches.len() => {
                self.emit(MenuEffect::ToggleDip { index: row });
            }
            _ => {}
        }
    }

    fn capture_step(&mut self) {
        let kind = self.state.kind();
        let Some(step) = self.state.capture_step() else {
            return;
        };
        let next = step + 1;
        if next < pages::capture_len(kind) {
            self.state.set_capture_step(next);
            return;
        }
        if let Some(effect) = capture_effect(kind) {
            self.emit(effect);
        }
        self.go_back();
    }

    // ──────────────────── browser ────────────────────

    fn open_browser(&mut self, purpose: BrowserPurpose) {
        self.open_browser_session(purpose);
        self.enter_child(MenuState::FileSelect { purpose });
    }

    fn open_browser_session(&mut self, purpose: BrowserPurpose) {
        let filter = purpose.selection_filter(&self.context.content_extensions);
        let start = self.browser_start(purpose);
        self.browser.open(&start, filter);
        self.browser_purpose = Some(purpose);
    }

    fn browser_start(&self, purpose: BrowserPurpose) -> PathBuf {
        let cfg = &self.browser_cfg;
        match purpose {
            BrowserPurpose::CoreLoad => cfg.cores_dir.clone(),
            BrowserPurpose::Content => self
                .registry
                .content_root()
                .unwrap_or_else(|| cfg.games_dir.clone()),
            BrowserPurpose::Saves => cfg.saves_dir.join(self.registry.core_name()),
            BrowserPurpose::Scripts => cfg.scripts_dir.clone(),
            BrowserPurpose::Docs => cfg.docs_dir.clone(),
            BrowserPurpose::Asset(kind) => cfg.cores_dir.join(kind.folder()),
        }
    }

    fn pick_file(&mut self) {
        let (Some(purpose), Some(path)) = (self.state.purpose(), self.browser.selected_path())
        else {
            return;
        };
        match purpose {
            BrowserPurpose::CoreLoad => self.start_load(path),
            BrowserPurpose::Content | BrowserPurpose::Saves => {
                self.emit(MenuEffect::MountImage { path });
                self.hide();
            }
            BrowserPurpose::Scripts => {
                let script = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.emit(MenuEffect::RunScript { path });
                self.enter_child(MenuState::ScriptOutput { script });
            }
            BrowserPurpose::Docs => {
                self.emit(MenuEffect::ShowDocument { path });
                self.go_back();
            }
            BrowserPurpose::Asset(kind) => {
                self.emit(MenuEffect::ApplyAsset { kind, path });
                self.go_back();
            }
        }
    }

    // ──────────────────── transfer ────────────────────

    fn start_load(&mut self, image: PathBuf) {
        match self.loader.begin_load(&image, self.endian) {
            Ok(session) => {
                let core = core_name_from_image(&image);
                let (sent, total) = session.progress();
                self.progress.report("Loading", &core, sent, total);
                self.transfer = Some(session);
                self.enter_child(MenuState::Loading { core });
            }
            Err(err) => {
                self.activity.record(ActivityEvent::Error {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
                self.notice(err.to_string());
            }
        }
    }

    fn advance_transfer(&mut self) {
        let Some(session) = self.transfer.as_mut() else {
            self.go_back();
            return;
        };
        let phase = self.loader.step(session);
        let (sent, total) = session.progress();
        let core = core_name_from_image(session.image());
        self.progress.report("Loading", &core, sent, total);
        if phase.is_terminal() {
            self.finish_transfer(phase);
        }
    }

    fn cancel_load(&mut self) {
        let Some(session) = self.transfer.as_mut() else {
            return;
        };
        self.loader.cancel(session);
        let phase = session.phase();
        self.finish_transfer(phase);
    }

    fn finish_transfer(&mut self, phase: Phase) {
        self.transfer = None;
        self.progress.report("", "", 0, 0);
        match phase {
            Phase::Done => {
                let name = self.registry.core_name();
                self.emit(MenuEffect::CoreLoaded { name });
                self.hide();
            }
            Phase::Failed(LoadFailure::Cancelled) => self.go_back(),
            Phase::Failed(reason) => {
                self.emit(MenuEffect::LoadFailed {
                    code: reason.code().to_string(),
                });
                // Parent stays at the screen the load started from.
                self.state = MenuState::LoadFailed {
                    reason,
                    until: self.now.saturating_add(self.menu.failure_notice_ms),
                };
            }
            Phase::Idle | Phase::Resetting | Phase::Streaming | Phase::AwaitingReady => {}
        }
    }

    fn emit(&mut self, effect: MenuEffect) {
        self.activity.record(ActivityEvent::MenuEffect {
            state: format!("{:?}", self.state.kind()),
            details: serde_json::to_string(&effect).unwrap_or_default(),
        });
        self.effects.push(effect);
    }

    // ──────────────────── rendering ────────────────────

    /// Draw the current screen. Idle disables the overlay.
    pub fn render<O: OsdSurface + ?Sized>(&self, osd: &mut O) {
        if !self.state.is_visible() {
            osd.disable();
            return;
        }
        osd.enable();
        let kind = self.state.kind();
        match &self.state {
            MenuState::Idle => {}
            MenuState::Info { message, .. } => {
                osd.set_title("Info");
                let lines: Vec<String> = render::wrap_text(message, OSD_COLUMNS - 1)
                    .into_iter()
                    .map(|line| format!(" {line}"))
                    .collect();
                write_lines(osd, &lines);
            }
            MenuState::BtPair { .. } => {
                osd.set_title("Bluetooth");
                let lines = [
                    String::new(),
                    render::centered("Pairing..."),
                    String::new(),
                    render::centered("Put the controller"),
                    render::centered("in pairing mode"),
                    String::new(),
                    render::centered("Esc to cancel"),
                ];
                write_lines(osd, &lines);
            }
            MenuState::FileSelect { purpose } => {
                osd.set_title(purpose.title());
                let rows = self.browser.render(true);
                let drawn = rows.len();
                for row in rows {
                    osd.write_row(row);
                }
                for index in drawn..osd.visible_rows() {
                    osd.write_row(OsdRow::text(index, ""));
                }
            }
            MenuState::ScriptOutput { script } => {
                osd.set_title("Scripts");
                let lines = [
                    format!(" {script}"),
                    String::new(),
                    " Running...".to_string(),
                    String::new(),
                    " Backspace: abort".to_string(),
                    " Esc: back".to_string(),
                ];
                write_lines(osd, &lines);
            }
            MenuState::Loading { core } => {
                osd.set_title(core);
                write_lines(osd, &self.progress.lines());
            }
            MenuState::LoadFailed { reason, .. } => {
                osd.set_title("Error");
                let lines = [
                    String::new(),
                    render::centered("Core load failed"),
                    String::new(),
                    render::centered(&reason.to_string()),
                ];
                write_lines(osd, &lines);
            }
            state if state.capture_step().is_some() => {
                let step = state.capture_step().unwrap_or(0);
                osd.set_title(capture_title(kind));
                let lines = [
                    String::new(),
                    render::centered(&pages::capture_prompt(kind, step)),
                    String::new(),
                    render::centered(&format!("{}/{}", step + 1, pages::capture_len(kind))),
                    String::new(),
                    render::centered("Esc to cancel"),
                ];
                write_lines(osd, &lines);
            }
            state => {
                let row = state.row().unwrap_or(0);
                if let Some(page) = pages::page_for(kind) {
                    self.render_page(osd, page, row);
                } else {
                    self.render_list(osd, kind, row);
                }
            }
        }
    }

    fn render_page<O: OsdSurface + ?Sized>(&self, osd: &mut O, page: &MenuPage, row: usize) {
        let title = if page.title.is_empty() {
            self.registry.core_name()
        } else {
            page.title.to_string()
        };
        osd.set_title(&title);
        let entries: Vec<(String, bool)> = page
            .items
            .iter()
            .map(|item| {
                let value = self.item_value(item);
                let text = render::item_row(0, item.label, value.as_deref()).text;
                (text, self.guard_holds(item.guard))
            })
            .collect();
        self.draw_window(osd, &entries, row);
    }

    fn render_list<O: OsdSurface + ?Sized>(&self, osd: &mut O, kind: StateKind, row: usize) {
        let (title, labels): (&str, Vec<String>) = match kind {
            StateKind::Recent => (
                "Recent cores",
                self.context
                    .recent
                    .iter()
                    .map(|p| core_name_from_image(p))
                    .collect(),
            ),
            StateKind::Cheats => ("Cheats", self.context.cheats.clone()),
            _ => ("DIP switches", self.context.dip_switches.clone()),
        };
        osd.set_title(title);
        if labels.is_empty() {
            write_lines(osd, &[String::new(), render::centered("No entries")]);
            return;
        }
        let entries: Vec<(String, bool)> = labels
            .iter()
            .map(|label| (render::item_row(0, label, None).text, true))
            .collect();
        self.draw_window(osd, &entries, row);
    }

    /// Draw the page window holding `selected`, with scroll arrows and the
    /// idle help marquee on the last row of root pages.
    fn draw_window<O: OsdSurface + ?Sized>(
        &self,
        osd: &mut O,
        entries: &[(String, bool)],
        selected: usize,
    ) {
        let visible = osd.visible_rows();
        let first = render::page_start(selected, visible);
        let help = self.help_line();
        for slot in 0..visible {
            if slot + 1 == visible
                && let Some(text) = &help
            {
                osd.write_row(OsdRow::text(slot, text.clone()));
                continue;
            }
            let index = first + slot;
            let mut out = match entries.get(index) {
                Some((text, enabled)) => OsdRow::text(slot, text.clone())
                    .inverted(index == selected)
                    .stippled(!enabled),
                None => OsdRow::text(slot, ""),
            };
            out.arrow = render::window_arrow(slot, first, visible, entries.len());
            osd.write_row(out);
        }
    }

    fn item_value(&self, item: &MenuItem) -> Option<String> {
        match item.action {
            ItemAction::Adjust(Setting::Aspect) => {
                Some(pages::aspect_label(self.aspect, &self.video))
            }
            ItemAction::Adjust(Setting::Volume) => Some(self.volume.to_string()),
            _ => None,
        }
    }

    fn help_line(&self) -> Option<String> {
        let since = self.help_since?;
        self.state
            .kind()
            .is_root_page()
            .then(|| render::help_marquee(pages::HELP_MAIN, self.now.saturating_sub(since)))
    }
}
