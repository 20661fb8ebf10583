//! The active modal screen.
//!
//! `MenuState` carries per-screen data (cursor row, mapping step, deadline).
//! `StateKind` is its fieldless mirror: the transition-table key and the
//! name used in configuration.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::browser::filter::{ScanOptions, SelectionFilter};
use crate::loader::session::LoadFailure;

/// Extensions offered when browsing content for the running core.
pub const SAVE_EXTENSIONS: &str = "SAV";
pub const SCRIPT_EXTENSIONS: &str = "SH";
pub const DOC_EXTENSIONS: &str = "TXT,PDF,MD";

// ──────────────────── browser purposes ────────────────────

/// Files loaded by a core or a settings page rather than mounted as media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    ScalerCoeff,
    Gamma,
    ShadowMask,
    VideoPreset,
    AudioFilter,
    MinimigFloppy,
    MinimigHardfile,
    MinimigKickstart,
    StFloppy,
    StHardDisk,
    StTos,
    ArchieImage,
}

impl AssetKind {
    #[must_use]
    pub const fn extensions(self) -> &'static str {
        match self {
            Self::ScalerCoeff | Self::Gamma | Self::ShadowMask | Self::AudioFilter => "TXT",
            Self::VideoPreset => "INI",
            Self::MinimigFloppy => "ADF",
            Self::MinimigHardfile => "HDF,VHD",
            Self::MinimigKickstart => "ROM",
            Self::StFloppy => "ST,MSA",
            Self::StHardDisk => "HD,HDF",
            Self::StTos => "IMG",
            Self::ArchieImage => "ADF,HDF",
        }
    }

    /// Directory under the media root holding this asset type.
    #[must_use]
    pub const fn folder(self) -> &'static str {
        match self {
            Self::ScalerCoeff => "filters",
            Self::Gamma => "gamma",
            Self::ShadowMask => "shadow_masks",
            Self::VideoPreset => "presets",
            Self::AudioFilter => "filters_audio",
            Self::MinimigFloppy | Self::MinimigHardfile | Self::MinimigKickstart => "games/Amiga",
            Self::StFloppy | Self::StHardDisk | Self::StTos => "games/AtariST",
            Self::ArchieImage => "games/Archie",
        }
    }

    /// Asset folders hold configuration files; disk images are content.
    const fn is_settings_file(self) -> bool {
        matches!(
            self,
            Self::ScalerCoeff | Self::Gamma | Self::ShadowMask | Self::VideoPreset | Self::AudioFilter
        )
    }
}

/// Why a file browser was opened; decides what `Select` on a file does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserPurpose {
    /// Core image: selecting it starts a configuration load.
    CoreLoad,
    /// Media for the running core.
    Content,
    /// Save files for the running core.
    Saves,
    Scripts,
    Docs,
    Asset(AssetKind),
}

impl BrowserPurpose {
    /// Selection filter for a session opened with this purpose.
    #[must_use]
    pub fn selection_filter(self, content_extensions: &str) -> SelectionFilter {
        match self {
            Self::CoreLoad => SelectionFilter::cores(),
            Self::Content => SelectionFilter::new(content_extensions, ScanOptions::default()),
            Self::Saves => SelectionFilter::new(
                SAVE_EXTENSIONS,
                ScanOptions {
                    saves: true,
                    ..ScanOptions::default()
                },
            ),
            Self::Scripts => SelectionFilter::new(SCRIPT_EXTENSIONS, ScanOptions::default()),
            Self::Docs => SelectionFilter::new(
                DOC_EXTENSIONS,
                ScanOptions {
                    text: true,
                    ..ScanOptions::default()
                },
            ),
            Self::Asset(kind) => SelectionFilter::new(
                kind.extensions(),
                ScanOptions {
                    text: kind.is_settings_file(),
                    ..ScanOptions::default()
                },
            ),
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::CoreLoad => "Cores",
            Self::Content => "Load image",
            Self::Saves => "Save files",
            Self::Scripts => "Scripts",
            Self::Docs => "Documents",
            Self::Asset(_) => "Select file",
        }
    }
}

// ──────────────────── state kinds ────────────────────

/// Fieldless screen identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Idle,
    Info,
    BtPair,
    System,
    Common,
    Misc,
    VideoProc,
    FileSelect,
    Recent,
    About,
    ResetConfirm,
    JoySysMap,
    JoyDigMap,
    JoyKbdMap,
    KbdMap,
    JoyReset,
    LightGunCal,
    ScriptOutput,
    Cheats,
    Uart,
    Baud,
    GenericMain,
    ArcadeDip,
    MinimigMain,
    MinimigVideo,
    MinimigChipset,
    MinimigDisk,
    MinimigLoadConfig,
    MinimigSaveConfig,
    StMain,
    StSystem,
    StLoadConfig,
    StSaveConfig,
    ArchieMain,
    Mt32Pi,
    Loading,
    LoadFailed,
}

impl StateKind {
    /// Top-level screen of a core's settings; idle help may scroll here.
    #[must_use]
    pub const fn is_root_page(self) -> bool {
        matches!(
            self,
            Self::System | Self::GenericMain | Self::MinimigMain | Self::StMain | Self::ArchieMain
        )
    }
}

// ──────────────────── states ────────────────────

/// Exactly one of these is active at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum MenuState {
    /// Overlay hidden.
    #[default]
    Idle,
    Info { message: String, until: u64 },
    BtPair { until: u64 },
    System { row: usize },
    Common { row: usize },
    Misc { row: usize },
    VideoProc { row: usize },
    FileSelect { purpose: BrowserPurpose },
    Recent { row: usize },
    About { row: usize },
    ResetConfirm { row: usize },
    JoySysMap { step: usize },
    JoyDigMap { step: usize },
    JoyKbdMap { step: usize },
    KbdMap { step: usize },
    JoyReset { row: usize },
    LightGunCal { step: usize },
    ScriptOutput { script: String },
    Cheats { row: usize },
    Uart { row: usize },
    Baud { row: usize },
    GenericMain { row: usize },
    ArcadeDip { row: usize },
    MinimigMain { row: usize },
    MinimigVideo { row: usize },
    MinimigChipset { row: usize },
    MinimigDisk { row: usize },
    MinimigLoadConfig { row: usize },
    MinimigSaveConfig { row: usize },
    StMain { row: usize },
    StSystem { row: usize },
    StLoadConfig { row: usize },
    StSaveConfig { row: usize },
    ArchieMain { row: usize },
    Mt32Pi { row: usize },
    /// Core transfer in progress.
    Loading { core: String },
    /// Failure notice; resumes the recorded parent at `until`.
    LoadFailed { reason: LoadFailure, until: u64 },
}

impl MenuState {
    #[must_use]
    pub const fn kind(&self) -> StateKind {
        match self {
            Self::Idle => StateKind::Idle,
            Self::Info { .. } => StateKind::Info,
            Self::BtPair { .. } => StateKind::BtPair,
            Self::System { .. } => StateKind::System,
            Self::Common { .. } => StateKind::Common,
            Self::Misc { .. } => StateKind::Misc,
            Self::VideoProc { .. } => StateKind::VideoProc,
            Self::FileSelect { .. } => StateKind::FileSelect,
            Self::Recent { .. } => StateKind::Recent,
            Self::About { .. } => StateKind::About,
            Self::ResetConfirm { .. } => StateKind::ResetConfirm,
            Self::JoySysMap { .. } => StateKind::JoySysMap,
            Self::JoyDigMap { .. } => StateKind::JoyDigMap,
            Self::JoyKbdMap { .. } => StateKind::JoyKbdMap,
            Self::KbdMap { .. } => StateKind::KbdMap,
            Self::JoyReset { .. } => StateKind::JoyReset,
            Self::LightGunCal { .. } => StateKind::LightGunCal,
            Self::ScriptOutput { .. } => StateKind::ScriptOutput,
            Self::Cheats { .. } => StateKind::Cheats,
            Self::Uart { .. } => StateKind::Uart,
            Self::Baud { .. } => StateKind::Baud,
            Self::GenericMain { .. } => StateKind::GenericMain,
            Self::ArcadeDip { .. } => StateKind::ArcadeDip,
            Self::MinimigMain { .. } => StateKind::MinimigMain,
            Self::MinimigVideo { .. } => StateKind::MinimigVideo,
            Self::MinimigChipset { .. } => StateKind::MinimigChipset,
            Self::MinimigDisk { .. } => StateKind::MinimigDisk,
            Self::MinimigLoadConfig { .. } => StateKind::MinimigLoadConfig,
            Self::MinimigSaveConfig { .. } => StateKind::MinimigSaveConfig,
            Self::StMain { .. } => StateKind::StMain,
            Self::StSystem { .. } => StateKind::StSystem,
            Self::StLoadConfig { .. } => StateKind::StLoadConfig,
            Self::StSaveConfig { .. } => StateKind::StSaveConfig,
            Self::ArchieMain { .. } => StateKind::ArchieMain,
            Self::Mt32Pi { .. } => StateKind::Mt32Pi,
            Self::Loading { .. } => StateKind::Loading,
            Self::LoadFailed { .. } => StateKind::LoadFailed,
        }
    }

    /// Fresh state for a screen opened from a menu item.
    ///
    /// Returns `None` for screens that need data an item cannot supply
    /// (deadlines, a browser purpose, a load in flight).
    #[must_use]
    pub const fn enter(kind: StateKind) -> Option<Self> {
        let state = match kind {
            StateKind::Idle => Self::Idle,
            StateKind::System => Self::System { row: 0 },
            StateKind::Common => Self::Common { row: 0 },
            StateKind::Misc => Self::Misc { row: 0 },
            StateKind::VideoProc => Self::VideoProc { row: 0 },
            StateKind::Recent => Self::Recent { row: 0 },
            StateKind::About => Self::About { row: 0 },
            StateKind::ResetConfirm => Self::ResetConfirm { row: 1 },
            StateKind::JoySysMap => Self::JoySysMap { step: 0 },
            StateKind::JoyDigMap => Self::JoyDigMap { step: 0 },
            StateKind::JoyKbdMap => Self::JoyKbdMap { step: 0 },
            StateKind::KbdMap => Self::KbdMap { step: 0 },
            StateKind::JoyReset => Self::JoyReset { row: 1 },
            StateKind::LightGunCal => Self::LightGunCal { step: 0 },
            StateKind::Cheats => Self::Cheats { row: 0 },
            StateKind::Uart => Self::Uart { row: 0 },
            StateKind::Baud => Self::Baud { row: 0 },
            StateKind::GenericMain => Self::GenericMain { row: 0 },
            StateKind::ArcadeDip => Self::ArcadeDip { row: 0 },
            StateKind::MinimigMain => Self::MinimigMain { row: 0 },
            StateKind::MinimigVideo => Self::MinimigVideo { row: 0 },
            StateKind::MinimigChipset => Self::MinimigChipset { row: 0 },
            StateKind::MinimigDisk => Self::MinimigDisk { row: 0 },
            StateKind::MinimigLoadConfig => Self::MinimigLoadConfig { row: 0 },
            StateKind::MinimigSaveConfig => Self::MinimigSaveConfig { row: 0 },
            StateKind::StMain => Self::StMain { row: 0 },
            StateKind::StSystem => Self::StSystem { row: 0 },
            StateKind::StLoadConfig => Self::StLoadConfig { row: 0 },
            StateKind::StSaveConfig => Self::StSaveConfig { row: 0 },
            StateKind::ArchieMain => Self::ArchieMain { row: 0 },
            StateKind::Mt32Pi => Self::Mt32Pi { row: 0 },
            StateKind::Info
            | StateKind::BtPair
            | StateKind::FileSelect
            | StateKind::ScriptOutput
            | StateKind::Loading
            | StateKind::LoadFailed => return None,
        };
        Some(state)
    }

    /// Highlighted row of a page or list screen.
    #[must_use]
    pub const fn row(&self) -> Option<usize> {
        match self {
            Self::System { row }
            | Self::Common { row }
            | Self::Misc { row }
            | Self::VideoProc { row }
            | Self::Recent { row }
            | Self::About { row }
            | Self::ResetConfirm { row }
            | Self::JoyReset { row }
            | Self::Cheats { row }
            | Self::Uart { row }
            | Self::Baud { row }
            | Self::GenericMain { row }
            | Self::ArcadeDip { row }
            | Self::MinimigMain { row }
            | Self::MinimigVideo { row }
            | Self::MinimigChipset { row }
            | Self::MinimigDisk { row }
            | Self::MinimigLoadConfig { row }
            | Self::MinimigSaveConfig { row }
            | Self::StMain { row }
            | Self::StSystem { row }
            | Self::StLoadConfig { row }
            | Self::StSaveConfig { row }
            | Self::ArchieMain { row }
            | Self::Mt32Pi { row } => Some(*row),
            _ => None,
        }
    }

    /// Move the highlighted row. No-op on screens without rows.
    pub fn set_row(&mut self, new_row: usize) {
        match self {
            Self::System { row }
            | Self::Common { row }
            | Self::Misc { row }
            | Self::VideoProc { row }
            | Self::Recent { row }
            | Self::About { row }
            | Self::ResetConfirm { row }
            | Self::JoyReset { row }
            | Self::Cheats { row }
            | Self::Uart { row }
            | Self::Baud { row }
            | Self::GenericMain { row }
            | Self::ArcadeDip { row }
            | Self::MinimigMain { row }
            | Self::MinimigVideo { row }
            | Self::MinimigChipset { row }
            | Self::MinimigDisk { row }
            | Self::MinimigLoadConfig { row }
            | Self::MinimigSaveConfig { row }
            | Self::StMain { row }
            | Self::StSystem { row }
            | Self::StLoadConfig { row }
            | Self::StSaveConfig { row }
            | Self::ArchieMain { row }
            | Self::Mt32Pi { row } => *row = new_row,
            _ => {}
        }
    }

    /// Progress through a multi-step capture flow.
    #[must_use]
    pub const fn capture_step(&self) -> Option<usize> {
        match self {
            Self::JoySysMap { step }
            | Self::JoyDigMap { step }
            | Self::JoyKbdMap { step }
            | Self::KbdMap { step }
            | Self::LightGunCal { step } => Some(*step),
            _ => None,
        }
    }

    pub fn set_capture_step(&mut self, next: usize) {
        match self {
            Self::JoySysMap { step }
            | Self::JoyDigMap { step }
            | Self::JoyKbdMap { step }
            | Self::KbdMap { step }
            | Self::LightGunCal { step } => *step = next,
            _ => {}
        }
    }

    /// Screens where a menu-button long press means Backspace.
    #[must_use]
    pub const fn is_file_selection_like(&self) -> bool {
        matches!(self, Self::FileSelect { .. } | Self::ScriptOutput { .. })
    }

    /// Whether the overlay is shown.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    #[must_use]
    pub const fn purpose(&self) -> Option<BrowserPurpose> {
        match self {
            Self::FileSelect { purpose } => Some(*purpose),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_round_trips_kind() {
        for kind in [
            StateKind::System,
            StateKind::Common,
            StateKind::JoyDigMap,
            StateKind::GenericMain,
            StateKind::StSaveConfig,
            StateKind::Mt32Pi,
        ] {
            assert_eq!(MenuState::enter(kind).unwrap().kind(), kind);
        }
        assert!(MenuState::enter(StateKind::Loading).is_none());
        assert!(MenuState::enter(StateKind::FileSelect).is_none());
    }

    #[test]
    fn confirmation_screens_default_to_no() {
        assert_eq!(MenuState::enter(StateKind::ResetConfirm).unwrap().row(), Some(1));
        assert_eq!(MenuState::enter(StateKind::JoyReset).unwrap().row(), Some(1));
    }

    #[test]
    fn set_row_only_touches_row_screens() {
        let mut s = MenuState::System { row: 0 };
        s.set_row(5);
        assert_eq!(s.row(), Some(5));

        let mut idle = MenuState::Idle;
        idle.set_row(3);
        assert_eq!(idle, MenuState::Idle);
    }

    #[test]
    fn state_kind_uses_snake_case_names() {
        let json = serde_json::to_string(&StateKind::VideoProc).unwrap();
        assert_eq!(json, "\"video_proc\"");
        let back: StateKind = serde_json::from_str("\"common\"").unwrap();
        assert_eq!(back, StateKind::Common);
    }

    #[test]
    fn purposes_pick_scan_modes() {
        assert!(BrowserPurpose::CoreLoad.selection_filter("").options.cores);
        assert!(BrowserPurpose::Saves.selection_filter("").options.saves);
        assert!(BrowserPurpose::Docs.selection_filter("").options.text);
        assert!(
            BrowserPurpose::Asset(AssetKind::Gamma)
                .selection_filter("")
                .options
                .text
        );
        assert!(
            !BrowserPurpose::Asset(AssetKind::StFloppy)
                .selection_filter("")
                .options
                .text
        );
        let content = BrowserPurpose::Content.selection_filter("NES,FDS");
        assert!(content.extensions.matches("mario.nes"));
        assert!(!content.extensions.matches("notes.txt"));
    }
}
