//! Static page layouts and the settings they adjust.

#![allow(missing_docs)]

use crate::core::config::VideoConfig;
use crate::menu::state::{AssetKind, BrowserPurpose, StateKind};
use crate::menu::table::Guard;

/// Row of the aspect-ratio item on the common settings page.
pub const COMMON_ASPECT_ROW: usize = 4;
/// Row of the volume item on the system settings page.
pub const SYSTEM_VOLUME_ROW: usize = 5;
pub const VOLUME_MAX: u8 = 7;

/// Shown after a root page sits idle.
pub const HELP_MAIN: &str = "Use the cursor keys to navigate the menus. Use space bar or enter \
to select an item. Press Esc or F12 to exit the menus. Hold the menu button to pair \
a Bluetooth controller.";

// ──────────────────── items ────────────────────

/// Values cycled with Left/Right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setting {
    Aspect,
    Volume,
}

/// Payload-free requests to collaborators outside the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Reboot,
    ResetCore,
    ResetSettings,
    ResetJoystickMap,
    UartMode(u8),
    Baud(u32),
    LoadConfig(u8),
    SaveConfig(u8),
    CpuType(u8),
    VideoMode(u8),
    Mt32Synth(u8),
}

impl Signal {
    /// Signals after which the overlay closes instead of returning.
    #[must_use]
    pub const fn closes_menu(self) -> bool {
        matches!(self, Self::Reboot | Self::ResetCore)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    Open(StateKind),
    Browse(BrowserPurpose),
    Adjust(Setting),
    Signal(Signal),
    PairBluetooth,
    ShowAspect,
    Back,
    /// Text only, never highlighted.
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub action: ItemAction,
    /// Item is drawn stippled and skipped by the cursor when this fails.
    pub guard: Guard,
}

impl MenuItem {
    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        !matches!(self.action, ItemAction::Label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuPage {
    pub title: &'static str,
    pub items: &'static [MenuItem],
}

const fn item(label: &'static str, action: ItemAction) -> MenuItem {
    MenuItem {
        label,
        action,
        guard: Guard::Always,
    }
}

const fn gated(label: &'static str, action: ItemAction, guard: Guard) -> MenuItem {
    MenuItem {
        label,
        action,
        guard,
    }
}

const fn label(text: &'static str) -> MenuItem {
    item(text, ItemAction::Label)
}

const fn open(text: &'static str, kind: StateKind) -> MenuItem {
    item(text, ItemAction::Open(kind))
}

const fn browse(text: &'static str, purpose: BrowserPurpose) -> MenuItem {
    item(text, ItemAction::Browse(purpose))
}

const fn signal(text: &'static str, signal: Signal) -> MenuItem {
    item(text, ItemAction::Signal(signal))
}

// ──────────────────── pages ────────────────────

pub static SYSTEM: MenuPage = MenuPage {
    title: "System",
    items: &[
        open("Remap keyboard", StateKind::KbdMap),
        open("Define joystick buttons", StateKind::JoySysMap),
        browse("Scripts", BrowserPurpose::Scripts),
        item("Bluetooth pairing", ItemAction::PairBluetooth),
        open("Recent cores", StateKind::Recent),
        item("Volume", ItemAction::Adjust(Setting::Volume)),
        open("UART mode", StateKind::Uart),
        open("Misc. options", StateKind::Misc),
        browse("Documentation", BrowserPurpose::Docs),
        open("Reset settings", StateKind::ResetConfirm),
        open("About", StateKind::About),
        signal("Reboot", Signal::Reboot),
    ],
};

pub static COMMON: MenuPage = MenuPage {
    title: "Common settings",
    items: &[
        open("Video processing", StateKind::VideoProc),
        browse("Audio filter", BrowserPurpose::Asset(AssetKind::AudioFilter)),
        open("Define joystick buttons", StateKind::JoyDigMap),
        open("Remap keyboard", StateKind::KbdMap),
        item("Aspect ratio", ItemAction::Adjust(Setting::Aspect)),
        item("Volume", ItemAction::Adjust(Setting::Volume)),
        browse("Documentation", BrowserPurpose::Docs),
        open("Reset settings", StateKind::ResetConfirm),
    ],
};

pub static MISC: MenuPage = MenuPage {
    title: "Misc. options",
    items: &[
        open("Light gun calibration", StateKind::LightGunCal),
        open("Joystick to keyboard", StateKind::JoyKbdMap),
        gated(
            "Reset joystick map",
            ItemAction::Open(StateKind::JoyReset),
            Guard::JoystickBound,
        ),
        open("MT32-pi", StateKind::Mt32Pi),
        open("Baud rate", StateKind::Baud),
    ],
};

pub static VIDEO_PROC: MenuPage = MenuPage {
    title: "Video processing",
    items: &[
        browse("Scaler filter", BrowserPurpose::Asset(AssetKind::ScalerCoeff)),
        browse("Gamma correction", BrowserPurpose::Asset(AssetKind::Gamma)),
        browse("Shadow mask", BrowserPurpose::Asset(AssetKind::ShadowMask)),
        browse("Video preset", BrowserPurpose::Asset(AssetKind::VideoPreset)),
        gated("Custom aspect ratio", ItemAction::ShowAspect, Guard::CustomAspect),
    ],
};

pub static ABOUT: MenuPage = MenuPage {
    title: "About",
    items: &[
        label("FPGA OSD engine"),
        label(concat!("Version ", env!("CARGO_PKG_VERSION"))),
        label(""),
        item("Back", ItemAction::Back),
    ],
};

pub static RESET_CONFIRM: MenuPage = MenuPage {
    title: "Reset settings",
    items: &[
        signal("Yes", Signal::ResetSettings),
        item("No", ItemAction::Back),
    ],
};

pub static JOY_RESET: MenuPage = MenuPage {
    title: "Reset joystick map",
    items: &[
        signal("Yes", Signal::ResetJoystickMap),
        item("No", ItemAction::Back),
    ],
};

pub static UART: MenuPage = MenuPage {
    title: "UART mode",
    items: &[
        signal("None", Signal::UartMode(0)),
        signal("PPP", Signal::UartMode(1)),
        signal("Console", Signal::UartMode(2)),
        signal("MIDI", Signal::UartMode(3)),
        signal("Modem", Signal::UartMode(4)),
    ],
};

pub static BAUD: MenuPage = MenuPage {
    title: "Baud rate",
    items: &[
        signal("9600", Signal::Baud(9_600)),
        signal("19200", Signal::Baud(19_200)),
        signal("38400", Signal::Baud(38_400)),
        signal("57600", Signal::Baud(57_600)),
        signal("115200", Signal::Baud(115_200)),
    ],
};

pub static GENERIC_MAIN: MenuPage = MenuPage {
    title: "",
    items: &[
        browse("Load image", BrowserPurpose::Content),
        browse("Save files", BrowserPurpose::Saves),
        gated("Cheats", ItemAction::Open(StateKind::Cheats), Guard::HasCheats),
        open("DIP switches", StateKind::ArcadeDip),
        open("Common settings", StateKind::Common),
        open("Misc. options", StateKind::Misc),
        open("UART mode", StateKind::Uart),
        browse("Documentation", BrowserPurpose::Docs),
        signal("Reset core", Signal::ResetCore),
        open("About", StateKind::About),
    ],
};

pub static MINIMIG_MAIN: MenuPage = MenuPage {
    title: "Minimig",
    items: &[
        open("Drives", StateKind::MinimigDisk),
        open("Video", StateKind::MinimigVideo),
        open("Chipset", StateKind::MinimigChipset),
        open("Load configuration", StateKind::MinimigLoadConfig),
        open("Save configuration", StateKind::MinimigSaveConfig),
        open("Common settings", StateKind::Common),
        signal("Reset", Signal::ResetCore),
    ],
};

pub static MINIMIG_VIDEO: MenuPage = MenuPage {
    title: "Video",
    items: &[
        signal("PAL", Signal::VideoMode(0)),
        signal("NTSC", Signal::VideoMode(1)),
    ],
};

pub static MINIMIG_CHIPSET: MenuPage = MenuPage {
    title: "Chipset",
    items: &[
        signal("CPU 68000", Signal::CpuType(0)),
        signal("CPU 68010", Signal::CpuType(1)),
        signal("CPU 68020", Signal::CpuType(2)),
    ],
};

pub static MINIMIG_DISK: MenuPage = MenuPage {
    title: "Drives",
    items: &[
        browse("Floppy", BrowserPurpose::Asset(AssetKind::MinimigFloppy)),
        browse("Hardfile", BrowserPurpose::Asset(AssetKind::MinimigHardfile)),
        browse("Kickstart ROM", BrowserPurpose::Asset(AssetKind::MinimigKickstart)),
    ],
};

const LOAD_SLOTS: &[MenuItem] = &[
    signal("Default", Signal::LoadConfig(0)),
    signal("Config 1", Signal::LoadConfig(1)),
    signal("Config 2", Signal::LoadConfig(2)),
    signal("Config 3", Signal::LoadConfig(3)),
    signal("Config 4", Signal::LoadConfig(4)),
];

const SAVE_SLOTS: &[MenuItem] = &[
    signal("Default", Signal::SaveConfig(0)),
    signal("Config 1", Signal::SaveConfig(1)),
    signal("Config 2", Signal::SaveConfig(2)),
    signal("Config 3", Signal::SaveConfig(3)),
    signal("Config 4", Signal::SaveConfig(4)),
];

pub static MINIMIG_LOAD_CONFIG: MenuPage = MenuPage {
    title: "Load configuration",
    items: LOAD_SLOTS,
};

pub static MINIMIG_SAVE_CONFIG: MenuPage = MenuPage {
    title: "Save configuration",
    items: SAVE_SLOTS,
};

pub static ST_MAIN: MenuPage = MenuPage {
    title: "Atari ST",
    items: &[
        browse("Floppy A", BrowserPurpose::Asset(AssetKind::StFloppy)),
        browse("Hard disk", BrowserPurpose::Asset(AssetKind::StHardDisk)),
        open("System", StateKind::StSystem),
        open("Load configuration", StateKind::StLoadConfig),
        open("Save configuration", StateKind::StSaveConfig),
        open("Common settings", StateKind::Common),
        signal("Reset", Signal::ResetCore),
    ],
};

pub static ST_SYSTEM: MenuPage = MenuPage {
    title: "System",
    items: &[
        browse("TOS image", BrowserPurpose::Asset(AssetKind::StTos)),
        signal("CPU 68000", Signal::CpuType(0)),
        signal("CPU 68010", Signal::CpuType(1)),
    ],
};

pub static ST_LOAD_CONFIG: MenuPage = MenuPage {
    title: "Load configuration",
    items: LOAD_SLOTS,
};

pub static ST_SAVE_CONFIG: MenuPage = MenuPage {
    title: "Save configuration",
    items: SAVE_SLOTS,
};

pub static ARCHIE_MAIN: MenuPage = MenuPage {
    title: "Archie",
    items: &[
        browse("Floppy 0", BrowserPurpose::Asset(AssetKind::ArchieImage)),
        open("Common settings", StateKind::Common),
        signal("Reset", Signal::ResetCore),
    ],
};

pub static MT32PI: MenuPage = MenuPage {
    title: "MT32-pi",
    items: &[
        signal("Synth: Munt", Signal::Mt32Synth(0)),
        signal("Synth: FluidSynth", Signal::Mt32Synth(1)),
    ],
};

/// Static layout for a page screen.
#[must_use]
pub fn page_for(kind: StateKind) -> Option<&'static MenuPage> {
    Some(match kind {
        StateKind::System => &SYSTEM,
        StateKind::Common => &COMMON,
        StateKind::Misc => &MISC,
        StateKind::VideoProc => &VIDEO_PROC,
        StateKind::About => &ABOUT,
        StateKind::ResetConfirm => &RESET_CONFIRM,
        StateKind::JoyReset => &JOY_RESET,
        StateKind::Uart => &UART,
        StateKind::Baud => &BAUD,
        StateKind::GenericMain => &GENERIC_MAIN,
        StateKind::MinimigMain => &MINIMIG_MAIN,
        StateKind::MinimigVideo => &MINIMIG_VIDEO,
        StateKind::MinimigChipset => &MINIMIG_CHIPSET,
        StateKind::MinimigDisk => &MINIMIG_DISK,
        StateKind::MinimigLoadConfig => &MINIMIG_LOAD_CONFIG,
        StateKind::MinimigSaveConfig => &MINIMIG_SAVE_CONFIG,
        StateKind::StMain => &ST_MAIN,
        StateKind::StSystem => &ST_SYSTEM,
        StateKind::StLoadConfig => &ST_LOAD_CONFIG,
        StateKind::StSaveConfig => &ST_SAVE_CONFIG,
        StateKind::ArchieMain => &ARCHIE_MAIN,
        StateKind::Mt32Pi => &MT32PI,
        _ => return None,
    })
}

// ──────────────────── capture flows ────────────────────

const JOY_BUTTONS: &[&str] = &[
    "right", "left", "down", "up", "A", "B", "X", "Y", "L", "R", "Select", "Start",
];
const KBD_STEPS: &[&str] = &["the key to remap", "the new key"];
const GUN_POINTS: &[&str] = &["top", "bottom", "left", "right"];

/// Number of captures a flow needs before it saves.
#[must_use]
pub const fn capture_len(kind: StateKind) -> usize {
    match kind {
        StateKind::JoySysMap | StateKind::JoyDigMap | StateKind::JoyKbdMap => JOY_BUTTONS.len(),
        StateKind::KbdMap => KBD_STEPS.len(),
        StateKind::LightGunCal => GUN_POINTS.len(),
        _ => 0,
    }
}

/// Prompt for capture `step` of a flow.
#[must_use]
pub fn capture_prompt(kind: StateKind, step: usize) -> String {
    match kind {
        StateKind::JoySysMap | StateKind::JoyDigMap | StateKind::JoyKbdMap => JOY_BUTTONS
            .get(step)
            .map(|b| format!("Press: {b}"))
            .unwrap_or_default(),
        StateKind::KbdMap => KBD_STEPS
            .get(step)
            .map(|s| format!("Press {s}"))
            .unwrap_or_default(),
        StateKind::LightGunCal => GUN_POINTS
            .get(step)
            .map(|p| format!("Shoot the {p} edge"))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

// ──────────────────── settings ────────────────────

/// Next aspect-ratio index (0 original, 1 full screen, 2/3 custom).
///
/// Custom slots that are unset or invalid are skipped. Stepping backwards
/// onto slot 3 also requires slot 2 to be set.
#[must_use]
pub fn next_aspect(current: u8, backwards: bool, video: &VideoConfig) -> u8 {
    let arc1 = video.custom_aspect(0).is_some();
    let arc2 = video.custom_aspect(1).is_some();
    if backwards {
        let mut ar = current.wrapping_sub(1) & 3;
        loop {
            if (ar == 3 && arc1 && arc2) || (ar == 2 && arc1) || ar < 2 {
                return ar;
            }
            ar -= 1;
        }
    }
    let ar = current.wrapping_add(1) & 3;
    match ar {
        3 if !arc2 => 0,
        2 if !arc1 => 0,
        other => other,
    }
}

/// Display label for aspect index `ar`.
#[must_use]
pub fn aspect_label(ar: u8, video: &VideoConfig) -> String {
    match ar {
        1 => "Full Screen".to_string(),
        2 | 3 => {
            let slot = usize::from(ar - 2);
            if video.custom_aspect(slot).is_some() {
                video.custom_aspect_ratio[slot].trim().to_string()
            } else {
                "Original".to_string()
            }
        }
        _ => "Original".to_string(),
    }
}

/// Step volume by `delta`, clamped to `0..=VOLUME_MAX`.
#[must_use]
pub fn step_volume(current: u8, delta: i8) -> u8 {
    let next = i16::from(current) + i16::from(delta);
    u8::try_from(next.clamp(0, i16::from(VOLUME_MAX))).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(arc1: &str, arc2: &str) -> VideoConfig {
        VideoConfig {
            custom_aspect_ratio: [arc1.to_string(), arc2.to_string()],
        }
    }

    #[test]
    fn aspect_cycles_over_configured_slots() {
        let none = video("", "");
        assert_eq!(next_aspect(0, false, &none), 1);
        assert_eq!(next_aspect(1, false, &none), 0);
        assert_eq!(next_aspect(0, true, &none), 1);

        let both = video("16:9", "21:9");
        assert_eq!(next_aspect(1, false, &both), 2);
        assert_eq!(next_aspect(2, false, &both), 3);
        assert_eq!(next_aspect(3, false, &both), 0);
        assert_eq!(next_aspect(0, true, &both), 3);
    }

    #[test]
    fn second_slot_alone_is_unreachable() {
        let only2 = video("", "4:3");
        assert_eq!(next_aspect(1, false, &only2), 0);
        assert_eq!(next_aspect(0, true, &only2), 1);

        let only1 = video("16:9", "");
        assert_eq!(next_aspect(2, false, &only1), 0);
        assert_eq!(next_aspect(0, true, &only1), 2);
    }

    #[test]
    fn aspect_labels() {
        let v = video("16:9", "bad");
        assert_eq!(aspect_label(0, &v), "Original");
        assert_eq!(aspect_label(1, &v), "Full Screen");
        assert_eq!(aspect_label(2, &v), "16:9");
        assert_eq!(aspect_label(3, &v), "Original");
    }

    #[test]
    fn volume_clamps() {
        assert_eq!(step_volume(0, -1), 0);
        assert_eq!(step_volume(6, 1), 7);
        assert_eq!(step_volume(7, 1), 7);
    }

    #[test]
    fn exception_rows_point_at_adjustable_items() {
        assert_eq!(
            COMMON.items[COMMON_ASPECT_ROW].action,
            ItemAction::Adjust(Setting::Aspect)
        );
        assert_eq!(
            SYSTEM.items[SYSTEM_VOLUME_ROW].action,
            ItemAction::Adjust(Setting::Volume)
        );
    }

    #[test]
    fn every_page_screen_has_a_layout() {
        for kind in crate::menu::table::PAGE_SCREENS {
            let page = page_for(*kind).unwrap();
            assert!(page.items.iter().any(MenuItem::is_selectable), "{kind:?}");
        }
    }

    #[test]
    fn capture_prompts() {
        assert_eq!(capture_len(StateKind::JoyDigMap), 12);
        assert_eq!(capture_prompt(StateKind::JoyDigMap, 4), "Press: A");
        assert_eq!(capture_prompt(StateKind::LightGunCal, 0), "Shoot the top edge");
        assert_eq!(capture_prompt(StateKind::KbdMap, 9), "");
    }
}
