//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{FosdError, Result};
use crate::loader::channel::EndianMode;
use crate::menu::state::StateKind;

/// Full engine configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub browser: BrowserConfig,
    pub loader: LoaderConfig,
    pub menu: MenuConfig,
    pub video: VideoConfig,
    pub paths: PathsConfig,
}

/// Debounce, repeat, and long-press timing (all in 1 ms ticks).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InputConfig {
    pub debounce_ms: u64,
    pub repeat_delay_ms: u64,
    pub repeat_rate_ms: u64,
    pub menu_long_press_ms: u64,
    pub user_long_press_ms: u64,
    /// Idle time after which the typed file-browser prefix is forgotten.
    pub typing_reset_ms: u64,
    /// Menu rows where non-printable keys (arrows) auto-repeat.
    ///
    /// The two defaults cover the rows known to need it; the list is open
    /// for product review rather than assumed exhaustive.
    pub repeat_exceptions: Vec<RepeatException>,
}

/// A `(screen, row)` pair allowed to auto-repeat non-printable keys.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepeatException {
    pub screen: StateKind,
    pub row: usize,
}

/// File browser roots and display policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrowserConfig {
    /// Directory holding core images (RBF/MRA/MGL).
    pub cores_dir: PathBuf,
    /// Parent of the per-core content directories.
    pub games_dir: PathBuf,
    /// Parent of the per-core save-file directories.
    pub saves_dir: PathBuf,
    pub scripts_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub hide_datecode: bool,
    pub browse_expand: bool,
    /// OSD rows available to the browser (8 or 16).
    pub visible_rows: usize,
    /// Upper bound on entries kept per scanned directory.
    pub max_entries: usize,
}

/// Configuration-loader budgets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Bytes transferred per `step()` while streaming.
    pub block_bytes: usize,
    /// Reset handshake budget in bus polls.
    pub reset_timeout_cycles: u64,
    pub reset_polls_per_step: u64,
    /// Upper bound on blocking ready-status polls after streaming.
    pub ready_poll_attempts: u32,
    pub ready_polls_per_step: u32,
    /// Wire variant used for loads started from the menu.
    pub endian: EndianMode,
}

/// Overlay timeouts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MenuConfig {
    pub info_timeout_ms: u64,
    pub help_timeout_ms: u64,
    pub bt_pair_timeout_ms: u64,
    pub failure_notice_ms: u64,
}

/// Video options the menu needs to evaluate its guards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct VideoConfig {
    /// Two optional `W:H` custom aspect ratios; empty string means unset.
    pub custom_aspect_ratio: [String; 2],
}

/// Filesystem paths used by fosd itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    /// JSONL activity log; empty disables logging.
    pub activity_log: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 20,
            repeat_delay_ms: 500,
            repeat_rate_ms: 50,
            menu_long_press_ms: 3_000,
            user_long_press_ms: 1_500,
            typing_reset_ms: 1_000,
            repeat_exceptions: vec![
                RepeatException {
                    screen: StateKind::Common,
                    row: crate::menu::pages::COMMON_ASPECT_ROW,
                },
                RepeatException {
                    screen: StateKind::System,
                    row: crate::menu::pages::SYSTEM_VOLUME_ROW,
                },
            ],
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        let base = PathBuf::from("/media/fat");
        Self {
            cores_dir: base.clone(),
            games_dir: base.join("games"),
            saves_dir: base.join("saves"),
            scripts_dir: base.join("Scripts"),
            docs_dir: base.join("docs"),
            hide_datecode: false,
            browse_expand: true,
            visible_rows: 16,
            max_entries: 8_192,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            block_bytes: 4_096,
            reset_timeout_cycles: 0x0100_0000,
            reset_polls_per_step: 65_536,
            ready_poll_attempts: 10_000,
            ready_polls_per_step: 256,
            endian: EndianMode::default(),
        }
    }
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            info_timeout_ms: 2_000,
            help_timeout_ms: 10_000,
            bt_pair_timeout_ms: 30_000,
            failure_notice_ms: 3_000,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!(
                    "[FOSD-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths"
                );
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("fosd").join("config.toml");
        let data = home_dir.join(".local").join("share").join("fosd");
        Self {
            config_file: cfg,
            activity_log: data.join("activity.jsonl"),
        }
    }
}

impl VideoConfig {
    /// Parse custom aspect ratio `index` (0 or 1) into `(w, h)`.
    ///
    /// Returns `None` when unset or out of the 1..=4095 range.
    #[must_use]
    pub fn custom_aspect(&self, index: usize) -> Option<(u32, u32)> {
        let raw = self.custom_aspect_ratio.get(index)?.trim();
        let (w, h) = raw.split_once(':')?;
        let w: u32 = w.trim().parse().ok()?;
        let h: u32 = h.trim().parse().ok()?;
        ((1..=4095).contains(&w) && (1..=4095).contains(&h)).then_some((w, h))
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| FosdError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(FosdError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize_paths();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over canonical JSON so the value is stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Whether the activity log is enabled.
    #[must_use]
    pub fn activity_log_enabled(&self) -> bool {
        !self.paths.activity_log.as_os_str().is_empty()
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // input
        set_u64(&mut lookup, "FOSD_INPUT_DEBOUNCE_MS", &mut self.input.debounce_ms)?;
        set_u64(
            &mut lookup,
            "FOSD_INPUT_REPEAT_DELAY_MS",
            &mut self.input.repeat_delay_ms,
        )?;
        set_u64(
            &mut lookup,
            "FOSD_INPUT_REPEAT_RATE_MS",
            &mut self.input.repeat_rate_ms,
        )?;
        set_u64(
            &mut lookup,
            "FOSD_INPUT_MENU_LONG_PRESS_MS",
            &mut self.input.menu_long_press_ms,
        )?;
        set_u64(
            &mut lookup,
            "FOSD_INPUT_USER_LONG_PRESS_MS",
            &mut self.input.user_long_press_ms,
        )?;

        // browser
        set_path(&mut lookup, "FOSD_BROWSER_CORES_DIR", &mut self.browser.cores_dir);
        set_path(&mut lookup, "FOSD_BROWSER_GAMES_DIR", &mut self.browser.games_dir);
        set_path(&mut lookup, "FOSD_BROWSER_SAVES_DIR", &mut self.browser.saves_dir);
        set_bool(
            &mut lookup,
            "FOSD_BROWSER_HIDE_DATECODE",
            &mut self.browser.hide_datecode,
        )?;
        set_bool(
            &mut lookup,
            "FOSD_BROWSER_BROWSE_EXPAND",
            &mut self.browser.browse_expand,
        )?;
        set_usize(
            &mut lookup,
            "FOSD_BROWSER_VISIBLE_ROWS",
            &mut self.browser.visible_rows,
        )?;

        // loader
        set_usize(
            &mut lookup,
            "FOSD_LOADER_BLOCK_BYTES",
            &mut self.loader.block_bytes,
        )?;
        set_u64(
            &mut lookup,
            "FOSD_LOADER_RESET_TIMEOUT_CYCLES",
            &mut self.loader.reset_timeout_cycles,
        )?;

        // paths
        set_path(&mut lookup, "FOSD_ACTIVITY_LOG", &mut self.paths.activity_log);

        Ok(())
    }

    /// Strip trailing slashes so prefix comparisons in the browser are exact.
    fn normalize_paths(&mut self) {
        for path in [
            &mut self.browser.cores_dir,
            &mut self.browser.games_dir,
            &mut self.browser.saves_dir,
            &mut self.browser.scripts_dir,
            &mut self.browser.docs_dir,
        ] {
            let s = path.to_string_lossy();
            if s.len() > 1
                && let Some(stripped) = s.strip_suffix('/')
            {
                *path = PathBuf::from(stripped);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let input = &self.input;
        for (name, val) in [
            ("debounce_ms", input.debounce_ms),
            ("repeat_delay_ms", input.repeat_delay_ms),
            ("repeat_rate_ms", input.repeat_rate_ms),
            ("typing_reset_ms", input.typing_reset_ms),
        ] {
            if val == 0 {
                return Err(FosdError::InvalidConfig {
                    details: format!("input.{name} must be > 0"),
                });
            }
        }
        for (name, val) in [
            ("menu_long_press_ms", input.menu_long_press_ms),
            ("user_long_press_ms", input.user_long_press_ms),
        ] {
            if val <= input.debounce_ms {
                return Err(FosdError::InvalidConfig {
                    details: format!(
                        "input.{name} ({val}) must exceed input.debounce_ms ({})",
                        input.debounce_ms
                    ),
                });
            }
        }

        if !matches!(self.browser.visible_rows, 8 | 16) {
            return Err(FosdError::InvalidConfig {
                details: format!(
                    "browser.visible_rows must be 8 or 16, got {}",
                    self.browser.visible_rows
                ),
            });
        }
        if self.browser.max_entries == 0 {
            return Err(FosdError::InvalidConfig {
                details: "browser.max_entries must be >= 1".to_string(),
            });
        }

        let loader = &self.loader;
        if loader.block_bytes == 0 || loader.block_bytes % 2 != 0 {
            return Err(FosdError::InvalidConfig {
                details: format!(
                    "loader.block_bytes must be a positive even number, got {}",
                    loader.block_bytes
                ),
            });
        }
        if loader.reset_timeout_cycles == 0 || loader.reset_polls_per_step == 0 {
            return Err(FosdError::InvalidConfig {
                details: "loader reset budgets must be > 0".to_string(),
            });
        }
        if loader.ready_poll_attempts == 0 || loader.ready_polls_per_step == 0 {
            return Err(FosdError::InvalidConfig {
                details: "loader ready-poll budgets must be > 0".to_string(),
            });
        }

        for (idx, raw) in self.video.custom_aspect_ratio.iter().enumerate() {
            if !raw.trim().is_empty() && self.video.custom_aspect(idx).is_none() {
                return Err(FosdError::InvalidConfig {
                    details: format!(
                        "video.custom_aspect_ratio[{idx}] must be W:H with 1..=4095, got {raw:?}"
                    ),
                });
            }
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_u64<F>(lookup: &mut F, name: &str, slot: &mut u64) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.parse::<u64>().map_err(|error| FosdError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_usize<F>(lookup: &mut F, name: &str, slot: &mut usize) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw
            .parse::<usize>()
            .map_err(|error| FosdError::ConfigParse {
                context: "env",
                details: format!("{name}={raw:?}: {error}"),
            })?;
    }
    Ok(())
}

fn set_bool<F>(lookup: &mut F, name: &str, slot: &mut bool) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.parse::<bool>().map_err(|error| FosdError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_path<F>(lookup: &mut F, name: &str, slot: &mut PathBuf)
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = PathBuf::from(raw);
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, FosdError, StateKind};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn default_timings_match_hardware_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.input.debounce_ms, 20);
        assert_eq!(cfg.input.repeat_delay_ms, 500);
        assert_eq!(cfg.input.repeat_rate_ms, 50);
        assert_eq!(cfg.input.menu_long_press_ms, 3_000);
        assert_eq!(cfg.input.user_long_press_ms, 1_500);
        assert_eq!(cfg.loader.reset_timeout_cycles, 1 << 24);
    }

    #[test]
    fn default_repeat_exceptions_cover_common_and_system_rows() {
        let cfg = Config::default();
        let screens: Vec<StateKind> = cfg
            .input
            .repeat_exceptions
            .iter()
            .map(|e| e.screen)
            .collect();
        assert_eq!(screens, vec![StateKind::Common, StateKind::System]);
    }

    #[test]
    fn odd_block_size_rejected() {
        let mut cfg = Config::default();
        cfg.loader.block_bytes = 4_095;
        let err = cfg.validate().expect_err("expected block size error");
        assert!(err.to_string().contains("block_bytes"));
    }

    #[test]
    fn visible_rows_must_be_osd_size() {
        let mut cfg = Config::default();
        cfg.browser.visible_rows = 12;
        let err = cfg.validate().expect_err("expected visible_rows error");
        assert!(err.to_string().contains("visible_rows"));
    }

    #[test]
    fn long_press_must_exceed_debounce() {
        let mut cfg = Config::default();
        cfg.input.user_long_press_ms = 10;
        let err = cfg.validate().expect_err("expected long-press error");
        assert!(err.to_string().contains("user_long_press_ms"));
    }

    #[test]
    fn malformed_custom_aspect_rejected() {
        let mut cfg = Config::default();
        cfg.video.custom_aspect_ratio[1] = "16:0".to_string();
        let err = cfg.validate().expect_err("expected aspect error");
        assert!(err.to_string().contains("custom_aspect_ratio[1]"));
    }

    #[test]
    fn custom_aspect_parses_within_bounds() {
        let mut cfg = Config::default();
        cfg.video.custom_aspect_ratio[0] = " 8:7 ".to_string();
        assert_eq!(cfg.video.custom_aspect(0), Some((8, 7)));
        assert_eq!(cfg.video.custom_aspect(1), None);
        cfg.video.custom_aspect_ratio[1] = "5000:1".to_string();
        assert_eq!(cfg.video.custom_aspect(1), None);
    }

    #[test]
    fn stable_hash_changes_when_config_changes() {
        let cfg = Config::default();
        let hash_before = cfg.stable_hash().expect("hash should compute");
        let mut modified = Config::default();
        modified.input.repeat_rate_ms += 1;
        let hash_after = modified.stable_hash().expect("hash should compute");
        assert_ne!(hash_before, hash_after);
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = Config::default();
        let overrides = vars(&[
            ("FOSD_INPUT_DEBOUNCE_MS", "25"),
            ("FOSD_BROWSER_CORES_DIR", "/mnt/sd/cores"),
            ("FOSD_BROWSER_HIDE_DATECODE", "true"),
        ]);
        cfg.apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect("env overrides should parse");
        assert_eq!(cfg.input.debounce_ms, 25);
        assert_eq!(cfg.browser.cores_dir, PathBuf::from("/mnt/sd/cores"));
        assert!(cfg.browser.hide_datecode);
    }

    #[test]
    fn env_invalid_number_rejected() {
        let mut cfg = Config::default();
        let overrides = vars(&[("FOSD_INPUT_REPEAT_RATE_MS", "fast")]);
        let err = cfg
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("invalid number should fail");
        match err {
            FosdError::ConfigParse { context, details } => {
                assert_eq!(context, "env");
                assert!(details.contains("FOSD_INPUT_REPEAT_RATE_MS"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn trailing_slashes_are_stripped() {
        let mut cfg = Config::default();
        cfg.browser.games_dir = PathBuf::from("/media/fat/games/");
        cfg.normalize_paths();
        assert_eq!(cfg.browser.games_dir, PathBuf::from("/media/fat/games"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).expect_err("missing explicit config");
        assert_eq!(err.code(), "FOSD-1002");
    }

    #[test]
    fn toml_file_round_trips_partial_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fosd.toml");
        std::fs::write(
            &path,
            "[input]\nrepeat_rate_ms = 40\n\n[[input.repeat_exceptions]]\nscreen = \"misc\"\nrow = 2\n",
        )
        .expect("write config");
        let cfg = Config::load(Some(&path)).expect("config should load");
        assert_eq!(cfg.input.repeat_rate_ms, 40);
        assert_eq!(cfg.input.debounce_ms, 20);
        assert_eq!(cfg.input.repeat_exceptions.len(), 1);
        assert_eq!(cfg.input.repeat_exceptions[0].screen, StateKind::Misc);
        assert_eq!(cfg.paths.config_file, path);
    }
}
