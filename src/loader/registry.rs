//! Process-wide "current core" state.
//!
//! Readable by the title bar and the file browser; written only by the
//! configuration loader after a successful transfer.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::core::config::BrowserConfig;

/// Name shown while no core has been loaded.
pub const MENU_CORE_NAME: &str = "MENU";

/// What the loader records about the active core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoreInfo {
    /// Core name: image stem without the `_YYYYMMDD` build suffix.
    pub name: String,
    /// Image file the core was loaded from.
    pub image: PathBuf,
    /// Image directory relative to `cores_dir` (empty when outside it).
    pub dir: PathBuf,
    /// Per-core content directory, `games_dir/<name>`.
    pub content_root: PathBuf,
}

impl CoreInfo {
    /// Derive registry fields for `image` under the configured roots.
    #[must_use]
    pub fn for_image(image: &Path, cfg: &BrowserConfig) -> Self {
        let name = core_name_from_image(image);
        let dir = image
            .parent()
            .and_then(|parent| parent.strip_prefix(&cfg.cores_dir).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            content_root: cfg.games_dir.join(&name),
            image: image.to_path_buf(),
            dir,
            name,
        }
    }

    /// File name of the image, used to put the browser cursor back on it.
    #[must_use]
    pub fn image_file_name(&self) -> Option<String> {
        self.image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
    }
}

/// Shared handle to the current core. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct CoreRegistry {
    inner: Arc<RwLock<Option<CoreInfo>>>,
}

impl CoreRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the active core, `None` while the menu core runs.
    #[must_use]
    pub fn current(&self) -> Option<CoreInfo> {
        self.inner.read().clone()
    }

    /// Name for the title bar.
    #[must_use]
    pub fn core_name(&self) -> String {
        self.inner
            .read()
            .as_ref()
            .map_or_else(|| MENU_CORE_NAME.to_string(), |info| info.name.clone())
    }

    #[must_use]
    pub fn content_root(&self) -> Option<PathBuf> {
        self.inner.read().as_ref().map(|info| info.content_root.clone())
    }

    /// True while no core has been loaded.
    #[must_use]
    pub fn is_menu_core(&self) -> bool {
        self.inner.read().is_none()
    }

    pub(crate) fn publish(&self, info: CoreInfo) {
        *self.inner.write() = Some(info);
    }
}

/// Core name from an image path: `NES_20240131.rbf` → `NES`.
#[must_use]
pub fn core_name_from_image(image: &Path) -> String {
    let stem = image
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.rsplit_once('_') {
        Some((name, date))
            if !name.is_empty() && date.len() == 8 && date.chars().all(|c| c.is_ascii_digit()) =>
        {
            name.to_string()
        }
        _ => stem,
    }
}
