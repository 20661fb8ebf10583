//! File-selection session: path policy, navigation and typed-prefix jumps.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use crate::browser::display::{DisplayOptions, EmptyNotice, render_listing};
use crate::browser::filter::{CORE_EXTENSIONS, ExtensionFilter, SelectionFilter, TEXT_EXTENSION};
use crate::browser::listing::{DirEntry, DirectoryListing};
use crate::browser::scan::{DirectoryScan, ScanMode, ScanRequest};
use crate::core::config::BrowserConfig;
use crate::core::paths::{is_strictly_under, normalize_syntactic, parent_of};
use crate::loader::registry::CoreRegistry;
use crate::logger::activity::{ActivityEvent, ActivityLog};
use crate::osd::OsdRow;

/// Navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Entry by listing index: directories are entered, files selected.
    Entry(usize),
    Parent,
}

/// Where a session starts, after the path policy has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStart {
    pub dir: PathBuf,
    pub cursor: Option<String>,
    pub extensions: ExtensionFilter,
    /// Last component of the substituted home, for the empty notice.
    pub home_name: Option<String>,
}

/// Browser over one selection session.
pub struct FileBrowser<S: DirectoryScan> {
    scanner: S,
    config: BrowserConfig,
    registry: CoreRegistry,
    log: ActivityLog,
    filter: SelectionFilter,
    /// Directory the listing shows.
    current_dir: PathBuf,
    /// Navigation never goes above this directory.
    floor: PathBuf,
    listing: DirectoryListing,
    home_name: Option<String>,
    prefix: String,
    last_typed: Option<u64>,
    typing_reset_ms: u64,
}

impl<S: DirectoryScan> FileBrowser<S> {
    pub fn new(
        scanner: S,
        config: BrowserConfig,
        typing_reset_ms: u64,
        registry: CoreRegistry,
        log: ActivityLog,
    ) -> Self {
        let viewport = config.visible_rows;
        Self {
            scanner,
            floor: config.cores_dir.clone(),
            current_dir: config.cores_dir.clone(),
            config,
            registry,
            log,
            filter: SelectionFilter::default(),
            listing: DirectoryListing::empty(viewport),
            home_name: None,
            prefix: String::new(),
            last_typed: None,
            typing_reset_ms,
        }
    }

    /// Apply the start-path policy for `filter`.
    ///
    /// Cores mode ignores `path` and opens the core directory with the cursor
    /// on the running core. Text mode keeps `path` and defaults the extension
    /// to TXT. General mode falls back to the per-core home directory when
    /// `path` is not strictly inside it or does not exist.
    #[must_use]
    pub fn resolve_start(&self, path: &Path, filter: &SelectionFilter) -> ResolvedStart {
        let options = filter.options;
        if options.cores {
            let core = self.registry.current();
            let dir = core
                .as_ref()
                .map_or_else(|| self.config.cores_dir.clone(), |c| self.config.cores_dir.join(&c.dir));
            return ResolvedStart {
                dir,
                cursor: core.and_then(|c| c.image_file_name()),
                extensions: ExtensionFilter::parse(CORE_EXTENSIONS),
                home_name: None,
            };
        }

        if options.text {
            let extensions = if filter.extensions.tokens().is_empty() {
                ExtensionFilter::parse(TEXT_EXTENSION)
            } else {
                filter.extensions.clone()
            };
            let (dir, cursor) = split_start(path, options.no_enter);
            return ResolvedStart {
                dir,
                cursor,
                extensions,
                home_name: None,
            };
        }

        let content_home = if self.registry.is_menu_core() {
            self.config.scripts_dir.clone()
        } else {
            self.registry
                .content_root()
                .unwrap_or_else(|| self.config.games_dir.clone())
        };
        let home_name = content_home
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let home = if options.saves {
            self.config.saves_dir.join(self.registry.core_name())
        } else {
            content_home
        };

        let (dir, cursor) = if is_strictly_under(path, &home) && path.exists() {
            split_start(path, options.no_enter)
        } else {
            (home, None)
        };
        ResolvedStart {
            dir,
            cursor,
            extensions: filter.extensions.clone(),
            home_name,
        }
    }

    /// Start a session at `path` and scan it.
    pub fn open(&mut self, path: &Path, filter: SelectionFilter) -> &DirectoryListing {
        let start = self.resolve_start(path, &filter);
        self.filter = SelectionFilter {
            extensions: start.extensions,
            options: filter.options,
        };
        self.filter.options.no_enter = false;
        self.home_name = start.home_name;
        self.floor = if start.dir.starts_with(&self.config.cores_dir) {
            self.config.cores_dir.clone()
        } else {
            PathBuf::from("/")
        };
        self.current_dir = start.dir;
        self.clear_prefix();
        let mode = start.cursor.map_or(ScanMode::Init, ScanMode::SetCursor);
        self.rescan(mode);
        &self.listing
    }

    /// Enter a directory, select a file, or go to the parent.
    pub fn navigate(&mut self, target: Target) -> &DirectoryListing {
        self.clear_prefix();
        match target {
            Target::Parent => self.go_parent(),
            Target::Entry(index) => match self.listing.get(index).cloned() {
                Some(entry) if entry.is_parent() => self.go_parent(),
                Some(entry) if entry.is_dir() => {
                    self.current_dir = self.current_dir.join(&entry.name);
                    self.rescan(ScanMode::Init);
                }
                Some(_) => self.listing.select(index),
                None => {}
            },
        }
        &self.listing
    }

    /// Add `c` to the typed prefix and jump to the first match.
    ///
    /// The prefix is forgotten when more than `typing_reset_ms` passed since
    /// the previous keystroke. Returns true when the cursor moved.
    pub fn type_char(&mut self, c: char, now: u64) -> bool {
        if self
            .last_typed
            .is_some_and(|last| now.saturating_sub(last) > self.typing_reset_ms)
        {
            self.prefix.clear();
        }
        self.last_typed = Some(now);
        self.prefix.push(c);
        self.jump_to_prefix()
    }

    /// Drop the last typed character, or go up a level when nothing is typed.
    pub fn backspace(&mut self, now: u64) {
        if self.prefix.pop().is_some() {
            self.last_typed = Some(now);
            self.jump_to_prefix();
        } else {
            self.navigate(Target::Parent);
        }
    }

    pub fn move_by(&mut self, delta: isize) {
        self.clear_prefix();
        self.listing.move_by(delta);
    }

    pub fn page_up(&mut self) {
        self.clear_prefix();
        self.listing.page_up();
    }

    pub fn page_down(&mut self) {
        self.clear_prefix();
        self.listing.page_down();
    }

    #[must_use]
    pub fn selected(&self) -> Option<&DirEntry> {
        self.listing.selected()
    }

    /// Full path of the selected entry.
    #[must_use]
    pub fn selected_path(&self) -> Option<PathBuf> {
        self.selected().map(|e| self.current_dir.join(&e.name))
    }

    #[must_use]
    pub fn listing(&self) -> &DirectoryListing {
        &self.listing
    }

    #[must_use]
    pub fn current_dir(&self) -> &Path {
        &self.current_dir
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn filter(&self) -> &SelectionFilter {
        &self.filter
    }

    /// Decorated OSD rows for the current window.
    #[must_use]
    pub fn render(&self, expand: bool) -> Vec<OsdRow> {
        let opts = DisplayOptions {
            expand: expand && self.config.browse_expand,
            hide_datecode: self.config.hide_datecode,
            cores: self.filter.options.cores,
        };
        let notice = EmptyNotice {
            home: self.home_name.as_deref(),
            prefix_active: !self.prefix.is_empty(),
        };
        render_listing(&self.listing, &opts, &notice)
    }

    // ──────────────────── internals ────────────────────

    fn clear_prefix(&mut self) {
        self.prefix.clear();
        self.last_typed = None;
    }

    fn jump_to_prefix(&mut self) -> bool {
        match self.listing.find_prefix(&self.prefix) {
            Some(index) if index != self.listing.selected_index() => {
                self.listing.select(index);
                true
            }
            _ => false,
        }
    }

    fn go_parent(&mut self) {
        if !self.has_parent() {
            return;
        }
        let child = self
            .current_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let Some(parent) = parent_of(&self.current_dir) else {
            return;
        };
        self.current_dir = parent;
        self.rescan(child.map_or(ScanMode::Init, ScanMode::SetCursor));
    }

    fn has_parent(&self) -> bool {
        is_strictly_under(&self.current_dir, &self.floor)
    }

    fn rescan(&mut self, mode: ScanMode) {
        self.current_dir = normalize_syntactic(&self.current_dir);
        let request = ScanRequest {
            path: &self.current_dir,
            mode,
            filter: &self.filter.extensions,
            options: self.filter.options,
            include_parent: self.has_parent(),
        };
        let viewport = self.config.visible_rows;
        match self.scanner.scan(&request) {
            Ok(outcome) => {
                self.log.record(ActivityEvent::ScanCompleted {
                    path: self.current_dir.clone(),
                    entries: outcome.entries.len(),
                });
                self.listing = DirectoryListing::new(outcome.entries, viewport);
                if let Some(cursor) = outcome.cursor {
                    self.listing.select(cursor);
                }
            }
            Err(err) => {
                self.log.record(ActivityEvent::ScanFailed {
                    path: self.current_dir.clone(),
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
                self.listing = DirectoryListing::empty(viewport);
            }
        }
    }
}

/// Split a start path into the directory to scan and the entry to select.
fn split_start(path: &Path, no_enter: bool) -> (PathBuf, Option<String>) {
    if (no_enter || !path.is_dir())
        && let Some(parent) = path.parent()
        && let Some(name) = path.file_name()
    {
        return (
            parent.to_path_buf(),
            Some(name.to_string_lossy().into_owned()),
        );
    }
    (path.to_path_buf(), None)
}
