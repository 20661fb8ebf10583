//! Directory listing model: entries, selection cursor and viewport.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

/// Display name of the synthetic parent entry.
pub const PARENT_NAME: &str = "..";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
}

/// One entry of a scanned directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// On-disk file name.
    pub name: String,
    /// Display form (date suffix and extension stripped for core images).
    pub altname: String,
    pub kind: EntryKind,
    /// Six-digit `YYMMDD` build date of a core image.
    pub datecode: Option<String>,
    pub size: u64,
}

impl DirEntry {
    #[must_use]
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        Self {
            altname: name.clone(),
            name,
            kind: EntryKind::File,
            datecode: None,
            size,
        }
    }

    #[must_use]
    pub fn dir(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            altname: name.clone(),
            name,
            kind: EntryKind::Dir,
            datecode: None,
            size: 0,
        }
    }

    #[must_use]
    pub fn parent() -> Self {
        Self::dir(PARENT_NAME)
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    #[must_use]
    pub fn is_parent(&self) -> bool {
        self.is_dir() && self.name == PARENT_NAME
    }
}

/// Ordered entries plus cursor state.
///
/// Invariants: `selected < len()` whenever the listing is non-empty, and
/// `first_visible <= selected < first_visible + viewport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    entries: Vec<DirEntry>,
    selected: usize,
    first_visible: usize,
    viewport: usize,
}

impl DirectoryListing {
    #[must_use]
    pub fn new(entries: Vec<DirEntry>, viewport: usize) -> Self {
        Self {
            entries,
            selected: 0,
            first_visible: 0,
            viewport: viewport.max(1),
        }
    }

    #[must_use]
    pub fn empty(viewport: usize) -> Self {
        Self::new(Vec::new(), viewport)
    }

    #[must_use]
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn selected_index(&self) -> usize {
        self.selected
    }

    #[must_use]
    pub const fn first_visible(&self) -> usize {
        self.first_visible
    }

    #[must_use]
    pub const fn viewport(&self) -> usize {
        self.viewport
    }

    #[must_use]
    pub fn selected(&self) -> Option<&DirEntry> {
        self.entries.get(self.selected)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DirEntry> {
        self.entries.get(index)
    }

    /// Select `index`, clamped into range, and scroll it into view.
    pub fn select(&mut self, index: usize) {
        if self.entries.is_empty() {
            self.selected = 0;
            self.first_visible = 0;
            return;
        }
        self.selected = index.min(self.entries.len() - 1);
        self.clamp_viewport();
    }

    /// Move the cursor by `delta` rows, clamping at both ends.
    pub fn move_by(&mut self, delta: isize) {
        let target = self.selected.saturating_add_signed(delta);
        self.select(target);
    }

    pub fn page_up(&mut self) {
        if self.selected > self.first_visible {
            self.select(self.first_visible);
        } else {
            self.select(self.selected.saturating_sub(self.viewport));
        }
    }

    pub fn page_down(&mut self) {
        let last_visible = self.first_visible + self.viewport - 1;
        if self.selected < last_visible {
            self.select(last_visible);
        } else {
            self.select(self.selected.saturating_add(self.viewport));
        }
    }

    /// Put the cursor on the entry named `name`. Returns false when absent.
    pub fn select_name(&mut self, name: &str) -> bool {
        match self.entries.iter().position(|e| e.name == name) {
            Some(index) => {
                self.select(index);
                true
            }
            None => false,
        }
    }

    /// Index of the first entry whose display name starts with `prefix`,
    /// compared case-insensitively; the parent entry never matches.
    #[must_use]
    pub fn find_prefix(&self, prefix: &str) -> Option<usize> {
        if prefix.is_empty() {
            return None;
        }
        let prefix = prefix.to_lowercase();
        self.entries
            .iter()
            .position(|e| !e.is_parent() && display_key(e).to_lowercase().starts_with(&prefix))
    }

    /// Keep `selected` inside `[first_visible, first_visible + viewport)`.
    fn clamp_viewport(&mut self) {
        if self.selected < self.first_visible {
            self.first_visible = self.selected;
        } else if self.selected >= self.first_visible + self.viewport {
            self.first_visible = self.selected + 1 - self.viewport;
        }
        let max_first = self.entries.len().saturating_sub(self.viewport);
        if self.first_visible > max_first {
            self.first_visible = max_first.min(self.selected);
        }
    }
}

/// Name used for prefix jumps: the display name without a leading `_`.
fn display_key(entry: &DirEntry) -> &str {
    if entry.is_dir() {
        entry.altname.strip_prefix('_').unwrap_or(&entry.altname)
    } else {
        &entry.altname
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(n: usize, viewport: usize) -> DirectoryListing {
        DirectoryListing::new(
            (0..n).map(|i| DirEntry::file(format!("game{i:03}.nes"), 1)).collect(),
            viewport,
        )
    }

    fn assert_invariants(l: &DirectoryListing) {
        if !l.is_empty() {
            assert!(l.selected_index() < l.len());
            assert!(l.first_visible() <= l.selected_index());
            assert!(l.selected_index() < l.first_visible() + l.viewport());
        }
    }

    #[test]
    fn move_by_clamps_at_ends() {
        let mut l = listing(5, 16);
        l.move_by(-3);
        assert_eq!(l.selected_index(), 0);
        l.move_by(100);
        assert_eq!(l.selected_index(), 4);
        assert_invariants(&l);
    }

    #[test]
    fn viewport_follows_cursor() {
        let mut l = listing(40, 16);
        l.move_by(20);
        assert_eq!(l.selected_index(), 20);
        assert_eq!(l.first_visible(), 5);
        l.move_by(-18);
        assert_eq!(l.first_visible(), 2);
        assert_invariants(&l);
    }

    #[test]
    fn paging_jumps_to_window_edges_first() {
        let mut l = listing(40, 8);
        l.page_down();
        assert_eq!(l.selected_index(), 7);
        l.page_down();
        assert_eq!(l.selected_index(), 15);
        assert_eq!(l.first_visible(), 8);
        l.page_up();
        assert_eq!(l.selected_index(), 8);
        l.page_up();
        assert_eq!(l.selected_index(), 0);
        assert_invariants(&l);
    }

    #[test]
    fn select_name_and_prefix() {
        let mut l = DirectoryListing::new(
            vec![
                DirEntry::parent(),
                DirEntry::dir("_Arcade"),
                DirEntry::file("Contra.nes", 1),
                DirEntry::file("castlevania.nes", 1),
            ],
            16,
        );
        assert!(l.select_name("Contra.nes"));
        assert_eq!(l.selected_index(), 2);
        assert!(!l.select_name("missing"));
        assert_eq!(l.find_prefix("CAS"), Some(3));
        assert_eq!(l.find_prefix("arc"), Some(1));
        assert_eq!(l.find_prefix("."), None);
        assert_eq!(l.find_prefix("zz"), None);
    }

    #[test]
    fn empty_listing_has_no_selection() {
        let mut l = DirectoryListing::empty(16);
        l.move_by(3);
        l.page_down();
        assert!(l.selected().is_none());
        assert_eq!(l.selected_index(), 0);
    }
}
