//! Raw directory scan collaborator and its `std::fs` implementation.

#![allow(missing_docs)]

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::browser::filter::{ExtensionFilter, ScanOptions};
use crate::browser::listing::{DirEntry, EntryKind};
use crate::core::errors::{FosdError, Result};

/// How the scan positions the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    /// Fresh scan, cursor on the first entry.
    Init,
    /// Fresh scan, cursor on the entry with this on-disk name when present.
    SetCursor(String),
}

/// One request to the raw scan collaborator.
#[derive(Debug, Clone)]
pub struct ScanRequest<'a> {
    pub path: &'a Path,
    pub mode: ScanMode,
    pub filter: &'a ExtensionFilter,
    pub options: ScanOptions,
    /// Prepend a `..` entry.
    pub include_parent: bool,
}

/// Result of a scan: sorted entries plus the cursor the mode asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    pub entries: Vec<DirEntry>,
    pub cursor: Option<usize>,
}

/// Collaborator that reads a directory and returns it already sorted.
pub trait DirectoryScan {
    fn scan(&mut self, request: &ScanRequest<'_>) -> Result<ScanOutcome>;
}

/// Filesystem scanner.
///
/// Hides dot-files, lists directories before files, sorts each group
/// case-insensitively and caps the result at `max_entries`. Core images named
/// `Name_YYYYMMDD.ext` get `Name` as display name and `YYMMDD` as datecode.
#[derive(Debug, Clone)]
pub struct FsDirectoryScanner {
    max_entries: usize,
    datecode: Regex,
}

impl FsDirectoryScanner {
    pub fn new(max_entries: usize) -> Result<Self> {
        let datecode = Regex::new(r"^(.+)_(\d{2})(\d{2})(\d{2})(\d{2})$").map_err(|err| {
            FosdError::InvalidConfig {
                details: format!("datecode pattern: {err}"),
            }
        })?;
        Ok(Self {
            max_entries: max_entries.max(1),
            datecode,
        })
    }

    /// Split a core image name into display name and datecode.
    fn decorate(&self, name: &str, options: ScanOptions) -> (String, Option<String>) {
        if !options.cores {
            return (name.to_string(), None);
        }
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(name);
        match self.datecode.captures(stem) {
            Some(caps) => {
                let display = caps.get(1).map_or(stem, |m| m.as_str()).to_string();
                let datecode = [3, 4, 5]
                    .iter()
                    .filter_map(|i| caps.get(*i).map(|m| m.as_str()))
                    .collect::<String>();
                (display, Some(datecode))
            }
            None => (stem.to_string(), None),
        }
    }
}

impl DirectoryScan for FsDirectoryScanner {
    fn scan(&mut self, request: &ScanRequest<'_>) -> Result<ScanOutcome> {
        let read = fs::read_dir(request.path).map_err(|err| FosdError::Scan {
            path: request.path.to_path_buf(),
            details: err.to_string(),
        })?;

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry_result in read {
            let Ok(entry) = entry_result else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            // Follow symlinks so linked game folders browse like real ones.
            let Ok(meta) = fs::metadata(entry.path()) else {
                continue;
            };
            if meta.is_dir() {
                dirs.push(DirEntry::dir(name));
            } else if request.filter.matches(&name) {
                let (altname, datecode) = self.decorate(&name, request.options);
                files.push(DirEntry {
                    name,
                    altname,
                    kind: EntryKind::File,
                    datecode,
                    size: meta.len(),
                });
            }
        }

        dirs.sort_by_cached_key(|e| e.name.to_lowercase());
        files.sort_by_cached_key(|e| e.altname.to_lowercase());

        let mut entries = Vec::with_capacity(dirs.len() + files.len() + 1);
        if request.include_parent {
            entries.push(DirEntry::parent());
        }
        entries.extend(dirs);
        entries.extend(files);
        entries.truncate(self.max_entries);

        let cursor = match &request.mode {
            ScanMode::Init => None,
            ScanMode::SetCursor(name) => entries.iter().position(|e| &e.name == name),
        };
        Ok(ScanOutcome { entries, cursor })
    }
}
