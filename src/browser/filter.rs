//! Extension filter and selection-session option flags.

#![allow(missing_docs)]

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Extension set for core images (RBF bitstreams, MRA arcade descriptors, MGL launchers).
pub const CORE_EXTENSIONS: &str = "RBF,MRA,MGL";
/// Default extension for text-only sessions.
pub const TEXT_EXTENSION: &str = "TXT";

const WILDCARD: &str = "*";

/// Parsed extension list.
///
/// Accepts the comma-joined form (`"NES,FDS"`) and the packed 3-character
/// form (`"NESFDS"`). Each token is trimmed of trailing spaces and compared
/// case-insensitively. A `*` token, or an empty list, accepts every file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionFilter {
    tokens: Vec<String>,
    accept_all: bool,
}

impl ExtensionFilter {
    /// Parse a filter string. Never fails: malformed tokens are dropped.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let pieces: Vec<String> = if raw.contains(',') {
            raw.split(',').map(str::to_string).collect()
        } else {
            raw.chars()
                .collect::<Vec<_>>()
                .chunks(3)
                .map(|chunk| chunk.iter().collect())
                .collect()
        };

        let mut filter = Self::default();
        for piece in pieces {
            let token = piece.trim_end().trim_start_matches('.');
            if token.is_empty() {
                continue;
            }
            if token.contains(WILDCARD) {
                filter.accept_all = true;
                continue;
            }
            let upper = token.to_ascii_uppercase();
            if !filter.tokens.contains(&upper) {
                filter.tokens.push(upper);
            }
        }
        filter
    }

    /// Filter accepting everything.
    #[must_use]
    pub fn any() -> Self {
        Self {
            tokens: Vec::new(),
            accept_all: true,
        }
    }

    #[must_use]
    pub fn accepts_all(&self) -> bool {
        self.accept_all || self.tokens.is_empty()
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Whether a file named `name` passes the filter.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        if self.accepts_all() {
            return true;
        }
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.tokens.iter().any(|t| t.eq_ignore_ascii_case(ext)))
    }

    /// Canonical comma-joined form.
    #[must_use]
    pub fn to_filter_string(&self) -> String {
        let mut parts = self.tokens.clone();
        if self.accept_all {
            parts.push(WILDCARD.to_string());
        }
        parts.join(",")
    }
}

/// Option flags for one file-selection session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// Browse the core-image directory; the extension set is forced.
    pub cores: bool,
    /// Redirect the content root to the per-core save directory.
    pub saves: bool,
    /// Text-only browsing; defaults the extension to TXT.
    pub text: bool,
    /// Open the directory containing the starting path instead of entering it.
    pub no_enter: bool,
}

/// Filter plus flags, immutable for one selection session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionFilter {
    pub extensions: ExtensionFilter,
    pub options: ScanOptions,
}

impl SelectionFilter {
    #[must_use]
    pub fn new(extensions: &str, options: ScanOptions) -> Self {
        Self {
            extensions: ExtensionFilter::parse(extensions),
            options,
        }
    }

    #[must_use]
    pub fn cores() -> Self {
        Self::new(
            CORE_EXTENSIONS,
            ScanOptions {
                cores: true,
                ..ScanOptions::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_form_matches_case_insensitively() {
        let filter = ExtensionFilter::parse("nes,FDS ");
        assert!(filter.matches("Zelda.NES"));
        assert!(filter.matches("metroid.fds"));
        assert!(!filter.matches("sonic.md"));
        assert!(!filter.matches("NES"));
    }

    #[test]
    fn packed_form_splits_into_triples() {
        let filter = ExtensionFilter::parse("RBFMRAMGL");
        assert_eq!(filter.tokens(), ["RBF", "MRA", "MGL"]);
        assert!(filter.matches("NES_20240101.rbf"));
        assert!(filter.matches("1942.mra"));
    }

    #[test]
    fn packed_form_trims_short_tokens() {
        let filter = ExtensionFilter::parse("BINA  ");
        assert_eq!(filter.tokens(), ["BIN", "A"]);
        assert!(filter.matches("game.a"));
    }

    #[test]
    fn wildcard_and_empty_accept_everything() {
        assert!(ExtensionFilter::parse("NES,*").matches("readme"));
        assert!(ExtensionFilter::parse("").matches("anything.xyz"));
        assert!(ExtensionFilter::any().accepts_all());
    }

    #[test]
    fn canonical_string_round_trips() {
        let filter = ExtensionFilter::parse("nes,fds,*");
        assert_eq!(filter.to_filter_string(), "NES,FDS,*");
        assert_eq!(ExtensionFilter::parse(&filter.to_filter_string()), filter);
    }
}
