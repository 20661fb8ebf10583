//! Text layout helpers for menu screens.
//!
//! Pure functions over strings and indices; `MenuMachine::render` decides
//! what to draw and hands the rows to the OSD surface.

#![allow(missing_docs)]

use crate::osd::{OSD_COLUMNS, OsdRow, RowArrow};

/// Milliseconds per column of help-text scroll.
pub const HELP_SCROLL_MS: u64 = 150;

/// Split `text` into rows of at most `width` characters, breaking on spaces
/// where possible.
#[must_use]
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let word_len = word.chars().count();
            let line_len = line.chars().count();
            if line_len > 0 && line_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
            // A single word longer than a row is hard-split.
            while line.chars().count() > width {
                let head: String = line.chars().take(width).collect();
                let tail: String = line.chars().skip(width).collect();
                lines.push(head);
                line = tail;
            }
        }
        lines.push(line);
    }
    lines
}

/// First item index of the page window containing `row`.
#[must_use]
pub const fn page_start(row: usize, visible: usize) -> usize {
    if visible == 0 {
        return 0;
    }
    row / visible * visible
}

/// Scroll indicator for window slot `slot` of a list with `count` items
/// whose window starts at `first`.
#[must_use]
pub const fn window_arrow(slot: usize, first: usize, visible: usize, count: usize) -> RowArrow {
    if slot == 0 && first > 0 {
        RowArrow::Up
    } else if slot + 1 == visible && first + visible < count {
        RowArrow::Down
    } else {
        RowArrow::None
    }
}

/// One row of a scrolling marquee over `text`, `elapsed_ms` after it started.
#[must_use]
pub fn help_marquee(text: &str, elapsed_ms: u64) -> String {
    let padded: Vec<char> = text.chars().chain(std::iter::repeat_n(' ', OSD_COLUMNS)).collect();
    let len = padded.len() as u64;
    let offset = usize::try_from((elapsed_ms / HELP_SCROLL_MS) % len).unwrap_or(0);
    padded
        .iter()
        .cycle()
        .skip(offset)
        .take(OSD_COLUMNS)
        .collect()
}

/// Menu item row: one leading space, label, optional `: value`.
#[must_use]
pub fn item_row(index: usize, label: &str, value: Option<&str>) -> OsdRow {
    let text = match value {
        Some(value) => format!(" {label}: {value}"),
        None => format!(" {label}"),
    };
    OsdRow::text(index, truncate(&text))
}

fn truncate(text: &str) -> String {
    text.chars().take(OSD_COLUMNS).collect()
}

/// Centre `text` within a row.
#[must_use]
pub fn centered(text: &str) -> String {
    let len = text.chars().count().min(OSD_COLUMNS);
    let pad = (OSD_COLUMNS - len) / 2;
    let mut out = " ".repeat(pad);
    out.extend(text.chars().take(OSD_COLUMNS));
    out
}
