//! OSD render collaborator: the surface the menu and browser draw rows on.
//!
//! Glyph rasterization belongs to the surface implementation; this crate only
//! decides which characters go on which row and with what attributes.

#![allow(missing_docs)]

pub mod progress;

pub use progress::ProgressState;

/// Characters per OSD row.
pub const OSD_COLUMNS: usize = 32;
/// Glyph marking a truncated name.
pub const CONTINUATION_GLYPH: char = '\u{16}';

/// Scroll indicator drawn at the left edge of a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowArrow {
    #[default]
    None,
    Up,
    Down,
}

/// One row write request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsdRow {
    pub index: usize,
    pub text: String,
    pub invert: bool,
    pub stipple: bool,
    pub arrow: RowArrow,
    pub background: bool,
    /// Inverted column span `[start, end)`; `None` inverts the whole row.
    pub invert_range: Option<(usize, usize)>,
}

impl OsdRow {
    #[must_use]
    pub fn text(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    #[must_use]
    pub fn stippled(mut self, stipple: bool) -> Self {
        self.stipple = stipple;
        self
    }
}

/// Surface the menu machine renders on. Callers never own the pixels.
pub trait OsdSurface {
    fn write_row(&mut self, row: OsdRow);
    /// Rows available for content (8 or 16).
    fn visible_rows(&self) -> usize;
    fn set_title(&mut self, title: &str);
    fn enable(&mut self);
    fn disable(&mut self);
}

/// In-memory surface used by tests and the CLI.
#[derive(Debug, Clone)]
pub struct TextOsd {
    rows: Vec<OsdRow>,
    title: String,
    enabled: bool,
    writes: usize,
}

impl TextOsd {
    #[must_use]
    pub fn new(visible_rows: usize) -> Self {
        Self {
            rows: (0..visible_rows).map(|i| OsdRow::text(i, "")).collect(),
            title: String::new(),
            enabled: false,
            writes: 0,
        }
    }

    #[must_use]
    pub fn rows(&self) -> &[OsdRow] {
        &self.rows
    }

    #[must_use]
    pub fn row_text(&self, index: usize) -> &str {
        self.rows.get(index).map_or("", |r| r.text.as_str())
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Total row writes since creation.
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    /// Plain-text dump, one line per row, trailing spaces trimmed.
    #[must_use]
    pub fn dump(&self) -> String {
        self.rows
            .iter()
            .map(|r| r.text.trim_end())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OsdSurface for TextOsd {
    fn write_row(&mut self, row: OsdRow) {
        self.writes += 1;
        if let Some(slot) = self.rows.get_mut(row.index) {
            *slot = row;
        }
    }

    fn visible_rows(&self) -> usize {
        self.rows.len()
    }

    fn set_title(&mut self, title: &str) {
        title.clone_into(&mut self.title);
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }
}

/// Write `lines` to the first rows and blank the rest.
pub fn write_lines<S: OsdSurface + ?Sized>(surface: &mut S, lines: &[String]) {
    for index in 0..surface.visible_rows() {
        let text = lines.get(index).cloned().unwrap_or_default();
        surface.write_row(OsdRow::text(index, text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_osd_records_rows_and_ignores_out_of_range() {
        let mut osd = TextOsd::new(8);
        osd.write_row(OsdRow::text(2, " Hello").inverted(true));
        osd.write_row(OsdRow::text(9, "dropped"));
        assert_eq!(osd.row_text(2), " Hello");
        assert!(osd.rows()[2].invert);
        assert_eq!(osd.writes(), 2);
        assert_eq!(osd.rows().len(), 8);
    }

    #[test]
    fn write_lines_blanks_remaining_rows() {
        let mut osd = TextOsd::new(8);
        osd.write_row(OsdRow::text(5, "stale"));
        write_lines(&mut osd, &["a".to_string(), "b".to_string()]);
        assert_eq!(osd.row_text(1), "b");
        assert_eq!(osd.row_text(5), "");
    }
}
