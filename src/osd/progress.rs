//! Progress bar state for long-running operations.

#![allow(missing_docs)]

/// Partial-cell glyphs, emptiest first; the last one is a full cell.
const PROGRESS_GLYPHS: [char; 6] = ['\u{8C}', '\u{8E}', '\u{8F}', '\u{90}', '\u{91}', '\u{7F}'];
const FULL_CELL: char = '\u{7F}';
/// Cells in the bar.
pub const PROGRESS_CELLS: usize = 28;
/// Highest glyph index: every cell full.
pub const PROGRESS_MAX: u64 = (PROGRESS_GLYPHS.len() * PROGRESS_CELLS - 1) as u64;

/// Current progress ratio and the glyph index it renders as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    title: String,
    text: String,
    current: u64,
    max: u64,
    glyph_index: Option<u64>,
}

impl ProgressState {
    /// Record a progress report.
    ///
    /// Returns true when the rendered bar changed and must be redrawn.
    /// Reporting `(0, 0)` clears the state; that counts as a change only if
    /// a bar was showing.
    pub fn report(&mut self, title: &str, text: &str, current: u64, max: u64) -> bool {
        if current == 0 && max == 0 {
            let was_shown = self.glyph_index.is_some();
            *self = Self::default();
            return was_shown;
        }

        let index = if max == 0 {
            PROGRESS_MAX
        } else {
            let scaled = u128::from(current) * u128::from(PROGRESS_MAX) / u128::from(max);
            u64::try_from(scaled).unwrap_or(u64::MAX).min(PROGRESS_MAX)
        };
        title.clone_into(&mut self.title);
        text.clone_into(&mut self.text);
        self.current = current;
        self.max = max;
        if self.glyph_index == Some(index) {
            return false;
        }
        self.glyph_index = Some(index);
        true
    }

    #[must_use]
    pub const fn glyph_index(&self) -> Option<u64> {
        self.glyph_index
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.glyph_index.is_some()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub const fn ratio(&self) -> (u64, u64) {
        (self.current, self.max)
    }

    /// Bar text: full cells followed by one partial cell.
    #[must_use]
    pub fn bar(&self) -> String {
        let Some(index) = self.glyph_index else {
            return String::new();
        };
        let glyphs = PROGRESS_GLYPHS.len() as u64;
        let full = usize::try_from(index / glyphs).unwrap_or(PROGRESS_CELLS);
        let partial = usize::try_from(index % glyphs).unwrap_or(0);
        let mut bar: String = std::iter::repeat_n(FULL_CELL, full).collect();
        if full < PROGRESS_CELLS {
            bar.push(PROGRESS_GLYPHS[partial]);
        }
        bar
    }

    /// Overlay rows: two blank lines, the text (27 columns), then the bar.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        if !self.is_active() {
            return Vec::new();
        }
        let text: String = self.text.chars().take(27).collect();
        vec![
            String::new(),
            String::new(),
            format!(" {text}"),
            format!(" {}", self.bar()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_change_only_when_glyph_moves() {
        let mut p = ProgressState::default();
        assert!(p.report("Loading", "NES", 0, 1_000_000));
        assert!(!p.report("Loading", "NES", 10, 1_000_000));
        assert!(p.report("Loading", "NES", 500_000, 1_000_000));
        assert_eq!(p.glyph_index(), Some(83));
    }

    #[test]
    fn zero_zero_clears() {
        let mut p = ProgressState::default();
        assert!(!p.report("", "", 0, 0));
        p.report("Loading", "NES", 5, 10);
        assert!(p.report("", "", 0, 0));
        assert!(!p.is_active());
        assert!(p.lines().is_empty());
    }

    #[test]
    fn bar_fills_cells_then_partial_glyph() {
        let mut p = ProgressState::default();
        p.report("t", "x", 1, 1);
        assert_eq!(p.bar().chars().count(), PROGRESS_CELLS);
        assert!(p.bar().chars().all(|c| c == FULL_CELL));

        p.report("t", "x", 7, PROGRESS_MAX);
        let bar: Vec<char> = p.bar().chars().collect();
        assert_eq!(bar, vec![FULL_CELL, '\u{8E}']);
    }

    #[test]
    fn text_line_truncated_to_27() {
        let mut p = ProgressState::default();
        p.report("t", &"x".repeat(40), 1, 2);
        assert_eq!(p.lines()[2].chars().count(), 28);
    }
}
