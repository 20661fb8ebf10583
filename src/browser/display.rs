//! Directory listing decoration for 32-column OSD rows.

#![allow(missing_docs)]

use crate::browser::listing::{DirEntry, DirectoryListing};
use crate::osd::{CONTINUATION_GLYPH, OSD_COLUMNS, OsdRow, RowArrow};

/// Names longer than this are split.
const NAME_FIELD: usize = 28;
/// Columns kept of a split name.
const NAME_TRIM: usize = 27;
/// Column where the datecode field starts.
const DATECODE_COLUMN: usize = 19;
const DIR_TAG_COLUMN: usize = 22;
const UPDIR_TAG_COLUMN: usize = 19;
const EMPTY_NOTICE_ROW: usize = 6;
const EMPTY_HOME_ROW: usize = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    /// Show the tail of a long selected name on an extra row.
    pub expand: bool,
    pub hide_datecode: bool,
    /// Cores mode: `_Dir` folders display without the underscore.
    pub cores: bool,
}

/// Context for the empty-listing notice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyNotice<'a> {
    /// Last component of the substituted home directory, when known.
    pub home: Option<&'a str>,
    pub prefix_active: bool,
}

/// One formatted entry: the row text and the tail for expanded display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedEntry {
    pub text: String,
    pub tail: Option<String>,
}

/// Format one entry into a 32-column row.
#[must_use]
pub fn format_entry(entry: &DirEntry, opts: &DisplayOptions) -> FormattedEntry {
    let mut row = [' '; OSD_COLUMNS];
    let name: Vec<char> = entry.altname.chars().collect();
    let mut len = name.len();
    let mut tail_len = 0;

    if len > NAME_FIELD {
        tail_len = if opts.expand {
            (len - NAME_TRIM).min(NAME_TRIM)
        } else {
            0
        };
        len = NAME_TRIM;
        row[NAME_FIELD] = CONTINUATION_GLYPH;
    }

    let skip = usize::from(opts.cores && entry.is_dir() && name.first() == Some(&'_'));
    for (col, ch) in name[skip..len].iter().enumerate() {
        row[1 + col] = *ch;
    }

    if entry.is_dir() {
        if entry.is_parent() {
            put(&mut row, UPDIR_TAG_COLUMN, " <UP-DIR>");
        } else {
            put(&mut row, DIR_TAG_COLUMN, " <DIR>");
        }
        tail_len = 0;
    } else if let Some(code) = shown_datecode(entry, opts) {
        let digits: Vec<char> = code.chars().collect();
        let field = format!(
            " {}{}.{}{}.{}{}",
            digits[0], digits[1], digits[2], digits[3], digits[4], digits[5]
        );
        put(&mut row, DATECODE_COLUMN, &field);
        if len >= DATECODE_COLUMN {
            row[DATECODE_COLUMN] = CONTINUATION_GLYPH;
            row[NAME_FIELD] = ' ';
        }
        tail_len = 0;
    }

    let tail = (tail_len > 0).then(|| {
        let start = name.len() - tail_len;
        let mut line = String::from(" ");
        line.extend(&name[start..]);
        line
    });

    FormattedEntry {
        text: row.iter().collect(),
        tail,
    }
}

/// Render the visible window of `listing`, one `OsdRow` per viewport row.
#[must_use]
pub fn render_listing(
    listing: &DirectoryListing,
    opts: &DisplayOptions,
    notice: &EmptyNotice<'_>,
) -> Vec<OsdRow> {
    let rows = listing.viewport();
    if listing.is_empty() {
        return render_empty(rows, notice);
    }

    let mut first = listing.first_visible();
    let selected = listing.selected_index();
    if opts.expand
        && selected == first + rows - 1
        && listing
            .selected()
            .is_some_and(|e| needs_tail_row(e, opts))
    {
        first += 1;
    }

    let count = listing.len();
    let mut out = Vec::with_capacity(rows);
    let mut index = first;
    while out.len() < rows {
        let row_no = out.len();
        let Some(entry) = listing.get(index) else {
            out.push(OsdRow::text(row_no, blank()));
            continue;
        };
        let formatted = format_entry(entry, opts);
        let is_selected = index == selected;
        let arrow = if row_no == 0 && first > 0 {
            RowArrow::Up
        } else if row_no == rows - 1 && index + 1 < count {
            RowArrow::Down
        } else {
            RowArrow::None
        };
        out.push(OsdRow {
            arrow,
            ..OsdRow::text(row_no, formatted.text).inverted(is_selected)
        });
        if is_selected
            && let Some(tail) = formatted.tail
            && out.len() < rows
        {
            out.push(OsdRow::text(out.len(), pad(&tail)).inverted(true));
        }
        index += 1;
    }
    out
}

fn render_empty(rows: usize, notice: &EmptyNotice<'_>) -> Vec<OsdRow> {
    (0..rows)
        .map(|i| {
            let text = match (i, notice.home) {
                (0, _) => pad("          No files!"),
                (EMPTY_NOTICE_ROW, Some(_)) if !notice.prefix_active => {
                    pad("      Missing directory:")
                }
                (EMPTY_HOME_ROW, Some(home)) if !notice.prefix_active => centered(home),
                _ => blank(),
            };
            OsdRow::text(i, text)
        })
        .collect()
}

fn needs_tail_row(entry: &DirEntry, opts: &DisplayOptions) -> bool {
    !entry.is_dir()
        && entry.altname.chars().count() > NAME_FIELD
        && shown_datecode(entry, opts).is_none()
}

fn shown_datecode<'e>(entry: &'e DirEntry, opts: &DisplayOptions) -> Option<&'e str> {
    if opts.hide_datecode {
        return None;
    }
    entry
        .datecode
        .as_deref()
        .filter(|code| code.len() == 6 && code.chars().all(|c| c.is_ascii_digit()))
}

fn put(row: &mut [char; OSD_COLUMNS], at: usize, text: &str) {
    for (offset, ch) in text.chars().enumerate() {
        if let Some(slot) = row.get_mut(at + offset) {
            *slot = ch;
        }
    }
}

fn centered(text: &str) -> String {
    let chars: Vec<char> = text.chars().take(NAME_TRIM).collect();
    let mut row = [' '; OSD_COLUMNS];
    let start = 1 + (NAME_TRIM - chars.len()) / 2;
    for (offset, ch) in chars.iter().enumerate() {
        row[start + offset] = *ch;
    }
    row.iter().collect()
}

fn pad(text: &str) -> String {
    let mut line: String = text.chars().take(OSD_COLUMNS).collect();
    let missing = OSD_COLUMNS.saturating_sub(line.chars().count());
    line.extend(std::iter::repeat_n(' ', missing));
    line
}

fn blank() -> String {
    " ".repeat(OSD_COLUMNS)
}
