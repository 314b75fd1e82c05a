//! Terminal lines
//!
//! A line owns one row of cells plus flags describing its wrapping
//! behavior: `WRAPPABLE` records whether autowrap was allowed when the
//! line was written, `WRAPPED` marks that the line's last cell flowed
//! into the following line, and `MARKED` is a user annotation.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::cell::{Cell, GraphicsAttributes};

bitflags! {
    /// Per-line flags
    ///
    /// Serialization comes from the bitflags `serde` feature.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct LineFlags: u8 {
        /// Text reflow may rewrap this line on resize
        const WRAPPABLE = 1 << 0;
        /// The line's content continues on the next line
        const WRAPPED   = 1 << 1;
        /// User-set mark (prompt jumping and the like)
        const MARKED    = 1 << 2;
    }
}

impl LineFlags {
    /// The flags a rewrapped continuation inherits from its origin line
    pub fn inheritable(self) -> LineFlags {
        self & (LineFlags::WRAPPABLE | LineFlags::MARKED)
    }
}

/// One row of the grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    cells: Vec<Cell>,
    flags: LineFlags,
}

impl Line {
    /// A blank line of `columns` cells carrying `attributes`
    pub fn new(columns: usize, attributes: GraphicsAttributes, flags: LineFlags) -> Self {
        Self {
            cells: (0..columns).map(|_| Cell::blank(attributes)).collect(),
            flags,
        }
    }

    /// Build a line from existing cells
    pub fn from_cells(cells: Vec<Cell>, flags: LineFlags) -> Self {
        Self { cells, flags }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, column: usize) -> Option<&Cell> {
        self.cells.get(column)
    }

    pub fn cell_mut(&mut self, column: usize) -> Option<&mut Cell> {
        self.cells.get_mut(column)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [Cell] {
        &mut self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    pub fn flags(&self) -> LineFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: LineFlags) {
        self.flags = flags;
    }

    pub fn wrappable(&self) -> bool {
        self.flags.contains(LineFlags::WRAPPABLE)
    }

    pub fn set_wrappable(&mut self, enabled: bool) {
        self.flags.set(LineFlags::WRAPPABLE, enabled);
    }

    pub fn wrapped(&self) -> bool {
        self.flags.contains(LineFlags::WRAPPED)
    }

    pub fn set_wrapped(&mut self, enabled: bool) {
        self.flags.set(LineFlags::WRAPPED, enabled);
    }

    pub fn marked(&self) -> bool {
        self.flags.contains(LineFlags::MARKED)
    }

    pub fn set_marked(&mut self, enabled: bool) {
        self.flags.set(LineFlags::MARKED, enabled);
    }

    /// Reset every cell to blank with the given rendition
    pub fn reset(&mut self, attributes: GraphicsAttributes) {
        for cell in &mut self.cells {
            cell.reset(attributes);
        }
        self.flags &= LineFlags::WRAPPABLE;
    }

    /// True when every cell is empty
    pub fn blank(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }

    /// Truncate or pad to exactly `columns` cells
    pub fn resize(&mut self, columns: usize, attributes: GraphicsAttributes) {
        if columns < self.cells.len() {
            self.cells.truncate(columns);
            // A wide character whose trailing half was cut off is blanked
            if let Some(last) = self.cells.last_mut() {
                if last.width() >= 2 {
                    last.reset(attributes);
                }
            }
        } else {
            self.cells.resize_with(columns, || Cell::blank(attributes));
        }
    }

    /// Rewrap step: trim trailing blank default-rendition cells, then
    /// split off everything past `columns`. The returned overflow goes to
    /// the caller, which re-inserts it into the next line and marks this
    /// line `WRAPPED`.
    pub fn reflow(&mut self, columns: usize) -> Vec<Cell> {
        let default = GraphicsAttributes::default();
        let mut keep = self
            .cells
            .iter()
            .rposition(|cell| !cell.is_blank_with(&default))
            .map_or(0, |i| i + 1);
        // Keep the trailing half of a wide character with its lead cell
        if keep < self.cells.len() && self.cells[keep].is_continuation() {
            keep += 1;
        }
        self.cells.truncate(keep);

        if self.cells.len() <= columns {
            return Vec::new();
        }

        // Never split a wide character across the boundary
        let mut cut = columns;
        if cut > 0 && self.cells[cut].is_continuation() {
            cut -= 1;
        }
        self.cells.split_off(cut)
    }

    /// Shift `count` cells out on the left, filling on the right with
    /// clones of `fill`. Used for horizontal scrolling inside left/right
    /// margins. Returns the shifted-out cells.
    pub fn shift_left(&mut self, count: usize, fill: Cell) -> Vec<Cell> {
        let count = count.min(self.cells.len());
        let removed: Vec<Cell> = self.cells.drain(..count).collect();
        let attributes = *fill.attributes();
        self.cells.resize(self.cells.len() + count, fill);
        self.repair_wide_pairs(attributes);
        removed
    }

    /// The cells up to and including the last non-blank one
    pub fn trim_blank_right(&self) -> &[Cell] {
        let keep = self
            .cells
            .iter()
            .rposition(|cell| !cell.is_empty())
            .map_or(0, |i| i + 1);
        &self.cells[..keep]
    }

    /// Insert `count` blank cells at `column`, shifting the tail right;
    /// cells pushed past `right` (inclusive) are dropped
    pub fn insert_cells(
        &mut self,
        column: usize,
        count: usize,
        right: usize,
        attributes: GraphicsAttributes,
    ) {
        let right = right.min(self.cells.len().saturating_sub(1));
        if column > right {
            return;
        }
        let count = count.min(right - column + 1);
        for _ in 0..count {
            self.cells.remove(right);
            self.cells.insert(column, Cell::blank(attributes));
        }
        self.repair_wide_pairs(attributes);
    }

    /// Delete `count` cells at `column`, shifting the tail left and
    /// back-filling blanks at `right` (inclusive)
    pub fn delete_cells(
        &mut self,
        column: usize,
        count: usize,
        right: usize,
        attributes: GraphicsAttributes,
    ) {
        let right = right.min(self.cells.len().saturating_sub(1));
        if column > right {
            return;
        }
        let count = count.min(right - column + 1);
        for _ in 0..count {
            self.cells.remove(column);
            self.cells.insert(right, Cell::blank(attributes));
        }
        self.repair_wide_pairs(attributes);
    }

    /// Blank the cells in `[from, to]` with the given rendition
    pub fn erase_range(&mut self, from: usize, to: usize, attributes: GraphicsAttributes) {
        let to = to.min(self.cells.len().saturating_sub(1));
        for cell in self.cells[from.min(to)..=to].iter_mut() {
            cell.reset(attributes);
        }
        self.repair_wide_pairs(attributes);
    }

    /// Blank any wide cell whose trailing half went missing and any
    /// continuation whose lead did. Shifting and erasing operations can
    /// split a pair; the halves must not survive alone.
    pub fn repair_wide_pairs(&mut self, attributes: GraphicsAttributes) {
        let len = self.cells.len();
        for i in 0..len {
            let orphaned = if self.cells[i].is_continuation() {
                i == 0 || self.cells[i - 1].width() < 2
            } else if self.cells[i].width() >= 2 {
                i + 1 >= len || !self.cells[i + 1].is_continuation()
            } else {
                false
            };
            if orphaned {
                self.cells[i].reset(attributes);
            }
        }
    }

    /// The line's text, blanks rendered as spaces
    pub fn to_utf8(&self) -> String {
        let mut out = String::with_capacity(self.cells.len());
        for cell in &self.cells {
            if cell.is_continuation() {
                continue;
            }
            if cell.text().is_empty() {
                out.push(' ');
            } else {
                out.push_str(cell.text());
            }
        }
        out
    }

    /// The line's text without trailing blanks
    pub fn to_utf8_trimmed(&self) -> String {
        let mut out = self.to_utf8();
        let trimmed = out.trim_end_matches(' ').len();
        out.truncate(trimmed);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellFlags;

    fn line_of(text: &str, columns: usize) -> Line {
        let mut line = Line::new(columns, GraphicsAttributes::default(), LineFlags::WRAPPABLE);
        for (i, c) in text.chars().enumerate() {
            line.cell_mut(i).unwrap().set_character(c);
        }
        line
    }

    #[test]
    fn test_new_line() {
        let line = Line::new(80, GraphicsAttributes::default(), LineFlags::WRAPPABLE);
        assert_eq!(line.len(), 80);
        assert!(line.blank());
        assert!(line.wrappable());
        assert!(!line.wrapped());
    }

    #[test]
    fn test_to_utf8() {
        let line = line_of("Hi", 10);
        assert_eq!(line.to_utf8(), "Hi        ");
        assert_eq!(line.to_utf8_trimmed(), "Hi");
    }

    #[test]
    fn test_reflow_returns_overflow() {
        let mut line = line_of("ABCDEF", 10);
        let overflow = line.reflow(4);
        assert_eq!(line.len(), 4);
        assert_eq!(line.to_utf8(), "ABCD");
        assert_eq!(overflow.len(), 2);
        assert_eq!(overflow[0].text(), "E");
        assert_eq!(overflow[1].text(), "F");
    }

    #[test]
    fn test_reflow_trims_trailing_blanks() {
        let mut line = line_of("AB", 10);
        let overflow = line.reflow(4);
        assert!(overflow.is_empty());
        assert_eq!(line.len(), 2);
    }

    #[test]
    fn test_reflow_keeps_wide_char_whole() {
        let mut line = Line::new(6, GraphicsAttributes::default(), LineFlags::WRAPPABLE);
        line.cell_mut(0).unwrap().set_character('A');
        line.cell_mut(1).unwrap().set_character('世');
        line.cell_mut(2).unwrap().set_continuation();
        line.cell_mut(3).unwrap().set_character('B');

        // A cut at column 2 would land on the continuation cell
        let overflow = line.reflow(2);
        assert_eq!(line.len(), 1);
        assert_eq!(overflow[0].text(), "世");
        assert!(overflow[1].is_continuation());
        assert_eq!(overflow[2].text(), "B");
    }

    #[test]
    fn test_shift_left() {
        let mut line = line_of("ABCDE", 5);
        let removed = line.shift_left(2, Cell::new());
        assert_eq!(removed.len(), 2);
        assert_eq!(removed[0].text(), "A");
        assert_eq!(line.to_utf8(), "CDE  ");
        assert_eq!(line.len(), 5);
    }

    #[test]
    fn test_insert_cells() {
        let mut line = line_of("ABCDE", 5);
        line.insert_cells(1, 2, 4, GraphicsAttributes::default());
        assert_eq!(line.to_utf8(), "A  BC");
    }

    #[test]
    fn test_delete_cells() {
        let mut line = line_of("ABCDE", 5);
        line.delete_cells(1, 2, 4, GraphicsAttributes::default());
        assert_eq!(line.to_utf8(), "ADE  ");
    }

    #[test]
    fn test_delete_respects_right_margin() {
        let mut line = line_of("ABCDE", 5);
        // Margin ends at column index 2; D and E must not move
        line.delete_cells(0, 2, 2, GraphicsAttributes::default());
        assert_eq!(line.to_utf8(), "C  DE");
    }

    #[test]
    fn test_erase_range() {
        let mut line = line_of("ABCDE", 5);
        line.erase_range(1, 3, GraphicsAttributes::default());
        assert_eq!(line.to_utf8(), "A   E");
    }

    #[test]
    fn test_trim_blank_right() {
        let line = line_of("AB", 10);
        assert_eq!(line.trim_blank_right().len(), 2);
    }

    #[test]
    fn test_reset_clears_wrapped_but_not_wrappable() {
        let mut line = line_of("AB", 4);
        line.set_wrapped(true);
        line.set_marked(true);
        line.reset(GraphicsAttributes::default());
        assert!(line.wrappable());
        assert!(!line.wrapped());
        assert!(!line.marked());
    }

    #[test]
    fn test_inheritable_flags() {
        let flags = LineFlags::WRAPPABLE | LineFlags::WRAPPED | LineFlags::MARKED;
        assert_eq!(
            flags.inheritable(),
            LineFlags::WRAPPABLE | LineFlags::MARKED
        );
    }

    #[test]
    fn test_blank_with_styled_cells_is_not_trimmed() {
        let mut line = Line::new(6, GraphicsAttributes::default(), LineFlags::WRAPPABLE);
        line.cell_mut(0).unwrap().set_character('A');
        let mut styled = GraphicsAttributes::default();
        styled.flags.insert(CellFlags::INVERSE);
        line.cell_mut(5).unwrap().reset(styled);

        // The styled trailing blank survives the trim
        let overflow = line.reflow(3);
        assert_eq!(overflow.len(), 3);
    }
}
