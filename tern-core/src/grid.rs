//! The screen grid: main page plus scrollback
//!
//! One deque of lines backs both the scrollback history and the visible
//! main page; the last `size.height` lines are the page, everything in
//! front of them is history. Coordinates are 1-based with row 1 at the
//! top of the main page; row 0 and negative rows address scrollback
//! lines upward.
//!
//! ```text
//!      +0========================-3+   <-- scrollback top
//!      |1                        -2|
//!      |2   scrollback history   -1|
//!      |3                         0|   <-- scrollback bottom
//!      +4-------------------------1+   <-- main page top
//!      |5                         2|
//!      |6   main page area        3|
//!      |7                         4|   <-- main page bottom
//!      +---------------------------+
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, GraphicsAttributes};
use crate::line::{Line, LineFlags};

/// Main page dimensions in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
        }
    }
}

/// 1-based cell address; row ≤ 0 reaches into scrollback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: i32,
    pub column: i32,
}

impl Coordinate {
    pub fn new(row: i32, column: i32) -> Self {
        Self { row, column }
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self { row: 1, column: 1 }
    }
}

/// One inclusive 1-based range of a margin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginRange {
    pub from: usize,
    pub to: usize,
}

impl MarginRange {
    pub fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    pub fn length(&self) -> usize {
        self.to - self.from + 1
    }

    pub fn contains(&self, value: usize) -> bool {
        self.from <= value && value <= self.to
    }
}

/// The rectangle scrolling operations act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margin {
    /// Top and bottom rows
    pub vertical: MarginRange,
    /// Left and right columns
    pub horizontal: MarginRange,
}

impl Margin {
    /// The margin covering the whole main page
    pub fn full(size: Size) -> Self {
        Self {
            vertical: MarginRange::new(1, size.height.max(1)),
            horizontal: MarginRange::new(1, size.width.max(1)),
        }
    }

    /// True when the margin spans the entire main page
    pub fn covers(&self, size: Size) -> bool {
        self.vertical.from == 1
            && self.vertical.to == size.height
            && self.horizontal.from == 1
            && self.horizontal.to == size.width
    }
}

/// Main page plus bounded scrollback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    lines: VecDeque<Line>,
    size: Size,
    reflow_on_resize: bool,
    max_history_line_count: Option<usize>,
}

impl Grid {
    /// Create a grid with a blank main page and empty scrollback
    pub fn new(size: Size, reflow_on_resize: bool, max_history_line_count: Option<usize>) -> Self {
        let size = Size::new(size.width.max(1), size.height.max(1));
        let lines = (0..size.height)
            .map(|_| Line::new(size.width, GraphicsAttributes::default(), LineFlags::WRAPPABLE))
            .collect();
        Self {
            lines,
            size,
            reflow_on_resize,
            max_history_line_count,
        }
    }

    pub fn screen_size(&self) -> Size {
        self.size
    }

    pub fn reflow_on_resize(&self) -> bool {
        self.reflow_on_resize
    }

    pub fn set_reflow_on_resize(&mut self, enabled: bool) {
        self.reflow_on_resize = enabled;
    }

    pub fn max_history_line_count(&self) -> Option<usize> {
        self.max_history_line_count
    }

    pub fn set_max_history_line_count(&mut self, count: Option<usize>) {
        self.max_history_line_count = count;
        self.clamp_history();
    }

    /// Number of scrollback lines currently retained
    pub fn history_line_count(&self) -> usize {
        self.lines.len() - self.size.height
    }

    /// Total line count across scrollback and main page
    pub fn total_line_count(&self) -> usize {
        self.lines.len()
    }

    /// Convert a relative row (1-based, ≤ 0 for scrollback) into an
    /// absolute deque index
    pub fn to_absolute(&self, row: i32) -> usize {
        let absolute = self.history_line_count() as i32 + row - 1;
        debug_assert!(
            absolute >= 0 && (absolute as usize) < self.lines.len(),
            "relative row {row} out of range"
        );
        absolute.clamp(0, self.lines.len() as i32 - 1) as usize
    }

    /// Convert an absolute deque index into a relative row
    pub fn to_relative(&self, absolute: usize) -> i32 {
        absolute as i32 - self.history_line_count() as i32 + 1
    }

    pub fn absolute_line(&self, index: usize) -> &Line {
        &self.lines[index]
    }

    pub fn absolute_line_mut(&mut self, index: usize) -> &mut Line {
        &mut self.lines[index]
    }

    /// Line at a relative row (1..=height is the main page)
    pub fn line(&self, row: i32) -> &Line {
        &self.lines[self.to_absolute(row)]
    }

    pub fn line_mut(&mut self, row: i32) -> &mut Line {
        let index = self.to_absolute(row);
        &mut self.lines[index]
    }

    /// Cell at a 1-based coordinate; row ≤ 0 reads scrollback
    pub fn at(&self, coordinate: Coordinate) -> &Cell {
        let line = self.line(coordinate.row);
        let column = Self::clamp_column(coordinate.column, line.len());
        line.cell(column).expect("column clamped into range")
    }

    pub fn at_mut(&mut self, coordinate: Coordinate) -> &mut Cell {
        let line = self.line_mut(coordinate.row);
        let column = Self::clamp_column(coordinate.column, line.len());
        line.cell_mut(column).expect("column clamped into range")
    }

    fn clamp_column(column: i32, width: usize) -> usize {
        debug_assert!(
            column >= 1 && column <= width as i32,
            "column {column} out of range"
        );
        (column.clamp(1, width.max(1) as i32) - 1) as usize
    }

    fn blank_line(&self, attributes: GraphicsAttributes) -> Line {
        Line::new(self.size.width, attributes, LineFlags::WRAPPABLE)
    }

    /// Scroll up within `margin` by `n` lines, blanking the freed rows
    /// with `attributes`.
    ///
    /// Lines pushed off a full-page margin move into scrollback; a
    /// restricted margin discards them.
    pub fn scroll_up(&mut self, n: usize, attributes: GraphicsAttributes, margin: Margin) {
        let n = n.min(margin.vertical.length());
        if n == 0 {
            return;
        }

        if margin.covers(self.size) {
            for _ in 0..n {
                self.lines.push_back(self.blank_line(attributes));
            }
            self.clamp_history();
        } else if margin.horizontal.from == 1 && margin.horizontal.to == self.size.width {
            let top = self.to_absolute(margin.vertical.from as i32);
            let bottom = self.to_absolute(margin.vertical.to as i32);
            for _ in 0..n {
                let _ = self.lines.remove(top);
                self.lines.insert(bottom, self.blank_line(attributes));
            }
        } else {
            self.scroll_rect_up(n, attributes, margin);
        }
    }

    /// Scroll down within `margin` by `n` lines; never touches scrollback
    pub fn scroll_down(&mut self, n: usize, attributes: GraphicsAttributes, margin: Margin) {
        let n = n.min(margin.vertical.length());
        if n == 0 {
            return;
        }

        if margin.horizontal.from == 1 && margin.horizontal.to == self.size.width {
            let top = self.to_absolute(margin.vertical.from as i32);
            let bottom = self.to_absolute(margin.vertical.to as i32);
            for _ in 0..n {
                let _ = self.lines.remove(bottom);
                self.lines.insert(top, self.blank_line(attributes));
            }
        } else {
            self.scroll_rect_down(n, attributes, margin);
        }
    }

    fn scroll_rect_up(&mut self, n: usize, attributes: GraphicsAttributes, margin: Margin) {
        let left = margin.horizontal.from - 1;
        let right = (margin.horizontal.to - 1).min(self.size.width - 1);
        let top = margin.vertical.from;
        let bottom = margin.vertical.to;

        for row in top..=bottom.saturating_sub(n) {
            let src = self.to_absolute((row + n) as i32);
            let dst = self.to_absolute(row as i32);
            for column in left..=right {
                let cell = self.lines[src].cell(column).cloned().unwrap_or_default();
                if let Some(target) = self.lines[dst].cell_mut(column) {
                    *target = cell;
                }
            }
        }
        for row in (bottom + 1 - n)..=bottom {
            let index = self.to_absolute(row as i32);
            self.lines[index].erase_range(left, right, attributes);
        }
        for row in top..=bottom {
            let index = self.to_absolute(row as i32);
            self.lines[index].repair_wide_pairs(attributes);
        }
    }

    fn scroll_rect_down(&mut self, n: usize, attributes: GraphicsAttributes, margin: Margin) {
        let left = margin.horizontal.from - 1;
        let right = (margin.horizontal.to - 1).min(self.size.width - 1);
        let top = margin.vertical.from;
        let bottom = margin.vertical.to;

        for row in ((top + n)..=bottom).rev() {
            let src = self.to_absolute((row - n) as i32);
            let dst = self.to_absolute(row as i32);
            for column in left..=right {
                let cell = self.lines[src].cell(column).cloned().unwrap_or_default();
                if let Some(target) = self.lines[dst].cell_mut(column) {
                    *target = cell;
                }
            }
        }
        for row in top..top + n {
            let index = self.to_absolute(row as i32);
            self.lines[index].erase_range(left, right, attributes);
        }
        for row in top..=bottom {
            let index = self.to_absolute(row as i32);
            self.lines[index].repair_wide_pairs(attributes);
        }
    }

    /// Enforce the history bound, dropping the oldest lines.
    /// Returns how many lines were dropped.
    pub fn clamp_history(&mut self) -> usize {
        let Some(max) = self.max_history_line_count else {
            return 0;
        };
        let mut dropped = 0;
        while self.lines.len() - self.size.height > max {
            self.lines.pop_front();
            dropped += 1;
        }
        dropped
    }

    /// Drop all scrollback lines
    pub fn clear_history(&mut self) {
        while self.lines.len() > self.size.height {
            self.lines.pop_front();
        }
    }

    /// Resize the main page, reflowing wrappable lines on width changes.
    ///
    /// Returns the cursor's updated position; `wrap_pending` nudges the
    /// tracked position one cell right so a pending wrap survives the
    /// round trip.
    pub fn resize(&mut self, new_size: Size, cursor: Coordinate, wrap_pending: bool) -> Coordinate {
        let new_size = Size::new(new_size.width.max(1), new_size.height.max(1));
        let mut cursor_abs = self.to_absolute(cursor.row.max(1));
        let mut cursor_col = cursor.column.max(1) as usize + usize::from(wrap_pending);

        if new_size.width != self.size.width {
            self.rewrap(new_size.width, &mut cursor_abs, &mut cursor_col);
            self.size.width = new_size.width;
        }

        self.size.height = new_size.height;
        while self.lines.len() < new_size.height {
            self.lines.push_back(self.blank_line(GraphicsAttributes::default()));
        }
        // Consume blank bottom lines before letting content slide into
        // scrollback, keeping the page filled from the top
        while self.lines.len() > new_size.height
            && cursor_abs < self.lines.len() - 1
            && self.lines.back().is_some_and(Line::blank)
        {
            self.lines.pop_back();
        }
        let dropped = self.clamp_history();
        cursor_abs = cursor_abs.saturating_sub(dropped);
        cursor_abs = cursor_abs.min(self.lines.len() - 1);

        let row = self.to_relative(cursor_abs).clamp(1, self.size.height as i32);
        let column = cursor_col.min(self.size.width) as i32;
        Coordinate::new(row, column)
    }

    /// Unwrap wrapped runs into logical lines and rewrap them to the new
    /// width, tracking the cursor's logical offset through the process.
    fn rewrap(&mut self, new_width: usize, cursor_abs: &mut usize, cursor_col: &mut usize) {
        let old_width = self.size.width;
        let old = std::mem::take(&mut self.lines);
        let mut rebuilt: VecDeque<Line> = VecDeque::with_capacity(old.len());
        let mut new_cursor: Option<(usize, usize)> = None;

        let mut iter = old.into_iter().enumerate().peekable();
        while let Some((index, mut line)) = iter.next() {
            if !(self.reflow_on_resize && line.wrappable()) {
                if index == *cursor_abs {
                    new_cursor = Some((rebuilt.len(), (*cursor_col).min(new_width)));
                }
                line.resize(new_width, GraphicsAttributes::default());
                rebuilt.push_back(line);
                continue;
            }

            // Collect the logical line: this line plus every continuation
            let flags = line.flags().inheritable();
            let mut logical: Vec<Cell> = Vec::new();
            let mut offset: Option<usize> = None;
            loop {
                if index + (logical.len() / old_width.max(1)) == *cursor_abs {
                    offset = Some(logical.len() + (*cursor_col - 1));
                }
                let wrapped = line.wrapped();
                logical.extend(line.into_cells());
                if !wrapped {
                    break;
                }
                match iter.peek() {
                    Some((_, next)) if self.reflow_on_resize && next.wrappable() => {
                        line = iter.next().expect("peeked").1;
                    }
                    _ => break,
                }
            }

            // Trim trailing blank default cells of the logical line
            let default = GraphicsAttributes::default();
            let mut keep = logical
                .iter()
                .rposition(|cell| !cell.is_blank_with(&default))
                .map_or(0, |i| i + 1);
            if keep < logical.len() && logical[keep].is_continuation() {
                keep += 1;
            }
            logical.truncate(keep);

            let first_chunk = rebuilt.len();
            if logical.is_empty() {
                if let Some(off) = offset {
                    new_cursor = Some((first_chunk, (off + 1).min(new_width)));
                }
                rebuilt.push_back(Line::new(new_width, default, flags));
                continue;
            }

            let mut pos = 0;
            while pos < logical.len() {
                let mut end = (pos + new_width).min(logical.len());
                if end < logical.len() && logical[end].is_continuation() {
                    end -= 1;
                }
                if let Some(off) = offset {
                    if off >= pos && (off < end || end == logical.len()) {
                        new_cursor =
                            Some((rebuilt.len(), (off - pos + 1).min(new_width)));
                    }
                }
                let mut chunk: Vec<Cell> = logical[pos..end].to_vec();
                chunk.resize(new_width, Cell::blank(default));
                let mut chunk_flags = flags;
                if end < logical.len() {
                    chunk_flags |= LineFlags::WRAPPED;
                }
                rebuilt.push_back(Line::from_cells(chunk, chunk_flags));
                pos = end;
            }
        }

        if let Some((abs, col)) = new_cursor {
            *cursor_abs = abs;
            *cursor_col = col;
        }
        self.lines = rebuilt;
    }

    /// Visit every visible cell at the given scrollback offset (0 = main
    /// page, larger values look further back), padding short lines.
    pub fn render<F>(&self, scroll_offset: usize, mut emit: F)
    where
        F: FnMut(Coordinate, &Cell),
    {
        let offset = scroll_offset.min(self.history_line_count());
        let start = self.history_line_count() - offset;
        let pad = Cell::new();

        for row in 0..self.size.height {
            let line = &self.lines[start + row];
            let coordinate_row = (row + 1) as i32;
            for (column, cell) in line.cells().iter().enumerate().take(self.size.width) {
                emit(Coordinate::new(coordinate_row, (column + 1) as i32), cell);
            }
            for column in line.len()..self.size.width {
                emit(Coordinate::new(coordinate_row, (column + 1) as i32), &pad);
            }
        }
    }

    /// Text of one main-page row
    pub fn render_text_line(&self, row: i32) -> String {
        self.line(row).to_utf8()
    }

    /// Text of the main page, rows joined with newlines
    pub fn render_main_page_text(&self) -> String {
        (1..=self.size.height as i32)
            .map(|row| self.render_text_line(row))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Text of scrollback plus main page
    pub fn render_all_text(&self) -> String {
        self.lines
            .iter()
            .map(Line::to_utf8)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Iterate the main page's lines
    pub fn main_page(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().skip(self.history_line_count())
    }

    /// Iterate the scrollback lines, oldest first
    pub fn scrollback_lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().take(self.history_line_count())
    }
}
