//! The terminal screen
//!
//! Owns the cursor, mode sets, margins, tab stops, the primary and
//! alternate grids, the color palette and the outbound reply/event
//! queues. The sequencer resolves control functions against the catalog
//! and calls into `apply`; printable characters arrive via `print_char`.

use std::collections::VecDeque;
use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::cell::{display_width, Cell, CellFlags, GraphicsAttributes};
use crate::charset::Charset;
use crate::color::{parse_color_spec, Color, ColorPalette};
use crate::cursor::{Cursor, CursorDisplay, CursorShape, SavedCursor, SAVED_CURSOR_STACK_DEPTH};
use crate::functions::{FunctionCategory, FunctionDefinition};
use crate::grid::{Coordinate, Grid, Margin, MarginRange, Size};
use crate::hyperlink::{HyperlinkRef, HyperlinkStore};
use crate::image::{ImageData, ImageFragment, ImageRef};
use crate::modes::{AnsiMode, DecMode, ModeSet};
use crate::sequence::{ApplyResult, Sequence};

/// Default scrollback bound for the primary buffer
pub const DEFAULT_MAX_HISTORY_LINE_COUNT: usize = 10_000;

/// Which buffer is live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferType {
    #[default]
    Primary,
    Alternate,
}

/// Host notifications delivered synchronously during `write`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermEvent {
    TitleChanged(String),
    IconNameChanged(String),
    Bell,
    ModeChanged { mode: DecMode, enabled: bool },
    /// OSC 52: `selection` names the clipboard, `data` is the raw
    /// base64 payload (decoding is the host's business)
    ClipboardWrite { selection: String, data: String },
    ResizeRequested { size: Size },
    BufferSwitched(BufferType),
    /// DCS $ p: the host should activate the named profile
    ProfileChangeRequested(String),
}

/// Tab stop positions, default every 8 columns
#[derive(Debug, Clone)]
pub struct TabStops {
    stops: Vec<bool>,
}

impl TabStops {
    pub fn new(width: usize) -> Self {
        let mut stops = vec![false; width];
        for column in (8..width).step_by(8) {
            stops[column] = true;
        }
        Self { stops }
    }

    pub fn resize(&mut self, width: usize) {
        let old = self.stops.len();
        self.stops.resize(width, false);
        for column in (8..width).step_by(8).filter(|&c| c >= old) {
            self.stops[column] = true;
        }
    }

    /// Set a stop at a 1-based column
    pub fn set(&mut self, column: usize) {
        if let Some(stop) = self.stops.get_mut(column.saturating_sub(1)) {
            *stop = true;
        }
    }

    pub fn clear(&mut self, column: usize) {
        if let Some(stop) = self.stops.get_mut(column.saturating_sub(1)) {
            *stop = false;
        }
    }

    pub fn clear_all(&mut self) {
        self.stops.fill(false);
    }

    /// Next stop strictly after `column`, else `limit` (all 1-based)
    pub fn next(&self, column: usize, limit: usize) -> usize {
        for candidate in column + 1..=limit.min(self.stops.len()) {
            if self.stops[candidate - 1] {
                return candidate;
            }
        }
        limit
    }

    /// Previous stop strictly before `column`, else 1
    pub fn previous(&self, column: usize) -> usize {
        for candidate in (1..column.min(self.stops.len() + 1)).rev() {
            if self.stops[candidate - 1] {
                return candidate;
            }
        }
        1
    }
}

/// The terminal screen model
#[derive(Debug)]
pub struct Screen {
    size: Size,
    primary: Grid,
    alternate: Grid,
    active_buffer: BufferType,
    cursor: Cursor,
    saved_cursors: Vec<SavedCursor>,
    modes: ModeSet,
    margin: Margin,
    tabs: TabStops,
    palette: ColorPalette,
    hyperlinks: HyperlinkStore,
    current_hyperlink: Option<HyperlinkRef>,
    title: String,
    icon_name: String,
    replies: Vec<u8>,
    events: VecDeque<TermEvent>,
    /// Assumed cell size in pixels for size reports and sixel placement
    cell_pixel_size: (u16, u16),
    /// Cell that received the last graphic character (for cluster joins
    /// and REP); cleared by any cursor movement
    last_cell: Option<(i32, usize)>,
    last_graphic: Option<char>,
    max_history_line_count: Option<usize>,
    reflow_on_resize: bool,
}

impl Screen {
    pub fn new(size: Size, max_history_line_count: Option<usize>) -> Self {
        let size = Size::new(size.width.max(1), size.height.max(1));
        Self {
            size,
            primary: Grid::new(size, true, max_history_line_count),
            alternate: Grid::new(size, true, Some(0)),
            active_buffer: BufferType::Primary,
            cursor: Cursor::new(),
            saved_cursors: Vec::new(),
            modes: ModeSet::new(),
            margin: Margin::full(size),
            tabs: TabStops::new(size.width),
            palette: ColorPalette::new(),
            hyperlinks: HyperlinkStore::new(),
            current_hyperlink: None,
            title: String::new(),
            icon_name: String::new(),
            replies: Vec::new(),
            events: VecDeque::new(),
            cell_pixel_size: (8, 16),
            last_cell: None,
            last_graphic: None,
            max_history_line_count,
            reflow_on_resize: true,
        }
    }

    // --- accessors -----------------------------------------------------

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn grid(&self) -> &Grid {
        match self.active_buffer {
            BufferType::Primary => &self.primary,
            BufferType::Alternate => &self.alternate,
        }
    }

    fn grid_mut(&mut self) -> &mut Grid {
        match self.active_buffer {
            BufferType::Primary => &mut self.primary,
            BufferType::Alternate => &mut self.alternate,
        }
    }

    pub fn primary_grid(&self) -> &Grid {
        &self.primary
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn modes(&self) -> &ModeSet {
        &self.modes
    }

    pub fn margin(&self) -> Margin {
        self.margin
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn icon_name(&self) -> &str {
        &self.icon_name
    }

    pub fn active_buffer(&self) -> BufferType {
        self.active_buffer
    }

    pub fn set_cell_pixel_size(&mut self, width: u16, height: u16) {
        self.cell_pixel_size = (width.max(1), height.max(1));
    }

    /// Pending bytes for the PTY
    pub fn take_replies(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.replies)
    }

    /// Next host notification, oldest first
    pub fn poll_event(&mut self) -> Option<TermEvent> {
        self.events.pop_front()
    }

    pub fn reply(&mut self, bytes: &[u8]) {
        self.replies.extend_from_slice(bytes);
    }

    fn notify(&mut self, event: TermEvent) {
        self.events.push_back(event);
    }

    // --- margins -------------------------------------------------------

    fn top(&self) -> usize {
        self.margin.vertical.from
    }

    fn bottom(&self) -> usize {
        self.margin.vertical.to
    }

    fn left(&self) -> usize {
        self.margin.horizontal.from
    }

    fn right(&self) -> usize {
        self.margin.horizontal.to
    }

    /// Right boundary for the cursor's current line position
    fn right_limit(&self) -> usize {
        if (self.cursor.position.column as usize) <= self.right() {
            self.right()
        } else {
            self.size.width
        }
    }

    fn cursor_moved(&mut self) {
        self.cursor.wrap_pending = false;
        self.last_cell = None;
    }

    // --- printing ------------------------------------------------------

    /// Write one printable character at the cursor
    pub fn print_char(&mut self, c: char) {
        let c = self.cursor.charsets.translate(c);
        let width = display_width(c);
        if usize::from(width) > self.size.width {
            return;
        }

        // Combining marks extend the preceding cell
        if width == 0 {
            if let Some((row, column)) = self.last_cell {
                if let Some(cell) = self.grid_mut().line_mut(row).cell_mut(column) {
                    cell.append_character(c);
                }
            }
            return;
        }

        // Grapheme-cluster continuation (ZWJ sequences, VS15/VS16):
        // the new codepoint joins the previous cell without advancing.
        if let Some((row, column)) = self.last_cell {
            let joins = {
                let cell = self.grid().line(row).cell(column);
                match cell {
                    Some(cell) if !cell.text().is_empty() => {
                        let mut cluster = String::from(cell.text());
                        cluster.push(c);
                        cluster.graphemes(true).count() == 1
                    }
                    _ => false,
                }
            };
            if joins {
                if let Some(cell) = self.grid_mut().line_mut(row).cell_mut(column) {
                    cell.append_character(c);
                }
                return;
            }
        }

        if self.cursor.wrap_pending && self.cursor.autowrap {
            let row = self.cursor.position.row;
            self.grid_mut().line_mut(row).set_wrapped(true);
            self.cursor.position.column = self.left() as i32;
            self.cursor.wrap_pending = false;
            self.index();
        }

        let right = self.right_limit();
        let mut column = self.cursor.position.column.max(1) as usize;

        // A wide character that cannot fit before the margin wraps early
        if width == 2 && column + 1 > right {
            if self.cursor.autowrap {
                let row = self.cursor.position.row;
                self.grid_mut().line_mut(row).set_wrapped(true);
                self.cursor.position.column = self.left() as i32;
                self.index();
                column = self.left();
            } else {
                column = right.saturating_sub(1).max(1);
            }
        }

        let row = self.cursor.position.row;
        let attributes = self.cursor.attributes;
        let hyperlink = self.current_hyperlink.clone();
        let wrappable = self.modes.dec(DecMode::TextReflow);
        let insert = self.modes.ansi(AnsiMode::Insert);

        {
            let line = self.grid_mut().line_mut(row);
            line.set_wrappable(wrappable);
            if insert {
                line.insert_cells(column - 1, usize::from(width), right - 1, attributes);
            }
        }

        self.clear_wide_remnant(row, column - 1);
        if width == 2 {
            self.clear_wide_remnant(row, column);
        }

        {
            let line = self.grid_mut().line_mut(row);
            if let Some(cell) = line.cell_mut(column - 1) {
                cell.reset_with_hyperlink(attributes, hyperlink.clone());
                cell.set_character(c);
            }
            if width == 2 {
                if let Some(cell) = line.cell_mut(column) {
                    cell.reset_with_hyperlink(attributes, hyperlink);
                    cell.set_continuation();
                }
            }
        }

        self.update_sequence_flags(row, column - 1);
        self.last_cell = Some((row, column - 1));
        self.last_graphic = Some(c);

        let next = column + usize::from(width);
        if next > right {
            self.cursor.position.column = right as i32;
            self.cursor.wrap_pending = self.cursor.autowrap;
        } else {
            self.cursor.position.column = next as i32;
            self.cursor.wrap_pending = false;
        }
    }

    /// Blank the other half of a wide pair overlapping `column` (0-based)
    fn clear_wide_remnant(&mut self, row: i32, column: usize) {
        let attributes = self.erase_attributes();
        let line = self.grid_mut().line_mut(row);
        let target_width = line.cell(column).map_or(1, Cell::width);
        if target_width == 0 && column > 0 {
            if let Some(lead) = line.cell_mut(column - 1) {
                if lead.width() >= 2 {
                    lead.reset(attributes);
                }
            }
        } else if target_width >= 2 {
            if let Some(trail) = line.cell_mut(column + 1) {
                if trail.is_continuation() {
                    trail.reset(attributes);
                }
            }
        }
    }

    /// Maintain the run markers around a freshly written cell (0-based)
    fn update_sequence_flags(&mut self, row: i32, column: usize) {
        let previous_filled = column > 0
            && self
                .grid()
                .line(row)
                .cell(column - 1)
                .is_some_and(|cell| !cell.is_empty());

        let line = self.grid_mut().line_mut(row);
        if previous_filled {
            if let Some(previous) = line.cell_mut(column - 1) {
                previous.attributes_mut().flags.remove(CellFlags::SEQUENCE_END);
            }
        }
        if let Some(cell) = line.cell_mut(column) {
            cell.attributes_mut().flags.insert(CellFlags::SEQUENCE_END);
            if !previous_filled {
                cell.attributes_mut().flags.insert(CellFlags::SEQUENCE_START);
            }
        }
    }

    /// Rendition used for erased and scrolled-in cells
    fn erase_attributes(&self) -> GraphicsAttributes {
        GraphicsAttributes {
            background: self.cursor.attributes.background,
            ..GraphicsAttributes::default()
        }
    }

    // --- C0 level ------------------------------------------------------

    pub fn bell(&mut self) {
        self.notify(TermEvent::Bell);
    }

    /// LF; with LNM set, also CR
    pub fn linefeed(&mut self) {
        if self.modes.ansi(AnsiMode::AutomaticNewline) {
            self.carriage_return();
        }
        self.index();
    }

    /// Move down one row, scrolling when at the bottom margin
    pub fn index(&mut self) {
        let row = self.cursor.position.row as usize;
        if row == self.bottom() {
            let attributes = self.erase_attributes();
            let margin = self.margin;
            self.grid_mut().scroll_up(1, attributes, margin);
        } else if row < self.size.height {
            self.cursor.position.row += 1;
        }
        self.cursor.wrap_pending = false;
        self.last_cell = None;
    }

    /// Move up one row, scrolling down when at the top margin
    pub fn reverse_index(&mut self) {
        let row = self.cursor.position.row as usize;
        if row == self.top() {
            let attributes = self.erase_attributes();
            let margin = self.margin;
            self.grid_mut().scroll_down(1, attributes, margin);
        } else if row > 1 {
            self.cursor.position.row -= 1;
        }
        self.cursor.wrap_pending = false;
        self.last_cell = None;
    }

    pub fn carriage_return(&mut self) {
        let column = self.cursor.position.column as usize;
        self.cursor.position.column = if column >= self.left() {
            self.left() as i32
        } else {
            1
        };
        self.cursor_moved();
    }

    pub fn backspace(&mut self) {
        let limit = if (self.cursor.position.column as usize) > self.left() {
            self.left() as i32
        } else {
            1
        };
        self.cursor.position.column = (self.cursor.position.column - 1).max(limit);
        self.cursor_moved();
    }

    /// HT: advance to the next tab stop, bounded by the right margin
    pub fn tab(&mut self) {
        let column = self.cursor.position.column as usize;
        self.cursor.position.column = self.tabs.next(column, self.right_limit()) as i32;
        self.cursor_moved();
    }

    /// CBT: move back `count` tab stops
    pub fn backtab(&mut self, count: usize) {
        let mut column = self.cursor.position.column as usize;
        for _ in 0..count.max(1) {
            column = self.tabs.previous(column);
        }
        self.cursor.position.column = column as i32;
        self.cursor_moved();
    }

    /// CHT: advance `count` tab stops
    pub fn forward_tabs(&mut self, count: usize) {
        for _ in 0..count.max(1) {
            self.tab();
        }
    }

    pub fn shift_out(&mut self) {
        self.cursor.charsets.shift_out();
    }

    pub fn shift_in(&mut self) {
        self.cursor.charsets.shift_in();
    }

    // --- cursor motion -------------------------------------------------

    pub fn cursor_up(&mut self, count: usize) {
        let row = self.cursor.position.row as usize;
        let limit = if row >= self.top() { self.top() } else { 1 };
        self.cursor.position.row = row.saturating_sub(count.max(1)).max(limit) as i32;
        self.cursor_moved();
    }

    pub fn cursor_down(&mut self, count: usize) {
        let row = self.cursor.position.row as usize;
        let limit = if row <= self.bottom() {
            self.bottom()
        } else {
            self.size.height
        };
        self.cursor.position.row = (row + count.max(1)).min(limit) as i32;
        self.cursor_moved();
    }

    pub fn cursor_forward(&mut self, count: usize) {
        let column = self.cursor.position.column as usize;
        let limit = self.right_limit();
        self.cursor.position.column = (column + count.max(1)).min(limit) as i32;
        self.cursor_moved();
    }

    pub fn cursor_backward(&mut self, count: usize) {
        let column = self.cursor.position.column as usize;
        let limit = if column >= self.left() { self.left() } else { 1 };
        self.cursor.position.column = column.saturating_sub(count.max(1)).max(limit) as i32;
        self.cursor_moved();
    }

    /// CUP/HVP with 1-based arguments, honoring origin mode
    pub fn move_cursor_to(&mut self, row: usize, column: usize) {
        let (row, column) = if self.cursor.origin_mode {
            (
                (self.top() + row.max(1) - 1).min(self.bottom()),
                (self.left() + column.max(1) - 1).min(self.right()),
            )
        } else {
            (
                row.max(1).min(self.size.height),
                column.max(1).min(self.size.width),
            )
        };
        self.cursor.position = Coordinate::new(row as i32, column as i32);
        self.cursor_moved();
    }

    pub fn move_cursor_to_column(&mut self, column: usize) {
        let column = if self.cursor.origin_mode {
            (self.left() + column.max(1) - 1).min(self.right())
        } else {
            column.max(1).min(self.size.width)
        };
        self.cursor.position.column = column as i32;
        self.cursor_moved();
    }

    pub fn move_cursor_to_row(&mut self, row: usize) {
        let row = if self.cursor.origin_mode {
            (self.top() + row.max(1) - 1).min(self.bottom())
        } else {
            row.max(1).min(self.size.height)
        };
        self.cursor.position.row = row as i32;
        self.cursor_moved();
    }

    pub fn save_cursor(&mut self) {
        if self.saved_cursors.len() == SAVED_CURSOR_STACK_DEPTH {
            self.saved_cursors.remove(0);
        }
        self.saved_cursors.push(self.cursor.save());
    }

    pub fn restore_cursor(&mut self) {
        let saved = self.saved_cursors.pop().unwrap_or_default();
        self.cursor.restore(&saved);
        let row = (self.cursor.position.row.max(1) as usize).min(self.size.height);
        let column = (self.cursor.position.column.max(1) as usize).min(self.size.width);
        self.cursor.position = Coordinate::new(row as i32, column as i32);
        self.last_cell = None;
    }

    // --- erase and edit ------------------------------------------------

    /// ED: 0 = to end, 1 = to start, 2 = page, 3 = scrollback
    pub fn erase_in_display(&mut self, which: u16) {
        let attributes = self.erase_attributes();
        let row = self.cursor.position.row;
        let column = self.cursor.position.column.max(1) as usize;
        let width = self.size.width;
        let height = self.size.height as i32;
        match which {
            0 => {
                self.grid_mut()
                    .line_mut(row)
                    .erase_range(column - 1, width - 1, attributes);
                for below in row + 1..=height {
                    self.grid_mut().line_mut(below).reset(attributes);
                }
            }
            1 => {
                for above in 1..row {
                    self.grid_mut().line_mut(above).reset(attributes);
                }
                self.grid_mut()
                    .line_mut(row)
                    .erase_range(0, column - 1, attributes);
            }
            2 => {
                for line in 1..=height {
                    self.grid_mut().line_mut(line).reset(attributes);
                }
            }
            3 => self.grid_mut().clear_history(),
            _ => {}
        }
        self.last_cell = None;
    }

    /// EL: 0 = to end, 1 = to start, 2 = whole line
    pub fn erase_in_line(&mut self, which: u16) {
        let attributes = self.erase_attributes();
        let row = self.cursor.position.row;
        let column = self.cursor.position.column.max(1) as usize;
        let width = self.size.width;
        let line = self.grid_mut().line_mut(row);
        match which {
            0 => line.erase_range(column - 1, width - 1, attributes),
            1 => line.erase_range(0, column - 1, attributes),
            2 => line.erase_range(0, width - 1, attributes),
            _ => {}
        }
        self.last_cell = None;
    }

    /// ECH: blank `count` cells from the cursor without shifting
    pub fn erase_chars(&mut self, count: usize) {
        let attributes = self.erase_attributes();
        let row = self.cursor.position.row;
        let column = self.cursor.position.column.max(1) as usize;
        let width = self.size.width;
        let end = (column - 1 + count.max(1) - 1).min(width - 1);
        self.grid_mut()
            .line_mut(row)
            .erase_range(column - 1, end, attributes);
        self.last_cell = None;
    }

    /// IL: insert blank lines at the cursor, pushing the rest down
    pub fn insert_lines(&mut self, count: usize) {
        let row = self.cursor.position.row as usize;
        if !self.margin.vertical.contains(row) {
            return;
        }
        let attributes = self.erase_attributes();
        let margin = Margin {
            vertical: MarginRange::new(row, self.bottom()),
            horizontal: self.margin.horizontal,
        };
        self.grid_mut().scroll_down(count.max(1), attributes, margin);
        self.cursor.position.column = self.left() as i32;
        self.cursor_moved();
    }

    /// DL: delete lines at the cursor, pulling the rest up
    pub fn delete_lines(&mut self, count: usize) {
        let row = self.cursor.position.row as usize;
        if !self.margin.vertical.contains(row) {
            return;
        }
        let attributes = self.erase_attributes();
        let margin = Margin {
            vertical: MarginRange::new(row, self.bottom()),
            horizontal: self.margin.horizontal,
        };
        self.grid_mut().scroll_up(count.max(1), attributes, margin);
        self.cursor.position.column = self.left() as i32;
        self.cursor_moved();
    }

    /// ICH: insert blank cells at the cursor
    pub fn insert_chars(&mut self, count: usize) {
        let attributes = self.erase_attributes();
        let row = self.cursor.position.row;
        let column = self.cursor.position.column.max(1) as usize;
        let right = self.right_limit();
        self.grid_mut()
            .line_mut(row)
            .insert_cells(column - 1, count.max(1), right - 1, attributes);
        self.last_cell = None;
    }

    /// DCH: delete cells at the cursor
    pub fn delete_chars(&mut self, count: usize) {
        let attributes = self.erase_attributes();
        let row = self.cursor.position.row;
        let column = self.cursor.position.column.max(1) as usize;
        let right = self.right_limit();
        self.grid_mut()
            .line_mut(row)
            .delete_cells(column - 1, count.max(1), right - 1, attributes);
        self.last_cell = None;
    }

    /// SU: scroll the margin up
    pub fn scroll_up(&mut self, count: usize) {
        let attributes = self.erase_attributes();
        let margin = self.margin;
        self.grid_mut().scroll_up(count.max(1), attributes, margin);
        self.last_cell = None;
    }

    /// SD: scroll the margin down
    pub fn scroll_down(&mut self, count: usize) {
        let attributes = self.erase_attributes();
        let margin = self.margin;
        self.grid_mut().scroll_down(count.max(1), attributes, margin);
        self.last_cell = None;
    }

    // --- margins and tabs ----------------------------------------------

    /// DECSTBM
    pub fn set_scrolling_region(&mut self, top: usize, bottom: usize) -> ApplyResult {
        let top = top.max(1);
        let bottom = if bottom == 0 {
            self.size.height
        } else {
            bottom.min(self.size.height)
        };
        if top >= bottom {
            return ApplyResult::Invalid;
        }
        self.margin.vertical = MarginRange::new(top, bottom);
        self.move_cursor_to(1, 1);
        ApplyResult::Ok
    }

    /// DECSLRM (requires mode ?69)
    pub fn set_left_right_margin(&mut self, left: usize, right: usize) -> ApplyResult {
        if !self.modes.dec(DecMode::LeftRightMargin) {
            return ApplyResult::Invalid;
        }
        let left = left.max(1);
        let right = if right == 0 {
            self.size.width
        } else {
            right.min(self.size.width)
        };
        if left >= right {
            return ApplyResult::Invalid;
        }
        self.margin.horizontal = MarginRange::new(left, right);
        self.move_cursor_to(1, 1);
        ApplyResult::Ok
    }

    pub fn set_tab_stop(&mut self) {
        let column = self.cursor.position.column.max(1) as usize;
        self.tabs.set(column);
    }

    /// TBC: 0 clears at the cursor, 3 clears every stop
    pub fn clear_tab_stops(&mut self, which: u16) {
        match which {
            0 => {
                let column = self.cursor.position.column.max(1) as usize;
                self.tabs.clear(column);
            }
            3 => self.tabs.clear_all(),
            _ => {}
        }
    }

    // --- modes ---------------------------------------------------------

    pub fn set_ansi_mode(&mut self, mode: AnsiMode, enabled: bool) {
        self.modes.set_ansi(mode, enabled);
    }

    pub fn set_dec_mode(&mut self, mode: DecMode, enabled: bool) {
        let changed = self.modes.set_dec(mode, enabled);
        match mode {
            DecMode::Origin => {
                self.cursor.origin_mode = enabled;
                self.move_cursor_to(1, 1);
            }
            DecMode::AutoWrap => {
                self.cursor.autowrap = enabled;
                if !enabled {
                    self.cursor.wrap_pending = false;
                }
            }
            DecMode::VisibleCursor => self.cursor.visible = enabled,
            DecMode::BlinkingCursor => {
                self.cursor.display = if enabled {
                    CursorDisplay::Blink
                } else {
                    CursorDisplay::Steady
                };
            }
            DecMode::Columns132 => {
                let width = if enabled { 132 } else { 80 };
                let size = Size::new(width, self.size.height);
                self.notify(TermEvent::ResizeRequested { size });
                self.resize(size);
                self.erase_in_display(2);
                self.margin = Margin::full(self.size);
                self.move_cursor_to(1, 1);
            }
            DecMode::DesignateCharsetUsAscii => {
                if enabled {
                    for slot in 0..4 {
                        self.cursor.charsets.designate(slot, Charset::UsAscii);
                    }
                }
            }
            DecMode::LeftRightMargin => {
                if !enabled {
                    self.margin.horizontal = MarginRange::new(1, self.size.width);
                }
            }
            DecMode::UseAlternateScreen => {
                if enabled {
                    self.switch_to_alternate(true);
                } else {
                    self.switch_to_normal(false);
                }
            }
            DecMode::ExtendedAltScreen => {
                if enabled {
                    self.save_cursor();
                    self.switch_to_alternate(true);
                    self.move_cursor_to(1, 1);
                } else {
                    self.switch_to_normal(false);
                    self.restore_cursor();
                }
            }
            DecMode::SaveCursor => {
                if enabled {
                    self.save_cursor();
                } else {
                    self.restore_cursor();
                }
            }
            _ => {}
        }
        if changed {
            self.notify(TermEvent::ModeChanged { mode, enabled });
        }
    }

    // --- buffers -------------------------------------------------------

    /// Enter the alternate screen; it always starts blank
    pub fn switch_to_alternate(&mut self, clear: bool) {
        if self.active_buffer == BufferType::Alternate {
            return;
        }
        self.active_buffer = BufferType::Alternate;
        if clear {
            self.alternate = Grid::new(self.size, self.reflow_on_resize, Some(0));
        }
        self.last_cell = None;
        self.notify(TermEvent::BufferSwitched(BufferType::Alternate));
    }

    /// Return to the primary screen
    pub fn switch_to_normal(&mut self, restore_cursor: bool) {
        if self.active_buffer == BufferType::Primary {
            return;
        }
        self.active_buffer = BufferType::Primary;
        if restore_cursor {
            self.restore_cursor();
        }
        self.last_cell = None;
        self.notify(TermEvent::BufferSwitched(BufferType::Primary));
    }

    // --- resize and reset ----------------------------------------------

    /// Resize both buffers, preserving the cursor's logical position
    pub fn resize(&mut self, size: Size) {
        let size = Size::new(size.width.max(1), size.height.max(1));
        if size == self.size {
            return;
        }
        let cursor = self.cursor.position;
        let wrap_pending = self.cursor.wrap_pending;

        let new_cursor = match self.active_buffer {
            BufferType::Primary => {
                let _ = self.alternate.resize(size, Coordinate::default(), false);
                self.primary.resize(size, cursor, wrap_pending)
            }
            BufferType::Alternate => {
                let _ = self.primary.resize(size, Coordinate::default(), false);
                self.alternate.resize(size, cursor, wrap_pending)
            }
        };

        self.size = size;
        self.margin = Margin::full(size);
        self.tabs.resize(size.width);
        self.cursor.position = new_cursor;
        self.cursor.wrap_pending = false;
        self.last_cell = None;
    }

    /// RIS: back to the power-on state, dimensions preserved
    pub fn hard_reset(&mut self) {
        self.primary = Grid::new(self.size, self.reflow_on_resize, self.max_history_line_count);
        self.alternate = Grid::new(self.size, self.reflow_on_resize, Some(0));
        self.active_buffer = BufferType::Primary;
        self.cursor = Cursor::new();
        self.saved_cursors.clear();
        self.modes.reset();
        self.margin = Margin::full(self.size);
        self.tabs = TabStops::new(self.size.width);
        self.palette = ColorPalette::new();
        self.hyperlinks.clear();
        self.current_hyperlink = None;
        self.title.clear();
        self.icon_name.clear();
        self.last_cell = None;
        self.last_graphic = None;
    }

    /// DECSTR: the soft subset of a reset
    pub fn soft_reset(&mut self) {
        self.cursor.visible = true;
        self.cursor.origin_mode = false;
        self.cursor.autowrap = false;
        self.cursor.wrap_pending = false;
        self.cursor.attributes.reset();
        self.cursor.charsets.reset();
        self.modes.set_dec(DecMode::Origin, false);
        self.modes.set_dec(DecMode::AutoWrap, false);
        self.modes.set_dec(DecMode::VisibleCursor, true);
        self.modes.set_ansi(AnsiMode::Insert, false);
        self.modes.set_ansi(AnsiMode::KeyboardAction, false);
        self.margin = Margin::full(self.size);
        self.saved_cursors.clear();
        self.last_cell = None;
    }

    /// DECALN: fill the page with E and reset margins
    pub fn screen_alignment_pattern(&mut self) {
        self.margin = Margin::full(self.size);
        let width = self.size.width;
        for row in 1..=self.size.height as i32 {
            let line = self.grid_mut().line_mut(row);
            for column in 0..width {
                if let Some(cell) = line.cell_mut(column) {
                    cell.reset(GraphicsAttributes::default());
                    cell.set_character('E');
                }
            }
        }
        self.move_cursor_to(1, 1);
    }

    // --- titles, links, clipboard --------------------------------------

    pub fn set_title(&mut self, title: &str) {
        self.title = title.chars().take(256).collect();
        self.notify(TermEvent::TitleChanged(self.title.clone()));
    }

    pub fn set_icon_name(&mut self, name: &str) {
        self.icon_name = name.chars().take(256).collect();
        self.notify(TermEvent::IconNameChanged(self.icon_name.clone()));
    }

    /// OSC 8: open or close the active hyperlink
    pub fn set_hyperlink(&mut self, params: &str, uri: &str) {
        if uri.is_empty() {
            self.current_hyperlink = None;
            return;
        }
        let id = params
            .split(':')
            .find_map(|part| part.strip_prefix("id="));
        self.current_hyperlink = Some(self.hyperlinks.open(id, uri));
    }

    pub fn current_hyperlink(&self) -> Option<&HyperlinkRef> {
        self.current_hyperlink.as_ref()
    }

    /// SCS: designate a charset into slot G0-G3
    pub fn designate_charset(&mut self, slot: u8, charset: Charset) {
        self.cursor.charsets.designate(slot, charset);
    }

    /// DCS $ p: ask the host to switch to the named profile
    pub fn request_profile(&mut self, data: &[u8]) {
        let name = String::from_utf8_lossy(data).into_owned();
        self.notify(TermEvent::ProfileChangeRequested(name));
    }

    /// Host-driven hover: highlight every cell sharing the link under
    /// `position` and return that link
    pub fn hover_hyperlink_at(&mut self, position: Coordinate) -> Option<HyperlinkRef> {
        let target = self
            .grid()
            .line(position.row)
            .cell((position.column.max(1) - 1) as usize)
            .and_then(|cell| cell.hyperlink().cloned());

        let height = self.size.height as i32;
        for row in 1..=height {
            let line = self.grid_mut().line_mut(row);
            for cell in line.cells_mut() {
                let hovered = match (&target, cell.hyperlink()) {
                    (Some(target), Some(link)) => Arc::ptr_eq(target, link),
                    _ => false,
                };
                cell.attributes_mut().flags.set(CellFlags::HOVER, hovered);
            }
        }
        target
    }

    // --- reports -------------------------------------------------------

    fn report_device_attributes(&mut self) {
        self.reply(b"\x1b[?64;1;4;6;22c");
    }

    fn report_secondary_attributes(&mut self) {
        self.reply(b"\x1b[>61;0;0c");
    }

    fn report_tertiary_attributes(&mut self) {
        self.reply(b"\x1bP!|00000000\x1b\\");
    }

    fn report_device_status(&mut self, which: u16, private: bool) -> ApplyResult {
        match which {
            5 => {
                self.reply(b"\x1b[0n");
                ApplyResult::Ok
            }
            6 => {
                let (mut row, mut column) = (
                    self.cursor.position.row as usize,
                    self.cursor.position.column.max(1) as usize,
                );
                if self.cursor.origin_mode {
                    row = (row + 1).saturating_sub(self.top()).max(1);
                    column = (column + 1).saturating_sub(self.left()).max(1);
                }
                let reply = if private {
                    format!("\x1b[?{row};{column}R")
                } else {
                    format!("\x1b[{row};{column}R")
                };
                self.reply(reply.as_bytes());
                ApplyResult::Ok
            }
            _ => ApplyResult::Unsupported,
        }
    }

    fn window_ops(&mut self, seq: &Sequence) -> ApplyResult {
        match seq.param(0) {
            8 => {
                let height = seq.param_or(1, self.size.height as u16) as usize;
                let width = seq.param_or(2, self.size.width as u16) as usize;
                self.notify(TermEvent::ResizeRequested {
                    size: Size::new(width, height),
                });
                ApplyResult::Ok
            }
            14 => {
                let (cw, ch) = self.cell_pixel_size;
                let reply = format!(
                    "\x1b[4;{};{}t",
                    self.size.height * usize::from(ch),
                    self.size.width * usize::from(cw)
                );
                self.reply(reply.as_bytes());
                ApplyResult::Ok
            }
            18 => {
                let reply = format!("\x1b[8;{};{}t", self.size.height, self.size.width);
                self.reply(reply.as_bytes());
                ApplyResult::Ok
            }
            _ => ApplyResult::Unsupported,
        }
    }

    /// DECRQSS: reply with the requested setting's current value
    pub fn request_status_string(&mut self, request: &[u8]) {
        let payload: Option<String> = match request {
            b"m" => Some(self.sgr_status_string()),
            b"r" => Some(format!("{};{}r", self.top(), self.bottom())),
            b"s" => Some(format!("{};{}s", self.left(), self.right())),
            b" q" => {
                let shape = match (self.cursor.shape, self.cursor.display) {
                    (CursorShape::Block, CursorDisplay::Blink) => 1,
                    (CursorShape::Block, CursorDisplay::Steady) => 2,
                    (CursorShape::Underscore, CursorDisplay::Blink) => 3,
                    (CursorShape::Underscore, CursorDisplay::Steady) => 4,
                    (CursorShape::Bar, CursorDisplay::Blink) => 5,
                    (CursorShape::Bar, CursorDisplay::Steady) => 6,
                };
                Some(format!("{shape} q"))
            }
            b"\"p" => Some("65;1\"p".to_string()),
            _ => None,
        };
        match payload {
            Some(payload) => {
                let reply = format!("\x1bP1$r{payload}\x1b\\");
                self.reply(reply.as_bytes());
            }
            None => self.reply(b"\x1bP0$r\x1b\\"),
        }
    }

    fn sgr_status_string(&self) -> String {
        let attributes = &self.cursor.attributes;
        let mut parts = vec!["0".to_string()];
        let flag_codes = [
            (CellFlags::BOLD, 1),
            (CellFlags::FAINT, 2),
            (CellFlags::ITALIC, 3),
            (CellFlags::UNDERLINE, 4),
            (CellFlags::BLINKING, 5),
            (CellFlags::INVERSE, 7),
            (CellFlags::HIDDEN, 8),
            (CellFlags::CROSSED_OUT, 9),
        ];
        for (flag, code) in flag_codes {
            if attributes.flags.contains(flag) {
                parts.push(code.to_string());
            }
        }
        match attributes.foreground {
            Color::Default => {}
            Color::Indexed(i) if i < 8 => parts.push((30 + u16::from(i)).to_string()),
            Color::Indexed(i) => parts.push(format!("38:5:{i}")),
            Color::Bright(i) => parts.push((90 + u16::from(i)).to_string()),
            Color::Rgb(r, g, b) => parts.push(format!("38:2::{r}:{g}:{b}")),
        }
        match attributes.background {
            Color::Default => {}
            Color::Indexed(i) if i < 8 => parts.push((40 + u16::from(i)).to_string()),
            Color::Indexed(i) => parts.push(format!("48:5:{i}")),
            Color::Bright(i) => parts.push((100 + u16::from(i)).to_string()),
            Color::Rgb(r, g, b) => parts.push(format!("48:2::{r}:{g}:{b}")),
        }
        parts.join(";") + "m"
    }

    /// XTGETTCAP: hex-encoded capability queries
    pub fn request_termcap(&mut self, request: &[u8]) {
        let decode_hex = |bytes: &[u8]| -> Option<String> {
            if bytes.len() % 2 != 0 {
                return None;
            }
            let mut out = String::new();
            for pair in bytes.chunks(2) {
                let hi = (pair[0] as char).to_digit(16)?;
                let lo = (pair[1] as char).to_digit(16)?;
                out.push(char::from((hi * 16 + lo) as u8));
            }
            Some(out)
        };
        let encode_hex = |text: &str| -> String {
            text.bytes().map(|byte| format!("{byte:02X}")).collect()
        };

        for name in request.split(|&byte| byte == b';') {
            let value = decode_hex(name).and_then(|name| match name.as_str() {
                "TN" | "name" => Some("tern-256color".to_string()),
                "Co" | "colors" => Some("256".to_string()),
                "RGB" => Some("8/8/8".to_string()),
                _ => None,
            });
            match value {
                Some(value) => {
                    let reply = format!(
                        "\x1bP1+r{}={}\x1b\\",
                        String::from_utf8_lossy(name),
                        encode_hex(&value)
                    );
                    self.reply(reply.as_bytes());
                }
                None => self.reply(b"\x1bP0+r\x1b\\"),
            }
        }
    }

    // --- images --------------------------------------------------------

    /// Place a decoded sixel image at the cursor, scrolling as needed
    pub fn place_image(&mut self, image: ImageData) {
        if image.width == 0 || image.height == 0 {
            return;
        }
        let (cell_width, cell_height) = self.cell_pixel_size;
        let columns = ((image.width + u32::from(cell_width) - 1) / u32::from(cell_width)) as usize;
        let rows = ((image.height + u32::from(cell_height) - 1) / u32::from(cell_height)) as usize;
        let image: ImageRef = Arc::new(image);

        if !self.modes.dec(DecMode::SixelScrolling) {
            self.move_cursor_to(1, 1);
        }

        let attributes = self.cursor.attributes;
        let start_column = self.cursor.position.column.max(1) as usize;
        for fragment_row in 0..rows {
            let row = self.cursor.position.row;
            for fragment_column in 0..columns {
                let column = start_column + fragment_column;
                if column > self.size.width {
                    break;
                }
                if let Some(cell) = self.grid_mut().line_mut(row).cell_mut(column - 1) {
                    cell.reset(attributes);
                    cell.set_image(ImageFragment::new(
                        Arc::clone(&image),
                        fragment_column as u32,
                        fragment_row as u32,
                    ));
                }
            }
            self.index();
        }
        self.last_cell = None;
    }

    // --- function dispatch ---------------------------------------------

    /// Apply a resolved control function
    pub fn apply(&mut self, function: &FunctionDefinition, seq: &Sequence) -> ApplyResult {
        match function.category {
            FunctionCategory::Esc => self.apply_esc(function),
            FunctionCategory::Csi => self.apply_csi(function, seq),
            FunctionCategory::Osc => self.apply_osc(function, seq),
            // C0/C1 are executed directly, DCS goes through the hooks
            _ => ApplyResult::Unsupported,
        }
    }

    fn apply_esc(&mut self, function: &FunctionDefinition) -> ApplyResult {
        match function.mnemonic {
            "DECSC" => self.save_cursor(),
            "DECRC" => self.restore_cursor(),
            "IND" => self.index(),
            "RI" => self.reverse_index(),
            "NEL" => {
                self.index();
                self.carriage_return();
            }
            "HTS" => self.set_tab_stop(),
            "RIS" => self.hard_reset(),
            "DECALN" => self.screen_alignment_pattern(),
            "SS2" => self.cursor.charsets.single_shift(2),
            "SS3" => self.cursor.charsets.single_shift(3),
            // Keypad modes only matter to input encoding
            "DECKPAM" | "DECKPNM" => {}
            _ => return ApplyResult::Unsupported,
        }
        ApplyResult::Ok
    }

    fn apply_csi(&mut self, function: &FunctionDefinition, seq: &Sequence) -> ApplyResult {
        match function.mnemonic {
            "CUU" => self.cursor_up(seq.param_or(0, 1) as usize),
            "CUD" | "VPR" => self.cursor_down(seq.param_or(0, 1) as usize),
            "CUF" | "HPR" => self.cursor_forward(seq.param_or(0, 1) as usize),
            "CUB" => self.cursor_backward(seq.param_or(0, 1) as usize),
            "CNL" => {
                self.cursor_down(seq.param_or(0, 1) as usize);
                self.carriage_return();
            }
            "CPL" => {
                self.cursor_up(seq.param_or(0, 1) as usize);
                self.carriage_return();
            }
            "CHA" | "HPA" => self.move_cursor_to_column(seq.param_or(0, 1) as usize),
            "VPA" => self.move_cursor_to_row(seq.param_or(0, 1) as usize),
            "CUP" | "HVP" => self.move_cursor_to(
                seq.param_or(0, 1) as usize,
                seq.param_or(1, 1) as usize,
            ),
            "CHT" => self.forward_tabs(seq.param_or(0, 1) as usize),
            "CBT" => self.backtab(seq.param_or(0, 1) as usize),
            "ED" => self.erase_in_display(seq.param(0)),
            "EL" => self.erase_in_line(seq.param(0)),
            "ECH" => self.erase_chars(seq.param_or(0, 1) as usize),
            "ICH" => self.insert_chars(seq.param_or(0, 1) as usize),
            "DCH" => self.delete_chars(seq.param_or(0, 1) as usize),
            "IL" => self.insert_lines(seq.param_or(0, 1) as usize),
            "DL" => self.delete_lines(seq.param_or(0, 1) as usize),
            "SU" => self.scroll_up(seq.param_or(0, 1) as usize),
            "SD" => self.scroll_down(seq.param_or(0, 1) as usize),
            "REP" => {
                let Some(c) = self.last_graphic else {
                    return ApplyResult::Invalid;
                };
                for _ in 0..seq.param_or(0, 1) {
                    self.print_char(c);
                }
            }
            "SGR" => return self.apply_sgr(seq),
            "SM" | "RM" => {
                let enabled = function.mnemonic == "SM";
                let mut result = ApplyResult::Ok;
                for number in seq.parameters.iter() {
                    match AnsiMode::from_number(number) {
                        Some(mode) => self.set_ansi_mode(mode, enabled),
                        None => result = ApplyResult::Unsupported,
                    }
                }
                return result;
            }
            "DECSET" | "DECRST" => {
                let enabled = function.mnemonic == "DECSET";
                let mut result = ApplyResult::Ok;
                for number in seq.parameters.iter() {
                    match DecMode::from_number(number) {
                        Some(mode) => self.set_dec_mode(mode, enabled),
                        None => result = ApplyResult::Unsupported,
                    }
                }
                return result;
            }
            "DECSTBM" => {
                return self.set_scrolling_region(
                    seq.param_or(0, 1) as usize,
                    seq.param(1) as usize,
                )
            }
            "DECSLRM" => {
                return self.set_left_right_margin(
                    seq.param_or(0, 1) as usize,
                    seq.param(1) as usize,
                )
            }
            "SCOSC" => self.save_cursor(),
            "SCORC" => self.restore_cursor(),
            "TBC" => self.clear_tab_stops(seq.param(0)),
            "DA1" => {
                if seq.param(0) != 0 {
                    return ApplyResult::Invalid;
                }
                self.report_device_attributes();
            }
            "DA2" => {
                if seq.param(0) != 0 {
                    return ApplyResult::Invalid;
                }
                self.report_secondary_attributes();
            }
            "DA3" => {
                if seq.param(0) != 0 {
                    return ApplyResult::Invalid;
                }
                self.report_tertiary_attributes();
            }
            "DSR" => return self.report_device_status(seq.param(0), false),
            "DECDSR" => return self.report_device_status(seq.param(0), true),
            "DECSCUSR" => {
                let (shape, display) = match seq.param(0) {
                    0 | 1 => (CursorShape::Block, CursorDisplay::Blink),
                    2 => (CursorShape::Block, CursorDisplay::Steady),
                    3 => (CursorShape::Underscore, CursorDisplay::Blink),
                    4 => (CursorShape::Underscore, CursorDisplay::Steady),
                    5 => (CursorShape::Bar, CursorDisplay::Blink),
                    6 => (CursorShape::Bar, CursorDisplay::Steady),
                    _ => return ApplyResult::Invalid,
                };
                self.cursor.shape = shape;
                self.cursor.display = display;
            }
            "DECSTR" => self.soft_reset(),
            "XTWINOPS" => return self.window_ops(seq),
            _ => return ApplyResult::Unsupported,
        }
        ApplyResult::Ok
    }

    fn apply_osc(&mut self, function: &FunctionDefinition, seq: &Sequence) -> ApplyResult {
        let data = seq.data_str();
        match function.mnemonic {
            "OSC0" => {
                self.set_title(&data);
                self.set_icon_name(&data);
            }
            "OSC1" => self.set_icon_name(&data),
            "OSC2" => self.set_title(&data),
            "OSC4" => return self.apply_osc_color(&data),
            "OSC8" => {
                let (params, uri) = data.split_once(';').unwrap_or(("", data.as_str()));
                self.set_hyperlink(params, uri);
            }
            "OSC10" | "OSC11" | "OSC12" | "OSC13" | "OSC14" | "OSC17" | "OSC19" => {
                return self.apply_dynamic_color(function.final_byte, &data)
            }
            "OSC52" => {
                let (selection, payload) = data.split_once(';').unwrap_or(("c", ""));
                self.notify(TermEvent::ClipboardWrite {
                    selection: selection.to_string(),
                    data: payload.to_string(),
                });
            }
            "OSC104" => {
                if data.is_empty() {
                    self.palette.reset_all_indexed();
                } else {
                    for index in data.split(';').filter_map(|part| part.parse::<u8>().ok()) {
                        self.palette.reset_indexed(index);
                    }
                }
            }
            "OSC110" => self.palette.foreground = ColorPalette::default().foreground,
            "OSC111" => self.palette.background = ColorPalette::default().background,
            "OSC112" => self.palette.cursor = ColorPalette::default().cursor,
            _ => return ApplyResult::Unsupported,
        }
        ApplyResult::Ok
    }

    /// OSC 4: `index;spec` pairs, `?` queries
    fn apply_osc_color(&mut self, data: &str) -> ApplyResult {
        let mut parts = data.split(';');
        let mut result = ApplyResult::Ok;
        while let (Some(index), Some(spec)) = (parts.next(), parts.next()) {
            let Ok(index) = index.parse::<u8>() else {
                result = ApplyResult::Invalid;
                continue;
            };
            if spec == "?" {
                let value = self.palette.indexed(index).to_x11_spec();
                let reply = format!("\x1b]4;{index};{value}\x1b\\");
                self.reply(reply.as_bytes());
            } else if let Some(color) = parse_color_spec(spec) {
                self.palette.set_indexed(index, color);
            } else {
                result = ApplyResult::Invalid;
            }
        }
        result
    }

    /// OSC 10-19: dynamic colors (foreground, background, cursor,
    /// mouse and highlight colors)
    fn apply_dynamic_color(&mut self, code: u16, data: &str) -> ApplyResult {
        if data == "?" {
            let value = match code {
                10 => self.palette.foreground,
                11 => self.palette.background,
                12 => self.palette.cursor,
                13 => self.palette.mouse_foreground,
                14 => self.palette.mouse_background,
                17 => self.palette.highlight_background,
                _ => self.palette.highlight_foreground,
            };
            let reply = format!("\x1b]{code};{}\x1b\\", value.to_x11_spec());
            self.reply(reply.as_bytes());
            return ApplyResult::Ok;
        }
        let Some(color) = parse_color_spec(data) else {
            return ApplyResult::Invalid;
        };
        match code {
            10 => self.palette.foreground = color,
            11 => self.palette.background = color,
            12 => self.palette.cursor = color,
            13 => self.palette.mouse_foreground = color,
            14 => self.palette.mouse_background = color,
            17 => self.palette.highlight_background = color,
            _ => self.palette.highlight_foreground = color,
        }
        ApplyResult::Ok
    }

    /// SGR: legacy `;`-separated and `:`-subparameter forms
    pub fn apply_sgr(&mut self, seq: &Sequence) -> ApplyResult {
        if seq.parameter_count() == 0 {
            self.cursor.attributes.reset();
            return ApplyResult::Ok;
        }
        let mut result = ApplyResult::Ok;
        let mut index = 0;
        while index < seq.parameter_count() {
            match seq.param(index) {
                0 => self.cursor.attributes.reset(),
                1 => self.cursor.attributes.flags.insert(CellFlags::BOLD),
                2 => self.cursor.attributes.flags.insert(CellFlags::FAINT),
                3 => self.cursor.attributes.flags.insert(CellFlags::ITALIC),
                4 => {
                    let style = seq.subparams(index).first().copied().unwrap_or(1);
                    self.cursor.attributes.flags.remove(CellFlags::ANY_UNDERLINE);
                    let style_flag = match style {
                        0 => None,
                        1 => Some(CellFlags::UNDERLINE),
                        2 => Some(CellFlags::DOUBLY_UNDERLINED),
                        3 => Some(CellFlags::CURLY_UNDERLINED),
                        4 => Some(CellFlags::DOTTED_UNDERLINE),
                        5 => Some(CellFlags::DASHED_UNDERLINE),
                        _ => {
                            result = ApplyResult::Invalid;
                            None
                        }
                    };
                    if let Some(flag) = style_flag {
                        self.cursor.attributes.flags.insert(flag);
                    }
                }
                5 | 6 => self.cursor.attributes.flags.insert(CellFlags::BLINKING),
                7 => self.cursor.attributes.flags.insert(CellFlags::INVERSE),
                8 => self.cursor.attributes.flags.insert(CellFlags::HIDDEN),
                9 => self.cursor.attributes.flags.insert(CellFlags::CROSSED_OUT),
                21 => self.cursor.attributes.flags.insert(CellFlags::DOUBLY_UNDERLINED),
                22 => self.cursor.attributes.flags.remove(CellFlags::BOLD | CellFlags::FAINT),
                23 => self.cursor.attributes.flags.remove(CellFlags::ITALIC),
                24 => self.cursor.attributes.flags.remove(CellFlags::ANY_UNDERLINE),
                25 => self.cursor.attributes.flags.remove(CellFlags::BLINKING),
                27 => self.cursor.attributes.flags.remove(CellFlags::INVERSE),
                28 => self.cursor.attributes.flags.remove(CellFlags::HIDDEN),
                29 => self.cursor.attributes.flags.remove(CellFlags::CROSSED_OUT),
                30..=37 => {
                    self.cursor.attributes.foreground =
                        Color::Indexed((seq.param(index) - 30) as u8)
                }
                38 => match parse_sgr_color(seq, &mut index) {
                    Some(color) => self.cursor.attributes.foreground = color,
                    None => result = ApplyResult::Invalid,
                },
                39 => self.cursor.attributes.foreground = Color::Default,
                40..=47 => {
                    self.cursor.attributes.background =
                        Color::Indexed((seq.param(index) - 40) as u8)
                }
                48 => match parse_sgr_color(seq, &mut index) {
                    Some(color) => self.cursor.attributes.background = color,
                    None => result = ApplyResult::Invalid,
                },
                49 => self.cursor.attributes.background = Color::Default,
                51 => self.cursor.attributes.flags.insert(CellFlags::FRAMED),
                52 => self.cursor.attributes.flags.insert(CellFlags::ENCIRCLED),
                53 => self.cursor.attributes.flags.insert(CellFlags::OVERLINE),
                54 => self.cursor.attributes.flags.remove(CellFlags::FRAMED | CellFlags::ENCIRCLED),
                55 => self.cursor.attributes.flags.remove(CellFlags::OVERLINE),
                58 => match parse_sgr_color(seq, &mut index) {
                    Some(color) => self.cursor.attributes.underline_color = color,
                    None => result = ApplyResult::Invalid,
                },
                59 => self.cursor.attributes.underline_color = Color::Default,
                90..=97 => {
                    self.cursor.attributes.foreground =
                        Color::Bright((seq.param(index) - 90) as u8)
                }
                100..=107 => {
                    self.cursor.attributes.background =
                        Color::Bright((seq.param(index) - 100) as u8)
                }
                _ => result = ApplyResult::Unsupported,
            }
            index += 1;
        }
        result
    }
}

/// Extended color for SGR 38/48/58 in both wire forms.
///
/// Sub-parameter form: `38:5:n`, `38:2:r:g:b` or `38:2::r:g:b` (with a
/// colorspace slot). Legacy form: `38;5;n` / `38;2;r;g;b`, consuming
/// the following top-level parameters and advancing `index` past them.
fn parse_sgr_color(seq: &Sequence, index: &mut usize) -> Option<Color> {
    let subparams = seq.subparams(*index);
    if !subparams.is_empty() {
        return match subparams[0] {
            5 if subparams.len() >= 2 => Some(Color::Indexed(subparams[1].min(255) as u8)),
            2 if subparams.len() == 4 => Some(Color::Rgb(
                subparams[1].min(255) as u8,
                subparams[2].min(255) as u8,
                subparams[3].min(255) as u8,
            )),
            2 if subparams.len() >= 5 => Some(Color::Rgb(
                subparams[2].min(255) as u8,
                subparams[3].min(255) as u8,
                subparams[4].min(255) as u8,
            )),
            _ => None,
        };
    }

    match seq.param(*index + 1) {
        5 if seq.parameter_count() > *index + 2 => {
            let color = Color::Indexed(seq.param(*index + 2).min(255) as u8);
            *index += 2;
            Some(color)
        }
        2 if seq.parameter_count() > *index + 4 => {
            let color = Color::Rgb(
                seq.param(*index + 2).min(255) as u8,
                seq.param(*index + 3).min(255) as u8,
                seq.param(*index + 4).min(255) as u8,
            );
            *index += 4;
            Some(color)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_parser::Params;

    fn screen() -> Screen {
        Screen::new(Size::new(80, 24), Some(100))
    }

    fn print_str(screen: &mut Screen, text: &str) {
        for c in text.chars() {
            screen.print_char(c);
        }
    }

    fn sgr(screen: &mut Screen, input: &[u8]) {
        let mut params = Params::new();
        for &byte in input {
            params.put(byte);
        }
        params.finish();
        let seq = Sequence::csi(None, params, vec![], b'm');
        screen.apply_sgr(&seq);
    }

    #[test]
    fn test_print_advances_cursor() {
        let mut screen = screen();
        print_str(&mut screen, "Hi");
        assert_eq!(screen.cursor().position, Coordinate::new(1, 3));
        assert_eq!(screen.grid().at(Coordinate::new(1, 1)).text(), "H");
        assert_eq!(screen.grid().at(Coordinate::new(1, 2)).text(), "i");
    }

    #[test]
    fn test_wide_char_occupies_two_cells() {
        let mut screen = screen();
        print_str(&mut screen, "世x");
        assert_eq!(screen.grid().at(Coordinate::new(1, 1)).text(), "世");
        assert!(screen.grid().at(Coordinate::new(1, 2)).is_continuation());
        assert_eq!(screen.grid().at(Coordinate::new(1, 3)).text(), "x");
        assert_eq!(screen.cursor().position.column, 4);
    }

    #[test]
    fn test_overwriting_half_of_wide_char_clears_pair() {
        let mut screen = screen();
        print_str(&mut screen, "世");
        screen.move_cursor_to(1, 2);
        print_str(&mut screen, "x");
        assert!(screen.grid().at(Coordinate::new(1, 1)).is_empty());
        assert_eq!(screen.grid().at(Coordinate::new(1, 2)).text(), "x");
    }

    #[test]
    fn test_autowrap_at_right_margin() {
        let mut screen = Screen::new(Size::new(4, 3), None);
        print_str(&mut screen, "abcd");
        assert_eq!(screen.cursor().position, Coordinate::new(1, 4));
        assert!(screen.cursor().wrap_pending);

        print_str(&mut screen, "e");
        assert_eq!(screen.cursor().position, Coordinate::new(2, 2));
        assert!(screen.grid().line(1).wrapped());
        assert_eq!(screen.grid().at(Coordinate::new(2, 1)).text(), "e");
    }

    #[test]
    fn test_autowrap_disabled_overwrites_margin() {
        let mut screen = Screen::new(Size::new(4, 3), None);
        screen.set_dec_mode(DecMode::AutoWrap, false);
        print_str(&mut screen, "abcdef");
        assert_eq!(screen.cursor().position, Coordinate::new(1, 4));
        assert_eq!(screen.grid().at(Coordinate::new(1, 4)).text(), "f");
    }

    #[test]
    fn test_combining_mark_joins_cell() {
        let mut screen = screen();
        screen.print_char('e');
        screen.print_char('\u{0301}');
        assert_eq!(screen.grid().at(Coordinate::new(1, 1)).text(), "e\u{0301}");
        assert_eq!(screen.cursor().position.column, 2);
    }

    #[test]
    fn test_zwj_sequence_stays_in_one_cell() {
        let mut screen = screen();
        screen.print_char('👩');
        screen.print_char('\u{200D}');
        screen.print_char('💻');
        let cell = screen.grid().at(Coordinate::new(1, 1));
        assert_eq!(cell.codepoint_count(), 3);
        assert_eq!(cell.width(), 2);
    }

    #[test]
    fn test_scroll_at_bottom_feeds_scrollback() {
        let mut screen = Screen::new(Size::new(10, 2), Some(10));
        print_str(&mut screen, "one");
        screen.linefeed();
        screen.carriage_return();
        print_str(&mut screen, "two");
        screen.linefeed();
        screen.carriage_return();
        print_str(&mut screen, "three");

        assert_eq!(screen.grid().history_line_count(), 1);
        assert_eq!(screen.grid().line(0).to_utf8_trimmed(), "one");
        assert_eq!(screen.grid().line(1).to_utf8_trimmed(), "two");
        assert_eq!(screen.grid().line(2).to_utf8_trimmed(), "three");
    }

    #[test]
    fn test_scrolling_region_constrains_linefeed() {
        let mut screen = Screen::new(Size::new(10, 6), Some(10));
        screen.set_scrolling_region(2, 4);
        screen.move_cursor_to(4, 1);
        print_str(&mut screen, "x");
        screen.linefeed();

        // The cursor stays on row 4; rows outside the margin are intact
        assert_eq!(screen.cursor().position.row, 4);
        assert_eq!(screen.grid().history_line_count(), 0);
        assert_eq!(screen.grid().line(3).to_utf8_trimmed(), "x");
    }

    #[test]
    fn test_origin_mode_addressing() {
        let mut screen = Screen::new(Size::new(20, 10), None);
        screen.set_scrolling_region(3, 8);
        screen.set_dec_mode(DecMode::Origin, true);
        screen.move_cursor_to(1, 1);
        assert_eq!(screen.cursor().position.row, 3);

        screen.move_cursor_to(100, 1);
        assert_eq!(screen.cursor().position.row, 8);
    }

    #[test]
    fn test_erase_in_display_all() {
        let mut screen = screen();
        print_str(&mut screen, "hello");
        screen.erase_in_display(2);
        assert!(screen.grid().line(1).blank());
        // ED does not move the cursor
        assert_eq!(screen.cursor().position.column, 6);
    }

    #[test]
    fn test_erase_uses_current_background() {
        let mut screen = screen();
        sgr(&mut screen, b"41");
        screen.erase_in_display(2);
        assert_eq!(
            screen.grid().at(Coordinate::new(1, 1)).attributes().background,
            Color::Indexed(1)
        );
    }

    #[test]
    fn test_sgr_basic_and_reset() {
        let mut screen = screen();
        sgr(&mut screen, b"1;31");
        assert!(screen.cursor().attributes.flags.contains(CellFlags::BOLD));
        assert_eq!(screen.cursor().attributes.foreground, Color::Indexed(1));

        sgr(&mut screen, b"0");
        assert_eq!(screen.cursor().attributes, GraphicsAttributes::default());
    }

    #[test]
    fn test_sgr_256_and_rgb_colors() {
        let mut screen = screen();
        sgr(&mut screen, b"38;5;196");
        assert_eq!(screen.cursor().attributes.foreground, Color::Indexed(196));

        sgr(&mut screen, b"38;2;10;20;30");
        assert_eq!(
            screen.cursor().attributes.foreground,
            Color::Rgb(10, 20, 30)
        );

        sgr(&mut screen, b"48:5:17");
        assert_eq!(screen.cursor().attributes.background, Color::Indexed(17));

        sgr(&mut screen, b"38:2::1:2:3");
        assert_eq!(screen.cursor().attributes.foreground, Color::Rgb(1, 2, 3));
    }

    #[test]
    fn test_sgr_underline_styles() {
        let mut screen = screen();
        sgr(&mut screen, b"4:3");
        assert!(screen
            .cursor()
            .attributes
            .flags
            .contains(CellFlags::CURLY_UNDERLINED));

        sgr(&mut screen, b"4:0");
        assert!(!screen
            .cursor()
            .attributes
            .flags
            .intersects(CellFlags::ANY_UNDERLINE));

        sgr(&mut screen, b"58;2;5;6;7");
        assert_eq!(
            screen.cursor().attributes.underline_color,
            Color::Rgb(5, 6, 7)
        );
    }

    #[test]
    fn test_sgr_bright_colors() {
        let mut screen = screen();
        sgr(&mut screen, b"91;102");
        assert_eq!(screen.cursor().attributes.foreground, Color::Bright(1));
        assert_eq!(screen.cursor().attributes.background, Color::Bright(2));
    }

    #[test]
    fn test_tab_stops() {
        let mut screen = screen();
        screen.tab();
        assert_eq!(screen.cursor().position.column, 9);
        screen.tab();
        assert_eq!(screen.cursor().position.column, 17);
        screen.backtab(1);
        assert_eq!(screen.cursor().position.column, 9);

        screen.clear_tab_stops(3);
        screen.move_cursor_to(1, 1);
        screen.tab();
        assert_eq!(screen.cursor().position.column, 80);
    }

    #[test]
    fn test_alt_screen_round_trip() {
        let mut screen = screen();
        print_str(&mut screen, "primary");
        let saved_cursor = screen.cursor().position;

        screen.set_dec_mode(DecMode::ExtendedAltScreen, true);
        assert_eq!(screen.active_buffer(), BufferType::Alternate);
        print_str(&mut screen, "alt");

        screen.set_dec_mode(DecMode::ExtendedAltScreen, false);
        assert_eq!(screen.active_buffer(), BufferType::Primary);
        assert_eq!(screen.grid().line(1).to_utf8_trimmed(), "primary");
        assert_eq!(screen.cursor().position, saved_cursor);
    }

    #[test]
    fn test_alt_screen_has_no_scrollback() {
        let mut screen = Screen::new(Size::new(10, 2), Some(100));
        screen.set_dec_mode(DecMode::UseAlternateScreen, true);
        for _ in 0..5 {
            screen.linefeed();
        }
        assert_eq!(screen.grid().history_line_count(), 0);
    }

    #[test]
    fn test_hyperlink_applied_to_cells() {
        let mut screen = screen();
        screen.set_hyperlink("", "https://example.com");
        print_str(&mut screen, "link");
        screen.set_hyperlink("", "");
        print_str(&mut screen, "plain");

        let cell = screen.grid().at(Coordinate::new(1, 1));
        assert_eq!(cell.hyperlink().unwrap().uri, "https://example.com");
        let plain = screen.grid().at(Coordinate::new(1, 5));
        assert!(plain.hyperlink().is_none());
    }

    #[test]
    fn test_hover_marks_linked_cells() {
        let mut screen = screen();
        screen.set_hyperlink("id=doc", "https://example.com");
        print_str(&mut screen, "ab");
        screen.set_hyperlink("", "");
        print_str(&mut screen, "c");

        let link = screen.hover_hyperlink_at(Coordinate::new(1, 1)).unwrap();
        assert_eq!(link.uri, "https://example.com");
        assert!(screen
            .grid()
            .at(Coordinate::new(1, 2))
            .attributes()
            .flags
            .contains(CellFlags::HOVER));
        assert!(!screen
            .grid()
            .at(Coordinate::new(1, 3))
            .attributes()
            .flags
            .contains(CellFlags::HOVER));

        // Hovering a plain cell clears the marks
        assert!(screen.hover_hyperlink_at(Coordinate::new(1, 3)).is_none());
        assert!(!screen
            .grid()
            .at(Coordinate::new(1, 1))
            .attributes()
            .flags
            .contains(CellFlags::HOVER));
    }

    #[test]
    fn test_device_status_report() {
        let mut screen = screen();
        screen.move_cursor_to(3, 7);
        screen.report_device_status(6, false);
        assert_eq!(screen.take_replies(), b"\x1b[3;7R");
    }

    #[test]
    fn test_cpr_honors_origin_mode() {
        let mut screen = screen();
        screen.set_scrolling_region(5, 20);
        screen.set_dec_mode(DecMode::Origin, true);
        screen.move_cursor_to(2, 3);
        screen.report_device_status(6, false);
        assert_eq!(screen.take_replies(), b"\x1b[2;3R");
    }

    #[test]
    fn test_decrqss_scrolling_region() {
        let mut screen = screen();
        screen.set_scrolling_region(3, 10);
        screen.request_status_string(b"r");
        assert_eq!(screen.take_replies(), b"\x1bP1$r3;10r\x1b\\");
    }

    #[test]
    fn test_decrqss_unknown() {
        let mut screen = screen();
        screen.request_status_string(b"z");
        assert_eq!(screen.take_replies(), b"\x1bP0$r\x1b\\");
    }

    #[test]
    fn test_hard_reset_restores_construction_state() {
        let mut screen = screen();
        print_str(&mut screen, "dirty");
        sgr(&mut screen, b"1;31");
        screen.set_scrolling_region(2, 10);
        screen.set_dec_mode(DecMode::Origin, true);
        screen.set_title("dirty");
        screen.hard_reset();

        let fresh = Screen::new(Size::new(80, 24), Some(100));
        assert_eq!(screen.cursor(), fresh.cursor());
        assert_eq!(screen.margin(), fresh.margin());
        assert_eq!(screen.modes(), fresh.modes());
        assert_eq!(screen.title(), "");
        assert_eq!(
            screen.grid().render_main_page_text(),
            fresh.grid().render_main_page_text()
        );
    }

    #[test]
    fn test_insert_delete_lines_respect_margins() {
        let mut screen = Screen::new(Size::new(10, 6), None);
        for row in 1..=6 {
            screen.move_cursor_to(row, 1);
            print_str(&mut screen, &format!("row{row}"));
        }
        screen.set_scrolling_region(2, 5);
        screen.move_cursor_to(3, 1);
        screen.insert_lines(1);

        assert_eq!(screen.grid().line(2).to_utf8_trimmed(), "row2");
        assert!(screen.grid().line(3).blank());
        assert_eq!(screen.grid().line(4).to_utf8_trimmed(), "row3");
        // row5 was pushed out of the margin; row6 is untouched
        assert_eq!(screen.grid().line(5).to_utf8_trimmed(), "row4");
        assert_eq!(screen.grid().line(6).to_utf8_trimmed(), "row6");

        screen.delete_lines(1);
        assert_eq!(screen.grid().line(3).to_utf8_trimmed(), "row3");
    }

    #[test]
    fn test_rep_repeats_last_graphic() {
        let mut screen = screen();
        print_str(&mut screen, "a");
        let seq = Sequence::csi(None, Params::from_values(&[3]), vec![], b'b');
        let function = crate::functions::select(&seq.selector()).unwrap();
        screen.apply(function, &seq);
        assert_eq!(screen.grid().line(1).to_utf8_trimmed(), "aaaa");
    }

    #[test]
    fn test_bell_event() {
        let mut screen = screen();
        screen.bell();
        assert_eq!(screen.poll_event(), Some(TermEvent::Bell));
        assert_eq!(screen.poll_event(), None);
    }

    #[test]
    fn test_resize_reports() {
        let mut screen = screen();
        let seq = Sequence::csi(None, Params::from_values(&[18]), vec![], b't');
        let function = crate::functions::select(&seq.selector()).unwrap();
        screen.apply(function, &seq);
        assert_eq!(screen.take_replies(), b"\x1b[8;24;80t");
    }

    #[test]
    fn test_columns_132_mode() {
        let mut screen = screen();
        print_str(&mut screen, "x");
        screen.set_dec_mode(DecMode::Columns132, true);
        assert_eq!(screen.size().width, 132);
        assert!(screen.grid().line(1).blank());
        assert_eq!(screen.cursor().position, Coordinate::new(1, 1));
    }

    #[test]
    fn test_decaln_fills_page() {
        let mut screen = Screen::new(Size::new(4, 2), None);
        screen.screen_alignment_pattern();
        assert_eq!(screen.grid().line(1).to_utf8(), "EEEE");
        assert_eq!(screen.grid().line(2).to_utf8(), "EEEE");
    }

    #[test]
    fn test_osc4_query_replies() {
        let mut screen = screen();
        let seq = Sequence::osc(b"4;1;?");
        let function = crate::functions::select(&seq.selector()).unwrap();
        screen.apply(function, &seq);
        assert_eq!(screen.take_replies(), b"\x1b]4;1;rgb:cdcd/0000/0000\x1b\\");
    }

    #[test]
    fn test_left_right_margins() {
        let mut screen = Screen::new(Size::new(10, 4), None);
        screen.set_dec_mode(DecMode::LeftRightMargin, true);
        assert_eq!(
            screen.set_left_right_margin(3, 6),
            ApplyResult::Ok
        );
        screen.move_cursor_to(1, 3);
        print_str(&mut screen, "abcdXY");
        // The cursor wrapped at column 6 into the margin's left edge
        assert_eq!(screen.grid().line(1).to_utf8(), "  abcd    ");
        assert_eq!(screen.grid().line(2).to_utf8(), "  XY      ");
    }
}
