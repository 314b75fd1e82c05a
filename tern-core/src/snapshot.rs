//! By-copy snapshots of the visible page
//!
//! A snapshot is a consistent, serializable view of the screen for
//! renderers on other threads and for golden tests. It copies the cell
//! data; the live grid can keep mutating underneath.

use serde::{Deserialize, Serialize};

use crate::cell::GraphicsAttributes;
use crate::cursor::{CursorDisplay, CursorShape};
use crate::grid::Size;
use crate::screen::Screen;

/// One captured cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub text: String,
    pub width: u8,
    pub attributes: GraphicsAttributes,
    /// Target URI when the cell is part of a hyperlink
    pub hyperlink: Option<String>,
}

/// One captured row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub cells: Vec<CellSnapshot>,
    pub wrapped: bool,
}

/// Captured cursor state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    pub row: i32,
    pub column: i32,
    pub visible: bool,
    pub shape: CursorShape,
    pub display: CursorDisplay,
}

/// A consistent view of the visible page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub size: Size,
    pub cursor: CursorSnapshot,
    pub lines: Vec<LineSnapshot>,
    pub title: String,
    /// Scrollback lines retained behind the page
    pub history_line_count: usize,
}

impl Snapshot {
    /// Capture the main page of a screen
    pub fn capture(screen: &Screen) -> Self {
        let grid = screen.grid();
        let size = screen.size();
        let lines = (1..=size.height as i32)
            .map(|row| {
                let line = grid.line(row);
                LineSnapshot {
                    wrapped: line.wrapped(),
                    cells: line
                        .cells()
                        .iter()
                        .map(|cell| CellSnapshot {
                            text: cell.text().to_string(),
                            width: cell.width(),
                            attributes: *cell.attributes(),
                            hyperlink: cell.hyperlink().map(|link| link.uri.clone()),
                        })
                        .collect(),
                }
            })
            .collect();

        Self {
            size,
            cursor: CursorSnapshot {
                row: screen.cursor().position.row,
                column: screen.cursor().position.column,
                visible: screen.cursor().visible,
                shape: screen.cursor().shape,
                display: screen.cursor().display,
            },
            lines,
            title: screen.title().to_string(),
            history_line_count: grid.history_line_count(),
        }
    }

    /// Page text with trailing blanks trimmed per row
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| {
                let row: String = line
                    .cells
                    .iter()
                    .filter(|cell| cell.width != 0)
                    .map(|cell| {
                        if cell.text.is_empty() {
                            " ".to_string()
                        } else {
                            cell.text.clone()
                        }
                    })
                    .collect();
                row.trim_end().to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
