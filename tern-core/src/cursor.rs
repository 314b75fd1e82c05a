//! Cursor state
//!
//! The cursor carries its 1-based position, the rendition applied to
//! newly written cells, the one-shot wrap latch, charset state and the
//! per-cursor mode flags. [`SavedCursor`] is the immutable snapshot kept
//! on the save/restore stack for DECSC/DECRC and DECSET 1048.

use serde::{Deserialize, Serialize};

use crate::cell::GraphicsAttributes;
use crate::charset::CharsetState;
use crate::grid::Coordinate;

/// How many saved cursors the stack retains
pub const SAVED_CURSOR_STACK_DEPTH: usize = 32;

/// Cursor shape selected via DECSCUSR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorShape {
    #[default]
    Block,
    Underscore,
    Bar,
}

/// Blink behavior selected via DECSCUSR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorDisplay {
    #[default]
    Blink,
    Steady,
}

/// The active cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// 1-based position on the main page
    pub position: Coordinate,
    /// Rendition for newly written cells
    pub attributes: GraphicsAttributes,
    /// Set when the cursor sits past the right margin awaiting a wrap
    pub wrap_pending: bool,
    /// G0-G3 designations and shift state
    pub charsets: CharsetState,
    /// DECOM: addressing is relative to the margins
    pub origin_mode: bool,
    /// DECAWM: wrap at the right margin
    pub autowrap: bool,
    /// DECTCEM: cursor is visible
    pub visible: bool,
    pub shape: CursorShape,
    pub display: CursorDisplay,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            position: Coordinate::default(),
            attributes: GraphicsAttributes::default(),
            wrap_pending: false,
            charsets: CharsetState::default(),
            origin_mode: false,
            autowrap: true,
            visible: true,
            shape: CursorShape::default(),
            display: CursorDisplay::default(),
        }
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot for the saved-cursor stack
    pub fn save(&self) -> SavedCursor {
        SavedCursor {
            position: self.position,
            attributes: self.attributes,
            charsets: self.charsets,
            origin_mode: self.origin_mode,
            autowrap: self.autowrap,
        }
    }

    /// Restore from a snapshot; the wrap latch always clears
    pub fn restore(&mut self, saved: &SavedCursor) {
        self.position = saved.position;
        self.attributes = saved.attributes;
        self.charsets = saved.charsets;
        self.origin_mode = saved.origin_mode;
        self.autowrap = saved.autowrap;
        self.wrap_pending = false;
    }
}

/// Immutable cursor snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCursor {
    pub position: Coordinate,
    pub attributes: GraphicsAttributes,
    pub charsets: CharsetState,
    pub origin_mode: bool,
    pub autowrap: bool,
}

impl Default for SavedCursor {
    fn default() -> Self {
        Cursor::default().save()
    }
}
