//! tern-core - terminal screen model and sequencer
//!
//! The stateful half of the tern terminal emulation core. `tern-parser`
//! turns PTY bytes into actions; this crate owns everything those
//! actions act upon: the cell grid with scrollback and reflow, cursor
//! and modes, margins and tab stops, the alternate screen, the color
//! palette, hyperlinks and sixel images.
//!
//! The crate is deterministic and single-threaded: the same byte stream
//! always produces the same screen state, and nothing here blocks or
//! spawns. Hosts integrate by calling [`Terminal::write`] with PTY
//! output, draining [`Terminal::take_replies`] back into the PTY and
//! reacting to [`TermEvent`]s.
//!
//! # Example
//!
//! ```
//! use tern_core::{Size, Terminal};
//!
//! let mut term = Terminal::new(Size::new(80, 24), Some(10_000));
//! term.write(b"hello \x1b[1;31mworld\x1b[0m");
//! assert_eq!(term.snapshot().text().trim_end(), "hello world");
//! ```

mod cell;
mod charset;
mod color;
mod cursor;
pub mod functions;
mod grid;
mod hyperlink;
mod image;
mod line;
mod modes;
mod screen;
mod sequence;
mod sequencer;
mod snapshot;
mod term;

pub use cell::{display_width, Cell, CellFlags, GraphicsAttributes, MAX_CODEPOINTS};
pub use charset::{Charset, CharsetState};
pub use color::{parse_color_spec, xterm_palette, Color, ColorPalette, RgbColor};
pub use cursor::{Cursor, CursorDisplay, CursorShape, SavedCursor};
pub use grid::{Coordinate, Grid, Margin, MarginRange, Size};
pub use hyperlink::{Hyperlink, HyperlinkRef, HyperlinkStore};
pub use image::{ImageData, ImageFragment, ImageRef};
pub use line::{Line, LineFlags};
pub use modes::{AnsiMode, DecMode, ModeSet};
pub use screen::{BufferType, Screen, TabStops, TermEvent, DEFAULT_MAX_HISTORY_LINE_COUNT};
pub use sequence::{ApplyResult, Sequence};
pub use sequencer::Sequencer;
pub use snapshot::{CellSnapshot, CursorSnapshot, LineSnapshot, Snapshot};
pub use term::Terminal;
