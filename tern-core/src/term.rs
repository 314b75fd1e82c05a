//! The assembled terminal: parser, sequencer, screen
//!
//! [`Terminal`] is the host-facing entry point. Bytes from the PTY go
//! into [`Terminal::write`]; replies, events and snapshots come back
//! out. `write` is total: any byte sequence leaves the terminal in a
//! well-defined state.

use tern_parser::Parser;

use crate::grid::Size;
use crate::screen::{Screen, TermEvent};
use crate::sequencer::Sequencer;
use crate::snapshot::Snapshot;

/// A complete terminal emulation core instance
#[derive(Debug)]
pub struct Terminal {
    parser: Parser,
    sequencer: Sequencer,
}

impl Terminal {
    /// Create a terminal with the given page size and scrollback bound
    /// (`None` = unbounded history)
    pub fn new(size: Size, max_history_line_count: Option<usize>) -> Self {
        Self {
            parser: Parser::new(),
            sequencer: Sequencer::new(Screen::new(size, max_history_line_count)),
        }
    }

    /// Feed raw PTY output. Partial escape sequences and split UTF-8
    /// are carried over to the next call.
    pub fn write(&mut self, bytes: &[u8]) {
        for action in self.parser.feed(bytes) {
            self.sequencer.handle(action);
        }
    }

    pub fn screen(&self) -> &Screen {
        self.sequencer.screen()
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        self.sequencer.screen_mut()
    }

    pub fn size(&self) -> Size {
        self.sequencer.screen().size()
    }

    /// Resize the page; the cursor keeps its logical position
    pub fn resize(&mut self, size: Size) {
        self.sequencer.screen_mut().resize(size);
    }

    /// Bytes waiting to be written back to the PTY (DA, DSR, DECRQSS…)
    pub fn take_replies(&mut self) -> Vec<u8> {
        self.sequencer.screen_mut().take_replies()
    }

    /// Next pending host notification
    pub fn poll_event(&mut self) -> Option<TermEvent> {
        self.sequencer.screen_mut().poll_event()
    }

    /// Consistent by-copy view of the visible page
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.sequencer.screen())
    }

    /// Count of applied control functions, for input pacing
    pub fn instruction_counter(&self) -> u64 {
        self.sequencer.instruction_counter()
    }

    /// Apply anything deferred by batched rendering (DECSET 2026). The
    /// host drives the flush timeout; the mode-off sequence flushes on
    /// its own.
    pub fn flush_batched(&mut self) {
        self.sequencer.flush_batched();
    }

    /// Full reset, as if freshly constructed with the same dimensions
    pub fn hard_reset(&mut self) {
        self.parser.reset();
        self.sequencer.hard_reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Coordinate;

    #[test]
    fn test_write_and_read_back() {
        let mut term = Terminal::new(Size::new(20, 5), Some(100));
        term.write(b"hello");
        assert_eq!(term.snapshot().text(), "hello\n\n\n\n");
        assert_eq!(term.screen().cursor().position, Coordinate::new(1, 6));
    }

    #[test]
    fn test_split_write_equivalence() {
        let input: &[u8] = "a\x1b[31m日本\x1b[0m b".as_bytes();
        let mut whole = Terminal::new(Size::new(20, 5), Some(100));
        whole.write(input);

        for split in 1..input.len() {
            let mut parts = Terminal::new(Size::new(20, 5), Some(100));
            parts.write(&input[..split]);
            parts.write(&input[split..]);
            assert_eq!(parts.snapshot(), whole.snapshot(), "split at {split}");
        }
    }

    #[test]
    fn test_replies_are_collected() {
        let mut term = Terminal::new(Size::new(20, 5), None);
        term.write(b"\x1b[6n");
        assert_eq!(term.take_replies(), b"\x1b[1;1R");
        assert!(term.take_replies().is_empty());
    }

    #[test]
    fn test_events_are_collected() {
        let mut term = Terminal::new(Size::new(20, 5), None);
        term.write(b"\x1b]2;hello\x07\x07");
        assert_eq!(
            term.poll_event(),
            Some(TermEvent::TitleChanged("hello".into()))
        );
        assert_eq!(term.poll_event(), Some(TermEvent::Bell));
        assert_eq!(term.poll_event(), None);
    }

    #[test]
    fn test_hard_reset_clears_pending_parse_state() {
        let mut term = Terminal::new(Size::new(20, 5), None);
        term.write(b"\x1b[1;2");
        term.hard_reset();
        term.write(b"Hx");
        assert_eq!(term.snapshot().text(), "Hx\n\n\n\n");
    }

    #[test]
    fn test_instruction_counter_paces() {
        let mut term = Terminal::new(Size::new(20, 5), None);
        term.write(b"\x1b[1A\x1b[2B\x1b[0m");
        assert_eq!(term.instruction_counter(), 3);
    }
}
