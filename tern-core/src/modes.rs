//! ANSI and DEC private modes
//!
//! Two disjoint mode spaces: the four recognized ANSI modes (`CSI Pm h/l`)
//! and the DEC private modes (`CSI ? Pm h/l`). Modes with side effects
//! beyond a flag (column switching, the alternate screen) are handled in
//! the screen; this module only knows numbers and names.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// ANSI modes (SM/RM)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnsiMode {
    /// KAM: lock the keyboard
    KeyboardAction,
    /// IRM: insert instead of replace on print
    Insert,
    /// SRM: local echo disabled
    SendReceive,
    /// LNM: LF implies CR
    AutomaticNewline,
}

impl AnsiMode {
    pub fn from_number(number: u16) -> Option<AnsiMode> {
        match number {
            2 => Some(AnsiMode::KeyboardAction),
            4 => Some(AnsiMode::Insert),
            12 => Some(AnsiMode::SendReceive),
            20 => Some(AnsiMode::AutomaticNewline),
            _ => None,
        }
    }

    pub fn number(self) -> u16 {
        match self {
            AnsiMode::KeyboardAction => 2,
            AnsiMode::Insert => 4,
            AnsiMode::SendReceive => 12,
            AnsiMode::AutomaticNewline => 20,
        }
    }
}

/// DEC private modes (DECSET/DECRST)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecMode {
    /// ?1 DECCKM: cursor keys send application sequences
    ApplicationCursorKeys,
    /// ?2 DECANM: designate US-ASCII into G0-G3
    DesignateCharsetUsAscii,
    /// ?3 DECCOLM: 132-column mode (forces a resize and clear)
    Columns132,
    /// ?4 DECSCLM: smooth scrolling (tracked, not rendered)
    SmoothScroll,
    /// ?5 DECSCNM: reverse video
    ReverseVideo,
    /// ?6 DECOM: cursor addressing relative to the margins
    Origin,
    /// ?7 DECAWM: wrap at the right margin
    AutoWrap,
    /// ?9: X10 mouse reporting
    MouseX10,
    /// ?10: show toolbar (tracked only)
    ShowToolbar,
    /// ?12: blinking cursor
    BlinkingCursor,
    /// ?19 DECPEX: printer extent (tracked only)
    PrinterExtend,
    /// ?25 DECTCEM: cursor visible
    VisibleCursor,
    /// ?30: show scrollbar (tracked only)
    ShowScrollbar,
    /// ?40: allow 80 ↔ 132 column switching
    AllowColumns80To132,
    /// ?46: debug logging
    DebugLogging,
    /// ?47: alternate screen buffer
    UseAlternateScreen,
    /// ?69 DECLRMM: left/right margin mode
    LeftRightMargin,
    /// ?80 DECSDM: sixel scrolling
    SixelScrolling,
    /// ?1000: normal mouse tracking
    MouseNormalTracking,
    /// ?1001: highlight mouse tracking
    MouseHighlightTracking,
    /// ?1002: button-event mouse tracking
    MouseButtonTracking,
    /// ?1003: any-event mouse tracking
    MouseAnyEventTracking,
    /// ?1004: focus in/out reporting
    FocusTracking,
    /// ?1005: UTF-8 mouse encoding
    MouseExtended,
    /// ?1006: SGR mouse encoding
    MouseSgr,
    /// ?1007: wheel events become cursor keys on the alternate screen
    MouseAlternateScroll,
    /// ?1015: urxvt mouse encoding
    MouseUrxvt,
    /// ?1048: save/restore cursor
    SaveCursor,
    /// ?1049: alternate screen with cursor save and clear
    ExtendedAltScreen,
    /// ?1070: sixel streams use private color registers
    UsePrivateColorRegisters,
    /// ?2004: bracketed paste
    BracketedPaste,
    /// ?2026: buffer sequences until reset, apply atomically
    BatchedRendering,
    /// ?2027: newly written lines may reflow on resize
    TextReflow,
}

impl DecMode {
    pub fn from_number(number: u16) -> Option<DecMode> {
        match number {
            1 => Some(DecMode::ApplicationCursorKeys),
            2 => Some(DecMode::DesignateCharsetUsAscii),
            3 => Some(DecMode::Columns132),
            4 => Some(DecMode::SmoothScroll),
            5 => Some(DecMode::ReverseVideo),
            6 => Some(DecMode::Origin),
            7 => Some(DecMode::AutoWrap),
            9 => Some(DecMode::MouseX10),
            10 => Some(DecMode::ShowToolbar),
            12 => Some(DecMode::BlinkingCursor),
            19 => Some(DecMode::PrinterExtend),
            25 => Some(DecMode::VisibleCursor),
            30 => Some(DecMode::ShowScrollbar),
            40 => Some(DecMode::AllowColumns80To132),
            46 => Some(DecMode::DebugLogging),
            47 => Some(DecMode::UseAlternateScreen),
            69 => Some(DecMode::LeftRightMargin),
            80 => Some(DecMode::SixelScrolling),
            1000 => Some(DecMode::MouseNormalTracking),
            1001 => Some(DecMode::MouseHighlightTracking),
            1002 => Some(DecMode::MouseButtonTracking),
            1003 => Some(DecMode::MouseAnyEventTracking),
            1004 => Some(DecMode::FocusTracking),
            1005 => Some(DecMode::MouseExtended),
            1006 => Some(DecMode::MouseSgr),
            1007 => Some(DecMode::MouseAlternateScroll),
            1015 => Some(DecMode::MouseUrxvt),
            1047 => Some(DecMode::UseAlternateScreen),
            1048 => Some(DecMode::SaveCursor),
            1049 => Some(DecMode::ExtendedAltScreen),
            1070 => Some(DecMode::UsePrivateColorRegisters),
            2026 => Some(DecMode::BatchedRendering),
            2004 => Some(DecMode::BracketedPaste),
            2027 => Some(DecMode::TextReflow),
            _ => None,
        }
    }

    pub fn number(self) -> u16 {
        match self {
            DecMode::ApplicationCursorKeys => 1,
            DecMode::DesignateCharsetUsAscii => 2,
            DecMode::Columns132 => 3,
            DecMode::SmoothScroll => 4,
            DecMode::ReverseVideo => 5,
            DecMode::Origin => 6,
            DecMode::AutoWrap => 7,
            DecMode::MouseX10 => 9,
            DecMode::ShowToolbar => 10,
            DecMode::BlinkingCursor => 12,
            DecMode::PrinterExtend => 19,
            DecMode::VisibleCursor => 25,
            DecMode::ShowScrollbar => 30,
            DecMode::AllowColumns80To132 => 40,
            DecMode::DebugLogging => 46,
            DecMode::UseAlternateScreen => 47,
            DecMode::LeftRightMargin => 69,
            DecMode::SixelScrolling => 80,
            DecMode::MouseNormalTracking => 1000,
            DecMode::MouseHighlightTracking => 1001,
            DecMode::MouseButtonTracking => 1002,
            DecMode::MouseAnyEventTracking => 1003,
            DecMode::FocusTracking => 1004,
            DecMode::MouseExtended => 1005,
            DecMode::MouseSgr => 1006,
            DecMode::MouseAlternateScroll => 1007,
            DecMode::MouseUrxvt => 1015,
            DecMode::SaveCursor => 1048,
            DecMode::ExtendedAltScreen => 1049,
            DecMode::UsePrivateColorRegisters => 1070,
            DecMode::BracketedPaste => 2004,
            DecMode::BatchedRendering => 2026,
            DecMode::TextReflow => 2027,
        }
    }
}

/// The screen's current mode flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSet {
    ansi: HashSet<AnsiMode>,
    dec: HashSet<DecMode>,
}

impl Default for ModeSet {
    fn default() -> Self {
        let mut dec = HashSet::new();
        dec.insert(DecMode::AutoWrap);
        dec.insert(DecMode::VisibleCursor);
        dec.insert(DecMode::SixelScrolling);
        dec.insert(DecMode::TextReflow);
        Self {
            ansi: HashSet::new(),
            dec,
        }
    }
}

impl ModeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn ansi(&self, mode: AnsiMode) -> bool {
        self.ansi.contains(&mode)
    }

    /// Returns true when the flag actually changed
    pub fn set_ansi(&mut self, mode: AnsiMode, enabled: bool) -> bool {
        if enabled {
            self.ansi.insert(mode)
        } else {
            self.ansi.remove(&mode)
        }
    }

    pub fn dec(&self, mode: DecMode) -> bool {
        self.dec.contains(&mode)
    }

    /// Returns true when the flag actually changed
    pub fn set_dec(&mut self, mode: DecMode, enabled: bool) -> bool {
        if enabled {
            self.dec.insert(mode)
        } else {
            self.dec.remove(&mode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let modes = ModeSet::new();
        assert!(modes.dec(DecMode::AutoWrap));
        assert!(modes.dec(DecMode::VisibleCursor));
        assert!(modes.dec(DecMode::TextReflow));
        assert!(!modes.dec(DecMode::Origin));
        assert!(!modes.ansi(AnsiMode::Insert));
    }

    #[test]
    fn test_number_round_trip() {
        for number in [1, 3, 6, 7, 25, 47, 69, 1000, 1006, 1049, 2004, 2026, 2027] {
            let mode = DecMode::from_number(number).unwrap();
            assert_eq!(mode.number(), number);
        }
        for number in [2, 4, 12, 20] {
            let mode = AnsiMode::from_number(number).unwrap();
            assert_eq!(mode.number(), number);
        }
    }

    #[test]
    fn test_1047_aliases_alt_screen() {
        assert_eq!(
            DecMode::from_number(1047),
            Some(DecMode::UseAlternateScreen)
        );
    }

    #[test]
    fn test_unknown_mode() {
        assert_eq!(DecMode::from_number(9999), None);
        assert_eq!(AnsiMode::from_number(9999), None);
    }

    #[test]
    fn test_set_reports_change() {
        let mut modes = ModeSet::new();
        assert!(modes.set_dec(DecMode::BracketedPaste, true));
        assert!(!modes.set_dec(DecMode::BracketedPaste, true));
        assert!(modes.set_dec(DecMode::BracketedPaste, false));
        assert!(!modes.set_dec(DecMode::BracketedPaste, false));
    }
}
