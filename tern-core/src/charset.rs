//! Character set designation and translation
//!
//! The four designation slots G0-G3 each hold a charset; SI/SO pick the
//! active slot and SS2/SS3 borrow G2/G3 for a single character. Printed
//! characters pass through the active charset's translation.

use serde::{Deserialize, Serialize};

/// A designatable character set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Charset {
    /// US-ASCII, the identity translation
    #[default]
    UsAscii,
    /// DEC Special Character and Line Drawing Set
    Special,
    /// British (only `#` differs)
    British,
}

impl Charset {
    /// Map a designation final byte (`ESC ( F` and friends) to a charset
    pub fn from_designator(byte: u8) -> Option<Charset> {
        match byte {
            b'B' | b'@' => Some(Charset::UsAscii),
            b'0' | b'2' => Some(Charset::Special),
            b'A' => Some(Charset::British),
            _ => None,
        }
    }

    /// Translate one printed character
    pub fn translate(self, c: char) -> char {
        match self {
            Charset::UsAscii => c,
            Charset::Special => special_graphics(c),
            Charset::British => {
                if c == '#' {
                    '£'
                } else {
                    c
                }
            }
        }
    }
}

/// The G0-G3 slots plus shift state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharsetState {
    pub slots: [Charset; 4],
    /// Index of the slot selected into GL (0 = G0)
    pub active: u8,
    /// Pending single shift: the slot to use for the next character only
    pub single_shift: Option<u8>,
}

impl CharsetState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Designate a charset into one of the slots
    pub fn designate(&mut self, slot: u8, charset: Charset) {
        if let Some(entry) = self.slots.get_mut(usize::from(slot)) {
            *entry = charset;
        }
    }

    /// SI: select G0
    pub fn shift_in(&mut self) {
        self.active = 0;
        self.single_shift = None;
    }

    /// SO: select G1
    pub fn shift_out(&mut self) {
        self.active = 1;
        self.single_shift = None;
    }

    /// SS2/SS3: use G2/G3 for the next character
    pub fn single_shift(&mut self, slot: u8) {
        self.single_shift = Some(slot.min(3));
    }

    /// Translate a character, consuming any pending single shift
    pub fn translate(&mut self, c: char) -> char {
        let slot = match self.single_shift.take() {
            Some(slot) => slot,
            None => self.active,
        };
        self.slots[usize::from(slot.min(3))].translate(c)
    }
}

/// DEC Special Graphics: ASCII 0x5F-0x7E become line-drawing glyphs
fn special_graphics(c: char) -> char {
    match c {
        '`' => '◆',
        'a' => '▒',
        'b' => '␉',
        'c' => '␌',
        'd' => '␍',
        'e' => '␊',
        'f' => '°',
        'g' => '±',
        'h' => '␤',
        'i' => '␋',
        'j' => '┘',
        'k' => '┐',
        'l' => '┌',
        'm' => '└',
        'n' => '┼',
        'o' => '⎺',
        'p' => '⎻',
        'q' => '─',
        'r' => '⎼',
        's' => '⎽',
        't' => '├',
        'u' => '┤',
        'v' => '┴',
        'w' => '┬',
        'x' => '│',
        'y' => '≤',
        'z' => '≥',
        '{' => 'π',
        '|' => '≠',
        '}' => '£',
        '~' => '·',
        '_' => ' ',
        _ => c,
    }
}
