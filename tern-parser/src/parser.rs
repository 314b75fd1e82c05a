//! VT parser state machine
//!
//! A VT500-series compatible parser in the style of the state machine
//! described by Paul Williams (https://vt100.net/emu/dec_ansi_parser).
//! It consumes raw PTY bytes, including sequences split across arbitrary
//! chunk boundaries, and produces semantic [`Action`]s.
//!
//! States:
//! - Ground: printable text (with incremental UTF-8 decoding)
//! - Escape / EscapeIntermediate: ESC sequences
//! - CsiEntry / CsiParam / CsiIntermediate / CsiIgnore: CSI sequences
//! - OscString: OSC payload collection
//! - DcsEntry / DcsParam / DcsIntermediate / DcsPassthrough / DcsIgnore
//! - SosPmApcString: SOS/PM/APC strings (consumed and dropped)

use crate::action::Action;
use crate::params::Params;
use crate::utf8::{Utf8Decoder, Utf8Step, REPLACEMENT};

/// Maximum OSC payload length; bytes past this are dropped
pub const MAX_OSC_LENGTH: usize = 512;

/// Maximum intermediate bytes tracked per sequence
const MAX_INTERMEDIATES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    OscString,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    DcsIgnore,
    SosPmApcString,
}

/// The VT byte-stream parser
#[derive(Debug)]
pub struct Parser {
    state: State,
    leader: Option<u8>,
    intermediates: Vec<u8>,
    params: Params,
    osc: Vec<u8>,
    osc_overflowed: bool,
    hooked: bool,
    utf8: Utf8Decoder,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a parser in the ground state
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            leader: None,
            intermediates: Vec::with_capacity(MAX_INTERMEDIATES),
            params: Params::new(),
            osc: Vec::with_capacity(MAX_OSC_LENGTH),
            osc_overflowed: false,
            hooked: false,
            utf8: Utf8Decoder::new(),
        }
    }

    /// Return to the ground state, discarding any in-flight sequence
    pub fn reset(&mut self) {
        self.state = State::Ground;
        self.clear_sequence();
        self.osc.clear();
        self.osc_overflowed = false;
        self.hooked = false;
        self.utf8.reset();
    }

    /// Process a chunk of bytes, returning the produced actions
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();
        for &byte in bytes {
            self.advance(byte, &mut actions);
        }
        actions
    }

    /// Process a single byte
    pub fn advance(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.utf8.is_pending() {
            match self.utf8.feed(byte) {
                Utf8Step::Pending => return,
                Utf8Step::Char(c) => {
                    out.push(Action::Print(c));
                    return;
                }
                Utf8Step::Invalid => {
                    // The byte was not a continuation; replace the broken
                    // character and reprocess the byte below.
                    out.push(Action::Print(REPLACEMENT));
                }
            }
        }

        if byte < 0x20 {
            self.handle_c0(byte, out);
            return;
        }
        if byte == 0x7F {
            return;
        }
        if (0x80..=0x9F).contains(&byte) {
            self.handle_c1(byte, out);
            return;
        }

        match self.state {
            State::Ground => self.ground(byte, out),
            State::Escape => self.escape(byte, out),
            State::EscapeIntermediate => self.escape_intermediate(byte, out),
            State::CsiEntry | State::CsiParam => self.csi_param(byte, out),
            State::CsiIntermediate => self.csi_intermediate(byte, out),
            State::CsiIgnore => {
                if (0x40..=0x7E).contains(&byte) {
                    self.state = State::Ground;
                }
            }
            State::OscString => self.osc_string(byte, out),
            State::DcsEntry | State::DcsParam => self.dcs_param(byte, out),
            State::DcsIntermediate => self.dcs_intermediate(byte, out),
            State::DcsPassthrough => out.push(Action::DcsPut(byte)),
            State::DcsIgnore | State::SosPmApcString => {}
        }
    }

    fn clear_sequence(&mut self) {
        self.leader = None;
        self.intermediates.clear();
        self.params.clear();
    }

    /// C0 controls; CAN, SUB and ESC act from every state
    fn handle_c0(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x1B => {
                self.terminate_string(out);
                self.clear_sequence();
                self.state = State::Escape;
            }
            0x18 | 0x1A => {
                if self.hooked {
                    out.push(Action::DcsUnhook);
                    self.hooked = false;
                }
                self.state = State::Ground;
            }
            _ => match self.state {
                State::OscString => {
                    // BEL is the xterm-style OSC terminator
                    if byte == 0x07 {
                        self.dispatch_osc(out);
                        self.state = State::Ground;
                    }
                }
                State::DcsPassthrough => out.push(Action::DcsPut(byte)),
                State::DcsIgnore | State::SosPmApcString => {}
                _ => out.push(Action::Execute(byte)),
            },
        }
    }

    /// 8-bit C1 controls, mapped to their 7-bit introducer equivalents
    fn handle_c1(&mut self, byte: u8, out: &mut Vec<Action>) {
        match self.state {
            State::OscString => {
                if byte == 0x9C {
                    self.dispatch_osc(out);
                    self.state = State::Ground;
                } else if self.push_osc(byte) {
                    out.push(Action::Error("OSC payload truncated".into()));
                }
                return;
            }
            State::DcsPassthrough => {
                if byte == 0x9C {
                    out.push(Action::DcsUnhook);
                    self.hooked = false;
                    self.state = State::Ground;
                } else {
                    out.push(Action::DcsPut(byte));
                }
                return;
            }
            State::DcsIgnore | State::SosPmApcString => {
                if byte == 0x9C {
                    self.state = State::Ground;
                }
                return;
            }
            _ => {}
        }

        match byte {
            0x90 => {
                self.clear_sequence();
                self.state = State::DcsEntry;
            }
            0x9B => {
                self.clear_sequence();
                self.state = State::CsiEntry;
            }
            0x9D => {
                self.osc.clear();
                self.osc_overflowed = false;
                self.state = State::OscString;
            }
            0x98 | 0x9E | 0x9F => self.state = State::SosPmApcString,
            0x9C => {}
            _ => out.push(Action::Execute(byte)),
        }
    }

    fn ground(&mut self, byte: u8, out: &mut Vec<Action>) {
        if byte < 0x80 {
            out.push(Action::Print(byte as char));
            return;
        }
        match self.utf8.feed(byte) {
            Utf8Step::Pending => {}
            Utf8Step::Char(c) => out.push(Action::Print(c)),
            Utf8Step::Invalid => out.push(Action::Print(REPLACEMENT)),
        }
    }

    fn escape(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x20..=0x2F => {
                self.collect(byte);
                self.state = State::EscapeIntermediate;
            }
            b'[' => {
                self.clear_sequence();
                self.state = State::CsiEntry;
            }
            b']' => {
                self.osc.clear();
                self.osc_overflowed = false;
                self.state = State::OscString;
            }
            b'P' => {
                self.clear_sequence();
                self.state = State::DcsEntry;
            }
            b'X' | b'^' | b'_' => self.state = State::SosPmApcString,
            0x30..=0x7E => {
                self.state = State::Ground;
                out.push(Action::EscDispatch {
                    intermediates: std::mem::take(&mut self.intermediates),
                    final_byte: byte,
                });
            }
            _ => {
                self.state = State::Ground;
                out.push(Action::Error(format!("unexpected byte {byte:#04x} after ESC")));
            }
        }
    }

    fn escape_intermediate(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x20..=0x2F => self.collect(byte),
            0x30..=0x7E => {
                self.state = State::Ground;
                out.push(Action::EscDispatch {
                    intermediates: std::mem::take(&mut self.intermediates),
                    final_byte: byte,
                });
            }
            _ => self.state = State::Ground,
        }
    }

    fn csi_param(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            b'0'..=b'9' | b';' | b':' => {
                self.params.put(byte);
                self.state = State::CsiParam;
            }
            0x3C..=0x3F => {
                // A leader is only valid immediately after the introducer
                if self.state == State::CsiEntry {
                    self.leader = Some(byte);
                    self.state = State::CsiParam;
                } else {
                    self.state = State::CsiIgnore;
                }
            }
            0x20..=0x2F => {
                self.collect(byte);
                self.state = State::CsiIntermediate;
            }
            0x40..=0x7E => self.dispatch_csi(byte, out),
            _ => self.state = State::CsiIgnore,
        }
    }

    fn csi_intermediate(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x20..=0x2F => self.collect(byte),
            0x40..=0x7E => self.dispatch_csi(byte, out),
            _ => self.state = State::CsiIgnore,
        }
    }

    fn dispatch_csi(&mut self, final_byte: u8, out: &mut Vec<Action>) {
        self.params.finish();
        out.push(Action::CsiDispatch {
            leader: self.leader.take(),
            params: std::mem::take(&mut self.params),
            intermediates: std::mem::take(&mut self.intermediates),
            final_byte,
        });
        self.state = State::Ground;
    }

    fn osc_string(&mut self, byte: u8, out: &mut Vec<Action>) {
        if self.push_osc(byte) {
            out.push(Action::Error("OSC payload truncated".into()));
        }
    }

    /// Append to the OSC buffer; returns true when the cap was newly hit
    fn push_osc(&mut self, byte: u8) -> bool {
        if self.osc.len() < MAX_OSC_LENGTH {
            self.osc.push(byte);
            false
        } else if !self.osc_overflowed {
            self.osc_overflowed = true;
            true
        } else {
            false
        }
    }

    fn dcs_param(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            b'0'..=b'9' | b';' | b':' => {
                self.params.put(byte);
                self.state = State::DcsParam;
            }
            0x3C..=0x3F => {
                if self.state == State::DcsEntry {
                    self.leader = Some(byte);
                    self.state = State::DcsParam;
                } else {
                    self.state = State::DcsIgnore;
                }
            }
            0x20..=0x2F => {
                self.collect(byte);
                self.state = State::DcsIntermediate;
            }
            0x40..=0x7E => self.hook(byte, out),
            _ => self.state = State::DcsIgnore,
        }
    }

    fn dcs_intermediate(&mut self, byte: u8, out: &mut Vec<Action>) {
        match byte {
            0x20..=0x2F => self.collect(byte),
            0x40..=0x7E => self.hook(byte, out),
            _ => self.state = State::DcsIgnore,
        }
    }

    fn hook(&mut self, final_byte: u8, out: &mut Vec<Action>) {
        self.params.finish();
        out.push(Action::DcsHook {
            leader: self.leader.take(),
            params: std::mem::take(&mut self.params),
            intermediates: std::mem::take(&mut self.intermediates),
            final_byte,
        });
        self.hooked = true;
        self.state = State::DcsPassthrough;
    }

    fn collect(&mut self, byte: u8) {
        if self.intermediates.len() < MAX_INTERMEDIATES {
            self.intermediates.push(byte);
        }
    }

    /// Close out any string state when ESC arrives (ESC \ is the common
    /// string terminator; the dangling `ESC \` then dispatches as a no-op)
    fn terminate_string(&mut self, out: &mut Vec<Action>) {
        match self.state {
            State::OscString => self.dispatch_osc(out),
            State::DcsPassthrough => {
                if self.hooked {
                    out.push(Action::DcsUnhook);
                    self.hooked = false;
                }
            }
            _ => {}
        }
    }

    fn dispatch_osc(&mut self, out: &mut Vec<Action>) {
        out.push(Action::OscDispatch {
            payload: std::mem::take(&mut self.osc),
        });
        self.osc_overflowed = false;
    }
}
