//! The sequencer: parser actions in, screen effects out
//!
//! Assembles parser [`Action`]s into [`Sequence`] records, resolves them
//! against the function catalog and applies them to the screen. DCS
//! sequences hook one of the known sub-protocol decoders; when batched
//! rendering (DECSET 2026) is active, work is queued and applied
//! atomically at flush time.

use tern_parser::{sixel, Action, Params};
use tracing::{debug, warn};

use crate::functions;
use crate::image::ImageData;
use crate::screen::Screen;
use crate::sequence::{ApplyResult, Sequence};

/// Queue cap while batched rendering is active; past this the batch is
/// flushed early instead of growing without bound
const MAX_BATCHED_ITEMS: usize = 64 * 1024;

/// One queued unit of batched work
#[derive(Debug)]
enum Batched {
    Print(char),
    Sequence(Sequence),
    Image(ImageData),
}

/// An in-flight DCS sub-protocol
#[derive(Debug)]
enum DcsHook {
    Sixel { background_mode: u16, data: Vec<u8> },
    RequestStatusString { data: Vec<u8> },
    RequestTermcap { data: Vec<u8> },
    SetProfile { data: Vec<u8> },
    Discard,
}

impl DcsHook {
    fn feed(&mut self, byte: u8) {
        match self {
            DcsHook::Sixel { data, .. }
            | DcsHook::RequestStatusString { data }
            | DcsHook::RequestTermcap { data }
            | DcsHook::SetProfile { data } => data.push(byte),
            DcsHook::Discard => {}
        }
    }
}

/// Translates parser actions into screen mutations
#[derive(Debug)]
pub struct Sequencer {
    screen: Screen,
    batch: Vec<Batched>,
    hook: Option<DcsHook>,
    instruction_counter: u64,
}

impl Sequencer {
    pub fn new(screen: Screen) -> Self {
        Self {
            screen,
            batch: Vec::new(),
            hook: None,
            instruction_counter: 0,
        }
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    /// Count of applied control functions, for host-side pacing
    pub fn instruction_counter(&self) -> u64 {
        self.instruction_counter
    }

    pub fn reset_instruction_counter(&mut self) {
        self.instruction_counter = 0;
    }

    /// Process one parser action
    pub fn handle(&mut self, action: Action) {
        match action {
            Action::Print(c) => {
                if self.batching() {
                    self.push_batched(Batched::Print(c));
                } else {
                    self.screen.print_char(c);
                }
            }
            Action::Execute(byte) => self.execute(byte),
            Action::EscDispatch {
                intermediates,
                final_byte,
            } => self.dispatch_esc(intermediates, final_byte),
            Action::CsiDispatch {
                leader,
                params,
                intermediates,
                final_byte,
            } => {
                let seq = Sequence::csi(leader, params, intermediates, final_byte);
                self.dispatch(seq);
            }
            Action::OscDispatch { payload } => {
                let seq = Sequence::osc(&payload);
                self.dispatch(seq);
            }
            Action::DcsHook {
                leader,
                params,
                intermediates,
                final_byte,
            } => self.hook_dcs(leader, params, intermediates, final_byte),
            Action::DcsPut(byte) => {
                if let Some(hook) = &mut self.hook {
                    hook.feed(byte);
                }
            }
            Action::DcsUnhook => self.unhook_dcs(),
            Action::Error(message) => debug!(message = %message, "parse error"),
        }
    }

    fn batching(&self) -> bool {
        self.screen
            .modes()
            .dec(crate::modes::DecMode::BatchedRendering)
    }

    fn push_batched(&mut self, item: Batched) {
        self.batch.push(item);
        if self.batch.len() >= MAX_BATCHED_ITEMS {
            warn!("batched rendering queue overflow, flushing early");
            self.flush_batched();
        }
    }

    /// Apply everything deferred while DECSET 2026 was active
    pub fn flush_batched(&mut self) {
        let batch = std::mem::take(&mut self.batch);
        for item in batch {
            match item {
                Batched::Print(c) => self.screen.print_char(c),
                Batched::Sequence(seq) => self.apply_sequence(&seq),
                Batched::Image(image) => self.screen.place_image(image),
            }
        }
    }

    /// C0 controls and stray C1 bytes
    fn execute(&mut self, byte: u8) {
        self.instruction_counter += 1;
        match byte {
            0x07 => self.screen.bell(),
            0x08 => self.screen.backspace(),
            0x09 => self.screen.tab(),
            0x0A | 0x0B | 0x0C => self.screen.linefeed(),
            0x0D => self.screen.carriage_return(),
            0x0E => self.screen.shift_out(),
            0x0F => self.screen.shift_in(),
            // 8-bit C1 controls with direct effects
            0x84 => self.screen.index(),
            0x85 => {
                self.screen.index();
                self.screen.carriage_return();
            }
            0x88 => self.screen.set_tab_stop(),
            0x8D => self.screen.reverse_index(),
            _ => debug!(byte, "ignored control"),
        }
    }

    fn dispatch_esc(&mut self, intermediates: Vec<u8>, final_byte: u8) {
        // ST of an already-dispatched string; nothing to do
        if intermediates.is_empty() && final_byte == b'\\' {
            return;
        }

        // Charset designations carry their charset in the final byte, so
        // they bypass the catalog
        if let Some(&intermediate) = intermediates.first() {
            if let Some(slot) = match intermediate {
                b'(' => Some(0),
                b')' => Some(1),
                b'*' => Some(2),
                b'+' => Some(3),
                _ => None,
            } {
                match crate::charset::Charset::from_designator(final_byte) {
                    Some(charset) => {
                        self.instruction_counter += 1;
                        self.screen.designate_charset(slot, charset);
                    }
                    None => warn!(designator = final_byte, "unknown charset designator"),
                }
                return;
            }
        }

        let seq = Sequence::esc(intermediates, final_byte);
        self.dispatch(seq);
    }

    fn dispatch(&mut self, seq: Sequence) {
        // Leaving batched rendering must flush even though the sequence
        // itself would be queued
        if self.batching() && !is_batch_boundary(&seq) {
            self.push_batched(Batched::Sequence(seq));
            return;
        }
        let was_batching = self.batching();
        // RIS discards any queued work and half-read DCS stream
        if seq.category == functions::FunctionCategory::Esc && seq.final_byte == b'c' {
            self.batch.clear();
            self.hook = None;
        }
        self.apply_sequence(&seq);
        if was_batching && !self.batching() {
            self.flush_batched();
        }
    }

    fn apply_sequence(&mut self, seq: &Sequence) {
        self.instruction_counter += 1;
        match functions::select(&seq.selector()) {
            Some(function) => match self.screen.apply(function, seq) {
                ApplyResult::Ok => debug!(seq = %seq.text(), func = %function, "applied"),
                ApplyResult::Invalid => {
                    warn!(seq = %seq.text(), func = %function, "invalid parameters")
                }
                ApplyResult::Unsupported => {
                    warn!(seq = %seq.text(), func = %function, "unsupported")
                }
            },
            None => warn!(seq = %seq.text(), "unknown function"),
        }
    }

    fn hook_dcs(
        &mut self,
        leader: Option<u8>,
        params: Params,
        intermediates: Vec<u8>,
        final_byte: u8,
    ) {
        let seq = Sequence::dcs(leader, params, intermediates, final_byte);
        let hook = match functions::select(&seq.selector()) {
            Some(function) => match function.mnemonic {
                "SIXEL" => DcsHook::Sixel {
                    background_mode: seq.param(1),
                    data: Vec::new(),
                },
                "DECRQSS" => DcsHook::RequestStatusString { data: Vec::new() },
                "XTGETTCAP" => DcsHook::RequestTermcap { data: Vec::new() },
                "STP" => DcsHook::SetProfile { data: Vec::new() },
                _ => DcsHook::Discard,
            },
            None => {
                warn!(seq = %seq.text(), "unknown DCS function");
                DcsHook::Discard
            }
        };
        self.hook = Some(hook);
    }

    fn unhook_dcs(&mut self) {
        let Some(hook) = self.hook.take() else {
            return;
        };
        self.instruction_counter += 1;
        match hook {
            DcsHook::Sixel {
                background_mode,
                data,
            } => match sixel::decode(background_mode, &data) {
                Some(image) => {
                    let image = ImageData::new(image.width, image.height, image.rgba);
                    if self.batching() {
                        self.push_batched(Batched::Image(image));
                    } else {
                        self.screen.place_image(image);
                    }
                }
                None => debug!("sixel stream produced no pixels"),
            },
            DcsHook::RequestStatusString { data } => self.screen.request_status_string(&data),
            DcsHook::RequestTermcap { data } => self.screen.request_termcap(&data),
            DcsHook::SetProfile { data } => self.screen.request_profile(&data),
            DcsHook::Discard => {}
        }
    }

    /// Hard reset also discards the queue and any half-read DCS stream
    pub fn hard_reset(&mut self) {
        self.batch.clear();
        self.hook = None;
        self.screen.hard_reset();
    }
}

/// Sequences that must act immediately even during batched rendering
fn is_batch_boundary(seq: &Sequence) -> bool {
    use crate::functions::FunctionCategory;
    match seq.category {
        // DECSET/DECRST of 2026 itself, plus RIS
        FunctionCategory::Csi => {
            seq.leader == Some(b'?')
                && (seq.final_byte == b'h' || seq.final_byte == b'l')
                && seq.parameters.iter().any(|p| p == 2026)
        }
        FunctionCategory::Esc => seq.final_byte == b'c',
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Coordinate, Size};
    use tern_parser::Parser;

    fn sequencer() -> Sequencer {
        Sequencer::new(Screen::new(Size::new(20, 5), Some(100)))
    }

    fn feed(sequencer: &mut Sequencer, input: &[u8]) {
        let mut parser = Parser::new();
        for action in parser.feed(input) {
            sequencer.handle(action);
        }
    }

    #[test]
    fn test_print_and_controls() {
        let mut sequencer = sequencer();
        feed(&mut sequencer, b"ab\r\ncd");
        assert_eq!(sequencer.screen().grid().line(1).to_utf8_trimmed(), "ab");
        assert_eq!(sequencer.screen().grid().line(2).to_utf8_trimmed(), "cd");
    }

    #[test]
    fn test_csi_dispatch() {
        let mut sequencer = sequencer();
        feed(&mut sequencer, b"\x1b[3;5Hx");
        assert_eq!(
            sequencer.screen().grid().at(Coordinate::new(3, 5)).text(),
            "x"
        );
    }

    #[test]
    fn test_charset_designation_line_drawing() {
        let mut sequencer = sequencer();
        feed(&mut sequencer, b"\x1b(0lq\x1b(Blq");
        let line = sequencer.screen().grid().line(1);
        assert_eq!(line.cell(0).unwrap().text(), "┌");
        assert_eq!(line.cell(1).unwrap().text(), "─");
        assert_eq!(line.cell(2).unwrap().text(), "l");
        assert_eq!(line.cell(3).unwrap().text(), "q");
    }

    #[test]
    fn test_instruction_counter_counts_functions() {
        let mut sequencer = sequencer();
        feed(&mut sequencer, b"plain text");
        assert_eq!(sequencer.instruction_counter(), 0);

        feed(&mut sequencer, b"\x1b[2J\x1b[H\n");
        assert_eq!(sequencer.instruction_counter(), 3);
    }

    #[test]
    fn test_batched_rendering_defers_application() {
        let mut sequencer = sequencer();
        feed(&mut sequencer, b"\x1b[?2026h");
        feed(&mut sequencer, b"deferred");
        assert!(sequencer.screen().grid().line(1).blank());

        feed(&mut sequencer, b"\x1b[?2026l");
        assert_eq!(
            sequencer.screen().grid().line(1).to_utf8_trimmed(),
            "deferred"
        );
    }

    #[test]
    fn test_decrqss_reply() {
        let mut sequencer = sequencer();
        feed(&mut sequencer, b"\x1bP$q\"p\x1b\\");
        assert_eq!(
            sequencer.screen_mut().take_replies(),
            b"\x1bP1$r65;1\"p\x1b\\"
        );
    }

    #[test]
    fn test_xtgettcap_reply() {
        let mut sequencer = sequencer();
        // "TN" hex-encoded
        feed(&mut sequencer, b"\x1bP+q544E\x1b\\");
        let replies = sequencer.screen_mut().take_replies();
        let text = String::from_utf8_lossy(&replies);
        assert!(text.starts_with("\x1bP1+r544E="));
        assert!(text.ends_with("\x1b\\"));
    }

    #[test]
    fn test_sixel_places_image_fragments() {
        let mut sequencer = sequencer();
        sequencer.screen_mut().set_cell_pixel_size(4, 6);
        feed(&mut sequencer, b"\x1bP0;0;0q\"1;1;8;6#1;2;100;0;0!8~\x1b\\");

        let cell = sequencer.screen().grid().at(Coordinate::new(1, 1));
        assert!(cell.image().is_some());
        let second = sequencer.screen().grid().at(Coordinate::new(1, 2));
        assert!(second.image().is_some());
    }

    #[test]
    fn test_hard_reset_discards_batch() {
        let mut sequencer = sequencer();
        feed(&mut sequencer, b"\x1b[?2026h");
        feed(&mut sequencer, b"queued");
        feed(&mut sequencer, b"\x1bc");
        assert!(sequencer.screen().grid().line(1).blank());
        assert!(!sequencer
            .screen()
            .modes()
            .dec(crate::modes::DecMode::BatchedRendering));
    }

    #[test]
    fn test_unknown_sequence_is_harmless() {
        let mut sequencer = sequencer();
        feed(&mut sequencer, b"\x1b[99y\x1b[!!zok");
        assert!(sequencer
            .screen()
            .grid()
            .line(1)
            .to_utf8_trimmed()
            .contains("ok"));
    }
}
