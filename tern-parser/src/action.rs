//! Semantic actions produced by the parser
//!
//! Actions carry everything the sequencer needs: printable characters,
//! C0/C1 controls, and the dissected parts of ESC/CSI/OSC/DCS sequences.

use serde::{Deserialize, Serialize};

use crate::params::Params;

/// One parser event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// A decoded printable character for the current cursor position
    Print(char),

    /// A C0 control character (0x00-0x1F) or the 7-bit form of a C1 control
    Execute(u8),

    /// ESC sequence: `ESC [intermediates] final`
    EscDispatch {
        intermediates: Vec<u8>,
        final_byte: u8,
    },

    /// CSI sequence: `ESC [ [leader] [params] [intermediates] final`
    CsiDispatch {
        /// Private-use leader byte (`<`, `=`, `>` or `?`), if any
        leader: Option<u8>,
        params: Params,
        intermediates: Vec<u8>,
        final_byte: u8,
    },

    /// OSC string, terminated by BEL or ST. The payload is raw and still
    /// carries the numeric command prefix.
    OscDispatch { payload: Vec<u8> },

    /// Start of a DCS sequence; data bytes follow as `DcsPut`
    DcsHook {
        leader: Option<u8>,
        params: Params,
        intermediates: Vec<u8>,
        final_byte: u8,
    },

    /// One DCS passthrough data byte
    DcsPut(u8),

    /// End of the DCS sequence (ST received or the sequence was aborted)
    DcsUnhook,

    /// Recoverable parse problem; the parser keeps running
    Error(String),
}

impl Action {
    /// True for printable-character actions
    pub fn is_print(&self) -> bool {
        matches!(self, Action::Print(_))
    }

    /// True for control-character actions
    pub fn is_execute(&self) -> bool {
        matches!(self, Action::Execute(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicates() {
        assert!(Action::Print('x').is_print());
        assert!(Action::Execute(0x0A).is_execute());
        assert!(!Action::DcsUnhook.is_print());
    }

    #[test]
    fn test_serialization_round_trip() {
        let action = Action::CsiDispatch {
            leader: Some(b'?'),
            params: Params::from_values(&[1049]),
            intermediates: Vec::new(),
            final_byte: b'h',
        };
        let json = serde_json::to_string(&action).unwrap();
        let restored: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(action, restored);
    }
}
