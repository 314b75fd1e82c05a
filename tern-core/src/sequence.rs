//! Parsed-but-unapplied control sequences
//!
//! A [`Sequence`] is the record the sequencer assembles from parser
//! actions before resolving it against the function catalog. For OSC
//! sequences the numeric command lands in the first parameter and the
//! rest of the payload in the data string, mirroring how the catalog is
//! keyed.

use serde::{Deserialize, Serialize};
use tern_parser::Params;

use crate::functions::{FunctionCategory, FunctionSelector};

/// Outcome of applying a function to the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Ok,
    /// Parameters were out of range or malformed; nothing was applied
    Invalid,
    /// The function is recognized but not implemented
    Unsupported,
}

/// One assembled control sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub category: FunctionCategory,
    pub leader: Option<u8>,
    pub parameters: Params,
    pub intermediates: Vec<u8>,
    pub final_byte: u8,
    /// OSC payload (after the command number) or DCS data
    pub data: Vec<u8>,
}

impl Sequence {
    pub fn csi(
        leader: Option<u8>,
        parameters: Params,
        intermediates: Vec<u8>,
        final_byte: u8,
    ) -> Self {
        Self {
            category: FunctionCategory::Csi,
            leader,
            parameters,
            intermediates,
            final_byte,
            data: Vec::new(),
        }
    }

    pub fn esc(intermediates: Vec<u8>, final_byte: u8) -> Self {
        Self {
            category: FunctionCategory::Esc,
            leader: None,
            parameters: Params::new(),
            intermediates,
            final_byte,
            data: Vec::new(),
        }
    }

    /// Split an OSC payload into its numeric command and data string
    pub fn osc(payload: &[u8]) -> Self {
        let mut code: u16 = 0;
        let mut split = payload.len();
        for (i, &byte) in payload.iter().enumerate() {
            match byte {
                b'0'..=b'9' => code = code.saturating_mul(10).saturating_add(u16::from(byte - b'0')),
                b';' => {
                    split = i + 1;
                    break;
                }
                _ => break,
            }
        }
        Self {
            category: FunctionCategory::Osc,
            leader: None,
            parameters: Params::from_values(&[code]),
            intermediates: Vec::new(),
            final_byte: 0,
            data: payload[split.min(payload.len())..].to_vec(),
        }
    }

    pub fn dcs(
        leader: Option<u8>,
        parameters: Params,
        intermediates: Vec<u8>,
        final_byte: u8,
    ) -> Self {
        Self {
            category: FunctionCategory::Dcs,
            leader,
            parameters,
            intermediates,
            final_byte,
            data: Vec::new(),
        }
    }

    /// The lookup key for the function catalog
    pub fn selector(&self) -> FunctionSelector {
        match self.category {
            FunctionCategory::Osc => FunctionSelector {
                category: FunctionCategory::Osc,
                leader: None,
                parameter_count: 0,
                intermediate: None,
                final_byte: self.parameters.raw(0),
            },
            _ => FunctionSelector {
                category: self.category,
                leader: self.leader,
                parameter_count: self.parameters.len(),
                // Catalog entries carry at most one intermediate
                intermediate: self.intermediates.first().copied(),
                final_byte: u16::from(self.final_byte),
            },
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Top-level parameter with 0 mapped to the function default
    pub fn param_or(&self, index: usize, default: u16) -> u16 {
        self.parameters.get_or(index, default)
    }

    /// Raw top-level parameter (0 when absent)
    pub fn param(&self, index: usize) -> u16 {
        self.parameters.raw(index)
    }

    pub fn subparams(&self, index: usize) -> &[u16] {
        self.parameters.subparams(index)
    }

    /// The data string as UTF-8 (lossy)
    pub fn data_str(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    /// Human-readable rendering for diagnostics
    pub fn text(&self) -> String {
        let mut out = String::new();
        match self.category {
            FunctionCategory::Csi => out.push_str("CSI "),
            FunctionCategory::Esc => out.push_str("ESC "),
            FunctionCategory::Osc => out.push_str("OSC "),
            FunctionCategory::Dcs => out.push_str("DCS "),
            FunctionCategory::C0 => out.push_str("C0 "),
            FunctionCategory::C1 => out.push_str("C1 "),
        }
        if let Some(leader) = self.leader {
            out.push(leader as char);
        }
        let params: Vec<String> = self
            .parameters
            .iter_with_subparams()
            .map(|(value, subparams)| {
                let mut piece = value.to_string();
                for sub in subparams {
                    piece.push(':');
                    piece.push_str(&sub.to_string());
                }
                piece
            })
            .collect();
        out.push_str(&params.join(";"));
        for &byte in &self.intermediates {
            out.push(byte as char);
        }
        if self.final_byte != 0 {
            out.push(self.final_byte as char);
        }
        if !self.data.is_empty() {
            out.push(' ');
            out.push('"');
            out.push_str(&self.data_str());
            out.push('"');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions;

    #[test]
    fn test_osc_payload_split() {
        let seq = Sequence::osc(b"8;id=x;https://example.com");
        assert_eq!(seq.param(0), 8);
        assert_eq!(seq.data_str(), "id=x;https://example.com");
    }

    #[test]
    fn test_osc_without_payload() {
        let seq = Sequence::osc(b"104");
        assert_eq!(seq.param(0), 104);
        assert!(seq.data.is_empty());
    }

    #[test]
    fn test_selector_resolves() {
        let seq = Sequence::csi(None, Params::from_values(&[5]), vec![], b'A');
        let found = functions::select(&seq.selector()).unwrap();
        assert_eq!(found.mnemonic, "CUU");
    }

    #[test]
    fn test_osc_selector_resolves() {
        let seq = Sequence::osc(b"52;c;aGk=");
        let found = functions::select(&seq.selector()).unwrap();
        assert_eq!(found.mnemonic, "OSC52");
    }

    #[test]
    fn test_text_rendering() {
        let mut params = Params::new();
        for byte in b"38:5:196;1" {
            params.put(*byte);
        }
        params.finish();
        let seq = Sequence::csi(None, params, vec![], b'm');
        assert_eq!(seq.text(), "CSI 38:5:196;1m");
    }

    #[test]
    fn test_param_defaults() {
        let seq = Sequence::csi(None, Params::from_values(&[0, 7]), vec![], b'H');
        assert_eq!(seq.param_or(0, 1), 1);
        assert_eq!(seq.param_or(1, 1), 7);
        assert_eq!(seq.param_or(5, 3), 3);
    }
}
