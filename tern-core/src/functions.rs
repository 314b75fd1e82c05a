//! The VT function catalog
//!
//! Every control function the sequencer understands is described by one
//! static [`FunctionDefinition`]. A parsed sequence turns into a
//! [`FunctionSelector`]; `select` finds the matching definition, with an
//! exact leader/intermediate match beating entries without them and the
//! declared parameter range matched permissively.

use serde::{Deserialize, Serialize};

/// The syntactic family of a control function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionCategory {
    C0,
    C1,
    Esc,
    Csi,
    Osc,
    Dcs,
}

/// One catalog entry.
///
/// For OSC functions `final_byte` holds the numeric command instead of a
/// final character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionDefinition {
    pub category: FunctionCategory,
    pub leader: Option<u8>,
    pub intermediate: Option<u8>,
    pub minimum_parameters: usize,
    pub maximum_parameters: usize,
    pub final_byte: u16,
    pub mnemonic: &'static str,
}

/// Lookup key built from a parsed sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSelector {
    pub category: FunctionCategory,
    pub leader: Option<u8>,
    pub parameter_count: usize,
    pub intermediate: Option<u8>,
    pub final_byte: u16,
}

impl FunctionDefinition {
    fn matches(&self, selector: &FunctionSelector) -> bool {
        self.category == selector.category
            && self.leader == selector.leader
            && self.intermediate == selector.intermediate
            && self.final_byte == selector.final_byte
            && self.minimum_parameters <= selector.parameter_count
            && selector.parameter_count <= self.maximum_parameters
    }
}

impl std::fmt::Display for FunctionDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic)
    }
}

const fn esc(intermediate: Option<u8>, final_byte: u8, mnemonic: &'static str) -> FunctionDefinition {
    FunctionDefinition {
        category: FunctionCategory::Esc,
        leader: None,
        intermediate,
        minimum_parameters: 0,
        maximum_parameters: 0,
        final_byte: final_byte as u16,
        mnemonic,
    }
}

const fn csi(
    leader: Option<u8>,
    minimum_parameters: usize,
    maximum_parameters: usize,
    intermediate: Option<u8>,
    final_byte: u8,
    mnemonic: &'static str,
) -> FunctionDefinition {
    FunctionDefinition {
        category: FunctionCategory::Csi,
        leader,
        intermediate,
        minimum_parameters,
        maximum_parameters,
        final_byte: final_byte as u16,
        mnemonic,
    }
}

const fn osc(code: u16, mnemonic: &'static str) -> FunctionDefinition {
    FunctionDefinition {
        category: FunctionCategory::Osc,
        leader: None,
        intermediate: None,
        minimum_parameters: 0,
        maximum_parameters: 0,
        final_byte: code,
        mnemonic,
    }
}

const fn dcs(
    leader: Option<u8>,
    minimum_parameters: usize,
    maximum_parameters: usize,
    intermediate: Option<u8>,
    final_byte: u8,
    mnemonic: &'static str,
) -> FunctionDefinition {
    FunctionDefinition {
        category: FunctionCategory::Dcs,
        leader,
        intermediate,
        minimum_parameters,
        maximum_parameters,
        final_byte: final_byte as u16,
        mnemonic,
    }
}

// ESC functions
pub const DECSC: FunctionDefinition = esc(None, b'7', "DECSC");
pub const DECRC: FunctionDefinition = esc(None, b'8', "DECRC");
pub const DECKPAM: FunctionDefinition = esc(None, b'=', "DECKPAM");
pub const DECKPNM: FunctionDefinition = esc(None, b'>', "DECKPNM");
pub const IND: FunctionDefinition = esc(None, b'D', "IND");
pub const NEL: FunctionDefinition = esc(None, b'E', "NEL");
pub const HTS: FunctionDefinition = esc(None, b'H', "HTS");
pub const RI: FunctionDefinition = esc(None, b'M', "RI");
pub const SS2: FunctionDefinition = esc(None, b'N', "SS2");
pub const SS3: FunctionDefinition = esc(None, b'O', "SS3");
pub const RIS: FunctionDefinition = esc(None, b'c', "RIS");
pub const DECALN: FunctionDefinition = esc(Some(b'#'), b'8', "DECALN");

// CSI functions
pub const ICH: FunctionDefinition = csi(None, 0, 1, None, b'@', "ICH");
pub const CUU: FunctionDefinition = csi(None, 0, 1, None, b'A', "CUU");
pub const CUD: FunctionDefinition = csi(None, 0, 1, None, b'B', "CUD");
pub const CUF: FunctionDefinition = csi(None, 0, 1, None, b'C', "CUF");
pub const CUB: FunctionDefinition = csi(None, 0, 1, None, b'D', "CUB");
pub const CNL: FunctionDefinition = csi(None, 0, 1, None, b'E', "CNL");
pub const CPL: FunctionDefinition = csi(None, 0, 1, None, b'F', "CPL");
pub const CHA: FunctionDefinition = csi(None, 0, 1, None, b'G', "CHA");
pub const CUP: FunctionDefinition = csi(None, 0, 2, None, b'H', "CUP");
pub const CHT: FunctionDefinition = csi(None, 0, 1, None, b'I', "CHT");
pub const ED: FunctionDefinition = csi(None, 0, 1, None, b'J', "ED");
pub const EL: FunctionDefinition = csi(None, 0, 1, None, b'K', "EL");
pub const IL: FunctionDefinition = csi(None, 0, 1, None, b'L', "IL");
pub const DL: FunctionDefinition = csi(None, 0, 1, None, b'M', "DL");
pub const DCH: FunctionDefinition = csi(None, 0, 1, None, b'P', "DCH");
pub const SU: FunctionDefinition = csi(None, 0, 1, None, b'S', "SU");
pub const SD: FunctionDefinition = csi(None, 0, 1, None, b'T', "SD");
pub const ECH: FunctionDefinition = csi(None, 0, 1, None, b'X', "ECH");
pub const CBT: FunctionDefinition = csi(None, 0, 1, None, b'Z', "CBT");
pub const HPA: FunctionDefinition = csi(None, 0, 1, None, b'`', "HPA");
pub const HPR: FunctionDefinition = csi(None, 0, 1, None, b'a', "HPR");
pub const REP: FunctionDefinition = csi(None, 0, 1, None, b'b', "REP");
pub const DA1: FunctionDefinition = csi(None, 0, 1, None, b'c', "DA1");
pub const DA2: FunctionDefinition = csi(Some(b'>'), 0, 1, None, b'c', "DA2");
pub const DA3: FunctionDefinition = csi(Some(b'='), 0, 1, None, b'c', "DA3");
pub const VPA: FunctionDefinition = csi(None, 0, 1, None, b'd', "VPA");
pub const VPR: FunctionDefinition = csi(None, 0, 1, None, b'e', "VPR");
pub const HVP: FunctionDefinition = csi(None, 0, 2, None, b'f', "HVP");
pub const TBC: FunctionDefinition = csi(None, 0, 1, None, b'g', "TBC");
pub const SM: FunctionDefinition = csi(None, 1, 16, None, b'h', "SM");
pub const DECSET: FunctionDefinition = csi(Some(b'?'), 1, 16, None, b'h', "DECSET");
pub const RM: FunctionDefinition = csi(None, 1, 16, None, b'l', "RM");
pub const DECRST: FunctionDefinition = csi(Some(b'?'), 1, 16, None, b'l', "DECRST");
pub const SGR: FunctionDefinition = csi(None, 0, 16, None, b'm', "SGR");
pub const DSR: FunctionDefinition = csi(None, 1, 1, None, b'n', "DSR");
pub const DECDSR: FunctionDefinition = csi(Some(b'?'), 1, 1, None, b'n', "DECDSR");
pub const DECSTR: FunctionDefinition = csi(None, 0, 0, Some(b'!'), b'p', "DECSTR");
pub const DECSCUSR: FunctionDefinition = csi(None, 0, 1, Some(b' '), b'q', "DECSCUSR");
pub const DECSTBM: FunctionDefinition = csi(None, 0, 2, None, b'r', "DECSTBM");
pub const SCOSC: FunctionDefinition = csi(None, 0, 0, None, b's', "SCOSC");
pub const DECSLRM: FunctionDefinition = csi(None, 1, 2, None, b's', "DECSLRM");
pub const XTWINOPS: FunctionDefinition = csi(None, 1, 3, None, b't', "XTWINOPS");
pub const SCORC: FunctionDefinition = csi(None, 0, 0, None, b'u', "SCORC");

// OSC functions
pub const OSC_TITLE_AND_ICON: FunctionDefinition = osc(0, "OSC0");
pub const OSC_ICON_NAME: FunctionDefinition = osc(1, "OSC1");
pub const OSC_TITLE: FunctionDefinition = osc(2, "OSC2");
pub const OSC_COLOR: FunctionDefinition = osc(4, "OSC4");
pub const OSC_HYPERLINK: FunctionDefinition = osc(8, "OSC8");
pub const OSC_FOREGROUND: FunctionDefinition = osc(10, "OSC10");
pub const OSC_BACKGROUND: FunctionDefinition = osc(11, "OSC11");
pub const OSC_CURSOR_COLOR: FunctionDefinition = osc(12, "OSC12");
pub const OSC_MOUSE_FOREGROUND: FunctionDefinition = osc(13, "OSC13");
pub const OSC_MOUSE_BACKGROUND: FunctionDefinition = osc(14, "OSC14");
pub const OSC_HIGHLIGHT_BACKGROUND: FunctionDefinition = osc(17, "OSC17");
pub const OSC_HIGHLIGHT_FOREGROUND: FunctionDefinition = osc(19, "OSC19");
pub const OSC_CLIPBOARD: FunctionDefinition = osc(52, "OSC52");
pub const OSC_RESET_COLOR: FunctionDefinition = osc(104, "OSC104");
pub const OSC_RESET_FOREGROUND: FunctionDefinition = osc(110, "OSC110");
pub const OSC_RESET_BACKGROUND: FunctionDefinition = osc(111, "OSC111");
pub const OSC_RESET_CURSOR_COLOR: FunctionDefinition = osc(112, "OSC112");

// DCS functions
pub const SIXEL: FunctionDefinition = dcs(None, 0, 3, None, b'q', "SIXEL");
pub const DECRQSS: FunctionDefinition = dcs(None, 0, 0, Some(b'$'), b'q', "DECRQSS");
pub const XTGETTCAP: FunctionDefinition = dcs(None, 0, 0, Some(b'+'), b'q', "XTGETTCAP");
pub const STP: FunctionDefinition = dcs(None, 0, 0, Some(b'$'), b'p', "STP");

/// Every known function, kept sorted by hand per category
pub static FUNCTIONS: &[&FunctionDefinition] = &[
    // ESC
    &DECSC, &DECRC, &DECKPAM, &DECKPNM, &IND, &NEL, &HTS, &RI, &SS2, &SS3, &RIS, &DECALN,
    // CSI
    &ICH, &CUU, &CUD, &CUF, &CUB, &CNL, &CPL, &CHA, &CUP, &CHT, &ED, &EL, &IL, &DL, &DCH, &SU,
    &SD, &ECH, &CBT, &HPA, &HPR, &REP, &DA1, &DA2, &DA3, &VPA, &VPR, &HVP, &TBC, &SM, &DECSET,
    &RM, &DECRST, &SGR, &DSR, &DECDSR, &DECSTR, &DECSCUSR, &DECSTBM, &SCOSC, &DECSLRM,
    &XTWINOPS, &SCORC,
    // OSC
    &OSC_TITLE_AND_ICON, &OSC_ICON_NAME, &OSC_TITLE, &OSC_COLOR, &OSC_HYPERLINK,
    &OSC_FOREGROUND, &OSC_BACKGROUND, &OSC_CURSOR_COLOR, &OSC_MOUSE_FOREGROUND,
    &OSC_MOUSE_BACKGROUND, &OSC_HIGHLIGHT_BACKGROUND, &OSC_HIGHLIGHT_FOREGROUND,
    &OSC_CLIPBOARD, &OSC_RESET_COLOR, &OSC_RESET_FOREGROUND, &OSC_RESET_BACKGROUND,
    &OSC_RESET_CURSOR_COLOR,
    // DCS
    &SIXEL, &DECRQSS, &XTGETTCAP, &STP,
];

/// Find the definition for a parsed sequence.
///
/// When several entries share a final byte the narrower parameter range
/// wins, which is how `CSI s` splits into SCOSC (no parameters) and
/// DECSLRM (one or two).
pub fn select(selector: &FunctionSelector) -> Option<&'static FunctionDefinition> {
    FUNCTIONS
        .iter()
        .filter(|definition| definition.matches(selector))
        .min_by_key(|definition| definition.maximum_parameters - definition.minimum_parameters)
        .copied()
}
