//! CSI and DCS parameter accumulation
//!
//! Parameters are separated by `;`. A parameter may carry colon-separated
//! sub-parameters (`38:2::10:20:30`), which are kept ordered behind their
//! top-level value. A missing numeric value is recorded as 0; functions
//! substitute their own defaults when they apply.

use serde::{Deserialize, Serialize};

/// Maximum number of top-level parameters tracked per sequence
pub const MAX_PARAMETERS: usize = 16;

/// Maximum number of sub-parameters tracked per parameter
pub const MAX_SUBPARAMETERS: usize = 8;

/// Accumulated parameters of a control sequence
///
/// Each entry holds the top-level value followed by its sub-parameters.
/// Input beyond the caps is dropped while the byte stream keeps being
/// consumed, so an overlong sequence still terminates in the right state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    entries: Vec<Vec<u16>>,
    #[serde(skip)]
    pending: Vec<u16>,
    #[serde(skip)]
    scalar: u16,
    #[serde(skip)]
    has_scalar: bool,
}

impl Params {
    /// Create an empty parameter list
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            pending: Vec::with_capacity(1 + MAX_SUBPARAMETERS),
            scalar: 0,
            has_scalar: false,
        }
    }

    /// Build a parameter list from plain top-level values (tests, replies)
    pub fn from_values(values: &[u16]) -> Self {
        Self {
            entries: values.iter().map(|&v| vec![v]).collect(),
            pending: Vec::new(),
            scalar: 0,
            has_scalar: false,
        }
    }

    /// Discard all accumulated state
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pending.clear();
        self.scalar = 0;
        self.has_scalar = false;
    }

    /// Feed one parameter byte: a digit, `;` or `:`
    pub fn put(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' => {
                self.scalar = self
                    .scalar
                    .saturating_mul(10)
                    .saturating_add(u16::from(byte - b'0'));
                self.has_scalar = true;
            }
            b':' => {
                self.commit_scalar();
            }
            b';' => {
                self.commit_scalar();
                self.commit_entry();
            }
            _ => {}
        }
    }

    /// Close the list after the final byte arrived
    pub fn finish(&mut self) {
        if self.has_scalar || !self.pending.is_empty() || !self.entries.is_empty() {
            self.commit_scalar();
            self.commit_entry();
        }
    }

    fn commit_scalar(&mut self) {
        if self.pending.len() < 1 + MAX_SUBPARAMETERS {
            self.pending.push(if self.has_scalar { self.scalar } else { 0 });
        }
        self.scalar = 0;
        self.has_scalar = false;
    }

    fn commit_entry(&mut self) {
        if self.pending.is_empty() {
            self.pending.push(0);
        }
        if self.entries.len() < MAX_PARAMETERS {
            self.entries.push(std::mem::take(&mut self.pending));
        } else {
            self.pending.clear();
        }
    }

    /// Number of top-level parameters
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no parameters were given
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw top-level value at `index` (0 when absent)
    pub fn raw(&self, index: usize) -> u16 {
        self.entries.get(index).map_or(0, |entry| entry[0])
    }

    /// Top-level value at `index`, treating 0 as "use the default"
    pub fn get_or(&self, index: usize, default: u16) -> u16 {
        match self.raw(index) {
            0 => default,
            value => value,
        }
    }

    /// Sub-parameters of the parameter at `index`
    pub fn subparams(&self, index: usize) -> &[u16] {
        self.entries
            .get(index)
            .map_or(&[], |entry| &entry[1..])
    }

    /// Iterate over top-level values
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.entries.iter().map(|entry| entry[0])
    }

    /// Iterate over (value, sub-parameters) pairs
    pub fn iter_with_subparams(&self) -> impl Iterator<Item = (u16, &[u16])> + '_ {
        self.entries.iter().map(|entry| (entry[0], &entry[1..]))
    }
}
