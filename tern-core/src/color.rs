//! Colors and the per-screen palette
//!
//! Cells reference colors symbolically; resolving them against the
//! palette happens at render time. The palette itself is mutable through
//! OSC 4 (indexed entries) and OSC 10/11/12 (dynamic colors) and can be
//! reset entry-by-entry or wholesale.

use serde::{Deserialize, Serialize};

/// A symbolic cell color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Color {
    /// The screen's default foreground or background
    #[default]
    Default,
    /// Palette color 0-255
    Indexed(u8),
    /// Bright variant of palette color 0-7 (SGR 90-97 / 100-107)
    Bright(u8),
    /// Direct 24-bit color
    Rgb(u8, u8, u8),
}

/// A concrete RGB value produced by palette resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The `rgb:RRRR/GGGG/BBBB` form used by OSC color replies
    pub fn to_x11_spec(self) -> String {
        let scale = |v: u8| u32::from(v) * 0x0101;
        format!(
            "rgb:{:04x}/{:04x}/{:04x}",
            scale(self.r),
            scale(self.g),
            scale(self.b)
        )
    }
}

/// Map a palette index to its default RGB value (standard xterm palette)
pub fn xterm_palette(index: u8) -> RgbColor {
    match index {
        0 => RgbColor::new(0, 0, 0),
        1 => RgbColor::new(205, 0, 0),
        2 => RgbColor::new(0, 205, 0),
        3 => RgbColor::new(205, 205, 0),
        4 => RgbColor::new(0, 0, 238),
        5 => RgbColor::new(205, 0, 205),
        6 => RgbColor::new(0, 205, 205),
        7 => RgbColor::new(229, 229, 229),
        8 => RgbColor::new(127, 127, 127),
        9 => RgbColor::new(255, 0, 0),
        10 => RgbColor::new(0, 255, 0),
        11 => RgbColor::new(255, 255, 0),
        12 => RgbColor::new(92, 92, 255),
        13 => RgbColor::new(255, 0, 255),
        14 => RgbColor::new(0, 255, 255),
        15 => RgbColor::new(255, 255, 255),
        // 6x6x6 color cube
        16..=231 => {
            let n = index - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
            RgbColor::new(level(n / 36), level((n % 36) / 6), level(n % 6))
        }
        // Grayscale ramp
        232..=255 => {
            let gray = 8 + (index - 232) * 10;
            RgbColor::new(gray, gray, gray)
        }
    }
}

/// Parse an X11-style color specification as used by OSC 4/10/11/12.
///
/// Accepts `rgb:R/G/B` with 1-4 hex digits per channel and `#RRGGBB`.
pub fn parse_color_spec(spec: &str) -> Option<RgbColor> {
    if let Some(rest) = spec.strip_prefix("rgb:") {
        let mut channels = rest.split('/');
        let r = scale_hex_channel(channels.next()?)?;
        let g = scale_hex_channel(channels.next()?)?;
        let b = scale_hex_channel(channels.next()?)?;
        if channels.next().is_some() {
            return None;
        }
        return Some(RgbColor::new(r, g, b));
    }
    if let Some(hex) = spec.strip_prefix('#') {
        if hex.len() == 6 {
            let value = u32::from_str_radix(hex, 16).ok()?;
            return Some(RgbColor::new(
                (value >> 16) as u8,
                (value >> 8) as u8,
                value as u8,
            ));
        }
    }
    None
}

/// Scale a 1-4 digit hex channel to 8 bits
fn scale_hex_channel(digits: &str) -> Option<u8> {
    if digits.is_empty() || digits.len() > 4 {
        return None;
    }
    let value = u32::from_str_radix(digits, 16).ok()?;
    let max = (1u32 << (4 * digits.len() as u32)) - 1;
    Some(((value * 255) / max) as u8)
}

/// The per-screen color palette
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub foreground: RgbColor,
    pub background: RgbColor,
    pub cursor: RgbColor,
    pub mouse_foreground: RgbColor,
    pub mouse_background: RgbColor,
    pub highlight_foreground: RgbColor,
    pub highlight_background: RgbColor,
    indexed: Vec<RgbColor>,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            foreground: RgbColor::new(229, 229, 229),
            background: RgbColor::new(0, 0, 0),
            cursor: RgbColor::new(229, 229, 229),
            mouse_foreground: RgbColor::new(0, 0, 0),
            mouse_background: RgbColor::new(229, 229, 229),
            highlight_foreground: RgbColor::new(0, 0, 0),
            highlight_background: RgbColor::new(68, 68, 136),
            indexed: (0..=255).map(|i| xterm_palette(i as u8)).collect(),
        }
    }
}

impl ColorPalette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a palette slot
    pub fn indexed(&self, index: u8) -> RgbColor {
        self.indexed[usize::from(index)]
    }

    /// Redefine a palette slot (OSC 4)
    pub fn set_indexed(&mut self, index: u8, color: RgbColor) {
        self.indexed[usize::from(index)] = color;
    }

    /// Reset one palette slot to its default (OSC 104 with a parameter)
    pub fn reset_indexed(&mut self, index: u8) {
        self.indexed[usize::from(index)] = xterm_palette(index);
    }

    /// Reset every palette slot (OSC 104 without parameters)
    pub fn reset_all_indexed(&mut self) {
        for (i, slot) in self.indexed.iter_mut().enumerate() {
            *slot = xterm_palette(i as u8);
        }
    }

    /// Resolve a symbolic color against this palette.
    ///
    /// `bold` selects the bright variant for the base 8 indexed colors,
    /// matching the common bold-is-bright terminal behavior.
    pub fn resolve(&self, color: Color, foreground: bool, bold: bool) -> RgbColor {
        match color {
            Color::Default => {
                if foreground {
                    self.foreground
                } else {
                    self.background
                }
            }
            Color::Indexed(i) => {
                if bold && foreground && i < 8 {
                    self.indexed(i + 8)
                } else {
                    self.indexed(i)
                }
            }
            Color::Bright(i) => self.indexed(i.min(7) + 8),
            Color::Rgb(r, g, b) => RgbColor::new(r, g, b),
        }
    }
}
