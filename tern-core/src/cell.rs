//! Grid cells and graphics renditions
//!
//! A cell stores a grapheme cluster (base character plus combining
//! marks), its display width and its rendition. Wide characters occupy
//! two cells: the first carries the codepoints with width 2, the second
//! is an empty continuation with width 0.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

use crate::color::Color;
use crate::hyperlink::HyperlinkRef;
use crate::image::ImageFragment;

/// Most codepoints a single cell will accumulate (base + combining marks)
pub const MAX_CODEPOINTS: usize = 9;

bitflags! {
    /// Per-cell style bits (SGR plus internal markers)
    ///
    /// Serialization comes from the bitflags `serde` feature.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct CellFlags: u32 {
        const BOLD              = 1 << 0;
        const FAINT             = 1 << 1;
        const ITALIC            = 1 << 2;
        const UNDERLINE         = 1 << 3;
        const BLINKING          = 1 << 4;
        const INVERSE           = 1 << 5;
        const HIDDEN            = 1 << 6;
        const CROSSED_OUT       = 1 << 7;
        const DOUBLY_UNDERLINED = 1 << 8;
        const CURLY_UNDERLINED  = 1 << 9;
        const DOTTED_UNDERLINE  = 1 << 10;
        const DASHED_UNDERLINE  = 1 << 11;
        const FRAMED            = 1 << 12;
        const ENCIRCLED         = 1 << 13;
        const OVERLINE          = 1 << 14;
        /// The cell shows an image fragment rather than text
        const IMAGE             = 1 << 15;
        /// The cell's hyperlink is currently hovered (host-driven)
        const HOVER             = 1 << 16;
        /// First cell of a run of consecutive non-empty cells
        const SEQUENCE_START    = 1 << 17;
        /// Last cell of a run of consecutive non-empty cells
        const SEQUENCE_END      = 1 << 18;
    }
}

impl CellFlags {
    /// All underline-style bits, cleared before applying a new style
    pub const ANY_UNDERLINE: CellFlags = CellFlags::UNDERLINE
        .union(CellFlags::DOUBLY_UNDERLINED)
        .union(CellFlags::CURLY_UNDERLINED)
        .union(CellFlags::DOTTED_UNDERLINE)
        .union(CellFlags::DASHED_UNDERLINE);
}

/// Character graphics rendition: colors plus style flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphicsAttributes {
    pub foreground: Color,
    pub background: Color,
    pub underline_color: Color,
    pub flags: CellFlags,
}

impl GraphicsAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the power-on rendition (SGR 0)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One character cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Grapheme cluster content; empty for blank and continuation cells
    text: String,
    /// Columns this cell spans: 1 narrow, 2 wide, 0 continuation
    width: u8,
    attributes: GraphicsAttributes,
    hyperlink: Option<HyperlinkRef>,
    image: Option<ImageFragment>,
}

impl Default for Cell {
    fn default() -> Self {
        Self::new()
    }
}

impl Cell {
    /// A blank cell with default rendition
    pub fn new() -> Self {
        Self {
            text: String::new(),
            width: 1,
            attributes: GraphicsAttributes::default(),
            hyperlink: None,
            image: None,
        }
    }

    /// A blank cell carrying the given rendition
    pub fn blank(attributes: GraphicsAttributes) -> Self {
        Self {
            attributes,
            ..Self::new()
        }
    }

    /// A cell holding a single character
    pub fn with_char(c: char, attributes: GraphicsAttributes) -> Self {
        let mut cell = Self::blank(attributes);
        cell.set_character(c);
        cell
    }

    /// Replace the cell content with a single character
    pub fn set_character(&mut self, c: char) {
        self.image = None;
        self.text.clear();
        self.text.push(c);
        self.width = display_width(c).max(1);
    }

    /// Append a combining codepoint to the cluster.
    ///
    /// The cell width never changes here: in particular the emoji
    /// presentation selectors VS15/VS16 (U+FE0E/U+FE0F) are stored but do
    /// not narrow or widen the cell. Appends beyond [`MAX_CODEPOINTS`]
    /// are dropped.
    pub fn append_character(&mut self, c: char) {
        if self.text.chars().count() < MAX_CODEPOINTS {
            self.text.push(c);
        }
    }

    /// The cluster as UTF-8
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Iterate the cluster's codepoints
    pub fn codepoints(&self) -> impl Iterator<Item = char> + '_ {
        self.text.chars()
    }

    pub fn codepoint_count(&self) -> usize {
        self.text.chars().count()
    }

    /// True when the cell holds neither text nor an image fragment
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.image.is_none()
    }

    /// True when the cell is empty and styled with the given rendition
    pub fn is_blank_with(&self, attributes: &GraphicsAttributes) -> bool {
        self.is_empty() && self.attributes == *attributes && self.hyperlink.is_none()
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    /// Turn the cell into the trailing half of a wide character
    pub fn set_continuation(&mut self) {
        self.text.clear();
        self.image = None;
        self.width = 0;
    }

    /// True for the trailing half of a wide character
    pub fn is_continuation(&self) -> bool {
        self.width == 0
    }

    pub fn attributes(&self) -> &GraphicsAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut GraphicsAttributes {
        &mut self.attributes
    }

    pub fn set_attributes(&mut self, attributes: GraphicsAttributes) {
        self.attributes = attributes;
    }

    pub fn hyperlink(&self) -> Option<&HyperlinkRef> {
        self.hyperlink.as_ref()
    }

    pub fn set_hyperlink(&mut self, hyperlink: Option<HyperlinkRef>) {
        self.hyperlink = hyperlink;
    }

    pub fn image(&self) -> Option<&ImageFragment> {
        self.image.as_ref()
    }

    /// Place an image fragment; the cell keeps its rendition but loses
    /// its text content
    pub fn set_image(&mut self, fragment: ImageFragment) {
        self.text.clear();
        self.width = 1;
        self.image = Some(fragment);
        self.attributes.flags.insert(CellFlags::IMAGE);
    }

    /// Reset to blank with the given rendition
    pub fn reset(&mut self, attributes: GraphicsAttributes) {
        self.text.clear();
        self.width = 1;
        self.attributes = attributes;
        self.hyperlink = None;
        self.image = None;
    }

    /// Reset to blank, keeping the active hyperlink attached
    pub fn reset_with_hyperlink(
        &mut self,
        attributes: GraphicsAttributes,
        hyperlink: Option<HyperlinkRef>,
    ) {
        self.reset(attributes);
        self.hyperlink = hyperlink;
    }
}

/// Display width of one codepoint: 0 combining, 1 narrow, 2 wide
pub fn display_width(c: char) -> u8 {
    match c.width() {
        Some(w) => w.min(2) as u8,
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cell_is_blank() {
        let cell = Cell::new();
        assert!(cell.is_empty());
        assert_eq!(cell.width(), 1);
        assert_eq!(cell.attributes().foreground, Color::Default);
    }

    #[test]
    fn test_narrow_and_wide() {
        let narrow = Cell::with_char('A', GraphicsAttributes::default());
        assert_eq!(narrow.width(), 1);

        let wide = Cell::with_char('世', GraphicsAttributes::default());
        assert_eq!(wide.width(), 2);
    }

    #[test]
    fn test_combining_mark_appends() {
        let mut cell = Cell::with_char('e', GraphicsAttributes::default());
        cell.append_character('\u{0301}');
        assert_eq!(cell.text(), "e\u{0301}");
        assert_eq!(cell.width(), 1);
    }

    #[test]
    fn test_presentation_selector_keeps_width() {
        let mut cell = Cell::with_char('☂', GraphicsAttributes::default());
        let before = cell.width();
        cell.append_character('\u{FE0F}');
        assert_eq!(cell.width(), before);
        assert_eq!(cell.codepoint_count(), 2);
    }

    #[test]
    fn test_codepoint_cap() {
        let mut cell = Cell::with_char('a', GraphicsAttributes::default());
        for _ in 0..20 {
            cell.append_character('\u{0301}');
        }
        assert_eq!(cell.codepoint_count(), MAX_CODEPOINTS);
    }

    #[test]
    fn test_continuation() {
        let mut cell = Cell::with_char('世', GraphicsAttributes::default());
        cell.set_continuation();
        assert!(cell.is_continuation());
        assert!(cell.is_empty());
        assert_eq!(cell.width(), 0);
    }

    #[test]
    fn test_reset_keeps_rendition() {
        let mut attrs = GraphicsAttributes::default();
        attrs.background = Color::Indexed(4);
        let mut cell = Cell::with_char('x', GraphicsAttributes::default());
        cell.reset(attrs);
        assert!(cell.is_empty());
        assert_eq!(cell.attributes().background, Color::Indexed(4));
    }

    #[test]
    fn test_underline_mask() {
        let mut flags = CellFlags::CURLY_UNDERLINED | CellFlags::BOLD;
        flags.remove(CellFlags::ANY_UNDERLINE);
        assert_eq!(flags, CellFlags::BOLD);
    }
}
