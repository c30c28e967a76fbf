//! Character and block formatting primitives.
//!
//! Character formats follow merge semantics: a `CharFormat` only carries the
//! properties that were explicitly set, and merging overlays those properties
//! onto an existing format while leaving the rest untouched.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::new(0, 0, 0, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn parse_hex(s: &str) -> Option<Self> {
        let hex = s.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::opaque(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Sparse character format. `None` means "not set".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharFormat {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub foreground: Option<Rgba>,
    pub underline_color: Option<Rgba>,
    pub point_size: Option<i32>,
    pub family: Option<String>,
}

impl CharFormat {
    pub fn bold(enabled: bool) -> Self {
        Self { bold: Some(enabled), ..Self::default() }
    }

    pub fn italic(enabled: bool) -> Self {
        Self { italic: Some(enabled), ..Self::default() }
    }

    pub fn underline(enabled: bool) -> Self {
        Self { underline: Some(enabled), ..Self::default() }
    }

    pub fn foreground(color: Rgba) -> Self {
        Self { foreground: Some(color), ..Self::default() }
    }

    pub fn underline_color(color: Rgba) -> Self {
        Self { underline_color: Some(color), ..Self::default() }
    }

    pub fn point_size(size: i32) -> Self {
        Self { point_size: Some(size), ..Self::default() }
    }

    pub fn family(family: impl Into<String>) -> Self {
        Self { family: Some(family.into()), ..Self::default() }
    }

    /// Overlay every property set in `other` onto `self`.
    pub fn merge(&mut self, other: &CharFormat) {
        if other.bold.is_some() {
            self.bold = other.bold;
        }
        if other.italic.is_some() {
            self.italic = other.italic;
        }
        if other.underline.is_some() {
            self.underline = other.underline;
        }
        if other.foreground.is_some() {
            self.foreground = other.foreground;
        }
        if other.underline_color.is_some() {
            self.underline_color = other.underline_color;
        }
        if other.point_size.is_some() {
            self.point_size = other.point_size;
        }
        if let Some(family) = &other.family {
            self.family = Some(family.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == CharFormat::default()
    }
}

/// Horizontal block alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Center,
    Justify,
}

impl Alignment {
    pub fn css(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Center => "center",
            Alignment::Justify => "justify",
        }
    }

    pub fn from_css(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Alignment::Left),
            "right" => Some(Alignment::Right),
            "center" => Some(Alignment::Center),
            "justify" => Some(Alignment::Justify),
            _ => None,
        }
    }
}

/// Marker style of a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListStyle {
    Disc,
    Circle,
    Square,
    Decimal,
    AlphaLower,
    AlphaUpper,
    RomanLower,
    RomanUpper,
}

impl ListStyle {
    pub fn is_ordered(self) -> bool {
        !matches!(self, ListStyle::Disc | ListStyle::Circle | ListStyle::Square)
    }

    pub fn css(self) -> &'static str {
        match self {
            ListStyle::Disc => "disc",
            ListStyle::Circle => "circle",
            ListStyle::Square => "square",
            ListStyle::Decimal => "decimal",
            ListStyle::AlphaLower => "lower-alpha",
            ListStyle::AlphaUpper => "upper-alpha",
            ListStyle::RomanLower => "lower-roman",
            ListStyle::RomanUpper => "upper-roman",
        }
    }

    pub fn from_css(s: &str) -> Option<Self> {
        match s {
            "disc" => Some(ListStyle::Disc),
            "circle" => Some(ListStyle::Circle),
            "square" => Some(ListStyle::Square),
            "decimal" => Some(ListStyle::Decimal),
            "lower-alpha" => Some(ListStyle::AlphaLower),
            "upper-alpha" => Some(ListStyle::AlphaUpper),
            "lower-roman" => Some(ListStyle::RomanLower),
            "upper-roman" => Some(ListStyle::RomanUpper),
            _ => None,
        }
    }
}

/// Paragraph styles offered by the style selector.
///
/// The discriminant is the wire value, so variants must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BlockStyle {
    #[default]
    Standard = 0,
    BulletDisc = 1,
    BulletCircle = 2,
    BulletSquare = 3,
    TaskUnchecked = 4,
    TaskChecked = 5,
    OrderedDecimal = 6,
    OrderedAlphaUpper = 7,
    OrderedAlphaLower = 8,
    OrderedRomanUpper = 9,
    OrderedRomanLower = 10,
    Heading1 = 11,
    Heading2 = 12,
    Heading3 = 13,
    Heading4 = 14,
    Heading5 = 15,
    Heading6 = 16,
}

impl BlockStyle {
    pub const ALL: [BlockStyle; 17] = [
        BlockStyle::Standard,
        BlockStyle::BulletDisc,
        BlockStyle::BulletCircle,
        BlockStyle::BulletSquare,
        BlockStyle::TaskUnchecked,
        BlockStyle::TaskChecked,
        BlockStyle::OrderedDecimal,
        BlockStyle::OrderedAlphaUpper,
        BlockStyle::OrderedAlphaLower,
        BlockStyle::OrderedRomanUpper,
        BlockStyle::OrderedRomanLower,
        BlockStyle::Heading1,
        BlockStyle::Heading2,
        BlockStyle::Heading3,
        BlockStyle::Heading4,
        BlockStyle::Heading5,
        BlockStyle::Heading6,
    ];

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// List style the block joins, if any. Task lists use disc markers.
    pub fn list_style(self) -> Option<ListStyle> {
        match self {
            BlockStyle::BulletDisc | BlockStyle::TaskUnchecked | BlockStyle::TaskChecked => {
                Some(ListStyle::Disc)
            }
            BlockStyle::BulletCircle => Some(ListStyle::Circle),
            BlockStyle::BulletSquare => Some(ListStyle::Square),
            BlockStyle::OrderedDecimal => Some(ListStyle::Decimal),
            BlockStyle::OrderedAlphaUpper => Some(ListStyle::AlphaUpper),
            BlockStyle::OrderedAlphaLower => Some(ListStyle::AlphaLower),
            BlockStyle::OrderedRomanUpper => Some(ListStyle::RomanUpper),
            BlockStyle::OrderedRomanLower => Some(ListStyle::RomanLower),
            _ => None,
        }
    }

    pub fn checked(self) -> Option<bool> {
        match self {
            BlockStyle::TaskUnchecked => Some(false),
            BlockStyle::TaskChecked => Some(true),
            _ => None,
        }
    }

    pub fn heading(self) -> Option<u8> {
        match self {
            BlockStyle::Heading1 => Some(1),
            BlockStyle::Heading2 => Some(2),
            BlockStyle::Heading3 => Some(3),
            BlockStyle::Heading4 => Some(4),
            BlockStyle::Heading5 => Some(5),
            BlockStyle::Heading6 => Some(6),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockStyle::Standard => "standard",
            BlockStyle::BulletDisc => "disc",
            BlockStyle::BulletCircle => "circle",
            BlockStyle::BulletSquare => "square",
            BlockStyle::TaskUnchecked => "todo",
            BlockStyle::TaskChecked => "done",
            BlockStyle::OrderedDecimal => "decimal",
            BlockStyle::OrderedAlphaUpper => "upper-alpha",
            BlockStyle::OrderedAlphaLower => "lower-alpha",
            BlockStyle::OrderedRomanUpper => "upper-roman",
            BlockStyle::OrderedRomanLower => "lower-roman",
            BlockStyle::Heading1 => "h1",
            BlockStyle::Heading2 => "h2",
            BlockStyle::Heading3 => "h3",
            BlockStyle::Heading4 => "h4",
            BlockStyle::Heading5 => "h5",
            BlockStyle::Heading6 => "h6",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|style| style.name() == name)
    }
}

/// Identifier of a list inside one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListId(pub u32);

/// A list shared by one or more blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    pub style: ListStyle,
    /// Nesting level, starting at 1.
    pub indent: u32,
}

/// Paragraph-level format.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockFormat {
    pub alignment: Alignment,
    /// Indent level for blocks outside of lists.
    pub indent: u32,
    pub list: Option<ListId>,
    /// Task-list state; `None` for ordinary blocks.
    pub checked: Option<bool>,
    pub heading: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgba_hex_roundtrip() {
        let color = Rgba::new(0x12, 0xab, 0x00, 0xff);
        assert_eq!(color.to_hex(), "#12ab00ff");
        assert_eq!(Rgba::parse_hex("#12ab00ff"), Some(color));
        assert_eq!(Rgba::parse_hex("#12ab00"), Some(color));
    }

    #[test]
    fn test_rgba_parse_rejects_garbage() {
        assert!(Rgba::parse_hex("12ab00").is_none());
        assert!(Rgba::parse_hex("#12ab0").is_none());
        assert!(Rgba::parse_hex("#zzzzzz").is_none());
        assert!(Rgba::parse_hex("#ééé").is_none());
    }

    #[test]
    fn test_merge_only_overlays_set_properties() {
        let mut base = CharFormat {
            bold: Some(true),
            point_size: Some(12),
            ..CharFormat::default()
        };
        base.merge(&CharFormat::italic(true));
        assert_eq!(base.bold, Some(true));
        assert_eq!(base.italic, Some(true));
        assert_eq!(base.point_size, Some(12));

        base.merge(&CharFormat::bold(false));
        assert_eq!(base.bold, Some(false));
    }

    #[test]
    fn test_block_style_wire_values() {
        for (i, style) in BlockStyle::ALL.iter().enumerate() {
            assert_eq!(*style as u8 as usize, i);
            assert_eq!(BlockStyle::from_u8(i as u8), Some(*style));
        }
        assert_eq!(BlockStyle::from_u8(17), None);
    }

    #[test]
    fn test_block_style_names() {
        for style in BlockStyle::ALL {
            assert_eq!(BlockStyle::from_name(style.name()), Some(style));
        }
        assert_eq!(BlockStyle::TaskChecked.checked(), Some(true));
        assert_eq!(BlockStyle::Heading3.heading(), Some(3));
        assert_eq!(BlockStyle::Standard.list_style(), None);
        assert!(BlockStyle::OrderedRomanUpper.list_style().unwrap().is_ordered());
    }
}
