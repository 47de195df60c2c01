//! Style attribute resolution.
//!
//! Pure, stateless accessors that map an element's raw string attributes into
//! typed style values. They are called repeatedly across pipeline stages on
//! the same element, so every resolver here is idempotent and side-effect
//! free. Numeric attributes follow digit-stripping semantics: all non-digit
//! characters are removed before parsing, and an attribute that reduces to an
//! empty digit string resolves to absent, never zero.

use crate::markup::Element;
use nom::IResult;
use nom::branch::alt;
use nom::bytes::complete::take_while_m_n;
use nom::character::complete::char;
use nom::combinator::map;
use nom::sequence::{preceded, tuple};

/// Four-sided box insets with CSS-shorthand fallback expansion.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Insets {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Insets {
    pub const ZERO: Insets = Insets { top: 0.0, right: 0.0, bottom: 0.0, left: 0.0 };

    pub const fn new(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Insets { top, right, bottom, left }
    }
}

/// Horizontal alignment of children within a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// An opaque RGB color parsed from a `#RRGGBB` / `#RGB` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
}

/// Resolved `border` attribute: `{size, style token, color}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Border {
    pub size: f32,
    pub style: String,
    pub color: Color,
}

/// Default background for button nodes when none is specified.
pub const BUTTON_BACKGROUND: Color = Color { r: 0x00, g: 0x91, b: 0xff };

/// Default content padding for button nodes when none is specified.
pub const BUTTON_PADDING: Insets = Insets::new(14.0, 40.0, 14.0, 40.0);

/// Default font size for plain text nodes.
pub const DEFAULT_FONT_SIZE: f32 = 15.0;

/// Retains only ascii digits from a raw attribute value.
fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Digit-stripping numeric resolution: `"100px"` is 100, `"px"` is absent.
fn numeric(raw: &str) -> Option<f32> {
    let d = digits(raw);
    if d.is_empty() { None } else { d.parse().ok() }
}

/// Expands an insets shorthand string. Missing values fall back as
/// `right <- top`, `bottom <- top`, `left <- right`; an empty string is
/// all-zero. The absent-attribute case is handled by the caller.
fn parse_insets(raw: &str) -> Insets {
    if raw.is_empty() {
        return Insets::ZERO;
    }
    let values: Vec<f32> = raw
        .split(' ')
        .map(|part| digits(part).parse().unwrap_or(0.0))
        .collect();
    let top = values.first().copied().unwrap_or(0.0);
    let right = values.get(1).copied().unwrap_or(top);
    let bottom = values.get(2).copied().unwrap_or(top);
    let left = values.get(3).copied().unwrap_or(right);
    Insets { top, right, bottom, left }
}

// --- Hex color parsing (nom) ---

fn from_hex(input: &str) -> Result<u8, std::num::ParseIntError> {
    u8::from_str_radix(input, 16)
}

fn is_hex_digit(c: char) -> bool {
    c.is_ascii_hexdigit()
}

fn hex_primary(input: &str) -> IResult<&str, u8> {
    nom::combinator::map_res(take_while_m_n(2, 2, is_hex_digit), from_hex)(input)
}

fn hex_color_6(input: &str) -> IResult<&str, Color> {
    map(tuple((hex_primary, hex_primary, hex_primary)), |(r, g, b)| Color { r, g, b })(input)
}

fn hex_nibble(input: &str) -> IResult<&str, u8> {
    nom::combinator::map_res(take_while_m_n(1, 1, is_hex_digit), |s: &str| {
        from_hex(&format!("{s}{s}"))
    })(input)
}

fn hex_color_3(input: &str) -> IResult<&str, Color> {
    map(tuple((hex_nibble, hex_nibble, hex_nibble)), |(r, g, b)| Color { r, g, b })(input)
}

fn hex_color(input: &str) -> IResult<&str, Color> {
    preceded(char('#'), alt((hex_color_6, hex_color_3)))(input)
}

/// Parses a `#RRGGBB` or `#RGB` color token; anything else is absent.
pub fn parse_color(raw: &str) -> Option<Color> {
    match hex_color(raw.trim()) {
        Ok(("", color)) => Some(color),
        _ => None,
    }
}

/// Heading level to default font size.
pub fn heading_font_size(level: u32) -> f32 {
    match level {
        1 => 32.0,
        2 => 28.0,
        3 => 20.0,
        _ => 16.0,
    }
}

/// Typed style accessors over an element's attribute map.
///
/// Implemented for [`Element`]; the blanket method bodies only ever read
/// through [`Styled::attr`], which keeps every accessor a pure function of
/// the attribute map.
pub trait Styled {
    fn attr(&self, name: &str) -> Option<&str>;

    fn width(&self) -> Option<f32> {
        self.attr("width").and_then(numeric)
    }

    fn height(&self) -> Option<f32> {
        self.attr("height").and_then(numeric)
    }

    fn align(&self) -> Option<Align> {
        match self.attr("align")? {
            "left" => Some(Align::Left),
            "center" => Some(Align::Center),
            "right" => Some(Align::Right),
            _ => None,
        }
    }

    fn href(&self) -> Option<&str> {
        self.attr("href").filter(|h| !h.is_empty())
    }

    /// `None` means the attribute is absent; `margin=""` is explicit zero.
    /// Both are observably identical for layout.
    fn margin(&self) -> Option<Insets> {
        self.attr("margin").map(parse_insets)
    }

    fn padding(&self) -> Option<Insets> {
        self.attr("padding").map(parse_insets)
    }

    fn color(&self) -> Option<Color> {
        self.attr("color").and_then(parse_color)
    }

    fn background_color(&self) -> Option<Color> {
        self.attr("background-color").and_then(parse_color)
    }

    fn level(&self) -> Option<u32> {
        self.attr("level").and_then(|l| {
            let d = digits(l);
            if d.is_empty() { None } else { d.parse().ok() }
        })
    }

    fn font_size(&self) -> Option<f32> {
        self.attr("font-size").and_then(numeric)
    }

    fn border_radius(&self) -> Option<f32> {
        self.attr("border-radius").and_then(numeric)
    }

    /// Resolves only when the value has exactly three space-separated
    /// tokens; a partial border is never produced. A malformed color token
    /// falls back to black rather than discarding the border.
    fn border(&self) -> Option<Border> {
        let raw = self.attr("border")?;
        let tokens: Vec<&str> = raw.split_whitespace().collect();
        if tokens.len() != 3 {
            return None;
        }
        Some(Border {
            size: numeric(tokens[0]).unwrap_or(0.0),
            style: tokens[1].to_string(),
            color: parse_color(tokens[2]).unwrap_or(Color::BLACK),
        })
    }

    /// Effective font size: explicit `font-size` wins, then the heading
    /// ramp, then the plain-text default.
    fn resolved_font_size(&self) -> f32 {
        self.font_size()
            .unwrap_or_else(|| self.level().map(heading_font_size).unwrap_or(DEFAULT_FONT_SIZE))
    }
}

impl Styled for Element {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attribute(name)
    }
}
