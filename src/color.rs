//! RGB color values for scene commands.
//!
//! Block programs carry colors as hex strings (`#rrggbb`, `#rgb`) or one of a
//! small set of named colors. Parsing happens once, at program load; scene
//! setters only ever see an already-validated [`Color`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An RGB color with components in the 0.0-1.0 range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build a color from 8-bit channel values.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as f32 / 255.0,
            g: g as f32 / 255.0,
            b: b as f32 / 255.0,
        }
    }

    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);

    /// Channels as 8-bit values (for display and JSON).
    pub fn to_rgb8(&self) -> [u8; 3] {
        [
            (self.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (self.b.clamp(0.0, 1.0) * 255.0).round() as u8,
        ]
    }

    /// Channels as a flat array (for renderers that take float triples).
    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Failure to interpret a string as a color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError {
    pub input: String,
}

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not a color: {:?}", self.input)
    }
}

impl std::error::Error for ParseColorError {}

/// Named colors accepted anywhere a hex string is.
fn named(name: &str) -> Option<Color> {
    let c = match name {
        "white" => Color::from_rgb8(0xff, 0xff, 0xff),
        "black" => Color::from_rgb8(0x00, 0x00, 0x00),
        "red" => Color::from_rgb8(0xff, 0x00, 0x00),
        "green" => Color::from_rgb8(0x00, 0xff, 0x00),
        "blue" => Color::from_rgb8(0x00, 0x00, 0xff),
        "yellow" => Color::from_rgb8(0xff, 0xff, 0x00),
        "cyan" => Color::from_rgb8(0x00, 0xff, 0xff),
        "magenta" => Color::from_rgb8(0xff, 0x00, 0xff),
        "gray" | "grey" => Color::from_rgb8(0x80, 0x80, 0x80),
        "orange" => Color::from_rgb8(0xff, 0xa5, 0x00),
        _ => return None,
    };
    Some(c)
}

fn hex_channel(s: &str) -> Option<u8> {
    u8::from_str_radix(s, 16).ok()
}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if let Some(hex) = trimmed.strip_prefix('#') {
            match hex.len() {
                // #rgb shorthand: each digit doubles (#f0a -> #ff00aa)
                3 => {
                    let digits: Vec<Option<u8>> = hex
                        .chars()
                        .map(|c| hex_channel(&format!("{c}{c}")))
                        .collect();
                    if let [Some(r), Some(g), Some(b)] = digits[..] {
                        return Ok(Color::from_rgb8(r, g, b));
                    }
                }
                6 => {
                    if let (Some(r), Some(g), Some(b)) = (
                        hex_channel(&hex[0..2]),
                        hex_channel(&hex[2..4]),
                        hex_channel(&hex[4..6]),
                    ) {
                        return Ok(Color::from_rgb8(r, g, b));
                    }
                }
                _ => {}
            }
        } else if let Some(c) = named(&trimmed.to_ascii_lowercase()) {
            return Ok(c);
        }

        Err(ParseColorError {
            input: s.to_string(),
        })
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.to_rgb8();
        write!(f, "#{r:02x}{g:02x}{b:02x}")
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
