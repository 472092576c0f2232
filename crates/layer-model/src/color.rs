//! CSS-like color values for text banners.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

/// Failure to parse a color string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{input}': {reason}")]
pub struct ColorParseError {
    pub input: String,
    pub reason: &'static str,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim().to_ascii_lowercase();
        let err = |reason| ColorParseError {
            input: s.to_string(),
            reason,
        };

        if input == "transparent" {
            return Ok(Color::TRANSPARENT);
        }

        if let Some(hex) = input.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(err("bad hex digit"));
            }
            let expanded: String = match hex.len() {
                3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
                6 | 8 => hex.to_string(),
                _ => return Err(err("expected 3, 4, 6 or 8 hex digits")),
            };
            let channel = |i: usize| {
                u8::from_str_radix(&expanded[i..i + 2], 16).map_err(|_| err("bad hex digit"))
            };
            let a = if expanded.len() == 8 { channel(6)? } else { 255 };
            return Ok(Color::rgba(channel(0)?, channel(2)?, channel(4)?, a));
        }

        let (body, has_alpha) = if let Some(body) = input.strip_prefix("rgba(") {
            (body, true)
        } else if let Some(body) = input.strip_prefix("rgb(") {
            (body, false)
        } else {
            return Err(err("unrecognized color syntax"));
        };
        let body = body
            .strip_suffix(')')
            .ok_or_else(|| err("missing closing parenthesis"))?;
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let expected = if has_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return Err(err("wrong number of components"));
        }

        let channel = |p: &str| p.parse::<u8>().map_err(|_| err("channel out of range"));
        let a = if has_alpha {
            let alpha: f64 = parts[3].parse().map_err(|_| err("bad alpha"))?;
            if !(0.0..=1.0).contains(&alpha) {
                return Err(err("alpha must be within [0, 1]"));
            }
            // Nudge so CSS fractions such as 0.7 land on the nearest channel value.
            (alpha * 255.0 + 1e-9).round() as u8
        } else {
            255
        };
        Ok(Color::rgba(
            channel(parts[0])?,
            channel(parts[1])?,
            channel(parts[2])?,
            a,
        ))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.a {
            0 => write!(f, "transparent"),
            255 => write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b),
            a => {
                let alpha = (f64::from(a) / 255.0 * 100.0).round() / 100.0;
                write!(f, "rgba({},{},{},{})", self.r, self.g, self.b, alpha)
            }
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}
