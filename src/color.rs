use crate::error::PalettizeError;
use crate::types::Metric;

use std::fmt;
use std::str::FromStr;

/// An 8-bit RGB color. Equality and hashing are exact per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn to_blend(self) -> BlendColor {
        BlendColor {
            r: self.r as f64,
            g: self.g as f64,
            b: self.b as f64,
        }
    }
}

impl From<image::Rgb<u8>> for Color {
    fn from(pixel: image::Rgb<u8>) -> Self {
        Color::new(pixel[0], pixel[1], pixel[2])
    }
}

impl From<Color> for image::Rgb<u8> {
    fn from(color: Color) -> Self {
        image::Rgb([color.r, color.g, color.b])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_hex())
    }
}

/// Parses `RRGGBB` or `#RRGGBB`, case-insensitive.
impl FromStr for Color {
    type Err = PalettizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
            return Err(PalettizeError::InvalidColor(s.to_string()));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| PalettizeError::InvalidColor(s.to_string()))
        };

        Ok(Color::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

/// A color with fractional channels, produced by mixing two palette colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// Linear mix where `weight` is the share of `first`.
pub fn mix(first: Color, second: Color, weight: f64) -> BlendColor {
    let other = 1.0 - weight;
    BlendColor {
        r: first.r as f64 * weight + second.r as f64 * other,
        g: first.g as f64 * weight + second.g as f64 * other,
        b: first.b as f64 * weight + second.b as f64 * other,
    }
}

pub fn distance(a: BlendColor, b: BlendColor, metric: Metric) -> f64 {
    let (dr, dg, db) = (a.r - b.r, a.g - b.g, a.b - b.b);
    match metric {
        Metric::Taxicab => dr.abs() + dg.abs() + db.abs(),
        Metric::Euclidean => (dr * dr + dg * dg + db * db).sqrt(),
    }
}

pub fn color_distance(a: Color, b: Color, metric: Metric) -> f64 {
    distance(a.to_blend(), b.to_blend(), metric)
}
