//! # Color
//!
//! 8-bit, straight-alpha sRGB colors as stored in every [`Raster`](crate::raster::Raster), plus
//! the conversions tools need (hex text, HSV) and a few color-scheme helpers.

use crate::util::{clamp_unit, u8_to_unit, unit_to_u8};

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("expected 6 or 8 hex digits, found {0}")]
    BadLength(usize),
    #[error("invalid hex digit")]
    BadDigit,
}

/// An RGBA color, 8 bits per channel, not premultiplied.
#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Default,
    bytemuck::Pod,
    bytemuck::Zeroable,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub [u8; 4]);
impl Color {
    pub const TRANSPARENT: Self = Self([0; 4]);
    pub const BLACK: Self = Self([0, 0, 0, 255]);
    pub const WHITE: Self = Self([255; 4]);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b, 255])
    }
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }
    #[must_use]
    pub const fn r(self) -> u8 {
        self.0[0]
    }
    #[must_use]
    pub const fn g(self) -> u8 {
        self.0[1]
    }
    #[must_use]
    pub const fn b(self) -> u8 {
        self.0[2]
    }
    #[must_use]
    pub const fn alpha(self) -> u8 {
        self.0[3]
    }
    /// Same color with a different alpha.
    #[must_use]
    pub const fn with_alpha(self, alpha: u8) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, alpha])
    }
    /// Channels as `[0, 1]` floats.
    #[must_use]
    pub fn to_unit(self) -> [f32; 4] {
        self.0.map(u8_to_unit)
    }
    /// From `[0, 1]` floats, clamping and rounding.
    #[must_use]
    pub fn from_unit(channels: [f32; 4]) -> Self {
        Self(channels.map(unit_to_u8))
    }
    /// Parse `#RRGGBB` or `#RRGGBBAA`. The leading `#` is optional.
    pub fn from_hex(text: &str) -> Result<Self, ColorParseError> {
        let digits = text.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return Err(ColorParseError::BadDigit);
        }
        let channel = |idx: usize| {
            digits
                .get(idx * 2..idx * 2 + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or(ColorParseError::BadDigit)
        };
        match digits.len() {
            6 => Ok(Self::rgb(channel(0)?, channel(1)?, channel(2)?)),
            8 => Ok(Self::rgba(channel(0)?, channel(1)?, channel(2)?, channel(3)?)),
            other => Err(ColorParseError::BadLength(other)),
        }
    }
    /// `#RRGGBB`, or `#RRGGBBAA` if not opaque.
    #[must_use]
    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
    /// Hue in degrees `[0, 360)`, saturation and value in `[0, 1]`. Alpha is ignored.
    #[must_use]
    pub fn to_hsv(self) -> [f32; 3] {
        let [r, g, b, _] = self.to_unit();
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta <= f32::EPSILON {
            0.0
        } else if max == r {
            60.0 * ((g - b) / delta).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };
        let saturation = if max <= f32::EPSILON { 0.0 } else { delta / max };
        [hue, saturation, max]
    }
    /// Inverse of [`Color::to_hsv`]. Hue wraps, saturation and value clamp.
    #[must_use]
    pub fn from_hsv(hue: f32, saturation: f32, value: f32, alpha: u8) -> Self {
        let hue = if hue.is_finite() {
            hue.rem_euclid(360.0)
        } else {
            0.0
        };
        let saturation = clamp_unit(saturation);
        let value = clamp_unit(value);

        let chroma = value * saturation;
        let x = chroma * (1.0 - ((hue / 60.0).rem_euclid(2.0) - 1.0).abs());
        let m = value - chroma;
        let (r, g, b) = match hue {
            h if h < 60.0 => (chroma, x, 0.0),
            h if h < 120.0 => (x, chroma, 0.0),
            h if h < 180.0 => (0.0, chroma, x),
            h if h < 240.0 => (0.0, x, chroma),
            h if h < 300.0 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        Self::from_unit([r + m, g + m, b + m, u8_to_unit(alpha)])
    }
    /// Per-channel linear interpolation, alpha included. `t` clamps to `[0, 1]`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        let t = clamp_unit(t);
        let a = self.to_unit();
        let b = other.to_unit();
        Self::from_unit(std::array::from_fn(|idx| a[idx] + (b[idx] - a[idx]) * t))
    }
    /// Luma, Rec. 601 weights.
    #[must_use]
    pub fn luminance(self) -> u8 {
        let [r, g, b, _] = self.to_unit();
        unit_to_u8(0.299 * r + 0.587 * g + 0.114 * b)
    }
    #[must_use]
    pub fn inverted(self) -> Self {
        let [r, g, b, a] = self.0;
        Self([255 - r, 255 - g, 255 - b, a])
    }
    /// Hue rotated by 180 degrees.
    #[must_use]
    pub fn complementary(self) -> Self {
        self.rotate_hue(180.0)
    }
    #[must_use]
    pub fn rotate_hue(self, degrees: f32) -> Self {
        let [h, s, v] = self.to_hsv();
        Self::from_hsv(h + degrees, s, v, self.alpha())
    }
    /// This color, and the two at +-120 degrees.
    #[must_use]
    pub fn triadic(self) -> [Self; 3] {
        [self, self.rotate_hue(120.0), self.rotate_hue(240.0)]
    }
    /// Neighbours at +-`spread` degrees around this color.
    #[must_use]
    pub fn analogous(self, spread: f32) -> [Self; 3] {
        [self.rotate_hue(-spread), self, self.rotate_hue(spread)]
    }
}
impl std::fmt::Debug for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Color({})", self.to_hex())
    }
}
impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
impl std::str::FromStr for Color {
    type Err = ColorParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
impl TryFrom<String> for Color {
    type Error = ColorParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}
impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_hex()
    }
}
