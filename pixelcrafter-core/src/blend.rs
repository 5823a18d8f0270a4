use crate::{
    color::Color,
    util::{clamp_unit, u8_to_unit, unit_to_u8},
};

#[derive(
    strum::AsRefStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    PartialEq,
    Eq,
    Copy,
    Clone,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}
impl BlendMode {
    /// The blended color of one channel, both inputs in `[0, 1]`. Alpha is handled by [`blend_pixel`].
    #[must_use]
    pub fn mix(self, base: f32, top: f32) -> f32 {
        match self {
            Self::Normal => top,
            Self::Multiply => base * top,
            Self::Screen => 1.0 - (1.0 - base) * (1.0 - top),
            Self::Overlay => overlay(base, top),
            Self::Darken => base.min(top),
            Self::Lighten => base.max(top),
            Self::ColorDodge => {
                if top >= 1.0 {
                    1.0
                } else {
                    (base / (1.0 - top)).min(1.0)
                }
            }
            Self::ColorBurn => {
                if top <= 0.0 {
                    0.0
                } else {
                    (1.0 - (1.0 - base) / top).max(0.0)
                }
            }
            Self::HardLight => overlay(top, base),
            Self::SoftLight => soft_light(base, top),
            Self::Difference => (base - top).abs(),
            Self::Exclusion => base + top - 2.0 * base * top,
        }
    }
}
fn overlay(base: f32, top: f32) -> f32 {
    if base < 0.5 {
        2.0 * base * top
    } else {
        1.0 - 2.0 * (1.0 - base) * (1.0 - top)
    }
}
/// W3C compositing soft light.
fn soft_light(base: f32, top: f32) -> f32 {
    if top <= 0.5 {
        base - (1.0 - 2.0 * top) * base * (1.0 - base)
    } else {
        let d = if base <= 0.25 {
            ((16.0 * base - 12.0) * base + 4.0) * base
        } else {
            base.sqrt()
        };
        base + (2.0 * top - 1.0) * (d - base)
    }
}

/// Blend mode for a layer, including a mode and opacity modulate.
#[derive(Copy, Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Blend {
    pub mode: BlendMode,
    /// `[0, 1]`
    pub opacity: f32,
}
impl Default for Blend {
    fn default() -> Self {
        Self {
            mode: BlendMode::default(),
            opacity: 1.0,
        }
    }
}
impl Blend {
    #[must_use]
    pub fn new(mode: BlendMode, opacity: f32) -> Self {
        Self {
            mode,
            opacity: clamp_unit(opacity),
        }
    }
}

/// Composite `top` over `base` source-over style, with `top`'s alpha scaled by the blend opacity.
///
/// Where the base is transparent the top color shows through unmixed, so blend modes only
/// affect the region where both have coverage.
#[must_use]
pub fn blend_pixel(base: Color, top: Color, blend: Blend) -> Color {
    let top_alpha = u8_to_unit(top.alpha()) * clamp_unit(blend.opacity);
    if top_alpha <= 0.0 {
        return base;
    }
    if base.alpha() == 0 && top_alpha >= 1.0 {
        return top;
    }

    let base_unit = base.to_unit();
    let top_unit = top.to_unit();
    let base_alpha = base_unit[3];

    let out_alpha = top_alpha + base_alpha * (1.0 - top_alpha);
    if out_alpha <= 0.0 {
        return Color::TRANSPARENT;
    }
    let channel = |idx: usize| {
        let (b, t) = (base_unit[idx], top_unit[idx]);
        let mixed = (1.0 - base_alpha) * t + base_alpha * blend.mode.mix(b, t);
        (mixed * top_alpha + b * base_alpha * (1.0 - top_alpha)) / out_alpha
    };
    Color([
        unit_to_u8(channel(0)),
        unit_to_u8(channel(1)),
        unit_to_u8(channel(2)),
        unit_to_u8(out_alpha),
    ])
}

#[cfg(test)]
mod test {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn names_round_trip() {
        for mode in BlendMode::iter() {
            let name = mode.to_string();
            assert_eq!(name.parse::<BlendMode>().unwrap(), mode);
        }
        assert_eq!(BlendMode::ColorDodge.as_ref(), "color-dodge");
        assert_eq!(
            serde_json::to_string(&BlendMode::SoftLight).unwrap(),
            "\"soft-light\""
        );
    }
    #[test]
    fn transparent_top_is_identity() {
        let base = Color::rgba(10, 20, 30, 200);
        for mode in BlendMode::iter() {
            assert_eq!(
                blend_pixel(base, Color::TRANSPARENT, Blend::new(mode, 1.0)),
                base
            );
            assert_eq!(blend_pixel(base, Color::WHITE, Blend::new(mode, 0.0)), base);
        }
    }
    #[test]
    fn normal_half_opacity() {
        let out = blend_pixel(
            Color::rgb(255, 0, 0),
            Color::rgb(0, 0, 255),
            Blend::new(BlendMode::Normal, 0.5),
        );
        assert!((127..=128).contains(&out.r()));
        assert_eq!(out.g(), 0);
        assert!((127..=128).contains(&out.b()));
        assert_eq!(out.alpha(), 255);
    }
    #[test]
    fn modes_on_opaque() {
        let grey = Color::rgb(128, 128, 128);
        let white = Color::WHITE;
        let black = Color::BLACK;
        let opaque = |mode| Blend::new(mode, 1.0);

        assert_eq!(blend_pixel(white, grey, opaque(BlendMode::Multiply)), grey);
        assert_eq!(blend_pixel(black, grey, opaque(BlendMode::Screen)), grey);
        assert_eq!(blend_pixel(grey, black, opaque(BlendMode::Darken)), black);
        assert_eq!(blend_pixel(grey, black, opaque(BlendMode::Lighten)), grey);
        assert_eq!(blend_pixel(white, white, opaque(BlendMode::Difference)), black);
        assert_eq!(blend_pixel(white, white, opaque(BlendMode::Exclusion)), black);
    }
    #[test]
    fn over_transparent_keeps_top() {
        let top = Color::rgba(40, 80, 120, 100);
        for mode in BlendMode::iter() {
            assert_eq!(
                blend_pixel(Color::TRANSPARENT, top, Blend::new(mode, 1.0)),
                top
            );
        }
    }
}
