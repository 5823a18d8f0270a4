//! # Patterns
//!
//! Raster tiles repeated over a fill area.

use crate::{color::Color, raster::Raster, util::clamp_unit};

#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    pub name: String,
    pub tile: Raster,
    pub tile_x: bool,
    pub tile_y: bool,
    pub scale_x: f32,
    pub scale_y: f32,
    pub opacity: f32,
}
impl Pattern {
    #[must_use]
    pub fn new(name: impl Into<String>, tile: Raster) -> Self {
        Self {
            name: name.into(),
            tile,
            tile_x: true,
            tile_y: true,
            scale_x: 1.0,
            scale_y: 1.0,
            opacity: 1.0,
        }
    }
    /// Two-color checkerboard with `size` pixel squares.
    #[must_use]
    pub fn checkerboard(name: impl Into<String>, size: u32, a: Color, b: Color) -> Self {
        let size = size.max(1);
        let mut tile = Raster::filled(size * 2, size * 2, a);
        tile.fill_rect(crate::util::Rect::from_xywh(0, 0, size, size), b);
        let offset = crate::util::to_i32_saturating(size);
        tile.fill_rect(crate::util::Rect::from_xywh(offset, offset, size, size), b);
        Self::new(name, tile)
    }
    /// A dot of diameter `size / 2` centered in a `size` tile.
    #[must_use]
    pub fn dots(name: impl Into<String>, size: u32, dot: Color, background: Color) -> Self {
        let size = size.max(1);
        let radius = size as f32 / 4.0;
        let center = size as f32 / 2.0;
        let mut tile = Raster::filled(size, size, background);
        for (x, y) in tile.bounds().positions() {
            let (dx, dy) = (x as f32 + 0.5 - center, y as f32 + 0.5 - center);
            if dx * dx + dy * dy <= radius * radius {
                tile.put(x, y, dot);
            }
        }
        Self::new(name, tile)
    }
    /// A 2 pixel line through the tile center at `degrees`.
    #[must_use]
    pub fn lines(
        name: impl Into<String>,
        size: u32,
        degrees: f32,
        line: Color,
        background: Color,
    ) -> Self {
        let size = size.max(1);
        let center = size as f32 / 2.0;
        let (sin, cos) = degrees.to_radians().sin_cos();
        let mut tile = Raster::filled(size, size, background);
        for (x, y) in tile.bounds().positions() {
            let (dx, dy) = (x as f32 + 0.5 - center, y as f32 + 0.5 - center);
            // Perpendicular distance from the line.
            if (dx * sin - dy * cos).abs() <= 1.0 {
                tile.put(x, y, line);
            }
        }
        Self::new(name, tile)
    }
    fn scale(value: f32) -> f32 {
        if value.is_finite() && value > 0.0 {
            value
        } else {
            1.0
        }
    }
    /// Color at `(x, y)` relative to where the pattern starts, with opacity applied. `None`
    /// past the tile on an axis that does not repeat.
    #[must_use]
    pub fn sample(&self, x: i32, y: i32) -> Option<Color> {
        let (width, height) = (
            crate::util::to_i32_saturating(self.tile.width()),
            crate::util::to_i32_saturating(self.tile.height()),
        );
        if width == 0 || height == 0 {
            return None;
        }
        let axis = |position: i32, scale: f32, len: i32, repeat: bool| {
            let local = crate::util::floor_to_i32(position as f32 / Self::scale(scale));
            if repeat {
                Some(local.rem_euclid(len))
            } else {
                (0..len).contains(&local).then_some(local)
            }
        };
        let tx = axis(x, self.scale_x, width, self.tile_x)?;
        let ty = axis(y, self.scale_y, height, self.tile_y)?;
        let color = self.tile.get(tx, ty)?;
        let alpha = crate::util::u8_to_unit(color.alpha()) * clamp_unit(self.opacity);
        Some(color.with_alpha(crate::util::unit_to_u8(alpha)))
    }
}

/// Named patterns, one of which may be active.
#[derive(Clone, Debug)]
pub struct PatternLibrary {
    patterns: hashbrown::HashMap<String, Pattern>,
    active: Option<String>,
}
impl Default for PatternLibrary {
    fn default() -> Self {
        Self::with_defaults()
    }
}
impl PatternLibrary {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            patterns: hashbrown::HashMap::new(),
            active: None,
        }
    }
    /// "Checkerboard" (active), "Dots" and "Lines".
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut library = Self::empty();
        library.insert(Pattern::checkerboard(
            "Checkerboard",
            32,
            Color::WHITE,
            Color::rgb(200, 200, 200),
        ));
        library.insert(Pattern::dots("Dots", 32, Color::BLACK, Color::WHITE));
        library.insert(Pattern::lines("Lines", 32, 45.0, Color::BLACK, Color::WHITE));
        library.set_active("Checkerboard");
        library
    }
    /// Add or replace by name.
    pub fn insert(&mut self, pattern: Pattern) {
        self.patterns.insert(pattern.name.clone(), pattern);
    }
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Pattern> {
        self.patterns.get_mut(name)
    }
    pub fn remove(&mut self, name: &str) -> Option<Pattern> {
        let removed = self.patterns.remove(name)?;
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        Some(removed)
    }
    pub fn set_active(&mut self, name: &str) -> bool {
        if self.patterns.contains_key(name) {
            self.active = Some(name.to_owned());
            true
        } else {
            false
        }
    }
    #[must_use]
    pub fn active(&self) -> Option<&Pattern> {
        self.patterns.get(self.active.as_deref()?)
    }
    /// Sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.patterns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn checkerboard_alternates() {
        let pattern = Pattern::checkerboard("c", 2, Color::WHITE, Color::BLACK);
        assert_eq!(pattern.tile.width(), 4);
        assert_eq!(pattern.sample(0, 0), Some(Color::BLACK));
        assert_eq!(pattern.sample(2, 0), Some(Color::WHITE));
        assert_eq!(pattern.sample(2, 2), Some(Color::BLACK));
        // Wraps in both directions.
        assert_eq!(pattern.sample(-1, 0), Some(Color::WHITE));
        assert_eq!(pattern.sample(4, 4), Some(Color::BLACK));
    }
    #[test]
    fn untiled_axis_renders_once() {
        let mut pattern = Pattern::checkerboard("c", 2, Color::WHITE, Color::BLACK);
        pattern.tile_x = false;
        assert!(pattern.sample(4, 0).is_none());
        assert!(pattern.sample(-1, 0).is_none());
        assert!(pattern.sample(3, 9).is_some());
    }
    #[test]
    fn scale_and_opacity() {
        let mut pattern = Pattern::checkerboard("c", 1, Color::WHITE, Color::BLACK);
        pattern.scale_x = 2.0;
        pattern.scale_y = 2.0;
        assert_eq!(pattern.sample(1, 1), Some(Color::BLACK));
        assert_eq!(pattern.sample(2, 0), Some(Color::WHITE));
        pattern.opacity = 0.0;
        assert_eq!(pattern.sample(0, 0).map(Color::alpha), Some(0));
    }
    #[test]
    fn defaults() {
        let library = PatternLibrary::with_defaults();
        assert_eq!(library.names(), ["Checkerboard", "Dots", "Lines"]);
        assert_eq!(library.active().map(|p| p.name.as_str()), Some("Checkerboard"));
        let dots = library.get("Dots").unwrap();
        assert_eq!(dots.sample(16, 16), Some(Color::BLACK));
        assert_eq!(dots.sample(0, 0), Some(Color::WHITE));
        let lines = library.get("Lines").unwrap();
        assert_eq!(lines.sample(16, 16), Some(Color::BLACK));
        assert_eq!(lines.sample(0, 31), Some(Color::WHITE));
    }
}
