//! # Gradients
//!
//! Color ramps defined by stops, and their placement over a rectangle.

use crate::{color::Color, util::clamp_unit, util::Rect};

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GradientStop {
    /// `[0, 1]` along the gradient.
    pub position: f32,
    pub color: Color,
    /// Multiplies the color's own alpha.
    pub opacity: f32,
}
impl GradientStop {
    /// Color with opacity folded into alpha.
    #[must_use]
    pub fn effective_color(&self) -> Color {
        let alpha = crate::util::u8_to_unit(self.color.alpha()) * clamp_unit(self.opacity);
        self.color.with_alpha(crate::util::unit_to_u8(alpha))
    }
}

#[derive(
    strum::AsRefStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum GradientKind {
    /// Along a line through the center of the rectangle, at `angle`.
    #[default]
    Linear,
    /// Outward from `center`, reaching the end at `radius`.
    Radial,
    /// Sweeping around `center`, starting at `angle`.
    Conical,
}

/// What happens outside `[0, 1]`.
#[derive(
    strum::AsRefStr,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Spread {
    #[default]
    Pad,
    Repeat,
    Reflect,
}
impl Spread {
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        if !t.is_finite() {
            return 0.0;
        }
        match self {
            Self::Pad => t.clamp(0.0, 1.0),
            Self::Repeat => t.rem_euclid(1.0),
            Self::Reflect => {
                let t = t.rem_euclid(2.0);
                if t > 1.0 {
                    2.0 - t
                } else {
                    t
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Gradient {
    pub name: String,
    /// Sorted by position.
    stops: Vec<GradientStop>,
    pub kind: GradientKind,
    /// Degrees.
    pub angle: f32,
    /// Relative to the filled rectangle.
    pub center: [f32; 2],
    /// Relative to the shorter side of the filled rectangle.
    pub radius: f32,
    pub spread: Spread,
}
impl Gradient {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stops: Vec::new(),
            kind: GradientKind::default(),
            angle: 0.0,
            center: [0.5, 0.5],
            radius: 0.5,
            spread: Spread::default(),
        }
    }
    /// Evenly spaced opaque stops.
    #[must_use]
    pub fn from_colors(name: impl Into<String>, colors: &[Color]) -> Self {
        let mut gradient = Self::new(name);
        let last = colors.len().saturating_sub(1).max(1) as f32;
        for (idx, &color) in colors.iter().enumerate() {
            gradient.add_stop(idx as f32 / last, color, 1.0);
        }
        gradient
    }
    #[must_use]
    pub fn stops(&self) -> &[GradientStop] {
        &self.stops
    }
    /// Place `stop` after any existing stops at the same position.
    fn insert(&mut self, stop: GradientStop) -> usize {
        let index = self
            .stops
            .partition_point(|existing| existing.position <= stop.position);
        self.stops.insert(index, stop);
        index
    }
    /// Position and opacity are clamped to `[0, 1]`. A stop added at the position of an existing
    /// one goes after it. Returns the index of the new stop.
    pub fn add_stop(&mut self, position: f32, color: Color, opacity: f32) -> usize {
        self.insert(GradientStop {
            position: clamp_unit(position),
            color,
            opacity: clamp_unit(opacity),
        })
    }
    pub fn remove_stop(&mut self, index: usize) -> Option<GradientStop> {
        (index < self.stops.len()).then(|| self.stops.remove(index))
    }
    /// Moves a stop, clamped to `[0, 1]`, after any other stops at its new position.
    /// Returns the stop's new index.
    pub fn move_stop(&mut self, index: usize, position: f32) -> Option<usize> {
        if index >= self.stops.len() {
            return None;
        }
        let mut stop = self.stops.remove(index);
        stop.position = clamp_unit(position);
        Some(self.insert(stop))
    }
    pub fn set_stop_color(&mut self, index: usize, color: Color) -> bool {
        self.stops
            .get_mut(index)
            .map(|stop| stop.color = color)
            .is_some()
    }
    pub fn set_stop_opacity(&mut self, index: usize, opacity: f32) -> bool {
        self.stops
            .get_mut(index)
            .map(|stop| stop.opacity = clamp_unit(opacity))
            .is_some()
    }
    /// Mirror every stop around the middle.
    pub fn reverse(&mut self) {
        for stop in &mut self.stops {
            stop.position = 1.0 - stop.position;
        }
        // Mirrored positions of ascending stops are descending.
        self.stops.reverse();
    }
    /// Same gradient under the name `"<name> (copy)"`.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            name: format!("{} (copy)", self.name),
            ..self.clone()
        }
    }
    /// Color at `t` in `[0, 1]`, interpolated between the surrounding stops. Clamps to the
    /// first and last stops, and is transparent if there are none.
    #[must_use]
    pub fn sample(&self, t: f32) -> Color {
        let t = clamp_unit(t);
        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Color::TRANSPARENT;
        };
        let next = self.stops.partition_point(|stop| stop.position <= t);
        if next == 0 {
            return first.effective_color();
        }
        if next == self.stops.len() {
            return last.effective_color();
        }
        let (before, after) = (&self.stops[next - 1], &self.stops[next]);
        let local = (t - before.position) / (after.position - before.position);
        before
            .effective_color()
            .lerp(after.effective_color(), local)
    }
    /// `steps` evenly spaced samples from 0 to 1 inclusive.
    #[must_use]
    pub fn colors(&self, steps: usize) -> Vec<Color> {
        match steps {
            0 => Vec::new(),
            1 => vec![self.sample(0.0)],
            _ => (0..steps)
                .map(|idx| self.sample(idx as f32 / (steps - 1) as f32))
                .collect(),
        }
    }
    /// Gradient parameter at a canvas point when filling `rect`, before spread.
    #[must_use]
    pub fn parameter(&self, rect: Rect, x: f32, y: f32) -> f32 {
        let (width, height) = (rect.width() as f32, rect.height() as f32);
        match self.kind {
            GradientKind::Linear => {
                let (sin, cos) = self.angle.to_radians().sin_cos();
                let center = [
                    rect.left as f32 + width / 2.0,
                    rect.top as f32 + height / 2.0,
                ];
                // Projection of the rectangle onto the gradient direction.
                let extent = (width * cos).abs() + (height * sin).abs();
                if extent <= 0.0 {
                    return 0.0;
                }
                ((x - center[0]) * cos + (y - center[1]) * sin) / extent + 0.5
            }
            GradientKind::Radial => {
                let center = self.absolute_center(rect);
                let radius = width.min(height) * self.radius;
                if radius <= 0.0 {
                    return 1.0;
                }
                (x - center[0]).hypot(y - center[1]) / radius
            }
            GradientKind::Conical => {
                let center = self.absolute_center(rect);
                let degrees = (y - center[1]).atan2(x - center[0]).to_degrees() - self.angle;
                degrees.rem_euclid(360.0) / 360.0
            }
        }
    }
    fn absolute_center(&self, rect: Rect) -> [f32; 2] {
        [
            rect.left as f32 + rect.width() as f32 * self.center[0],
            rect.top as f32 + rect.height() as f32 * self.center[1],
        ]
    }
    /// Color of the pixel `(x, y)` when filling `rect`.
    #[must_use]
    pub fn color_at(&self, rect: Rect, x: i32, y: i32) -> Color {
        let t = self.parameter(rect, x as f32 + 0.5, y as f32 + 0.5);
        self.sample(self.spread.apply(t))
    }
}

/// Named gradients, one of which may be active.
#[derive(Clone, Debug)]
pub struct GradientLibrary {
    gradients: hashbrown::HashMap<String, Gradient>,
    active: Option<String>,
}
impl Default for GradientLibrary {
    fn default() -> Self {
        Self::with_defaults()
    }
}
impl GradientLibrary {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            gradients: hashbrown::HashMap::new(),
            active: None,
        }
    }
    /// "Black to White" (active), "Rainbow" and "Sunset".
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut library = Self::empty();
        library.insert(Gradient::from_colors(
            "Black to White",
            &[Color::BLACK, Color::WHITE],
        ));
        library.insert(Gradient::from_colors(
            "Rainbow",
            &[
                Color::rgb(255, 0, 0),
                Color::rgb(255, 255, 0),
                Color::rgb(0, 255, 0),
                Color::rgb(0, 255, 255),
                Color::rgb(0, 0, 255),
                Color::rgb(255, 0, 255),
            ],
        ));
        library.insert(Gradient::from_colors(
            "Sunset",
            &[
                Color::rgb(255, 165, 0),
                Color::rgb(255, 0, 128),
                Color::rgb(128, 0, 255),
            ],
        ));
        library.set_active("Black to White");
        library
    }
    /// Add or replace by name.
    pub fn insert(&mut self, gradient: Gradient) {
        self.gradients.insert(gradient.name.clone(), gradient);
    }
    /// Create an empty gradient, replacing any of the same name.
    pub fn create(&mut self, name: &str) -> &mut Gradient {
        self.gradients
            .entry(name.to_owned())
            .insert(Gradient::new(name))
            .into_mut()
    }
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Gradient> {
        self.gradients.get(name)
    }
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Gradient> {
        self.gradients.get_mut(name)
    }
    /// Removing the active gradient leaves none active.
    pub fn remove(&mut self, name: &str) -> Option<Gradient> {
        let removed = self.gradients.remove(name)?;
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        Some(removed)
    }
    pub fn set_active(&mut self, name: &str) -> bool {
        if self.gradients.contains_key(name) {
            self.active = Some(name.to_owned());
            true
        } else {
            false
        }
    }
    #[must_use]
    pub fn active(&self) -> Option<&Gradient> {
        self.gradients.get(self.active.as_deref()?)
    }
    /// Sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.gradients.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn stops_hit_exactly() {
        let library = GradientLibrary::with_defaults();
        let rainbow = library.get("Rainbow").unwrap();
        for stop in rainbow.stops() {
            assert_eq!(rainbow.sample(stop.position), stop.color);
        }
        assert_eq!(library.active().map(|g| g.name.as_str()), Some("Black to White"));
    }
    #[test]
    fn sample_clamps_and_interpolates() {
        let mut gradient = Gradient::new("test");
        assert_eq!(gradient.sample(0.5), Color::TRANSPARENT);
        gradient.add_stop(0.25, Color::BLACK, 1.0);
        gradient.add_stop(0.75, Color::WHITE, 0.0);
        assert_eq!(gradient.sample(0.0), Color::BLACK);
        assert_eq!(gradient.sample(1.0), Color::WHITE.with_alpha(0));
        assert_eq!(gradient.sample(0.5), Color::rgba(128, 128, 128, 128));
    }
    #[test]
    fn stop_edits() {
        let mut gradient = Gradient::from_colors("test", &[Color::BLACK, Color::WHITE]);
        assert_eq!(gradient.move_stop(0, 2.0), Some(1));
        assert_eq!(gradient.stops()[1].color, Color::BLACK);
        assert_eq!(gradient.stops()[1].position, 1.0);
        assert_eq!(gradient.stops()[0].color, Color::WHITE);
        assert_eq!(gradient.move_stop(9, 0.5), None);
        // Ties go after existing stops.
        assert_eq!(gradient.add_stop(1.0, Color::rgb(255, 0, 0), 1.0), 2);
        assert_eq!(gradient.move_stop(0, 1.0), Some(2));
        let colors: Vec<_> = gradient.stops().iter().map(|stop| stop.color).collect();
        assert_eq!(colors, [Color::BLACK, Color::rgb(255, 0, 0), Color::WHITE]);
        assert!(gradient.remove_stop(2).is_some());
        assert!(gradient.set_stop_opacity(0, -1.0));
        assert_eq!(gradient.stops()[0].opacity, 0.0);
        assert!(!gradient.set_stop_color(5, Color::BLACK));
        assert!(gradient.remove_stop(5).is_none());
        assert!(gradient.remove_stop(0).is_some());
        assert_eq!(gradient.stops().len(), 1);
    }
    #[test]
    fn reverse_and_duplicate() {
        let mut gradient = Gradient::from_colors("g", &[Color::BLACK, Color::WHITE]);
        gradient.reverse();
        assert_eq!(gradient.sample(0.0), Color::WHITE);
        assert_eq!(gradient.sample(1.0), Color::BLACK);
        let copy = gradient.duplicate();
        assert_eq!(copy.name, "g (copy)");
        assert_eq!(copy.stops(), gradient.stops());
    }
    #[test]
    fn lookup_table() {
        let gradient = Gradient::from_colors("g", &[Color::BLACK, Color::WHITE]);
        let colors = gradient.colors(3);
        assert_eq!(colors, [Color::BLACK, Color::rgb(128, 128, 128), Color::WHITE]);
        assert!(gradient.colors(0).is_empty());
    }
    #[test]
    fn spreads() {
        assert_eq!(Spread::Pad.apply(1.5), 1.0);
        assert!((Spread::Repeat.apply(1.25) - 0.25).abs() < 1e-6);
        assert!((Spread::Reflect.apply(1.25) - 0.75).abs() < 1e-6);
        assert!((Spread::Reflect.apply(-0.25) - 0.25).abs() < 1e-6);
    }
    #[test]
    fn linear_spans_rect() {
        let gradient = Gradient::from_colors("g", &[Color::BLACK, Color::WHITE]);
        let rect = Rect::from_xywh(10, 0, 100, 10);
        assert!(gradient.parameter(rect, 10.0, 5.0).abs() < 1e-6);
        assert!((gradient.parameter(rect, 110.0, 5.0) - 1.0).abs() < 1e-6);
        assert_eq!(gradient.color_at(rect, 10, 5), Color::rgb(1, 1, 1));
    }
    #[test]
    fn library_management() {
        let mut library = GradientLibrary::with_defaults();
        assert_eq!(library.names(), ["Black to White", "Rainbow", "Sunset"]);
        library.create("Mine").add_stop(0.0, Color::BLACK, 1.0);
        assert_eq!(library.get("Mine").unwrap().stops().len(), 1);
        assert!(library.remove("Black to White").is_some());
        assert!(library.active().is_none());
        assert!(!library.set_active("Nope"));
    }
}
