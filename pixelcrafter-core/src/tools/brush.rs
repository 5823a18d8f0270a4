//! Brush, eraser and named brush presets.
//!
//! A stroke is a polyline of points, stamped with elliptical dabs every `spacing * size` pixels.
//! The dabs of one stroke are combined into a single coverage map before touching the layer, so
//! overlapping dabs don't build up within a stroke.

use super::{active_layer, paint_active, ToolError};
use crate::{
    blend::{blend_pixel, Blend, BlendMode},
    color::Color,
    history::writer::DocumentWriter,
    util::{clamp_unit, floor_to_i32, to_channel, Rect},
};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BrushSettings {
    /// Diameter, in pixels.
    pub size: f32,
    /// Fraction of the radius that is fully opaque.
    pub hardness: f32,
    pub opacity: f32,
    pub color: Color,
    /// Distance between dabs as a fraction of the size.
    pub spacing: f32,
    /// Degrees clockwise of the dab's long axis.
    pub angle: f32,
    /// Short axis over long axis of the dab.
    pub roundness: f32,
}
impl Default for BrushSettings {
    fn default() -> Self {
        Self {
            size: 10.0,
            hardness: 0.8,
            opacity: 1.0,
            color: Color::BLACK,
            spacing: 0.25,
            angle: 0.0,
            roundness: 1.0,
        }
    }
}
impl BrushSettings {
    #[must_use]
    pub fn radius(&self) -> f32 {
        if self.size.is_finite() {
            self.size.max(1.0) / 2.0
        } else {
            0.5
        }
    }
    /// Coverage of a dab at `distance` from its center: full inside `radius * hardness`,
    /// falling linearly to zero at the radius.
    #[must_use]
    pub fn falloff(&self, distance: f32) -> f32 {
        let radius = self.radius();
        if distance.is_nan() || distance >= radius {
            return 0.0;
        }
        let hard = radius * clamp_unit(self.hardness);
        if distance <= hard {
            1.0
        } else {
            (radius - distance) / (radius - hard)
        }
    }
    /// Distance of `offset` from a dab center, stretched across the short axis so the dab edge
    /// lies at the radius.
    fn dab_distance(&self, offset: [f32; 2]) -> f32 {
        let roundness = if self.roundness.is_finite() {
            self.roundness.clamp(0.01, 1.0)
        } else {
            1.0
        };
        if roundness == 1.0 {
            return offset[0].hypot(offset[1]);
        }
        let (sin, cos) = self.angle.to_radians().sin_cos();
        let along = offset[0] * cos + offset[1] * sin;
        let across = offset[1] * cos - offset[0] * sin;
        along.hypot(across / roundness)
    }
    /// Dab centers along the polyline, starting at its first point, keeping only the dabs that
    /// reach into `clip`. Spacing is measured along the whole polyline. Non-finite points are
    /// skipped.
    #[must_use]
    pub fn dabs(&self, points: &[[f32; 2]], clip: Rect) -> Vec<[f32; 2]> {
        let step = f64::from((self.radius() * 2.0 * self.spacing).max(0.5));
        let step = if step.is_finite() { step } else { 0.5 };
        // Dab centers further than this from `clip` can't touch it.
        let reach = f64::from(self.radius()) + 1.0;
        let min = [f64::from(clip.left) - reach, f64::from(clip.top) - reach];
        let max = [f64::from(clip.right) + reach, f64::from(clip.bottom) + reach];
        let inside = |point: [f64; 2]| {
            (0..2).all(|axis| point[axis] >= min[axis] && point[axis] <= max[axis])
        };

        let mut points = points
            .iter()
            .filter(|point| point.iter().all(|v| v.is_finite()))
            .map(|&[x, y]| [f64::from(x), f64::from(y)]);
        let Some(first) = points.next() else {
            return Vec::new();
        };
        let mut dabs = Vec::new();
        if inside(first) {
            dabs.push(first);
        }
        // Distance travelled since the last dab.
        let mut carry = 0.0;
        let mut from = first;
        for to in points {
            let delta = [to[0] - from[0], to[1] - from[1]];
            let length = delta[0].hypot(delta[1]);
            if length > 0.0 {
                // Dabs fall at `first_along + k * step` along this segment.
                let first_along = step - carry;
                if let Some((start, end)) = clip_segment(from, delta, min, max) {
                    let lowest = ((start * length - first_along) / step).ceil().max(0.0);
                    let mut along = first_along + lowest * step;
                    while along <= (end * length).min(length) {
                        let t = along / length;
                        dabs.push([from[0] + delta[0] * t, from[1] + delta[1] * t]);
                        along += step;
                    }
                }
                carry = if length >= first_along {
                    let last = ((length - first_along) / step).floor();
                    length - (first_along + last * step)
                } else {
                    carry + length
                };
            }
            from = to;
        }
        dabs.into_iter()
            .map(|[x, y]| [x as f32, y as f32])
            .collect()
    }
    /// Coverage of a whole stroke within `clip`, as the area it touches and a row-major map over
    /// that area.
    fn coverage(&self, points: &[[f32; 2]], clip: Rect) -> Option<(Rect, Vec<f32>)> {
        let dabs = self.dabs(points, clip);
        let radius = self.radius();
        let reach = |center: [f32; 2]| {
            Rect::from_corners(
                [
                    floor_to_i32(center[0] - radius),
                    floor_to_i32(center[1] - radius),
                ],
                [
                    floor_to_i32(center[0] + radius).saturating_add(1),
                    floor_to_i32(center[1] + radius).saturating_add(1),
                ],
            )
            .intersect(&clip)
        };
        let rect = dabs
            .iter()
            .filter_map(|&dab| reach(dab))
            .reduce(|a, b| a.union(&b))?;
        let width = rect.width() as usize;
        let mut coverage = vec![0.0f32; width * rect.height() as usize];
        for &dab in &dabs {
            let Some(area) = reach(dab) else {
                continue;
            };
            for (x, y) in area.positions() {
                let distance = self.dab_distance([x as f32 + 0.5 - dab[0], y as f32 + 0.5 - dab[1]]);
                let value = self.falloff(distance);
                let idx = (y - rect.top) as usize * width + (x - rect.left) as usize;
                if let Some(cell) = coverage.get_mut(idx) {
                    *cell = cell.max(value);
                }
            }
        }
        Some((rect, coverage))
    }
}

/// Range of `t` in `[0, 1]` for which `from + t * delta` lies within `[min, max]`.
fn clip_segment(from: [f64; 2], delta: [f64; 2], min: [f64; 2], max: [f64; 2]) -> Option<(f64, f64)> {
    let (mut start, mut end) = (0.0f64, 1.0f64);
    for axis in 0..2 {
        if delta[axis] == 0.0 {
            if from[axis] < min[axis] || from[axis] > max[axis] {
                return None;
            }
        } else {
            let a = (min[axis] - from[axis]) / delta[axis];
            let b = (max[axis] - from[axis]) / delta[axis];
            start = start.max(a.min(b));
            end = end.min(a.max(b));
        }
    }
    (start <= end).then_some((start, end))
}

/// Bounds of the active layer, where a stroke can land.
fn active_bounds(writer: &DocumentWriter<'_>) -> Result<Rect, ToolError> {
    let index = active_layer(writer)?;
    writer
        .state()
        .layers()
        .get(index)
        .map(|layer| layer.image().bounds())
        .ok_or(ToolError::NoActiveLayer)
}

/// Look up a coverage map produced by [`BrushSettings::coverage`].
fn covered(rect: Rect, coverage: &[f32], x: i32, y: i32) -> f32 {
    if !rect.contains(x, y) {
        return 0.0;
    }
    let idx = (y - rect.top) as usize * rect.width() as usize + (x - rect.left) as usize;
    coverage.get(idx).copied().unwrap_or(0.0)
}

/// Paint a stroke along `points` onto the active layer.
pub fn stroke(
    writer: &mut DocumentWriter<'_>,
    settings: &BrushSettings,
    points: &[[f32; 2]],
) -> Result<bool, ToolError> {
    let Some((rect, coverage)) = settings.coverage(points, active_bounds(writer)?) else {
        return Ok(false);
    };
    let opacity = clamp_unit(settings.opacity);
    paint_active(writer, rect, |x, y, pixel| {
        let amount = covered(rect, &coverage, x, y) * opacity;
        (amount > 0.0)
            .then(|| blend_pixel(pixel, settings.color, Blend::new(BlendMode::Normal, amount)))
    })
}

/// Reduce alpha along `points` on the active layer. The brush color is ignored.
pub fn erase(
    writer: &mut DocumentWriter<'_>,
    settings: &BrushSettings,
    points: &[[f32; 2]],
) -> Result<bool, ToolError> {
    let Some((rect, coverage)) = settings.coverage(points, active_bounds(writer)?) else {
        return Ok(false);
    };
    let opacity = clamp_unit(settings.opacity);
    paint_active(writer, rect, |x, y, pixel| {
        let amount = covered(rect, &coverage, x, y) * opacity;
        (amount > 0.0).then(|| {
            let alpha = f32::from(pixel.alpha()) * (1.0 - amount);
            pixel.with_alpha(to_channel(alpha))
        })
    })
}

/// Named brush presets, one of which may be active.
#[derive(Clone, Debug)]
pub struct BrushLibrary {
    brushes: hashbrown::HashMap<String, BrushSettings>,
    active: Option<String>,
}
impl Default for BrushLibrary {
    fn default() -> Self {
        Self::with_defaults()
    }
}
impl BrushLibrary {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            brushes: hashbrown::HashMap::new(),
            active: None,
        }
    }
    /// "Round" (active), "Soft" and "Hard", all black.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut library = Self::empty();
        library.insert("Round", BrushSettings::default());
        library.insert(
            "Soft",
            BrushSettings {
                size: 15.0,
                hardness: 0.3,
                opacity: 0.8,
                ..Default::default()
            },
        );
        library.insert(
            "Hard",
            BrushSettings {
                size: 8.0,
                hardness: 1.0,
                ..Default::default()
            },
        );
        library.set_active("Round");
        library
    }
    /// Add or replace by name.
    pub fn insert(&mut self, name: impl Into<String>, settings: BrushSettings) {
        self.brushes.insert(name.into(), settings);
    }
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&BrushSettings> {
        self.brushes.get(name)
    }
    pub fn get_mut(&mut self, name: &str) -> Option<&mut BrushSettings> {
        self.brushes.get_mut(name)
    }
    pub fn remove(&mut self, name: &str) -> Option<BrushSettings> {
        let removed = self.brushes.remove(name)?;
        if self.active.as_deref() == Some(name) {
            self.active = None;
        }
        Some(removed)
    }
    pub fn set_active(&mut self, name: &str) -> bool {
        if self.brushes.contains_key(name) {
            self.active = Some(name.to_owned());
            true
        } else {
            false
        }
    }
    #[must_use]
    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }
    #[must_use]
    pub fn active(&self) -> Option<&BrushSettings> {
        self.brushes.get(self.active.as_deref()?)
    }
    /// Sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.brushes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::{selection::Region, Document};

    fn document() -> Document {
        let mut document = Document::new("test", 32, 32);
        document.add_layer("ink");
        document
    }
    #[test]
    fn falloff_shape() {
        let settings = BrushSettings {
            size: 10.0,
            hardness: 0.5,
            ..Default::default()
        };
        assert_eq!(settings.falloff(0.0), 1.0);
        assert_eq!(settings.falloff(2.5), 1.0);
        assert!((settings.falloff(3.75) - 0.5).abs() < 1e-6);
        assert_eq!(settings.falloff(5.0), 0.0);
        assert_eq!(settings.falloff(f32::NAN), 0.0);
    }
    #[test]
    fn flattened_dabs() {
        let settings = BrushSettings {
            size: 10.0,
            hardness: 1.0,
            roundness: 0.5,
            ..Default::default()
        };
        // Long axis along X, short axis half as long.
        assert_eq!(settings.falloff(settings.dab_distance([4.0, 0.0])), 1.0);
        assert_eq!(settings.falloff(settings.dab_distance([0.0, 3.0])), 0.0);
        assert_eq!(settings.falloff(settings.dab_distance([0.0, 2.0])), 1.0);
        let turned = BrushSettings {
            angle: 90.0,
            ..settings
        };
        assert_eq!(turned.falloff(turned.dab_distance([0.0, 4.0])), 1.0);
        assert_eq!(turned.falloff(turned.dab_distance([3.0, 0.0])), 0.0);
    }
    #[test]
    fn library_defaults() {
        let mut library = BrushLibrary::with_defaults();
        assert_eq!(library.names(), ["Hard", "Round", "Soft"]);
        assert_eq!(library.active(), Some(&BrushSettings::default()));
        let soft = library.get("Soft").unwrap();
        assert_eq!((soft.size, soft.hardness, soft.opacity), (15.0, 0.3, 0.8));
        assert_eq!(library.get("Hard").map(|hard| hard.hardness), Some(1.0));

        library.get_mut("Hard").unwrap().size = 20.0;
        assert!(library.set_active("Hard"));
        assert_eq!(library.active().map(|hard| hard.size), Some(20.0));
        assert!(!library.set_active("Missing"));
        assert_eq!(library.active_name(), Some("Hard"));
        assert!(library.remove("Hard").is_some());
        assert!(library.active().is_none());
        assert!(library.remove("Hard").is_none());
    }
    #[test]
    fn dabs_evenly_spaced() {
        let settings = BrushSettings {
            size: 8.0,
            spacing: 0.5,
            ..Default::default()
        };
        // Step of 4 pixels, carried across segments.
        let clip = Rect::canvas(100, 100);
        let dabs = settings.dabs(&[[0.0, 0.0], [6.0, 0.0], [12.0, 0.0]], clip);
        assert_eq!(dabs.len(), 4);
        for (dab, expected) in dabs.iter().zip([0.0, 4.0, 8.0, 12.0]) {
            assert!((dab[0] - expected).abs() < 1e-4);
            assert_eq!(dab[1], 0.0);
        }
        assert!(settings.dabs(&[], clip).is_empty());
        assert_eq!(settings.dabs(&[[1.0, 1.0]], clip).len(), 1);
    }
    #[test]
    fn dabs_keep_spacing_when_clipped() {
        let settings = BrushSettings {
            size: 8.0,
            spacing: 0.5,
            ..Default::default()
        };
        // Reach of 5 around a 10x10 clip; the line enters at x = -5 and leaves at x = 15.
        let dabs = settings.dabs(&[[-40.0, 2.0], [40.0, 2.0]], Rect::canvas(10, 10));
        let xs: Vec<f32> = dabs.iter().map(|dab| dab[0]).collect();
        assert_eq!(xs, [-4.0, 0.0, 4.0, 8.0, 12.0]);
        assert!(settings
            .dabs(&[[-40.0, 50.0], [40.0, 50.0]], Rect::canvas(10, 10))
            .is_empty());
    }
    #[test]
    fn strokes_leaving_the_canvas() {
        let mut document = document();
        let changed = document
            .write_with("Brush", |writer| {
                stroke(
                    writer,
                    &BrushSettings::default(),
                    &[[-1.0e9, -1.0e9], [16.0, 16.0]],
                )
            })
            .unwrap();
        assert!(changed);
        let image = document.layers().active().unwrap().image();
        assert_eq!(image.get(16, 16), Some(Color::BLACK));
        assert_eq!(image.get(0, 0), Some(Color::BLACK));
        assert_eq!(image.get(31, 0), Some(Color::TRANSPARENT));

        let changed = document
            .write_with("Brush", |writer| {
                stroke(writer, &BrushSettings::default(), &[[-500.0, 0.0], [-100.0, 0.0]])
            })
            .unwrap();
        assert!(!changed);
    }
    #[test]
    fn stroke_is_one_entry() {
        let mut document = document();
        let settings = BrushSettings {
            color: Color::rgb(255, 0, 0),
            hardness: 1.0,
            ..Default::default()
        };
        let before = document.history().len();
        let changed = document
            .write_with("Brush", |writer| {
                stroke(writer, &settings, &[[5.0, 5.0], [25.0, 5.0]])
            })
            .unwrap();
        assert!(changed);
        assert_eq!(document.history().len(), before + 1);
        let image = document.layers().active().unwrap().image();
        assert_eq!(image.get(15, 5), Some(Color::rgb(255, 0, 0)));
        assert_eq!(image.get(15, 20), Some(Color::TRANSPARENT));

        document.undo().unwrap();
        let image = document.layers().active().unwrap().image();
        assert_eq!(image.get(15, 5), Some(Color::TRANSPARENT));
    }
    #[test]
    fn overlapping_dabs_do_not_build_up() {
        let mut document = document();
        let settings = BrushSettings {
            opacity: 0.5,
            hardness: 1.0,
            spacing: 0.1,
            ..Default::default()
        };
        document.write_with("Brush", |writer| {
            stroke(writer, &settings, &[[10.0, 10.0], [20.0, 10.0]]).unwrap();
        });
        let image = document.layers().active().unwrap().image();
        assert_eq!(image.get(15, 10).map(Color::alpha), Some(128));
    }
    #[test]
    fn outside_selection_untouched() {
        let mut document = document();
        document.write_with("Select", |writer| {
            writer
                .selection()
                .apply_region(&Region::Rect(Rect::from_xywh(0, 0, 16, 32)));
        });
        document.write_with("Brush", |writer| {
            stroke(writer, &BrushSettings::default(), &[[4.0, 8.0], [28.0, 8.0]]).unwrap();
        });
        let image = document.layers().active().unwrap().image();
        assert_eq!(image.get(8, 8), Some(Color::BLACK));
        assert!(image
            .crop(Rect::from_xywh(16, 0, 16, 32))
            .pixels()
            .iter()
            .all(|&pixel| pixel == Color::TRANSPARENT));
    }
    #[test]
    fn erase_clears_alpha() {
        let mut document = document();
        document.write_with("Fill", |writer| {
            super::super::fill::fill_rect(writer, Rect::canvas(32, 32), Color::WHITE).unwrap();
        });
        let settings = BrushSettings {
            hardness: 1.0,
            ..Default::default()
        };
        document.write_with("Erase", |writer| {
            erase(writer, &settings, &[[16.0, 16.0]]).unwrap();
        });
        let image = document.layers().active().unwrap().image();
        assert_eq!(image.get(16, 16).map(Color::alpha), Some(0));
        assert_eq!(image.get(0, 0), Some(Color::WHITE));
    }
}
