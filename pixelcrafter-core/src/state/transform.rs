//! # Transform
//!
//! Affine transforms of whole layer images: scale, rotation, skew and translation about a pivot.
//! Applying one resamples the image, see [`Transformer::apply`]. The recorded form is
//! [`LayerWriter::transform`](super::layers::writer::LayerWriter::transform).

use crate::{
    color::Color,
    raster::{Raster, RasterError},
    util::{floor_to_i32, Rect},
};

/// An arbitrary affine transform. Units are pixels, 0,0 is top left, +X right, +Y down.
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable, PartialEq, PartialOrd)]
#[repr(C)]
pub struct Matrix {
    /// Column-major matrix elements
    pub elements: [[f32; 2]; 3],
}

impl Default for Matrix {
    fn default() -> Self {
        Self {
            elements: [[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
        }
    }
}

impl From<[[f32; 2]; 3]> for Matrix {
    fn from(elements: [[f32; 2]; 3]) -> Self {
        Self { elements }
    }
}

impl Matrix {
    #[must_use]
    pub fn translation(x: f32, y: f32) -> Self {
        Self {
            elements: [[1.0, 0.0], [0.0, 1.0], [x, y]],
        }
    }
    /// Rotation by `degrees` clockwise, as seen with +Y down.
    #[must_use]
    pub fn rotation(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            elements: [[cos, sin], [-sin, cos], [0.0, 0.0]],
        }
    }
    #[must_use]
    pub fn scaling(x: f32, y: f32) -> Self {
        Self {
            elements: [[x, 0.0], [0.0, y], [0.0, 0.0]],
        }
    }
    /// `x += horizontal * y`, `y += vertical * x`.
    #[must_use]
    pub fn shear(horizontal: f32, vertical: f32) -> Self {
        Self {
            elements: [[1.0, vertical], [horizontal, 1.0], [0.0, 0.0]],
        }
    }
    fn apply_linear(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        let [a, b, _] = self.elements;
        [a[0] * x + b[0] * y, a[1] * x + b[1] * y]
    }
    #[must_use]
    pub fn apply(&self, point: [f32; 2]) -> [f32; 2] {
        let [x, y] = self.apply_linear(point);
        let [tx, ty] = self.elements[2];
        [x + tx, y + ty]
    }
    /// `None` if the transform collapses the plane onto a line or point.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let [[a, b], [c, d], [tx, ty]] = self.elements;
        let det = a * d - b * c;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inverse = Self {
            elements: [
                [d / det, -b / det],
                [-c / det, a / det],
                [(c * ty - d * tx) / det, (b * tx - a * ty) / det],
            ],
        };
        inverse
            .elements
            .iter()
            .flatten()
            .all(|v| v.is_finite())
            .then_some(inverse)
    }
    /// Smallest pixel rect holding the image of `rect`. `None` if that is not finite.
    #[must_use]
    pub fn map_rect(&self, rect: Rect) -> Option<Rect> {
        let (left, top, right, bottom) = (
            rect.left as f32,
            rect.top as f32,
            rect.right as f32,
            rect.bottom as f32,
        );
        let corners = [[left, top], [right, top], [left, bottom], [right, bottom]]
            .map(|corner| self.apply(corner));
        let mut min = [f32::INFINITY; 2];
        let mut max = [f32::NEG_INFINITY; 2];
        for corner in corners {
            for axis in 0..2 {
                min[axis] = min[axis].min(corner[axis]);
                max[axis] = max[axis].max(corner[axis]);
            }
        }
        if !min.iter().chain(&max).all(|v| v.is_finite()) {
            return None;
        }
        Some(Rect::from_corners(
            [floor_to_i32(min[0]), floor_to_i32(min[1])],
            [floor_to_i32(max[0].ceil()), floor_to_i32(max[1].ceil())],
        ))
    }
}

/// `self * rhs` applies `rhs` first.
impl std::ops::Mul for Matrix {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let [x, y, translation] = rhs.elements;
        Self {
            elements: [
                self.apply_linear(x),
                self.apply_linear(y),
                self.apply(translation),
            ],
        }
    }
}

/// Shear, then scale, then rotation, then translation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Transform {
    pub scale: [f32; 2],
    /// Degrees clockwise.
    pub rotation: f32,
    pub skew: [f32; 2],
    pub translation: [f32; 2],
}
impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: [1.0; 2],
            rotation: 0.0,
            skew: [0.0; 2],
            translation: [0.0; 2],
        }
    }
}
impl Transform {
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
impl From<Transform> for Matrix {
    fn from(value: Transform) -> Self {
        let [tx, ty] = value.translation;
        let [sx, sy] = value.scale;
        let [kx, ky] = value.skew;
        Matrix::translation(tx, ty)
            * Matrix::rotation(value.rotation)
            * Matrix::scaling(sx, sy)
            * Matrix::shear(kx, ky)
    }
}

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, strum::AsRefStr, strum::EnumString, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum TransformMode {
    #[default]
    Free,
    /// Scaling keeps the aspect ratio, using the smaller of the two factors on both axes.
    Constrained,
}

/// Size of a transformed image.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Fit {
    /// Same size as the source. Whatever lands outside is cut off.
    #[default]
    Keep,
    /// Grown right and down as far as needed to hold the result. Images never shrink, and
    /// whatever lands left of or above the origin is cut off.
    Grow,
}

/// An accumulated [`Transform`], applied about a pivot point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transformer {
    transform: Transform,
    pivot: [f32; 2],
    mode: TransformMode,
}
impl Transformer {
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }
    #[must_use]
    pub fn pivot(&self) -> [f32; 2] {
        self.pivot
    }
    pub fn set_pivot(&mut self, x: f32, y: f32) {
        self.pivot = [x, y];
    }
    #[must_use]
    pub fn mode(&self) -> TransformMode {
        self.mode
    }
    pub fn set_mode(&mut self, mode: TransformMode) {
        self.mode = mode;
    }
    /// Multiply the current scale.
    pub fn scale(&mut self, x: f32, y: f32) {
        let [x, y] = match self.mode {
            TransformMode::Free => [x, y],
            TransformMode::Constrained => [x.min(y); 2],
        };
        self.transform.scale[0] *= x;
        self.transform.scale[1] *= y;
    }
    pub fn rotate(&mut self, degrees: f32) {
        self.transform.rotation += degrees;
    }
    pub fn skew(&mut self, x: f32, y: f32) {
        self.transform.skew[0] += x;
        self.transform.skew[1] += y;
    }
    pub fn translate(&mut self, x: f32, y: f32) {
        self.transform.translation[0] += x;
        self.transform.translation[1] += y;
    }
    /// Back to identity. Pivot and mode are kept.
    pub fn reset(&mut self) {
        self.transform.reset();
    }
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.transform.is_identity()
    }
    /// The transform, about the pivot.
    #[must_use]
    pub fn matrix(&self) -> Matrix {
        let [px, py] = self.pivot;
        Matrix::translation(px, py) * Matrix::from(self.transform) * Matrix::translation(-px, -py)
    }
    /// Where `rect` ends up.
    #[must_use]
    pub fn bounds(&self, rect: Rect) -> Option<Rect> {
        self.matrix().map_rect(rect)
    }
    /// Resample `image` through the transform, with bilinear filtering. Uncovered pixels are
    /// transparent, and a degenerate transform leaves nothing at all.
    pub fn apply(&self, image: &Raster, fit: Fit) -> Result<Raster, RasterError> {
        let matrix = self.matrix();
        let (width, height) = match (fit, matrix.map_rect(image.bounds())) {
            (Fit::Grow, Some(bounds)) => (
                image.width().max(u32::try_from(bounds.right).unwrap_or(0)),
                image.height().max(u32::try_from(bounds.bottom).unwrap_or(0)),
            ),
            _ => (image.width(), image.height()),
        };
        let mut output = Raster::try_new(width, height)?;
        let Some(inverse) = matrix.inverse() else {
            return Ok(output);
        };
        for (x, y) in output.bounds().positions() {
            let [sx, sy] = inverse.apply([x as f32 + 0.5, y as f32 + 0.5]);
            let color = sample(image, sx - 0.5, sy - 0.5);
            output.put(x, y, color);
        }
        Ok(output)
    }
}

/// Bilinear sample between pixel centers, in premultiplied space so transparent neighbors
/// don't bleed their color.
fn sample(image: &Raster, x: f32, y: f32) -> Color {
    let (left, top) = (floor_to_i32(x), floor_to_i32(y));
    let (fx, fy) = (x - x.floor(), y - y.floor());
    let mut sum = [0.0f32; 4];
    for (dx, dy, weight) in [
        (0, 0, (1.0 - fx) * (1.0 - fy)),
        (1, 0, fx * (1.0 - fy)),
        (0, 1, (1.0 - fx) * fy),
        (1, 1, fx * fy),
    ] {
        if weight <= 0.0 {
            continue;
        }
        let Some(color) = image.get(left.saturating_add(dx), top.saturating_add(dy)) else {
            continue;
        };
        let [r, g, b, a] = color.to_unit();
        let weight = weight * a;
        sum[0] += r * weight;
        sum[1] += g * weight;
        sum[2] += b * weight;
        sum[3] += weight;
    }
    let alpha = sum[3];
    if alpha <= 0.0 || !alpha.is_finite() {
        return Color::TRANSPARENT;
    }
    Color::from_unit([sum[0] / alpha, sum[1] / alpha, sum[2] / alpha, alpha])
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: [f32; 2], b: [f32; 2]) -> bool {
        (a[0] - b[0]).abs() < 1e-4 && (a[1] - b[1]).abs() < 1e-4
    }
    #[test]
    fn matrix_order() {
        // Rotated first, then moved.
        let transform = Transform {
            rotation: 90.0,
            translation: [10.0, 0.0],
            ..Default::default()
        };
        assert!(close(Matrix::from(transform).apply([1.0, 0.0]), [10.0, 1.0]));
        let skewed = Transform {
            skew: [1.0, 0.0],
            scale: [2.0, 1.0],
            ..Default::default()
        };
        // Sheared to (1, 1), then scaled.
        assert!(close(Matrix::from(skewed).apply([0.0, 1.0]), [2.0, 1.0]));
        assert_eq!(Matrix::from(Transform::default()), Matrix::default());
    }
    #[test]
    fn inverse() {
        let matrix = Matrix::translation(3.0, -2.0) * Matrix::rotation(30.0) * Matrix::scaling(2.0, 0.5);
        let inverse = matrix.inverse().unwrap();
        let point = [7.0, -1.5];
        assert!(close(inverse.apply(matrix.apply(point)), point));
        assert!(Matrix::scaling(0.0, 1.0).inverse().is_none());
    }
    #[test]
    fn accumulates() {
        let mut transformer = Transformer::default();
        assert!(transformer.is_identity());
        transformer.scale(2.0, 3.0);
        transformer.scale(2.0, 1.0);
        transformer.rotate(10.0);
        transformer.rotate(5.0);
        transformer.skew(0.5, 0.0);
        transformer.translate(1.0, 2.0);
        transformer.translate(1.0, 2.0);
        let transform = *transformer.transform();
        assert_eq!(transform.scale, [4.0, 3.0]);
        assert_eq!(transform.rotation, 15.0);
        assert_eq!(transform.skew, [0.5, 0.0]);
        assert_eq!(transform.translation, [2.0, 4.0]);
        assert!(!transformer.is_identity());

        transformer.set_pivot(5.0, 5.0);
        transformer.set_mode(TransformMode::Constrained);
        transformer.reset();
        assert!(transformer.is_identity());
        assert_eq!(transformer.pivot(), [5.0, 5.0]);
        assert_eq!(transformer.mode(), TransformMode::Constrained);
        transformer.scale(2.0, 3.0);
        assert_eq!(transformer.transform().scale, [2.0, 2.0]);
        assert_eq!("constrained".parse(), Ok(TransformMode::Constrained));
    }
    #[test]
    fn bounds_about_pivot() {
        let mut transformer = Transformer::default();
        transformer.scale(2.0, 2.0);
        assert_eq!(transformer.bounds(Rect::canvas(4, 4)), Some(Rect::canvas(8, 8)));
        transformer.set_pivot(2.0, 2.0);
        assert_eq!(
            transformer.bounds(Rect::canvas(4, 4)),
            Some(Rect::from_corners([-2, -2], [6, 6]))
        );
        transformer.scale(f32::INFINITY, 1.0);
        assert_eq!(transformer.bounds(Rect::canvas(4, 4)), None);
    }
    #[test]
    fn translate_moves_pixels() {
        let mut image = Raster::new(4, 4);
        image.put(0, 0, Color::rgb(255, 0, 0));
        image.put(3, 3, Color::rgb(0, 0, 255));
        let mut transformer = Transformer::default();
        assert_eq!(transformer.apply(&image, Fit::Keep).unwrap(), image);

        transformer.translate(2.0, 1.0);
        let moved = transformer.apply(&image, Fit::Keep).unwrap();
        assert_eq!((moved.width(), moved.height()), (4, 4));
        assert_eq!(moved.get(2, 1), Some(Color::rgb(255, 0, 0)));
        assert_eq!(moved.get(0, 0), Some(Color::TRANSPARENT));
        // Pushed off the edge.
        assert!(moved.pixels().iter().all(|&pixel| pixel != Color::rgb(0, 0, 255)));

        let grown = transformer.apply(&image, Fit::Grow).unwrap();
        assert_eq!((grown.width(), grown.height()), (6, 5));
        assert_eq!(grown.get(5, 4), Some(Color::rgb(0, 0, 255)));
    }
    #[test]
    fn rotates_clockwise_about_pivot() {
        let mut image = Raster::new(4, 4);
        image.put(0, 0, Color::WHITE);
        let mut transformer = Transformer::default();
        transformer.set_pivot(2.0, 2.0);
        transformer.rotate(90.0);
        let rotated = transformer.apply(&image, Fit::Keep).unwrap();
        assert_eq!(rotated.get(3, 0), Some(Color::WHITE));
        assert_eq!(rotated.get(0, 0), Some(Color::TRANSPARENT));
    }
    #[test]
    fn scaling_up_filters() {
        let image = Raster::filled(2, 2, Color::rgb(255, 0, 0));
        let mut transformer = Transformer::default();
        transformer.scale(2.0, 2.0);
        let scaled = transformer.apply(&image, Fit::Grow).unwrap();
        assert_eq!((scaled.width(), scaled.height()), (4, 4));
        assert_eq!(scaled.get(1, 1), Some(Color::rgb(255, 0, 0)));
        assert_eq!(scaled.get(2, 2), Some(Color::rgb(255, 0, 0)));
        // Edges blend toward transparent, without darkening.
        let corner = scaled.get(3, 3).unwrap();
        assert!(corner.alpha() < 255 && corner.alpha() > 0);
        assert_eq!(corner.with_alpha(255), Color::rgb(255, 0, 0));
    }
    #[test]
    fn degenerate_is_empty() {
        let image = Raster::filled(3, 3, Color::WHITE);
        let mut transformer = Transformer::default();
        transformer.scale(0.0, 1.0);
        let flat = transformer.apply(&image, Fit::Grow).unwrap();
        assert_eq!((flat.width(), flat.height()), (3, 3));
        assert!(flat.pixels().iter().all(|&pixel| pixel == Color::TRANSPARENT));
    }
    #[test]
    fn growth_is_limited() {
        let image = Raster::filled(2, 2, Color::WHITE);
        let mut transformer = Transformer::default();
        transformer.scale(1.0e6, 1.0e6);
        assert!(matches!(
            transformer.apply(&image, Fit::Grow),
            Err(RasterError::TooLarge { .. })
        ));
    }
}
