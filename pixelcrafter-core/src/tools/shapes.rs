//! Rectangles, ellipses and lines, drawn in a solid color.

use super::{paint_active, ToolError};
use crate::{
    blend::{blend_pixel, Blend},
    color::Color,
    history::writer::DocumentWriter,
    util::{floor_to_i32, Rect},
};

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeStyle {
    Filled,
    /// Stroke of `width` pixels, inside the shape's bounds.
    Outline { width: f32 },
}

fn stroke_width(width: f32) -> f32 {
    if width.is_finite() {
        width.max(1.0)
    } else {
        1.0
    }
}

fn draw(
    writer: &mut DocumentWriter<'_>,
    rect: Rect,
    color: Color,
    inside: impl Fn(i32, i32) -> bool,
) -> Result<bool, ToolError> {
    paint_active(writer, rect, |x, y, pixel| {
        inside(x, y).then(|| blend_pixel(pixel, color, Blend::default()))
    })
}

pub fn rectangle(
    writer: &mut DocumentWriter<'_>,
    rect: Rect,
    color: Color,
    style: ShapeStyle,
) -> Result<bool, ToolError> {
    match style {
        ShapeStyle::Filled => draw(writer, rect, color, |_, _| true),
        ShapeStyle::Outline { width } => {
            let width = stroke_width(width);
            draw(writer, rect, color, |x, y| {
                // Distance to the nearest edge, in whole pixels.
                let edge = (x - rect.left)
                    .min(rect.right - 1 - x)
                    .min(y - rect.top)
                    .min(rect.bottom - 1 - y);
                (edge as f32) < width
            })
        }
    }
}

/// Ellipse inscribed in `rect`.
pub fn ellipse(
    writer: &mut DocumentWriter<'_>,
    rect: Rect,
    color: Color,
    style: ShapeStyle,
) -> Result<bool, ToolError> {
    let radii = [rect.width() as f32 / 2.0, rect.height() as f32 / 2.0];
    let center = [rect.left as f32 + radii[0], rect.top as f32 + radii[1]];
    // Normalized distance from the center, 1 on the boundary.
    let within = move |x: i32, y: i32, radii: [f32; 2]| {
        if radii[0] <= 0.0 || radii[1] <= 0.0 {
            return false;
        }
        let dx = (x as f32 + 0.5 - center[0]) / radii[0];
        let dy = (y as f32 + 0.5 - center[1]) / radii[1];
        dx * dx + dy * dy <= 1.0
    };
    match style {
        ShapeStyle::Filled => draw(writer, rect, color, |x, y| within(x, y, radii)),
        ShapeStyle::Outline { width } => {
            let width = stroke_width(width);
            let inner = [radii[0] - width, radii[1] - width];
            draw(writer, rect, color, |x, y| {
                within(x, y, radii) && !within(x, y, inner)
            })
        }
    }
}

/// Straight line of `width` pixels between two points, with round caps.
pub fn line(
    writer: &mut DocumentWriter<'_>,
    from: [f32; 2],
    to: [f32; 2],
    width: f32,
    color: Color,
) -> Result<bool, ToolError> {
    if from.iter().chain(to.iter()).any(|v| !v.is_finite()) {
        return Ok(false);
    }
    let half = stroke_width(width) / 2.0;
    let rect = Rect::from_corners(
        [
            floor_to_i32(from[0].min(to[0]) - half),
            floor_to_i32(from[1].min(to[1]) - half),
        ],
        [
            floor_to_i32(from[0].max(to[0]) + half).saturating_add(1),
            floor_to_i32(from[1].max(to[1]) + half).saturating_add(1),
        ],
    );
    let [dx, dy] = [to[0] - from[0], to[1] - from[1]];
    let length_squared = dx * dx + dy * dy;
    draw(writer, rect, color, |x, y| {
        let (px, py) = (x as f32 + 0.5 - from[0], y as f32 + 0.5 - from[1]);
        // Closest point on the segment.
        let t = if length_squared > 0.0 {
            ((px * dx + py * dy) / length_squared).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (px - dx * t).hypot(py - dy * t) <= half
    })
}
