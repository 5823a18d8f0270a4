//! Area fills: solid, flood, gradient and pattern.

use super::{active_layer, paint_active, ToolError};
use crate::{
    blend::{blend_pixel, Blend},
    color::Color,
    gradient::Gradient,
    history::writer::DocumentWriter,
    pattern::Pattern,
    raster::Raster,
    util::Rect,
};

/// Fill `rect` of the active layer with `color`.
pub fn fill_rect(
    writer: &mut DocumentWriter<'_>,
    rect: Rect,
    color: Color,
) -> Result<bool, ToolError> {
    paint_active(writer, rect, |_, _, pixel| {
        Some(blend_pixel(pixel, color, Blend::default()))
    })
}

/// Pixels 4-connected to the seed whose every channel is within `tolerance` of the seed color.
/// Returns the bounding box of the region and a mask over the whole image.
fn flood_region(image: &Raster, x: i32, y: i32, tolerance: u8) -> Option<(Rect, Vec<bool>)> {
    let seed = image.get(x, y)?;
    let width = image.width() as usize;
    let index = |x: i32, y: i32| y as usize * width + x as usize;
    let matches = |color: Color| {
        color
            .0
            .iter()
            .zip(seed.0)
            .all(|(&a, b)| a.abs_diff(b) <= tolerance)
    };

    let mut region = vec![false; image.pixels().len()];
    let mut bounds = Rect::from_xywh(x, y, 1, 1);
    let mut queue = std::collections::VecDeque::from([(x, y)]);
    region[index(x, y)] = true;
    while let Some((x, y)) = queue.pop_front() {
        bounds = bounds.union(&Rect::from_xywh(x, y, 1, 1));
        for (nx, ny) in [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)] {
            let Some(color) = image.get(nx, ny) else {
                continue;
            };
            let idx = index(nx, ny);
            if !region[idx] && matches(color) {
                region[idx] = true;
                queue.push_back((nx, ny));
            }
        }
    }
    Some((bounds, region))
}

/// Bucket fill from `(x, y)` on the active layer. Nothing happens if the seed is off the layer.
pub fn flood_fill(
    writer: &mut DocumentWriter<'_>,
    x: i32,
    y: i32,
    color: Color,
    tolerance: u8,
) -> Result<bool, ToolError> {
    let index = active_layer(writer)?;
    let Some(layer) = writer.state().layers().get(index) else {
        return Ok(false);
    };
    let width = layer.width() as usize;
    let Some((bounds, region)) = flood_region(layer.image(), x, y, tolerance) else {
        return Ok(false);
    };
    log::trace!("Flood fill from ({x}, {y}) covers {bounds:?}");
    paint_active(writer, bounds, |x, y, pixel| {
        let inside = region
            .get(y as usize * width + x as usize)
            .copied()
            .unwrap_or(false);
        inside.then(|| blend_pixel(pixel, color, Blend::default()))
    })
}

/// Fill `rect` with `gradient`, stretched over the rectangle.
pub fn fill_gradient(
    writer: &mut DocumentWriter<'_>,
    gradient: &Gradient,
    rect: Rect,
) -> Result<bool, ToolError> {
    paint_active(writer, rect, |x, y, pixel| {
        Some(blend_pixel(pixel, gradient.color_at(rect, x, y), Blend::default()))
    })
}

/// Fill `rect` with `pattern`, starting at its top-left corner.
pub fn fill_pattern(
    writer: &mut DocumentWriter<'_>,
    pattern: &Pattern,
    rect: Rect,
) -> Result<bool, ToolError> {
    paint_active(writer, rect, |x, y, pixel| {
        let color = pattern.sample(x - rect.left, y - rect.top)?;
        Some(blend_pixel(pixel, color, Blend::default()))
    })
}
