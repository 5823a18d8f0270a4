//! # Tools
//!
//! Pixel editing operations on the active layer of a document. Every tool writes through a
//! [`DocumentWriter`], so what it changes is recorded as part of the writer's history entry,
//! and every tool is limited by the current selection.
//!
//! ```ignore
//! document.write_with("Brush", |writer| brush::stroke(writer, &settings, &points))?;
//! ```

pub mod brush;
pub mod fill;
pub mod shapes;

use crate::{
    color::Color,
    filters::{Filter, FilterError},
    history::writer::DocumentWriter,
    state::layers::LayerError,
    util::{u8_to_unit, Rect},
};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ToolError {
    #[error("no active layer")]
    NoActiveLayer,
    #[error(transparent)]
    Layer(#[from] LayerError),
    #[error(transparent)]
    Filter(#[from] FilterError),
}

fn active_layer(writer: &DocumentWriter<'_>) -> Result<usize, ToolError> {
    writer
        .state()
        .layers()
        .active_index()
        .ok_or(ToolError::NoActiveLayer)
}

/// Replace pixels of the active layer within `rect` by what `f` returns for them, leaving the
/// pixel alone on `None`. The result is mixed back according to selection coverage.
fn paint_active<F>(writer: &mut DocumentWriter<'_>, rect: Rect, f: F) -> Result<bool, ToolError>
where
    F: Fn(i32, i32, Color) -> Option<Color>,
{
    let index = active_layer(writer)?;
    let changed = writer.paint_masked(index, rect, |image, rect, selection| {
        for (x, y) in rect.positions() {
            let selected = selection.coverage(x, y);
            if selected == 0 {
                continue;
            }
            let Some(pixel) = image.get_mut(x, y) else {
                continue;
            };
            let Some(painted) = f(x, y, *pixel) else {
                continue;
            };
            *pixel = if selected == u8::MAX {
                painted
            } else {
                pixel.lerp(painted, u8_to_unit(selected))
            };
        }
    })?;
    Ok(changed)
}

/// Run `filter` over the active layer, limited to the selection. `parameters` override the
/// filter's own for this call.
pub fn apply_filter(
    writer: &mut DocumentWriter<'_>,
    filter: &Filter,
    parameters: &[(&str, f32)],
) -> Result<bool, ToolError> {
    let index = active_layer(writer)?;
    let state = writer.state();
    let layer = state
        .layers()
        .get(index)
        .ok_or(LayerError::OutOfRange(index))?;
    if layer.locked() {
        return Err(LayerError::Locked.into());
    }
    let filtered = filter.apply_with(layer.image(), parameters)?;
    let rect = match state.selection().bounds() {
        Some(bounds) => bounds,
        None if state.selection().is_active() => return Ok(false),
        None => layer.image().bounds(),
    };
    log::debug!("Applying {} to layer {index} over {rect:?}", filter.name());
    paint_active(writer, rect, |x, y, _| filtered.get(x, y))
}
