//! # Compositor
//!
//! Flattens a layer stack into one image. Layers are placed at the canvas origin and clipped to
//! the canvas, so layers of differing sizes only contribute where they overlap it.

use crate::{
    blend::blend_pixel,
    raster::Raster,
    state::layers::{Layer, LayerStack},
    util::Rect,
};

/// Blend one layer onto `target`, honouring its visibility, opacity and blend mode.
pub fn composite_layer(target: &mut Raster, layer: &Layer) {
    let bounds = target.bounds();
    composite_layer_rect(target, layer, bounds);
}

fn composite_layer_rect(target: &mut Raster, layer: &Layer, rect: Rect) {
    if !layer.visible() || layer.opacity() <= 0.0 {
        return;
    }
    let Some(rect) = rect
        .clip(target.width(), target.height())
        .and_then(|rect| rect.clip(layer.width(), layer.height()))
    else {
        return;
    };
    let blend = layer.blend();
    for (x, y) in rect.positions() {
        if let (Some(top), Some(base)) = (layer.image().get(x, y), target.get_mut(x, y)) {
            *base = blend_pixel(*base, top, blend);
        }
    }
}

/// Flatten every visible layer, bottom to top, onto a transparent `width` x `height` canvas.
#[must_use]
pub fn composite(layers: &LayerStack, width: u32, height: u32) -> Raster {
    let mut out = Raster::new(width, height);
    for layer in layers.iter() {
        composite_layer(&mut out, layer);
    }
    out
}

/// Flatten only the area within `rect`, returning a raster of the clipped size whose top-left
/// is `rect`'s top-left. Empty if `rect` misses the canvas.
#[must_use]
pub fn composite_rect(layers: &LayerStack, width: u32, height: u32, rect: Rect) -> Raster {
    let Some(rect) = rect.clip(width, height) else {
        return Raster::default();
    };
    let mut canvas = Raster::new(width, height);
    for layer in layers.iter() {
        composite_layer_rect(&mut canvas, layer, rect);
    }
    canvas.crop(rect)
}
