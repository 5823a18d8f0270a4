use super::{
    commands::{ActiveChange, Command},
    Layer, LayerError, LayerProperties, LayerStack,
};
use crate::{
    blend::BlendMode,
    history::writer::CommandWrite,
    raster::Raster,
    state::transform::{Fit, Transformer},
    util::Rect,
};

/// Mutable access to a [`LayerStack`], recording a command for every change.
pub struct LayerWriter<'a, Write> {
    writer: Write,
    state: &'a mut LayerStack,
}
impl<Write> std::ops::Deref for LayerWriter<'_, Write> {
    type Target = LayerStack;
    fn deref(&self) -> &Self::Target {
        self.state
    }
}

impl<'a, Write: CommandWrite<Command>> LayerWriter<'a, Write> {
    pub fn new(writer: Write, state: &'a mut LayerStack) -> Self {
        Self { writer, state }
    }
    /// Insert at `index` (at most `len`) and make it active.
    fn insert(&mut self, index: usize, layer: Layer) -> usize {
        let active = ActiveChange {
            from: self.state.active,
            to: Some(index),
        };
        self.state.layers.insert(index, layer.clone());
        self.state.active = active.to;
        self.writer.write(Command::Inserted {
            index,
            layer,
            active,
        });
        index
    }
    /// Append a transparent layer on top and make it active. Returns its index.
    pub fn add_layer(&mut self, width: u32, height: u32, name: impl Into<String>) -> usize {
        let index = self.state.layers.len();
        self.insert(index, Layer::new(width, height, name))
    }
    /// Remove the layer at `index`. The active index becomes the topmost remaining layer,
    /// or None once the stack is empty.
    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        if index >= self.state.layers.len() {
            log::warn!("remove_layer: no layer at {index}");
            return None;
        }
        let layer = self.state.layers.remove(index);
        let active = ActiveChange {
            from: self.state.active,
            to: self.state.layers.len().checked_sub(1),
        };
        self.state.active = active.to;
        self.writer.write(Command::Removed {
            index,
            layer: layer.clone(),
            active,
        });
        Some(layer)
    }
    /// Move the layer at `from` so that it ends up at index `to`. The active index follows
    /// whichever layer was active.
    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        let len = self.state.layers.len();
        if from >= len || to >= len {
            return false;
        }
        if from == to {
            return true;
        }
        let active = ActiveChange {
            from: self.state.active,
            to: self.state.active.map(|idx| match idx {
                idx if idx == from => to,
                idx if from < idx && idx <= to => idx - 1,
                idx if to <= idx && idx < from => idx + 1,
                idx => idx,
            }),
        };
        let layer = self.state.layers.remove(from);
        let target = layer.id;
        self.state.layers.insert(to, layer);
        self.state.active = active.to;
        self.writer.write(Command::Moved {
            target,
            from,
            to,
            active,
        });
        true
    }
    /// Copy the layer at `index` to just above it, and make the copy active.
    pub fn duplicate_layer(&mut self, index: usize) -> Option<usize> {
        let copy = self.state.layers.get(index)?.duplicate();
        Some(self.insert(index + 1, copy))
    }
    /// Replace the layers at `indices` with a single "Merged Layer" holding their composite,
    /// placed where the lowest of them was and made active. Order and duplicates in `indices`
    /// don't matter.
    ///
    /// None if `indices` is empty or any of them is out of range.
    pub fn merge_layers(&mut self, indices: &[usize]) -> Option<usize> {
        let mut indices = indices.to_vec();
        indices.sort_unstable();
        indices.dedup();
        let (&lowest, &highest) = (indices.first()?, indices.last()?);
        if highest >= self.state.layers.len() {
            log::warn!("merge_layers: index {highest} out of range");
            return None;
        }

        let (width, height) = indices
            .iter()
            .map(|&idx| &self.state.layers[idx])
            .fold((0, 0), |(w, h), layer| {
                (w.max(layer.width()), h.max(layer.height()))
            });
        let mut image = Raster::new(width, height);
        for &idx in &indices {
            crate::compositor::composite_layer(&mut image, &self.state.layers[idx]);
        }

        // Top down, so the remaining indices stay valid.
        for &idx in indices.iter().rev() {
            self.remove_layer(idx);
        }
        Some(self.insert(lowest, Layer::new_merged(image)))
    }
    /// Set or clear the active layer. False if `index` is out of range.
    pub fn set_active(&mut self, index: Option<usize>) -> bool {
        if !LayerStack::active_in_range(index, self.state.layers.len()) {
            return false;
        }
        if self.state.active != index {
            let from = self.state.active;
            self.state.active = index;
            self.writer.write(Command::ActiveChanged { from, to: index });
        }
        true
    }
    /// Modify the properties of the layer at `index`. Opacity is clamped to `[0, 1]`.
    /// Returns whether anything changed.
    pub fn update_properties(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut LayerProperties),
    ) -> Result<bool, LayerError> {
        let layer = self
            .state
            .layers
            .get_mut(index)
            .ok_or(LayerError::OutOfRange(index))?;
        let from = layer.properties.clone();
        f(&mut layer.properties);
        layer.properties.blend.opacity = crate::util::clamp_unit(layer.properties.blend.opacity);
        if layer.properties == from {
            return Ok(false);
        }
        self.writer.write(Command::PropertiesChanged {
            target: layer.id,
            from,
            to: layer.properties.clone(),
        });
        Ok(true)
    }
    pub fn set_properties(
        &mut self,
        index: usize,
        properties: LayerProperties,
    ) -> Result<bool, LayerError> {
        self.update_properties(index, |props| *props = properties)
    }
    pub fn set_name(&mut self, index: usize, name: impl Into<String>) -> Result<bool, LayerError> {
        let name = name.into();
        self.update_properties(index, |props| props.name = name)
    }
    pub fn set_visible(&mut self, index: usize, visible: bool) -> Result<bool, LayerError> {
        self.update_properties(index, |props| props.visible = visible)
    }
    pub fn set_opacity(&mut self, index: usize, opacity: f32) -> Result<bool, LayerError> {
        self.update_properties(index, |props| props.blend.opacity = opacity)
    }
    pub fn set_blend_mode(&mut self, index: usize, mode: BlendMode) -> Result<bool, LayerError> {
        self.update_properties(index, |props| props.blend.mode = mode)
    }
    pub fn set_locked(&mut self, index: usize, locked: bool) -> Result<bool, LayerError> {
        self.update_properties(index, |props| props.locked = locked)
    }
    /// Edit the pixels of the layer at `index` within `rect`. `f` receives the whole image and
    /// `rect` clipped to it, changes outside that area are discarded.
    ///
    /// Returns whether any pixel changed.
    pub fn paint<F>(&mut self, index: usize, rect: Rect, f: F) -> Result<bool, LayerError>
    where
        F: FnOnce(&mut Raster, Rect),
    {
        let layer = self
            .state
            .layers
            .get_mut(index)
            .ok_or(LayerError::OutOfRange(index))?;
        if layer.properties.locked {
            return Err(LayerError::Locked);
        }
        let Some(rect) = rect.clip(layer.width(), layer.height()) else {
            return Ok(false);
        };

        // Work on a copy, only the rect is written back.
        let mut scratch = layer.image.clone();
        f(&mut scratch, rect);
        let before = layer.image.crop(rect);
        let after = scratch.crop(rect);
        if before == after {
            return Ok(false);
        }
        layer.image.paste(&after, rect.left, rect.top);
        self.writer.write(Command::PixelsChanged {
            target: layer.id,
            rect,
            before,
            after,
        });
        Ok(true)
    }
    /// Swap in a whole new image for the layer at `index`, which may differ in size.
    /// Returns whether anything changed.
    pub fn replace_image(&mut self, index: usize, image: Raster) -> Result<bool, LayerError> {
        let layer = self
            .state
            .layers
            .get_mut(index)
            .ok_or(LayerError::OutOfRange(index))?;
        if layer.properties.locked {
            return Err(LayerError::Locked);
        }
        if layer.image == image {
            return Ok(false);
        }
        let before = std::mem::replace(&mut layer.image, image.clone());
        self.writer.write(Command::ImageReplaced {
            target: layer.id,
            before,
            after: image,
        });
        Ok(true)
    }
    /// Resample the layer at `index` through `transformer`. The selection plays no part.
    pub fn transform(
        &mut self,
        index: usize,
        transformer: &Transformer,
        fit: Fit,
    ) -> Result<bool, LayerError> {
        let layer = self
            .state
            .layers
            .get(index)
            .ok_or(LayerError::OutOfRange(index))?;
        if layer.properties.locked {
            return Err(LayerError::Locked);
        }
        if transformer.is_identity() {
            return Ok(false);
        }
        let image = transformer.apply(&layer.image, fit)?;
        log::debug!(
            "Transformed layer {index} {}x{} -> {}x{}",
            layer.width(),
            layer.height(),
            image.width(),
            image.height()
        );
        self.replace_image(index, image)
    }
}
