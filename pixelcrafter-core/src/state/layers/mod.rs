//! # Layers
//!
//! The document is an ordered stack of raster layers, composited bottom (index 0) to top.
//! One layer at a time may be active, which is where tools paint.

pub mod commands;
pub mod writer;

use crate::{
    blend::{Blend, BlendMode},
    commands::{CommandConsumer, CommandError, DoUndo},
    history::writer::Discard,
    raster::Raster,
};

pub type LayerID = crate::CraftID<Layer>;

#[derive(thiserror::Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum LayerError {
    #[error("no layer at index {0}")]
    OutOfRange(usize),
    #[error("layer is locked")]
    Locked,
    #[error(transparent)]
    Raster(#[from] crate::raster::RasterError),
}

/// Everything about a layer except its pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerProperties {
    pub name: String,
    pub visible: bool,
    pub blend: Blend,
    /// Locked layers refuse pixel edits. Properties may still change.
    pub locked: bool,
}
impl Default for LayerProperties {
    fn default() -> Self {
        Self {
            name: "Layer".to_owned(),
            visible: true,
            blend: Blend::default(),
            locked: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Layer {
    id: LayerID,
    properties: LayerProperties,
    image: Raster,
}
impl Layer {
    /// A fully transparent layer with default properties.
    #[must_use]
    pub fn new(width: u32, height: u32, name: impl Into<String>) -> Self {
        Self::from_parts(
            LayerProperties {
                name: name.into(),
                ..Default::default()
            },
            Raster::new(width, height),
        )
    }
    /// A new layer, with a fresh ID.
    #[must_use]
    pub fn from_parts(properties: LayerProperties, image: Raster) -> Self {
        let mut properties = properties;
        properties.blend.opacity = crate::util::clamp_unit(properties.blend.opacity);
        Self {
            id: LayerID::default(),
            properties,
            image,
        }
    }
    fn new_merged(image: Raster) -> Self {
        Self::from_parts(
            LayerProperties {
                name: "Merged Layer".to_owned(),
                ..Default::default()
            },
            image,
        )
    }
    /// Deep copy under a new ID, named `"<name> (copy)"`.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        let mut properties = self.properties.clone();
        properties.name.push_str(" (copy)");
        Self::from_parts(properties, self.image.clone())
    }
    #[must_use]
    pub fn id(&self) -> LayerID {
        self.id
    }
    #[must_use]
    pub fn properties(&self) -> &LayerProperties {
        &self.properties
    }
    #[must_use]
    pub fn name(&self) -> &str {
        &self.properties.name
    }
    #[must_use]
    pub fn visible(&self) -> bool {
        self.properties.visible
    }
    #[must_use]
    pub fn locked(&self) -> bool {
        self.properties.locked
    }
    #[must_use]
    pub fn blend(&self) -> Blend {
        self.properties.blend
    }
    #[must_use]
    pub fn opacity(&self) -> f32 {
        self.properties.blend.opacity
    }
    #[must_use]
    pub fn blend_mode(&self) -> BlendMode {
        self.properties.blend.mode
    }
    #[must_use]
    pub fn image(&self) -> &Raster {
        &self.image
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.image.width()
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Ordered layers and the active index.
///
/// The active index is always either None or in bounds. Mutating methods here are not recorded,
/// go through a [`writer::LayerWriter`] (usually via the document) for undoable edits.
#[derive(Clone, Debug, Default)]
pub struct LayerStack {
    layers: Vec<Layer>,
    active: Option<usize>,
}
// Public methods for access by the client
impl LayerStack {
    /// Build from parts, as when loading a project. An out-of-range active index becomes None.
    #[must_use]
    pub fn from_layers(layers: Vec<Layer>, active: Option<usize>) -> Self {
        let active = active.filter(|&idx| idx < layers.len());
        Self { layers, active }
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }
    /// Find a layer and its current index.
    #[must_use]
    pub fn find(&self, id: LayerID) -> Option<(usize, &Layer)> {
        self.layers
            .iter()
            .enumerate()
            .find(|(_, layer)| layer.id == id)
    }
    #[must_use]
    pub fn index_of(&self, id: LayerID) -> Option<usize> {
        self.find(id).map(|(idx, _)| idx)
    }
    #[must_use]
    pub fn active_index(&self) -> Option<usize> {
        self.active
    }
    #[must_use]
    pub fn active(&self) -> Option<&Layer> {
        self.layers.get(self.active?)
    }
    /// Bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, Layer> {
        self.layers.iter()
    }
}
// Unrecorded edits. These behave exactly like their writer counterparts.
impl LayerStack {
    /// Append a transparent layer on top and make it active.
    pub fn add_layer(&mut self, width: u32, height: u32, name: impl Into<String>) -> &Layer {
        let index = writer::LayerWriter::new(Discard, self).add_layer(width, height, name);
        &self.layers[index]
    }
    /// Returns the removed layer, or None if `index` is out of range.
    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        writer::LayerWriter::new(Discard, self).remove_layer(index)
    }
    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        writer::LayerWriter::new(Discard, self).move_layer(from, to)
    }
    pub fn duplicate_layer(&mut self, index: usize) -> Option<&Layer> {
        let index = writer::LayerWriter::new(Discard, self).duplicate_layer(index)?;
        self.layers.get(index)
    }
    pub fn merge_layers(&mut self, indices: &[usize]) -> Option<&Layer> {
        let index = writer::LayerWriter::new(Discard, self).merge_layers(indices)?;
        self.layers.get(index)
    }
    pub fn set_active(&mut self, index: Option<usize>) -> bool {
        writer::LayerWriter::new(Discard, self).set_active(index)
    }
    pub fn set_properties(
        &mut self,
        index: usize,
        properties: LayerProperties,
    ) -> Result<bool, LayerError> {
        writer::LayerWriter::new(Discard, self).set_properties(index, properties)
    }
}
// Private methods for the writer and command applier
impl LayerStack {
    fn active_in_range(active: Option<usize>, len: usize) -> bool {
        active.map_or(true, |idx| idx < len)
    }
    fn get_mut_by_id(&mut self, id: LayerID) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|layer| layer.id == id)
    }
}

impl CommandConsumer<commands::Command> for LayerStack {
    #[allow(clippy::too_many_lines)]
    fn apply(&mut self, command: DoUndo<'_, commands::Command>) -> Result<(), CommandError> {
        use commands::{ActiveChange, Command};
        match command {
            DoUndo::Do(Command::Inserted {
                index,
                layer,
                active: ActiveChange { from, to },
            })
            | DoUndo::Undo(Command::Removed {
                index,
                layer,
                active: ActiveChange { from: to, to: from },
            }) => {
                if *index > self.layers.len() {
                    return Err(CommandError::UnknownResource);
                }
                if self.active != *from
                    || self.index_of(layer.id).is_some()
                    || !Self::active_in_range(*to, self.layers.len() + 1)
                {
                    return Err(CommandError::MismatchedState);
                }
                self.layers.insert(*index, layer.clone());
                self.active = *to;
                Ok(())
            }
            DoUndo::Do(Command::Removed {
                index,
                layer,
                active: ActiveChange { from, to },
            })
            | DoUndo::Undo(Command::Inserted {
                index,
                layer,
                active: ActiveChange { from: to, to: from },
            }) => {
                let current = self
                    .layers
                    .get(*index)
                    .ok_or(CommandError::UnknownResource)?;
                if current.id != layer.id
                    || self.active != *from
                    || !Self::active_in_range(*to, self.layers.len() - 1)
                {
                    return Err(CommandError::MismatchedState);
                }
                self.layers.remove(*index);
                self.active = *to;
                Ok(())
            }
            DoUndo::Do(Command::Moved {
                target,
                from,
                to,
                active:
                    ActiveChange {
                        from: active_from,
                        to: active_to,
                    },
            })
            | DoUndo::Undo(Command::Moved {
                target,
                from: to,
                to: from,
                active:
                    ActiveChange {
                        from: active_to,
                        to: active_from,
                    },
            }) => {
                let current = self
                    .layers
                    .get(*from)
                    .ok_or(CommandError::UnknownResource)?;
                if current.id != *target
                    || *to >= self.layers.len()
                    || self.active != *active_from
                    || !Self::active_in_range(*active_to, self.layers.len())
                {
                    return Err(CommandError::MismatchedState);
                }
                if from == to {
                    return Err(CommandError::NoOp);
                }
                let layer = self.layers.remove(*from);
                self.layers.insert(*to, layer);
                self.active = *active_to;
                Ok(())
            }
            DoUndo::Do(Command::PropertiesChanged { target, from, to })
            | DoUndo::Undo(Command::PropertiesChanged {
                target,
                from: to,
                to: from,
            }) => {
                let layer = self
                    .get_mut_by_id(*target)
                    .ok_or(CommandError::UnknownResource)?;
                if &layer.properties != from {
                    return Err(CommandError::MismatchedState);
                }
                layer.properties = to.clone();
                Ok(())
            }
            DoUndo::Do(Command::PixelsChanged {
                target,
                rect,
                before,
                after,
            })
            | DoUndo::Undo(Command::PixelsChanged {
                target,
                rect,
                before: after,
                after: before,
            }) => {
                let layer = self
                    .get_mut_by_id(*target)
                    .ok_or(CommandError::UnknownResource)?;
                // Must lie entirely within the image, and the snapshots must be exactly rect-sized.
                if rect.clip(layer.width(), layer.height()) != Some(*rect)
                    || (before.width(), before.height()) != (rect.width(), rect.height())
                    || (after.width(), after.height()) != (rect.width(), rect.height())
                    || &layer.image.crop(*rect) != before
                {
                    return Err(CommandError::MismatchedState);
                }
                layer.image.paste(after, rect.left, rect.top);
                Ok(())
            }
            DoUndo::Do(Command::ImageReplaced {
                target,
                before,
                after,
            })
            | DoUndo::Undo(Command::ImageReplaced {
                target,
                before: after,
                after: before,
            }) => {
                let layer = self
                    .get_mut_by_id(*target)
                    .ok_or(CommandError::UnknownResource)?;
                if &layer.image != before {
                    return Err(CommandError::MismatchedState);
                }
                layer.image = after.clone();
                Ok(())
            }
            DoUndo::Do(Command::ActiveChanged { from, to })
            | DoUndo::Undo(Command::ActiveChanged { from: to, to: from }) => {
                if self.active != *from || !Self::active_in_range(*to, self.layers.len()) {
                    return Err(CommandError::MismatchedState);
                }
                self.active = *to;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::Color;

    fn stack_of(count: usize) -> LayerStack {
        let mut stack = LayerStack::default();
        for idx in 0..count {
            stack.add_layer(4, 4, format!("{idx}"));
        }
        stack
    }
    fn names(stack: &LayerStack) -> Vec<&str> {
        stack.iter().map(Layer::name).collect()
    }

    #[test]
    fn add_makes_active() {
        let mut stack = LayerStack::default();
        assert_eq!(stack.active_index(), None);
        let layer = stack.add_layer(8, 2, "A");
        assert_eq!((layer.width(), layer.height()), (8, 2));
        assert!(layer.image().pixels().iter().all(|&c| c == Color::TRANSPARENT));
        stack.add_layer(8, 2, "B");
        assert_eq!(stack.active_index(), Some(1));
        assert_eq!(stack.active().map(Layer::name), Some("B"));
    }
    #[test]
    fn remove_until_empty() {
        for count in 0..6 {
            let mut stack = stack_of(count);
            for _ in 0..count {
                assert!(stack.remove_layer(0).is_some());
                assert!(LayerStack::active_in_range(stack.active_index(), stack.len()));
            }
            assert!(stack.is_empty());
            assert_eq!(stack.active_index(), None);
            assert!(stack.remove_layer(0).is_none());
        }
    }
    #[test]
    fn remove_falls_back_to_top() {
        let mut stack = stack_of(4);
        stack.set_active(Some(0));
        assert!(stack.remove_layer(7).is_none());
        assert_eq!(stack.active_index(), Some(0));
        assert_eq!(stack.remove_layer(1).map(|l| l.name().to_owned()), Some("1".into()));
        assert_eq!(stack.active_index(), Some(2));
    }
    #[test]
    fn move_follows_active() {
        let mut stack = stack_of(4);
        stack.set_active(Some(1));
        let active_id = stack.active().unwrap().id();

        assert!(stack.move_layer(1, 3));
        assert_eq!(names(&stack), ["0", "2", "3", "1"]);
        assert_eq!(stack.active().unwrap().id(), active_id);

        // Moving another layer across the active one shifts it.
        assert!(stack.move_layer(0, 3));
        assert_eq!(names(&stack), ["2", "3", "1", "0"]);
        assert_eq!(stack.active().unwrap().id(), active_id);

        assert!(!stack.move_layer(0, 4));
        assert!(!stack.move_layer(9, 0));
    }
    #[test]
    fn duplicate_above_source() {
        let mut stack = stack_of(3);
        let source = stack.get(1).unwrap().clone();
        let copy = stack.duplicate_layer(1).unwrap().clone();
        assert_ne!(copy.id(), source.id());
        assert_eq!(copy.name(), "1 (copy)");
        assert_eq!(copy.image(), source.image());
        assert_eq!(names(&stack), ["0", "1", "1 (copy)", "2"]);
        assert_eq!(stack.active_index(), Some(2));
        assert!(stack.duplicate_layer(4).is_none());
    }
    #[test]
    fn merge_opaque_with_transparent() {
        let mut stack = LayerStack::default();
        stack.add_layer(3, 3, "Opaque");
        {
            let mut writer = writer::LayerWriter::new(Discard, &mut stack);
            writer
                .paint(0, crate::util::Rect::canvas(3, 3), |image, _| {
                    image.fill(Color::rgb(10, 200, 30));
                })
                .unwrap();
        }
        stack.add_layer(3, 3, "Clear");
        let expected = stack.get(0).unwrap().image().clone();

        let merged = stack.merge_layers(&[1, 0, 1]).unwrap();
        assert_eq!(merged.name(), "Merged Layer");
        assert_eq!(merged.image(), &expected);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.active_index(), Some(0));
    }
    #[test]
    fn merge_failures() {
        let mut stack = stack_of(2);
        assert!(stack.merge_layers(&[]).is_none());
        assert!(stack.merge_layers(&[0, 2]).is_none());
        assert_eq!(stack.len(), 2);
    }
    #[test]
    fn merge_lands_at_lowest() {
        let mut stack = stack_of(4);
        stack.merge_layers(&[3, 1]).unwrap();
        assert_eq!(names(&stack), ["0", "Merged Layer", "2"]);
        assert_eq!(stack.active_index(), Some(1));
    }
    #[test]
    fn invisible_layers_do_not_merge() {
        let mut stack = stack_of(2);
        {
            let mut writer = writer::LayerWriter::new(Discard, &mut stack);
            writer
                .paint(1, crate::util::Rect::canvas(4, 4), |image, _| {
                    image.fill(Color::WHITE);
                })
                .unwrap();
            writer.set_visible(1, false).unwrap();
        }
        let merged = stack.merge_layers(&[0, 1]).unwrap();
        assert!(merged.image().pixels().iter().all(|&c| c == Color::TRANSPARENT));
    }
    #[test]
    fn commands_check_state() {
        use commands::{ActiveChange, Command};
        let mut stack = stack_of(2);
        let stray = Layer::new(1, 1, "stray");
        // Removing a layer that isn't where the command thinks it is.
        let remove = Command::Removed {
            index: 0,
            layer: stray.clone(),
            active: ActiveChange {
                from: Some(1),
                to: Some(0),
            },
        };
        assert_eq!(
            stack.apply(DoUndo::Do(&remove)),
            Err(CommandError::MismatchedState)
        );
        let insert = Command::Inserted {
            index: 5,
            layer: stray,
            active: ActiveChange {
                from: Some(1),
                to: Some(2),
            },
        };
        assert_eq!(
            stack.apply(DoUndo::Do(&insert)),
            Err(CommandError::UnknownResource)
        );
        assert_eq!(names(&stack), ["0", "1"]);
    }
}
