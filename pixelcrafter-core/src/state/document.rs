use crate::{
    commands::{Command, CommandConsumer, CommandError, DoUndo, MetaCommand},
    history::{writer::DocumentWriter, History, HistoryError},
    raster::Raster,
    state::{
        layers::{Layer, LayerStack},
        selection::{Selection, SelectionMode},
    },
    util::Rect,
};

/// Everything history can change.
#[derive(Clone, Debug, Default)]
pub struct DocumentState {
    pub(crate) layers: LayerStack,
    pub(crate) selection: Selection,
}
impl DocumentState {
    #[must_use]
    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }
    /// Apply every command of a scope, last to first when undoing. If one fails, the ones already
    /// applied are reverted.
    fn apply_scope(&mut self, commands: &[Command], undo: bool) -> Result<(), CommandError> {
        fn direction(command: &Command, undo: bool) -> DoUndo<'_, Command> {
            if undo {
                DoUndo::Undo(command)
            } else {
                DoUndo::Do(command)
            }
        }
        let ordered: Vec<&Command> = if undo {
            commands.iter().rev().collect()
        } else {
            commands.iter().collect()
        };
        for (done, &command) in ordered.iter().enumerate() {
            if let Err(err) = self.apply(direction(command, undo)) {
                for &applied in ordered[..done].iter().rev() {
                    if let Err(rollback) = self.apply(direction(applied, undo).inverse()) {
                        log::error!("Failed to roll back partially applied scope: {rollback}");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}
impl CommandConsumer<Command> for DocumentState {
    fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
        match command.inner() {
            Command::Meta(MetaCommand::Scope(_, commands)) => {
                self.apply_scope(commands, matches!(command, DoUndo::Undo(_)))
            }
            Command::Layer(layer) => self.layers.apply(command.map(|_| layer)),
            Command::Selection(selection) => self.selection.apply(command.map(|_| selection)),
        }
    }
}

/// An open image: a fixed-size canvas, its layers and selection, and the history of edits.
#[derive(Debug)]
pub struct Document {
    /// Name of the document, shown to the user.
    pub name: String,
    width: u32,
    height: u32,
    state: DocumentState,
    history: History,
    /// Free-form data saved alongside the document.
    pub metadata: serde_json::Value,
}
impl Document {
    /// Empty document with no layers.
    #[must_use]
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            state: DocumentState {
                layers: LayerStack::default(),
                selection: Selection::new(width, height),
            },
            history: History::default(),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
    /// A document sized by the canvas settings, with a "Background" layer filled with the
    /// background color, and history capacity from the settings.
    #[must_use]
    pub fn with_settings(name: impl Into<String>, settings: &crate::settings::Settings) -> Self {
        let canvas = &settings.canvas;
        let mut document = Self::new(name, canvas.width, canvas.height);
        document.history = History::new(settings.history.max_undo_steps);
        let background = Layer::from_parts(
            crate::state::layers::LayerProperties {
                name: "Background".to_owned(),
                ..Default::default()
            },
            Raster::filled(canvas.width, canvas.height, canvas.background),
        );
        document.state.layers = LayerStack::from_layers(vec![background], Some(0));
        document
    }
    /// Assemble a document from loaded parts. History starts empty.
    #[must_use]
    pub fn from_parts(
        name: impl Into<String>,
        width: u32,
        height: u32,
        layers: LayerStack,
        metadata: serde_json::Value,
    ) -> Self {
        let mut document = Self::new(name, width, height);
        document.state.layers = layers;
        document.metadata = metadata;
        document
    }
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::canvas(self.width, self.height)
    }
    #[must_use]
    pub fn state(&self) -> &DocumentState {
        &self.state
    }
    #[must_use]
    pub fn layers(&self) -> &LayerStack {
        &self.state.layers
    }
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.state.selection
    }
    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }
    pub fn set_max_undo_steps(&mut self, max_states: usize) {
        self.history.set_max_states(max_states);
    }
    /// Mode for subsequent selection regions. A tool setting, so not recorded.
    pub fn set_selection_mode(&mut self, mode: SelectionMode) {
        self.state.selection.set_mode(mode);
    }
    /// Start a recorded edit. Everything written through the writer becomes one history entry
    /// named `description` when it is dropped.
    pub fn writer(&mut self, description: impl Into<String>) -> DocumentWriter<'_> {
        DocumentWriter {
            state: &mut self.state,
            history: &mut self.history,
            description: description.into(),
            commands: smallvec::SmallVec::new(),
        }
    }
    /// Run `f` with a recording writer, see [`Document::writer`].
    pub fn write_with<R>(
        &mut self,
        description: impl Into<String>,
        f: impl FnOnce(&mut DocumentWriter<'_>) -> R,
    ) -> R {
        let mut writer = self.writer(description);
        f(&mut writer)
    }
    /// Apply a prepared command and record it.
    pub fn execute(
        &mut self,
        description: impl Into<String>,
        command: Command,
    ) -> Result<(), HistoryError> {
        self.history.execute(&mut self.state, description, command)
    }
    pub fn undo(&mut self) -> Result<(), HistoryError> {
        self.history.undo(&mut self.state)
    }
    pub fn redo(&mut self) -> Result<(), HistoryError> {
        self.history.redo(&mut self.state)
    }
    /// Flatten all visible layers.
    #[must_use]
    pub fn composite(&self) -> Raster {
        crate::compositor::composite(&self.state.layers, self.width, self.height)
    }
    #[must_use]
    pub fn composite_rect(&self, rect: Rect) -> Raster {
        crate::compositor::composite_rect(&self.state.layers, self.width, self.height, rect)
    }
}
// Recorded layer operations, for callers that don't need to batch.
impl Document {
    /// Add a canvas-sized transparent layer on top. Returns its index.
    pub fn add_layer(&mut self, name: impl Into<String>) -> usize {
        let (width, height) = (self.width, self.height);
        self.write_with("Add Layer", |writer| {
            writer.layers().add_layer(width, height, name)
        })
    }
    pub fn remove_layer(&mut self, index: usize) -> Option<Layer> {
        self.write_with("Remove Layer", |writer| writer.layers().remove_layer(index))
    }
    pub fn move_layer(&mut self, from: usize, to: usize) -> bool {
        self.write_with("Move Layer", |writer| writer.layers().move_layer(from, to))
    }
    pub fn duplicate_layer(&mut self, index: usize) -> Option<usize> {
        self.write_with("Duplicate Layer", |writer| {
            writer.layers().duplicate_layer(index)
        })
    }
    pub fn merge_layers(&mut self, indices: &[usize]) -> Option<usize> {
        self.write_with("Merge Layers", |writer| {
            writer.layers().merge_layers(indices)
        })
    }
    pub fn set_active_layer(&mut self, index: Option<usize>) -> bool {
        self.write_with("Select Layer", |writer| writer.layers().set_active(index))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{color::Color, state::selection::Region};

    fn red_document() -> Document {
        let mut document = Document::new("test", 8, 8);
        document.add_layer("A");
        document.write_with("Fill", |writer| {
            writer
                .layers()
                .paint(0, Rect::canvas(8, 8), |image, _| image.fill(Color::rgb(255, 0, 0)))
                .unwrap();
        });
        document
    }

    #[test]
    fn one_entry_per_write() {
        let mut document = Document::new("test", 4, 4);
        document.write_with("Setup", |writer| {
            let mut layers = writer.layers();
            layers.add_layer(4, 4, "A");
            layers.add_layer(4, 4, "B");
            layers.set_opacity(0, 0.5).unwrap();
        });
        assert_eq!(document.history().len(), 1);
        assert_eq!(document.history().undo_description(), Some("Setup"));

        document.undo().unwrap();
        assert!(document.layers().is_empty());
        assert_eq!(document.layers().active_index(), None);
        document.redo().unwrap();
        assert_eq!(document.layers().len(), 2);
        assert_eq!(document.layers().get(0).unwrap().opacity(), 0.5);
        assert_eq!(document.layers().active_index(), Some(1));
    }
    #[test]
    fn empty_write_records_nothing() {
        let mut document = Document::new("test", 4, 4);
        document.write_with("Nothing", |writer| {
            // Already None, so nothing to record.
            assert!(writer.layers().set_active(None));
            assert!(!writer.changed());
        });
        assert!(document.history().is_empty());
    }
    #[test]
    fn paint_round_trip() {
        let mut document = red_document();
        let after = document.composite();
        assert_eq!(after.get(3, 3), Some(Color::rgb(255, 0, 0)));

        document.undo().unwrap();
        assert_eq!(document.composite().get(3, 3), Some(Color::TRANSPARENT));
        document.redo().unwrap();
        assert_eq!(document.composite(), after);
    }
    #[test]
    fn remove_and_merge_undo() {
        let mut document = red_document();
        document.add_layer("B");
        document.add_layer("C");
        let names = |document: &Document| -> Vec<String> {
            document
                .layers()
                .iter()
                .map(|layer| layer.name().to_owned())
                .collect()
        };

        document.remove_layer(1).unwrap();
        assert_eq!(names(&document), ["A", "C"]);
        document.undo().unwrap();
        assert_eq!(names(&document), ["A", "B", "C"]);
        assert_eq!(document.layers().active_index(), Some(2));

        let before = document.composite();
        document.merge_layers(&[0, 1, 2]).unwrap();
        assert_eq!(names(&document), ["Merged Layer"]);
        assert_eq!(document.composite(), before);
        document.undo().unwrap();
        assert_eq!(names(&document), ["A", "B", "C"]);
        assert_eq!(document.composite(), before);
    }
    #[test]
    fn selection_is_recorded() {
        let mut document = Document::new("test", 10, 10);
        document.write_with("Select", |writer| {
            writer
                .selection()
                .apply_region(&Region::Rect(Rect::from_xywh(1, 1, 2, 2)));
        });
        assert!(document.selection().is_point_selected(1, 1));
        document.set_selection_mode(SelectionMode::Subtract);
        document.write_with("Deselect part", |writer| {
            writer
                .selection()
                .apply_region(&Region::Rect(Rect::from_xywh(1, 1, 1, 2)));
        });
        assert!(!document.selection().is_point_selected(1, 1));
        document.undo().unwrap();
        assert!(document.selection().is_point_selected(1, 1));
        document.undo().unwrap();
        assert!(!document.selection().is_active());
    }
    #[test]
    fn mismatched_undo_is_dropped() {
        let mut document = red_document();
        // Change the layer behind history's back, so the recorded pixels no longer match.
        document.state.layers = LayerStack::from_layers(vec![Layer::new(8, 8, "imposter")], Some(0));
        assert!(matches!(
            document.undo(),
            Err(HistoryError::UndoFailed { .. })
        ));
        assert_eq!(document.history().len(), 1);
    }
    #[test]
    fn scopes_roll_back() {
        use crate::state::layers::commands::Command as LayerCommand;
        let mut document = Document::new("test", 2, 2);
        document.add_layer("A");
        let scope = Command::Meta(MetaCommand::Scope(
            crate::commands::ScopeType::Atoms,
            vec![
                LayerCommand::ActiveChanged {
                    from: Some(0),
                    to: None,
                }
                .into(),
                // Stale: the active index is None by now.
                LayerCommand::ActiveChanged {
                    from: Some(0),
                    to: None,
                }
                .into(),
            ]
            .into_boxed_slice(),
        ));
        assert!(document.execute("broken", scope).is_err());
        assert_eq!(document.layers().active_index(), Some(0));
    }
    #[test]
    fn transform_round_trip() {
        use crate::state::{
            layers::LayerError,
            transform::{Fit, Transformer},
        };
        let mut document = red_document();
        let mut transformer = Transformer::default();
        transformer.scale(2.0, 1.0);
        let changed = document
            .write_with("Transform", |writer| {
                writer.layers().transform(0, &transformer, Fit::Grow)
            })
            .unwrap();
        assert!(changed);
        let size = |document: &Document| {
            let layer = document.layers().get(0).unwrap();
            (layer.width(), layer.height())
        };
        assert_eq!(size(&document), (16, 8));
        assert_eq!(document.history().undo_description(), Some("Transform"));
        document.undo().unwrap();
        assert_eq!(size(&document), (8, 8));
        assert_eq!(document.composite().get(7, 7), Some(Color::rgb(255, 0, 0)));
        document.redo().unwrap();
        assert_eq!(size(&document), (16, 8));

        // Identity and locked layers change nothing.
        let before = document.history().len();
        let result = document.write_with("Transform", |writer| {
            let mut layers = writer.layers();
            assert_eq!(layers.transform(0, &Transformer::default(), Fit::Keep), Ok(false));
            layers.set_locked(0, true).unwrap();
            layers.transform(0, &transformer, Fit::Keep)
        });
        assert_eq!(result, Err(LayerError::Locked));
        assert_eq!(document.history().len(), before + 1);
        assert_eq!(size(&document), (16, 8));
    }
}
