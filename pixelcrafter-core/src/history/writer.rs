use crate::{
    commands::{self, Command},
    raster::Raster,
    state::{
        document::DocumentState,
        layers::{writer::LayerWriter, LayerError},
        selection::{writer::SelectionWriter, Selection},
    },
    util::Rect,
};

/// Any type which can sink commands.
pub trait CommandWrite<Command> {
    /// Inserts a command.
    fn write(&mut self, command: Command);
}
impl<Write, Command> CommandWrite<Command> for &mut Write
where
    Write: CommandWrite<Command>,
{
    fn write(&mut self, command: Command) {
        (**self).write(command);
    }
}
/// Forgets every command. Writers over this make plain, unrecorded edits.
#[derive(Copy, Clone, Debug, Default)]
pub struct Discard;
impl<Command> CommandWrite<Command> for Discard {
    fn write(&mut self, _: Command) {}
}
// Any subcommand that can be wrapped in Command can be written into any
// smallvec of Command.
impl<Subcommand, Array> CommandWrite<Subcommand> for smallvec::SmallVec<Array>
where
    Subcommand: Into<Command>,
    Array: smallvec::Array<Item = Command>,
{
    fn write(&mut self, command: Subcommand) {
        self.push(command.into());
    }
}

/// Records every change made to a document as one history entry, written when dropped.
pub struct DocumentWriter<'a> {
    pub(crate) state: &'a mut DocumentState,
    pub(crate) history: &'a mut super::History,
    pub(crate) description: String,
    // Optimize for exactly one command (the most common case)
    pub(crate) commands: smallvec::SmallVec<[Command; 1]>,
}
impl Drop for DocumentWriter<'_> {
    fn drop(&mut self) {
        // Skip if nothing to write.
        if self.commands.is_empty() {
            return;
        }

        // We always write exactly one command - bundle into one if more!
        // If panic exit, write as a panic scope (even if the scope is just one command long)
        let command = if std::thread::panicking() {
            Command::Meta(commands::MetaCommand::Scope(
                commands::ScopeType::WritePanic,
                std::mem::take(&mut self.commands).into_boxed_slice(),
            ))
        } else if self.commands.len() == 1 {
            // Checked above, there's exactly one.
            self.commands.pop().unwrap()
        } else {
            Command::Meta(commands::MetaCommand::Scope(
                commands::ScopeType::Atoms,
                std::mem::take(&mut self.commands).into_boxed_slice(),
            ))
        };

        log::trace!("Writing new command: {:#?}", command);

        self.history.push(super::HistoryEntry::new(
            std::mem::take(&mut self.description),
            command,
        ));
    }
}
impl DocumentWriter<'_> {
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.commands.is_empty()
    }
    /// Read the current state, including changes made so far through this writer.
    #[must_use]
    pub fn state(&self) -> &DocumentState {
        self.state
    }
    pub fn layers(&'_ mut self) -> LayerWriter<'_, &mut smallvec::SmallVec<[Command; 1]>> {
        LayerWriter::new(&mut self.commands, &mut self.state.layers)
    }
    pub fn selection(&'_ mut self) -> SelectionWriter<'_, &mut smallvec::SmallVec<[Command; 1]>> {
        SelectionWriter::new(&mut self.commands, &mut self.state.selection)
    }
    /// Like [`LayerWriter::paint`], with the selection at hand for masking.
    pub fn paint_masked<F>(&mut self, index: usize, rect: Rect, f: F) -> Result<bool, LayerError>
    where
        F: FnOnce(&mut Raster, Rect, &Selection),
    {
        let selection = &self.state.selection;
        LayerWriter::new(&mut self.commands, &mut self.state.layers)
            .paint(index, rect, |image, rect| f(image, rect, selection))
    }
}
