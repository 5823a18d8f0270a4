//! # Commands
//!
//! Commands are the way the shared state of the document is modified. Every change made through a
//! [writer](crate::history::writer) is recorded automatically as a command, which carries enough of
//! the before and after state to be applied in either direction.

pub use crate::state::layers::commands::Command as LayerCommand;
pub use crate::state::selection::commands::Command as SelectionCommand;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("command constructed for a state that does not match the current state")]
    MismatchedState,
    #[error("resource referenced by the command is not found")]
    UnknownResource,
    #[error("command makes no changes")]
    NoOp,
}
pub trait CommandConsumer<C> {
    /// Apply a single command. If this generates an error,
    /// the state of `self` should *not* be observably changed.
    fn apply(&mut self, command: DoUndo<'_, C>) -> Result<(), CommandError>;
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeType {
    /// Commands are grouped because they were individual parts in part of a single, larger operation.
    Atoms,
    /// A command writer panicked mid write. The commands contained may be part of an incomplete operation,
    /// but are still tracked so the history matches the state.
    WritePanic,
}
/// Commands about commands!
#[derive(Clone, Debug)]
pub enum MetaCommand {
    /// Bundle many commands into one big group. Can be nested many times.
    /// Grouped commands are treated as a single command, as far as the user can tell.
    Scope(ScopeType, Box<[Command]>),
}

#[derive(Clone, Debug)]
pub enum Command {
    Meta(MetaCommand),
    Layer(LayerCommand),
    Selection(SelectionCommand),
}
impl From<MetaCommand> for Command {
    fn from(value: MetaCommand) -> Self {
        Self::Meta(value)
    }
}
impl From<LayerCommand> for Command {
    fn from(value: LayerCommand) -> Self {
        Self::Layer(value)
    }
}
impl From<SelectionCommand> for Command {
    fn from(value: SelectionCommand) -> Self {
        Self::Selection(value)
    }
}
impl Command {
    #[must_use]
    pub fn meta(&self) -> Option<&MetaCommand> {
        match self {
            Self::Meta(m) => Some(m),
            _ => None,
        }
    }
    #[must_use]
    pub fn layer(&self) -> Option<&LayerCommand> {
        match self {
            Self::Layer(m) => Some(m),
            _ => None,
        }
    }
    #[must_use]
    pub fn selection(&self) -> Option<&SelectionCommand> {
        match self {
            Self::Selection(m) => Some(m),
            _ => None,
        }
    }
    /// Rough heap footprint of the state captured by this command.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        let own = std::mem::size_of::<Self>();
        match self {
            Self::Meta(MetaCommand::Scope(_, commands)) => {
                own + commands.iter().map(Self::memory_size).sum::<usize>()
            }
            Self::Layer(layer) => own + layer.memory_size(),
            Self::Selection(selection) => own + selection.memory_size(),
        }
    }
}

#[derive(PartialEq, Eq, Debug)]
pub enum DoUndo<'c, T> {
    Do(&'c T),
    Undo(&'c T),
}
impl<T> Clone for DoUndo<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for DoUndo<'_, T> {}
impl<'c, T> DoUndo<'c, T> {
    /// Apply a closure to the inner type T, maintaining the
    /// Do or Undo status. Returns None if the closure returns None.
    pub fn filter_map<Func, Return>(&self, f: Func) -> Option<DoUndo<'c, Return>>
    where
        Func: FnOnce(&'c T) -> Option<&'c Return>,
        Return: 'c,
    {
        match self {
            Self::Do(c) => Some(DoUndo::Do(f(c)?)),
            Self::Undo(c) => Some(DoUndo::Undo(f(c)?)),
        }
    }
    /// Project to a part of the command, keeping the direction.
    pub fn map<Func, Return>(self, f: Func) -> DoUndo<'c, Return>
    where
        Func: FnOnce(&'c T) -> &'c Return,
        Return: 'c,
    {
        match self {
            Self::Do(c) => DoUndo::Do(f(c)),
            Self::Undo(c) => DoUndo::Undo(f(c)),
        }
    }
    /// The same command, applied in the other direction.
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::Do(c) => Self::Undo(c),
            Self::Undo(c) => Self::Do(c),
        }
    }
    #[must_use]
    pub fn inner(self) -> &'c T {
        match self {
            Self::Do(c) | Self::Undo(c) => c,
        }
    }
}
