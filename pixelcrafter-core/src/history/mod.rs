//! # History
//!
//! Linear undo/redo over [`Command`]s. Entries are kept on two bounded stacks: recording a new
//! entry discards everything that could have been redone, and once the undo stack is over
//! capacity the oldest entries fall off the bottom.

pub mod writer;

use crate::commands::{Command, CommandConsumer, CommandError, DoUndo};

/// Undo steps kept unless configured otherwise.
pub const DEFAULT_MAX_STATES: usize = 50;

pub type EntryID = crate::CraftID<HistoryEntry>;

/// One undoable step, as the user sees it.
#[derive(Clone, Debug)]
pub struct HistoryEntry {
    id: EntryID,
    description: String,
    command: Command,
}
impl HistoryEntry {
    #[must_use]
    pub fn new(description: impl Into<String>, command: Command) -> Self {
        Self {
            id: EntryID::default(),
            description: description.into(),
            command,
        }
    }
    #[must_use]
    pub fn id(&self) -> EntryID {
        self.id
    }
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
    #[must_use]
    pub fn command(&self) -> &Command {
        &self.command
    }
    /// Rough footprint of the state this entry keeps alive.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.description.len() + self.command.memory_size()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
    #[error("command rejected")]
    Rejected(#[source] CommandError),
    /// The entry could not be undone and has been dropped from history.
    #[error("failed to undo \"{}\"", .entry.description)]
    UndoFailed {
        entry: Box<HistoryEntry>,
        #[source]
        source: CommandError,
    },
    /// The entry could not be redone and has been dropped from history.
    #[error("failed to redo \"{}\"", .entry.description)]
    RedoFailed {
        entry: Box<HistoryEntry>,
        #[source]
        source: CommandError,
    },
}

#[derive(Debug)]
pub struct History {
    // Oldest at the front.
    undo: std::collections::VecDeque<HistoryEntry>,
    // Next to redo at the back.
    redo: Vec<HistoryEntry>,
    max_states: usize,
}
impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STATES)
    }
}
impl History {
    #[must_use]
    pub fn new(max_states: usize) -> Self {
        Self {
            undo: std::collections::VecDeque::new(),
            redo: Vec::new(),
            max_states,
        }
    }
    /// Apply `command` to `target` and record it. On failure nothing is recorded and `target`
    /// is unchanged.
    pub fn execute<Target: CommandConsumer<Command>>(
        &mut self,
        target: &mut Target,
        description: impl Into<String>,
        command: Command,
    ) -> Result<(), HistoryError> {
        target
            .apply(DoUndo::Do(&command))
            .map_err(HistoryError::Rejected)?;
        self.push(HistoryEntry::new(description, command));
        Ok(())
    }
    /// Record an entry whose command has already been applied. Clears the redo stack.
    pub fn push(&mut self, entry: HistoryEntry) {
        log::debug!(
            "Recorded \"{}\" ({})",
            entry.description,
            human_bytes::human_bytes(entry.memory_size() as f64)
        );
        if !self.redo.is_empty() {
            log::trace!("Discarding {} redo entries", self.redo.len());
            self.redo.clear();
        }
        self.push_undo(entry);
    }
    fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo.push_back(entry);
        self.evict();
    }
    fn evict(&mut self) {
        while self.undo.len() > self.max_states {
            if let Some(evicted) = self.undo.pop_front() {
                log::trace!("Evicting \"{}\" from history", evicted.description);
            }
        }
    }
    /// Revert the most recent entry and move it to the redo stack.
    ///
    /// If the command refuses to undo, the entry is dropped rather than put back, and handed
    /// back in the error.
    pub fn undo<Target: CommandConsumer<Command>>(
        &mut self,
        target: &mut Target,
    ) -> Result<(), HistoryError> {
        let entry = self.undo.pop_back().ok_or(HistoryError::NothingToUndo)?;
        match target.apply(DoUndo::Undo(&entry.command)) {
            Ok(()) => {
                log::debug!("Undid \"{}\"", entry.description);
                self.redo.push(entry);
                Ok(())
            }
            Err(source) => {
                log::warn!(
                    "Undo of \"{}\" failed, dropping it from history: {source}",
                    entry.description
                );
                Err(HistoryError::UndoFailed {
                    entry: Box::new(entry),
                    source,
                })
            }
        }
    }
    /// Re-apply the most recently undone entry and move it back to the undo stack.
    /// Failure drops the entry, as with [`History::undo`].
    pub fn redo<Target: CommandConsumer<Command>>(
        &mut self,
        target: &mut Target,
    ) -> Result<(), HistoryError> {
        let entry = self.redo.pop().ok_or(HistoryError::NothingToRedo)?;
        match target.apply(DoUndo::Do(&entry.command)) {
            Ok(()) => {
                log::debug!("Redid \"{}\"", entry.description);
                self.push_undo(entry);
                Ok(())
            }
            Err(source) => {
                log::warn!(
                    "Redo of \"{}\" failed, dropping it from history: {source}",
                    entry.description
                );
                Err(HistoryError::RedoFailed {
                    entry: Box::new(entry),
                    source,
                })
            }
        }
    }
    #[must_use]
    pub fn max_states(&self) -> usize {
        self.max_states
    }
    /// Change the capacity, dropping the oldest entries if over it.
    pub fn set_max_states(&mut self, max_states: usize) {
        self.max_states = max_states;
        self.evict();
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
    #[must_use]
    pub fn undo_description(&self) -> Option<&str> {
        self.undo.back().map(HistoryEntry::description)
    }
    #[must_use]
    pub fn redo_description(&self) -> Option<&str> {
        self.redo.last().map(HistoryEntry::description)
    }
    /// Forget everything. The document itself is untouched.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
    /// Number of entries that can be undone.
    #[must_use]
    pub fn len(&self) -> usize {
        self.undo.len()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
    /// Undoable entries, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> + '_ {
        self.undo.iter()
    }
    /// Total of [`HistoryEntry::memory_size`] over both stacks.
    #[must_use]
    pub fn memory_size(&self) -> usize {
        self.undo
            .iter()
            .chain(self.redo.iter())
            .map(HistoryEntry::memory_size)
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::state::{document::DocumentState, layers::commands::Command as LayerCommand};

    fn activate(from: Option<usize>, to: Option<usize>) -> Command {
        LayerCommand::ActiveChanged { from, to }.into()
    }
    /// Consumer that counts applied commands.
    #[derive(Default)]
    struct Counter {
        value: i64,
        refuse_undo: bool,
    }
    impl CommandConsumer<Command> for Counter {
        fn apply(&mut self, command: DoUndo<'_, Command>) -> Result<(), CommandError> {
            match command {
                DoUndo::Do(_) => self.value += 1,
                DoUndo::Undo(_) if self.refuse_undo => return Err(CommandError::MismatchedState),
                DoUndo::Undo(_) => self.value -= 1,
            }
            Ok(())
        }
    }

    #[test]
    fn capacity_evicts_oldest() {
        let mut history = History::new(3);
        let mut counter = Counter::default();
        for idx in 0..4 {
            history
                .execute(&mut counter, format!("step {idx}"), activate(None, None))
                .unwrap();
        }
        assert_eq!(history.len(), 3);
        let names: Vec<_> = history.iter().map(HistoryEntry::description).collect();
        assert_eq!(names, ["step 1", "step 2", "step 3"]);
    }
    #[test]
    fn execute_clears_redo() {
        let mut history = History::default();
        let mut counter = Counter::default();
        history.execute(&mut counter, "a", activate(None, None)).unwrap();
        history.execute(&mut counter, "b", activate(None, None)).unwrap();
        history.undo(&mut counter).unwrap();
        assert!(history.can_redo());
        assert_eq!(history.redo_description(), Some("b"));

        history.execute(&mut counter, "c", activate(None, None)).unwrap();
        assert!(!history.can_redo());
        assert_eq!(history.undo_description(), Some("c"));
        assert_eq!(counter.value, 2);
    }
    #[test]
    fn empty_stacks() {
        let mut history = History::default();
        let mut counter = Counter::default();
        assert!(matches!(
            history.undo(&mut counter),
            Err(HistoryError::NothingToUndo)
        ));
        assert!(matches!(
            history.redo(&mut counter),
            Err(HistoryError::NothingToRedo)
        ));
    }
    #[test]
    fn failed_undo_drops_entry() {
        let mut history = History::default();
        let mut counter = Counter {
            refuse_undo: true,
            ..Default::default()
        };
        history.execute(&mut counter, "a", activate(None, None)).unwrap();
        history.execute(&mut counter, "b", activate(None, None)).unwrap();
        match history.undo(&mut counter) {
            Err(HistoryError::UndoFailed { entry, source }) => {
                assert_eq!(entry.description(), "b");
                assert_eq!(source, CommandError::MismatchedState);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(history.len(), 1);
        assert!(!history.can_redo());
        assert_eq!(counter.value, 2);
    }
    #[test]
    fn rejected_commands_not_recorded() {
        let mut history = History::default();
        let mut state = DocumentState::default();
        // No layer 3 to activate.
        assert!(matches!(
            history.execute(&mut state, "bad", activate(None, Some(3))),
            Err(HistoryError::Rejected(CommandError::MismatchedState))
        ));
        assert!(history.is_empty());
    }
    #[test]
    fn round_trip_on_real_state() {
        let mut history = History::default();
        let mut state = DocumentState::default();
        state.layers.add_layer(1, 1, "a");
        state.layers.add_layer(1, 1, "b");
        history
            .execute(&mut state, "select a", activate(Some(1), Some(0)))
            .unwrap();
        assert_eq!(state.layers().active_index(), Some(0));
        history.undo(&mut state).unwrap();
        assert_eq!(state.layers().active_index(), Some(1));
        history.redo(&mut state).unwrap();
        assert_eq!(state.layers().active_index(), Some(0));
        assert!(!history.can_redo());
    }
    #[test]
    fn shrinking_capacity() {
        let mut history = History::new(10);
        let mut counter = Counter::default();
        for idx in 0..8 {
            history
                .execute(&mut counter, format!("{idx}"), activate(None, None))
                .unwrap();
        }
        history.set_max_states(2);
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().next().map(HistoryEntry::description), Some("6"));
    }
}
