//! Undo/redo of full draft snapshots.

/// Two snapshot stacks. `undo` holds earlier states, `redo` holds states
/// undone since the last change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    undo: Vec<String>,
    redo: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `previous` before a new change. Clears redo.
    pub fn record(&mut self, previous: String) {
        self.undo.push(previous);
        self.redo.clear();
    }

    /// Steps back from `current`, returning the state to restore.
    pub fn undo(&mut self, current: &str) -> Option<String> {
        let previous = self.undo.pop()?;
        self.redo.push(current.to_string());
        Some(previous)
    }

    /// Steps forward from `current`, returning the state to restore.
    pub fn redo(&mut self, current: &str) -> Option<String> {
        let next = self.redo.pop()?;
        self.undo.push(current.to_string());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}
