//! Committed-state history with a clamped cursor

/// Ordered committed states plus a cursor into them
#[derive(Clone, Debug)]
pub struct History<S> {
    entries: Vec<S>,
    cursor: usize,
}

impl<S> History<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed state and move the cursor to it
    pub fn push(&mut self, state: S) {
        self.entries.push(state);
        self.cursor = self.entries.len() - 1;
    }

    /// Step back; `None` at the first entry
    pub fn prev(&mut self) -> Option<&S> {
        if self.cursor == 0 || self.entries.is_empty() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward; `None` at the last entry
    pub fn next(&mut self) -> Option<&S> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn current(&self) -> Option<&S> {
        self.entries.get(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[S] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}

impl<S> Default for History<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
        }
    }
}
