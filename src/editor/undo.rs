use std::{collections::VecDeque, time::Instant};

use crate::editor::commands::EditCommand;

const COALESCE_WINDOW_MS: u128 = 500;
const MAX_UNDO_STEPS: usize = 500;
const MAX_UNDO_BYTES: usize = 4 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UndoEntry {
    pub command: EditCommand,
    pub inverse: EditCommand,
    pub bytes: usize,
    pub timestamp: Instant,
}

#[derive(Debug)]
pub struct UndoStack {
    undo: VecDeque<UndoEntry>,
    redo: VecDeque<UndoEntry>,
    used_bytes: usize,
    max_steps: usize,
    max_bytes: usize,
}

impl UndoStack {
    pub fn with_limits(max_steps: usize, max_bytes: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            used_bytes: 0,
            max_steps: max_steps.max(16),
            max_bytes: max_bytes.max(64 * 1024),
        }
    }

    pub fn push(&mut self, mut entry: UndoEntry) {
        self.redo.clear();
        if self.try_coalesce(&mut entry) {
            return;
        }
        self.used_bytes += entry.bytes;
        self.undo.push_back(entry);
        self.enforce_limits();
    }

    pub fn pop_undo(&mut self) -> Option<UndoEntry> {
        let entry = self.undo.pop_back()?;
        self.used_bytes = self.used_bytes.saturating_sub(entry.bytes);
        self.redo.push_back(entry.clone());
        Some(entry)
    }

    pub fn pop_redo(&mut self) -> Option<UndoEntry> {
        let entry = self.redo.pop_back()?;
        self.used_bytes += entry.bytes;
        self.undo.push_back(entry.clone());
        Some(entry)
    }

    /// Drops all history. Cell addresses don't survive a rebuild.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.used_bytes = 0;
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Typing a word into the same paragraph extends the previous entry.
    fn try_coalesce(&mut self, next: &mut UndoEntry) -> bool {
        let Some(last) = self.undo.back_mut() else {
            return false;
        };

        let elapsed = next.timestamp.saturating_duration_since(last.timestamp).as_millis();
        if elapsed > COALESCE_WINDOW_MS {
            return false;
        }

        let (
            EditCommand::InsertText {
                cell: c1,
                paragraph: p1,
                offset: o1,
                text: t1,
            },
            EditCommand::InsertText {
                cell: c2,
                paragraph: p2,
                offset: o2,
                text: t2,
            },
            EditCommand::DeleteText { end, .. },
        ) = (&mut last.command, &next.command, &mut last.inverse)
        else {
            return false;
        };
        if c1 != c2 || p1 != p2 || *o2 != *o1 + t1.chars().count() {
            return false;
        }
        if !t2.chars().all(is_coalescable_char) {
            return false;
        }

        t1.push_str(t2);
        *end += t2.chars().count();
        last.bytes += next.bytes;
        last.timestamp = next.timestamp;
        self.used_bytes += next.bytes;
        self.enforce_limits();
        true
    }

    fn enforce_limits(&mut self) {
        while self.undo.len() > self.max_steps || self.used_bytes > self.max_bytes {
            let Some(front) = self.undo.pop_front() else {
                break;
            };
            self.used_bytes = self.used_bytes.saturating_sub(front.bytes);
        }
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::with_limits(MAX_UNDO_STEPS, MAX_UNDO_BYTES)
    }
}

fn is_coalescable_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::CellRef;

    const CELL: CellRef = CellRef {
        block: 0,
        row: 3,
        col: 0,
    };

    fn typed(text: &str, offset: usize, now: Instant) -> UndoEntry {
        let len = text.chars().count();
        UndoEntry {
            command: EditCommand::InsertText {
                cell: CELL,
                paragraph: 0,
                offset,
                text: text.to_string(),
            },
            inverse: EditCommand::DeleteText {
                cell: CELL,
                paragraph: 0,
                start: offset,
                end: offset + len,
            },
            bytes: text.len(),
            timestamp: now,
        }
    }

    #[test]
    fn coalesces_typing_but_breaks_on_space() {
        let now = Instant::now();
        let mut stack = UndoStack::default();

        stack.push(typed("о", 0, now));
        stack.push(typed("т", 1, now));
        assert_eq!(stack.undo_len(), 1);
        let entry = stack.pop_undo().unwrap();
        assert_eq!(
            entry.inverse,
            EditCommand::DeleteText {
                cell: CELL,
                paragraph: 0,
                start: 0,
                end: 2
            }
        );
        stack.pop_redo();

        stack.push(typed(" ", 2, now));
        assert_eq!(stack.undo_len(), 2);
    }

    #[test]
    fn new_edit_clears_redo() {
        let now = Instant::now();
        let mut stack = UndoStack::default();
        stack.push(typed("a", 0, now));
        stack.pop_undo();
        assert_eq!(stack.redo_len(), 1);
        stack.push(typed("b", 0, now));
        assert_eq!(stack.redo_len(), 0);
    }

    #[test]
    fn enforces_memory_and_step_limits() {
        let mut stack = UndoStack::with_limits(16, 64 * 1024);
        let now = Instant::now();

        for i in 0..200 {
            let mut entry = typed(" abc", i * 10, now);
            entry.bytes = 4096;
            stack.push(entry);
        }

        assert!(stack.undo_len() <= 16);
        assert!(stack.used_bytes() <= 64 * 1024);
    }
}
