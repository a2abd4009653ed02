use std::time::Instant;

use crate::{
    document::model::{CellRef, Document},
    editor::{
        commands::{EditCommand, apply_to_blocks},
        undo::{UndoEntry, UndoStack},
    },
};

pub mod commands;
pub mod undo;

/// Applies user edits to document cells and keeps their history.
#[derive(Debug, Default)]
pub struct EditEngine {
    pub undo: UndoStack,
}

impl EditEngine {
    /// Returns the edited cell, or `None` when the command changed nothing.
    pub fn apply_command(&mut self, doc: &mut Document, command: EditCommand) -> Option<CellRef> {
        let inverse = apply_to_document(doc, &command)?;
        let bytes = command.size_hint();
        let cell = command.cell();
        self.undo.push(UndoEntry {
            command,
            inverse,
            bytes,
            timestamp: Instant::now(),
        });
        doc.dirty = true;
        Some(cell)
    }

    pub fn undo(&mut self, doc: &mut Document) -> Option<CellRef> {
        let entry = self.undo.pop_undo()?;
        apply_to_document(doc, &entry.inverse);
        doc.dirty = true;
        Some(entry.inverse.cell())
    }

    pub fn redo(&mut self, doc: &mut Document) -> Option<CellRef> {
        let entry = self.undo.pop_redo()?;
        apply_to_document(doc, &entry.command);
        doc.dirty = true;
        Some(entry.command.cell())
    }

    pub fn clear(&mut self) {
        self.undo.clear();
    }
}

fn apply_to_document(doc: &mut Document, command: &EditCommand) -> Option<EditCommand> {
    let cell = doc.cell_mut(command.cell())?;
    apply_to_blocks(&mut cell.blocks, command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Block, Paragraph, Table};

    fn doc() -> Document {
        let mut table = Table::new(1, 2, vec![21.0, 79.0]);
        table.rows[0].cells[1].push_paragraph(Paragraph::plain("Отит"));
        let mut doc = Document::default();
        doc.content.push(Block::Table(table));
        doc
    }

    #[test]
    fn undo_and_redo_restore_cell_content() {
        let at = CellRef {
            block: 0,
            row: 0,
            col: 1,
        };
        let mut doc = doc();
        let mut engine = EditEngine::default();
        assert_eq!(
            engine.apply_command(&mut doc, commands::insert_text(at, 0, 4, " острый")),
            Some(at)
        );
        assert_eq!(doc.cell(at).unwrap().plain_text(), "Отит острый");

        assert_eq!(engine.undo(&mut doc), Some(at));
        assert_eq!(doc.cell(at).unwrap().plain_text(), "Отит");
        assert_eq!(engine.redo(&mut doc), Some(at));
        assert_eq!(doc.cell(at).unwrap().plain_text(), "Отит острый");
    }

    #[test]
    fn commands_on_missing_cells_are_dropped() {
        let mut doc = doc();
        let mut engine = EditEngine::default();
        let nowhere = CellRef {
            block: 5,
            row: 0,
            col: 0,
        };
        assert!(engine.apply_command(&mut doc, commands::insert_text(nowhere, 0, 0, "x")).is_none());
        assert_eq!(engine.undo.undo_len(), 0);
    }
}
