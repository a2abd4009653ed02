//! Forward direction: Field Store values into table cells.
//!
//! Renderers are pure. Each returns the blocks of one cell, and
//! [`render_group`] swaps them into the document wholesale, so rendering the
//! same values twice leaves identical cells behind.

pub mod exam;
pub mod operation;

use std::mem;

use crate::document::html;
use crate::document::model::{Block, Document, Paragraph, ParagraphAlignment, Run, RunStyle};
use crate::report::Mode;
use crate::report::arbiter::FieldGroup;
use crate::report::fields::FieldStore;
use crate::report::layout::{RowMap, Section, Visibility};

/// Sequential writer for one cell, in the manner of a text cursor: text
/// appends to the current paragraph and every `\n` opens a new one.
#[derive(Debug, Default)]
pub struct CellWriter {
    blocks: Vec<Block>,
    current: Paragraph,
    alignment: ParagraphAlignment,
}

impl CellWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the alignment of the current paragraph and of those opened after it.
    pub fn align(&mut self, alignment: ParagraphAlignment) -> &mut Self {
        self.alignment = alignment;
        self.current.alignment = alignment;
        self
    }

    pub fn styled(&mut self, text: &str, style: &RunStyle) -> &mut Self {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                self.newline();
            }
            self.current.push(Run::styled(line, style.clone()));
        }
        self
    }

    pub fn plain(&mut self, text: &str) -> &mut Self {
        self.styled(text, &RunStyle::default())
    }

    pub fn bold(&mut self, text: &str) -> &mut Self {
        self.styled(
            text,
            &RunStyle {
                bold: true,
                ..RunStyle::default()
            },
        )
    }

    pub fn newline(&mut self) -> &mut Self {
        let next = Paragraph::new().with_alignment(self.alignment);
        let done = mem::replace(&mut self.current, next);
        self.blocks.push(Block::Paragraph(done));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.current.is_empty()
    }

    /// Inserts an HTML fragment. Its first paragraph continues the current
    /// line; the writer ends up positioned after the last inserted block.
    pub fn rich(&mut self, fragment: &str) -> &mut Self {
        let mut incoming = html::html_to_blocks(fragment).into_iter();
        match incoming.next() {
            None => return self,
            Some(Block::Paragraph(first)) => {
                for run in first.runs {
                    self.current.push(run);
                }
            }
            Some(other) => self.push_block(other),
        }
        for block in incoming {
            self.push_block(block);
        }
        self
    }

    fn push_block(&mut self, block: Block) {
        let previous = mem::replace(
            &mut self.current,
            Paragraph::new().with_alignment(self.alignment),
        );
        if !(previous.is_empty() && self.blocks.is_empty()) {
            self.blocks.push(Block::Paragraph(previous));
        }
        match block {
            Block::Paragraph(p) => self.current = p,
            other => self.blocks.push(other),
        }
    }

    pub fn finish(mut self) -> Vec<Block> {
        let after_structure = matches!(self.blocks.last(), Some(Block::List(_) | Block::Table(_)));
        if !(self.current.is_empty() && (self.blocks.is_empty() || after_structure)) {
            self.blocks.push(Block::Paragraph(self.current));
        }
        self.blocks
    }
}

/// Replaces a cell's content. A section that is not laid out is a no-op.
pub fn write_cell(
    doc: &mut Document,
    map: &RowMap,
    section: Section,
    col: usize,
    blocks: Vec<Block>,
) -> bool {
    let Some(at) = map.cell(section, 0, col) else {
        return false;
    };
    match doc.cell_mut(at) {
        Some(cell) => {
            cell.blocks = blocks;
            true
        }
        None => false,
    }
}

/// Renders every cell fed by one field group.
pub fn render_group(
    doc: &mut Document,
    map: &RowMap,
    group: FieldGroup,
    store: &FieldStore,
    vis: &Visibility,
) {
    let mode = vis.mode();
    match (group, mode) {
        (FieldGroup::Date, _) => {
            write_cell(doc, map, Section::Header, 0, exam::date_cell(&store.date));
        }
        (FieldGroup::Specialty, _) => {
            write_cell(
                doc,
                map,
                Section::Header,
                1,
                exam::specialty_cell(&store.specialty, mode),
            );
        }
        (FieldGroup::Indicators, Mode::Examination) => {
            write_cell(doc, map, Section::Indicators, 0, exam::indicators_cell(&store.indicators));
        }
        (FieldGroup::Complaints, Mode::Examination) => {
            write_cell(doc, map, Section::Indicators, 1, exam::complaints_cell(&store.complaints));
        }
        (FieldGroup::Consent, Mode::Examination) => {
            write_cell(doc, map, Section::Consent, 0, exam::consent_cell(store.consent));
        }
        (FieldGroup::Objective, Mode::Examination) => {
            write_cell(doc, map, Section::Objective, 0, exam::objective_cell(&store.objective));
        }
        (FieldGroup::Surdology, Mode::Examination) => {
            write_cell(doc, map, Section::Surdology, 0, exam::surdology_cell(&store.surdology));
        }
        (FieldGroup::Diagnosis, Mode::Examination) => {
            let cell = exam::diagnosis_cell(&store.diagnosis.examination);
            write_cell(doc, map, Section::Diagnosis, 0, cell);
        }
        (FieldGroup::Diagnosis, Mode::Operation) => {
            let cell = operation::diagnosis_cell(&store.diagnosis.operation);
            write_cell(doc, map, Section::Diagnosis, 0, cell);
        }
        (FieldGroup::Recommendations, Mode::Examination) => {
            let (label, text) = exam::recommendations_cells(&store.recommendations.examination);
            write_cell(doc, map, Section::Recommendations, 0, label);
            write_cell(doc, map, Section::Recommendations, 1, text);
        }
        (FieldGroup::Recommendations, Mode::Operation) => {
            let cell = operation::recommendations_cell(&store.recommendations.operation);
            write_cell(doc, map, Section::OpRecommendations, 0, cell);
        }
        (FieldGroup::Repeat, Mode::Examination) => {
            write_cell(doc, map, Section::Repeat, 0, exam::repeat_cell(&store.repeat));
        }
        (FieldGroup::SickLeave, Mode::Examination) => {
            write_cell(doc, map, Section::SickLeave, 0, exam::sick_leave_cell(&store.sick_leave));
        }
        (FieldGroup::Repeat | FieldGroup::SickLeave, Mode::Operation) => {
            let cell = operation::extra_cell(&store.repeat, &store.sick_leave);
            write_cell(doc, map, Section::OpExtra, 0, cell);
        }
        (FieldGroup::Signature, _) => {
            write_cell(doc, map, Section::Signature, 0, exam::signature_cell(&store.signature));
        }
        (FieldGroup::Operation, Mode::Operation) => {
            write_cell(doc, map, Section::Operation, 0, operation::operation_cell(&store.operation));
            let cell = operation::description_cell(&store.operation);
            write_cell(doc, map, Section::OpDescription, 0, cell);
        }
        (FieldGroup::OpStaff, Mode::Operation) => {
            write_cell(doc, map, Section::OpStaff, 0, operation::staff_cell(&store.op_staff));
        }
        _ => {}
    }
}

/// Renders every group; sections missing from the layout are skipped.
pub fn render_all(doc: &mut Document, map: &RowMap, store: &FieldStore, vis: &Visibility) {
    for group in FieldGroup::ALL {
        render_group(doc, map, group, store, vis);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newline_splits_paragraphs_and_keeps_alignment() {
        let mut w = CellWriter::new();
        w.align(ParagraphAlignment::Right).plain("a\nb");
        let blocks = w.finish();
        assert_eq!(blocks.len(), 2);
        for block in &blocks {
            let Block::Paragraph(p) = block else {
                panic!("expected paragraph");
            };
            assert_eq!(p.alignment, ParagraphAlignment::Right);
        }
    }

    #[test]
    fn empty_writer_yields_empty_cell() {
        assert!(CellWriter::new().finish().is_empty());
    }

    #[test]
    fn rich_first_paragraph_continues_current_line() {
        let mut w = CellWriter::new();
        w.bold("ДИАГНОЗ: ").plain(" ");
        w.rich("<p>Отит</p><ul><li>один</li></ul>");
        let blocks = w.finish();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].plain_text(), "ДИАГНОЗ:  Отит");
        assert!(matches!(blocks[1], Block::List(_)));
    }

    #[test]
    fn rich_list_at_start_has_no_leading_blank_line() {
        let mut w = CellWriter::new();
        w.rich("<ul><li>a</li><li>b</li></ul>");
        let blocks = w.finish();
        assert_eq!(blocks.len(), 1);
        assert!(matches!(blocks[0], Block::List(_)));
    }

    #[test]
    fn render_all_fills_the_default_examination_layout() {
        let vis = Visibility::default();
        let (mut doc, map) =
            crate::report::layout::build(&vis, &crate::report::layout::BuildOptions::default());
        let store = FieldStore::default();
        render_all(&mut doc, &map, &store, &vis);
        let objective = doc
            .cell(map.cell(Section::Objective, 0, 0).unwrap())
            .unwrap()
            .plain_text();
        assert!(objective.starts_with("ОБЪЕКТИВНЫЙ ОСМОТР"));
        let signature = doc
            .cell(map.cell(Section::Signature, 0, 0).unwrap())
            .unwrap()
            .plain_text();
        assert!(signature.starts_with("Врач-оториноларинголог _________________"));
    }

    fn filled_store() -> FieldStore {
        use crate::report::fields::{
            DiagnosisField, RecommendationsField, RepeatField, SickLeaveField, SurdologyField,
        };

        let mut store = FieldStore::default();
        store.indicators.ad = "130/80".to_string();
        store.complaints.complaints = "боль в ухе".to_string();
        store.complaints.no_card = true;
        store.surdology = SurdologyField {
            enabled: true,
            sr: "6".to_string(),
            ..SurdologyField::default()
        };
        store.repeat = RepeatField {
            enabled: true,
            date: String::new(),
            time: "10:00".to_string(),
        };
        store.sick_leave = SickLeaveField {
            issued: true,
            number: "5".to_string(),
            date_from: "01.01.2025".to_string(),
            date_to: "03.01.2025".to_string(),
            ..SickLeaveField::default()
        };
        for mode in [Mode::Examination, Mode::Operation] {
            *store.diagnosis.get_mut(mode) = DiagnosisField {
                text: "<p>Острый <b>отит</b></p><ul><li>справа</li></ul>".to_string(),
                ..DiagnosisField::default()
            };
            *store.recommendations.get_mut(mode) = RecommendationsField {
                text: "<p>капли</p>".to_string(),
                ..RecommendationsField::default()
            };
        }
        store.op_staff.operator = "Петров".to_string();
        store
    }

    #[test]
    fn rendering_a_group_again_leaves_the_document_unchanged() {
        let store = filled_store();
        let shown = Visibility {
            surdology: true,
            repeat: true,
            sick_leave: true,
            ..Visibility::default()
        };
        let layouts = [
            shown,
            Visibility {
                split_layout: true,
                ..shown
            },
            Visibility {
                operation_mode: true,
                ..shown
            },
        ];
        for vis in layouts {
            let (mut doc, map) =
                crate::report::layout::build(&vis, &crate::report::layout::BuildOptions::default());
            render_all(&mut doc, &map, &store, &vis);
            let first = doc.clone();
            for group in FieldGroup::ALL {
                render_group(&mut doc, &map, group, &store, &vis);
                assert_eq!(doc, first, "{group:?} in {vis:?}");
            }
            render_all(&mut doc, &map, &store, &vis);
            assert_eq!(doc, first);
        }
    }
}
