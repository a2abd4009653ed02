use std::collections::HashMap;

use crate::document::model::{
    Block, CellRef, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE_PT, Document, DocumentMetadata,
    Margins, Paragraph, Table,
};
use crate::report::Mode;

pub const COLUMN_WIDTHS: [f32; 2] = [21.0, 79.0];

/// Logical sections of a report, across both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Header,
    Indicators,
    Consent,
    Objective,
    Surdology,
    Diagnosis,
    Recommendations,
    Repeat,
    SickLeave,
    Signature,
    Operation,
    OpDescription,
    OpStaff,
    OpRecommendations,
    OpExtra,
}

impl Section {
    pub const ALL: [Section; 15] = [
        Section::Header,
        Section::Indicators,
        Section::Consent,
        Section::Objective,
        Section::Surdology,
        Section::Diagnosis,
        Section::Recommendations,
        Section::Repeat,
        Section::SickLeave,
        Section::Signature,
        Section::Operation,
        Section::OpDescription,
        Section::OpStaff,
        Section::OpRecommendations,
        Section::OpExtra,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionSlot {
    Hidden,
    /// `block` is the table's index in the document content.
    Row { block: usize, row: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowMap {
    slots: HashMap<Section, SectionSlot>,
}

impl RowMap {
    pub fn slot(&self, section: Section) -> SectionSlot {
        self.slots
            .get(&section)
            .copied()
            .unwrap_or(SectionSlot::Hidden)
    }

    /// Row of the section in its table, or -1 when it is not laid out.
    pub fn row_index(&self, section: Section) -> i32 {
        match self.slot(section) {
            SectionSlot::Hidden => -1,
            SectionSlot::Row { row, .. } => row as i32,
        }
    }

    pub fn is_visible(&self, section: Section) -> bool {
        self.slot(section) != SectionSlot::Hidden
    }

    pub fn cell(&self, section: Section, row: usize, col: usize) -> Option<CellRef> {
        match self.slot(section) {
            SectionSlot::Hidden => None,
            SectionSlot::Row { block, row: start } => Some(CellRef {
                block,
                row: start + row,
                col,
            }),
        }
    }

    fn place(&mut self, section: Section, block: usize, row: usize) {
        self.slots.insert(section, SectionSlot::Row { block, row });
    }
}

/// Flags that decide the document's structure. Changing any of them rebuilds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub operation_mode: bool,
    pub surdology: bool,
    pub repeat: bool,
    pub sick_leave: bool,
    pub signature: bool,
    pub split_layout: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            operation_mode: false,
            surdology: false,
            repeat: false,
            sick_leave: false,
            signature: true,
            split_layout: false,
        }
    }
}

impl Visibility {
    pub fn mode(&self) -> Mode {
        if self.operation_mode {
            Mode::Operation
        } else {
            Mode::Examination
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    pub borders: bool,
    pub margins: Margins,
    pub font_family: String,
    pub font_size: f32,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            borders: true,
            margins: Margins::default(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            font_size: DEFAULT_FONT_SIZE_PT,
        }
    }
}

/// Builds the empty skeleton for a configuration and records where every section lives.
pub fn build(visibility: &Visibility, options: &BuildOptions) -> (Document, RowMap) {
    let mut document = Document {
        metadata: DocumentMetadata {
            margins: options.margins,
            default_font_family: options.font_family.clone(),
            default_font_size: options.font_size,
            ..DocumentMetadata::default()
        },
        ..Document::default()
    };

    let map = if visibility.operation_mode {
        build_operation(&mut document, visibility, options)
    } else if visibility.split_layout {
        build_split(&mut document, visibility, options)
    } else {
        build_single(&mut document, visibility, options)
    };

    log::debug!(
        "built {:?} skeleton: {} blocks, split={}",
        visibility.mode(),
        document.content.len(),
        visibility.split_layout && !visibility.operation_mode
    );
    (document, map)
}

fn new_table(rows: usize, options: &BuildOptions) -> Table {
    let mut table = Table::new(rows, 2, COLUMN_WIDTHS.to_vec());
    table.borders = options.borders;
    table
}

/// One line of 1pt height between split tables.
pub fn spacer_paragraph() -> Paragraph {
    let mut p = Paragraph::new();
    p.spacing.line = Some(1.0);
    p
}

fn build_single(document: &mut Document, vis: &Visibility, options: &BuildOptions) -> RowMap {
    let mut map = RowMap::default();
    let mut order = vec![
        Section::Header,
        Section::Indicators,
        Section::Consent,
        Section::Objective,
    ];
    if vis.surdology {
        order.push(Section::Surdology);
    }
    order.push(Section::Diagnosis);
    order.push(Section::Recommendations);
    if vis.repeat {
        order.push(Section::Repeat);
    }
    if vis.sick_leave {
        order.push(Section::SickLeave);
    }
    order.push(Section::Signature);

    let mut table = new_table(order.len(), options);
    for (row, section) in order.iter().enumerate() {
        map.place(*section, 0, row);
        match section {
            Section::Header | Section::Indicators | Section::Repeat => {}
            Section::Recommendations => {
                if vis.repeat {
                    table.merge(row, 1, 2, 1);
                }
            }
            _ => {
                table.merge(row, 0, 1, 2);
            }
        }
    }
    document.content.push(Block::Table(table));
    document.content.push(Block::Paragraph(Paragraph::new()));
    map
}

fn build_split(document: &mut Document, vis: &Visibility, options: &BuildOptions) -> RowMap {
    let mut map = RowMap::default();
    let push = |document: &mut Document, table: Table| -> usize {
        let index = document.content.len();
        document.content.push(Block::Table(table));
        document.content.push(Block::Paragraph(spacer_paragraph()));
        index
    };
    let merged = |options: &BuildOptions| {
        let mut table = new_table(1, options);
        table.merge(0, 0, 1, 2);
        table
    };

    let block = push(document, new_table(1, options));
    map.place(Section::Header, block, 0);
    let block = push(document, new_table(1, options));
    map.place(Section::Indicators, block, 0);
    let block = push(document, merged(options));
    map.place(Section::Consent, block, 0);
    let block = push(document, merged(options));
    map.place(Section::Objective, block, 0);
    if vis.surdology {
        let block = push(document, merged(options));
        map.place(Section::Surdology, block, 0);
    }
    let block = push(document, merged(options));
    map.place(Section::Diagnosis, block, 0);

    let recs = if vis.repeat {
        let mut table = new_table(2, options);
        table.merge(0, 1, 2, 1);
        table
    } else {
        new_table(1, options)
    };
    let block = push(document, recs);
    map.place(Section::Recommendations, block, 0);
    if vis.repeat {
        map.place(Section::Repeat, block, 1);
    }

    if vis.sick_leave {
        let block = push(document, merged(options));
        map.place(Section::SickLeave, block, 0);
    }
    let block = push(document, merged(options));
    map.place(Section::Signature, block, 0);
    map
}

fn build_operation(document: &mut Document, vis: &Visibility, options: &BuildOptions) -> RowMap {
    let mut map = RowMap::default();
    let mut order = vec![
        Section::Header,
        Section::Operation,
        Section::OpDescription,
        Section::Diagnosis,
        Section::OpStaff,
        Section::OpRecommendations,
    ];
    if vis.repeat || vis.sick_leave {
        order.push(Section::OpExtra);
    }
    if vis.signature {
        order.push(Section::Signature);
    }

    let mut table = new_table(order.len(), options);
    for (row, section) in order.iter().enumerate() {
        map.place(*section, 0, row);
        if *section != Section::Header {
            table.merge(row, 0, 1, 2);
        }
    }
    document.content.push(Block::Table(table));
    document.content.push(Block::Paragraph(Paragraph::new()));
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_layout_rows_follow_canonical_order() {
        let vis = Visibility::default();
        let (doc, map) = build(&vis, &BuildOptions::default());
        assert_eq!(map.row_index(Section::Header), 0);
        assert_eq!(map.row_index(Section::Objective), 3);
        assert_eq!(map.row_index(Section::Surdology), -1);
        assert_eq!(map.row_index(Section::Diagnosis), 4);
        assert_eq!(map.row_index(Section::Signature), 6);
        assert_eq!(map.row_index(Section::Operation), -1);
        let table = doc.table(0).unwrap();
        assert_eq!(table.rows.len(), 7);
        assert_eq!(table.rows[3].cells[0].colspan, 2);
        assert_eq!(table.rows[0].cells[0].colspan, 1);
    }

    #[test]
    fn repeat_row_shares_recommendation_text_cell() {
        let vis = Visibility {
            repeat: true,
            sick_leave: true,
            ..Visibility::default()
        };
        let (doc, map) = build(&vis, &BuildOptions::default());
        let recs = map.row_index(Section::Recommendations) as usize;
        assert_eq!(map.row_index(Section::Repeat), recs as i32 + 1);
        let table = doc.table(0).unwrap();
        assert_eq!(table.rows[recs].cells[1].rowspan, 2);
        assert!(doc.cell(map.cell(Section::Repeat, 0, 1).unwrap()).is_none());
        assert!(doc.cell(map.cell(Section::Repeat, 0, 0).unwrap()).is_some());
        assert_eq!(map.row_index(Section::SickLeave), recs as i32 + 2);
    }

    #[test]
    fn split_layout_gives_each_section_a_table() {
        let vis = Visibility {
            split_layout: true,
            surdology: true,
            repeat: true,
            ..Visibility::default()
        };
        let (doc, map) = build(&vis, &BuildOptions::default());
        let SectionSlot::Row { block, row } = map.slot(Section::Repeat) else {
            panic!("repeat should be laid out");
        };
        assert_eq!(row, 1);
        assert_eq!(map.slot(Section::Recommendations), SectionSlot::Row { block, row: 0 });
        let tables = doc
            .content
            .iter()
            .filter(|b| matches!(b, Block::Table(_)))
            .count();
        assert_eq!(tables, 8);
        assert!(matches!(&doc.content[1], Block::Paragraph(p) if p.spacing.line == Some(1.0)));
    }

    #[test]
    fn operation_mode_ignores_split_and_hides_exam_sections() {
        let vis = Visibility {
            operation_mode: true,
            split_layout: true,
            signature: false,
            ..Visibility::default()
        };
        let (doc, map) = build(&vis, &BuildOptions::default());
        assert_eq!(map.row_index(Section::OpRecommendations), 5);
        assert_eq!(map.row_index(Section::OpExtra), -1);
        assert_eq!(map.row_index(Section::Signature), -1);
        assert_eq!(map.row_index(Section::Indicators), -1);
        assert_eq!(doc.table(0).unwrap().rows.len(), 6);
    }

    #[test]
    fn borders_follow_options() {
        let options = BuildOptions {
            borders: false,
            ..BuildOptions::default()
        };
        let (doc, _) = build(&Visibility::default(), &options);
        assert!(!doc.table(0).unwrap().borders);
    }
}
