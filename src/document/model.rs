use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type DocumentModel = Document;

pub const DEFAULT_FONT_FAMILY: &str = "Times New Roman";
pub const DEFAULT_FONT_SIZE_PT: f32 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Document {
    pub metadata: DocumentMetadata,
    pub content: Vec<Block>,
    pub dirty: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub created: Option<DateTime<Utc>>,
    pub page_size: PageSize,
    pub margins: Margins,
    pub default_font_family: String,
    pub default_font_size: f32,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            author: String::new(),
            created: None,
            page_size: PageSize::A4,
            margins: Margins::default(),
            default_font_family: DEFAULT_FONT_FAMILY.to_string(),
            default_font_size: DEFAULT_FONT_SIZE_PT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    List(List),
}

impl Block {
    /// Plain text of the block, one line per paragraph or list item.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Paragraph(p) => p.text(),
            Block::List(list) => list
                .items
                .iter()
                .map(ListItem::text)
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Table(table) => table
                .rows
                .iter()
                .map(|row| {
                    row.cells
                        .iter()
                        .filter(|c| !c.is_covered())
                        .map(TableCell::plain_text)
                        .collect::<Vec<_>>()
                        .join("\t")
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn top_margin(&self) -> f32 {
        match self {
            Block::Paragraph(p) => p.top_margin,
            Block::Table(t) => t.rows.first().map(|r| r.top_margin).unwrap_or(0.0),
            Block::List(l) => l.top_margin,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub alignment: ParagraphAlignment,
    pub spacing: ParagraphSpacing,
    pub indent: Indent,
    /// Offset pushed above the paragraph by pagination, in px.
    pub top_margin: f32,
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        let mut p = Self::new();
        p.push(Run::plain(text));
        p
    }

    pub fn with_alignment(mut self, alignment: ParagraphAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_run(mut self, run: Run) -> Self {
        self.push(run);
        self
    }

    /// Appends a run, merging with the previous one when the styles match.
    pub fn push(&mut self, run: Run) {
        if run.text.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut()
            && last.style == run.style
        {
            last.text.push_str(run.text.as_str());
            return;
        }
        self.runs.push(run);
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.runs.iter().map(|r| r.text.chars().count()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

impl Run {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle::default(),
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: RunStyle {
                bold: true,
                ..RunStyle::default()
            },
        }
    }

    pub fn styled(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RunStyle {
    pub font_family: Option<String>,
    /// Point size; `None` inherits the document default.
    pub font_size: Option<f32>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl RunStyle {
    pub fn sized(size: f32) -> Self {
        Self {
            font_size: Some(size),
            ..Self::default()
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Table {
    pub rows: Vec<TableRow>,
    /// Column widths as percentages of the content width.
    pub column_widths: Vec<f32>,
    pub borders: bool,
    pub cell_padding: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    /// Offset pushed above the row by pagination, in px.
    pub top_margin: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TableCell {
    pub blocks: Vec<Block>,
    pub rowspan: u16,
    pub colspan: u16,
}

impl Default for TableCell {
    fn default() -> Self {
        Self {
            blocks: Vec::new(),
            rowspan: 1,
            colspan: 1,
        }
    }
}

impl TableCell {
    pub fn is_covered(&self) -> bool {
        self.rowspan == 0 || self.colspan == 0
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }
}

impl Table {
    pub fn new(rows: usize, cols: usize, column_widths: Vec<f32>) -> Self {
        Self {
            rows: (0..rows)
                .map(|_| TableRow {
                    cells: (0..cols).map(|_| TableCell::default()).collect(),
                    top_margin: 0.0,
                })
                .collect(),
            column_widths,
            borders: true,
            cell_padding: 2.0,
        }
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map(|r| r.cells.len()).unwrap_or(0)
    }

    /// Merges a rectangle of cells into its top-left anchor. Covered cells keep
    /// zero spans and lose their content.
    pub fn merge(&mut self, row: usize, col: usize, num_rows: usize, num_cols: usize) -> bool {
        if num_rows == 0 || num_cols == 0 {
            return false;
        }
        if row + num_rows > self.rows.len() || col + num_cols > self.column_count() {
            return false;
        }
        for r in row..row + num_rows {
            for c in col..col + num_cols {
                let cell = &mut self.rows[r].cells[c];
                if r == row && c == col {
                    cell.rowspan = num_rows as u16;
                    cell.colspan = num_cols as u16;
                } else {
                    cell.blocks.clear();
                    cell.rowspan = if r == row { 1 } else { 0 };
                    cell.colspan = if c == col { 1 } else { 0 };
                }
            }
        }
        true
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row)?.cells.get(col).filter(|c| !c.is_covered())
    }

    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows
            .get_mut(row)?
            .cells
            .get_mut(col)
            .filter(|c| !c.is_covered())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct List {
    pub list_type: ListType,
    pub items: Vec<ListItem>,
    pub top_margin: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ListItem {
    pub runs: Vec<Run>,
}

impl ListItem {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ListType {
    #[default]
    Bullet,
    Numbered,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum PageSize {
    A4,
    Custom { width: f32, height: f32 },
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

impl PageSize {
    pub const A4_WIDTH_PX: f32 = 794.0;

    /// Page dimensions in px at 96 DPI. A4 height is truncated the same way the
    /// on-screen page is.
    pub fn dimensions_px(self) -> (f32, f32) {
        match self {
            Self::A4 => (
                Self::A4_WIDTH_PX,
                (Self::A4_WIDTH_PX * 1.414).trunc(),
            ),
            Self::Custom { width, height } => (width, height),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub enum ParagraphAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ParagraphSpacing {
    pub before: f32,
    pub after: f32,
    /// Fixed line height in px; `None` uses the font's natural height.
    pub line: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Indent {
    pub left: f32,
    pub first_line: f32,
}

/// Page margins in px.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

pub const MM_TO_PX: f32 = 3.7795;

impl Margins {
    pub fn from_mm(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left: (left * MM_TO_PX).trunc(),
            top: (top * MM_TO_PX).trunc(),
            right: (right * MM_TO_PX).trunc(),
            bottom: (bottom * MM_TO_PX).trunc(),
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::from_mm(25.0, 12.7, 12.7, 12.7)
    }
}

/// Location of a table cell: `block` indexes `Document::content`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub block: usize,
    pub row: usize,
    pub col: usize,
}

impl Document {
    pub fn table(&self, block: usize) -> Option<&Table> {
        match self.content.get(block)? {
            Block::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn table_mut(&mut self, block: usize) -> Option<&mut Table> {
        match self.content.get_mut(block)? {
            Block::Table(t) => Some(t),
            _ => None,
        }
    }

    pub fn cell(&self, at: CellRef) -> Option<&TableCell> {
        self.table(at.block)?.cell(at.row, at.col)
    }

    pub fn cell_mut(&mut self, at: CellRef) -> Option<&mut TableCell> {
        self.table_mut(at.block)?.cell_mut(at.row, at.col)
    }

    pub fn page_dimensions(&self) -> (f32, f32) {
        self.metadata.page_size.dimensions_px()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn margins_match_screen_geometry() {
        let m = Margins::default();
        assert_eq!(m.left, 94.0);
        assert_eq!(m.top, 47.0);
        assert_eq!(m.bottom, 47.0);
        assert_eq!(PageSize::A4.dimensions_px(), (794.0, 1122.0));
    }

    #[test]
    fn merge_marks_covered_cells() {
        let mut table = Table::new(3, 2, vec![21.0, 79.0]);
        assert!(table.merge(1, 1, 2, 1));
        assert_eq!(table.rows[1].cells[1].rowspan, 2);
        assert!(table.rows[2].cells[1].is_covered());
        assert!(table.cell(2, 1).is_none());
        assert!(table.cell(2, 0).is_some());

        assert!(table.merge(0, 0, 1, 2));
        assert_eq!(table.rows[0].cells[0].colspan, 2);
        assert!(table.cell(0, 1).is_none());
    }

    #[test]
    fn merge_rejects_out_of_bounds() {
        let mut table = Table::new(1, 2, vec![50.0, 50.0]);
        assert!(!table.merge(0, 1, 2, 1));
        assert!(!table.merge(0, 0, 1, 3));
    }

    #[test]
    fn push_coalesces_equal_styles() {
        let mut p = Paragraph::new();
        p.push(Run::plain("АД: "));
        p.push(Run::plain("120/80"));
        p.push(Run::bold("!"));
        assert_eq!(p.runs.len(), 2);
        assert_eq!(p.text(), "АД: 120/80!");
    }

    #[test]
    fn cell_text_joins_lines() {
        let mut cell = TableCell::default();
        cell.push_paragraph(Paragraph::plain("one"));
        cell.blocks.push(Block::List(List {
            list_type: ListType::Numbered,
            items: vec![
                ListItem {
                    runs: vec![Run::plain("two")],
                },
                ListItem {
                    runs: vec![Run::plain("three")],
                },
            ],
            top_margin: 0.0,
        }));
        assert_eq!(cell.plain_text(), "one\ntwo\nthree");
    }
}
