use crate::document::model::{
    Block, Document, List, ListType, Paragraph, ParagraphAlignment, RunStyle, Table,
};

const PX_PER_PT: f32 = 96.0 / 72.0;
const LIST_INDENT_PX: f32 = 20.0;

/// Text measurement hook for line fitting. Widths and heights are in px.
pub trait TextMeasurer {
    fn char_width(&self, ch: char, font_px: f32, style: &RunStyle) -> f32;

    fn text_width(&self, text: &str, font_px: f32, style: &RunStyle) -> f32 {
        text.chars().map(|ch| self.char_width(ch, font_px, style)).sum()
    }

    fn line_height(&self, font_px: f32) -> f32 {
        (font_px * 1.2).ceil()
    }
}

/// Character-class widths approximating a Times-like serif face.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxMetrics;

impl TextMeasurer for ApproxMetrics {
    fn char_width(&self, ch: char, font_px: f32, style: &RunStyle) -> f32 {
        let em = match ch {
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => 0.0,
            ' ' | '\u{00A0}' => 0.25,
            'i' | 'l' | 'j' | '.' | ',' | ';' | ':' | '\'' | '!' | '|' => 0.28,
            'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.33,
            'm' | 'w' | 'M' | 'W' | 'Ш' | 'Щ' | 'Ж' | 'Ю' | 'ш' | 'щ' | 'ж' | 'ю' | 'м' => 0.78,
            '_' | '№' => 0.5,
            c if c.is_ascii_digit() => 0.5,
            c if c.is_uppercase() => 0.68,
            _ => 0.47,
        };
        let weight = if style.bold { 1.05 } else { 1.0 };
        em * font_px * weight
    }
}

pub fn pt_to_px(pt: f32) -> f32 {
    pt * PX_PER_PT
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub text: String,
    pub style: RunStyle,
    pub font_px: f32,
    pub x: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineBox {
    pub fragments: Vec<Fragment>,
    pub height: f32,
    /// Distance from the top of the line to the text baseline.
    pub baseline: f32,
}

/// A laid-out line positioned in document coordinates (px, y grows downwards).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f32,
    pub y: f32,
    pub line: LineBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacedDocument {
    pub lines: Vec<PlacedLine>,
    pub cells: Vec<PlacedRect>,
    pub height: f32,
}

pub struct TextLayout<'m> {
    measurer: &'m dyn TextMeasurer,
    base_size_pt: f32,
}

impl<'m> TextLayout<'m> {
    pub fn new(measurer: &'m dyn TextMeasurer, base_size_pt: f32) -> Self {
        Self {
            measurer,
            base_size_pt,
        }
    }

    fn font_px(&self, style: &RunStyle) -> f32 {
        pt_to_px(style.font_size.unwrap_or(self.base_size_pt))
    }

    pub fn paragraph_lines(&self, paragraph: &Paragraph, width: f32) -> Vec<LineBox> {
        let avail = (width - paragraph.indent.left).max(1.0);
        let mut lines = self.wrap_runs(
            paragraph.runs.iter().map(|r| (r.text.as_str(), &r.style)),
            avail,
            paragraph.indent.first_line,
            paragraph.spacing.line,
        );
        for line in &mut lines {
            let used = line
                .fragments
                .last()
                .map(|f| f.x + f.width)
                .unwrap_or(0.0);
            let shift = match paragraph.alignment {
                ParagraphAlignment::Center => ((avail - used) / 2.0).max(0.0),
                ParagraphAlignment::Right => (avail - used).max(0.0),
                ParagraphAlignment::Left | ParagraphAlignment::Justify => 0.0,
            };
            for fragment in &mut line.fragments {
                fragment.x += paragraph.indent.left + shift;
            }
        }
        lines
    }

    pub fn paragraph_height(&self, paragraph: &Paragraph, width: f32) -> f32 {
        paragraph.spacing.before
            + self
                .paragraph_lines(paragraph, width)
                .iter()
                .map(|l| l.height)
                .sum::<f32>()
            + paragraph.spacing.after
    }

    pub fn list_lines(&self, list: &List, width: f32) -> Vec<LineBox> {
        let mut out = Vec::new();
        let avail = (width - LIST_INDENT_PX).max(1.0);
        for (idx, item) in list.items.iter().enumerate() {
            let marker = match list.list_type {
                ListType::Bullet => "\u{2022}".to_string(),
                ListType::Numbered => format!("{}.", idx + 1),
            };
            let mut lines = self.wrap_runs(
                item.runs.iter().map(|r| (r.text.as_str(), &r.style)),
                avail,
                0.0,
                None,
            );
            for line in &mut lines {
                for fragment in &mut line.fragments {
                    fragment.x += LIST_INDENT_PX;
                }
            }
            if let Some(first) = lines.first_mut() {
                let style = RunStyle::default();
                let font_px = self.font_px(&style);
                let marker_width = self.measurer.text_width(marker.as_str(), font_px, &style);
                first.fragments.insert(
                    0,
                    Fragment {
                        text: marker,
                        style,
                        font_px,
                        x: (LIST_INDENT_PX - marker_width - 4.0).max(0.0),
                        width: marker_width,
                    },
                );
            }
            out.extend(lines);
        }
        out
    }

    pub fn block_lines(&self, block: &Block, width: f32) -> Vec<LineBox> {
        match block {
            Block::Paragraph(p) => self.paragraph_lines(p, width),
            Block::List(l) => self.list_lines(l, width),
            Block::Table(_) => Vec::new(),
        }
    }

    /// Height of a sequence of cell blocks; an empty cell still holds one line.
    pub fn blocks_height(&self, blocks: &[Block], width: f32) -> f32 {
        if blocks.is_empty() {
            return self.measurer.line_height(pt_to_px(self.base_size_pt));
        }
        blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph(p) => self.paragraph_height(p, width),
                Block::List(l) => self.list_lines(l, width).iter().map(|l| l.height).sum(),
                Block::Table(t) => self.table_row_heights(t, width).iter().sum(),
            })
            .sum()
    }

    pub fn column_geometry(&self, table: &Table, width: f32) -> (Vec<f32>, Vec<f32>) {
        let cols = table.column_count();
        let total: f32 = table.column_widths.iter().take(cols).sum();
        let mut xs = Vec::with_capacity(cols);
        let mut ws = Vec::with_capacity(cols);
        let mut x = 0.0;
        for c in 0..cols {
            let pct = table
                .column_widths
                .get(c)
                .copied()
                .unwrap_or(100.0 / cols.max(1) as f32);
            let w = if total > 0.0 {
                width * pct / total.max(100.0)
            } else {
                width / cols.max(1) as f32
            };
            xs.push(x);
            ws.push(w);
            x += w;
        }
        (xs, ws)
    }

    fn span_width(widths: &[f32], col: usize, colspan: u16) -> f32 {
        widths.iter().skip(col).take(colspan.max(1) as usize).sum()
    }

    /// Row heights of a table; a rowspan cell's overflow lands on its last row.
    pub fn table_row_heights(&self, table: &Table, width: f32) -> Vec<f32> {
        let (_, widths) = self.column_geometry(table, width);
        let pad = table.cell_padding;
        let mut heights = vec![0.0f32; table.rows.len()];
        let mut spanning = Vec::new();

        for (r, row) in table.rows.iter().enumerate() {
            for (c, cell) in row.cells.iter().enumerate() {
                if cell.is_covered() {
                    continue;
                }
                let inner = (Self::span_width(&widths, c, cell.colspan) - 2.0 * pad).max(1.0);
                let needed = self.blocks_height(&cell.blocks, inner) + 2.0 * pad;
                if cell.rowspan > 1 {
                    spanning.push((r, cell.rowspan as usize, needed));
                } else {
                    heights[r] = heights[r].max(needed);
                }
            }
        }

        for (r, span, needed) in spanning {
            let last = (r + span).min(heights.len()) - 1;
            let have: f32 = heights[r..=last].iter().sum();
            if needed > have {
                heights[last] += needed - have;
            }
        }
        heights
    }

    /// Positions every line of the document, honouring pagination offsets.
    pub fn place_document(&self, doc: &Document) -> PlacedDocument {
        let (page_w, _) = doc.page_dimensions();
        let margins = doc.metadata.margins;
        let width = page_w - margins.left - margins.right;
        let mut placed = PlacedDocument::default();
        let mut y = margins.top;

        for block in &doc.content {
            match block {
                Block::Paragraph(p) => {
                    y += p.top_margin + p.spacing.before;
                    for line in self.paragraph_lines(p, width) {
                        let h = line.height;
                        placed.lines.push(PlacedLine {
                            x: margins.left,
                            y,
                            line,
                        });
                        y += h;
                    }
                    y += p.spacing.after;
                }
                Block::List(l) => {
                    y += l.top_margin;
                    for line in self.list_lines(l, width) {
                        let h = line.height;
                        placed.lines.push(PlacedLine {
                            x: margins.left,
                            y,
                            line,
                        });
                        y += h;
                    }
                }
                Block::Table(table) => {
                    y = self.place_table(table, margins.left, y, width, &mut placed);
                }
            }
        }
        placed.height = y + margins.bottom;
        placed
    }

    fn place_table(
        &self,
        table: &Table,
        left: f32,
        top: f32,
        width: f32,
        placed: &mut PlacedDocument,
    ) -> f32 {
        let (xs, widths) = self.column_geometry(table, width);
        let heights = self.table_row_heights(table, width);
        let pad = table.cell_padding;

        let mut row_tops = Vec::with_capacity(table.rows.len());
        let mut y = top;
        for (r, row) in table.rows.iter().enumerate() {
            y += row.top_margin;
            row_tops.push(y);
            y += heights.get(r).copied().unwrap_or(0.0);
        }

        for (r, row) in table.rows.iter().enumerate() {
            for (c, cell) in row.cells.iter().enumerate() {
                if cell.is_covered() {
                    continue;
                }
                let cell_x = left + xs.get(c).copied().unwrap_or(0.0);
                let cell_w = Self::span_width(&widths, c, cell.colspan);
                let last = (r + cell.rowspan.max(1) as usize).min(table.rows.len()) - 1;
                let cell_bottom = row_tops[last] + heights.get(last).copied().unwrap_or(0.0);
                placed.cells.push(PlacedRect {
                    x: cell_x,
                    y: row_tops[r],
                    width: cell_w,
                    height: cell_bottom - row_tops[r],
                });

                let inner = (cell_w - 2.0 * pad).max(1.0);
                let mut line_y = row_tops[r] + pad;
                for block in &cell.blocks {
                    if let Block::Paragraph(p) = block {
                        line_y += p.spacing.before;
                    }
                    for line in self.block_lines(block, inner) {
                        let h = line.height;
                        placed.lines.push(PlacedLine {
                            x: cell_x + pad,
                            y: line_y,
                            line,
                        });
                        line_y += h;
                    }
                    if let Block::Paragraph(p) = block {
                        line_y += p.spacing.after;
                    }
                }
            }
        }
        y
    }

    fn wrap_runs<'a>(
        &self,
        runs: impl Iterator<Item = (&'a str, &'a RunStyle)>,
        width: f32,
        first_indent: f32,
        fixed_line: Option<f32>,
    ) -> Vec<LineBox> {
        let mut lines = Vec::new();
        let mut current = LineBuilder::new(first_indent);

        for (text, style) in runs {
            let font_px = self.font_px(style);
            for piece in split_keep_spaces(text) {
                if piece == "\n" {
                    lines.push(current.finish(self.measurer, fixed_line, self.base_px()));
                    current = LineBuilder::new(0.0);
                    continue;
                }
                let piece_w = self.measurer.text_width(piece, font_px, style);
                let is_space = piece.chars().all(char::is_whitespace);
                if !is_space && current.cursor + piece_w > width && current.has_content() {
                    lines.push(current.finish(self.measurer, fixed_line, self.base_px()));
                    current = LineBuilder::new(0.0);
                }
                if !is_space && piece_w > width - current.cursor {
                    // A single word wider than the line is broken by characters.
                    for ch in piece.chars() {
                        let cw = self.measurer.char_width(ch, font_px, style);
                        if current.cursor + cw > width && current.has_content() {
                            lines.push(current.finish(self.measurer, fixed_line, self.base_px()));
                            current = LineBuilder::new(0.0);
                        }
                        current.push(ch.encode_utf8(&mut [0; 4]), style, font_px, cw);
                    }
                    continue;
                }
                current.push(piece, style, font_px, piece_w);
            }
        }
        lines.push(current.finish(self.measurer, fixed_line, self.base_px()));
        lines
    }

    fn base_px(&self) -> f32 {
        pt_to_px(self.base_size_pt)
    }
}

struct LineBuilder {
    fragments: Vec<Fragment>,
    cursor: f32,
    max_font_px: f32,
}

impl LineBuilder {
    fn new(indent: f32) -> Self {
        Self {
            fragments: Vec::new(),
            cursor: indent,
            max_font_px: 0.0,
        }
    }

    fn has_content(&self) -> bool {
        self.fragments.iter().any(|f| !f.text.trim().is_empty())
    }

    fn push(&mut self, text: &str, style: &RunStyle, font_px: f32, width: f32) {
        self.max_font_px = self.max_font_px.max(font_px);
        if let Some(last) = self.fragments.last_mut()
            && last.style == *style
            && last.font_px == font_px
        {
            last.text.push_str(text);
            last.width += width;
        } else {
            self.fragments.push(Fragment {
                text: text.to_string(),
                style: style.clone(),
                font_px,
                x: self.cursor,
                width,
            });
        }
        self.cursor += width;
    }

    fn finish(self, measurer: &dyn TextMeasurer, fixed_line: Option<f32>, base_px: f32) -> LineBox {
        let font_px = if self.max_font_px > 0.0 {
            self.max_font_px
        } else {
            base_px
        };
        let height = fixed_line.unwrap_or_else(|| measurer.line_height(font_px));
        LineBox {
            fragments: self.fragments,
            height,
            baseline: (height * 0.8).min(height),
        }
    }
}

/// Splits text into words, runs of spaces and explicit newlines.
fn split_keep_spaces(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut prev_space: Option<bool> = None;
    for (idx, ch) in text.char_indices() {
        if ch == '\n' {
            if start < idx {
                out.push(&text[start..idx]);
            }
            out.push("\n");
            start = idx + 1;
            prev_space = None;
            continue;
        }
        let space = ch == ' ';
        if let Some(prev) = prev_space
            && prev != space
        {
            out.push(&text[start..idx]);
            start = idx;
        }
        prev_space = Some(space);
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Run, Table};

    fn layout() -> TextLayout<'static> {
        static METRICS: ApproxMetrics = ApproxMetrics;
        TextLayout::new(&METRICS, 10.0)
    }

    #[test]
    fn splits_words_and_spaces() {
        assert_eq!(
            split_keep_spaces("АД:  120\nок"),
            vec!["АД:", "  ", "120", "\n", "ок"]
        );
    }

    #[test]
    fn empty_paragraph_has_one_line() {
        let lines = layout().paragraph_lines(&Paragraph::new(), 300.0);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].height > 0.0);
    }

    #[test]
    fn long_text_wraps_to_width() {
        let text = "слово ".repeat(60);
        let p = Paragraph::plain(text);
        let lines = layout().paragraph_lines(&p, 200.0);
        assert!(lines.len() > 3);
        for line in &lines {
            let visible = line
                .fragments
                .iter()
                .filter(|f| !f.text.trim().is_empty())
                .map(|f| f.x + f.width)
                .fold(0.0f32, f32::max);
            assert!(visible <= 200.0 + 0.01);
        }
    }

    #[test]
    fn right_alignment_shifts_fragments() {
        let p = Paragraph::plain("x").with_alignment(ParagraphAlignment::Right);
        let lines = layout().paragraph_lines(&p, 300.0);
        assert!(lines[0].fragments[0].x > 250.0);
    }

    #[test]
    fn fixed_line_height_wins() {
        let mut p = Paragraph::new();
        p.spacing.line = Some(1.0);
        assert_eq!(layout().paragraph_height(&p, 300.0), 1.0);
    }

    #[test]
    fn rowspan_overflow_goes_to_last_row() {
        let mut table = Table::new(2, 2, vec![21.0, 79.0]);
        table.merge(0, 1, 2, 1);
        if let Some(cell) = table.cell_mut(0, 1) {
            for i in 0..10 {
                cell.push_paragraph(Paragraph::plain(format!("строка {i}")));
            }
        }
        let l = layout();
        let heights = l.table_row_heights(&table, 600.0);
        let single = l.blocks_height(&[], 100.0) + 2.0 * table.cell_padding;
        assert_eq!(heights[0], single);
        assert!(heights[1] > heights[0] * 5.0);
    }

    #[test]
    fn bold_runs_measure_wider() {
        let m = ApproxMetrics;
        let plain = m.text_width("Жалобы", 13.0, &RunStyle::default());
        let bold = m.text_width(
            "Жалобы",
            13.0,
            &Run::bold("").style,
        );
        assert!(bold > plain);
    }
}
