use crate::document::model::{
    Block, CellRef, List, ListItem, ListType, Paragraph, ParagraphAlignment, Run, RunStyle,
};

/// A user edit inside one table cell. Offsets count characters within the
/// paragraph at index `paragraph` of the cell's blocks.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    InsertText {
        cell: CellRef,
        paragraph: usize,
        offset: usize,
        text: String,
    },
    DeleteText {
        cell: CellRef,
        paragraph: usize,
        start: usize,
        end: usize,
    },
    ReplaceCell {
        cell: CellRef,
        blocks: Vec<Block>,
    },
    FormatRun {
        cell: CellRef,
        paragraph: usize,
        start: usize,
        end: usize,
        patch: RunStylePatch,
    },
    ClearFormatting {
        cell: CellRef,
        paragraph: usize,
        start: usize,
        end: usize,
    },
    FormatParagraph {
        cell: CellRef,
        paragraph: usize,
        op: ParagraphFormatOp,
    },
    ReplaceParagraph {
        cell: CellRef,
        paragraph: usize,
        content: Paragraph,
    },
}

/// Style fields to overwrite on a character range; `None` leaves a field alone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunStylePatch {
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
}

impl RunStylePatch {
    fn apply(&self, style: &mut RunStyle) {
        if let Some(v) = self.bold {
            style.bold = v;
        }
        if let Some(v) = self.italic {
            style.italic = v;
        }
        if let Some(v) = self.underline {
            style.underline = v;
        }
        if let Some(family) = &self.font_family {
            style.font_family = Some(family.clone());
        }
        if let Some(size) = self.font_size {
            style.font_size = Some(size);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParagraphFormatOp {
    Alignment(ParagraphAlignment),
    /// Fixed line height in px, `None` for the natural height.
    LineSpacing(Option<f32>),
    ParagraphSpacing { before: f32, after: f32 },
    IndentDelta(f32),
    /// Turns a paragraph into a list item, retypes a list, or with `None`
    /// turns a list back into paragraphs.
    ListType(Option<ListType>),
}

impl EditCommand {
    pub fn cell(&self) -> CellRef {
        match self {
            EditCommand::InsertText { cell, .. }
            | EditCommand::DeleteText { cell, .. }
            | EditCommand::ReplaceCell { cell, .. }
            | EditCommand::FormatRun { cell, .. }
            | EditCommand::ClearFormatting { cell, .. }
            | EditCommand::FormatParagraph { cell, .. }
            | EditCommand::ReplaceParagraph { cell, .. } => *cell,
        }
    }

    /// Rough memory footprint, used for the undo budget.
    pub fn size_hint(&self) -> usize {
        match self {
            EditCommand::InsertText { text, .. } => text.len() + 32,
            EditCommand::DeleteText { .. }
            | EditCommand::ClearFormatting { .. }
            | EditCommand::FormatParagraph { .. } => 32,
            EditCommand::FormatRun { patch, .. } => {
                patch.font_family.as_ref().map_or(0, String::len) + 48
            }
            EditCommand::ReplaceCell { blocks, .. } => {
                blocks.iter().map(|b| b.plain_text().len() + 64).sum::<usize>() + 32
            }
            EditCommand::ReplaceParagraph { content, .. } => {
                content.runs.iter().map(|r| r.text.len() + 32).sum::<usize>() + 64
            }
        }
    }
}

pub fn insert_text(
    cell: CellRef,
    paragraph: usize,
    offset: usize,
    text: impl Into<String>,
) -> EditCommand {
    EditCommand::InsertText {
        cell,
        paragraph,
        offset,
        text: text.into(),
    }
}

pub fn backspace(cell: CellRef, paragraph: usize, cursor_offset: usize) -> Option<EditCommand> {
    if cursor_offset == 0 {
        return None;
    }
    Some(EditCommand::DeleteText {
        cell,
        paragraph,
        start: cursor_offset - 1,
        end: cursor_offset,
    })
}

pub fn delete_forward(cell: CellRef, paragraph: usize, cursor_offset: usize) -> EditCommand {
    EditCommand::DeleteText {
        cell,
        paragraph,
        start: cursor_offset,
        end: cursor_offset + 1,
    }
}

pub fn format_selection(
    cell: CellRef,
    paragraph: usize,
    start: usize,
    end: usize,
    patch: RunStylePatch,
) -> EditCommand {
    EditCommand::FormatRun {
        cell,
        paragraph,
        start: start.min(end),
        end: start.max(end),
        patch,
    }
}

/// Bolds the range unless every character in it is already bold.
pub fn toggle_bold(
    cell: CellRef,
    paragraph: usize,
    start: usize,
    end: usize,
    runs: &[Run],
) -> EditCommand {
    let bold = !all_selected(runs, start, end, |style| style.bold);
    format_selection(
        cell,
        paragraph,
        start,
        end,
        RunStylePatch {
            bold: Some(bold),
            ..RunStylePatch::default()
        },
    )
}

pub fn toggle_italic(
    cell: CellRef,
    paragraph: usize,
    start: usize,
    end: usize,
    runs: &[Run],
) -> EditCommand {
    let italic = !all_selected(runs, start, end, |style| style.italic);
    format_selection(
        cell,
        paragraph,
        start,
        end,
        RunStylePatch {
            italic: Some(italic),
            ..RunStylePatch::default()
        },
    )
}

pub fn set_font_size(
    cell: CellRef,
    paragraph: usize,
    start: usize,
    end: usize,
    size: f32,
) -> EditCommand {
    format_selection(
        cell,
        paragraph,
        start,
        end,
        RunStylePatch {
            font_size: Some(size.max(1.0)),
            ..RunStylePatch::default()
        },
    )
}

pub fn set_alignment(
    cell: CellRef,
    paragraph: usize,
    alignment: ParagraphAlignment,
) -> EditCommand {
    EditCommand::FormatParagraph {
        cell,
        paragraph,
        op: ParagraphFormatOp::Alignment(alignment),
    }
}

pub fn set_list_type(cell: CellRef, paragraph: usize, list_type: Option<ListType>) -> EditCommand {
    EditCommand::FormatParagraph {
        cell,
        paragraph,
        op: ParagraphFormatOp::ListType(list_type),
    }
}

pub fn set_line_spacing(cell: CellRef, paragraph: usize, line: Option<f32>) -> EditCommand {
    EditCommand::FormatParagraph {
        cell,
        paragraph,
        op: ParagraphFormatOp::LineSpacing(line.map(|l| l.max(1.0))),
    }
}

pub fn set_paragraph_spacing(
    cell: CellRef,
    paragraph: usize,
    before: f32,
    after: f32,
) -> EditCommand {
    EditCommand::FormatParagraph {
        cell,
        paragraph,
        op: ParagraphFormatOp::ParagraphSpacing {
            before: before.max(0.0),
            after: after.max(0.0),
        },
    }
}

fn all_selected(
    runs: &[Run],
    start: usize,
    end: usize,
    selector: impl Fn(&RunStyle) -> bool,
) -> bool {
    let (start, end) = (start.min(end), start.max(end));
    let mut pos = 0;
    let mut any = false;
    for run in runs {
        let len = run.text.chars().count();
        let (run_start, run_end) = (pos, pos + len);
        pos = run_end;
        if end <= run_start || start >= run_end {
            continue;
        }
        if !selector(&run.style) {
            return false;
        }
        any = true;
    }
    any
}

/// Applies `command` to the cell's blocks and returns its inverse, or `None`
/// when nothing changed.
pub fn apply_to_blocks(blocks: &mut Vec<Block>, command: &EditCommand) -> Option<EditCommand> {
    match command {
        EditCommand::InsertText {
            cell,
            paragraph,
            offset,
            text,
        } => {
            if text.is_empty() {
                return None;
            }
            let before = blocks.clone();
            let Block::Paragraph(p) = blocks.get_mut(*paragraph)? else {
                return None;
            };
            let offset = (*offset).min(p.char_len());
            insert_chars(p, offset, text);
            if text.contains('\n') {
                split_lines(blocks, *paragraph);
                return Some(EditCommand::ReplaceCell {
                    cell: *cell,
                    blocks: before,
                });
            }
            Some(EditCommand::DeleteText {
                cell: *cell,
                paragraph: *paragraph,
                start: offset,
                end: offset + text.chars().count(),
            })
        }
        EditCommand::DeleteText {
            cell,
            paragraph,
            start,
            end,
        } => {
            let Block::Paragraph(p) = blocks.get_mut(*paragraph)? else {
                return None;
            };
            let end = (*end).min(p.char_len());
            if *start >= end {
                return None;
            }
            let removed = remove_chars(p, *start, end);
            Some(EditCommand::InsertText {
                cell: *cell,
                paragraph: *paragraph,
                offset: *start,
                text: removed,
            })
        }
        EditCommand::ReplaceCell { cell, blocks: next } => {
            if blocks == next {
                return None;
            }
            let previous = std::mem::replace(blocks, next.clone());
            Some(EditCommand::ReplaceCell {
                cell: *cell,
                blocks: previous,
            })
        }
        EditCommand::FormatRun {
            cell,
            paragraph,
            start,
            end,
            patch,
        } => restyle(blocks, *cell, *paragraph, *start, *end, |style| patch.apply(style)),
        EditCommand::ClearFormatting {
            cell,
            paragraph,
            start,
            end,
        } => restyle(blocks, *cell, *paragraph, *start, *end, |style| {
            *style = RunStyle::default()
        }),
        EditCommand::FormatParagraph {
            cell,
            paragraph,
            op: ParagraphFormatOp::ListType(list_type),
        } => {
            let before = blocks.clone();
            set_list(blocks, *paragraph, *list_type)?;
            Some(EditCommand::ReplaceCell {
                cell: *cell,
                blocks: before,
            })
        }
        EditCommand::FormatParagraph {
            cell,
            paragraph,
            op,
        } => {
            let Block::Paragraph(p) = blocks.get_mut(*paragraph)? else {
                return None;
            };
            let old = p.clone();
            match op {
                ParagraphFormatOp::Alignment(alignment) => p.alignment = *alignment,
                ParagraphFormatOp::LineSpacing(line) => p.spacing.line = *line,
                ParagraphFormatOp::ParagraphSpacing { before, after } => {
                    p.spacing.before = *before;
                    p.spacing.after = *after;
                }
                ParagraphFormatOp::IndentDelta(delta) => {
                    p.indent.left = (p.indent.left + delta).max(0.0);
                }
                ParagraphFormatOp::ListType(_) => {}
            }
            if *p == old {
                return None;
            }
            Some(EditCommand::ReplaceParagraph {
                cell: *cell,
                paragraph: *paragraph,
                content: old,
            })
        }
        EditCommand::ReplaceParagraph {
            cell,
            paragraph,
            content,
        } => {
            let Block::Paragraph(p) = blocks.get_mut(*paragraph)? else {
                return None;
            };
            if *p == *content {
                return None;
            }
            let old = std::mem::replace(p, content.clone());
            Some(EditCommand::ReplaceParagraph {
                cell: *cell,
                paragraph: *paragraph,
                content: old,
            })
        }
    }
}

/// Restyles the characters `start..end` of one paragraph. The inverse restores
/// the whole paragraph.
fn restyle(
    blocks: &mut [Block],
    cell: CellRef,
    paragraph: usize,
    start: usize,
    end: usize,
    change: impl Fn(&mut RunStyle),
) -> Option<EditCommand> {
    let Block::Paragraph(p) = blocks.get_mut(paragraph)? else {
        return None;
    };
    let len = p.char_len();
    let (start, end) = (start.min(len), end.min(len));
    if start >= end {
        return None;
    }
    let old = p.clone();
    let from = split_runs_at(&mut p.runs, start);
    let to = split_runs_at(&mut p.runs, end);
    for run in &mut p.runs[from..to] {
        change(&mut run.style);
    }
    let runs = std::mem::take(&mut p.runs);
    for run in runs {
        p.push(run);
    }
    if *p == old {
        return None;
    }
    Some(EditCommand::ReplaceParagraph {
        cell,
        paragraph,
        content: old,
    })
}

/// Splits the run holding char `offset` and returns the index of the run that
/// starts there.
fn split_runs_at(runs: &mut Vec<Run>, offset: usize) -> usize {
    let mut pos = 0;
    for i in 0..runs.len() {
        if offset == pos {
            return i;
        }
        let len = runs[i].text.chars().count();
        if offset < pos + len {
            let at = byte_index(&runs[i].text, offset - pos);
            let tail = runs[i].text.split_off(at);
            let style = runs[i].style.clone();
            runs.insert(i + 1, Run::styled(tail, style));
            return i + 1;
        }
        pos += len;
    }
    runs.len()
}

/// Converts between paragraphs and list items. Returns `None` when the block
/// already has the requested form.
fn set_list(blocks: &mut Vec<Block>, index: usize, list_type: Option<ListType>) -> Option<()> {
    let current = match blocks.get(index)? {
        Block::Paragraph(_) => None,
        Block::List(list) => Some(list.list_type),
        Block::Table(_) => return None,
    };
    if current == list_type {
        return None;
    }
    match (blocks.remove(index), list_type) {
        (Block::Paragraph(p), Some(list_type)) => {
            let list = List {
                list_type,
                items: vec![ListItem { runs: p.runs }],
                top_margin: 0.0,
            };
            blocks.insert(index, Block::List(list));
            merge_lists(blocks, index);
            if index > 0 {
                merge_lists(blocks, index - 1);
            }
        }
        (Block::List(mut list), Some(list_type)) => {
            list.list_type = list_type;
            blocks.insert(index, Block::List(list));
        }
        (Block::List(list), None) => {
            let paragraphs = list.items.into_iter().map(|item| {
                Block::Paragraph(Paragraph {
                    runs: item.runs,
                    ..Paragraph::default()
                })
            });
            blocks.splice(index..index, paragraphs);
        }
        (block, _) => blocks.insert(index, block),
    }
    Some(())
}

/// Folds the list after `index` into the list at `index` when both have the same type.
fn merge_lists(blocks: &mut Vec<Block>, index: usize) {
    let same = matches!(
        (blocks.get(index), blocks.get(index + 1)),
        (Some(Block::List(a)), Some(Block::List(b))) if a.list_type == b.list_type
    );
    if !same {
        return;
    }
    if let Block::List(next) = blocks.remove(index + 1)
        && let Some(Block::List(list)) = blocks.get_mut(index)
    {
        list.items.extend(next.items);
    }
}

fn byte_index(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Inserts into the run that holds `offset`, inheriting its style.
fn insert_chars(p: &mut Paragraph, offset: usize, text: &str) {
    if p.runs.is_empty() {
        p.runs.push(Run::plain(text));
        return;
    }
    let mut remaining = offset;
    for run in &mut p.runs {
        let len = run.text.chars().count();
        if remaining <= len {
            let at = byte_index(&run.text, remaining);
            run.text.insert_str(at, text);
            return;
        }
        remaining -= len;
    }
}

fn remove_chars(p: &mut Paragraph, start: usize, end: usize) -> String {
    let mut removed = String::new();
    let mut pos = 0;
    for run in &mut p.runs {
        let len = run.text.chars().count();
        let (run_start, run_end) = (pos, pos + len);
        pos = run_end;
        if end <= run_start || start >= run_end {
            continue;
        }
        let from = byte_index(&run.text, start.max(run_start) - run_start);
        let to = byte_index(&run.text, end.min(run_end) - run_start);
        removed.push_str(&run.text[from..to]);
        run.text.replace_range(from..to, "");
    }
    p.runs.retain(|r| !r.text.is_empty());
    removed
}

/// Splits the paragraph at `index` on every newline, keeping run styles.
fn split_lines(blocks: &mut Vec<Block>, index: usize) {
    let Some(Block::Paragraph(source)) = blocks.get(index) else {
        return;
    };
    let mut lines = vec![Paragraph {
        runs: Vec::new(),
        ..source.clone()
    }];
    for run in &source.runs {
        for (i, piece) in run.text.split('\n').enumerate() {
            if i > 0 {
                lines.push(Paragraph {
                    runs: Vec::new(),
                    ..source.clone()
                });
            }
            if !piece.is_empty()
                && let Some(line) = lines.last_mut()
            {
                line.push(Run::styled(piece, run.style.clone()));
            }
        }
    }
    blocks.splice(index..=index, lines.into_iter().map(Block::Paragraph));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at() -> CellRef {
        CellRef {
            block: 0,
            row: 0,
            col: 0,
        }
    }

    fn para(runs: Vec<Run>) -> Vec<Block> {
        let mut p = Paragraph::new();
        for run in runs {
            p.push(run);
        }
        vec![Block::Paragraph(p)]
    }

    #[test]
    fn insert_keeps_the_style_of_the_touched_run() {
        let mut blocks = para(vec![Run::bold("АД: "), Run::plain("120")]);
        let inverse = apply_to_blocks(&mut blocks, &insert_text(at(), 0, 7, "/80")).unwrap();
        assert_eq!(blocks[0].plain_text(), "АД: 120/80");
        assert_eq!(
            inverse,
            EditCommand::DeleteText {
                cell: at(),
                paragraph: 0,
                start: 7,
                end: 10
            }
        );
        apply_to_blocks(&mut blocks, &inverse).unwrap();
        assert_eq!(blocks[0].plain_text(), "АД: 120");
    }

    #[test]
    fn delete_across_runs_returns_removed_text() {
        let mut blocks = para(vec![Run::bold("Жалобы: "), Run::plain("нет")]);
        let command = EditCommand::DeleteText {
            cell: at(),
            paragraph: 0,
            start: 6,
            end: 9,
        };
        let inverse = apply_to_blocks(&mut blocks, &command).unwrap();
        assert_eq!(blocks[0].plain_text(), "Жалобыет");
        let EditCommand::InsertText { text, offset, .. } = inverse else {
            panic!("expected insert");
        };
        assert_eq!((text.as_str(), offset), (": н", 6));
    }

    #[test]
    fn newline_splits_the_paragraph() {
        let mut blocks = para(vec![Run::plain("ab")]);
        let inverse = apply_to_blocks(&mut blocks, &insert_text(at(), 0, 1, "\n")).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].plain_text(), "b");
        apply_to_blocks(&mut blocks, &inverse).unwrap();
        assert_eq!(blocks, para(vec![Run::plain("ab")]));
    }

    #[test]
    fn edits_outside_paragraphs_are_ignored() {
        let mut blocks = Vec::new();
        assert!(apply_to_blocks(&mut blocks, &insert_text(at(), 0, 0, "x")).is_none());
        assert!(backspace(at(), 0, 0).is_none());
    }

    fn first_paragraph(blocks: &[Block]) -> &Paragraph {
        match &blocks[0] {
            Block::Paragraph(p) => p,
            other => panic!("expected paragraph, got {other:?}"),
        }
    }

    #[test]
    fn bolding_part_of_a_run_splits_it() {
        let mut blocks = para(vec![Run::plain("Острый отит")]);
        let original = blocks.clone();
        let runs = first_paragraph(&blocks).runs.clone();
        let command = toggle_bold(at(), 0, 7, 11, &runs);
        let inverse = apply_to_blocks(&mut blocks, &command).unwrap();

        let p = first_paragraph(&blocks);
        assert_eq!(p.runs.len(), 2);
        assert_eq!(p.runs[0], Run::plain("Острый "));
        assert_eq!(p.runs[1], Run::bold("отит"));
        assert!(matches!(inverse, EditCommand::ReplaceParagraph { paragraph: 0, .. }));

        apply_to_blocks(&mut blocks, &inverse).unwrap();
        assert_eq!(blocks, original);
    }

    #[test]
    fn toggle_bold_clears_a_fully_bold_range() {
        let mut blocks = para(vec![Run::bold("АД: "), Run::plain("120")]);
        let runs = first_paragraph(&blocks).runs.clone();
        let command = toggle_bold(at(), 0, 0, 3, &runs);
        let EditCommand::FormatRun { patch, .. } = &command else {
            panic!("expected run formatting");
        };
        assert_eq!(patch.bold, Some(false));

        apply_to_blocks(&mut blocks, &command).unwrap();
        let p = first_paragraph(&blocks);
        assert_eq!(p.text(), "АД: 120");
        assert!(!p.runs[0].style.bold);
        assert!(p.runs[1].style.bold);
    }

    #[test]
    fn clear_formatting_merges_back_into_one_run() {
        let italic = RunStyle {
            italic: true,
            font_size: Some(12.0),
            ..RunStyle::default()
        };
        let mut blocks = para(vec![Run::bold("ab"), Run::styled("cd", italic)]);
        let command = EditCommand::ClearFormatting {
            cell: at(),
            paragraph: 0,
            start: 0,
            end: 10,
        };
        apply_to_blocks(&mut blocks, &command).unwrap();
        assert_eq!(first_paragraph(&blocks).runs, vec![Run::plain("abcd")]);
        assert!(apply_to_blocks(&mut blocks, &command).is_none());
    }

    #[test]
    fn empty_ranges_and_repeated_formatting_change_nothing() {
        let mut blocks = para(vec![Run::plain("текст")]);
        let size = set_font_size(at(), 0, 2, 2, 14.0);
        assert!(apply_to_blocks(&mut blocks, &size).is_none());

        let size = set_font_size(at(), 0, 4, 1, 14.0);
        assert!(apply_to_blocks(&mut blocks, &size).is_some());
        assert_eq!(first_paragraph(&blocks).runs[1].style.font_size, Some(14.0));
        assert!(apply_to_blocks(&mut blocks, &size).is_none());
    }

    #[test]
    fn paragraph_formatting_is_undone_by_its_inverse() {
        let mut blocks = para(vec![Run::plain("Рекомендации")]);
        let original = blocks.clone();

        let center = set_alignment(at(), 0, ParagraphAlignment::Center);
        let inverse = apply_to_blocks(&mut blocks, &center).unwrap();
        assert_eq!(first_paragraph(&blocks).alignment, ParagraphAlignment::Center);
        assert!(apply_to_blocks(&mut blocks, &center).is_none());

        apply_to_blocks(&mut blocks, &inverse).unwrap();
        assert_eq!(blocks, original);

        let spacing = set_paragraph_spacing(at(), 0, -4.0, 6.0);
        apply_to_blocks(&mut blocks, &spacing).unwrap();
        let p = first_paragraph(&blocks);
        assert_eq!((p.spacing.before, p.spacing.after), (0.0, 6.0));

        apply_to_blocks(&mut blocks, &set_line_spacing(at(), 0, Some(18.0))).unwrap();
        assert_eq!(first_paragraph(&blocks).spacing.line, Some(18.0));
    }

    #[test]
    fn list_toggle_joins_the_neighbouring_list() {
        let mut blocks = vec![
            Block::List(List {
                list_type: ListType::Bullet,
                items: vec![ListItem {
                    runs: vec![Run::plain("справа")],
                }],
                top_margin: 0.0,
            }),
            Block::Paragraph(Paragraph::plain("слева")),
            Block::Paragraph(Paragraph::plain("итог")),
        ];
        let original = blocks.clone();

        let inverse =
            apply_to_blocks(&mut blocks, &set_list_type(at(), 1, Some(ListType::Bullet))).unwrap();
        assert_eq!(blocks.len(), 2);
        let Block::List(list) = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[1].text(), "слева");

        apply_to_blocks(&mut blocks, &inverse).unwrap();
        assert_eq!(blocks, original);

        assert!(apply_to_blocks(&mut blocks, &set_list_type(at(), 2, None)).is_none());
        apply_to_blocks(&mut blocks, &set_list_type(at(), 0, None)).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], Block::Paragraph(Paragraph::plain("справа")));
    }
}
