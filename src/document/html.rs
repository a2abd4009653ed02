//! Rich-text bridge between HTML fragments and document blocks.
//!
//! The reader is lenient: unmatched or unclosed tags are tolerated and
//! anything it does not understand degrades to plain paragraphs. Font
//! families are dropped on read so every run inherits the document's
//! Times New Roman default.

use std::{borrow::Cow, io::Cursor};

use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};

use crate::document::model::{
    Block, List, ListItem, ListType, Paragraph, ParagraphAlignment, Run, RunStyle, Table,
};

#[derive(Debug, Default)]
struct CellDraft {
    blocks: Vec<Block>,
    rowspan: usize,
    colspan: usize,
}

#[derive(Debug, Default)]
struct TableDraft {
    rows: Vec<Vec<CellDraft>>,
    open_spans: Vec<(usize, usize)>,
}

#[derive(Debug)]
struct OpenParagraph {
    paragraph: Paragraph,
    explicit: bool,
    empty_marker: bool,
}

#[derive(Debug)]
struct HtmlReader {
    targets: Vec<Vec<Block>>,
    tables: Vec<TableDraft>,
    lists: Vec<List>,
    in_item: bool,
    paragraph: Option<OpenParagraph>,
    styles: Vec<(String, RunStyle)>,
    skip_depth: usize,
}

pub fn html_to_blocks(html: &str) -> Vec<Block> {
    if !html.contains('<') {
        return plain_to_blocks(&decode_entities(html));
    }

    let html = escape_stray_lt(html);
    let mut reader = Reader::from_reader(Cursor::new(html.as_bytes()));
    {
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }
    let mut buf = Vec::new();
    let mut state = HtmlReader::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = tag_name(&e);
                if is_void(name.as_str()) {
                    state.void_element(name.as_str());
                } else {
                    state.open(name, &e, reader.decoder());
                }
            }
            Ok(Event::Empty(e)) => {
                let name = tag_name(&e);
                if is_void(name.as_str()) {
                    state.void_element(name.as_str());
                } else {
                    state.open(name.clone(), &e, reader.decoder());
                    state.close(name.as_str());
                }
            }
            Ok(Event::End(e)) => {
                let name = local_name(e.local_name().as_ref()).to_ascii_lowercase();
                state.close(name.as_str());
            }
            Ok(Event::Text(t)) => {
                if let Ok(value) = t.decode() {
                    state.text(value.as_ref());
                }
            }
            Ok(Event::CData(t)) => {
                if let Ok(value) = std::str::from_utf8(t.as_ref()) {
                    state.text(value);
                }
            }
            Ok(Event::GeneralRef(r)) => {
                let resolved = match r.resolve_char_ref() {
                    Ok(Some(ch)) => Some(ch.to_string()),
                    _ => r
                        .decode()
                        .ok()
                        .and_then(|name| named_entity(name.as_ref()))
                        .map(str::to_string),
                };
                if let Some(value) = resolved {
                    state.text(value.as_str());
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => {
                log::debug!("html fragment truncated at {}: {err}", reader.buffer_position());
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    state.finish()
}

impl HtmlReader {
    fn new() -> Self {
        Self {
            targets: vec![Vec::new()],
            tables: Vec::new(),
            lists: Vec::new(),
            in_item: false,
            paragraph: None,
            styles: Vec::new(),
            skip_depth: 0,
        }
    }

    fn current_style(&self) -> RunStyle {
        self.styles
            .last()
            .map(|(_, s)| s.clone())
            .unwrap_or_default()
    }

    fn open(&mut self, name: String, e: &BytesStart<'_>, decoder: quick_xml::encoding::Decoder) {
        if self.skip_depth > 0 || matches!(name.as_str(), "head" | "style" | "script" | "title") {
            self.skip_depth += 1;
            return;
        }
        let css = attr_value(e, "style", decoder).unwrap_or_default();
        let mut style = apply_css(self.current_style(), css.as_str());
        match name.as_str() {
            "b" | "strong" | "th" => style.bold = true,
            "i" | "em" => style.italic = true,
            "u" => style.underline = true,
            _ => {}
        }
        if name == "font"
            && let Some(size) = attr_value(e, "size", decoder).and_then(|v| v.parse::<f32>().ok())
        {
            style.font_size = Some(legacy_font_size(size));
        }

        match name.as_str() {
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                self.flush_paragraph();
                let mut paragraph = Paragraph::new();
                paragraph.alignment = alignment_of(e, css.as_str(), decoder);
                if name.starts_with('h') {
                    style.bold = true;
                }
                self.paragraph = Some(OpenParagraph {
                    paragraph,
                    explicit: true,
                    empty_marker: css.contains("-qt-paragraph-type:empty"),
                });
            }
            "ul" | "ol" => {
                self.flush_paragraph();
                self.lists.push(List {
                    list_type: if name == "ol" {
                        ListType::Numbered
                    } else {
                        ListType::Bullet
                    },
                    items: Vec::new(),
                    top_margin: 0.0,
                });
            }
            "li" => {
                self.flush_paragraph();
                self.in_item = true;
            }
            "table" => {
                self.flush_paragraph();
                self.tables.push(TableDraft::default());
            }
            "tr" => {
                if let Some(table) = self.tables.last_mut() {
                    table.rows.push(Vec::new());
                }
            }
            "td" | "th" => {
                self.flush_paragraph();
                let span = |key: &str| {
                    attr_value(e, key, decoder)
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(1)
                        .max(1)
                };
                let spans = (span("rowspan"), span("colspan"));
                if let Some(table) = self.tables.last_mut() {
                    if table.rows.is_empty() {
                        table.rows.push(Vec::new());
                    }
                    table.open_spans.push(spans);
                    self.targets.push(Vec::new());
                }
            }
            _ => {}
        }
        self.styles.push((name, style));
    }

    fn close(&mut self, name: &str) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        match name {
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.flush_paragraph(),
            "li" => {
                self.flush_paragraph();
                self.in_item = false;
            }
            "ul" | "ol" => {
                self.flush_paragraph();
                self.in_item = false;
                if let Some(list) = self.lists.pop() {
                    self.emit(Block::List(list));
                }
            }
            "td" | "th" => {
                self.flush_paragraph();
                if let Some(table) = self.tables.last_mut()
                    && let Some((rowspan, colspan)) = table.open_spans.pop()
                    && self.targets.len() > 1
                {
                    let blocks = self.targets.pop().unwrap_or_default();
                    if let Some(row) = table.rows.last_mut() {
                        row.push(CellDraft {
                            blocks,
                            rowspan,
                            colspan,
                        });
                    }
                }
            }
            "table" => {
                self.flush_paragraph();
                if let Some(table) = self.tables.pop().and_then(TableDraft::into_table) {
                    self.emit(Block::Table(table));
                }
            }
            _ => {}
        }
        if let Some(pos) = self.styles.iter().rposition(|(n, _)| n == name) {
            self.styles.truncate(pos);
        }
    }

    fn void_element(&mut self, name: &str) {
        if self.skip_depth > 0 || name != "br" {
            return;
        }
        let style = self.current_style();
        let open = self.ensure_paragraph();
        if !open.empty_marker {
            open.paragraph.push(Run::styled("\n", style));
        }
    }

    fn text(&mut self, raw: &str) {
        if self.skip_depth > 0 {
            return;
        }
        if self.paragraph.is_none() && raw.trim().is_empty() {
            return;
        }
        let text = raw.replace(['\r', '\n'], " ");
        let style = self.current_style();
        self.ensure_paragraph().paragraph.push(Run::styled(text, style));
    }

    fn ensure_paragraph(&mut self) -> &mut OpenParagraph {
        self.paragraph.get_or_insert_with(|| OpenParagraph {
            paragraph: Paragraph::new(),
            explicit: false,
            empty_marker: false,
        })
    }

    fn flush_paragraph(&mut self) {
        let Some(open) = self.paragraph.take() else {
            return;
        };
        let mut paragraph = open.paragraph;
        if paragraph.text() == "\n" {
            paragraph.runs.clear();
        }
        if !open.explicit && paragraph.text().trim().is_empty() {
            return;
        }
        if self.in_item
            && let Some(list) = self.lists.last_mut()
        {
            list.items.push(ListItem {
                runs: paragraph.runs,
            });
            return;
        }
        self.emit(Block::Paragraph(paragraph));
    }

    fn emit(&mut self, block: Block) {
        if let Some(target) = self.targets.last_mut() {
            target.push(block);
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.flush_paragraph();
        while let Some(list) = self.lists.pop() {
            self.emit(Block::List(list));
        }
        while self.targets.len() > 1 {
            let orphan = self.targets.pop().unwrap_or_default();
            for block in orphan {
                self.emit(block);
            }
        }
        self.targets.pop().unwrap_or_default()
    }
}

impl TableDraft {
    /// Places drafted cells on a grid, skipping slots taken by earlier rowspans.
    fn into_table(self) -> Option<Table> {
        let row_count = self.rows.len();
        if row_count == 0 {
            return None;
        }
        let mut occupied: Vec<Vec<bool>> = vec![Vec::new(); row_count];
        let mut placed = Vec::new();
        let mut col_count = 0;

        for (r, row) in self.rows.into_iter().enumerate() {
            let mut c = 0;
            for cell in row {
                while occupied[r].get(c).copied().unwrap_or(false) {
                    c += 1;
                }
                let rowspan = cell.rowspan.min(row_count - r);
                for rr in r..r + rowspan {
                    for cc in c..c + cell.colspan {
                        if occupied[rr].len() <= cc {
                            occupied[rr].resize(cc + 1, false);
                        }
                        occupied[rr][cc] = true;
                    }
                }
                col_count = col_count.max(c + cell.colspan);
                placed.push((r, c, rowspan, cell.colspan, cell.blocks));
                c += cell.colspan;
            }
        }
        if col_count == 0 {
            return None;
        }

        let widths = vec![100.0 / col_count as f32; col_count];
        let mut table = Table::new(row_count, col_count, widths);
        for (r, c, rowspan, colspan, blocks) in placed {
            if rowspan > 1 || colspan > 1 {
                table.merge(r, c, rowspan, colspan);
            }
            if let Some(cell) = table.cell_mut(r, c) {
                cell.blocks = blocks;
            }
        }
        Some(table)
    }
}

fn plain_to_blocks(text: &str) -> Vec<Block> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split('\n')
        .map(|line| Block::Paragraph(Paragraph::plain(line.trim_end_matches('\r'))))
        .collect()
}

/// Serializes blocks to a compact HTML fragment that `html_to_blocks` reads back unchanged.
pub fn blocks_to_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        write_block(&mut out, block);
    }
    out
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Paragraph(p) => {
            match p.alignment {
                ParagraphAlignment::Left => out.push_str("<p>"),
                ParagraphAlignment::Center => out.push_str("<p style=\"text-align:center\">"),
                ParagraphAlignment::Right => out.push_str("<p style=\"text-align:right\">"),
                ParagraphAlignment::Justify => out.push_str("<p style=\"text-align:justify\">"),
            }
            write_runs(out, &p.runs);
            out.push_str("</p>");
        }
        Block::List(list) => {
            let tag = match list.list_type {
                ListType::Bullet => "ul",
                ListType::Numbered => "ol",
            };
            out.push_str(&format!("<{tag}>"));
            for item in &list.items {
                out.push_str("<li>");
                write_runs(out, &item.runs);
                out.push_str("</li>");
            }
            out.push_str(&format!("</{tag}>"));
        }
        Block::Table(table) => {
            out.push_str("<table>");
            for row in &table.rows {
                out.push_str("<tr>");
                for cell in row.cells.iter().filter(|c| !c.is_covered()) {
                    out.push_str("<td");
                    if cell.colspan > 1 {
                        out.push_str(&format!(" colspan=\"{}\"", cell.colspan));
                    }
                    if cell.rowspan > 1 {
                        out.push_str(&format!(" rowspan=\"{}\"", cell.rowspan));
                    }
                    out.push('>');
                    for inner in &cell.blocks {
                        write_block(out, inner);
                    }
                    out.push_str("</td>");
                }
                out.push_str("</tr>");
            }
            out.push_str("</table>");
        }
    }
}

fn write_runs(out: &mut String, runs: &[Run]) {
    for run in runs {
        let css = run_css(&run.style);
        let text = escape_html(run.text.as_str()).replace('\n', "<br/>");
        if css.is_empty() {
            out.push_str(text.as_str());
        } else {
            out.push_str(&format!("<span style=\"{css}\">{text}</span>"));
        }
    }
}

/// Inline CSS for a run style; empty for plain runs.
pub fn run_css(style: &RunStyle) -> String {
    let mut parts = Vec::new();
    if let Some(family) = &style.font_family {
        parts.push(format!("font-family:'{family}'"));
    }
    if let Some(size) = style.font_size {
        parts.push(format!("font-size:{size}pt"));
    }
    if style.bold {
        parts.push("font-weight:bold".to_string());
    }
    if style.italic {
        parts.push("font-style:italic".to_string());
    }
    if style.underline {
        parts.push("text-decoration:underline".to_string());
    }
    parts.join("; ")
}

/// Plain text of an HTML fragment, paragraphs joined by newlines.
pub fn html_to_plain(html: &str) -> String {
    html_to_blocks(html)
        .iter()
        .map(Block::plain_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// True when the fragment carries no visible text, e.g. an empty editor's markup.
pub fn is_blank(html: &str) -> bool {
    html_to_plain(html).trim().is_empty()
}

/// Canonical form used to compare fragments from different writers.
pub fn normalize_html(html: &str) -> String {
    blocks_to_html(&html_to_blocks(html))
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn starts_tag(next: Option<char>) -> bool {
    matches!(next, Some(c) if c.is_ascii_alphabetic() || matches!(c, '/' | '!' | '?'))
}

/// Escapes every `<` that cannot open a tag, so `a < b` reads as text.
fn escape_stray_lt(html: &str) -> Cow<'_, str> {
    let stray = html
        .char_indices()
        .any(|(i, c)| c == '<' && !starts_tag(html[i + 1..].chars().next()));
    if !stray {
        return Cow::Borrowed(html);
    }
    let mut out = String::with_capacity(html.len() + 8);
    let mut chars = html.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '<' && !starts_tag(chars.peek().copied()) {
            out.push_str("&lt;");
        } else {
            out.push(ch);
        }
    }
    Cow::Owned(out)
}

fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(
        text.replace("&nbsp;", "\u{00A0}")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&amp;", "&"),
    )
}

fn named_entity(name: &str) -> Option<&'static str> {
    match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        "nbsp" => Some("\u{00A0}"),
        "laquo" => Some("\u{00AB}"),
        "raquo" => Some("\u{00BB}"),
        "mdash" => Some("\u{2014}"),
        "ndash" => Some("\u{2013}"),
        "deg" => Some("\u{00B0}"),
        _ => None,
    }
}

fn apply_css(mut style: RunStyle, css: &str) -> RunStyle {
    for decl in css.split(';') {
        let Some((key, value)) = decl.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '\'' || c == '"');
        match key.trim().to_ascii_lowercase().as_str() {
            "font-size" => {
                if let Some(size) = parse_css_size(value) {
                    style.font_size = Some(size);
                }
            }
            "font-weight" => {
                style.bold = match value {
                    "bold" | "bolder" => true,
                    "normal" | "lighter" => false,
                    v => v.parse::<u32>().map(|w| w >= 600).unwrap_or(style.bold),
                };
            }
            "font-style" => style.italic = value == "italic" || value == "oblique",
            "text-decoration" => style.underline = value.contains("underline"),
            _ => {}
        }
    }
    style
}

fn parse_css_size(value: &str) -> Option<f32> {
    let value = value.trim();
    if let Some(pt) = value.strip_suffix("pt") {
        return pt.trim().parse().ok();
    }
    if let Some(px) = value.strip_suffix("px") {
        return px.trim().parse::<f32>().ok().map(|v| v * 0.75);
    }
    None
}

fn legacy_font_size(size: f32) -> f32 {
    match size as i32 {
        i32::MIN..=1 => 7.5,
        2 => 10.0,
        3 => 12.0,
        4 => 13.5,
        5 => 18.0,
        6 => 24.0,
        _ => 36.0,
    }
}

fn alignment_of(
    e: &BytesStart<'_>,
    css: &str,
    decoder: quick_xml::encoding::Decoder,
) -> ParagraphAlignment {
    let from_css = css.split(';').find_map(|decl| {
        let (key, value) = decl.split_once(':')?;
        (key.trim() == "text-align").then(|| value.trim().to_string())
    });
    match from_css
        .or_else(|| attr_value(e, "align", decoder))
        .as_deref()
    {
        Some("center") => ParagraphAlignment::Center,
        Some("right") => ParagraphAlignment::Right,
        Some("justify") => ParagraphAlignment::Justify,
        _ => ParagraphAlignment::Left,
    }
}

fn is_void(name: &str) -> bool {
    matches!(name, "br" | "meta" | "img" | "hr" | "col" | "link" | "input")
}

fn tag_name(e: &BytesStart<'_>) -> String {
    local_name(e.local_name().as_ref()).to_ascii_lowercase()
}

fn local_name(bytes: &[u8]) -> String {
    let full = std::str::from_utf8(bytes).unwrap_or_default();
    full.rsplit(':').next().unwrap_or(full).to_string()
}

fn attr_value(
    event: &BytesStart<'_>,
    key: &str,
    decoder: quick_xml::encoding::Decoder,
) -> Option<String> {
    event.attributes().flatten().find_map(|a| {
        let name = std::str::from_utf8(a.key.as_ref()).ok()?;
        if name.eq_ignore_ascii_case(key) {
            a.decode_and_unescape_value(decoder)
                .ok()
                .map(|v| v.to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RICH_FRAGMENT: &str = r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.0//EN" "http://www.w3.org/TR/REC-html40/strict.dtd">
<html><head><meta name="qrichtext" content="1" /><style type="text/css">
p, li { white-space: pre-wrap; }
</style></head><body style=" font-family:'Arial'; font-size:10pt; font-weight:400;">
<p style=" margin-top:0px;"><span style=" font-weight:600;">Острый</span> отит</p>
<p style="-qt-paragraph-type:empty; margin-top:0px;"><br /></p>
<ul><li>Капли</li><li>Покой &amp; тепло</li></ul></body></html>"#;

    #[test]
    fn reads_editor_markup() {
        let blocks = html_to_blocks(RICH_FRAGMENT);
        assert_eq!(blocks.len(), 3);
        let Block::Paragraph(first) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(first.text(), "Острый отит");
        assert!(first.runs[0].style.bold);
        assert!(!first.runs[1].style.bold);
        assert!(first.runs.iter().all(|r| r.style.font_family.is_none()));
        assert_eq!(blocks[1].plain_text(), "");
        let Block::List(list) = &blocks[2] else {
            panic!("expected list");
        };
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[1].text(), "Покой & тепло");
    }

    #[test]
    fn bare_less_than_stays_in_the_text() {
        let blocks = html_to_blocks("<p>a < b</p><p>x<5 и y>3</p>");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].plain_text(), "a < b");
        assert_eq!(blocks[1].plain_text(), "x<5 и y>3");
        assert_eq!(escape_stray_lt("<b>ok</b>"), Cow::Borrowed("<b>ok</b>"));
    }

    #[test]
    fn plain_text_becomes_paragraphs() {
        let blocks = html_to_blocks("первая\nвторая");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].plain_text(), "вторая");
        assert!(html_to_blocks("  ").is_empty());
    }

    #[test]
    fn writer_output_reads_back_identically() {
        let blocks = html_to_blocks(RICH_FRAGMENT);
        let html = blocks_to_html(&blocks);
        assert_eq!(html_to_blocks(html.as_str()), blocks);
        assert_eq!(normalize_html(html.as_str()), html);
    }

    #[test]
    fn table_spans_are_placed_on_grid() {
        let html = "<table><tr><td rowspan=\"2\">a</td><td>b</td></tr><tr><td>c</td></tr></table>";
        let blocks = html_to_blocks(html);
        let Block::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.rows[0].cells[0].rowspan, 2);
        assert!(table.rows[1].cells[0].is_covered());
        assert_eq!(table.rows[1].cells[1].plain_text(), "c");
    }

    #[test]
    fn blank_markup_is_detected() {
        assert!(is_blank("<p><br/></p>"));
        assert!(is_blank(""));
        assert!(!is_blank("<p>x</p>"));
    }

    #[test]
    fn unclosed_break_is_tolerated() {
        let blocks = html_to_blocks("<p>one<br>two</p>");
        assert_eq!(blocks[0].plain_text(), "one\ntwo");
    }
}
