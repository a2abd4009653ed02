use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::document::{
    DocumentFormat, detect_format, docx, odt, pdf,
    html::{escape_html, run_css},
    model::{Block, DocumentModel, ListType, Paragraph, ParagraphAlignment, Run, Table},
};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOptions {
    /// Dashed cut line across the middle of each PDF page.
    pub split_line: bool,
    pub pdf_font_regular: Option<PathBuf>,
    pub pdf_font_bold: Option<PathBuf>,
}

pub fn export_txt(path: &Path, model: &DocumentModel) -> std::io::Result<()> {
    fs::write(path, to_plain_text(model))
}

pub fn export_html(path: &Path, model: &DocumentModel) -> std::io::Result<()> {
    fs::write(path, to_html(model))
}

pub fn save_with_format(path: &Path, model: &DocumentModel, options: &ExportOptions) -> Result<()> {
    let format = detect_format(path);
    match format {
        DocumentFormat::Pdf => pdf::writer::write_pdf(path, model, options)?,
        DocumentFormat::Html | DocumentFormat::Doc => export_html(path, model)?,
        DocumentFormat::Odt => odt::writer::write_odt(path, model)?,
        DocumentFormat::Docx => docx::writer::write_docx(path, model)?,
        DocumentFormat::Text => export_txt(path, model)?,
        DocumentFormat::Unknown => {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default()
                .to_string();
            return Err(Error::UnsupportedFormat(ext));
        }
    }
    log::info!("exported {:?} to {}", format, path.display());
    Ok(())
}

fn paragraph_text(p: &Paragraph) -> String {
    p.runs.iter().map(|r| r.text.as_str()).collect()
}

/// Plain text: one line per paragraph, table cells joined by tabs.
pub fn to_plain_text(model: &DocumentModel) -> String {
    let mut out = String::new();
    for block in &model.content {
        push_plain(&mut out, block);
    }
    out
}

fn push_plain(out: &mut String, block: &Block) {
    match block {
        Block::Paragraph(p) => {
            out.push_str(paragraph_text(p).as_str());
            out.push('\n');
        }
        Block::List(list) => {
            for (i, item) in list.items.iter().enumerate() {
                let prefix = match list.list_type {
                    ListType::Bullet => "- ".to_string(),
                    ListType::Numbered => format!("{}. ", i + 1),
                };
                out.push_str(prefix.as_str());
                out.push_str(item.text().as_str());
                out.push('\n');
            }
        }
        Block::Table(table) => {
            for row in &table.rows {
                let cells: Vec<String> = row
                    .cells
                    .iter()
                    .filter(|c| !c.is_covered())
                    .map(|c| c.plain_text())
                    .collect();
                out.push_str(cells.join("\t").as_str());
                out.push('\n');
            }
        }
    }
}

fn align_css(alignment: ParagraphAlignment) -> &'static str {
    match alignment {
        ParagraphAlignment::Left => "",
        ParagraphAlignment::Center => " style=\"text-align:center\"",
        ParagraphAlignment::Right => " style=\"text-align:right\"",
        ParagraphAlignment::Justify => " style=\"text-align:justify\"",
    }
}

fn html_runs(runs: &[Run]) -> String {
    let mut out = String::new();
    for run in runs {
        let text = escape_html(run.text.as_str());
        let css = run_css(&run.style);
        if css.is_empty() {
            out.push_str(text.as_str());
        } else {
            out.push_str(format!("<span style=\"{css}\">{text}</span>").as_str());
        }
    }
    if out.is_empty() {
        out.push_str("&nbsp;");
    }
    out
}

fn html_table(table: &Table) -> String {
    let class = if table.borders { "bordered" } else { "plain" };
    let mut out = String::from("<table class=\"");
    out.push_str(class);
    out.push_str("\"><colgroup>");
    let total: f32 = table.column_widths.iter().sum::<f32>().max(1.0);
    for width in &table.column_widths {
        out.push_str(format!("<col style=\"width:{:.1}%\"/>", width * 100.0 / total).as_str());
    }
    out.push_str("</colgroup>");
    for row in &table.rows {
        out.push_str("<tr>");
        for cell in row.cells.iter().filter(|c| !c.is_covered()) {
            out.push_str("<td");
            if cell.colspan > 1 {
                out.push_str(format!(" colspan=\"{}\"", cell.colspan).as_str());
            }
            if cell.rowspan > 1 {
                out.push_str(format!(" rowspan=\"{}\"", cell.rowspan).as_str());
            }
            out.push('>');
            for block in &cell.blocks {
                out.push_str(html_block(block).as_str());
            }
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    out
}

fn html_block(block: &Block) -> String {
    match block {
        Block::Paragraph(p) => format!("<p{}>{}</p>", align_css(p.alignment), html_runs(&p.runs)),
        Block::List(list) => {
            let tag = match list.list_type {
                ListType::Bullet => "ul",
                ListType::Numbered => "ol",
            };
            let items: String = list
                .items
                .iter()
                .map(|item| format!("<li>{}</li>", html_runs(&item.runs)))
                .collect();
            format!("<{tag}>{items}</{tag}>")
        }
        Block::Table(table) => html_table(table),
    }
}

/// A standalone page with A4 print CSS. Also used for `.doc` output.
pub fn to_html(model: &DocumentModel) -> String {
    let body: String = model.content.iter().map(html_block).collect();
    let m = model.metadata.margins;
    let px_to_mm = |px: f32| px / crate::document::model::MM_TO_PX;

    format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title><style>\
@page{{size:A4;margin:{top:.1}mm {right:.1}mm {bottom:.1}mm {left:.1}mm}}\
body{{font-family:'{family}';font-size:{size}pt;margin:0}}\
p{{margin:0}}\
table{{width:100%;border-collapse:collapse}}\
td{{vertical-align:top;padding:2px}}\
table.bordered td{{border:1px solid #000}}\
</style></head><body>{body}</body></html>",
        title = escape_html(model.metadata.title.as_str()),
        top = px_to_mm(m.top),
        right = px_to_mm(m.right),
        bottom = px_to_mm(m.bottom),
        left = px_to_mm(m.left),
        family = model.metadata.default_font_family,
        size = model.metadata.default_font_size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Document, Paragraph, Table};

    fn sample() -> Document {
        let mut table = Table::new(2, 2, vec![21.0, 79.0]);
        table.rows[0].cells[0].push_paragraph(Paragraph::plain("01.02.2025"));
        table.rows[0].cells[1].push_paragraph(Paragraph::plain("ОСМОТР"));
        table.rows[0].cells[1].push_paragraph(Paragraph::plain("ЛОР"));
        table.merge(1, 0, 1, 2);
        table.rows[1].cells[0].push_paragraph(Paragraph::plain("ДИАГНОЗ: <отит>"));
        let mut doc = Document::default();
        doc.content.push(Block::Table(table));
        doc
    }

    #[test]
    fn plain_text_joins_cells_with_tabs_and_keeps_lines() {
        let text = to_plain_text(&sample());
        assert_eq!(text, "01.02.2025\tОСМОТР\nЛОР\nДИАГНОЗ: <отит>\n");
    }

    #[test]
    fn html_keeps_spans_and_escapes_text() {
        let html = to_html(&sample());
        assert!(html.contains("size:A4"));
        assert!(html.contains("colspan=\"2\""));
        assert!(html.contains("ДИАГНОЗ: &lt;отит&gt;"));
        assert!(html.contains("table class=\"bordered\""));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let path = std::env::temp_dir().join("lorpaper_export.rtf");
        let err = save_with_format(&path, &sample(), &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(ext) if ext == "rtf"));
    }
}
