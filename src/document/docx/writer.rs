use std::{
    fs::File,
    io::{self, Write},
    path::Path,
};

use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::document::{
    html::html_to_blocks,
    model::{
        Block, Document, DocumentModel, ListType, Margins, Paragraph, ParagraphAlignment, Run,
        Table,
    },
};

const TWIPS_PER_PX: f32 = 15.0;
const TWIPS_PER_MM: f32 = 56.7;
const A4_WIDTH_TWIPS: i32 = 11906;
const A4_HEIGHT_TWIPS: i32 = 16838;
/// Report tables print as a 40mm label column and a 132mm text column.
const TWO_COLUMN_GRID_MM: [f32; 2] = [40.0, 132.0];

pub fn write_docx(path: &Path, model: &DocumentModel) -> io::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(content_types_xml().as_bytes())?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(root_rels_xml().as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", options)?;
    zip.write_all(document_rels_xml().as_bytes())?;

    zip.start_file("word/styles.xml", options)?;
    zip.write_all(styles_xml(model).as_bytes())?;

    zip.start_file("word/document.xml", options)?;
    zip.write_all(document_xml(model).as_bytes())?;

    zip.finish()?;
    Ok(())
}

/// Converts a rich-text fragment into a standalone document.
pub fn html_to_docx(html: &str, path: &Path) -> io::Result<()> {
    let model = Document {
        content: html_to_blocks(html),
        ..Document::default()
    };
    write_docx(path, &model)
}

fn content_types_xml() -> &'static str {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>
<Default Extension=\"xml\" ContentType=\"application/xml\"/>
<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>
<Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>
</Types>"
}

fn root_rels_xml() -> &'static str {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">
  <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>
</Relationships>"
}

fn document_rels_xml() -> &'static str {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">
  <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>
</Relationships>"
}

fn styles_xml(model: &DocumentModel) -> String {
    let family = escape_xml(model.metadata.default_font_family.as_str());
    let half_points = (model.metadata.default_font_size * 2.0).round() as i32;
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>
<w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">
  <w:docDefaults>
    <w:rPrDefault><w:rPr><w:rFonts w:ascii=\"{family}\" w:hAnsi=\"{family}\" w:cs=\"{family}\" w:eastAsia=\"{family}\"/><w:sz w:val=\"{half_points}\"/><w:szCs w:val=\"{half_points}\"/><w:lang w:val=\"ru-RU\"/></w:rPr></w:rPrDefault>
    <w:pPrDefault><w:pPr><w:spacing w:before=\"0\" w:after=\"0\" w:line=\"240\" w:lineRule=\"auto\"/></w:pPr></w:pPrDefault>
  </w:docDefaults>
  <w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\">
    <w:name w:val=\"Normal\"/>
    <w:rPr><w:rFonts w:ascii=\"{family}\" w:hAnsi=\"{family}\"/><w:sz w:val=\"{half_points}\"/></w:rPr>
  </w:style>
  <w:style w:type=\"table\" w:default=\"1\" w:styleId=\"TableNormal\">
    <w:name w:val=\"Normal Table\"/>
    <w:tblPr><w:tblCellMar><w:left w:w=\"30\" w:type=\"dxa\"/><w:right w:w=\"30\" w:type=\"dxa\"/></w:tblCellMar></w:tblPr>
  </w:style>
</w:styles>"
    )
}

fn document_xml(model: &DocumentModel) -> String {
    let mut body = String::new();
    for block in unwrap_single_cell(&model.content) {
        body.push_str(block_xml(block, &model.metadata.margins).as_str());
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>
<w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\" xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">
  <w:body>{body}{sect}</w:body>
</w:document>",
        sect = sect_pr_xml(&model.metadata.margins),
    )
}

/// A document that is only a 1x1 table is written as the table's content.
fn unwrap_single_cell(content: &[Block]) -> &[Block] {
    let tables: Vec<&Table> = content
        .iter()
        .filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
        .collect();
    let only_empty_paragraphs = content.iter().all(|b| match b {
        Block::Table(_) => true,
        Block::Paragraph(p) => p.is_empty(),
        Block::List(_) => false,
    });
    match tables.as_slice() {
        &[table] if only_empty_paragraphs && table.rows.len() == 1 && table.column_count() == 1 => {
            &table.rows[0].cells[0].blocks
        }
        _ => content,
    }
}

fn sect_pr_xml(margins: &Margins) -> String {
    let twips = |px: f32| (px * TWIPS_PER_PX).round() as i32;
    format!(
        "<w:sectPr><w:pgSz w:w=\"{A4_WIDTH_TWIPS}\" w:h=\"{A4_HEIGHT_TWIPS}\"/><w:pgMar w:top=\"{}\" w:right=\"{}\" w:bottom=\"{}\" w:left=\"{}\" w:header=\"0\" w:footer=\"0\" w:gutter=\"0\"/></w:sectPr>",
        twips(margins.top),
        twips(margins.right),
        twips(margins.bottom),
        twips(margins.left),
    )
}

fn grid_twips(table: &Table, margins: &Margins) -> Vec<i32> {
    if table.column_widths.len() == 2 {
        return TWO_COLUMN_GRID_MM
            .iter()
            .map(|mm| (mm * TWIPS_PER_MM).round() as i32)
            .collect();
    }
    let content = (A4_WIDTH_TWIPS as f32) - (margins.left + margins.right) * TWIPS_PER_PX;
    let total: f32 = table.column_widths.iter().sum::<f32>().max(1.0);
    table
        .column_widths
        .iter()
        .map(|w| (content * w / total).round() as i32)
        .collect()
}

/// Colspan of the cell that vertically covers `(row, col)`.
fn covering_span(table: &Table, row: usize, col: usize) -> u16 {
    (0..row)
        .rev()
        .filter_map(|r| table.rows[r].cells.get(col))
        .find(|c| c.rowspan > 0)
        .map(|c| c.colspan.max(1))
        .unwrap_or(1)
}

fn table_xml(table: &Table, margins: &Margins) -> String {
    let mut out = String::from("<w:tbl><w:tblPr><w:tblW w:w=\"0\" w:type=\"auto\"/><w:tblLayout w:type=\"fixed\"/>");
    let border = if table.borders {
        "w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"000000\""
    } else {
        "w:val=\"nil\""
    };
    out.push_str("<w:tblBorders>");
    for side in ["top", "left", "bottom", "right", "insideH", "insideV"] {
        out.push_str(format!("<w:{side} {border}/>").as_str());
    }
    out.push_str("</w:tblBorders></w:tblPr><w:tblGrid>");
    for width in grid_twips(table, margins) {
        out.push_str(format!("<w:gridCol w:w=\"{width}\"/>").as_str());
    }
    out.push_str("</w:tblGrid>");

    for (r, row) in table.rows.iter().enumerate() {
        out.push_str("<w:tr><w:trPr><w:cantSplit/></w:trPr>");
        for (c, cell) in row.cells.iter().enumerate() {
            if cell.colspan == 0 {
                continue;
            }
            if cell.rowspan == 0 {
                let span = covering_span(table, r, c);
                out.push_str("<w:tc><w:tcPr>");
                if span > 1 {
                    out.push_str(format!("<w:gridSpan w:val=\"{span}\"/>").as_str());
                }
                out.push_str("<w:vMerge/></w:tcPr><w:p/></w:tc>");
                continue;
            }
            out.push_str("<w:tc><w:tcPr>");
            if cell.colspan > 1 {
                out.push_str(format!("<w:gridSpan w:val=\"{}\"/>", cell.colspan).as_str());
            }
            if cell.rowspan > 1 {
                out.push_str("<w:vMerge w:val=\"restart\"/>");
            }
            out.push_str("</w:tcPr>");
            for nested in &cell.blocks {
                out.push_str(block_xml(nested, margins).as_str());
            }
            // A cell must end with a paragraph.
            if !matches!(cell.blocks.last(), Some(Block::Paragraph(_))) {
                out.push_str("<w:p/>");
            }
            out.push_str("</w:tc>");
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
    out
}

fn block_xml(block: &Block, margins: &Margins) -> String {
    match block {
        Block::Paragraph(p) => paragraph_xml(p),
        Block::List(list) => {
            let mut out = String::new();
            for (idx, item) in list.items.iter().enumerate() {
                let marker = match list.list_type {
                    ListType::Bullet => "\u{2022} ".to_string(),
                    ListType::Numbered => format!("{}. ", idx + 1),
                };
                let mut paragraph = Paragraph::new();
                paragraph.indent.left = 18.0;
                paragraph.push(Run::plain(marker));
                for run in &item.runs {
                    paragraph.push(run.clone());
                }
                out.push_str(paragraph_xml(&paragraph).as_str());
            }
            out
        }
        Block::Table(table) => table_xml(table, margins),
    }
}

fn paragraph_xml(p: &Paragraph) -> String {
    let mut out = String::from("<w:p>");

    let jc = match p.alignment {
        ParagraphAlignment::Left => None,
        ParagraphAlignment::Center => Some("center"),
        ParagraphAlignment::Right => Some("right"),
        ParagraphAlignment::Justify => Some("both"),
    };
    let has_spacing = p.spacing.before > 0.0 || p.spacing.after > 0.0 || p.spacing.line.is_some();
    let has_indent = p.indent.left > 0.0 || p.indent.first_line > 0.0;
    if jc.is_some() || has_spacing || has_indent {
        out.push_str("<w:pPr>");
        if has_spacing {
            let twips = |px: f32| (px * TWIPS_PER_PX).round() as i32;
            out.push_str(
                format!(
                    "<w:spacing w:before=\"{}\" w:after=\"{}\"",
                    twips(p.spacing.before),
                    twips(p.spacing.after)
                )
                .as_str(),
            );
            if let Some(line) = p.spacing.line {
                out.push_str(
                    format!(" w:line=\"{}\" w:lineRule=\"exact\"", twips(line).max(20)).as_str(),
                );
            }
            out.push_str("/>");
        }
        if has_indent {
            out.push_str(
                format!(
                    "<w:ind w:left=\"{}\" w:firstLine=\"{}\"/>",
                    (p.indent.left * TWIPS_PER_PX).round() as i32,
                    (p.indent.first_line * TWIPS_PER_PX).round() as i32,
                )
                .as_str(),
            );
        }
        if let Some(jc) = jc {
            out.push_str(format!("<w:jc w:val=\"{jc}\"/>").as_str());
        }
        out.push_str("</w:pPr>");
    }

    for run in &p.runs {
        out.push_str(run_xml(run).as_str());
    }
    out.push_str("</w:p>");
    out
}

fn run_xml(run: &Run) -> String {
    let mut out = String::from("<w:r>");
    if !run.style.is_plain() {
        out.push_str("<w:rPr>");
        if let Some(ff) = &run.style.font_family {
            let ff = escape_xml(ff);
            out.push_str(format!("<w:rFonts w:ascii=\"{ff}\" w:hAnsi=\"{ff}\" w:cs=\"{ff}\"/>").as_str());
        }
        if run.style.bold {
            out.push_str("<w:b/>");
        }
        if run.style.italic {
            out.push_str("<w:i/>");
        }
        if run.style.underline {
            out.push_str("<w:u w:val=\"single\"/>");
        }
        if let Some(size) = run.style.font_size {
            out.push_str(format!("<w:sz w:val=\"{}\"/>", (size * 2.0).round() as i32).as_str());
        }
        out.push_str("</w:rPr>");
    }
    for (i, piece) in run.text.split('\n').enumerate() {
        if i > 0 {
            out.push_str("<w:br/>");
        }
        if !piece.is_empty() {
            out.push_str(
                format!("<w:t xml:space=\"preserve\">{}</w:t>", escape_xml(piece)).as_str(),
            );
        }
    }
    out.push_str("</w:r>");
    out
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
