use std::{
    fs::File,
    io::{self, Write},
    path::Path,
};

use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::document::model::{
    Block, DocumentModel, ListType, MM_TO_PX, Paragraph, ParagraphAlignment, Run, RunStyle, Table,
};

const MIMETYPE: &str = "application/vnd.oasis.opendocument.text";

/// Run styles used by the document, in first-use order. `T{n}` names index into it.
#[derive(Debug, Default)]
struct TextStyles {
    styles: Vec<RunStyle>,
}

impl TextStyles {
    fn collect(model: &DocumentModel) -> Self {
        let mut out = Self::default();
        for block in &model.content {
            out.visit(block);
        }
        out
    }

    fn visit(&mut self, block: &Block) {
        match block {
            Block::Paragraph(p) => p.runs.iter().for_each(|r| self.add(&r.style)),
            Block::List(list) => list
                .items
                .iter()
                .flat_map(|item| item.runs.iter())
                .for_each(|r| self.add(&r.style)),
            Block::Table(table) => {
                for cell in table.rows.iter().flat_map(|row| row.cells.iter()) {
                    for nested in &cell.blocks {
                        self.visit(nested);
                    }
                }
            }
        }
    }

    fn add(&mut self, style: &RunStyle) {
        if !style.is_plain() && !self.styles.contains(style) {
            self.styles.push(style.clone());
        }
    }

    fn name_of(&self, style: &RunStyle) -> Option<String> {
        self.styles
            .iter()
            .position(|s| s == style)
            .map(|i| format!("T{}", i + 1))
    }
}

pub fn write_odt(path: &Path, model: &DocumentModel) -> io::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // Readers sniff the package type from the first, uncompressed entry.
    zip.start_file("mimetype", stored)?;
    zip.write_all(MIMETYPE.as_bytes())?;

    zip.start_file("META-INF/manifest.xml", deflated)?;
    zip.write_all(manifest_xml().as_bytes())?;

    zip.start_file("styles.xml", deflated)?;
    zip.write_all(styles_xml(model).as_bytes())?;

    zip.start_file("content.xml", deflated)?;
    zip.write_all(content_xml(model).as_bytes())?;

    zip.finish()?;
    Ok(())
}

fn manifest_xml() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<manifest:manifest xmlns:manifest=\"urn:oasis:names:tc:opendocument:xmlns:manifest:1.0\" manifest:version=\"1.2\">
 <manifest:file-entry manifest:full-path=\"/\" manifest:version=\"1.2\" manifest:media-type=\"{MIMETYPE}\"/>
 <manifest:file-entry manifest:full-path=\"content.xml\" manifest:media-type=\"text/xml\"/>
 <manifest:file-entry manifest:full-path=\"styles.xml\" manifest:media-type=\"text/xml\"/>
</manifest:manifest>"
    )
}

fn mm(px: f32) -> String {
    format!("{:.2}mm", px / MM_TO_PX)
}

fn styles_xml(model: &DocumentModel) -> String {
    let meta = &model.metadata;
    let (width, height) = meta.page_size.dimensions_px();
    let family = escape_xml(meta.default_font_family.as_str());
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<office:document-styles xmlns:office=\"urn:oasis:names:tc:opendocument:xmlns:office:1.0\" xmlns:style=\"urn:oasis:names:tc:opendocument:xmlns:style:1.0\" xmlns:text=\"urn:oasis:names:tc:opendocument:xmlns:text:1.0\" xmlns:fo=\"urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0\" xmlns:svg=\"urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0\" office:version=\"1.2\">
 <office:font-face-decls><style:font-face style:name=\"{family}\" svg:font-family=\"'{family}'\" style:font-family-generic=\"roman\"/></office:font-face-decls>
 <office:styles>
  <style:default-style style:family=\"paragraph\"><style:paragraph-properties fo:margin-top=\"0mm\" fo:margin-bottom=\"0mm\"/><style:text-properties style:font-name=\"{family}\" fo:font-size=\"{size}pt\" fo:language=\"ru\" fo:country=\"RU\"/></style:default-style>
  <style:style style:name=\"Standard\" style:family=\"paragraph\"/>
 </office:styles>
 <office:automatic-styles>
  <style:page-layout style:name=\"pm1\"><style:page-layout-properties fo:page-width=\"{width}\" fo:page-height=\"{height}\" style:print-orientation=\"portrait\" fo:margin-top=\"{top}\" fo:margin-bottom=\"{bottom}\" fo:margin-left=\"{left}\" fo:margin-right=\"{right}\"/></style:page-layout>
 </office:automatic-styles>
 <office:master-styles><style:master-page style:name=\"Standard\" style:page-layout-name=\"pm1\"/></office:master-styles>
</office:document-styles>",
        size = meta.default_font_size,
        width = mm(width),
        height = mm(height),
        top = mm(meta.margins.top),
        bottom = mm(meta.margins.bottom),
        left = mm(meta.margins.left),
        right = mm(meta.margins.right),
    )
}

fn automatic_styles(model: &DocumentModel, text_styles: &TextStyles) -> String {
    let mut out = String::from("<office:automatic-styles>");
    for (name, align) in [
        ("P1", "start"),
        ("P2", "center"),
        ("P3", "end"),
        ("P4", "justify"),
    ] {
        out.push_str(
            format!("<style:style style:name=\"{name}\" style:family=\"paragraph\" style:parent-style-name=\"Standard\"><style:paragraph-properties fo:text-align=\"{align}\"/></style:style>")
                .as_str(),
        );
    }
    out.push_str("<style:style style:name=\"P5\" style:family=\"paragraph\" style:parent-style-name=\"Standard\"><style:paragraph-properties fo:line-height=\"1pt\"/><style:text-properties fo:font-size=\"1pt\"/></style:style>");
    for (i, style) in text_styles.styles.iter().enumerate() {
        let mut props = String::new();
        if style.bold {
            props.push_str(" fo:font-weight=\"bold\"");
        }
        if style.italic {
            props.push_str(" fo:font-style=\"italic\"");
        }
        if style.underline {
            props.push_str(" style:text-underline-style=\"solid\" style:text-underline-width=\"auto\" style:text-underline-color=\"font-color\"");
        }
        if let Some(size) = style.font_size {
            props.push_str(format!(" fo:font-size=\"{size}pt\"").as_str());
        }
        if let Some(family) = &style.font_family {
            props.push_str(format!(" style:font-name=\"{}\"", escape_xml(family)).as_str());
        }
        out.push_str(
            format!(
                "<style:style style:name=\"T{}\" style:family=\"text\"><style:text-properties{props}/></style:style>",
                i + 1
            )
            .as_str(),
        );
    }

    let content_width = {
        let (page_w, _) = model.metadata.page_size.dimensions_px();
        page_w - model.metadata.margins.left - model.metadata.margins.right
    };
    for (t, table) in tables(model).into_iter().enumerate() {
        out.push_str(
            format!(
                "<style:style style:name=\"Table{n}\" style:family=\"table\"><style:table-properties style:width=\"{w}\" table:align=\"left\"/></style:style>",
                n = t + 1,
                w = mm(content_width)
            )
            .as_str(),
        );
        let total: f32 = table.column_widths.iter().sum::<f32>().max(1.0);
        for (c, width) in table.column_widths.iter().enumerate() {
            out.push_str(
                format!(
                    "<style:style style:name=\"Table{n}.C{c}\" style:family=\"table-column\"><style:table-column-properties style:column-width=\"{w}\"/></style:style>",
                    n = t + 1,
                    w = mm(content_width * width / total)
                )
                .as_str(),
            );
        }
    }
    out.push_str("<style:style style:name=\"CellB\" style:family=\"table-cell\"><style:table-cell-properties fo:padding=\"0.5mm\" fo:border=\"0.5pt solid #000000\"/></style:style>");
    out.push_str("<style:style style:name=\"CellN\" style:family=\"table-cell\"><style:table-cell-properties fo:padding=\"0.5mm\" fo:border=\"none\"/></style:style>");
    out.push_str("</office:automatic-styles>");
    out
}

/// Tables in document order, nested ones included, matching `Table{n}` naming.
fn tables(model: &DocumentModel) -> Vec<&Table> {
    fn walk<'a>(block: &'a Block, out: &mut Vec<&'a Table>) {
        if let Block::Table(table) = block {
            out.push(table);
            for cell in table.rows.iter().flat_map(|r| r.cells.iter()) {
                for nested in &cell.blocks {
                    walk(nested, out);
                }
            }
        }
    }
    let mut out = Vec::new();
    for block in &model.content {
        walk(block, &mut out);
    }
    out
}

struct ContentWriter<'a> {
    text_styles: &'a TextStyles,
    out: String,
    table_counter: usize,
}

impl ContentWriter<'_> {
    fn block(&mut self, block: &Block) {
        match block {
            Block::Paragraph(p) => self.paragraph(p),
            Block::List(list) => {
                self.out.push_str("<text:list>");
                for (i, item) in list.items.iter().enumerate() {
                    self.out.push_str("<text:list-item><text:p text:style-name=\"P1\">");
                    if list.list_type == ListType::Numbered {
                        self.out.push_str(format!("{}. ", i + 1).as_str());
                    } else {
                        self.out.push_str("\u{2022} ");
                    }
                    self.runs(&item.runs);
                    self.out.push_str("</text:p></text:list-item>");
                }
                self.out.push_str("</text:list>");
            }
            Block::Table(table) => self.table(table),
        }
    }

    fn paragraph(&mut self, p: &Paragraph) {
        let style = if p.spacing.line.is_some_and(|line| line <= 2.0) {
            "P5"
        } else {
            match p.alignment {
                ParagraphAlignment::Left => "P1",
                ParagraphAlignment::Center => "P2",
                ParagraphAlignment::Right => "P3",
                ParagraphAlignment::Justify => "P4",
            }
        };
        self.out
            .push_str(format!("<text:p text:style-name=\"{style}\">").as_str());
        self.runs(&p.runs);
        self.out.push_str("</text:p>");
    }

    fn runs(&mut self, runs: &[Run]) {
        for run in runs {
            let text = text_xml(run.text.as_str());
            match self.text_styles.name_of(&run.style) {
                Some(name) => self.out.push_str(
                    format!("<text:span text:style-name=\"{name}\">{text}</text:span>").as_str(),
                ),
                None => self.out.push_str(text.as_str()),
            }
        }
    }

    fn table(&mut self, table: &Table) {
        self.table_counter += 1;
        let n = self.table_counter;
        let cell_style = if table.borders { "CellB" } else { "CellN" };
        self.out.push_str(
            format!("<table:table table:name=\"Table{n}\" table:style-name=\"Table{n}\">").as_str(),
        );
        for c in 0..table.column_widths.len() {
            self.out.push_str(
                format!("<table:table-column table:style-name=\"Table{n}.C{c}\"/>").as_str(),
            );
        }
        for row in &table.rows {
            self.out.push_str("<table:table-row>");
            for cell in &row.cells {
                if cell.is_covered() {
                    self.out.push_str("<table:covered-table-cell/>");
                    continue;
                }
                self.out.push_str(
                    format!("<table:table-cell table:style-name=\"{cell_style}\" office:value-type=\"string\"")
                        .as_str(),
                );
                if cell.colspan > 1 {
                    self.out.push_str(
                        format!(" table:number-columns-spanned=\"{}\"", cell.colspan).as_str(),
                    );
                }
                if cell.rowspan > 1 {
                    self.out.push_str(
                        format!(" table:number-rows-spanned=\"{}\"", cell.rowspan).as_str(),
                    );
                }
                self.out.push('>');
                for nested in &cell.blocks {
                    self.block(nested);
                }
                if cell.blocks.is_empty() {
                    self.out.push_str("<text:p text:style-name=\"P1\"/>");
                }
                self.out.push_str("</table:table-cell>");
            }
            self.out.push_str("</table:table-row>");
        }
        self.out.push_str("</table:table>");
    }
}

fn content_xml(model: &DocumentModel) -> String {
    let text_styles = TextStyles::collect(model);
    let mut writer = ContentWriter {
        text_styles: &text_styles,
        out: String::new(),
        table_counter: 0,
    };
    for block in &model.content {
        writer.block(block);
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>
<office:document-content xmlns:office=\"urn:oasis:names:tc:opendocument:xmlns:office:1.0\" xmlns:style=\"urn:oasis:names:tc:opendocument:xmlns:style:1.0\" xmlns:text=\"urn:oasis:names:tc:opendocument:xmlns:text:1.0\" xmlns:table=\"urn:oasis:names:tc:opendocument:xmlns:table:1.0\" xmlns:fo=\"urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0\" office:version=\"1.2\">
{styles}
<office:body><office:text>{body}</office:text></office:body>
</office:document-content>",
        styles = automatic_styles(model, &text_styles),
        body = writer.out,
    )
}

/// Escapes text and maps tabs, line breaks, and runs of spaces to ODF elements.
fn text_xml(text: &str) -> String {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in text.chars() {
        match ch {
            '\t' => out.push_str("<text:tab/>"),
            '\n' => out.push_str("<text:line-break/>"),
            ' ' if prev_space => out.push_str("<text:s/>"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
        prev_space = ch == ' ';
    }
    out
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use std::{
        fs,
        io::Read,
        path::PathBuf,
        time::{SystemTime, UNIX_EPOCH},
    };

    use zip::ZipArchive;

    use super::*;
    use crate::document::model::{Document, Paragraph, Run, Table};

    fn unique_temp(name: &str) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("lorpaper-odt-{name}-{stamp}.odt"))
    }

    fn report() -> Document {
        let mut table = Table::new(2, 2, vec![21.0, 79.0]);
        let mut p = Paragraph::new();
        p.push(Run::bold("Жалобы:"));
        p.push(Run::plain("  нет"));
        table.rows[0].cells[1].push_paragraph(p);
        table.merge(1, 0, 1, 2);
        let mut doc = Document::default();
        doc.content.push(Block::Table(table));
        doc
    }

    #[test]
    fn mimetype_is_the_first_stored_entry() {
        let output = unique_temp("mimetype");
        write_odt(&output, &report()).expect("write odt");

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        {
            let mut first = archive.by_index(0).unwrap();
            assert_eq!(first.name(), "mimetype");
            assert_eq!(first.compression(), CompressionMethod::Stored);
            let mut body = String::new();
            first.read_to_string(&mut body).unwrap();
            assert_eq!(body, MIMETYPE);
        }
        for part in ["META-INF/manifest.xml", "content.xml", "styles.xml"] {
            assert!(archive.by_name(part).is_ok(), "{part} missing");
        }
        let _ = fs::remove_file(output);
    }

    #[test]
    fn content_has_spans_covered_cells_and_styles() {
        let xml = content_xml(&report());
        assert!(xml.contains("table:number-columns-spanned=\"2\""));
        assert!(xml.contains("<table:covered-table-cell/>"));
        assert!(xml.contains("<text:span text:style-name=\"T1\">Жалобы:</text:span>"));
        assert!(xml.contains(" <text:s/>нет"));
        assert!(xml.contains("fo:font-weight=\"bold\""));
    }

    #[test]
    fn styles_carry_a4_page_and_margins() {
        let xml = styles_xml(&Document::default());
        assert!(xml.contains("fo:page-width=\"210.08mm\""));
        assert!(xml.contains("fo:margin-left=\"24.87mm\""));
        assert!(xml.contains("Times New Roman"));
    }
}
