//! PDF export through `pdf-writer`.
//!
//! Pages are cut from the continuous layout surface: a line belongs to the
//! page its top edge falls on. Text is encoded as Windows-1251 and drawn with
//! two simple fonts, `F1` (regular) and `F2` (bold).

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use encoding_rs::WINDOWS_1251;
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str};

use crate::document::{
    export::ExportOptions,
    layout::{ApproxMetrics, PlacedLine, TextLayout, TextMeasurer},
    model::{DocumentModel, RunStyle},
};

const PT_PER_PX: f32 = 0.75;
const FIRST_CHAR: u8 = 32;

const FONT_CANDIDATES: &[(&str, &str)] = &[
    (
        "/usr/share/fonts/truetype/liberation/LiberationSerif-Regular.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSerif-Bold.ttf",
    ),
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSerif-Bold.ttf",
    ),
    ("C:/Windows/Fonts/times.ttf", "C:/Windows/Fonts/timesbd.ttf"),
    (
        "/Library/Fonts/Times New Roman.ttf",
        "/Library/Fonts/Times New Roman Bold.ttf",
    ),
];

#[derive(Debug, Clone, PartialEq)]
enum FontSource {
    Embedded(PathBuf),
    Standard(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
struct FontPair {
    regular: FontSource,
    bold: FontSource,
}

fn standard_fonts() -> FontPair {
    FontPair {
        regular: FontSource::Standard("Times-Roman"),
        bold: FontSource::Standard("Times-Bold"),
    }
}

fn resolve_fonts(options: &ExportOptions) -> FontPair {
    if let Some(regular) = &options.pdf_font_regular {
        if !regular.is_file() {
            log::warn!(
                "pdf font {} not found, using standard Times",
                regular.display()
            );
            return standard_fonts();
        }
        let bold = options
            .pdf_font_bold
            .as_ref()
            .filter(|p| p.is_file())
            .unwrap_or(regular);
        return FontPair {
            regular: FontSource::Embedded(regular.clone()),
            bold: FontSource::Embedded(bold.clone()),
        };
    }

    for (regular, bold) in FONT_CANDIDATES {
        let regular = Path::new(regular);
        if regular.is_file() {
            let bold = Path::new(bold);
            let bold = if bold.is_file() { bold } else { regular };
            return FontPair {
                regular: FontSource::Embedded(regular.to_path_buf()),
                bold: FontSource::Embedded(bold.to_path_buf()),
            };
        }
    }
    log::warn!("no TrueType serif font found, using standard Times without embedding");
    standard_fonts()
}

/// Maps a character to its single-byte Windows-1251 code, `?` when unmappable.
fn encode_char(ch: char) -> u8 {
    if ch.is_ascii() {
        return ch as u8;
    }
    if ch == '\u{00A0}' {
        return b' ';
    }
    let mut buf = [0u8; 4];
    let (bytes, _, had_errors) = WINDOWS_1251.encode(ch.encode_utf8(&mut buf));
    match bytes.first() {
        Some(&b) if !had_errors && bytes.len() == 1 => b,
        _ => b'?',
    }
}

fn encode_text(text: &str) -> Vec<u8> {
    text.chars().map(encode_char).collect()
}

fn decode_byte(byte: u8) -> Option<char> {
    let bytes = [byte];
    let (text, had_errors) = WINDOWS_1251.decode_without_bom_handling(&bytes);
    if had_errors {
        return None;
    }
    text.chars().next()
}

/// Adobe glyph list name for a character of the upper half of Windows-1251.
fn glyph_name(ch: char) -> String {
    let code = ch as u32;
    match code {
        0x0401 => "afii10023".to_string(),
        0x0451 => "afii10071".to_string(),
        0x0410..=0x0415 => format!("afii{}", 10017 + code - 0x0410),
        0x0416..=0x042F => format!("afii{}", 10024 + code - 0x0416),
        0x0430..=0x0435 => format!("afii{}", 10065 + code - 0x0430),
        0x0436..=0x044F => format!("afii{}", 10072 + code - 0x0436),
        _ => format!("uni{code:04X}"),
    }
}

fn differences() -> Vec<String> {
    (128u8..=255)
        .map(|b| decode_byte(b).map_or_else(|| ".notdef".to_string(), glyph_name))
        .collect()
}

/// Writes a simple font dictionary with a Windows-1251 encoding.
fn write_font(
    pdf: &mut Pdf,
    alloc: &mut impl FnMut() -> Ref,
    id: Ref,
    source: &FontSource,
    bold: bool,
) -> io::Result<()> {
    let names = differences();
    match source {
        FontSource::Standard(base) => {
            let mut font = pdf.indirect(id).dict();
            font.pair(Name(b"Type"), Name(b"Font"));
            font.pair(Name(b"Subtype"), Name(b"Type1"));
            font.pair(Name(b"BaseFont"), Name(base.as_bytes()));
            write_encoding(&mut font, &names);
        }
        FontSource::Embedded(path) => {
            let data = fs::read(path)?;
            let base = base_font_name(path);
            let descriptor_id = alloc();
            let file_id = alloc();

            pdf.stream(file_id, &data)
                .pair(Name(b"Length1"), data.len() as i32);

            {
                let mut descriptor = pdf.indirect(descriptor_id).dict();
                descriptor.pair(Name(b"Type"), Name(b"FontDescriptor"));
                descriptor.pair(Name(b"FontName"), Name(base.as_bytes()));
                descriptor.pair(Name(b"Flags"), 32);
                descriptor
                    .insert(Name(b"FontBBox"))
                    .array()
                    .items([-570, -310, 1600, 1010]);
                descriptor.pair(Name(b"ItalicAngle"), 0);
                descriptor.pair(Name(b"Ascent"), 891);
                descriptor.pair(Name(b"Descent"), -216);
                descriptor.pair(Name(b"CapHeight"), 662);
                descriptor.pair(Name(b"StemV"), if bold { 140 } else { 80 });
                descriptor.pair(Name(b"FontFile2"), file_id);
            }

            let style = RunStyle {
                bold,
                ..RunStyle::default()
            };
            let widths: Vec<f32> = (FIRST_CHAR..=255)
                .map(|b| {
                    let ch = decode_byte(b).unwrap_or(' ');
                    ApproxMetrics.char_width(ch, 1000.0, &style).round()
                })
                .collect();

            let mut font = pdf.indirect(id).dict();
            font.pair(Name(b"Type"), Name(b"Font"));
            font.pair(Name(b"Subtype"), Name(b"TrueType"));
            font.pair(Name(b"BaseFont"), Name(base.as_bytes()));
            font.pair(Name(b"FirstChar"), i32::from(FIRST_CHAR));
            font.pair(Name(b"LastChar"), 255);
            font.insert(Name(b"Widths")).array().items(widths);
            font.pair(Name(b"FontDescriptor"), descriptor_id);
            write_encoding(&mut font, &names);
        }
    }
    Ok(())
}

fn write_encoding(font: &mut pdf_writer::Dict<'_>, names: &[String]) {
    let mut encoding = font.insert(Name(b"Encoding")).dict();
    encoding.pair(Name(b"Type"), Name(b"Encoding"));
    encoding.pair(Name(b"BaseEncoding"), Name(b"WinAnsiEncoding"));
    let mut diffs = encoding.insert(Name(b"Differences")).array();
    diffs.item(128);
    for name in names {
        diffs.item(Name(name.as_bytes()));
    }
}

fn base_font_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Embedded");
    let name: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if name.is_empty() {
        "Embedded".to_string()
    } else {
        name
    }
}

fn page_of(line: &PlacedLine, page_h: f32) -> usize {
    (line.y / page_h).floor().max(0.0) as usize
}

fn page_content(
    lines: &[&PlacedLine],
    page_index: usize,
    page_w: f32,
    page_h: f32,
    split_line: bool,
) -> Content {
    let mut content = Content::new();
    let page_top = page_index as f32 * page_h;
    let height_pt = page_h * PT_PER_PX;

    for placed in lines {
        let baseline = placed.y - page_top + placed.line.baseline;
        let y = height_pt - baseline * PT_PER_PX;
        for fragment in &placed.line.fragments {
            if fragment.text.trim().is_empty() {
                continue;
            }
            let x = (placed.x + fragment.x) * PT_PER_PX;
            let size = fragment.font_px * PT_PER_PX;
            let font = if fragment.style.bold { Name(b"F2") } else { Name(b"F1") };
            let bytes = encode_text(fragment.text.as_str());
            content
                .begin_text()
                .set_font(font, size)
                .next_line(x, y)
                .show(Str(&bytes))
                .end_text();

            if fragment.style.underline {
                let under = y - size * 0.12;
                content
                    .set_line_width(size / 18.0)
                    .move_to(x, under)
                    .line_to(x + fragment.width * PT_PER_PX, under)
                    .stroke();
            }
        }
    }

    if split_line {
        let mid = height_pt / 2.0;
        content
            .save_state()
            .set_line_width(0.5)
            .set_dash_pattern([4.0, 3.0], 0.0)
            .move_to(0.0, mid)
            .line_to(page_w * PT_PER_PX, mid)
            .stroke()
            .restore_state();
    }
    content
}

pub fn write_pdf(path: &Path, model: &DocumentModel, options: &ExportOptions) -> io::Result<()> {
    let bytes = render_pdf(model, options)?;
    fs::write(path, bytes)
}

/// Renders the document to PDF bytes.
pub fn render_pdf(model: &DocumentModel, options: &ExportOptions) -> io::Result<Vec<u8>> {
    let layout = TextLayout::new(&ApproxMetrics, model.metadata.default_font_size);
    let placed = layout.place_document(model);
    let (page_w, page_h) = model.page_dimensions();

    let page_count = placed
        .lines
        .iter()
        .map(|line| page_of(line, page_h) + 1)
        .max()
        .unwrap_or(1);

    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let regular_id = alloc();
    let bold_id = alloc();

    let fonts = resolve_fonts(options);
    write_font(&mut pdf, &mut alloc, regular_id, &fonts.regular, false)?;
    write_font(&mut pdf, &mut alloc, bold_id, &fonts.bold, true)?;

    let page_ids: Vec<Ref> = (0..page_count).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..page_count).map(|_| alloc()).collect();

    for (index, content_id) in content_ids.iter().enumerate() {
        let lines: Vec<&PlacedLine> = placed
            .lines
            .iter()
            .filter(|line| page_of(line, page_h) == index)
            .collect();
        let data = page_content(&lines, index, page_w, page_h, options.split_line).finish();
        pdf.stream(*content_id, &data);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(page_count as i32);

    for (page_id, content_id) in page_ids.iter().zip(&content_ids) {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, page_w * PT_PER_PX, page_h * PT_PER_PX))
            .parent(pages_id)
            .contents(*content_id);
        page.resources()
            .fonts()
            .pair(Name(b"F1"), regular_id)
            .pair(Name(b"F2"), bold_id);
    }

    log::debug!("pdf: {page_count} page(s), {} line(s)", placed.lines.len());
    Ok(pdf.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::model::{Block, Document, Paragraph, Run};

    fn missing_font_options() -> ExportOptions {
        ExportOptions {
            pdf_font_regular: Some(PathBuf::from("/nonexistent/lorpaper/font.ttf")),
            ..ExportOptions::default()
        }
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn cyrillic_maps_to_cp1251_bytes() {
        assert_eq!(encode_text("Ая ё"), vec![0xC0, 0xFF, b' ', 0xB8]);
        assert_eq!(encode_char('\u{4E2D}'), b'?');
        assert_eq!(glyph_name('Ж'), "afii10024");
        assert_eq!(glyph_name('я'), "afii10097");
        assert_eq!(glyph_name('№'), "uni2116");
    }

    #[test]
    fn upper_half_bytes_decode_back_to_their_characters() {
        assert_eq!(decode_byte(b'A'), Some('A'));
        assert_eq!(decode_byte(0xC0), Some('А'));
        assert_eq!(decode_byte(0xB9), Some('№'));
        for ch in ['Ж', 'я', 'ё', '№'] {
            assert_eq!(decode_byte(encode_char(ch)), Some(ch));
        }
    }

    #[test]
    fn empty_document_still_has_one_page() {
        let bytes = render_pdf(&Document::default(), &missing_font_options()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(count(&bytes, b"/Count 1") == 1);
        assert!(count(&bytes, b"/Times-Roman") >= 1);
    }

    #[test]
    fn pushed_content_lands_on_a_second_page() {
        let mut doc = Document::default();
        doc.content.push(Block::Paragraph(Paragraph::plain("Осмотр ЛОР")));
        let mut second = Paragraph::new();
        second.push(Run::bold("ДИАГНОЗ:"));
        second.top_margin = 1200.0;
        doc.content.push(Block::Paragraph(second));

        let bytes = render_pdf(&doc, &missing_font_options()).unwrap();
        assert!(count(&bytes, b"/Count 2") == 1);
        assert!(count(&bytes, b"/Times-Bold") >= 1);
    }

    #[test]
    fn split_line_is_dashed() {
        let options = ExportOptions {
            split_line: true,
            ..missing_font_options()
        };
        let bytes = render_pdf(&Document::default(), &options).unwrap();
        assert!(count(&bytes, b"[4 3] 0 d") == 1);
    }
}
