//! Pushes top-level blocks and table rows across page boundaries.
//!
//! The document is one continuous surface whose height is a whole number of
//! pages. A unit (paragraph, list, or table row) that would cross the bottom
//! margin gets a top offset that moves it below the next page's top margin.

use crate::document::layout::TextLayout;
use crate::document::model::{Block, Document};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaginationOutcome {
    pub pages: usize,
    pub height: f32,
    /// The surface height differs from the previous pass.
    pub changed: bool,
}

struct Cursor {
    page_height: f32,
    margin_top: f32,
    margin_bottom: f32,
    page_index: usize,
    current_y: f32,
}

impl Cursor {
    /// Places a unit of height `h` and returns the offset it needs.
    fn place(&mut self, h: f32) -> f32 {
        let page_end =
            self.page_index as f32 * self.page_height + self.page_height - self.margin_bottom;
        let offset = if self.current_y + h > page_end + 1.0 {
            self.page_index += 1;
            let offset =
                (self.page_index as f32 * self.page_height + self.margin_top - self.current_y)
                    .max(0.0);
            self.current_y += offset + h;
            offset
        } else {
            self.current_y += h;
            0.0
        };
        let containing = (self.current_y / self.page_height).floor() as usize;
        self.page_index = self.page_index.max(containing);
        offset
    }
}

/// Recomputes every pagination offset in `doc`.
pub fn paginate(
    doc: &mut Document,
    layout: &TextLayout<'_>,
    previous_height: f32,
) -> PaginationOutcome {
    let (page_w, page_h) = doc.page_dimensions();
    let margins = doc.metadata.margins;
    let width = page_w - margins.left - margins.right;
    let mut cursor = Cursor {
        page_height: page_h,
        margin_top: margins.top,
        margin_bottom: margins.bottom,
        page_index: 0,
        current_y: margins.top,
    };

    for block in &mut doc.content {
        match block {
            Block::Paragraph(p) => {
                p.top_margin = 0.0;
                let h = layout.paragraph_height(p, width);
                p.top_margin = cursor.place(h);
            }
            Block::List(list) => {
                list.top_margin = 0.0;
                let h: f32 = layout.list_lines(list, width).iter().map(|l| l.height).sum();
                list.top_margin = cursor.place(h);
            }
            Block::Table(table) => {
                for row in &mut table.rows {
                    row.top_margin = 0.0;
                }
                let heights = layout.table_row_heights(table, width);
                for (row, h) in table.rows.iter_mut().zip(heights) {
                    row.top_margin = cursor.place(h);
                }
            }
        }
    }

    let total = cursor.current_y + margins.bottom;
    let pages = ((total / page_h).ceil() as usize).max(1);
    let height = pages as f32 * page_h;
    let outcome = PaginationOutcome {
        pages,
        height,
        changed: height != previous_height,
    };
    log::debug!(
        "paginated: {} pages, content ends at {:.1}px, changed={}",
        outcome.pages,
        cursor.current_y,
        outcome.changed
    );
    outcome
}
