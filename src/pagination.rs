//! Pagination – splits positioned boxes into pages.
//!
//! Handles:
//! - page boundaries for any page size
//! - page-break-before / page-break-after hints
//! - table splitting between rows, repeating header rows on each new page
//! - text alignment and baselines for every wrapped line

use crate::fonts::FontManager;
use crate::layout::{BoxContent, BoxKind, PositionedBox};
use crate::layout_config::*;

/// Default page margins in points.
pub const PAGE_MARGIN_PT: f32 = 40.0;

/// Gap between a list marker and its item box.
const LIST_MARKER_GAP: f32 = 4.0;

/// Recursively expand any pure-container box whose height exceeds a single
/// page so its children can be split across pages individually.
fn flatten_for_pagination(boxes: &[PositionedBox], content_height: f32) -> Vec<&PositionedBox> {
    let mut result = Vec::new();
    for pbox in boxes {
        if pbox.height > content_height
            && pbox.kind == BoxKind::Block
            && matches!(pbox.content, BoxContent::None)
            && !pbox.children.is_empty()
        {
            result.extend(flatten_for_pagination(&pbox.children, content_height));
        } else {
            result.push(pbox);
        }
    }
    result
}

struct Paginator<'a> {
    config: LayoutConfig,
    current: PageLayout,
    /// Document-space y at which the current page begins.
    page_start_doc_y: f32,
    content_height: f32,
    page_margin: f32,
    fonts: &'a FontManager,
}

impl<'a> Paginator<'a> {
    fn new_page(&mut self, start_doc_y: f32) {
        let next = PageLayout {
            page_index: self.config.pages.len() + 1,
            boxes: Vec::new(),
        };
        self.config.pages.push(std::mem::replace(&mut self.current, next));
        self.page_start_doc_y = start_doc_y;
    }

    fn place(&mut self, pbox: &PositionedBox) {
        let y_on_page = (pbox.y - self.page_start_doc_y).max(0.0);
        let abs_y = self.page_margin + y_on_page;
        let layout_box = build_layout_box(pbox, pbox.x, abs_y, self.fonts);
        self.current.boxes.push(layout_box);
    }

    fn overflows(&self, pbox: &PositionedBox) -> bool {
        let y_on_page = (pbox.y - self.page_start_doc_y).max(0.0);
        y_on_page + pbox.height > self.content_height
    }

    fn push(&mut self, pbox: &PositionedBox) {
        if pbox.style.page_break_before && !self.current.boxes.is_empty() {
            self.new_page(pbox.y);
        }

        if self.overflows(pbox) {
            if pbox.kind == BoxKind::Table && !pbox.style.page_break_inside_avoid {
                self.split_table(pbox);
                return;
            }
            if !self.current.boxes.is_empty() {
                self.new_page(pbox.y);
            }
        }

        self.place(pbox);

        if pbox.style.page_break_after {
            self.new_page(pbox.y + pbox.height);
        }
    }

    /// Place a table row by row. Rows that would overflow start a new page,
    /// which first receives copies of the table's leading header rows. A row
    /// taller than a page is cut between text lines.
    fn split_table(&mut self, table: &PositionedBox) {
        let headers: Vec<&PositionedBox> = table
            .children
            .iter()
            .take_while(|row| row.kind == BoxKind::Row { header: true })
            .collect();
        let header_height: f32 = headers.iter().map(|r| r.height).sum();
        let first_body_row = headers.len();

        // A header alone at the bottom of a page is moved to the next page.
        let needs_body_row = table.children.get(first_body_row).map(|r| r.height).unwrap_or(0.0);
        if let Some(first) = table.children.first() {
            let y_on_page = (first.y - self.page_start_doc_y).max(0.0);
            if y_on_page + header_height + needs_body_row > self.content_height
                && !self.current.boxes.is_empty()
            {
                self.new_page(first.y);
            }
        }

        for (index, row) in table.children.iter().enumerate() {
            if index < first_body_row {
                self.place(row);
                continue;
            }
            // Breaking directly below the headers would leave them alone.
            let y_on_page = row.y - self.page_start_doc_y;
            if self.overflows(row)
                && y_on_page > header_height + 0.5
                && !self.current.boxes.is_empty()
            {
                log::debug!(
                    "splitting table at row {index}, repeating {} header row(s)",
                    headers.len()
                );
                self.new_page(row.y - header_height);
                self.repeat_headers(&headers);
            }
            self.place_row(row, &headers, header_height);
        }
    }

    /// Place a body row, cutting it across as many pages as it needs.
    fn place_row(&mut self, row: &PositionedBox, headers: &[&PositionedBox], header_height: f32) {
        let mut pending = row.clone();
        while self.overflows(&pending) {
            let cut_y = self.page_start_doc_y + self.content_height;
            let (Some(head), Some(rest)) = slice_box(&pending, cut_y, self.fonts) else {
                break;
            };
            if !has_text(&head) {
                break;
            }
            log::debug!("row taller than the page, continuing at y={cut_y:.1}");
            self.place(&head);
            self.new_page(rest.y - header_height);
            self.repeat_headers(headers);
            pending = rest;
        }
        self.place(&pending);
    }

    fn repeat_headers(&mut self, headers: &[&PositionedBox]) {
        let mut y = self.page_margin;
        for header in headers {
            self.current
                .boxes
                .push(build_layout_box(header, header.x, y, self.fonts));
            y += header.height;
        }
    }

    fn finish(mut self) -> LayoutConfig {
        if !self.current.boxes.is_empty() || self.config.pages.is_empty() {
            self.config.pages.push(self.current);
        }
        self.config
    }
}

/// Convert positioned boxes into a paginated LayoutConfig.
pub fn paginate(
    boxes: &[PositionedBox],
    page_width: f32,
    page_height: f32,
    page_margin: f32,
    fonts: &FontManager,
) -> LayoutConfig {
    let content_height = (page_height - 2.0 * page_margin).max(1.0);
    let mut paginator = Paginator {
        config: LayoutConfig::new(page_width, page_height),
        current: PageLayout {
            page_index: 0,
            boxes: Vec::new(),
        },
        page_start_doc_y: 0.0,
        content_height,
        page_margin,
        fonts,
    };

    for pbox in flatten_for_pagination(boxes, content_height) {
        paginator.push(pbox);
    }
    paginator.finish()
}

/// Cut a box at document-space `cut_y`. Text is divided between whole
/// lines; the part below the cut restarts at `cut_y`. Cells of a cut row
/// all continue, so the row keeps its grid on the next page.
fn slice_box(
    pbox: &PositionedBox,
    cut_y: f32,
    fonts: &FontManager,
) -> (Option<PositionedBox>, Option<PositionedBox>) {
    let bottom = pbox.y + pbox.height;
    if bottom <= cut_y {
        return (Some(pbox.clone()), None);
    }
    if pbox.y >= cut_y {
        return (None, Some(pbox.clone()));
    }

    let style = &pbox.style;
    let top_frame = style.border.top + style.padding.top;
    let bottom_frame = style.border.bottom + style.padding.bottom;

    if let BoxContent::Text { lines } = &pbox.content {
        let line_height = fonts.line_height(style.font_size, style.line_height);
        let fit = (((cut_y - pbox.y - top_frame) / line_height).floor().max(0.0) as usize)
            .min(lines.len());
        if fit == 0 {
            return (None, Some(pbox.clone()));
        }
        let mut head = pbox.clone();
        head.height = cut_y - pbox.y;
        if fit == lines.len() {
            return (Some(head), None);
        }
        head.content = BoxContent::Text {
            lines: lines[..fit].to_vec(),
        };
        let mut rest = pbox.clone();
        rest.y = cut_y;
        rest.height = top_frame + (lines.len() - fit) as f32 * line_height + bottom_frame;
        rest.content = BoxContent::Text {
            lines: lines[fit..].to_vec(),
        };
        return (Some(head), Some(rest));
    }

    let mut head = pbox.clone();
    head.height = cut_y - pbox.y;
    head.children.clear();
    let mut rests = Vec::with_capacity(pbox.children.len());
    for child in &pbox.children {
        let (child_head, mut child_rest) = slice_box(child, cut_y, fonts);
        head.children.extend(child_head);
        if let Some(r) = child_rest.as_mut() {
            if r.y <= cut_y {
                shift_down(r, top_frame);
            }
        }
        rests.push(child_rest);
    }
    if rests.iter().all(Option::is_none) {
        return (Some(head), None);
    }

    let content_bottom = rests
        .iter()
        .flatten()
        .map(|c| c.y + c.height)
        .fold(cut_y, f32::max);
    let mut rest = pbox.clone();
    rest.y = cut_y;
    rest.height = (bottom - cut_y).max(content_bottom + bottom_frame - cut_y);
    let is_row = matches!(pbox.kind, BoxKind::Row { .. });
    let row_height = rest.height;
    rest.children = pbox
        .children
        .iter()
        .zip(rests)
        .filter_map(|(child, r)| match (r, is_row) {
            (Some(mut cell), true) => {
                cell.y = cut_y;
                cell.height = row_height;
                Some(cell)
            }
            (None, true) => {
                let mut cell = child.clone();
                cell.y = cut_y;
                cell.height = row_height;
                cell.content = BoxContent::None;
                cell.children.clear();
                Some(cell)
            }
            (r, false) => r,
        })
        .collect();
    (Some(head), Some(rest))
}

fn shift_down(pbox: &mut PositionedBox, dy: f32) {
    pbox.y += dy;
    for child in &mut pbox.children {
        shift_down(child, dy);
    }
}

fn has_text(pbox: &PositionedBox) -> bool {
    matches!(&pbox.content, BoxContent::Text { lines } if !lines.is_empty())
        || pbox.children.iter().any(has_text)
}

/// Recursively build a LayoutBox tree where every box carries page-absolute
/// coordinates (origin = top-left of the physical page). Child y positions
/// are offsets from the parent's document-space y.
fn build_layout_box(pbox: &PositionedBox, abs_x: f32, abs_y: f32, fonts: &FontManager) -> LayoutBox {
    let mut lb = LayoutBox::new(abs_x, abs_y, pbox.width, pbox.height);
    let style = &pbox.style;

    if !style.background_color.is_transparent() {
        lb.background_color = Some(style.background_color.to_array());
    }

    if !style.border.is_zero() {
        lb.border = Some(BorderStyle {
            widths: [
                style.border.top,
                style.border.right,
                style.border.bottom,
                style.border.left,
            ],
            color: style.border_color.to_array(),
        });
    }

    let line_height = fonts.line_height(style.font_size, style.line_height);
    let half_leading = (line_height - fonts.glyph_height(style.font_size, style.font_family)) / 2.0;
    let ascent = half_leading + fonts.ascender(style.font_size, style.font_family);

    match &pbox.content {
        BoxContent::Text { lines } => {
            let left = style.border.left + style.padding.left;
            let top = style.border.top + style.padding.top;
            let available = pbox.width - left - style.border.right - style.padding.right;

            let text_lines = lines
                .iter()
                .enumerate()
                .map(|(i, line)| {
                    let width =
                        fonts.measure_text_width(line, style.font_size, style.bold(), style.font_family);
                    let slack = (available - width).max(0.0);
                    let align = match style.text_align {
                        crate::style::TextAlign::Left => 0.0,
                        crate::style::TextAlign::Center => slack / 2.0,
                        crate::style::TextAlign::Right => slack,
                    };
                    TextLine {
                        text: line.clone(),
                        x_offset: left + align,
                        y_offset: top + i as f32 * line_height + ascent,
                        width,
                    }
                })
                .collect();

            lb.text = Some(TextContent::from_style(text_lines, style, line_height));
        }
        BoxContent::ListItem { marker } => {
            let width = fonts.measure_text_width(marker, style.font_size, style.bold(), style.font_family);
            let marker_line = TextLine {
                text: marker.clone(),
                x_offset: -(width + LIST_MARKER_GAP),
                y_offset: style.border.top + style.padding.top + ascent,
                width,
            };
            let mut text = TextContent::from_style(vec![marker_line], style, line_height);
            text.underline = false;
            lb.text = Some(text);
        }
        BoxContent::None => {}
    }

    for child in &pbox.children {
        let child_abs_y = abs_y + (child.y - pbox.y);
        lb.children
            .push(build_layout_box(child, child.x, child_abs_y, fonts));
    }

    lb
}
