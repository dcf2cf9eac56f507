//! Layout engine – uses Taffy to compute flexbox layout from a styled DOM
//! tree, then converts the result into a tree of positioned boxes.
//!
//! Block elements become flex columns. Runs of inline content are merged
//! into pre-wrapped text leaves whose size is fixed at build time, so Taffy
//! never needs a measure function. Tables become a flex column of flex rows;
//! `thead`/`tbody`/`tfoot` are flattened so every row is a direct child of
//! its table and pagination can split between rows.

use std::collections::HashMap;

use taffy::{
    AvailableSpace, Dimension, LengthPercentage, LengthPercentageAuto, NodeId, Rect, Size, Style,
    TaffyTree,
};

use crate::dom::Tag;
use crate::error::RenderError;
use crate::fonts::{wrap_text, FontManager};
use crate::style::{self, ComputedStyle, Display, Extent, StyledNode};

// ---------------------------------------------------------------------------
// Intermediate layout tree (pre-pagination)
// ---------------------------------------------------------------------------

/// A positioned box in document coordinates (before page splitting).
#[derive(Debug, Clone)]
pub struct PositionedBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub style: ComputedStyle,
    pub kind: BoxKind,
    pub content: BoxContent,
    pub children: Vec<PositionedBox>,
}

/// Structural role of a box, used by pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxKind {
    Block,
    Table,
    Row { header: bool },
    Cell,
}

#[derive(Debug, Clone)]
pub enum BoxContent {
    None,
    Text { lines: Vec<String> },
    /// List item marker ("• " or "1. ").
    ListItem { marker: String },
}

type LayoutResult<T> = Result<T, RenderError>;

// ---------------------------------------------------------------------------
// Build Taffy tree from styled nodes
// ---------------------------------------------------------------------------

/// Width available to a node and whether its parent stretches it across.
#[derive(Debug, Clone, Copy)]
struct Slot {
    width: f32,
    stretch: bool,
}

struct LayoutBuilder<'a> {
    taffy: TaffyTree<()>,
    fonts: &'a FontManager,
    node_styles: HashMap<NodeId, ComputedStyle>,
    node_content: HashMap<NodeId, BoxContent>,
    node_kinds: HashMap<NodeId, BoxKind>,
}

impl<'a> LayoutBuilder<'a> {
    fn new(fonts: &'a FontManager) -> Self {
        Self {
            taffy: TaffyTree::new(),
            fonts,
            node_styles: HashMap::new(),
            node_content: HashMap::new(),
            node_kinds: HashMap::new(),
        }
    }

    /// Collect the text of an inline subtree. `<br>` becomes a newline.
    fn collect_inline_text(node: &StyledNode, out: &mut String) {
        match node {
            StyledNode::Text { text, .. } => out.push_str(text),
            StyledNode::Element { tag: Tag::Br, .. } => out.push('\n'),
            StyledNode::Element { children, .. } => {
                for child in children {
                    Self::collect_inline_text(child, out);
                }
            }
        }
    }

    fn is_inline(node: &StyledNode) -> bool {
        match node {
            StyledNode::Text { .. } => true,
            StyledNode::Element {
                style, children, ..
            } => style.display == Display::Inline && children.iter().all(Self::is_inline),
        }
    }

    /// Text style for a run of inline nodes: a lone styled element (such as
    /// `<strong>` wrapping a whole cell) lends its style to the run.
    fn run_text_style(run: &[&StyledNode], parent: &ComputedStyle) -> ComputedStyle {
        match run {
            [StyledNode::Element {
                tag, style, children, ..
            }] if *tag != Tag::Br => {
                let nested: Vec<&StyledNode> = children.iter().collect();
                if nested.len() == 1 {
                    Self::run_text_style(&nested, style)
                } else {
                    style.text_only()
                }
            }
            [StyledNode::Text { style, .. }] => style.clone(),
            _ => parent.text_only(),
        }
    }

    fn normalized_run_text(run: &[&StyledNode], style: &ComputedStyle) -> String {
        let mut raw = String::new();
        for node in run {
            Self::collect_inline_text(node, &mut raw);
        }
        let joined = raw
            .split('\n')
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect::<Vec<_>>()
            .join("\n");
        style.text_transform.apply(joined.trim_matches('\n'))
    }

    fn build_node(&mut self, styled: &StyledNode, slot: Slot) -> LayoutResult<NodeId> {
        match styled {
            StyledNode::Text { style, .. } => {
                let text = Self::normalized_run_text(&[styled], style);
                self.build_text_leaf(&text, style, slot)
            }
            StyledNode::Element {
                tag,
                style,
                children,
                ..
            } => self.build_element_node(tag, style, children, slot),
        }
    }

    /// A pre-wrapped text leaf. `style` may carry box properties (padding,
    /// border, background) when a whole paragraph is merged into one leaf.
    fn build_text_leaf(&mut self, text: &str, style: &ComputedStyle, slot: Slot) -> LayoutResult<NodeId> {
        let frame_h = style.padding.horizontal() + style.border.horizontal();
        let frame_v = style.padding.vertical() + style.border.vertical();
        let outer = style
            .width
            .resolve(slot.width)
            .unwrap_or(slot.width - style.margin.horizontal());
        let max_w = (outer - frame_h).max(1.0);

        let lines = wrap_text(text, style.font_size, style.bold(), style.font_family, max_w, self.fonts);
        let text_width = lines
            .iter()
            .map(|l| {
                self.fonts
                    .measure_text_width(l, style.font_size, style.bold(), style.font_family)
            })
            .fold(0.0f32, f32::max);
        let line_height = self.fonts.line_height(style.font_size, style.line_height);
        let text_height = lines.len() as f32 * line_height;

        let mut ts = Style {
            size: Size {
                width: extent_to_taffy(style.width),
                height: Dimension::Length(text_height + frame_v),
            },
            min_size: Size {
                width: Dimension::Length((text_width + frame_h).min(outer.max(0.0))),
                height: Dimension::Auto,
            },
            margin: margin_rect(style),
            padding: padding_rect(style),
            border: border_rect(style),
            ..Default::default()
        };
        if !slot.stretch && style.width == Extent::Auto {
            ts.size.width = Dimension::Length(text_width + frame_h);
        }

        let node = self.taffy.new_leaf(ts)?;
        self.node_styles.insert(node, style.clone());
        self.node_content.insert(node, BoxContent::Text { lines });
        Ok(node)
    }

    fn build_element_node(
        &mut self,
        tag: &Tag,
        style: &ComputedStyle,
        children: &[StyledNode],
        slot: Slot,
    ) -> LayoutResult<NodeId> {
        if *tag == Tag::Table {
            return self.build_table(style, children, slot);
        }

        // Paragraph-like blocks whose content is entirely inline become a
        // single text leaf that keeps the block's own box.
        let keeps_container = matches!(tag, Tag::Li | Tag::Td | Tag::Th | Tag::Tr)
            || style.display == Display::Flex;
        if !keeps_container && !children.is_empty() && children.iter().all(Self::is_inline) {
            let run: Vec<&StyledNode> = children.iter().collect();
            let text_style = Self::run_text_style(&run, style);
            let text = Self::normalized_run_text(&run, &text_style);
            if !text.is_empty() {
                let merged = with_text_props(style, &text_style);
                return self.build_text_leaf(&text, &merged, slot);
            }
        }

        let outer = style
            .width
            .resolve(slot.width)
            .unwrap_or(slot.width - style.margin.horizontal());
        let inner_width =
            (outer - style.padding.horizontal() - style.border.horizontal()).max(1.0);

        let is_flex_row =
            style.display == Display::Flex && style.flex_direction == style::FlexDirection::Row;
        let child_slot = if is_flex_row {
            let count = children.len().max(1);
            let gaps = style.gap * count.saturating_sub(1) as f32;
            Slot {
                width: ((inner_width - gaps) / count as f32).max(1.0),
                stretch: false,
            }
        } else {
            Slot {
                width: inner_width,
                stretch: style.display != Display::Flex
                    || style.align_items == style::AlignItems::Stretch,
            }
        };

        let mut child_nodes = Vec::new();
        let mut list_counter = 0u32;
        let mut run: Vec<&StyledNode> = Vec::new();

        // Flex items are blockified: inline elements become their own items.
        let blockify = style.display == Display::Flex;
        for child in children {
            let is_element = matches!(child, StyledNode::Element { .. });
            if Self::is_inline(child) && !(blockify && is_element) {
                run.push(child);
                continue;
            }
            self.flush_inline_run(&mut run, style, child_slot, &mut child_nodes)?;

            let marker = match child {
                StyledNode::Element { tag: Tag::Li, .. } => {
                    list_counter += 1;
                    Some(if *tag == Tag::Ol {
                        format!("{list_counter}.")
                    } else {
                        "\u{2022}".to_string()
                    })
                }
                _ => None,
            };

            let child_id = self.build_node(child, child_slot)?;
            if let Some(marker) = marker {
                self.node_content
                    .insert(child_id, BoxContent::ListItem { marker });
            }
            child_nodes.push(child_id);
        }
        self.flush_inline_run(&mut run, style, child_slot, &mut child_nodes)?;

        let node = self
            .taffy
            .new_with_children(computed_to_taffy(style), &child_nodes)?;
        self.node_styles.insert(node, style.clone());
        Ok(node)
    }

    fn flush_inline_run(
        &mut self,
        run: &mut Vec<&StyledNode>,
        parent: &ComputedStyle,
        slot: Slot,
        out: &mut Vec<NodeId>,
    ) -> LayoutResult<()> {
        if run.is_empty() {
            return Ok(());
        }
        let text_style = Self::run_text_style(run, parent);
        let text = Self::normalized_run_text(run, &text_style);
        run.clear();
        if !text.is_empty() {
            out.push(self.build_text_leaf(&text, &text_style, slot)?);
        }
        Ok(())
    }

    fn build_table(
        &mut self,
        style: &ComputedStyle,
        children: &[StyledNode],
        slot: Slot,
    ) -> LayoutResult<NodeId> {
        let outer = style
            .width
            .resolve(slot.width)
            .unwrap_or(slot.width - style.margin.horizontal());
        let inner_width =
            (outer - style.padding.horizontal() - style.border.horizontal()).max(1.0);

        // Flatten row groups; rows inside <thead> are header rows.
        let mut rows: Vec<(&StyledNode, bool)> = Vec::new();
        for child in children {
            match child {
                StyledNode::Element {
                    tag: Tag::THead,
                    children: group,
                    ..
                } => rows.extend(group.iter().map(|r| (r, true))),
                StyledNode::Element {
                    tag, children: group, ..
                } if tag.is_table_section() => rows.extend(group.iter().map(|r| (r, false))),
                StyledNode::Element { tag: Tag::Tr, .. } => rows.push((child, false)),
                _ => log::debug!("skipping non-row table content"),
            }
        }

        let mut row_nodes = Vec::new();
        for (index, (row, in_thead)) in rows.into_iter().enumerate() {
            let StyledNode::Element {
                tag: Tag::Tr,
                style: row_style,
                children: cells,
                ..
            } = row
            else {
                continue;
            };
            let all_th = !cells.is_empty()
                && cells
                    .iter()
                    .all(|c| matches!(c, StyledNode::Element { tag: Tag::Th, .. }));
            let header = in_thead || (index == 0 && all_th);
            row_nodes.push(self.build_row(row_style, cells, inner_width, header)?);
        }

        let mut ts = computed_to_taffy(style);
        ts.flex_direction = taffy::FlexDirection::Column;
        ts.align_items = Some(taffy::AlignItems::Stretch);
        let node = self.taffy.new_with_children(ts, &row_nodes)?;
        self.node_styles.insert(node, style.clone());
        self.node_kinds.insert(node, BoxKind::Table);
        Ok(node)
    }

    fn build_row(
        &mut self,
        style: &ComputedStyle,
        cells: &[StyledNode],
        row_width: f32,
        header: bool,
    ) -> LayoutResult<NodeId> {
        let cell_styles: Vec<&ComputedStyle> = cells.iter().map(StyledNode::style).collect();
        let fixed: f32 = cell_styles
            .iter()
            .filter_map(|s| s.width.resolve(row_width))
            .sum();
        let auto_count = cell_styles
            .iter()
            .filter(|s| s.width == Extent::Auto)
            .count();
        let share = if auto_count > 0 {
            ((row_width - fixed) / auto_count as f32).max(1.0)
        } else {
            0.0
        };

        let mut cell_nodes = Vec::new();
        for (cell, cell_style) in cells.iter().zip(cell_styles) {
            let StyledNode::Element {
                tag,
                style: cs,
                children,
                ..
            } = cell
            else {
                continue;
            };
            let width = cell_style.width.resolve(row_width).unwrap_or(share);
            // The cell's own width is already fixed by the share above.
            let mut sized = cs.clone();
            sized.width = Extent::Auto;
            let node = self.build_element_node(
                tag,
                &sized,
                children,
                Slot {
                    width,
                    stretch: true,
                },
            )?;

            let mut ts = computed_to_taffy(cs);
            ts.flex_direction = taffy::FlexDirection::Column;
            ts.size.width = Dimension::Auto;
            ts.min_size.width = Dimension::Length(0.0);
            match cs.width {
                Extent::Auto => {
                    ts.flex_grow = 1.0;
                    ts.flex_shrink = 1.0;
                    ts.flex_basis = Dimension::Length(0.0);
                }
                w => {
                    ts.flex_grow = 0.0;
                    ts.flex_shrink = 0.0;
                    ts.flex_basis = extent_to_taffy(w);
                }
            }
            self.taffy.set_style(node, ts)?;
            self.node_kinds.insert(node, BoxKind::Cell);
            cell_nodes.push(node);
        }

        let mut ts = computed_to_taffy(style);
        ts.flex_direction = taffy::FlexDirection::Row;
        ts.align_items = Some(taffy::AlignItems::Stretch);
        ts.size.width = Dimension::Percent(1.0);
        let node = self.taffy.new_with_children(ts, &cell_nodes)?;
        self.node_styles.insert(node, style.clone());
        self.node_kinds.insert(node, BoxKind::Row { header });
        Ok(node)
    }

    /// Extract positioned boxes after layout computation.
    fn extract(&self, node: NodeId, offset_x: f32, offset_y: f32) -> LayoutResult<PositionedBox> {
        let layout = self.taffy.layout(node)?;
        let style = self.node_styles.get(&node).cloned().unwrap_or_default();
        let content = self
            .node_content
            .get(&node)
            .cloned()
            .unwrap_or(BoxContent::None);
        let kind = self.node_kinds.get(&node).copied().unwrap_or(BoxKind::Block);

        let x = offset_x + layout.location.x;
        let y = offset_y + layout.location.y;

        let children = self
            .taffy
            .children(node)?
            .into_iter()
            .map(|child| self.extract(child, x, y))
            .collect::<LayoutResult<Vec<_>>>()?;

        Ok(PositionedBox {
            x,
            y,
            width: layout.size.width,
            height: layout.size.height,
            style,
            kind,
            content,
            children,
        })
    }
}

/// Block style with the text properties of `text` laid over it.
fn with_text_props(block: &ComputedStyle, text: &ComputedStyle) -> ComputedStyle {
    ComputedStyle {
        font_size: text.font_size,
        font_weight: text.font_weight,
        font_style: text.font_style,
        font_family: text.font_family,
        color: text.color,
        line_height: text.line_height,
        text_decoration: text.text_decoration,
        text_transform: text.text_transform,
        ..block.clone()
    }
}

fn extent_to_taffy(e: Extent) -> Dimension {
    match e {
        Extent::Auto => Dimension::Auto,
        Extent::Pt(v) => Dimension::Length(v),
        Extent::Percent(v) => Dimension::Percent(v / 100.0),
    }
}

fn margin_rect(s: &ComputedStyle) -> Rect<LengthPercentageAuto> {
    Rect {
        top: LengthPercentageAuto::Length(s.margin.top),
        right: LengthPercentageAuto::Length(s.margin.right),
        bottom: LengthPercentageAuto::Length(s.margin.bottom),
        left: LengthPercentageAuto::Length(s.margin.left),
    }
}

fn padding_rect(s: &ComputedStyle) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(s.padding.top),
        right: LengthPercentage::Length(s.padding.right),
        bottom: LengthPercentage::Length(s.padding.bottom),
        left: LengthPercentage::Length(s.padding.left),
    }
}

fn border_rect(s: &ComputedStyle) -> Rect<LengthPercentage> {
    Rect {
        top: LengthPercentage::Length(s.border.top),
        right: LengthPercentage::Length(s.border.right),
        bottom: LengthPercentage::Length(s.border.bottom),
        left: LengthPercentage::Length(s.border.left),
    }
}

fn computed_to_taffy(s: &ComputedStyle) -> Style {
    let mut ts = Style {
        display: taffy::Display::Flex,
        size: Size {
            width: extent_to_taffy(s.width),
            height: extent_to_taffy(s.height),
        },
        min_size: Size {
            width: Dimension::Length(0.0),
            height: Dimension::Auto,
        },
        margin: margin_rect(s),
        padding: padding_rect(s),
        border: border_rect(s),
        gap: Size {
            width: LengthPercentage::Length(s.gap),
            height: LengthPercentage::Length(s.gap),
        },
        ..Default::default()
    };

    if s.display == Display::Flex {
        ts.flex_direction = match s.flex_direction {
            style::FlexDirection::Row => taffy::FlexDirection::Row,
            style::FlexDirection::Column => taffy::FlexDirection::Column,
        };
        ts.justify_content = Some(match s.justify_content {
            style::JustifyContent::Start => taffy::JustifyContent::Start,
            style::JustifyContent::End => taffy::JustifyContent::End,
            style::JustifyContent::Center => taffy::JustifyContent::Center,
            style::JustifyContent::SpaceBetween => taffy::JustifyContent::SpaceBetween,
            style::JustifyContent::SpaceAround => taffy::JustifyContent::SpaceAround,
            style::JustifyContent::SpaceEvenly => taffy::JustifyContent::SpaceEvenly,
        });
        ts.align_items = Some(match s.align_items {
            style::AlignItems::Start => taffy::AlignItems::Start,
            style::AlignItems::End => taffy::AlignItems::End,
            style::AlignItems::Center => taffy::AlignItems::Center,
            style::AlignItems::Stretch => taffy::AlignItems::Stretch,
        });
    } else {
        // Block-level boxes stack vertically.
        ts.flex_direction = taffy::FlexDirection::Column;
        ts.align_items = Some(taffy::AlignItems::Stretch);
    }
    ts
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute layout for a styled tree, returning the top-level positioned
/// boxes in document coordinates (x includes the left page margin).
pub fn compute_layout(
    styled_nodes: &[StyledNode],
    page_width: f32,
    page_margin: f32,
    fonts: &FontManager,
) -> LayoutResult<Vec<PositionedBox>> {
    let content_width = (page_width - 2.0 * page_margin).max(1.0);
    let mut builder = LayoutBuilder::new(fonts);
    let slot = Slot {
        width: content_width,
        stretch: true,
    };

    let mut child_ids = Vec::new();
    let mut run: Vec<&StyledNode> = Vec::new();
    let root_text = ComputedStyle::default();
    for node in styled_nodes {
        if LayoutBuilder::is_inline(node) {
            run.push(node);
            continue;
        }
        builder.flush_inline_run(&mut run, &root_text, slot, &mut child_ids)?;
        child_ids.push(builder.build_node(node, slot)?);
    }
    builder.flush_inline_run(&mut run, &root_text, slot, &mut child_ids)?;

    let root_style = Style {
        display: taffy::Display::Flex,
        flex_direction: taffy::FlexDirection::Column,
        align_items: Some(taffy::AlignItems::Stretch),
        size: Size {
            width: Dimension::Length(content_width),
            height: Dimension::Auto,
        },
        ..Default::default()
    };
    let root = builder.taffy.new_with_children(root_style, &child_ids)?;

    builder.taffy.compute_layout(
        root,
        Size {
            width: AvailableSpace::Definite(content_width),
            height: AvailableSpace::MaxContent,
        },
    )?;

    let root_box = builder.extract(root, page_margin, 0.0)?;
    Ok(root_box.children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;
    use crate::style::{build_styled_tree, Stylesheet};

    fn layout(html: &str, css: &str) -> Vec<PositionedBox> {
        let dom = parse_html(html);
        let sheet = Stylesheet::parse(css);
        let styled = build_styled_tree(&dom, None, &sheet);
        compute_layout(&styled, 595.0, 40.0, &FontManager::default()).unwrap()
    }

    fn text_lines(b: &PositionedBox) -> Vec<String> {
        match &b.content {
            BoxContent::Text { lines } => lines.clone(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn layout_simple_paragraph() {
        let boxes = layout("<p>Hello world</p>", "");
        assert_eq!(boxes.len(), 1);
        let first = &boxes[0];
        assert!(first.width > 0.0);
        assert!(first.height > 0.0);
        assert_eq!(text_lines(first), vec!["Hello world"]);
    }

    #[test]
    fn blocks_stack_vertically() {
        let boxes = layout("<h1>Title</h1><p>Body</p>", "");
        assert_eq!(boxes.len(), 2);
        assert!(boxes[1].y >= boxes[0].y + boxes[0].height);
        assert_eq!(boxes[0].x, 40.0);
    }

    #[test]
    fn flex_row_places_children_side_by_side() {
        let boxes = layout(
            r#"<div class="row"><div>A</div><div>B</div></div>"#,
            ".row { display: flex; justify-content: space-between }",
        );
        let row = &boxes[0];
        assert_eq!(row.children.len(), 2);
        assert!(row.children[1].x > row.children[0].x);
    }

    #[test]
    fn inline_flex_items_stay_separate() {
        let boxes = layout(
            r#"<div class="row"><span>Issued 05/03/2024</span> <span>Code: VC-001</span></div>"#,
            ".row { display: flex; justify-content: space-between }",
        );
        let row = &boxes[0];
        assert_eq!(row.children.len(), 2);
        assert_eq!(text_lines(&row.children[1]), vec!["Code: VC-001"]);
        assert!(row.children[1].x > row.children[0].x + row.children[0].width);
    }

    #[test]
    fn table_rows_are_flattened_and_headers_flagged() {
        let boxes = layout(
            "<table><thead><tr><th>#</th><th>Name</th></tr></thead>\
             <tbody><tr><td>1</td><td>Ana Ruiz</td></tr><tr><td>2</td><td>Luis</td></tr></tbody></table>",
            "",
        );
        let table = &boxes[0];
        assert_eq!(table.kind, BoxKind::Table);
        assert_eq!(table.children.len(), 3);
        assert_eq!(table.children[0].kind, BoxKind::Row { header: true });
        assert_eq!(table.children[1].kind, BoxKind::Row { header: false });
        let cells = &table.children[1].children;
        assert_eq!(cells.len(), 2);
        assert!((cells[0].width - cells[1].width).abs() < 0.5);
    }

    #[test]
    fn explicit_cell_width_is_respected() {
        let boxes = layout(
            r#"<table><tr><td style="width: 60pt">1</td><td>Rest</td></tr></table>"#,
            "",
        );
        let cells = &boxes[0].children[0].children;
        assert!((cells[0].width - 60.0).abs() < 0.5);
        assert!(cells[1].width > 400.0);
    }

    #[test]
    fn line_breaks_split_text() {
        let boxes = layout("<p>first<br>second</p>", "");
        assert_eq!(text_lines(&boxes[0]), vec!["first", "second"]);
    }

    #[test]
    fn list_items_get_markers() {
        let boxes = layout("<ol><li>one</li><li>two</li></ol>", "");
        let items = &boxes[0].children;
        assert!(matches!(&items[1].content, BoxContent::ListItem { marker } if marker == "2."));
    }

    #[test]
    fn lone_strong_keeps_bold() {
        let boxes = layout("<table><tr><td><strong>X</strong></td></tr></table>", "");
        let cell = &boxes[0].children[0].children[0];
        assert!(cell.children[0].style.bold());
    }
}
