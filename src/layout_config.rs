//! Layout config – the intermediate representation between layout computation
//! and PDF rendering. This is the "frozen" structure that encodes exactly what
//! goes on each page.

use serde::{Deserialize, Serialize};

use crate::fonts::FontFamily;
use crate::style::{ComputedStyle, TextAlign, TextDecoration};

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "LayoutConfig::default_title")]
    pub title: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    /// Height of each page in PDF points.
    pub page_height_pt: f32,
    /// Ordered list of pages.
    pub pages: Vec<PageLayout>,
}

/// One page of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    /// Position relative to page top-left, in points.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    pub background_color: Option<[f32; 4]>,
    pub border: Option<BorderStyle>,
    pub text: Option<TextContent>,

    pub children: Vec<LayoutBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    /// Top, right, bottom, left.
    pub widths: [f32; 4],
    pub color: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// Pre-wrapped lines of text.
    pub lines: Vec<TextLine>,
    pub font_family: FontFamily,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: [f32; 4],
    pub line_height: f32,
    pub text_align: TextAlign,
    pub underline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// X offset within the layout box. Negative for list markers.
    pub x_offset: f32,
    /// Baseline offset from the top of the layout box.
    pub y_offset: f32,
    /// Measured advance width of `text`.
    pub width: f32,
}

impl LayoutConfig {
    pub fn new(page_width_pt: f32, page_height_pt: f32) -> Self {
        Self {
            title: Self::default_title(),
            page_width_pt,
            page_height_pt,
            pages: Vec::new(),
        }
    }

    /// Create an A4 portrait layout config.
    pub fn a4() -> Self {
        // A4: 210mm × 297mm = 595.28 × 841.89 points
        Self::new(595.28, 841.89)
    }

    fn default_title() -> String {
        "document".to_string()
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// All laid-out text in page and box order, lines joined by spaces.
    pub fn plain_text(&self) -> String {
        fn collect<'a>(b: &'a LayoutBox, out: &mut Vec<&'a str>) {
            if let Some(text) = &b.text {
                out.extend(text.lines.iter().map(|l| l.text.as_str()));
            }
            for child in &b.children {
                collect(child, out);
            }
        }

        let mut parts = Vec::new();
        for page in &self.pages {
            for b in &page.boxes {
                collect(b, &mut parts);
            }
        }
        parts.join(" ")
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            children: Vec::new(),
        }
    }
}

impl TextContent {
    pub fn from_style(lines: Vec<TextLine>, style: &ComputedStyle, line_height: f32) -> Self {
        Self {
            lines,
            font_family: style.font_family,
            font_size: style.font_size,
            bold: style.bold(),
            italic: style.italic(),
            color: style.color.to_array(),
            line_height,
            text_align: style.text_align,
            underline: style.text_decoration == TextDecoration::Underline,
        }
    }
}
