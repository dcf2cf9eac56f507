//! Pipeline – ties together parsing, styling, layout, pagination, and
//! rendering into a single function call.

use crate::dom::{body_children, collect_stylesheets, document_title, find_element, parse_html, Tag};
use crate::error::RenderError;
use crate::fonts::FontManager;
use crate::layout::compute_layout;
use crate::layout_config::LayoutConfig;
use crate::pagination::{paginate, PAGE_MARGIN_PT};
use crate::render::render_pdf;
use crate::style::{build_styled_tree, resolve_style, PageRule, Stylesheet};

/// Page orientation for the generated PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageOrientation {
    /// Portrait mode: height > width (default).
    #[default]
    Portrait,
    /// Landscape mode: width > height.
    Landscape,
}

/// Configuration for the PDF generation pipeline. A document's `@page`
/// rule overrides the page size, orientation and margin.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Document title embedded in the PDF metadata. When empty, the
    /// document's `<title>` is used.
    pub title: String,
    /// Page width in points (default: A4 = 595.28).
    pub page_width: f32,
    /// Page height in points (default: A4 = 841.89).
    pub page_height: f32,
    /// Page margin in points (default: 40).
    pub page_margin: f32,
    /// Page orientation; swaps effective width/height when `Landscape`.
    pub orientation: PageOrientation,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            page_width: 595.28,
            page_height: 841.89,
            page_margin: PAGE_MARGIN_PT,
            orientation: PageOrientation::Portrait,
        }
    }
}

impl PipelineConfig {
    /// Effective page width after applying orientation.
    pub fn effective_width(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_width,
            PageOrientation::Landscape => self.page_height,
        }
    }

    /// Effective page height after applying orientation.
    pub fn effective_height(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.page_height,
            PageOrientation::Landscape => self.page_width,
        }
    }

    /// Apply an `@page` rule on top of these settings.
    pub fn with_page_rule(mut self, rule: &PageRule) -> Self {
        if let Some((w, h)) = rule.size {
            self.page_width = w;
            self.page_height = h;
            // Explicit sizes are taken as declared.
            self.orientation = PageOrientation::Portrait;
        }
        if let Some(orientation) = rule.orientation {
            if (orientation == PageOrientation::Landscape) != (self.page_width > self.page_height) {
                self.orientation = PageOrientation::Landscape;
            } else {
                self.orientation = PageOrientation::Portrait;
            }
        }
        if let Some(margin) = rule.margin {
            self.page_margin = margin;
        }
        self
    }
}

/// Full pipeline: HTML string → PDF bytes.
///
/// Returns the PDF bytes together with the layout they were rendered from.
pub fn generate_pdf(
    html: &str,
    config: &PipelineConfig,
) -> Result<(Vec<u8>, LayoutConfig), RenderError> {
    let layout_config = compute_layout_config(html, config)?;
    let pdf_bytes = render_pdf(&layout_config);
    Ok((pdf_bytes, layout_config))
}

/// Generate only the layout config (no PDF rendering) – useful for testing.
pub fn compute_layout_config(html: &str, config: &PipelineConfig) -> Result<LayoutConfig, RenderError> {
    // 1. Parse HTML and collect embedded CSS
    let dom = parse_html(html);
    let sheet = Stylesheet::parse(&collect_stylesheets(&dom));
    let config = config.clone().with_page_rule(&sheet.page);

    // 2. Build styled tree, inheriting from <html> and <body>
    let html_style = find_element(&dom, &Tag::Html).map(|e| resolve_style(e, None, &sheet));
    let body_style = find_element(&dom, &Tag::Body)
        .map(|e| resolve_style(e, html_style.as_ref(), &sheet))
        .or(html_style);
    let styled = build_styled_tree(&body_children(&dom), body_style.as_ref(), &sheet);

    // 3. Compute layout
    let fonts = FontManager::default();
    let eff_w = config.effective_width();
    let eff_h = config.effective_height();
    let boxes = compute_layout(&styled, eff_w, config.page_margin, &fonts)?;

    // 4. Paginate
    let mut layout_config = paginate(&boxes, eff_w, eff_h, config.page_margin, &fonts);
    layout_config.title = if config.title.is_empty() {
        document_title(&dom).unwrap_or_else(|| "document".to_string())
    } else {
        config.title
    };
    log::debug!(
        "laid out {} page(s) at {eff_w:.0}x{eff_h:.0} pt",
        layout_config.pages.len()
    );
    Ok(layout_config)
}

/// HTML-to-PDF conversion as consumed by the HTTP service.
pub trait PdfRenderer: Send + Sync {
    fn render(&self, html: &str, title: &str) -> Result<Vec<u8>, RenderError>;
}

/// The built-in rendering engine.
#[derive(Debug, Clone, Default)]
pub struct ForgeRenderer {
    defaults: PipelineConfig,
}

impl PdfRenderer for ForgeRenderer {
    fn render(&self, html: &str, title: &str) -> Result<Vec<u8>, RenderError> {
        let config = PipelineConfig {
            title: title.to_string(),
            ..self.defaults.clone()
        };
        let (bytes, _) = generate_pdf(html, &config)?;
        Ok(bytes)
    }
}
