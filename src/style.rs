//! Style resolver – cascades tag defaults, `<style>` rules and inline
//! declarations into a flat [`ComputedStyle`] consumed by the layout engine.
//!
//! All lengths are stored in PDF points. CSS pixels convert at 96 dpi
//! (1 px = 0.75 pt).

use std::collections::HashMap;

use crate::dom::{DomNode, ElementNode, Tag};
use crate::fonts::FontFamily;
use crate::pipeline::PageOrientation;

pub const PX_TO_PT: f32 = 0.75;
const MM_TO_PT: f32 = 72.0 / 25.4;
/// `rem` resolves against the default body size (16 px).
const ROOT_FONT_SIZE: f32 = 12.0;

/// Fully resolved style for a single element.
#[derive(Debug, Clone)]
pub struct ComputedStyle {
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub justify_content: JustifyContent,
    pub align_items: AlignItems,
    pub gap: f32,

    pub width: Extent,
    pub height: Extent,

    pub margin: Edges,
    pub padding: Edges,
    pub border: Edges,
    pub border_color: Color,

    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub font_family: FontFamily,
    pub color: Color,
    pub text_align: TextAlign,
    /// Multiple of `font_size`.
    pub line_height: f32,
    pub text_decoration: TextDecoration,
    pub text_transform: TextTransform,

    pub background_color: Color,

    pub page_break_before: bool,
    pub page_break_after: bool,
    pub page_break_inside_avoid: bool,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            flex_direction: FlexDirection::Row,
            justify_content: JustifyContent::Start,
            align_items: AlignItems::Stretch,
            gap: 0.0,
            width: Extent::Auto,
            height: Extent::Auto,
            margin: Edges::ZERO,
            padding: Edges::ZERO,
            border: Edges::ZERO,
            border_color: Color::BLACK,
            font_size: ROOT_FONT_SIZE,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            font_family: FontFamily::Helvetica,
            color: Color::BLACK,
            text_align: TextAlign::Left,
            line_height: 1.3,
            text_decoration: TextDecoration::None,
            text_transform: TextTransform::None,
            background_color: Color::TRANSPARENT,
            page_break_before: false,
            page_break_after: false,
            page_break_inside_avoid: false,
        }
    }
}

impl ComputedStyle {
    pub fn bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    pub fn italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }

    /// Copy of the inheritable text properties only, with every box
    /// property back at its initial value.
    pub fn text_only(&self) -> Self {
        Self {
            font_size: self.font_size,
            font_weight: self.font_weight,
            font_style: self.font_style,
            font_family: self.font_family,
            color: self.color,
            text_align: self.text_align,
            line_height: self.line_height,
            text_decoration: self.text_decoration,
            text_transform: self.text_transform,
            ..Self::default()
        }
    }

    fn inherit_from(&mut self, parent: &ComputedStyle) {
        self.font_size = parent.font_size;
        self.font_weight = parent.font_weight;
        self.font_style = parent.font_style;
        self.font_family = parent.font_family;
        self.color = parent.color;
        self.text_align = parent.text_align;
        self.line_height = parent.line_height;
        self.text_transform = parent.text_transform;
    }
}

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Flex,
    Inline,
    ListItem,
    TableRow,
    TableCell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlexDirection {
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontWeight {
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecoration {
    None,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTransform {
    None,
    Uppercase,
    Lowercase,
    Capitalize,
}

impl TextTransform {
    pub fn apply(&self, text: &str) -> String {
        match self {
            TextTransform::None => text.to_string(),
            TextTransform::Uppercase => text.to_uppercase(),
            TextTransform::Lowercase => text.to_lowercase(),
            TextTransform::Capitalize => {
                let mut out = String::with_capacity(text.len());
                let mut at_word_start = true;
                for c in text.chars() {
                    if at_word_start && c.is_alphabetic() {
                        out.extend(c.to_uppercase());
                        at_word_start = false;
                    } else {
                        if c.is_whitespace() {
                            at_word_start = true;
                        }
                        out.push(c);
                    }
                }
                out
            }
        }
    }
}

/// A width or height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Extent {
    Auto,
    Pt(f32),
    Percent(f32),
}

impl Extent {
    /// Resolve against the containing block's width, if definite.
    pub fn resolve(&self, container: f32) -> Option<f32> {
        match *self {
            Extent::Auto => None,
            Extent::Pt(v) => Some(v),
            Extent::Percent(p) => Some(container * p / 100.0),
        }
    }
}

/// Per-side values in points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub const ZERO: Self = Self {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    pub fn uniform(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    pub fn is_zero(&self) -> bool {
        self.top <= 0.0 && self.right <= 0.0 && self.bottom <= 0.0 && self.left <= 0.0
    }

    /// CSS 1–4 value shorthand.
    fn from_shorthand(values: &[f32]) -> Option<Self> {
        match *values {
            [a] => Some(Self::uniform(a)),
            [v, h] => Some(Self {
                top: v,
                right: h,
                bottom: v,
                left: h,
            }),
            [t, h, b] => Some(Self {
                top: t,
                right: h,
                bottom: b,
                left: h,
            }),
            [t, r, b, l] => Some(Self {
                top: t,
                right: r,
                bottom: b,
                left: l,
            }),
            _ => None,
        }
    }
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn is_transparent(&self) -> bool {
        self.a < 0.001
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(|v| v as f32 / 255.0);
        match hex.len() {
            6 => Some(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => Some(Self::rgb(
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            )),
            _ => None,
        }
    }

    /// Parse `#hex`, `rgb(r, g, b)`, `rgba(...)` or a handful of names.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        if value.starts_with('#') {
            return Self::from_hex(&value);
        }
        if let Some(args) = value
            .strip_prefix("rgba(")
            .or_else(|| value.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let parts: Vec<f32> = args
                .split(',')
                .filter_map(|p| p.trim().parse::<f32>().ok())
                .collect();
            return match parts.as_slice() {
                [r, g, b] => Some(Self::rgb(r / 255.0, g / 255.0, b / 255.0)),
                [r, g, b, a] => Some(Self {
                    r: r / 255.0,
                    g: g / 255.0,
                    b: b / 255.0,
                    a: a.clamp(0.0, 1.0),
                }),
                _ => None,
            };
        }
        let named = match value.as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "transparent" => Self::TRANSPARENT,
            "gray" | "grey" => Self::rgb(0.502, 0.502, 0.502),
            "silver" => Self::rgb(0.753, 0.753, 0.753),
            "lightgray" | "lightgrey" => Self::rgb(0.827, 0.827, 0.827),
            "red" => Self::rgb(1.0, 0.0, 0.0),
            "maroon" => Self::rgb(0.502, 0.0, 0.0),
            "green" => Self::rgb(0.0, 0.502, 0.0),
            "darkgreen" => Self::rgb(0.0, 0.392, 0.0),
            "blue" => Self::rgb(0.0, 0.0, 1.0),
            "navy" => Self::rgb(0.0, 0.0, 0.502),
            "darkblue" => Self::rgb(0.0, 0.0, 0.545),
            "goldenrod" => Self::rgb(0.855, 0.647, 0.125),
            _ => return None,
        };
        Some(named)
    }
}

// ---------------------------------------------------------------------------
// Units
// ---------------------------------------------------------------------------

/// Parse a CSS length into points. `em` resolves against `font_size`.
pub fn parse_length(value: &str, font_size: f32) -> Option<f32> {
    let v = value.trim();
    let (number, factor) = if let Some(n) = v.strip_suffix("px") {
        (n, PX_TO_PT)
    } else if let Some(n) = v.strip_suffix("pt") {
        (n, 1.0)
    } else if let Some(n) = v.strip_suffix("mm") {
        (n, MM_TO_PT)
    } else if let Some(n) = v.strip_suffix("cm") {
        (n, MM_TO_PT * 10.0)
    } else if let Some(n) = v.strip_suffix("in") {
        (n, 72.0)
    } else if let Some(n) = v.strip_suffix("rem") {
        (n, ROOT_FONT_SIZE)
    } else if let Some(n) = v.strip_suffix("em") {
        (n, font_size)
    } else {
        (v, PX_TO_PT)
    };
    number.trim().parse::<f32>().ok().map(|n| n * factor)
}

fn parse_extent(value: &str, font_size: f32) -> Extent {
    let v = value.trim();
    if v == "auto" {
        Extent::Auto
    } else if let Some(p) = v.strip_suffix('%') {
        p.trim()
            .parse::<f32>()
            .map(Extent::Percent)
            .unwrap_or(Extent::Auto)
    } else {
        parse_length(v, font_size)
            .map(Extent::Pt)
            .unwrap_or(Extent::Auto)
    }
}

// ---------------------------------------------------------------------------
// Stylesheets
// ---------------------------------------------------------------------------

/// Page box settings from an `@page` rule.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRule {
    /// Explicit or named page size in points, as declared (width, height).
    pub size: Option<(f32, f32)>,
    pub orientation: Option<PageOrientation>,
    /// Uniform page margin in points.
    pub margin: Option<f32>,
}

/// Compound selector: `tag`, `.class`, `#id`, `tag.class#id`, or `*`.
#[derive(Debug, Clone, PartialEq)]
struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty()
            || text
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '>' | '+' | '~' | ':' | '['))
        {
            return None;
        }
        let mut selector = Selector {
            tag: None,
            id: None,
            classes: Vec::new(),
        };
        let mut current = String::new();
        let mut kind = ' ';
        for c in text.chars().chain(std::iter::once('\0')) {
            if c == '.' || c == '#' || c == '\0' {
                match kind {
                    '.' if !current.is_empty() => selector.classes.push(current.clone()),
                    '#' if !current.is_empty() => selector.id = Some(current.clone()),
                    ' ' if !current.is_empty() && current != "*" => {
                        selector.tag = Some(current.to_ascii_lowercase())
                    }
                    _ => {}
                }
                current.clear();
                kind = c;
            } else {
                current.push(c);
            }
        }
        Some(selector)
    }

    fn specificity(&self) -> (usize, usize, usize) {
        (
            self.id.is_some() as usize,
            self.classes.len(),
            self.tag.is_some() as usize,
        )
    }

    fn matches(&self, element: &ElementNode) -> bool {
        if let Some(tag) = &self.tag {
            if tag != element.tag.name() {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        let classes = element.classes();
        self.classes.iter().all(|c| classes.contains(&c.as_str()))
    }
}

#[derive(Debug, Clone)]
struct Rule {
    selector: Selector,
    declarations: Vec<(String, String)>,
}

/// Parsed `<style>` content.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
    pub page: PageRule,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let css = strip_comments(css);
        let mut sheet = Stylesheet::default();
        let mut rest = css.as_str();

        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            let body_start = open + 1;
            let Some(close) = matching_brace(&rest[body_start..]) else {
                break;
            };
            let body = &rest[body_start..body_start + close];
            rest = &rest[body_start + close + 1..];

            if let Some(page) = prelude.strip_prefix("@page") {
                if page.trim().is_empty() {
                    sheet.apply_page_rule(body);
                } else {
                    log::debug!("ignoring @page selector {page:?}");
                }
                continue;
            }
            if prelude.starts_with('@') {
                log::debug!("ignoring at-rule {prelude:?}");
                continue;
            }

            let declarations = parse_declarations(body);
            for part in prelude.split(',') {
                match Selector::parse(part) {
                    Some(selector) => sheet.rules.push(Rule {
                        selector,
                        declarations: declarations.clone(),
                    }),
                    None => log::debug!("skipping unsupported selector {:?}", part.trim()),
                }
            }
        }
        sheet
    }

    fn apply_page_rule(&mut self, body: &str) {
        for (prop, value) in parse_declarations(body) {
            match prop.as_str() {
                "size" => self.parse_page_size(&value),
                "margin" => {
                    let first = value.split_whitespace().next().unwrap_or("");
                    self.page.margin = parse_length(first, ROOT_FONT_SIZE);
                }
                _ => {}
            }
        }
    }

    fn parse_page_size(&mut self, value: &str) {
        let mut lengths = Vec::new();
        for token in value.split_whitespace() {
            let token = token.to_ascii_lowercase();
            match token.as_str() {
                "landscape" => self.page.orientation = Some(PageOrientation::Landscape),
                "portrait" => self.page.orientation = Some(PageOrientation::Portrait),
                "auto" => {}
                named => match named_page_size(named) {
                    Some(size) => self.page.size = Some(size),
                    None => {
                        if let Some(len) = parse_length(named, ROOT_FONT_SIZE) {
                            lengths.push(len);
                        }
                    }
                },
            }
        }
        match lengths.as_slice() {
            [side] => self.page.size = Some((*side, *side)),
            [w, h, ..] => self.page.size = Some((*w, *h)),
            [] => {}
        }
    }

    /// Declarations of every rule matching `element`, in cascade order.
    fn matching_declarations<'a>(&'a self, element: &ElementNode) -> Vec<&'a (String, String)> {
        let mut matched: Vec<(usize, usize, usize, usize, &Rule)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.selector.matches(element))
            .map(|(order, rule)| {
                let (a, b, c) = rule.selector.specificity();
                (a, b, c, order, rule)
            })
            .collect();
        matched.sort_by_key(|&(a, b, c, order, _)| (a, b, c, order));
        matched
            .into_iter()
            .flat_map(|(.., rule)| rule.declarations.iter())
            .collect()
    }
}

pub fn named_page_size(name: &str) -> Option<(f32, f32)> {
    match name.to_ascii_lowercase().as_str() {
        "a3" => Some((841.89, 1190.55)),
        "a4" => Some((595.28, 841.89)),
        "a5" => Some((419.53, 595.28)),
        "letter" => Some((612.0, 792.0)),
        "legal" => Some((612.0, 1008.0)),
        _ => None,
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Offset of the `}` closing a block whose `{` has just been consumed.
fn matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

fn parse_declarations(body: &str) -> Vec<(String, String)> {
    body.split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim().trim_end_matches("!important").trim();
            (!prop.is_empty() && !value.is_empty()).then(|| (prop, value.to_string()))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Style resolution
// ---------------------------------------------------------------------------

/// Resolve the style for an element: tag defaults, inherited text
/// properties, matching stylesheet rules, then the inline `style` attribute.
pub fn resolve_style(
    element: &ElementNode,
    parent: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> ComputedStyle {
    let mut style = ComputedStyle::default();
    let parent_font_size = parent.map(|p| p.font_size).unwrap_or(ROOT_FONT_SIZE);
    if let Some(p) = parent {
        style.inherit_from(p);
    }
    apply_tag_defaults(&mut style, &element.tag);

    for (prop, value) in sheet.matching_declarations(element) {
        apply_css_property(&mut style, prop, value, parent_font_size);
    }
    if let Some(inline) = element.inline_style() {
        for (prop, value) in parse_declarations(inline) {
            apply_css_property(&mut style, &prop, &value, parent_font_size);
        }
    }
    style
}

fn apply_tag_defaults(s: &mut ComputedStyle, tag: &Tag) {
    let heading = |s: &mut ComputedStyle, size: f32, before: f32, after: f32| {
        s.font_size = size;
        s.font_weight = FontWeight::Bold;
        s.margin.top = before;
        s.margin.bottom = after;
    };
    match tag {
        Tag::H1 => heading(s, 24.0, 0.0, 10.0),
        Tag::H2 => heading(s, 18.0, 8.0, 7.0),
        Tag::H3 => heading(s, 14.0, 6.0, 5.0),
        Tag::H4 => heading(s, 12.0, 4.0, 4.0),
        Tag::P => s.margin.bottom = 7.5,
        Tag::Ul | Tag::Ol => {
            s.margin.bottom = 7.5;
            s.padding.left = 18.0;
        }
        Tag::Li => {
            s.display = Display::ListItem;
            s.margin.bottom = 3.0;
        }
        Tag::Table => {
            s.width = Extent::Percent(100.0);
            s.margin.bottom = 9.0;
        }
        Tag::Tr => s.display = Display::TableRow,
        Tag::Td | Tag::Th => {
            s.display = Display::TableCell;
            s.padding = Edges {
                top: 3.0,
                right: 4.5,
                bottom: 3.0,
                left: 4.5,
            };
            s.border = Edges::uniform(0.75);
            s.border_color = Color::rgb(0.6, 0.6, 0.6);
            if *tag == Tag::Th {
                s.font_weight = FontWeight::Bold;
                s.background_color = Color::rgb(0.93, 0.93, 0.93);
            }
        }
        Tag::Hr => {
            s.border.top = 0.75;
            s.border_color = Color::rgb(0.6, 0.6, 0.6);
            s.margin = Edges {
                top: 6.0,
                right: 0.0,
                bottom: 6.0,
                left: 0.0,
            };
        }
        Tag::Span | Tag::Br => s.display = Display::Inline,
        Tag::Strong => {
            s.display = Display::Inline;
            s.font_weight = FontWeight::Bold;
        }
        Tag::Em => {
            s.display = Display::Inline;
            s.font_style = FontStyle::Italic;
        }
        Tag::U => {
            s.display = Display::Inline;
            s.text_decoration = TextDecoration::Underline;
        }
        Tag::Head | Tag::Title | Tag::Meta | Tag::Link | Tag::Style | Tag::Unknown(_) => {
            s.display = Display::None;
        }
        Tag::Html
        | Tag::Body
        | Tag::Div
        | Tag::Section
        | Tag::Header
        | Tag::Footer
        | Tag::THead
        | Tag::TBody
        | Tag::TFoot => {}
    }
}

fn apply_css_property(s: &mut ComputedStyle, prop: &str, val: &str, parent_font_size: f32) {
    let em = s.font_size;
    let length = |v: &str| parse_length(v, em);
    let lengths = |v: &str| -> Vec<f32> { v.split_whitespace().filter_map(|p| parse_length(p, em)).collect() };

    match prop {
        "display" => {
            s.display = match val {
                "flex" => Display::Flex,
                "block" => Display::Block,
                "inline" | "inline-block" => Display::Inline,
                "list-item" => Display::ListItem,
                "table-row" => Display::TableRow,
                "table-cell" => Display::TableCell,
                "none" => Display::None,
                _ => s.display,
            }
        }
        "flex-direction" => {
            s.flex_direction = match val {
                "column" => FlexDirection::Column,
                _ => FlexDirection::Row,
            }
        }
        "justify-content" => {
            s.justify_content = match val {
                "flex-end" | "end" | "right" => JustifyContent::End,
                "center" => JustifyContent::Center,
                "space-between" => JustifyContent::SpaceBetween,
                "space-around" => JustifyContent::SpaceAround,
                "space-evenly" => JustifyContent::SpaceEvenly,
                _ => JustifyContent::Start,
            }
        }
        "align-items" => {
            s.align_items = match val {
                "flex-start" | "start" => AlignItems::Start,
                "flex-end" | "end" => AlignItems::End,
                "center" => AlignItems::Center,
                _ => AlignItems::Stretch,
            }
        }
        "gap" => {
            if let Some(v) = length(val) {
                s.gap = v;
            }
        }
        "width" => s.width = parse_extent(val, em),
        "height" => s.height = parse_extent(val, em),
        "margin" => {
            if let Some(e) = Edges::from_shorthand(&lengths(&val.replace("auto", "0"))) {
                s.margin = e;
            }
        }
        "margin-top" => s.margin.top = length(val).unwrap_or(s.margin.top),
        "margin-right" => s.margin.right = length(val).unwrap_or(s.margin.right),
        "margin-bottom" => s.margin.bottom = length(val).unwrap_or(s.margin.bottom),
        "margin-left" => s.margin.left = length(val).unwrap_or(s.margin.left),
        "padding" => {
            if let Some(e) = Edges::from_shorthand(&lengths(val)) {
                s.padding = e;
            }
        }
        "padding-top" => s.padding.top = length(val).unwrap_or(s.padding.top),
        "padding-right" => s.padding.right = length(val).unwrap_or(s.padding.right),
        "padding-bottom" => s.padding.bottom = length(val).unwrap_or(s.padding.bottom),
        "padding-left" => s.padding.left = length(val).unwrap_or(s.padding.left),
        "border" => {
            let (width, color) = parse_border(val, em);
            s.border = Edges::uniform(width);
            if let Some(c) = color {
                s.border_color = c;
            }
        }
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            let (width, color) = parse_border(val, em);
            match prop {
                "border-top" => s.border.top = width,
                "border-right" => s.border.right = width,
                "border-bottom" => s.border.bottom = width,
                _ => s.border.left = width,
            }
            if let Some(c) = color {
                s.border_color = c;
            }
        }
        "border-width" => {
            if let Some(e) = Edges::from_shorthand(&lengths(val)) {
                s.border = e;
            }
        }
        "border-color" => {
            if let Some(c) = Color::parse(val) {
                s.border_color = c;
            }
        }
        "font-size" => {
            let size = match val {
                "small" => Some(9.75),
                "medium" => Some(12.0),
                "large" => Some(13.5),
                "x-large" => Some(18.0),
                "xx-large" => Some(24.0),
                v => match v.strip_suffix('%') {
                    Some(p) => p.trim().parse::<f32>().ok().map(|p| parent_font_size * p / 100.0),
                    None => parse_length(v, parent_font_size),
                },
            };
            if let Some(size) = size {
                s.font_size = size;
            }
        }
        "font-weight" => {
            s.font_weight = match val {
                "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
                _ => FontWeight::Normal,
            }
        }
        "font-style" => {
            s.font_style = match val {
                "italic" | "oblique" => FontStyle::Italic,
                _ => FontStyle::Normal,
            }
        }
        "font-family" => s.font_family = FontFamily::from_css(val),
        "color" => {
            if let Some(c) = Color::parse(val) {
                s.color = c;
            }
        }
        "background-color" | "background" => {
            if let Some(c) = Color::parse(val) {
                s.background_color = c;
            }
        }
        "text-align" => {
            s.text_align = match val {
                "center" => TextAlign::Center,
                "right" | "end" => TextAlign::Right,
                _ => TextAlign::Left,
            }
        }
        "line-height" => {
            if val == "normal" {
                s.line_height = 1.2;
            } else if let Ok(factor) = val.parse::<f32>() {
                s.line_height = factor;
            } else if let Some(p) = val.strip_suffix('%') {
                if let Ok(p) = p.trim().parse::<f32>() {
                    s.line_height = p / 100.0;
                }
            } else if let Some(pt) = length(val) {
                s.line_height = pt / s.font_size.max(0.1);
            }
        }
        "text-decoration" | "text-decoration-line" => {
            s.text_decoration = if val.contains("underline") {
                TextDecoration::Underline
            } else {
                TextDecoration::None
            }
        }
        "text-transform" => {
            s.text_transform = match val {
                "uppercase" => TextTransform::Uppercase,
                "lowercase" => TextTransform::Lowercase,
                "capitalize" => TextTransform::Capitalize,
                _ => TextTransform::None,
            }
        }
        "page-break-before" | "break-before" => {
            s.page_break_before = matches!(val, "always" | "page");
        }
        "page-break-after" | "break-after" => {
            s.page_break_after = matches!(val, "always" | "page");
        }
        "page-break-inside" | "break-inside" => {
            s.page_break_inside_avoid = val == "avoid";
        }
        _ => {}
    }
}

/// `<width> <style> <color>` in any order. `none` yields a zero width.
fn parse_border(val: &str, em: f32) -> (f32, Option<Color>) {
    let mut width = None;
    let mut color = None;
    let mut styled = false;
    for token in val.split_whitespace() {
        match token {
            "none" | "hidden" => return (0.0, None),
            "solid" | "dashed" | "dotted" | "double" => styled = true,
            "thin" => width = Some(0.75),
            "medium" => width = Some(2.25),
            "thick" => width = Some(3.75),
            t => {
                if let Some(len) = parse_length(t, em) {
                    width = Some(len);
                } else if let Some(c) = Color::parse(t) {
                    color = Some(c);
                }
            }
        }
    }
    let width = width.unwrap_or(if styled { 2.25 } else { 0.0 });
    (width, color)
}

// ---------------------------------------------------------------------------
// Styled DOM tree
// ---------------------------------------------------------------------------

/// A DOM node annotated with its computed style. Elements with
/// `display: none` are dropped while building the tree.
#[derive(Debug, Clone)]
pub enum StyledNode {
    Element {
        tag: Tag,
        style: ComputedStyle,
        children: Vec<StyledNode>,
        attrs: HashMap<String, String>,
    },
    Text {
        text: String,
        style: ComputedStyle,
    },
}

impl StyledNode {
    pub fn style(&self) -> &ComputedStyle {
        match self {
            StyledNode::Element { style, .. } | StyledNode::Text { style, .. } => style,
        }
    }
}

/// Build a styled tree from a DOM tree, resolving styles top-down.
pub fn build_styled_tree(
    nodes: &[DomNode],
    parent_style: Option<&ComputedStyle>,
    sheet: &Stylesheet,
) -> Vec<StyledNode> {
    let mut result = Vec::new();
    for node in nodes {
        match node {
            DomNode::Element(e) => {
                let style = resolve_style(e, parent_style, sheet);
                if style.display == Display::None {
                    continue;
                }
                let children = build_styled_tree(&e.children, Some(&style), sheet);
                result.push(StyledNode::Element {
                    tag: e.tag.clone(),
                    style,
                    children,
                    attrs: e.attributes.clone(),
                });
            }
            DomNode::Text(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                let style = parent_style
                    .map(ComputedStyle::text_only)
                    .unwrap_or_default();
                result.push(StyledNode::Text {
                    text: text.clone(),
                    style,
                });
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn element(html: &str) -> ElementNode {
        match parse_html(html).remove(0) {
            DomNode::Element(e) => e,
            DomNode::Text(t) => panic!("expected element, got text {t:?}"),
        }
    }

    #[test]
    fn lengths_convert_to_points() {
        assert_eq!(parse_length("16px", 12.0), Some(12.0));
        assert_eq!(parse_length("10pt", 12.0), Some(10.0));
        assert!((parse_length("25.4mm", 12.0).unwrap() - 72.0).abs() < 0.01);
        assert_eq!(parse_length("2em", 10.0), Some(20.0));
        assert_eq!(parse_length("wide", 10.0), None);
    }

    #[test]
    fn page_rule_reads_size_and_orientation() {
        let sheet = Stylesheet::parse("@page { size: A4 landscape; margin: 20mm; }");
        assert_eq!(sheet.page.size, Some((595.28, 841.89)));
        assert_eq!(sheet.page.orientation, Some(PageOrientation::Landscape));
        assert!((sheet.page.margin.unwrap() - 56.69).abs() < 0.01);
    }

    #[test]
    fn page_rule_accepts_explicit_lengths() {
        let sheet = Stylesheet::parse("/* custom */ @page { size: 100mm 50mm }");
        let (w, h) = sheet.page.size.unwrap();
        assert!(w > h);
        assert_eq!(sheet.page.orientation, None);
    }

    #[test]
    fn more_specific_rules_win() {
        let sheet = Stylesheet::parse(
            ".name { color: #00ff00 } p { color: #ff0000; font-size: 20px } p.name { font-weight: bold }",
        );
        let style = resolve_style(&element(r#"<p class="name">x</p>"#), None, &sheet);
        assert_eq!(style.color, Color::rgb(0.0, 1.0, 0.0));
        assert_eq!(style.font_size, 15.0);
        assert_eq!(style.font_weight, FontWeight::Bold);
    }

    #[test]
    fn inline_style_overrides_sheet() {
        let sheet = Stylesheet::parse("h1 { text-align: left }");
        let style = resolve_style(
            &element(r#"<h1 style="text-align: center; padding: 4pt 8pt">x</h1>"#),
            None,
            &sheet,
        );
        assert_eq!(style.text_align, TextAlign::Center);
        assert_eq!(style.padding.left, 8.0);
        assert_eq!(style.padding.top, 4.0);
    }

    #[test]
    fn combinator_selectors_are_skipped() {
        let sheet = Stylesheet::parse("div p { color: red } td, th { color: blue }");
        let td = resolve_style(&element("<td>x</td>"), None, &sheet);
        assert_eq!(td.color, Color::rgb(0.0, 0.0, 1.0));
        let p = resolve_style(&element("<p>x</p>"), None, &sheet);
        assert_eq!(p.color, Color::BLACK);
    }

    #[test]
    fn border_shorthand() {
        let mut s = ComputedStyle::default();
        apply_css_property(&mut s, "border", "2px solid #1e3a8a", 12.0);
        assert_eq!(s.border, Edges::uniform(1.5));
        assert!((s.border_color.b - 0.541).abs() < 0.01);
        apply_css_property(&mut s, "border-bottom", "none", 12.0);
        assert_eq!(s.border.bottom, 0.0);
    }

    #[test]
    fn text_inherits_but_boxes_do_not() {
        let sheet = Stylesheet::parse(".box { padding: 10px; color: navy; font-size: 20px }");
        let tree = build_styled_tree(&parse_html(r#"<div class="box">hello</div>"#), None, &sheet);
        let StyledNode::Element { children, .. } = &tree[0] else {
            panic!("expected element");
        };
        let text_style = children[0].style();
        assert_eq!(text_style.font_size, 15.0);
        assert_eq!(text_style.color, Color::rgb(0.0, 0.0, 0.502));
        assert!(text_style.padding.is_zero());
    }

    #[test]
    fn head_content_is_not_styled() {
        let tree = build_styled_tree(
            &parse_html("<head><title>T</title></head><p>x</p>"),
            None,
            &Stylesheet::default(),
        );
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn capitalize_words() {
        assert_eq!(TextTransform::Capitalize.apply("ana ruiz"), "Ana Ruiz");
        assert_eq!(TextTransform::Uppercase.apply("certificate"), "CERTIFICATE");
    }
}
