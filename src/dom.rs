//! HTML parser – converts a bound template into a simple DOM tree.
//!
//! Only the controlled subset our document templates use is recognised:
//! - Document: html, head, body, title, meta, link, style
//! - Blocks: div, section, header, footer, p, h1-h4, hr
//! - Inline: span, strong, b, em, i, u, br
//! - Lists: ul, ol, li
//! - Tables: table, thead, tbody, tfoot, tr, th, td
//!
//! `<style>` and `<title>` are raw-text elements; their content is kept as a
//! single text child so the stylesheet can be collected later.

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// DOM types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tag {
    Html,
    Head,
    Body,
    Title,
    Meta,
    Link,
    Style,
    Div,
    Section,
    Header,
    Footer,
    P,
    H1,
    H2,
    H3,
    H4,
    Hr,
    Span,
    Strong,
    Em,
    U,
    Br,
    Ul,
    Ol,
    Li,
    Table,
    THead,
    TBody,
    TFoot,
    Tr,
    Th,
    Td,
    /// Anything else. Kept in the tree but never rendered.
    Unknown(String),
}

impl Tag {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "html" => Tag::Html,
            "head" => Tag::Head,
            "body" => Tag::Body,
            "title" => Tag::Title,
            "meta" => Tag::Meta,
            "link" => Tag::Link,
            "style" => Tag::Style,
            "div" => Tag::Div,
            "section" | "article" | "main" => Tag::Section,
            "header" => Tag::Header,
            "footer" => Tag::Footer,
            "p" => Tag::P,
            "h1" => Tag::H1,
            "h2" => Tag::H2,
            "h3" => Tag::H3,
            "h4" => Tag::H4,
            "hr" => Tag::Hr,
            "span" => Tag::Span,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "u" => Tag::U,
            "br" => Tag::Br,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            "table" => Tag::Table,
            "thead" => Tag::THead,
            "tbody" => Tag::TBody,
            "tfoot" => Tag::TFoot,
            "tr" => Tag::Tr,
            "th" => Tag::Th,
            "td" => Tag::Td,
            other => Tag::Unknown(other.to_string()),
        }
    }

    /// Lower-case element name, used for selector matching.
    pub fn name(&self) -> &str {
        match self {
            Tag::Html => "html",
            Tag::Head => "head",
            Tag::Body => "body",
            Tag::Title => "title",
            Tag::Meta => "meta",
            Tag::Link => "link",
            Tag::Style => "style",
            Tag::Div => "div",
            Tag::Section => "section",
            Tag::Header => "header",
            Tag::Footer => "footer",
            Tag::P => "p",
            Tag::H1 => "h1",
            Tag::H2 => "h2",
            Tag::H3 => "h3",
            Tag::H4 => "h4",
            Tag::Hr => "hr",
            Tag::Span => "span",
            Tag::Strong => "strong",
            Tag::Em => "em",
            Tag::U => "u",
            Tag::Br => "br",
            Tag::Ul => "ul",
            Tag::Ol => "ol",
            Tag::Li => "li",
            Tag::Table => "table",
            Tag::THead => "thead",
            Tag::TBody => "tbody",
            Tag::TFoot => "tfoot",
            Tag::Tr => "tr",
            Tag::Th => "th",
            Tag::Td => "td",
            Tag::Unknown(name) => name,
        }
    }

    /// Elements that never have children or a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(self, Tag::Meta | Tag::Link | Tag::Br | Tag::Hr)
            || matches!(self, Tag::Unknown(n) if n == "img" || n == "input")
    }

    /// Elements whose content is raw text up to the matching closing tag.
    pub fn is_raw_text(&self) -> bool {
        matches!(self, Tag::Style | Tag::Title)
            || matches!(self, Tag::Unknown(n) if n == "script")
    }

    pub fn is_table_section(&self) -> bool {
        matches!(self, Tag::THead | Tag::TBody | Tag::TFoot)
    }
}

#[derive(Debug, Clone)]
pub enum DomNode {
    Element(ElementNode),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: Tag,
    pub attributes: HashMap<String, String>,
    pub children: Vec<DomNode>,
}

impl ElementNode {
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            attributes: HashMap::new(),
            children: Vec::new(),
        }
    }

    pub fn classes(&self) -> Vec<&str> {
        self.attributes
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(|s| s.as_str())
    }

    pub fn inline_style(&self) -> Option<&str> {
        self.attributes.get("style").map(|s| s.as_str())
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                DomNode::Text(t) => out.push_str(t),
                DomNode::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse an HTML string into a list of top-level DOM nodes.
///
/// The parser is forgiving: unmatched closing tags close the nearest open
/// element, and unterminated elements are closed at end of input.
pub fn parse_html(html: &str) -> Vec<DomNode> {
    let mut parser = Parser::new(html);
    parser.parse_nodes()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_nodes(&mut self) -> Vec<DomNode> {
        let mut nodes = Vec::new();
        loop {
            self.skip_inter_element_whitespace();
            if self.eof() || self.starts_with("</") {
                break;
            }
            if let Some(node) = self.parse_node() {
                nodes.push(node);
            }
        }
        nodes
    }

    fn parse_node(&mut self) -> Option<DomNode> {
        if self.starts_with("<!--") {
            self.skip_past("-->");
            return None;
        }
        if self.starts_with("<!") || self.starts_with("<?") {
            self.skip_past(">");
            return None;
        }
        let opens_tag = self.starts_with("<")
            && self.rest()[1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic());
        if opens_tag {
            Some(self.parse_element())
        } else {
            Some(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> DomNode {
        let start = self.pos;
        // A lone '<' that does not open a tag is literal text.
        self.bump_char();
        while !self.eof() && !self.starts_with("<") {
            self.bump_char();
        }
        DomNode::Text(decode_entities(&self.input[start..self.pos]))
    }

    fn parse_element(&mut self) -> DomNode {
        self.bump_char(); // '<'
        let tag = Tag::parse(&self.parse_name());
        let mut elem = ElementNode::new(tag);

        loop {
            self.skip_whitespace();
            if self.eof() || self.starts_with(">") || self.starts_with("/>") {
                break;
            }
            let before = self.pos;
            let (key, value) = self.parse_attribute();
            if self.pos == before {
                // Stray character inside the tag; step over it.
                self.bump_char();
                continue;
            }
            if !key.is_empty() {
                elem.attributes.insert(key.to_ascii_lowercase(), value);
            }
        }

        if self.starts_with("/>") {
            self.pos += 2;
            return DomNode::Element(elem);
        }
        if self.starts_with(">") {
            self.pos += 1;
        }
        if elem.tag.is_void() {
            return DomNode::Element(elem);
        }

        if elem.tag.is_raw_text() {
            let close = format!("</{}", elem.tag.name());
            let start = self.pos;
            let end = find_ascii_case_insensitive(&self.input[start..], &close)
                .map(|i| start + i)
                .unwrap_or(self.input.len());
            let raw = &self.input[start..end];
            if !raw.is_empty() {
                elem.children.push(DomNode::Text(raw.to_string()));
            }
            self.pos = end;
        } else {
            elem.children = self.parse_nodes();
        }

        if self.starts_with("</") {
            self.pos += 2;
            self.parse_name();
            self.skip_past(">");
        }

        DomNode::Element(elem)
    }

    fn parse_name(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == ':' {
                self.bump_char();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn parse_attribute(&mut self) -> (String, String) {
        let key = self.parse_name();
        self.skip_whitespace();
        if !self.starts_with("=") {
            return (key, String::new());
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.bump_char();
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == q {
                        break;
                    }
                    self.bump_char();
                }
                let raw = &self.input[start..self.pos];
                if !self.eof() {
                    self.bump_char();
                }
                decode_entities(raw)
            }
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '>' || c == '/' {
                        break;
                    }
                    self.bump_char();
                }
                decode_entities(&self.input[start..self.pos])
            }
        };
        (key, value)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map(char::is_whitespace).unwrap_or(false) {
            self.bump_char();
        }
    }

    /// Skip whitespace-only runs between tags; whitespace before text is kept.
    fn skip_inter_element_whitespace(&mut self) {
        let saved = self.pos;
        self.skip_whitespace();
        if !self.eof() && !self.starts_with("<") {
            self.pos = saved;
        }
    }

    fn skip_past(&mut self, needle: &str) {
        match self.rest().find(needle) {
            Some(i) => self.pos += i + needle.len(),
            None => self.pos = self.input.len(),
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump_char(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }
}

fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let hay = haystack.as_bytes();
    let pat = needle.as_bytes();
    if pat.is_empty() || hay.len() < pat.len() {
        return None;
    }
    (0..=hay.len() - pat.len()).find(|&i| hay[i..i + pat.len()].eq_ignore_ascii_case(pat))
}

/// Decode the named entities templates use plus decimal / hex references.
/// Tera's escaper emits `&#x27;` and `&#x2F;`, so numeric forms matter.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&tail[1..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        "copy" => Some('\u{00A9}'),
        "middot" => Some('\u{00B7}'),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        _ => {
            let num = name.strip_prefix('#')?;
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience helpers
// ---------------------------------------------------------------------------

/// Find the `<body>` element and return its children, or return all nodes if
/// no `<body>` is present.
pub fn body_children(nodes: &[DomNode]) -> Vec<DomNode> {
    fn find_body(nodes: &[DomNode]) -> Option<&ElementNode> {
        nodes.iter().find_map(|node| match node {
            DomNode::Element(e) if e.tag == Tag::Body => Some(e),
            DomNode::Element(e) if e.tag == Tag::Html => find_body(&e.children),
            _ => None,
        })
    }
    match find_body(nodes) {
        Some(body) => body.children.clone(),
        None => nodes
            .iter()
            .filter(|n| !matches!(n, DomNode::Element(e) if e.tag == Tag::Head))
            .cloned()
            .collect(),
    }
}

/// First element with the given tag, searching depth-first.
pub fn find_element<'a>(nodes: &'a [DomNode], tag: &Tag) -> Option<&'a ElementNode> {
    nodes.iter().find_map(|node| match node {
        DomNode::Element(e) if e.tag == *tag => Some(e),
        DomNode::Element(e) => find_element(&e.children, tag),
        DomNode::Text(_) => None,
    })
}

/// Concatenate the text of every `<style>` element in the document.
pub fn collect_stylesheets(nodes: &[DomNode]) -> String {
    let mut css = String::new();
    for node in nodes {
        if let DomNode::Element(e) = node {
            if e.tag == Tag::Style {
                css.push_str(&e.text_content());
                css.push('\n');
            } else {
                css.push_str(&collect_stylesheets(&e.children));
            }
        }
    }
    css
}

/// Text of the first `<title>` element, if any.
pub fn document_title(nodes: &[DomNode]) -> Option<String> {
    nodes.iter().find_map(|node| match node {
        DomNode::Element(e) if e.tag == Tag::Title => {
            let title = decode_entities(e.text_content().trim());
            (!title.is_empty()).then_some(title)
        }
        DomNode::Element(e) => document_title(&e.children),
        DomNode::Text(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_element(nodes: &[DomNode]) -> &ElementNode {
        match &nodes[0] {
            DomNode::Element(e) => e,
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn parse_simple_div() {
        let nodes = parse_html(r#"<div class="frame wide"><p>Hello</p></div>"#);
        assert_eq!(nodes.len(), 1);
        let div = first_element(&nodes);
        assert_eq!(div.tag, Tag::Div);
        assert_eq!(div.classes(), vec!["frame", "wide"]);
        assert_eq!(div.children.len(), 1);
    }

    #[test]
    fn void_elements_have_no_children() {
        let nodes = parse_html(r#"<p>one<br>two</p><hr><p>three</p>"#);
        assert_eq!(nodes.len(), 3);
        let p = first_element(&nodes);
        assert_eq!(p.children.len(), 3);
    }

    #[test]
    fn style_content_is_raw_text() {
        let html = "<head><style>@page { size: A4 landscape } p > span { color: red }</style></head><body><p>x</p></body>";
        let nodes = parse_html(html);
        let css = collect_stylesheets(&nodes);
        assert!(css.contains("@page { size: A4 landscape }"));
        assert!(css.contains("p > span"));
    }

    #[test]
    fn tera_escapes_are_decoded() {
        assert_eq!(decode_entities("O&#x27;Neil &amp; Co &#x2F; 5&#39;"), "O'Neil & Co / 5'");
        assert_eq!(decode_entities("a &unknown; b"), "a &unknown; b");
        assert_eq!(decode_entities("fish & chips"), "fish & chips");
    }

    #[test]
    fn body_children_skips_head() {
        let html = "<!DOCTYPE html><html><head><title>T</title></head><body><h1>Hi</h1></body></html>";
        let nodes = parse_html(html);
        let body = body_children(&nodes);
        assert_eq!(body.len(), 1);
        assert_eq!(document_title(&nodes).as_deref(), Some("T"));
    }

    #[test]
    fn table_sections_are_kept() {
        let html = "<table><thead><tr><th>A</th></tr></thead><tbody><tr><td>1</td></tr></tbody></table>";
        let nodes = parse_html(html);
        let table = first_element(&nodes);
        assert_eq!(table.children.len(), 2);
        assert!(matches!(&table.children[0], DomNode::Element(e) if e.tag.is_table_section()));
    }
}
