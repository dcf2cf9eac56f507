//! Text measurement with the PDF base-14 font metrics.
//!
//! Documents are rendered with the built-in Helvetica, Times and Courier
//! faces, so no font files are embedded. Widths come from the Helvetica AFM
//! table for ASCII; the other faces are derived from it.

use std::collections::HashMap;

/// Built-in font family selected by `font-family`.
///
/// The base-14 faces only cover the WinAnsi (Windows-1252) character set.
/// Anything else, such as `Ł` or emoji, is printed as `?`.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Helvetica,
    Times,
    Courier,
}

impl FontFamily {
    /// Pick the first family in a CSS `font-family` list that maps to a
    /// built-in face. Falls back to Helvetica.
    pub fn from_css(value: &str) -> Self {
        for name in value.split(',') {
            let name = name.trim().trim_matches(|c| c == '"' || c == '\'');
            match name.to_ascii_lowercase().as_str() {
                "helvetica" | "arial" | "sans-serif" | "system-ui" => return FontFamily::Helvetica,
                "times" | "times new roman" | "georgia" | "serif" => return FontFamily::Times,
                "courier" | "courier new" | "monospace" => return FontFamily::Courier,
                _ => continue,
            }
        }
        FontFamily::Helvetica
    }
}

/// Vertical metrics and width adjustments for one family, in 1/1000 em.
#[derive(Debug, Clone, Copy)]
struct FontMetrics {
    ascender: f32,
    descender: f32,
    /// Scale applied to Helvetica advances.
    width_scale: f32,
    /// Monospaced advance, if any.
    fixed_advance: Option<f32>,
}

/// Measures text for the built-in faces.
pub struct FontManager {
    metrics: HashMap<FontFamily, FontMetrics>,
}

impl FontManager {
    pub fn new() -> Self {
        let mut metrics = HashMap::new();
        metrics.insert(
            FontFamily::Helvetica,
            FontMetrics {
                ascender: 718.0,
                descender: -207.0,
                width_scale: 1.0,
                fixed_advance: None,
            },
        );
        metrics.insert(
            FontFamily::Times,
            FontMetrics {
                ascender: 683.0,
                descender: -217.0,
                width_scale: 0.9,
                fixed_advance: None,
            },
        );
        metrics.insert(
            FontFamily::Courier,
            FontMetrics {
                ascender: 629.0,
                descender: -157.0,
                width_scale: 1.0,
                fixed_advance: Some(600.0),
            },
        );
        Self { metrics }
    }

    fn metrics(&self, family: FontFamily) -> FontMetrics {
        self.metrics
            .get(&family)
            .or_else(|| self.metrics.get(&FontFamily::Helvetica))
            .copied()
            .unwrap_or(FontMetrics {
                ascender: 750.0,
                descender: -250.0,
                width_scale: 1.0,
                fixed_advance: None,
            })
    }

    /// Width of `text` in points.
    pub fn measure_text_width(
        &self,
        text: &str,
        font_size: f32,
        bold: bool,
        family: FontFamily,
    ) -> f32 {
        let m = self.metrics(family);
        let units: f32 = match m.fixed_advance {
            Some(advance) => text.chars().count() as f32 * advance,
            None => {
                let base: f32 = text.chars().map(helvetica_advance).sum();
                let bold_scale = if bold { 1.08 } else { 1.0 };
                base * m.width_scale * bold_scale
            }
        };
        units * font_size / 1000.0
    }

    pub fn line_height(&self, font_size: f32, line_height_factor: f32) -> f32 {
        font_size * line_height_factor
    }

    /// Distance from the top of the em box to the baseline, in points.
    pub fn ascender(&self, font_size: f32, family: FontFamily) -> f32 {
        self.metrics(family).ascender * font_size / 1000.0
    }

    /// Glyph box height (ascender + descender), in points.
    pub fn glyph_height(&self, font_size: f32, family: FontFamily) -> f32 {
        let m = self.metrics(family);
        (m.ascender - m.descender) * font_size / 1000.0
    }
}

impl Default for FontManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Helvetica advance width in 1/1000 em.
fn helvetica_advance(c: char) -> f32 {
    let w: u16 = match c {
        ' ' | '!' | ',' | '.' | '/' | ':' | ';' | '[' | '\\' | ']' | 'f' | 't' | 'I' => 278,
        '"' => 355,
        '#' | '$' | '0'..='9' | '?' | '_' => 556,
        '%' => 889,
        '&' | 'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' => 667,
        '\'' => 191,
        '(' | ')' | '-' | '`' | 'r' => 333,
        '*' => 389,
        '+' | '<' | '=' | '>' | '~' => 584,
        '@' => 1015,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' | 'w' => 722,
        'F' | 'T' | 'Z' => 611,
        'G' | 'O' | 'Q' => 778,
        'J' | 'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' => 500,
        'L' => 556,
        'M' | 'm' => 833,
        'W' => 944,
        '^' => 469,
        'a' | 'b' | 'd' | 'e' | 'g' | 'h' | 'n' | 'o' | 'p' | 'q' | 'u' => 556,
        'i' | 'j' | 'l' => 222,
        '{' | '}' => 334,
        '|' => 260,
        '\u{00A0}' => 278,
        '\u{2013}' => 556,
        '\u{2014}' => 1000,
        '\u{2022}' => 350,
        c if c.is_uppercase() => 700,
        c if c.is_alphabetic() => 556,
        _ => 556,
    };
    w as f32
}

/// Word-wrap text to fit within `max_width` points. Explicit `\n` starts a
/// new line. Words wider than a whole line are broken between characters.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    bold: bool,
    family: FontFamily,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }
    let measure = |s: &str| fonts.measure_text_width(s, font_size, bold, family);

    let mut lines: Vec<String> = Vec::new();
    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in words {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure(word) <= max_width {
                current = word.to_string();
            } else {
                let mut pieces = break_word(word, max_width, &measure);
                current = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn break_word(word: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    for c in word.chars() {
        piece.push(c);
        if measure(&piece) > max_width && piece.chars().count() > 1 {
            piece.pop();
            pieces.push(std::mem::take(&mut piece));
            piece.push(c);
        }
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_widths_follow_afm() {
        let mgr = FontManager::default();
        // H(722) + e(556) + l(222) + l(222) + o(556) = 2278
        let w = mgr.measure_text_width("Hello", 10.0, false, FontFamily::Helvetica);
        assert!((w - 22.78).abs() < 0.01);
    }

    #[test]
    fn courier_is_monospaced() {
        let mgr = FontManager::default();
        let narrow = mgr.measure_text_width("iiii", 10.0, false, FontFamily::Courier);
        let wide = mgr.measure_text_width("MMMM", 10.0, true, FontFamily::Courier);
        assert_eq!(narrow, wide);
        assert!((narrow - 24.0).abs() < 0.01);
    }

    #[test]
    fn bold_is_wider() {
        let mgr = FontManager::default();
        let regular = mgr.measure_text_width("Certificate", 12.0, false, FontFamily::Helvetica);
        let bold = mgr.measure_text_width("Certificate", 12.0, true, FontFamily::Helvetica);
        assert!(bold > regular);
    }

    #[test]
    fn family_from_css_list() {
        assert_eq!(FontFamily::from_css("'Times New Roman', serif"), FontFamily::Times);
        assert_eq!(FontFamily::from_css("\"Fancy\", monospace"), FontFamily::Courier);
        assert_eq!(FontFamily::from_css("Fancy"), FontFamily::Helvetica);
    }

    #[test]
    fn word_wrap_basic() {
        let mgr = FontManager::default();
        let lines = wrap_text("Hello world foo bar", 16.0, false, FontFamily::Helvetica, 60.0, &mgr);
        assert!(lines.len() >= 2, "expected wrapping, got {lines:?}");
    }

    #[test]
    fn explicit_newlines_are_kept() {
        let mgr = FontManager::default();
        let lines = wrap_text("one\ntwo", 12.0, false, FontFamily::Helvetica, 500.0, &mgr);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn long_words_are_broken() {
        let mgr = FontManager::default();
        let lines = wrap_text("VC-0000000000000000", 12.0, false, FontFamily::Helvetica, 40.0, &mgr);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "VC-0000000000000000");
    }
}
