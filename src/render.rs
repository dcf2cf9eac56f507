//! PDF renderer – takes a [`LayoutConfig`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API) and the built-in base-14 fonts.

use printpdf::*;

use crate::fonts::FontFamily;
use crate::layout_config::*;

/// Render a LayoutConfig into PDF bytes.
pub fn render_pdf(config: &LayoutConfig) -> Vec<u8> {
    let page_w = Mm(config.page_width_pt * 0.352778); // pt → mm
    let page_h = Mm(config.page_height_pt * 0.352778);

    let mut doc = PdfDocument::new(&config.title);

    let mut pages: Vec<PdfPage> = config
        .pages
        .iter()
        .map(|page_layout| {
            let mut ops = Vec::new();
            for lbox in &page_layout.boxes {
                render_box(&mut ops, lbox, config.page_height_pt);
            }
            PdfPage::new(page_w, page_h, ops)
        })
        .collect();

    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    doc.save(&PdfSaveOptions::default(), &mut Vec::new())
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF). Characters with no
/// WinAnsi glyph are printed as `?` and logged.
fn to_winlatin(s: &str) -> String {
    let mut replaced = 0usize;
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| {
            winansi_byte(c).unwrap_or_else(|| {
                replaced += 1;
                b'?'
            })
        })
        .collect();
    if replaced > 0 {
        log::warn!("{replaced} character(s) in {s:?} have no glyph in the built-in fonts");
    }
    // SAFETY: intentionally non-UTF-8 for 0x80-0xFF; printpdf passes these
    // bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn winansi_byte(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{2122}' => 0x99,
        '\u{00A0}' => 0x20,
        // C1 controls occupy these slots in Latin-1 but not in WinAnsi.
        '\u{0080}'..='\u{009F}' => return None,
        c if (c as u32) < 256 => c as u8,
        _ => return None,
    };
    Some(byte)
}

fn builtin_font(family: FontFamily, bold: bool, italic: bool) -> BuiltinFont {
    match (family, bold, italic) {
        (FontFamily::Helvetica, false, false) => BuiltinFont::Helvetica,
        (FontFamily::Helvetica, true, false) => BuiltinFont::HelveticaBold,
        (FontFamily::Helvetica, false, true) => BuiltinFont::HelveticaOblique,
        (FontFamily::Helvetica, true, true) => BuiltinFont::HelveticaBoldOblique,
        (FontFamily::Times, false, false) => BuiltinFont::TimesRoman,
        (FontFamily::Times, true, false) => BuiltinFont::TimesBold,
        (FontFamily::Times, false, true) => BuiltinFont::TimesItalic,
        (FontFamily::Times, true, true) => BuiltinFont::TimesBoldItalic,
        (FontFamily::Courier, false, false) => BuiltinFont::Courier,
        (FontFamily::Courier, true, false) => BuiltinFont::CourierBold,
        (FontFamily::Courier, false, true) => BuiltinFont::CourierOblique,
        (FontFamily::Courier, true, true) => BuiltinFont::CourierBoldOblique,
    }
}

fn rgb(c: [f32; 4]) -> Color {
    Color::Rgb(Rgb {
        r: c[0],
        g: c[1],
        b: c[2],
        icc_profile: None,
    })
}

fn point(x: f32, y: f32) -> LinePoint {
    LinePoint {
        p: Point { x: Pt(x), y: Pt(y) },
        bezier: false,
    }
}

fn stroke(ops: &mut Vec<Op>, color: [f32; 4], width: f32, from: (f32, f32), to: (f32, f32)) {
    ops.push(Op::SetOutlineColor { col: rgb(color) });
    ops.push(Op::SetOutlineThickness { pt: Pt(width) });
    ops.push(Op::DrawLine {
        line: Line {
            points: vec![point(from.0, from.1), point(to.0, to.1)],
            is_closed: false,
        },
    });
}

/// Recursively render a LayoutBox and its children into PDF ops.
fn render_box(ops: &mut Vec<Op>, lbox: &LayoutBox, page_height: f32) {
    // PDF origin is bottom-left; layout origin is top-left.
    let top = page_height - lbox.y;
    let bottom = top - lbox.height;
    let left = lbox.x;
    let right = lbox.x + lbox.width;

    if let Some(bg) = lbox.background_color {
        ops.push(Op::SetFillColor { col: rgb(bg) });
        ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: vec![
                        point(left, bottom),
                        point(right, bottom),
                        point(right, top),
                        point(left, top),
                    ],
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    // Each side is stroked along the middle of its border band.
    if let Some(border) = &lbox.border {
        let [t, r, b, l] = border.widths;
        if t > 0.0 {
            let y = top - t / 2.0;
            stroke(ops, border.color, t, (left, y), (right, y));
        }
        if r > 0.0 {
            let x = right - r / 2.0;
            stroke(ops, border.color, r, (x, top), (x, bottom));
        }
        if b > 0.0 {
            let y = bottom + b / 2.0;
            stroke(ops, border.color, b, (left, y), (right, y));
        }
        if l > 0.0 {
            let x = left + l / 2.0;
            stroke(ops, border.color, l, (x, top), (x, bottom));
        }
    }

    if let Some(text) = &lbox.text {
        let font = builtin_font(text.font_family, text.bold, text.italic);

        for tline in &text.lines {
            if tline.text.is_empty() {
                continue;
            }
            let text_x = left + tline.x_offset;
            let baseline = top - tline.y_offset;

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(text_x),
                    y: Pt(baseline),
                },
            });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(text.font_size),
                font,
            });
            ops.push(Op::SetLineHeight {
                lh: Pt(text.line_height),
            });
            ops.push(Op::SetFillColor {
                col: rgb(text.color),
            });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(to_winlatin(&tline.text))],
                font,
            });
            ops.push(Op::EndTextSection);

            if text.underline {
                let y = baseline - text.font_size * 0.1;
                stroke(ops, text.color, 0.5, (text_x, y), (text_x + tline.width, y));
            }
        }
    }

    for child in &lbox.children {
        render_box(ops, child, page_height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_empty_page() {
        let bytes = render_pdf(&LayoutConfig::a4());
        assert!(bytes.len() > 100, "PDF should have content");
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn winlatin_maps_accents_and_typography() {
        assert_eq!(to_winlatin("Jose").as_bytes(), b"Jose");
        assert_eq!(to_winlatin("\u{e9}\u{2022}").as_bytes(), &[0xE9, 0x95]);
        assert_eq!(to_winlatin("\u{4e2d}").as_bytes(), b"?");
    }

    #[test]
    fn characters_outside_winansi_become_question_marks() {
        assert_eq!(winansi_byte('\u{141}'), None);
        assert_eq!(winansi_byte('\u{f3}'), Some(0xF3));
        assert_eq!(
            to_winlatin("\u{141}\u{f3}d\u{17a} \u{1F600}").as_bytes(),
            b"?\xF3d? ?"
        );
    }

    #[test]
    fn render_styled_box() {
        let mut config = LayoutConfig::new(841.89, 595.28);
        let mut b = LayoutBox::new(40.0, 40.0, 300.0, 30.0);
        b.background_color = Some([0.9, 0.9, 0.9, 1.0]);
        b.border = Some(BorderStyle {
            widths: [1.0, 1.0, 1.0, 1.0],
            color: [0.1, 0.2, 0.5, 1.0],
        });
        b.text = Some(TextContent {
            lines: vec![TextLine {
                text: "Certificate".into(),
                x_offset: 4.0,
                y_offset: 14.0,
                width: 60.0,
            }],
            font_family: FontFamily::Times,
            font_size: 14.0,
            bold: true,
            italic: false,
            color: [0.0, 0.0, 0.0, 1.0],
            line_height: 18.0,
            text_align: crate::style::TextAlign::Left,
            underline: true,
        });
        config.pages.push(PageLayout {
            page_index: 0,
            boxes: vec![b],
        });
        let bytes = render_pdf(&config);
        assert_eq!(&bytes[0..5], b"%PDF-");
    }
}
