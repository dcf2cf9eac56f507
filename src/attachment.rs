//! PDF download responses.

use actix_web::http::header::{self, ContentDisposition, DispositionParam, DispositionType};
use actix_web::HttpResponse;

/// Longest title kept in a report filename, in characters.
const MAX_TITLE_CHARS: usize = 120;

pub const CERTIFICATE_FILENAME: &str = "certificate.pdf";

/// Wrap PDF bytes in a `200 OK` attachment response.
///
/// Non-ASCII filenames are sent as an RFC 5987 `filename*` parameter with
/// an ASCII `filename` fallback.
pub fn pdf_attachment(bytes: Vec<u8>, filename: &str) -> HttpResponse {
    let mut parameters = vec![DispositionParam::Filename(ascii_fallback(filename))];
    if !filename.is_ascii() {
        parameters.push(DispositionParam::FilenameExt(header::ExtendedValue {
            charset: header::Charset::Ext("UTF-8".to_string()),
            language_tag: None,
            value: filename.as_bytes().to_vec(),
        }));
    }
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters,
        })
        .body(bytes)
}

/// `report_<title>.pdf`, or `report.pdf` when nothing of the title survives
/// sanitizing.
pub fn report_filename(event_title: &str) -> String {
    let title = sanitize_filename(event_title);
    if title.is_empty() {
        "report.pdf".to_string()
    } else {
        format!("report_{title}.pdf")
    }
}

/// Make user text safe to use as a filename. Control characters and
/// `/ \ : * ? " < > |` become `_`; the result is trimmed and capped.
pub fn sanitize_filename(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    replaced.trim().chars().take(MAX_TITLE_CHARS).collect::<String>().trim_end().to_string()
}

fn ascii_fallback(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::MessageBody;

    fn disposition(resp: &HttpResponse) -> String {
        resp.headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn spaces_survive() {
        assert_eq!(report_filename("Spring Fair"), "report_Spring Fair.pdf");
    }

    #[test]
    fn separators_are_replaced() {
        assert_eq!(sanitize_filename("a/b\\c:d\"e"), "a_b_c_d_e");
        assert_eq!(sanitize_filename("line\nbreak"), "line_break");
        assert_eq!(sanitize_filename("  padded  "), "padded");
    }

    #[test]
    fn blank_title_falls_back() {
        assert_eq!(report_filename("   "), "report.pdf");
    }

    #[test]
    fn long_titles_are_capped() {
        let name = sanitize_filename(&"x".repeat(500));
        assert_eq!(name.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn response_headers() {
        let resp = pdf_attachment(b"%PDF-1.7".to_vec(), CERTIFICATE_FILENAME);
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/pdf"
        );
        assert_eq!(disposition(&resp), "attachment; filename=\"certificate.pdf\"");
        let body = resp.into_body().try_into_bytes().unwrap();
        assert_eq!(&body[..], b"%PDF-1.7");
    }

    #[test]
    fn non_ascii_names_get_extended_parameter() {
        let resp = pdf_attachment(Vec::new(), "report_Feria Años.pdf");
        let value = disposition(&resp);
        assert!(value.contains("filename=\"report_Feria A_os.pdf\""));
        assert!(value.contains("filename*=UTF-8''"));
    }
}
