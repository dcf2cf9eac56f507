//! Template binding – fills the certificate and report HTML templates with
//! validated request data.
//!
//! Templates use Tera (Jinja2 syntax). Names end in `.html`, so every bound
//! value is HTML-escaped.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;
use tera::{Context, Tera};

use crate::error::TemplateError;
use crate::models::{CertificateRequest, ReportRequest};

/// The documents this service produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Certificate,
    Report,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Certificate, DocumentKind::Report];

    pub fn template_name(&self) -> &'static str {
        match self {
            DocumentKind::Certificate => "certificate.html",
            DocumentKind::Report => "report.html",
        }
    }

    /// `strftime` format of the `generation_date` variable.
    pub fn date_format(&self) -> &'static str {
        match self {
            DocumentKind::Certificate => "%d/%m/%Y",
            DocumentKind::Report => "%d/%m/%Y %H:%M",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Certificate => "certificate",
            DocumentKind::Report => "report",
        }
    }
}

/// Read-only set of compiled templates, loaded once at startup.
#[derive(Debug)]
pub struct TemplateStore {
    tera: Tera,
}

impl TemplateStore {
    /// Load every `*.html` file directly inside `dir`, registered under its
    /// file name. A missing directory or missing document template only
    /// logs a warning; requests for it fail later with `NotFound`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        let mut sources = Vec::new();

        if dir.is_dir() {
            let entries = fs::read_dir(dir).map_err(|e| TemplateError::Load {
                path: dir.to_path_buf(),
                message: e.to_string(),
            })?;
            for entry in entries {
                let path = entry
                    .map_err(|e| TemplateError::Load {
                        path: dir.to_path_buf(),
                        message: e.to_string(),
                    })?
                    .path();
                if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("html") {
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string)
                else {
                    continue;
                };
                let source = fs::read_to_string(&path).map_err(|e| TemplateError::Load {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                sources.push((name, source));
            }
        } else {
            log::warn!("template directory {} not found", dir.display());
        }

        let mut tera = Tera::default();
        tera.add_raw_templates(sources).map_err(|e| TemplateError::Load {
            path: dir.to_path_buf(),
            message: error_chain(&e),
        })?;

        let store = Self { tera };
        for kind in DocumentKind::ALL {
            if !store.has(kind.template_name()) {
                log::warn!(
                    "template {} missing from {}; {} requests will fail",
                    kind.template_name(),
                    dir.display(),
                    kind.label()
                );
            }
        }
        log::info!("loaded templates: {:?}", store.template_names());
        Ok(store)
    }

    /// Build a store from in-memory `(name, source)` pairs.
    pub fn from_raw(templates: &[(&str, &str)]) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates.iter().copied())
            .map_err(|e| TemplateError::Load {
                path: "<memory>".into(),
                message: error_chain(&e),
            })?;
        Ok(Self { tera })
    }

    pub fn has(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Registered template names, sorted.
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(str::to_string).collect();
        names.sort();
        names
    }

    pub fn bind_certificate(
        &self,
        request: &CertificateRequest,
        now: NaiveDateTime,
    ) -> Result<String, TemplateError> {
        self.bind(DocumentKind::Certificate, request, now)
    }

    pub fn bind_report(&self, request: &ReportRequest, now: NaiveDateTime) -> Result<String, TemplateError> {
        self.bind(DocumentKind::Report, request, now)
    }

    fn bind<T: Serialize>(
        &self,
        kind: DocumentKind,
        request: &T,
        now: NaiveDateTime,
    ) -> Result<String, TemplateError> {
        let name = kind.template_name();
        if !self.has(name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        let render_error = |e: tera::Error| TemplateError::Render {
            name: name.to_string(),
            message: error_chain(&e),
        };

        let mut context = Context::from_serialize(request).map_err(render_error)?;
        context.insert("generation_date", &now.format(kind.date_format()).to_string());
        self.tera.render(name, &context).map_err(render_error)
    }
}

/// Tera nests the useful detail in the error's source chain.
fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(e);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Activity, Enrollee};
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(14, 7, 0)
            .unwrap()
    }

    fn certificate() -> CertificateRequest {
        CertificateRequest {
            full_name: "Ana Ruiz".into(),
            school: "Lincoln HS".into(),
            campaign_name: "Reading Week".into(),
            hours: 12,
            verification_code: "VC-001".into(),
        }
    }

    #[test]
    fn binds_fields_and_date() {
        let store = TemplateStore::from_raw(&[(
            "certificate.html",
            "{{ full_name }}|{{ school }}|{{ hours }}|{{ generation_date }}",
        )])
        .unwrap();
        let html = store.bind_certificate(&certificate(), now()).unwrap();
        assert_eq!(html, "Ana Ruiz|Lincoln HS|12|05/03/2024");
    }

    #[test]
    fn report_date_includes_time() {
        let store = TemplateStore::from_raw(&[("report.html", "{{ generation_date }}")]).unwrap();
        let report = ReportRequest {
            event_title: "Spring Fair".into(),
            activities: vec![],
            enrollees: vec![],
        };
        assert_eq!(store.bind_report(&report, now()).unwrap(), "05/03/2024 14:07");
    }

    #[test]
    fn values_are_html_escaped() {
        let store = TemplateStore::from_raw(&[("certificate.html", "{{ full_name }}")]).unwrap();
        let mut req = certificate();
        req.full_name = "<b>O'Neil</b>".into();
        let html = store.bind_certificate(&req, now()).unwrap();
        assert!(!html.contains("<b>"));
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn attendance_membership() {
        let store = TemplateStore::from_raw(&[(
            "report.html",
            "{% for e in enrollees %}{% for a in activities %}{% if a.id in e.attended_activity_ids %}X{% else %}-{% endif %}{% endfor %}{% endfor %}",
        )])
        .unwrap();
        let report = ReportRequest {
            event_title: "Spring Fair".into(),
            activities: vec![
                Activity { id: 1, name: "Opening".into() },
                Activity { id: 2, name: "Workshop".into() },
            ],
            enrollees: vec![Enrollee {
                name: "Luis".into(),
                code: "E1".into(),
                attended_activity_ids: vec![2, 99],
            }],
        };
        assert_eq!(store.bind_report(&report, now()).unwrap(), "-X");
    }

    #[test]
    fn missing_template_is_not_found() {
        let store = TemplateStore::from_raw(&[]).unwrap();
        let err = store.bind_certificate(&certificate(), now()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(name) if name == "certificate.html"));
    }

    #[test]
    fn undefined_variable_is_a_render_error() {
        let store = TemplateStore::from_raw(&[("certificate.html", "{{ nickname }}")]).unwrap();
        let err = store.bind_certificate(&certificate(), now()).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn missing_directory_yields_empty_store() {
        let store = TemplateStore::from_dir("does/not/exist").unwrap();
        assert!(store.template_names().is_empty());
    }

    #[test]
    fn shipped_templates_load() {
        let store = TemplateStore::from_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/templates")).unwrap();
        assert_eq!(store.template_names(), vec!["certificate.html", "report.html"]);
    }
}
