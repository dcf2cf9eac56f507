//! HTTP endpoints.
//!
//! Each document request runs the same four stages: validate the body, bind
//! it to its template, render the HTML to PDF, and stream the bytes back as
//! an attachment. Rendering runs on the blocking thread pool.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Local;
use serde_json::json;

use crate::attachment::{pdf_attachment, report_filename, CERTIFICATE_FILENAME};
use crate::error::{RenderError, ServiceError};
use crate::models::{CertificateRequest, ReportRequest};
use crate::pipeline::PdfRenderer;
use crate::templates::{DocumentKind, TemplateStore};
use crate::validate::parse_body;

/// Shared, read-only state built once at startup.
pub struct AppState {
    pub templates: TemplateStore,
    pub renderer: Arc<dyn PdfRenderer>,
}

impl AppState {
    pub fn new(templates: TemplateStore, renderer: Arc<dyn PdfRenderer>) -> Self {
        Self {
            templates,
            renderer,
        }
    }
}

/// Register every route on an actix `App` or scope.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/generate-certificate", web::post().to(generate_certificate))
        .route("/generate-report", web::post().to(generate_report))
        .route("/health", web::get().to(health));
}

async fn generate_certificate(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let request: CertificateRequest = parse_body(&body)?;
    let html = state
        .templates
        .bind_certificate(&request, Local::now().naive_local())?;
    let pdf = render(&state, DocumentKind::Certificate, html).await?;
    Ok(pdf_attachment(pdf, CERTIFICATE_FILENAME))
}

async fn generate_report(
    state: web::Data<AppState>,
    body: web::Bytes,
) -> Result<HttpResponse, ServiceError> {
    let request: ReportRequest = parse_body(&body)?;
    let html = state
        .templates
        .bind_report(&request, Local::now().naive_local())?;
    let pdf = render(&state, DocumentKind::Report, html).await?;
    Ok(pdf_attachment(pdf, &report_filename(&request.event_title)))
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "templates": state.templates.template_names(),
    }))
}

async fn render(
    state: &web::Data<AppState>,
    kind: DocumentKind,
    html: String,
) -> Result<Vec<u8>, RenderError> {
    let renderer = Arc::clone(&state.renderer);
    let bytes = web::block(move || renderer.render(&html, kind.label()))
        .await
        .map_err(|e| RenderError::Blocking(e.to_string()))??;
    log::info!("rendered {} ({} bytes)", kind.label(), bytes.len());
    Ok(bytes)
}
