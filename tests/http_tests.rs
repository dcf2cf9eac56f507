//! End-to-end tests for the HTTP endpoints.

use std::sync::Arc;

use actix_web::dev::ServiceResponse;
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use serde_json::{json, Value};

use cert_forge::error::RenderError;
use cert_forge::{configure_routes, AppState, ForgeRenderer, PdfRenderer, TemplateStore};

fn shipped_templates() -> TemplateStore {
    TemplateStore::from_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/templates")).unwrap()
}

fn state(renderer: Arc<dyn PdfRenderer>) -> web::Data<AppState> {
    web::Data::new(AppState::new(shipped_templates(), renderer))
}

fn certificate_body() -> Value {
    json!({
        "full_name": "Ana Ruiz",
        "school": "Lincoln HS",
        "campaign_name": "Reading Week",
        "hours": 12,
        "verification_code": "VC-001"
    })
}

fn disposition<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

struct FailingRenderer;

impl PdfRenderer for FailingRenderer {
    fn render(&self, _html: &str, _title: &str) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Layout("no room for /srv/secret".into()))
    }
}

#[actix_web::test]
async fn certificate_is_returned_as_pdf_attachment() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(ForgeRenderer::default())))
            .configure(configure_routes),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/generate-certificate")
        .set_json(certificate_body())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert_eq!(disposition(&resp), "attachment; filename=\"certificate.pdf\"");
    let body = test::read_body(resp).await;
    assert_eq!(&body[0..5], b"%PDF-");
    let text = pdf_extract::extract_text_from_mem(&body).unwrap();
    for expected in ["Ana Ruiz", "Lincoln HS", "12"] {
        assert!(text.contains(expected), "missing {expected:?} in {text:?}");
    }
}

#[actix_web::test]
async fn report_filename_uses_event_title() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(ForgeRenderer::default())))
            .configure(configure_routes),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/generate-report")
        .set_json(json!({
            "event_title": "Spring Fair",
            "activities": [{"id": 1, "name": "Opening"}, {"id": 2, "name": "Workshop"}],
            "enrollees": [
                {"name": "Luis", "code": "E1", "attended_activity_ids": [1]},
                {"name": "Marta", "code": "E2", "attended_activity_ids": [1, 2, 99]}
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        disposition(&resp),
        "attachment; filename=\"report_Spring Fair.pdf\""
    );
    let body = test::read_body(resp).await;
    assert_eq!(&body[0..5], b"%PDF-");
}

#[actix_web::test]
async fn missing_field_is_unprocessable() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(ForgeRenderer::default())))
            .configure(configure_routes),
    )
    .await;
    let mut body = certificate_body();
    body.as_object_mut().unwrap().remove("hours");
    let req = test::TestRequest::post()
        .uri("/generate-certificate")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["detail"],
        json!([{"loc": ["body", "hours"], "msg": "Field required", "type": "missing"}])
    );
}

#[actix_web::test]
async fn malformed_json_is_unprocessable() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(ForgeRenderer::default())))
            .configure(configure_routes),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/generate-report")
        .insert_header(header::ContentType::json())
        .set_payload("{\"event_title\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"][0]["type"], "json_invalid");
}

#[actix_web::test]
async fn render_failure_hides_internals() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(FailingRenderer)))
            .configure(configure_routes),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/generate-certificate")
        .set_json(certificate_body())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"detail": "failed to render PDF document"}));
}

#[actix_web::test]
async fn missing_template_is_a_server_error() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(
                TemplateStore::from_raw(&[]).unwrap(),
                Arc::new(ForgeRenderer::default()),
            )))
            .configure(configure_routes),
    )
    .await;
    let req = test::TestRequest::post()
        .uri("/generate-certificate")
        .set_json(certificate_body())
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!({"detail": "document template unavailable"}));
}

#[actix_web::test]
async fn health_lists_templates() {
    let app = test::init_service(
        App::new()
            .app_data(state(Arc::new(ForgeRenderer::default())))
            .configure(configure_routes),
    )
    .await;
    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body,
        json!({"status": "ok", "templates": ["certificate.html", "report.html"]})
    );
}
