mod common;

use axum::body::to_bytes;
use axum::http::{header, StatusCode};
use axum::response::Response;
use common::*;
use docgen_server::template::DOCX_MIME;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::ServiceExt;

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn header_value(response: &Response, name: header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .map(|v| v.to_str().unwrap().to_string())
        .unwrap_or_default()
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::new();
    let response = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"OK");
}

#[tokio::test]
async fn index_serves_upload_form() {
    let app = TestApp::new();
    let response = app.router.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(header_value(&response, header::CONTENT_TYPE).starts_with("text/html"));
    let html = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(html.contains("/generate"));
    assert!(html.contains("name=\"template\""));
}

#[tokio::test]
async fn download_template_returns_the_default_asset() {
    let app = TestApp::new();
    let response = app.router.oneshot(get("/download-template")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), DOCX_MIME);
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"template.docx\""
    );
    assert_eq!(body_bytes(response).await, default_template_bytes());
}

#[tokio::test]
async fn download_template_reports_missing_file() {
    let dir = empty_dir();
    let app = TestApp::with_template_dir(dir.path().to_path_buf());
    let response = app.router.oneshot(get("/download-template")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Template not found");
    assert!(body["details"][0].as_str().unwrap().ends_with("default-template.docx"));
}

#[tokio::test]
async fn generate_fills_the_default_template() {
    let app = TestApp::new();
    let request = Form::new()
        .text("name", "Jane Doe")
        .text("orderId", "ORD-1")
        .text("discount_percent", "10")
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), DOCX_MIME);
    assert_eq!(
        header_value(&response, header::CONTENT_DISPOSITION),
        "attachment; filename=\"generated.docx\""
    );

    let bytes = body_bytes(response).await;
    let document = read_part(&bytes, "word/document.xml");
    // 表头 + 5 条明细
    assert_eq!(document.matches("<w:tr>").count(), 6);
    assert!(document.contains("Client: Jane Doe"));
    assert!(document.contains("Order: ORD-1"));
    assert!(document.contains("Discount: 10% less 0.00"));
    assert!(!document.contains('{'), "unreplaced tags in {}", document);

    let footer = read_part(&bytes, "word/footer1.xml");
    assert!(footer.contains("Generated "));
    assert!(!footer.contains('{'));

    assert_eq!(part_names(&bytes), part_names(&default_template_bytes()));
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn empty_file_field_falls_back_to_default_template() {
    let app = TestApp::new();
    let request = Form::new()
        .text("name", "Jane Doe")
        .file("template", "", b"")
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let document = read_part(&body_bytes(response).await, "word/document.xml");
    assert!(document.contains("COST ESTIMATE"));
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn generate_uses_uploaded_template_and_removes_it() {
    let app = TestApp::new();
    let template = docx_with_body(&[
        paragraph("Hello {NAME}, order {order_id}"),
        paragraph("{footer}"),
        paragraph("VAT {vat_rate} / {VAT}"),
    ]
    .concat());
    let request = Form::new()
        .text("name", "Jane Doe")
        .text("orderId", "ORD-7")
        .text("footer", "Line one\nLine two")
        .text("vat_rate", "abc")
        .file("template", "quote.docx", &template)
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let document = read_part(&body_bytes(response).await, "word/document.xml");
    assert!(document.contains("Hello Jane Doe, order ORD-7"));
    assert!(document.contains("Line one</w:t><w:br/>"));
    assert!(document.contains("Line two"));
    assert!(document.contains("VAT 0 / 0.00"));
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn unparseable_upload_returns_compile_error_json() {
    let app = TestApp::new();
    let request = Form::new()
        .file("template", "broken.docx", b"this is not a zip archive")
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(header_value(&response, header::CONTENT_TYPE).starts_with("application/json"));
    let body = body_json(response).await;
    assert_eq!(body["error"], "Template compile error");
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0]["id"], "invalid_package");
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn compile_error_lists_every_issue() {
    let app = TestApp::new();
    let template = docx_with_body(&[paragraph("{name"), paragraph("total}")].concat());
    let request = Form::new()
        .file("template", "broken.docx", &template)
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    let ids: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["unclosed_tag", "unopened_tag"]);

    let template = docx_with_body(&[paragraph("{a}}"), paragraph("{}")].concat());
    let request = Form::new()
        .file("template", "broken.docx", &template)
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();
    let body = body_json(response).await;
    let ids: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["unopened_tag", "empty_tag"]);
    assert_eq!(body["details"][0]["part"], "word/document.xml");
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn render_error_returns_plain_text() {
    let app = TestApp::new();
    let template = docx_with_body(&paragraph("Rows: {table}"));
    let request = Form::new()
        .file("template", "list.docx", &template)
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(header_value(&response, header::CONTENT_TYPE).starts_with("text/plain"));
    let text = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(text.starts_with("Template error. Check placeholders."), "{}", text);
    assert!(text.contains("table"));
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn generate_without_default_template_is_not_found() {
    let dir = empty_dir();
    let app = TestApp::with_template_dir(dir.path().to_path_buf());
    let request = Form::new().text("name", "Jane").into_request("/generate");
    let response = app.router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn second_file_is_rejected() {
    let app = TestApp::new();
    let template = docx_with_body(&paragraph("{name}"));
    let request = Form::new()
        .file("template", "a.docx", &template)
        .file("template", "b.docx", &template)
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.upload_count(), 0);
}

fn amount_after(document: &str, label: &str) -> f64 {
    let start = document.find(label).unwrap_or_else(|| panic!("missing {label}")) + label.len();
    let end = start + document[start..].find('<').unwrap();
    document[start..end].trim().parse().unwrap()
}

#[tokio::test]
async fn default_discounts_and_vat_apply_without_form_values() {
    let app = TestApp::new();
    let request = Form::new()
        .text("name", "Jane Doe")
        .text("orderId", "ORD-2")
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let document = read_part(&body_bytes(response).await, "word/document.xml");
    assert!(document.contains("Discount: 0% less 0.00"), "{}", document);
    let subtotal = amount_after(&document, "Sub Total: ");
    let vat = amount_after(&document, "VAT: ");
    let total = amount_after(&document, "TOTAL: ");
    assert!(subtotal > 0.0);
    assert!((vat - subtotal * 0.12).abs() < 0.011, "vat {vat} for subtotal {subtotal}");
    assert!((total - (subtotal + vat)).abs() < 0.011);
}

#[tokio::test]
async fn slow_render_times_out() {
    let app = TestApp::with_config(|config| config.render.timeout_secs = 0);
    let request = Form::new()
        .text("name", "Jane Doe")
        .file("template", "large.docx", &inflating_document(50_000))
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("did not finish"));
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn truncated_multipart_is_a_bad_request() {
    let app = TestApp::new();
    let body = format!(
        "--{}\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\nJane",
        BOUNDARY
    );
    let response = app.router.clone().oneshot(raw_multipart(body.as_bytes())).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(header_value(&response, header::CONTENT_TYPE).starts_with("application/json"));
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().starts_with("invalid upload"));
    assert_eq!(app.upload_count(), 0);
}

#[tokio::test]
async fn oversized_package_is_a_compile_error() {
    let app = TestApp::with_config(|config| config.render.max_uncompressed_bytes = 64 * 1024);
    let request = Form::new()
        .file("template", "bomb.docx", &inflating_document(10_000))
        .into_request("/generate");
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Template compile error");
    assert_eq!(body["details"][0]["id"], "invalid_package");
    assert_eq!(app.upload_count(), 0);
}
