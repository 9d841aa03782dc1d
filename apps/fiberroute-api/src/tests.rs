//! Handler-level tests for the fiberroute API
//!
//! These call the axum handlers directly with constructed requests and a
//! throwaway upload directory, covering the degraded-result contract of
//! the PDF export as well as the report and cable-config endpoints.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::Json;
use base64::Engine;
use lopdf::{Dictionary, Document, Object, Stream};
use pretty_assertions::assert_eq;
use uuid::Uuid;

use shared_types::{GraphicalEntity, Point, Route, RouteKind, ViewportOverride};

use crate::api::{
    handle_cable_validate, handle_export_pdf, handle_export_report, handle_health,
    handle_register_document, parse_report_format, CableConfigInput, CableValidateRequest,
    ExportPdfRequest, ExportReportRequest, RegisterDocumentRequest, ReportFormat,
};
use crate::error::ServerError;
use crate::AppState;

fn test_state() -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    (
        AppState {
            upload_dir: dir.path().to_path_buf(),
        },
        dir,
    )
}

/// Minimal one-page letter-sized PDF.
fn test_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let catalog_id = doc.new_object_id();
    let page_id = doc.new_object_id();
    let content_id = doc.new_object_id();

    doc.objects.insert(
        content_id,
        Object::Stream(Stream::new(
            Dictionary::new(),
            b"BT /F1 12 Tf 50 700 Td (Plat) Tj ET".to_vec(),
        )),
    );

    let mut page_dict = Dictionary::new();
    page_dict.set("Type", Object::Name(b"Page".to_vec()));
    page_dict.set("Parent", Object::Reference(pages_id));
    page_dict.set("Contents", Object::Reference(content_id));
    page_dict.set(
        "MediaBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ]),
    );
    doc.objects.insert(page_id, Object::Dictionary(page_dict));

    let mut pages_dict = Dictionary::new();
    pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
    pages_dict.set("Count", Object::Integer(1));
    pages_dict.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let mut catalog_dict = Dictionary::new();
    catalog_dict.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog_dict.set("Pages", Object::Reference(pages_id));
    doc.objects
        .insert(catalog_id, Object::Dictionary(catalog_dict));

    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

fn fiber_route(page: u32) -> GraphicalEntity {
    GraphicalEntity::Route(Route {
        page_number: page,
        kind: RouteKind::Fiber,
        points: vec![Point::new(10.0, 10.0), Point::new(200.0, 150.0)],
    })
}

#[tokio::test]
async fn test_health_endpoint() {
    let response = handle_health().await;
    assert_eq!(response.status, "healthy");
    assert_eq!(response.service, "fiberroute-api");
}

#[tokio::test]
async fn test_register_then_export_roundtrip() {
    let (state, _dir) = test_state();

    let registered = handle_register_document(
        State(state.clone()),
        Json(RegisterDocumentRequest {
            filename: Some("plat.pdf".into()),
            data_base64: encode(&test_pdf()),
        }),
    )
    .await
    .unwrap();

    assert!(registered.success);
    assert_eq!(registered.page_count, 1);
    assert_eq!(registered.page_sizes[0].width, 612.0);
    assert_eq!(registered.page_sizes[0].height, 792.0);

    let response = handle_export_pdf(
        State(state),
        Json(ExportPdfRequest {
            document_id: registered.id.clone(),
            entities: vec![fiber_route(1)],
            target_page: None,
            viewport: ViewportOverride::default(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );

    // The exported bytes are a valid single-page PDF again.
    let bytes = body_bytes(response).await;
    let doc = Document::load_mem(&bytes).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[tokio::test]
async fn test_register_rejects_garbage() {
    let (state, _dir) = test_state();

    let err = handle_register_document(
        State(state),
        Json(RegisterDocumentRequest {
            filename: None,
            data_base64: encode(b"this is not a pdf"),
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServerError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_export_unknown_document_is_not_found() {
    let (state, _dir) = test_state();

    let err = handle_export_pdf(
        State(state),
        Json(ExportPdfRequest {
            document_id: Uuid::new_v4().to_string(),
            entities: vec![],
            target_page: None,
            viewport: ViewportOverride::default(),
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServerError::DocumentNotFound(_)));
}

#[tokio::test]
async fn test_export_rejects_non_uuid_ids() {
    let (state, _dir) = test_state();

    let err = handle_export_pdf(
        State(state),
        Json(ExportPdfRequest {
            document_id: "../../../etc/passwd".into(),
            entities: vec![],
            target_page: None,
            viewport: ViewportOverride::default(),
        }),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ServerError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_render_failure_returns_original_bytes() {
    let (state, _dir) = test_state();

    // A stored file the renderer cannot open: the export still answers
    // with the original bytes rather than failing the request.
    let id = Uuid::new_v4().to_string();
    let garbage = b"corrupted after upload".to_vec();
    std::fs::write(state.upload_dir.join(format!("{id}.pdf")), &garbage).unwrap();

    let response = handle_export_pdf(
        State(state),
        Json(ExportPdfRequest {
            document_id: id,
            entities: vec![fiber_route(1)],
            target_page: None,
            viewport: ViewportOverride::default(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, garbage);
}

fn report_request(format: &str) -> ExportReportRequest {
    ExportReportRequest {
        format: format.into(),
        report: report_core::ReportRequest {
            project_name: "Maple Grove".into(),
            polylines: vec![report_core::PathMeasurement {
                name: "Trunk".into(),
                page_number: 1,
                points: vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)],
                length_ft: Some(250.0),
            }],
            scale_calibrations: vec![],
            slack_factor: None,
        },
    }
}

#[tokio::test]
async fn test_report_export_csv() {
    let response = handle_export_report(Json(report_request("csv"))).await.unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(body.contains("Fiber Route Measurement Report"));
    assert!(body.contains("Total Fiber Length,250.00 ft"));
}

#[tokio::test]
async fn test_report_export_json() {
    let response = handle_export_report(Json(report_request("json"))).await.unwrap();
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );

    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body["projectName"], "Maple Grove");
    assert_eq!(body["summary"]["totalLengthFt"], 250.0);
}

#[tokio::test]
async fn test_report_export_rejects_unknown_format() {
    let err = handle_export_report(Json(report_request("xml"))).await.unwrap_err();
    assert!(matches!(err, ServerError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_cable_validation_reports_totals_and_cycles() {
    let response = handle_cable_validate(Json(CableValidateRequest {
        cables: vec![CableConfigInput {
            id: 1,
            cable_type: cable_core::CableType::Fnap,
            cable_size: Some(24),
            terminals: vec![cable_core::TerminalConfig {
                actual_size: Some(8),
                suggested_size: None,
            }],
        }],
        teathers: vec![cable_core::TeatherSplice {
            cable_id: 1,
            target_cable_id: 1,
            divert_count: 12,
        }],
    }))
    .await;

    // Self-referencing teather: cycle flagged, totals still computed.
    assert!(!response.teathers_acyclic);
    let cable = &response.cables[0];
    assert_eq!(cable.total_count, 8 + 12 + 12);
    assert_eq!(cable.suggested_size, 48);
    assert_eq!(cable.size_valid, Some(true));
}

mod format_proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: format parsing is case-insensitive for the two known
        /// formats and rejects everything else.
        #[test]
        fn format_parsing_is_total(input in "[a-zA-Z]{0,10}") {
            match input.to_lowercase().as_str() {
                "csv" => prop_assert_eq!(parse_report_format(&input).unwrap(), ReportFormat::Csv),
                "json" => prop_assert_eq!(parse_report_format(&input).unwrap(), ReportFormat::Json),
                _ => prop_assert!(parse_report_format(&input).is_err()),
            }
        }
    }
}
