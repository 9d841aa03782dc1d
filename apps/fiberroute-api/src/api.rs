//! API handlers for the fiberroute server
//!
//! Provides REST endpoints for:
//! - Document registration (base64 PDF upload)
//! - Annotated PDF export
//! - CSV/JSON measurement report export
//! - Cable configuration validation

use std::path::PathBuf;

use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::{extract::State, Json};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use cable_core::{CableType, TeatherSplice, TerminalConfig};
use overlay_core::ExportRequest;
use report_core::ReportRequest;
use shared_types::{GraphicalEntity, ViewportOverride};

use crate::error::ServerError;
use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "fiberroute-api",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Document registration request body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDocumentRequest {
    /// Original filename, for logging only
    pub filename: Option<String>,
    /// Base64-encoded PDF bytes
    pub data_base64: String,
}

/// Per-page size in PDF units
#[derive(Debug, Serialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Document registration response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDocumentResponse {
    pub success: bool,
    pub id: String,
    pub page_count: usize,
    pub page_sizes: Vec<PageSize>,
}

/// Handler: POST /api/documents
///
/// Decodes and validates the uploaded PDF, stores it under a fresh UUID in
/// the upload directory, and reports its page inventory.
pub async fn handle_register_document(
    State(state): State<AppState>,
    Json(req): Json<RegisterDocumentRequest>,
) -> Result<Json<RegisterDocumentResponse>, ServerError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&req.data_base64)
        .map_err(|e| ServerError::InvalidRequest(format!("invalid base64 payload: {e}")))?;

    let info = overlay_core::document_info(&bytes)
        .map_err(|e| ServerError::InvalidRequest(format!("not a readable PDF: {e}")))?;

    let id = Uuid::new_v4().to_string();
    let path = document_path(&state, &id);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|e| ServerError::Internal(format!("failed to store document: {e}")))?;

    info!(
        id = %id,
        filename = req.filename.as_deref().unwrap_or("<unnamed>"),
        pages = info.page_count,
        "document registered"
    );

    Ok(Json(RegisterDocumentResponse {
        success: true,
        id,
        page_count: info.page_count,
        page_sizes: info
            .page_sizes
            .into_iter()
            .map(|(width, height)| PageSize { width, height })
            .collect(),
    }))
}

/// Annotated PDF export request body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPdfRequest {
    pub document_id: String,
    #[serde(default)]
    pub entities: Vec<GraphicalEntity>,
    /// Overlay a single page; omit to overlay every page with entities
    pub target_page: Option<u32>,
    #[serde(default)]
    pub viewport: ViewportOverride,
}

/// Handler: POST /api/exports/pdf
///
/// The product guarantee is "the user always gets a PDF back": when the
/// renderer reports a document-level error the original stored bytes are
/// returned unmodified. Only a missing stored file is a hard failure.
pub async fn handle_export_pdf(
    State(state): State<AppState>,
    Json(req): Json<ExportPdfRequest>,
) -> Result<Response, ServerError> {
    // Ids are always UUIDs we minted; anything else never names a file.
    let id = Uuid::parse_str(&req.document_id)
        .map_err(|_| ServerError::InvalidRequest("document id is not a UUID".into()))?
        .to_string();

    let path = document_path(&state, &id);
    let source = tokio::fs::read(&path)
        .await
        .map_err(|_| ServerError::DocumentNotFound(id.clone()))?;

    info!(
        id = %id,
        entities = req.entities.len(),
        target_page = ?req.target_page,
        "annotated export requested"
    );

    let ExportPdfRequest {
        entities,
        target_page,
        viewport,
        ..
    } = req;

    let rendered = tokio::task::spawn_blocking(move || {
        let result = overlay_core::render(&ExportRequest {
            source: &source,
            entities: &entities,
            target_page,
            viewport,
        });
        (result, source)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("render task failed: {e}")))?;

    let bytes = match rendered {
        (Ok(bytes), _) => bytes,
        (Err(err), original) => {
            warn!(id = %id, error = %err, "render failed; returning original document");
            original
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{id}-annotated.pdf\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Report format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Csv,
    Json,
}

pub fn parse_report_format(format: &str) -> Result<ReportFormat, ServerError> {
    match format.to_lowercase().as_str() {
        "csv" => Ok(ReportFormat::Csv),
        "json" => Ok(ReportFormat::Json),
        other => Err(ServerError::InvalidRequest(format!(
            "Invalid format '{}'. Must be 'csv' or 'json'",
            other
        ))),
    }
}

/// Measurement report export request body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportReportRequest {
    #[serde(default = "default_report_format")]
    pub format: String,
    #[serde(flatten)]
    pub report: ReportRequest,
}

fn default_report_format() -> String {
    "csv".to_string()
}

/// Handler: POST /api/exports/report
pub async fn handle_export_report(
    Json(req): Json<ExportReportRequest>,
) -> Result<Response, ServerError> {
    let format = parse_report_format(&req.format)?;

    info!(
        project = %req.report.project_name,
        polylines = req.report.polylines.len(),
        format = ?format,
        "report export requested"
    );

    let (body, content_type, extension) = match format {
        ReportFormat::Csv => (
            report_core::generate_csv_report(&req.report),
            "text/csv",
            "csv",
        ),
        ReportFormat::Json => (
            report_core::generate_json_report(&req.report)?,
            "application/json",
            "json",
        ),
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!(
                    "attachment; filename=\"{}_report.{}\"",
                    req.report.project_name, extension
                ),
            ),
        ],
        body,
    )
        .into_response())
}

/// One cable's configuration in a validation request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CableConfigInput {
    pub id: i64,
    pub cable_type: CableType,
    /// Size the engineer picked, if any
    pub cable_size: Option<u32>,
    #[serde(default)]
    pub terminals: Vec<TerminalConfig>,
}

/// Cable validation request body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CableValidateRequest {
    #[serde(default)]
    pub cables: Vec<CableConfigInput>,
    #[serde(default)]
    pub teathers: Vec<TeatherSplice>,
}

/// Per-cable validation verdict
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CableReport {
    pub id: i64,
    pub total_count: u32,
    pub suggested_size: u32,
    /// None when the request carried no picked size
    pub size_valid: Option<bool>,
}

/// Cable validation response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CableValidateResponse {
    pub success: bool,
    pub teathers_acyclic: bool,
    pub cables: Vec<CableReport>,
}

/// Handler: POST /api/cable-config/validate
pub async fn handle_cable_validate(
    Json(req): Json<CableValidateRequest>,
) -> Json<CableValidateResponse> {
    let teathers_acyclic = cable_core::validate_no_circular_teathers(&req.teathers);

    let cables = req
        .cables
        .iter()
        .map(|cable| {
            let from: Vec<TeatherSplice> = req
                .teathers
                .iter()
                .filter(|t| t.cable_id == cable.id)
                .copied()
                .collect();
            let to: Vec<TeatherSplice> = req
                .teathers
                .iter()
                .filter(|t| t.target_cable_id == cable.id)
                .copied()
                .collect();

            let total_count = cable_core::cable_total_count(&cable.terminals, &from, &to);
            CableReport {
                id: cable.id,
                total_count,
                suggested_size: cable_core::suggest_cable_size(total_count, cable.cable_type),
                size_valid: cable
                    .cable_size
                    .map(|size| cable_core::validate_cable_type_size(cable.cable_type, size)),
            }
        })
        .collect();

    Json(CableValidateResponse {
        success: true,
        teathers_acyclic,
        cables,
    })
}

fn document_path(state: &AppState, id: &str) -> PathBuf {
    state.upload_dir.join(format!("{id}.pdf"))
}
