//! CSV and JSON measurement reports

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared_types::Point;

use crate::error::ReportError;
use crate::measure::polyline_length_ft;

/// How a page's scale factor was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
    Manual,
    TwoPoint,
}

/// One page's scale calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleCalibration {
    pub page_number: u32,
    pub method: CalibrationMethod,
    /// Feet per PDF unit.
    pub scale_factor: f64,
    pub manual_scale_str: Option<String>,
    pub known_distance_ft: Option<f64>,
}

/// One measured path. `length_ft` may be precomputed by the caller; when
/// absent it is derived from the calibration of the path's page (0 when
/// the page has no calibration either).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathMeasurement {
    pub name: String,
    pub page_number: u32,
    #[serde(default)]
    pub points: Vec<Point>,
    pub length_ft: Option<f64>,
}

/// Everything a report needs; assembled by the caller, no storage here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    pub project_name: String,
    #[serde(default)]
    pub polylines: Vec<PathMeasurement>,
    #[serde(default)]
    pub scale_calibrations: Vec<ScaleCalibration>,
    /// Extra slack to add to the total, e.g. 0.05 for 5%.
    pub slack_factor: Option<f64>,
}

impl ReportRequest {
    fn resolved_length_ft(&self, path: &PathMeasurement) -> f64 {
        path.length_ft
            .or_else(|| {
                self.scale_calibrations
                    .iter()
                    .find(|c| c.page_number == path.page_number)
                    .map(|c| polyline_length_ft(&path.points, c.scale_factor))
            })
            .unwrap_or(0.0)
    }

    fn total_length_ft(&self) -> f64 {
        self.polylines
            .iter()
            .map(|p| self.resolved_length_ft(p))
            .sum()
    }
}

/// Render the measurement report as CSV.
pub fn generate_csv_report(request: &ReportRequest) -> String {
    let mut out = String::new();

    csv_row(&mut out, &["Fiber Route Measurement Report"]);
    csv_row(&mut out, &[]);
    csv_row(&mut out, &["Project Name", &request.project_name]);
    csv_row(
        &mut out,
        &[
            "Report Date",
            &Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
    );
    csv_row(&mut out, &[]);

    csv_row(&mut out, &["Scale Calibration Information"]);
    csv_row(&mut out, &["Page", "Method", "Scale Factor", "Details"]);
    for calibration in &request.scale_calibrations {
        let (method, details) = match calibration.method {
            CalibrationMethod::Manual => (
                "manual",
                calibration.manual_scale_str.clone().unwrap_or_default(),
            ),
            CalibrationMethod::TwoPoint => (
                "two_point",
                format!(
                    "Two-point calibration: {} ft",
                    calibration.known_distance_ft.unwrap_or(0.0)
                ),
            ),
        };
        csv_row(
            &mut out,
            &[
                &calibration.page_number.to_string(),
                method,
                &format!("{:.6}", calibration.scale_factor),
                &details,
            ],
        );
    }
    csv_row(&mut out, &[]);

    csv_row(&mut out, &["Path Measurements"]);
    csv_row(&mut out, &["Page", "Path Name", "Segments", "Length (ft)"]);
    for path in &request.polylines {
        let segments = path.points.len().saturating_sub(1);
        csv_row(
            &mut out,
            &[
                &path.page_number.to_string(),
                &path.name,
                &segments.to_string(),
                &format!("{:.2}", request.resolved_length_ft(path)),
            ],
        );
    }
    csv_row(&mut out, &[]);

    let total = request.total_length_ft();
    csv_row(&mut out, &["Summary"]);
    csv_row(&mut out, &["Total Fiber Length", &format!("{total:.2} ft")]);
    csv_row(
        &mut out,
        &["Number of Paths", &request.polylines.len().to_string()],
    );
    if let Some(slack) = request.slack_factor {
        let adjusted = total * (1.0 + slack);
        csv_row(
            &mut out,
            &[
                &format!("Slack Factor (+{}%)", slack * 100.0),
                &format!("{adjusted:.2} ft"),
            ],
        );
    }

    out
}

/// Quote a field when it contains a comma, quote, or newline.
fn csv_row(out: &mut String, fields: &[&str]) {
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        if field.contains([',', '"', '\n']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push_str("\r\n");
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    project_name: &'a str,
    generated_at: String,
    scale_calibrations: &'a [ScaleCalibration],
    polylines: Vec<JsonPolyline<'a>>,
    summary: JsonSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonPolyline<'a> {
    name: &'a str,
    page_number: u32,
    point_count: usize,
    length_ft: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSummary {
    total_length_ft: f64,
    polyline_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    slack_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    adjusted_length_ft: Option<f64>,
}

/// Render the measurement report as pretty-printed JSON.
pub fn generate_json_report(request: &ReportRequest) -> Result<String, ReportError> {
    let total = request.total_length_ft();
    let report = JsonReport {
        project_name: &request.project_name,
        generated_at: Utc::now().to_rfc3339(),
        scale_calibrations: &request.scale_calibrations,
        polylines: request
            .polylines
            .iter()
            .map(|p| JsonPolyline {
                name: &p.name,
                page_number: p.page_number,
                point_count: p.points.len(),
                length_ft: request.resolved_length_ft(p),
            })
            .collect(),
        summary: JsonSummary {
            total_length_ft: total,
            polyline_count: request.polylines.len(),
            slack_factor: request.slack_factor,
            adjusted_length_ft: request.slack_factor.map(|s| total * (1.0 + s)),
        },
    };

    serde_json::to_string_pretty(&report).map_err(|e| ReportError::Serialization(e.to_string()))
}
