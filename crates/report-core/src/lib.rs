//! Measurement reports for fiber-route projects
//!
//! Converts drawn polylines into real-world footage via per-page scale
//! calibration, and renders the results as CSV or JSON reports.

pub mod error;
pub mod measure;
pub mod report;

pub use error::ReportError;
pub use measure::{parse_manual_scale, polyline_length_ft, two_point_scale};
pub use report::{
    generate_csv_report, generate_json_report, CalibrationMethod, PathMeasurement, ReportRequest,
    ScaleCalibration,
};
