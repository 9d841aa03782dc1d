use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("calibration points must be different")]
    CoincidentCalibrationPoints,

    #[error("could not parse scale string: {0}")]
    InvalidScaleString(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
