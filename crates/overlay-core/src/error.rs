use thiserror::Error;

/// Document-level failures. These are the only errors an export surfaces;
/// everything page-scoped degrades to "emit the original page".
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("source document unreadable: {0}")]
    SourceUnreadable(String),

    #[error("failed to assemble output document: {0}")]
    OutputAssembly(String),
}

/// Per-page overlay failures, returned by the compositor and merge step
/// and absorbed by the orchestrator.
#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("entity carries a non-finite coordinate")]
    NonFiniteCoordinate,

    #[error("page geometry unreadable: {0}")]
    Geometry(String),

    #[error("overlay content stream could not be encoded: {0}")]
    ContentEncoding(String),

    #[error("page dictionary rejected the overlay: {0}")]
    PageMerge(String),
}
