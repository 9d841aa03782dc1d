//! Annotation overlay renderer for site-plan PDFs
//!
//! Takes a source PDF plus the graphical entities a field engineer drew in
//! the viewer (fiber/conduit routes, terminal and drop markers, conduit
//! runs, assignment arrows) and produces an annotated copy. Overlays are
//! appended to each page as an extra content layer; the original page
//! content is never touched.
//!
//! The pipeline per export: [`document::render`] walks the pages,
//! [`compositor::compose_page`] draws one page's entities back-to-front,
//! and every coordinate passes through [`transform::PageFrame`] exactly
//! once on its way from viewer space to PDF content space.

pub mod canvas;
pub mod compositor;
pub mod document;
pub mod error;
pub mod labels;
pub mod path;
pub mod transform;

pub use compositor::{compose_page, PageGeometry, PageOverlay};
pub use document::{document_info, render, DocumentInfo, ExportRequest};
pub use error::{CompositeError, RenderError};
pub use path::point_at_fraction;
pub use transform::{PageFrame, Rotation};
