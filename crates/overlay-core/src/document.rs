//! Page merge orchestrator
//!
//! Walks every page of the source document, invokes the compositor for
//! pages that have entities, and appends each overlay as an extra content
//! layer. A page that fails to compose or merge is emitted with its
//! original content only; only "cannot open the source" and "cannot
//! reassemble the output" abort an export.

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use shared_types::{GraphicalEntity, ViewportOverride};
use tracing::{debug, warn};

use crate::canvas::FONT_RESOURCE;
use crate::compositor::{self, PageGeometry, PageOverlay};
use crate::error::{CompositeError, RenderError};
use crate::transform::Rotation;

/// One export request: a source document plus everything to stamp on it.
///
/// `target_page = None` overlays every page that has matching entities;
/// otherwise only the named page is overlaid and the rest pass through.
#[derive(Debug, Clone)]
pub struct ExportRequest<'a> {
    pub source: &'a [u8],
    pub entities: &'a [GraphicalEntity],
    pub target_page: Option<u32>,
    pub viewport: ViewportOverride,
}

/// Render an annotated copy of the source document.
///
/// The output has the same page count as the input; each page is either
/// untouched or carries an appended overlay layer.
pub fn render(request: &ExportRequest<'_>) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::load_mem(request.source)
        .map_err(|e| RenderError::SourceUnreadable(e.to_string()))?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(RenderError::SourceUnreadable(
            "document has no pages".into(),
        ));
    }

    // The label font is shared by every overlaid page; created lazily the
    // first time a page actually draws text.
    let mut font_id: Option<ObjectId> = None;

    for (&page_number, &page_id) in &pages {
        if request.target_page.is_some_and(|target| target != page_number) {
            continue;
        }

        let page_entities: Vec<GraphicalEntity> = request
            .entities
            .iter()
            .filter(|e| e.page_number() == page_number)
            .cloned()
            .collect();
        if page_entities.is_empty() {
            continue;
        }

        match overlay_page(&mut doc, page_id, &page_entities, &request.viewport, &mut font_id) {
            Ok(()) => debug!(
                page = page_number,
                entities = page_entities.len(),
                "overlay merged"
            ),
            // Per-page isolation: one bad page never fails the export.
            Err(err) => warn!(
                page = page_number,
                error = %err,
                "page overlay failed; emitting original page"
            ),
        }
    }

    doc.compress();
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| RenderError::OutputAssembly(e.to_string()))?;
    Ok(buffer)
}

/// Summary of a source document, used by upload validation: page count
/// plus the unrotated media-box size of every page whose geometry
/// resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub page_sizes: Vec<(f64, f64)>,
}

/// Parse a document far enough to report its page inventory.
pub fn document_info(source: &[u8]) -> Result<DocumentInfo, RenderError> {
    let doc = Document::load_mem(source).map_err(|e| RenderError::SourceUnreadable(e.to_string()))?;

    let pages = doc.get_pages();
    if pages.is_empty() {
        return Err(RenderError::SourceUnreadable(
            "document has no pages".into(),
        ));
    }

    let page_sizes = pages
        .values()
        .filter_map(|&page_id| page_geometry(&doc, page_id).ok())
        .map(|g| (g.media_width, g.media_height))
        .collect();

    Ok(DocumentInfo {
        page_count: pages.len(),
        page_sizes,
    })
}

fn overlay_page(
    doc: &mut Document,
    page_id: ObjectId,
    entities: &[GraphicalEntity],
    viewport: &ViewportOverride,
    font_id: &mut Option<ObjectId>,
) -> Result<(), CompositeError> {
    let geometry = page_geometry(doc, page_id)?;
    let overlay = compositor::compose_page(&geometry, viewport, entities)?;
    merge_overlay(doc, page_id, overlay, font_id)
}

/// Resolve a page's media box and rotation, walking the page-tree parent
/// chain for inheritable attributes.
fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry, CompositeError> {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")
        .ok_or_else(|| CompositeError::Geometry("page has no media box".into()))?;
    let corners = media_box
        .as_array()
        .map_err(|_| CompositeError::Geometry("media box is not an array".into()))?;
    if corners.len() != 4 {
        return Err(CompositeError::Geometry(
            "media box is not a 4-element array".into(),
        ));
    }
    let nums: Vec<f64> = corners
        .iter()
        .map(object_to_f64)
        .collect::<Option<_>>()
        .ok_or_else(|| CompositeError::Geometry("media box has non-numeric corners".into()))?;

    let rotation = inherited_attribute(doc, page_id, b"Rotate")
        .and_then(|obj| obj.as_i64().ok())
        .map(Rotation::from_degrees)
        .unwrap_or_default();

    Ok(PageGeometry {
        media_width: nums[2] - nums[0],
        media_height: nums[3] - nums[1],
        rotation,
    })
}

fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let dict = doc.get_object(id).and_then(|obj| obj.as_dict()).ok()?;
        if let Ok(value) = dict.get(key) {
            let resolved = match value {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            return Some(resolved.clone());
        }
        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    None
}

fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

/// Append the overlay content stream to the page and register the label
/// font in its resources when referenced.
fn merge_overlay(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: PageOverlay,
    font_id: &mut Option<ObjectId>,
) -> Result<(), CompositeError> {
    if overlay.uses_text {
        let id = match *font_id {
            Some(id) => id,
            None => {
                let id = doc.add_object(Object::Dictionary(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type1",
                    "BaseFont" => "Helvetica-Bold",
                    "Encoding" => "WinAnsiEncoding",
                }));
                *font_id = Some(id);
                id
            }
        };
        ensure_page_font(doc, page_id, id)?;
    }

    // lopdf concatenates a page's content streams byte-for-byte with no
    // separator, so a prior stream ending in an operator (e.g. `ET`) would
    // fuse with the overlay's leading `q`. Prefix a whitespace byte to keep
    // the appended layer's operators tokenised independently.
    let mut content = Vec::with_capacity(overlay.content.len() + 1);
    content.push(b'\n');
    content.extend_from_slice(&overlay.content);
    doc.add_page_contents(page_id, content)
        .map_err(|e| CompositeError::PageMerge(e.to_string()))
}

/// Register the overlay font in the page's `Resources`. Resources may
/// live inline on the page or behind a reference, and the `Font` entry
/// likewise; existing entries are preserved.
fn ensure_page_font(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<(), CompositeError> {
    let resources_obj = {
        let page_dict = page_dict_mut(doc, page_id)?;
        page_dict
            .remove(b"Resources")
            .unwrap_or_else(|| Object::Dictionary(Dictionary::new()))
    };

    let (indirect, mut resources) = match resources_obj {
        Object::Reference(id) => {
            let dict = doc
                .get_dictionary(id)
                .map(|d| d.clone())
                .map_err(|e| CompositeError::PageMerge(e.to_string()))?;
            (Some(id), dict)
        }
        Object::Dictionary(dict) => (None, dict),
        _ => {
            return Err(CompositeError::PageMerge(
                "page Resources is neither a dictionary nor a reference".into(),
            ))
        }
    };

    let mut fonts = match resources.remove(b"Font") {
        Some(Object::Dictionary(dict)) => dict,
        Some(Object::Reference(id)) => doc
            .get_dictionary(id)
            .map(|d| d.clone())
            .unwrap_or_else(|_| Dictionary::new()),
        _ => Dictionary::new(),
    };
    fonts.set(FONT_RESOURCE, font_id);
    resources.set("Font", Object::Dictionary(fonts));

    match indirect {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(resources));
            let page_dict = page_dict_mut(doc, page_id)?;
            page_dict.set("Resources", Object::Reference(id));
        }
        None => {
            let page_dict = page_dict_mut(doc, page_id)?;
            page_dict.set("Resources", Object::Dictionary(resources));
        }
    }
    Ok(())
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, CompositeError> {
    doc.get_object_mut(page_id)
        .and_then(|obj| obj.as_dict_mut())
        .map_err(|e| CompositeError::PageMerge(e.to_string()))
}
