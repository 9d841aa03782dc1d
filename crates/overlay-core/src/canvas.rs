//! Typed wrapper over PDF content-stream operators
//!
//! The compositor describes the overlay in terms of strokes, polygons,
//! circles, and centered labels; this module turns those into the raw
//! operator sequence (`m`/`l`/`re`/`c`/`S`/`f`/`B`, `BT`…`ET`) that lands
//! in the page's appended content stream. All coordinates handed in here
//! are already in PDF content space.

use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use shared_types::Point;

use crate::error::CompositeError;

/// Resource name the overlay's text face is registered under in the page
/// resources. The face itself is the built-in Helvetica-Bold Type1 font.
pub const FONT_RESOURCE: &str = "FRb";

/// Kappa for approximating a quarter circle with one cubic Bézier.
const CIRCLE_KAPPA: f64 = 0.552_284_749_831;

/// Average glyph advance for Helvetica-Bold, in em. Metrics are not
/// embedded; this is close enough to center one- and two-character labels.
const APPROX_GLYPH_ADVANCE_EM: f64 = 0.6;

/// An opaque 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn operands(&self) -> Vec<Object> {
        vec![
            real(self.r as f64 / 255.0),
            real(self.g as f64 / 255.0),
            real(self.b as f64 / 255.0),
        ]
    }
}

fn real(v: f64) -> Object {
    (v as f32).into()
}

/// One page's overlay drawing surface.
///
/// Operators accumulate in draw order; [`finish`](Self::finish) wraps them
/// in `q`/`Q` so the overlay never leaks graphics state into (or inherits
/// it from) the page's own content.
#[derive(Default)]
pub struct OverlayCanvas {
    operations: Vec<Operation>,
    uses_text: bool,
}

impl OverlayCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once any text label has been drawn; the merge step only
    /// registers the font resource when it is actually referenced.
    pub fn uses_text(&self) -> bool {
        self.uses_text
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        self.operations.push(Operation::new("RG", color.operands()));
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.operations.push(Operation::new("rg", color.operands()));
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.operations
            .push(Operation::new("w", vec![real(width)]));
    }

    /// Stroke a single straight segment.
    pub fn stroke_segment(&mut self, a: Point, b: Point) {
        self.operations
            .push(Operation::new("m", vec![real(a.x), real(a.y)]));
        self.operations
            .push(Operation::new("l", vec![real(b.x), real(b.y)]));
        self.operations.push(Operation::new("S", vec![]));
    }

    /// Stroke consecutive segments through every point. Fewer than two
    /// points is a no-op.
    pub fn stroke_polyline(&mut self, points: &[Point]) {
        let [first, rest @ ..] = points else {
            return;
        };
        if rest.is_empty() {
            return;
        }
        self.operations
            .push(Operation::new("m", vec![real(first.x), real(first.y)]));
        for p in rest {
            self.operations
                .push(Operation::new("l", vec![real(p.x), real(p.y)]));
        }
        self.operations.push(Operation::new("S", vec![]));
    }

    /// Axis-aligned rectangle with lower-left corner at `(x, y)`.
    pub fn rect(&mut self, x: f64, y: f64, w: f64, h: f64, fill: bool, stroke: bool) {
        self.operations.push(Operation::new(
            "re",
            vec![real(x), real(y), real(w), real(h)],
        ));
        self.paint(fill, stroke);
    }

    /// Closed polygon through `points`. Fewer than three points is a no-op.
    pub fn polygon(&mut self, points: &[Point], fill: bool, stroke: bool) {
        let [first, rest @ ..] = points else {
            return;
        };
        if rest.len() < 2 {
            return;
        }
        self.operations
            .push(Operation::new("m", vec![real(first.x), real(first.y)]));
        for p in rest {
            self.operations
                .push(Operation::new("l", vec![real(p.x), real(p.y)]));
        }
        self.operations.push(Operation::new("h", vec![]));
        self.paint(fill, stroke);
    }

    /// Circle approximated by four Bézier arcs.
    pub fn circle(&mut self, center: Point, radius: f64, fill: bool, stroke: bool) {
        let k = radius * CIRCLE_KAPPA;
        let (cx, cy) = (center.x, center.y);

        self.operations
            .push(Operation::new("m", vec![real(cx + radius), real(cy)]));
        for (c1, c2, end) in [
            ((cx + radius, cy + k), (cx + k, cy + radius), (cx, cy + radius)),
            ((cx - k, cy + radius), (cx - radius, cy + k), (cx - radius, cy)),
            ((cx - radius, cy - k), (cx - k, cy - radius), (cx, cy - radius)),
            ((cx + k, cy - radius), (cx + radius, cy - k), (cx + radius, cy)),
        ] {
            self.operations.push(Operation::new(
                "c",
                vec![
                    real(c1.0),
                    real(c1.1),
                    real(c2.0),
                    real(c2.1),
                    real(end.0),
                    real(end.1),
                ],
            ));
        }
        self.paint(fill, stroke);
    }

    /// Draw `text` horizontally centered on `anchor.x` with its baseline
    /// at `anchor.y`, in the built-in bold face at `size` points.
    pub fn centered_text(&mut self, anchor: Point, size: f64, text: &str) {
        let width = APPROX_GLYPH_ADVANCE_EM * size * text.chars().count() as f64;
        let x = anchor.x - width / 2.0;

        self.operations.push(Operation::new("BT", vec![]));
        self.operations.push(Operation::new(
            "Tf",
            vec![Object::Name(FONT_RESOURCE.as_bytes().to_vec()), real(size)],
        ));
        self.operations
            .push(Operation::new("Td", vec![real(x), real(anchor.y)]));
        self.operations.push(Operation::new(
            "Tj",
            vec![Object::String(
                text.bytes().collect(),
                StringFormat::Literal,
            )],
        ));
        self.operations.push(Operation::new("ET", vec![]));
        self.uses_text = true;
    }

    fn paint(&mut self, fill: bool, stroke: bool) {
        let op = match (fill, stroke) {
            (true, true) => "B",
            (true, false) => "f",
            (false, true) => "S",
            (false, false) => "n",
        };
        self.operations.push(Operation::new(op, vec![]));
    }

    /// Encode the accumulated operators, isolated inside `q`/`Q`.
    pub fn finish(self) -> Result<Vec<u8>, CompositeError> {
        let mut operations = Vec::with_capacity(self.operations.len() + 2);
        operations.push(Operation::new("q", vec![]));
        operations.extend(self.operations);
        operations.push(Operation::new("Q", vec![]));

        Content { operations }
            .encode()
            .map_err(|e| CompositeError::ContentEncoding(e.to_string()))
    }
}
