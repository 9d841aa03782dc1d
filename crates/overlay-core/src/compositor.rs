//! Layered scene compositor
//!
//! Draws one page's worth of entities onto a transient overlay canvas in a
//! fixed back-to-front order: handholes, routes (with their numeric
//! labels), conduit runs, assignment arrows, and finally terminal and
//! drop-pedestal markers so they are never occluded.
//!
//! The compositor is a pure function of (page geometry, viewport, entity
//! slice); label counters are explicit per-call values, which is what
//! keeps pages independently renderable.

use shared_types::{
    polyline_length, AssignmentLink, ConduitRun, GraphicalEntity, Marker, MarkerKind, Point, Route,
    RouteKind, ViewportOverride,
};
use tracing::debug;

use crate::canvas::{Color, OverlayCanvas};
use crate::error::CompositeError;
use crate::labels;
use crate::path;
use crate::transform::{PageFrame, Rotation};

const FIBER_GREEN: Color = Color::rgb(0x22, 0xc5, 0x5e);
const TERMINAL_GREEN: Color = Color::rgb(0x10, 0xb9, 0x81);
const CONDUIT_PURPLE: Color = Color::rgb(0x93, 0x33, 0xea);
const MARKER_PURPLE: Color = Color::rgb(0xa8, 0x55, 0xf7);
const ARROW_SLATE: Color = Color::rgb(0x0f, 0x17, 0x2a);
const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

const FIBER_WIDTH: f64 = 4.0;
const CONDUIT_WIDTH: f64 = 2.0;
const CONDUIT_RUN_WIDTH: f64 = 3.0;
const OUTLINE_WIDTH: f64 = 2.0;

const HANDHOLE_HALF: f64 = 14.0;
const HANDHOLE_INNER_HALF: f64 = 6.0;
const ROUTE_LABEL_RADIUS: f64 = 12.0;
const DROP_RADIUS: f64 = 12.0;
const TERMINAL_SIZE: f64 = 30.0;
const ARROW_HEAD_LEN: f64 = 12.0;

/// Intrinsic page properties read from the source document. Width and
/// height are the media box as stored, before rotation.
#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    pub media_width: f64,
    pub media_height: f64,
    pub rotation: Rotation,
}

/// One page's finished overlay: an encoded content stream plus whether it
/// references the label font.
#[derive(Debug, Clone)]
pub struct PageOverlay {
    pub content: Vec<u8>,
    pub uses_text: bool,
}

/// Per-page label state, built fresh for every compose call.
#[derive(Default)]
struct LabelSequence {
    fiber_routes: u32,
    terminals: usize,
    drop_peds: usize,
}

impl LabelSequence {
    fn next_fiber_ordinal(&mut self) -> u32 {
        self.fiber_routes += 1;
        self.fiber_routes
    }

    fn next_terminal_label(&mut self) -> String {
        let label = labels::alpha_label(self.terminals);
        self.terminals += 1;
        label
    }

    fn next_drop_label(&mut self) -> String {
        let label = labels::alpha_label(self.drop_peds);
        self.drop_peds += 1;
        label
    }
}

/// Render one page's entities into an overlay content stream.
pub fn compose_page(
    geometry: &PageGeometry,
    viewport: &ViewportOverride,
    entities: &[GraphicalEntity],
) -> Result<PageOverlay, CompositeError> {
    // Exhaustive split of the entity union; a new variant fails to
    // compile here instead of silently not drawing.
    let mut routes: Vec<&Route> = Vec::new();
    let mut markers: Vec<&Marker> = Vec::new();
    let mut links: Vec<&AssignmentLink> = Vec::new();
    let mut conduit_runs: Vec<&ConduitRun> = Vec::new();
    for entity in entities {
        match entity {
            GraphicalEntity::Route(r) => routes.push(r),
            GraphicalEntity::Marker(m) => markers.push(m),
            GraphicalEntity::AssignmentLink(l) => links.push(l),
            GraphicalEntity::ConduitRun(c) => conduit_runs.push(c),
        }
    }

    ensure_finite(&routes, &markers, &links)?;

    let frame = PageFrame::new(
        geometry.media_width,
        geometry.media_height,
        geometry.rotation,
        viewport,
    );
    let mut canvas = OverlayCanvas::new();
    let mut sequence = LabelSequence::default();

    draw_handholes(&mut canvas, &frame, &markers);
    draw_routes(&mut canvas, &frame, &routes, &mut sequence);
    draw_conduit_runs(&mut canvas, &frame, &conduit_runs, &markers);
    draw_assignment_links(&mut canvas, &frame, &links, &markers);
    draw_terminals_and_drops(&mut canvas, &frame, &markers, &mut sequence);

    let uses_text = canvas.uses_text();
    Ok(PageOverlay {
        content: canvas.finish()?,
        uses_text,
    })
}

/// A NaN or infinite coordinate would serialize garbage into the content
/// stream; reject the whole page up front so it falls back to original
/// content.
fn ensure_finite(
    routes: &[&Route],
    markers: &[&Marker],
    links: &[&AssignmentLink],
) -> Result<(), CompositeError> {
    let finite = routes
        .iter()
        .flat_map(|r| r.points.iter())
        .chain(markers.iter().map(|m| &m.position))
        .chain(links.iter().map(|l| &l.target))
        .all(|p| p.is_finite());
    if finite {
        Ok(())
    } else {
        Err(CompositeError::NonFiniteCoordinate)
    }
}

fn find_marker<'a>(markers: &[&'a Marker], id: i64) -> Option<&'a Marker> {
    markers.iter().find(|m| m.id == id).copied()
}

fn draw_handholes(canvas: &mut OverlayCanvas, frame: &PageFrame, markers: &[&Marker]) {
    for marker in markers.iter().filter(|m| m.kind == MarkerKind::Handhole) {
        let p = frame.to_content_space(marker.position);

        canvas.set_fill_color(MARKER_PURPLE);
        canvas.rect(
            p.x - HANDHOLE_HALF,
            p.y - HANDHOLE_HALF,
            HANDHOLE_HALF * 2.0,
            HANDHOLE_HALF * 2.0,
            true,
            false,
        );
        canvas.set_stroke_color(WHITE);
        canvas.set_line_width(OUTLINE_WIDTH);
        canvas.rect(
            p.x - HANDHOLE_HALF,
            p.y - HANDHOLE_HALF,
            HANDHOLE_HALF * 2.0,
            HANDHOLE_HALF * 2.0,
            false,
            true,
        );
        // Hollow center
        canvas.set_fill_color(WHITE);
        canvas.rect(
            p.x - HANDHOLE_INNER_HALF,
            p.y - HANDHOLE_INNER_HALF,
            HANDHOLE_INNER_HALF * 2.0,
            HANDHOLE_INNER_HALF * 2.0,
            true,
            false,
        );
    }
}

fn draw_routes(
    canvas: &mut OverlayCanvas,
    frame: &PageFrame,
    routes: &[&Route],
    sequence: &mut LabelSequence,
) {
    for route in routes {
        match route.kind {
            RouteKind::Conduit => {
                canvas.set_stroke_color(CONDUIT_PURPLE);
                canvas.set_line_width(CONDUIT_WIDTH);
            }
            RouteKind::Fiber => {
                canvas.set_stroke_color(FIBER_GREEN);
                canvas.set_line_width(FIBER_WIDTH);
            }
        }

        let transformed: Vec<Point> = route
            .points
            .iter()
            .map(|p| frame.to_content_space(*p))
            .collect();
        canvas.stroke_polyline(&transformed);

        if route.kind == RouteKind::Conduit {
            continue;
        }
        // Conduits never consume an ordinal; degenerate fiber routes do,
        // they just have nowhere to put the label.
        let ordinal = sequence.next_fiber_ordinal();
        if route.points.len() < 2 {
            continue;
        }

        // Length and anchor math run in raw viewer space; only the final
        // anchor crosses into content space.
        let total = polyline_length(&route.points);
        for &fraction in labels::label_fractions(total) {
            let anchor = frame.to_content_space(path::point_at_fraction(&route.points, fraction));
            draw_route_ordinal(canvas, anchor, ordinal);
        }
    }
}

fn draw_route_ordinal(canvas: &mut OverlayCanvas, anchor: Point, ordinal: u32) {
    canvas.set_fill_color(FIBER_GREEN);
    canvas.set_stroke_color(WHITE);
    canvas.set_line_width(OUTLINE_WIDTH);
    canvas.circle(anchor, ROUTE_LABEL_RADIUS, true, true);

    canvas.set_fill_color(WHITE);
    canvas.centered_text(
        Point::new(anchor.x, anchor.y - 2.0),
        11.0,
        &ordinal.to_string(),
    );
}

fn draw_conduit_runs(
    canvas: &mut OverlayCanvas,
    frame: &PageFrame,
    runs: &[&ConduitRun],
    markers: &[&Marker],
) {
    for run in runs {
        let (Some(terminal), Some(drop)) = (
            find_marker(markers, run.terminal_id),
            find_marker(markers, run.drop_ped_id),
        ) else {
            // Dangling marker reference: drop the connection, keep the page.
            debug!(
                terminal_id = run.terminal_id,
                drop_ped_id = run.drop_ped_id,
                "conduit run references a missing marker; skipped"
            );
            continue;
        };

        canvas.set_stroke_color(CONDUIT_PURPLE);
        canvas.set_line_width(CONDUIT_RUN_WIDTH);
        canvas.stroke_segment(
            frame.to_content_space(terminal.position),
            frame.to_content_space(drop.position),
        );
    }
}

fn draw_assignment_links(
    canvas: &mut OverlayCanvas,
    frame: &PageFrame,
    links: &[&AssignmentLink],
    markers: &[&Marker],
) {
    for link in links {
        let Some(marker) = find_marker(markers, link.marker_id) else {
            debug!(
                marker_id = link.marker_id,
                "assignment link references a missing marker; skipped"
            );
            continue;
        };

        let from = frame.to_content_space(marker.position);
        let to = frame.to_content_space(link.target);

        canvas.set_stroke_color(ARROW_SLATE);
        canvas.set_line_width(OUTLINE_WIDTH);
        canvas.stroke_segment(from, to);

        // Arrowhead wings sit ±30° off the reversed line direction.
        let angle = (to.y - from.y).atan2(to.x - from.x);
        let wing = |offset: f64| {
            Point::new(
                to.x - ARROW_HEAD_LEN * (angle + offset).cos(),
                to.y - ARROW_HEAD_LEN * (angle + offset).sin(),
            )
        };
        canvas.set_fill_color(ARROW_SLATE);
        canvas.polygon(
            &[to, wing(-std::f64::consts::FRAC_PI_6), wing(std::f64::consts::FRAC_PI_6)],
            true,
            false,
        );
    }
}

fn draw_terminals_and_drops(
    canvas: &mut OverlayCanvas,
    frame: &PageFrame,
    markers: &[&Marker],
    sequence: &mut LabelSequence,
) {
    for marker in markers.iter().filter(|m| m.kind == MarkerKind::Terminal) {
        let p = frame.to_content_space(marker.position);
        let h = TERMINAL_SIZE * 3.0_f64.sqrt() / 2.0;

        canvas.set_fill_color(TERMINAL_GREEN);
        canvas.set_stroke_color(WHITE);
        canvas.set_line_width(OUTLINE_WIDTH);
        canvas.polygon(
            &[
                Point::new(p.x, p.y + h / 2.0),
                Point::new(p.x - TERMINAL_SIZE / 2.0, p.y - h / 2.0),
                Point::new(p.x + TERMINAL_SIZE / 2.0, p.y - h / 2.0),
            ],
            true,
            true,
        );

        canvas.set_fill_color(WHITE);
        canvas.centered_text(
            Point::new(p.x, p.y - 4.0),
            13.0,
            &sequence.next_terminal_label(),
        );
    }

    for marker in markers.iter().filter(|m| m.kind == MarkerKind::DropPed) {
        let p = frame.to_content_space(marker.position);

        canvas.set_fill_color(MARKER_PURPLE);
        canvas.set_stroke_color(WHITE);
        canvas.set_line_width(OUTLINE_WIDTH);
        canvas.circle(p, DROP_RADIUS, true, true);

        canvas.set_fill_color(WHITE);
        canvas.centered_text(
            Point::new(p.x, p.y - 3.0),
            10.0,
            &sequence.next_drop_label(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Content;
    use lopdf::Object;
    use pretty_assertions::assert_eq;

    fn letter() -> PageGeometry {
        PageGeometry {
            media_width: 612.0,
            media_height: 792.0,
            rotation: Rotation::None,
        }
    }

    fn compose(entities: &[GraphicalEntity]) -> PageOverlay {
        compose_page(&letter(), &ViewportOverride::default(), entities).unwrap()
    }

    fn decoded_ops(overlay: &PageOverlay) -> Vec<lopdf::content::Operation> {
        Content::decode(&overlay.content).unwrap().operations
    }

    /// All text drawn on the overlay, in draw order.
    fn label_texts(overlay: &PageOverlay) -> Vec<String> {
        decoded_ops(overlay)
            .into_iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| match op.operands.first() {
                Some(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                _ => None,
            })
            .collect()
    }

    fn fiber_route(points: &[(f64, f64)]) -> GraphicalEntity {
        GraphicalEntity::Route(Route {
            page_number: 1,
            kind: RouteKind::Fiber,
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        })
    }

    fn conduit_route(points: &[(f64, f64)]) -> GraphicalEntity {
        GraphicalEntity::Route(Route {
            page_number: 1,
            kind: RouteKind::Conduit,
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        })
    }

    fn marker(id: i64, kind: MarkerKind, x: f64, y: f64) -> GraphicalEntity {
        GraphicalEntity::Marker(Marker {
            id,
            page_number: 1,
            kind,
            position: Point::new(x, y),
        })
    }

    #[test]
    fn short_routes_get_one_label_long_routes_two() {
        let short = compose(&[fiber_route(&[(0.0, 0.0), (30.0, 40.0)])]); // length 50
        assert_eq!(label_texts(&short), vec!["1"]);

        let long = compose(&[fiber_route(&[(0.0, 0.0), (120.0, 160.0)])]); // length 200
        assert_eq!(label_texts(&long), vec!["1", "1"]);
    }

    #[test]
    fn only_fiber_routes_are_numbered() {
        let overlay = compose(&[
            conduit_route(&[(0.0, 0.0), (10.0, 0.0)]),
            fiber_route(&[(0.0, 0.0), (30.0, 40.0)]),
            fiber_route(&[(10.0, 10.0), (40.0, 50.0)]),
            conduit_route(&[(5.0, 5.0), (15.0, 5.0)]),
        ]);
        assert_eq!(label_texts(&overlay), vec!["1", "2"]);
    }

    #[test]
    fn degenerate_fiber_routes_consume_an_ordinal_but_no_label() {
        let overlay = compose(&[
            fiber_route(&[(50.0, 50.0)]),
            fiber_route(&[(0.0, 0.0), (30.0, 40.0)]),
        ]);
        // The one-point route is route 1; the drawable route labels as 2.
        assert_eq!(label_texts(&overlay), vec!["2"]);
    }

    #[test]
    fn markers_are_lettered_within_their_own_kind() {
        let overlay = compose(&[
            marker(1, MarkerKind::Terminal, 100.0, 100.0),
            marker(2, MarkerKind::DropPed, 200.0, 200.0),
            marker(3, MarkerKind::Terminal, 300.0, 300.0),
        ]);
        // Terminals draw first (A, B), then drops restart at A.
        assert_eq!(label_texts(&overlay), vec!["A", "B", "A"]);
    }

    #[test]
    fn handholes_draw_before_routes_markers_after() {
        let overlay = compose(&[
            marker(1, MarkerKind::Terminal, 100.0, 100.0),
            marker(2, MarkerKind::Handhole, 50.0, 50.0),
            fiber_route(&[(0.0, 0.0), (30.0, 40.0)]),
        ]);
        let ops: Vec<String> = decoded_ops(&overlay)
            .into_iter()
            .map(|op| op.operator)
            .collect();

        // Handhole squares come first, the terminal triangle's closed
        // path comes after the route stroke.
        let first_rect = ops.iter().position(|op| op == "re").unwrap();
        let route_stroke = ops.iter().position(|op| op == "S").unwrap();
        let triangle_close = ops.iter().rposition(|op| op == "h").unwrap();
        assert!(first_rect < route_stroke);
        assert!(route_stroke < triangle_close);
    }

    #[test]
    fn dangling_references_are_skipped_silently() {
        let overlay = compose(&[
            GraphicalEntity::ConduitRun(ConduitRun {
                page_number: 1,
                terminal_id: 99,
                drop_ped_id: 98,
                footage: 50.0,
            }),
            GraphicalEntity::AssignmentLink(AssignmentLink {
                page_number: 1,
                marker_id: 97,
                target: Point::new(10.0, 10.0),
            }),
        ]);
        let ops: Vec<String> = decoded_ops(&overlay)
            .into_iter()
            .map(|op| op.operator)
            .collect();
        assert_eq!(ops, vec!["q", "Q"]);
        assert!(!overlay.uses_text);
    }

    #[test]
    fn conduit_runs_connect_their_markers() {
        let overlay = compose(&[
            marker(1, MarkerKind::Terminal, 100.0, 100.0),
            marker(2, MarkerKind::DropPed, 200.0, 150.0),
            GraphicalEntity::ConduitRun(ConduitRun {
                page_number: 1,
                terminal_id: 1,
                drop_ped_id: 2,
                footage: 85.0,
            }),
        ]);
        let ops = decoded_ops(&overlay);
        // One straight segment stroked for the run, before the marker
        // shapes (which close with `h`).
        let seg = ops
            .iter()
            .position(|op| op.operator == "m")
            .expect("conduit run emits a path");
        assert_eq!(ops[seg + 1].operator, "l");
        assert_eq!(ops[seg + 2].operator, "S");
    }

    #[test]
    fn non_finite_coordinates_fail_the_page() {
        let err = compose_page(
            &letter(),
            &ViewportOverride::default(),
            &[fiber_route(&[(0.0, 0.0), (f64::NAN, 10.0)])],
        )
        .unwrap_err();
        assert!(matches!(err, CompositeError::NonFiniteCoordinate));
    }

    #[test]
    fn routes_alone_produce_text_only_when_labelled() {
        let unlabelled = compose(&[conduit_route(&[(0.0, 0.0), (10.0, 10.0)])]);
        assert!(!unlabelled.uses_text);

        let labelled = compose(&[fiber_route(&[(0.0, 0.0), (30.0, 40.0)])]);
        assert!(labelled.uses_text);
    }
}
