use serde::{Deserialize, Serialize};

/// A 2D coordinate. Whether it lives in viewer space (top-left origin, as
/// rendered to the user) or PDF content space (bottom-left origin,
/// unrotated) is fixed by each consuming function's contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Route flavor. Conduit routes render thinner and are never numbered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    #[default]
    Fiber,
    Conduit,
}

/// Marker flavor, matching the frontend's drawing palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkerKind {
    Terminal,
    DropPed,
    Handhole,
}

/// An ordered polyline drawn by the user in viewer space.
///
/// Zero or one points is legal (a route the user started and abandoned);
/// such routes have no drawable segments and no defined length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub page_number: u32,
    #[serde(default)]
    pub kind: RouteKind,
    pub points: Vec<Point>,
}

/// A placed marker. `id` is the frontend's handle; links and conduit runs
/// reference markers through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub id: i64,
    pub page_number: u32,
    pub kind: MarkerKind,
    pub position: Point,
}

/// An assignment arrow from a marker to a free target point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentLink {
    pub page_number: u32,
    pub marker_id: i64,
    pub target: Point,
}

/// A drop-conduit connection between a terminal marker and a drop-pedestal
/// marker, with its surveyed footage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConduitRun {
    pub page_number: u32,
    pub terminal_id: i64,
    pub drop_ped_id: i64,
    pub footage: f64,
}

/// Everything the overlay renderer knows how to draw.
///
/// A closed sum type: the compositor dispatches on it exhaustively, so a
/// new variant is a compile error at every draw site until handled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GraphicalEntity {
    Route(Route),
    Marker(Marker),
    AssignmentLink(AssignmentLink),
    ConduitRun(ConduitRun),
}

impl GraphicalEntity {
    /// 1-indexed page this entity belongs to.
    pub fn page_number(&self) -> u32 {
        match self {
            GraphicalEntity::Route(r) => r.page_number,
            GraphicalEntity::Marker(m) => m.page_number,
            GraphicalEntity::AssignmentLink(l) => l.page_number,
            GraphicalEntity::ConduitRun(c) => c.page_number,
        }
    }
}

/// Rendered page dimensions reported by the frontend viewer.
///
/// When present these override the page geometry for the purpose of
/// computing the rotated bounding box that viewer-space coordinates are
/// expressed in. For 90/270-rotated pages the reported width/height are
/// swapped relative to the unrotated media box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewportOverride {
    pub width: Option<f64>,
    pub height: Option<f64>,
}
