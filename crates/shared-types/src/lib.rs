//! Shared data model for the fiberroute workspace
//!
//! Everything the frontend draws and the backend renders or measures is
//! expressed in terms of these types: geometric points, routes, markers,
//! assignment links, and conduit runs. The serde shapes here are the wire
//! format spoken by the HTTP API.

pub mod geometry;
pub mod types;

pub use geometry::polyline_length;
pub use types::{
    AssignmentLink, ConduitRun, GraphicalEntity, Marker, MarkerKind, Point, Route, RouteKind,
    ViewportOverride,
};
