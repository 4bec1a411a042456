//! Offset (buffer) construction for geometries.
//!
//! The offset surface is built from explicit segment quads, join fills and
//! end caps which are then unioned by the boolean-operations backend. Round
//! joins and caps are approximated by regular polygons with a configurable
//! resolution, so results diverge numerically from engines that emit true
//! arcs.

use std::f64::consts::TAU;

use geo::{coord, Coord, Geometry, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::family::GeometryFamily;
use crate::repair::{collapse_area, explode, to_multi_polygon, try_difference, try_union};

/// How two adjacent offset segments are connected at a vertex.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinStyle {
    /// Circular arc around the vertex.
    #[default]
    Round,
    /// Offset edges extended until they meet, limited by the mitre limit.
    Mitre,
    /// Straight edge between the two offset corners.
    Bevel,
}

/// How the offset surface is closed at the open end of a line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapStyle {
    /// Semicircle around the end point.
    #[default]
    Round,
    /// Straight cut through the end point.
    Flat,
    /// Rectangular cap extending one offset distance past the end point.
    Square,
}

/// Parameters of an offset construction.
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetParams {
    /// Signed offset distance. Negative distances shrink area geometries and
    /// produce nothing for points and lines.
    pub distance: f64,
    /// Join style at vertices.
    pub join: JoinStyle,
    /// Cap style at open line ends.
    pub cap: CapStyle,
    /// Mitre joins longer than `mitre_limit * distance` fall back to bevel.
    pub mitre_limit: f64,
    /// Number of segments approximating a full circle.
    pub resolution: usize,
}

impl OffsetParams {
    /// Round joins and caps with the given distance.
    pub fn new(distance: f64) -> Self {
        Self {
            distance,
            join: JoinStyle::default(),
            cap: CapStyle::default(),
            mitre_limit: 5.0,
            resolution: 32,
        }
    }
}

/// Offsets the geometry by the signed distance in `params`.
///
/// Points grow into circles, lines into stroked bands, areas are dilated or
/// eroded. Returns `None` when the result is empty or the construction
/// fails; a zero distance returns the input unchanged.
pub fn offset(geometry: &Geometry<f64>, params: &OffsetParams) -> Option<Geometry<f64>> {
    if params.distance == 0.0 {
        return Some(geometry.clone());
    }

    match GeometryFamily::of(geometry)? {
        GeometryFamily::Point => {
            if params.distance <= 0.0 {
                return None;
            }
            let circles: Vec<Polygon<f64>> = explode(geometry)
                .into_iter()
                .filter_map(|part| match part {
                    Geometry::Point(point) => Some(circle(point.0, params.distance, params.resolution)),
                    _ => None,
                })
                .collect();
            collapse_area(union_pieces(circles)?)
        }
        GeometryFamily::Line => {
            if params.distance <= 0.0 {
                return None;
            }
            let mut pieces = Vec::new();
            for part in explode(geometry) {
                if let Geometry::LineString(line) = part {
                    stroke(&line, params.distance, params, &mut pieces);
                }
            }
            collapse_area(union_pieces(pieces)?)
        }
        GeometryFamily::Area => {
            let source = to_multi_polygon(geometry)?;
            let width = params.distance.abs();
            let mut pieces = Vec::new();
            for polygon in &source.0 {
                stroke(polygon.exterior(), width, params, &mut pieces);
                for interior in polygon.interiors() {
                    stroke(interior, width, params, &mut pieces);
                }
            }
            let band = union_pieces(pieces)?;
            let result = if params.distance > 0.0 {
                try_union(&source, &band)?
            } else {
                try_difference(&source, &band)?
            };
            collapse_area(result)
        }
    }
}

fn union_pieces(pieces: Vec<Polygon<f64>>) -> Option<MultiPolygon<f64>> {
    let mut pieces = pieces.into_iter();
    let first = pieces.next()?;
    let mut union = MultiPolygon::new(vec![first]);
    for piece in pieces {
        union = try_union(&union, &MultiPolygon::new(vec![piece]))?;
    }
    Some(union)
}

/// Builds the offset band around one line string (open or closed).
fn stroke(line: &LineString<f64>, distance: f64, params: &OffsetParams, out: &mut Vec<Polygon<f64>>) {
    let coords = &line.0;
    if coords.len() < 2 {
        return;
    }
    let closed = coords.first() == coords.last() && coords.len() > 3;

    // Segment quads.
    let mut directions = Vec::with_capacity(coords.len() - 1);
    for pair in coords.windows(2) {
        let Some(direction) = unit(pair[1] - pair[0]) else {
            directions.push(None);
            continue;
        };
        directions.push(Some(direction));
        let normal = perp(direction) * distance;
        out.push(quad(
            pair[0] + normal,
            pair[1] + normal,
            pair[1] - normal,
            pair[0] - normal,
        ));
    }

    // Joins at interior vertices; for closed rings also at the seam vertex.
    let last_vertex = if closed { coords.len() - 1 } else { coords.len() - 2 };
    for i in 1..=last_vertex {
        let incoming = directions[i - 1];
        let outgoing = if i == coords.len() - 1 {
            directions[0]
        } else {
            directions[i]
        };
        if let (Some(incoming), Some(outgoing)) = (incoming, outgoing) {
            join(coords[i], incoming, outgoing, distance, params, out);
        }
    }

    if !closed {
        let start_dir = directions.iter().flatten().next().copied();
        let end_dir = directions.iter().flatten().last().copied();
        if let Some(direction) = start_dir {
            cap(coords[0], -direction, distance, params, out);
        }
        if let Some(direction) = end_dir {
            cap(coords[coords.len() - 1], direction, distance, params, out);
        }
    }
}

fn join(
    vertex: Coord<f64>,
    incoming: Coord<f64>,
    outgoing: Coord<f64>,
    distance: f64,
    params: &OffsetParams,
    out: &mut Vec<Polygon<f64>>,
) {
    match params.join {
        JoinStyle::Round => out.push(circle(vertex, distance, params.resolution)),
        JoinStyle::Bevel => bevel(vertex, incoming, outgoing, distance, out),
        JoinStyle::Mitre => {
            let n1 = perp(incoming);
            let n2 = perp(outgoing);
            let Some(bisector) = unit(n1 + n2) else {
                // U-turn: mitre is unbounded.
                bevel(vertex, incoming, outgoing, distance, out);
                return;
            };
            let cos_half = bisector.x * n1.x + bisector.y * n1.y;
            if cos_half <= 0.0 || 1.0 / cos_half > params.mitre_limit {
                bevel(vertex, incoming, outgoing, distance, out);
                return;
            }
            let length = distance / cos_half;
            out.push(quad(
                vertex,
                vertex + n1 * distance,
                vertex + bisector * length,
                vertex + n2 * distance,
            ));
            out.push(quad(
                vertex,
                vertex - n1 * distance,
                vertex - bisector * length,
                vertex - n2 * distance,
            ));
        }
    }
}

fn bevel(
    vertex: Coord<f64>,
    incoming: Coord<f64>,
    outgoing: Coord<f64>,
    distance: f64,
    out: &mut Vec<Polygon<f64>>,
) {
    let n1 = perp(incoming) * distance;
    let n2 = perp(outgoing) * distance;
    out.push(triangle(vertex, vertex + n1, vertex + n2));
    out.push(triangle(vertex, vertex - n1, vertex - n2));
}

fn cap(
    end: Coord<f64>,
    outward: Coord<f64>,
    distance: f64,
    params: &OffsetParams,
    out: &mut Vec<Polygon<f64>>,
) {
    match params.cap {
        CapStyle::Round => out.push(circle(end, distance, params.resolution)),
        CapStyle::Flat => {}
        CapStyle::Square => {
            let normal = perp(outward) * distance;
            let extent = outward * distance;
            out.push(quad(
                end + normal,
                end + normal + extent,
                end - normal + extent,
                end - normal,
            ));
        }
    }
}

fn circle(center: Coord<f64>, radius: f64, resolution: usize) -> Polygon<f64> {
    let segments = resolution.max(8);
    let coords = (0..segments)
        .map(|i| {
            let angle = i as f64 / segments as f64 * TAU;
            coord! {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::new(coords), Vec::new())
}

fn quad(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>, d: Coord<f64>) -> Polygon<f64> {
    Polygon::new(LineString::new(vec![a, b, c, d]), Vec::new())
}

fn triangle(a: Coord<f64>, b: Coord<f64>, c: Coord<f64>) -> Polygon<f64> {
    Polygon::new(LineString::new(vec![a, b, c]), Vec::new())
}

fn unit(vector: Coord<f64>) -> Option<Coord<f64>> {
    let length = (vector.x * vector.x + vector.y * vector.y).sqrt();
    if length < f64::EPSILON {
        None
    } else {
        Some(vector / length)
    }
}

fn perp(vector: Coord<f64>) -> Coord<f64> {
    coord! { x: -vector.y, y: vector.x }
}
