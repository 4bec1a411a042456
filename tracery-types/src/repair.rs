//! Topological repair of geometries.
//!
//! Every function in this module reports failure by returning `None`. A
//! geometry that cannot be repaired means the owning feature produced
//! nothing, not that the stream must stop.

use std::panic::{catch_unwind, AssertUnwindSafe};

use geo::{
    BooleanOps, Geometry, GeometryCollection, HasDimensions, LineString, MultiLineString,
    MultiPoint, MultiPolygon, Point, Polygon, Validation,
};

use crate::family::GeometryFamily;

/// Makes the given geometry topologically valid.
///
/// Empty and already valid geometries are returned unchanged. An invalid
/// geometry is re-noded through the boolean-operations backend; if the fixed
/// result contains parts of a different semantic family than the input, only
/// compatible parts are kept. Returns `None` when nothing usable remains.
pub fn repair(geometry: Geometry<f64>) -> Option<Geometry<f64>> {
    if geometry.is_empty() || geometry.is_valid() {
        return Some(geometry);
    }

    let family = GeometryFamily::of(&geometry);
    let fixed = fix(&geometry)?;
    if fixed.is_empty() {
        return None;
    }

    match family {
        Some(family) => restrict_to_family(fixed, family),
        None => Some(fixed),
    }
}

/// Removes interior rings (islands) from area geometries.
///
/// Non-area geometries pass through unchanged, as does any geometry when
/// `preserve` is set. Otherwise each polygon part is rebuilt from its outer
/// boundary and the parts are unioned back together. Returns `None` when no
/// usable part remains or the union fails.
pub fn remove_islands(geometry: Geometry<f64>, preserve: bool) -> Option<Geometry<f64>> {
    if preserve || GeometryFamily::of(&geometry) != Some(GeometryFamily::Area) {
        return Some(geometry);
    }

    let source = to_multi_polygon(&geometry)?;
    let shells: Vec<Polygon<f64>> = source
        .0
        .iter()
        .map(|polygon| Polygon::new(polygon.exterior().clone(), Vec::new()))
        .filter(|shell| !shell.is_empty())
        .collect();
    if shells.is_empty() {
        return None;
    }

    let mut union = MultiPolygon::new(vec![shells[0].clone()]);
    for shell in &shells[1..] {
        union = try_union(&union, &MultiPolygon::new(vec![shell.clone()]))?;
    }
    collapse_area(union)
}

/// Flattens a geometry into its single-part constituents.
///
/// Multi-part geometries and geometry collections are flattened recursively;
/// rectangles, triangles and line segments are promoted to polygons and line
/// strings. Degenerate parts are skipped. An empty geometry yields an empty
/// vector.
pub fn explode(geometry: &Geometry<f64>) -> Vec<Geometry<f64>> {
    let mut parts = Vec::new();
    collect_parts(geometry, &mut parts);
    parts
}

fn collect_parts(geometry: &Geometry<f64>, out: &mut Vec<Geometry<f64>>) {
    match geometry {
        Geometry::Point(point) => out.push((*point).into()),
        Geometry::MultiPoint(points) => out.extend(points.0.iter().map(|p| Geometry::from(*p))),
        Geometry::Line(line) => out.push(LineString::new(vec![line.start, line.end]).into()),
        Geometry::LineString(line) => push_line(line, out),
        Geometry::MultiLineString(lines) => {
            for line in &lines.0 {
                push_line(line, out);
            }
        }
        Geometry::Polygon(polygon) => push_polygon(polygon, out),
        Geometry::MultiPolygon(polygons) => {
            for polygon in &polygons.0 {
                push_polygon(polygon, out);
            }
        }
        Geometry::Rect(rect) => out.push(rect.to_polygon().into()),
        Geometry::Triangle(triangle) => out.push(triangle.to_polygon().into()),
        Geometry::GeometryCollection(collection) => {
            for member in &collection.0 {
                collect_parts(member, out);
            }
        }
    }
}

fn push_line(line: &LineString<f64>, out: &mut Vec<Geometry<f64>>) {
    if line.0.len() >= 2 {
        out.push(line.clone().into());
    } else {
        log::debug!("skipping degenerate line string with {} points", line.0.len());
    }
}

fn push_polygon(polygon: &Polygon<f64>, out: &mut Vec<Geometry<f64>>) {
    if polygon.is_empty() {
        log::debug!("skipping empty polygon part");
    } else {
        out.push(polygon.clone().into());
    }
}

/// Unions two multi-polygons, treating a backend panic as a failed union.
///
/// The boolean-operations backend panics on some degenerate inputs.
pub fn try_union(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    catch_unwind(AssertUnwindSafe(|| a.union(b))).ok()
}

/// Intersects two multi-polygons, treating a backend panic as a failure.
pub fn try_intersection(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    catch_unwind(AssertUnwindSafe(|| a.intersection(b))).ok()
}

/// Subtracts `b` from `a`, treating a backend panic as a failure.
pub fn try_difference(a: &MultiPolygon<f64>, b: &MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    catch_unwind(AssertUnwindSafe(|| a.difference(b))).ok()
}

/// Converts an area-family geometry into a multi-polygon.
pub fn to_multi_polygon(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => Some(MultiPolygon::new(vec![polygon.clone()])),
        Geometry::MultiPolygon(polygons) => Some(polygons.clone()),
        Geometry::Rect(rect) => Some(MultiPolygon::new(vec![rect.to_polygon()])),
        Geometry::Triangle(triangle) => Some(MultiPolygon::new(vec![triangle.to_polygon()])),
        Geometry::GeometryCollection(_) => {
            if GeometryFamily::of(geometry) != Some(GeometryFamily::Area) {
                return None;
            }
            let polygons = explode(geometry)
                .into_iter()
                .filter_map(|part| match part {
                    Geometry::Polygon(polygon) => Some(polygon),
                    _ => None,
                })
                .collect();
            Some(MultiPolygon::new(polygons))
        }
        _ => None,
    }
}

/// Unions single-part geometries of one family into one geometry.
///
/// Area parts go through the boolean-operations backend; point and line
/// parts are collected into their multi-part containers.
pub fn union_parts(parts: Vec<Geometry<f64>>, family: GeometryFamily) -> Option<Geometry<f64>> {
    match family {
        GeometryFamily::Point => {
            let points: Vec<Point<f64>> = parts
                .iter()
                .flat_map(explode)
                .filter_map(|part| match part {
                    Geometry::Point(point) => Some(point),
                    _ => None,
                })
                .collect();
            match points.len() {
                0 => None,
                1 => Some(points[0].into()),
                _ => Some(MultiPoint::new(points).into()),
            }
        }
        GeometryFamily::Line => {
            let lines: Vec<LineString<f64>> = parts
                .iter()
                .flat_map(explode)
                .filter_map(|part| match part {
                    Geometry::LineString(line) => Some(line),
                    _ => None,
                })
                .collect();
            match lines.len() {
                0 => None,
                1 => Some(lines.into_iter().next()?.into()),
                _ => Some(MultiLineString::new(lines).into()),
            }
        }
        GeometryFamily::Area => {
            let mut union: Option<MultiPolygon<f64>> = None;
            for part in &parts {
                let Some(part) = to_multi_polygon(part) else {
                    continue;
                };
                union = Some(match union {
                    None => part,
                    Some(acc) => try_union(&acc, &part)?,
                });
            }
            collapse_area(union?)
        }
    }
}

/// Unwraps a multi-polygon into the simplest geometry that represents it.
pub fn collapse_area(polygons: MultiPolygon<f64>) -> Option<Geometry<f64>> {
    let mut polygons: Vec<Polygon<f64>> =
        polygons.0.into_iter().filter(|p| !p.is_empty()).collect();
    match polygons.len() {
        0 => None,
        1 => polygons.pop().map(Into::into),
        _ => Some(MultiPolygon::new(polygons).into()),
    }
}

fn fix(geometry: &Geometry<f64>) -> Option<Geometry<f64>> {
    match GeometryFamily::of(geometry) {
        Some(GeometryFamily::Area) => {
            let source = to_multi_polygon(geometry)?;
            let renoded = try_union(&source, &MultiPolygon::new(Vec::new()))?;
            collapse_area(renoded)
        }
        Some(GeometryFamily::Line) => {
            let lines: Vec<LineString<f64>> = explode(geometry)
                .into_iter()
                .filter_map(|part| match part {
                    Geometry::LineString(line) => Some(line),
                    _ => None,
                })
                .filter(|line| line.0.iter().any(|c| *c != line.0[0]))
                .collect();
            match lines.len() {
                0 => None,
                1 => Some(lines.into_iter().next()?.into()),
                _ => Some(MultiLineString::new(lines).into()),
            }
        }
        Some(GeometryFamily::Point) => {
            let points: Vec<Point<f64>> = explode(geometry)
                .into_iter()
                .filter_map(|part| match part {
                    Geometry::Point(point) => Some(point),
                    _ => None,
                })
                .filter(|point| point.x().is_finite() && point.y().is_finite())
                .collect();
            match points.len() {
                0 => None,
                1 => Some(points[0].into()),
                _ => Some(MultiPoint::new(points).into()),
            }
        }
        None => {
            // Mixed collection: repair each member on its own.
            let parts: Vec<Geometry<f64>> = explode(geometry)
                .into_iter()
                .filter_map(repair)
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(Geometry::GeometryCollection(GeometryCollection::new_from(
                    parts,
                )))
            }
        }
    }
}

fn restrict_to_family(fixed: Geometry<f64>, family: GeometryFamily) -> Option<Geometry<f64>> {
    let compatible: Vec<Geometry<f64>> = explode(&fixed)
        .into_iter()
        .filter(|part| GeometryFamily::of(part) == Some(family))
        .collect();
    match compatible.len() {
        0 => None,
        1 => compatible.into_iter().next(),
        _ => union_parts(compatible, family),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, Area};

    fn bowtie() -> Polygon<f64> {
        polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 2.0),
        ]
    }

    #[test]
    fn repair_keeps_valid_geometry_unchanged() {
        let square: Geometry<f64> =
            polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0)]
                .into();
        assert_eq!(repair(square.clone()), Some(square));
    }

    #[test]
    fn repair_keeps_empty_geometry_unchanged() {
        let empty: Geometry<f64> = Polygon::new(LineString::new(Vec::new()), Vec::new()).into();
        let repaired = repair(empty.clone()).expect("empty geometry must pass through");
        assert!(repaired.is_empty());
    }

    #[test]
    fn repair_fixes_self_intersection() {
        let fixed = repair(bowtie().into()).expect("bowtie must be repairable");
        assert!(fixed.is_valid());
        assert_eq!(GeometryFamily::of(&fixed), Some(GeometryFamily::Area));
        // Both halves of the bowtie survive.
        let area: f64 = to_multi_polygon(&fixed).expect("area geometry").unsigned_area();
        assert!(area > 1.9 && area < 2.1);
    }

    #[test]
    fn remove_islands_drops_interior_rings() {
        let with_hole = Polygon::new(
            line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            vec![line_string![(x: 4.0, y: 4.0), (x: 6.0, y: 4.0), (x: 6.0, y: 6.0), (x: 4.0, y: 6.0)]],
        );

        let preserved = remove_islands(with_hole.clone().into(), true).expect("preserved");
        assert_eq!(preserved, with_hole.clone().into());

        let filled = remove_islands(with_hole.into(), false).expect("filled");
        match filled {
            Geometry::Polygon(polygon) => assert!(polygon.interiors().is_empty()),
            other => panic!("expected a polygon, got {other:?}"),
        }
    }

    #[test]
    fn remove_islands_passes_lines_through() {
        let line: Geometry<f64> = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into();
        assert_eq!(remove_islands(line.clone(), false), Some(line));
    }

    #[test]
    fn explode_flattens_collections() {
        let collection = GeometryCollection::new_from(vec![
            MultiPoint::new(vec![
                point! { x: 0.0, y: 0.0 },
                point! { x: 1.0, y: 1.0 },
            ])
            .into(),
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into(),
        ]);
        let parts = explode(&Geometry::GeometryCollection(collection));
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn explode_is_idempotent_on_single_parts() {
        let parts = explode(&bowtie().into());
        let again: Vec<_> = parts.iter().flat_map(explode).collect();
        assert_eq!(parts, again);
    }

    #[test]
    fn explode_of_empty_geometry_is_empty() {
        let empty: Geometry<f64> = Polygon::new(LineString::new(Vec::new()), Vec::new()).into();
        assert!(explode(&empty).is_empty());
    }
}
