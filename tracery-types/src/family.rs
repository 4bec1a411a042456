//! Classification of geometries into semantic families.

use geo::Geometry;

/// Semantic family of a geometry: what kind of spatial object it describes,
/// regardless of whether it is a single- or multi-part value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryFamily {
    /// Zero-dimensional geometries: points and multi-points.
    Point,
    /// One-dimensional geometries: line strings and multi-line strings.
    Line,
    /// Two-dimensional geometries: polygons, multi-polygons, rectangles and
    /// triangles.
    Area,
}

impl GeometryFamily {
    /// Family of the given geometry. A geometry collection has a family only
    /// if all of its members agree on one.
    pub fn of(geometry: &Geometry<f64>) -> Option<Self> {
        match geometry {
            Geometry::Point(_) | Geometry::MultiPoint(_) => Some(GeometryFamily::Point),
            Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => {
                Some(GeometryFamily::Line)
            }
            Geometry::Polygon(_)
            | Geometry::MultiPolygon(_)
            | Geometry::Rect(_)
            | Geometry::Triangle(_) => Some(GeometryFamily::Area),
            Geometry::GeometryCollection(collection) => {
                let mut family = None;
                for member in &collection.0 {
                    let member_family = GeometryFamily::of(member)?;
                    match family {
                        None => family = Some(member_family),
                        Some(f) if f == member_family => {}
                        Some(_) => return None,
                    }
                }
                family
            }
        }
    }

    /// Topological dimension of geometries in this family.
    pub fn dimensions(&self) -> u8 {
        match self {
            GeometryFamily::Point => 0,
            GeometryFamily::Line => 1,
            GeometryFamily::Area => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, GeometryCollection};

    #[test]
    fn family_of_single_geometries() {
        assert_eq!(
            GeometryFamily::of(&point! { x: 0.0, y: 0.0 }.into()),
            Some(GeometryFamily::Point)
        );
        assert_eq!(
            GeometryFamily::of(&line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into()),
            Some(GeometryFamily::Line)
        );
        assert_eq!(
            GeometryFamily::of(
                &polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)].into()
            ),
            Some(GeometryFamily::Area)
        );
    }

    #[test]
    fn mixed_collection_has_no_family() {
        let collection = GeometryCollection::new_from(vec![
            point! { x: 0.0, y: 0.0 }.into(),
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0)].into(),
        ]);
        assert_eq!(
            GeometryFamily::of(&Geometry::GeometryCollection(collection)),
            None
        );

        let uniform = GeometryCollection::new_from(vec![
            point! { x: 0.0, y: 0.0 }.into(),
            point! { x: 1.0, y: 1.0 }.into(),
        ]);
        assert_eq!(
            GeometryFamily::of(&Geometry::GeometryCollection(uniform)),
            Some(GeometryFamily::Point)
        );
    }
}
