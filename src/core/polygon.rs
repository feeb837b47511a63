use crate::domain::model::{BoundaryPolygon, Coordinate, ParkingKind, Viewport};
use crate::domain::ports::VenueShape;
use crate::utils::error::{MapperError, Result};
use std::f64::consts::PI;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;
pub const DEFAULT_VENUE_BUFFER_METERS: f64 = 150.0;
pub const VENUE_POLYGON_POINTS: usize = 20;

/// Buffer radius and vertex count used for each kind of parking.
pub fn parking_footprint(kind: ParkingKind) -> (f64, usize) {
    match kind {
        ParkingKind::Garage => (50.0, 8),
        ParkingKind::Lot => (80.0, 12),
        ParkingKind::Street => (20.0, 8),
    }
}

/// Approximates a circle of `radius_meters` around `center` on a spherical earth.
pub fn circle(center: Coordinate, radius_meters: f64, points: usize) -> Result<BoundaryPolygon> {
    if points < 3 {
        return Err(MapperError::InvalidPolygon {
            reason: format!("a circle needs at least 3 points, got {}", points),
        });
    }
    if !(radius_meters.is_finite() && radius_meters > 0.0) {
        return Err(MapperError::InvalidPolygon {
            reason: format!("radius must be positive, got {}", radius_meters),
        });
    }
    if !center.is_finite() {
        return Err(MapperError::InvalidPolygon {
            reason: format!("center {:?} is not finite", center),
        });
    }

    let cos_lat = center.latitude.to_radians().cos();
    if cos_lat.abs() < 1e-9 {
        return Err(MapperError::InvalidPolygon {
            reason: format!("cannot buffer a point at latitude {}", center.latitude),
        });
    }

    let ring = (0..points)
        .map(|i| {
            let angle = (i as f64) * 2.0 * PI / (points as f64);
            let delta_lat = (radius_meters * angle.cos()) / EARTH_RADIUS_METERS;
            let delta_lng = (radius_meters * angle.sin()) / (EARTH_RADIUS_METERS * cos_lat);
            Coordinate::new(
                center.latitude + delta_lat.to_degrees(),
                center.longitude + delta_lng.to_degrees(),
            )
        })
        .collect();

    BoundaryPolygon::from_coordinates(ring)
}

/// Rectangle spanning the viewport, counter-clockwise from the south-west corner.
pub fn viewport_rectangle(viewport: &Viewport) -> Result<BoundaryPolygon> {
    let sw = viewport.southwest;
    let ne = viewport.northeast;
    BoundaryPolygon::from_coordinates(vec![
        Coordinate::new(sw.latitude, sw.longitude),
        Coordinate::new(sw.latitude, ne.longitude),
        Coordinate::new(ne.latitude, ne.longitude),
        Coordinate::new(ne.latitude, sw.longitude),
    ])
}

#[derive(Debug, Clone, Copy)]
pub struct PolygonGenerator {
    shape: VenueShape,
    venue_buffer_meters: f64,
}

impl Default for PolygonGenerator {
    fn default() -> Self {
        Self::new(VenueShape::Circle, DEFAULT_VENUE_BUFFER_METERS)
    }
}

impl PolygonGenerator {
    pub fn new(shape: VenueShape, venue_buffer_meters: f64) -> Self {
        Self {
            shape,
            venue_buffer_meters,
        }
    }

    pub fn venue_polygon(
        &self,
        center: Coordinate,
        viewport: Option<&Viewport>,
    ) -> Result<BoundaryPolygon> {
        if self.shape == VenueShape::Viewport {
            match viewport {
                Some(vp) if !vp.is_degenerate() => return viewport_rectangle(vp),
                _ => tracing::debug!(
                    "No usable viewport for venue at {:?}, falling back to circle",
                    center
                ),
            }
        }
        circle(center, self.venue_buffer_meters, VENUE_POLYGON_POINTS)
    }

    pub fn parking_polygon(&self, kind: ParkingKind, center: Coordinate) -> Result<BoundaryPolygon> {
        let (radius, points) = parking_footprint(kind);
        circle(center, radius, points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
        let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlng = (b.longitude - a.longitude).to_radians();
        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
    }

    #[test]
    fn test_circle_is_closed_with_expected_vertices() {
        let center = Coordinate::new(39.6654, -105.2057);
        let polygon = circle(center, 150.0, 20).unwrap();
        let ring = polygon.exterior();

        assert_eq!(ring.len(), 21);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_circle_vertices_are_at_radius() {
        let center = Coordinate::new(51.5074, -0.1278);
        let polygon = circle(center, 80.0, 12).unwrap();
        for vertex in polygon.exterior() {
            let distance = haversine_meters(center, vertex);
            assert!((distance - 80.0).abs() < 0.5, "distance was {}", distance);
        }
    }

    #[test]
    fn test_first_vertex_is_due_north() {
        let center = Coordinate::new(0.0, 0.0);
        let ring = circle(center, 100.0, 8).unwrap().exterior();
        assert!(ring[0].latitude > 0.0);
        assert!(ring[0].longitude.abs() < 1e-12);
    }

    #[test]
    fn test_circle_rejects_bad_input() {
        let center = Coordinate::new(10.0, 10.0);
        assert!(circle(center, 100.0, 2).is_err());
        assert!(circle(center, 0.0, 8).is_err());
        assert!(circle(center, -5.0, 8).is_err());
        assert!(circle(Coordinate::new(90.0, 0.0), 100.0, 8).is_err());
        assert!(circle(Coordinate::new(f64::NAN, 0.0), 100.0, 8).is_err());
    }

    #[test]
    fn test_parking_polygons_follow_kind() {
        let generator = PolygonGenerator::default();
        let center = Coordinate::new(40.0, -74.0);

        let garage = generator.parking_polygon(ParkingKind::Garage, center).unwrap();
        let lot = generator.parking_polygon(ParkingKind::Lot, center).unwrap();
        let street = generator.parking_polygon(ParkingKind::Street, center).unwrap();

        assert_eq!(garage.vertex_count(), 9);
        assert_eq!(lot.vertex_count(), 13);
        assert_eq!(street.vertex_count(), 9);
    }

    #[test]
    fn test_viewport_shape() {
        let generator = PolygonGenerator::new(VenueShape::Viewport, 150.0);
        let viewport = Viewport {
            northeast: Coordinate::new(39.6668, -105.2043),
            southwest: Coordinate::new(39.6641, -105.2070),
        };
        let center = Coordinate::new(39.6654, -105.2057);

        let polygon = generator.venue_polygon(center, Some(&viewport)).unwrap();
        let ring = polygon.exterior();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], viewport.southwest);
        assert_eq!(ring[2], viewport.northeast);

        let degenerate = Viewport {
            northeast: center,
            southwest: center,
        };
        let fallback = generator.venue_polygon(center, Some(&degenerate)).unwrap();
        assert_eq!(fallback.vertex_count(), VENUE_POLYGON_POINTS + 1);
    }
}
