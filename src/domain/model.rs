use crate::utils::error::{MapperError, Result};
use chrono::NaiveDate;
use geo_types::{Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// GeoJSON position order.
    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Coord {
            x: c.longitude,
            y: c.latitude,
        }
    }
}

impl From<Coord<f64>> for Coordinate {
    fn from(c: Coord<f64>) -> Self {
        Coordinate::new(c.y, c.x)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub northeast: Coordinate,
    pub southwest: Coordinate,
}

impl Viewport {
    pub fn is_degenerate(&self) -> bool {
        self.northeast.latitude <= self.southwest.latitude
            || self.northeast.longitude == self.southwest.longitude
    }
}

/// One venue to resolve, as read from the input list or the command line.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VenueQuery {
    #[serde(rename = "venue_name", alias = "name")]
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub artist: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date: Option<String>,
}

impl VenueQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// `Name|Location|Artist|Date`, trailing parts optional.
impl FromStr for VenueQuery {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('|').map(str::trim);
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(MapperError::Validation {
                message: format!("venue '{}' has an empty name", s),
            });
        }
        let mut next_part = || {
            parts
                .next()
                .filter(|p| !p.is_empty())
                .map(str::to_string)
        };
        Ok(Self {
            name: name.to_string(),
            location: next_part(),
            artist: next_part(),
            date: next_part(),
        })
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
}

/// A single closed exterior ring with at least three distinct vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPolygon {
    polygon: Polygon<f64>,
}

impl BoundaryPolygon {
    /// Builds a polygon from ring vertices, closing the ring when the first
    /// and last vertex differ.
    pub fn from_coordinates(mut ring: Vec<Coordinate>) -> Result<Self> {
        if let Some(bad) = ring.iter().find(|c| !c.is_finite()) {
            return Err(MapperError::InvalidPolygon {
                reason: format!("non-finite vertex {:?}", bad),
            });
        }

        let distinct: HashSet<(u64, u64)> = ring
            .iter()
            .map(|c| ((c.longitude + 0.0).to_bits(), (c.latitude + 0.0).to_bits()))
            .collect();
        if distinct.len() < 3 {
            return Err(MapperError::InvalidPolygon {
                reason: format!(
                    "ring needs at least 3 distinct vertices, got {}",
                    distinct.len()
                ),
            });
        }

        if ring.first() != ring.last() {
            ring.push(ring[0]);
        }

        let exterior: LineString<f64> = ring.into_iter().map(Coord::from).collect();
        Ok(Self {
            polygon: Polygon::new(exterior, vec![]),
        })
    }

    pub fn exterior(&self) -> Vec<Coordinate> {
        self.polygon
            .exterior()
            .coords()
            .copied()
            .map(Coordinate::from)
            .collect()
    }

    /// Vertices of the ring, closing vertex included.
    pub fn vertex_count(&self) -> usize {
        self.polygon.exterior().0.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParkingKind {
    Garage,
    Lot,
    Street,
}

impl ParkingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParkingKind::Garage => "garage",
            ParkingKind::Lot => "lot",
            ParkingKind::Street => "street",
        }
    }
}

/// Result of a successful geocode.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub coordinate: Coordinate,
    pub formatted_address: String,
    pub place_id: String,
    pub viewport: Option<Viewport>,
}

/// A parking place returned by the nearby search.
#[derive(Debug, Clone, PartialEq)]
pub struct ParkingPlace {
    pub name: String,
    pub place_id: String,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub name: String,
    pub address: String,
    pub place_id: String,
    pub coordinate: Coordinate,
    pub city: String,
    pub state: String,
    pub country: String,
    pub artist: Option<String>,
    pub date: Option<NaiveDate>,
    pub boundary: Option<BoundaryPolygon>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParkingArea {
    pub venue_name: String,
    pub venue_place_id: String,
    pub name: String,
    pub place_id: String,
    pub kind: ParkingKind,
    pub coordinate: Coordinate,
    pub boundary: BoundaryPolygon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedVenue {
    pub venue: Venue,
    pub parking: Vec<ParkingArea>,
    /// Set when the venue resolved but its parking lookup did not.
    pub parking_error: Option<String>,
}

impl ProcessedVenue {
    pub fn polygon_count(&self) -> usize {
        usize::from(self.venue.boundary.is_some()) + self.parking.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueFailure {
    pub query: VenueQuery,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub venues_requested: usize,
    pub geocoded_venues: usize,
    pub failed_geocoding: usize,
    pub parking_areas_found: usize,
    #[serde(default)]
    pub failed_parking_lookups: usize,
    pub total_polygons: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MappingResult {
    pub venues: Vec<ProcessedVenue>,
    pub failures: Vec<VenueFailure>,
    pub stats: ProcessingStats,
}
