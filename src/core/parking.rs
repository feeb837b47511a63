use crate::core::polygon::PolygonGenerator;
use crate::domain::model::{ParkingArea, ParkingKind, ParkingPlace, Venue};
use crate::domain::ports::MapsProvider;
use crate::utils::error::Result;

pub const DEFAULT_PARKING_RADIUS_METERS: u32 = 800;
pub const DEFAULT_MAX_PARKING_AREAS: usize = 15;

impl ParkingKind {
    /// Guesses the kind of parking from its listed name.
    pub fn classify(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.contains("garage") || lower.contains("structure") {
            ParkingKind::Garage
        } else if lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == "lot" || word == "lots")
        {
            ParkingKind::Lot
        } else {
            ParkingKind::Street
        }
    }
}

/// Looks up parking around a resolved venue and builds a polygon for each place.
pub async fn discover_parking<P: MapsProvider + ?Sized>(
    provider: &P,
    generator: &PolygonGenerator,
    venue: &Venue,
    radius_meters: u32,
    max_areas: usize,
) -> Result<Vec<ParkingArea>> {
    let places = provider
        .nearby_parking(venue.coordinate, radius_meters)
        .await?;
    tracing::debug!(
        "Found {} parking places within {}m of {}",
        places.len(),
        radius_meters,
        venue.name
    );

    places
        .into_iter()
        .take(max_areas)
        .map(|place| build_area(generator, venue, place))
        .collect()
}

fn build_area(generator: &PolygonGenerator, venue: &Venue, place: ParkingPlace) -> Result<ParkingArea> {
    let kind = ParkingKind::classify(&place.name);
    let boundary = generator.parking_polygon(kind, place.coordinate)?;
    Ok(ParkingArea {
        venue_name: venue.name.clone(),
        venue_place_id: venue.place_id.clone(),
        name: place.name,
        place_id: place.place_id,
        kind,
        coordinate: place.coordinate,
        boundary,
    })
}
