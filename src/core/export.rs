use crate::domain::model::{
    BoundaryPolygon, Coordinate, MappingResult, ProcessedVenue, ProcessingStats, VenueFailure,
};
use crate::domain::ports::OutputFormat;
use crate::utils::error::{MapperError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const EXPORT_SOURCE: &str = "venue-mapper";
pub const GEOJSON_FILE: &str = "venues.geojson";
pub const SUMMARY_CSV_FILE: &str = "venues.csv";
pub const COORDINATES_CSV_FILE: &str = "coordinates.csv";
pub const REPORT_FILE: &str = "report.json";
pub const ZIP_FILE: &str = "venue_export.zip";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point([f64; 2]),
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl Geometry {
    fn polygon(boundary: &BoundaryPolygon) -> Self {
        Geometry::Polygon(vec![boundary
            .exterior()
            .into_iter()
            .map(Coordinate::to_lon_lat)
            .collect()])
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::Polygon(_) => "Polygon",
        }
    }

    /// Positions in GeoJSON order, rings flattened.
    pub fn positions(&self) -> Vec<[f64; 2]> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub feature_id: String,
    pub kind: String,
    pub venue_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub venue_place_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parking_place_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Geometry,
    pub properties: FeatureProperties,
}

impl Feature {
    fn new(geometry: Geometry, properties: FeatureProperties) -> Self {
        Self {
            kind: "Feature".to_string(),
            geometry,
            properties,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub generated_at: String,
    pub total_venues: usize,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<Feature>,
    pub metadata: ExportMetadata,
}

/// One row of `venues.csv` and of the report's venue list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueSummaryRow {
    pub venue_name: String,
    pub address: String,
    pub place_id: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub artist: String,
    pub date: String,
    pub latitude: f64,
    pub longitude: f64,
    pub parking_count: usize,
}

/// One position of one feature in `coordinates.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinateRow {
    pub feature_id: String,
    pub kind: String,
    pub geometry_type: String,
    pub venue_name: String,
    pub parking_name: String,
    pub parking_type: String,
    pub vertex_index: usize,
    pub longitude: f64,
    pub latitude: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub source: String,
    pub total_venues: usize,
    pub total_failures: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub metadata: ReportMetadata,
    pub statistics: ProcessingStats,
    pub venues: Vec<VenueSummaryRow>,
    pub failures: Vec<VenueFailure>,
    #[serde(default)]
    pub parking_failures: Vec<ParkingLookupFailure>,
}

/// A resolved venue whose parking lookup failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingLookupFailure {
    pub venue_name: String,
    pub place_id: String,
    pub error: String,
}

fn venue_properties(entry: &ProcessedVenue, feature_id: String, kind: &str) -> FeatureProperties {
    let venue = &entry.venue;
    FeatureProperties {
        feature_id,
        kind: kind.to_string(),
        venue_name: venue.name.clone(),
        venue_place_id: Some(venue.place_id.clone()),
        address: Some(venue.address.clone()),
        city: Some(venue.city.clone()),
        state: Some(venue.state.clone()),
        country: Some(venue.country.clone()),
        artist: venue.artist.clone(),
        date: venue.date.map(|d| d.to_string()),
        ..FeatureProperties::default()
    }
}

/// Every feature exported for a venue set. Both the GeoJSON and the
/// flattened CSV are produced from this list.
pub fn build_features(venues: &[ProcessedVenue]) -> Vec<Feature> {
    let mut features = Vec::new();

    for (i, entry) in venues.iter().enumerate() {
        let n = i + 1;
        let venue = &entry.venue;

        features.push(Feature::new(
            Geometry::Point(venue.coordinate.to_lon_lat()),
            venue_properties(entry, format!("v{}", n), "venue_point"),
        ));

        if let Some(boundary) = &venue.boundary {
            features.push(Feature::new(
                Geometry::polygon(boundary),
                venue_properties(entry, format!("v{}-boundary", n), "venue"),
            ));
        }

        for (j, parking) in entry.parking.iter().enumerate() {
            features.push(Feature::new(
                Geometry::polygon(&parking.boundary),
                FeatureProperties {
                    feature_id: format!("v{}-p{}", n, j + 1),
                    kind: "parking".to_string(),
                    venue_name: venue.name.clone(),
                    venue_place_id: Some(parking.venue_place_id.clone()),
                    artist: venue.artist.clone(),
                    date: venue.date.map(|d| d.to_string()),
                    parking_name: Some(parking.name.clone()),
                    parking_type: Some(parking.kind.as_str().to_string()),
                    parking_place_id: Some(parking.place_id.clone()),
                    ..FeatureProperties::default()
                },
            ));
        }
    }

    features
}

pub fn to_geojson(venues: &[ProcessedVenue], generated_at: DateTime<Utc>) -> FeatureCollection {
    FeatureCollection {
        kind: "FeatureCollection".to_string(),
        features: build_features(venues),
        metadata: ExportMetadata {
            generated_at: generated_at.to_rfc3339(),
            total_venues: venues.len(),
            source: EXPORT_SOURCE.to_string(),
        },
    }
}

pub fn summary_rows(venues: &[ProcessedVenue]) -> Vec<VenueSummaryRow> {
    venues
        .iter()
        .map(|entry| {
            let v = &entry.venue;
            VenueSummaryRow {
                venue_name: v.name.clone(),
                address: v.address.clone(),
                place_id: v.place_id.clone(),
                city: v.city.clone(),
                state: v.state.clone(),
                country: v.country.clone(),
                artist: v.artist.clone().unwrap_or_default(),
                date: v.date.map(|d| d.to_string()).unwrap_or_default(),
                latitude: v.coordinate.latitude,
                longitude: v.coordinate.longitude,
                parking_count: entry.parking.len(),
            }
        })
        .collect()
}

pub fn coordinate_rows(features: &[Feature]) -> Vec<CoordinateRow> {
    features
        .iter()
        .flat_map(|feature| {
            let props = &feature.properties;
            feature
                .geometry
                .positions()
                .into_iter()
                .enumerate()
                .map(move |(vertex_index, [longitude, latitude])| CoordinateRow {
                    feature_id: props.feature_id.clone(),
                    kind: props.kind.clone(),
                    geometry_type: feature.geometry.type_name().to_string(),
                    venue_name: props.venue_name.clone(),
                    parking_name: props.parking_name.clone().unwrap_or_default(),
                    parking_type: props.parking_type.clone().unwrap_or_default(),
                    vertex_index,
                    longitude,
                    latitude,
                })
        })
        .collect()
}

fn write_csv<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    writer.into_inner().map_err(|e| MapperError::Export {
        message: format!("failed to finish CSV output: {}", e),
    })
}

pub fn summary_csv(venues: &[ProcessedVenue]) -> Result<Vec<u8>> {
    write_csv(&summary_rows(venues))
}

pub fn coordinates_csv(venues: &[ProcessedVenue]) -> Result<Vec<u8>> {
    write_csv(&coordinate_rows(&build_features(venues)))
}

pub fn report(result: &MappingResult, generated_at: DateTime<Utc>) -> ExportReport {
    ExportReport {
        metadata: ReportMetadata {
            generated_at: generated_at.to_rfc3339(),
            source: EXPORT_SOURCE.to_string(),
            total_venues: result.venues.len(),
            total_failures: result.failures.len(),
        },
        statistics: result.stats.clone(),
        venues: summary_rows(&result.venues),
        failures: result.failures.clone(),
        parking_failures: result
            .venues
            .iter()
            .filter_map(|entry| {
                entry.parking_error.as_ref().map(|error| ParkingLookupFailure {
                    venue_name: entry.venue.name.clone(),
                    place_id: entry.venue.place_id.clone(),
                    error: error.clone(),
                })
            })
            .collect(),
    }
}

/// Renders the requested formats into `(file name, contents)` pairs.
pub fn render(
    result: &MappingResult,
    formats: &[OutputFormat],
    generated_at: DateTime<Utc>,
) -> Result<Vec<(String, Vec<u8>)>> {
    if formats.is_empty() {
        return Err(MapperError::Export {
            message: "no output formats requested".to_string(),
        });
    }

    let wants = |f: OutputFormat| formats.contains(&f) || formats.contains(&OutputFormat::Zip);
    let mut files = Vec::new();

    if wants(OutputFormat::GeoJson) {
        let geojson = to_geojson(&result.venues, generated_at);
        files.push((GEOJSON_FILE.to_string(), serde_json::to_vec_pretty(&geojson)?));
    }
    if wants(OutputFormat::Csv) {
        files.push((SUMMARY_CSV_FILE.to_string(), summary_csv(&result.venues)?));
        files.push((COORDINATES_CSV_FILE.to_string(), coordinates_csv(&result.venues)?));
    }
    if wants(OutputFormat::Json) {
        let report = report(result, generated_at);
        files.push((REPORT_FILE.to_string(), serde_json::to_vec_pretty(&report)?));
    }

    if formats.contains(&OutputFormat::Zip) {
        let archive = zip_bundle(&files)?;
        // only the formats asked for by name stay as loose files
        files.retain(|(name, _)| {
            let format = match name.as_str() {
                GEOJSON_FILE => OutputFormat::GeoJson,
                REPORT_FILE => OutputFormat::Json,
                _ => OutputFormat::Csv,
            };
            formats.contains(&format)
        });
        files.push((ZIP_FILE.to_string(), archive));
    }

    Ok(files)
}

pub fn zip_bundle(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(data)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
