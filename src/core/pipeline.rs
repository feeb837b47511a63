use crate::core::export;
use crate::core::location::{geocode_query, parse_event_date, parse_location};
use crate::core::parking::discover_parking;
use crate::core::polygon::PolygonGenerator;
use crate::domain::model::{
    MappingResult, ProcessedVenue, ProcessingStats, Venue, VenueFailure, VenueQuery,
};
use crate::domain::ports::{ConfigProvider, MapsProvider, Pipeline, Storage};
use crate::utils::error::{MapperError, Result};
use std::path::Path;

/// Reads venues from a CSV file with a `venue_name` header and optional
/// `location`, `artist` and `date` columns.
pub fn read_venue_csv<P: AsRef<Path>>(path: P) -> Result<Vec<VenueQuery>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path.as_ref())?;

    let mut queries = Vec::new();
    for (index, row) in reader.deserialize::<VenueQuery>().enumerate() {
        let query = row?;
        if query.name.trim().is_empty() {
            return Err(MapperError::Validation {
                message: format!(
                    "row {} of {} has an empty venue_name",
                    index + 2,
                    path.as_ref().display()
                ),
            });
        }
        queries.push(query);
    }
    Ok(queries)
}

pub struct VenuePipeline<S: Storage, C: ConfigProvider, P: MapsProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    pub(crate) provider: P,
    generator: PolygonGenerator,
}

impl<S: Storage, C: ConfigProvider, P: MapsProvider> VenuePipeline<S, C, P> {
    pub fn new(storage: S, config: C, provider: P) -> Self {
        let generator = PolygonGenerator::new(config.venue_shape(), config.venue_buffer_meters());
        Self {
            storage,
            config,
            provider,
            generator,
        }
    }

    async fn process_venue(&self, query: &VenueQuery) -> Result<ProcessedVenue> {
        let location = query
            .location
            .as_deref()
            .map(parse_location)
            .unwrap_or_default();
        let search = geocode_query(&query.name, query.location.as_deref());

        tracing::debug!("Geocoding '{}'", search);
        let geocoded = self.provider.geocode(&search).await?;

        let date = query.date.as_deref().and_then(|raw| {
            let parsed = parse_event_date(raw);
            if parsed.is_none() {
                tracing::warn!("Could not parse event date '{}' for {}", raw, query.name);
            }
            parsed
        });

        let boundary = self
            .generator
            .venue_polygon(geocoded.coordinate, geocoded.viewport.as_ref())?;

        let venue = Venue {
            name: query.name.clone(),
            address: geocoded.formatted_address,
            place_id: geocoded.place_id,
            coordinate: geocoded.coordinate,
            city: location.city,
            state: location.state,
            country: location.country,
            artist: query.artist.clone(),
            date,
            boundary: Some(boundary),
        };

        if let Some(boundary) = &venue.boundary {
            tracing::debug!(
                "Boundary for {} has {} vertices",
                venue.name,
                boundary.vertex_count()
            );
        }

        if !self.config.include_parking() {
            return Ok(ProcessedVenue {
                venue,
                parking: Vec::new(),
                parking_error: None,
            });
        }

        let lookup = discover_parking(
            &self.provider,
            &self.generator,
            &venue,
            self.config.parking_radius_meters(),
            self.config.max_parking_areas(),
        )
        .await;

        match lookup {
            Ok(parking) => Ok(ProcessedVenue {
                venue,
                parking,
                parking_error: None,
            }),
            Err(e) if e.is_fatal_for_batch() => Err(e),
            Err(e) => {
                tracing::warn!("⚠️ Parking lookup failed for '{}': {}", venue.name, e);
                Ok(ProcessedVenue {
                    venue,
                    parking: Vec::new(),
                    parking_error: Some(e.to_string()),
                })
            }
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, P: MapsProvider> Pipeline for VenuePipeline<S, C, P> {
    async fn extract(&self) -> Result<Vec<VenueQuery>> {
        let mut queries = Vec::new();

        if let Some(input) = self.config.input_file() {
            tracing::info!("📥 Reading venues from: {}", input);
            queries.extend(read_venue_csv(input)?);
        }
        queries.extend(self.config.venues().iter().cloned());

        if queries.is_empty() {
            return Err(MapperError::Validation {
                message: "no venues to process; pass --input or --venue".to_string(),
            });
        }

        tracing::info!("📊 Extracted {} venue queries", queries.len());
        Ok(queries)
    }

    async fn transform(&self, queries: Vec<VenueQuery>) -> Result<MappingResult> {
        let mut stats = ProcessingStats::default();
        let mut venues = Vec::new();
        let mut failures = Vec::new();

        for query in queries {
            stats.venues_requested += 1;

            match self.process_venue(&query).await {
                Ok(processed) => {
                    tracing::info!(
                        "📍 {} -> ({:.6}, {:.6}), {} parking areas",
                        processed.venue.name,
                        processed.venue.coordinate.latitude,
                        processed.venue.coordinate.longitude,
                        processed.parking.len()
                    );
                    stats.geocoded_venues += 1;
                    if processed.parking_error.is_some() {
                        stats.failed_parking_lookups += 1;
                    }
                    stats.parking_areas_found += processed.parking.len();
                    stats.total_polygons += processed.polygon_count();
                    venues.push(processed);
                }
                Err(e) if e.is_fatal_for_batch() => {
                    tracing::error!("❌ Aborting batch at '{}': {}", query.name, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("⚠️ Failed to resolve '{}': {}", query.name, e);
                    stats.failed_geocoding += 1;
                    failures.push(VenueFailure {
                        query,
                        error: e.to_string(),
                    });
                }
            }
        }

        if venues.is_empty() {
            return Err(MapperError::NoVenuesResolved {
                attempted: stats.venues_requested,
            });
        }

        Ok(MappingResult {
            venues,
            failures,
            stats,
        })
    }

    async fn load(&self, result: MappingResult) -> Result<String> {
        let formats = self.config.output_formats()?;
        let files = export::render(&result, &formats, chrono::Utc::now())?;

        for (name, data) in &files {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.storage.write_file(name, data).await?;
        }

        tracing::info!(
            "💾 Wrote {} files for {} venues to {}",
            files.len(),
            result.venues.len(),
            self.config.output_path()
        );
        Ok(self.config.output_path().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Coordinate, GeocodeResult, ParkingPlace};
    use crate::domain::ports::{OutputFormat, VenueShape};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::NamedTempFile;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                MapperError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct TestConfig {
        input_file: Option<String>,
        venues: Vec<VenueQuery>,
        include_parking: bool,
    }

    impl TestConfig {
        fn with_venues(venues: Vec<VenueQuery>) -> Self {
            Self {
                input_file: None,
                venues,
                include_parking: true,
            }
        }
    }

    impl ConfigProvider for TestConfig {
        fn api_base_url(&self) -> &str {
            "http://localhost"
        }
        fn request_timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
        fn input_file(&self) -> Option<&str> {
            self.input_file.as_deref()
        }
        fn venues(&self) -> &[VenueQuery] {
            &self.venues
        }
        fn output_path(&self) -> &str {
            "./test-output"
        }
        fn output_formats(&self) -> Result<Vec<OutputFormat>> {
            Ok(vec![OutputFormat::GeoJson, OutputFormat::Csv])
        }
        fn venue_shape(&self) -> VenueShape {
            VenueShape::Circle
        }
        fn venue_buffer_meters(&self) -> f64 {
            150.0
        }
        fn include_parking(&self) -> bool {
            self.include_parking
        }
        fn parking_radius_meters(&self) -> u32 {
            800
        }
        fn max_parking_areas(&self) -> usize {
            2
        }
    }

    /// Resolves queries from a fixed table; anything else is not found.
    struct FakeProvider {
        known: HashMap<String, Coordinate>,
        parking: Vec<ParkingPlace>,
        denied: bool,
        parking_status: Option<&'static str>,
    }

    impl FakeProvider {
        fn new(known: &[(&str, Coordinate)]) -> Self {
            Self {
                known: known
                    .iter()
                    .map(|(q, c)| (q.to_string(), *c))
                    .collect(),
                parking: vec![
                    ParkingPlace {
                        name: "North Garage".to_string(),
                        place_id: "p1".to_string(),
                        coordinate: Coordinate::new(39.667, -105.206),
                    },
                    ParkingPlace {
                        name: "Lot B".to_string(),
                        place_id: "p2".to_string(),
                        coordinate: Coordinate::new(39.664, -105.204),
                    },
                    ParkingPlace {
                        name: "Curbside".to_string(),
                        place_id: "p3".to_string(),
                        coordinate: Coordinate::new(39.663, -105.203),
                    },
                ],
                denied: false,
                parking_status: None,
            }
        }
    }

    #[async_trait]
    impl MapsProvider for FakeProvider {
        async fn geocode(&self, query: &str) -> Result<GeocodeResult> {
            if self.denied {
                return Err(MapperError::InvalidApiKey {
                    message: "denied".to_string(),
                });
            }
            let coordinate = self.known.get(query).copied().ok_or_else(|| MapperError::NotFound {
                query: query.to_string(),
            })?;
            Ok(GeocodeResult {
                coordinate,
                formatted_address: format!("{} (formatted)", query),
                place_id: format!("place:{}", query),
                viewport: None,
            })
        }

        async fn nearby_parking(
            &self,
            _center: Coordinate,
            _radius_meters: u32,
        ) -> Result<Vec<ParkingPlace>> {
            match self.parking_status {
                Some("OVER_QUERY_LIMIT") => Err(MapperError::RateLimited {
                    status: "OVER_QUERY_LIMIT".to_string(),
                    message: "quota exceeded".to_string(),
                }),
                Some(status) => Err(MapperError::Provider {
                    status: status.to_string(),
                    message: "nearby search failed".to_string(),
                }),
                None => Ok(self.parking.clone()),
            }
        }
    }

    fn red_rocks() -> (&'static str, Coordinate) {
        (
            "Red Rocks Amphitheatre, Morrison, CO",
            Coordinate::new(39.6654, -105.2057),
        )
    }

    #[tokio::test]
    async fn test_transform_resolves_and_limits_parking() {
        let config = TestConfig::with_venues(vec![]);
        let pipeline = VenuePipeline::new(MockStorage::new(), config, FakeProvider::new(&[red_rocks()]));

        let queries = vec![VenueQuery::new("Red Rocks Amphitheatre").with_location("Morrison, Colorado")];
        let result = pipeline.transform(queries).await.unwrap();

        assert_eq!(result.venues.len(), 1);
        let processed = &result.venues[0];
        assert_eq!(processed.venue.state, "CO");
        assert_eq!(processed.venue.country, "USA");
        assert_eq!(processed.parking.len(), 2);
        assert_eq!(processed.parking[0].kind, crate::domain::model::ParkingKind::Garage);
        assert_eq!(processed.parking[1].kind, crate::domain::model::ParkingKind::Lot);
        assert_eq!(result.stats.total_polygons, 3);
        assert_eq!(result.stats.parking_areas_found, 2);
    }

    #[tokio::test]
    async fn test_not_found_is_recorded_not_swallowed() {
        let config = TestConfig {
            include_parking: false,
            ..TestConfig::with_venues(vec![])
        };
        let pipeline = VenuePipeline::new(MockStorage::new(), config, FakeProvider::new(&[red_rocks()]));

        let queries = vec![
            VenueQuery::new("Red Rocks Amphitheatre").with_location("Morrison, CO"),
            VenueQuery::new("Imaginary Hall"),
        ];
        let result = pipeline.transform(queries).await.unwrap();

        assert_eq!(result.stats.venues_requested, 2);
        assert_eq!(result.stats.geocoded_venues, 1);
        assert_eq!(result.stats.failed_geocoding, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].query.name, "Imaginary Hall");
        assert!(result.failures[0].error.contains("Imaginary Hall"));
    }

    #[tokio::test]
    async fn test_all_failures_is_an_error() {
        let pipeline = VenuePipeline::new(
            MockStorage::new(),
            TestConfig::with_venues(vec![]),
            FakeProvider::new(&[]),
        );

        let err = pipeline
            .transform(vec![VenueQuery::new("Imaginary Hall")])
            .await
            .unwrap_err();
        assert!(matches!(err, MapperError::NoVenuesResolved { attempted: 1 }));
    }

    #[tokio::test]
    async fn test_invalid_key_aborts_batch() {
        let mut provider = FakeProvider::new(&[red_rocks()]);
        provider.denied = true;
        let pipeline = VenuePipeline::new(MockStorage::new(), TestConfig::with_venues(vec![]), provider);

        let err = pipeline
            .transform(vec![VenueQuery::new("Red Rocks Amphitheatre")])
            .await
            .unwrap_err();
        assert!(matches!(err, MapperError::InvalidApiKey { .. }));
    }

    #[tokio::test]
    async fn test_parking_lookup_failure_keeps_venue() {
        let mut provider = FakeProvider::new(&[red_rocks()]);
        provider.parking_status = Some("INVALID_REQUEST");
        let pipeline = VenuePipeline::new(MockStorage::new(), TestConfig::with_venues(vec![]), provider);

        let result = pipeline
            .transform(vec![VenueQuery::new("Red Rocks Amphitheatre").with_location("Morrison, CO")])
            .await
            .unwrap();

        assert_eq!(result.venues.len(), 1);
        assert!(result.failures.is_empty());
        assert_eq!(result.stats.geocoded_venues, 1);
        assert_eq!(result.stats.failed_geocoding, 0);
        assert_eq!(result.stats.failed_parking_lookups, 1);
        assert_eq!(result.stats.total_polygons, 1);

        let processed = &result.venues[0];
        assert!(processed.parking.is_empty());
        assert!(processed.venue.boundary.is_some());
        assert!(processed
            .parking_error
            .as_deref()
            .is_some_and(|e| e.contains("INVALID_REQUEST")));

        let report = export::report(&result, chrono::Utc::now());
        assert_eq!(report.parking_failures.len(), 1);
        assert_eq!(report.parking_failures[0].venue_name, "Red Rocks Amphitheatre");
    }

    #[tokio::test]
    async fn test_parking_rate_limit_aborts_batch() {
        let mut provider = FakeProvider::new(&[red_rocks()]);
        provider.parking_status = Some("OVER_QUERY_LIMIT");
        let pipeline = VenuePipeline::new(MockStorage::new(), TestConfig::with_venues(vec![]), provider);

        let err = pipeline
            .transform(vec![VenueQuery::new("Red Rocks Amphitheatre").with_location("Morrison, CO")])
            .await
            .unwrap_err();
        assert!(matches!(err, MapperError::RateLimited { .. }));
    }

    #[test]
    fn test_read_venue_csv_rejects_empty_name() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "venue_name,location").unwrap();
        writeln!(file, "The Fillmore,\"San Francisco, CA\"").unwrap();
        writeln!(file, "  ,\"Nashville, TN\"").unwrap();

        match read_venue_csv(file.path()) {
            Err(MapperError::Validation { message }) => {
                assert!(message.contains("row 3"), "unexpected message: {}", message)
            }
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_merges_file_and_cli_venues() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "venue_name,location,artist,date").unwrap();
        writeln!(file, "The Fillmore,\"San Francisco, California\",,2025-03-01").unwrap();
        writeln!(file, "Ryman Auditorium,\"Nashville, TN\",Some Artist,").unwrap();

        let config = TestConfig {
            input_file: Some(file.path().to_str().unwrap().to_string()),
            ..TestConfig::with_venues(vec![VenueQuery::new("Red Rocks Amphitheatre")])
        };
        let pipeline = VenuePipeline::new(MockStorage::new(), config, FakeProvider::new(&[]));

        let queries = pipeline.extract().await.unwrap();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0].location.as_deref(), Some("San Francisco, California"));
        assert_eq!(queries[0].artist, None);
        assert_eq!(queries[1].artist.as_deref(), Some("Some Artist"));
        assert_eq!(queries[1].date, None);
        assert_eq!(queries[2].name, "Red Rocks Amphitheatre");
    }

    #[tokio::test]
    async fn test_extract_without_venues_fails() {
        let pipeline = VenuePipeline::new(
            MockStorage::new(),
            TestConfig::with_venues(vec![]),
            FakeProvider::new(&[]),
        );
        assert!(matches!(
            pipeline.extract().await,
            Err(MapperError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_writes_requested_formats() {
        let storage = MockStorage::new();
        let pipeline = VenuePipeline::new(
            storage.clone(),
            TestConfig::with_venues(vec![]),
            FakeProvider::new(&[red_rocks()]),
        );

        let result = pipeline
            .transform(vec![VenueQuery::new("Red Rocks Amphitheatre").with_location("Morrison, CO")])
            .await
            .unwrap();
        let output = pipeline.load(result).await.unwrap();

        assert_eq!(output, "./test-output");
        let geojson = storage.read_file(export::GEOJSON_FILE).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&geojson).unwrap();
        assert_eq!(value["features"].as_array().unwrap().len(), 4);
        assert!(storage.read_file(export::SUMMARY_CSV_FILE).await.is_ok());
        assert!(storage.read_file(export::COORDINATES_CSV_FILE).await.is_ok());
        assert!(storage.read_file(export::REPORT_FILE).await.is_err());
    }
}
