use crate::domain::model::{
    Coordinate, GeocodeResult, MappingResult, ParkingPlace, VenueQuery,
};
use crate::utils::error::{MapperError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueShape {
    #[default]
    Circle,
    Viewport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    GeoJson,
    Csv,
    Json,
    Zip,
}

impl FromStr for OutputFormat {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geojson" => Ok(OutputFormat::GeoJson),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "zip" => Ok(OutputFormat::Zip),
            other => Err(MapperError::Export {
                message: format!(
                    "unsupported output format '{}'. Valid formats: geojson, csv, json, zip",
                    other
                ),
            }),
        }
    }
}

impl FromStr for VenueShape {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "circle" => Ok(VenueShape::Circle),
            "viewport" => Ok(VenueShape::Viewport),
            other => Err(MapperError::InvalidConfigValue {
                field: "venue_shape".to_string(),
                value: other.to_string(),
                reason: "expected 'circle' or 'viewport'".to_string(),
            }),
        }
    }
}

/// Parses a list of format names, rejecting empty lists and unknown names.
pub fn parse_output_formats<S: AsRef<str>>(names: &[S]) -> Result<Vec<OutputFormat>> {
    if names.is_empty() {
        return Err(MapperError::Export {
            message: "no output formats requested".to_string(),
        });
    }
    let mut formats = Vec::with_capacity(names.len());
    for name in names {
        let format = name.as_ref().parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

pub trait ConfigProvider: Send + Sync {
    fn api_base_url(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn input_file(&self) -> Option<&str>;
    fn venues(&self) -> &[VenueQuery];
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> Result<Vec<OutputFormat>>;
    fn venue_shape(&self) -> VenueShape;
    fn venue_buffer_meters(&self) -> f64;
    fn include_parking(&self) -> bool;
    fn parking_radius_meters(&self) -> u32;
    fn max_parking_areas(&self) -> usize;
}

/// The external mapping provider.
#[async_trait]
pub trait MapsProvider: Send + Sync {
    async fn geocode(&self, query: &str) -> Result<GeocodeResult>;
    async fn nearby_parking(&self, center: Coordinate, radius_meters: u32)
        -> Result<Vec<ParkingPlace>>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<VenueQuery>>;
    async fn transform(&self, queries: Vec<VenueQuery>) -> Result<MappingResult>;
    async fn load(&self, result: MappingResult) -> Result<String>;
}
