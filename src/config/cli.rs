use crate::adapters::google_maps::DEFAULT_BASE_URL;
use crate::core::parking::{DEFAULT_MAX_PARKING_AREAS, DEFAULT_PARKING_RADIUS_METERS};
use crate::core::polygon::DEFAULT_VENUE_BUFFER_METERS;
use crate::domain::model::VenueQuery;
use crate::domain::ports::{parse_output_formats, ConfigProvider, OutputFormat, VenueShape};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use clap::Parser;
use std::time::Duration;

use super::{DEFAULT_TIMEOUT_SECONDS, MAX_PARKING_RADIUS_METERS};

#[derive(Debug, Clone, Parser)]
#[command(name = "venue-mapper")]
#[command(about = "Geocode venues, outline nearby parking and export GeoJSON/CSV")]
pub struct CliConfig {
    /// Load settings from a TOML file instead of the flags below
    #[arg(
        short,
        long,
        conflicts_with_all = [
            "input",
            "venues",
            "output_path",
            "formats",
            "venue_shape",
            "venue_buffer",
            "no_parking",
            "parking_radius",
            "max_parking",
            "api_base_url",
            "timeout",
        ]
    )]
    pub config: Option<String>,

    /// CSV file with a venue_name column and optional location, artist, date
    #[arg(long)]
    pub input: Option<String>,

    /// Venue as "Name|City, State|Artist|Date" (repeatable)
    #[arg(long = "venue")]
    pub venues: Vec<VenueQuery>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, value_delimiter = ',', default_value = "geojson,csv,json")]
    pub formats: Vec<String>,

    /// circle or viewport
    #[arg(long, default_value = "circle")]
    pub venue_shape: VenueShape,

    #[arg(long, default_value_t = DEFAULT_VENUE_BUFFER_METERS)]
    pub venue_buffer: f64,

    /// Skip the nearby parking search
    #[arg(long)]
    pub no_parking: bool,

    #[arg(long, default_value_t = DEFAULT_PARKING_RADIUS_METERS)]
    pub parking_radius: u32,

    #[arg(long, default_value_t = DEFAULT_MAX_PARKING_AREAS)]
    pub max_parking: usize,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub api_base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout: u64,

    /// Show the queries that would be sent without calling the provider
    #[arg(long)]
    pub dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,
}

impl ConfigProvider for CliConfig {
    fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    fn input_file(&self) -> Option<&str> {
        self.input.as_deref()
    }

    fn venues(&self) -> &[VenueQuery] {
        &self.venues
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_formats(&self) -> Result<Vec<OutputFormat>> {
        parse_output_formats(&self.formats)
    }

    fn venue_shape(&self) -> VenueShape {
        self.venue_shape
    }

    fn venue_buffer_meters(&self) -> f64 {
        self.venue_buffer
    }

    fn include_parking(&self) -> bool {
        !self.no_parking
    }

    fn parking_radius_meters(&self) -> u32 {
        self.parking_radius
    }

    fn max_parking_areas(&self) -> usize {
        self.max_parking
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api_base_url", &self.api_base_url)?;
        validate_path("output_path", &self.output_path)?;
        if let Some(input) = &self.input {
            validate_non_empty_string("input", input)?;
            validate_path("input", input)?;
        }
        parse_output_formats(&self.formats)?;
        validate_range("venue_buffer", self.venue_buffer, 1.0, 10_000.0)?;
        validate_range("parking_radius", self.parking_radius, 1, MAX_PARKING_RADIUS_METERS)?;
        validate_positive_number("max_parking", self.max_parking, 1)?;
        validate_range("timeout", self.timeout, 1, 300)?;
        Ok(())
    }
}
