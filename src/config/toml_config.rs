use crate::adapters::google_maps::{ApiKey, API_KEY_ENV, DEFAULT_BASE_URL};
use crate::core::parking::{DEFAULT_MAX_PARKING_AREAS, DEFAULT_PARKING_RADIUS_METERS};
use crate::core::polygon::DEFAULT_VENUE_BUFFER_METERS;
use crate::domain::model::VenueQuery;
use crate::domain::ports::{parse_output_formats, ConfigProvider, OutputFormat, VenueShape};
use crate::utils::error::{MapperError, Result};
use crate::utils::validation::{
    validate_path, validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{DEFAULT_TIMEOUT_SECONDS, MAX_PARKING_RADIUS_METERS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub parking: ParkingConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    pub file: Option<String>,
    #[serde(default)]
    pub venues: Vec<VenueQuery>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeometryConfig {
    pub venue_shape: Option<VenueShape>,
    pub venue_buffer_meters: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParkingConfig {
    pub enabled: Option<bool>,
    pub radius_meters: Option<u32>,
    pub max_areas: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub formats: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    pub json: Option<bool>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MapperError::ConfigValidation {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the value of the environment variable. Unset
    /// variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MapperError::Config {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// The configured key, falling back to `GOOGLE_MAPS_API_KEY`.
    pub fn api_key(&self) -> Result<ApiKey> {
        match &self.provider.api_key {
            Some(value) => ApiKey::from_value(Some(value.clone())),
            None => ApiKey::from_value(std::env::var(API_KEY_ENV).ok()),
        }
    }

    pub fn verbose(&self) -> bool {
        self.logging.verbose.unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.logging.json.unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn api_base_url(&self) -> &str {
        self.provider.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.provider
                .timeout_seconds
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        )
    }

    fn input_file(&self) -> Option<&str> {
        self.input.file.as_deref()
    }

    fn venues(&self) -> &[VenueQuery] {
        &self.input.venues
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_formats(&self) -> Result<Vec<OutputFormat>> {
        parse_output_formats(&self.output.formats)
    }

    fn venue_shape(&self) -> VenueShape {
        self.geometry.venue_shape.unwrap_or_default()
    }

    fn venue_buffer_meters(&self) -> f64 {
        self.geometry
            .venue_buffer_meters
            .unwrap_or(DEFAULT_VENUE_BUFFER_METERS)
    }

    fn include_parking(&self) -> bool {
        self.parking.enabled.unwrap_or(true)
    }

    fn parking_radius_meters(&self) -> u32 {
        self.parking
            .radius_meters
            .unwrap_or(DEFAULT_PARKING_RADIUS_METERS)
    }

    fn max_parking_areas(&self) -> usize {
        self.parking.max_areas.unwrap_or(DEFAULT_MAX_PARKING_AREAS)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("provider.base_url", self.api_base_url())?;
        validate_path("output.path", &self.output.path)?;
        if let Some(file) = &self.input.file {
            validate_path("input.file", file)?;
        }
        parse_output_formats(&self.output.formats)?;
        validate_range(
            "geometry.venue_buffer_meters",
            self.venue_buffer_meters(),
            1.0,
            10_000.0,
        )?;
        validate_range(
            "parking.radius_meters",
            self.parking_radius_meters(),
            1,
            MAX_PARKING_RADIUS_METERS,
        )?;
        validate_positive_number("parking.max_areas", self.max_parking_areas(), 1)?;
        if let Some(timeout) = self.provider.timeout_seconds {
            validate_range("provider.timeout_seconds", timeout, 1, 300)?;
        }
        Ok(())
    }
}
