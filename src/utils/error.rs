use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapperError {
    #[error("Missing API key: environment variable {var} is not set")]
    MissingApiKey { var: String },

    #[error("API key rejected by provider: {message}")]
    InvalidApiKey { message: String },

    #[error("Provider rate limit exceeded ({status}): {message}")]
    RateLimited { status: String, message: String },

    #[error("No result found for '{query}'")]
    NotFound { query: String },

    #[error("Provider error ({status}): {message}")]
    Provider { status: String, message: String },

    #[error("API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Invalid polygon: {reason}")]
    InvalidPolygon { reason: String },

    #[error("Export error: {message}")]
    Export { message: String },

    #[error("None of the {attempted} requested venues could be resolved")]
    NoVenuesResolved { attempted: usize },

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Zip operation failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfig { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Provider,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a run that failed with this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl MapperError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            MapperError::MissingApiKey { .. }
            | MapperError::Config { .. }
            | MapperError::MissingConfig { .. }
            | MapperError::InvalidConfigValue { .. }
            | MapperError::ConfigValidation { .. } => ErrorCategory::Configuration,
            MapperError::InvalidApiKey { .. }
            | MapperError::RateLimited { .. }
            | MapperError::NotFound { .. }
            | MapperError::Provider { .. }
            | MapperError::Api(_) => ErrorCategory::Provider,
            MapperError::InvalidPolygon { .. }
            | MapperError::Export { .. }
            | MapperError::NoVenuesResolved { .. }
            | MapperError::Validation { .. }
            | MapperError::Csv(_)
            | MapperError::Serialization(_) => ErrorCategory::Data,
            MapperError::Io(_) | MapperError::Zip(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MapperError::NotFound { .. } => ErrorSeverity::Low,
            MapperError::RateLimited { .. } | MapperError::Api(_) => ErrorSeverity::Medium,
            MapperError::Io(_) | MapperError::Zip(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    /// Whether a per-venue failure must stop the whole batch instead of being
    /// recorded against that venue.
    pub fn is_fatal_for_batch(&self) -> bool {
        matches!(
            self,
            MapperError::MissingApiKey { .. }
                | MapperError::InvalidApiKey { .. }
                | MapperError::RateLimited { .. }
                | MapperError::Api(_)
                | MapperError::Io(_)
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            MapperError::MissingApiKey { .. } => {
                "Export GOOGLE_MAPS_API_KEY with a key that has the Geocoding and Places APIs enabled"
            }
            MapperError::InvalidApiKey { .. } => {
                "Check that the API key is valid, billing is enabled and the Geocoding/Places APIs are allowed"
            }
            MapperError::RateLimited { .. } => {
                "Wait for the provider quota to reset or raise the quota in the cloud console"
            }
            MapperError::NotFound { .. } => "Add a city and state to the venue location to disambiguate it",
            MapperError::Provider { .. } => "Inspect the provider status message and the venue query",
            MapperError::Api(_) => "Check network connectivity and the configured API base URL",
            MapperError::InvalidPolygon { .. } => "Check the venue coordinates and polygon settings",
            MapperError::Export { .. } => "Use only supported output formats: geojson, csv, json, zip",
            MapperError::NoVenuesResolved { .. } => {
                "Verify the venue names and locations in the input list"
            }
            MapperError::Csv(_) => {
                "Make sure the venue CSV has a header row with at least a venue_name column"
            }
            MapperError::Io(_) => "Check file paths and permissions for input and output locations",
            MapperError::Serialization(_) => "The provider returned an unexpected payload",
            MapperError::Zip(_) => "Check free disk space in the output directory",
            MapperError::Config { .. }
            | MapperError::MissingConfig { .. }
            | MapperError::InvalidConfigValue { .. }
            | MapperError::ConfigValidation { .. } => "Review the CLI flags or TOML configuration",
            MapperError::Validation { .. } => "Review the venue input",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Provider => format!("Google Maps request failed: {}", self),
            ErrorCategory::Data => format!("Could not process venue data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, MapperError>;
