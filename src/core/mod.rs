pub mod engine;
pub mod export;
pub mod location;
pub mod parking;
pub mod pipeline;
pub mod polygon;

pub use crate::domain::model::{MappingResult, VenueQuery};
pub use crate::domain::ports::{ConfigProvider, MapsProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
