use crate::adapters::google_maps::{ApiKey, GoogleMapsClient};
use crate::adapters::storage::LocalStorage;
use crate::core::engine::MappingEngine;
use crate::core::pipeline::VenuePipeline;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::Validate;

/// Validates the configuration and the API key before any request is made,
/// then runs the pipeline against Google Maps. Returns the output directory,
/// or `None` for a dry run.
pub async fn execute<C>(config: C, api_key: Result<ApiKey>, dry_run: bool) -> Result<Option<String>>
where
    C: ConfigProvider + Validate,
{
    config.validate()?;
    let api_key = api_key?;
    tracing::info!("✅ Configuration validated, using key {:?}", api_key);

    let storage = LocalStorage::new(config.output_path().to_string());
    let client = GoogleMapsClient::from_config(api_key, &config);
    let engine = MappingEngine::new(VenuePipeline::new(storage, config, client));

    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - no requests will be sent");
        let queries = engine.dry_run().await?;
        tracing::info!("🔍 {} venues would be processed", queries.len());
        return Ok(None);
    }

    engine.run().await.map(Some)
}
