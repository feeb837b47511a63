use crate::core::location::geocode_query;
use crate::domain::model::VenueQuery;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

pub struct MappingEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> MappingEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting venue mapping");

        let queries = self.pipeline.extract().await?;

        tracing::info!("🔧 Resolving {} venues", queries.len());
        let result = self.pipeline.transform(queries).await?;
        tracing::info!(
            "✅ Resolved {}/{} venues, {} polygons",
            result.stats.geocoded_venues,
            result.stats.venues_requested,
            result.stats.total_polygons
        );
        if !result.failures.is_empty() {
            tracing::warn!("⚠️ {} venues could not be resolved", result.failures.len());
        }

        let output_path = self.pipeline.load(result).await?;
        tracing::info!("📁 Output saved to: {}", output_path);

        Ok(output_path)
    }

    /// Reads the venue list and reports the provider queries that a real run
    /// would send, without calling the provider.
    pub async fn dry_run(&self) -> Result<Vec<VenueQuery>> {
        let queries = self.pipeline.extract().await?;
        for query in &queries {
            tracing::info!(
                "🔍 Would geocode: {}",
                geocode_query(&query.name, query.location.as_deref())
            );
        }
        Ok(queries)
    }
}
