use corpus_core::completion::CompletionError;

use crate::extractor::EntityExtractor;
use crate::loader::GraphLoader;
use crate::report::LoadReport;

/// Extract entities from raw text and load them.
///
/// A completion failure aborts before anything is written; per-entity load
/// failures end up in the report.
pub async fn ingest_text(
    extractor: &EntityExtractor,
    loader: &GraphLoader,
    text: &str,
) -> Result<LoadReport, CompletionError> {
    let entities = extractor.extract(text).await?;
    if entities.is_empty() {
        tracing::info!("No entities extracted, nothing to load");
        return Ok(LoadReport::default());
    }

    let report = loader.load_entities(entities).await;
    tracing::info!(%report, "Text ingested");
    Ok(report)
}
