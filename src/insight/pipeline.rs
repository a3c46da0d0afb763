//! Asks the model for a short commentary on every stored expense record.

use std::sync::Arc;

use crate::{
    Error,
    ai::{AiInvoker, GenerateRequest, Part, first_candidate_text},
    prompts::INSIGHT_PROMPT,
    record::{ExpenseRecord, RecordStore},
};

/// Returned instead of an insight when there are no records yet.
pub const EMPTY_INSIGHT_MESSAGE: &str =
    "Não há dados de despesas para analisar. Comece escaneando alguns cupons!";

/// Turns the stored expense records into a paragraph of financial advice.
#[derive(Clone)]
pub struct InsightPipeline {
    ai: Arc<dyn AiInvoker>,
    store: Arc<dyn RecordStore>,
}

impl InsightPipeline {
    /// Create a pipeline from its collaborators.
    pub fn new(ai: Arc<dyn AiInvoker>, store: Arc<dyn RecordStore>) -> Self {
        Self { ai, store }
    }

    /// Generate an insight about every record currently in the store.
    ///
    /// The records are sent to the model as one JSON array, in store order.
    /// With an empty store, [EMPTY_INSIGHT_MESSAGE] is returned and the model
    /// is not called. The model's text is returned as is.
    ///
    /// # Errors
    /// - Any error from reading the store.
    /// - [Error::AIInvocationFailed] if the model call failed.
    /// - [Error::EmptyAIResponse] if the model returned no text.
    pub async fn generate_insight(&self) -> Result<String, Error> {
        let stored_records = self.store.get_all().await?;

        if stored_records.is_empty() {
            tracing::info!("No records to analyse, returning the empty-state message");
            return Ok(EMPTY_INSIGHT_MESSAGE.to_owned());
        }

        let records: Vec<&ExpenseRecord> = stored_records
            .iter()
            .map(|stored| &stored.record)
            .collect();
        let records_json = serde_json::to_string(&records)
            .map_err(|error| Error::JSONSerializationError(error.to_string()))?;

        tracing::info!("Generating an insight from {} records", records.len());

        let request = GenerateRequest::new(INSIGHT_PROMPT, vec![Part::text(records_json)]);
        let response = self.ai.generate(request).await?;
        let insight = first_candidate_text(&response)?;

        tracing::debug!("Insight generated: {insight}");

        Ok(insight.to_owned())
    }
}
