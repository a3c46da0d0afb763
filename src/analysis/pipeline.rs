//! Extracts an expense record from a receipt image and stores it.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    Error,
    ai::{AiInvoker, GenerateRequest, Part, first_candidate_text},
    fetch::ImageFetcher,
    prompts::RECEIPT_EXTRACTION_PROMPT,
    record::{ExpenseRecord, RecordStore},
};

/// The MIME type receipt images are sent to the model with.
pub const RECEIPT_IMAGE_MIME_TYPE: &str = "image/jpeg";

/// The MIME type the model is asked to answer with.
const JSON_MIME_TYPE: &str = "application/json";

/// The result of a successful analysis.
#[derive(Debug, PartialEq)]
pub struct AnalysisOutcome {
    /// The record extracted from the receipt, exactly as the model produced it.
    pub record: ExpenseRecord,

    /// Set when the record could not be saved.
    ///
    /// Saving is best effort: the model has already been paid for, so the
    /// record is returned even when it was not stored.
    pub persistence_warning: Option<Error>,
}

/// Turns a receipt image URL into a stored expense record.
///
/// The steps run in order and any failure except saving the record aborts
/// the analysis. Nothing is retried.
#[derive(Clone)]
pub struct ImageAnalysisPipeline {
    fetcher: Arc<dyn ImageFetcher>,
    ai: Arc<dyn AiInvoker>,
    store: Arc<dyn RecordStore>,
}

impl ImageAnalysisPipeline {
    /// Create a pipeline from its collaborators.
    pub fn new(
        fetcher: Arc<dyn ImageFetcher>,
        ai: Arc<dyn AiInvoker>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self { fetcher, ai, store }
    }

    /// Analyse the receipt image at `image_url`.
    ///
    /// # Errors
    /// - [Error::InvalidArgument] if `image_url` is empty, before any network call.
    /// - [Error::UpstreamFetchFailed] if the image could not be downloaded.
    /// - [Error::AIInvocationFailed] if the model call failed.
    /// - [Error::EmptyAIResponse] if the model returned no text.
    /// - [Error::MalformedAIResponse] if the text is not JSON.
    /// - [Error::UnexpectedResponseShape] if the JSON is not an object.
    ///
    /// A failure to save the record is not an error, see [AnalysisOutcome].
    pub async fn analyze(&self, image_url: &str) -> Result<AnalysisOutcome, Error> {
        let image_url = image_url.trim();
        if image_url.is_empty() {
            return Err(Error::InvalidArgument(
                "the request must contain an image URL".to_owned(),
            ));
        }

        tracing::info!("Analysing receipt image {image_url}");

        let image = self.fetcher.fetch(image_url).await?;

        let request = GenerateRequest::new(
            RECEIPT_EXTRACTION_PROMPT,
            vec![Part::inline_image(&image, RECEIPT_IMAGE_MIME_TYPE)],
        )
        .with_response_mime_type(JSON_MIME_TYPE);
        let response = self.ai.generate(request).await?;

        let text = first_candidate_text(&response)?;
        tracing::debug!("Model returned: {text}");

        let value: Value = serde_json::from_str(text)
            .map_err(|error| Error::MalformedAIResponse(error.to_string()))?;
        let record = ExpenseRecord::from_value(value)?;

        let persistence_warning = match self.store.add(record.clone()).await {
            Ok(stored) => {
                tracing::info!("Saved expense record {}", stored.id);
                None
            }
            Err(error) => {
                tracing::warn!("Could not save the expense record, returning it anyway: {error}");
                Some(match error {
                    Error::PersistenceFailed(_) => error,
                    error => Error::PersistenceFailed(error.to_string()),
                })
            }
        };

        Ok(AnalysisOutcome {
            record,
            persistence_warning,
        })
    }
}
