//! The `analyzeimage` endpoint.

use axum::{
    Json,
    body::Bytes,
    extract::{FromRef, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::{
    AppState, Error,
    analysis::ImageAnalysisPipeline,
    callable::{CallableRequest, CallableResponse},
};

/// The header added to a successful analysis when the record could not be saved.
pub const PERSISTENCE_WARNING_HEADER: &str = "x-persistence-warning";

/// The state needed for analysing receipt images.
#[derive(Clone)]
pub struct AnalyzeImageState {
    /// The pipeline that does the analysis.
    pub pipeline: ImageAnalysisPipeline,
}

impl FromRef<AppState> for AnalyzeImageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            pipeline: ImageAnalysisPipeline::new(
                state.image_fetcher.clone(),
                state.ai.clone(),
                state.record_store.clone(),
            ),
        }
    }
}

/// Route handler for analysing a receipt image.
///
/// The argument of the call must be the image URL as a bare string. On
/// success the extracted record is returned as the result.
pub async fn analyze_image_endpoint(
    State(state): State<AnalyzeImageState>,
    body: Bytes,
) -> Response {
    let request = match CallableRequest::from_body(&body) {
        Ok(request) => request,
        Err(error) => return error.into_response(),
    };

    let Value::String(image_url) = request.data else {
        return Error::InvalidArgument("the request data must be the image URL as a string".to_owned())
            .into_response();
    };

    match state.pipeline.analyze(&image_url).await {
        Ok(outcome) => {
            let mut response = Json(CallableResponse {
                result: outcome.record,
            })
            .into_response();

            if outcome.persistence_warning.is_some() {
                response.headers_mut().insert(
                    PERSISTENCE_WARNING_HEADER,
                    HeaderValue::from_static("record-not-saved"),
                );
            }

            response
        }
        Err(error) => {
            tracing::error!("Could not analyse the image at {image_url}: {error}");
            error.into_response()
        }
    }
}
