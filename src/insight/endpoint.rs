//! The `getinsights` endpoint.

use axum::{
    Json,
    body::Bytes,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    callable::{CallableRequest, CallableResponse},
    insight::InsightPipeline,
};

/// The state needed for generating insights.
#[derive(Clone)]
pub struct InsightState {
    /// The pipeline that generates the insight.
    pub pipeline: InsightPipeline,
}

impl FromRef<AppState> for InsightState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            pipeline: InsightPipeline::new(state.ai.clone(), state.record_store.clone()),
        }
    }
}

/// Route handler for generating an insight from the stored records.
///
/// The call takes no argument, anything in `data` is ignored. The result is
/// the insight text.
pub async fn get_insights_endpoint(State(state): State<InsightState>, body: Bytes) -> Response {
    if let Err(error) = CallableRequest::from_body(&body) {
        return error.into_response();
    }

    match state.pipeline.generate_insight().await {
        Ok(insight) => Json(CallableResponse { result: insight }).into_response(),
        Err(error) => {
            tracing::error!("Could not generate an insight: {error}");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod get_insights_endpoint_tests {
    use std::sync::Arc;

    use axum::{body::Bytes, extract::State, http::StatusCode};
    use serde_json::json;

    use crate::{
        ai::GeminiClient,
        insight::{InsightPipeline, endpoint::InsightState, get_insights_endpoint},
        record::{ExpenseRecord, RecordStore},
        test_utils::{FakeAi, TestRecordStore, parse_json},
    };

    #[tokio::test]
    async fn empty_store_returns_empty_state_message() {
        let store = TestRecordStore::new();
        let state = InsightState {
            pipeline: InsightPipeline::new(
                Arc::new(FakeAi::replying("unused")),
                Arc::new(store.store.clone()),
            ),
        };

        let response = get_insights_endpoint(State(state), Bytes::new()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            parse_json(response).await,
            json!({
                "result": "Não há dados de despesas para analisar. Comece escaneando alguns cupons!"
            })
        );
    }

    #[tokio::test]
    async fn returns_insight_text() {
        let store = TestRecordStore::new();
        store
            .store
            .add(ExpenseRecord::from_value(json!({ "estabelecimento": "Padaria" })).unwrap())
            .await
            .unwrap();
        let state = InsightState {
            pipeline: InsightPipeline::new(
                Arc::new(FakeAi::replying("Gaste menos com pão.")),
                Arc::new(store.store.clone()),
            ),
        };

        let response =
            get_insights_endpoint(State(state), Bytes::from_static(br#"{"data":null}"#)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            parse_json(response).await,
            json!({ "result": "Gaste menos com pão." })
        );
    }

    #[tokio::test]
    async fn ai_failure_is_internal_error() {
        let store = TestRecordStore::new();
        store
            .store
            .add(ExpenseRecord::from_value(json!({})).unwrap())
            .await
            .unwrap();
        let state = InsightState {
            pipeline: InsightPipeline::new(
                Arc::new(FakeAi::failing("boom")),
                Arc::new(store.store.clone()),
            ),
        };

        let response = get_insights_endpoint(State(state), Bytes::new()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = parse_json(response).await;
        assert_eq!(json["error"]["details"]["kind"], "AIInvocationFailed");
    }

    #[tokio::test]
    async fn api_key_is_not_sent_to_client() {
        let store = TestRecordStore::new();
        store
            .store
            .add(ExpenseRecord::from_value(json!({ "estabelecimento": "Padaria" })).unwrap())
            .await
            .unwrap();
        let gemini = GeminiClient::new("SUPER-SECRET-KEY", "gemini-2.5-flash")
            .with_api_base("http://127.0.0.1:9/v1beta");
        let state = InsightState {
            pipeline: InsightPipeline::new(Arc::new(gemini), Arc::new(store.store.clone())),
        };

        let response = get_insights_endpoint(State(state), Bytes::new()).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = parse_json(response).await;
        assert_eq!(json["error"]["details"]["kind"], "AIInvocationFailed");
        let message = json["error"]["message"].as_str().unwrap();
        assert!(!message.contains("SUPER-SECRET-KEY"), "key sent to client: {message}");
    }
}
