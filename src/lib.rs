//! Receipt scanner is a small service that turns photos of receipts into
//! structured expense records and comments on the spending they describe.
//!
//! This library provides a JSON API with two operations: `analyzeimage`, which
//! extracts an expense record from an uploaded receipt image with a generative
//! model and stores it, and `getinsights`, which asks the model for a short
//! commentary on every stored record.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod ai;
mod analysis;
mod app_state;
mod callable;
pub mod client;
mod db;
pub mod endpoints;
mod fetch;
mod insight;
mod logging;
mod object_store;
mod prompts;
mod record;
mod routing;
mod upload;

#[cfg(test)]
mod test_utils;

pub use ai::{
    AiInvoker, Candidate, Content, DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL, GeminiClient,
    GenerateRequest, GenerateResponse, InlineData, Part, first_candidate_text,
};
pub use analysis::{AnalysisOutcome, ImageAnalysisPipeline};
pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use fetch::{HttpImageFetcher, ImageFetcher};
pub use insight::{EMPTY_INSIGHT_MESSAGE, InsightPipeline};
pub use logging::{LOG_BODY_LENGTH_LIMIT, MAX_LOGGED_REQUEST_BYTES, logging_middleware};
pub use object_store::{LocalObjectStore, ObjectStore, new_receipt_key};
pub use record::{Category, ExpenseRecord, RecordId, RecordStore, SQLiteRecordStore, StoredRecord};
pub use routing::build_router;
pub use upload::UploadedObject;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request was missing a required value or the value was malformed,
    /// e.g. an empty image URL.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The image could not be downloaded from the URL given by the client.
    ///
    /// Kept separate from the AI errors so that a bad upload can be told apart
    /// from a model failure.
    #[error("could not fetch the image: {0}")]
    UpstreamFetchFailed(String),

    /// The model answered but the first part of the first candidate had no text.
    #[error("the AI returned an empty response")]
    EmptyAIResponse,

    /// The model answered with text that is not valid JSON.
    #[error("the AI response is not valid JSON: {0}")]
    MalformedAIResponse(String),

    /// The model answered with valid JSON that is not an object.
    ///
    /// The string describes the JSON type that was found instead.
    #[error("expected the AI response to be a JSON object, got {0}")]
    UnexpectedResponseShape(String),

    /// The call to the model failed, e.g. a network error, an exhausted quota
    /// or an error status from the provider.
    #[error("the AI call failed: {0}")]
    AIInvocationFailed(String),

    /// The record could not be saved.
    ///
    /// The image analysis reports this as a warning and still returns the
    /// record to the caller.
    #[error("could not save the record: {0}")]
    PersistenceFailed(String),

    /// The requested resource was not found.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The object store could not read or write an object.
    #[error("object store error: {0}")]
    ObjectStoreError(String),

    /// The multipart form could not be parsed.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The request body is larger than the server accepts.
    #[error("the request body is larger than {0} bytes")]
    BodyTooLarge(usize),

    /// The multipart form did not contain an image.
    #[error("file is not an image")]
    NotAnImage,

    /// An error occurred while serializing a value as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// A request made by the client could not be completed, or the server
    /// answered with an error the client does not know about.
    #[error("request failed: {0}")]
    RequestFailed(String),
}

impl Error {
    /// The name of the error kind, as sent to clients in the `details.kind`
    /// field of an error response.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::UpstreamFetchFailed(_) => "UpstreamFetchFailed",
            Error::EmptyAIResponse => "EmptyAIResponse",
            Error::MalformedAIResponse(_) => "MalformedAIResponse",
            Error::UnexpectedResponseShape(_) => "UnexpectedResponseShape",
            Error::AIInvocationFailed(_) => "AIInvocationFailed",
            Error::PersistenceFailed(_) => "PersistenceFailed",
            Error::NotFound => "NotFound",
            Error::SqlError(_) => "SqlError",
            Error::DatabaseLockError => "DatabaseLockError",
            Error::ObjectStoreError(_) => "ObjectStoreError",
            Error::MultipartError(_) => "MultipartError",
            Error::BodyTooLarge(_) => "BodyTooLarge",
            Error::NotAnImage => "NotAnImage",
            Error::JSONSerializationError(_) => "JSONSerializationError",
            Error::RequestFailed(_) => "RequestFailed",
        }
    }

    /// Rebuild an error from the kind and message of an error response.
    ///
    /// Kinds that only make sense on the server, or that are unknown, become
    /// [Error::RequestFailed].
    pub fn from_kind(kind: &str, message: &str) -> Self {
        let message = message.to_owned();

        match kind {
            "InvalidArgument" => Error::InvalidArgument(message),
            "UpstreamFetchFailed" => Error::UpstreamFetchFailed(message),
            "EmptyAIResponse" => Error::EmptyAIResponse,
            "MalformedAIResponse" => Error::MalformedAIResponse(message),
            "UnexpectedResponseShape" => Error::UnexpectedResponseShape(message),
            "AIInvocationFailed" => Error::AIInvocationFailed(message),
            "NotFound" => Error::NotFound,
            "NotAnImage" => Error::NotAnImage,
            "MultipartError" => Error::MultipartError(message),
            _ => Error::RequestFailed(message),
        }
    }

    fn status(&self) -> (StatusCode, &'static str) {
        match self {
            Error::InvalidArgument(_) | Error::MultipartError(_) | Error::NotAnImage => {
                (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT")
            }
            Error::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Error::BodyTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "INVALID_ARGUMENT"),
            Error::UpstreamFetchFailed(_) => (StatusCode::BAD_GATEWAY, "UNAVAILABLE"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status_code, status) = self.status();

        let message = match &self {
            Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::ObjectStoreError(_)
            | Error::JSONSerializationError(_)
            | Error::RequestFailed(_) => {
                // Any errors that are not handled above are not intended to be shown to the client.
                tracing::error!("An unexpected error occurred: {}", self);
                "An unexpected error occurred, check the server logs for more details.".to_owned()
            }
            error => error.to_string(),
        };

        let body = json!({
            "error": {
                "status": status,
                "message": message,
                "details": { "kind": self.kind() },
            }
        });

        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::{Error, test_utils::parse_json};

    #[tokio::test]
    async fn invalid_argument_is_bad_request() {
        let response = Error::InvalidArgument("empty image URL".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = parse_json(response).await;
        assert_eq!(body["error"]["status"], "INVALID_ARGUMENT");
        assert_eq!(body["error"]["details"]["kind"], "InvalidArgument");
        assert_eq!(body["error"]["message"], "invalid argument: empty image URL");
    }

    #[tokio::test]
    async fn upstream_fetch_failure_is_bad_gateway() {
        let response = Error::UpstreamFetchFailed("404 Not Found".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = parse_json(response).await;
        assert_eq!(body["error"]["status"], "UNAVAILABLE");
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let response = Error::ObjectStoreError("/srv/objects: permission denied".to_owned())
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = parse_json(response).await;
        assert_eq!(body["error"]["status"], "INTERNAL");
        let message = body["error"]["message"].as_str().unwrap();
        assert!(!message.contains("permission denied"), "leaked: {message}");
    }

    #[test]
    fn from_kind_round_trips_pipeline_errors() {
        let errors = [
            Error::InvalidArgument("x".to_owned()),
            Error::UpstreamFetchFailed("x".to_owned()),
            Error::MalformedAIResponse("x".to_owned()),
            Error::UnexpectedResponseShape("x".to_owned()),
            Error::AIInvocationFailed("x".to_owned()),
        ];

        for error in errors {
            assert_eq!(Error::from_kind(error.kind(), "x"), error);
        }
        assert_eq!(Error::from_kind("EmptyAIResponse", "ignored"), Error::EmptyAIResponse);
    }

    #[test]
    fn from_kind_falls_back_to_request_failed() {
        assert_eq!(
            Error::from_kind("SqlError", "something broke"),
            Error::RequestFailed("something broke".to_owned())
        );
    }
}
