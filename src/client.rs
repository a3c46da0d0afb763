//! A client for the receipt scanner API, used by the `scan` binary.
//!
//! Scanning a receipt takes three steps: upload the image, resolve the URL it
//! was stored at, and ask the server to analyse the image at that URL. The
//! progress is reported through [ScanState].

use std::fmt;

use reqwest::{Client, Response, Url, multipart};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{Error, ExpenseRecord, callable::CallableResponse, endpoints, upload::UploadedObject};

/// The server URL used when none is given.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// One step of scanning a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStep {
    /// Sending the image to the server.
    Uploading,
    /// Getting the URL of the stored image.
    ResolvingUrl,
    /// Waiting for the server to extract the record.
    Analysing,
}

impl ScanStep {
    /// The number of steps in a scan.
    pub const COUNT: usize = 3;

    /// The position of the step, starting at 1.
    pub fn number(&self) -> usize {
        match self {
            ScanStep::Uploading => 1,
            ScanStep::ResolvingUrl => 2,
            ScanStep::Analysing => 3,
        }
    }

    fn description(&self) -> &'static str {
        match self {
            ScanStep::Uploading => "Enviando imagem para o servidor...",
            ScanStep::ResolvingUrl => "Imagem enviada. Pegando URL...",
            ScanStep::Analysing => "Analisando imagem com IA...",
        }
    }
}

impl fmt::Display for ScanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Passo {}/{}: {}",
            self.number(),
            Self::COUNT,
            self.description()
        )
    }
}

/// Where a receipt scan is at.
#[derive(Debug, PartialEq)]
pub enum ScanState {
    /// Nothing has been scanned yet.
    Idle,
    /// A scan is in progress.
    Loading(ScanStep),
    /// The scan finished and the server extracted this record.
    Success(ExpenseRecord),
    /// The scan stopped because of an error.
    Failed(Error),
}

/// The error body sent by the server.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    details: ErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ErrorDetails {
    kind: String,
}

/// Talks to a receipt scanner server over HTTP.
#[derive(Debug, Clone)]
pub struct ScanClient {
    http: Client,
    server_url: String,
}

impl ScanClient {
    /// Create a client for the server at `server_url`, e.g. [DEFAULT_SERVER_URL].
    pub fn new(server_url: &str) -> Self {
        Self {
            http: Client::new(),
            server_url: server_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Upload a receipt image.
    ///
    /// # Errors
    /// - [Error::NotAnImage] if `mime_type` is not an image type.
    /// - [Error::RequestFailed] if the server could not be reached.
    /// - Any error returned by the server.
    pub async fn upload(&self, image: Vec<u8>, mime_type: &str) -> Result<UploadedObject, Error> {
        if !mime_type.starts_with("image/") {
            return Err(Error::NotAnImage);
        }

        let part = multipart::Part::bytes(image)
            .file_name("receipt")
            .mime_str(mime_type)
            .map_err(|error| Error::InvalidArgument(format!("bad MIME type: {error}")))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url(endpoints::UPLOADS))
            .multipart(form)
            .send()
            .await
            .map_err(request_failed)?;

        parse_response(response).await
    }

    /// Ask the server to extract an expense record from the image at `image_url`.
    ///
    /// # Errors
    /// Returns the error the server reported, or [Error::RequestFailed] if the
    /// server could not be reached.
    pub async fn analyze(&self, image_url: &str) -> Result<ExpenseRecord, Error> {
        self.call(endpoints::ANALYZE_IMAGE, json!(image_url)).await
    }

    /// Ask the server for an insight about every stored record.
    ///
    /// # Errors
    /// Returns the error the server reported, or [Error::RequestFailed] if the
    /// server could not be reached.
    pub async fn insights(&self) -> Result<String, Error> {
        self.call(endpoints::GET_INSIGHTS, Value::Null).await
    }

    /// Upload `image` and analyse it, calling `on_state` every time the scan
    /// moves to a new state.
    ///
    /// Returns the final state, either [ScanState::Success] or
    /// [ScanState::Failed].
    pub async fn scan(
        &self,
        image: Vec<u8>,
        mime_type: &str,
        mut on_state: impl FnMut(&ScanState),
    ) -> ScanState {
        let state = match self.run_scan(image, mime_type, &mut on_state).await {
            Ok(record) => ScanState::Success(record),
            Err(error) => ScanState::Failed(error),
        };
        on_state(&state);

        state
    }

    async fn run_scan(
        &self,
        image: Vec<u8>,
        mime_type: &str,
        on_state: &mut impl FnMut(&ScanState),
    ) -> Result<ExpenseRecord, Error> {
        on_state(&ScanState::Loading(ScanStep::Uploading));
        let uploaded = self.upload(image, mime_type).await?;

        on_state(&ScanState::Loading(ScanStep::ResolvingUrl));
        let url = Url::parse(&uploaded.url).map_err(|error| {
            Error::RequestFailed(format!("the server gave a bad URL {}: {error}", uploaded.url))
        })?;

        on_state(&ScanState::Loading(ScanStep::Analysing));
        self.analyze(url.as_str()).await
    }

    async fn call<T: DeserializeOwned>(&self, endpoint: &str, data: Value) -> Result<T, Error> {
        let response = self
            .http
            .post(self.url(endpoint))
            .json(&json!({ "data": data }))
            .send()
            .await
            .map_err(request_failed)?;

        parse_response(response).await
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.server_url)
    }
}

fn request_failed(error: reqwest::Error) -> Error {
    tracing::debug!("Request failed: {error}");
    Error::RequestFailed(error.to_string())
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let status = response.status();
    let body = response.bytes().await.map_err(request_failed)?;

    if status.is_success() {
        return serde_json::from_slice::<CallableResponse<T>>(&body)
            .map(|response| response.result)
            .map_err(|error| {
                Error::RequestFailed(format!("unexpected response from the server: {error}"))
            });
    }

    match serde_json::from_slice::<ErrorEnvelope>(&body) {
        Ok(envelope) => Err(Error::from_kind(
            &envelope.error.details.kind,
            &envelope.error.message,
        )),
        Err(_) => Err(Error::RequestFailed(format!(
            "the server responded with {status}: {}",
            String::from_utf8_lossy(&body)
        ))),
    }
}
