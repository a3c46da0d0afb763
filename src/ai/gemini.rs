//! Calls Google's Gemini models through the `generateContent` REST API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::{
    Error,
    ai::{AiInvoker, Content, GenerateRequest, GenerateResponse, Part},
};

/// The default base URL of the Gemini API.
pub const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// The default model, fast and able to read images.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// The header the API key is sent in, keeping it out of URLs and error messages.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// How many characters of an error body to keep in error messages.
const ERROR_BODY_LIMIT: usize = 512;

/// An [AiInvoker] backed by the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequestBody<'a> {
    system_instruction: Content,
    contents: [Content; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
}

impl GeminiClient {
    /// Create a client for `model` that authenticates with `api_key`.
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            http: Client::new(),
            api_base: DEFAULT_GEMINI_API_BASE.to_owned(),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        }
    }

    /// Send requests to `api_base` instead of the public Gemini API, e.g. a proxy.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim().trim_end_matches('/').to_owned();
        self
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_owned()
        } else {
            format!("models/{model}")
        };

        format!("{}/{}:generateContent", self.api_base, model_path)
    }
}

#[async_trait]
impl AiInvoker for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, Error> {
        let body = GeminiRequestBody {
            system_instruction: Content {
                role: Some("system".to_owned()),
                parts: vec![Part::text(request.system_instruction)],
            },
            contents: [Content {
                role: Some("user".to_owned()),
                parts: request.parts,
            }],
            generation_config: request
                .response_mime_type
                .as_deref()
                .map(|response_mime_type| GenerationConfig { response_mime_type }),
        };

        tracing::debug!("Calling Gemini model {}", self.model);

        let response = self
            .http
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| {
                Error::AIInvocationFailed(format!(
                    "request to {} failed: {}",
                    self.model,
                    error.without_url()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(Error::AIInvocationFailed(format!(
                "{} returned {status}: {text}",
                self.model
            )));
        }

        response.json::<GenerateResponse>().await.map_err(|error| {
            Error::AIInvocationFailed(format!(
                "could not read the reply of {}: {}",
                self.model,
                error.without_url()
            ))
        })
    }
}
