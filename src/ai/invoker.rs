//! The provider-neutral contract for calling a generative model.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A generative model that accepts a system instruction and a list of
/// text/image parts and answers with text.
#[async_trait]
pub trait AiInvoker: Send + Sync {
    /// Generate content for `request`.
    ///
    /// # Errors
    /// Implementations return [Error::AIInvocationFailed] when the call itself
    /// fails, e.g. a network error, an exhausted quota or an error status
    /// from the provider.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, Error>;
}

/// A single call to a generative model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// The instruction that frames every reply, sent separately from the user content.
    pub system_instruction: String,
    /// The user content, in order.
    pub parts: Vec<Part>,
    /// Ask the model to answer with this MIME type, e.g. "application/json".
    ///
    /// This is only a hint to models that support it, replies must still be
    /// validated.
    pub response_mime_type: Option<String>,
}

impl GenerateRequest {
    /// Create a request with a system instruction and user parts.
    pub fn new(system_instruction: &str, parts: Vec<Part>) -> Self {
        Self {
            system_instruction: system_instruction.to_owned(),
            parts,
            response_mime_type: None,
        }
    }

    /// Ask for the reply to have `mime_type`.
    pub fn with_response_mime_type(mut self, mime_type: &str) -> Self {
        self.response_mime_type = Some(mime_type.to_owned());
        self
    }
}

/// One piece of content: either text or inline binary data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// Text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 encoded binary content, such as an image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    /// Create an image part by base64 encoding `bytes`.
    pub fn inline_image(bytes: &[u8], mime_type: &str) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_owned(),
                data: BASE64.encode(bytes),
            }),
        }
    }
}

/// Binary content embedded in a request or response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// The MIME type of the decoded data, e.g. "image/jpeg".
    pub mime_type: String,
    /// The base64 encoded data.
    pub data: String,
}

/// The content of a message, a list of parts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Who produced the content, e.g. "user" or "model".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// The parts of the content.
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One of the alternative replies of the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// The reply, missing when the model produced nothing, e.g. when blocked.
    #[serde(default)]
    pub content: Option<Content>,
    /// Why the model stopped generating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// The reply of a generative model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// The alternative replies. Only the first one is ever read.
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// A response with one candidate holding a single text part.
    pub fn from_text(text: &str) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content {
                    role: Some("model".to_owned()),
                    parts: vec![Part::text(text)],
                }),
                finish_reason: Some("STOP".to_owned()),
            }],
        }
    }
}

/// Get the text of the first part of the first candidate of `response`.
///
/// The first candidate and its first part are the only ones read, there is
/// no fallback to other candidates or parts.
///
/// # Errors
/// Returns [Error::EmptyAIResponse] if there is no candidate, the candidate
/// has no content or parts, or the first part has no text or only whitespace.
pub fn first_candidate_text(response: &GenerateResponse) -> Result<&str, Error> {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .and_then(|content| content.parts.first())
        .and_then(|part| part.text.as_deref())
        .filter(|text| !text.trim().is_empty())
        .ok_or(Error::EmptyAIResponse)
}
