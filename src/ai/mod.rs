//! Generative model access: the provider-neutral invoker contract and the Gemini client.

mod gemini;
mod invoker;

pub use gemini::{DEFAULT_GEMINI_API_BASE, DEFAULT_GEMINI_MODEL, GeminiClient};
pub use invoker::{
    AiInvoker, Candidate, Content, GenerateRequest, GenerateResponse, InlineData, Part,
    first_candidate_text,
};
