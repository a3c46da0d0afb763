//! Receipt image analysis: the pipeline and its endpoint.

mod endpoint;
mod pipeline;

pub use endpoint::{AnalyzeImageState, PERSISTENCE_WARNING_HEADER, analyze_image_endpoint};
pub use pipeline::{AnalysisOutcome, ImageAnalysisPipeline, RECEIPT_IMAGE_MIME_TYPE};
