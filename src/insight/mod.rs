//! Spending insights: the pipeline and its endpoint.

mod endpoint;
mod pipeline;

pub use endpoint::{InsightState, get_insights_endpoint};
pub use pipeline::{EMPTY_INSIGHT_MESSAGE, InsightPipeline};
