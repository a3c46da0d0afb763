//! The API endpoints URIs.
//!
//! The two callable functions keep the lowercase names clients already use.

/// The callable that extracts an expense record from a receipt image URL.
pub const ANALYZE_IMAGE: &str = "/api/analyzeimage";
/// The callable that comments on every stored expense record.
pub const GET_INSIGHTS: &str = "/api/getinsights";
/// The route for uploading receipt images.
pub const UPLOADS: &str = "/api/uploads";
/// The route that serves stored objects, e.g. `/objects/receipts/<id>.jpg`.
pub const OBJECTS: &str = "/objects";
