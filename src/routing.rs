//! Application router configuration.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::{IntoResponse, Response},
    routing::post,
};
use tower_http::services::ServeDir;

use crate::{
    AppState, Error, analysis::analyze_image_endpoint, endpoints,
    insight::get_insights_endpoint, upload::upload_receipt_endpoint,
};

/// The largest receipt image accepted by the upload route.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let objects = ServeDir::new(&state.objects_dir);

    Router::new()
        .route(endpoints::ANALYZE_IMAGE, post(analyze_image_endpoint))
        .route(endpoints::GET_INSIGHTS, post(get_insights_endpoint))
        .route(
            endpoints::UPLOADS,
            post(upload_receipt_endpoint).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .nest_service(endpoints::OBJECTS, objects)
        .fallback(get_404_not_found)
        .with_state(state)
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}
