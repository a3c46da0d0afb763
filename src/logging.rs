//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderMap, header::CONTENT_LENGTH, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::Error;

/// The number of bytes of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest non-binary request body the middleware will read.
pub const MAX_LOGGED_REQUEST_BYTES: usize = 2 * 1024 * 1024;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated and
/// the full body is logged at the `debug` level. Image and multipart bodies are
/// passed through without being read. Other request bodies larger than
/// [MAX_LOGGED_REQUEST_BYTES] are rejected with [Error::BodyTooLarge].
///
/// Bodies are handed on byte for byte, logging only decodes a lossy copy.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request = if is_binary(request.headers()) {
        tracing::info!(
            "Received request: {} {}\nbody: <binary>",
            request.method(),
            request.uri()
        );
        request
    } else {
        let (parts, body) = request.into_parts();
        let body_bytes = match read_request_body(&parts.headers, body).await {
            Ok(body_bytes) => body_bytes,
            Err(error) => {
                tracing::warn!("Rejected request to {}: {error}", parts.uri);
                return error.into_response();
            }
        };
        log_request(&parts, &String::from_utf8_lossy(&body_bytes));

        Request::from_parts(parts, Body::from(body_bytes))
    };

    let response = next.run(request).await;

    if is_binary(response.headers()) {
        tracing::info!("Sending response: {}\nbody: <binary>", response.status());
        return response;
    }

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body_bytes) => body_bytes,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return Error::RequestFailed(error.to_string()).into_response();
        }
    };
    log_response(&parts, &String::from_utf8_lossy(&body_bytes));

    Response::from_parts(parts, Body::from(body_bytes))
}

fn is_binary(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|content_type| content_type.to_str().ok())
        .is_some_and(|content_type| {
            content_type.starts_with("multipart/")
                || content_type.starts_with("image/")
                || content_type.starts_with("application/octet-stream")
        })
}

async fn read_request_body(headers: &HeaderMap, body: Body) -> Result<Bytes, Error> {
    let declared_length = headers
        .get(CONTENT_LENGTH)
        .and_then(|length| length.to_str().ok())
        .and_then(|length| length.parse::<usize>().ok());
    if declared_length.is_some_and(|length| length > MAX_LOGGED_REQUEST_BYTES) {
        return Err(Error::BodyTooLarge(MAX_LOGGED_REQUEST_BYTES));
    }

    // A body without a length header can still run past the limit.
    axum::body::to_bytes(body, MAX_LOGGED_REQUEST_BYTES)
        .await
        .map_err(|error| {
            tracing::debug!("Could not read request body: {error}");
            Error::BodyTooLarge(MAX_LOGGED_REQUEST_BYTES)
        })
}

fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(body.len());
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Received request: {parts:#?}\nbody: {:}...", truncate(body));
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {parts:#?}\nbody: {body:?}");
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Sending response: {parts:#?}\nbody: {:}...", truncate(body));
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {parts:#?}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod logging_middleware_tests {
    use axum::{
        Router,
        body::Bytes,
        http::{HeaderMap, HeaderValue, StatusCode, header::CONTENT_TYPE},
        middleware,
        routing::post,
    };
    use axum_test::TestServer;
    use serde_json::Value;

    use super::{
        LOG_BODY_LENGTH_LIMIT, MAX_LOGGED_REQUEST_BYTES, is_binary, logging_middleware, truncate,
    };

    async fn echo(body: Bytes) -> Bytes {
        body
    }

    fn get_test_server() -> TestServer {
        let app = Router::new()
            .route("/echo", post(echo))
            .layer(middleware::from_fn(logging_middleware));

        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn body_passes_through_unchanged() {
        let server = get_test_server();
        let body = "ç".repeat(LOG_BODY_LENGTH_LIMIT);

        let response = server.post("/echo").text(body.clone()).await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.text(), body);
    }

    #[tokio::test]
    async fn non_utf8_body_is_not_rewritten() {
        let server = get_test_server();
        let body: &'static [u8] = &[0x7b, 0xff, 0xfe, 0x00, 0x7d];

        let response = server
            .post("/echo")
            .content_type("text/plain")
            .bytes(Bytes::from_static(body))
            .await;

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.as_bytes().as_ref(), body);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = get_test_server();
        let body = "a".repeat(MAX_LOGGED_REQUEST_BYTES + 1);

        let response = server.post("/echo").text(body).await;

        assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        let json = response.json::<Value>();
        assert_eq!(json["error"]["details"]["kind"], "BodyTooLarge");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "ç".repeat(LOG_BODY_LENGTH_LIMIT);

        let truncated = truncate(&body);

        assert!(truncated.len() <= LOG_BODY_LENGTH_LIMIT);
        assert!(body.starts_with(truncated));
    }

    #[test]
    fn images_and_forms_are_binary() {
        let mut headers = HeaderMap::new();
        assert!(!is_binary(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        assert!(!is_binary(&headers));

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("image/jpeg"));
        assert!(is_binary(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=abc"),
        );
        assert!(is_binary(&headers));
    }
}
