//! Receives receipt images from clients and puts them in the object store.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRef, Multipart, State, multipart::Field},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    callable::CallableResponse,
    object_store::{ObjectStore, new_receipt_key},
};

/// The state needed for uploading images.
#[derive(Clone)]
pub struct UploadState {
    /// Where uploaded images are stored.
    pub object_store: Arc<dyn ObjectStore>,
}

impl FromRef<AppState> for UploadState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            object_store: state.object_store.clone(),
        }
    }
}

/// Where an uploaded image was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedObject {
    /// The key of the image in the object store.
    pub key: String,
    /// A URL that downloads the image, ready to pass to `analyzeimage`.
    pub url: String,
}

/// Route handler for uploading a receipt image.
///
/// Expects a multipart form with one image file. The image is stored under a
/// new unique key and its URL is returned.
pub async fn upload_receipt_endpoint(
    State(state): State<UploadState>,
    mut multipart: Multipart,
) -> Response {
    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => {
            return Error::InvalidArgument("the form must contain an image file".to_owned())
                .into_response();
        }
        Err(error) => {
            tracing::debug!("Could not read multipart form: {error}");
            return Error::MultipartError(error.body_text()).into_response();
        }
    };

    let image = match read_image_field(field).await {
        Ok(image) => image,
        Err(error) => return error.into_response(),
    };

    match store_image(state.object_store.as_ref(), &image).await {
        Ok(uploaded) => {
            tracing::info!("Uploaded {} bytes to {}", image.len(), uploaded.key);
            (
                StatusCode::CREATED,
                Json(CallableResponse { result: uploaded }),
            )
                .into_response()
        }
        Err(error) => {
            tracing::error!("Could not store uploaded image: {error}");
            error.into_response()
        }
    }
}

async fn read_image_field(field: Field<'_>) -> Result<Vec<u8>, Error> {
    let is_image = field
        .content_type()
        .is_some_and(|content_type| content_type.starts_with("image/"));
    if !is_image {
        return Err(Error::NotAnImage);
    }

    let bytes = field.bytes().await.map_err(|error| {
        tracing::error!("Could not read data from multipart form field: {error}");
        Error::MultipartError("could not read data from multipart form field".to_owned())
    })?;

    if bytes.is_empty() {
        return Err(Error::InvalidArgument("the image file is empty".to_owned()));
    }

    Ok(bytes.to_vec())
}

async fn store_image(object_store: &dyn ObjectStore, image: &[u8]) -> Result<UploadedObject, Error> {
    let key = new_receipt_key();

    object_store.put(&key, image).await?;
    let url = object_store.url_for(&key).await?;

    Ok(UploadedObject { key, url })
}
