//! Upload and analysis endpoints
//!
//! Both endpoints take `multipart/form-data` with the file in a part named
//! `image`. Accepted extensions: jpg, jpeg, png, dcm.

use axum::{
    extract::{Multipart, Path, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::find_session;
use crate::history::AnalysisRecord;
use crate::pipeline::{UploadedImage, SUPPORTED_EXTENSIONS};
use crate::presentation::{ImageInfo, ResultCard};
use crate::{ApiError, ApiResult, AppState};

/// Multipart part carrying the upload
const IMAGE_FIELD: &str = "image";

/// Completed analysis
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub image: ImageInfo,
    pub result: ResultCard,
    pub record: AnalysisRecord,
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/api/sessions/:id/image-info", post(image_info))
        .route("/api/sessions/:id/analyze", post(analyze))
}

/// POST /api/sessions/:id/image-info
///
/// Describes the upload (size, format, dimensions) without analyzing it.
pub async fn image_info(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<ImageInfo>> {
    find_session(&state, id).await?;
    let image = read_image(multipart).await?;
    Ok(Json(ImageInfo::from(&image)))
}

/// POST /api/sessions/:id/analyze
///
/// Runs the analysis pipeline. 503 when the session is not connected, 502
/// when the remote classification fails; neither touches history.
pub async fn analyze(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<AnalysisResponse>> {
    let session = find_session(&state, id).await?;
    let image = read_image(multipart).await?;

    let mut session = session.lock().await;
    let outcome = state.pipeline.analyze(&mut session, &image).await?;

    Ok(Json(AnalysisResponse {
        image: ImageInfo::from(&image),
        result: ResultCard::from(&outcome.prediction),
        record: outcome.record,
    }))
}

/// Pull the `image` part out of the form and validate it
async fn read_image(mut multipart: Multipart) -> ApiResult<UploadedImage> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("image part has no file name".to_string()))?;
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;

        debug!(file_name = %file_name, bytes = bytes.len(), "Upload received");

        let image = UploadedImage::new(file_name, content_type, bytes.to_vec());
        if image.bytes.is_empty() {
            return Err(ApiError::BadRequest("uploaded file is empty".to_string()));
        }
        if !image.has_supported_extension() {
            return Err(ApiError::BadRequest(format!(
                "unsupported file type; expected one of: {}",
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }
        return Ok(image);
    }

    Err(ApiError::BadRequest(format!("missing '{}' part", IMAGE_FIELD)))
}
