use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::upload::UploadForm;
use crate::error::{AppError, AppResult};
use crate::models::{PropertyDocument, PropertyImage};
use crate::nas::{DocumentUpload, ImageUpload, PropertyCategory, SyncSummary};
use crate::state::AppState;

pub async fn list_images(
    State(state): State<AppState>,
    Path(property_id): Path<i32>,
) -> AppResult<Json<Vec<PropertyImage>>> {
    let nas = state.nas().await?;
    Ok(Json(nas.list_property_images(property_id).await?))
}

pub async fn upload_image(
    State(state): State<AppState>,
    Path(property_id): Path<i32>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<PropertyImage>)> {
    let form = UploadForm::read(multipart).await?;
    let upload = ImageUpload {
        title: form.text("title"),
        image_type: form.text("image_type"),
        is_floor_plan: form.flag("is_floor_plan")?,
        show_on_landing_page: form.flag("show_on_landing_page")?.unwrap_or(false),
        file: form.file,
    };

    let nas = state.nas().await?;
    let image = nas.upload_property_image(property_id, upload).await?;
    info!(property_id, image_id = %image.id, path = %image.nas_path, "property image uploaded");
    Ok((StatusCode::CREATED, Json(image)))
}

pub async fn list_documents(
    State(state): State<AppState>,
    Path(property_id): Path<i32>,
) -> AppResult<Json<Vec<PropertyDocument>>> {
    let nas = state.nas().await?;
    Ok(Json(nas.list_property_documents(property_id).await?))
}

pub async fn upload_document(
    State(state): State<AppState>,
    Path(property_id): Path<i32>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<PropertyDocument>)> {
    let form = UploadForm::read(multipart).await?;
    let category: PropertyCategory = form
        .text("category")
        .ok_or_else(|| AppError::bad_request("category is required"))?
        .parse()?;
    let upload = DocumentUpload {
        category,
        title: form.text("title"),
        description: form.text("description"),
        file: form.file,
    };

    let nas = state.nas().await?;
    let document = nas.upload_property_document(property_id, upload).await?;
    info!(property_id, document_id = %document.id, path = %document.nas_path, "property document uploaded");
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn sync(
    State(state): State<AppState>,
    Path(property_id): Path<i32>,
) -> AppResult<Json<SyncSummary>> {
    let nas = state.nas().await?;
    Ok(Json(nas.sync_property(property_id).await?))
}
