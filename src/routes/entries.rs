//! Download, metadata update and delete for individual index entries.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    ContactDocument, ContactDocumentChanges, PropertyDocument, PropertyDocumentChanges,
    PropertyImage, PropertyImageChanges,
};
use crate::nas::IndexKind;
use crate::state::AppState;
use crate::utils::json::{nullable_string, optional_bool, optional_string};

fn inline_content_disposition(filename: &str) -> Option<String> {
    if filename.is_empty() {
        return None;
    }

    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();

    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    Some(format!(
        "inline; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    ))
}

async fn download(state: &AppState, kind: IndexKind, id: Uuid) -> AppResult<Response> {
    let nas = state.nas().await?;
    let file = nas.download(kind, id).await?;

    let mut response = (
        [(header::CONTENT_TYPE, file.mime_type)],
        file.bytes,
    )
        .into_response();
    if let Some(disposition) = inline_content_disposition(&file.file_name) {
        let value = disposition
            .parse()
            .map_err(|_| AppError::internal("invalid content disposition"))?;
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

async fn delete(state: &AppState, kind: IndexKind, id: Uuid) -> AppResult<StatusCode> {
    let nas = state.nas().await?;
    nas.delete(kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download_property_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    download(&state, IndexKind::PropertyImage, id).await
}

pub async fn download_property_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    download(&state, IndexKind::PropertyDocument, id).await
}

pub async fn download_contact_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    download(&state, IndexKind::ContactDocument, id).await
}

pub async fn delete_property_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    delete(&state, IndexKind::PropertyImage, id).await
}

pub async fn delete_property_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    delete(&state, IndexKind::PropertyDocument, id).await
}

pub async fn delete_contact_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    delete(&state, IndexKind::ContactDocument, id).await
}

pub async fn update_property_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<PropertyImage>> {
    let changes = PropertyImageChanges {
        title: optional_string(&body, "title").map_err(AppError::bad_request)?,
        image_type: optional_string(&body, "image_type").map_err(AppError::bad_request)?,
        is_floor_plan: optional_bool(&body, "is_floor_plan").map_err(AppError::bad_request)?,
        show_on_landing_page: optional_bool(&body, "show_on_landing_page")
            .map_err(AppError::bad_request)?,
    };
    let nas = state.nas().await?;
    Ok(Json(nas.update_property_image(id, changes).await?))
}

pub async fn update_property_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<PropertyDocument>> {
    let changes = PropertyDocumentChanges {
        category: optional_string(&body, "category").map_err(AppError::bad_request)?,
        title: optional_string(&body, "title").map_err(AppError::bad_request)?,
        description: nullable_string(&body, "description").map_err(AppError::bad_request)?,
    };
    let nas = state.nas().await?;
    Ok(Json(nas.update_property_document(id, changes).await?))
}

pub async fn update_contact_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<Value>,
) -> AppResult<Json<ContactDocument>> {
    let changes = ContactDocumentChanges {
        category: optional_string(&body, "category").map_err(AppError::bad_request)?,
        subcategory: nullable_string(&body, "subcategory").map_err(AppError::bad_request)?,
        title: optional_string(&body, "title").map_err(AppError::bad_request)?,
        description: nullable_string(&body, "description").map_err(AppError::bad_request)?,
    };
    let nas = state.nas().await?;
    Ok(Json(nas.update_contact_document(id, changes).await?))
}
