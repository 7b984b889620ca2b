use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::upload::UploadForm;
use crate::error::{AppError, AppResult};
use crate::models::ContactDocument;
use crate::nas::{BusinessModule, ContactDocumentUpload, SyncSummary};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ModuleQuery {
    pub module: Option<String>,
}

impl ModuleQuery {
    fn parse(&self) -> AppResult<Option<BusinessModule>> {
        self.module
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .map(|value| value.parse::<BusinessModule>().map_err(AppError::from))
            .transpose()
    }
}

pub async fn list_documents(
    State(state): State<AppState>,
    Path(contact_id): Path<i32>,
    Query(query): Query<ModuleQuery>,
) -> AppResult<Json<Vec<ContactDocument>>> {
    let module = query.parse()?;
    let nas = state.nas().await?;
    Ok(Json(nas.list_contact_documents(contact_id, module).await?))
}

pub async fn upload_document(
    State(state): State<AppState>,
    Path(contact_id): Path<i32>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ContactDocument>)> {
    let form = UploadForm::read(multipart).await?;
    let module: BusinessModule = form
        .text("module")
        .ok_or_else(|| AppError::bad_request("module is required"))?
        .parse()?;
    let category = form
        .text("category")
        .ok_or_else(|| AppError::bad_request("category is required"))?;
    let upload = ContactDocumentUpload {
        module,
        category,
        subcategory: form.text("subcategory"),
        title: form.text("title"),
        description: form.text("description"),
        file: form.file,
    };

    let nas = state.nas().await?;
    let document = nas.upload_contact_document(contact_id, upload).await?;
    info!(contact_id, document_id = %document.id, path = %document.nas_path, "contact document uploaded");
    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn sync(
    State(state): State<AppState>,
    Path(contact_id): Path<i32>,
    Query(query): Query<ModuleQuery>,
) -> AppResult<Json<SyncSummary>> {
    let module = query
        .parse()?
        .ok_or_else(|| AppError::bad_request("module is required"))?;
    let nas = state.nas().await?;
    Ok(Json(nas.sync_contact_documents(contact_id, module).await?))
}
