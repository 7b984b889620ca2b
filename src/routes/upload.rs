use std::collections::HashMap;

use axum::extract::Multipart;
use tracing::error;

use crate::error::{AppError, AppResult};
use crate::nas::FileUpload;

/// A multipart upload: the `file` part plus every text field.
pub struct UploadForm {
    pub file: FileUpload,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut file: Option<FileUpload> = None;
        let mut fields = HashMap::new();

        while let Some(field) = multipart.next_field().await.map_err(|err| {
            let msg = format!("invalid multipart data: {err}");
            error!(error = %err, "invalid multipart data");
            AppError::bad_request(msg)
        })? {
            let name = field.name().map(|n| n.to_string());
            match name.as_deref() {
                Some("file") => {
                    let file_name = field.file_name().map(|n| n.to_string());
                    let mime_type = field.content_type().map(|mime| mime.to_string());
                    let bytes = field.bytes().await.map_err(|err| {
                        let msg = format!("failed to read file bytes: {err}");
                        error!(error = %err, "failed to read file bytes");
                        AppError::bad_request(msg)
                    })?;
                    let file_name = file_name.ok_or_else(|| {
                        error!("upload rejected: missing original filename");
                        AppError::bad_request("filename is required")
                    })?;
                    file = Some(FileUpload {
                        file_name,
                        bytes,
                        mime_type,
                    });
                }
                Some(other) => {
                    let other = other.to_string();
                    let value = field.text().await.map_err(|err| {
                        let msg = format!("invalid field {other}: {err}");
                        error!(error = %err, field = %other, "invalid multipart field");
                        AppError::bad_request(msg)
                    })?;
                    fields.insert(other, value);
                }
                None => {}
            }
        }

        let file = file.ok_or_else(|| {
            error!("upload rejected: missing file field");
            AppError::bad_request("file field is required")
        })?;
        if file.bytes.is_empty() {
            error!("upload rejected: empty file payload");
            return Err(AppError::bad_request("file field must not be empty"));
        }

        Ok(Self { file, fields })
    }

    /// Trimmed text field; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub fn flag(&self, name: &str) -> AppResult<Option<bool>> {
        match self.text(name).as_deref() {
            None => Ok(None),
            Some("true" | "1" | "on") => Ok(Some(true)),
            Some("false" | "0" | "off") => Ok(Some(false)),
            Some(other) => Err(AppError::bad_request(format!(
                "{name} must be true or false, got '{other}'"
            ))),
        }
    }
}
