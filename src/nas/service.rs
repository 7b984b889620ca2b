use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::cache::ProviderChain;
use super::classify::{classify_image, title_from_file_name, IMAGE_TYPE_FLOOR_PLAN};
use super::error::{FailureKind, NasError, NasResult, RemoteStoreError, StoreResult};
use super::paths::{
    contact_category_dirs, contact_category_path, contact_folder, join, property_category_path,
    property_folder, proxy_url, validate_file_name, BusinessModule, PropertyCategory,
};
use super::provision::ensure_folders;
use super::store::RemoteStore;
use crate::entities::EntityLookup;
use crate::index::IndexStore;
use crate::models::{
    Contact, ContactDocument, ContactDocumentChanges, NewContactDocument, NewPropertyDocument,
    NewPropertyImage, Property, PropertyDocument, PropertyDocumentChanges, PropertyImage,
    PropertyImageChanges,
};

/// A file handed in by a caller.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Bytes,
    /// Guessed from the file name when absent.
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file: FileUpload,
    pub title: Option<String>,
    /// Inferred from the file name when absent.
    pub image_type: Option<String>,
    pub is_floor_plan: Option<bool>,
    pub show_on_landing_page: bool,
}

#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file: FileUpload,
    pub category: PropertyCategory,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ContactDocumentUpload {
    pub file: FileUpload,
    pub module: BusinessModule,
    pub category: String,
    pub subcategory: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Which index table an entry id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    PropertyImage,
    PropertyDocument,
    ContactDocument,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::PropertyImage => "property image",
            IndexKind::PropertyDocument => "property document",
            IndexKind::ContactDocument => "contact document",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Bytes,
    pub mime_type: String,
    pub file_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectivityReport {
    pub role: &'static str,
    pub protocol: &'static str,
    pub ok: bool,
    pub error_kind: Option<FailureKind>,
    pub message: Option<String>,
}

/// Uploads, downloads and index maintenance against one provider chain.
pub struct NasService {
    pub(crate) chain: Arc<ProviderChain>,
    pub(crate) index: Arc<dyn IndexStore>,
    entities: Arc<dyn EntityLookup>,
    connect_timeout: Duration,
}

impl NasService {
    pub fn new(
        chain: Arc<ProviderChain>,
        index: Arc<dyn IndexStore>,
        entities: Arc<dyn EntityLookup>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            index,
            entities,
            connect_timeout,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.chain.base_path
    }

    pub(crate) async fn require_property(&self, property_id: i32) -> NasResult<Property> {
        self.entities
            .property(property_id)
            .await?
            .ok_or_else(|| NasError::NotFound(format!("property {property_id} not found")))
    }

    pub(crate) async fn require_contact(&self, contact_id: i32) -> NasResult<Contact> {
        self.entities
            .contact(contact_id)
            .await?
            .ok_or_else(|| NasError::NotFound(format!("contact {contact_id} not found")))
    }

    /// Connectivity check bounded by the configured connect timeout.
    pub(crate) async fn reach(&self, store: &dyn RemoteStore) -> StoreResult<()> {
        match tokio::time::timeout(self.connect_timeout, store.test_connectivity()).await {
            Ok(result) => result,
            Err(_) => Err(RemoteStoreError::timeout(format!(
                "{} store did not answer within {}s",
                store.protocol(),
                self.connect_timeout.as_secs()
            ))),
        }
    }

    fn require_providers(&self) -> NasResult<&[Arc<dyn RemoteStore>]> {
        if self.chain.providers.is_empty() {
            return Err(NasError::Misconfigured(
                "no NAS store is configured; set WebDAV or FTP credentials".into(),
            ));
        }
        Ok(&self.chain.providers)
    }

    async fn write_with(
        &self,
        store: &dyn RemoteStore,
        entity_folder: &str,
        categories: &[String],
        remote_path: &str,
        bytes: Bytes,
    ) -> StoreResult<()> {
        self.reach(store).await?;
        ensure_folders(store, entity_folder, categories).await?;
        store.put_file(remote_path, bytes, true).await
    }

    /// Tries each provider in order and returns the protocol that took the file.
    async fn store_file(
        &self,
        entity_folder: &str,
        categories: &[String],
        remote_path: &str,
        bytes: &Bytes,
    ) -> NasResult<&'static str> {
        let mut last_error = None;
        for store in self.require_providers()? {
            let protocol = store.protocol();
            match self
                .write_with(
                    store.as_ref(),
                    entity_folder,
                    categories,
                    remote_path,
                    bytes.clone(),
                )
                .await
            {
                Ok(()) => {
                    info!(protocol, path = %remote_path, size = bytes.len(), "stored file on NAS");
                    return Ok(protocol);
                }
                Err(err) => {
                    warn!(protocol, path = %remote_path, error = %err, "NAS store rejected upload");
                    last_error = Some(err);
                }
            }
        }

        let last = last_error.unwrap_or_else(|| RemoteStoreError::unknown("no NAS store attempted"));
        error!(path = %remote_path, kind = %last.kind(), error = %last, "upload failed on every NAS store");
        Err(NasError::upload_failed(&last))
    }

    fn orphaned(remote_path: &str, err: anyhow::Error) -> NasError {
        warn!(path = %remote_path, error = %err, "index write failed; remote file left orphaned");
        NasError::Index(err)
    }

    pub async fn upload_property_image(
        &self,
        property_id: i32,
        upload: ImageUpload,
    ) -> NasResult<PropertyImage> {
        let file_name = validate_file_name(&upload.file.file_name)?;
        let property = self.require_property(property_id).await?;
        let base = self.base_path();

        let folder = property_folder(base, &property);
        let remote_path = join(
            &property_category_path(base, &property, PropertyCategory::Images),
            &file_name,
        );
        self.store_file(
            &folder,
            &PropertyCategory::folder_names(),
            &remote_path,
            &upload.file.bytes,
        )
        .await?;

        let image_type = non_empty(upload.image_type)
            .unwrap_or_else(|| classify_image(&file_name).to_string());
        let is_floor_plan = upload
            .is_floor_plan
            .unwrap_or(image_type == IMAGE_TYPE_FLOOR_PLAN);
        let entry = NewPropertyImage {
            id: Uuid::new_v4(),
            property_id,
            title: non_empty(upload.title).unwrap_or_else(|| title_from_file_name(&file_name)),
            image_type,
            url: proxy_url(base, &remote_path),
            mime_type: mime_for(&file_name, upload.file.mime_type),
            size_bytes: upload.file.bytes.len() as i64,
            is_floor_plan,
            show_on_landing_page: upload.show_on_landing_page,
            uploaded_at: Utc::now().naive_utc(),
            nas_path: remote_path.clone(),
        };
        self.index
            .upsert_property_image(entry)
            .await
            .map_err(|err| Self::orphaned(&remote_path, err))
    }

    pub async fn upload_property_document(
        &self,
        property_id: i32,
        upload: DocumentUpload,
    ) -> NasResult<PropertyDocument> {
        if upload.category.is_images() {
            return Err(NasError::InvalidInput(
                "images are uploaded through the image endpoint".into(),
            ));
        }
        let file_name = validate_file_name(&upload.file.file_name)?;
        let property = self.require_property(property_id).await?;
        let base = self.base_path();

        let folder = property_folder(base, &property);
        let remote_path = join(
            &property_category_path(base, &property, upload.category),
            &file_name,
        );
        self.store_file(
            &folder,
            &PropertyCategory::folder_names(),
            &remote_path,
            &upload.file.bytes,
        )
        .await?;

        let entry = NewPropertyDocument {
            id: Uuid::new_v4(),
            property_id,
            category: upload.category.to_string(),
            title: non_empty(upload.title).unwrap_or_else(|| title_from_file_name(&file_name)),
            description: non_empty(upload.description),
            url: proxy_url(base, &remote_path),
            mime_type: mime_for(&file_name, upload.file.mime_type),
            size_bytes: upload.file.bytes.len() as i64,
            uploaded_at: Utc::now().naive_utc(),
            nas_path: remote_path.clone(),
        };
        self.index
            .upsert_property_document(entry)
            .await
            .map_err(|err| Self::orphaned(&remote_path, err))
    }

    pub async fn upload_contact_document(
        &self,
        contact_id: i32,
        upload: ContactDocumentUpload,
    ) -> NasResult<ContactDocument> {
        let category = non_empty(Some(upload.category))
            .ok_or_else(|| NasError::InvalidInput("category must not be empty".into()))?;
        let subcategory = non_empty(upload.subcategory);
        let file_name = validate_file_name(&upload.file.file_name)?;
        let contact = self.require_contact(contact_id).await?;
        let base = self.base_path();

        let folder = contact_folder(base, &contact, upload.module);
        let remote_path = join(
            &contact_category_path(
                base,
                &contact,
                upload.module,
                &category,
                subcategory.as_deref(),
            ),
            &file_name,
        );
        self.store_file(
            &folder,
            &contact_category_dirs(&category, subcategory.as_deref()),
            &remote_path,
            &upload.file.bytes,
        )
        .await?;

        let entry = NewContactDocument {
            id: Uuid::new_v4(),
            contact_id,
            module: upload.module.to_string(),
            category,
            subcategory,
            title: non_empty(upload.title).unwrap_or_else(|| title_from_file_name(&file_name)),
            description: non_empty(upload.description),
            url: proxy_url(base, &remote_path),
            mime_type: mime_for(&file_name, upload.file.mime_type),
            size_bytes: upload.file.bytes.len() as i64,
            uploaded_at: Utc::now().naive_utc(),
            nas_path: remote_path.clone(),
        };
        self.index
            .upsert_contact_document(entry)
            .await
            .map_err(|err| Self::orphaned(&remote_path, err))
    }

    /// Remote path and stored mime type of an index entry.
    async fn locate(&self, kind: IndexKind, id: Uuid) -> NasResult<(String, String)> {
        let found = match kind {
            IndexKind::PropertyImage => self
                .index
                .find_property_image(id)
                .await?
                .map(|entry| (entry.nas_path, entry.mime_type)),
            IndexKind::PropertyDocument => self
                .index
                .find_property_document(id)
                .await?
                .map(|entry| (entry.nas_path, entry.mime_type)),
            IndexKind::ContactDocument => self
                .index
                .find_contact_document(id)
                .await?
                .map(|entry| (entry.nas_path, entry.mime_type)),
        };
        found.ok_or_else(|| NasError::NotFound(format!("{} {id} not found", kind.as_str())))
    }

    pub async fn download(&self, kind: IndexKind, id: Uuid) -> NasResult<Download> {
        let (remote_path, mime_type) = self.locate(kind, id).await?;

        let mut failure = None;
        for store in self.require_providers()? {
            match store.get_file(&remote_path).await {
                Ok(bytes) => {
                    return Ok(Download {
                        bytes,
                        mime_type,
                        file_name: super::store::base_name(&remote_path),
                    })
                }
                Err(err) if err.is_not_found() => {}
                Err(err) => {
                    warn!(protocol = store.protocol(), path = %remote_path, error = %err, "NAS download failed");
                    failure = Some(err);
                }
            }
        }

        match failure {
            Some(err) => Err(NasError::RemoteStore(err)),
            None => Err(NasError::NotFound(format!(
                "file {remote_path} is missing on the NAS"
            ))),
        }
    }

    /// Removes the index entry. The remote file is deleted best-effort; the
    /// row goes away even when the NAS refuses.
    pub async fn delete(&self, kind: IndexKind, id: Uuid) -> NasResult<()> {
        let (remote_path, _) = self.locate(kind, id).await?;

        for store in self.chain.providers.iter() {
            match store.delete_file(&remote_path).await {
                Ok(()) => {
                    info!(protocol = store.protocol(), path = %remote_path, "deleted file from NAS");
                    break;
                }
                Err(err) => {
                    warn!(protocol = store.protocol(), path = %remote_path, error = %err, "NAS delete failed; removing index entry anyway");
                }
            }
        }

        let deleted = match kind {
            IndexKind::PropertyImage => self.index.delete_property_image(id).await?,
            IndexKind::PropertyDocument => self.index.delete_property_document(id).await?,
            IndexKind::ContactDocument => self.index.delete_contact_document(id).await?,
        };
        if !deleted {
            return Err(NasError::NotFound(format!("{} {id} not found", kind.as_str())));
        }
        Ok(())
    }

    pub async fn update_property_image(
        &self,
        id: Uuid,
        changes: PropertyImageChanges,
    ) -> NasResult<PropertyImage> {
        if changes.is_empty() {
            return Err(NasError::InvalidInput("no fields to update".into()));
        }
        reject_blank("title", changes.title.as_deref())?;
        reject_blank("image_type", changes.image_type.as_deref())?;
        self.index
            .update_property_image(id, changes)
            .await?
            .ok_or_else(|| NasError::NotFound(format!("property image {id} not found")))
    }

    pub async fn update_property_document(
        &self,
        id: Uuid,
        mut changes: PropertyDocumentChanges,
    ) -> NasResult<PropertyDocument> {
        if changes.is_empty() {
            return Err(NasError::InvalidInput("no fields to update".into()));
        }
        reject_blank("title", changes.title.as_deref())?;
        if let Some(category) = changes.category.take() {
            let category: PropertyCategory = category.parse()?;
            if category.is_images() {
                return Err(NasError::InvalidInput(
                    "documents cannot be moved into the image category".into(),
                ));
            }
            changes.category = Some(category.to_string());
        }
        self.index
            .update_property_document(id, changes)
            .await?
            .ok_or_else(|| NasError::NotFound(format!("property document {id} not found")))
    }

    pub async fn update_contact_document(
        &self,
        id: Uuid,
        changes: ContactDocumentChanges,
    ) -> NasResult<ContactDocument> {
        if changes.is_empty() {
            return Err(NasError::InvalidInput("no fields to update".into()));
        }
        reject_blank("title", changes.title.as_deref())?;
        reject_blank("category", changes.category.as_deref())?;
        self.index
            .update_contact_document(id, changes)
            .await?
            .ok_or_else(|| NasError::NotFound(format!("contact document {id} not found")))
    }

    pub async fn list_property_images(&self, property_id: i32) -> NasResult<Vec<PropertyImage>> {
        self.require_property(property_id).await?;
        Ok(self.index.list_property_images(property_id).await?)
    }

    pub async fn list_property_documents(
        &self,
        property_id: i32,
    ) -> NasResult<Vec<PropertyDocument>> {
        self.require_property(property_id).await?;
        Ok(self.index.list_property_documents(property_id).await?)
    }

    pub async fn list_contact_documents(
        &self,
        contact_id: i32,
        module: Option<BusinessModule>,
    ) -> NasResult<Vec<ContactDocument>> {
        self.require_contact(contact_id).await?;
        Ok(self
            .index
            .list_contact_documents(contact_id, module.map(|module| module.to_string()))
            .await?)
    }

    /// Checks every configured store, including the read-only proxy store.
    pub async fn check_connectivity(&self) -> Vec<ConnectivityReport> {
        let roles = ["primary", "fallback"];
        let stores = self
            .chain
            .providers
            .iter()
            .enumerate()
            .map(|(position, store)| (roles.get(position).copied().unwrap_or("fallback"), store))
            .chain(self.chain.proxy.iter().map(|store| ("proxy", store)));

        let mut reports = Vec::new();
        for (role, store) in stores {
            let outcome = self.reach(store.as_ref()).await;
            reports.push(ConnectivityReport {
                role,
                protocol: store.protocol(),
                ok: outcome.is_ok(),
                error_kind: outcome.as_ref().err().map(RemoteStoreError::kind),
                message: outcome.err().map(|err| err.to_string()),
            });
        }
        reports
    }
}

pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub(crate) fn mime_for(file_name: &str, declared: Option<String>) -> String {
    non_empty(declared)
        .unwrap_or_else(|| mime_guess::from_path(file_name).first_or_octet_stream().to_string())
}

fn reject_blank(field: &str, value: Option<&str>) -> NasResult<()> {
    match value {
        Some(value) if value.trim().is_empty() => Err(NasError::InvalidInput(format!(
            "{field} must not be empty"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{mime_for, non_empty};

    #[test]
    fn mime_prefers_declared_type() {
        assert_eq!(mime_for("front.jpg", Some("image/png".into())), "image/png");
        assert_eq!(mime_for("front.jpg", Some("  ".into())), "image/jpeg");
        assert_eq!(mime_for("Vertrag.pdf", None), "application/pdf");
        assert_eq!(mime_for("blob", None), "application/octet-stream");
    }

    #[test]
    fn blank_strings_count_as_missing() {
        assert_eq!(non_empty(Some("  Kaufvertrag ".into())).as_deref(), Some("Kaufvertrag"));
        assert_eq!(non_empty(Some(" ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
