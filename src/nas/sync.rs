//! One-way import of files that exist on the NAS but not in the index.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::classify::{classify_image, is_image_file, title_from_file_name, IMAGE_TYPE_FLOOR_PLAN};
use super::error::{NasResult, RemoteStoreError};
use super::paths::{contact_folder, property_category_path, proxy_url, BusinessModule, PropertyCategory};
use super::service::{mime_for, NasService};
use super::store::{RemoteEntry, RemoteStore};
use crate::models::{NewContactDocument, NewPropertyDocument, NewPropertyImage};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub new_images: usize,
    pub new_documents: usize,
    /// One entry per folder that could not be processed, `"<folder>: <reason>"`.
    pub errors: Vec<String>,
}

impl NasService {
    /// First provider that answers the connectivity check.
    async fn reachable_store(&self) -> Result<Arc<dyn RemoteStore>, RemoteStoreError> {
        let mut last_error =
            RemoteStoreError::unknown("no NAS store is configured; set WebDAV or FTP credentials");
        for store in self.chain.providers.iter() {
            match self.reach(store.as_ref()).await {
                Ok(()) => return Ok(store.clone()),
                Err(err) => {
                    warn!(protocol = store.protocol(), error = %err, "NAS store unreachable for sync");
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    /// Imports files found in the property's category folders that have no
    /// index entry yet. Existing entries are never touched.
    pub async fn sync_property(&self, property_id: i32) -> NasResult<SyncSummary> {
        let property = self.require_property(property_id).await?;
        let base = self.base_path().to_string();

        let mut known: HashSet<String> = self
            .index
            .list_property_images(property_id)
            .await?
            .into_iter()
            .map(|image| image.nas_path)
            .collect();
        known.extend(
            self.index
                .list_property_documents(property_id)
                .await?
                .into_iter()
                .map(|document| document.nas_path),
        );

        let mut summary = SyncSummary::default();
        let store = match self.reachable_store().await {
            Ok(store) => store,
            Err(err) => {
                summary.errors = PropertyCategory::ALL
                    .iter()
                    .map(|category| format!("{category}: {err}"))
                    .collect();
                return Ok(summary);
            }
        };

        for category in PropertyCategory::ALL {
            let folder = property_category_path(&base, &property, category);
            let entries = match store.list_directory(&folder).await {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(property_id, %category, error = %err, "listing NAS folder failed");
                    summary.errors.push(format!("{category}: {err}"));
                    continue;
                }
            };

            for entry in entries.into_iter().filter(RemoteEntry::is_file) {
                if known.contains(&entry.full_path)
                    || is_image_file(&entry.base_name) != category.is_images()
                {
                    continue;
                }

                let imported = if category.is_images() {
                    let image_type = classify_image(&entry.base_name);
                    self.index
                        .upsert_property_image(NewPropertyImage {
                            id: Uuid::new_v4(),
                            property_id,
                            title: title_from_file_name(&entry.base_name),
                            image_type: image_type.to_string(),
                            url: proxy_url(&base, &entry.full_path),
                            mime_type: mime_for(&entry.base_name, None),
                            size_bytes: remote_size(&entry),
                            is_floor_plan: image_type == IMAGE_TYPE_FLOOR_PLAN,
                            show_on_landing_page: false,
                            uploaded_at: Utc::now().naive_utc(),
                            nas_path: entry.full_path.clone(),
                        })
                        .await
                        .map(|_| summary.new_images += 1)
                } else {
                    self.index
                        .upsert_property_document(NewPropertyDocument {
                            id: Uuid::new_v4(),
                            property_id,
                            category: category.to_string(),
                            title: title_from_file_name(&entry.base_name),
                            description: None,
                            url: proxy_url(&base, &entry.full_path),
                            mime_type: mime_for(&entry.base_name, None),
                            size_bytes: remote_size(&entry),
                            uploaded_at: Utc::now().naive_utc(),
                            nas_path: entry.full_path.clone(),
                        })
                        .await
                        .map(|_| summary.new_documents += 1)
                };

                match imported {
                    Ok(()) => {
                        known.insert(entry.full_path);
                    }
                    Err(err) => summary.errors.push(format!("{category}: {err}")),
                }
            }
        }

        info!(
            property_id,
            new_images = summary.new_images,
            new_documents = summary.new_documents,
            errors = summary.errors.len(),
            "property sync finished"
        );
        Ok(summary)
    }

    /// Imports unseen files below `<contact folder>/<category>[/<subcategory>]`.
    /// Category and subcategory are taken from the folder names.
    pub async fn sync_contact_documents(
        &self,
        contact_id: i32,
        module: BusinessModule,
    ) -> NasResult<SyncSummary> {
        let contact = self.require_contact(contact_id).await?;
        let base = self.base_path().to_string();
        let root = contact_folder(&base, &contact, module);

        let mut known: HashSet<String> = self
            .index
            .list_contact_documents(contact_id, None)
            .await?
            .into_iter()
            .map(|document| document.nas_path)
            .collect();

        let mut summary = SyncSummary::default();
        let store = match self.reachable_store().await {
            Ok(store) => store,
            Err(err) => {
                summary.errors.push(format!("{module}: {err}"));
                return Ok(summary);
            }
        };

        let categories = match store.list_directory(&root).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(contact_id, %module, error = %err, "listing contact folder failed");
                summary.errors.push(format!("{module}: {err}"));
                return Ok(summary);
            }
        };

        for category in categories.into_iter().filter(|entry| !entry.is_file()) {
            let entries = match store.list_directory(&category.full_path).await {
                Ok(entries) => entries,
                Err(err) => {
                    summary.errors.push(format!("{}: {err}", category.base_name));
                    continue;
                }
            };

            let mut files: Vec<(Option<String>, RemoteEntry)> = Vec::new();
            for entry in entries {
                if entry.is_file() {
                    files.push((None, entry));
                    continue;
                }
                match store.list_directory(&entry.full_path).await {
                    Ok(nested) => files.extend(
                        nested
                            .into_iter()
                            .filter(RemoteEntry::is_file)
                            .map(|file| (Some(entry.base_name.clone()), file)),
                    ),
                    Err(err) => summary.errors.push(format!(
                        "{}/{}: {err}",
                        category.base_name, entry.base_name
                    )),
                }
            }

            for (subcategory, file) in files {
                if known.contains(&file.full_path) {
                    continue;
                }
                let imported = self
                    .index
                    .upsert_contact_document(NewContactDocument {
                        id: Uuid::new_v4(),
                        contact_id,
                        module: module.to_string(),
                        category: category.base_name.clone(),
                        subcategory,
                        title: title_from_file_name(&file.base_name),
                        description: None,
                        url: proxy_url(&base, &file.full_path),
                        mime_type: mime_for(&file.base_name, None),
                        size_bytes: remote_size(&file),
                        uploaded_at: Utc::now().naive_utc(),
                        nas_path: file.full_path.clone(),
                    })
                    .await;
                match imported {
                    Ok(_) => {
                        summary.new_documents += 1;
                        known.insert(file.full_path);
                    }
                    Err(err) => summary
                        .errors
                        .push(format!("{}: {err}", category.base_name)),
                }
            }
        }

        info!(
            contact_id,
            %module,
            new_documents = summary.new_documents,
            errors = summary.errors.len(),
            "contact sync finished"
        );
        Ok(summary)
    }
}

fn remote_size(entry: &RemoteEntry) -> i64 {
    i64::try_from(entry.size_bytes).unwrap_or(i64::MAX)
}
