//! Relational index of NAS files: property images, property documents and
//! contact documents.

use anyhow::Result;
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use crate::db::{with_conn, PgPool};
use crate::models::{
    ContactDocument, ContactDocumentChanges, NewContactDocument, NewPropertyDocument,
    NewPropertyImage, PropertyDocument, PropertyDocumentChanges, PropertyImage,
    PropertyImageChanges,
};
use crate::schema::{contact_documents, property_documents, property_images};

/// Uploads upsert on `(owner, nas_path)`, so re-uploading the same file keeps
/// the existing row id and refreshes its metadata.
#[async_trait]
pub trait IndexStore: Send + Sync + 'static {
    async fn upsert_property_image(&self, entry: NewPropertyImage) -> Result<PropertyImage>;
    async fn upsert_property_document(
        &self,
        entry: NewPropertyDocument,
    ) -> Result<PropertyDocument>;
    async fn upsert_contact_document(&self, entry: NewContactDocument)
        -> Result<ContactDocument>;

    async fn list_property_images(&self, property_id: i32) -> Result<Vec<PropertyImage>>;
    async fn list_property_documents(&self, property_id: i32) -> Result<Vec<PropertyDocument>>;
    /// All modules when `module` is `None`.
    async fn list_contact_documents(
        &self,
        contact_id: i32,
        module: Option<String>,
    ) -> Result<Vec<ContactDocument>>;

    async fn find_property_image(&self, id: Uuid) -> Result<Option<PropertyImage>>;
    async fn find_property_document(&self, id: Uuid) -> Result<Option<PropertyDocument>>;
    async fn find_contact_document(&self, id: Uuid) -> Result<Option<ContactDocument>>;

    async fn update_property_image(
        &self,
        id: Uuid,
        changes: PropertyImageChanges,
    ) -> Result<Option<PropertyImage>>;
    async fn update_property_document(
        &self,
        id: Uuid,
        changes: PropertyDocumentChanges,
    ) -> Result<Option<PropertyDocument>>;
    async fn update_contact_document(
        &self,
        id: Uuid,
        changes: ContactDocumentChanges,
    ) -> Result<Option<ContactDocument>>;

    /// `false` when no row had that id.
    async fn delete_property_image(&self, id: Uuid) -> Result<bool>;
    async fn delete_property_document(&self, id: Uuid) -> Result<bool>;
    async fn delete_contact_document(&self, id: Uuid) -> Result<bool>;
}

pub struct PgIndexStore {
    pool: PgPool,
}

impl PgIndexStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IndexStore for PgIndexStore {
    async fn upsert_property_image(&self, entry: NewPropertyImage) -> Result<PropertyImage> {
        with_conn(&self.pool, move |conn| {
            let row = diesel::insert_into(property_images::table)
                .values(&entry)
                .on_conflict((property_images::property_id, property_images::nas_path))
                .do_update()
                .set((
                    property_images::title.eq(excluded(property_images::title)),
                    property_images::image_type.eq(excluded(property_images::image_type)),
                    property_images::url.eq(excluded(property_images::url)),
                    property_images::mime_type.eq(excluded(property_images::mime_type)),
                    property_images::size_bytes.eq(excluded(property_images::size_bytes)),
                    property_images::is_floor_plan.eq(excluded(property_images::is_floor_plan)),
                    property_images::show_on_landing_page
                        .eq(excluded(property_images::show_on_landing_page)),
                    property_images::uploaded_at.eq(excluded(property_images::uploaded_at)),
                ))
                .get_result(conn)?;
            Ok(row)
        })
        .await
    }

    async fn upsert_property_document(
        &self,
        entry: NewPropertyDocument,
    ) -> Result<PropertyDocument> {
        with_conn(&self.pool, move |conn| {
            let row = diesel::insert_into(property_documents::table)
                .values(&entry)
                .on_conflict((property_documents::property_id, property_documents::nas_path))
                .do_update()
                .set((
                    property_documents::category.eq(excluded(property_documents::category)),
                    property_documents::title.eq(excluded(property_documents::title)),
                    property_documents::description
                        .eq(excluded(property_documents::description)),
                    property_documents::url.eq(excluded(property_documents::url)),
                    property_documents::mime_type.eq(excluded(property_documents::mime_type)),
                    property_documents::size_bytes.eq(excluded(property_documents::size_bytes)),
                    property_documents::uploaded_at
                        .eq(excluded(property_documents::uploaded_at)),
                ))
                .get_result(conn)?;
            Ok(row)
        })
        .await
    }

    async fn upsert_contact_document(
        &self,
        entry: NewContactDocument,
    ) -> Result<ContactDocument> {
        with_conn(&self.pool, move |conn| {
            let row = diesel::insert_into(contact_documents::table)
                .values(&entry)
                .on_conflict((contact_documents::contact_id, contact_documents::nas_path))
                .do_update()
                .set((
                    contact_documents::module.eq(excluded(contact_documents::module)),
                    contact_documents::category.eq(excluded(contact_documents::category)),
                    contact_documents::subcategory.eq(excluded(contact_documents::subcategory)),
                    contact_documents::title.eq(excluded(contact_documents::title)),
                    contact_documents::description.eq(excluded(contact_documents::description)),
                    contact_documents::url.eq(excluded(contact_documents::url)),
                    contact_documents::mime_type.eq(excluded(contact_documents::mime_type)),
                    contact_documents::size_bytes.eq(excluded(contact_documents::size_bytes)),
                    contact_documents::uploaded_at.eq(excluded(contact_documents::uploaded_at)),
                ))
                .get_result(conn)?;
            Ok(row)
        })
        .await
    }

    async fn list_property_images(&self, property_id: i32) -> Result<Vec<PropertyImage>> {
        with_conn(&self.pool, move |conn| {
            let rows = property_images::table
                .filter(property_images::property_id.eq(property_id))
                .order(property_images::uploaded_at.desc())
                .load(conn)?;
            Ok(rows)
        })
        .await
    }

    async fn list_property_documents(&self, property_id: i32) -> Result<Vec<PropertyDocument>> {
        with_conn(&self.pool, move |conn| {
            let rows = property_documents::table
                .filter(property_documents::property_id.eq(property_id))
                .order(property_documents::uploaded_at.desc())
                .load(conn)?;
            Ok(rows)
        })
        .await
    }

    async fn list_contact_documents(
        &self,
        contact_id: i32,
        module: Option<String>,
    ) -> Result<Vec<ContactDocument>> {
        with_conn(&self.pool, move |conn| {
            let mut query = contact_documents::table
                .filter(contact_documents::contact_id.eq(contact_id))
                .order(contact_documents::uploaded_at.desc())
                .into_boxed();
            if let Some(module) = module {
                query = query.filter(contact_documents::module.eq(module));
            }
            Ok(query.load(conn)?)
        })
        .await
    }

    async fn find_property_image(&self, id: Uuid) -> Result<Option<PropertyImage>> {
        with_conn(&self.pool, move |conn| {
            Ok(property_images::table.find(id).first(conn).optional()?)
        })
        .await
    }

    async fn find_property_document(&self, id: Uuid) -> Result<Option<PropertyDocument>> {
        with_conn(&self.pool, move |conn| {
            Ok(property_documents::table.find(id).first(conn).optional()?)
        })
        .await
    }

    async fn find_contact_document(&self, id: Uuid) -> Result<Option<ContactDocument>> {
        with_conn(&self.pool, move |conn| {
            Ok(contact_documents::table.find(id).first(conn).optional()?)
        })
        .await
    }

    async fn update_property_image(
        &self,
        id: Uuid,
        changes: PropertyImageChanges,
    ) -> Result<Option<PropertyImage>> {
        with_conn(&self.pool, move |conn| {
            Ok(diesel::update(property_images::table.find(id))
                .set(&changes)
                .get_result(conn)
                .optional()?)
        })
        .await
    }

    async fn update_property_document(
        &self,
        id: Uuid,
        changes: PropertyDocumentChanges,
    ) -> Result<Option<PropertyDocument>> {
        with_conn(&self.pool, move |conn| {
            Ok(diesel::update(property_documents::table.find(id))
                .set(&changes)
                .get_result(conn)
                .optional()?)
        })
        .await
    }

    async fn update_contact_document(
        &self,
        id: Uuid,
        changes: ContactDocumentChanges,
    ) -> Result<Option<ContactDocument>> {
        with_conn(&self.pool, move |conn| {
            Ok(diesel::update(contact_documents::table.find(id))
                .set(&changes)
                .get_result(conn)
                .optional()?)
        })
        .await
    }

    async fn delete_property_image(&self, id: Uuid) -> Result<bool> {
        with_conn(&self.pool, move |conn| {
            let deleted = diesel::delete(property_images::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn delete_property_document(&self, id: Uuid) -> Result<bool> {
        with_conn(&self.pool, move |conn| {
            let deleted = diesel::delete(property_documents::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn delete_contact_document(&self, id: Uuid) -> Result<bool> {
        with_conn(&self.pool, move |conn| {
            let deleted = diesel::delete(contact_documents::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }
}
