use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = properties)]
pub struct Property {
    pub id: i32,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = contacts)]
pub struct Contact {
    pub id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Queryable, Identifiable, Associations)]
#[diesel(table_name = property_images)]
#[diesel(belongs_to(Property))]
pub struct PropertyImage {
    pub id: Uuid,
    pub property_id: i32,
    pub title: String,
    pub image_type: String,
    pub nas_path: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub is_floor_plan: bool,
    pub show_on_landing_page: bool,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = property_images)]
pub struct NewPropertyImage {
    pub id: Uuid,
    pub property_id: i32,
    pub title: String,
    pub image_type: String,
    pub nas_path: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub is_floor_plan: bool,
    pub show_on_landing_page: bool,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = property_images)]
pub struct PropertyImageChanges {
    pub title: Option<String>,
    pub image_type: Option<String>,
    pub is_floor_plan: Option<bool>,
    pub show_on_landing_page: Option<bool>,
}

impl PropertyImageChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.image_type.is_none()
            && self.is_floor_plan.is_none()
            && self.show_on_landing_page.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Identifiable, Associations)]
#[diesel(table_name = property_documents)]
#[diesel(belongs_to(Property))]
pub struct PropertyDocument {
    pub id: Uuid,
    pub property_id: i32,
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub nas_path: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = property_documents)]
pub struct NewPropertyDocument {
    pub id: Uuid,
    pub property_id: i32,
    pub category: String,
    pub title: String,
    pub description: Option<String>,
    pub nas_path: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = property_documents)]
pub struct PropertyDocumentChanges {
    pub category: Option<String>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

impl PropertyDocumentChanges {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.title.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Queryable, Identifiable, Associations)]
#[diesel(table_name = contact_documents)]
#[diesel(belongs_to(Contact))]
pub struct ContactDocument {
    pub id: Uuid,
    pub contact_id: i32,
    pub module: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub nas_path: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = contact_documents)]
pub struct NewContactDocument {
    pub id: Uuid,
    pub contact_id: i32,
    pub module: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub nas_path: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub uploaded_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = contact_documents)]
pub struct ContactDocumentChanges {
    pub category: Option<String>,
    pub subcategory: Option<Option<String>>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

impl ContactDocumentChanges {
    pub fn is_empty(&self) -> bool {
        self.category.is_none()
            && self.subcategory.is_none()
            && self.title.is_none()
            && self.description.is_none()
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = app_settings)]
#[diesel(primary_key(key))]
pub struct AppSetting {
    pub key: String,
    pub value: String,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = app_settings)]
pub struct NewAppSetting {
    pub key: String,
    pub value: String,
    pub updated_at: NaiveDateTime,
}
