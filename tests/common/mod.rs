use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request};
use axum::Router;
use bytes::Bytes;
use chrono::Utc;
use http_body_util::BodyExt;
use nasdesk::auth::jwt::JwtService;
use nasdesk::config::{AppConfig, NasEnvConfig};
use nasdesk::db;
use nasdesk::entities::EntityLookup;
use nasdesk::index::IndexStore;
use nasdesk::models::{
    Contact, ContactDocument, ContactDocumentChanges, NewContactDocument, NewPropertyDocument,
    NewPropertyImage, Property, PropertyDocument, PropertyDocumentChanges, PropertyImage,
    PropertyImageChanges,
};
use nasdesk::nas::{
    EntryKind, FailureKind, RemoteEntry, RemoteStore, RemoteStoreError, StoreCache, StoreFactory,
    StoreResult,
};
use nasdesk::routes;
use nasdesk::settings::{Endpoint, SettingsStore, StoreAccess};
use nasdesk::state::AppState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const PROPERTY_ID: i32 = 42;
pub const CONTACT_ID: i32 = 7;
pub const PROPERTY_FOLDER: &str = "/Dokumente/Seestraße 3, 10115 Berlin";

/// In-memory remote store with switchable failures.
pub struct MemoryStore {
    protocol: &'static str,
    files: Mutex<BTreeMap<String, Bytes>>,
    dirs: Mutex<BTreeSet<String>>,
    connect_failure: Mutex<Option<FailureKind>>,
    listing_failures: Mutex<HashMap<String, FailureKind>>,
    fail_deletes: AtomicBool,
    hang_connectivity: AtomicBool,
    fail_create_directory: AtomicBool,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new(protocol: &'static str) -> Self {
        Self {
            protocol,
            files: Mutex::new(BTreeMap::new()),
            dirs: Mutex::new(BTreeSet::new()),
            connect_failure: Mutex::new(None),
            listing_failures: Mutex::new(HashMap::new()),
            fail_deletes: AtomicBool::new(false),
            hang_connectivity: AtomicBool::new(false),
            fail_create_directory: AtomicBool::new(false),
        }
    }

    pub async fn fail_connectivity(&self, kind: FailureKind) {
        *self.connect_failure.lock().await = Some(kind);
    }

    /// Listing any directory whose path ends with `suffix` fails.
    pub async fn fail_listing(&self, suffix: &str, kind: FailureKind) {
        self.listing_failures
            .lock()
            .await
            .insert(suffix.to_string(), kind);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    /// Connectivity checks never answer.
    pub fn hang_connectivity(&self) {
        self.hang_connectivity.store(true, Ordering::SeqCst);
    }

    pub fn fail_create_directory(&self) {
        self.fail_create_directory.store(true, Ordering::SeqCst);
    }

    pub async fn seed_file(&self, path: &str, bytes: &[u8]) {
        self.seed_dir(parent(path)).await;
        self.files
            .lock()
            .await
            .insert(path.to_string(), Bytes::copy_from_slice(bytes));
    }

    pub async fn seed_dir(&self, path: &str) {
        self.dirs.lock().await.extend(prefixes(path));
    }

    pub async fn file(&self, path: &str) -> Option<Bytes> {
        self.files.lock().await.get(path).cloned()
    }

    pub async fn remove_file(&self, path: &str) {
        self.files.lock().await.remove(path);
    }

    pub async fn has_dir(&self, path: &str) -> bool {
        self.dirs.lock().await.contains(path)
    }

    pub async fn file_count(&self) -> usize {
        self.files.lock().await.len()
    }
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn prefixes(path: &str) -> Vec<String> {
    let mut current = String::new();
    let mut result = Vec::new();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        current.push('/');
        current.push_str(segment);
        result.push(current.clone());
    }
    result
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn protocol(&self) -> &'static str {
        self.protocol
    }

    async fn test_connectivity(&self) -> StoreResult<()> {
        if self.hang_connectivity.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        match *self.connect_failure.lock().await {
            Some(kind) => Err(RemoteStoreError::failed(
                kind,
                format!("simulated {kind} on {}", self.protocol),
            )),
            None => Ok(()),
        }
    }

    async fn exists(&self, path: &str) -> StoreResult<bool> {
        Ok(self.files.lock().await.contains_key(path) || self.dirs.lock().await.contains(path))
    }

    async fn create_directory(&self, path: &str, recursive: bool) -> StoreResult<()> {
        if self.fail_create_directory.load(Ordering::SeqCst) {
            return Err(RemoteStoreError::unknown(format!(
                "simulated {} failure creating {path}",
                self.protocol
            )));
        }
        let mut dirs = self.dirs.lock().await;
        let parent = parent(path);
        if !recursive && !parent.is_empty() && !dirs.contains(parent) {
            return Err(RemoteStoreError::unknown(format!("parent of {path} missing")));
        }
        dirs.extend(prefixes(path));
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> StoreResult<Vec<RemoteEntry>> {
        let failures = self.listing_failures.lock().await;
        if let Some((_, kind)) = failures.iter().find(|(suffix, _)| path.ends_with(suffix.as_str())) {
            return Err(RemoteStoreError::failed(
                *kind,
                format!("simulated {kind} listing {path}"),
            ));
        }
        drop(failures);

        let name = |full: &str| full.rsplit('/').next().unwrap_or_default().to_string();
        let mut entries: Vec<RemoteEntry> = self
            .dirs
            .lock()
            .await
            .iter()
            .filter(|dir| parent(dir) == path)
            .map(|dir| RemoteEntry {
                full_path: dir.clone(),
                base_name: name(dir.as_str()),
                size_bytes: 0,
                kind: EntryKind::Directory,
            })
            .collect();
        entries.extend(
            self.files
                .lock()
                .await
                .iter()
                .filter(|(file, _)| parent(file) == path)
                .map(|(file, bytes)| RemoteEntry {
                    full_path: file.clone(),
                    base_name: name(file.as_str()),
                    size_bytes: bytes.len() as u64,
                    kind: EntryKind::File,
                }),
        );
        Ok(entries)
    }

    async fn put_file(&self, path: &str, bytes: Bytes, overwrite: bool) -> StoreResult<()> {
        if !self.dirs.lock().await.contains(parent(path)) {
            return Err(RemoteStoreError::unknown(format!(
                "folder for {path} was not provisioned"
            )));
        }
        let mut files = self.files.lock().await;
        if !overwrite && files.contains_key(path) {
            return Err(RemoteStoreError::unknown(format!("{path} exists")));
        }
        files.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn get_file(&self, path: &str) -> StoreResult<Bytes> {
        self.files
            .lock()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| RemoteStoreError::NotFound(path.to_string()))
    }

    async fn delete_file(&self, path: &str) -> StoreResult<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(RemoteStoreError::unreachable("simulated delete failure"));
        }
        self.files.lock().await.remove(path);
        Ok(())
    }
}

/// Hands out the shared memory stores instead of opening connections.
pub struct FakeFactory {
    pub webdav: Arc<MemoryStore>,
    pub ftp: Arc<MemoryStore>,
    connects: AtomicUsize,
}

#[allow(dead_code)]
impl FakeFactory {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl StoreFactory for FakeFactory {
    fn connect(&self, access: &StoreAccess) -> StoreResult<Arc<dyn RemoteStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let store: Arc<dyn RemoteStore> = match access.endpoint {
            Endpoint::WebDav { .. } => self.webdav.clone(),
            Endpoint::Ftp { .. } => self.ftp.clone(),
        };
        Ok(store)
    }
}

#[derive(Default)]
pub struct MemoryIndex {
    images: Mutex<Vec<PropertyImage>>,
    documents: Mutex<Vec<PropertyDocument>>,
    contact_documents: Mutex<Vec<ContactDocument>>,
    fail_writes: AtomicBool,
}

#[allow(dead_code)]
impl MemoryIndex {
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated index outage");
        }
        Ok(())
    }

    pub async fn image_count(&self) -> usize {
        self.images.lock().await.len()
    }

    pub async fn document_count(&self) -> usize {
        self.documents.lock().await.len()
    }
}

#[async_trait]
impl IndexStore for MemoryIndex {
    async fn upsert_property_image(&self, entry: NewPropertyImage) -> Result<PropertyImage> {
        self.check_writes()?;
        let mut rows = self.images.lock().await;
        let existing = rows
            .iter()
            .position(|row| row.property_id == entry.property_id && row.nas_path == entry.nas_path);
        let row = PropertyImage {
            id: existing.map(|index| rows[index].id).unwrap_or(entry.id),
            property_id: entry.property_id,
            title: entry.title,
            image_type: entry.image_type,
            nas_path: entry.nas_path,
            url: entry.url,
            mime_type: entry.mime_type,
            size_bytes: entry.size_bytes,
            is_floor_plan: entry.is_floor_plan,
            show_on_landing_page: entry.show_on_landing_page,
            uploaded_at: entry.uploaded_at,
        };
        match existing {
            Some(index) => rows[index] = row.clone(),
            None => rows.push(row.clone()),
        }
        Ok(row)
    }

    async fn upsert_property_document(
        &self,
        entry: NewPropertyDocument,
    ) -> Result<PropertyDocument> {
        self.check_writes()?;
        let mut rows = self.documents.lock().await;
        let existing = rows
            .iter()
            .position(|row| row.property_id == entry.property_id && row.nas_path == entry.nas_path);
        let row = PropertyDocument {
            id: existing.map(|index| rows[index].id).unwrap_or(entry.id),
            property_id: entry.property_id,
            category: entry.category,
            title: entry.title,
            description: entry.description,
            nas_path: entry.nas_path,
            url: entry.url,
            mime_type: entry.mime_type,
            size_bytes: entry.size_bytes,
            uploaded_at: entry.uploaded_at,
        };
        match existing {
            Some(index) => rows[index] = row.clone(),
            None => rows.push(row.clone()),
        }
        Ok(row)
    }

    async fn upsert_contact_document(
        &self,
        entry: NewContactDocument,
    ) -> Result<ContactDocument> {
        self.check_writes()?;
        let mut rows = self.contact_documents.lock().await;
        let existing = rows
            .iter()
            .position(|row| row.contact_id == entry.contact_id && row.nas_path == entry.nas_path);
        let row = ContactDocument {
            id: existing.map(|index| rows[index].id).unwrap_or(entry.id),
            contact_id: entry.contact_id,
            module: entry.module,
            category: entry.category,
            subcategory: entry.subcategory,
            title: entry.title,
            description: entry.description,
            nas_path: entry.nas_path,
            url: entry.url,
            mime_type: entry.mime_type,
            size_bytes: entry.size_bytes,
            uploaded_at: entry.uploaded_at,
        };
        match existing {
            Some(index) => rows[index] = row.clone(),
            None => rows.push(row.clone()),
        }
        Ok(row)
    }

    async fn list_property_images(&self, property_id: i32) -> Result<Vec<PropertyImage>> {
        let rows = self.images.lock().await;
        Ok(rows
            .iter()
            .filter(|row| row.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn list_property_documents(&self, property_id: i32) -> Result<Vec<PropertyDocument>> {
        let rows = self.documents.lock().await;
        Ok(rows
            .iter()
            .filter(|row| row.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn list_contact_documents(
        &self,
        contact_id: i32,
        module: Option<String>,
    ) -> Result<Vec<ContactDocument>> {
        let rows = self.contact_documents.lock().await;
        Ok(rows
            .iter()
            .filter(|row| row.contact_id == contact_id)
            .filter(|row| module.as_ref().map_or(true, |module| &row.module == module))
            .cloned()
            .collect())
    }

    async fn find_property_image(&self, id: Uuid) -> Result<Option<PropertyImage>> {
        Ok(self.images.lock().await.iter().find(|row| row.id == id).cloned())
    }

    async fn find_property_document(&self, id: Uuid) -> Result<Option<PropertyDocument>> {
        Ok(self
            .documents
            .lock()
            .await
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn find_contact_document(&self, id: Uuid) -> Result<Option<ContactDocument>> {
        Ok(self
            .contact_documents
            .lock()
            .await
            .iter()
            .find(|row| row.id == id)
            .cloned())
    }

    async fn update_property_image(
        &self,
        id: Uuid,
        changes: PropertyImageChanges,
    ) -> Result<Option<PropertyImage>> {
        let mut rows = self.images.lock().await;
        let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(image_type) = changes.image_type {
            row.image_type = image_type;
        }
        if let Some(flag) = changes.is_floor_plan {
            row.is_floor_plan = flag;
        }
        if let Some(flag) = changes.show_on_landing_page {
            row.show_on_landing_page = flag;
        }
        Ok(Some(row.clone()))
    }

    async fn update_property_document(
        &self,
        id: Uuid,
        changes: PropertyDocumentChanges,
    ) -> Result<Option<PropertyDocument>> {
        let mut rows = self.documents.lock().await;
        let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
            return Ok(None);
        };
        if let Some(category) = changes.category {
            row.category = category;
        }
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        Ok(Some(row.clone()))
    }

    async fn update_contact_document(
        &self,
        id: Uuid,
        changes: ContactDocumentChanges,
    ) -> Result<Option<ContactDocument>> {
        let mut rows = self.contact_documents.lock().await;
        let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
            return Ok(None);
        };
        if let Some(category) = changes.category {
            row.category = category;
        }
        if let Some(subcategory) = changes.subcategory {
            row.subcategory = subcategory;
        }
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(description) = changes.description {
            row.description = description;
        }
        Ok(Some(row.clone()))
    }

    async fn delete_property_image(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.images.lock().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }

    async fn delete_property_document(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.documents.lock().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }

    async fn delete_contact_document(&self, id: Uuid) -> Result<bool> {
        let mut rows = self.contact_documents.lock().await;
        let before = rows.len();
        rows.retain(|row| row.id != id);
        Ok(rows.len() != before)
    }
}

pub struct FakeEntities {
    properties: HashMap<i32, Property>,
    contacts: HashMap<i32, Contact>,
}

impl FakeEntities {
    fn seeded() -> Self {
        let now = Utc::now().naive_utc();
        let property = Property {
            id: PROPERTY_ID,
            street: Some("Seestraße".into()),
            house_number: Some("3".into()),
            zip_code: Some("10115".into()),
            city: Some("Berlin".into()),
            created_at: now,
        };
        let contact = Contact {
            id: CONTACT_ID,
            first_name: Some("Anna".into()),
            last_name: Some("Schmidt".into()),
            street: Some("Lindenweg".into()),
            house_number: Some("5".into()),
            zip_code: Some("20095".into()),
            city: Some("Hamburg".into()),
            created_at: now,
        };
        Self {
            properties: HashMap::from([(PROPERTY_ID, property)]),
            contacts: HashMap::from([(CONTACT_ID, contact)]),
        }
    }
}

#[async_trait]
impl EntityLookup for FakeEntities {
    async fn property(&self, id: i32) -> Result<Option<Property>> {
        Ok(self.properties.get(&id).cloned())
    }

    async fn contact(&self, id: i32) -> Result<Option<Contact>> {
        Ok(self.contacts.get(&id).cloned())
    }

    async fn property_ids(&self) -> Result<Vec<i32>> {
        let mut ids: Vec<i32> = self.properties.keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

#[derive(Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn load(&self) -> Result<HashMap<String, String>> {
        Ok(self.values.lock().await.clone())
    }

    async fn save(&self, values: Vec<(String, Option<String>)>) -> Result<()> {
        let mut stored = self.values.lock().await;
        for (key, value) in values {
            match value {
                Some(value) => {
                    stored.insert(key, value);
                }
                None => {
                    stored.remove(&key);
                }
            }
        }
        Ok(())
    }
}

pub fn nas_env() -> NasEnvConfig {
    NasEnvConfig {
        webdav_url: Some("https://nas.local/dav".into()),
        webdav_username: Some("office".into()),
        webdav_password: Some("webdav-secret".into()),
        ftp_host: Some("nas.local".into()),
        ftp_username: Some("office".into()),
        ftp_password: Some("ftp-secret".into()),
        proxy_username: Some("viewer".into()),
        proxy_password: Some("viewer-secret".into()),
        ..NasEnvConfig::default()
    }
}

pub struct TestApp {
    pub state: AppState,
    pub webdav: Arc<MemoryStore>,
    pub ftp: Arc<MemoryStore>,
    pub index: Arc<MemoryIndex>,
    pub factory: Arc<FakeFactory>,
    router: Router,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new() -> Result<Self> {
        Self::with_nas_env(nas_env())
    }

    pub fn with_nas_env(nas: NasEnvConfig) -> Result<Self> {
        let config = AppConfig {
            database_url: "postgres://unused@localhost/unused".to_string(),
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
            nas_connect_timeout_secs: 1,
            nas,
        };

        let webdav = Arc::new(MemoryStore::new("webdav"));
        let ftp = Arc::new(MemoryStore::new("ftp"));
        let factory = Arc::new(FakeFactory {
            webdav: webdav.clone(),
            ftp: ftp.clone(),
            connects: AtomicUsize::new(0),
        });
        let index = Arc::new(MemoryIndex::default());

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(
            config,
            index.clone(),
            Arc::new(FakeEntities::seeded()),
            Arc::new(MemorySettings::default()),
            Arc::new(StoreCache::new(factory.clone())),
            jwt,
        );
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            webdav,
            ftp,
            index,
            factory,
            router,
        })
    }

    pub fn token(&self) -> Result<String> {
        self.token_with_role("admin")
    }

    pub fn token_with_role(&self, role: &str) -> Result<String> {
        self.state.jwt.generate_token(1, "office", role)
    }

    async fn send(&self, request: Request<Body>) -> Result<hyper::Response<Body>> {
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::DELETE).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body))?).await
    }

    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::POST).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn upload(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
        fields: &[(&str, &str)],
        token: &str,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
            body.extend(value.as_bytes());
            body.extend(b"\r\n");
        }
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend(data);
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(body))?;
        self.send(request).await
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

#[allow(dead_code)]
pub async fn json_body<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let bytes = body_to_vec(response.into_body()).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
