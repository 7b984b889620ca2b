use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use super::error::StoreResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One child of a listed remote directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub full_path: String,
    pub base_name: String,
    pub size_bytes: u64,
    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// Authenticated access to one hierarchical file store. Paths are absolute
/// remote paths already rooted at the configured base path.
///
/// Implementations never retry; callers pick the next store on failure.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    fn protocol(&self) -> &'static str;

    async fn test_connectivity(&self) -> StoreResult<()>;

    /// `Ok(false)` for a missing path; errors only on connectivity or auth.
    async fn exists(&self, path: &str) -> StoreResult<bool>;

    /// Creating an existing directory is a no-op.
    async fn create_directory(&self, path: &str, recursive: bool) -> StoreResult<()>;

    /// Empty for a missing directory.
    async fn list_directory(&self, path: &str) -> StoreResult<Vec<RemoteEntry>>;

    async fn put_file(&self, path: &str, bytes: Bytes, overwrite: bool) -> StoreResult<()>;

    async fn get_file(&self, path: &str) -> StoreResult<Bytes>;

    /// No-op for a missing file.
    async fn delete_file(&self, path: &str) -> StoreResult<()>;
}

pub(crate) fn base_name(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Every ancestor of `path` including itself, shortest first.
pub(crate) fn path_prefixes(path: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut current = String::new();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        current.push('/');
        current.push_str(segment);
        prefixes.push(current.clone());
    }
    prefixes
}
