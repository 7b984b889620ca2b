use super::error::StoreResult;
use super::paths::join;
use super::store::RemoteStore;

/// Makes sure `entity_folder` and each `entity_folder/<category>` exist.
///
/// Stops at the first failure; directories created before it stay in place.
pub async fn ensure_folders(
    store: &dyn RemoteStore,
    entity_folder: &str,
    categories: &[String],
) -> StoreResult<()> {
    let targets = std::iter::once(entity_folder.to_string())
        .chain(categories.iter().map(|category| join(entity_folder, category)));

    for target in targets {
        if !store.exists(&target).await? {
            tracing::debug!(path = %target, protocol = store.protocol(), "creating NAS folder");
            store.create_directory(&target, true).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use bytes::Bytes;

    use super::*;
    use crate::nas::error::RemoteStoreError;
    use crate::nas::store::{path_prefixes, RemoteEntry};

    #[derive(Default)]
    struct Dirs {
        existing: Mutex<BTreeSet<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl RemoteStore for Dirs {
        fn protocol(&self) -> &'static str {
            "memory"
        }
        async fn test_connectivity(&self) -> StoreResult<()> {
            Ok(())
        }
        async fn exists(&self, path: &str) -> StoreResult<bool> {
            Ok(self.existing.lock().unwrap().contains(path))
        }
        async fn create_directory(&self, path: &str, _recursive: bool) -> StoreResult<()> {
            if self.fail_on.is_some_and(|fail| path.ends_with(fail)) {
                return Err(RemoteStoreError::unauthorized("read-only share"));
            }
            self.existing.lock().unwrap().extend(path_prefixes(path));
            Ok(())
        }
        async fn list_directory(&self, _path: &str) -> StoreResult<Vec<RemoteEntry>> {
            Ok(Vec::new())
        }
        async fn put_file(&self, _path: &str, _bytes: Bytes, _overwrite: bool) -> StoreResult<()> {
            Ok(())
        }
        async fn get_file(&self, path: &str) -> StoreResult<Bytes> {
            Err(RemoteStoreError::NotFound(path.to_string()))
        }
        async fn delete_file(&self, _path: &str) -> StoreResult<()> {
            Ok(())
        }
    }

    fn categories() -> Vec<String> {
        vec!["Images".into(), "ObjectDocuments".into()]
    }

    #[tokio::test]
    async fn creates_root_and_categories() {
        let store = Dirs::default();
        ensure_folders(&store, "/Dokumente/Seestraße 3, 10115 Berlin", &categories())
            .await
            .unwrap();

        let existing = store.existing.lock().unwrap();
        assert!(existing.contains("/Dokumente/Seestraße 3, 10115 Berlin"));
        assert!(existing.contains("/Dokumente/Seestraße 3, 10115 Berlin/Images"));
        assert!(existing.contains("/Dokumente/Seestraße 3, 10115 Berlin/ObjectDocuments"));
    }

    #[tokio::test]
    async fn repeated_calls_are_no_ops() {
        let store = Dirs::default();
        ensure_folders(&store, "/Dokumente/Haus", &categories())
            .await
            .unwrap();
        let before = store.existing.lock().unwrap().clone();
        ensure_folders(&store, "/Dokumente/Haus", &categories())
            .await
            .unwrap();
        assert_eq!(*store.existing.lock().unwrap(), before);
    }

    #[tokio::test]
    async fn first_failure_aborts_without_rollback() {
        let store = Dirs {
            fail_on: Some("Images"),
            ..Dirs::default()
        };
        let err = ensure_folders(&store, "/Dokumente/Haus", &categories())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::nas::error::FailureKind::Unauthorized);

        let existing = store.existing.lock().unwrap();
        assert!(existing.contains("/Dokumente/Haus"));
        assert!(!existing.contains("/Dokumente/Haus/ObjectDocuments"));
    }
}
