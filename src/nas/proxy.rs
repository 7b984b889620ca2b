use bytes::Bytes;
use tracing::debug;

use super::cache::ProviderChain;
use super::classify::content_type_for;
use super::error::{NasError, NasResult};
use super::paths::remote_path_from_proxy;

#[derive(Debug, Clone)]
pub struct ProxiedFile {
    pub bytes: Bytes,
    pub content_type: &'static str,
}

/// Reads a file through the read-only proxy store. `encoded_path` is the
/// percent-encoded path relative to the base path, as produced by
/// [`super::paths::proxy_url`].
pub async fn fetch(chain: &ProviderChain, encoded_path: &str) -> NasResult<ProxiedFile> {
    let store = chain.proxy.as_ref().ok_or_else(|| {
        NasError::Misconfigured("read-only NAS credentials are not configured".into())
    })?;
    let remote_path = remote_path_from_proxy(&chain.base_path, encoded_path)
        .ok_or_else(|| NasError::NotFound("invalid NAS path".into()))?;

    let bytes = store.get_file(&remote_path).await.map_err(|err| {
        debug!(path = %remote_path, error = %err, "proxy fetch failed");
        NasError::NotFound(format!("file not available: {err}"))
    })?;

    Ok(ProxiedFile {
        bytes,
        content_type: content_type_for(&remote_path),
    })
}
