use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::StoreResult;
use super::ftp::FtpStore;
use super::store::RemoteStore;
use super::webdav::WebDavStore;
use crate::settings::{Endpoint, NasSettings, StoreAccess};

/// Bounds connecting and each read or write while the peer is silent, never a whole transfer.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote stores built from one settings snapshot.
pub struct ProviderChain {
    pub base_path: String,
    /// Read/write stores, primary first.
    pub providers: Vec<Arc<dyn RemoteStore>>,
    /// Store authenticated with the read-only proxy credentials.
    pub proxy: Option<Arc<dyn RemoteStore>>,
}

pub trait StoreFactory: Send + Sync + 'static {
    fn connect(&self, access: &StoreAccess) -> StoreResult<Arc<dyn RemoteStore>>;
}

/// Builds the real WebDAV and FTP clients.
pub struct NasConnector {
    io_timeout: Duration,
}

impl NasConnector {
    pub fn new(io_timeout: Duration) -> Self {
        Self { io_timeout }
    }
}

impl Default for NasConnector {
    fn default() -> Self {
        Self::new(DEFAULT_IO_TIMEOUT)
    }
}

impl StoreFactory for NasConnector {
    fn connect(&self, access: &StoreAccess) -> StoreResult<Arc<dyn RemoteStore>> {
        match &access.endpoint {
            Endpoint::WebDav { url, port } => Ok(Arc::new(WebDavStore::new(
                url,
                *port,
                &access.credentials,
                self.io_timeout,
            )?)),
            Endpoint::Ftp { host, port } => Ok(Arc::new(FtpStore::new(
                host,
                *port,
                &access.credentials,
                self.io_timeout,
            ))),
        }
    }
}

/// Caches the provider chain for the current settings fingerprint.
pub struct StoreCache {
    factory: Arc<dyn StoreFactory>,
    current: Mutex<Option<(String, Arc<ProviderChain>)>>,
}

impl StoreCache {
    pub fn new(factory: Arc<dyn StoreFactory>) -> Self {
        Self {
            factory,
            current: Mutex::new(None),
        }
    }

    /// Returns the cached chain, rebuilding it when `settings` changed since
    /// the last call.
    pub fn chain(&self, settings: &NasSettings) -> Arc<ProviderChain> {
        let fingerprint = settings.fingerprint();
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some((cached, chain)) = current.as_ref() {
            if *cached == fingerprint {
                return chain.clone();
            }
        }

        let chain = Arc::new(self.build(settings));
        tracing::info!(
            providers = chain.providers.len(),
            proxy = chain.proxy.is_some(),
            "built NAS store chain"
        );
        *current = Some((fingerprint, chain.clone()));
        chain
    }

    pub fn invalidate(&self) {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = None;
    }

    fn build(&self, settings: &NasSettings) -> ProviderChain {
        let providers = settings
            .providers()
            .into_iter()
            .filter_map(|access| self.connect_or_warn(access))
            .collect();
        let proxy = settings
            .proxy_access()
            .and_then(|access| self.connect_or_warn(&access));

        ProviderChain {
            base_path: settings.base_path.clone(),
            providers,
            proxy,
        }
    }

    fn connect_or_warn(&self, access: &StoreAccess) -> Option<Arc<dyn RemoteStore>> {
        match self.factory.connect(access) {
            Ok(store) => Some(store),
            Err(err) => {
                tracing::warn!(
                    protocol = access.endpoint.protocol(),
                    error = %err,
                    "skipping misconfigured NAS store"
                );
                None
            }
        }
    }
}
