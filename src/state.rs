use std::sync::Arc;
use std::time::Duration;

use crate::{
    auth::jwt::JwtService,
    config::AppConfig,
    db::PgPool,
    entities::{EntityLookup, PgEntityLookup},
    error::AppResult,
    index::{IndexStore, PgIndexStore},
    nas::{NasConnector, NasService, ProviderChain, StoreCache},
    settings::{NasSettings, PgSettingsStore, SettingsStore},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub index: Arc<dyn IndexStore>,
    pub entities: Arc<dyn EntityLookup>,
    pub settings: Arc<dyn SettingsStore>,
    pub stores: Arc<StoreCache>,
    pub jwt: JwtService,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        index: Arc<dyn IndexStore>,
        entities: Arc<dyn EntityLookup>,
        settings: Arc<dyn SettingsStore>,
        stores: Arc<StoreCache>,
        jwt: JwtService,
    ) -> Self {
        Self {
            config: Arc::new(config),
            index,
            entities,
            settings,
            stores,
            jwt,
        }
    }

    /// Production wiring: Postgres-backed stores and the real NAS clients.
    pub fn from_pool(pool: PgPool, config: AppConfig) -> anyhow::Result<Self> {
        let jwt = JwtService::from_config(&config)?;
        Ok(Self::new(
            config,
            Arc::new(PgIndexStore::new(pool.clone())),
            Arc::new(PgEntityLookup::new(pool.clone())),
            Arc::new(PgSettingsStore::new(pool)),
            Arc::new(StoreCache::new(Arc::new(NasConnector::default()))),
            jwt,
        ))
    }

    /// Persisted settings merged over the environment.
    pub async fn nas_settings(&self) -> AppResult<NasSettings> {
        let overrides = self.settings.load().await?;
        Ok(NasSettings::resolve(&overrides, &self.config.nas))
    }

    pub async fn nas_chain(&self) -> AppResult<Arc<ProviderChain>> {
        let settings = self.nas_settings().await?;
        Ok(self.stores.chain(&settings))
    }

    pub async fn nas(&self) -> AppResult<NasService> {
        Ok(NasService::new(
            self.nas_chain().await?,
            self.index.clone(),
            self.entities.clone(),
            Duration::from_secs(self.config.nas_connect_timeout_secs),
        ))
    }
}
