use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{NasEnvConfig, DEFAULT_FTP_PORT, DEFAULT_NAS_BASE_PATH};
use crate::db::{with_conn, PgPool};
use crate::models::{AppSetting, NewAppSetting};
use crate::nas::paths::normalize_base;
use crate::schema::app_settings;

pub const KEY_WEBDAV_URL: &str = "nas.webdav_url";
pub const KEY_WEBDAV_PORT: &str = "nas.webdav_port";
pub const KEY_WEBDAV_USERNAME: &str = "nas.webdav_username";
pub const KEY_WEBDAV_PASSWORD: &str = "nas.webdav_password";
pub const KEY_FTP_HOST: &str = "nas.ftp_host";
pub const KEY_FTP_PORT: &str = "nas.ftp_port";
pub const KEY_FTP_USERNAME: &str = "nas.ftp_username";
pub const KEY_FTP_PASSWORD: &str = "nas.ftp_password";
pub const KEY_PROXY_USERNAME: &str = "nas.proxy_username";
pub const KEY_PROXY_PASSWORD: &str = "nas.proxy_password";
pub const KEY_BASE_PATH: &str = "nas.base_path";

/// Persisted configuration values, keyed by the `KEY_*` constants.
#[async_trait]
pub trait SettingsStore: Send + Sync + 'static {
    async fn load(&self) -> Result<HashMap<String, String>>;

    /// `None` removes the persisted value so the environment applies again.
    async fn save(&self, values: Vec<(String, Option<String>)>) -> Result<()>;
}

pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn load(&self) -> Result<HashMap<String, String>> {
        with_conn(&self.pool, |conn| {
            let rows: Vec<AppSetting> = app_settings::table
                .filter(app_settings::key.like("nas.%"))
                .load(conn)
                .context("failed to load settings")?;
            Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
        })
        .await
    }

    async fn save(&self, values: Vec<(String, Option<String>)>) -> Result<()> {
        with_conn(&self.pool, move |conn| {
            conn.transaction(|conn| {
                let now = Utc::now().naive_utc();
                for (key, value) in values {
                    match value {
                        Some(value) => {
                            diesel::insert_into(app_settings::table)
                                .values(&NewAppSetting {
                                    key,
                                    value: value.clone(),
                                    updated_at: now,
                                })
                                .on_conflict(app_settings::key)
                                .do_update()
                                .set((
                                    app_settings::value.eq(value),
                                    app_settings::updated_at.eq(now),
                                ))
                                .execute(conn)?;
                        }
                        None => {
                            diesel::delete(app_settings::table.find(key)).execute(conn)?;
                        }
                    }
                }
                Ok::<_, diesel::result::Error>(())
            })
            .context("failed to save settings")
        })
        .await
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    WebDav { url: String, port: Option<u16> },
    Ftp { host: String, port: u16 },
}

impl Endpoint {
    pub fn protocol(&self) -> &'static str {
        match self {
            Endpoint::WebDav { .. } => "webdav",
            Endpoint::Ftp { .. } => "ftp",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreAccess {
    pub endpoint: Endpoint,
    pub credentials: Credentials,
}

/// Effective NAS configuration after merging persisted values over the
/// environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NasSettings {
    pub webdav: Option<StoreAccess>,
    pub ftp: Option<StoreAccess>,
    pub proxy_credentials: Option<Credentials>,
    pub base_path: String,
}

impl NasSettings {
    pub fn resolve(overrides: &HashMap<String, String>, env: &NasEnvConfig) -> Self {
        let pick = |key: &str, fallback: Option<&String>| -> Option<String> {
            overrides
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .or_else(|| fallback.cloned())
        };
        let pick_port = |key: &str, fallback: Option<u16>| -> Option<u16> {
            match overrides.get(key).map(|value| value.trim()) {
                Some(value) if !value.is_empty() => match value.parse() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        tracing::warn!(key, value, "ignoring invalid port setting");
                        fallback
                    }
                },
                _ => fallback,
            }
        };

        let credentials = |user_key: &str,
                           user_env: Option<&String>,
                           pass_key: &str,
                           pass_env: Option<&String>| {
            match (pick(user_key, user_env), pick(pass_key, pass_env)) {
                (Some(username), Some(password)) => Some(Credentials { username, password }),
                _ => None,
            }
        };

        let webdav = pick(KEY_WEBDAV_URL, env.webdav_url.as_ref()).and_then(|url| {
            credentials(
                KEY_WEBDAV_USERNAME,
                env.webdav_username.as_ref(),
                KEY_WEBDAV_PASSWORD,
                env.webdav_password.as_ref(),
            )
            .map(|credentials| StoreAccess {
                endpoint: Endpoint::WebDav {
                    url,
                    port: pick_port(KEY_WEBDAV_PORT, env.webdav_port),
                },
                credentials,
            })
        });

        let ftp = pick(KEY_FTP_HOST, env.ftp_host.as_ref()).and_then(|host| {
            credentials(
                KEY_FTP_USERNAME,
                env.ftp_username.as_ref(),
                KEY_FTP_PASSWORD,
                env.ftp_password.as_ref(),
            )
            .map(|credentials| StoreAccess {
                endpoint: Endpoint::Ftp {
                    host,
                    port: pick_port(KEY_FTP_PORT, env.ftp_port).unwrap_or(DEFAULT_FTP_PORT),
                },
                credentials,
            })
        });

        let proxy_credentials = credentials(
            KEY_PROXY_USERNAME,
            env.proxy_username.as_ref(),
            KEY_PROXY_PASSWORD,
            env.proxy_password.as_ref(),
        );

        let base_path = pick(KEY_BASE_PATH, env.base_path.as_ref())
            .unwrap_or_else(|| DEFAULT_NAS_BASE_PATH.to_string());

        Self {
            webdav,
            ftp,
            proxy_credentials,
            base_path: normalize_base(&base_path),
        }
    }

    /// Read/write stores in priority order: WebDAV first, FTP as fallback.
    pub fn providers(&self) -> Vec<&StoreAccess> {
        self.webdav.iter().chain(self.ftp.iter()).collect()
    }

    /// The primary endpoint paired with the read-only proxy credentials.
    pub fn proxy_access(&self) -> Option<StoreAccess> {
        let credentials = self.proxy_credentials.clone()?;
        let endpoint = self
            .webdav
            .as_ref()
            .or(self.ftp.as_ref())
            .map(|access| access.endpoint.clone())?;
        Some(StoreAccess {
            endpoint,
            credentials,
        })
    }

    /// Stable digest of every field, used as the connection cache key.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let mut feed = |value: &str| {
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        };
        for access in [self.webdav.as_ref(), self.ftp.as_ref()] {
            match access {
                Some(access) => {
                    match &access.endpoint {
                        Endpoint::WebDav { url, port } => {
                            feed("webdav");
                            feed(url);
                            feed(&port.map(|p| p.to_string()).unwrap_or_default());
                        }
                        Endpoint::Ftp { host, port } => {
                            feed("ftp");
                            feed(host);
                            feed(&port.to_string());
                        }
                    }
                    feed(&access.credentials.username);
                    feed(&access.credentials.password);
                }
                None => feed("-"),
            }
        }
        match &self.proxy_credentials {
            Some(credentials) => {
                feed(&credentials.username);
                feed(&credentials.password);
            }
            None => feed("-"),
        }
        feed(&self.base_path);
        hex::encode(hasher.finalize())
    }
}

/// Body of a settings update. Absent fields are left untouched, empty strings
/// remove the persisted value.
#[derive(Debug, Default, Deserialize)]
pub struct NasSettingsUpdate {
    pub webdav_url: Option<String>,
    pub webdav_port: Option<String>,
    pub webdav_username: Option<String>,
    pub webdav_password: Option<String>,
    pub ftp_host: Option<String>,
    pub ftp_port: Option<String>,
    pub ftp_username: Option<String>,
    pub ftp_password: Option<String>,
    pub proxy_username: Option<String>,
    pub proxy_password: Option<String>,
    pub base_path: Option<String>,
}

impl NasSettingsUpdate {
    pub fn into_values(self) -> Vec<(String, Option<String>)> {
        let fields = [
            (KEY_WEBDAV_URL, self.webdav_url),
            (KEY_WEBDAV_PORT, self.webdav_port),
            (KEY_WEBDAV_USERNAME, self.webdav_username),
            (KEY_WEBDAV_PASSWORD, self.webdav_password),
            (KEY_FTP_HOST, self.ftp_host),
            (KEY_FTP_PORT, self.ftp_port),
            (KEY_FTP_USERNAME, self.ftp_username),
            (KEY_FTP_PASSWORD, self.ftp_password),
            (KEY_PROXY_USERNAME, self.proxy_username),
            (KEY_PROXY_PASSWORD, self.proxy_password),
            (KEY_BASE_PATH, self.base_path),
        ];
        fields
            .into_iter()
            .filter_map(|(key, value)| {
                value.map(|value| {
                    let trimmed = value.trim().to_string();
                    (key.to_string(), (!trimmed.is_empty()).then_some(trimmed))
                })
            })
            .collect()
    }
}

/// What the settings page shows; passwords are reported as set or not.
#[derive(Debug, Serialize)]
pub struct NasSettingsView {
    pub webdav_url: Option<String>,
    pub webdav_port: Option<u16>,
    pub webdav_username: Option<String>,
    pub webdav_password_set: bool,
    pub ftp_host: Option<String>,
    pub ftp_port: Option<u16>,
    pub ftp_username: Option<String>,
    pub ftp_password_set: bool,
    pub proxy_username: Option<String>,
    pub proxy_password_set: bool,
    pub base_path: String,
}

impl From<&NasSettings> for NasSettingsView {
    fn from(settings: &NasSettings) -> Self {
        let (webdav_url, webdav_port) = match settings.webdav.as_ref().map(|a| &a.endpoint) {
            Some(Endpoint::WebDav { url, port }) => (Some(url.clone()), *port),
            _ => (None, None),
        };
        let (ftp_host, ftp_port) = match settings.ftp.as_ref().map(|a| &a.endpoint) {
            Some(Endpoint::Ftp { host, port }) => (Some(host.clone()), Some(*port)),
            _ => (None, None),
        };
        Self {
            webdav_url,
            webdav_port,
            webdav_username: settings
                .webdav
                .as_ref()
                .map(|a| a.credentials.username.clone()),
            webdav_password_set: settings.webdav.is_some(),
            ftp_host,
            ftp_port,
            ftp_username: settings.ftp.as_ref().map(|a| a.credentials.username.clone()),
            ftp_password_set: settings.ftp.is_some(),
            proxy_username: settings
                .proxy_credentials
                .as_ref()
                .map(|c| c.username.clone()),
            proxy_password_set: settings.proxy_credentials.is_some(),
            base_path: settings.base_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> NasEnvConfig {
        NasEnvConfig {
            webdav_url: Some("https://nas.local/dav".into()),
            webdav_port: Some(5006),
            webdav_username: Some("office".into()),
            webdav_password: Some("env-secret".into()),
            ftp_host: Some("nas.local".into()),
            ftp_username: Some("office".into()),
            ftp_password: Some("env-secret".into()),
            proxy_username: Some("viewer".into()),
            proxy_password: Some("view-only".into()),
            ..NasEnvConfig::default()
        }
    }

    #[test]
    fn environment_applies_without_overrides() {
        let settings = NasSettings::resolve(&HashMap::new(), &env());
        assert_eq!(settings.base_path, "/Dokumente");
        assert_eq!(settings.providers().len(), 2);
        assert_eq!(settings.providers()[0].endpoint.protocol(), "webdav");
        assert_eq!(
            settings.ftp.as_ref().map(|a| a.endpoint.clone()),
            Some(Endpoint::Ftp {
                host: "nas.local".into(),
                port: DEFAULT_FTP_PORT
            })
        );
    }

    #[test]
    fn persisted_values_take_precedence() {
        let overrides = HashMap::from([
            (KEY_WEBDAV_URL.to_string(), "https://other.nas/dav".to_string()),
            (KEY_BASE_PATH.to_string(), "Immobilien/".to_string()),
            (KEY_WEBDAV_PASSWORD.to_string(), "   ".to_string()),
        ]);
        let settings = NasSettings::resolve(&overrides, &env());
        let webdav = settings.webdav.expect("webdav configured");
        assert_eq!(
            webdav.endpoint,
            Endpoint::WebDav {
                url: "https://other.nas/dav".into(),
                port: Some(5006)
            }
        );
        assert_eq!(webdav.credentials.password, "env-secret");
        assert_eq!(settings.base_path, "/Immobilien");
    }

    #[test]
    fn incomplete_credentials_disable_a_store() {
        let mut partial = env();
        partial.ftp_password = None;
        partial.proxy_username = None;
        let settings = NasSettings::resolve(&HashMap::new(), &partial);
        assert!(settings.ftp.is_none());
        assert!(settings.proxy_access().is_none());
    }

    #[test]
    fn proxy_uses_primary_endpoint_with_read_only_credentials() {
        let settings = NasSettings::resolve(&HashMap::new(), &env());
        let proxy = settings.proxy_access().expect("proxy configured");
        assert_eq!(proxy.endpoint.protocol(), "webdav");
        assert_eq!(proxy.credentials.username, "viewer");
    }

    #[test]
    fn fingerprint_tracks_every_field() {
        let base = NasSettings::resolve(&HashMap::new(), &env());
        let same = NasSettings::resolve(&HashMap::new(), &env());
        assert_eq!(base.fingerprint(), same.fingerprint());

        let overrides = HashMap::from([(KEY_PROXY_PASSWORD.to_string(), "rotated".to_string())]);
        let rotated = NasSettings::resolve(&overrides, &env());
        assert_ne!(base.fingerprint(), rotated.fingerprint());
    }

    #[test]
    fn update_maps_empty_strings_to_removal() {
        let update = NasSettingsUpdate {
            base_path: Some("/Archiv".into()),
            ftp_host: Some("".into()),
            ..NasSettingsUpdate::default()
        };
        let values = update.into_values();
        assert!(values.contains(&(KEY_BASE_PATH.to_string(), Some("/Archiv".to_string()))));
        assert!(values.contains(&(KEY_FTP_HOST.to_string(), None)));
        assert_eq!(values.len(), 2);
    }
}
