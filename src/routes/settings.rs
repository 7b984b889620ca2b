use axum::{extract::State, Json};
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::nas::service::ConnectivityReport;
use crate::settings::{NasSettingsUpdate, NasSettingsView};
use crate::state::AppState;

pub async fn get_nas_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<NasSettingsView>> {
    user.require_admin()?;
    let settings = state.nas_settings().await?;
    Ok(Json(NasSettingsView::from(&settings)))
}

pub async fn update_nas_settings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(update): Json<NasSettingsUpdate>,
) -> AppResult<Json<NasSettingsView>> {
    user.require_admin()?;
    for (field, value) in [
        ("webdav_port", update.webdav_port.as_deref()),
        ("ftp_port", update.ftp_port.as_deref()),
    ] {
        if let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) {
            value
                .parse::<u16>()
                .map_err(|_| AppError::bad_request(format!("{field} must be a valid port")))?;
        }
    }

    let values = update.into_values();
    let keys: Vec<String> = values.iter().map(|(key, _)| key.clone()).collect();
    state.settings.save(values).await?;
    state.stores.invalidate();
    info!(user = %user.username, ?keys, "NAS settings saved");

    let settings = state.nas_settings().await?;
    Ok(Json(NasSettingsView::from(&settings)))
}

pub async fn test_nas_connection(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ConnectivityReport>>> {
    user.require_admin()?;
    let nas = state.nas().await?;
    Ok(Json(nas.check_connectivity().await))
}
