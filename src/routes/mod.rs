use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod contacts;
pub mod entries;
pub mod health;
pub mod properties;
pub mod proxy;
pub mod settings;
pub mod upload;

const MAX_UPLOAD_BYTES: usize = 1024 * 1024 * 512;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return None;
                }
                match trimmed.parse::<HeaderValue>() {
                    Ok(origin) => Some(origin),
                    Err(_) => {
                        warn!(origin = %trimmed, "ignoring invalid CORS allowed origin");
                        None
                    }
                }
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let properties_routes = Router::new()
        .route(
            "/:id/images",
            get(properties::list_images).post(properties::upload_image),
        )
        .route(
            "/:id/documents",
            get(properties::list_documents).post(properties::upload_document),
        )
        .route("/:id/sync", post(properties::sync));

    let contacts_routes = Router::new()
        .route(
            "/:id/documents",
            get(contacts::list_documents).post(contacts::upload_document),
        )
        .route("/:id/sync", post(contacts::sync));

    let property_images_routes = Router::new()
        .route(
            "/:id",
            patch(entries::update_property_image).delete(entries::delete_property_image),
        )
        .route("/:id/download", get(entries::download_property_image));

    let property_documents_routes = Router::new()
        .route(
            "/:id",
            patch(entries::update_property_document).delete(entries::delete_property_document),
        )
        .route("/:id/download", get(entries::download_property_document));

    let contact_documents_routes = Router::new()
        .route(
            "/:id",
            patch(entries::update_contact_document).delete(entries::delete_contact_document),
        )
        .route("/:id/download", get(entries::download_contact_document));

    let settings_routes = Router::new()
        .route(
            "/nas",
            get(settings::get_nas_settings).put(settings::update_nas_settings),
        )
        .route("/nas/test", post(settings::test_nas_connection));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/properties", properties_routes)
        .nest("/api/contacts", contacts_routes)
        .nest("/api/property-images", property_images_routes)
        .nest("/api/property-documents", property_documents_routes)
        .nest("/api/contact-documents", contact_documents_routes)
        .nest("/api/settings", settings_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .route("/api/nas/*path", get(proxy::serve))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
