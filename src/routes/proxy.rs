use axum::{
    extract::{OriginalUri, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::AppResult;
use crate::nas::{paths::PROXY_PREFIX, proxy};
use crate::state::AppState;

/// Serves NAS files to browsers with the read-only credentials. The raw,
/// still percent-encoded request path is used so encoded separators inside a
/// segment are rejected instead of being split.
pub async fn serve(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> AppResult<Response> {
    let encoded = uri.path().strip_prefix(PROXY_PREFIX).unwrap_or_default();
    let chain = state.nas_chain().await?;
    let file = proxy::fetch(&chain, encoded).await?;

    Ok((
        [
            (header::CONTENT_TYPE, file.content_type),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        file.bytes,
    )
        .into_response())
}
