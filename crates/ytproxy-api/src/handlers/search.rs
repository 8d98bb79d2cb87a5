//! Search handler.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use ytproxy_models::VideoRecord;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Free-text query. `query` accepted as a deprecated alias.
    #[serde(alias = "query")]
    pub q: Option<String>,
    pub limit: Option<usize>,
}

/// `GET /api/search?q=<text>&limit=<n>` → JSON array of results.
///
/// An empty or missing query is a client error before anything is spawned.
pub async fn search_videos(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<VideoRecord>>> {
    let query = params
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("parameter 'q' is required"))?;

    let limit = state.config.clamp_limit(params.limit);
    let records = ytproxy_media::search(query, limit, state.config.search_timeout).await?;

    Ok(Json(records))
}
