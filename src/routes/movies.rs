use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::AppState;
use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{Movie, MovieDetails, MovieId, MoviePage},
};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    page: u32,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    #[serde(default = "first_page")]
    page: u32,
    /// Truncates the page, e.g. 5 for search-as-you-type suggestions
    limit: Option<usize>,
}

fn first_page() -> u32 {
    1
}

/// Popularity-sorted browse page
pub async fn discover(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<MoviePage>> {
    let page = state.catalog.fetch_page(params.page, None).await?;
    Ok(Json(page))
}

/// Free-text search
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<MoviePage>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput("Query parameter 'q' is empty".to_string()));
    }

    let mut page = state.catalog.fetch_page(params.page, Some(query)).await?;
    if let Some(limit) = params.limit {
        page.movies.truncate(limit);
    }
    Ok(Json(page))
}

/// One shuffled batch from a random discover page, as fed to the card stack
pub async fn random(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<Vec<Movie>>> {
    let movies = state.catalog.fetch_random_batch().await?;
    tracing::info!(
        request_id = %request_id,
        provider = state.catalog.name(),
        count = movies.len(),
        "Random batch served"
    );
    Ok(Json(movies))
}

pub async fn details(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<MovieDetails>> {
    let details = state.catalog.fetch_details(MovieId(id)).await?;
    Ok(Json(details))
}
