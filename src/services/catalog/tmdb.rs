/// TMDB catalog provider
///
/// API Flow:
/// 1. Browse: /discover/movie → popularity-sorted pages
/// 2. Search: /search/movie → pages matching a text query
/// 3. Details: /movie/{id}?append_to_response=credits → genres, runtime, credits
use crate::{
    error::{AppError, AppResult},
    models::{ApiMovie, ApiMovieDetails, ApiMoviePage, Movie, MovieDetails, MovieId, MoviePage},
    services::catalog::CatalogProvider,
};
use reqwest::Client as HttpClient;

const LANGUAGE: &str = "en-US";
const SORT_BY: &str = "popularity.desc";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self::with_client(HttpClient::new(), api_key, api_url)
    }

    pub fn with_client(http_client: HttpClient, api_key: String, api_url: String) -> Self {
        Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Endpoint path and query parameters for a page request
    fn page_request(&self, page: u32, query: Option<&str>) -> (String, Vec<(&'static str, String)>) {
        let query = query.map(str::trim).filter(|q| !q.is_empty());

        let endpoint = match query {
            Some(_) => format!("{}/search/movie", self.api_url),
            None => format!("{}/discover/movie", self.api_url),
        };

        let mut params = vec![
            ("api_key", self.api_key.clone()),
            ("page", page.max(1).to_string()),
            ("language", LANGUAGE.to_string()),
            ("sort_by", SORT_BY.to_string()),
            ("include_adult", "false".to_string()),
        ];
        if let Some(q) = query {
            params.push(("query", q.to_string()));
        }

        (endpoint, params)
    }

    /// Sends a GET and returns the body, mapping non-success statuses to network errors
    async fn get_text(&self, url: &str, params: &[(&'static str, String)]) -> AppResult<String> {
        let response = self.http_client.get(url).query(params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                url = %url,
                status = %status,
                body = %body,
                "TMDB request failed"
            );
            return Err(AppError::Network(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        Ok(response.text().await?)
    }
}

/// Parses a paged TMDB payload and drops entries missing display fields
pub fn parse_page(body: &str) -> AppResult<MoviePage> {
    let page: ApiMoviePage = serde_json::from_str(body)
        .map_err(|e| AppError::Network(format!("Failed to parse TMDB response: {}", e)))?;

    let results = page
        .results
        .ok_or_else(|| AppError::Network("Invalid response format from TMDB API".to_string()))?;

    let movies: Vec<Movie> = results
        .into_iter()
        .filter_map(|value| serde_json::from_value::<ApiMovie>(value).ok())
        .filter_map(|api| {
            let id = api.id;
            match Movie::try_from(api) {
                Ok(movie) => Some(movie),
                Err(missing) => {
                    tracing::debug!(movie_id = id, missing = ?missing, "Dropping incomplete movie");
                    None
                }
            }
        })
        .collect();

    Ok(MoviePage {
        movies,
        total_pages: page.total_pages,
        total_results: page.total_results,
    })
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn fetch_page(&self, page: u32, query: Option<&str>) -> AppResult<MoviePage> {
        let (url, params) = self.page_request(page, query);
        let body = self.get_text(&url, &params).await?;
        let result = parse_page(&body)?;

        tracing::info!(
            page = page,
            query = ?query,
            results = result.movies.len(),
            total_pages = result.total_pages,
            provider = "tmdb",
            "Catalog page fetched"
        );

        Ok(result)
    }

    async fn fetch_details(&self, movie_id: MovieId) -> AppResult<MovieDetails> {
        let url = format!("{}/movie/{}", self.api_url, movie_id);
        let params = [
            ("api_key", self.api_key.clone()),
            ("language", LANGUAGE.to_string()),
            ("append_to_response", "credits".to_string()),
        ];

        let body = self.get_text(&url, &params).await?;
        tracing::debug!(response = %body, "Raw TMDB details response");

        let api: ApiMovieDetails = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, movie_id = %movie_id, "Failed to deserialize TMDB details");
            AppError::Network(format!("Failed to parse TMDB details: {}", e))
        })?;

        let details = MovieDetails::from(api);

        tracing::info!(
            movie_id = %movie_id,
            cast = details.cast.len(),
            provider = "tmdb",
            "Movie details fetched"
        );

        Ok(details)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
