//! Movie catalog abstraction
//!
//! The card buffer, the dev server and tests all talk to the catalog through
//! this trait, so the TMDB client can be swapped for a stub.
use rand::{seq::SliceRandom, Rng};

use crate::{
    error::AppResult,
    models::{Movie, MovieDetails, MovieId, MoviePage},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Highest page `fetch_random_batch` draws from
pub const RANDOM_PAGE_MAX: u32 = 20;

#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch one page of discover results, or search results when `query` is set
    ///
    /// Movies without a poster, release date or rating are dropped from the page.
    async fn fetch_page(&self, page: u32, query: Option<&str>) -> AppResult<MoviePage>;

    /// Fetch extended metadata (genres, runtime, credits) for one movie
    async fn fetch_details(&self, movie_id: MovieId) -> AppResult<MovieDetails>;

    /// Fetch a shuffled batch from a random discover page
    ///
    /// Draws a page uniformly from `1..=RANDOM_PAGE_MAX`, Fisher-Yates shuffles
    /// it and drops anything without a poster.
    async fn fetch_random_batch(&self) -> AppResult<Vec<Movie>> {
        let page = rand::thread_rng().gen_range(1..=RANDOM_PAGE_MAX);
        let mut movies = self.fetch_page(page, None).await?.movies;

        movies.shuffle(&mut rand::thread_rng());
        movies.retain(|movie| !movie.poster_path.is_empty());

        tracing::debug!(
            page = page,
            count = movies.len(),
            provider = self.name(),
            "Random batch fetched"
        );

        Ok(movies)
    }

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
