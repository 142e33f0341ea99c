use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// TMDB movie identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u64);

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A movie card as shown to the user
///
/// Only constructed from catalog entries that carry every display field, so a
/// `Movie` always has a poster, a release date and a rating.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub poster_path: String,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    /// Average vote on a 0-10 scale
    pub rating: f64,
    pub release_date: NaiveDate,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub original_language: Option<String>,
}

impl Movie {
    pub fn year(&self) -> i32 {
        self.release_date.year()
    }

    /// Display names of the first `limit` known genres
    pub fn genre_names(&self, limit: usize) -> Vec<&'static str> {
        self.genre_ids
            .iter()
            .filter_map(|id| genre_name(*id))
            .take(limit)
            .collect()
    }

    pub fn poster_url(&self, base_url: &str, size: ImageSize) -> String {
        image_url(base_url, &self.poster_path, size)
    }

    pub fn backdrop_url(&self, base_url: &str) -> Option<String> {
        self.backdrop_path
            .as_deref()
            .map(|path| image_url(base_url, path, ImageSize::Original))
    }
}

/// Image widths served by the CDN
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSize {
    W300,
    W500,
    Original,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::W300 => "w300",
            ImageSize::W500 => "w500",
            ImageSize::Original => "original",
        }
    }
}

/// Builds a size-parameterized CDN URL, e.g. `{base}/w500/abc.jpg`
pub fn image_url(base_url: &str, path: &str, size: ImageSize) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}/{}{}", base, size.as_str(), path)
    } else {
        format!("{}/{}/{}", base, size.as_str(), path)
    }
}

const GENRES: &[(u32, &str)] = &[
    (28, "Action"),
    (12, "Adventure"),
    (16, "Animation"),
    (35, "Comedy"),
    (80, "Crime"),
    (99, "Documentary"),
    (18, "Drama"),
    (10751, "Family"),
    (14, "Fantasy"),
    (36, "History"),
    (27, "Horror"),
    (10402, "Music"),
    (9648, "Mystery"),
    (10749, "Romance"),
    (878, "Science Fiction"),
    (10770, "TV Movie"),
    (53, "Thriller"),
    (10752, "War"),
    (37, "Western"),
];

/// Looks up the display name of a TMDB genre id
pub fn genre_name(id: u32) -> Option<&'static str> {
    GENRES
        .iter()
        .find(|(genre_id, _)| *genre_id == id)
        .map(|(_, name)| *name)
}

/// A page of catalog results after filtering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub total_pages: u32,
    pub total_results: u32,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Raw movie entry from `/discover/movie` or `/search/movie`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovie {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub original_language: Option<String>,
}

/// Envelope of a paged TMDB response
///
/// `results` is optional so a payload without it surfaces as a network error
/// rather than a deserialization panic further down.
#[derive(Debug, Deserialize)]
pub struct ApiMoviePage {
    #[serde(default)]
    pub results: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

/// Display field a catalog entry was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Poster,
    ReleaseDate,
    Rating,
}

impl TryFrom<ApiMovie> for Movie {
    type Error = MissingField;

    fn try_from(api: ApiMovie) -> Result<Self, Self::Error> {
        let poster_path = api
            .poster_path
            .filter(|p| !p.trim().is_empty())
            .ok_or(MissingField::Poster)?;

        let release_date = api
            .release_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .ok_or(MissingField::ReleaseDate)?;

        let rating = api.vote_average.ok_or(MissingField::Rating)?;

        Ok(Movie {
            id: MovieId(api.id),
            title: api.title,
            poster_path,
            backdrop_path: api.backdrop_path.filter(|p| !p.trim().is_empty()),
            rating: rating.clamp(0.0, 10.0),
            release_date,
            overview: api.overview.unwrap_or_default(),
            genre_ids: api.genre_ids,
            original_language: api.original_language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_movie() -> ApiMovie {
        ApiMovie {
            id: 27205,
            title: "Inception".to_string(),
            poster_path: Some("/oYuLEt3zVCKq57qu2F8dT7NIa6f.jpg".to_string()),
            backdrop_path: None,
            vote_average: Some(8.4),
            release_date: Some("2010-07-15".to_string()),
            overview: Some("Cobb, a skilled thief".to_string()),
            genre_ids: vec![28, 878, 12],
            original_language: Some("en".to_string()),
        }
    }

    #[test]
    fn test_movie_id_display() {
        assert_eq!(format!("{}", MovieId(27205)), "27205");
    }

    #[test]
    fn test_movie_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&MovieId(27205)).unwrap(), "27205");
    }

    #[test]
    fn test_api_movie_to_movie() {
        let movie = Movie::try_from(api_movie()).unwrap();
        assert_eq!(movie.id, MovieId(27205));
        assert_eq!(movie.year(), 2010);
        assert_eq!(movie.rating, 8.4);
        assert_eq!(movie.genre_names(2), vec!["Action", "Science Fiction"]);
    }

    #[test]
    fn test_missing_poster_is_rejected() {
        let mut api = api_movie();
        api.poster_path = None;
        assert_eq!(Movie::try_from(api).unwrap_err(), MissingField::Poster);

        let mut api = api_movie();
        api.poster_path = Some("".to_string());
        assert_eq!(Movie::try_from(api).unwrap_err(), MissingField::Poster);
    }

    #[test]
    fn test_blank_release_date_is_rejected() {
        let mut api = api_movie();
        api.release_date = Some("".to_string());
        assert_eq!(Movie::try_from(api).unwrap_err(), MissingField::ReleaseDate);
    }

    #[test]
    fn test_null_rating_is_rejected() {
        let mut api = api_movie();
        api.vote_average = None;
        assert_eq!(Movie::try_from(api).unwrap_err(), MissingField::Rating);
    }

    #[test]
    fn test_zero_rating_is_kept() {
        let mut api = api_movie();
        api.vote_average = Some(0.0);
        assert_eq!(Movie::try_from(api).unwrap().rating, 0.0);
    }

    #[test]
    fn test_image_url() {
        assert_eq!(
            image_url("https://image.tmdb.org/t/p", "/abc.jpg", ImageSize::W500),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
        assert_eq!(
            image_url("https://image.tmdb.org/t/p/", "abc.jpg", ImageSize::Original),
            "https://image.tmdb.org/t/p/original/abc.jpg"
        );
    }

    #[test]
    fn test_unknown_genre_is_skipped() {
        assert_eq!(genre_name(18), Some("Drama"));
        assert_eq!(genre_name(1), None);
    }

    #[test]
    fn test_api_movie_deserialization_with_nulls() {
        let json = r#"{
            "id": 550,
            "title": "Fight Club",
            "poster_path": null,
            "vote_average": 8.4,
            "release_date": "1999-10-15",
            "genre_ids": [18]
        }"#;

        let api: ApiMovie = serde_json::from_str(json).unwrap();
        assert_eq!(api.id, 550);
        assert_eq!(api.poster_path, None);
        assert_eq!(api.overview, None);
    }
}
