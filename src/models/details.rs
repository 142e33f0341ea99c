use serde::{Deserialize, Serialize};

use super::MovieId;

const TOP_CAST: usize = 5;

/// Extended metadata for a single movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetails {
    pub id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    pub runtime_minutes: Option<u32>,
    pub director: Option<String>,
    /// Top-billed cast, at most five names
    pub cast: Vec<String>,
    pub original_language: Option<String>,
}

impl MovieDetails {
    /// Lines shown on the detail surface, skipping fields the catalog left empty
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.genres.is_empty() {
            lines.push(format!("Genres: {}", self.genres.join(", ")));
        }
        if let Some(runtime) = self.runtime_minutes {
            lines.push(format!("Runtime: {} minutes", runtime));
        }
        if let Some(language) = &self.original_language {
            lines.push(format!("Language: {}", language.to_uppercase()));
        }
        if let Some(director) = &self.director {
            lines.push(format!("Director: {}", director));
        }
        if !self.cast.is_empty() {
            lines.push(format!("Cast: {}", self.cast.join(", ")));
        }
        lines
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Raw response of `/movie/{id}?append_to_response=credits`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovieDetails {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<ApiGenre>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub credits: ApiCredits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiGenre {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiCredits {
    #[serde(default)]
    pub cast: Vec<ApiCastMember>,
    #[serde(default)]
    pub crew: Vec<ApiCrewMember>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCastMember {
    pub name: String,
    #[serde(default)]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiCrewMember {
    pub name: String,
    #[serde(default)]
    pub job: String,
}

impl From<ApiMovieDetails> for MovieDetails {
    fn from(api: ApiMovieDetails) -> Self {
        let director = api
            .credits
            .crew
            .iter()
            .find(|member| member.job == "Director")
            .map(|member| member.name.clone());

        let mut cast = api.credits.cast;
        // TMDB already sorts by billing order, but not every record has it
        cast.sort_by_key(|member| member.order.unwrap_or(u32::MAX));

        MovieDetails {
            id: MovieId(api.id),
            title: api.title,
            genres: api.genres.into_iter().map(|g| g.name).collect(),
            runtime_minutes: api.runtime.filter(|r| *r > 0),
            director,
            cast: cast.into_iter().take(TOP_CAST).map(|m| m.name).collect(),
            original_language: api.original_language,
        }
    }
}
