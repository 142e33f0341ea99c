use serde::Deserialize;

use crate::interaction::GestureConfig;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB API key
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Image CDN base URL (size segment is appended per request)
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    /// Identity Toolkit base URL
    #[serde(default = "default_identity_api_url")]
    pub identity_api_url: String,

    /// Identity Toolkit web API key
    #[serde(default)]
    pub identity_api_key: Option<String>,

    /// Redis connection URL for user documents
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Viewport width in pixels used for swipe thresholds
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,

    /// Viewport height in pixels used for the watch-later exit
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_identity_api_url() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5173
}

fn default_viewport_width() -> f64 {
    390.0
}

fn default_viewport_height() -> f64 {
    844.0
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Address the dev server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Gesture thresholds scaled to the configured viewport
    pub fn gesture_config(&self) -> GestureConfig {
        GestureConfig::with_viewport(self.viewport_width, self.viewport_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_fields() {
        let vars = vec![("TMDB_API_KEY".to_string(), "abc123".to_string())];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.tmdb_api_key, "abc123");
        assert_eq!(config.tmdb_api_url, "https://api.themoviedb.org/3");
        assert_eq!(config.image_base_url, "https://image.tmdb.org/t/p");
        assert_eq!(config.identity_api_key, None);
        assert_eq!(config.port, 5173);
        assert_eq!(config.bind_addr(), "127.0.0.1:5173");
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let vars: Vec<(String, String)> = vec![("PORT".to_string(), "8080".to_string())];
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }

    #[test]
    fn test_viewport_override() {
        let vars = vec![
            ("TMDB_API_KEY".to_string(), "abc123".to_string()),
            ("VIEWPORT_WIDTH".to_string(), "1000".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.viewport_width, 1000.0);
        assert_eq!(config.viewport_height, 844.0);
        assert_eq!(config.gesture_config().swipe_threshold(), 250.0);
    }
}
