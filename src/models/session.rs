use serde::{Deserialize, Serialize};

use super::{Movie, MovieReview};

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Opaque id issued by the identity provider
    pub id: String,
    pub email: String,
    pub display_name: String,
}

/// Email/password sign-in form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Token obtained from an external identity provider (e.g. Google)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCredential {
    /// Provider id such as `google.com`
    pub provider_id: String,
    pub id_token: String,
}

/// State published by the authentication collaborator
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    SignedOut,
    SignedIn(User),
}

impl AuthState {
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::SignedIn(user) => Some(user),
            AuthState::SignedOut => None,
        }
    }
}

/// Snapshot of the active session
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: User,
    pub watch_list: Vec<Movie>,
    pub watch_later: Vec<Movie>,
    pub reviews: Vec<MovieReview>,
}

/// Per-user document kept in the document store
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(default)]
    pub watch_list: Vec<Movie>,
    #[serde(default)]
    pub watch_later: Vec<Movie>,
    #[serde(default)]
    pub reviews: Vec<MovieReview>,
}

/// Single field of a [`UserDocument`], written with merge semantics
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentField {
    WatchList(Vec<Movie>),
    WatchLater(Vec<Movie>),
    Reviews(Vec<MovieReview>),
}

impl DocumentField {
    /// Field name inside the stored document
    pub fn name(&self) -> &'static str {
        match self {
            DocumentField::WatchList(_) => "watchList",
            DocumentField::WatchLater(_) => "watchLater",
            DocumentField::Reviews(_) => "reviews",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            DocumentField::WatchList(movies) | DocumentField::WatchLater(movies) => {
                serde_json::to_string(movies)
            }
            DocumentField::Reviews(reviews) => serde_json::to_string(reviews),
        }
    }

    /// Overwrites the matching field of `document`, leaving the others alone
    pub fn apply_to(self, document: &mut UserDocument) {
        match self {
            DocumentField::WatchList(movies) => document.watch_list = movies,
            DocumentField::WatchLater(movies) => document.watch_later = movies,
            DocumentField::Reviews(reviews) => document.reviews = reviews,
        }
    }
}
