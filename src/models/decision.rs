use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Movie, MovieId};

/// Lowest and highest star rating a review accepts
pub const MIN_REVIEW_RATING: u8 = 1;
pub const MAX_REVIEW_RATING: u8 = 5;

/// A submitted review
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Review {
    pub rating: u8,
    pub text: String,
}

/// Outcome of the user's interaction with the top card
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    Watched,
    Skipped,
    WatchLater,
    Reviewed(Review),
}

/// A decision bound to the movie it was made on
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRecord {
    pub movie: Movie,
    pub decision: Decision,
    pub decided_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(movie: Movie, decision: Decision) -> Self {
        Self {
            movie,
            decision,
            decided_at: Utc::now(),
        }
    }
}

/// In-progress review on the back of a flipped card
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewDraft {
    /// 0 means no star selected yet
    pub rating: u8,
    pub text: String,
}

impl ReviewDraft {
    /// Selects a star rating; values above the maximum are ignored
    pub fn set_rating(&mut self, rating: u8) {
        if rating <= MAX_REVIEW_RATING {
            self.rating = rating;
        }
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Submit is enabled only with a rating and non-blank text
    pub fn can_submit(&self) -> bool {
        (MIN_REVIEW_RATING..=MAX_REVIEW_RATING).contains(&self.rating)
            && !self.text.trim().is_empty()
    }

    /// Consumes the draft into a review, or `None` while submit is disabled
    pub fn submit(&self) -> Option<Review> {
        self.can_submit().then(|| Review {
            rating: self.rating,
            text: self.text.trim().to_string(),
        })
    }
}

/// A review as persisted in the user document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovieReview {
    pub movie_id: MovieId,
    pub title: String,
    pub rating: u8,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl MovieReview {
    pub fn new(movie: &Movie, review: &Review) -> Self {
        Self {
            movie_id: movie.id,
            title: movie.title.clone(),
            rating: review.rating,
            content: review.text.clone(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_requires_rating() {
        let mut draft = ReviewDraft::default();
        draft.set_text("Great film");
        assert!(!draft.can_submit());
        assert_eq!(draft.submit(), None);
    }

    #[test]
    fn test_draft_requires_non_blank_text() {
        let mut draft = ReviewDraft::default();
        draft.set_rating(4);
        draft.set_text("   \n");
        assert!(!draft.can_submit());
    }

    #[test]
    fn test_draft_submits_trimmed_text() {
        let mut draft = ReviewDraft::default();
        draft.set_rating(3);
        draft.set_text("  Great film ");
        assert_eq!(
            draft.submit(),
            Some(Review {
                rating: 3,
                text: "Great film".to_string()
            })
        );
    }

    #[test]
    fn test_out_of_range_rating_is_ignored() {
        let mut draft = ReviewDraft::default();
        draft.set_rating(2);
        draft.set_rating(9);
        assert_eq!(draft.rating, 2);
        draft.set_rating(0);
        assert_eq!(draft.rating, 0);
    }

    #[test]
    fn test_decision_serialization() {
        let json = serde_json::to_string(&Decision::Watched).unwrap();
        assert_eq!(json, r#"{"kind":"watched"}"#);

        let reviewed = Decision::Reviewed(Review {
            rating: 5,
            text: "Masterpiece".to_string(),
        });
        let json = serde_json::to_string(&reviewed).unwrap();
        assert_eq!(json, r#"{"kind":"reviewed","rating":5,"text":"Masterpiece"}"#);
        assert_eq!(serde_json::from_str::<Decision>(&json).unwrap(), reviewed);
    }
}
