mod decision;
mod details;
mod movie;
mod session;

pub use decision::{
    Decision, DecisionRecord, MovieReview, Review, ReviewDraft, MAX_REVIEW_RATING,
    MIN_REVIEW_RATING,
};
pub use details::{ApiCastMember, ApiCredits, ApiCrewMember, ApiGenre, ApiMovieDetails, MovieDetails};
pub use movie::{
    genre_name, image_url, ApiMovie, ApiMoviePage, ImageSize, MissingField, Movie, MovieId,
    MoviePage,
};
pub use session::{
    AuthState, Credentials, DocumentField, ExternalCredential, Session, User, UserDocument,
};
