pub mod card_buffer;
pub mod catalog;
pub mod decisions;
pub mod session;

pub use card_buffer::{BufferConfig, BufferStatus, CardBuffer};
pub use catalog::{CatalogProvider, TmdbProvider};
pub use decisions::{apply_decision, spawn_decision_router, DecisionRouterHandle};
pub use session::{AuthProvider, IdentityToolkitAuth, SessionStore, SessionSubscription};
