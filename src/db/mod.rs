//! Per-user document persistence
//!
//! Each signed-in user owns one document holding their watch list, watch-later
//! list and reviews. Writes replace a single field and leave the others intact.
pub mod memory;
pub mod redis;

pub use memory::MemoryDocumentStore;
pub use self::redis::{create_redis_client, RedisDocumentStore};

use crate::error::AppResult;
use crate::models::{DocumentField, UserDocument};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Loads the user's document; `None` when it was never written
    async fn load(&self, uid: &str) -> AppResult<Option<UserDocument>>;

    /// Writes one field of the user's document, creating the document if needed
    async fn merge(&self, uid: &str, field: &DocumentField) -> AppResult<()>;

    /// Returns the name of this store for logging
    fn name(&self) -> &'static str;
}
