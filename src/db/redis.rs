use std::collections::HashMap;

use redis::AsyncCommands;
use redis::Client;

use super::DocumentStore;
use crate::error::{AppError, AppResult};
use crate::models::{DocumentField, UserDocument};

/// Creates a Redis client for the document store
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Key holding a user's document as a hash of JSON-encoded fields
pub fn document_key(uid: &str) -> String {
    format!("user:{}", uid)
}

/// Document store backed by one Redis hash per user
///
/// Field writes are single `HSET`s, so concurrent writers touching different
/// fields never clobber each other.
#[derive(Clone)]
pub struct RedisDocumentStore {
    redis_client: Client,
}

impl RedisDocumentStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }
}

/// Rebuilds a document from the raw hash; unknown fields are ignored
fn parse_document(fields: HashMap<String, String>) -> AppResult<UserDocument> {
    let mut document = UserDocument::default();
    for (name, json) in fields {
        let decode_error =
            |e: serde_json::Error| AppError::Internal(format!("Malformed {} field: {}", name, e));
        match name.as_str() {
            "watchList" => document.watch_list = serde_json::from_str(&json).map_err(decode_error)?,
            "watchLater" => {
                document.watch_later = serde_json::from_str(&json).map_err(decode_error)?
            }
            "reviews" => document.reviews = serde_json::from_str(&json).map_err(decode_error)?,
            _ => tracing::debug!(field = %name, "Ignoring unknown document field"),
        }
    }
    Ok(document)
}

#[async_trait::async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn load(&self, uid: &str) -> AppResult<Option<UserDocument>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let fields: HashMap<String, String> = conn.hgetall(document_key(uid)).await?;

        if fields.is_empty() {
            return Ok(None);
        }
        parse_document(fields).map(Some)
    }

    async fn merge(&self, uid: &str, field: &DocumentField) -> AppResult<()> {
        let json = field
            .to_json()
            .map_err(|e| AppError::Internal(format!("Document serialization error: {}", e)))?;

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.hset(document_key(uid), field.name(), json).await?;

        tracing::debug!(uid = %uid, field = field.name(), "Document field written");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_key() {
        assert_eq!(document_key("abc123"), "user:abc123");
    }

    #[test]
    fn test_parse_document_partial_hash() {
        let mut fields = HashMap::new();
        fields.insert("watchLater".to_string(), "[]".to_string());
        fields.insert("legacy".to_string(), "true".to_string());

        let document = parse_document(fields).unwrap();
        assert_eq!(document, UserDocument::default());
    }

    #[test]
    fn test_parse_document_rejects_malformed_field() {
        let mut fields = HashMap::new();
        fields.insert("reviews".to_string(), "{not json".to_string());

        assert!(matches!(
            parse_document(fields),
            Err(AppError::Internal(_))
        ));
    }

    // Needs a running Redis; set REDIS_URL to point elsewhere
    #[tokio::test]
    #[ignore]
    async fn test_merge_then_load_roundtrip() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = create_redis_client(&redis_url).unwrap();
        let store = RedisDocumentStore::new(client.clone());

        store
            .merge("test-roundtrip", &DocumentField::WatchList(Vec::new()))
            .await
            .unwrap();
        let document = store.load("test-roundtrip").await.unwrap();
        assert_eq!(document, Some(UserDocument::default()));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(document_key("test-roundtrip")).await.unwrap();
    }
}
