use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::DocumentStore;
use crate::error::{AppError, AppResult};
use crate::models::{DocumentField, UserDocument};

/// Process-local document store for development and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    documents: Arc<Mutex<HashMap<String, UserDocument>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a document, replacing any existing one
    pub fn insert(&self, uid: impl Into<String>, document: UserDocument) -> AppResult<()> {
        self.documents
            .lock()
            .map_err(|_| AppError::Internal("Document store lock poisoned".to_string()))?
            .insert(uid.into(), document);
        Ok(())
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn load(&self, uid: &str) -> AppResult<Option<UserDocument>> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| AppError::Internal("Document store lock poisoned".to_string()))?;
        Ok(documents.get(uid).cloned())
    }

    async fn merge(&self, uid: &str, field: &DocumentField) -> AppResult<()> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|_| AppError::Internal("Document store lock poisoned".to_string()))?;
        field
            .clone()
            .apply_to(documents.entry(uid.to_string()).or_default());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
