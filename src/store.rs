//! Document record storage seam.
//!
//! Persistence lives outside this crate; the pipeline only needs to create,
//! read and delete records keyed by id. The in-memory store exists for tests
//! and for running the pipeline without a backing database.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub owner: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// A record before the store assigns it an id.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub title: String,
    pub content: String,
    pub doc_type: String,
    pub owner: String,
}

pub trait DocumentStore {
    fn create(&self, document: NewDocument) -> impl Future<Output = Result<DocumentRecord>> + Send;

    fn read(&self, id: &str) -> impl Future<Output = Result<Option<DocumentRecord>>> + Send;

    /// Returns whether a record was actually removed.
    fn delete(&self, id: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Mutex-backed store with monotonically assigned ids.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    records: Mutex<BTreeMap<String, DocumentRecord>>,
    next_id: AtomicU64,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, document: NewDocument) -> Result<DocumentRecord> {
        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let record = DocumentRecord {
            id: id.clone(),
            title: document.title,
            content: document.content,
            doc_type: document.doc_type,
            owner: document.owner,
            created_at: Utc::now(),
        };
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, record.clone());
        Ok(record)
    }

    async fn read(&self, id: &str) -> Result<Option<DocumentRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self
            .records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .is_some())
    }
}
